use encoding_rs::Encoding;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

const BACKUP_SUFFIX: &str = "_original";
const TEMP_SUFFIX: &str = "_cyr";

pub(crate) fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    Encoding::for_label(label.as_bytes())
        .ok_or_else(|| Error::Precondition(format!("unsupported cue encoding: {}", label)))
}

/// `<cue>_original`, where the pre-conversion sheet is kept.
pub(crate) fn backup_path(cue: &Path) -> PathBuf {
    with_suffix(cue, BACKUP_SUFFIX)
}

fn temp_path(cue: &Path) -> PathBuf {
    with_suffix(cue, TEMP_SUFFIX)
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Refuses to convert over an existing `<cue>_original`; it may be the only
/// copy of the sheet's original bytes.
pub(crate) fn ensure_no_backup(cue: &Path) -> Result<()> {
    let backup = backup_path(cue);
    if backup.exists() {
        return Err(Error::Precondition(format!(
            "backup {} already exists; the cue sheet looks converted already \
(restore or remove the backup before using --cyrillic again)",
            backup.display()
        )));
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Normalized {
    Converted { backup: PathBuf },
    AlreadyUnicode,
}

/// Rewrites `cue` from `source` to UTF-8, keeping the original bytes at
/// `<cue>_original`. The original file is untouched unless every byte decodes.
pub(crate) fn normalize_cue(cue: &Path, source: &'static Encoding) -> Result<Normalized> {
    ensure_no_backup(cue)?;
    let backup = backup_path(cue);

    let bytes = fs::read(cue)
        .map_err(|err| Error::Io(format!("failed to read cue file {}: {}", cue.display(), err)))?;
    if std::str::from_utf8(&bytes).is_ok() {
        return Ok(Normalized::AlreadyUnicode);
    }

    let converted = convert_to_utf8(&bytes, source)?;

    let temp = temp_path(cue);
    if let Err(err) = fs::write(&temp, converted.as_bytes()) {
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(format!(
            "failed to write converted cue file {}: {}",
            temp.display(),
            err
        )));
    }

    if let Err(err) = fs::rename(cue, &backup) {
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(format!(
            "failed to back up cue file {} -> {}: {}",
            cue.display(),
            backup.display(),
            err
        )));
    }

    if let Err(err) = fs::rename(&temp, cue) {
        let _ = fs::rename(&backup, cue);
        let _ = fs::remove_file(&temp);
        return Err(Error::Io(format!(
            "failed to replace cue file {}: {}",
            cue.display(),
            err
        )));
    }

    Ok(Normalized::Converted { backup })
}

fn convert_to_utf8(bytes: &[u8], source: &'static Encoding) -> Result<String> {
    source
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| {
            Error::Precondition(format!(
                "cue sheet is not valid {} text; conversion aborted",
                source.name()
            ))
        })
}

/// Moves `<cue>_original` back over `cue`. Returns whether a backup existed.
pub(crate) fn restore_backup(cue: &Path) -> Result<bool> {
    let backup = backup_path(cue);
    if !backup.exists() {
        return Ok(false);
    }
    fs::rename(&backup, cue).map_err(|err| {
        Error::Io(format!(
            "failed to restore cue file {} from {}: {}",
            cue.display(),
            backup.display(),
            err
        ))
    })?;
    Ok(true)
}

/// Drops `<cue>_original` once the converted sheet is final.
pub(crate) fn discard_backup(cue: &Path) -> Result<bool> {
    let backup = backup_path(cue);
    if !backup.exists() {
        return Ok(false);
    }
    fs::remove_file(&backup).map_err(|err| {
        Error::Io(format!(
            "failed to remove cue backup {}: {}",
            backup.display(),
            err
        ))
    })?;
    Ok(true)
}
