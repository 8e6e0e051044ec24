use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::cue::{CueText, validate_cue_text};
use crate::types::{AudioFormat, ResolvedPaths};
use crate::{Error, Result};

/// Locates the CUE sheet and the audio image under `root` and checks the sheet.
/// Nothing on disk is modified.
pub(crate) fn resolve_paths(root: &Path) -> Result<(ResolvedPaths, CueText)> {
    let cue_file = find_single_cue(root)?;
    let cue = CueText::read(&cue_file)?;
    validate_cue_text(&cue)?;
    let audio_file = find_single_audio(root)?;

    Ok((
        ResolvedPaths {
            cue_file,
            audio_file,
            root_dir: root.to_path_buf(),
        },
        cue,
    ))
}

fn find_single_cue(root: &Path) -> Result<PathBuf> {
    let mut matches = find_files(root, &["cue"])?;
    match matches.len() {
        0 => Err(Error::Precondition(format!(
            "no cue sheets found in {}",
            root.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::Precondition(format!(
            "multiple cue sheets found in {}; remove extras:\n{}",
            root.display(),
            format_list(&matches)
        ))),
    }
}

fn find_single_audio(root: &Path) -> Result<PathBuf> {
    let extensions: Vec<&str> = AudioFormat::ALL
        .iter()
        .map(|format| format.extension())
        .collect();
    let mut matches = find_files(root, &extensions)?;
    match matches.len() {
        0 => Err(Error::Precondition(format!(
            "no audio file (.{}) found in {}",
            extensions.join(", ."),
            root.display()
        ))),
        1 => Ok(matches.remove(0)),
        _ => Err(Error::Precondition(format!(
            "multiple audio files found in {}; remove extras:\n{}",
            root.display(),
            format_list(&matches)
        ))),
    }
}

/// Regular files under `root` (recursively, hidden entries skipped) whose
/// extension matches one of `extensions` case-insensitively. Sorted.
pub(crate) fn find_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));
    for entry in walker {
        let entry = entry.map_err(|err| {
            Error::Io(format!(
                "failed to read directory {}: {}",
                root.display(),
                err
            ))
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let ext = match entry.path().extension().and_then(|ext| ext.to_str()) {
            Some(ext) => ext.to_ascii_lowercase(),
            None => continue,
        };
        if extensions.contains(&ext.as_str()) {
            matches.push(entry.into_path());
        }
    }
    matches.sort();
    Ok(matches)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn format_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("    {}", path.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::{find_files, resolve_paths};
    use crate::Error;
    use crate::tests::{SIMPLE_CUE, unique_test_dir};
    use std::fs;

    fn listing(dir: &std::path::Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn resolves_single_pair() {
        let dir = unique_test_dir("scan-pair");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();
        fs::write(dir.join("album.flac"), b"fLaC").unwrap();
        fs::write(dir.join("cover.jpg"), b"").unwrap();

        let (paths, cue) = resolve_paths(&dir).unwrap();
        assert_eq!(paths.cue_file, dir.join("album.cue"));
        assert_eq!(paths.audio_file, dir.join("album.flac"));
        assert_eq!(paths.root_dir, dir);
        assert_eq!(cue.track_count(), 3);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_missing_and_extra_cue_sheets_without_touching_files() {
        let dir = unique_test_dir("scan-cue-count");
        fs::create_dir_all(dir.join("scans")).unwrap();
        fs::write(dir.join("album.flac"), b"fLaC").unwrap();

        let err = resolve_paths(&dir).unwrap_err();
        assert!(matches!(err, Error::Precondition(_)));
        assert!(err.to_string().starts_with("no cue sheets found"));

        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();
        fs::write(dir.join("scans").join("other.CUE"), SIMPLE_CUE).unwrap();
        let before = listing(&dir);
        let err = resolve_paths(&dir).unwrap_err();
        assert!(err.to_string().starts_with("multiple cue sheets found"));
        assert_eq!(listing(&dir), before);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn rejects_multiple_audio_files() {
        let dir = unique_test_dir("scan-audio-count");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();
        fs::write(dir.join("album.flac"), b"fLaC").unwrap();
        fs::write(dir.join("album.wav"), b"RIFF").unwrap();

        let err = resolve_paths(&dir).unwrap_err();
        assert!(err.to_string().starts_with("multiple audio files found"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn missing_audio_is_fatal() {
        let dir = unique_test_dir("scan-no-audio");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();

        let err = resolve_paths(&dir).unwrap_err();
        assert!(err.to_string().starts_with("no audio file"));

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn skips_hidden_entries() {
        let dir = unique_test_dir("scan-hidden");
        fs::create_dir_all(dir.join(".trash")).unwrap();
        fs::write(dir.join(".trash").join("old.cue"), SIMPLE_CUE).unwrap();
        fs::write(dir.join("._album.cue"), b"").unwrap();
        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();

        assert_eq!(find_files(&dir, &["cue"]).unwrap(), vec![dir.join("album.cue")]);

        fs::remove_dir_all(&dir).unwrap();
    }
}
