use std::collections::BTreeSet;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::encoding::{discard_backup, restore_backup};
use crate::types::ResolvedPaths;
use crate::{Error, Result};

/// Numbered track output: name starts with a digit and ends in `.flac`.
pub(crate) fn is_numbered_flac(path: &Path) -> bool {
    let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
        return false;
    };
    let starts_with_digit = name.chars().next().is_some_and(|ch| ch.is_ascii_digit());
    let is_flac = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("flac"));
    starts_with_digit && is_flac
}

fn numbered_flac_files(dir: &Path) -> Result<BTreeSet<PathBuf>> {
    let read_dir = fs::read_dir(dir).map_err(|err| {
        Error::Io(format!("failed to read directory {}: {}", dir.display(), err))
    })?;
    let mut files = BTreeSet::new();
    for entry in read_dir {
        let entry = entry
            .map_err(|err| Error::Io(format!("failed to read directory entry: {}", err)))?;
        let path = entry.path();
        if path.is_file() && is_numbered_flac(&path) {
            files.insert(path);
        }
    }
    Ok(files)
}

/// Track files written by this run: whatever numbered FLAC files appeared in
/// the output directory since the snapshot, never the source image itself.
#[derive(Debug)]
pub(crate) struct TrackManifest {
    root_dir: PathBuf,
    preexisting: BTreeSet<PathBuf>,
    source_name: Option<OsString>,
}

impl TrackManifest {
    pub(crate) fn snapshot(paths: &ResolvedPaths) -> Result<Self> {
        Ok(Self {
            root_dir: paths.root_dir.clone(),
            preexisting: numbered_flac_files(&paths.root_dir)?,
            source_name: paths.audio_file.file_name().map(OsString::from),
        })
    }

    pub(crate) fn created(&self) -> Result<Vec<PathBuf>> {
        let current = numbered_flac_files(&self.root_dir)?;
        Ok(current
            .into_iter()
            .filter(|path| !self.preexisting.contains(path))
            .filter(|path| path.file_name() != self.source_name.as_deref())
            .collect())
    }
}

#[derive(Debug, Default)]
pub(crate) struct CleanupReport {
    pub(crate) removed: Vec<PathBuf>,
    pub(crate) restored_cue: Option<PathBuf>,
    pub(crate) errors: Vec<String>,
}

/// Everything needed to put the directory back the way the run found it.
pub(crate) struct Cleanup {
    cue_file: PathBuf,
    manifest: TrackManifest,
    intermediate: Option<PathBuf>,
    owns_backup: bool,
}

impl Cleanup {
    pub(crate) fn new(paths: &ResolvedPaths) -> Result<Self> {
        Ok(Self {
            cue_file: paths.cue_file.clone(),
            manifest: TrackManifest::snapshot(paths)?,
            intermediate: None,
            owns_backup: false,
        })
    }

    pub(crate) fn manifest(&self) -> &TrackManifest {
        &self.manifest
    }

    /// Registers a transcode output this run is responsible for.
    pub(crate) fn track_intermediate(&mut self, path: PathBuf) {
        self.intermediate = Some(path);
    }

    pub(crate) fn release_intermediate(&mut self) {
        self.intermediate = None;
    }

    /// Marks `<cue>_original` as written by this run. A backup the run did
    /// not create is never restored or removed.
    pub(crate) fn track_backup(&mut self) {
        self.owns_backup = true;
    }

    /// Drops this run's CUE backup once every stage has succeeded.
    pub(crate) fn commit(&mut self) -> Result<()> {
        if self.owns_backup {
            discard_backup(&self.cue_file)?;
            self.owns_backup = false;
        }
        Ok(())
    }

    /// Removes this run's track files and transcode, and restores the CUE sheet.
    /// Keeps going past individual failures.
    pub(crate) fn after_interrupt(&mut self) -> CleanupReport {
        let mut report = CleanupReport::default();
        match self.manifest.created() {
            Ok(files) => {
                for file in files {
                    remove(&file, &mut report);
                }
            }
            Err(err) => report.errors.push(err.to_string()),
        }
        self.finish(report)
    }

    /// Like [`Cleanup::after_interrupt`] but leaves track files for inspection.
    pub(crate) fn after_failure(&mut self) -> CleanupReport {
        self.finish(CleanupReport::default())
    }

    fn finish(&mut self, mut report: CleanupReport) -> CleanupReport {
        if let Some(intermediate) = self.intermediate.take()
            && intermediate.exists()
        {
            remove(&intermediate, &mut report);
        }
        if self.owns_backup {
            match restore_backup(&self.cue_file) {
                Ok(true) => report.restored_cue = Some(self.cue_file.clone()),
                Ok(false) => {}
                Err(err) => report.errors.push(err.to_string()),
            }
            self.owns_backup = false;
        }
        report
    }
}

fn remove(path: &Path, report: &mut CleanupReport) {
    match fs::remove_file(path) {
        Ok(()) => report.removed.push(path.to_path_buf()),
        Err(err) => report
            .errors
            .push(format!("failed to remove {}: {}", path.display(), err)),
    }
}

#[cfg(test)]
mod tests {
    use super::{Cleanup, is_numbered_flac};
    use crate::encoding::backup_path;
    use crate::tests::{SIMPLE_CUE, unique_test_dir};
    use crate::types::ResolvedPaths;
    use std::fs;
    use std::path::Path;

    #[test]
    fn numbered_flac_pattern() {
        assert!(is_numbered_flac(Path::new("/a/01. Artist - One.flac")));
        assert!(is_numbered_flac(Path::new("9.FLAC")));
        assert!(!is_numbered_flac(Path::new("/a/album.flac")));
        assert!(!is_numbered_flac(Path::new("/a/01. One.wav")));
        assert!(!is_numbered_flac(Path::new("/a/01.flac.part")));
    }

    fn fixture(label: &str, audio: &str) -> (std::path::PathBuf, ResolvedPaths) {
        let dir = unique_test_dir(label);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("album.cue"), SIMPLE_CUE).unwrap();
        fs::write(dir.join(audio), b"source").unwrap();
        let paths = ResolvedPaths {
            cue_file: dir.join("album.cue"),
            audio_file: dir.join(audio),
            root_dir: dir.clone(),
        };
        (dir, paths)
    }

    #[test]
    fn interrupt_removes_only_new_tracks_and_restores_cue() {
        let (dir, paths) = fixture("cleanup-interrupt", "1 album.flac");
        let mut cleanup = Cleanup::new(&paths).unwrap();

        fs::write(dir.join("01. A - One.flac"), b"").unwrap();
        fs::write(dir.join("02. A - Two.flac"), b"").unwrap();
        fs::write(dir.join("notes.txt"), b"").unwrap();
        fs::write(backup_path(&paths.cue_file), b"legacy").unwrap();
        cleanup.track_backup();

        let report = cleanup.after_interrupt();
        assert!(report.errors.is_empty(), "{:?}", report.errors);
        assert_eq!(report.removed.len(), 2);
        assert_eq!(report.restored_cue.as_deref(), Some(paths.cue_file.as_path()));

        assert!(dir.join("1 album.flac").is_file());
        assert!(dir.join("notes.txt").is_file());
        assert!(!dir.join("01. A - One.flac").exists());
        assert!(!backup_path(&paths.cue_file).exists());
        assert_eq!(fs::read(&paths.cue_file).unwrap(), b"legacy");

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn failure_keeps_tracks_but_drops_intermediate() {
        let (dir, paths) = fixture("cleanup-failure", "album.ape");
        let mut cleanup = Cleanup::new(&paths).unwrap();

        let intermediate = dir.join("album.flac");
        fs::write(&intermediate, b"").unwrap();
        cleanup.track_intermediate(intermediate.clone());
        fs::write(dir.join("01. A - One.flac"), b"").unwrap();

        assert_eq!(cleanup.manifest().created().unwrap(), vec![dir.join("01. A - One.flac")]);

        let report = cleanup.after_failure();
        assert_eq!(report.removed, vec![intermediate.clone()]);
        assert!(report.restored_cue.is_none());
        assert!(!intermediate.exists());
        assert!(dir.join("01. A - One.flac").is_file());
        assert!(dir.join("album.ape").is_file());

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn backup_left_by_someone_else_is_never_touched() {
        let (dir, paths) = fixture("cleanup-foreign-backup", "album.flac");
        let backup = backup_path(&paths.cue_file);
        fs::write(&backup, b"user keepsake").unwrap();

        let mut cleanup = Cleanup::new(&paths).unwrap();
        let report = cleanup.after_interrupt();
        assert!(report.restored_cue.is_none());
        cleanup.commit().unwrap();

        assert_eq!(fs::read(&backup).unwrap(), b"user keepsake");
        assert_eq!(fs::read_to_string(&paths.cue_file).unwrap(), SIMPLE_CUE);

        fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn commit_discards_only_this_runs_backup() {
        let (dir, paths) = fixture("cleanup-commit", "album.flac");
        let backup = backup_path(&paths.cue_file);
        let mut cleanup = Cleanup::new(&paths).unwrap();

        fs::write(&backup, b"legacy").unwrap();
        cleanup.track_backup();
        cleanup.commit().unwrap();
        assert!(!backup.exists());

        let report = cleanup.after_failure();
        assert!(report.restored_cue.is_none());
        assert_eq!(fs::read_to_string(&paths.cue_file).unwrap(), SIMPLE_CUE);

        fs::remove_dir_all(&dir).unwrap();
    }
}
