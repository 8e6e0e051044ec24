use std::fmt;
use std::path::{Path, PathBuf};

/// Audio container the source image is stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AudioFormat {
    Ape,
    Flac,
    Wav,
    WavPack,
}

impl AudioFormat {
    pub(crate) const ALL: [AudioFormat; 4] = [
        AudioFormat::Ape,
        AudioFormat::Flac,
        AudioFormat::Wav,
        AudioFormat::WavPack,
    ];

    pub(crate) fn extension(self) -> &'static str {
        match self {
            AudioFormat::Ape => "ape",
            AudioFormat::Flac => "flac",
            AudioFormat::Wav => "wav",
            AudioFormat::WavPack => "wv",
        }
    }

    pub(crate) fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|format| format.extension() == ext)
    }

    /// The splitter cannot read this format directly and needs a FLAC copy first.
    pub(crate) fn needs_transcode(self) -> bool {
        matches!(self, AudioFormat::Ape)
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AudioFormat::Ape => "Monkey's Audio",
            AudioFormat::Flac => "FLAC",
            AudioFormat::Wav => "WAV",
            AudioFormat::WavPack => "WavPack",
        };
        f.write_str(name)
    }
}

/// Files the run operates on, resolved once from the target directory.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedPaths {
    pub(crate) cue_file: PathBuf,
    pub(crate) audio_file: PathBuf,
    pub(crate) root_dir: PathBuf,
}

impl ResolvedPaths {
    pub(crate) fn audio_format(&self) -> Option<AudioFormat> {
        AudioFormat::from_path(&self.audio_file)
    }
}

/// What to do with the source image after a successful split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SourceAction {
    Ask,
    Delete,
    Keep,
}
