use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::tools::ToolSet;
use crate::{Error, Result};

pub(crate) fn tagger_args(cue: &Path, tracks: &[PathBuf]) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::with_capacity(tracks.len() + 1);
    args.push(cue.into());
    args.extend(tracks.iter().map(OsString::from));
    args
}

/// Copies CUE metadata onto the split tracks, in track order.
pub(crate) fn tag_tracks(
    tools: &ToolSet,
    cue: &Path,
    tracks: &[PathBuf],
    verbose: bool,
) -> Result<()> {
    if tracks.is_empty() {
        return Err(Error::Io(
            "the splitter finished but produced no numbered .flac files".to_string(),
        ));
    }
    let message = format!("tagging {} tracks", tracks.len());
    tools
        .tagger
        .run(&tagger_args(cue, tracks), &message, verbose)
}

#[cfg(test)]
mod tests {
    use super::tagger_args;
    use std::ffi::OsString;
    use std::path::{Path, PathBuf};

    #[test]
    fn cue_comes_first() {
        let tracks = vec![
            PathBuf::from("/m/01. A - One.flac"),
            PathBuf::from("/m/02. A - Two.flac"),
        ];
        let args = tagger_args(Path::new("/m/album.cue"), &tracks);
        assert_eq!(
            args,
            vec![
                OsString::from("/m/album.cue"),
                OsString::from("/m/01. A - One.flac"),
                OsString::from("/m/02. A - Two.flac"),
            ]
        );
    }
}
