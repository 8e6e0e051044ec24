use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cleanup::Cleanup;
use crate::tools::ToolSet;
use crate::types::{AudioFormat, ResolvedPaths};
use crate::{Error, Result};

/// Output naming: `<n>. <performer> - <title>.flac`.
pub(crate) const TRACK_NAME_TEMPLATE: &str = "%n. %p - %t";

pub(crate) fn transcode_path(audio: &Path) -> PathBuf {
    audio.with_extension("flac")
}

pub(crate) fn transcoder_args(input: &Path, output: &Path) -> Vec<OsString> {
    vec![
        "-hide_banner".into(),
        "-nostdin".into(),
        "-n".into(),
        "-i".into(),
        input.into(),
        output.into(),
    ]
}

pub(crate) fn splitter_args(cue: &Path, output_dir: &Path, input: &Path) -> Vec<OsString> {
    vec![
        "-f".into(),
        cue.into(),
        "-o".into(),
        "flac".into(),
        "-d".into(),
        output_dir.into(),
        "-t".into(),
        TRACK_NAME_TEMPLATE.into(),
        input.into(),
    ]
}

/// Splits the audio image into one FLAC file per track in `root_dir`,
/// transcoding formats the splitter cannot read first.
pub(crate) fn split_audio(
    tools: &ToolSet,
    paths: &ResolvedPaths,
    cleanup: &mut Cleanup,
    verbose: bool,
) -> Result<()> {
    let format = paths.audio_format().ok_or_else(|| {
        Error::Precondition(format!(
            "unsupported audio file: {}",
            paths.audio_file.display()
        ))
    })?;

    let input = if format.needs_transcode() {
        transcode(tools, &paths.audio_file, format, cleanup, verbose)?
    } else {
        paths.audio_file.clone()
    };

    tools.splitter.run(
        &splitter_args(&paths.cue_file, &paths.root_dir, &input),
        "splitting",
        verbose,
    )?;

    if input != paths.audio_file {
        fs::remove_file(&input).map_err(|err| {
            Error::Io(format!(
                "failed to remove intermediate file {}: {}",
                input.display(),
                err
            ))
        })?;
        cleanup.release_intermediate();
    }

    Ok(())
}

fn transcode(
    tools: &ToolSet,
    audio: &Path,
    format: AudioFormat,
    cleanup: &mut Cleanup,
    verbose: bool,
) -> Result<PathBuf> {
    let output = transcode_path(audio);
    if output.exists() {
        return Err(Error::Precondition(format!(
            "cannot transcode {}: {} already exists",
            audio.display(),
            output.display()
        )));
    }

    // Tracked before spawning; a partial output must be removable.
    cleanup.track_intermediate(output.clone());
    let message = format!("converting {} to FLAC", format);
    tools
        .transcoder
        .run(&transcoder_args(audio, &output), &message, verbose)?;

    if !output.is_file() {
        return Err(Error::Io(format!(
            "transcoder reported success but {} was not created",
            output.display()
        )));
    }
    Ok(output)
}
