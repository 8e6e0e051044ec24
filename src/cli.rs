use clap::Parser;
use encoding_rs::{Encoding, WINDOWS_1251};
use std::path::{Path, PathBuf};

use crate::encoding::resolve_encoding;
use crate::tools::ToolNames;
use crate::types::SourceAction;
use crate::{Error, Result};

/// Split a single-file album image into per-track FLAC files using its CUE sheet.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub(crate) struct Args {
    /// Convert the CUE sheet from a legacy Cyrillic code page to UTF-8 first
    #[arg(short = 'c', long)]
    pub(crate) cyrillic: bool,
    /// Legacy encoding of the CUE sheet (implies --cyrillic)
    #[arg(long, value_name = "ENCODING")]
    pub(crate) cue_encoding: Option<String>,
    /// Delete the source audio file after a successful split without asking
    #[arg(long, conflicts_with = "keep_original")]
    pub(crate) delete_original: bool,
    /// Keep the source audio file without asking
    #[arg(long)]
    pub(crate) keep_original: bool,
    /// Echo external commands and show their output
    #[arg(short = 'v', long)]
    pub(crate) verbose: bool,
    /// Decoder/encoder used to turn APE images into FLAC
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_TRANSCODER",
        default_value = "ffmpeg",
        help_heading = "External tools"
    )]
    pub(crate) transcoder: PathBuf,
    /// CUE-driven splitter
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_SPLITTER",
        default_value = "shnsplit",
        help_heading = "External tools"
    )]
    pub(crate) splitter: PathBuf,
    /// Copies CUE metadata onto the tracks
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_TAGGER",
        default_value = "cuetag",
        help_heading = "External tools"
    )]
    pub(crate) tagger: PathBuf,
    /// FLAC codec used by the splitter
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_FLAC",
        default_value = "flac",
        help_heading = "External tools"
    )]
    pub(crate) flac_bin: PathBuf,
    /// Monkey's Audio codec used by the splitter
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_APE",
        default_value = "mac",
        help_heading = "External tools"
    )]
    pub(crate) ape_bin: PathBuf,
    /// WavPack codec used by the splitter for .wv images
    #[arg(
        long,
        value_name = "BIN",
        env = "CUE2FLAC_WAVPACK",
        default_value = "wvunpack",
        help_heading = "External tools"
    )]
    pub(crate) wavpack_bin: PathBuf,
    /// Directory holding the CUE sheet and the audio image
    #[arg(value_name = "DIR")]
    pub(crate) dir: PathBuf,
}

#[derive(Debug, Clone)]
pub(crate) struct RunConfig {
    pub(crate) target_dir: PathBuf,
    pub(crate) cyrillic_fix: bool,
    pub(crate) source_encoding: &'static Encoding,
    pub(crate) source_action: SourceAction,
    pub(crate) verbose: bool,
    pub(crate) tools: ToolNames,
}

impl RunConfig {
    pub(crate) fn from_args(args: Args, cwd: &Path) -> Result<Self> {
        let source_encoding = match args.cue_encoding.as_deref() {
            Some(label) => resolve_encoding(label)?,
            None => WINDOWS_1251,
        };
        let cyrillic_fix = args.cyrillic || args.cue_encoding.is_some();

        let source_action = if args.delete_original {
            SourceAction::Delete
        } else if args.keep_original {
            SourceAction::Keep
        } else {
            SourceAction::Ask
        };

        let target_dir = if args.dir.is_absolute() {
            args.dir
        } else {
            cwd.join(args.dir)
        };
        if !target_dir.is_dir() {
            return Err(Error::Precondition(format!(
                "not a directory: {}",
                target_dir.display()
            )));
        }

        Ok(Self {
            target_dir,
            cyrillic_fix,
            source_encoding,
            source_action,
            verbose: args.verbose,
            tools: ToolNames {
                transcoder: args.transcoder,
                splitter: args.splitter,
                tagger: args.tagger,
                flac: args.flac_bin,
                ape: args.ape_bin,
                wavpack: args.wavpack_bin,
            },
        })
    }
}

pub(crate) fn display_path(base: Option<&Path>, path: &Path) -> PathBuf {
    if let Some(base) = base
        && let Ok(rel) = path.strip_prefix(base)
    {
        if rel.as_os_str().is_empty() {
            return PathBuf::from(".");
        }
        return rel.to_path_buf();
    }
    path.to_path_buf()
}
