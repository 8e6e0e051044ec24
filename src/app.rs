use clap::Parser;
use owo_colors::OwoColorize;
use std::fs;
use std::path::PathBuf;

use crate::cleanup::Cleanup;
use crate::cli::{Args, RunConfig, display_path};
use crate::cue::references_audio;
use crate::encoding::{Normalized, ensure_no_backup, normalize_cue};
use crate::interrupt;
use crate::output::{confirm_delete, print_cleanup_report, print_plan, print_summary, warn};
use crate::scan::resolve_paths;
use crate::split::split_audio;
use crate::tag::tag_tracks;
use crate::tools::ToolSet;
use crate::types::{ResolvedPaths, SourceAction};
use crate::{Error, Result};

pub fn run() -> Result<()> {
    let args = Args::try_parse()?;
    let cwd = std::env::current_dir()
        .map_err(|err| Error::Io(format!("failed to get current directory: {}", err)))?;
    let config = RunConfig::from_args(args, &cwd)?;

    let (paths, cue) = resolve_paths(&config.target_dir)?;
    if !references_audio(&cue, &paths.audio_file) {
        warn(&format!(
            "cue sheet FILE entry does not match {}; splitting it anyway",
            display_path(Some(paths.root_dir.as_path()), &paths.audio_file).display()
        ));
    }
    if config.cyrillic_fix {
        ensure_no_backup(&paths.cue_file)?;
    }
    let tools = ToolSet::locate(&config.tools, paths.audio_format())?;
    print_plan(&config, &paths, &cue, &tools);

    interrupt::install()?;
    let mut cleanup = Cleanup::new(&paths)?;
    let tracks = match process(&config, &paths, &tools, &mut cleanup) {
        Ok(tracks) => tracks,
        Err(err) => {
            let report = match err {
                Error::Interrupted(_) => cleanup.after_interrupt(),
                _ => cleanup.after_failure(),
            };
            print_cleanup_report(&paths.root_dir, &report);
            return Err(err);
        }
    };
    interrupt::uninstall()?;

    print_summary(&paths.root_dir, &tracks);
    handle_source(&config, &paths)
}

/// Normalize, split, tag. Every step ends at an interrupt checkpoint.
fn process(
    config: &RunConfig,
    paths: &ResolvedPaths,
    tools: &ToolSet,
    cleanup: &mut Cleanup,
) -> Result<Vec<PathBuf>> {
    interrupt::checkpoint()?;

    if config.cyrillic_fix {
        match normalize_cue(&paths.cue_file, config.source_encoding)? {
            Normalized::Converted { .. } => {
                cleanup.track_backup();
                eprintln!(
                    "{} {} from {}",
                    "Converted".green().bold(),
                    display_path(Some(paths.root_dir.as_path()), &paths.cue_file).display(),
                    config.source_encoding.name()
                );
            }
            Normalized::AlreadyUnicode => {
                warn("cue sheet is already UTF-8; skipping conversion")
            }
        }
        interrupt::checkpoint()?;
    }

    split_audio(tools, paths, cleanup, config.verbose)?;
    interrupt::checkpoint()?;

    let tracks = cleanup.manifest().created()?;
    tag_tracks(tools, &paths.cue_file, &tracks, config.verbose)?;
    interrupt::checkpoint()?;

    cleanup.commit()?;
    Ok(tracks)
}

fn handle_source(config: &RunConfig, paths: &ResolvedPaths) -> Result<()> {
    let delete = match config.source_action {
        SourceAction::Delete => true,
        SourceAction::Keep => false,
        SourceAction::Ask => confirm_delete(&paths.audio_file, &paths.root_dir),
    };
    if !delete {
        return Ok(());
    }

    fs::remove_file(&paths.audio_file).map_err(|err| {
        Error::Io(format!(
            "split succeeded, but failed to delete original file {}: {}",
            paths.audio_file.display(),
            err
        ))
    })?;
    println!(
        "{} {}",
        "Deleted".red().bold(),
        display_path(Some(paths.root_dir.as_path()), &paths.audio_file)
            .display()
            .to_string()
            .red()
    );
    Ok(())
}

