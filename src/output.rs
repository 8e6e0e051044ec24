use dialoguer::console::{Key, Term};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::ffi::OsString;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};

use crate::cleanup::CleanupReport;
use crate::cli::{RunConfig, display_path};
use crate::cue::CueText;
use crate::split::{TRACK_NAME_TEMPLATE, transcode_path};
use crate::tools::ToolSet;
use crate::types::ResolvedPaths;

pub(crate) fn print_plan(config: &RunConfig, paths: &ResolvedPaths, cue: &CueText, tools: &ToolSet) {
    let base = Some(paths.root_dir.as_path());

    eprintln!("{}", "Plan".bold());
    eprintln!("  {} {}", "Directory:".cyan(), paths.root_dir.display());
    let format = match paths.audio_format() {
        Some(format) if format.needs_transcode() => format!(
            "{} (via {})",
            format,
            display_path(base, &transcode_path(&paths.audio_file)).display()
        ),
        Some(format) => format.to_string(),
        None => "unknown".to_string(),
    };
    eprintln!(
        "  {} {} {}",
        "Input:".cyan(),
        display_path(base, &paths.audio_file).display(),
        format.dimmed()
    );
    eprintln!(
        "  {} {}",
        "CUE:".cyan(),
        display_path(base, &paths.cue_file).display()
    );
    if config.cyrillic_fix {
        eprintln!(
            "  {} {}",
            "CUE encoding:".cyan(),
            format!("{} -> UTF-8", config.source_encoding.name()).green()
        );
    }
    eprintln!(
        "  {} {} {}",
        "Tracks:".cyan(),
        cue.track_count(),
        format!("named \"{}.flac\"", TRACK_NAME_TEMPLATE).dimmed()
    );
    for tool in [&tools.transcoder, &tools.splitter, &tools.tagger]
        .into_iter()
        .chain(tools.codecs.iter())
    {
        eprintln!(
            "  {} {}",
            format!("{}:", tool.role().label()).cyan(),
            tool.program().display().to_string().dimmed()
        );
    }
}

pub(crate) fn warn(message: &str) {
    eprintln!("{} {}", "warning:".yellow().bold(), message.yellow());
}

pub(crate) fn print_summary(root: &Path, tracks: &[PathBuf]) {
    println!(
        "{} {} tracks written to {}",
        "Done:".green().bold(),
        tracks.len(),
        root.display()
    );
    for track in tracks {
        println!("  {}", display_path(Some(root), track).display().bold());
    }
}

pub(crate) fn print_cleanup_report(root: &Path, report: &CleanupReport) {
    for path in &report.removed {
        eprintln!(
            "{} {}",
            "Removed".red().bold(),
            display_path(Some(root), path).display().to_string().red()
        );
    }
    if let Some(cue) = &report.restored_cue {
        eprintln!(
            "{} {}",
            "Restored".yellow().bold(),
            display_path(Some(root), cue).display().to_string().yellow()
        );
    }
    for error in &report.errors {
        warn(error);
    }
}

pub(crate) fn make_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr_with_hz(10));
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg} {elapsed:.dim}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    pb
}

pub(crate) fn format_command(program: &Path, args: &[OsString]) -> String {
    std::iter::once(program.as_os_str())
        .chain(args.iter().map(OsString::as_os_str))
        .map(|part| {
            let part = part.to_string_lossy();
            if part.is_empty() || part.contains(char::is_whitespace) || part.contains('%') {
                format!("\"{}\"", part)
            } else {
                part.into_owned()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn print_command(program: &Path, args: &[OsString]) {
    eprintln!("{} {}", "$".dimmed(), format_command(program, args).dimmed());
}

/// Asks on the terminal whether to delete `path`, reading a single key.
/// Only `y`/`Y` confirms; any other key, or no terminal, keeps the file.
pub(crate) fn confirm_delete(path: &Path, root: &Path) -> bool {
    if !io::stdin().is_terminal() || !io::stdout().is_terminal() {
        eprintln!(
            "{}",
            format!(
                "not a terminal; keeping {}",
                display_path(Some(root), path).display()
            )
            .dimmed()
        );
        return false;
    }

    let term = Term::stdout();
    let prompt = format!(
        "Delete {}? [y/N] ",
        display_path(Some(root), path).display()
    );
    if let Err(err) = term.write_str(&prompt) {
        warn(&format!("failed to show prompt: {}", err));
        return false;
    }
    let key = term.read_key();
    let _ = term.write_line("");
    match key {
        Ok(key) => answer_deletes(&key),
        Err(err) => {
            warn(&format!("failed to read answer: {}", err));
            false
        }
    }
}

fn answer_deletes(key: &Key) -> bool {
    matches!(key, Key::Char('y' | 'Y'))
}
