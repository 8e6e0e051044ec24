use std::env;
use std::ffi::{OsStr, OsString};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use crate::interrupt;
use crate::output::{format_command, make_spinner, print_command};
use crate::types::AudioFormat;
use crate::{Error, Result};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Capability an external program fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Role {
    Transcoder,
    Splitter,
    Tagger,
    FlacCodec,
    ApeCodec,
    WavPackCodec,
}

impl Role {
    pub(crate) fn label(self) -> &'static str {
        match self {
            Role::Transcoder => "transcoder",
            Role::Splitter => "splitter",
            Role::Tagger => "tagger",
            Role::FlacCodec => "FLAC codec",
            Role::ApeCodec => "APE codec",
            Role::WavPackCodec => "WavPack codec",
        }
    }

    fn install_hint(self) -> &'static str {
        match self {
            Role::Transcoder => "install ffmpeg (apt install ffmpeg / brew install ffmpeg)",
            Role::Splitter => "install shntool (apt install shntool / brew install shntool)",
            Role::Tagger => "install cuetools (apt install cuetools / brew install cuetools)",
            Role::FlacCodec => "install flac (apt install flac / brew install flac)",
            Role::ApeCodec => "install Monkey's Audio (apt install monkeys-audio / brew install monkeys-audio)",
            Role::WavPackCodec => "install wavpack (apt install wavpack / brew install wavpack)",
        }
    }
}

/// Program names or paths chosen for each role.
#[derive(Debug, Clone)]
pub(crate) struct ToolNames {
    pub(crate) transcoder: PathBuf,
    pub(crate) splitter: PathBuf,
    pub(crate) tagger: PathBuf,
    pub(crate) flac: PathBuf,
    pub(crate) ape: PathBuf,
    pub(crate) wavpack: PathBuf,
}

#[derive(Debug, Clone)]
pub(crate) struct Tool {
    role: Role,
    program: PathBuf,
}

impl Tool {
    pub(crate) fn role(&self) -> Role {
        self.role
    }

    pub(crate) fn program(&self) -> &Path {
        &self.program
    }

    /// Runs the tool to completion. A signal received while it ran wins over
    /// its exit status, and the tool is killed once one is recorded.
    pub(crate) fn run(&self, args: &[OsString], message: &str, verbose: bool) -> Result<()> {
        let mut command = Command::new(&self.program);
        command.args(args).stdin(Stdio::null());

        // stdout belongs to the summary and the prompt.
        let spinner = if verbose {
            print_command(&self.program, args);
            command
                .stdout(Stdio::from(io::stderr()))
                .stderr(Stdio::inherit());
            None
        } else {
            command.stdout(Stdio::null()).stderr(Stdio::piped());
            Some(make_spinner(message))
        };
        let result = supervise(&mut command);
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        let (status, stderr) = result.map_err(|err| self.spawn_error(args, err))?;

        interrupt::checkpoint()?;

        if !status.success() {
            return Err(Error::Tool {
                role: self.role.label(),
                program: self.program.clone(),
                status,
                stderr,
            });
        }
        Ok(())
    }

    fn spawn_error(&self, args: &[OsString], err: io::Error) -> Error {
        Error::Io(format!(
            "failed to run {} `{}`: {}",
            self.role.label(),
            format_command(&self.program, args),
            err
        ))
    }
}

/// Resolved programs for one run.
#[derive(Debug, Clone)]
pub(crate) struct ToolSet {
    pub(crate) transcoder: Tool,
    pub(crate) splitter: Tool,
    pub(crate) tagger: Tool,
    pub(crate) codecs: Vec<Tool>,
}

impl ToolSet {
    /// Resolves every tool the run needs against `PATH`, reporting all missing
    /// ones at once.
    pub(crate) fn locate(names: &ToolNames, input: Option<AudioFormat>) -> Result<Self> {
        Self::locate_in(names, input, env::var_os("PATH").as_deref())
    }

    pub(crate) fn locate_in(
        names: &ToolNames,
        input: Option<AudioFormat>,
        path_var: Option<&OsStr>,
    ) -> Result<Self> {
        let mut wanted = vec![
            (Role::Transcoder, &names.transcoder),
            (Role::Splitter, &names.splitter),
            (Role::Tagger, &names.tagger),
            (Role::FlacCodec, &names.flac),
            (Role::ApeCodec, &names.ape),
        ];
        if input == Some(AudioFormat::WavPack) {
            wanted.push((Role::WavPackCodec, &names.wavpack));
        }

        let mut found = Vec::with_capacity(wanted.len());
        let mut missing = Vec::new();
        for (role, name) in wanted {
            match find_program(name, path_var) {
                Some(program) => found.push(Tool { role, program }),
                None => missing.push(format!(
                    "    {} `{}` not found: {}",
                    role.label(),
                    name.display(),
                    role.install_hint()
                )),
            }
        }
        if !missing.is_empty() {
            return Err(Error::Precondition(format!(
                "missing required tools:\n{}",
                missing.join("\n")
            )));
        }

        let mut take = |role: Role| -> Result<Tool> {
            let index = found
                .iter()
                .position(|tool| tool.role == role)
                .ok_or_else(|| Error::Precondition(format!("{} not resolved", role.label())))?;
            Ok(found.remove(index))
        };
        let transcoder = take(Role::Transcoder)?;
        let splitter = take(Role::Splitter)?;
        let tagger = take(Role::Tagger)?;

        Ok(Self {
            transcoder,
            splitter,
            tagger,
            codecs: found,
        })
    }
}

/// Waits for the child, killing it as soon as a termination signal has been
/// recorded. Returns the exit status and whatever it wrote to a piped stderr.
fn supervise(command: &mut Command) -> io::Result<(ExitStatus, String)> {
    let mut child = command.spawn()?;
    let reader = child.stderr.take().map(|mut pipe| {
        thread::spawn(move || {
            let mut buf = Vec::new();
            let _ = pipe.read_to_end(&mut buf);
            String::from_utf8_lossy(&buf).into_owned()
        })
    });

    let status = loop {
        if let Some(status) = child.try_wait()? {
            break status;
        }
        if interrupt::received().is_some() {
            let _ = child.kill();
            break child.wait()?;
        }
        thread::sleep(POLL_INTERVAL);
    };

    let stderr = reader
        .and_then(|handle| handle.join().ok())
        .unwrap_or_default();
    Ok((status, stderr))
}

/// Resolves `name` the way a shell would: names containing a separator are
/// taken as paths, bare names are looked up in `path_var`.
pub(crate) fn find_program(name: &Path, path_var: Option<&OsStr>) -> Option<PathBuf> {
    if name.components().count() > 1 || name.is_absolute() {
        return is_executable(name).then(|| name.to_path_buf());
    }
    let path_var = path_var?;
    env::split_paths(path_var)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(name))
        .find(|candidate| is_executable(candidate))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    match path.metadata() {
        Ok(meta) => meta.is_file() && meta.permissions().mode() & 0o111 != 0,
        Err(_) => false,
    }
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file() || path.with_extension("exe").is_file()
}
