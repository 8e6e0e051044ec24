use owo_colors::OwoColorize;

fn main() {
    if let Err(err) = cue2flac::run() {
        let code = err.exit_code();
        match &err {
            cue2flac::Error::Usage(usage) => {
                let _ = usage.print();
            }
            cue2flac::Error::Interrupted(_) => {
                eprintln!("{} {}", "aborted:".yellow().bold(), err);
            }
            _ => {
                eprintln!("{} {}", "error:".red().bold(), err);
            }
        }
        std::process::exit(code);
    }
}
