//! Entry point for the command-line interface.
#![forbid(unsafe_code)]

fn main() {
    env_logger::init();
    if let Err(err) = tourlane_cli::run() {
        eprintln!("tourlane: {err}");
        std::process::exit(1);
    }
}
