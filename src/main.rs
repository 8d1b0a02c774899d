use specrouter::cli::run_cli;
use specrouter::logging::{init_logging, LogConfig};

fn main() {
    if let Err(e) = LogConfig::from_env().and_then(|config| init_logging(&config)) {
        eprintln!("warning: logging disabled: {e:#}");
    }
    match run_cli() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            std::process::exit(2);
        }
    }
}
