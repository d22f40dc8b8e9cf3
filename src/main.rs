mod cli;

use clap::Parser;
use tracing::Level;
use tracing_subscriber::EnvFilter;
use voicetutor::VoiceError;

fn init_logging(verbose: bool) {
    let filter_level = if verbose { Level::DEBUG } else { Level::INFO };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(filter_level.into()))
        .with_writer(std::io::stderr) // Keep stdout for command output
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::time())
        .init();
}

fn main() {
    // Parse CLI early to check verbose flag before full initialization
    match cli::Cli::try_parse() {
        Ok(cli) => {
            init_logging(cli.verbose);

            tracing::debug!("Verbose mode enabled");
            tracing::debug!("Starting voicetutor v{}", env!("CARGO_PKG_VERSION"));

            if let Err(e) = cli::run(cli) {
                eprintln!("Error: {:#}", e);
                if let Some(suggestion) = e
                    .downcast_ref::<VoiceError>()
                    .and_then(VoiceError::suggestion)
                {
                    eprintln!("Suggestion: {}", suggestion);
                }
                std::process::exit(1);
            }
        }
        Err(e) => {
            use clap::error::ErrorKind;

            match e.kind() {
                ErrorKind::DisplayVersion | ErrorKind::DisplayHelp => {
                    e.print().ok();
                    std::process::exit(0);
                }
                ErrorKind::InvalidSubcommand => {
                    let cmd = cli::extract_command_from_error(&e.to_string());
                    eprintln!("error: unknown command: {}", cmd);
                    eprintln!("\nValid commands are: {}", cli::COMMAND_NAMES.join(", "));
                    std::process::exit(2);
                }
                _ => {
                    e.print().ok();
                    std::process::exit(2);
                }
            }
        }
    }
}
