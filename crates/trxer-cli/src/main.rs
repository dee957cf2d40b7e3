//! Trxer CLI - converts a TRX file into `<file>.html`

use clap::{CommandFactory, Parser};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use trxer::{ConvertOptions, EmbeddedAssets, TrxerError};

#[derive(Parser)]
#[command(name = "trxer")]
#[command(version)]
#[command(about = "Convert a TRX test-results file into a self-contained HTML report", long_about = None)]
struct Cli {
    /// TRX file to convert; the report is written next to it as <file>.html
    input: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "trxer=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stdout)
                .with_ansi(std::io::stdout().is_terminal())
                .with_target(false)
                .without_time(),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(TrxerError::MissingArgument) => {
            println!("{}", Cli::command().render_usage());
            ExitCode::from(TrxerError::MissingArgument.exit_code())
        }
        Err(err) => {
            debug!(code = err.exit_code(), "conversion failed");
            eprintln!("error: {err}");
            ExitCode::from(err.exit_code())
        }
    }
}

fn run(cli: Cli) -> trxer::Result<()> {
    let input = cli.input.ok_or(TrxerError::MissingArgument)?;
    debug!(input = %input.display(), "converting");
    let options = ConvertOptions::new(input, &EmbeddedAssets);
    trxer::convert(&options)?;
    Ok(())
}
