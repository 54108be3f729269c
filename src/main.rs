use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use quotawatch::commands::{run_monitor, run_parse};
use quotawatch::config::{Command, Config, Settings};

fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug, cli.is_verbose());

    match run(&cli) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Config) -> Result<u8> {
    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(cli);
    settings.validate();

    match &cli.command {
        Command::Parse(args) => run_parse(&settings, args),
        Command::Monitor(_) => {
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            let result = runtime.block_on(run_monitor(&settings));
            // An in-flight inference request must not hold up exit after Ctrl-C
            runtime.shutdown_timeout(Duration::from_secs(1));
            result
        }
    }
}

fn setup_logging(debug: bool, verbose: bool) {
    let default = if debug {
        "quotawatch=debug,quotawatch_core=debug"
    } else if verbose {
        "quotawatch=info,quotawatch_core=info"
    } else {
        "quotawatch=warn,quotawatch_core=warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
