//! Aviator Desk: entry point.
//!
//! Drives the `fcli` Aviator and SSC commands and `openssl` key generation
//! from the terminal.  Settings persist in an INI file between runs.
//!
//! # Usage
//!
//! ```text
//! aviator-desk [OPTIONS] <COMMAND>
//!
//! Commands:
//!   check    Check that fcli 3.5.1+ and openssl are installed
//!   keys     RSA key pair for the Aviator server
//!   server   Aviator server registration
//!   token    Aviator access tokens
//!   ssc      SSC session and application versions
//!   aviator  Aviator session and applications
//!   map      SSC to Aviator application mappings
//!   audit    Audits of mapped applications
//!   config   Saved settings
//!   shell    Interactive shell; actions run in the background
//! ```
//!
//! # Environment variable overrides
//!
//! | Variable          | Default      | Description                      |
//! |-------------------|--------------|----------------------------------|
//! | `AVIATOR_CONFIG`  | `config.ini` | Settings file                    |
//! | `AVIATOR_LOG_DIR` | `logs`       | Directory for daily log files    |
//! | `FCLI_BIN`        | `fcli`       | fcli executable                  |
//! | `OPENSSL_BIN`     | `openssl`    | openssl executable               |
//! | `SSC_PASSWORD`    | (prompted)   | Password for `ssc login`         |
//! | `RUST_LOG`        | `warn`       | Console log filter               |

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use aviator_desk::application::services::Programs;
use aviator_desk::cli::{self, Cli, Command};
use aviator_desk::infrastructure::logging;
use aviator_desk::infrastructure::process::SystemRunner;
use aviator_desk::infrastructure::storage::config::ConfigStore;
use aviator_desk::infrastructure::ui_bridge::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let log_path = logging::init(&cli.log_dir).context("failed to initialise logging")?;
    info!(
        "Aviator Desk v{} starting (log file {})",
        env!("CARGO_PKG_VERSION"),
        log_path.display()
    );

    let store = ConfigStore::open(&cli.config)
        .with_context(|| format!("failed to open configuration {}", cli.config.display()))?;
    let programs = Programs {
        fcli: cli.fcli,
        openssl: cli.openssl,
    };
    let state = Arc::new(AppState::new(store, Arc::new(SystemRunner), programs));

    let mut command = cli.command;
    if matches!(command, Command::Shell) {
        cli::run_shell(state).await.context("interactive shell failed")?;
        return Ok(ExitCode::SUCCESS);
    }

    if let Err(rendered) = cli::resolve_password(&mut command).await {
        rendered.print();
        return Ok(ExitCode::FAILURE);
    }
    Ok(cli::run_once(state, command).await)
}
