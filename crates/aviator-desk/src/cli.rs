//! Terminal front end.
//!
//! Two ways to drive the bridge:
//!
//! - **one-shot** – `aviator-desk ssc apps --search bank` runs one action,
//!   prints its status line and output, and exits non-zero on failure.
//! - **shell**    – `aviator-desk shell` reads subcommands line by line.  Each
//!   action runs in the background via [`spawn_action`]; results print as
//!   they complete, so a long audit does not block the prompt.
//!
//! Options left out on the command line fall back to the saved settings, the
//! same way the form fields of a desktop window would be pre-filled.

use std::fmt::Write as _;
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use aviator_core::{Severity, StatusLine};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::info;

use crate::application::ports::{NoProgress, ProgressSink, SettingsStore};
use crate::infrastructure::storage::config::DEFAULT_CONFIG_FILE;
use crate::infrastructure::ui_bridge::{
    self, spawn_action, AppState, CommandResult, MappingDto, SettingsDto,
};

/// Token name used when `--name` is not given.
pub const DEFAULT_TOKEN_NAME: &str = "aviator_token";

const SHELL_PROMPT: &str = "aviator> ";

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Drives the fcli Aviator and SSC commands and OpenSSL key generation.
#[derive(Debug, Parser)]
#[command(
    name = "aviator-desk",
    about = "Workflow driver for fcli Aviator/SSC audits and OpenSSL key generation",
    version
)]
pub struct Cli {
    /// Path of the INI settings file.
    #[arg(long, default_value = DEFAULT_CONFIG_FILE, env = "AVIATOR_CONFIG")]
    pub config: PathBuf,

    /// Directory for the daily debug log files.
    #[arg(long, default_value = "logs", env = "AVIATOR_LOG_DIR")]
    pub log_dir: PathBuf,

    /// `fcli` executable name or path.
    #[arg(long, default_value = "fcli", env = "FCLI_BIN")]
    pub fcli: String,

    /// `openssl` executable name or path.
    #[arg(long, default_value = "openssl", env = "OPENSSL_BIN")]
    pub openssl: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check that fcli 3.5.1+ and openssl are installed.
    Check,
    /// RSA key pair for the Aviator server.
    #[command(subcommand)]
    Keys(KeysCommand),
    /// Aviator server registration.
    #[command(subcommand)]
    Server(ServerCommand),
    /// Aviator access tokens.
    #[command(subcommand)]
    Token(TokenCommand),
    /// SSC session and application versions.
    #[command(subcommand)]
    Ssc(SscCommand),
    /// Aviator session and applications.
    #[command(subcommand)]
    Aviator(AviatorCommand),
    /// SSC to Aviator application mappings.
    #[command(subcommand)]
    Map(MapCommand),
    /// Audits of mapped applications.
    #[command(subcommand)]
    Audit(AuditCommand),
    /// Saved settings.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Interactive shell; actions run in the background.
    Shell,
}

#[derive(Debug, Subcommand)]
pub enum KeysCommand {
    /// Generate an RSA-4096 key pair with openssl.
    Generate {
        /// Private key file; the public key is written next to it.
        #[arg(long)]
        path: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum ServerCommand {
    /// Register the Aviator server with fcli.
    Configure {
        #[arg(long)]
        url: Option<String>,
        #[arg(long)]
        tenant: Option<String>,
        #[arg(long)]
        private_key: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Mint a token and save it to a file.
    Generate {
        #[arg(long)]
        email: Option<String>,
        #[arg(long, default_value = DEFAULT_TOKEN_NAME)]
        name: String,
        /// Where to save the token.
        #[arg(long)]
        file: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum SscCommand {
    /// Log into SSC and list application versions.
    Login {
        #[arg(long)]
        url: Option<String>,
        #[arg(long, short = 'u')]
        username: Option<String>,
        /// Prompted for when neither given nor set in the environment.
        #[arg(long, short = 'p', env = "SSC_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// List SSC application versions.
    Apps {
        /// Case-insensitive filter on application or version name.
        #[arg(long)]
        search: Option<String>,
    },
}

#[derive(Debug, Subcommand)]
pub enum AviatorCommand {
    /// Log into Aviator with a token file.
    Login {
        /// Token file; defaults to the last generated or used one.
        #[arg(long)]
        token: Option<String>,
    },
    /// List Aviator applications.
    Apps {
        #[arg(long)]
        search: Option<String>,
    },
    /// Create an Aviator application.
    CreateApp { name: String },
}

#[derive(Debug, Subcommand)]
pub enum MapCommand {
    /// Map one SSC application version onto an Aviator application.
    Add { ssc_app: String, aviator_app: String },
    /// Map several SSC versions at once.
    ///
    /// With one --aviator app every SSC version maps onto it; with several,
    /// both lists are sorted and paired 1:1.
    Bulk {
        #[arg(long = "ssc", required = true, num_args = 1..)]
        ssc_apps: Vec<String>,
        #[arg(long = "aviator", required = true, num_args = 1..)]
        aviator_apps: Vec<String>,
    },
    /// Remove the mapping of an SSC application version.
    Remove { ssc_app: String },
    /// Show all mappings.
    List,
}

#[derive(Debug, Subcommand)]
pub enum AuditCommand {
    /// Audit a mapped SSC application version.
    Run {
        /// SSC `name:version` key, or `SSC|AVIATOR`.
        mapping: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the saved settings.
    Show,
}

/// One shell line: a subcommand without the binary name.
#[derive(Debug, Parser)]
#[command(name = "aviator", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

// ── Rendering ─────────────────────────────────────────────────────────────────

/// What the terminal prints for one finished action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub success: bool,
    pub status: StatusLine,
    pub body: Option<String>,
}

impl Rendered {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            status: StatusLine::error(message),
            body: None,
        }
    }

    fn pending(message: &str) -> Self {
        Self {
            success: true,
            status: StatusLine::pending(message),
            body: None,
        }
    }

    pub fn print(&self) {
        println!("{}", colour(&self.status));
        if let Some(body) = self.body.as_deref().filter(|b| !b.is_empty()) {
            println!("{body}");
        }
    }
}

fn colour(status: &StatusLine) -> String {
    let text = status.to_string();
    match status.severity {
        Severity::Pending => style(text).yellow().to_string(),
        Severity::Success => style(text).green().to_string(),
        Severity::Warning => style(text).color256(214).to_string(),
        Severity::Error => style(text).red().bold().to_string(),
    }
}

fn render<T: Serialize>(result: CommandResult<T>, body: impl FnOnce(&T) -> Option<String>) -> Rendered {
    let body = result.data.as_ref().and_then(body);
    Rendered {
        success: result.success,
        status: result.status,
        body,
    }
}

/// Two left-aligned columns under a header.
fn table<'a>(headers: [&str; 2], rows: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let rows: Vec<(&str, &str)> = rows.into_iter().collect();
    if rows.is_empty() {
        return "(none)".to_string();
    }
    let width = rows
        .iter()
        .map(|(left, _)| left.chars().count())
        .chain(std::iter::once(headers[0].len()))
        .max()
        .unwrap_or_default();

    let mut out = format!("{:<width$}  {}", headers[0], headers[1]);
    for (left, right) in rows {
        let _ = write!(out, "\n{left:<width$}  {right}");
    }
    out
}

fn mapping_table(rows: &[MappingDto]) -> String {
    table(
        ["SSC APPLICATION VERSION", "AVIATOR APPLICATION"],
        rows.iter()
            .map(|m| (m.ssc_app.as_str(), m.aviator_app.as_str())),
    )
}

fn format_settings(dto: &SettingsDto) -> String {
    let s = &dto.settings;
    let mut out = format!("# {}\n", dto.path);
    let _ = writeln!(out, "[server]");
    let _ = writeln!(out, "url = {}", s.server.url);
    let _ = writeln!(out, "tenant = {}", s.server.tenant);
    let _ = writeln!(out, "private_key_path = {}", s.server.private_key_path);
    let _ = writeln!(out, "\n[tokens]");
    let _ = writeln!(out, "current_token_file = {}", s.tokens.current_token_file);
    let _ = writeln!(out, "token_email = {}", s.tokens.token_email);
    let _ = writeln!(out, "\n[ssc]");
    let _ = writeln!(out, "url = {}", s.ssc.url);
    let _ = writeln!(out, "username = {}", s.ssc.username);
    let _ = writeln!(out, "last_session = {}", s.ssc.last_session);
    let _ = write!(out, "\n[app_mappings]");
    for (ssc_app, aviator_app) in s.mappings.iter() {
        let _ = write!(out, "\n{ssc_app} = {aviator_app}");
    }
    out
}

// ── Progress ──────────────────────────────────────────────────────────────────

/// Audit progress as an `indicatif` bar (one-shot mode).
struct BarProgress {
    bar: ProgressBar,
}

impl BarProgress {
    fn new() -> Self {
        let bar = ProgressBar::new(100);
        let bar_style = ProgressStyle::with_template("{spinner} [{bar:40}] {pos:>3}% {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> ");
        bar.set_style(bar_style);
        Self { bar }
    }
}

impl ProgressSink for BarProgress {
    fn report(&self, percent: u8, message: &str) {
        self.bar.set_position(u64::from(percent));
        self.bar.set_message(message.to_string());
    }
}

/// Audit progress as pending status lines at the 20 % milestones (shell mode,
/// where a bar would fight with the prompt).
struct MilestoneProgress;

impl ProgressSink for MilestoneProgress {
    fn report(&self, percent: u8, message: &str) {
        if percent % 20 == 0 && percent < 100 {
            Rendered::pending(message).print();
        }
    }
}

// ── Dispatch ──────────────────────────────────────────────────────────────────

/// Status shown while an action runs.
fn pending_message(command: &Command) -> Option<&'static str> {
    Some(match command {
        Command::Check => "Checking prerequisites...",
        Command::Keys(_) => "Generating keys...",
        Command::Server(_) => "Configuring server...",
        Command::Token(_) => "Generating token...",
        Command::Ssc(SscCommand::Login { .. }) => "Logging into SSC...",
        Command::Ssc(SscCommand::Apps { .. }) => "Loading SSC applications...",
        Command::Aviator(AviatorCommand::Login { .. }) => "Logging into Aviator...",
        Command::Aviator(AviatorCommand::Apps { .. }) => "Loading Aviator applications...",
        Command::Aviator(AviatorCommand::CreateApp { .. }) => "Creating Aviator app...",
        Command::Audit(_) => "Starting audit...",
        Command::Map(_) | Command::Config(_) | Command::Shell => return None,
    })
}

/// Fills in a missing SSC password from an interactive prompt.
///
/// # Errors
///
/// A rendered error when the terminal cannot be read.
pub async fn resolve_password(command: &mut Command) -> Result<(), Rendered> {
    if let Command::Ssc(SscCommand::Login { password, .. }) = command {
        if password.is_none() {
            let prompted =
                tokio::task::spawn_blocking(|| rpassword::prompt_password("SSC password: ")).await;
            match prompted {
                Ok(Ok(value)) => *password = Some(value),
                Ok(Err(e)) => return Err(Rendered::error(format!("could not read password: {e}"))),
                Err(e) => return Err(Rendered::error(format!("password prompt failed: {e}"))),
            }
        }
    }
    Ok(())
}

/// Runs one command against the bridge and renders the result.
pub async fn execute(
    state: Arc<AppState>,
    command: Command,
    progress: Arc<dyn ProgressSink>,
) -> Rendered {
    let settings = state.config.lock().await.settings();

    match command {
        Command::Check => render(ui_bridge::check_prerequisites(state).await, |_| None),

        Command::Keys(KeysCommand::Generate { path }) => {
            let path = path.unwrap_or(settings.server.private_key_path);
            render(ui_bridge::generate_keys(state, path).await, |keys| {
                keys.public_key_pem.clone()
            })
        }

        Command::Server(ServerCommand::Configure {
            url,
            tenant,
            private_key,
        }) => {
            let result = ui_bridge::configure_server(
                state,
                url.unwrap_or(settings.server.url),
                tenant.unwrap_or(settings.server.tenant),
                private_key.unwrap_or(settings.server.private_key_path),
            )
            .await;
            render(result, |_| None)
        }

        Command::Token(TokenCommand::Generate { email, name, file }) => {
            let result = ui_bridge::generate_token(
                state,
                email.unwrap_or(settings.tokens.token_email),
                name,
                file.unwrap_or(settings.tokens.current_token_file),
            )
            .await;
            render(result, |_| None)
        }

        Command::Ssc(SscCommand::Login {
            url,
            username,
            password,
        }) => {
            let result = ui_bridge::login_ssc(
                state,
                url.unwrap_or(settings.ssc.url),
                username.unwrap_or(settings.ssc.username),
                password.unwrap_or_default(),
            )
            .await;
            render(result, |login| {
                Some(table(
                    ["SSC APPLICATION VERSION", "ID"],
                    login.apps.iter().map(|a| (a.key.as_str(), a.id.as_str())),
                ))
            })
        }

        Command::Ssc(SscCommand::Apps { search }) => {
            render(ui_bridge::list_ssc_apps(state, search).await, |apps| {
                Some(table(
                    ["SSC APPLICATION VERSION", "ID"],
                    apps.iter().map(|a| (a.key.as_str(), a.id.as_str())),
                ))
            })
        }

        Command::Aviator(AviatorCommand::Login { token }) => {
            render(ui_bridge::login_aviator(state, token).await, |_| None)
        }

        Command::Aviator(AviatorCommand::Apps { search }) => {
            render(ui_bridge::list_aviator_apps(state, search).await, |apps| {
                Some(table(
                    ["AVIATOR APPLICATION", "ID"],
                    apps.iter().map(|a| (a.name.as_str(), a.id.as_str())),
                ))
            })
        }

        Command::Aviator(AviatorCommand::CreateApp { name }) => {
            render(ui_bridge::create_aviator_app(state, name).await, |created| {
                Some(table(
                    ["AVIATOR APPLICATION", "ID"],
                    created.apps.iter().map(|a| (a.name.as_str(), a.id.as_str())),
                ))
            })
        }

        Command::Map(map) => {
            let result = match map {
                MapCommand::Add {
                    ssc_app,
                    aviator_app,
                } => ui_bridge::add_mapping(state, ssc_app, aviator_app).await,
                MapCommand::Bulk {
                    ssc_apps,
                    aviator_apps,
                } => ui_bridge::add_bulk_mappings(state, ssc_apps, aviator_apps).await,
                MapCommand::Remove { ssc_app } => ui_bridge::remove_mapping(state, ssc_app).await,
                MapCommand::List => ui_bridge::get_mappings(state).await,
            };
            render(result, |rows| Some(mapping_table(rows)))
        }

        Command::Audit(AuditCommand::Run { mapping }) => {
            render(ui_bridge::run_audit(state, mapping, progress).await, |report| {
                Some(report.text.clone())
            })
        }

        Command::Config(ConfigCommand::Show) => {
            render(ui_bridge::get_settings(state).await, |dto| {
                Some(format_settings(dto))
            })
        }

        Command::Shell => Rendered::error("Already in the interactive shell"),
    }
}

/// Runs one command in the foreground and prints the result.
pub async fn run_once(state: Arc<AppState>, command: Command) -> ExitCode {
    if let Some(message) = pending_message(&command) {
        Rendered::pending(message).print();
    }

    let rendered = if matches!(command, Command::Audit(_)) {
        let progress = Arc::new(BarProgress::new());
        let rendered = execute(state, command, Arc::clone(&progress) as Arc<dyn ProgressSink>).await;
        progress.bar.finish_and_clear();
        rendered
    } else {
        execute(state, command, Arc::new(NoProgress)).await
    };

    rendered.print();
    if rendered.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ── Interactive shell ─────────────────────────────────────────────────────────

/// What one shell line asks for.
#[derive(Debug)]
enum ShellInput {
    Empty,
    Exit,
    /// Help or a usage error, already formatted by clap.
    Message(String),
    Run(Command),
}

fn parse_shell_line(line: &str) -> ShellInput {
    let words = match split_words(line) {
        Ok(words) => words,
        Err(message) => return ShellInput::Message(message),
    };
    match words.first().map(String::as_str) {
        None => ShellInput::Empty,
        Some("exit" | "quit") => ShellInput::Exit,
        Some(_) => match ShellLine::try_parse_from(words) {
            Ok(parsed) => ShellInput::Run(parsed.command),
            Err(e) => ShellInput::Message(e.render().to_string()),
        },
    }
}

/// Splits a line into words, honouring single and double quotes.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), c) => current.push(c),
            (None, '"' | '\'') => {
                quote = Some(c);
                in_word = true;
            }
            (None, c) if c.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            (None, c) => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if let Some(q) = quote {
        return Err(format!("unterminated {q} quote"));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn prompt() {
    print!("{SHELL_PROMPT}");
    let _ = std::io::stdout().flush();
}

/// Reads commands from stdin until `exit` or end of input.
///
/// Prerequisites are checked in the background as soon as the shell starts.
///
/// # Errors
///
/// Propagates stdin read failures.
pub async fn run_shell(state: Arc<AppState>) -> std::io::Result<()> {
    let (results, mut finished) = mpsc::unbounded_channel::<Rendered>();
    let progress: Arc<dyn ProgressSink> = Arc::new(MilestoneProgress);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Aviator Desk shell. Type `help` for commands, `exit` to quit.");
    Rendered::pending("Checking prerequisites...").print();
    spawn_action(
        execute(Arc::clone(&state), Command::Check, Arc::clone(&progress)),
        results.clone(),
    );
    prompt();

    loop {
        tokio::select! {
            Some(rendered) = finished.recv() => rendered.print(),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_shell_line(&line) {
                    ShellInput::Empty => {}
                    ShellInput::Exit => break,
                    ShellInput::Message(message) => println!("{message}"),
                    ShellInput::Run(mut command) => match resolve_password(&mut command).await {
                        Err(rendered) => rendered.print(),
                        Ok(()) => {
                            if let Some(message) = pending_message(&command) {
                                Rendered::pending(message).print();
                            }
                            spawn_action(
                                execute(Arc::clone(&state), command, Arc::clone(&progress)),
                                results.clone(),
                            );
                        }
                    },
                }
                prompt();
            }
        }
    }
    info!("interactive shell closed");
    Ok(())
}
