//! Argument parsing and command dispatch.

use std::io;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use kulooc_firebase::session::{DEFAULT_FIRESTORE_URL, DEFAULT_IDENTITY_URL, DEFAULT_RULES_URL};
use kulooc_telemetry::{DEFAULT_LOG_LEVEL, LoggingConfig, init_logging};
use tracing::Instrument;
use uuid::Uuid;

use crate::client::{AppContext, CliError, CliResult};
use crate::commands::drivers::handle_list_drivers;
use crate::commands::indexes::handle_deploy_indexes;
use crate::commands::purge::handle_purge_drivers;
use crate::commands::rules::handle_deploy_rules;
use crate::commands::test_driver::handle_create_test_driver;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CREDENTIALS: &str = "firebase-credentials.json";
const DEFAULT_RULES_FILE: &str = "firestore.rules";
const DEFAULT_INDEX_WAIT_SECS: u64 = 10;
const DEFAULT_PURGE_FIRST_NAME: &str = "Jean-Pierre";

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let logging = LoggingConfig {
        level: &cli.log_level,
        ..LoggingConfig::default()
    };
    if let Err(err) = init_logging(&logging) {
        let err = CliError::validation(err.to_string());
        eprintln!("❌ Erreur: {}", err.display_message());
        return err.exit_code();
    }

    let trace_id = Uuid::new_v4();
    let span = tracing::info_span!(
        "kulooc_admin",
        command = command_label(&cli.command),
        %trace_id
    );

    match dispatch(cli).instrument(span).await {
        Ok(()) => 0,
        Err(err) => {
            let message = err.display_message();
            tracing::debug!(%trace_id, exit_code = err.exit_code(), "command failed");
            eprintln!("\n❌ Erreur: {message}");
            err.exit_code()
        }
    }
}

async fn dispatch(cli: Cli) -> CliResult<()> {
    let ctx = AppContext::from_cli(&cli)?;
    let mut out = io::stdout();

    match cli.command {
        Command::DeployRules(args) => handle_deploy_rules(&ctx, args, &mut out).await,
        Command::DeployIndexes(args) => handle_deploy_indexes(&ctx, args, &mut out).await,
        Command::ListDrivers => handle_list_drivers(&ctx, &mut out).await,
        Command::CreateTestDriver => handle_create_test_driver(&ctx, &mut out).await,
        Command::PurgeDrivers(args) => handle_purge_drivers(&ctx, args, &mut out).await,
    }
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::DeployRules(_) => "deploy-rules",
        Command::DeployIndexes(_) => "deploy-indexes",
        Command::ListDrivers => "list-drivers",
        Command::CreateTestDriver => "create-test-driver",
        Command::PurgeDrivers(_) => "purge-drivers",
    }
}

#[derive(Parser)]
#[command(
    name = "kulooc-admin",
    about = "Administrative tooling for the KULOOC Firebase project"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        env = "KULOOC_CREDENTIALS",
        default_value = DEFAULT_CREDENTIALS,
        help = "Service-account key file"
    )]
    pub(crate) credentials: PathBuf,
    #[arg(
        long,
        global = true,
        env = "KULOOC_HTTP_TIMEOUT_SECS",
        default_value_t = DEFAULT_TIMEOUT_SECS
    )]
    pub(crate) timeout: u64,
    #[arg(
        long,
        global = true,
        env = "KULOOC_FIRESTORE_URL",
        default_value = DEFAULT_FIRESTORE_URL
    )]
    pub(crate) firestore_url: String,
    #[arg(
        long,
        global = true,
        env = "KULOOC_RULES_URL",
        default_value = DEFAULT_RULES_URL
    )]
    pub(crate) rules_url: String,
    #[arg(
        long,
        global = true,
        env = "KULOOC_IDENTITY_URL",
        default_value = DEFAULT_IDENTITY_URL
    )]
    pub(crate) identity_url: String,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        default_value = DEFAULT_LOG_LEVEL,
        help = "Log level or filter directive; RUST_LOG takes precedence"
    )]
    pub(crate) log_level: String,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Publish a Firestore security rules file.
    DeployRules(DeployRulesArgs),
    /// Create the composite indexes the app queries need.
    DeployIndexes(DeployIndexesArgs),
    /// Print every driver record.
    ListDrivers,
    /// Create the sample driver, or set it back online.
    CreateTestDriver,
    /// Delete drivers by first name, with their documents and Auth accounts.
    PurgeDrivers(PurgeDriversArgs),
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DeployRulesArgs {
    #[arg(long, env = "KULOOC_RULES_FILE", default_value = DEFAULT_RULES_FILE)]
    pub(crate) rules_file: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct DeployIndexesArgs {
    #[arg(
        long,
        default_value_t = DEFAULT_INDEX_WAIT_SECS,
        help = "Seconds to wait for each index build before moving on"
    )]
    pub(crate) wait_secs: u64,
}

#[derive(Args, Debug, Clone)]
pub(crate) struct PurgeDriversArgs {
    #[arg(long, default_value = DEFAULT_PURGE_FIRST_NAME)]
    pub(crate) first_name: String,
    #[arg(long, help = "Skip the confirmation prompt")]
    pub(crate) yes: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}
