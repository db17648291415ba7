//! Session context and error types shared by the command handlers.

use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use anyhow::anyhow;
use kulooc_firebase::{Endpoints, FirebaseError, FirebaseSession};

use crate::cli::{Cli, OutputFormat};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 1,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

/// Map a library error onto the CLI's validation/failure split.
pub(crate) fn classify_firebase_error(err: FirebaseError) -> CliError {
    match err {
        FirebaseError::InvalidUrl { value, source } => {
            CliError::validation(format!("URL d'API invalide '{value}': {source}"))
        }
        FirebaseError::CredentialMissing { path } => CliError::failure(anyhow!(
            "Fichier de credentials introuvable: {}",
            path.display()
        )),
        other => CliError::failure(other),
    }
}

/// Application context passed to command handlers.
#[derive(Debug, Clone)]
pub(crate) struct AppContext {
    pub(crate) session: FirebaseSession,
    pub(crate) output: OutputFormat,
}

impl AppContext {
    /// Load credentials and build the API clients named by the global flags.
    pub(crate) fn from_cli(cli: &Cli) -> CliResult<Self> {
        let endpoints = Endpoints {
            firestore: cli.firestore_url.clone(),
            rules: cli.rules_url.clone(),
            identity: cli.identity_url.clone(),
        };
        let session = FirebaseSession::connect(
            &cli.credentials,
            &endpoints,
            Duration::from_secs(cli.timeout),
        )
        .map_err(classify_firebase_error)?;
        tracing::debug!(project_id = session.project_id(), "session ready");
        Ok(Self {
            session,
            output: cli.output,
        })
    }
}
