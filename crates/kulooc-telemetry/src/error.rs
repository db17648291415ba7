//! Error types for telemetry operations.

use std::error::Error;
use std::fmt::{self, Display, Formatter};

use tracing_subscriber::filter::ParseError;
use tracing_subscriber::util::TryInitError;

/// Result alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Errors raised by telemetry helpers.
#[derive(Debug)]
pub enum TelemetryError {
    /// The configured level is not a valid filter directive.
    InvalidFilter {
        /// Directive that failed to parse.
        directive: String,
        /// Underlying parse error.
        source: ParseError,
    },
    /// Installing the tracing subscriber failed.
    SubscriberInstall {
        /// Underlying tracing subscriber error.
        source: TryInitError,
    },
}

impl Display for TelemetryError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter { directive, .. } => {
                write!(formatter, "invalid log filter `{directive}`")
            }
            Self::SubscriberInstall { .. } => {
                formatter.write_str("failed to install tracing subscriber")
            }
        }
    }
}

impl Error for TelemetryError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidFilter { source, .. } => Some(source),
            Self::SubscriberInstall { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::util::SubscriberInitExt;

    fn try_init_error() -> std::result::Result<TryInitError, Box<dyn Error>> {
        match tracing_subscriber::registry().try_init() {
            Ok(()) => match tracing_subscriber::registry().try_init() {
                Ok(()) => Err(io::Error::other("expected init error").into()),
                Err(err) => Ok(err),
            },
            Err(err) => Ok(err),
        }
    }

    #[test]
    fn telemetry_error_display_and_source() -> std::result::Result<(), Box<dyn Error>> {
        let parse_error = EnvFilter::try_new("kulooc=loud")
            .err()
            .ok_or_else(|| io::Error::other("expected parse error"))?;
        let cases = vec![
            (
                TelemetryError::InvalidFilter {
                    directive: "kulooc=loud".into(),
                    source: parse_error,
                },
                "invalid log filter `kulooc=loud`",
            ),
            (
                TelemetryError::SubscriberInstall {
                    source: try_init_error()?,
                },
                "failed to install tracing subscriber",
            ),
        ];

        for (err, message) in cases {
            assert_eq!(err.to_string(), message);
            assert!(err.source().is_some());
        }
        Ok(())
    }
}
