//! Error types and error handling
//!
//! [`RenderError`] covers everything that can go wrong while serving a single
//! request and maps to an HTTP response. [`StartupError`] covers broken
//! deployments and aborts the process before the listener is bound.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::error::Error as _;
use std::num::ParseIntError;
use std::path::PathBuf;
use thiserror::Error;

/// Request-scoped rendering error
#[derive(Debug, Error)]
pub enum RenderError {
    /// A numeric query parameter could not be parsed
    #[error("invalid value {value:?} for parameter `{name}': {source}")]
    InvalidParameter {
        /// Parameter name
        name: &'static str,
        /// Raw value as received
        value: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },

    /// The requested template does not exist (uncached mode only)
    #[error("no such template `{0}'")]
    TemplateNotFound(String),

    /// Neither the requested nor the fallback template exists
    #[error("unable to find default template `{0}'")]
    NoDefaultTemplate(String),

    /// Template file exists but could not be read
    #[error("failed to read template `{name}': {source}")]
    ReadFailed {
        /// Template name
        name: String,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Template engine failed while parsing or executing a template
    #[error("{0}")]
    Template(#[from] minijinja::Error),

    /// The blocking render task panicked or was cancelled
    #[error("render task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RenderError {
    /// Whether the error was caused by the request rather than the deployment
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidParameter { .. })
    }

    /// Error message followed by every underlying cause
    ///
    /// Template engine errors carry the interesting part (a failing filter,
    /// for example) in their source chain.
    #[must_use]
    pub fn detailed_message(&self) -> String {
        let mut message = self.to_string();
        if let Self::Template(err) = self {
            let mut source = err.source();
            while let Some(cause) = source {
                message.push_str(": ");
                message.push_str(&cause.to_string());
                source = cause.source();
            }
        }
        message
    }
}

impl IntoResponse for RenderError {
    fn into_response(self) -> Response {
        let message = self.detailed_message();
        if self.is_client_error() {
            tracing::debug!(error = %message, "Rejected render parameters");
        } else {
            tracing::error!(error = %message, "Render failed");
        }

        (StatusCode::INTERNAL_SERVER_ERROR, message).into_response()
    }
}

/// Fatal error detected while starting the service
#[derive(Debug, Error)]
pub enum StartupError {
    /// Template directory could not be listed
    #[error("failed to scan template directory {}: {source}", path.display())]
    ScanFailed {
        /// Directory being scanned
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A template file could not be read
    #[error("failed to read template {}: {source}", path.display())]
    ReadFailed {
        /// File being read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An explicitly named configuration file does not exist
    #[error("configuration file {} not found", .0.display())]
    ConfigNotFound(PathBuf),

    /// Cached mode has no fallback template
    #[error("unable to find default template `{0}'")]
    MissingFallback(String),

    /// No listening port configured
    #[error("$PORT must be set")]
    PortNotSet,

    /// Listening port is not a valid port number
    #[error("invalid port {value:?}: {source}")]
    InvalidPort {
        /// Raw value as configured
        value: String,
        /// Underlying parse failure
        #[source]
        source: ParseIntError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_error() -> ParseIntError {
        "abc".parse::<u32>().unwrap_err()
    }

    #[test]
    fn test_invalid_parameter_message() {
        let err = RenderError::InvalidParameter {
            name: "width",
            value: "abc".to_string(),
            source: parse_error(),
        };
        assert!(err.is_client_error());
        assert_eq!(
            err.to_string(),
            "invalid value \"abc\" for parameter `width': invalid digit found in string"
        );
    }

    #[test]
    fn test_template_errors_are_not_client_errors() {
        assert!(!RenderError::TemplateNotFound("nope".to_string()).is_client_error());
        assert!(!RenderError::NoDefaultTemplate("terminal".to_string()).is_client_error());
    }

    #[test]
    fn test_detailed_message_includes_cause() {
        let cause = minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, "bad width");
        let err = RenderError::Template(
            minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, "filter failed")
                .with_source(cause),
        );
        let message = err.detailed_message();
        assert!(message.contains("filter failed"));
        assert!(message.contains("bad width"));
    }

    #[tokio::test]
    async fn test_task_failure_is_a_server_error() {
        let join_error = tokio::spawn(async { panic!("render panicked") })
            .await
            .unwrap_err();
        let err = RenderError::from(join_error);
        assert!(!err.is_client_error());
        assert!(err.to_string().starts_with("render task failed"));
        assert_eq!(err.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_into_response_status() {
        let response = RenderError::TemplateNotFound("nope".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let response = RenderError::InvalidParameter {
            name: "padding",
            value: "-1".to_string(),
            source: "-1".parse::<u32>().unwrap_err(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_startup_error_messages() {
        assert_eq!(StartupError::PortNotSet.to_string(), "$PORT must be set");
        assert_eq!(
            StartupError::MissingFallback("terminal".to_string()).to_string(),
            "unable to find default template `terminal'"
        );
        assert_eq!(
            StartupError::ConfigNotFound(PathBuf::from("/etc/typo.toml")).to_string(),
            "configuration file /etc/typo.toml not found"
        );
    }
}
