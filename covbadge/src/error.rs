#![allow(non_shorthand_field_patterns)]
#![doc = "Error handling primitives shared across the badge service."]
// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! The derive emitted by [`masterror::Error`] expands pattern matches that
//! trigger the `non_shorthand_field_patterns` lint. The lint is disabled for
//! the module to keep the generated implementations warning-free.
//!
//! Variants fall into three groups that drive the HTTP mapping:
//!
//! * structural failures ([`Error::UpstreamUnavailable`], [`Error::NotFound`],
//!   [`Error::ReportUnparseable`], [`Error::Validation`]) mean the pipeline
//!   could not run to completion;
//! * content failures ([`Error::MetricUnavailable`]) mean the pipeline ran but
//!   the report had nothing to show;
//! * everything else is an internal fault.

use std::path::{Path, PathBuf};

/// Unified error type returned by the resolution pipeline, the renderer and
/// the CLI.
#[derive(Debug, masterror::Error)]
pub enum Error {
    /// The CI provider could not be reached or answered with a failure.
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        /// Human readable description of the failed call.
        message: String,
        /// HTTP status returned by the provider, when one was received.
        status:  Option<u16>
    },
    /// No artifact matched and no root prefix could be derived.
    #[error("artifact not found: {message}")]
    NotFound {
        /// Description of the target that could not be resolved.
        message: String
    },
    /// The fetched coverage report is not a well-formed Jacoco document.
    #[error("report unparseable: {message}")]
    ReportUnparseable {
        /// Description of the parse failure.
        message: String
    },
    /// A required counter is absent or yields a zero denominator.
    #[error("metric unavailable: {message}")]
    MetricUnavailable {
        /// Description of the missing metric.
        message: String
    },
    /// Returned when request parameters or route configuration are invalid.
    #[error("invalid input: {message}")]
    Validation {
        /// Human readable message describing the validation problem.
        message: String
    },
    /// Raster encoding failed.
    #[error("failed to render badge: {message}")]
    Render {
        /// Encoder diagnostic.
        message: String
    },
    /// Wraps I/O errors that occur while reading or writing local files.
    #[error("failed to access {path:?}: {source}")]
    Io {
        /// Location of the file.
        path:   PathBuf,
        /// Underlying I/O error.
        source: std::io::Error
    },
    /// Wraps YAML decoding errors of the route table.
    #[error("failed to parse route table: {source}")]
    Parse {
        /// Source decoding error from serde_yaml.
        source: serde_yaml::Error
    },
    /// Wraps serialization errors when printing the route table.
    #[error("failed to serialize output: {source}")]
    Serialize {
        /// Underlying serialization error.
        source: serde_json::Error
    },
    /// The HTTP listener could not be started.
    #[error("failed to listen on {address}: {source}")]
    Bind {
        /// Socket address requested by the configuration.
        address: String,
        /// Underlying I/O error.
        source:  std::io::Error
    }
}

impl Error {
    /// Constructs an upstream error carrying an optional HTTP status.
    pub fn upstream<M>(message: M, status: Option<u16>) -> Self
    where
        M: Into<String>
    {
        Self::UpstreamUnavailable {
            message: message.into(),
            status
        }
    }

    /// Constructs a not-found error.
    pub fn not_found<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::NotFound {
            message: message.into()
        }
    }

    /// Constructs a report parse error.
    pub fn unparseable<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::ReportUnparseable {
            message: message.into()
        }
    }

    /// Constructs a metric error.
    pub fn metric<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::MetricUnavailable {
            message: message.into()
        }
    }

    /// Constructs a validation error from the provided displayable value.
    ///
    /// # Parameters
    ///
    /// * `message` - Human-readable description of the validation failure.
    pub fn validation<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Validation {
            message: message.into()
        }
    }

    /// Constructs a render error.
    pub fn render<M>(message: M) -> Self
    where
        M: Into<String>
    {
        Self::Render {
            message: message.into()
        }
    }

    /// Returns the taxonomy name of the variant.
    ///
    /// The name is stable and is what `/report` failures and log lines show
    /// to operators.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::UpstreamUnavailable { .. } => "UpstreamUnavailable",
            Self::NotFound { .. } => "NotFound",
            Self::ReportUnparseable { .. } => "ReportUnparseable",
            Self::MetricUnavailable { .. } => "MetricUnavailable",
            Self::Validation { .. } => "Validation",
            Self::Render { .. } => "Render",
            Self::Io { .. } => "Io",
            Self::Parse { .. } => "Parse",
            Self::Serialize { .. } => "Serialize",
            Self::Bind { .. } => "Bind"
        }
    }

    /// Returns the upstream HTTP status attached to the error, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            Self::UpstreamUnavailable {
                status, ..
            } => *status,
            _ => None
        }
    }

    /// Reports whether the failure prevented the pipeline from running.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::UpstreamUnavailable { .. }
                | Self::NotFound { .. }
                | Self::ReportUnparseable { .. }
                | Self::Validation { .. }
        )
    }

    /// Formats the error for diagnostics without the variant name.
    pub fn to_display_string(&self) -> String {
        format!("{self}")
    }
}

impl From<reqwest::Error> for Error {
    fn from(source: reqwest::Error) -> Self {
        let status = source.status().map(|status| status.as_u16());
        let message = if source.is_timeout() {
            format!("request timed out: {source}")
        } else {
            source.to_string()
        };
        Self::UpstreamUnavailable {
            message,
            status
        }
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(source: serde_yaml::Error) -> Self {
        Self::Parse {
            source
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(source: serde_json::Error) -> Self {
        Self::Serialize {
            source
        }
    }
}

/// Creates an [`Error::Io`] variant capturing the failing path and source.
///
/// # Parameters
///
/// * `path` - Location of the file that triggered the error.
/// * `source` - I/O error reported by the operating system.
pub fn io_error(path: &Path, source: std::io::Error) -> Error {
    Error::Io {
        path: path.to_path_buf(),
        source
    }
}
