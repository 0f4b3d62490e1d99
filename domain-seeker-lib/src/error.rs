//! Error handling for scanning operations.
//!
//! One error type covers every failure in the engine. Whether an error ends
//! the run or only affects a single base name is decided by [`DomainSeekerError::is_fatal`].

use std::fmt;

/// Main error type for domain scanning operations.
#[derive(Debug, Clone)]
pub enum DomainSeekerError {
    /// A base name or TLD failed the character rules.
    ///
    /// Raised per name; the scanner skips the name and keeps going.
    InvalidDomain { domain: String, reason: String },

    /// Bad settings detected before any query was issued
    ConfigError { message: String },

    /// Reading the domain list file failed
    FileError { path: String, message: String },

    /// The domain generator failed after it had already produced names
    SourceError { source_name: String, message: String },

    /// Problems building or consulting the RDAP bootstrap mapping
    BootstrapError { tld: String, message: String },

    /// Invalid generation pattern
    InvalidPattern { pattern: String, reason: String },

    /// Network-related errors outside of per-domain querying
    NetworkError {
        message: String,
        source: Option<String>,
    },

    /// JSON or TOML parsing errors
    ParseError { message: String },

    /// A result sink could not persist, upload or deliver results
    SinkError { sink: String, message: String },

    /// Generic internal errors that don't fit other categories
    Internal { message: String },
}

impl DomainSeekerError {
    /// Create a new invalid domain error.
    pub fn invalid_domain<D: Into<String>, R: Into<String>>(domain: D, reason: R) -> Self {
        Self::InvalidDomain {
            domain: domain.into(),
            reason: reason.into(),
        }
    }

    /// Create a new configuration error.
    pub fn config<M: Into<String>>(message: M) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create a new file error.
    pub fn file_error<P: Into<String>, M: Into<String>>(path: P, message: M) -> Self {
        Self::FileError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a new domain source error.
    pub fn source_failed<S: Into<String>, M: Into<String>>(source_name: S, message: M) -> Self {
        Self::SourceError {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a new bootstrap error.
    pub fn bootstrap<T: Into<String>, M: Into<String>>(tld: T, message: M) -> Self {
        Self::BootstrapError {
            tld: tld.into(),
            message: message.into(),
        }
    }

    /// Create a new invalid pattern error.
    pub fn invalid_pattern<P: Into<String>, R: Into<String>>(pattern: P, reason: R) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Create a new network error with source information.
    pub fn network_with_source<M: Into<String>, S: Into<String>>(message: M, source: S) -> Self {
        Self::NetworkError {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Create a new sink error.
    pub fn sink<S: Into<String>, M: Into<String>>(sink: S, message: M) -> Self {
        Self::SinkError {
            sink: sink.into(),
            message: message.into(),
        }
    }

    /// Whether this error terminates a scan run.
    ///
    /// Validation failures and sink failures are local: the first is a
    /// skipped name, the second a lost delivery. Everything that breaks the
    /// domain source or the configuration ends the run.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InvalidDomain { .. } | Self::SinkError { .. })
    }

    /// Whether this error belongs to the configuration stage.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigError { .. } | Self::BootstrapError { .. } | Self::InvalidPattern { .. }
        )
    }
}

impl fmt::Display for DomainSeekerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDomain { domain, reason } => {
                write!(f, "Invalid domain '{}': {}", domain, reason)
            }
            Self::ConfigError { message } => {
                write!(f, "Configuration error: {}", message)
            }
            Self::FileError { path, message } => {
                write!(f, "File error at '{}': {}", path, message)
            }
            Self::SourceError {
                source_name,
                message,
            } => {
                write!(f, "Domain source '{}' failed: {}", source_name, message)
            }
            Self::BootstrapError { tld, message } => {
                write!(f, "Bootstrap error for TLD '{}': {}", tld, message)
            }
            Self::InvalidPattern { pattern, reason } => {
                write!(f, "Invalid pattern '{}': {}", pattern, reason)
            }
            Self::NetworkError { message, source } => {
                if let Some(source) = source {
                    write!(f, "Network error: {} (source: {})", message, source)
                } else {
                    write!(f, "Network error: {}", message)
                }
            }
            Self::ParseError { message } => {
                write!(f, "Parse error: {}", message)
            }
            Self::SinkError { sink, message } => {
                write!(f, "Result sink '{}' failed: {}", sink, message)
            }
            Self::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for DomainSeekerError {}

// reqwest and regex errors are mapped at their call sites instead.
impl From<serde_json::Error> for DomainSeekerError {
    fn from(err: serde_json::Error) -> Self {
        Self::ParseError {
            message: format!("JSON parsing failed: {}", err),
        }
    }
}

impl From<std::io::Error> for DomainSeekerError {
    fn from(err: std::io::Error) -> Self {
        Self::Internal {
            message: format!("I/O error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatality() {
        assert!(!DomainSeekerError::invalid_domain("-bad-", "leading hyphen").is_fatal());
        assert!(!DomainSeekerError::sink("results-file", "disk full").is_fatal());
        assert!(DomainSeekerError::config("no TLDs").is_fatal());
        assert!(DomainSeekerError::source_failed("generator", "boom").is_fatal());
        assert!(DomainSeekerError::file_error("domains.txt", "unreadable").is_fatal());
    }

    #[test]
    fn test_configuration_stage() {
        assert!(DomainSeekerError::config("x").is_configuration());
        assert!(DomainSeekerError::bootstrap("zz", "unknown").is_configuration());
        assert!(!DomainSeekerError::source_failed("generator", "boom").is_configuration());
    }

    #[test]
    fn test_display() {
        let err = DomainSeekerError::config("TLD list is empty");
        assert_eq!(err.to_string(), "Configuration error: TLD list is empty");

        let err = DomainSeekerError::network_with_source("Connection failed", "refused");
        assert_eq!(err.to_string(), "Network error: Connection failed (source: refused)");
    }
}
