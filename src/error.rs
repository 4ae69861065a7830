//! Error types and result handling for Tansaku operations.
//!
//! All fallible operations return a [`Result<T>`], an alias for
//! `std::result::Result<T, Error>`.
//!
//! # Error Categories
//!
//! - **Network**: DNS failures, timeouts, connection resets while talking to an origin
//! - **HTTP status**: the origin answered with a non-2xx status
//! - **Parse**: a feed or a single feed item could not be understood
//! - **Missing resource**: a feed item carried no magnet/torrent reference
//! - **XML**: the Torznab writer failed
//! - **Config**: invalid or unreadable configuration
//! - **Not found**: unknown indexer id
//!
//! # Propagation
//!
//! Per-item parse failures never leave the feed parser; they are logged and the
//! item is dropped. The keyword cache swallows [`Error::Network`] (serving stale
//! data when it has some) and only surfaces [`Error::HttpStatus`] to callers.
//!
//! ```rust
//! use tansaku::Error;
//!
//! let error = Error::http_status("https://example.org/rss.xml", 503);
//! assert!(error.is_http_status());
//! assert!(!error.is_network());
//! ```

use thiserror::Error;

/// Type alias for Results with Tansaku errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all Tansaku operations.
///
/// The enum is `Clone` because a single origin fetch result is shared with
/// every caller that coalesced onto it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Transport-level failure (DNS, timeout, reset) before any status was received.
    #[error("Network error for {url}: {message}")]
    Network { url: String, message: String },

    /// The origin answered with a non-2xx status.
    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    /// Data parsing and format errors.
    ///
    /// Raised for whole-feed problems such as invalid UTF-8 or broken XML, and
    /// internally for single malformed items (which are dropped, not propagated).
    #[error("Parse error: {0}")]
    Parse(String),

    /// A feed item without an enclosure or any other resource reference.
    #[error("Missing resource reference: {0}")]
    MissingResource(String),

    /// Failures while writing a Torznab document.
    #[error("XML error: {0}")]
    Xml(String),

    /// Invalid configuration values or unreadable configuration sources.
    #[error("Config error: {0}")]
    Config(String),

    /// Resource not found, e.g. an unknown indexer id.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Generic error messages.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Creates a parse error with the given message.
    ///
    /// ```rust
    /// use tansaku::Error;
    ///
    /// let error = Error::parse("Invalid UTF-8 in feed body");
    /// ```
    pub fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    /// Creates a network error for the given URL.
    pub fn network(url: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::Network {
            url: url.into(),
            message: msg.into(),
        }
    }

    /// Creates an HTTP status error for the given URL.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Error::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a not found error with the given message.
    pub fn not_found(msg: impl Into<String>) -> Self {
        Error::NotFound(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Error::Config(msg.into())
    }

    /// Returns `true` for transport failures.
    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network { .. })
    }

    /// Returns `true` when the origin answered with a non-2xx status.
    pub fn is_http_status(&self) -> bool {
        matches!(self, Error::HttpStatus { .. })
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        let url = e.url().map(|u| u.to_string()).unwrap_or_default();
        match e.status() {
            Some(status) => Error::HttpStatus {
                url,
                status: status.as_u16(),
            },
            None => Error::Network {
                url,
                message: e.to_string(),
            },
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::Xml(e.to_string())
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Error::parse(format!("Invalid UTF-8: {}", e))
    }
}

impl From<::config::ConfigError> for Error {
    fn from(e: ::config::ConfigError) -> Self {
        Error::Config(e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Xml(e.to_string())
    }
}
