// Error types for the peer finder

use thiserror::Error;

/// Main error type for the application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("HTTP request to {url} failed with status {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("Whois error: {0}")]
    Whois(String),

    #[error("Invalid ASN: {0}")]
    InvalidAsn(String),

    #[error("Invalid User-Agent: {0}")]
    InvalidUserAgent(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => AppError::HttpStatus {
                url: err
                    .url()
                    .map(|u| u.to_string())
                    .unwrap_or_else(|| "<unknown>".to_string()),
                status: status.as_u16(),
            },
            None => AppError::Network(err.to_string()),
        }
    }
}

impl AppError {
    /// Convert error to user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Network error occurred. Please check internet connectivity.".to_string()
            }
            AppError::HttpStatus { status, .. } => {
                format!("bgp.tools answered with HTTP {}. Check your User-Agent and try again later.", status)
            }
            AppError::Whois(_) => {
                "Whois query failed. bgp.tools may be unreachable on port 43.".to_string()
            }
            AppError::InvalidAsn(_) => {
                "ASN must be between 1 and 4294967295".to_string()
            }
            AppError::InvalidUserAgent(_) => {
                "User-Agent must include an email address for contact\nExample: 'My BGP Tool - contact@example.com'".to_string()
            }
            AppError::Io(_) => {
                "File system error. Check permissions and disk space.".to_string()
            }
        }
    }

    /// Validation errors are reported to the user before any network activity
    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::InvalidAsn(_) | AppError::InvalidUserAgent(_))
    }
}
