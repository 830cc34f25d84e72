use thiserror::Error;

/// Why a wiki could not be reached at the network layer.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnreachableCause {
    #[error("no HTTPS endpoint")]
    NoHttps,

    #[error("invalid or expired certificate")]
    BadCertificate,

    #[error("request timed out")]
    Timeout,

    #[error("connection failed")]
    Connect,
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("wiki unreachable: {0}")]
    Unreachable(UnreachableCause),

    #[error("no such wiki")]
    WikiNotFound,

    #[error("read access denied")]
    PermissionDenied,

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl ResolveError {
    /// Permanent failures skip the one-shot API entry-point rediscovery.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            ResolveError::WikiNotFound | ResolveError::PermissionDenied | ResolveError::InvalidUrl(_)
        )
    }
}
