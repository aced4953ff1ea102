/// Core error type for the hashtag engine.
///
/// Adapter crates map their failures into this type so transports can decide
/// between a client-facing rejection and a server-side failure consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("message store error: {0}")]
    Upstream(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub fn upstream(msg: impl Into<String>) -> Self {
        Self::Upstream(msg.into())
    }

    /// True when the caller sent something we refuse to process.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::InvalidArgument(_))
    }

    /// HTTP-equivalent status for transports.
    pub fn status_code(&self) -> u16 {
        if self.is_client_error() {
            400
        } else {
            500
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_is_client_error() {
        let e = Error::invalid("tag is required");
        assert!(e.is_client_error());
        assert_eq!(e.status_code(), 400);
        assert_eq!(e.to_string(), "invalid argument: tag is required");
    }

    #[test]
    fn upstream_maps_to_server_error() {
        let e = Error::upstream("channel listing failed");
        assert!(!e.is_client_error());
        assert_eq!(e.status_code(), 500);
    }
}
