use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned status {0}")]
    HttpStatus(u16),

    #[error("Upstream kept rate limiting after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Model artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Model artifact is corrupt: {0}")]
    ArtifactCorrupt(String),

    #[error("Model artifact trained with toolchain {artifact}, runtime expects {runtime}")]
    VersionMismatch { artifact: String, runtime: String },

    #[error("Model artifact has no vectorizer, cannot score text")]
    VectorizerMissing,

    #[error("Model artifact unavailable: {0}")]
    ArtifactUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// Errors that make the classifier unusable for the rest of a cycle.
    pub fn is_artifact_error(&self) -> bool {
        matches!(
            self,
            Error::ArtifactNotFound(_)
                | Error::ArtifactCorrupt(_)
                | Error::VersionMismatch { .. }
                | Error::VectorizerMissing
                | Error::ArtifactUnavailable(_)
        )
    }

    /// Network, 5xx and 429 failures from the upstream API.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } => true,
            Error::HttpStatus(code) => *code >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(Error::VectorizerMissing.is_artifact_error());
        assert!(Error::ArtifactUnavailable("blob".into()).is_artifact_error());
        assert!(!Error::NotFound("1".into()).is_artifact_error());

        assert!(Error::RateLimited { attempts: 3 }.is_transient());
        assert!(Error::HttpStatus(503).is_transient());
        assert!(!Error::HttpStatus(404).is_transient());
        assert!(!Error::MalformedRecord("date".into()).is_transient());
    }
}
