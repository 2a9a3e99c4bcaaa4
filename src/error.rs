//! Errors raised while fetching stats from the container runtime.
//!
//! [`FetchError::is_retryable`] splits the taxonomy in two: a container that
//! no longer exists or a payload that cannot be read will not fix itself, so
//! those end the run; connection trouble and daemon-side failures are retried
//! with backoff by the sampler.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("container '{container}' not found: {message}")]
    NotFound { container: String, message: String },

    #[error("malformed stats payload for container '{container}': {reason}")]
    Malformed { container: String, reason: String },

    #[error("stats request for container '{container}' failed: {source}")]
    Transient {
        container: String,
        #[source]
        source: bollard::errors::Error,
    },

    #[error("stats stream for container '{container}' ended without a payload")]
    StreamEnded { container: String },
}

impl FetchError {
    /// Classifies a bollard error returned for `container`.
    pub fn from_docker(container: &str, err: bollard::errors::Error) -> Self {
        use bollard::errors::Error as DockerError;

        let container = container.to_string();
        match err {
            DockerError::DockerResponseServerError {
                status_code: 404,
                message,
            } => FetchError::NotFound { container, message },
            DockerError::JsonDataError { message, .. } => FetchError::Malformed {
                container,
                reason: message,
            },
            DockerError::JsonSerdeError { err } => FetchError::Malformed {
                container,
                reason: err.to_string(),
            },
            other => FetchError::Transient {
                container,
                source: other,
            },
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::Transient { .. } | FetchError::StreamEnded { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bollard::errors::Error as DockerError;

    #[test]
    fn not_found_is_fatal() {
        let err = FetchError::from_docker(
            "web",
            DockerError::DockerResponseServerError {
                status_code: 404,
                message: "No such container: web".into(),
            },
        );
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("web"));
    }

    #[test]
    fn server_error_is_retryable() {
        let err = FetchError::from_docker(
            "web",
            DockerError::DockerResponseServerError {
                status_code: 500,
                message: "daemon busy".into(),
            },
        );
        assert!(matches!(err, FetchError::Transient { .. }));
        assert!(err.is_retryable());
    }

    #[test]
    fn timeout_is_retryable() {
        let err = FetchError::from_docker("db", DockerError::RequestTimeoutError);
        assert!(err.is_retryable());
        assert!(err.to_string().contains("db"));
    }

    #[test]
    fn decode_failure_is_fatal() {
        let serde_err = serde_json::from_str::<u64>("not json").unwrap_err();
        let err = FetchError::from_docker("db", DockerError::JsonSerdeError { err: serde_err });
        assert!(matches!(err, FetchError::Malformed { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn empty_stream_is_retryable() {
        let err = FetchError::StreamEnded {
            container: "db".into(),
        };
        assert!(err.is_retryable());
    }
}
