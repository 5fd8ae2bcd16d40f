use thiserror::Error;

/// Failure of a single backend call, decoded once from the response envelope.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response (DNS, connect, TLS, timeout).
    #[error("Cannot reach backend at {base_url}. Is the server running?")]
    Network {
        base_url: String,
        reason: String,
    },
    /// Non-2xx HTTP status.
    #[error("{message}")]
    Server {
        status: u16,
        message: String,
        hint: Option<String>,
    },
    /// 2xx response whose envelope says `success: false`.
    #[error("{message}")]
    Rejected {
        status: u16,
        message: String,
        hint: Option<String>,
    },
    /// 2xx response the client could not make sense of.
    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode {
        endpoint: String,
        status: u16,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Network,
    Server,
    Other,
}

impl ApiError {
    /// HTTP status of the failed call; 0 when no response arrived.
    pub fn status(&self) -> u16 {
        match self {
            ApiError::Network { .. } => 0,
            ApiError::Server { status, .. }
            | ApiError::Rejected { status, .. }
            | ApiError::Decode { status, .. } => *status,
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            ApiError::Network { .. } => FailureKind::Network,
            ApiError::Server { status, .. } if *status >= 400 => FailureKind::Server,
            _ => FailureKind::Other,
        }
    }

    pub fn is_network_error(&self) -> bool {
        matches!(self, ApiError::Network { .. })
    }

    /// Remediation hint supplied by the backend, if any.
    pub fn hint(&self) -> Option<&str> {
        match self {
            ApiError::Server { hint, .. } | ApiError::Rejected { hint, .. } => hint.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn network_errors_carry_status_zero() {
        let err = ApiError::Network {
            base_url: "http://localhost:8000".into(),
            reason: "connection refused".into(),
        };
        assert_eq!(err.status(), 0);
        assert_eq!(err.kind(), FailureKind::Network);
        assert_eq!(err.to_string(), "Cannot reach backend at http://localhost:8000. Is the server running?");
    }

    #[test]
    fn rejected_envelope_is_not_a_server_failure() {
        let rejected = ApiError::Rejected { status: 200, message: "quota".into(), hint: None };
        let server = ApiError::Server { status: 503, message: "down".into(), hint: Some("retry later".into()) };
        assert_eq!(rejected.kind(), FailureKind::Other);
        assert_eq!(server.kind(), FailureKind::Server);
        assert_eq!(server.hint(), Some("retry later"));
    }
}
