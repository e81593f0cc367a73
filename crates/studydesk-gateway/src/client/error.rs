/// Every way a gateway operation can fail.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// The request never produced a response (connection refused, DNS, TLS, reset).
    #[error("network error: {0}")]
    Network(String),
    /// The backend answered with a non-2xx status.
    #[error("backend error ({status}): {message}")]
    Backend { status: u16, message: String },
    /// Rejected locally; nothing was sent.
    #[error("validation error: {0}")]
    Validation(String),
    /// A 2xx body that does not match the contract.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, GatewayError>;
