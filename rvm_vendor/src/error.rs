use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum VendorApiError {
    #[error("Could not initialize the vendor API client. {0}")]
    Initialization(String),
    #[error("Transport error while calling the vendor API. {0}")]
    Transport(String),
    #[error("The vendor API did not respond within the timeout.")]
    Timeout,
    #[error("The vendor API returned HTTP {status}. {message}")]
    QueryError { status: u16, message: String },
    #[error("The vendor API reported failure code {code}. {message}")]
    VendorCode { code: i64, message: String },
    #[error("Could not deserialize the vendor response. {0}")]
    JsonError(String),
    #[error("The vendor response was empty where data was expected.")]
    EmptyResponse,
}
