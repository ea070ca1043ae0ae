use actix_web::{http::StatusCode, HttpResponse, HttpResponseBuilder, ResponseError};
use log::*;
use rvm_engine::{LedgerError, SettlementError};
use rvm_vendor::VendorApiError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("Invalid request. {0}")]
    InvalidRequest(String),
    #[error("Resource not found. {0}")]
    NotFound(String),
    #[error("Unauthorized. {0}")]
    Unauthorized(String),
    #[error("Ledger error. {0}")]
    LedgerError(#[from] LedgerError),
    #[error("Settlement error. {0}")]
    SettlementError(#[from] SettlementError),
    #[error("Vendor gateway error. {0}")]
    VendorError(#[from] VendorApiError),
    #[error("An unspecified error occurred. {0}")]
    Unspecified(String),
}

impl From<std::io::Error> for ServerError {
    fn from(e: std::io::Error) -> Self {
        ServerError::InitializeError(e.to_string())
    }
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::LedgerError(LedgerError::IdentityUnresolvable) => StatusCode::BAD_REQUEST,
            Self::LedgerError(LedgerError::InvalidEvent(_)) => StatusCode::BAD_REQUEST,
            Self::LedgerError(LedgerError::UserNotFound(_)) => StatusCode::NOT_FOUND,
            Self::LedgerError(LedgerError::Gateway(_)) => StatusCode::BAD_GATEWAY,
            Self::SettlementError(SettlementError::ReviewNotFound(_)) => StatusCode::NOT_FOUND,
            Self::SettlementError(SettlementError::WithdrawalNotFound(_)) => StatusCode::NOT_FOUND,
            Self::SettlementError(SettlementError::CleaningNotFound(_)) => StatusCode::NOT_FOUND,
            Self::SettlementError(SettlementError::WalletNotFound { .. }) => StatusCode::NOT_FOUND,
            Self::SettlementError(SettlementError::NotPending { .. }) => StatusCode::BAD_REQUEST,
            Self::VendorError(VendorApiError::Timeout) => StatusCode::GATEWAY_TIMEOUT,
            Self::VendorError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if self.status_code().is_server_error() {
            error!("💻️ {self}");
        } else {
            debug!("💻️ {self}");
        }
        HttpResponseBuilder::new(self.status_code()).json(json!({"error": self.to_string()}))
    }
}
