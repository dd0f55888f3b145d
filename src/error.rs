use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::schemas::GroupId;

/// Every way a ledger operation can fail. Validation variants are always
/// raised before anything is written.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("invalid group: {0}")]
    InvalidGroup(String),

    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("user `{0}` not found")]
    UserNotFound(String),

    #[error("invalid expense: {0}")]
    InvalidExpense(String),

    #[error("invalid split: {0}")]
    InvalidSplit(String),

    #[error("group {0} was modified concurrently, please try again")]
    Conflict(GroupId),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl LedgerError {
    pub fn invalid_group(reason: impl Into<String>) -> Self {
        LedgerError::InvalidGroup(reason.into())
    }

    pub fn invalid_expense(reason: impl Into<String>) -> Self {
        LedgerError::InvalidExpense(reason.into())
    }

    pub fn invalid_split(reason: impl Into<String>) -> Self {
        LedgerError::InvalidSplit(reason.into())
    }

    fn kind(&self) -> &'static str {
        match self {
            LedgerError::InvalidGroup(_) => "invalid_group",
            LedgerError::GroupNotFound(_) => "group_not_found",
            LedgerError::UserNotFound(_) => "user_not_found",
            LedgerError::InvalidExpense(_) => "invalid_expense",
            LedgerError::InvalidSplit(_) => "invalid_split",
            LedgerError::Conflict(_) => "conflict",
            LedgerError::Storage(_) => "storage_error",
        }
    }
}

impl ResponseError for LedgerError {
    fn status_code(&self) -> StatusCode {
        match self {
            LedgerError::GroupNotFound(_) | LedgerError::UserNotFound(_) => StatusCode::NOT_FOUND,
            LedgerError::InvalidGroup(_)
            | LedgerError::InvalidExpense(_)
            | LedgerError::InvalidSplit(_) => StatusCode::BAD_REQUEST,
            LedgerError::Conflict(_) => StatusCode::CONFLICT,
            LedgerError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let LedgerError::Storage(e) = self {
            log::error!("Storage failure: {:#}", e);
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "detail": self.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            LedgerError::invalid_split("x").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            LedgerError::GroupNotFound(3).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(LedgerError::Conflict(3).status_code(), StatusCode::CONFLICT);
        assert_eq!(
            LedgerError::from(anyhow::anyhow!("disk on fire")).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_messages() {
        assert_eq!(
            LedgerError::invalid_expense("amount must be positive").to_string(),
            "invalid expense: amount must be positive"
        );
        assert_eq!(LedgerError::GroupNotFound(12).to_string(), "group 12 not found");
    }
}
