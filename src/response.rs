//! Response envelope for API layers built on the core.

use crate::errors::{Error, ErrorKind};
use serde::Serialize;
use tracing::error;

/// `{ success, message, data }` on success, `{ success, message, errorKind }` on failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ErrorKind>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Successful response carrying `data`.
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            error_kind: None,
        }
    }

    /// Failed response for `err`. Server-side failures are also logged.
    #[must_use]
    pub fn from_error(err: &Error) -> Self {
        let kind = err.kind();
        if kind == ErrorKind::Server {
            error!("{}", err);
        }

        Self {
            success: false,
            message: err.to_string(),
            data: None,
            error_kind: Some(kind),
        }
    }
}

impl<T: Serialize> From<Error> for ApiResponse<T> {
    fn from(err: Error) -> Self {
        Self::from_error(&err)
    }
}

/// HTTP status code conventionally used for an error kind.
#[must_use]
pub const fn http_status(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::Validation | ErrorKind::Conflict | ErrorKind::Dependency => 400,
        ErrorKind::Forbidden => 403,
        ErrorKind::NotFound => 404,
        ErrorKind::Server => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope() {
        let response = ApiResponse::ok("Borrow created", json!({ "borrowId": 1 }));
        let value = serde_json::to_value(&response).unwrap_or_default();
        assert_eq!(
            value,
            json!({ "success": true, "message": "Borrow created", "data": { "borrowId": 1 } })
        );
    }

    #[test]
    fn test_error_envelope() {
        let err = Error::InsufficientStock {
            available: 1,
            requested: 3,
        };
        let response: ApiResponse<()> = err.into();
        let value = serde_json::to_value(&response).unwrap_or_default();
        assert_eq!(value["success"], false);
        assert_eq!(value["errorKind"], "CONFLICT");
        assert!(value.get("data").is_none());
        assert!(
            value["message"]
                .as_str()
                .unwrap_or_default()
                .contains("1 available")
        );
    }

    #[test]
    fn test_server_error_carries_underlying_message() {
        let err = Error::Database(sea_orm::DbErr::Custom("disk I/O error".to_string()));
        let response = ApiResponse::<()>::from_error(&err);
        assert_eq!(response.error_kind, Some(ErrorKind::Server));
        assert!(response.message.contains("disk I/O error"));
    }

    #[test]
    fn test_http_status() {
        assert_eq!(http_status(ErrorKind::Validation), 400);
        assert_eq!(http_status(ErrorKind::Conflict), 400);
        assert_eq!(http_status(ErrorKind::Dependency), 400);
        assert_eq!(http_status(ErrorKind::Forbidden), 403);
        assert_eq!(http_status(ErrorKind::NotFound), 404);
        assert_eq!(http_status(ErrorKind::Server), 500);
    }
}
