use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use karte_core::ErrorResult;
use karte_generate::GenerateError;
use thiserror::Error;
use tracing::{error, warn};

pub const UNEXPECTED_MESSAGE: &str = "予期せぬエラーが発生しました";

/// Every way a flowchart request can fail, rendered as `{ "error": ... }`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("有効な仮説データがありません")]
    InvalidInput,

    #[error(transparent)]
    Generate(#[from] GenerateError),

    #[error("{0}")]
    Unhandled(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::InvalidInput => StatusCode::BAD_REQUEST,
            ApiError::Generate(_) | ApiError::Unhandled(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut message = self.to_string();
        if message.trim().is_empty() {
            message = UNEXPECTED_MESSAGE.to_string();
        }

        if status.is_server_error() {
            error!("Flowchart generation error: {:?}", self);
        } else {
            warn!(status = status.as_u16(), "rejected request: {}", message);
        }

        (status, Json(ErrorResult::new(message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statuses_follow_the_error_class() {
        assert_eq!(ApiError::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiError::InvalidInput.status(), StatusCode::BAD_REQUEST);
        for e in [
            GenerateError::MissingApiKey,
            GenerateError::Upstream("quota exceeded".into()),
            GenerateError::UnexpectedUpstreamShape,
            GenerateError::MalformedJson("eof".into()),
            GenerateError::InvalidShape,
            GenerateError::Transport("refused".into()),
        ] {
            assert_eq!(ApiError::from(e).status(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn generate_errors_keep_their_message() {
        let e = ApiError::from(GenerateError::Upstream("quota exceeded".into()));
        assert_eq!(e.to_string(), "quota exceeded");
    }
}
