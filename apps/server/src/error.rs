use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use vngate_format::FormatError;
use vngate_market_data::OutcomeKind;

use crate::auth::AuthError;
use crate::users::UserStoreError;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    BadGateway(String),
    #[error("{0}")]
    GatewayTimeout(String),
    #[error("{0}")]
    Internal(String),
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}

/// Error body shape shared by every non-2xx response.
#[derive(Serialize)]
struct ErrorBody {
    detail: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            ApiError::Anyhow(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
        };
        (status, Json(ErrorBody { detail })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<UserStoreError> for ApiError {
    fn from(err: UserStoreError) -> Self {
        match err {
            UserStoreError::DuplicateUsername => ApiError::BadRequest(err.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::Internal(message) => ApiError::Internal(message),
            other => ApiError::Unauthorized(other.detail()),
        }
    }
}

impl From<FormatError> for ApiError {
    fn from(err: FormatError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

/// Map a classified dispatch failure onto the HTTP taxonomy: permanent and
/// unknown-source failures are the caller's problem (400), exhausted
/// transient failures are the upstream's (502), an elapsed deadline is 504.
pub fn dispatch_failure(kind: OutcomeKind, message: String, attempts: u32) -> ApiError {
    match kind {
        OutcomeKind::Permanent | OutcomeKind::UnknownSource => ApiError::BadRequest(message),
        OutcomeKind::Transient => {
            ApiError::BadGateway(format!("{message} (after {attempts} attempts)"))
        }
        OutcomeKind::Cancelled => ApiError::GatewayTimeout(message),
    }
}

/// Json extractor that reports malformed bodies as 400 with the standard
/// `{"detail": ...}` shape instead of axum's default 422.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Self(value)),
            Err(rejection) => Err(ApiError::BadRequest(rejection.body_text())),
        }
    }
}
