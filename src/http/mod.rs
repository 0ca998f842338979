//! REST read/admin surface: health, room listings, admin triggers, and the
//! thin forwards to the profile/match stores.

mod admin;
mod health;
mod profiles;
mod rooms;
pub mod routes;

pub use routes::api_router;

use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::protocol::LobbyError;

/// HTTP rendering of the shared error taxonomy: a 4xx/5xx with an
/// `{"error": ...}` body, to the caller only.
pub(crate) struct ApiError(pub LobbyError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.0.http_status();
        let body = Json(serde_json::json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}

impl From<LobbyError> for ApiError {
    fn from(error: LobbyError) -> Self {
        Self(error)
    }
}

pub(crate) type ApiResult<T> = Result<T, ApiError>;
