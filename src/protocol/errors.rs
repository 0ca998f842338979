use thiserror::Error;

use super::types::{ProfileId, RoomId};

/// Request-scoped failure taxonomy. Every kind maps to a targeted
/// `room-error` event (or an HTTP 4xx/5xx) for the originating caller only;
/// none of these are ever broadcast.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LobbyError {
    #[error("Room {0} not found")]
    RoomNotFound(RoomId),
    #[error("Profile {0} not found")]
    ProfileUnknown(ProfileId),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Upstream service failed: {0}")]
    Upstream(String),
    #[error("Connection lost: {0}")]
    Transient(String),
    #[error("{0}")]
    Invalid(String),
}

impl LobbyError {
    /// HTTP status for the admin/read surface.
    pub fn http_status(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            Self::RoomNotFound(_) | Self::ProfileUnknown(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Invalid(_) => StatusCode::BAD_REQUEST,
            Self::Upstream(_) => StatusCode::BAD_GATEWAY,
            Self::Transient(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(
            LobbyError::RoomNotFound("123456".into()).http_status(),
            axum::http::StatusCode::NOT_FOUND
        );
        assert_eq!(
            LobbyError::Conflict("Room is full".into()).http_status(),
            axum::http::StatusCode::CONFLICT
        );
        assert_eq!(
            LobbyError::Unauthorized("Only the host can start the game".into()).http_status(),
            axum::http::StatusCode::UNAUTHORIZED
        );
    }
}
