//! Error taxonomy shared by every service.
//!
//! Each variant maps to a stable wire code via [`ServiceError::code`]. Infrastructure
//! failures (`Database`, `Timeout`) are reported to callers as `unknown_error`.

use sea_orm::DbErr;
use validator::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    // validation
    #[error("invalid input: {0}")]
    InvalidInput(String),

    // authorization
    #[error("invalid user role")]
    InvalidUserRole,
    #[error("ticket is not owned by the caller")]
    TicketNotOwned,
    #[error("not authenticated")]
    NotAuthenticated,
    #[error("already authenticated")]
    AlreadyAuthenticated,
    #[error("insufficient permissions")]
    InsufficientPermissions,
    #[error("session expired")]
    SessionExpired,
    #[error("token expired")]
    TokenExpired,
    #[error("invalid token")]
    InvalidToken,

    // conflict
    #[error("ticket already accepted")]
    TicketAlreadyAccepted,
    #[error("ticket already ended")]
    TicketAlreadyEnded,
    #[error("ticket not accepted")]
    TicketNotAccepted,
    #[error("current ticket is still active")]
    TicketStillActive,

    // not found
    #[error("ticket not found")]
    TicketNotFound,

    // infrastructure
    #[error("operation timed out")]
    Timeout,
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("{0}")]
    Internal(String),
}

impl ServiceError {
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::InvalidInput(_) => "invalid_input",
            ServiceError::InvalidUserRole => "invalid_user_role",
            ServiceError::TicketNotOwned => "ticket_not_owned",
            ServiceError::NotAuthenticated => "not_authenticated",
            ServiceError::AlreadyAuthenticated => "already_authenticated",
            ServiceError::InsufficientPermissions => "insufficient_permissions",
            ServiceError::SessionExpired => "session_expired",
            ServiceError::TokenExpired => "token_expired",
            ServiceError::InvalidToken => "invalid_token",
            ServiceError::TicketAlreadyAccepted => "ticket_already_accepted",
            ServiceError::TicketAlreadyEnded => "ticket_already_ended",
            ServiceError::TicketNotAccepted => "ticket_not_accepted",
            ServiceError::TicketStillActive => "current_ticket_still_active",
            ServiceError::TicketNotFound => "ticket_not_found",
            ServiceError::Timeout | ServiceError::Database(_) | ServiceError::Internal(_) => {
                "unknown_error"
            }
        }
    }

    /// `true` for failures the caller cannot act on; these must be logged, not surfaced.
    pub fn is_infrastructure(&self) -> bool {
        matches!(
            self,
            ServiceError::Timeout | ServiceError::Database(_) | ServiceError::Internal(_)
        )
    }
}

impl From<ValidationErrors> for ServiceError {
    fn from(e: ValidationErrors) -> Self {
        ServiceError::InvalidInput(e.to_string())
    }
}
