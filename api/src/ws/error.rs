use services::ServiceError;
use util::ws::PoolError;

/// Failure of a single request, reported back to the caller as an error code.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("malformed request")]
    BadRequest,
    #[error("method not found")]
    MethodNotFound,
    #[error(transparent)]
    Service(#[from] ServiceError),
    #[error(transparent)]
    Pool(#[from] PoolError),
}

impl HandlerError {
    pub fn code(&self) -> &'static str {
        match self {
            HandlerError::BadRequest => "bad_request",
            HandlerError::MethodNotFound => "method_not_found",
            HandlerError::Service(e) => e.code(),
            HandlerError::Pool(_) => "unknown_error",
        }
    }

    /// Errors the caller cannot act on; they are logged and answered with `unknown_error`.
    pub fn is_infrastructure(&self) -> bool {
        match self {
            HandlerError::Service(e) => e.is_infrastructure(),
            HandlerError::Pool(_) => true,
            _ => false,
        }
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(_: serde_json::Error) -> Self {
        HandlerError::BadRequest
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes() {
        assert_eq!(HandlerError::BadRequest.code(), "bad_request");
        assert_eq!(HandlerError::MethodNotFound.code(), "method_not_found");
        assert_eq!(
            HandlerError::from(ServiceError::TicketAlreadyEnded).code(),
            "ticket_already_ended"
        );

        let pool = HandlerError::from(PoolError::RoomNotFound("agents".into()));
        assert_eq!(pool.code(), "unknown_error");
        assert!(pool.is_infrastructure());
        assert!(!HandlerError::BadRequest.is_infrastructure());
    }
}
