pub mod access;
pub mod error;
pub mod events;
pub mod message_service;
pub mod session_service;
pub mod ticket_service;
pub mod validate;

#[cfg(test)]
mod test_support;

pub use error::ServiceError;
pub use message_service::MessageService;
pub use session_service::{Session, SessionService};
pub use ticket_service::TicketService;

use std::future::Future;
use std::time::Duration;

/// Bound a unit of database work. On expiry the future is dropped, which rolls back
/// any transaction it still holds.
pub(crate) async fn timed<T, F>(limit: Duration, work: F) -> Result<T, ServiceError>
where
    F: Future<Output = Result<T, ServiceError>>,
{
    match tokio::time::timeout(limit, work).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(?limit, "database operation timed out");
            Err(ServiceError::Timeout)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use db::models::tickets;
    use db::models::user::Role;
    use db::test_utils::{create_user, setup_test_db};
    use sea_orm::TransactionTrait;

    #[tokio::test]
    async fn timeout_rolls_back_the_transaction() {
        let db = setup_test_db().await;
        let client = create_user(&db, "Aiste", Role::Client).await;

        let result: Result<(), ServiceError> = timed(Duration::from_millis(50), async {
            let txn = db.begin().await?;
            tickets::Model::insert(&txn, client.id, Utc::now()).await?;
            tokio::time::sleep(Duration::from_millis(500)).await;
            txn.commit().await?;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, ServiceError::Timeout));
        assert_eq!(err.code(), "unknown_error");

        // nothing was committed, and the connection is usable again
        let active = tickets::Model::find_last_active_id(&db, client.id, false)
            .await
            .unwrap();
        assert_eq!(active, None);
        assert!(tickets::Model::find_summaries(&db, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn work_within_the_limit_passes_through() {
        let out = timed(Duration::from_secs(1), async { Ok::<_, ServiceError>(7) }).await;
        assert_eq!(out.unwrap(), 7);

        let err = timed(Duration::from_secs(1), async {
            Err::<(), _>(ServiceError::TicketNotFound)
        })
        .await
        .unwrap_err();
        assert!(matches!(err, ServiceError::TicketNotFound));
    }
}
