//! Login sessions and the short-lived tokens used to bind them to a live connection.

use crate::error::ServiceError;
use chrono::{DateTime, Utc};
use db::models::session;
use db::models::user::Role;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
}

impl From<session::Model> for Session {
    fn from(m: session::Model) -> Self {
        Self {
            id: m.id,
            user_id: m.user_id,
            role: m.role,
            expires_at: m.expires_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    /// Session id.
    sub: String,
    exp: usize,
}

#[derive(Clone)]
pub struct SessionService {
    db: DatabaseConnection,
    session_lifetime: chrono::Duration,
    token_lifetime: chrono::Duration,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SessionService {
    pub fn new(
        db: DatabaseConnection,
        session_lifetime: Duration,
        token_lifetime: Duration,
        secret: &str,
    ) -> Self {
        Self {
            db,
            session_lifetime: chrono::Duration::seconds(session_lifetime.as_secs() as i64),
            token_lifetime: chrono::Duration::seconds(token_lifetime.as_secs() as i64),
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub async fn create(&self, user_id: i64, role: Role) -> Result<Session, ServiceError> {
        let id = Uuid::new_v4().simple().to_string();
        let expires_at = Utc::now() + self.session_lifetime;
        let model = session::Model::create(&self.db, &id, user_id, role, expires_at).await?;
        tracing::info!(user_id, %role, "session created");
        Ok(model.into())
    }

    /// Resolve a session id. Expired sessions are removed and reported as such.
    pub async fn validate(&self, id: &str) -> Result<Session, ServiceError> {
        let session: Session = session::Model::find_by_id(&self.db, id)
            .await?
            .ok_or(ServiceError::NotAuthenticated)?
            .into();

        if Self::is_expired(&session) {
            session::Model::delete(&self.db, id).await?;
            return Err(ServiceError::SessionExpired);
        }
        Ok(session)
    }

    pub fn is_expired(session: &Session) -> bool {
        session.expires_at <= Utc::now()
    }

    pub async fn delete(&self, id: &str) -> Result<(), ServiceError> {
        session::Model::delete(&self.db, id).await?;
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, ServiceError> {
        Ok(session::Model::delete_expired(&self.db, Utc::now()).await?)
    }

    /// Sign a token for `session` that expires with the token lifetime or the session,
    /// whichever comes first.
    pub fn issue_token(&self, session: &Session) -> Result<String, ServiceError> {
        let exp = (Utc::now() + self.token_lifetime).min(session.expires_at);
        let claims = TokenClaims {
            sub: session.id.clone(),
            exp: exp.timestamp().max(0) as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ServiceError::Internal(format!("token encoding failed: {e}")))
    }

    pub async fn validate_token(&self, token: &str) -> Result<Session, ServiceError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        let data = decode::<TokenClaims>(token, &self.decoding, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => ServiceError::TokenExpired,
                _ => ServiceError::InvalidToken,
            }
        })?;
        self.validate(&data.claims.sub).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::test_utils::{create_user, setup_test_db};

    fn service(db: DatabaseConnection, session_lifetime: Duration) -> SessionService {
        SessionService::new(db, session_lifetime, Duration::from_secs(60), "test-secret")
    }

    #[tokio::test]
    async fn create_and_validate() {
        let db = setup_test_db().await;
        let u = create_user(&db, "Lina", Role::Agent).await;
        let svc = service(db, Duration::from_secs(3600));

        let s = svc.create(u.id, Role::Agent).await.unwrap();
        assert!(!SessionService::is_expired(&s));

        let back = svc.validate(&s.id).await.unwrap();
        assert_eq!(back, s);

        svc.delete(&s.id).await.unwrap();
        assert!(matches!(svc.validate(&s.id).await, Err(ServiceError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn expired_session_is_removed() {
        let db = setup_test_db().await;
        let u = create_user(&db, "Mantas", Role::Client).await;
        let svc = service(db, Duration::ZERO);

        let s = svc.create(u.id, Role::Client).await.unwrap();
        assert!(matches!(svc.validate(&s.id).await, Err(ServiceError::SessionExpired)));
        assert!(matches!(svc.validate(&s.id).await, Err(ServiceError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn token_round_trip() {
        let db = setup_test_db().await;
        let u = create_user(&db, "Gabija", Role::Client).await;
        let svc = service(db, Duration::from_secs(3600));

        let s = svc.create(u.id, Role::Client).await.unwrap();
        let token = svc.issue_token(&s).unwrap();
        let resolved = svc.validate_token(&token).await.unwrap();
        assert_eq!(resolved.user_id, u.id);
        assert_eq!(resolved.role, Role::Client);
    }

    #[tokio::test]
    async fn token_never_outlives_its_session() {
        let db = setup_test_db().await;
        let u = create_user(&db, "Darius", Role::Client).await;
        let svc = service(db, Duration::from_secs(3600));

        let mut s = svc.create(u.id, Role::Client).await.unwrap();
        s.expires_at = Utc::now() - chrono::Duration::seconds(5);

        let token = svc.issue_token(&s).unwrap();
        assert!(matches!(svc.validate_token(&token).await, Err(ServiceError::TokenExpired)));
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let db = setup_test_db().await;
        let svc = service(db, Duration::from_secs(3600));
        assert!(matches!(
            svc.validate_token("not.a.token").await,
            Err(ServiceError::InvalidToken)
        ));
    }
}
