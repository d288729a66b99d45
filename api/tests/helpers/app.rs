use api::ws::ws_routes;
use api::{ApiSettings, ApiState};
use db::models::user::{self, Role};
use db::test_utils::{create_user, setup_test_db};
use std::net::SocketAddr;
use std::time::Duration;

use super::ws::spawn_server;

pub struct TestApp {
    pub addr: SocketAddr,
    pub state: ApiState,
}

pub fn test_settings() -> ApiSettings {
    ApiSettings {
        jwt_secret: "test-secret".into(),
        session_lifetime: Duration::from_secs(3600),
        token_lifetime: Duration::from_secs(60),
        query_timeout: Duration::from_secs(5),
        event_pool_size: 8,
        event_schedule_timeout: Duration::from_millis(200),
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(test_settings()).await
}

pub async fn spawn_app_with(settings: ApiSettings) -> TestApp {
    let db = setup_test_db().await;
    let state = ApiState::build(db, &settings).await;
    let addr = spawn_server(ws_routes(state.clone())).await;
    TestApp { addr, state }
}

impl TestApp {
    /// Create a user with a fresh session and return a token for it.
    pub async fn login(&self, first_name: &str, role: Role) -> (user::Model, String) {
        let user = create_user(self.state.app().db(), first_name, role).await;
        let session = self.state.sessions.create(user.id, role).await.unwrap();
        let token = self.state.sessions.issue_token(&session).unwrap();
        (user, token)
    }
}
