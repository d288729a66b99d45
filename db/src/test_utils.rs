use crate::models::user::{self, Role};
use migration::Migrator;
use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Insert a user with a throwaway email derived from `first_name`.
pub async fn create_user(db: &DatabaseConnection, first_name: &str, role: Role) -> user::Model {
    let email = format!("{}@example.com", first_name.to_lowercase());
    user::Model::create(db, &email, first_name, "Tester", role)
        .await
        .expect("Failed to create user")
}
