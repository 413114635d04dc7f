//! Runs against a live Postgres when a `database` section is configured
//! (`configuration.*`, `APP__DATABASE__*` or the `DB_*` variables). Each test
//! creates and migrates its own database. Without one the tests are skipped.

use serde_json::{json, Value};
use sqlx::{Connection, Executor, PgConnection, PgPool};
use std::net::TcpListener;
use std::sync::Arc;

use auth_service::auth::{Claims, InMemoryRefreshTokenRegistry, TokenCodec, TokenKind};
use auth_service::configuration::{get_configuration, DatabaseSettings, JwtSettings};
use auth_service::credentials::{CredentialStore, PgCredentialStore};
use auth_service::error::{AppError, AuthError, DatabaseError};
use auth_service::gateway::AuthGateway;
use auth_service::startup::run;

const SECRET: &str = "postgres-test-secret";

pub struct TestApp {
    pub address: String,
    pub db_pool: PgPool,
    pub store: PgCredentialStore,
}

/// `None` when no database is configured
async fn spawn_app() -> Option<TestApp> {
    let configuration = get_configuration().expect("Failed to read configuration.");
    let mut database = match configuration.database {
        Some(database) => database,
        None => {
            eprintln!("No database configured, skipping Postgres test");
            return None;
        }
    };
    database.database_name = uuid::Uuid::new_v4().to_string();
    let db_pool = configure_database(&database).await;

    let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    let store = PgCredentialStore::new(db_pool.clone(), 4);
    let config = JwtSettings {
        secret: SECRET.to_string(),
        access_token_expiry: 86_400,
        refresh_token_expiry: 604_800,
    };
    let gateway = AuthGateway::from_settings(
        &config,
        Arc::new(store.clone()),
        Arc::new(InMemoryRefreshTokenRegistry::new()),
    )
    .expect("Failed to build gateway");

    let server = run(listener, gateway).expect("Failed to bind address");
    let _ = tokio::spawn(server);

    Some(TestApp {
        address,
        db_pool,
        store,
    })
}

pub async fn configure_database(config: &DatabaseSettings) -> PgPool {
    // Create database
    let mut connection = PgConnection::connect(&config.connection_string_without_db())
        .await
        .expect("Failed to connect to Postgres");
    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, config.database_name))
        .await
        .expect("Failed to create database.");
    // Migrate database
    let connection_pool = PgPool::connect(&config.connection_string())
        .await
        .expect("Failed to connect to Postgres.");
    sqlx::migrate!("./migrations")
        .run(&connection_pool)
        .await
        .expect("Failed to migrate the database.");
    connection_pool
}

impl TestApp {
    async fn post(&self, path: &str, body: &Value) -> reqwest::Response {
        reqwest::Client::new()
            .post(&format!("{}{}", &self.address, path))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    async fn signup(&self, username: &str, email: &str) -> reqwest::Response {
        self.post(
            "/auth/signup",
            &json!({"username": username, "password": "pw123", "email": email}),
        )
        .await
    }
}

#[tokio::test]
async fn signup_persists_user_and_rejects_duplicates() {
    let app = match spawn_app().await {
        Some(app) => app,
        None => return,
    };

    let response = app.signup("alice", "a@x.com").await;
    assert_eq!(201, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let user_id = body["user_id"].as_i64().unwrap();

    let (username, email, password_hash): (String, String, String) =
        sqlx::query_as("SELECT username, email, password_hash FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&app.db_pool)
            .await
            .expect("Failed to fetch saved user.");
    assert_eq!(username, "alice");
    assert_eq!(email, "a@x.com");
    assert_ne!(password_hash, "pw123");

    let test_cases = vec![
        ("alice", "other@x.com", "duplicate username"),
        ("alicia", "a@x.com", "duplicate email"),
    ];
    for (username, email, reason) in test_cases {
        let response = app.signup(username, email).await;
        assert_eq!(409, response.status().as_u16(), "Should reject {}", reason);
    }
}

#[tokio::test]
async fn login_and_verify_against_stored_user() {
    let app = match spawn_app().await {
        Some(app) => app,
        None => return,
    };
    assert_eq!(201, app.signup("alice", "a@x.com").await.status().as_u16());

    let wrong = app
        .post("/auth/login", &json!({"username": "alice", "password": "nope"}))
        .await;
    assert_eq!(401, wrong.status().as_u16());

    let response = app
        .post("/auth/login", &json!({"username": "alice", "password": "pw123"}))
        .await;
    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let access_token = body["access_token"].as_str().unwrap();

    let body: Value = app
        .post("/auth/verify", &json!({"token": access_token}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["valid"], true);
    assert_eq!(body["username"], "alice");

    // A well-signed token for a user that is not in the table
    let orphan = TokenCodec::new(SECRET)
        .unwrap()
        .sign(&Claims::new(999_999, TokenKind::Access, 3600))
        .unwrap();
    let body: Value = app
        .post("/auth/verify", &json!({"token": orphan}))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(body["valid"], false);
}

#[tokio::test]
async fn store_reports_missing_and_inactive_users() {
    let app = match spawn_app().await {
        Some(app) => app,
        None => return,
    };

    assert!(matches!(
        app.store.get_user_by_id(999_999).await,
        Err(AppError::Database(DatabaseError::NotFound(_)))
    ));
    assert!(matches!(
        app.store.authenticate_user("nobody", "pw123").await,
        Err(AppError::Auth(AuthError::InvalidCredentials))
    ));

    let user = app.store.create_user("bob", "pw123", "b@x.com").await.unwrap();
    assert!(user.is_active);
    assert_eq!(app.store.get_user_by_id(user.id).await.unwrap().username, "bob");

    sqlx::query("UPDATE users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&app.db_pool)
        .await
        .expect("Failed to deactivate user.");

    assert!(matches!(
        app.store.authenticate_user("bob", "pw123").await,
        Err(AppError::Auth(AuthError::AccountInactive))
    ));
}
