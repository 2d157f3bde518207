use std::str::FromStr;

use coursedeck_auth::{AuthError, Authenticator, Role};
use coursedeck_config::AuthConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tempfile::TempDir;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations");

async fn test_pool() -> (SqlitePool, TempDir) {
    let temp_dir = TempDir::new().expect("create temp dir");
    let db_path = temp_dir.path().join("auth_tests.sqlite");
    let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", db_path.display()))
        .expect("parse sqlite url")
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(2)
        .connect_with(options)
        .await
        .expect("connect sqlite");

    MIGRATOR.run(&pool).await.expect("run migrations");
    (pool, temp_dir)
}

fn authenticator(pool: SqlitePool) -> Authenticator {
    Authenticator::new(pool, AuthConfig::default())
}

#[tokio::test]
async fn signup_issues_usable_session() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    let (user, session) = auth
        .signup("Ada", "ada@example.com", "hunter22")
        .await
        .expect("signup");

    assert_eq!(user.role, Role::Unset);
    let (resolved, _) = auth
        .authenticate_token(&session.token)
        .await
        .expect("token should authenticate");
    assert_eq!(resolved.public_id, user.public_id);
}

#[tokio::test]
async fn signup_rejects_duplicate_email() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    auth.signup("Ada", "ada@example.com", "hunter22")
        .await
        .expect("first signup");
    let err = auth
        .signup("Ada Again", "ada@example.com", "hunter22")
        .await
        .expect_err("duplicate email must fail");
    assert!(matches!(err, AuthError::UserExists));
}

#[tokio::test]
async fn login_rejects_wrong_password() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    auth.signup("Ada", "ada@example.com", "hunter22")
        .await
        .expect("signup");
    let err = auth
        .login("ada@example.com", "wrong")
        .await
        .expect_err("wrong password must fail");
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn relogin_marks_old_session_stale() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    let (_, first) = auth
        .signup("Ada", "ada@example.com", "hunter22")
        .await
        .expect("signup");
    let (_, second) = auth
        .login("ada@example.com", "hunter22")
        .await
        .expect("login");

    let err = auth
        .authenticate_token(&first.token)
        .await
        .expect_err("superseded token must be rejected");
    assert!(matches!(err, AuthError::StaleToken));
    assert_eq!(err.to_string(), "Invalid token");

    auth.authenticate_token(&second.token)
        .await
        .expect("fresh token still valid");
}

#[tokio::test]
async fn select_role_persists() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    let (user, session) = auth
        .signup("Ada", "ada@example.com", "hunter22")
        .await
        .expect("signup");
    auth.select_role(user.id, Role::Instructor)
        .await
        .expect("select role");

    let (resolved, _) = auth
        .authenticate_token(&session.token)
        .await
        .expect("authenticate");
    assert_eq!(resolved.role, Role::Instructor);
}

#[tokio::test]
async fn unknown_token_is_not_found() {
    let (pool, _dir) = test_pool().await;
    let auth = authenticator(pool);

    let err = auth
        .authenticate_token("no-such-token")
        .await
        .expect_err("unknown token");
    assert!(matches!(err, AuthError::SessionNotFound));
}
