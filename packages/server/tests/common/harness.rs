//! Shared Postgres container for integration tests.
//!
//! One container serves the whole test binary; each test gets its own
//! database inside it, so tests that lease from the queue never see each
//! other's jobs.

use sqlx::postgres::{PgPool, PgPoolOptions};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;
use uuid::Uuid;

struct SharedPostgres {
    host: String,
    port: u16,
    _container: ContainerAsync<Postgres>,
}

static SHARED: OnceCell<SharedPostgres> = OnceCell::const_new();

async fn shared_postgres() -> &'static SharedPostgres {
    SHARED
        .get_or_init(|| async {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .with_test_writer()
                .try_init();

            let container = Postgres::default()
                .with_tag("16")
                .with_cmd(["-c", "max_connections=200"])
                .start()
                .await
                .expect("failed to start postgres container");
            let host = container
                .get_host()
                .await
                .expect("container host")
                .to_string();
            let port = container
                .get_host_port_ipv4(5432)
                .await
                .expect("container port");

            SharedPostgres {
                host,
                port,
                _container: container,
            }
        })
        .await
}

/// Connect to a fresh database with the schema applied.
pub async fn test_pool() -> PgPool {
    let shared = shared_postgres().await;

    let admin_url = format!(
        "postgresql://postgres:postgres@{}:{}/postgres",
        shared.host, shared.port
    );
    let admin = PgPool::connect(&admin_url)
        .await
        .expect("admin connection");

    let db_name = format!("revmine_test_{}", Uuid::new_v4().simple());
    sqlx::query(&format!(r#"CREATE DATABASE "{db_name}""#))
        .execute(&admin)
        .await
        .expect("create test database");
    admin.close().await;

    let url = format!(
        "postgresql://postgres:postgres@{}:{}/{}",
        shared.host, shared.port, db_name
    );
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .expect("test database connection");

    server_core::store::run_migrations(&pool)
        .await
        .expect("migrations");
    pool
}
