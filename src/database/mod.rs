//! # Database
//!
//! Connection pooling and schema migrations for the PostgreSQL store.
//!
//! ```rust,ignore
//! #[sqlx::test(migrator = "leadflow_core::database::MIGRATOR")]
//! async fn test_feature(pool: PgPool) { /* ... */ }
//! ```

pub mod connection;

pub use connection::{connect, run_migrations, DatabaseConnection, MIGRATOR};
