//! Database configuration module for the borrow tracker.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. The connection
//! pool is opened once at startup, handed to every service that needs it, and closed with
//! [`close_connection`] at shutdown.

use crate::entities::{Borrow, BorrowDetail, Inventory, ReturnRecord, User};
use crate::errors::Result;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/borrow_tracker.sqlite?mode=rwc";

/// Gets the database URL from the `DATABASE_URL` environment variable, falling back to
/// a local `SQLite` file.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes the connection pool for the configured database.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to database at {}", database_url);
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Drains and closes the connection pool.
pub async fn close_connection(db: DatabaseConnection) -> Result<()> {
    db.close().await?;
    info!("Database connection closed");
    Ok(())
}

async fn create_table<E>(db: &DatabaseConnection, schema: &Schema, entity: E) -> Result<()>
where
    E: EntityTrait,
{
    let builder = db.get_database_backend();
    let mut statement = schema.create_table_from_entity(entity);
    statement.if_not_exists();
    db.execute(builder.build(&statement)).await?;
    Ok(())
}

/// Creates all tables from the entity definitions, parents before children.
///
/// Existing tables are left untouched, so this is safe to run on every startup.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let schema = Schema::new(db.get_database_backend());

    create_table(db, &schema, User).await?;
    create_table(db, &schema, Inventory).await?;
    create_table(db, &schema, Borrow).await?;
    create_table(db, &schema, BorrowDetail).await?;
    create_table(db, &schema, ReturnRecord).await?;

    Ok(())
}
