//! User directory - Lookup and registration of borrowers and staff.
//!
//! The lending core only needs to resolve users by id and read their role and contact
//! number. Registration is kept here so a fresh database can be populated without an
//! external identity service.

use crate::{
    entities::{User, UserRole, user},
    errors::{Error, Result},
};
use chrono::Utc;
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Registration data for a new user
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    /// Phone number used for WhatsApp notifications
    pub number: String,
    /// Password hash produced by the authentication layer
    pub password: String,
    pub role: UserRole,
}

/// Finds a user by id.
pub async fn get_user_by_id<C>(db: &C, user_id: i64) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Finds a user by id, only if they hold the ADMIN role.
pub async fn get_admin_by_id(db: &DatabaseConnection, user_id: i64) -> Result<Option<user::Model>> {
    User::find_by_id(user_id)
        .filter(user::Column::Role.eq(UserRole::Admin))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all users, newest first.
pub async fn get_all_users(db: &DatabaseConnection) -> Result<Vec<user::Model>> {
    User::find()
        .order_by_desc(user::Column::CreatedAt)
        .order_by_desc(user::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

async fn ensure_unique(
    db: &DatabaseConnection,
    column: user::Column,
    field: &'static str,
    value: &str,
) -> Result<()> {
    let existing = User::find().filter(column.eq(value)).one(db).await?;
    if existing.is_some() {
        return Err(Error::AlreadyExists {
            entity: "User",
            field,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Registers a new user.
///
/// Username, email and number must all be non-empty and unused.
pub async fn create_user(db: &DatabaseConnection, new_user: NewUser) -> Result<user::Model> {
    let username = new_user.username.trim().to_string();
    let email = new_user.email.trim().to_string();
    let number = new_user.number.trim().to_string();

    if username.is_empty() {
        return Err(Error::validation("Username is required"));
    }
    if email.is_empty() {
        return Err(Error::validation("Email is required"));
    }
    if number.is_empty() {
        return Err(Error::validation("Phone number is required"));
    }
    if new_user.password.is_empty() {
        return Err(Error::validation("Password is required"));
    }

    ensure_unique(db, user::Column::Username, "username", &username).await?;
    ensure_unique(db, user::Column::Email, "email", &email).await?;
    ensure_unique(db, user::Column::Number, "number", &number).await?;

    let now = Utc::now();
    let created = user::ActiveModel {
        username: Set(username),
        email: Set(email),
        number: Set(number),
        password: Set(new_user.password),
        role: Set(new_user.role),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;

    info!("Registered user {} as {}", created.username, created.role);
    Ok(created)
}

/// Changes a user's role.
pub async fn update_user_role(
    db: &DatabaseConnection,
    user_id: i64,
    role: UserRole,
) -> Result<user::Model> {
    let existing = get_user_by_id(db, user_id)
        .await?
        .ok_or_else(|| Error::not_found("User", user_id))?;

    let mut active: user::ActiveModel = existing.into();
    active.role = Set(role);
    active.updated_at = Set(Utc::now());
    let updated = active.update(db).await?;

    info!("User {} now has role {}", updated.id, updated.role);
    Ok(updated)
}

/// Whether the user has a usable contact number.
#[must_use]
pub fn has_contact_number(user: &user::Model) -> bool {
    !user.number.trim().is_empty()
}
