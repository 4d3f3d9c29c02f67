//! User management commands.
//!
//! Passwords belong to the external auth service, so users created here
//! have an empty `password_hash`.

use sqlx::PgPool;

use bookshelf_core::UserId;

use super::CommandError;

/// Create a user, or update the name and admin flag of an existing one.
pub async fn create(
    pool: &PgPool,
    email: &str,
    name: &str,
    is_admin: bool,
) -> Result<UserId, CommandError> {
    let email = email.trim().to_lowercase();
    if !email.contains('@') {
        return Err(CommandError::InvalidInput(format!("invalid email: {email}")));
    }

    let id = sqlx::query_scalar::<_, UserId>(
        r"
        INSERT INTO users (email, full_name, is_admin)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO UPDATE
            SET full_name = EXCLUDED.full_name, is_admin = EXCLUDED.is_admin
        RETURNING id
        ",
    )
    .bind(&email)
    .bind(name)
    .bind(is_admin)
    .fetch_one(pool)
    .await?;

    tracing::info!(user_id = %id, %email, is_admin, "User saved");
    Ok(id)
}
