use sqlx::PgPool;

use crate::error::Result;
use crate::models::User;

pub async fn create(
    pool: &PgPool,
    id: &str,
    email: &str,
    password_hash: &str,
    nickname: &str,
) -> Result<User> {
    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (id, email, password, nickname, role, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, 'user', 'active', now(), now())
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(email)
    .bind(password_hash)
    .bind(nickname)
    .fetch_one(pool)
    .await?;

    Ok(user)
}

pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn find_by_id(pool: &PgPool, id: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(user)
}

pub async fn update_nickname(pool: &PgPool, id: &str, nickname: &str) -> Result<()> {
    sqlx::query("UPDATE users SET nickname = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(nickname)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn update_password(pool: &PgPool, id: &str, password_hash: &str) -> Result<()> {
    sqlx::query("UPDATE users SET password = $2, updated_at = now() WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(pool)
        .await?;
    Ok(())
}
