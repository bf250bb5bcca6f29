//! User CRUD operations.

use sqlx::SqlitePool;

use crate::error::{DatabaseError, Result};
use crate::models::{Role, User};

/// Fields for creating a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub phone: Option<String>,
    pub role: Role,
    pub active: bool,
}

/// Create a new user.
pub async fn create_user(pool: &SqlitePool, user: &NewUser) -> Result<User> {
    let result = sqlx::query(
        r#"
        INSERT INTO users (name, phone, role, active)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(&user.name)
    .bind(&user.phone)
    .bind(user.role)
    .bind(user.active)
    .execute(pool)
    .await?;

    Ok(User {
        id: result.last_insert_rowid(),
        name: user.name.clone(),
        phone: user.phone.clone(),
        role: user.role,
        active: user.active,
    })
}

/// Get a user by ID.
pub async fn get_user(pool: &SqlitePool, id: i64) -> Result<User> {
    sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, phone, role, active
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "User",
        id: id.to_string(),
    })
}

/// Find the driver registered under a phone number, if any.
pub async fn find_driver_by_phone(pool: &SqlitePool, phone: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, phone, role, active
        FROM users
        WHERE phone = ? AND role = 'driver'
        "#,
    )
    .bind(phone)
    .fetch_optional(pool)
    .await?;

    Ok(user)
}

/// List active mechanics in stable id order.
///
/// The order matters: the workload balancer breaks ties by first-encountered
/// mechanic.
pub async fn list_active_mechanics(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, phone, role, active
        FROM users
        WHERE role = 'mechanic' AND active = 1
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// List active supervisors and admins (the dashboard notification audience).
pub async fn list_supervisors(pool: &SqlitePool) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        r#"
        SELECT id, name, phone, role, active
        FROM users
        WHERE role IN ('supervisor', 'admin') AND active = 1
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(users)
}

/// Activate or deactivate a user.
pub async fn set_active(pool: &SqlitePool, id: i64, active: bool) -> Result<()> {
    let result = sqlx::query("UPDATE users SET active = ? WHERE id = ?")
        .bind(active)
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DatabaseError::NotFound {
            entity: "User",
            id: id.to_string(),
        });
    }

    Ok(())
}
