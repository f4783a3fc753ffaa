use crate::{
    error::QueryError,
    schema::{Id, User},
};

use sqlx::{Pool, Postgres};

const USER_COLUMNS: &str = "id, username, email, first_name, last_name, role";

pub async fn get_user(
    pool: &Pool<Postgres>,
    username: &str,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE username = $1"))
            .bind(username)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn get_user_by_id(
    pool: &Pool<Postgres>,
    user_id: Id,
) -> Result<Option<User>, potion::Error> {
    let row: Option<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

pub async fn list_users_by_ids(
    pool: &Pool<Postgres>,
    user_ids: &[Id],
) -> Result<Vec<User>, potion::Error> {
    let rows: Vec<User> =
        sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = ANY($1)"))
            .bind(user_ids)
            .fetch_all(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(rows)
}
