use crate::{
    error::QueryError,
    schema::{Id, LinkedRecipeTag, NewTag, Tag},
};

use sqlx::{Pool, Postgres, QueryBuilder};

pub async fn get_tag(id: Id, pool: &Pool<Postgres>) -> Result<Option<Tag>, potion::Error> {
    let tag: Option<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(tag)
}

pub async fn list_tags(pool: &Pool<Postgres>) -> Result<Vec<Tag>, potion::Error> {
    let list: Vec<Tag> = sqlx::query_as("SELECT id, name, color, slug FROM tags ORDER BY name, id")
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(list)
}

/// Tags of every recipe in `recipe_ids`, in a single round trip.
pub async fn list_recipe_tags(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<Vec<LinkedRecipeTag>, potion::Error> {
    let list: Vec<LinkedRecipeTag> = sqlx::query_as(
        "
        SELECT rt.recipe_id AS recipe_id, t.id AS id, t.name AS name, t.color AS color, t.slug AS slug
        FROM recipe_tags rt
        INNER JOIN tags t ON t.id = rt.tag_id
        WHERE rt.recipe_id = ANY($1)
        ORDER BY t.name, t.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(list)
}

/// Inserts the tags that do not exist yet and returns how many were new.
pub async fn insert_tags(tags: &[NewTag], pool: &Pool<Postgres>) -> Result<u64, potion::Error> {
    if tags.is_empty() {
        return Ok(0);
    }

    let mut inserted = 0;
    // Postgres caps a statement at 65535 bind parameters.
    for chunk in tags.chunks(65535 / 3) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO tags (name, color, slug) ");

        query_builder.push_values(chunk, |mut b, tag| {
            b.push_bind(tag.name.to_owned())
                .push_bind(tag.color.to_owned())
                .push_bind(tag.slug.to_owned());
        });
        query_builder.push(" ON CONFLICT DO NOTHING");

        let result = query_builder
            .build()
            .execute(pool)
            .await
            .map_err(QueryError::from)?;
        inserted += result.rows_affected();
    }

    Ok(inserted)
}
