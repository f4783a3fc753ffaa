use crate::{
    error::QueryError,
    filters::IngredientSearchFilter,
    schema::{Id, Ingredient, NewIngredient, RecipeIngredient, ShoppingListEntry},
};

use sqlx::{Pool, Postgres, QueryBuilder};

pub async fn search_ingredients(
    filter: &IngredientSearchFilter,
    pool: &Pool<Postgres>,
) -> Result<Vec<Ingredient>, potion::Error> {
    let mut query = filter.build_query();
    let rows: Vec<Ingredient> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    Ok(rows)
}

pub async fn get_ingredient(
    id: Id,
    pool: &Pool<Postgres>,
) -> Result<Option<Ingredient>, potion::Error> {
    let row: Option<Ingredient> =
        sqlx::query_as("SELECT id, name, measurement_unit FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Ingredient amounts of every recipe in `recipe_ids`.
pub async fn list_recipe_ingredients(
    pool: &Pool<Postgres>,
    recipe_ids: &[Id],
) -> Result<Vec<RecipeIngredient>, potion::Error> {
    let rows: Vec<RecipeIngredient> = sqlx::query_as(
        "
        SELECT ia.recipe_id AS recipe_id, i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, ia.amount AS amount
        FROM ingredient_amounts ia
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE ia.recipe_id = ANY($1)
        ORDER BY ia.id
    ",
    )
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// The user's shopping list: amounts of every recipe in the cart summed per
/// ingredient name and unit, ordered case-insensitively by name.
pub async fn list_shopping_list(
    user_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShoppingListEntry>, potion::Error> {
    let rows: Vec<ShoppingListEntry> = sqlx::query_as(
        "
        SELECT i.name AS name, i.measurement_unit AS measurement_unit, SUM(ia.amount)::BIGINT AS total
        FROM shopping_carts sc
        INNER JOIN ingredient_amounts ia ON ia.recipe_id = sc.recipe_id
        INNER JOIN ingredients i ON i.id = ia.ingredient_id
        WHERE sc.user_id = $1
        GROUP BY i.name, i.measurement_unit
        ORDER BY LOWER(i.name), i.name, i.measurement_unit
    ",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

/// Inserts the ingredients that do not exist yet and returns how many were new.
pub async fn insert_ingredients(
    ingredients: &[NewIngredient],
    pool: &Pool<Postgres>,
) -> Result<u64, potion::Error> {
    let mut inserted = 0;
    for chunk in ingredients.chunks(65535 / 2) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");

        query_builder.push_values(chunk, |mut b, ingredient| {
            b.push_bind(ingredient.name.to_owned())
                .push_bind(ingredient.measurement_unit.to_owned());
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
