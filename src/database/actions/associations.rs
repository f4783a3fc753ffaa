use std::collections::HashSet;

use crate::{
    error::{ErrorKind, QueryError},
    schema::{Id, ShortRecipe},
};

use sqlx::{Pool, Postgres};

use super::get_recipe;

/// A (user, recipe) membership relation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    Favorite,
    ShoppingCart,
}

impl AssociationKind {
    fn table(self) -> &'static str {
        match self {
            AssociationKind::Favorite => "favorites",
            AssociationKind::ShoppingCart => "shopping_carts",
        }
    }

    fn already_present(self) -> &'static str {
        match self {
            AssociationKind::Favorite => "Recipe is already in favorites",
            AssociationKind::ShoppingCart => "Recipe is already in the shopping cart",
        }
    }

    fn not_present(self) -> &'static str {
        match self {
            AssociationKind::Favorite => "Recipe is not in favorites",
            AssociationKind::ShoppingCart => "Recipe is not in the shopping cart",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssociationAction {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssociationOutcome {
    Added(ShortRecipe),
    Removed,
}

/// Adds or removes the (user, recipe) association of `kind`.
///
/// Adding is a single insert-if-absent against the composite primary key, so
/// concurrent requests for the same pair cannot both succeed.
pub async fn toggle_association(
    kind: AssociationKind,
    action: AssociationAction,
    user_id: Id,
    recipe_id: Id,
    pool: &Pool<Postgres>,
) -> Result<AssociationOutcome, potion::Error> {
    let recipe = get_recipe(recipe_id, pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))?;

    let table = kind.table();
    match action {
        AssociationAction::Add => {
            let result = sqlx::query(&format!(
                "INSERT INTO {table} (user_id, recipe_id) VALUES ($1, $2) ON CONFLICT DO NOTHING"
            ))
            .bind(user_id)
            .bind(recipe.id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

            if result.rows_affected() == 0 {
                return Err(ErrorKind::ValidationFailed.new(kind.already_present()));
            }

            log::debug!("> User {user_id} added recipe {recipe_id} to {table}");
            Ok(AssociationOutcome::Added(ShortRecipe::from(&recipe)))
        }
        AssociationAction::Remove => {
            let result = sqlx::query(&format!(
                "DELETE FROM {table} WHERE user_id = $1 AND recipe_id = $2"
            ))
            .bind(user_id)
            .bind(recipe.id)
            .execute(pool)
            .await
            .map_err(QueryError::from)?;

            if result.rows_affected() == 0 {
                return Err(ErrorKind::NotFound.new(kind.not_present()));
            }

            log::debug!("> User {user_id} removed recipe {recipe_id} from {table}");
            Ok(AssociationOutcome::Removed)
        }
    }
}

/// Which of `recipe_ids` the user has in the `kind` relation.
pub async fn list_associated_recipes(
    kind: AssociationKind,
    user_id: Id,
    recipe_ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<HashSet<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!(
        "SELECT recipe_id FROM {} WHERE user_id = $1 AND recipe_id = ANY($2)",
        kind.table()
    ))
    .bind(user_id)
    .bind(recipe_ids)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows.into_iter().map(|row| row.0).collect())
}
