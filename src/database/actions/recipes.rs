use std::collections::{HashMap, HashSet};

use crate::{
    authentication::permissions::ActionType,
    error::{ErrorKind, QueryError},
    filters::RecipeFilter,
    form::{IngredientAmountForm, NewRecipe, RecipeChanges},
    jwt::SessionData,
    schema::{Author, Id, Recipe, RecipeDetail, RecipeIngredient, ShortRecipe, Tag},
};

use sqlx::{PgConnection, Pool, Postgres, QueryBuilder};

use super::{
    get_user_by_id, list_associated_recipes, list_recipe_ingredients, list_recipe_tags,
    list_users_by_ids, AssociationKind,
};

const RECIPE_COLUMNS: &str = "id, author_id, name, image, text, cooking_time";

pub async fn get_recipe(id: Id, pool: &Pool<Postgres>) -> Result<Option<Recipe>, potion::Error> {
    let row: Option<Recipe> =
        sqlx::query_as(&format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = $1"))
            .bind(id)
            .fetch_optional(pool)
            .await
            .map_err(QueryError::from)?;

    Ok(row)
}

/// Recipes matching `filter`, fully described for the requesting user.
pub async fn fetch_recipes(
    filter: &RecipeFilter,
    user_id: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    let mut query = filter.build_query(user_id);
    let recipes: Vec<Recipe> = query
        .build_query_as()
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    describe_recipes(recipes, user_id, pool).await
}

pub async fn get_recipe_detail(
    id: Id,
    user_id: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Option<RecipeDetail>, potion::Error> {
    let recipe = match get_recipe(id, pool).await? {
        Some(recipe) => recipe,
        None => return Ok(None),
    };

    Ok(describe_recipes(vec![recipe], user_id, pool)
        .await?
        .into_iter()
        .next())
}

/// Attaches authors, tags, ingredient amounts and the membership flags of the
/// requesting user. Each relation is loaded once for the whole batch.
pub async fn describe_recipes(
    recipes: Vec<Recipe>,
    user_id: Option<Id>,
    pool: &Pool<Postgres>,
) -> Result<Vec<RecipeDetail>, potion::Error> {
    if recipes.is_empty() {
        return Ok(vec![]);
    }

    let recipe_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.id).collect();
    let mut author_ids: Vec<Id> = recipes.iter().map(|recipe| recipe.author_id).collect();
    author_ids.sort_unstable();
    author_ids.dedup();

    let authors: HashMap<Id, Author> = list_users_by_ids(pool, &author_ids)
        .await?
        .into_iter()
        .map(|user| (user.id, Author::from(user)))
        .collect();

    let mut tags: HashMap<Id, Vec<Tag>> = HashMap::new();
    for tag in list_recipe_tags(pool, &recipe_ids).await? {
        tags.entry(tag.recipe_id).or_default().push(tag.into());
    }

    let mut ingredients: HashMap<Id, Vec<RecipeIngredient>> = HashMap::new();
    for ingredient in list_recipe_ingredients(pool, &recipe_ids).await? {
        ingredients
            .entry(ingredient.recipe_id)
            .or_default()
            .push(ingredient);
    }

    let (favorites, cart) = match user_id {
        Some(user_id) => (
            list_associated_recipes(AssociationKind::Favorite, user_id, &recipe_ids, pool).await?,
            list_associated_recipes(AssociationKind::ShoppingCart, user_id, &recipe_ids, pool)
                .await?,
        ),
        None => (HashSet::new(), HashSet::new()),
    };

    Ok(recipes
        .into_iter()
        .filter_map(|recipe| {
            let author = authors.get(&recipe.author_id)?.clone();
            Some(RecipeDetail {
                id: recipe.id,
                author,
                tags: tags.remove(&recipe.id).unwrap_or_default(),
                ingredients: ingredients.remove(&recipe.id).unwrap_or_default(),
                is_favorited: favorites.contains(&recipe.id),
                is_in_shopping_cart: cart.contains(&recipe.id),
                name: recipe.name,
                image: recipe.image,
                text: recipe.text,
                cooking_time: recipe.cooking_time,
            })
        })
        .collect())
}

/// Loads a recipe the session is allowed to modify.
pub async fn get_recipe_mut(
    id: Id,
    session: &SessionData,
    pool: &Pool<Postgres>,
) -> Result<Recipe, potion::Error> {
    let recipe = get_recipe(id, pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))?;
    session.authenticate(ActionType::ManageOwnRecipes)?;

    if !session.can_manage_recipe_of(recipe.author_id) {
        return Err(ErrorKind::PermissionDenied.default());
    }

    Ok(recipe)
}

pub async fn create_recipe(
    author_id: Id,
    recipe: &NewRecipe,
    pool: &Pool<Postgres>,
) -> Result<Id, potion::Error> {
    ensure_references_exist(
        Some(recipe.tags.as_slice()),
        Some(recipe.ingredients.as_slice()),
        pool,
    )
    .await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let id: (Id,) = sqlx::query_as(
        "
        INSERT INTO recipes (author_id, name, image, text, cooking_time)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id
    ",
    )
    .bind(author_id)
    .bind(&recipe.name)
    .bind(&recipe.image)
    .bind(&recipe.text)
    .bind(recipe.cooking_time)
    .fetch_one(&mut *tr)
    .await
    .map_err(QueryError::from)?;

    replace_recipe_tags(id.0, &recipe.tags, &mut *tr).await?;
    replace_recipe_ingredients(id.0, &recipe.ingredients, &mut *tr).await?;

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    log::info!("> User {author_id} created recipe {}", id.0);
    Ok(id.0)
}

pub async fn update_recipe(
    id: Id,
    changes: &RecipeChanges,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    ensure_references_exist(
        changes.tags.as_deref(),
        changes.ingredients.as_deref(),
        pool,
    )
    .await?;

    let mut tr = pool
        .begin()
        .await
        .map_err(|_| QueryError::new("Could not start transaction".to_owned()))?;

    let scalar_changes = changes.name.is_some()
        || changes.image.is_some()
        || changes.text.is_some()
        || changes.cooking_time.is_some();

    if scalar_changes {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new("UPDATE recipes SET ");
        {
            let mut fields = query_builder.separated(", ");
            if let Some(name) = &changes.name {
                fields.push("name = ").push_bind_unseparated(name.to_owned());
            }
            if let Some(image) = &changes.image {
                fields.push("image = ").push_bind_unseparated(image.to_owned());
            }
            if let Some(text) = &changes.text {
                fields.push("text = ").push_bind_unseparated(text.to_owned());
            }
            if let Some(cooking_time) = changes.cooking_time {
                fields
                    .push("cooking_time = ")
                    .push_bind_unseparated(cooking_time);
            }
        }
        query_builder.push(" WHERE id = ").push_bind(id);

        query_builder
            .build()
            .execute(&mut *tr)
            .await
            .map_err(QueryError::from)?;
    }

    if let Some(tags) = &changes.tags {
        replace_recipe_tags(id, tags, &mut *tr).await?;
    }
    if let Some(ingredients) = &changes.ingredients {
        replace_recipe_ingredients(id, ingredients, &mut *tr).await?;
    }

    tr.commit()
        .await
        .map_err(|_| QueryError::new("Could not commit transaction".to_owned()))?;

    Ok(())
}

/// Deletes a recipe together with its tags, amounts and associations.
/// ATTENTION: DOES NOT CHECK FOR OWNERSHIP BY ITSELF
pub async fn delete_recipe(id: Id, pool: &Pool<Postgres>) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipes WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .map_err(QueryError::from)?;

    log::info!("> Deleted recipe {id}");
    Ok(())
}

/// Every recipe of the user, newest first. Fails when the user does not exist.
pub async fn list_author_recipes(
    author_id: Id,
    pool: &Pool<Postgres>,
) -> Result<Vec<ShortRecipe>, potion::Error> {
    if get_user_by_id(pool, author_id).await?.is_none() {
        return Err(ErrorKind::NotFound.new("No user exists with specified id"));
    }

    let rows: Vec<ShortRecipe> = sqlx::query_as(
        "
        SELECT id, name, image, cooking_time
        FROM recipes
        WHERE author_id = $1
        ORDER BY pub_date DESC, id DESC
    ",
    )
    .bind(author_id)
    .fetch_all(pool)
    .await
    .map_err(QueryError::from)?;

    Ok(rows)
}

async fn ensure_references_exist(
    tags: Option<&[Id]>,
    ingredients: Option<&[IngredientAmountForm]>,
    pool: &Pool<Postgres>,
) -> Result<(), potion::Error> {
    let mut problems: Vec<String> = vec![];

    if let Some(tags) = tags {
        let missing = find_missing_ids("tags", tags, pool).await?;
        if !missing.is_empty() {
            problems.push(format!("tags: Unknown tag ids {}", join_ids(&missing)));
        }
    }

    if let Some(ingredients) = ingredients {
        let ids: Vec<Id> = ingredients.iter().map(|ingredient| ingredient.id).collect();
        let missing = find_missing_ids("ingredients", &ids, pool).await?;
        if !missing.is_empty() {
            problems.push(format!(
                "ingredients: Unknown ingredient ids {}",
                join_ids(&missing)
            ));
        }
    }

    if !problems.is_empty() {
        return Err(ErrorKind::ValidationFailed.new(&problems.join("; ")));
    }

    Ok(())
}

async fn find_missing_ids(
    table: &str,
    ids: &[Id],
    pool: &Pool<Postgres>,
) -> Result<Vec<Id>, potion::Error> {
    let rows: Vec<(Id,)> = sqlx::query_as(&format!("SELECT id FROM {table} WHERE id = ANY($1)"))
        .bind(ids)
        .fetch_all(pool)
        .await
        .map_err(QueryError::from)?;

    let found: HashSet<Id> = rows.into_iter().map(|row| row.0).collect();
    Ok(ids.iter().copied().filter(|id| !found.contains(id)).collect())
}

fn join_ids(ids: &[Id]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<String>>()
        .join(", ")
}

async fn replace_recipe_tags(
    recipe_id: Id,
    tags: &[Id],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if tags.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
    query_builder.push_values(tags, |mut b, tag_id| {
        b.push_bind(recipe_id).push_bind(*tag_id);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}

async fn replace_recipe_ingredients(
    recipe_id: Id,
    ingredients: &[IngredientAmountForm],
    conn: &mut PgConnection,
) -> Result<(), potion::Error> {
    sqlx::query("DELETE FROM ingredient_amounts WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    if ingredients.is_empty() {
        return Ok(());
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredient_amounts (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(ingredients, |mut b, ingredient| {
        b.push_bind(recipe_id)
            .push_bind(ingredient.id)
            .push_bind(ingredient.amount);
    });

    query_builder
        .build()
        .execute(&mut *conn)
        .await
        .map_err(QueryError::from)?;

    Ok(())
}
