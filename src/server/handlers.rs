use std::sync::Arc;

use warp::{
    http::StatusCode,
    reply::{self, Reply, Response},
};

use crate::{
    actions::{
        create_recipe as insert_recipe, delete_recipe as remove_recipe, fetch_recipes,
        get_ingredient as find_ingredient, get_recipe_detail, get_recipe_mut,
        get_tag as find_tag, list_author_recipes, list_shopping_list, list_tags as all_tags,
        search_ingredients, toggle_association, update_recipe as change_recipe, AssociationAction,
        AssociationKind, AssociationOutcome,
    },
    authentication::permissions::ActionType,
    cache::cache::{CacheKeyType, RedisValue},
    constants::SHOPPING_LIST_FILENAME,
    error::ErrorKind,
    filters::{IngredientSearchFilter, RecipeFilter},
    form::{NewRecipe, QueryParams, RecipeForm},
    jwt::SessionData,
    schema::{Id, Ingredient, RecipeDetail, Tag},
    shopping_list::render_shopping_list,
    state::State,
};

use super::reply::{empty_reply, json_reply};

type HandlerResult = Result<Response, potion::Error>;

// Tags

pub async fn list_tags(state: Arc<State>) -> HandlerResult {
    let tags = match state.cache.clone() {
        Some(mut cache) => {
            let pool = state.pool.clone();
            RedisValue::<Vec<Tag>>::get_or(
                &CacheKeyType::TagList.new("all"),
                &mut cache,
                move || async move { all_tags(&pool).await },
            )
            .await?
        }
        None => all_tags(&state.pool).await?,
    };

    Ok(json_reply(&tags, StatusCode::OK))
}

pub async fn get_tag(id: Id, state: Arc<State>) -> HandlerResult {
    let tag = find_tag(id, &state.pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No tag exists with specified id"))?;

    Ok(json_reply(&tag, StatusCode::OK))
}

// Ingredients

pub async fn list_ingredients(params: QueryParams, state: Arc<State>) -> HandlerResult {
    let filter = IngredientSearchFilter::from_query(&params);

    let ingredients = match (filter.cache_key(), state.cache.clone()) {
        (Some(key), Some(mut cache)) => {
            let pool = state.pool.clone();
            RedisValue::<Vec<Ingredient>>::get_or(&key, &mut cache, move || async move {
                search_ingredients(&filter, &pool).await
            })
            .await?
        }
        _ => search_ingredients(&filter, &state.pool).await?,
    };

    Ok(json_reply(&ingredients, StatusCode::OK))
}

pub async fn get_ingredient(id: Id, state: Arc<State>) -> HandlerResult {
    let ingredient = find_ingredient(id, &state.pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No ingredient exists with specified id"))?;

    Ok(json_reply(&ingredient, StatusCode::OK))
}

// Recipes

pub async fn list_recipes(
    params: QueryParams,
    session: Option<SessionData>,
    state: Arc<State>,
) -> HandlerResult {
    let filter = RecipeFilter::from_query(&params);
    let user_id = session.map(|session| session.user_id);

    let recipes = fetch_recipes(&filter, user_id, &state.pool).await?;
    Ok(json_reply(&recipes, StatusCode::OK))
}

pub async fn get_recipe(id: Id, session: Option<SessionData>, state: Arc<State>) -> HandlerResult {
    let user_id = session.map(|session| session.user_id);
    let recipe = load_recipe_detail(id, user_id, &state).await?;

    Ok(json_reply(&recipe, StatusCode::OK))
}

pub async fn create_recipe(
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> HandlerResult {
    session.authenticate(ActionType::CreateRecipes)?;

    let recipe = NewRecipe::try_from(form.validate()?)?;
    let id = insert_recipe(session.user_id, &recipe, &state.pool).await?;

    let recipe = load_recipe_detail(id, Some(session.user_id), &state).await?;
    Ok(json_reply(&recipe, StatusCode::CREATED))
}

pub async fn update_recipe(
    id: Id,
    session: SessionData,
    form: RecipeForm,
    state: Arc<State>,
) -> HandlerResult {
    get_recipe_mut(id, &session, &state.pool).await?;

    let changes = form.validate()?;
    if !changes.is_empty() {
        change_recipe(id, &changes, &state.pool).await?;
    }

    let recipe = load_recipe_detail(id, Some(session.user_id), &state).await?;
    Ok(json_reply(&recipe, StatusCode::OK))
}

pub async fn delete_recipe(id: Id, session: SessionData, state: Arc<State>) -> HandlerResult {
    get_recipe_mut(id, &session, &state.pool).await?;
    remove_recipe(id, &state.pool).await?;

    Ok(empty_reply(StatusCode::NO_CONTENT))
}

async fn load_recipe_detail(
    id: Id,
    user_id: Option<Id>,
    state: &State,
) -> Result<RecipeDetail, potion::Error> {
    get_recipe_detail(id, user_id, &state.pool)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))
}

// Favorites and shopping cart

pub async fn manage_association(
    id: Id,
    kind: AssociationKind,
    action: AssociationAction,
    session: SessionData,
    state: Arc<State>,
) -> HandlerResult {
    session.authenticate(match kind {
        AssociationKind::Favorite => ActionType::ManageOwnFavorites,
        AssociationKind::ShoppingCart => ActionType::ManageOwnShoppingCart,
    })?;

    match toggle_association(kind, action, session.user_id, id, &state.pool).await? {
        AssociationOutcome::Added(recipe) => Ok(json_reply(&recipe, StatusCode::CREATED)),
        AssociationOutcome::Removed => Ok(empty_reply(StatusCode::NO_CONTENT)),
    }
}

pub async fn download_shopping_cart(session: SessionData, state: Arc<State>) -> HandlerResult {
    session.authenticate(ActionType::ManageOwnShoppingCart)?;

    let entries = list_shopping_list(session.user_id, &state.pool).await?;
    let body = render_shopping_list(&entries);

    let response = reply::with_header(body, "content-type", "text/plain; charset=utf-8");
    let response = reply::with_header(
        response,
        "content-disposition",
        format!("attachment; filename=\"{SHOPPING_LIST_FILENAME}\""),
    );

    Ok(response.into_response())
}

// Authors

pub async fn author_recipes(user_id: Id, _session: SessionData, state: Arc<State>) -> HandlerResult {
    let recipes = list_author_recipes(user_id, &state.pool).await?;

    Ok(json_reply(&recipes, StatusCode::OK))
}
