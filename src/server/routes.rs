use std::{convert::Infallible, sync::Arc};

use serde::de::DeserializeOwned;
use warp::{
    filters::BoxedFilter,
    reject::Rejection,
    reply::{Reply, Response},
    Filter,
};

use crate::{
    actions::{AssociationAction, AssociationKind},
    constants::API_PREFIX,
    form::QueryParams,
    middleware::{with_possible_session, with_session},
    schema::Id,
    state::State,
};

use super::{
    handlers,
    reply::{finish, handle_rejection},
};

const MAX_BODY_SIZE: u64 = 1024 * 1024;

/// Every endpoint under `/api`, with request logging and the JSON error
/// envelope for rejections.
pub fn routes(
    state: Arc<State>,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    warp::path(API_PREFIX)
        .and(
            tag_routes(state.clone())
                .or(ingredient_routes(state.clone()))
                .unify()
                .or(recipe_routes(state))
                .unify(),
        )
        .with(warp::log("foodgram::api"))
        .recover(handle_rejection)
}

fn with_state(state: Arc<State>) -> impl Filter<Extract = (Arc<State>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

fn with_params() -> impl Filter<Extract = (QueryParams,), Error = Rejection> + Clone {
    warp::query::<Vec<(String, String)>>().map(QueryParams::from_pairs)
}

fn json_body<T: DeserializeOwned + Send>() -> impl Filter<Extract = (T,), Error = Rejection> + Clone
{
    warp::body::content_length_limit(MAX_BODY_SIZE).and(warp::body::json())
}

fn with_kind(
    kind: AssociationKind,
) -> impl Filter<Extract = (AssociationKind,), Error = Infallible> + Clone {
    warp::any().map(move || kind)
}

/// POST adds the association, DELETE removes it.
fn association_action() -> impl Filter<Extract = (AssociationAction,), Error = Rejection> + Clone {
    warp::post()
        .map(|| AssociationAction::Add)
        .or(warp::delete().map(|| AssociationAction::Remove))
        .unify()
}

fn tag_routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("tags")
        .and(warp::get())
        .and(with_state(state.clone()))
        .then(handlers::list_tags)
        .map(finish);

    let retrieve = warp::path!("tags" / Id)
        .and(warp::get())
        .and(with_state(state))
        .then(handlers::get_tag)
        .map(finish);

    list.or(retrieve).unify().boxed()
}

fn ingredient_routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("ingredients")
        .and(warp::get())
        .and(with_params())
        .and(with_state(state.clone()))
        .then(handlers::list_ingredients)
        .map(finish);

    let retrieve = warp::path!("ingredients" / Id)
        .and(warp::get())
        .and(with_state(state))
        .then(handlers::get_ingredient)
        .map(finish);

    list.or(retrieve).unify().boxed()
}

fn recipe_routes(state: Arc<State>) -> BoxedFilter<(Response,)> {
    let list = warp::path!("recipes")
        .and(warp::get())
        .and(with_params())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::list_recipes)
        .map(finish);

    let create = warp::path!("recipes")
        .and(warp::post())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .then(handlers::create_recipe)
        .map(finish);

    let download = warp::path!("recipes" / "download_shopping_cart")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::download_shopping_cart)
        .map(finish);

    let retrieve = warp::path!("recipes" / Id)
        .and(warp::get())
        .and(with_possible_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::get_recipe)
        .map(finish);

    let update = warp::path!("recipes" / Id)
        .and(warp::patch())
        .and(with_session(state.clone()))
        .and(json_body())
        .and(with_state(state.clone()))
        .then(handlers::update_recipe)
        .map(finish);

    let delete = warp::path!("recipes" / Id)
        .and(warp::delete())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::delete_recipe)
        .map(finish);

    let favorite = warp::path!("recipes" / Id / "favorite")
        .and(with_kind(AssociationKind::Favorite))
        .and(association_action())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::manage_association)
        .map(finish);

    let shopping_cart = warp::path!("recipes" / Id / "shopping_cart")
        .and(with_kind(AssociationKind::ShoppingCart))
        .and(association_action())
        .and(with_session(state.clone()))
        .and(with_state(state.clone()))
        .then(handlers::manage_association)
        .map(finish);

    let author_recipes = warp::path!("recipes" / Id / "author_recipes")
        .and(warp::get())
        .and(with_session(state.clone()))
        .and(with_state(state))
        .then(handlers::author_recipes)
        .map(finish);

    list.or(create)
        .unify()
        .or(download)
        .unify()
        .or(retrieve)
        .unify()
        .or(update)
        .unify()
        .or(delete)
        .unify()
        .or(favorite)
        .unify()
        .or(shopping_cart)
        .unify()
        .or(author_recipes)
        .unify()
        .boxed()
}
