//! End-to-end flows against a live database. Each test skips itself when
//! `DATABASE_URL` is not set.

mod common;

use std::{collections::HashSet, sync::Arc};

use foodgram_backend::{server::routes, state::State};
use serde_json::{json, Value};
use warp::{
    http::{Response, StatusCode},
    hyper::body::Bytes,
    test::RequestBuilder,
};

use common::{
    auth, database_state, seed_ingredient, seed_named_user, seed_tag, seed_user, unique,
};

fn body_json(response: &Response<Bytes>) -> Value {
    serde_json::from_slice(response.body()).expect("json body")
}

macro_rules! state_or_skip {
    () => {
        match database_state().await {
            Some(state) => state,
            None => {
                eprintln!("DATABASE_URL not set, skipping");
                return;
            }
        }
    };
}

async fn send(state: &Arc<State>, request: RequestBuilder) -> Response<Bytes> {
    request.reply(&routes(state.clone())).await
}

async fn create_recipe(
    state: &Arc<State>,
    token: &str,
    name: &str,
    tags: &[i32],
    ingredients: &[(i32, i32)],
) -> i32 {
    let ingredients: Vec<Value> = ingredients
        .iter()
        .map(|(id, amount)| json!({ "id": id, "amount": amount }))
        .collect();

    let response = send(
        state,
        warp::test::request()
            .method("POST")
            .path("/api/recipes")
            .header("authorization", auth(token))
            .json(&json!({
                "name": name,
                "text": "Mix everything",
                "image": "data:image/png;base64,AAAA",
                "cooking_time": 10,
                "tags": tags,
                "ingredients": ingredients,
            })),
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(&response)["id"].as_i64().expect("recipe id") as i32
}

fn ids(value: &Value) -> HashSet<i64> {
    value
        .as_array()
        .expect("list")
        .iter()
        .map(|recipe| recipe["id"].as_i64().expect("id"))
        .collect()
}

#[tokio::test]
async fn favorite_lifecycle() {
    let state = state_or_skip!();
    let (user_id, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let flour = seed_ingredient(&state.pool, &unique("flour"), "g").await;

    let recipe = create_recipe(&state, &token, "Bread", &[tag], &[(flour, 500)]).await;
    let path = format!("/api/recipes/{recipe}/favorite");

    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path(&path)
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let short = body_json(&response);
    assert_eq!(short["id"], json!(recipe));
    assert_eq!(short["name"], json!("Bread"));
    assert_eq!(short["cooking_time"], json!(10));
    assert!(short.get("text").is_none());

    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path(&path)
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(&response)["detail"],
        json!("Recipe is already in favorites")
    );

    let response = send(
        &state,
        warp::test::request()
            .path(&format!("/api/recipes/{recipe}"))
            .header("authorization", auth(&token)),
    )
    .await;
    let detail = body_json(&response);
    assert_eq!(detail["is_favorited"], json!(true));
    assert_eq!(detail["is_in_shopping_cart"], json!(false));
    assert_eq!(detail["author"]["id"], json!(user_id));

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe)
            .fetch_one(&state.pool)
            .await
            .expect("count");
    assert_eq!(count.0, 1);

    for expected in [StatusCode::NO_CONTENT, StatusCode::NOT_FOUND] {
        let response = send(
            &state,
            warp::test::request()
                .method("DELETE")
                .path(&path)
                .header("authorization", auth(&token)),
        )
        .await;
        assert_eq!(response.status(), expected);
    }

    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path("/api/recipes/2147483647/favorite")
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn concurrent_duplicate_favorites_succeed_once() {
    let state = state_or_skip!();
    let (user_id, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let rice = seed_ingredient(&state.pool, &unique("rice"), "g").await;

    let recipe = create_recipe(&state, &token, "Risotto", &[tag], &[(rice, 300)]).await;
    let path = format!("/api/recipes/{recipe}/favorite");
    let favorite = || {
        warp::test::request()
            .method("POST")
            .path(&path)
            .header("authorization", auth(&token))
    };

    let (first, second) = tokio::join!(send(&state, favorite()), send(&state, favorite()));
    let mut statuses = vec![first.status(), second.status()];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let count: (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM favorites WHERE user_id = $1 AND recipe_id = $2")
            .bind(user_id)
            .bind(recipe)
            .fetch_one(&state.pool)
            .await
            .expect("count");
    assert_eq!(count.0, 1);
}

#[tokio::test]
async fn numeric_author_also_matches_a_username() {
    let state = state_or_skip!();
    let (author_id, author) = seed_user(&state).await;
    let (_, namesake) = seed_named_user(&state, &author_id.to_string()).await;
    let (_, bystander) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let oats = seed_ingredient(&state.pool, &unique("oats"), "g").await;

    let by_id = create_recipe(&state, &author, "Granola", &[tag], &[(oats, 100)]).await;
    let by_username = create_recipe(&state, &namesake, "Flapjack", &[tag], &[(oats, 200)]).await;
    create_recipe(&state, &bystander, "Muesli", &[tag], &[(oats, 50)]).await;

    let response = send(
        &state,
        warp::test::request().path(&format!("/api/recipes?author={author_id}")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        ids(&body_json(&response)),
        HashSet::from([by_id as i64, by_username as i64])
    );
}

#[tokio::test]
async fn removing_a_never_added_cart_entry_is_not_found() {
    let state = state_or_skip!();
    let (_, author) = seed_user(&state).await;
    let (_, other) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let salt = seed_ingredient(&state.pool, &unique("salt"), "pinch").await;

    let recipe = create_recipe(&state, &author, "Soup", &[tag], &[(salt, 1)]).await;

    let response = send(
        &state,
        warp::test::request()
            .method("DELETE")
            .path(&format!("/api/recipes/{recipe}/shopping_cart"))
            .header("authorization", auth(&other)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(&response)["detail"],
        json!("Recipe is not in the shopping cart")
    );
}

#[tokio::test]
async fn shopping_list_sums_per_ingredient_and_unit() {
    let state = state_or_skip!();
    let (_, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let flour_name = unique("flour");
    let sugar_name = unique("sugar");
    let flour = seed_ingredient(&state.pool, &flour_name, "g").await;
    let sugar = seed_ingredient(&state.pool, &sugar_name, "g").await;

    let cake = create_recipe(&state, &token, "Cake", &[tag], &[(flour, 100), (sugar, 20)]).await;
    let bread = create_recipe(&state, &token, "Bread", &[tag], &[(flour, 50)]).await;

    let response = send(
        &state,
        warp::test::request()
            .path("/api/recipes/download_shopping_cart")
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body().as_ref(), b"Shopping list\n\nNothing to buy\n");

    for recipe in [cake, bread] {
        let response = send(
            &state,
            warp::test::request()
                .method("POST")
                .path(&format!("/api/recipes/{recipe}/shopping_cart"))
                .header("authorization", auth(&token)),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    let response = send(
        &state,
        warp::test::request()
            .path("/api/recipes/download_shopping_cart")
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"shopping_cart.txt\""
    );
    assert!(response.headers()["content-type"]
        .to_str()
        .expect("ascii header")
        .starts_with("text/plain"));
    assert_eq!(
        String::from_utf8_lossy(response.body()),
        format!("Shopping list\n\n{flour_name} (g) - 150\n{sugar_name} (g) - 20\n")
    );
}

#[tokio::test]
async fn shopping_list_orders_names_case_insensitively() {
    let state = state_or_skip!();
    let (_, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let suffix = unique("x");
    let sugar_name = format!("Sugar {suffix}");
    let apple_name = format!("apple {suffix}");
    let sugar = seed_ingredient(&state.pool, &sugar_name, "g").await;
    let apple = seed_ingredient(&state.pool, &apple_name, "pcs").await;

    let pie = create_recipe(&state, &token, "Pie", &[tag], &[(sugar, 30), (apple, 4)]).await;
    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path(&format!("/api/recipes/{pie}/shopping_cart"))
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = send(
        &state,
        warp::test::request()
            .path("/api/recipes/download_shopping_cart")
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(
        String::from_utf8_lossy(response.body()),
        format!("Shopping list\n\n{apple_name} (pcs) - 4\n{sugar_name} (g) - 30\n")
    );
}

#[tokio::test]
async fn author_recipes_lookup() {
    let state = state_or_skip!();
    let (author_id, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let eggs = seed_ingredient(&state.pool, &unique("eggs"), "pcs").await;

    let response = send(
        &state,
        warp::test::request()
            .path("/api/recipes/2147483647/author_recipes")
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let path = format!("/api/recipes/{author_id}/author_recipes");
    let response = send(
        &state,
        warp::test::request()
            .path(&path)
            .header("authorization", auth(&token)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(&response), json!([]));

    let omelette = create_recipe(&state, &token, "Omelette", &[tag], &[(eggs, 3)]).await;
    let response = send(
        &state,
        warp::test::request()
            .path(&path)
            .header("authorization", auth(&token)),
    )
    .await;
    let recipes = body_json(&response);
    assert_eq!(ids(&recipes), HashSet::from([omelette as i64]));
    assert_eq!(recipes[0]["name"], json!("Omelette"));
}

#[tokio::test]
async fn recipe_list_filters() {
    let state = state_or_skip!();
    let (author_id, token) = seed_user(&state).await;
    let (_, reader) = seed_user(&state).await;
    let (breakfast, breakfast_slug) = seed_tag(&state.pool).await;
    let (dinner, dinner_slug) = seed_tag(&state.pool).await;
    let milk = seed_ingredient(&state.pool, &unique("milk"), "ml").await;

    let porridge = create_recipe(&state, &token, "Porridge", &[breakfast], &[(milk, 200)]).await;
    let stew = create_recipe(&state, &token, "Stew", &[dinner], &[(milk, 50)]).await;

    let username: (String,) = sqlx::query_as("SELECT username FROM users WHERE id = $1")
        .bind(author_id)
        .fetch_one(&state.pool)
        .await
        .expect("username");

    let list = |query: String, token: Option<String>| {
        let state = state.clone();
        async move {
            let mut request = warp::test::request().path(&format!("/api/recipes?{query}"));
            if let Some(token) = token {
                request = request.header("authorization", auth(&token));
            }
            let response = send(&state, request).await;
            assert_eq!(response.status(), StatusCode::OK);
            ids(&body_json(&response))
        }
    };

    let both = HashSet::from([porridge as i64, stew as i64]);
    assert_eq!(list(format!("author={author_id}"), None).await, both);
    assert_eq!(list(format!("author={}", username.0), None).await, both);
    assert_eq!(
        list(format!("author={author_id}&tags={breakfast_slug}"), None).await,
        HashSet::from([porridge as i64])
    );
    assert_eq!(
        list(format!("tags={breakfast_slug}&tags={dinner_slug}"), None).await,
        both
    );
    assert!(list(format!("author={author_id}&tags=no-such-tag"), None)
        .await
        .is_empty());

    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path(&format!("/api/recipes/{stew}/favorite"))
            .header("authorization", auth(&reader)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    assert_eq!(
        list(
            format!("author={author_id}&is_favorited=true"),
            Some(reader.clone())
        )
        .await,
        HashSet::from([stew as i64])
    );
    assert_eq!(
        list(format!("author={author_id}&is_favorited=0"), Some(reader.clone())).await,
        both
    );
    assert!(list(format!("author={author_id}&is_favorited=1"), None)
        .await
        .is_empty());
    assert!(list(format!("author={author_id}&is_in_shopping_cart=1"), Some(reader))
        .await
        .is_empty());
}

#[tokio::test]
async fn ingredient_prefix_search() {
    let state = state_or_skip!();
    let prefix = unique("zest");
    let apple = seed_ingredient(&state.pool, &format!("{prefix} apple"), "g").await;
    let apricot = seed_ingredient(&state.pool, &format!("{prefix} apricot"), "g").await;
    seed_ingredient(&state.pool, &format!("candied {prefix}"), "g").await;

    let response = send(
        &state,
        warp::test::request().path(&format!("/api/ingredients?name={}", prefix.to_uppercase())),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        ids(&body_json(&response)),
        HashSet::from([apple as i64, apricot as i64])
    );

    let response = send(&state, warp::test::request().path("/api/ingredients")).await;
    let everything = ids(&body_json(&response));
    assert!(everything.contains(&(apple as i64)));
    assert!(everything.contains(&(apricot as i64)));

    let response = send(
        &state,
        warp::test::request().path(&format!("/api/ingredients/{apple}")),
    )
    .await;
    assert_eq!(body_json(&response)["measurement_unit"], json!("g"));
}

#[tokio::test]
async fn only_the_author_manages_a_recipe() {
    let state = state_or_skip!();
    let (_, author) = seed_user(&state).await;
    let (_, stranger) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;
    let butter = seed_ingredient(&state.pool, &unique("butter"), "g").await;

    let recipe = create_recipe(&state, &author, "Toast", &[tag], &[(butter, 10)]).await;
    let path = format!("/api/recipes/{recipe}");

    let response = send(
        &state,
        warp::test::request()
            .method("PATCH")
            .path(&path)
            .header("authorization", auth(&stranger))
            .json(&json!({ "name": "Stolen toast" })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &state,
        warp::test::request()
            .method("PATCH")
            .path(&path)
            .header("authorization", auth(&author))
            .json(&json!({ "name": "Buttered toast", "ingredients": [{ "id": butter, "amount": 20 }] })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(&response);
    assert_eq!(updated["name"], json!("Buttered toast"));
    assert_eq!(updated["ingredients"][0]["amount"], json!(20));
    assert_eq!(updated["tags"][0]["id"], json!(tag));

    let response = send(
        &state,
        warp::test::request()
            .method("DELETE")
            .path(&path)
            .header("authorization", auth(&stranger)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(
        &state,
        warp::test::request()
            .method("DELETE")
            .path(&path)
            .header("authorization", auth(&author)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = send(&state, warp::test::request().path(&path)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unknown_references_are_rejected() {
    let state = state_or_skip!();
    let (_, token) = seed_user(&state).await;
    let (tag, _) = seed_tag(&state.pool).await;

    let response = send(
        &state,
        warp::test::request()
            .method("POST")
            .path("/api/recipes")
            .header("authorization", auth(&token))
            .json(&json!({
                "name": "Ghost stew",
                "text": "Nothing",
                "image": "data:image/png;base64,AAAA",
                "cooking_time": 5,
                "tags": [tag],
                "ingredients": [{ "id": 2147483647, "amount": 1 }],
            })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn tags_are_listed_and_retrieved() {
    let state = state_or_skip!();
    let (tag, slug) = seed_tag(&state.pool).await;

    let response = send(&state, warp::test::request().path("/api/tags")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_json(&response)
        .as_array()
        .expect("list")
        .iter()
        .any(|t| t["slug"] == json!(slug)));

    let response = send(&state, warp::test::request().path(&format!("/api/tags/{tag}"))).await;
    assert_eq!(body_json(&response)["id"], json!(tag));

    let response = send(&state, warp::test::request().path("/api/tags/2147483647")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
