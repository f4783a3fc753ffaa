use serde::{Deserialize, Serialize};

pub type Id = i32;

#[derive(
    Clone, Debug, PartialEq, PartialOrd, sqlx::Type, Serialize, Eq, Ord, Hash, Deserialize,
)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    User,
    Admin,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct User {
    pub id: Id,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: UserRole,
}

/// Public projection of a user, embedded into recipe representations.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Author {
    pub id: Id,
    pub email: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<User> for Author {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            username: user.username,
            first_name: user.first_name,
            last_name: user.last_name,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Tag {
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: Id,
    pub author_id: Id,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Minimal recipe projection returned by the favorite / shopping cart actions
/// and the author recipes lookup.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct ShortRecipe {
    pub id: Id,
    pub name: String,
    pub image: String,
    pub cooking_time: i32,
}

impl From<&Recipe> for ShortRecipe {
    fn from(recipe: &Recipe) -> Self {
        Self {
            id: recipe.id,
            name: recipe.name.to_owned(),
            image: recipe.image.to_owned(),
            cooking_time: recipe.cooking_time,
        }
    }
}

#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq)]
pub struct RecipeIngredient {
    #[serde(skip)]
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub measurement_unit: String,
    pub amount: i32,
}

#[derive(sqlx::FromRow, Debug, Clone)]
pub struct LinkedRecipeTag {
    pub recipe_id: Id,
    pub id: Id,
    pub name: String,
    pub color: String,
    pub slug: String,
}

impl From<LinkedRecipeTag> for Tag {
    fn from(value: LinkedRecipeTag) -> Self {
        Self {
            id: value.id,
            name: value.name,
            color: value.color,
            slug: value.slug,
        }
    }
}

/// Full recipe representation used by the read endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetail {
    pub id: Id,
    pub author: Author,
    pub tags: Vec<Tag>,
    pub ingredients: Vec<RecipeIngredient>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
    pub name: String,
    pub image: String,
    pub text: String,
    pub cooking_time: i32,
}

/// Total amount of one (ingredient name, measurement unit) pair across a
/// user's shopping cart.
#[derive(sqlx::FromRow, Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ShoppingListEntry {
    pub name: String,
    pub measurement_unit: String,
    pub total: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTag {
    pub name: String,
    pub color: String,
    pub slug: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub measurement_unit: String,
}
