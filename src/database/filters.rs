use sqlx::{Postgres, QueryBuilder};

use crate::cache::cache::{CacheKey, CacheKeyType};

use super::{form::QueryParams, schema::Id};

const RECIPE_COLUMNS: &str = "r.id, r.author_id, r.name, r.image, r.text, r.cooking_time";

/// How the `author` parameter is matched against the recipe author.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthorLookup {
    /// A numeric value may be an id, but also a username made of digits.
    IdOrUsername(Id, String),
    Username(String),
}

impl AuthorLookup {
    pub fn parse(value: &str) -> Self {
        match value.trim().parse::<Id>() {
            Ok(id) => Self::IdOrUsername(id, value.to_owned()),
            Err(_) => Self::Username(value.to_owned()),
        }
    }
}

/// Recipe list filter. Parameters combine with AND, tag slugs with OR.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeFilter {
    pub tags: Vec<String>,
    pub author: Option<AuthorLookup>,
    pub is_favorited: bool,
    pub is_in_shopping_cart: bool,
}

impl RecipeFilter {
    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            tags: params
                .get_all("tags")
                .into_iter()
                .map(|tag| tag.to_owned())
                .collect(),
            author: params.get_str("author").map(AuthorLookup::parse),
            is_favorited: params.get_bool("is_favorited").unwrap_or(false),
            is_in_shopping_cart: params.get_bool("is_in_shopping_cart").unwrap_or(false),
        }
    }

    /// Builds the recipe query for `user_id`, the requesting user if any.
    /// Membership flags set by an anonymous requester match nothing.
    pub fn build_query<'a>(&self, user_id: Option<Id>) -> QueryBuilder<'a, Postgres> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {RECIPE_COLUMNS} FROM recipes r WHERE TRUE"));

        if !self.tags.is_empty() {
            builder
                .push(" AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id WHERE rt.recipe_id = r.id AND t.slug = ANY(")
                .push_bind(self.tags.clone())
                .push("))");
        }

        match &self.author {
            Some(AuthorLookup::IdOrUsername(id, username)) => {
                builder
                    .push(" AND (r.author_id = ")
                    .push_bind(*id)
                    .push(" OR r.author_id IN (SELECT u.id FROM users u WHERE u.username = ")
                    .push_bind(username.clone())
                    .push("))");
            }
            Some(AuthorLookup::Username(username)) => {
                builder
                    .push(" AND r.author_id IN (SELECT u.id FROM users u WHERE u.username = ")
                    .push_bind(username.clone())
                    .push(")");
            }
            None => {}
        }

        for (enabled, table) in [
            (self.is_favorited, "favorites"),
            (self.is_in_shopping_cart, "shopping_carts"),
        ] {
            if !enabled {
                continue;
            }
            match user_id {
                Some(user_id) => {
                    builder
                        .push(format!(
                            " AND EXISTS (SELECT 1 FROM {table} a WHERE a.recipe_id = r.id AND a.user_id = "
                        ))
                        .push_bind(user_id)
                        .push(")");
                }
                None => {
                    builder.push(" AND FALSE");
                }
            }
        }

        builder.push(" ORDER BY r.pub_date DESC, r.id DESC");
        builder
    }
}

/// Case-insensitive name prefix search over ingredients.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IngredientSearchFilter {
    pub name: Option<String>,
}

impl IngredientSearchFilter {
    pub fn from_query(params: &QueryParams) -> Self {
        Self {
            name: params.get_str("name").map(|name| name.to_owned()),
        }
    }

    /// Only the unfiltered list is cached; prefix searches always go to the
    /// database so arbitrary input cannot grow the cache.
    pub fn cache_key(&self) -> Option<CacheKey> {
        match self.name {
            Some(_) => None,
            None => Some(CacheKeyType::IngredientList.new("all")),
        }
    }

    pub fn build_query<'a>(&self) -> QueryBuilder<'a, Postgres> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, name, measurement_unit FROM ingredients");

        if let Some(name) = &self.name {
            builder
                .push(" WHERE name ILIKE ")
                .push_bind(format!("{}%", escape_like(name)));
        }

        builder.push(" ORDER BY name, id");
        builder
    }
}

/// Escapes LIKE metacharacters so the value only matches literally.
pub fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
