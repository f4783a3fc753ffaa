use std::collections::HashSet;

use serde::Deserialize;

use super::{error::TypeError, schema::Id};

pub const RECIPE_NAME_MAX_LENGTH: usize = 200;

/// Query string parameters in request order. Keys may repeat.
#[derive(Debug, Clone, Default)]
pub struct QueryParams {
    inner: Vec<(String, String)>,
}

impl QueryParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        Self { inner: pairs }
    }

    /// Last non-blank value of `key`, trimmed.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn get_all(&self, key: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.trim())
            .filter(|v| !v.is_empty())
            .collect()
    }

    /// Unrecognised values are treated like an absent parameter.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        match self.get_str(key)?.to_lowercase().as_str() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => None,
        }
    }
}

#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct IngredientAmountForm {
    pub id: Id,
    pub amount: i32,
}

/// Recipe create / update payload. Every field is optional so the same form
/// serves partial updates.
#[derive(Deserialize, Debug, Clone, Default)]
pub struct RecipeForm {
    pub ingredients: Option<Vec<IngredientAmountForm>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

/// Validated changes to a recipe. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub ingredients: Option<Vec<IngredientAmountForm>>,
    pub tags: Option<Vec<Id>>,
    pub image: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewRecipe {
    pub ingredients: Vec<IngredientAmountForm>,
    pub tags: Vec<Id>,
    pub image: String,
    pub name: String,
    pub text: String,
    pub cooking_time: i32,
}

impl RecipeForm {
    pub fn validate(self) -> Result<RecipeChanges, TypeError> {
        let mut problems: Vec<String> = vec![];

        let name = self.name.map(|name| name.trim().to_owned());
        if let Some(name) = &name {
            if name.is_empty() {
                problems.push("name: This field may not be blank".to_owned());
            } else if name.chars().count() > RECIPE_NAME_MAX_LENGTH {
                problems.push(format!(
                    "name: Ensure this field has no more than {RECIPE_NAME_MAX_LENGTH} characters"
                ));
            }
        }

        if let Some(text) = &self.text {
            if text.trim().is_empty() {
                problems.push("text: This field may not be blank".to_owned());
            }
        }

        if let Some(image) = &self.image {
            if image.trim().is_empty() {
                problems.push("image: This field may not be blank".to_owned());
            }
        }

        if let Some(cooking_time) = self.cooking_time {
            if cooking_time < 1 {
                problems.push("cooking_time: Must be at least 1 minute".to_owned());
            }
        }

        if let Some(ingredients) = &self.ingredients {
            if ingredients.is_empty() {
                problems.push("ingredients: At least one ingredient is required".to_owned());
            }
            let mut seen = HashSet::new();
            for ingredient in ingredients {
                if !seen.insert(ingredient.id) {
                    problems.push(format!("ingredients: Ingredient {} is listed twice", ingredient.id));
                }
                if ingredient.amount < 1 {
                    problems.push(format!(
                        "ingredients: Amount of ingredient {} must be at least 1",
                        ingredient.id
                    ));
                }
            }
        }

        if let Some(tags) = &self.tags {
            if tags.is_empty() {
                problems.push("tags: At least one tag is required".to_owned());
            }
            let mut seen = HashSet::new();
            for tag in tags {
                if !seen.insert(*tag) {
                    problems.push(format!("tags: Tag {tag} is listed twice"));
                }
            }
        }

        if !problems.is_empty() {
            return Err(TypeError::new(&problems.join("; ")));
        }

        Ok(RecipeChanges {
            ingredients: self.ingredients,
            tags: self.tags,
            image: self.image,
            name,
            text: self.text,
            cooking_time: self.cooking_time,
        })
    }
}

impl RecipeChanges {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

impl TryFrom<RecipeChanges> for NewRecipe {
    type Error = TypeError;

    fn try_from(changes: RecipeChanges) -> Result<Self, Self::Error> {
        match changes {
            RecipeChanges {
                ingredients: Some(ingredients),
                tags: Some(tags),
                image: Some(image),
                name: Some(name),
                text: Some(text),
                cooking_time: Some(cooking_time),
            } => Ok(Self {
                ingredients,
                tags,
                image,
                name,
                text,
                cooking_time,
            }),
            changes => {
                let missing: Vec<&str> = [
                    ("ingredients", changes.ingredients.is_none()),
                    ("tags", changes.tags.is_none()),
                    ("image", changes.image.is_none()),
                    ("name", changes.name.is_none()),
                    ("text", changes.text.is_none()),
                    ("cooking_time", changes.cooking_time.is_none()),
                ]
                .into_iter()
                .filter(|(_, missing)| *missing)
                .map(|(field, _)| field)
                .collect();

                Err(TypeError::new(&format!(
                    "Missing required fields: {}",
                    missing.join(", ")
                )))
            }
        }
    }
}
