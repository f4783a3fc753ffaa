pub const API_PREFIX: &str = "api";

pub const SESSION_COOKIE: &str = "session";
pub const DEFAULT_SESSION_LIFETIME_HOURS: i64 = 24;

pub const SHOPPING_LIST_FILENAME: &str = "shopping_cart.txt";

pub const TAG_CACHE_KEY: &str = "tag-cache-key";
pub const INGREDIENT_CACHE_KEY: &str = "ingredient-cache-key";
