use std::{fs, path::Path, path::PathBuf};

use clap::{ArgGroup, Parser};
use foodgram_backend::{
    actions::{insert_ingredients, insert_tags},
    config::StorageConfig,
    invalidate_cache,
    schema::{NewIngredient, NewTag},
    state::connect_storage,
    CacheKeyType,
};
use serde::de::DeserializeOwned;

#[derive(Parser, Debug)]
#[command(
    name = "load-data",
    about = "Loads tags and ingredients into the catalogue"
)]
#[command(group(ArgGroup::new("input").required(true).multiple(true).args(["tags", "ingredients"])))]
struct Args {
    /// JSON file with `[{name, color, slug}]`
    #[arg(long)]
    tags: Option<PathBuf>,

    /// JSON file with `[{name, measurement_unit}]`
    #[arg(long)]
    ingredients: Option<PathBuf>,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, Box<dyn std::error::Error>> {
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Could not read {}: {e}", path.display()))?;
    let rows = serde_json::from_str(&raw)
        .map_err(|e| format!("Could not parse {}: {e}", path.display()))?;

    Ok(rows)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = StorageConfig::load()?;
    let (pool, mut cache) = connect_storage(&config)
        .await
        .map_err(|e| format!("Failed to connect to storage: {:?}", e.info))?;

    if let Some(path) = args.tags {
        let tags: Vec<NewTag> = read_json(&path)?;
        let inserted = insert_tags(&tags, &pool)
            .await
            .map_err(|e| format!("Failed to insert tags: {:?}", e.info))?;
        log::info!("Loaded {inserted} new tags out of {}", tags.len());

        if let Some(cache) = cache.as_mut() {
            invalidate_cache(CacheKeyType::TagList, cache)
                .await
                .map_err(|e| format!("Failed to invalidate tag cache: {:?}", e.info))?;
        }
    }

    if let Some(path) = args.ingredients {
        let ingredients: Vec<NewIngredient> = read_json(&path)?;
        let inserted = insert_ingredients(&ingredients, &pool)
            .await
            .map_err(|e| format!("Failed to insert ingredients: {:?}", e.info))?;
        log::info!(
            "Loaded {inserted} new ingredients out of {}",
            ingredients.len()
        );

        if let Some(cache) = cache.as_mut() {
            invalidate_cache(CacheKeyType::IngredientList, cache)
                .await
                .map_err(|e| format!("Failed to invalidate ingredient cache: {:?}", e.info))?;
        }
    }

    Ok(())
}
