use std::net::SocketAddr;

use foodgram_backend::{config::Config, server::routes, state::State};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    let state = State::new(config)
        .await
        .map_err(|e| format!("Failed to initialise state: {:?}", e.info))?;

    log::info!("Listening on http://{addr}");
    warp::serve(routes(state)).run(addr).await;

    Ok(())
}
