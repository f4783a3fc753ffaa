mod database {
    pub mod actions;
    pub mod error;
    pub mod filters;
    pub mod form;
    pub mod schema;
}
mod authentication {
    pub mod jwt;
    pub mod middleware;
    pub mod permissions;
}
mod constants;

mod cache {
    pub mod cache;
}

pub mod config;
pub mod server;
pub mod shopping_list;
pub mod state;

pub use authentication::*;
pub use cache::cache::*;
pub use constants::*;
pub use database::*;
