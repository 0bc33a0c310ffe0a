//! Route gateway: merges every endpoint sub-router and attaches shared state.

use axum::Router;

use crate::{Config, PgStore};

mod health;
mod imports;
mod reports;

// ---

pub fn router(store: PgStore, config: Config) -> Router {
    // ---
    Router::new()
        .merge(reports::router())
        .merge(imports::router())
        .merge(health::router())
        .with_state((store, config))
}
