pub mod catchers;
pub mod config;
pub mod cors;
pub mod db;
pub mod error;
pub mod routes;
pub mod store;
pub use shared::{models::*, validation::*, ErrorResponse};

use rocket::{catchers, routes, Build, Rocket};
use crate::{
    catchers::{bad_request, internal_error, not_found, unprocessable_entity},
    cors::CORS,
    routes::{all_options, get_vote, list_groups, patch_vote, put_vote, AppState},
};

/// Mounts the vote routes and catchers on `rocket`, serving from `state`.
pub fn attach(rocket: Rocket<Build>, state: AppState) -> Rocket<Build> {
    rocket
        .attach(CORS)
        .manage(state)
        .mount("/", routes![list_groups, get_vote, patch_vote, put_vote, all_options])
        .register(
            "/",
            catchers![bad_request, not_found, unprocessable_entity, internal_error],
        )
}

#[cfg(test)]
mod tests;
