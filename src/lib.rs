#[macro_use]
extern crate rocket;

#[cfg(test)]
#[macro_use]
extern crate backend_test;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, StoreFairing};
use crate::logging::LoggerFairing;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod model;

/// Build the server: configuration, store selection, and every route.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing::from_config())
        .mount("/", api::routes())
}

/// A server backed by the given store, with fixed test configuration.
#[cfg(test)]
pub(crate) fn rocket_for_store(store: model::store::Store) -> Rocket<Build> {
    let figment = rocket::Config::figment()
        .merge(("jwt_secret", "test secret"))
        .merge(("auth_ttl", 600))
        .merge(("admin_username", "coordinator"))
        .merge(("admin_password", "polls4lyfe"));
    rocket::custom(figment)
        .attach(LoggerFairing)
        .attach(ConfigFairing)
        .attach(StoreFairing::with_store(store))
        .mount("/", api::routes())
}
