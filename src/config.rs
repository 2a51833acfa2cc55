use chrono::Duration;
use log::{error, info, warn};
use mongodb::Client as MongoClient;
use rocket::{
    fairing::{Fairing, Info, Kind},
    Build, Rocket,
};
use serde::Deserialize;

use crate::error::Result;
use crate::model::{
    api::admin::AdminCredentials,
    db::NewAdmin,
    mongodb::{ensure_counters_exist, ensure_indexes_exist, Coll},
    store::Store,
};

/// Application configuration, derived from `Rocket.toml` and `ROCKET_*`
/// environment variables. This struct becomes managed state and can be
/// inspected by any endpoint.
#[derive(Deserialize)]
pub struct Config {
    // non-secrets
    auth_ttl: u32,
    // secrets
    jwt_secret: String,
}

impl Config {
    pub fn new(jwt_secret: impl Into<String>, auth_ttl: u32) -> Self {
        Self {
            auth_ttl,
            jwt_secret: jwt_secret.into(),
        }
    }

    /// Valid lifetime of auth token cookies in seconds.
    pub fn auth_ttl(&self) -> Duration {
        Duration::seconds(self.auth_ttl.into())
    }

    /// Secret key used to sign JWTs.
    pub fn jwt_secret(&self) -> &[u8] {
        self.jwt_secret.as_bytes()
    }
}

/// A fairing that loads the application config and puts it in managed state.
/// This could easily be achieved using `AdHoc::config`, but is written out
/// explicitly for symmetry with the store fairing and control over error
/// messages.
pub struct ConfigFairing;

#[rocket::async_trait]
impl Fairing for ConfigFairing {
    fn info(&self) -> Info {
        Info {
            name: "Config",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<Config>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load application config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Manage the state.
        rocket = rocket.manage(config);
        Ok(rocket)
    }
}

fn default_db_name() -> String {
    "polls".to_string()
}

/// Configuration for the store.
#[derive(Deserialize)]
struct StoreConfig {
    // non-secrets
    #[serde(default = "default_db_name")]
    db_name: String,
    admin_username: String,
    // secrets
    db_uri: Option<String>,
    admin_password: String,
}

impl StoreConfig {
    fn bootstrap_admin(&self) -> AdminCredentials {
        AdminCredentials {
            username: self.admin_username.clone(),
            password: self.admin_password.clone(),
        }
    }
}

/// A fairing that selects the store, performs any setup necessary, and places
/// the [`Store`] into managed state.
///
/// MongoDB is used when `db_uri` is configured, otherwise an in-process store.
/// Either way, an admin is created from `admin_username`/`admin_password` if
/// the store has none.
pub struct StoreFairing {
    store: Option<Store>,
}

impl StoreFairing {
    /// Select the store from the configuration.
    pub fn from_config() -> Self {
        Self { store: None }
    }

    /// Use the given store regardless of configuration.
    pub fn with_store(store: Store) -> Self {
        Self { store: Some(store) }
    }

    async fn connect(config: &StoreConfig) -> Result<Store> {
        let Some(ref db_uri) = config.db_uri else {
            warn!("No `db_uri` configured, polls will be kept in memory only");
            return Ok(Store::memory());
        };
        info!("Loaded database config, connecting...");
        let client = MongoClient::with_uri_str(db_uri).await?;
        let db = client.database(&config.db_name);

        // Ensure the required indexes and ID counters exist.
        ensure_indexes_exist(&db).await?;
        ensure_counters_exist(&Coll::from_db(&db)).await?;
        info!("...database connection online!");

        Ok(Store::mongo(db))
    }
}

/// Ensure there is at least one admin, creating one from the given credentials if not.
pub async fn ensure_admin_exists(store: &Store, credentials: AdminCredentials) -> Result<()> {
    if store.count_admins().await? > 0 {
        return Ok(());
    }
    let admin: NewAdmin = credentials.try_into()?;
    info!("No admins found, creating admin {}", admin.username);
    store.create_admin(admin).await?;
    Ok(())
}

#[rocket::async_trait]
impl Fairing for StoreFairing {
    fn info(&self) -> Info {
        Info {
            name: "Store",
            kind: Kind::Ignite,
        }
    }

    async fn on_ignite(&self, mut rocket: Rocket<Build>) -> rocket::fairing::Result {
        // Load the config.
        let config = match rocket.figment().extract::<StoreConfig>() {
            Ok(config) => config,
            Err(e) => {
                error!("Failed to load store config");
                rocket::config::pretty_print_error(e);
                return Err(rocket);
            }
        };

        // Construct the store.
        let store = match self.store {
            Some(ref store) => store.clone(),
            None => match Self::connect(&config).await {
                Ok(store) => store,
                Err(e) => {
                    error!("Failed to connect to database: {e}");
                    return Err(rocket);
                }
            },
        };

        if let Err(e) = ensure_admin_exists(&store, config.bootstrap_admin()).await {
            error!("Failed to create the initial admin: {e}");
            return Err(rocket);
        }

        // Manage the state.
        rocket = rocket.manage(store);
        Ok(rocket)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn admin_is_bootstrapped_once() {
        let store = Store::memory();
        ensure_admin_exists(&store, AdminCredentials::example())
            .await
            .unwrap();
        ensure_admin_exists(&store, AdminCredentials::example2())
            .await
            .unwrap();
        let admins = store.admins().await.unwrap();
        assert_eq!(admins.len(), 1);
        assert_eq!(admins[0].username, AdminCredentials::example().username);
        assert!(admins[0].verify_password(AdminCredentials::example().password));
    }

    #[rocket::async_test]
    async fn bad_bootstrap_credentials_fail() {
        let store = Store::memory();
        assert!(ensure_admin_exists(&store, AdminCredentials::empty())
            .await
            .is_err());
    }

    #[test]
    fn ttl_is_in_seconds() {
        assert_eq!(Config::example().auth_ttl(), Duration::minutes(10));
    }
}
