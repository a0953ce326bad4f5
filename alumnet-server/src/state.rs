//! Application state shared across handlers

use std::sync::Arc;

use alumnet_core::{AppConfig, Environment};

use crate::db::{ConnectionProfile, Database, PgConnector};
use crate::http::auth::JwtKeys;
use crate::store::{PgPrincipalStore, PrincipalStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Arc<Database>,
    principals: Arc<dyn PrincipalStore>,
    jwt: JwtKeys,
    environment: Environment,
}

impl AppState {
    pub fn new(
        db: Arc<Database>,
        principals: Arc<dyn PrincipalStore>,
        jwt: JwtKeys,
        environment: Environment,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                principals,
                jwt,
                environment,
            }),
        }
    }

    /// Production wiring: Postgres connector with the profile for the
    /// configured deployment mode, principal lookups through it.
    pub fn from_config(config: &AppConfig) -> Self {
        let profile = ConnectionProfile::for_mode(config.deployment, config.environment);
        let db = Arc::new(Database::new(
            PgConnector::new(&config.database_url),
            config.deployment,
            profile,
        ));
        let principals = Arc::new(PgPrincipalStore::new(db.clone()));
        Self::new(
            db,
            principals,
            JwtKeys::new(&config.jwt_secret),
            config.environment,
        )
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn principals(&self) -> &dyn PrincipalStore {
        self.inner.principals.as_ref()
    }

    pub fn jwt(&self) -> &JwtKeys {
        &self.inner.jwt
    }

    pub fn environment(&self) -> Environment {
        self.inner.environment
    }
}
