//! Environment-sourced configuration.
//!
//! Everything the service needs at boot comes from the process
//! environment (optionally seeded from a `.env` file by the CLI):
//!
//!   DATABASE_URL          PostgreSQL connection string (required)
//!   JWT_SECRET            shared secret for bearer token verification (required)
//!   ALUMNET_DEPLOYMENT    "persistent" (default) or "serverless"
//!   APP_ENV               "production" or anything else (= development)

use std::env;

use thiserror::Error;

/// Where the process runs: a long-lived server or a short-lived
/// serverless invocation. Decides pool sizing and connection reuse policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeploymentMode {
    Persistent,
    Serverless,
}

impl DeploymentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Persistent => "persistent",
            Self::Serverless => "serverless",
        }
    }

    fn parse(value: &str) -> Result<Self, ConfigError> {
        if value.eq_ignore_ascii_case("persistent") {
            Ok(Self::Persistent)
        } else if value.eq_ignore_ascii_case("serverless") {
            Ok(Self::Serverless)
        } else {
            Err(ConfigError::InvalidValue {
                var: "ALUMNET_DEPLOYMENT",
                value: value.to_owned(),
            })
        }
    }

    /// Read `ALUMNET_DEPLOYMENT`; absent means persistent.
    pub fn from_env() -> Result<Self, ConfigError> {
        match env::var("ALUMNET_DEPLOYMENT") {
            Ok(value) => Self::parse(&value),
            Err(_) => Ok(Self::Persistent),
        }
    }
}

/// Production vs. everything else. Gates schema bootstrap and how much
/// error detail responses may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }

    // Anything that is not exactly "production" is treated as development.
    fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("production") {
            Self::Production
        } else {
            Self::Development
        }
    }

    /// Read `APP_ENV`; absent means development.
    pub fn from_env() -> Self {
        env::var("APP_ENV")
            .map(|value| Self::parse(&value))
            .unwrap_or(Self::Development)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{var} is not set")]
    Missing { var: &'static str },

    #[error("invalid {var} value '{value}'")]
    InvalidValue { var: &'static str, value: String },
}

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub jwt_secret: String,
    pub deployment: DeploymentMode,
    pub environment: Environment,
}

impl AppConfig {
    /// Load from the process environment. A missing connection URI or
    /// signing secret is fatal; there are no baked-in fallbacks.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Same as [`AppConfig::from_env`], with the lookup injected. Tests
    /// use this to avoid mutating process-wide environment state.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing {
                var: "DATABASE_URL",
            })?;

        let jwt_secret = lookup("JWT_SECRET")
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::Missing { var: "JWT_SECRET" })?;

        let deployment = match lookup("ALUMNET_DEPLOYMENT") {
            Some(value) => DeploymentMode::parse(&value)?,
            None => DeploymentMode::Persistent,
        };

        let environment = lookup("APP_ENV")
            .map(|value| Environment::parse(&value))
            .unwrap_or(Environment::Development);

        Ok(Self {
            database_url,
            jwt_secret,
            deployment,
            environment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |var| {
            pairs
                .iter()
                .find(|(name, _)| *name == var)
                .map(|(_, value)| (*value).to_owned())
        }
    }

    #[test]
    fn loads_full_config() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/alumnet"),
            ("JWT_SECRET", "shhh"),
            ("ALUMNET_DEPLOYMENT", "serverless"),
            ("APP_ENV", "production"),
        ]))
        .unwrap();

        assert_eq!(config.database_url, "postgres://localhost/alumnet");
        assert_eq!(config.deployment, DeploymentMode::Serverless);
        assert_eq!(config.environment, Environment::Production);
    }

    #[test]
    fn defaults_to_persistent_development() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/alumnet"),
            ("JWT_SECRET", "shhh"),
        ]))
        .unwrap();

        assert_eq!(config.deployment, DeploymentMode::Persistent);
        assert_eq!(config.environment, Environment::Development);
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[("JWT_SECRET", "shhh")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "DATABASE_URL" }));
    }

    #[test]
    fn empty_database_url_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", ""),
            ("JWT_SECRET", "shhh"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "DATABASE_URL" }));
    }

    #[test]
    fn missing_jwt_secret_is_fatal() {
        let err = AppConfig::from_lookup(lookup_from(&[(
            "DATABASE_URL",
            "postgres://localhost/alumnet",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Missing { var: "JWT_SECRET" }));
    }

    #[test]
    fn rejects_unknown_deployment_mode() {
        let err = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/alumnet"),
            ("JWT_SECRET", "shhh"),
            ("ALUMNET_DEPLOYMENT", "edge"),
        ]))
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue {
                var: "ALUMNET_DEPLOYMENT",
                ..
            }
        ));
    }

    #[test]
    fn app_env_is_forgiving() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/alumnet"),
            ("JWT_SECRET", "shhh"),
            ("APP_ENV", "staging"),
        ]))
        .unwrap();
        assert_eq!(config.environment, Environment::Development);
    }
}
