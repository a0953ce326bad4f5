//! Connection lifecycle manager.
//!
//! Owns the single shared database handle and decides, per call, whether
//! to reuse it, wait for a pending dial, or rebuild it. In persistent
//! mode a connected handle is trusted as-is; in serverless mode every
//! reuse is gated on a liveness probe, and a failed probe discards the
//! stale handle before a fresh dial.
//!
//! The manager is not self-healing: beyond the one bounded wait on a
//! pending dial it never retries internally. A failed request retries by
//! arriving again.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::sync::{Mutex, RwLock};

use alumnet_core::DeploymentMode;

use super::profile::ConnectionProfile;
use super::schema;

/// How long a caller waits for another caller's in-flight dial before
/// giving up and dialing itself. One wait, never a loop.
pub const CONNECT_SETTLE_WAIT: Duration = Duration::from_secs(1);

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("database connection failed: {source}")]
    Connect {
        #[source]
        source: BoxError,
    },

    #[error("liveness probe failed: {source}")]
    Probe {
        #[source]
        source: BoxError,
    },
}

/// Readiness of the shared handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl Readiness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

/// Driver-level connection-state notifications, translated into state
/// transitions on the owned handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Reconnected,
    Disconnected,
    Error,
}

/// The dial/probe/close primitives, abstracted so tests can count dials
/// and force probe failures.
#[async_trait]
pub trait Connector: Send + Sync {
    type Handle: Clone + Send + Sync;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<Self::Handle, ConnectionError>;

    async fn ping(&self, handle: &Self::Handle) -> Result<(), ConnectionError>;

    async fn close(&self, handle: &Self::Handle);
}

/// Production connector: sqlx PgPool with profile-driven limits.
pub struct PgConnector {
    database_url: String,
}

impl PgConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }
}

#[async_trait]
impl Connector for PgConnector {
    type Handle = PgPool;

    async fn connect(&self, profile: &ConnectionProfile) -> Result<PgPool, ConnectionError> {
        let pool = PgPoolOptions::new()
            .max_connections(profile.max_connections)
            .min_connections(profile.min_connections)
            .acquire_timeout(profile.acquire_timeout)
            .idle_timeout(profile.idle_timeout)
            .connect(&self.database_url)
            .await
            .map_err(|err| ConnectionError::Connect { source: err.into() })?;

        if profile.auto_schema {
            schema::ensure(&pool)
                .await
                .map_err(|err| ConnectionError::Connect { source: err.into() })?;
        }

        Ok(pool)
    }

    async fn ping(&self, handle: &PgPool) -> Result<(), ConnectionError> {
        sqlx::query("SELECT 1")
            .execute(handle)
            .await
            .map(|_| ())
            .map_err(|err| ConnectionError::Probe { source: err.into() })
    }

    async fn close(&self, handle: &PgPool) {
        handle.close().await;
    }
}

struct Cached<H> {
    handle: H,
    created_at: Instant,
}

struct Shared<H> {
    readiness: Readiness,
    cached: Option<Cached<H>>,
}

/// Owns the shared handle. Construct once, share via `Arc`.
pub struct ConnectionManager<C: Connector> {
    connector: C,
    mode: DeploymentMode,
    profile: ConnectionProfile,
    shared: RwLock<Shared<C::Handle>>,
    // Single-flight guard around dial-and-cache.
    dial: Mutex<()>,
}

impl<C: Connector> ConnectionManager<C> {
    pub fn new(connector: C, mode: DeploymentMode, profile: ConnectionProfile) -> Self {
        Self {
            connector,
            mode,
            profile,
            shared: RwLock::new(Shared {
                readiness: Readiness::Disconnected,
                cached: None,
            }),
            dial: Mutex::new(()),
        }
    }

    pub fn mode(&self) -> DeploymentMode {
        self.mode
    }

    pub fn profile(&self) -> &ConnectionProfile {
        &self.profile
    }

    pub async fn readiness(&self) -> Readiness {
        self.shared.read().await.readiness
    }

    /// Age of the current handle, if one is cached.
    pub async fn connected_since(&self) -> Option<Duration> {
        self.shared
            .read()
            .await
            .cached
            .as_ref()
            .map(|cached| cached.created_at.elapsed())
    }

    /// Return a usable handle, dialing only when the cache cannot be
    /// trusted. The connected-cache path performs no I/O in persistent
    /// mode and exactly one probe round-trip in serverless mode.
    pub async fn ensure_connection(&self) -> Result<C::Handle, ConnectionError> {
        if let Some(handle) = self.reusable_handle().await {
            return Ok(handle);
        }

        // Another caller may be mid-dial; give it one bounded window to
        // finish before dialing ourselves.
        if self.readiness().await == Readiness::Connecting {
            tokio::time::sleep(CONNECT_SETTLE_WAIT).await;
            if let Some(handle) = self.reusable_handle().await {
                return Ok(handle);
            }
        }

        self.connect().await
    }

    /// Establish a fresh connection and cache it. Used at process
    /// bootstrap and as the slow path of [`Self::ensure_connection`].
    /// Concurrent callers collapse onto one dial; losers adopt the
    /// winner's handle.
    pub async fn connect(&self) -> Result<C::Handle, ConnectionError> {
        let _guard = self.dial.lock().await;

        // The race may already be over.
        {
            let shared = self.shared.read().await;
            if shared.readiness == Readiness::Connected {
                if let Some(cached) = &shared.cached {
                    return Ok(cached.handle.clone());
                }
            }
        }

        {
            let mut shared = self.shared.write().await;
            shared.readiness = Readiness::Connecting;
            shared.cached = None;
        }

        match self.connector.connect(&self.profile).await {
            Ok(handle) => {
                let mut shared = self.shared.write().await;
                shared.readiness = Readiness::Connected;
                shared.cached = Some(Cached {
                    handle: handle.clone(),
                    created_at: Instant::now(),
                });
                tracing::info!(mode = self.mode.as_str(), "database connection established");
                Ok(handle)
            }
            Err(err) => {
                let mut shared = self.shared.write().await;
                shared.readiness = Readiness::Error;
                shared.cached = None;
                tracing::error!(error = %err, "database connection failed");
                Err(err)
            }
        }
    }

    /// Ping the current handle and report the round-trip time, dialing
    /// first if nothing usable is cached.
    pub async fn probe(&self) -> Result<Duration, ConnectionError> {
        let handle = self.ensure_connection().await?;
        let started = Instant::now();
        self.connector.ping(&handle).await?;
        Ok(started.elapsed())
    }

    /// Apply a driver-level connection-state notification. Errors and
    /// disconnects drop the cached handle so the next call rebuilds it
    /// instead of returning a dead one.
    pub async fn record_event(&self, event: ConnectionEvent) {
        let mut shared = self.shared.write().await;
        match event {
            ConnectionEvent::Connected | ConnectionEvent::Reconnected => {
                if shared.cached.is_some() {
                    shared.readiness = Readiness::Connected;
                }
                tracing::info!("database connected");
            }
            ConnectionEvent::Disconnected => {
                shared.readiness = Readiness::Disconnected;
                shared.cached = None;
                tracing::warn!("database disconnected, dropping cached handle");
            }
            ConnectionEvent::Error => {
                shared.readiness = Readiness::Error;
                shared.cached = None;
                tracing::error!("database connection error, dropping cached handle");
            }
        }
    }

    /// Scoped shutdown: close the handle if open. Safe to call on every
    /// exit path.
    pub async fn close(&self) {
        let handle = {
            let mut shared = self.shared.write().await;
            shared.readiness = Readiness::Disconnected;
            shared.cached.take().map(|cached| cached.handle)
        };
        if let Some(handle) = handle {
            self.connector.close(&handle).await;
            tracing::info!("database connection closed");
        }
    }

    /// Drop all cached state without closing. For tests.
    pub async fn reset(&self) {
        let mut shared = self.shared.write().await;
        shared.readiness = Readiness::Disconnected;
        shared.cached = None;
    }

    // Connected cache, re-validated by a probe in serverless mode. A
    // failed probe discards the handle and returns None.
    async fn reusable_handle(&self) -> Option<C::Handle> {
        let handle = {
            let shared = self.shared.read().await;
            if shared.readiness != Readiness::Connected {
                return None;
            }
            shared.cached.as_ref().map(|cached| cached.handle.clone())?
        };

        if self.mode == DeploymentMode::Serverless {
            if let Err(err) = self.connector.ping(&handle).await {
                tracing::warn!(error = %err, "liveness probe failed, discarding stale connection");
                self.record_event(ConnectionEvent::Disconnected).await;
                return None;
            }
        }

        Some(handle)
    }
}
