//! Server lifecycle: bind, serve, bounded run, graceful shutdown.
//!
//! `Created → Starting → Running → Stopping → Stopped`, with
//! `Starting → Stopped` for a failed start. No other transition is legal.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use gatehouse_auth::{AuthorizationPolicy, BasicAuthProvider, CredentialStoreError, RoutePolicy};

use crate::app::{self, Greeting};
use crate::authz::AuthState;
use crate::config::GatewayConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Created,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    pub fn can_transition_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Created, Starting)
                | (Starting, Running)
                | (Starting, Stopped)
                | (Running, Stopping)
                | (Stopping, Stopped)
        )
    }
}

impl core::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("invalid lifecycle transition {from} -> {to}")]
pub struct TransitionError {
    pub from: LifecycleState,
    pub to: LifecycleState,
}

#[derive(Debug, Error)]
pub enum StartError {
    #[error("server did not start within {0:?}")]
    Timeout(Duration),

    #[error("failed to bind {addr}: {source}")]
    BindFailure {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid user configuration: {0}")]
    Configuration(#[from] CredentialStoreError),

    #[error("realm {0:?} cannot be sent in a WWW-Authenticate header")]
    InvalidRealm(String),

    #[error(transparent)]
    InvalidState(#[from] TransitionError),
}

#[derive(Debug, Error)]
pub enum StopError {
    #[error("in-flight requests did not finish within {0:?}; server task aborted")]
    GracePeriodExceeded(Duration),

    #[error("server task failed: {0}")]
    ServerFailed(String),

    #[error(transparent)]
    InvalidState(#[from] TransitionError),
}

/// Cloneable trigger for stopping a running server from another task.
///
/// Requests made before [`ServerLifecycleManager::start`] are discarded when
/// the server starts.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    /// Ask the server to stop. New connections are refused immediately.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown_requested(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Owns one server instance from bind to shutdown.
///
/// Shared request state (credential store, route policy) is built during
/// [`start`](Self::start) and never mutated afterwards.
#[derive(Debug)]
pub struct ServerLifecycleManager {
    state: LifecycleState,
    shutdown: Arc<watch::Sender<bool>>,
    server: Option<JoinHandle<std::io::Result<()>>>,
    local_addr: Option<SocketAddr>,
    shutdown_grace: Duration,
    started_at: Option<DateTime<Utc>>,
}

impl Default for ServerLifecycleManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerLifecycleManager {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            state: LifecycleState::Created,
            shutdown: Arc::new(tx),
            server: None,
            local_addr: None,
            shutdown_grace: GatewayConfig::default().server.shutdown_grace(),
            started_at: None,
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Address the listener is bound to while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    fn transition(&mut self, to: LifecycleState) -> Result<(), TransitionError> {
        if !self.state.can_transition_to(to) {
            return Err(TransitionError {
                from: self.state,
                to,
            });
        }
        tracing::info!(from = %self.state, to = %to, "server lifecycle transition");
        self.state = to;
        Ok(())
    }

    /// Bind and start serving. Returns the bound address (useful with an
    /// ephemeral port).
    pub async fn start(&mut self, config: &GatewayConfig) -> Result<SocketAddr, StartError> {
        self.start_with(config, |host, port| async move {
            TcpListener::bind((host.as_str(), port)).await
        })
        .await
    }

    async fn start_with<B, Fut>(
        &mut self,
        config: &GatewayConfig,
        bind: B,
    ) -> Result<SocketAddr, StartError>
    where
        B: FnOnce(String, u16) -> Fut,
        Fut: Future<Output = std::io::Result<TcpListener>>,
    {
        self.transition(LifecycleState::Starting)?;
        if self.shutdown.send_replace(false) {
            tracing::debug!("discarding shutdown request made before start");
        }

        match self.bring_up(config, bind).await {
            Ok(addr) => {
                self.transition(LifecycleState::Running)?;
                Ok(addr)
            }
            Err(e) => {
                tracing::error!(error = %e, "server failed to start");
                self.transition(LifecycleState::Stopped)?;
                Err(e)
            }
        }
    }

    async fn bring_up<B, Fut>(
        &mut self,
        config: &GatewayConfig,
        bind: B,
    ) -> Result<SocketAddr, StartError>
    where
        B: FnOnce(String, u16) -> Fut,
        Fut: Future<Output = std::io::Result<TcpListener>>,
    {
        let store = Arc::new(config.security.credential_store()?);
        tracing::info!(users = ?store.logins(), "authorized users");

        let auth_state = AuthState::new(
            Arc::new(BasicAuthProvider::new(store, config.security.realm.clone())),
            Arc::new(AuthorizationPolicy::new(RoutePolicy::reference())),
        )
        .map_err(|_| StartError::InvalidRealm(config.security.realm.clone()))?;
        let router = app::build_app(auth_state, Greeting::new(&config.app.greeting));

        let host = config.server.host.as_str();
        let port = config.server.port_setting().bind_port();
        let bind_failure = |source: std::io::Error| StartError::BindFailure {
            addr: format!("{host}:{port}"),
            source,
        };

        // A timed-out bind is dropped here, so no socket outlives a failed start.
        let listener = within(config.server.startup_timeout(), bind(host.to_string(), port))
            .await?
            .map_err(bind_failure)?;
        let addr = listener.local_addr().map_err(bind_failure)?;

        let signal = shutdown_requested(self.shutdown.subscribe());
        self.server = Some(tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(signal)
                .await
        }));
        self.local_addr = Some(addr);
        self.shutdown_grace = config.server.shutdown_grace();
        self.started_at = Some(Utc::now());

        tracing::info!(%addr, "server started at http://{addr}");
        Ok(addr)
    }

    /// Wait until a stop is requested through a [`ShutdownHandle`] or `max`
    /// elapses, then stop the server. `None` waits indefinitely.
    pub async fn await_shutdown(&mut self, max: Option<Duration>) -> Result<(), StopError> {
        if self.state == LifecycleState::Running {
            let requested = shutdown_requested(self.shutdown.subscribe());
            match max {
                Some(limit) => {
                    if tokio::time::timeout(limit, requested).await.is_err() {
                        tracing::info!(?limit, "run duration elapsed");
                    }
                }
                None => requested.await,
            }
        }

        self.stop().await
    }

    /// Stop accepting connections, let in-flight requests finish within the
    /// grace period, then release the listener.
    ///
    /// Calling this again once stopping or stopped succeeds without effect.
    pub async fn stop(&mut self) -> Result<(), StopError> {
        if self.state == LifecycleState::Stopped {
            return Ok(());
        }
        if self.state != LifecycleState::Stopping {
            self.transition(LifecycleState::Stopping)?;
        }

        self.shutdown.send_replace(true);

        let result = match self.server.take() {
            Some(mut handle) => match tokio::time::timeout(self.shutdown_grace, &mut handle).await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(StopError::ServerFailed(e.to_string())),
                Ok(Err(e)) => Err(StopError::ServerFailed(e.to_string())),
                Err(_) => {
                    handle.abort();
                    Err(StopError::GracePeriodExceeded(self.shutdown_grace))
                }
            },
            None => Ok(()),
        };

        if let Err(e) = &result {
            tracing::warn!(error = %e, "server did not shut down cleanly");
        }

        self.local_addr = None;
        self.transition(LifecycleState::Stopped)?;

        if let Some(started_at) = self.started_at.take() {
            let uptime = Utc::now() - started_at;
            tracing::info!(uptime_ms = uptime.num_milliseconds(), "server stopped");
        }

        result
    }
}

impl Drop for ServerLifecycleManager {
    fn drop(&mut self) {
        // Let a still-running server task wind down instead of leaking it.
        self.shutdown.send_replace(true);
    }
}

/// Resolve once the shutdown flag is set (or its sender is gone).
async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    let _ = rx.wait_for(|stop| *stop).await;
}

/// Bound a startup step by `limit`.
async fn within<F: Future>(limit: Duration, step: F) -> Result<F::Output, StartError> {
    tokio::time::timeout(limit, step)
        .await
        .map_err(|_| StartError::Timeout(limit))
}
