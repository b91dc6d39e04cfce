//! HTTP gateway: configuration, security pipeline, routing and server lifecycle.

pub mod app;
pub mod authz;
pub mod config;
pub mod middleware;
pub mod server;

pub use config::{ConfigLoader, GatewayConfig};
pub use server::{LifecycleState, ServerLifecycleManager, ShutdownHandle, StartError, StopError};
