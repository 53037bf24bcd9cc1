//! Command implementations.
//!
//! - `cart` - cart display and mutations
//! - `session` - login, logout and session checks

pub mod cart;
pub mod session;

use std::sync::Arc;

use thiserror::Error;

use timberline_storefront::api::{GatewayError, HttpCartGateway};
use timberline_storefront::config::StorefrontConfig;
use timberline_storefront::error::CartError;
use timberline_storefront::notify::TracingNotifier;
use timberline_storefront::services::{AuthGate, CartStore, SessionGuard};
use timberline_storefront::storage::{self, KeyValueStore, StorageError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Cart action failed.
    #[error("{0}")]
    Cart(#[from] CartError),

    /// Direct API call failed.
    #[error("{0}")]
    Gateway(#[from] GatewayError),

    /// Local storage could not be written.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Invalid command argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Writing to the terminal failed.
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

/// Everything a command needs, wired from configuration.
pub struct Context {
    pub cart: CartStore,
    pub sessions: SessionGuard,
    pub storage: Arc<dyn KeyValueStore>,
    pub gateway: HttpCartGateway,
}

impl Context {
    /// Open the local store and build the cart against the configured API.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &StorefrontConfig) -> Result<Self, CliError> {
        let storage = storage::open_durable(&config.storage_dir);
        let auth = AuthGate::new(storage.clone());
        let gateway = HttpCartGateway::new(&config.api, auth.clone())?;

        let cart = CartStore::new(
            Arc::new(gateway.clone()),
            storage.clone(),
            auth.clone(),
            Arc::new(TracingNotifier),
        );
        let sessions = SessionGuard::new(storage.clone(), auth, Arc::new(gateway.clone()));

        Ok(Self {
            cart,
            sessions,
            storage,
            gateway,
        })
    }
}
