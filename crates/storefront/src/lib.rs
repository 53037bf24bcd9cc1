//! Timberline storefront cart library.
//!
//! Keeps the shopping cart consistent across the guest's durable local store
//! and the account cart served by the storefront API. See
//! [`services::cart::CartStore`] for the entry point.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod notify;
pub mod services;
pub mod storage;
