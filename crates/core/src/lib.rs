//! Timberline Core - Shared cart types library.
//!
//! This crate provides the types shared by the Timberline cart components:
//! - `storefront` - Cart state container, reconciliation and remote gateway
//! - `cli` - Command-line client driving the cart
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no storage
//! access, no HTTP clients. This keeps it lightweight and allows it to be
//! used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for product IDs, quantities, prices and cart lines

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
