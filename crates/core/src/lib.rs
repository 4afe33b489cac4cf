//! Carryover Core - Shared types for the guest-to-account sync engine.
//!
//! This crate provides the types shared by every Carryover component:
//! - `sync` - Collection stores, persistence adapters and the sync coordinator
//! - `cli` - Operator tooling for inspecting and re-running merges
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no network clients, no
//! persistence. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Type-safe IDs, quantities, identities, collection kinds,
//!   prices and the persisted item record

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
