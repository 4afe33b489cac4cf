//! Core types for Carryover.
//!
//! This module provides type-safe wrappers for the sync engine's domain concepts.

pub mod id;
pub mod identity;
pub mod item;
pub mod kind;
pub mod price;
pub mod quantity;

pub use id::*;
pub use identity::Identity;
pub use item::{ItemAttributes, ItemRecord};
pub use kind::{CollectionKind, RECENTLY_VIEWED_CAPACITY, UnknownKindError};
pub use price::{CurrencyCode, Price};
pub use quantity::{Quantity, QuantityError};
