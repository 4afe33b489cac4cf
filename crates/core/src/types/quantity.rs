//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// The requested quantity is zero or negative.
    #[error("quantity must be at least {min} (got {got})")]
    BelowMinimum {
        /// Smallest allowed quantity.
        min: u32,
        /// The rejected value.
        got: i64,
    },
    /// The requested quantity does not fit in a cart line.
    #[error("quantity must be at most {max} (got {got})")]
    TooLarge {
        /// Largest allowed quantity.
        max: u32,
        /// The rejected value.
        got: i64,
    },
}

/// The number of units of an item held in a cart.
///
/// ## Constraints
///
/// - Always at least 1. Removing a line is a separate operation, so a request
///   for zero units is rejected rather than interpreted as a removal.
///
/// ## Examples
///
/// ```
/// use carryover_core::Quantity;
///
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(-2).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// Smallest valid quantity.
    pub const MIN: u32 = 1;

    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Validate and wrap a requested quantity.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::BelowMinimum` if `n < 1` and
    /// `QuantityError::TooLarge` if `n` exceeds `u32::MAX`.
    pub fn new(n: i64) -> Result<Self, QuantityError> {
        if n < i64::from(Self::MIN) {
            return Err(QuantityError::BelowMinimum {
                min: Self::MIN,
                got: n,
            });
        }

        u32::try_from(n).map(Self).map_err(|_| QuantityError::TooLarge {
            max: u32::MAX,
            got: n,
        })
    }

    /// Returns the number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add two quantities, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i64> for Quantity {
    type Error = QuantityError;

    fn try_from(n: i64) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}
