//! Positive line-item quantity.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when constructing a [`Quantity`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuantityError {
    /// Cart lines never hold zero units.
    #[error("quantity must be at least 1")]
    Zero,
    /// The value is negative or does not fit in a `u32`.
    #[error("quantity {0} is out of range")]
    OutOfRange(i64),
}

/// Number of units on a cart line.
///
/// A cart line always holds at least one unit; a line whose quantity would
/// drop to zero is removed instead. Deserialization enforces the same rule,
/// so a persisted cart containing a zero quantity is rejected as malformed.
///
/// ## Examples
///
/// ```
/// use timberline_core::Quantity;
///
/// assert!(Quantity::new(0).is_err());
/// assert_eq!(Quantity::new(3).unwrap().get(), 3);
/// assert_eq!(Quantity::ONE.get(), 1);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Create a quantity from a positive count.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for zero.
    pub const fn new(count: u32) -> Result<Self, QuantityError> {
        if count == 0 {
            return Err(QuantityError::Zero);
        }
        Ok(Self(count))
    }

    /// Create a quantity from a signed count, as typed into a quantity field.
    ///
    /// Returns `Ok(None)` for zero or negative input, which callers treat as
    /// "remove the line".
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::OutOfRange`] if the value exceeds `u32::MAX`.
    pub fn from_signed(count: i64) -> Result<Option<Self>, QuantityError> {
        if count <= 0 {
            return Ok(None);
        }
        let count = u32::try_from(count).map_err(|_| QuantityError::OutOfRange(count))?;
        Ok(Some(Self(count)))
    }

    /// Get the underlying count.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add units, saturating at `u32::MAX`.
    #[must_use]
    pub const fn saturating_add(self, units: u32) -> Self {
        Self(self.0.saturating_add(units))
    }

    /// Remove units. Returns `None` once the count reaches zero.
    #[must_use]
    pub const fn checked_sub(self, units: u32) -> Option<Self> {
        match self.0.saturating_sub(units) {
            0 => None,
            rest => Some(Self(rest)),
        }
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

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(count: u32) -> Result<Self, Self::Error> {
        Self::new(count)
    }
}

impl From<Quantity> for u32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
    }

    #[test]
    fn test_from_signed_non_positive_means_remove() {
        assert_eq!(Quantity::from_signed(0).unwrap(), None);
        assert_eq!(Quantity::from_signed(-4).unwrap(), None);
        assert_eq!(Quantity::from_signed(7).unwrap(), Some(Quantity::new(7).unwrap()));
    }

    #[test]
    fn test_from_signed_out_of_range() {
        let too_big = i64::from(u32::MAX) + 1;
        assert_eq!(
            Quantity::from_signed(too_big),
            Err(QuantityError::OutOfRange(too_big))
        );
    }

    #[test]
    fn test_checked_sub_reaches_zero() {
        let qty = Quantity::new(2).unwrap();
        assert_eq!(qty.checked_sub(1), Some(Quantity::ONE));
        assert_eq!(qty.checked_sub(2), None);
        assert_eq!(qty.checked_sub(50), None);
    }

    #[test]
    fn test_saturating_add() {
        let qty = Quantity::new(u32::MAX - 1).unwrap();
        assert_eq!(qty.saturating_add(10).get(), u32::MAX);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        assert!(serde_json::from_str::<Quantity>("0").is_err());
        assert_eq!(serde_json::from_str::<Quantity>("4").unwrap().get(), 4);
    }
}
