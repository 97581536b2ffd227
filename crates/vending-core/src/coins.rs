//! # Coins Module
//!
//! Provides the `Coins` amount type, the fixed `Denomination` set, and the
//! change calculator used after every purchase.
//!
//! ## Why Integer Coins?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every balance, price and change value is an integer count of the      │
//! │  smallest coin unit. The machine only accepts and dispenses:           │
//! │                                                                         │
//! │     100   50   20   10   5                                              │
//! │                                                                         │
//! │  Balance 100, purchase 75  →  change 25  →  { 20 × 1, 5 × 1 }          │
//! │  Balance  7 (legacy data)  →  change  7  →  { 5 × 1 } + remainder 2    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vending_core::coins::{make_change, Coins, Denomination};
//!
//! let change = make_change(Coins::new(185));
//! assert_eq!(change.count(Denomination::Hundred), 1);
//! assert_eq!(change.count(Denomination::Five), 1);
//! assert!(change.unrepresentable().is_zero());
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Sub};

use crate::error::CoreError;

// =============================================================================
// Coins Type
// =============================================================================

/// An amount expressed in the smallest coin unit.
///
/// ## Design Decisions
/// - **i64 (signed)**: matches the SQLite INTEGER column; the domain rules
///   (not the type) keep persisted values non-negative
/// - **Checked arithmetic**: balance and cost math goes through `checked_*`
///   so overflow becomes a typed error instead of a wrap-around
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[serde(transparent)]
pub struct Coins(i64);

impl Coins {
    /// Creates an amount from raw coin units.
    #[inline]
    pub const fn new(units: i64) -> Self {
        Coins(units)
    }

    /// Returns the raw coin units.
    #[inline]
    pub const fn units(&self) -> i64 {
        self.0
    }

    /// Zero coins.
    #[inline]
    pub const fn zero() -> Self {
        Coins(0)
    }

    /// Checks if the amount is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the amount is strictly positive.
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the amount is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Adds two amounts, returning `None` on overflow.
    #[inline]
    pub const fn checked_add(self, other: Coins) -> Option<Coins> {
        match self.0.checked_add(other.0) {
            Some(v) => Some(Coins(v)),
            None => None,
        }
    }

    /// Subtracts two amounts, returning `None` on overflow.
    ///
    /// A negative result is still `Some`; callers decide whether a negative
    /// balance is an error (it always is for accounts).
    #[inline]
    pub const fn checked_sub(self, other: Coins) -> Option<Coins> {
        match self.0.checked_sub(other.0) {
            Some(v) => Some(Coins(v)),
            None => None,
        }
    }

    /// Multiplies a unit price by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use vending_core::coins::Coins;
    ///
    /// assert_eq!(Coins::new(25).checked_mul_quantity(3), Some(Coins::new(75)));
    /// assert_eq!(Coins::new(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(self, qty: i64) -> Option<Coins> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Coins(v)),
            None => None,
        }
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Add for Coins {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Coins(self.0 + other.0)
    }
}

impl Sub for Coins {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Coins(self.0 - other.0)
    }
}

// =============================================================================
// Denomination
// =============================================================================

/// One of the fixed coin values accepted for deposit and used for change.
///
/// The set is closed and deliberately not configurable: the greedy change
/// algorithm below is only guaranteed minimal for this exact set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum Denomination {
    Five = 5,
    Ten = 10,
    Twenty = 20,
    Fifty = 50,
    Hundred = 100,
}

impl Denomination {
    /// All denominations, largest first (the order change is dispensed in).
    pub const DESCENDING: [Denomination; 5] = [
        Denomination::Hundred,
        Denomination::Fifty,
        Denomination::Twenty,
        Denomination::Ten,
        Denomination::Five,
    ];

    /// Face value in coin units.
    #[inline]
    pub const fn value(self) -> i64 {
        self as i64
    }

    /// Face value as a `Coins` amount.
    #[inline]
    pub const fn coins(self) -> Coins {
        Coins(self as i64)
    }

    /// Looks up the denomination with the given face value.
    pub fn from_value(value: i64) -> Option<Self> {
        Self::DESCENDING.into_iter().find(|d| d.value() == value)
    }

    /// Accepted face values, ascending.
    pub fn accepted_values() -> Vec<i64> {
        let mut values: Vec<i64> = Self::DESCENDING.iter().map(|d| d.value()).collect();
        values.reverse();
        values
    }
}

impl TryFrom<i64> for Denomination {
    type Error = CoreError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Denomination::from_value(value).ok_or(CoreError::InvalidDenomination { amount: value })
    }
}

impl From<Denomination> for i64 {
    fn from(d: Denomination) -> Self {
        d.value()
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

// =============================================================================
// Change
// =============================================================================

/// Coins handed back after a purchase.
///
/// `coins` only holds denominations with a non-zero count. When the amount
/// could not be fully expressed (a residue of 1..=4 units), the residue is
/// kept in `unrepresentable` instead of being dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    coins: BTreeMap<Denomination, u64>,
    #[serde(default, skip_serializing_if = "Coins::is_zero")]
    unrepresentable: Coins,
}

impl Change {
    /// Number of coins of the given denomination.
    pub fn count(&self, denomination: Denomination) -> u64 {
        self.coins.get(&denomination).copied().unwrap_or(0)
    }

    /// Dispensed coins, largest denomination first.
    pub fn coins(&self) -> impl Iterator<Item = (Denomination, u64)> + '_ {
        self.coins.iter().rev().map(|(d, n)| (*d, *n))
    }

    /// Residue the denomination set cannot express.
    pub fn unrepresentable(&self) -> Coins {
        self.unrepresentable
    }

    /// Total value of the dispensed coins (excludes the residue).
    pub fn dispensed(&self) -> Coins {
        Coins(
            self.coins
                .iter()
                .map(|(d, n)| d.value() * *n as i64)
                .sum(),
        )
    }

    /// Total number of physical coins dispensed.
    pub fn coin_count(&self) -> u64 {
        self.coins.values().sum()
    }

    /// True when nothing is handed back at all.
    pub fn is_empty(&self) -> bool {
        self.coins.is_empty() && self.unrepresentable.is_zero()
    }
}

/// Decomposes an amount into the fewest coins of the fixed denomination set.
///
/// ## Algorithm
/// ```text
/// amount = 185
///   100 → 185 / 100 = 1, rest 85
///    50 →  85 /  50 = 1, rest 35
///    20 →  35 /  20 = 1, rest 15
///    10 →  15 /  10 = 1, rest  5
///     5 →   5 /   5 = 1, rest  0
/// ```
/// Greedy is optimal for {100, 50, 20, 10, 5}: the set is canonical, so
/// always taking the largest coin first never increases the coin count.
///
/// Zero and negative amounts produce an empty `Change`.
pub fn make_change(amount: Coins) -> Change {
    let mut change = Change::default();
    if !amount.is_positive() {
        return change;
    }

    let mut rest = amount.units();
    for denomination in Denomination::DESCENDING {
        let count = rest / denomination.value();
        rest %= denomination.value();
        if count > 0 {
            change.coins.insert(denomination, count as u64);
        }
    }

    change.unrepresentable = Coins(rest);
    change
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_make_change_uses_every_denomination_once() {
        let change = make_change(Coins::new(185));
        for d in Denomination::DESCENDING {
            assert_eq!(change.count(d), 1, "denomination {d}");
        }
        assert!(change.unrepresentable().is_zero());
        assert_eq!(change.dispensed(), Coins::new(185));
    }

    #[test]
    fn test_make_change_zero_is_empty() {
        let change = make_change(Coins::zero());
        assert!(change.is_empty());
        assert_eq!(change.coin_count(), 0);
    }

    #[test]
    fn test_make_change_flags_remainder() {
        let change = make_change(Coins::new(7));
        assert_eq!(change.count(Denomination::Five), 1);
        assert_eq!(change.coin_count(), 1);
        assert_eq!(change.unrepresentable(), Coins::new(2));
    }

    #[test]
    fn test_make_change_prefers_largest_denomination() {
        // 40 could be 4×10 or 2×20; greedy must pick 2×20
        let change = make_change(Coins::new(40));
        assert_eq!(change.count(Denomination::Twenty), 2);
        assert_eq!(change.count(Denomination::Ten), 0);

        let change = make_change(Coins::new(25));
        let coins: Vec<_> = change.coins().collect();
        assert_eq!(
            coins,
            vec![(Denomination::Twenty, 1), (Denomination::Five, 1)]
        );
    }

    #[test]
    fn test_make_change_sums_to_input() {
        for amount in 0..1_000 {
            let change = make_change(Coins::new(amount));
            assert_eq!(
                change.dispensed() + change.unrepresentable(),
                Coins::new(amount)
            );
            assert!(change.unrepresentable().units() < 5);
        }
    }

    #[test]
    fn test_make_change_is_minimal() {
        // Compare against an exhaustive DP over the same coin set
        let values = [100usize, 50, 20, 10, 5];
        let max = 500;
        let mut best = vec![usize::MAX; max + 1];
        best[0] = 0;
        for amount in 1..=max {
            for v in values {
                if v <= amount && best[amount - v] != usize::MAX {
                    best[amount] = best[amount].min(best[amount - v] + 1);
                }
            }
        }
        for amount in (0..=max).step_by(5) {
            let change = make_change(Coins::new(amount as i64));
            assert_eq!(change.coin_count() as usize, best[amount], "amount {amount}");
        }
    }

    #[test]
    fn test_denomination_lookup() {
        assert_eq!(Denomination::try_from(50).unwrap(), Denomination::Fifty);
        assert!(matches!(
            Denomination::try_from(25),
            Err(CoreError::InvalidDenomination { amount: 25 })
        ));
        assert_eq!(Denomination::accepted_values(), vec![5, 10, 20, 50, 100]);
    }

    #[test]
    fn test_change_serializes_as_denomination_map() {
        let change = make_change(Coins::new(27));
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["coins"]["20"], 1);
        assert_eq!(json["coins"]["5"], 1);
        assert_eq!(json["unrepresentable"], 2);

        let exact = serde_json::to_value(make_change(Coins::new(25))).unwrap();
        assert!(exact.get("unrepresentable").is_none());
    }

    #[test]
    fn test_checked_arithmetic() {
        assert_eq!(Coins::new(10).checked_add(Coins::new(20)), Some(Coins::new(30)));
        assert_eq!(Coins::new(i64::MAX).checked_add(Coins::new(1)), None);
        assert_eq!(Coins::new(10).checked_sub(Coins::new(30)), Some(Coins::new(-20)));
        assert!(Coins::new(-1).is_negative());
    }
}
