//! Fixed-point coin amounts.
//!
//! Vendors report values either as integer base units or as floating point coins. Everything is
//! normalised to [`Amount`], a signed count of atoms at [`ATOMS_PER_COIN`], so that comparisons
//! and differences are exact.

use serde::{Deserialize, Serialize};

use super::error::AppError;

/// Atoms in one whole coin (8 decimal places)
pub const ATOMS_PER_COIN: i64 = 100_000_000;

const DECIMALS: u32 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Amount(i64);

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[must_use]
    pub const fn from_atoms(atoms: i64) -> Self {
        Self(atoms)
    }

    /// Converts a coin-denominated float, rounding to the nearest atom.
    ///
    /// Fails for NaN, infinities, negative values and values beyond the `i64` atom range.
    pub fn from_coins(coins: f64) -> Result<Self, AppError> {
        if !coins.is_finite() {
            return Err(AppError::InvalidAmount(format!("{} is not a finite number", coins)));
        }
        if coins < 0.0 {
            return Err(AppError::InvalidAmount(format!("{} is negative", coins)));
        }
        let atoms = (coins * ATOMS_PER_COIN as f64).round();
        if atoms >= i64::MAX as f64 {
            return Err(AppError::InvalidAmount(format!("{} is out of range", coins)));
        }
        Ok(Self(atoms as i64))
    }

    /// Converts an integer count of base units with `decimals` places (satoshi, wei, token units).
    ///
    /// Values with more than eight decimals lose the excess precision.
    pub fn from_base_units(units: f64, decimals: u32) -> Result<Self, AppError> {
        if decimals <= DECIMALS {
            Self::from_coins(units * 10f64.powi((DECIMALS - decimals) as i32) / ATOMS_PER_COIN as f64)
        } else {
            Self::from_coins(units / 10f64.powi(decimals as i32))
        }
    }

    /// Parses a decimal string such as `"0.5"` or `"12"`.
    pub fn parse(value: &str) -> Result<Self, AppError> {
        let coins: f64 = value
            .trim()
            .parse()
            .map_err(|_| AppError::InvalidAmount(format!("'{}' is not a number", value)))?;
        Self::from_coins(coins)
    }

    #[must_use]
    pub const fn atoms(self) -> i64 {
        self.0
    }

    #[must_use]
    pub fn to_coins(self) -> f64 {
        self.0 as f64 / ATOMS_PER_COIN as f64
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::Sub for Amount {
    type Output = Amount;

    fn sub(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Add for Amount {
    type Output = Amount;

    fn add(self, rhs: Amount) -> Amount {
        Amount(self.0.saturating_add(rhs.0))
    }
}

impl std::fmt::Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let per_coin = ATOMS_PER_COIN as u64;
        write!(f, "{}{}.{:08}", sign, abs / per_coin, abs % per_coin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_coins_rounds_to_nearest_atom() {
        assert_eq!(Amount::from_coins(0.5).unwrap().atoms(), 50_000_000);
        // 0.1 + 0.2 is not exactly 0.3 in binary floating point
        assert_eq!(
            Amount::from_coins(0.1 + 0.2).unwrap(),
            Amount::from_coins(0.3).unwrap()
        );
    }

    #[test]
    fn test_from_coins_rejects_bad_input() {
        assert!(matches!(
            Amount::from_coins(-1.0),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::from_coins(f64::NAN),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::from_coins(f64::INFINITY),
            Err(AppError::InvalidAmount(_))
        ));
        assert!(matches!(
            Amount::from_coins(1e12),
            Err(AppError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_from_base_units() {
        // 1.5 LTC in litoshi
        assert_eq!(
            Amount::from_base_units(150_000_000.0, 8).unwrap(),
            Amount::from_coins(1.5).unwrap()
        );
        // 0.25 ETH in wei
        assert_eq!(
            Amount::from_base_units(250_000_000_000_000_000.0, 18).unwrap(),
            Amount::from_coins(0.25).unwrap()
        );
        // 12.5 USDT with 6 decimals
        assert_eq!(
            Amount::from_base_units(12_500_000.0, 6).unwrap(),
            Amount::from_coins(12.5).unwrap()
        );
    }

    #[test]
    fn test_parse() {
        assert_eq!(Amount::parse(" 0.5 ").unwrap().atoms(), 50_000_000);
        assert!(Amount::parse("abc").is_err());
    }

    #[test]
    fn test_subtraction_is_exact() {
        let a = Amount::from_coins(0.3).unwrap();
        let b = Amount::from_coins(0.1 + 0.2).unwrap();
        assert_eq!(a - b, Amount::ZERO);
        assert_eq!((Amount::from_atoms(5) - Amount::from_atoms(7)).atoms(), -2);
    }

    #[test]
    fn test_display() {
        assert_eq!(Amount::from_atoms(150_000_000).to_string(), "1.50000000");
        assert_eq!(Amount::from_atoms(-1).to_string(), "-0.00000001");
    }
}
