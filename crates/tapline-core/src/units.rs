//! # Units Module
//!
//! The closed measurement-unit enum and its single conversion table.
//!
//! Recipe ingredients are measured either by volume (ml, oz, cl, l) or in
//! discrete units (whole cans, whole bottles). Everything volumetric is
//! normalized to millilitres before any availability or depletion math, so
//! there is exactly one place conversion factors live. An unrecognized unit
//! string is a construction-time error, never a silent fallback.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::types::Category;

/// Fluid ounce to millilitre conversion factor.
pub const OZ_TO_ML: f64 = 29.5735;

/// Assumed bottle volume when a product carries none (non-beer).
pub const DEFAULT_BOTTLE_ML: f64 = 750.0;

/// Assumed bottle volume for beer (standard 341 ml bottle).
pub const BEER_BOTTLE_ML: f64 = 341.0;

// =============================================================================
// Unit
// =============================================================================

/// Measurement unit for a recipe ingredient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    /// Millilitres.
    Ml,
    /// Fluid ounces.
    Oz,
    /// Centilitres.
    Cl,
    /// Litres.
    L,
    /// Discrete units (whole bottles, cans, garnishes).
    #[serde(rename = "unit")]
    Each,
}

impl Unit {
    /// Whether this unit is volume-based (convertible to ml).
    #[inline]
    pub const fn is_volume(&self) -> bool {
        !matches!(self, Unit::Each)
    }

    /// Converts a quantity in this unit to millilitres.
    ///
    /// Returns `None` for discrete units, which have no volume equivalent.
    pub fn to_ml(&self, quantity: f64) -> Option<f64> {
        match self {
            Unit::Ml => Some(quantity),
            Unit::Oz => Some(quantity * OZ_TO_ML),
            Unit::Cl => Some(quantity * 10.0),
            Unit::L => Some(quantity * 1000.0),
            Unit::Each => None,
        }
    }

    /// The canonical lowercase label, matching the persisted form.
    pub const fn label(&self) -> &'static str {
        match self {
            Unit::Ml => "ml",
            Unit::Oz => "oz",
            Unit::Cl => "cl",
            Unit::L => "l",
            Unit::Each => "unit",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Error for unit strings that are not in the closed vocabulary.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown unit '{0}', expected one of: ml, oz, cl, l, unit")]
pub struct UnitParseError(pub String);

impl FromStr for Unit {
    type Err = UnitParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ml" => Ok(Unit::Ml),
            "oz" => Ok(Unit::Oz),
            "cl" => Ok(Unit::Cl),
            "l" => Ok(Unit::L),
            "unit" => Ok(Unit::Each),
            other => Err(UnitParseError(other.to_string())),
        }
    }
}

// =============================================================================
// Category Defaults
// =============================================================================

/// Assumed per-bottle volume for a product category when the product record
/// carries no explicit bottle volume.
pub fn default_bottle_ml(category: Category) -> f64 {
    match category {
        Category::Beer => BEER_BOTTLE_ML,
        _ => DEFAULT_BOTTLE_ML,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_ml() {
        assert_eq!(Unit::Ml.to_ml(44.0), Some(44.0));
        assert_eq!(Unit::Cl.to_ml(4.0), Some(40.0));
        assert_eq!(Unit::L.to_ml(1.5), Some(1500.0));
        assert_eq!(Unit::Each.to_ml(2.0), None);

        let oz = Unit::Oz.to_ml(1.5).unwrap();
        assert!((oz - 44.36025).abs() < 1e-9);
    }

    #[test]
    fn test_parse() {
        assert_eq!("ml".parse::<Unit>().unwrap(), Unit::Ml);
        assert_eq!(" OZ ".parse::<Unit>().unwrap(), Unit::Oz);
        assert_eq!("unit".parse::<Unit>().unwrap(), Unit::Each);
        assert!("pints".parse::<Unit>().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let json = serde_json::to_string(&Unit::Each).unwrap();
        assert_eq!(json, "\"unit\"");
        let back: Unit = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Unit::Each);
    }

    #[test]
    fn test_default_bottle_ml() {
        assert_eq!(default_bottle_ml(Category::Beer), 341.0);
        assert_eq!(default_bottle_ml(Category::Wine), 750.0);
        assert_eq!(default_bottle_ml(Category::Spirits), 750.0);
    }
}
