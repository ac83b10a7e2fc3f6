//! # Tax Engine
//!
//! Pure jurisdictional tax computation: subtotal + config in, breakdown out.
//!
//! ## Computation Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  subtotal ($100.00) + TaxConfig { jurisdiction: "QC", fallback }    │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  jurisdiction_rule("QC") ──► Dual { GST 5%, QST 9.975%, compound }  │
//! │       │                         (unknown key ──► Flat fallback)     │
//! │       ▼                                                             │
//! │  compute() ──► TaxBreakdown {                                       │
//! │                  primary:   GST   $5.00                             │
//! │                  secondary: QST  $10.47  (on subtotal + primary)    │
//! │                  total:          $15.47                             │
//! │                }                                                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Precision
//! Rates are carried in thousandths of a percent so 9.975% is exact.
//! Compounding is evaluated as one exact integer rational in i128; each
//! component rounds to cents exactly once, and the reported total is the
//! sum of the rounded components, so the invariant
//! `primary + secondary == total` holds by construction.

use serde::{Deserialize, Serialize};

use crate::money::Money;

/// Rate denominator: rates are stored in units of 0.001%.
const RATE_DENOM: i128 = 100_000;

// =============================================================================
// Tax Rate
// =============================================================================

/// A tax rate in thousandths of a percent (9975 = 9.975%).
///
/// Basis points are too coarse here: Quebec's QST is 9.975%, which does not
/// fit in whole bps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRate(u32);

impl TaxRate {
    /// Creates a rate from thousandths of a percent.
    #[inline]
    pub const fn from_milli_percent(milli_pct: u32) -> Self {
        TaxRate(milli_pct)
    }

    /// Creates a rate from a percentage, for configuration convenience.
    pub fn from_percentage(pct: f64) -> Self {
        TaxRate((pct * 1000.0).round() as u32)
    }

    /// Returns the rate in thousandths of a percent.
    #[inline]
    pub const fn milli_percent(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 1000.0
    }

    #[inline]
    pub const fn zero() -> Self {
        TaxRate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

// =============================================================================
// Jurisdiction Rules
// =============================================================================

/// The tax rule a jurisdiction key selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaxRule {
    /// One flat component.
    Flat { name: &'static str, rate: TaxRate },
    /// Two named components. When `compound` is set, the secondary is
    /// computed on (subtotal + primary) instead of the bare subtotal.
    Dual {
        primary_name: &'static str,
        primary: TaxRate,
        secondary_name: &'static str,
        secondary: TaxRate,
        compound: bool,
    },
}

/// Static jurisdiction table (Canadian provinces and territories).
///
/// This shape is load-bearing for tax parity: the keys, component names and
/// percentages must not drift. Returns `None` for unknown keys; callers fall
/// back to the configured flat rate.
pub fn jurisdiction_rule(key: &str) -> Option<TaxRule> {
    const GST: TaxRate = TaxRate::from_milli_percent(5_000);

    match key.trim().to_ascii_uppercase().as_str() {
        "QC" => Some(TaxRule::Dual {
            primary_name: "GST",
            primary: GST,
            secondary_name: "QST",
            secondary: TaxRate::from_milli_percent(9_975),
            compound: true,
        }),
        "ON" => Some(TaxRule::Flat {
            name: "HST",
            rate: TaxRate::from_milli_percent(13_000),
        }),
        "BC" => Some(TaxRule::Dual {
            primary_name: "GST",
            primary: GST,
            secondary_name: "PST",
            secondary: TaxRate::from_milli_percent(7_000),
            compound: false,
        }),
        "MB" => Some(TaxRule::Dual {
            primary_name: "GST",
            primary: GST,
            secondary_name: "RST",
            secondary: TaxRate::from_milli_percent(7_000),
            compound: false,
        }),
        "SK" => Some(TaxRule::Dual {
            primary_name: "GST",
            primary: GST,
            secondary_name: "PST",
            secondary: TaxRate::from_milli_percent(6_000),
            compound: false,
        }),
        "NS" => Some(TaxRule::Flat {
            name: "HST",
            rate: TaxRate::from_milli_percent(14_000),
        }),
        "NB" | "NL" | "PE" => Some(TaxRule::Flat {
            name: "HST",
            rate: TaxRate::from_milli_percent(15_000),
        }),
        "AB" | "NT" | "NU" | "YT" => Some(TaxRule::Flat { name: "GST", rate: GST }),
        _ => None,
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Explicitly passed tax configuration.
///
/// Threaded into every pricing call rather than read from ambient settings,
/// so the engine stays pure and independently testable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaxConfig {
    /// Jurisdiction key ("QC", "ON", ...). Unknown keys use `fallback`.
    pub jurisdiction: String,
    /// Flat rate applied when the jurisdiction is not in the table.
    pub fallback: TaxRate,
}

impl TaxConfig {
    pub fn new(jurisdiction: impl Into<String>, fallback: TaxRate) -> Self {
        TaxConfig {
            jurisdiction: jurisdiction.into(),
            fallback,
        }
    }

    /// Resolves the active rule, falling back to the flat default.
    pub fn rule(&self) -> TaxRule {
        jurisdiction_rule(&self.jurisdiction).unwrap_or(TaxRule::Flat {
            name: "Tax",
            rate: self.fallback,
        })
    }
}

impl Default for TaxConfig {
    fn default() -> Self {
        TaxConfig {
            jurisdiction: "QC".to_string(),
            fallback: TaxRate::from_milli_percent(13_000),
        }
    }
}

// =============================================================================
// Breakdown
// =============================================================================

/// The result of a tax computation. Component names are empty strings when
/// the slot is unused, matching the persisted/export shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub primary_name: String,
    pub secondary_name: String,
    pub primary_cents: i64,
    pub secondary_cents: i64,
    pub total_cents: i64,
    /// True when the secondary component was computed on subtotal + primary.
    pub compound: bool,
}

impl TaxBreakdown {
    /// A zero breakdown with no named components.
    pub fn zero() -> Self {
        TaxBreakdown {
            primary_name: String::new(),
            secondary_name: String::new(),
            primary_cents: 0,
            secondary_cents: 0,
            total_cents: 0,
            compound: false,
        }
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Computation
// =============================================================================

/// Rounds `subtotal_cents * rate / denom` half-up to whole cents.
fn apply_rate(subtotal_cents: i64, rate_num: i128, denom: i128) -> i64 {
    ((subtotal_cents as i128 * rate_num + denom / 2) / denom) as i64
}

/// Computes the tax breakdown for a non-negative subtotal.
///
/// Pure and deterministic: the same subtotal and config always yield the
/// same cents-stable breakdown.
pub fn compute(subtotal: Money, config: &TaxConfig) -> TaxBreakdown {
    let sub = subtotal.cents().max(0);

    match config.rule() {
        TaxRule::Flat { name, rate } => {
            let primary = apply_rate(sub, rate.milli_percent() as i128, RATE_DENOM);
            TaxBreakdown {
                primary_name: name.to_string(),
                secondary_name: String::new(),
                primary_cents: primary,
                secondary_cents: 0,
                total_cents: primary,
                compound: false,
            }
        }
        TaxRule::Dual {
            primary_name,
            primary,
            secondary_name,
            secondary,
            compound,
        } => {
            let p = primary.milli_percent() as i128;
            let s = secondary.milli_percent() as i128;

            let primary_cents = apply_rate(sub, p, RATE_DENOM);
            let secondary_cents = if compound {
                // secondary on (subtotal * (1 + p)) as one exact rational,
                // so the unrounded primary feeds the compounding step.
                apply_rate(sub, s * (RATE_DENOM + p), RATE_DENOM * RATE_DENOM)
            } else {
                apply_rate(sub, s, RATE_DENOM)
            };

            TaxBreakdown {
                primary_name: primary_name.to_string(),
                secondary_name: secondary_name.to_string(),
                primary_cents,
                secondary_cents,
                total_cents: primary_cents + secondary_cents,
                compound,
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn qc() -> TaxConfig {
        TaxConfig::new("QC", TaxRate::from_milli_percent(13_000))
    }

    #[test]
    fn test_compound_scenario() {
        // $100.00 in QC: GST 5% = $5.00, QST 9.975% on $105.00 = $10.4738
        // -> $10.47, total $15.47.
        let b = compute(Money::from_cents(10_000), &qc());
        assert_eq!(b.primary_name, "GST");
        assert_eq!(b.secondary_name, "QST");
        assert_eq!(b.primary_cents, 500);
        assert_eq!(b.secondary_cents, 1047);
        assert_eq!(b.total_cents, 1547);
        assert!(b.compound);
    }

    #[test]
    fn test_flat_jurisdiction() {
        let cfg = TaxConfig::new("ON", TaxRate::zero());
        let b = compute(Money::from_cents(10_000), &cfg);
        assert_eq!(b.primary_name, "HST");
        assert_eq!(b.secondary_name, "");
        assert_eq!(b.primary_cents, 1300);
        assert_eq!(b.total_cents, 1300);
        assert!(!b.compound);
    }

    #[test]
    fn test_non_compound_dual() {
        // BC: 5% + 7% both on the bare subtotal.
        let cfg = TaxConfig::new("bc", TaxRate::zero());
        let b = compute(Money::from_cents(10_000), &cfg);
        assert_eq!(b.primary_cents, 500);
        assert_eq!(b.secondary_cents, 700);
        assert_eq!(b.total_cents, 1200);
        assert!(!b.compound);
    }

    #[test]
    fn test_unknown_jurisdiction_falls_back() {
        let cfg = TaxConfig::new("narnia", TaxRate::from_milli_percent(8_000));
        let b = compute(Money::from_cents(5_000), &cfg);
        assert_eq!(b.primary_name, "Tax");
        assert_eq!(b.primary_cents, 400); // 8% of $50.00
        assert_eq!(b.total_cents, 400);
    }

    #[test]
    fn test_deterministic_and_components_sum() {
        for subtotal in [0i64, 1, 99, 100, 1047, 9_999, 123_456, 10_000_000] {
            let a = compute(Money::from_cents(subtotal), &qc());
            let b = compute(Money::from_cents(subtotal), &qc());
            assert_eq!(a, b);
            assert_eq!(a.primary_cents + a.secondary_cents, a.total_cents);
            assert!(a.total_cents >= 0);
        }
    }

    #[test]
    fn test_zero_subtotal() {
        let b = compute(Money::zero(), &qc());
        assert_eq!(b.total_cents, 0);
        assert_eq!(b.primary_cents, 0);
        assert_eq!(b.secondary_cents, 0);
    }

    #[test]
    fn test_key_normalization() {
        assert!(jurisdiction_rule(" qc ").is_some());
        assert!(jurisdiction_rule("On").is_some());
        assert!(jurisdiction_rule("XX").is_none());
    }
}
