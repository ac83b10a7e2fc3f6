//! # Sales Report Aggregator
//!
//! Rebuilds tax breakdowns for historical sales and rolls them up into
//! daily and overall statistics, plus a flat spreadsheet export.
//!
//! ## Breakdown Reconstruction
//! Sales written by current versions carry a structured breakdown and are
//! used verbatim. Older sales only stored a tax total; for those the
//! breakdown is recomputed from the subtotal under the jurisdiction active
//! at report time. That is an approximation whenever the jurisdiction
//! changed since the sale, so each reconstructed view is marked
//! `recomputed` and counted in the summary.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::tax::{self, TaxBreakdown, TaxConfig};
use crate::types::Sale;

// =============================================================================
// Payment Normalization
// =============================================================================

/// Closed payment vocabulary for exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NormalizedPayment {
    Cash,
    Debit,
    Credit,
    OtherProcessor,
    Other,
}

impl NormalizedPayment {
    /// Maps the free-form persisted payment method into the closed set.
    pub fn from_raw(raw: &str) -> Self {
        let raw = raw.trim().to_ascii_lowercase();
        if raw.contains("cash") {
            NormalizedPayment::Cash
        } else if raw.contains("debit") || raw.contains("interac") {
            NormalizedPayment::Debit
        } else if raw.contains("credit")
            || raw.contains("card")
            || raw.contains("visa")
            || raw.contains("mastercard")
            || raw.contains("amex")
        {
            NormalizedPayment::Credit
        } else if raw.contains("square") || raw.contains("stripe") || raw.contains("paypal") {
            NormalizedPayment::OtherProcessor
        } else {
            NormalizedPayment::Other
        }
    }

    pub const fn label(&self) -> &'static str {
        match self {
            NormalizedPayment::Cash => "cash",
            NormalizedPayment::Debit => "debit",
            NormalizedPayment::Credit => "credit",
            NormalizedPayment::OtherProcessor => "other-processor",
            NormalizedPayment::Other => "other",
        }
    }
}

// =============================================================================
// Tax Reconstruction
// =============================================================================

/// A sale's tax breakdown, stored or reconstructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleTaxView {
    pub breakdown: TaxBreakdown,
    /// True when the breakdown was recomputed under the report-time
    /// jurisdiction rather than read from the sale.
    pub recomputed: bool,
}

/// Uses the stored breakdown verbatim when present, otherwise recomputes
/// from the subtotal under the current configuration.
pub fn tax_view(sale: &Sale, config: &TaxConfig) -> SaleTaxView {
    match &sale.tax_breakdown {
        Some(breakdown) => SaleTaxView {
            breakdown: breakdown.clone(),
            recomputed: false,
        },
        None => SaleTaxView {
            breakdown: tax::compute(Money::from_cents(sale.subtotal_cents), config),
            recomputed: true,
        },
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// One day of sales.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub sale_count: usize,
    pub revenue_cents: i64,
    pub tip_cents: i64,
    pub tax_cents: i64,
}

/// Overall roll-up across the reported period.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub sale_count: usize,
    pub revenue_cents: i64,
    pub tip_cents: i64,
    pub tax_cents: i64,
    /// Mean grand total per sale, in cents.
    pub average_sale_cents: i64,
    /// Mean tip percentage across sales with a non-zero tip.
    pub average_tip_pct: f64,
    /// Days in ascending order.
    pub daily: Vec<DailyStats>,
    /// Number of sales whose breakdown had to be recomputed.
    pub recomputed_sales: usize,
}

/// Aggregates persisted sales into daily and overall statistics.
pub fn aggregate(sales: &[Sale], config: &TaxConfig) -> ReportSummary {
    let mut daily: BTreeMap<NaiveDate, DailyStats> = BTreeMap::new();
    let mut revenue = 0i64;
    let mut tips = 0i64;
    let mut taxes = 0i64;
    let mut recomputed = 0usize;
    let mut tip_pcts: Vec<f64> = Vec::new();

    for sale in sales {
        let view = tax_view(sale, config);
        if view.recomputed {
            recomputed += 1;
        }
        let tax_cents = view.breakdown.total_cents;

        revenue += sale.total_cents;
        tips += sale.tip_cents;
        taxes += tax_cents;

        if sale.tip_cents > 0 {
            let base = sale.subtotal_cents + tax_cents;
            if base > 0 {
                tip_pcts.push(sale.tip_cents as f64 / base as f64 * 100.0);
            }
        }

        let date = sale.created_at.date_naive();
        let day = daily.entry(date).or_insert_with(|| DailyStats {
            date,
            sale_count: 0,
            revenue_cents: 0,
            tip_cents: 0,
            tax_cents: 0,
        });
        day.sale_count += 1;
        day.revenue_cents += sale.total_cents;
        day.tip_cents += sale.tip_cents;
        day.tax_cents += tax_cents;
    }

    let sale_count = sales.len();
    let average_sale_cents = if sale_count > 0 {
        revenue / sale_count as i64
    } else {
        0
    };
    let average_tip_pct = if tip_pcts.is_empty() {
        0.0
    } else {
        tip_pcts.iter().sum::<f64>() / tip_pcts.len() as f64
    };

    ReportSummary {
        sale_count,
        revenue_cents: revenue,
        tip_cents: tips,
        tax_cents: taxes,
        average_sale_cents,
        average_tip_pct,
        daily: daily.into_values().collect(),
        recomputed_sales: recomputed,
    }
}

// =============================================================================
// CSV Export
// =============================================================================

/// Export header, fixed for spreadsheet consumers.
pub const CSV_HEADER: &str = "Date,Product,Category,Quantity,Unit Price,Line Total,TaxComponentA,TaxComponentB,Tip,Total,Payment Method";

/// Quotes one CSV field, doubling embedded quotes.
fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

/// Flat per-line export: one row per sold line item per sale. Sale-level
/// tax components, tip and total repeat on each of that sale's rows.
/// Monetary fields are fixed to two decimals.
pub fn export_csv(sales: &[Sale], config: &TaxConfig) -> String {
    let mut out = String::from(CSV_HEADER);
    out.push('\n');

    for sale in sales {
        let view = tax_view(sale, config);
        let payment = NormalizedPayment::from_raw(&sale.payment_method);
        let date = sale.created_at.date_naive().to_string();

        for line in &sale.lines {
            let fields = [
                date.clone(),
                line.name.clone(),
                format!("{:?}", line.category).to_lowercase(),
                line.quantity.to_string(),
                Money::from_cents(line.unit_price_cents).to_decimal_string(),
                Money::from_cents(line.line_total_cents()).to_decimal_string(),
                Money::from_cents(view.breakdown.primary_cents).to_decimal_string(),
                Money::from_cents(view.breakdown.secondary_cents).to_decimal_string(),
                Money::from_cents(sale.tip_cents).to_decimal_string(),
                Money::from_cents(sale.total_cents).to_decimal_string(),
                payment.label().to_string(),
            ];

            let row: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
            out.push_str(&row.join(","));
            out.push('\n');
        }
    }

    out
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tax::TaxRate;
    use crate::types::{MenuCategory, SaleLine};
    use chrono::{TimeZone, Utc};

    fn qc() -> TaxConfig {
        TaxConfig::new("QC", TaxRate::from_milli_percent(13_000))
    }

    fn sale(day: u32, subtotal: i64, tip: i64, breakdown: Option<TaxBreakdown>) -> Sale {
        let tax_cents = breakdown
            .as_ref()
            .map(|b| b.total_cents)
            .unwrap_or_else(|| tax::compute(Money::from_cents(subtotal), &qc()).total_cents);
        Sale {
            id: format!("s-{}-{}", day, subtotal),
            lines: vec![SaleLine {
                item_id: "r1".to_string(),
                name: "House Red (Glass (150 ml))".to_string(),
                category: MenuCategory::Wine,
                quantity: 1,
                unit_price_cents: subtotal,
                is_recipe: true,
            }],
            subtotal_cents: subtotal,
            tax_cents,
            tax_breakdown: breakdown,
            tip_cents: tip,
            total_cents: subtotal + tax_cents + tip,
            payment_method: "Visa".to_string(),
            created_at: Utc.with_ymd_and_hms(2026, 3, day, 20, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_payment_normalization() {
        assert_eq!(NormalizedPayment::from_raw("Cash"), NormalizedPayment::Cash);
        assert_eq!(NormalizedPayment::from_raw("Interac"), NormalizedPayment::Debit);
        assert_eq!(NormalizedPayment::from_raw("VISA"), NormalizedPayment::Credit);
        assert_eq!(
            NormalizedPayment::from_raw("square terminal"),
            NormalizedPayment::OtherProcessor
        );
        assert_eq!(NormalizedPayment::from_raw("barter"), NormalizedPayment::Other);
        assert_eq!(NormalizedPayment::OtherProcessor.label(), "other-processor");
    }

    #[test]
    fn test_stored_breakdown_used_verbatim() {
        let stored = TaxBreakdown {
            primary_name: "HST".to_string(),
            secondary_name: String::new(),
            primary_cents: 1300,
            secondary_cents: 0,
            total_cents: 1300,
            compound: false,
        };
        let s = sale(1, 10_000, 0, Some(stored.clone()));

        // Config says QC, but the stored ON-era breakdown wins.
        let view = tax_view(&s, &qc());
        assert!(!view.recomputed);
        assert_eq!(view.breakdown, stored);
    }

    #[test]
    fn test_recompute_round_trip() {
        // A sale priced under QC, persisted without a breakdown, then
        // re-aggregated under QC: total tax must match what was charged.
        let s = sale(1, 10_000, 0, None);
        let view = tax_view(&s, &qc());
        assert!(view.recomputed);
        assert_eq!(view.breakdown.total_cents, s.tax_cents);
        assert_eq!(view.breakdown.total_cents, 1547);
    }

    #[test]
    fn test_daily_and_overall_aggregation() {
        let sales = vec![
            sale(1, 10_000, 1732, None),
            sale(1, 2_000, 0, None),
            sale(2, 5_000, 0, None),
        ];
        let summary = aggregate(&sales, &qc());

        assert_eq!(summary.sale_count, 3);
        assert_eq!(summary.recomputed_sales, 3);
        assert_eq!(summary.daily.len(), 2);
        assert_eq!(summary.daily[0].sale_count, 2);
        assert_eq!(summary.daily[1].sale_count, 1);
        assert!(summary.daily[0].date < summary.daily[1].date);

        let expected_revenue: i64 = sales.iter().map(|s| s.total_cents).sum();
        assert_eq!(summary.revenue_cents, expected_revenue);
        assert_eq!(summary.average_sale_cents, expected_revenue / 3);

        // One tipped sale: 1732 / 11547 = 15.0%.
        assert!((summary.average_tip_pct - 15.0).abs() < 0.01);
    }

    #[test]
    fn test_empty_report() {
        let summary = aggregate(&[], &qc());
        assert_eq!(summary.sale_count, 0);
        assert_eq!(summary.average_sale_cents, 0);
        assert_eq!(summary.average_tip_pct, 0.0);
        assert!(summary.daily.is_empty());
    }

    #[test]
    fn test_csv_export_shape() {
        let csv = export_csv(&[sale(1, 10_000, 500, None)], &qc());
        let mut lines = csv.lines();

        assert_eq!(lines.next().unwrap(), CSV_HEADER);
        let row = lines.next().unwrap();
        assert_eq!(
            row,
            "\"2026-03-01\",\"House Red (Glass (150 ml))\",\"wine\",\"1\",\"100.00\",\"100.00\",\"5.00\",\"10.47\",\"5.00\",\"120.47\",\"credit\""
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_quotes_are_escaped() {
        let mut s = sale(1, 1_000, 0, None);
        s.lines[0].name = "Whisky \"Cask\" 12".to_string();
        let csv = export_csv(&[s], &qc());
        assert!(csv.contains("\"Whisky \"\"Cask\"\" 12\""));
    }
}
