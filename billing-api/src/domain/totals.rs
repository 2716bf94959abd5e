//! Invoice total engine.
//!
//! All arithmetic is fixed-point (`rust_decimal`); currency values are
//! rounded half-up to two decimals at the line-item level, before
//! aggregation. The pinned order of operations:
//!
//! 1. `line_base = round2(quantity * rate * (1 - discount%/100))`
//! 2. `line_tax  = round2(line_base * tax%/100)` (tax on the rounded base)
//! 3. `line_amount = line_base + line_tax`
//! 4. `subtotal = sum(line_base)`, `tax_total = sum(line_tax)`
//! 5. intra-state: `cgst = round2(tax_total/2)`, `sgst = tax_total - cgst`;
//!    inter-state: `igst = tax_total`
//! 6. `tds = round2(subtotal * tds%/100)`
//! 7. `total = subtotal + cgst + sgst + igst - tds - discount_total`
//!
//! Aggregates therefore sum already-rounded cents and the total identity
//! holds exactly after every recomputation.

use crate::models::Jurisdiction;
use rust_decimal::{Decimal, RoundingStrategy};
use service_core::error::AppError;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TotalsError {
    #[error("quantity must be non-negative")]
    NegativeQuantity,
    #[error("rate must be non-negative")]
    NegativeRate,
    #[error("tax_percent must be between 0 and 100")]
    TaxPercentOutOfRange,
    #[error("discount_percent must be between 0 and 100")]
    DiscountPercentOutOfRange,
    #[error("tds_percent must be between 0 and 100")]
    TdsPercentOutOfRange,
    #[error("discount_total must be non-negative")]
    NegativeDiscountTotal,
}

impl From<TotalsError> for AppError {
    fn from(err: TotalsError) -> Self {
        AppError::BadRequest(anyhow::anyhow!(err))
    }
}

/// One line as the engine sees it.
#[derive(Debug, Clone)]
pub struct LineInput {
    pub quantity: i32,
    pub rate: Decimal,
    pub tax_percent: Decimal,
    pub discount_percent: Decimal,
}

/// Derived amounts for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineAmounts {
    /// Pre-tax, post-discount base.
    pub base: Decimal,
    /// Tax on the rounded base.
    pub tax: Decimal,
    /// `base + tax`, the stored line amount.
    pub amount: Decimal,
}

/// Aggregate monetary fields of an invoice, before payments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub tds: Decimal,
    pub discount_total: Decimal,
    pub total: Decimal,
}

/// Round half-up (midpoint away from zero) to currency precision.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent(value: Decimal) -> Decimal {
    value / Decimal::ONE_HUNDRED
}

fn validate_percent(value: Decimal, err: TotalsError) -> Result<(), TotalsError> {
    if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
        return Err(err);
    }
    Ok(())
}

/// Compute the derived amounts for a single line.
pub fn line_amounts(line: &LineInput) -> Result<LineAmounts, TotalsError> {
    if line.quantity < 0 {
        return Err(TotalsError::NegativeQuantity);
    }
    if line.rate < Decimal::ZERO {
        return Err(TotalsError::NegativeRate);
    }
    validate_percent(line.tax_percent, TotalsError::TaxPercentOutOfRange)?;
    validate_percent(line.discount_percent, TotalsError::DiscountPercentOutOfRange)?;

    let gross = Decimal::from(line.quantity) * line.rate;
    let base = round2(gross * (Decimal::ONE - percent(line.discount_percent)));
    let tax = round2(base * percent(line.tax_percent));

    Ok(LineAmounts {
        base,
        tax,
        amount: base + tax,
    })
}

/// Compute invoice aggregates from its ordered line list and overrides.
pub fn compute_totals(
    lines: &[LineInput],
    jurisdiction: Jurisdiction,
    tds_percent: Option<Decimal>,
    discount_total: Decimal,
) -> Result<InvoiceTotals, TotalsError> {
    if discount_total < Decimal::ZERO {
        return Err(TotalsError::NegativeDiscountTotal);
    }
    if let Some(tds) = tds_percent {
        validate_percent(tds, TotalsError::TdsPercentOutOfRange)?;
    }

    let mut subtotal = Decimal::ZERO;
    let mut tax_total = Decimal::ZERO;
    for line in lines {
        let amounts = line_amounts(line)?;
        subtotal += amounts.base;
        tax_total += amounts.tax;
    }

    let (cgst, sgst, igst) = match jurisdiction {
        Jurisdiction::IntraState => {
            // Odd cents land on CGST so the pair always reconciles.
            let cgst = round2(tax_total / Decimal::TWO);
            (cgst, tax_total - cgst, Decimal::ZERO)
        }
        Jurisdiction::InterState => (Decimal::ZERO, Decimal::ZERO, tax_total),
    };

    let tds = match tds_percent {
        Some(pct) => round2(subtotal * percent(pct)),
        None => Decimal::ZERO,
    };

    let total = subtotal + cgst + sgst + igst - tds - discount_total;

    Ok(InvoiceTotals {
        subtotal,
        cgst,
        sgst,
        igst,
        tds,
        discount_total,
        total,
    })
}

/// Outstanding amount after payments. Overpayment is representable: the
/// result goes negative, it is never clamped.
pub fn balance_due(total: Decimal, payments: &[Decimal]) -> Decimal {
    total - payments.iter().copied().sum::<Decimal>()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("valid decimal literal")
    }

    fn line(quantity: i32, rate: &str, tax: &str, discount: &str) -> LineInput {
        LineInput {
            quantity,
            rate: dec(rate),
            tax_percent: dec(tax),
            discount_percent: dec(discount),
        }
    }

    #[test]
    fn line_amount_applies_discount_then_tax() {
        // qty=2, rate=500.00, tax=18%, discount=10% -> 2*500*0.90*1.18 = 1062.00
        let amounts = line_amounts(&line(2, "500.00", "18", "10")).unwrap();
        assert_eq!(amounts.base, dec("900.00"));
        assert_eq!(amounts.tax, dec("162.00"));
        assert_eq!(amounts.amount, dec("1062.00"));
    }

    #[test]
    fn line_amount_rounds_half_up_at_line_level() {
        // 3 * 9.99 * (1 - 0.125) = 26.223... -> base 26.22, tax on rounded base
        let amounts = line_amounts(&line(3, "9.99", "5", "12.5")).unwrap();
        assert_eq!(amounts.base, dec("26.22"));
        assert_eq!(amounts.tax, dec("1.31")); // 26.22 * 0.05 = 1.311
        assert_eq!(amounts.amount, dec("27.53"));
    }

    #[test]
    fn zero_quantity_line_is_free() {
        let amounts = line_amounts(&line(0, "500.00", "18", "0")).unwrap();
        assert_eq!(amounts.amount, Decimal::ZERO);
    }

    #[test]
    fn line_validation_rejects_out_of_range_fields() {
        assert_eq!(
            line_amounts(&line(-1, "10.00", "0", "0")),
            Err(TotalsError::NegativeQuantity)
        );
        assert_eq!(
            line_amounts(&line(1, "-10.00", "0", "0")),
            Err(TotalsError::NegativeRate)
        );
        assert_eq!(
            line_amounts(&line(1, "10.00", "101", "0")),
            Err(TotalsError::TaxPercentOutOfRange)
        );
        assert_eq!(
            line_amounts(&line(1, "10.00", "0", "-1")),
            Err(TotalsError::DiscountPercentOutOfRange)
        );
    }

    #[test]
    fn intra_state_invoice_splits_tax_and_deducts_tds() {
        // Two identical lines of 1062.00 each (base 900.00, tax 162.00),
        // tds 5% of the 1800.00 subtotal = 90.00.
        let lines = vec![
            line(2, "500.00", "18", "10"),
            line(2, "500.00", "18", "10"),
        ];
        let totals = compute_totals(
            &lines,
            Jurisdiction::IntraState,
            Some(dec("5")),
            Decimal::ZERO,
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec("1800.00"));
        assert_eq!(totals.cgst, dec("162.00"));
        assert_eq!(totals.sgst, dec("162.00"));
        assert_eq!(totals.igst, Decimal::ZERO);
        assert_eq!(totals.tds, dec("90.00"));
        assert_eq!(totals.total, dec("2034.00"));
    }

    #[test]
    fn inter_state_invoice_charges_full_igst() {
        let lines = vec![line(2, "500.00", "18", "10")];
        let totals =
            compute_totals(&lines, Jurisdiction::InterState, None, Decimal::ZERO).unwrap();

        assert_eq!(totals.subtotal, dec("900.00"));
        assert_eq!(totals.cgst, Decimal::ZERO);
        assert_eq!(totals.sgst, Decimal::ZERO);
        assert_eq!(totals.igst, dec("162.00"));
        assert_eq!(totals.total, dec("1062.00"));
    }

    #[test]
    fn odd_cent_tax_split_reconciles() {
        // base 1.50, tax 10% -> 0.15, which cannot split evenly.
        let lines = vec![line(1, "1.50", "10", "0")];
        let totals =
            compute_totals(&lines, Jurisdiction::IntraState, None, Decimal::ZERO).unwrap();

        assert_eq!(totals.cgst, dec("0.08"));
        assert_eq!(totals.sgst, dec("0.07"));
        assert_eq!(totals.cgst + totals.sgst, dec("0.15"));
    }

    #[test]
    fn total_identity_holds() {
        let lines = vec![
            line(3, "19.99", "18", "0"),
            line(1, "250.00", "12", "7.5"),
            line(10, "3.33", "5", "2"),
        ];
        let totals = compute_totals(
            &lines,
            Jurisdiction::IntraState,
            Some(dec("2")),
            dec("10.00"),
        )
        .unwrap();

        assert_eq!(
            totals.total,
            totals.subtotal + totals.cgst + totals.sgst + totals.igst
                - totals.tds
                - totals.discount_total
        );
    }

    #[test]
    fn empty_invoice_totals_are_zero() {
        let totals =
            compute_totals(&[], Jurisdiction::IntraState, None, Decimal::ZERO).unwrap();
        assert_eq!(totals.subtotal, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn compute_rejects_bad_overrides() {
        assert_eq!(
            compute_totals(&[], Jurisdiction::IntraState, Some(dec("120")), Decimal::ZERO),
            Err(TotalsError::TdsPercentOutOfRange)
        );
        assert_eq!(
            compute_totals(&[], Jurisdiction::IntraState, None, dec("-1")),
            Err(TotalsError::NegativeDiscountTotal)
        );
    }

    #[test]
    fn balance_due_subtracts_payments() {
        assert_eq!(
            balance_due(dec("2034.00"), &[dec("1000.00")]),
            dec("1034.00")
        );
    }

    #[test]
    fn removing_a_payment_restores_prior_balance() {
        let total = dec("2034.00");
        let before = balance_due(total, &[dec("1000.00")]);
        let with_extra = balance_due(total, &[dec("1000.00"), dec("500.00")]);
        assert_eq!(with_extra, dec("534.00"));
        assert_eq!(balance_due(total, &[dec("1000.00")]), before);
    }

    #[test]
    fn overpayment_goes_negative_not_clamped() {
        assert_eq!(
            balance_due(dec("100.00"), &[dec("150.00")]),
            dec("-50.00")
        );
    }
}
