//! Storage-independent billing rules: the invoice total engine and the
//! invoice status state machine.

pub mod status;
pub mod totals;

pub use status::{ensure_transition, items_mutable, payments_allowed};
pub use totals::{balance_due, compute_totals, line_amounts, round2, InvoiceTotals, LineAmounts, LineInput};
