//! Invoice status state machine.
//!
//! draft -> finalized, draft -> cancelled, finalized -> cancelled.
//! Cancelled is terminal; finalized only moves forward to cancelled.

use crate::models::InvoiceStatus;
use service_core::error::AppError;

/// Check that `from -> to` is an allowed transition.
pub fn ensure_transition(from: InvoiceStatus, to: InvoiceStatus) -> Result<(), AppError> {
    use InvoiceStatus::*;
    match (from, to) {
        (Draft, Finalized) | (Draft, Cancelled) | (Finalized, Cancelled) => Ok(()),
        _ => Err(AppError::InvalidStateTransition(anyhow::anyhow!(
            "cannot transition invoice from {} to {}",
            from.as_str(),
            to.as_str()
        ))),
    }
}

/// Line items and financial fields may only change while drafting.
pub fn items_mutable(status: InvoiceStatus) -> bool {
    status == InvoiceStatus::Draft
}

/// Payments are recorded against finalized invoices only: drafts have no
/// receivable and cancelled invoices are closed.
pub fn payments_allowed(status: InvoiceStatus) -> bool {
    status == InvoiceStatus::Finalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use InvoiceStatus::*;

    #[test]
    fn allowed_transitions() {
        assert!(ensure_transition(Draft, Finalized).is_ok());
        assert!(ensure_transition(Draft, Cancelled).is_ok());
        assert!(ensure_transition(Finalized, Cancelled).is_ok());
    }

    #[test]
    fn finalized_cannot_return_to_draft() {
        let err = ensure_transition(Finalized, Draft).unwrap_err();
        assert!(matches!(err, AppError::InvalidStateTransition(_)));
    }

    #[test]
    fn cancelled_is_terminal() {
        for to in [Draft, Finalized, Cancelled] {
            let err = ensure_transition(Cancelled, to).unwrap_err();
            assert!(matches!(err, AppError::InvalidStateTransition(_)));
        }
    }

    #[test]
    fn self_transitions_are_rejected() {
        assert!(ensure_transition(Draft, Draft).is_err());
        assert!(ensure_transition(Finalized, Finalized).is_err());
    }

    #[test]
    fn mutation_gates_follow_status() {
        assert!(items_mutable(Draft));
        assert!(!items_mutable(Finalized));
        assert!(!items_mutable(Cancelled));

        assert!(payments_allowed(Finalized));
        assert!(!payments_allowed(Draft));
        assert!(!payments_allowed(Cancelled));
    }
}
