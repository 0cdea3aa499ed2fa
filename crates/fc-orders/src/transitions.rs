//! Order status transition table.
//!
//! The lifecycle is a forward chain with a cancel escape hatch:
//!
//! ```text
//! created → paid → preparing → ready → completed
//!    │        │        │         │
//!    └────────┴────────┴─────────┴──→ cancelled
//! ```
//!
//! `completed` and `cancelled` are terminal.  Re-asserting the current
//! status is an idempotent no-op (vendors double-tap buttons); everything
//! else is rejected.

use fc_schemas::{DomainError, OrderStatus};

/// Outcome of checking a requested transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Requested status equals the current one; nothing to write.
    Noop,
    /// Legal move; write the new status.
    Advance,
}

/// Validate `from → to` against the table.
///
/// # Errors
/// `InvalidState` for any move the table does not allow.
pub fn check(from: OrderStatus, to: OrderStatus) -> Result<Transition, DomainError> {
    use OrderStatus::*;

    if from == to {
        return Ok(Transition::Noop);
    }

    let allowed = matches!(
        (from, to),
        (Created, Paid)
            | (Paid, Preparing)
            | (Preparing, Ready)
            | (Ready, Completed)
            | (Created | Paid | Preparing | Ready, Cancelled)
    );

    if allowed {
        Ok(Transition::Advance)
    } else {
        Err(DomainError::InvalidState(format!(
            "cannot move order from '{}' to '{}'",
            from.as_str(),
            to.as_str()
        )))
    }
}
