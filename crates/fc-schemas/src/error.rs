//! Domain error taxonomy.
//!
//! Every core operation fails with exactly one of these variants; the HTTP
//! layer maps them 1:1 onto response codes (404 / 400 / 400 / 403 / 409).
//! All failures are deterministic and reported synchronously — there is no
//! retry or silent recovery anywhere in the core.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Missing vendor / menu item / cart / cart line / order.
    NotFound(String),
    /// Operation not permitted in the current state (empty-cart checkout,
    /// illegal status transition).
    InvalidState(String),
    /// Caller-supplied value rejected (unknown status string, qty < 1).
    InvalidInput(String),
    /// Vendor acting outside its own order lines.
    Forbidden(String),
    /// Uniqueness violation (duplicate signup email).
    Conflict(String),
}

impl DomainError {
    /// Stable machine-readable tag for logs and response bodies.
    pub fn kind(&self) -> &'static str {
        match self {
            DomainError::NotFound(_) => "not_found",
            DomainError::InvalidState(_) => "invalid_state",
            DomainError::InvalidInput(_) => "invalid_input",
            DomainError::Forbidden(_) => "forbidden",
            DomainError::Conflict(_) => "conflict",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            DomainError::NotFound(m)
            | DomainError::InvalidState(m)
            | DomainError::InvalidInput(m)
            | DomainError::Forbidden(m)
            | DomainError::Conflict(m) => m,
        }
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.message())
    }
}

impl std::error::Error for DomainError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let e = DomainError::NotFound("Menu item not found".into());
        assert_eq!(e.to_string(), "not_found: Menu item not found");
    }

    #[test]
    fn kind_tags_are_stable() {
        assert_eq!(DomainError::Forbidden(String::new()).kind(), "forbidden");
        assert_eq!(DomainError::Conflict(String::new()).kind(), "conflict");
    }
}
