//! Error handling foundation for the scholarhub client.
//!
//! This module provides only the `Result` type alias using rootcause.
//! Each crate defines its own error enum and wraps it in a `Report` where
//! the failure crosses a network boundary.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C = ()> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_alias_carries_value() {
        let ok: Result<&str> = Ok("issued");
        assert_eq!(ok.expect("should be ok"), "issued");
    }
}
