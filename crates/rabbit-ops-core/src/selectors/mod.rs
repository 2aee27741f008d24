//! Selectors decide which messages an operation applies to.

use crate::error::SelectorError;
use crate::message::Delivery;

mod expression;

pub use expression::ExpressionSelector;

/// Pure predicate over a message; no side effects.
#[cfg_attr(test, mockall::automock)]
pub trait Selector: Send + Sync {
    fn is_selected(&self, delivery: &Delivery) -> Result<bool, SelectorError>;
}

/// Selects every message; used when no filter is requested.
#[derive(Debug, Default)]
pub struct AlwaysSelector;

impl Selector for AlwaysSelector {
    fn is_selected(&self, _delivery: &Delivery) -> Result<bool, SelectorError> {
        Ok(true)
    }
}
