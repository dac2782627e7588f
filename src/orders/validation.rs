//! Checkout validation.

use std::fmt;

use thiserror::Error;

use crate::{ids::VariantId, orders::CheckoutRequest};

/// What is wrong with a checkout line.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineProblem {
    /// The line has no variant identifier.
    #[error("missing variant")]
    MissingVariant,

    /// The quantity is zero or negative.
    #[error("quantity must be positive, got {0}")]
    NonPositiveQuantity(i64),
}

/// A single reason a checkout request cannot be submitted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderValidationError {
    /// No delivery address was selected.
    #[error("select a delivery address")]
    MissingAddress,

    /// There is nothing to order.
    #[error("your cart is empty")]
    EmptyCart,

    /// A line cannot be ordered.
    #[error("item {} ({variant_id}): {problem}", .index + 1)]
    InvalidLine {
        /// Zero-based line position.
        index: usize,
        /// Variant as submitted, possibly blank.
        variant_id: VariantId,
        /// What is wrong with it.
        problem: LineProblem,
    },
}

/// Every validation failure of a checkout request. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(pub(super) Vec<OrderValidationError>);

impl ValidationErrors {
    /// Individual failures in the order they were found.
    pub fn errors(&self) -> &[OrderValidationError] {
        &self.0
    }

    /// Number of failures.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no failures.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether a failure is present.
    pub fn contains(&self, error: &OrderValidationError) -> bool {
        self.0.contains(error)
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, error) in self.0.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }

            write!(f, "- {error}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a OrderValidationError;
    type IntoIter = std::slice::Iter<'a, OrderValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Check a checkout request before anything is sent.
///
/// Every failure is collected rather than stopping at the first one.
///
/// # Errors
///
/// Returns [`ValidationErrors`] listing each problem found.
pub fn validate(request: &CheckoutRequest<'_>) -> Result<(), ValidationErrors> {
    let mut errors = Vec::new();

    if request.address_id.as_ref().is_none_or(|id| id.is_blank()) {
        errors.push(OrderValidationError::MissingAddress);
    }

    if request.lines.is_empty() {
        errors.push(OrderValidationError::EmptyCart);
    }

    for (index, line) in request.lines.iter().enumerate() {
        if line.variant_id.is_blank() {
            errors.push(OrderValidationError::InvalidLine {
                index,
                variant_id: line.variant_id.clone(),
                problem: LineProblem::MissingVariant,
            });
        }

        if line.quantity <= 0 {
            errors.push(OrderValidationError::InvalidLine {
                index,
                variant_id: line.variant_id.clone(),
                problem: LineProblem::NonPositiveQuantity(line.quantity),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ValidationErrors(errors))
    }
}

#[cfg(test)]
mod tests {
    use rusty_money::{Money, iso::GBP};
    use testresult::TestResult;

    use crate::{ids::AddressId, orders::CheckoutLine};

    use super::*;

    fn line(id: &str, quantity: i64) -> CheckoutLine<'static> {
        CheckoutLine {
            variant_id: VariantId::new(id),
            quantity,
            price: Money::from_minor(10_00, GBP),
        }
    }

    #[test]
    fn valid_request_passes() {
        let request = CheckoutRequest {
            address_id: Some(AddressId::new("home")),
            lines: vec![line("tee", 1)],
            ..CheckoutRequest::default()
        };

        assert_eq!(validate(&request), Ok(()));
    }

    #[test]
    fn all_problems_are_reported_together() -> TestResult {
        let request = CheckoutRequest {
            address_id: Some(AddressId::new("  ")),
            lines: vec![line("tee", 1), line("", 0), line("mug", -2)],
            ..CheckoutRequest::default()
        };

        let errors = validate(&request).err().ok_or("expected validation errors")?;

        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&OrderValidationError::MissingAddress));
        assert!(errors.contains(&OrderValidationError::InvalidLine {
            index: 1,
            variant_id: VariantId::new(""),
            problem: LineProblem::MissingVariant,
        }));
        assert!(errors.contains(&OrderValidationError::InvalidLine {
            index: 2,
            variant_id: VariantId::new("mug"),
            problem: LineProblem::NonPositiveQuantity(-2),
        }));

        Ok(())
    }

    #[test]
    fn empty_cart_without_address() {
        let errors = validate(&CheckoutRequest::default()).err();

        assert_eq!(
            errors.as_ref().map(ValidationErrors::errors),
            Some(
                [
                    OrderValidationError::MissingAddress,
                    OrderValidationError::EmptyCart
                ]
                .as_slice()
            )
        );
    }

    #[test]
    fn errors_render_one_per_line() {
        let request = CheckoutRequest {
            address_id: Some(AddressId::new("home")),
            lines: vec![line("tee", 0)],
            ..CheckoutRequest::default()
        };

        let message = validate(&request).err().map(|errors| errors.to_string());

        assert_eq!(
            message.as_deref(),
            Some("- item 1 (tee): quantity must be positive, got 0")
        );
    }
}
