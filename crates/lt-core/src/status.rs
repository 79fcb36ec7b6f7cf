//! Repayment status of a persisted allocation line.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How much of an allocated share has been paid back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AllocationPaymentStatus {
    Unpaid,
    PartiallyPaid,
    Paid,
}

impl AllocationPaymentStatus {
    /// Derives the status from what was allocated and what has been paid.
    ///
    /// A settled expense counts every share as paid regardless of payments.
    pub fn compute(allocated: Decimal, paid: Decimal, settled: bool) -> Self {
        if settled {
            return Self::Paid;
        }
        if paid <= Decimal::ZERO {
            Self::Unpaid
        } else if paid >= allocated {
            Self::Paid
        } else {
            Self::PartiallyPaid
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "UNPAID",
            Self::PartiallyPaid => "PARTIALLY_PAID",
            Self::Paid => "PAID",
        }
    }
}

impl fmt::Display for AllocationPaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
