//! Shared error budget

use std::sync::atomic::{AtomicI64, Ordering};

/// What a worker should do after charging the budget
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetDecision {
    Continue,
    Exhausted,
}

/// Number of operational errors the whole scan may still absorb
///
/// A negative initial value means unlimited. The budget only ever goes
/// down; once it is zero every further charge reports exhaustion.
#[derive(Debug)]
pub struct ErrorBudget {
    remaining: AtomicI64,
}

impl ErrorBudget {
    pub fn new(initial: i64) -> Self {
        Self {
            remaining: AtomicI64::new(initial),
        }
    }

    pub fn unlimited() -> Self {
        Self::new(-1)
    }

    pub fn is_unlimited(&self) -> bool {
        self.remaining.load(Ordering::Acquire) < 0
    }

    /// Errors left, `None` when unlimited
    pub fn remaining(&self) -> Option<u64> {
        u64::try_from(self.remaining.load(Ordering::Acquire)).ok()
    }

    /// Charge one error against the budget
    pub fn consume(&self) -> BudgetDecision {
        let charged = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |left| match left {
                l if l > 0 => Some(l - 1),
                _ => None,
            });

        match charged {
            Ok(_) => BudgetDecision::Continue,
            Err(left) if left < 0 => BudgetDecision::Continue,
            Err(_) => BudgetDecision::Exhausted,
        }
    }
}

impl Default for ErrorBudget {
    fn default() -> Self {
        Self::unlimited()
    }
}
