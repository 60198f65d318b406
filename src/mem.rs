//! Fallible allocation helpers
//!
//! Every heap allocation made while creating a regulator instance passes
//! through [`check`], so tests can inject an allocation failure at the Nth
//! allocation and verify that creation unwinds without leaking state.

use crate::error::Result;

/// Charge one allocation against the test failpoint.
///
/// Returns `NoMemory` when the armed failpoint fires; a no-op otherwise.
#[cfg(test)]
pub(crate) fn check(what: &'static str) -> Result<()> {
    if failpoint::should_fail() {
        return Err(crate::error::RegulatorError::no_memory(what));
    }
    Ok(())
}

#[cfg(not(test))]
pub(crate) fn check(_what: &'static str) -> Result<()> {
    Ok(())
}

#[cfg(test)]
pub(crate) mod failpoint {
    use std::cell::Cell;

    thread_local! {
        /// Allocations remaining until the injected failure; negative =
        /// disarmed. Thread-local so concurrently running tests cannot
        /// consume each other's countdown.
        static REMAINING: Cell<i64> = Cell::new(-1);
    }

    /// Arm the trigger: the `nth` allocation on this thread fails.
    pub fn arm(nth: i64) {
        REMAINING.with(|remaining| remaining.set(nth));
    }

    pub fn disarm() {
        REMAINING.with(|remaining| remaining.set(-1));
    }

    pub fn should_fail() -> bool {
        REMAINING.with(|remaining| {
            let left = remaining.get();
            if left < 0 {
                return false;
            }
            remaining.set(left - 1);
            left == 1
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failpoint_fires_on_nth_allocation() {
        failpoint::arm(2);
        assert!(check("first").is_ok());
        assert!(check("second").is_err());
        assert!(check("third").is_ok());

        failpoint::disarm();
        assert!(check("after disarm").is_ok());
    }
}
