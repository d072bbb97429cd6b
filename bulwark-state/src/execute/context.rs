//! Execution context for module operations.

use bulwark_core::Address;

/// Execution context carrying the caller and the current time.
///
/// Every operation receives one. Timestamps are assumed non-decreasing
/// across calls.
#[derive(Clone, Debug)]
pub struct ExecutionContext {
    /// Account invoking the operation.
    pub caller: Address,

    /// Current timestamp (unix seconds).
    pub timestamp: u64,
}

impl ExecutionContext {
    /// Create a new execution context.
    pub fn new(caller: Address, timestamp: u64) -> Self {
        Self { caller, timestamp }
    }

    /// Same caller at a later time.
    pub fn at(&self, timestamp: u64) -> Self {
        Self {
            caller: self.caller,
            timestamp,
        }
    }

    /// Create an execution context for testing with minimal values.
    #[cfg(test)]
    pub fn test_context() -> Self {
        Self {
            caller: [1u8; 20],
            timestamp: 1_700_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_context_new() {
        let ctx = ExecutionContext::new([5u8; 20], 1_700_000_000);
        assert_eq!(ctx.caller, [5u8; 20]);
        assert_eq!(ctx.timestamp, 1_700_000_000);
    }

    #[test]
    fn test_execution_context_at() {
        let ctx = ExecutionContext::test_context();
        let later = ctx.at(ctx.timestamp + 60);
        assert_eq!(later.caller, ctx.caller);
        assert_eq!(later.timestamp, 1_700_000_060);
    }
}
