//! Per-invocation log context
//!
//! Components do not log under a fixed global tag. Each one is handed a
//! `LogTag` when it is built and passes `tag.target()` to the `log` macros,
//! so every line from one batch can be filtered with `RUST_LOG`.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Default log target for the reader
pub const DEFAULT_TARGET: &str = "msgreader";

static NEXT_INVOCATION: AtomicU64 = AtomicU64::new(1);

/// Log target plus the id of the invocation being processed
#[derive(Debug, Clone)]
pub struct LogTag {
    target: Arc<str>,
    invocation: u64,
}

impl LogTag {
    pub fn new(target: &str) -> Self {
        Self {
            target: Arc::from(target),
            invocation: 0,
        }
    }

    /// Same target, fresh invocation id
    pub fn for_invocation(&self) -> Self {
        Self {
            target: Arc::clone(&self.target),
            invocation: NEXT_INVOCATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn invocation(&self) -> u64 {
        self.invocation
    }
}

impl Default for LogTag {
    fn default() -> Self {
        Self::new(DEFAULT_TARGET)
    }
}

impl fmt::Display for LogTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.invocation)
    }
}
