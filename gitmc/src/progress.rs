use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};

/// A progress update, emitted at phase boundaries and at a bounded rate
/// within long phases.
#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub step_name: String,
    pub current: usize,
    pub total: usize,
    pub message: String,
}

/// Where progress events go. The orchestrator calls this on its own task;
/// any throttling or thread marshaling is the consumer's business.
pub type ProgressSink = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Cooperative cancellation flag, checked between files and phases. A
/// write already in flight is not interrupted.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_trips_once_cancelled() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
        let clone = token.clone();
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }
}
