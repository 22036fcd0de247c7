//! Shutdown signal triggered by the test.

use std::sync::{Arc, Condvar, Mutex};

use crate::process::{ShutdownError, ShutdownSignal};

/// Cloneable signal; every clone observes the same trigger.
#[derive(Debug, Clone, Default)]
pub struct TestShutdownSignal {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl TestShutdownSignal {
    pub fn trigger(&self) {
        let (triggered, changed) = &*self.state;
        *triggered.lock().expect("shutdown mutex poisoned") = true;
        changed.notify_all();
    }
}

impl ShutdownSignal for TestShutdownSignal {
    fn wait(&self) -> Result<(), ShutdownError> {
        let (triggered, changed) = &*self.state;
        let guard = triggered.lock().expect("shutdown mutex poisoned");
        let _released = changed
            .wait_while(guard, |triggered| !*triggered)
            .expect("shutdown mutex poisoned");
        Ok(())
    }
}
