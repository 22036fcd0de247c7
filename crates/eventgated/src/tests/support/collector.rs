//! Collector double completing batches on demand.

use std::sync::Mutex;

use crate::collector::{CollectError, CollectRequest, Collector};
use crate::gateway::Acknowledger;

/// How the collector completes batches it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Acknowledge immediately with this outcome.
    Immediate(Result<(), CollectError>),
    /// Fail the next batch with this error, then acknowledge successfully.
    FailOnce(CollectError),
    /// Keep the acknowledger until the test releases it.
    Held,
}

#[derive(Debug)]
pub struct RecordingCollector {
    completion: Mutex<Completion>,
    collected: Mutex<Vec<String>>,
    held: Mutex<Vec<(String, Acknowledger)>>,
}

impl Default for RecordingCollector {
    fn default() -> Self {
        Self {
            completion: Mutex::new(Completion::Immediate(Ok(()))),
            collected: Mutex::new(Vec::new()),
            held: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingCollector {
    pub fn complete_with(&self, completion: Completion) {
        *self.completion.lock().expect("completion mutex poisoned") = completion;
    }

    /// Request ids collected so far, in order.
    pub fn collected(&self) -> Vec<String> {
        self.collected
            .lock()
            .expect("collected mutex poisoned")
            .clone()
    }

    /// Acknowledges the held batch for `req_guid`.
    pub fn release(&self, req_guid: &str, outcome: Result<(), CollectError>) -> bool {
        let mut held = self.held.lock().expect("held mutex poisoned");
        let Some(position) = held.iter().position(|(guid, _)| guid == req_guid) else {
            return false;
        };
        let (_, acknowledger) = held.remove(position);
        drop(held);
        acknowledger.ack(outcome);
        true
    }
}

impl Collector for RecordingCollector {
    fn collect(&self, request: CollectRequest) {
        let req_guid = request.request.req_guid.clone();
        self.collected
            .lock()
            .expect("collected mutex poisoned")
            .push(req_guid.clone());
        let completion = {
            let mut current = self.completion.lock().expect("completion mutex poisoned");
            let next = current.clone();
            if matches!(next, Completion::FailOnce(_)) {
                *current = Completion::Immediate(Ok(()));
            }
            next
        };
        match completion {
            Completion::Immediate(outcome) => request.acknowledger.ack(outcome),
            Completion::FailOnce(error) => request.acknowledger.ack(Err(error)),
            Completion::Held => self
                .held
                .lock()
                .expect("held mutex poisoned")
                .push((req_guid, request.acknowledger)),
        }
    }
}
