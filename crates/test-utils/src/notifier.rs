use std::sync::{Arc, Mutex};

use devloop::notifier::Notifier;

/// Records every pid it is told about. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    pids: Arc<Mutex<Vec<u32>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.pids.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<u32> {
        self.pids.lock().unwrap().last().copied()
    }
}

impl Notifier for RecordingNotifier {
    fn process_started(&self, pid: u32) {
        self.pids.lock().unwrap().push(pid);
    }
}
