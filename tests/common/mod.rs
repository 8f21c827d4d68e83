#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use simkernel::core::{named, Process, ProcessTarget};
use simkernel::SimError;

/// Общий журнал, в который процессы пишут, что и когда сделали
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

/// Процесс, который только отмечается в журнале как `label@tick`
pub fn recorder(log: &Log, label: &str) -> impl ProcessTarget {
    let log = log.clone();
    let label = label.to_string();
    named(label.clone(), move |p: Process| async move {
        log.push(format!("{}@{}", label, p.current_tick()));
        Ok::<(), SimError>(())
    })
}
