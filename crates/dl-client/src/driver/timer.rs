//! Tokio-backed retry timer

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use dl_core::traits::{Scheduler, TimerHandle};

use super::DriverEvent;

/// Arms retry timers as sleeping tasks that post
/// [`DriverEvent::RetryElapsed`] into the driver's queue.
///
/// Each timer gets a fresh generation number so an expiry that was already
/// queued when its timer got cancelled can be told apart from the live one.
pub struct TokioScheduler {
    events: mpsc::UnboundedSender<DriverEvent>,
    next_generation: u64,
}

impl TokioScheduler {
    pub fn new(events: mpsc::UnboundedSender<DriverEvent>) -> Self {
        Self {
            events,
            next_generation: 0,
        }
    }
}

impl Scheduler for TokioScheduler {
    type Timer = RetryTimer;

    fn schedule(&mut self, delay: Duration) -> RetryTimer {
        self.next_generation += 1;
        let generation = self.next_generation;
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(DriverEvent::RetryElapsed { generation }).is_err() {
                tracing::trace!("Driver gone before retry timer fired");
            }
        });
        RetryTimer { task, generation }
    }
}

/// An armed retry timer; aborted when cancelled or dropped
pub struct RetryTimer {
    task: JoinHandle<()>,
    generation: u64,
}

impl RetryTimer {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl TimerHandle for RetryTimer {
    fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for RetryTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
