// src/queue.rs

//! Deterministic fluid queue shared by every capacity model.
//!
//! Work arrives, is served up to capacity, and any excess backlogs into the
//! next time-step.

use crate::types::{RecordCount, Seconds};

/// Values produced by one queue update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QueueStep {
    pub throughput: RecordCount,
    pub latency_fifo: Seconds,
    pub latency_lifo: Seconds,
    pub queue: RecordCount,
}

/// Backlog plus the age of its oldest record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FluidQueue {
    queue: RecordCount,
    worst_case_age_s: Seconds,
}

impl FluidQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.queue = 0.0;
        self.worst_case_age_s = 0.0;
    }

    pub fn len(&self) -> RecordCount {
        self.queue
    }

    pub fn is_empty(&self) -> bool {
        self.queue == 0.0
    }

    /// Seconds since the queue was last empty
    pub fn worst_case_age_s(&self) -> Seconds {
        self.worst_case_age_s
    }

    /// Advance by one time-step of `step_duration_s` seconds.
    ///
    /// `capacity` is the number of records that can be served in the step and
    /// must be positive. The FIFO latency uses the backlog found at the start of
    /// the step, so its queue term is measured in time-steps.
    pub fn advance(
        &mut self,
        incoming: RecordCount,
        capacity: RecordCount,
        base_latency_s: Seconds,
        step_duration_s: Seconds,
    ) -> QueueStep {
        let available = self.queue + incoming;
        let throughput = available.min(capacity);
        let latency_fifo = base_latency_s + self.queue / capacity;

        self.queue = (available - throughput).max(0.0);
        self.worst_case_age_s += step_duration_s;
        if self.queue == 0.0 {
            self.worst_case_age_s = 0.0;
        }

        QueueStep {
            throughput,
            latency_fifo,
            latency_lifo: base_latency_s + self.worst_case_age_s,
            queue: self.queue,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_under_capacity_never_queues() {
        let mut q = FluidQueue::new();
        for _ in 0..10 {
            let step = q.advance(50.0, 100.0, 2.0, 3600.0);
            assert_eq!(step.throughput, 50.0);
            assert_eq!(step.queue, 0.0);
            assert_eq!(step.latency_fifo, 2.0);
            assert_eq!(step.latency_lifo, 2.0);
        }
        assert!(q.is_empty());
    }

    #[test]
    fn test_backlog_then_drain() {
        let mut q = FluidQueue::new();

        let s1 = q.advance(150.0, 100.0, 1.0, 3600.0);
        assert_eq!(s1.throughput, 100.0);
        assert_eq!(s1.queue, 50.0);
        assert_eq!(s1.latency_fifo, 1.0);
        assert_eq!(s1.latency_lifo, 3601.0);

        let s2 = q.advance(80.0, 100.0, 1.0, 3600.0);
        assert_eq!(s2.throughput, 100.0);
        assert_eq!(s2.queue, 30.0);
        // 50 queued records at 100 per step
        assert_eq!(s2.latency_fifo, 1.5);
        assert_eq!(s2.latency_lifo, 7201.0);

        let s3 = q.advance(0.0, 100.0, 1.0, 3600.0);
        assert_eq!(s3.throughput, 30.0);
        assert_eq!(s3.queue, 0.0);
        assert_eq!(s3.latency_lifo, 1.0);
        assert_eq!(q.worst_case_age_s(), 0.0);
    }

    #[test]
    fn test_reset_clears_state() {
        let mut q = FluidQueue::new();
        q.advance(500.0, 100.0, 0.0, 1.0);
        assert!(!q.is_empty());
        q.reset();
        assert_eq!(q, FluidQueue::new());
    }
}
