// src/scaling.rs

//! Hysteresis scaling controller used by the autoscaling models.
//!
//! The controller keeps two bounded windows of recent throughput. Scaling up
//! needs the up-window mean above `up_pct_trigger` percent of current capacity
//! for at least `up_delay` steps since the last action; scaling down needs the
//! down-window mean below `down_pct_trigger` percent for `down_delay` steps.
//! At most one action per step, up first, never below one unit.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::types::{RecordCount, ScaleDirection};

/// Fixed-capacity window over the most recent samples
#[derive(Debug, Clone, PartialEq)]
pub struct TrailingWindow {
    samples: VecDeque<f64>,
    capacity: usize,
    sum: f64,
    pushes_since_resum: usize,
}

impl TrailingWindow {
    /// `capacity` is clamped to at least one sample
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            sum: 0.0,
            pushes_since_resum: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
        self.sum = 0.0;
        self.pushes_since_resum = 0;
    }

    /// Append a sample, dropping the oldest one when full
    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == self.capacity {
            if let Some(oldest) = self.samples.pop_front() {
                self.sum -= oldest;
            }
        }
        self.samples.push_back(sample);
        self.sum += sample;

        // Exact re-sum once per full turn bounds float drift
        self.pushes_since_resum += 1;
        if self.pushes_since_resum >= self.capacity {
            self.sum = self.samples.iter().sum();
            self.pushes_since_resum = 0;
        }
    }

    pub fn mean(&self) -> Option<f64> {
        if self.samples.is_empty() {
            None
        } else {
            Some(self.sum / self.samples.len() as f64)
        }
    }
}

/// Trigger thresholds and delays, in time-steps of the owning model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScalingRule {
    pub up_pct_trigger: f64,
    pub up_delay: u32,
    pub down_pct_trigger: f64,
    pub down_delay: u32,
}

/// Scaling state machine over `(numproc, time_since_last_scale)`
#[derive(Debug, Clone)]
pub struct HysteresisScaler {
    rule: ScalingRule,
    up_window: TrailingWindow,
    down_window: TrailingWindow,
    numproc: u32,
    time_since_last_scale: u64,
}

impl HysteresisScaler {
    pub fn new(rule: ScalingRule) -> Self {
        Self {
            rule,
            up_window: TrailingWindow::new(rule.up_delay as usize),
            down_window: TrailingWindow::new(rule.down_delay as usize),
            numproc: 1,
            time_since_last_scale: 0,
        }
    }

    pub fn reset(&mut self) {
        self.up_window.clear();
        self.down_window.clear();
        self.numproc = 1;
        self.time_since_last_scale = 0;
    }

    pub fn rule(&self) -> &ScalingRule {
        &self.rule
    }

    pub fn numproc(&self) -> u32 {
        self.numproc
    }

    pub fn time_since_last_scale(&self) -> u64 {
        self.time_since_last_scale
    }

    /// Record this step's throughput and apply at most one scaling action.
    ///
    /// `unit_capacity` is what a single processing unit serves per step.
    pub fn observe(&mut self, throughput: RecordCount, unit_capacity: RecordCount) -> ScaleDirection {
        self.up_window.push(throughput);
        self.down_window.push(throughput);
        self.time_since_last_scale += 1;

        let capacity = unit_capacity * self.numproc as f64;
        let up_mean = self.up_window.mean().unwrap_or(0.0);
        let down_mean = self.down_window.mean().unwrap_or(0.0);

        if self.time_since_last_scale >= u64::from(self.rule.up_delay)
            && up_mean > capacity * self.rule.up_pct_trigger / 100.0
        {
            self.numproc = self.numproc.saturating_add(1);
            self.time_since_last_scale = 0;
            ScaleDirection::Up
        } else if self.time_since_last_scale >= u64::from(self.rule.down_delay)
            && down_mean < capacity * self.rule.down_pct_trigger / 100.0
            && self.numproc > 1
        {
            self.numproc -= 1;
            self.time_since_last_scale = 0;
            ScaleDirection::Down
        } else {
            ScaleDirection::Maintain
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(up_delay: u32, down_delay: u32) -> ScalingRule {
        ScalingRule {
            up_pct_trigger: 80.0,
            up_delay,
            down_pct_trigger: 20.0,
            down_delay,
        }
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut w = TrailingWindow::new(3);
        assert_eq!(w.mean(), None);
        for v in [1.0, 2.0, 3.0, 4.0] {
            w.push(v);
        }
        assert_eq!(w.len(), 3);
        assert_eq!(w.mean(), Some(3.0));
    }

    #[test]
    fn test_window_resum_keeps_exact_mean() {
        let mut w = TrailingWindow::new(4);
        for i in 0..10_000 {
            w.push(0.1 * (i % 7) as f64);
        }
        let expected: f64 = [9996, 9997, 9998, 9999]
            .iter()
            .map(|i| 0.1 * (i % 7) as f64)
            .sum::<f64>()
            / 4.0;
        assert!((w.mean().unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_up_needs_full_delay() {
        let mut s = HysteresisScaler::new(rule(3, 3));
        // 90% of capacity for two steps, then nothing
        assert_eq!(s.observe(90.0, 100.0), ScaleDirection::Maintain);
        assert_eq!(s.observe(90.0, 100.0), ScaleDirection::Maintain);
        assert_eq!(s.observe(0.0, 100.0), ScaleDirection::Maintain);
        assert_eq!(s.numproc(), 1);

        let mut s = HysteresisScaler::new(rule(3, 3));
        s.observe(90.0, 100.0);
        s.observe(90.0, 100.0);
        assert_eq!(s.observe(90.0, 100.0), ScaleDirection::Up);
        assert_eq!(s.numproc(), 2);
        assert_eq!(s.time_since_last_scale(), 0);
    }

    #[test]
    fn test_down_after_delay_and_floor() {
        let mut s = HysteresisScaler::new(rule(1, 2));
        assert_eq!(s.observe(100.0, 100.0), ScaleDirection::Up);
        assert_eq!(s.observe(0.0, 100.0), ScaleDirection::Maintain);
        assert_eq!(s.observe(0.0, 100.0), ScaleDirection::Down);
        assert_eq!(s.numproc(), 1);
        for _ in 0..20 {
            s.observe(0.0, 100.0);
        }
        assert_eq!(s.numproc(), 1);
    }

    #[test]
    fn test_up_wins_when_both_trigger() {
        let crossed = ScalingRule {
            up_pct_trigger: 10.0,
            up_delay: 1,
            down_pct_trigger: 90.0,
            down_delay: 1,
        };
        let mut s = HysteresisScaler::new(crossed);
        s.observe(100.0, 100.0);
        assert_eq!(s.numproc(), 2);
        // 50 is above 10% of 200 and below 90% of 200
        assert_eq!(s.observe(50.0, 100.0), ScaleDirection::Up);
        assert_eq!(s.numproc(), 3);
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let mut s = HysteresisScaler::new(rule(1, 1));
        s.observe(100.0, 100.0);
        s.reset();
        assert_eq!(s.numproc(), 1);
        assert_eq!(s.time_since_last_scale(), 0);
    }
}
