// src/callbacks.rs

use std::sync::Arc;

use crate::types::{ResultSeries, ScaleEvent, TimeIndex};

/// Context shared with observers for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    /// Label of the run (simulation name, or the model type when unnamed)
    pub run_name: String,
    /// Model type discriminant
    pub model_type: &'static str,
    /// Number of hours the run will simulate
    pub total_steps: usize,
}

/// Trait for receiving simulation progress and scaling events
///
/// Implement this to get notified while a run is in progress.
/// Useful for progress bars, collecting scaling histories, or alerting.
/// Calls happen on the thread executing the run, between two time-steps.
#[cfg_attr(test, mockall::automock)]
pub trait SimulationObserver: Send + Sync {
    /// Called once before the first time-step
    fn on_run_started(&self, _context: &RunContext) {
        // Default implementation: do nothing
    }

    /// Called at the first hour of every calendar month in the horizon
    fn on_month_started(&self, _context: &RunContext, _index: &TimeIndex) {
        // Default implementation: do nothing
    }

    /// Called whenever the active unit count changes between two hours
    fn on_scaling(&self, _context: &RunContext, _event: &ScaleEvent) {
        // Default implementation: do nothing
    }

    /// Called after the last time-step of a run that was not cancelled
    fn on_run_finished(&self, _context: &RunContext, _results: &ResultSeries) {
        // Default implementation: do nothing
    }
}

/// Combine observers into a single struct for easier management
#[derive(Clone, Default)]
pub struct SimulationCallbacks {
    pub observers: Vec<Arc<dyn SimulationObserver>>,
}

impl SimulationCallbacks {
    /// Create an empty callback configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer to receive simulation events
    pub fn add_observer(mut self, observer: Arc<dyn SimulationObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Add multiple observers at once
    pub fn add_observers(mut self, observers: Vec<Arc<dyn SimulationObserver>>) -> Self {
        self.observers.extend(observers);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub(crate) fn run_started(&self, context: &RunContext) {
        for observer in &self.observers {
            observer.on_run_started(context);
        }
    }

    pub(crate) fn month_started(&self, context: &RunContext, index: &TimeIndex) {
        for observer in &self.observers {
            observer.on_month_started(context, index);
        }
    }

    pub(crate) fn scaling(&self, context: &RunContext, event: &ScaleEvent) {
        for observer in &self.observers {
            observer.on_scaling(context, event);
        }
    }

    pub(crate) fn run_finished(&self, context: &RunContext, results: &ResultSeries) {
        for observer in &self.observers {
            observer.on_run_finished(context, results);
        }
    }
}

impl std::fmt::Debug for SimulationCallbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationCallbacks")
            .field("observers", &self.observers.len())
            .finish()
    }
}
