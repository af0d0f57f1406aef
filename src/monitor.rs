//! # Insertion monitors
//! Monitors observe a run of the NEH heuristic and can stop it early.
//!
//! The insertion phase consults its monitor before every insertion depth. Jobs placed at earlier
//! depths keep their positions when a monitor terminates the run, so the result is always a
//! complete (if less refined) sequence.
//!
//! Available monitors:
//!  - [NoOpMonitor] does nothing
//!  - [LogMonitor] reports progress through an [InfoLogger]
//!  - [TimeLimitMonitor] terminates the run after a wall-clock limit
//!  - [CompositeMonitor] combines several monitors
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::neh::{Solution, Stats};
use crate::pfsp::Instance;
use crate::Time;

/// A logger type which is called with progress information of the heuristic.
pub type InfoLogger = Arc<dyn Fn(&str)>;

/// Decision of a monitor whether the heuristic should go on.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SearchCommand {
    Continue,
    /// Stop before the next insertion depth with given reason.
    Terminate(String),
}

/// Outcome of a single insertion depth.
#[derive(Clone, Debug, PartialEq)]
pub struct DepthEvent<T> {
    /// length `l` of the partial sequence evaluated at this depth
    pub depth: usize,
    /// the job that was (re)inserted
    pub job: usize,
    /// winning position of the job within the partial sequence
    pub position: usize,
    /// partial makespan of the first `l` jobs with the job at `position`
    pub value: T,
    /// `trials[i]` is the partial makespan with the job at position `i`
    pub trials: Vec<T>,
}

/// Trait for observing and controlling the insertion phase of the heuristic.
pub trait InsertionMonitor<T: Time> {
    /// Returns the name of the monitor.
    fn name(&self) -> &str;

    /// Called once the initial sequence is known, before any insertion.
    fn on_start(&mut self, _instance: &Instance<T>, _seed: &[usize]) {}

    /// Called before each insertion depth.
    fn search_command(&mut self) -> SearchCommand {
        SearchCommand::Continue
    }

    /// Called after a job has been placed at its best position.
    fn on_depth(&mut self, _event: &DepthEvent<T>) {}

    /// Called with the final solution.
    fn on_finish(&mut self, _solution: &Solution<T>, _stats: &Stats) {}
}

/// Monitor which observes nothing and never stops the heuristic.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpMonitor;

impl<T: Time> InsertionMonitor<T> for NoOpMonitor {
    fn name(&self) -> &str {
        "NoOpMonitor"
    }
}

/// Monitor which writes progress lines through an [InfoLogger].
///
/// Depth lines are emitted for every `interval`-th depth (and never if the interval is zero).
pub struct LogMonitor {
    logger: InfoLogger,
    interval: usize,
    depths: usize,
}

impl LogMonitor {
    pub fn new(logger: InfoLogger, interval: usize) -> Self {
        Self {
            logger,
            interval,
            depths: 0,
        }
    }

    /// Logs the start, every depth and the end of a run.
    pub fn verbose(logger: InfoLogger) -> Self {
        Self::new(logger, 1)
    }

    /// Logs just the start and the end of a run.
    pub fn summary(logger: InfoLogger) -> Self {
        Self::new(logger, 0)
    }
}

impl<T: Time> InsertionMonitor<T> for LogMonitor {
    fn name(&self) -> &str {
        "LogMonitor"
    }

    fn on_start(&mut self, instance: &Instance<T>, seed: &[usize]) {
        self.depths = 0;
        (self.logger)(&format!(
            "neh: {} jobs on {} machines, initial sequence {seed:?}",
            instance.num_jobs(),
            instance.num_machines()
        ));
    }

    fn on_depth(&mut self, event: &DepthEvent<T>) {
        self.depths += 1;
        if self.interval > 0 && self.depths % self.interval == 0 {
            (self.logger)(&format!(
                "neh: depth {}, job {} -> position {}, partial makespan {:?}",
                event.depth, event.job, event.position, event.value
            ));
        }
    }

    fn on_finish(&mut self, solution: &Solution<T>, stats: &Stats) {
        let status = match &stats.termination {
            Some(reason) => format!("terminated ({reason})"),
            None => "finished".to_string(),
        };
        (self.logger)(&format!(
            "neh: {status} with makespan {:?} after {} depths and {} evaluations in {:.3}ms",
            solution.value,
            stats.depths,
            stats.evaluations,
            stats.elapsed.as_secs_f64() * 1000.
        ));
    }
}

/// A monitor that terminates the heuristic once a specified duration has elapsed.
///
/// The clock starts in [InsertionMonitor::on_start], so one instance can be reused across runs.
#[derive(Clone, Debug)]
pub struct TimeLimitMonitor {
    time_limit: Duration,
    start_time: Option<Instant>,
}

impl TimeLimitMonitor {
    pub fn new(time_limit: Duration) -> Self {
        Self {
            time_limit,
            start_time: None,
        }
    }
}

impl<T: Time> InsertionMonitor<T> for TimeLimitMonitor {
    fn name(&self) -> &str {
        "TimeLimitMonitor"
    }

    fn on_start(&mut self, _instance: &Instance<T>, _seed: &[usize]) {
        self.start_time = Some(Instant::now());
    }

    fn search_command(&mut self) -> SearchCommand {
        match self.start_time {
            Some(start) if start.elapsed() >= self.time_limit => SearchCommand::Terminate(format!(
                "time limit of {:.3}s exceeded",
                self.time_limit.as_secs_f64()
            )),
            _ => SearchCommand::Continue,
        }
    }

    fn on_finish(&mut self, _solution: &Solution<T>, _stats: &Stats) {
        self.start_time = None;
    }
}

/// Monitor which forwards every callback to all of its members.
///
/// The first member requesting termination wins.
pub struct CompositeMonitor<T: Time> {
    monitors: Vec<Box<dyn InsertionMonitor<T>>>,
}

impl<T: Time> CompositeMonitor<T> {
    pub fn new() -> Self {
        Self {
            monitors: Vec::new(),
        }
    }

    pub fn add_monitor(&mut self, monitor: Box<dyn InsertionMonitor<T>>) {
        self.monitors.push(monitor);
    }

    pub fn with_monitor(mut self, monitor: Box<dyn InsertionMonitor<T>>) -> Self {
        self.add_monitor(monitor);
        self
    }

    pub fn len(&self) -> usize {
        self.monitors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.monitors.is_empty()
    }
}

impl<T: Time> Default for CompositeMonitor<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Time> InsertionMonitor<T> for CompositeMonitor<T> {
    fn name(&self) -> &str {
        "CompositeMonitor"
    }

    fn on_start(&mut self, instance: &Instance<T>, seed: &[usize]) {
        self.monitors
            .iter_mut()
            .for_each(|m| m.on_start(instance, seed));
    }

    fn search_command(&mut self) -> SearchCommand {
        for monitor in self.monitors.iter_mut() {
            if let SearchCommand::Terminate(reason) = monitor.search_command() {
                return SearchCommand::Terminate(format!("{}: {reason}", monitor.name()));
            }
        }
        SearchCommand::Continue
    }

    fn on_depth(&mut self, event: &DepthEvent<T>) {
        self.monitors.iter_mut().for_each(|m| m.on_depth(event));
    }

    fn on_finish(&mut self, solution: &Solution<T>, stats: &Stats) {
        self.monitors
            .iter_mut()
            .for_each(|m| m.on_finish(solution, stats));
    }
}
