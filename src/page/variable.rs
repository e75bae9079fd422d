use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::protocol::{FilterSpec, VariableSnapshot, VariableType};
use crate::unit::{DurationUnit, ParseError, UnitSpec};

/// Per-kind mutable state. Capturing is pure for counters and read-and-reset
/// for timers.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Metric {
    Counter { value: f64 },
    Timer { total: f64, samples: u64 },
}

impl Metric {
    fn kind(&self) -> VariableType {
        match self {
            Metric::Counter { .. } => VariableType::Counter,
            Metric::Timer { .. } => VariableType::Timer,
        }
    }

    fn capture_value(&mut self) -> f64 {
        match self {
            Metric::Counter { value } => *value,
            Metric::Timer { total, samples } => {
                if *samples == 0 {
                    return 0.0;
                }
                // The timer reports the average since the previous capture.
                let average = *total / *samples as f64;
                *total = 0.0;
                *samples = 0;
                average
            }
        }
    }
}

#[derive(Debug)]
struct VariableState {
    description: String,
    unit: DurationUnit,
    filters: Vec<FilterSpec>,
    metric: Metric,
}

#[derive(Debug)]
pub(crate) struct VariableCell {
    name: String,
    state: Mutex<VariableState>,
}

impl VariableCell {
    pub(crate) fn new(name: String, metric: Metric) -> Self {
        let unit = metric.kind().default_unit();
        Self {
            name,
            state: Mutex::new(VariableState {
                description: String::new(),
                unit,
                filters: Vec::new(),
                metric,
            }),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> MutexGuard<'_, VariableState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn capture(&self) -> VariableSnapshot {
        let mut state = self.state();
        let value = state.metric.capture_value();
        VariableSnapshot {
            kind: state.metric.kind(),
            name: self.name.clone(),
            description: state.description.clone(),
            filters: state.filters.clone(),
            value,
            unit: state.unit,
        }
    }
}

/// Shared handle to a registered variable. Builder calls mutate the entry the
/// page registry holds, so they are visible in the next snapshot.
#[derive(Debug, Clone)]
pub struct Variable {
    cell: Arc<VariableCell>,
}

impl Variable {
    pub(crate) fn from_cell(cell: Arc<VariableCell>) -> Self {
        Self { cell }
    }

    pub fn name(&self) -> &str {
        self.cell.name()
    }

    pub fn kind(&self) -> VariableType {
        self.cell.state().metric.kind()
    }

    pub fn description(&self) -> String {
        self.cell.state().description.clone()
    }

    pub fn unit(&self) -> DurationUnit {
        self.cell.state().unit
    }

    pub fn filters(&self) -> Vec<FilterSpec> {
        self.cell.state().filters.clone()
    }

    pub fn set_description(&self, description: impl Into<String>) -> &Self {
        self.cell.state().description = description.into();
        self
    }

    /// Sets the time unit this variable is displayed over. Only
    /// duration-valued kinds are scaled by it; a counter's absolute value is
    /// shown as-is whatever its unit.
    pub fn set_unit(&self, unit: impl Into<UnitSpec>) -> Result<&Self, ParseError> {
        let unit = DurationUnit::parse(unit)?;
        self.cell.state().unit = unit;
        Ok(self)
    }

    /// Shows the rate of change per millisecond instead of the absolute value.
    pub fn calc_rate(&self) -> &Self {
        self.push_filter(FilterSpec::rate())
    }

    /// Shows the rate of change per `period`, e.g. `"5m"`.
    pub fn calc_rate_over(&self, period: impl Into<UnitSpec>) -> Result<&Self, ParseError> {
        let unit = DurationUnit::parse(period)?;
        Ok(self.push_filter(FilterSpec::rate_over(unit.period())))
    }

    pub fn push_filter(&self, filter: FilterSpec) -> &Self {
        self.cell.state().filters.push(filter);
        self
    }

    fn with_metric<R>(&self, f: impl FnOnce(&mut Metric) -> R) -> R {
        f(&mut self.cell.state().metric)
    }
}

/// A counter exporting a single number.
#[derive(Debug, Clone)]
pub struct Counter(Variable);

impl Counter {
    pub(crate) fn new(variable: Variable) -> Self {
        Self(variable)
    }

    pub fn incr(&self) {
        self.increment(1.0);
    }

    pub fn increment(&self, delta: f64) {
        self.0.with_metric(|metric| {
            if let Metric::Counter { value } = metric {
                *value += delta;
            }
        });
    }

    pub fn set(&self, new_value: f64) {
        self.0.with_metric(|metric| {
            if let Metric::Counter { value } = metric {
                *value = new_value;
            }
        });
    }

    pub fn value(&self) -> f64 {
        self.0.with_metric(|metric| match metric {
            Metric::Counter { value } => *value,
            Metric::Timer { .. } => 0.0,
        })
    }
}

impl Deref for Counter {
    type Target = Variable;

    fn deref(&self) -> &Variable {
        &self.0
    }
}

/// An event timer. Its exported value is the mean of the durations recorded
/// since the previous snapshot.
#[derive(Debug, Clone)]
pub struct Timer(Variable);

impl Timer {
    pub(crate) fn new(variable: Variable) -> Self {
        Self(variable)
    }

    /// Records the duration of one event, in milliseconds.
    pub fn record(&self, millis: f64) {
        self.0.with_metric(|metric| {
            if let Metric::Timer { total, samples } = metric {
                *total += millis;
                *samples += 1;
            }
        });
    }

    pub fn record_duration(&self, duration: Duration) {
        self.record(duration.as_nanos() as f64 / 1_000_000.0);
    }

    /// Runs `f`, recording how long it took. The duration is recorded even
    /// if `f` panics.
    pub fn measure<R>(&self, f: impl FnOnce() -> R) -> R {
        let _guard = MeasureGuard {
            timer: self,
            start: Instant::now(),
        };
        f()
    }
}

impl Deref for Timer {
    type Target = Variable;

    fn deref(&self) -> &Variable {
        &self.0
    }
}

struct MeasureGuard<'a> {
    timer: &'a Timer,
    start: Instant,
}

impl Drop for MeasureGuard<'_> {
    fn drop(&mut self) {
        self.timer.record_duration(self.start.elapsed());
    }
}
