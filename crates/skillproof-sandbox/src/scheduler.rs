//! Timer queue backing `set_timeout` and `set_immediate`.

use std::time::{Duration, Instant};

use mlua::Function;

/// A callback waiting to run once the skill body has returned.
#[derive(Debug)]
pub(crate) struct Timer {
    id: i64,
    due: Instant,
    callback: Function,
}

impl Timer {
    pub(crate) fn into_callback(self) -> Function {
        self.callback
    }
}

/// Pending timers for one execution context.
///
/// Timers run in due order, ties broken by scheduling order. Every requested
/// delay is clamped to the profile's cap.
#[derive(Debug)]
pub(crate) struct Scheduler {
    cap: Duration,
    next_id: i64,
    timers: Vec<Timer>,
}

impl Scheduler {
    pub(crate) fn new(cap: Duration) -> Self {
        Self {
            cap,
            next_id: 1,
            timers: Vec::new(),
        }
    }

    /// Queues a callback and returns its id.
    pub(crate) fn schedule(&mut self, callback: Function, delay: Duration) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        self.timers.push(Timer {
            id,
            due: Instant::now() + delay.min(self.cap),
            callback,
        });
        id
    }

    /// Removes a pending timer. Unknown ids are ignored.
    pub(crate) fn cancel(&mut self, id: i64) -> bool {
        let before = self.timers.len();
        self.timers.retain(|timer| timer.id != id);
        self.timers.len() != before
    }

    pub(crate) fn next_due(&self) -> Option<Instant> {
        self.timers
            .iter()
            .min_by_key(|timer| (timer.due, timer.id))
            .map(|timer| timer.due)
    }

    /// Removes and returns the earliest timer.
    pub(crate) fn pop_next(&mut self) -> Option<Timer> {
        let index = self.earliest()?;
        Some(self.timers.remove(index))
    }

    pub(crate) fn pending(&self) -> usize {
        self.timers.len()
    }

    pub(crate) fn clear(&mut self) {
        self.timers.clear();
    }

    fn earliest(&self) -> Option<usize> {
        self.timers
            .iter()
            .enumerate()
            .min_by_key(|(_, timer)| (timer.due, timer.id))
            .map(|(index, _)| index)
    }
}

/// Converts a millisecond delay from skill code into a duration.
///
/// Missing, negative, zero and NaN delays run as soon as possible. Delays too
/// large to represent saturate, so the cap applies to them like any other
/// long delay.
pub(crate) fn delay_from_millis(millis: Option<f64>) -> Duration {
    match millis {
        Some(value) if value > 0.0 => {
            Duration::try_from_secs_f64(value).map_or(Duration::MAX, |scaled| scaled / 1000)
        }
        _ => Duration::ZERO,
    }
}
