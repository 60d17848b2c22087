//! Reservation countdown shown in the cart drawer.
//!
//! Purely presentational: the countdown never removes items. When it hits
//! zero it shows `Expirado` and stops; the next fetch tells what the server
//! actually released.

use crate::state::CartState;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Label once the deadline has passed.
pub const EXPIRED_LABEL: &str = "Expirado";

/// Refresh period of the countdown.
pub const TICK: Duration = Duration::from_secs(1);

/// What the countdown shows at a given instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownDisplay {
    Remaining { minutes: u64, seconds: u64 },
    Expired,
}

impl CountdownDisplay {
    /// Display for `expires_at` as seen at `now`.
    pub fn at(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::from_millis((expires_at - now).num_milliseconds())
    }

    /// Whole minutes and seconds left, rounded down. Zero or less is expired.
    pub fn from_millis(millis: i64) -> Self {
        if millis <= 0 {
            return CountdownDisplay::Expired;
        }
        let millis = millis.unsigned_abs();
        CountdownDisplay::Remaining {
            minutes: millis / 60_000,
            seconds: (millis % 60_000) / 1_000,
        }
    }

    pub fn from_remaining(remaining: Duration) -> Self {
        Self::from_millis(i64::try_from(remaining.as_millis()).unwrap_or(i64::MAX))
    }

    pub fn is_expired(&self) -> bool {
        matches!(self, CountdownDisplay::Expired)
    }
}

impl fmt::Display for CountdownDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountdownDisplay::Remaining { minutes, seconds } => {
                write!(f, "{}:{:02}", minutes, seconds)
            }
            CountdownDisplay::Expired => f.write_str(EXPIRED_LABEL),
        }
    }
}

type TickFn = dyn Fn(CountdownDisplay) + Send + Sync;

/// Owned handle of the countdown interval.
///
/// At most one interval task runs per handle. It is cancelled when the
/// deadline goes away, when the cart empties, when the deadline changes
/// (and restarted), on [`cancel`](Countdown::cancel), and on drop.
///
/// Must be driven from within a Tokio runtime.
pub struct Countdown {
    on_tick: Arc<TickFn>,
    target: Option<DateTime<Utc>>,
    task: Option<JoinHandle<()>>,
}

impl Countdown {
    pub fn new<F>(on_tick: F) -> Self
    where
        F: Fn(CountdownDisplay) + Send + Sync + 'static,
    {
        Countdown {
            on_tick: Arc::new(on_tick),
            target: None,
            task: None,
        }
    }

    /// Align the interval with the cart.
    ///
    /// Runs only while there is a deadline and at least one item. Calling
    /// it again with the same inputs leaves the running interval alone.
    pub fn sync(&mut self, expires_at: Option<DateTime<Utc>>, item_count: usize) {
        let target = expires_at.filter(|_| item_count > 0);
        if target == self.target {
            return;
        }

        self.stop();
        self.target = target;

        if let Some(deadline) = target {
            debug!("Countdown started for deadline {}", deadline);
            self.task = Some(spawn_interval(deadline, Arc::clone(&self.on_tick)));
        }
    }

    /// Stop the interval and forget the deadline.
    pub fn cancel(&mut self) {
        self.stop();
        self.target = None;
    }

    /// Whether an interval task is still ticking.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Drive a countdown from a cart subscription until the store goes away.
    ///
    /// Dropping the returned follower stops everything.
    pub fn follow<F>(mut state: watch::Receiver<CartState>, on_tick: F) -> CountdownFollower
    where
        F: Fn(CountdownDisplay) + Send + Sync + 'static,
    {
        let task = tokio::spawn(async move {
            let mut countdown = Countdown::new(on_tick);
            loop {
                let (expires_at, item_count) = {
                    let state = state.borrow_and_update();
                    (state.cart.expires_at, state.cart.len())
                };
                countdown.sync(expires_at, item_count);

                if state.changed().await.is_err() {
                    debug!("Cart store dropped, stopping countdown");
                    break;
                }
            }
        });

        CountdownFollower { task }
    }

    fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Task that keeps a [`Countdown`] in line with a cart. Aborted on drop.
pub struct CountdownFollower {
    task: JoinHandle<()>,
}

impl CountdownFollower {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for CountdownFollower {
    fn drop(&mut self) {
        self.task.abort();
    }
}

fn spawn_interval(deadline: DateTime<Utc>, on_tick: Arc<TickFn>) -> JoinHandle<()> {
    // Wall clock only fixes the starting offset; ticks run on the runtime clock.
    let remaining = (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO);
    let end = Instant::now() + remaining;

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(TICK);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            let display = CountdownDisplay::from_remaining(end.saturating_duration_since(Instant::now()));
            on_tick(display);

            if display.is_expired() {
                debug!("Countdown reached {}", EXPIRED_LABEL);
                break;
            }
        }
    })
}
