//! Poll loop driver.
//!
//! Runs the producer on a fixed interval and pushes every record into the
//! sample queue. Ticks are scheduled from the previous tick's scheduled start,
//! so polling time does not accumulate drift; when a poll overruns the
//! interval the next one starts immediately, without catch-up ticks.
//!
//! Shutdown is cooperative: the wait between polls listens on a channel, and a
//! message (or a dropped sender) ends the loop at the next tick boundary. A
//! poll in progress is never interrupted. The loop then performs one final
//! flushing poll, releases the feed and returns.

use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::feed::PollStatus;
use crate::producer::RecordProducer;
use crate::queue::SampleQueue;

/// Lifecycle phase of the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Running,
    Draining,
    Stopped,
}

impl std::fmt::Display for LoopPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Draining => write!(f, "draining"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Owns the producer and the poll timing.
pub struct PollLoop {
    producer: RecordProducer,
    queue: Arc<SampleQueue>,
    interval: Duration,
    phase: LoopPhase,
    polls: u64,
}

impl PollLoop {
    /// A zero `interval` means a single poll.
    pub fn new(producer: RecordProducer, queue: Arc<SampleQueue>, interval: Duration) -> Self {
        Self {
            producer,
            queue,
            interval,
            phase: LoopPhase::Running,
            polls: 0,
        }
    }

    /// Build from an interval in seconds; zero, negative or non-finite values
    /// mean a single poll.
    pub fn with_interval_secs(
        producer: RecordProducer,
        queue: Arc<SampleQueue>,
        interval_secs: f64,
    ) -> Self {
        let interval = if interval_secs.is_finite() && interval_secs > 0.0 {
            Duration::from_secs_f64(interval_secs)
        } else {
            Duration::ZERO
        };
        Self::new(producer, queue, interval)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn transition(&mut self, phase: LoopPhase) {
        log::info!("poll loop {} -> {phase} after {} polls", self.phase, self.polls);
        self.phase = phase;
    }

    fn poll_once(&mut self, shutdown: bool) -> PollStatus {
        let (record, status) = self.producer.produce(shutdown);
        self.queue.push(record);
        self.polls += 1;
        status
    }

    /// Run until `shutdown` fires (or its sender is dropped).
    ///
    /// Returns the status of the last poll.
    pub fn run(mut self, shutdown: &Receiver<()>) -> PollStatus {
        if self.interval.is_zero() {
            let status = self.poll_once(true);
            self.transition(LoopPhase::Stopped);
            self.producer.release();
            return status;
        }

        log::info!(
            "polling {} every {:.3}s",
            self.producer.feed_name(),
            self.interval.as_secs_f64()
        );
        let mut next_tick = Instant::now();
        loop {
            self.poll_once(false);

            let now = Instant::now();
            next_tick = (next_tick + self.interval).max(now);
            match shutdown.recv_timeout(next_tick.saturating_duration_since(now)) {
                Err(RecvTimeoutError::Timeout) => continue,
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.transition(LoopPhase::Draining);
        let status = self.poll_once(true);
        self.transition(LoopPhase::Stopped);
        self.producer.release();
        status
    }
}
