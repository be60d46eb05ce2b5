//! Scripted feed shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime};

use crate::feed::{FeedItem, FeedPoll, TelemetryFeed};

/// What the feed saw.
#[derive(Debug, Default)]
pub struct FeedLog {
    pub flushes: Vec<bool>,
    /// When each fetch started.
    pub fetched_at: Vec<Instant>,
    pub shut_down: bool,
}

/// A feed that replays a fixed list of polls, then reports unavailable.
/// Each scripted poll can take a while to answer.
pub struct ScriptedFeed {
    script: VecDeque<(FeedPoll, Duration)>,
    log: Arc<Mutex<FeedLog>>,
}

impl ScriptedFeed {
    pub fn new() -> Self {
        Self {
            script: VecDeque::new(),
            log: Arc::new(Mutex::new(FeedLog::default())),
        }
    }

    pub fn ok(self, items: Vec<FeedItem>) -> Self {
        self.ok_at(SystemTime::now(), items)
    }

    pub fn ok_at(mut self, ts: SystemTime, items: Vec<FeedItem>) -> Self {
        self.script.push_back((FeedPoll::ok(ts, items), Duration::ZERO));
        self
    }

    /// A successful poll that blocks for `delay` before answering.
    pub fn ok_slow(mut self, items: Vec<FeedItem>, delay: Duration) -> Self {
        self.script
            .push_back((FeedPoll::ok(SystemTime::now(), items), delay));
        self
    }

    pub fn fail(mut self, reason: &str) -> Self {
        self.script
            .push_back((FeedPoll::unavailable(reason), Duration::ZERO));
        self
    }

    pub fn log(&self) -> Arc<Mutex<FeedLog>> {
        Arc::clone(&self.log)
    }
}

impl TelemetryFeed for ScriptedFeed {
    fn name(&self) -> &str {
        "scripted"
    }

    fn fetch(&mut self, flush: bool) -> FeedPoll {
        {
            let mut log = self.log.lock().unwrap();
            log.flushes.push(flush);
            log.fetched_at.push(Instant::now());
        }
        match self.script.pop_front() {
            Some((poll, delay)) => {
                std::thread::sleep(delay);
                poll
            }
            None => FeedPoll::unavailable("script exhausted"),
        }
    }

    fn shutdown(&mut self) {
        self.log.lock().unwrap().shut_down = true;
    }
}

/// A minimal status answer for `id` in `state`.
pub fn dish_items(id: &str, state: &str) -> Vec<FeedItem> {
    vec![
        FeedItem::scalar("id", id, "status"),
        FeedItem::scalar("state", state, "status"),
        FeedItem::scalar("hardware_version", "rev3_proto2", "status"),
        FeedItem::scalar("uptime", 3600i64, "status"),
        FeedItem::scalar("pop_ping_latency_ms", 31.5, "status"),
        FeedItem::scalar("currently_obstructed", false, "status"),
        FeedItem::scalar("snr", None::<f64>, "status"),
    ]
}
