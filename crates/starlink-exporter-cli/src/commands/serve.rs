use std::sync::{Arc, mpsc};
use std::thread;

use starlink_exporter_core::{
    DeviceIdentity, PollLoop, PollStatus, SampleQueue, TelemetryCollector,
};
use starlink_exporter_server::Exporter;

use super::FeedArgs;

pub struct ServeConfig<'a> {
    pub feed: &'a FeedArgs,
    pub interval_secs: f64,
    pub host: &'a str,
    pub port: u16,
    pub queue_cap: usize,
}

/// Run the exporter. Returns the process exit code.
pub fn run(config: ServeConfig<'_>) -> i32 {
    match serve(config) {
        Ok(code) => code,
        Err(e) => {
            log::error!("{e}");
            1
        }
    }
}

fn serve(config: ServeConfig<'_>) -> Result<i32, Box<dyn std::error::Error>> {
    let identity = Arc::new(DeviceIdentity::new());
    let queue = Arc::new(SampleQueue::bounded(config.queue_cap));
    let producer = super::make_producer(config.feed, Arc::clone(&identity))?;
    let collector = TelemetryCollector::new(Arc::clone(&queue), identity);
    let exporter = Arc::new(Exporter::new(collector)?);
    let poll_loop =
        PollLoop::with_interval_secs(producer, Arc::clone(&queue), config.interval_secs);

    if poll_loop.interval().is_zero() {
        let (_stop, stop_rx) = mpsc::channel();
        let status = poll_loop.run(&stop_rx);
        print!("{}", exporter.scrape()?);
        return Ok(status.code());
    }

    let rt = tokio::runtime::Runtime::new()?;
    let listener = rt.block_on(starlink_exporter_server::bind(config.host, config.port))?;

    let (stop_tx, stop_rx) = mpsc::channel();
    ctrlc::set_handler(move || {
        log::info!("shutdown requested");
        let _ = stop_tx.send(());
    })?;

    println!("Starlink Exporter v{}", starlink_exporter_core::VERSION);
    println!("   http://{}", listener.local_addr()?);
    println!("   polling every {:.1}s", config.interval_secs);
    println!("   collecting {}", config.feed.modes());
    if let Some(cap) = queue.capacity_limit() {
        println!("   holding at most {cap} records between scrapes");
    }
    println!();
    println!("   Endpoints:");
    println!("     GET /metrics          Prometheus text exposition");
    println!("     GET /health           Queue depth and last device id");
    println!("     GET /                 API index");
    println!();

    let grace = poll_loop.interval();
    let (done_tx, done_rx) = tokio::sync::oneshot::channel::<()>();
    let poller = thread::Builder::new()
        .name("poll-loop".to_string())
        .spawn(move || {
            let status = poll_loop.run(&stop_rx);
            let _ = done_tx.send(());
            status
        })?;

    // keep serving for up to one interval after the loop stops, until the
    // final flush record has been scraped
    let drain_queue = Arc::clone(&queue);
    rt.block_on(starlink_exporter_server::serve(listener, exporter, async move {
        let _ = done_rx.await;
        starlink_exporter_server::wait_for_drain(&drain_queue, grace).await;
    }))?;
    let undelivered = queue.len();
    if undelivered > 0 {
        log::warn!("{undelivered} records were never scraped");
    }

    let status: PollStatus = poller
        .join()
        .map_err(|_| "poll loop thread panicked")?;
    log::info!("stopped; final poll: {status}");
    Ok(0)
}
