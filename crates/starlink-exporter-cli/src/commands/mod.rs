pub mod check;
pub mod serve;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use starlink_exporter_core::{
    Classifier, DEFAULT_TARGET, DeviceIdentity, DishFeed, DishOptions, FieldDescriptions, Mode,
    ModeSet, RecordProducer,
};

/// Where dish data comes from and which groups to collect.
#[derive(Args, Debug, Clone)]
pub struct FeedArgs {
    /// Dish gRPC address
    #[arg(long, default_value = DEFAULT_TARGET)]
    pub target: String,

    /// grpcurl executable used to query the dish
    #[arg(long, default_value = "grpcurl")]
    pub grpcurl: String,

    /// Re-read a saved get_status JSON response instead of querying the dish
    #[arg(long)]
    pub status_file: Option<PathBuf>,

    /// Re-read a saved get_history JSON response (with --status-file)
    #[arg(long, requires = "status_file")]
    pub history_file: Option<PathBuf>,

    /// Data groups to collect: status, ping_drop, ping_run_length,
    /// ping_latency, ping_loaded_latency, usage
    #[arg(long, short = 'm', value_delimiter = ',', default_value = "status")]
    pub mode: Vec<Mode>,

    /// History samples covered by the first poll
    #[arg(long, short = 's', default_value = "1")]
    pub samples: u64,

    /// Polls accumulated into one history report
    #[arg(long, short = 'o', default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub poll_loops: u32,
}

impl FeedArgs {
    pub fn modes(&self) -> ModeSet {
        self.mode.iter().copied().collect()
    }

    fn options(&self) -> DishOptions {
        DishOptions {
            modes: self.modes(),
            samples: self.samples,
            poll_loops: self.poll_loops,
        }
    }
}

/// Build a producer over the configured feed.
pub fn make_producer(
    args: &FeedArgs,
    identity: Arc<DeviceIdentity>,
) -> starlink_exporter_core::Result<RecordProducer> {
    let feed = match &args.status_file {
        Some(path) => DishFeed::from_files(path, args.history_file.as_deref(), args.options())?,
        None => DishFeed::grpcurl(&args.grpcurl, &args.target, args.options())?,
    };
    Ok(RecordProducer::new(
        Box::new(feed),
        Classifier::new(FieldDescriptions::dish()),
        identity,
    ))
}
