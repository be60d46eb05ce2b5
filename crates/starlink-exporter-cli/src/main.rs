//! CLI for starlink-exporter: poll a Starlink dish, serve its status to Prometheus.

mod commands;

use clap::{Parser, Subcommand};

use commands::FeedArgs;

#[derive(Parser)]
#[command(name = "starlink-exporter")]
#[command(about = "starlink-exporter: Starlink dish status as Prometheus metrics")]
#[command(version = starlink_exporter_core::VERSION)]
struct Cli {
    /// Verbose logging (RUST_LOG overrides)
    #[arg(long, short = 'd', global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the dish on an interval and serve /metrics
    Serve {
        #[command(flatten)]
        feed: FeedArgs,

        /// Seconds between polls; 0 or less polls once, prints the metrics and exits
        #[arg(long, default_value = "4", allow_negative_numbers = true)]
        interval: f64,

        /// Port to listen on
        #[arg(long, short = 'p', default_value = "9148")]
        port: u16,

        /// Address to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,

        /// Maximum records held between scrapes, oldest dropped first (0 = unbounded)
        #[arg(long, default_value = "0")]
        queue_cap: usize,
    },

    /// Poll the dish once and print the record
    Check {
        #[command(flatten)]
        feed: FeedArgs,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(debug: bool) {
    let default_filter = if debug {
        "info,starlink_exporter=debug,starlink_exporter_core=debug,starlink_exporter_server=debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let code = match cli.command {
        Commands::Serve {
            feed,
            interval,
            port,
            host,
            queue_cap,
        } => commands::serve::run(commands::serve::ServeConfig {
            feed: &feed,
            interval_secs: interval,
            host: &host,
            port,
            queue_cap,
        }),
        Commands::Check { feed, json } => commands::check::run(&feed, json),
    };
    std::process::exit(code);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use starlink_exporter_core::{Mode, ModeSet};

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::try_parse_from(["starlink-exporter", "serve"]).unwrap();
        assert!(!cli.debug);
        let Commands::Serve {
            feed,
            interval,
            port,
            host,
            queue_cap,
        } = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(feed.target, "192.168.100.1:9200");
        assert_eq!(feed.grpcurl, "grpcurl");
        assert!(feed.status_file.is_none());
        assert!(feed.history_file.is_none());
        assert_eq!(feed.modes(), ModeSet::default());
        assert_eq!(feed.samples, 1);
        assert_eq!(feed.poll_loops, 1);
        assert_eq!(interval, 4.0);
        assert_eq!(port, 9148);
        assert_eq!(host, "0.0.0.0");
        assert_eq!(queue_cap, 0);
    }

    #[test]
    fn test_serve_single_shot_from_file() {
        let cli = Cli::try_parse_from([
            "starlink-exporter",
            "serve",
            "--status-file",
            "status.json",
            "--interval",
            "-1",
            "--debug",
        ])
        .unwrap();
        assert!(cli.debug);
        let Commands::Serve { feed, interval, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(feed.status_file.as_deref(), Some(std::path::Path::new("status.json")));
        assert_eq!(interval, -1.0);
    }

    #[test]
    fn test_check_json() {
        let cli = Cli::try_parse_from([
            "starlink-exporter",
            "check",
            "--target",
            "10.0.0.1:9200",
            "--json",
        ])
        .unwrap();
        let Commands::Check { feed, json } = cli.command else {
            panic!("expected check");
        };
        assert!(json);
        assert_eq!(feed.target, "10.0.0.1:9200");
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["starlink-exporter", "serve", "--port", "70000"]).is_err());
    }

    #[test]
    fn test_short_flags() {
        let cli = Cli::try_parse_from(["starlink-exporter", "serve", "-p", "9200", "-d"]).unwrap();
        assert!(cli.debug);
        let Commands::Serve { port, .. } = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(port, 9200);

        let cli = Cli::try_parse_from(["starlink-exporter", "-d", "check"]).unwrap();
        assert!(cli.debug);
    }

    #[test]
    fn test_history_modes() {
        let cli = Cli::try_parse_from([
            "starlink-exporter",
            "serve",
            "--mode",
            "status,ping_drop",
            "-m",
            "usage",
            "-s",
            "900",
            "-o",
            "3",
            "--status-file",
            "status.json",
            "--history-file",
            "history.json",
        ])
        .unwrap();
        let Commands::Serve { feed, .. } = cli.command else {
            panic!("expected serve");
        };
        let modes = feed.modes();
        assert!(modes.contains(Mode::Status));
        assert!(modes.contains(Mode::PingDrop));
        assert!(modes.contains(Mode::Usage));
        assert!(!modes.contains(Mode::PingLatency));
        assert_eq!(feed.samples, 900);
        assert_eq!(feed.poll_loops, 3);
        assert_eq!(feed.history_file.as_deref(), Some(std::path::Path::new("history.json")));
    }

    #[test]
    fn test_rejects_bad_mode_and_loops() {
        assert!(Cli::try_parse_from(["starlink-exporter", "serve", "--mode", "bulk"]).is_err());
        assert!(Cli::try_parse_from(["starlink-exporter", "serve", "-o", "0"]).is_err());
        // a history file only replaces a status file
        assert!(
            Cli::try_parse_from(["starlink-exporter", "check", "--history-file", "h.json"])
                .is_err()
        );
    }
}
