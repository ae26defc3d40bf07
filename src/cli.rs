use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};

use crate::quota::MetricKind;

pub struct CliOptions {
    pub log_level: Option<String>,
    pub version: bool,
    pub metric: Option<MetricKind>,
    pub once: bool,
    pub interval_secs: Option<u64>,
}

impl CliOptions {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        Self {
            log_level: matches.get_one::<String>("log-level").cloned(),
            version: matches.get_flag("version"),
            metric: matches
                .get_one::<String>("metric")
                .and_then(|m| m.parse::<MetricKind>().ok()),
            once: matches.get_flag("once"),
            interval_secs: matches.get_one::<u64>("interval-secs").copied(),
        }
    }
}

pub fn build_cli() -> Command {
    Command::new("claude-usage-pace")
        .about("Claude usage quota monitor with pace-aware status")
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .num_args(1)
                .help("Override RUST_LOG level (e.g., info, debug)"),
        )
        .arg(
            Arg::new("version")
                .long("version")
                .help("Print version and exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("metric")
                .long("metric")
                .num_args(1)
                .value_parser(MetricKind::SELECTABLE.map(MetricKind::cli_name))
                .help("Metric to track; saved to preferences"),
        )
        .arg(
            Arg::new("once")
                .long("once")
                .help("Fetch once, print status and menu, then exit")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("interval-secs")
                .long("interval-secs")
                .num_args(1)
                .value_parser(value_parser!(u64).range(1..))
                .help("Refresh interval in watch mode (overrides CLAUDE_REFRESH_SECS)"),
        )
}

pub fn init_logging(level: Option<&str>) {
    // Respect explicit level, else default to info, allow env override via RUST_LOG
    if let Some(lvl) = level {
        std::env::set_var("RUST_LOG", lvl);
    } else if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_and_flags() {
        let m = build_cli()
            .try_get_matches_from([
                "claude-usage-pace",
                "--metric",
                "five-hour",
                "--once",
                "--interval-secs",
                "60",
            ])
            .unwrap();
        let opts = CliOptions::from_matches(&m);
        assert_eq!(opts.metric, Some(MetricKind::FiveHour));
        assert!(opts.once);
        assert_eq!(opts.interval_secs, Some(60));
        assert!(!opts.version);
    }

    #[test]
    fn rejects_opus_and_zero_interval() {
        assert!(build_cli()
            .try_get_matches_from(["claude-usage-pace", "--metric", "seven-day-opus"])
            .is_err());
        assert!(build_cli()
            .try_get_matches_from(["claude-usage-pace", "--interval-secs", "0"])
            .is_err());
    }
}
