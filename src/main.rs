use std::sync::Arc;
use std::time::Duration;

use claude_usage_pace::config::Config;
use claude_usage_pace::http::HttpQuotaSource;
use claude_usage_pace::preferences::PreferencesStore;
use claude_usage_pace::{app, cli};
use log::warn;

#[tokio::main(flavor = "current_thread")] // one monitor task plus short-lived fetches
async fn main() -> anyhow::Result<()> {
    let cmd = cli::build_cli();
    let matches = cmd.get_matches();
    let opts = cli::CliOptions::from_matches(&matches);

    cli::init_logging(opts.log_level.as_deref());

    if opts.version {
        println!("claude-usage-pace {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let cfg = Config::from_env()?;
    let store = PreferencesStore::from_config(&cfg)?;
    let mut prefs = store.load();
    if let Some(metric) = opts.metric {
        prefs.set_selected_metric(metric);
        if let Err(e) = store.save(&prefs) {
            warn!("could not persist metric selection: {}", e);
        }
    }

    let source = Arc::new(HttpQuotaSource::with_preferences(cfg.clone(), store.clone())?);

    if opts.once {
        return app::run_once(source, prefs.selected_metric()).await;
    }

    let period = Duration::from_secs(opts.interval_secs.unwrap_or(cfg.refresh_secs));
    app::run_watch(&cfg, store, prefs, source, period).await
}
