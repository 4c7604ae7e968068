use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use owo_colors::OwoColorize;
use tokio::time::{Interval, MissedTickBehavior};

use crate::config::CalmergeConfig;

/// Refresh the export on every tick until Ctrl-C.
///
/// The config is re-read each tick, so sources added or removed meanwhile
/// take effect on the next refresh, and a changed `refresh_interval`
/// replaces the timer.
pub async fn run(config_path: Option<&Path>) -> Result<()> {
    let config = CalmergeConfig::load(config_path)?;
    let mut period = config.refresh_interval()?;
    let mut ticker = ticker(period);

    println!(
        "{} every {} {}",
        "Refreshing".green(),
        humantime::format_duration(period),
        "(Ctrl-C to stop)".dimmed()
    );

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut shutdown => break,
        }

        let config = match CalmergeConfig::load(config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "could not reload config, skipping refresh");
                continue;
            }
        };

        tokio::select! {
            refreshed = super::export::run(&config, None, &[], false) => {
                if let Err(e) = refreshed {
                    println!("{} {}", Local::now().format("%H:%M:%S").dimmed(), e.to_string().red());
                }
            }
            _ = &mut shutdown => break,
        }

        match config.refresh_interval() {
            Ok(next) if next != period => {
                tracing::info!(from = ?period, to = ?next, "refresh interval changed");
                period = next;
                ticker = ticker_after(period);
            }
            Ok(_) => {}
            Err(e) => tracing::warn!(error = %e, "keeping previous refresh interval"),
        }
    }

    println!("{}", "Stopped".dimmed());
    Ok(())
}

/// First tick fires immediately.
fn ticker(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn ticker_after(period: Duration) -> Interval {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
