//! Food level command handlers.

use serde::Serialize;

use feeder_core::{AlertChange, Feeder, FeederConfig, FoodLevel, FoodMonitor};

use crate::cli::{FoodArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::util;

/// One reading as rendered to the user.
#[derive(Debug, Serialize)]
struct FoodReport {
    fraction: f64,
    percent: u8,
    low: bool,
}

impl FoodReport {
    fn new(level: FoodLevel, threshold: f64) -> Self {
        Self {
            fraction: level.fraction(),
            percent: level.percent(),
            low: level.is_below(threshold),
        }
    }
}

fn detail(report: &FoodReport, color: bool) -> String {
    let line = format!("Food level: {}%", report.percent);
    if report.low {
        format!("{line}  {}", output::warn_style("(low)", color))
    } else {
        line
    }
}

fn print_report(report: &FoodReport, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        report,
        |r| detail(r, color),
        |r| r.percent.to_string(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

pub async fn handle(
    config: FeederConfig,
    args: FoodArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let threshold = config.low_food_threshold;

    if !args.watch {
        let level = Feeder::oneshot(config, |feeder| async move {
            feeder.fetch_food_level().await
        })
        .await?;
        return print_report(&FoodReport::new(level, threshold), global);
    }

    // ── Watch mode: poll until Ctrl-C ───────────────────────────────
    let interval = config.food_poll_interval;
    let feeder = Feeder::new(config)?;
    feeder.authenticate().await?;

    let mut monitor = FoodMonitor::new(threshold);
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let result = loop {
        tokio::select! {
            _ = &mut ctrl_c => break Ok(()),
            _ = ticker.tick() => {
                let reading = feeder.fetch_food_level().await.map(FoodLevel::fraction);
                let (level, change) = monitor.observe(reading);
                match change {
                    AlertChange::Raised => util::status(
                        global,
                        &output::warn_style(
                            "Food is running low, time to refill the feeder",
                            output::should_color(&global.color),
                        ),
                    ),
                    AlertChange::Cleared => util::status(global, "Food level recovered"),
                    AlertChange::Unchanged => {}
                }
                if let Err(e) = print_report(&FoodReport::new(level, threshold), global) {
                    break Err(e);
                }
            }
        }
    };

    feeder.disconnect().await;
    result
}
