use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use liftsync::{
    analytics::TimeRange,
    edit::SubmitFields,
    model::{self, BODYWEIGHTS, EXERCISES, WORKOUTS},
    store::RecordStore,
    ChartProjection, MemoryStore, SyncStatus, TrackerClient, TrackerConfig, TrackerView,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "liftsync",
    about = "Live-mirror workout tracking client with local analytics over a remote record store",
    version
)]
struct Args {
    /// Path to the config file (default: liftsync.toml in the working directory)
    #[arg(long, env = "LIFTSYNC_CONFIG")]
    config: Option<std::path::PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LIFTSYNC_LOG")]
    log: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // ── Logging setup ────────────────────────────────────────────────────────
    // Init once, before any tracing calls.
    let log_level = args.log.as_deref().unwrap_or("info").to_owned();
    let log_format =
        std::env::var("LIFTSYNC_LOG_FORMAT").unwrap_or_else(|_| "pretty".to_string());
    setup_logging(&log_level, &log_format);

    info!(version = env!("CARGO_PKG_VERSION"), "liftsync starting");

    let config = TrackerConfig::new(args.config);
    info!(
        metric = ?config.metric,
        weight_field = %config.weight_field,
        order = ?config.log_order,
        "configuration loaded"
    );

    // ── Smoke run ────────────────────────────────────────────────────────────
    // Seed the in-memory store with a week of training data, spawn the client
    // against it, push one live edit through the handle, and print the
    // recomputed views.
    let store = Arc::new(MemoryStore::new());
    seed(store.as_ref(), &config).await?;

    let handle = TrackerClient::spawn(store, &config).await?;
    let mut view = handle.view();
    view.wait_for(|v| v.sync == SyncStatus::Live)
        .await
        .context("client task ended before going live")?;
    let logged = view.borrow().snapshot.workouts.len();
    info!(workouts = logged, "mirror live");

    // One live write through the normal edit path. The new log becomes
    // visible via the workout subscription, not from the submit call itself.
    handle
        .submit(SubmitFields {
            name: "Squat".into(),
            sets: "5".into(),
            weight: "102.5".into(),
        })
        .await?;
    view.wait_for(|v| v.snapshot.workouts.len() > logged)
        .await
        .context("submitted log never reached the mirror")?;

    handle.set_params(Some("Squat".into()), TimeRange::All).await?;
    view.wait_for(|v| v.analytics.selected.is_some())
        .await
        .context("client task ended")?;

    print_report(&view.borrow());

    // The chart boundary serves any exercise, independent of the client's
    // focused series.
    let charts = ChartProjection::new(handle.view());
    let bench = charts.series("Bench Press", TimeRange::Monthly);
    println!("chart feed: Bench Press, {} points this month", bench.len());

    handle.shutdown().await;
    Ok(())
}

/// A week of plausible training data so the first live view has something to
/// show.
async fn seed(store: &MemoryStore, config: &TrackerConfig) -> Result<()> {
    let now = Utc::now();

    for name in ["Squat", "Bench Press", "Deadlift"] {
        store.create(EXERCISES, model::exercise_fields(name)).await?;
    }

    let history = [
        ("Squat", 5, 90.0, 6),
        ("Bench Press", 5, 60.0, 6),
        ("Squat", 5, 95.0, 4),
        ("Deadlift", 3, 130.0, 3),
        ("Bench Press", 5, 62.5, 2),
        ("Squat", 3, 100.0, 1),
    ];
    for (name, sets, weight, days_ago) in history {
        let created = now - Duration::days(days_ago);
        store
            .create(WORKOUTS, model::workout_fields(name, sets, weight, created))
            .await?;
    }

    for (weight, days_ago) in [(82.4, 6), (82.1, 3), (81.8, 1)] {
        let created = now - Duration::days(days_ago);
        store
            .create(
                BODYWEIGHTS,
                model::body_weight_fields(&config.weight_field, weight, created),
            )
            .await?;
    }

    Ok(())
}

fn print_report(view: &TrackerView) {
    println!("personal records:");
    for record in &view.analytics.records {
        println!("  {:<14} {:>7.1}", record.name, record.value);
    }

    let weekly = &view.analytics.weekly;
    println!(
        "this week: volume {:.1} over {} workouts (most frequent: {})",
        weekly.volume,
        weekly.workout_count,
        weekly.most_frequent.as_deref().unwrap_or("-")
    );

    if let Some(series) = &view.analytics.selected {
        println!(
            "{}: {} points, personal record {:.1}",
            series.name,
            series.points.len(),
            series.personal_record
        );
        for point in &series.points {
            println!("  {:<16} {:>7.1}", point.label, point.value);
        }
    }

    if let Some(latest) = view.analytics.body_weight.last() {
        println!("body weight: {:.1} ({})", latest.value, latest.label);
    }
}

fn setup_logging(log_level: &str, log_format: &str) {
    if log_format == "json" {
        tracing_subscriber::fmt().json().with_env_filter(log_level).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(log_level).compact().init();
    }
}
