use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use pacer_contracts::CorrectionRequest;
use pacer_core::config::CoreConfig;
use pacer_core::course::StaticGpxFetcher;
use pacer_core::db;
use pacer_core::format::{format_duration_hms, format_pace_min_km, pace_seconds_per_km};
use pacer_core::service::TrackingService;
use pacer_core::store::MemoryStore;
use pacer_sim::{SAMPLE_GPX, SimConfig, generate_runners, interleave};

const EVENT_ID: &str = "sim-event";
const EVENT_DETAIL_ID: &str = "sim-full";
const GPX_URL: &str = "sim://course.gpx";

#[derive(Parser, Debug)]
#[command(name = "pacer-sim")]
#[command(about = "Deterministic race simulator driving the pacer correction core", long_about = None)]
struct Args {
    /// Number of virtual runners (speed factors cycle through a fixed table)
    #[arg(long, default_value = "4")]
    runners: usize,

    /// RNG seed; the same seed replays the same race
    #[arg(long, default_value = "42")]
    seed: u64,

    /// Seconds between fixes
    #[arg(long, default_value = "5.0")]
    interval: f64,

    /// Pace of a factor-1.0 runner, m/s
    #[arg(long, default_value = "3.0")]
    base_speed: f64,

    /// Per-axis GPS error bound in metres (capped at 10)
    #[arg(long, default_value = "5.0")]
    max_error: f64,

    /// Course GPX file; the built-in Seoul sample when omitted
    #[arg(long)]
    gpx: Option<PathBuf>,

    /// Leaderboard rows to print at the end
    #[arg(long, default_value = "10")]
    top: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .init();

    let args = Args::parse();

    let gpx_bytes = match &args.gpx {
        Some(path) => std::fs::read(path)?,
        None => SAMPLE_GPX.as_bytes().to_vec(),
    };

    // In-process stack: sqlite read model, memory live store, canned fetcher
    let pool = db::create_memory_pool().await?;
    db::run_migrations(&pool).await?;
    db::seed::insert_event(&pool, EVENT_ID, "Simulated Race", None, Some("Seoul")).await?;
    db::seed::insert_event_detail(
        &pool,
        EVENT_DETAIL_ID,
        EVENT_ID,
        "Simulated Course",
        None,
        Some(GPX_URL),
    )
    .await?;

    let fetcher = StaticGpxFetcher::new().with_file(GPX_URL, gpx_bytes);
    let service = TrackingService::new(CoreConfig::default(), MemoryStore::new(), pool.clone(), fetcher);

    let record = service.get_course(EVENT_ID, EVENT_DETAIL_ID).await?;
    let summary = record.summary();
    info!(
        points = summary.point_count,
        checkpoints = summary.checkpoint_count,
        total_m = summary.total_distance_m,
        "course ready"
    );

    let sim_config = SimConfig {
        runners: args.runners,
        base_speed_mps: args.base_speed,
        interval_s: args.interval,
        max_error_m: args.max_error,
        seed: args.seed,
        ..SimConfig::default()
    };
    let runners = generate_runners(&record.course, &sim_config);
    for (i, runner) in runners.iter().enumerate() {
        db::seed::insert_participant(
            &pool,
            &runner.user_id,
            EVENT_DETAIL_ID,
            &format!("Runner {:02}", i + 1),
            &format!("{}", 100 + i),
        )
        .await?;
        info!(
            user_id = %runner.user_id,
            speed_factor = runner.speed_factor,
            fixes = runner.fixes.len(),
            "runner staged"
        );
    }

    // Replay the whole field in timestamp order, one fix per correction
    let stream = interleave(&runners);
    info!(total_fixes = stream.len(), "race start");

    for (user_id, fix) in stream {
        let response = service
            .correct_location(CorrectionRequest {
                user_id: user_id.clone(),
                event_id: EVENT_ID.to_string(),
                event_detail_id: EVENT_DETAIL_ID.to_string(),
                fixes: vec![fix],
            })
            .await?;

        for reach in &response.checkpoint_reaches {
            info!(
                user_id = %user_id,
                cp_id = %reach.cp_id,
                split = %format_duration_hms(reach.segment_duration_s),
                elapsed = %format_duration_hms(reach.cumulative_time_s),
                "checkpoint"
            );
        }
    }

    // Final standings through the read-model view
    let view = service
        .get_event_detail(EVENT_ID, EVENT_DETAIL_ID, None)
        .await?;
    info!("final standings");
    for ranker in view.top_rankers.iter().take(args.top) {
        let name = ranker.name.as_deref().unwrap_or(&ranker.user_id);
        let bib = ranker.bib_number.as_deref().unwrap_or("-");
        let pace = pace_seconds_per_km(record.course.total_distance_m, ranker.cumulative_time_s)
            .map(format_pace_min_km)
            .unwrap_or_else(|| "-".to_string());
        info!(
            "{:>2}. {} (bib {}) cp={} time={} pace={}",
            ranker.rank,
            name,
            bib,
            ranker.cp_index,
            format_duration_hms(ranker.cumulative_time_s),
            pace
        );
    }

    Ok(())
}
