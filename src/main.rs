//! Neon Arena headless demo
//!
//! Runs the simulation with the autopilot flying the player, mirrors engine
//! events to the logger, and folds the finished session into a local stats
//! file. Useful for watching the AI systems interact without a renderer.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use glam::Vec2;

use neon_arena::consts::MAX_FRAME_DT;
use neon_arena::sim::{Bounds, Engine, EngineEvent, EventSink, LogSeverity, TickInput};
use neon_arena::GlobalStats;

const STATS_FILE: &str = "neon-arena-stats.json";
/// Simulated seconds to run when no duration argument is given
const DEFAULT_DURATION: f64 = 60.0;

/// Mirrors engine events to the logger and captures the session summary
struct LogSink {
    summary: Option<neon_arena::sim::SessionSummary>,
}

impl EventSink for LogSink {
    fn emit(&mut self, event: EngineEvent) {
        match event {
            EngineEvent::Log {
                t,
                message,
                severity,
            } => match severity {
                LogSeverity::Error => log::error!("[{t:7.2}] {message}"),
                LogSeverity::Warning => log::warn!("[{t:7.2}] {message}"),
                _ => log::info!("[{t:7.2}] {message}"),
            },
            EngineEvent::CoachTip(tip) => log::info!("coach: {}", tip.message),
            EngineEvent::ScoreChanged(score) => log::debug!("score: {score}"),
            EngineEvent::GameOver => log::warn!("game over"),
            EngineEvent::SessionEnded(summary) => self.summary = Some(summary),
            _ => {}
        }
    }
}

fn load_stats(path: &Path) -> GlobalStats {
    match std::fs::read_to_string(path) {
        Ok(json) => GlobalStats::from_json(&json),
        Err(_) => GlobalStats::new(),
    }
}

fn save_stats(path: &Path, stats: &GlobalStats) {
    match stats.to_json() {
        Ok(json) => {
            if let Err(err) = std::fs::write(path, json) {
                log::warn!("could not persist stats: {err}");
            }
        }
        Err(err) => log::warn!("could not serialize stats: {err}"),
    }
}

fn main() {
    env_logger::init();

    let duration: f64 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(DEFAULT_DURATION);
    let seed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0)
        ^ u64::from(std::process::id());

    let stats_path = Path::new(STATS_FILE);
    let mut stats = load_stats(stats_path);
    log::info!(
        "lifetime: {} games, best score {}, K/D {:.2}",
        stats.games_played,
        stats.best_score,
        stats.global_kd()
    );

    let mut engine = Engine::new(Bounds::default(), seed);
    let mut sink = LogSink { summary: None };
    engine.start(&mut sink);

    // Hand the controls to the autopilot
    let enable_autopilot = TickInput {
        toggle_autopilot: true,
        toggle_aim_assist: true,
        ..Default::default()
    };
    engine.update(&enable_autopilot, MAX_FRAME_DT, &mut sink);

    let input = TickInput {
        pointer: Vec2::new(640.0, 360.0),
        ..Default::default()
    };
    while engine.clock() < duration && !engine.is_game_over() {
        engine.update(&input, MAX_FRAME_DT, &mut sink);
    }

    // Gather reports before a restart wipes the adaptive state
    let report = engine.difficulty().performance_report();
    log::info!(
        "session: K/D {:.2}, accuracy {:.1}%, difficulty {:.2}",
        report.kd_ratio,
        report.accuracy,
        report.difficulty
    );
    log::info!("advice: {}", report.suggestion);

    let review = engine.review().generate_review(engine.clock());
    log::info!("tier: {:?}", review.tier);
    for line in review.summary.lines() {
        log::info!("review: {line}");
    }

    if !engine.is_game_over() {
        // Run ended on time; restarting reports the session outward
        engine.restart(&mut sink);
    }

    if let Some(summary) = sink.summary {
        stats.record_session(&summary);
        save_stats(stats_path, &stats);
        log::info!(
            "session saved: {} kills, score {}",
            summary.kills,
            summary.final_score
        );
    }
}
