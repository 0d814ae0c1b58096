//! Pitchfeed CLI
//!
//! Drives the full visualization pipeline against a scripted in-process
//! engine and reports feed statistics; also converts replay containers to
//! JSON for inspection.

use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};

use pf_core::pipeline::{
    DriverConfig, EngineAck, EngineHandle, IdentityTable, PipelinePreset, RawSnapshotPayload,
    RawStepResponse, SessionEvent, SessionSink, SessionState, SessionStepDriver,
    SnapshotNormalizer, StepRequest, ViewFeed,
};
use pf_core::replay::{load_replay, save_replay, ReplayDoc, ReplayFrame};

#[derive(Parser)]
#[command(name = "pf_cli")]
#[command(about = "Drive the pitchfeed pipeline or inspect replay files", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a scripted match through the full pipeline
    Run {
        /// Simulated match length in minutes
        #[arg(long, default_value = "5")]
        minutes: u32,

        /// Preset name: smooth, balanced, performance
        #[arg(long, default_value = "balanced")]
        preset: String,

        /// Host frame length in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u32,

        /// Print a board summary at the end
        #[arg(long, default_value = "false")]
        board: bool,

        /// Record emitted snapshots into a replay container
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },

    /// Dump a replay container file as JSON
    ReplayDump {
        /// Input replay container path
        #[arg(long)]
        r#in: PathBuf,

        /// Output JSON path (stdout when omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Run { minutes, preset, frame_ms, board, save_replay } => {
            run_scripted_match(minutes, &preset, frame_ms, board, save_replay)
        }
        Commands::ReplayDump { r#in, out } => dump_replay(&r#in, out.as_deref()),
    }
}

// ============================================================================
// Scripted engine
// ============================================================================

/// Deterministic stand-in for the simulation engine: players orbit their
/// formation anchors, the ball traces a Lissajous figure, a pass event fires
/// every 15 seconds and the two wire shapes alternate.
struct ScriptedEngine {
    t_ms: u64,
    half_ms: u64,
    full_ms: u64,
    score_home: u32,
}

impl ScriptedEngine {
    fn new(minutes: u32) -> Self {
        let full_ms = minutes as u64 * 60_000;
        Self { t_ms: 0, half_ms: full_ms / 2, full_ms, score_home: 0 }
    }

    fn player_entry(&self, track_id: usize, t_s: f32) -> Value {
        let local = (track_id % 11) as f32;
        let anchor_x = 12.0 + local * 8.0;
        let anchor_y = if track_id < 11 { 22.0 } else { 46.0 };
        let phase = track_id as f32 * 0.7;
        json!({
            "id": track_id,
            "x": anchor_x + 4.0 * (t_s * 0.6 + phase).sin(),
            "y": anchor_y + 3.0 * (t_s * 0.4 + phase).cos(),
            "vx": 2.4 * (t_s * 0.6 + phase).cos(),
            "vy": -1.2 * (t_s * 0.4 + phase).sin(),
            "state": if track_id % 3 == 0 { "run" } else { "walk" },
            "stamina": (1.0 - t_s / 7200.0).max(0.2),
            "team_id": if track_id < 11 { 0 } else { 1 }
        })
    }

    fn tick_events(&mut self) -> Vec<Value> {
        let mut events = Vec::new();
        if self.t_ms % 15_000 == 0 {
            let passer = ((self.t_ms / 15_000) % 11) as u32;
            // Alternate the two wire shapes the adapter must accept
            if (self.t_ms / 15_000) % 2 == 0 {
                events.push(json!({
                    "type": "pass", "t_ms": self.t_ms, "team_id": 0,
                    "player_track_id": passer, "receiver_id": (passer + 1) % 11,
                    "x": 40.0, "y": 30.0
                }));
            } else {
                events.push(json!({
                    "type": "pass", "t_ms": self.t_ms,
                    "data": {
                        "team_id": 1, "player": format!("A{}", passer % 11),
                        "x": 60.0, "y": 40.0
                    }
                }));
            }
        }
        if self.t_ms == self.half_ms / 2 {
            self.score_home += 1;
            events.push(json!({
                "type": "goal", "t_ms": self.t_ms, "team_id": 0,
                "player_track_id": 9, "x": 103.0, "y": 34.0
            }));
        }
        events
    }
}

impl EngineHandle for ScriptedEngine {
    fn start(&mut self, _request: &Value) -> EngineAck {
        EngineAck::ok()
    }

    fn step(&mut self, request: StepRequest) -> RawStepResponse {
        self.t_ms += request.max_dt_ms as u64;
        let t_s = self.t_ms as f32 / 1000.0;

        let players: Vec<_> = (0..22)
            .map(|i| serde_json::from_value(self.player_entry(i, t_s)).unwrap_or_default())
            .collect();
        let ball = serde_json::from_value(json!({
            "x": 52.5 + 40.0 * (t_s * 0.3).sin(),
            "y": 34.0 + 20.0 * (t_s * 0.45).cos(),
            "vx": 12.0 * (t_s * 0.3).cos(),
            "vy": -9.0 * (t_s * 0.45).sin(),
            "height": (2.0 * (t_s * 0.9).sin()).max(0.0)
        }))
        .unwrap_or_default();

        let events = self.tick_events();

        RawStepResponse {
            t_ms: self.t_ms,
            snapshot: RawSnapshotPayload {
                ball: Some(ball),
                players: Some(players),
                score_home: self.score_home,
                score_away: 0,
                ..RawSnapshotPayload::default()
            },
            events,
            halftime: self.t_ms == self.half_ms,
            finished: self.t_ms >= self.full_ms,
            ..RawStepResponse::default()
        }
    }

    fn submit_action(&mut self, _action: &Value) -> EngineAck {
        EngineAck::ok()
    }

    fn resume_second_half(&mut self) {}

    fn finish(&mut self) -> Value {
        json!({"score_home": self.score_home, "score_away": 0, "duration_ms": self.t_ms})
    }
}

// ============================================================================
// run
// ============================================================================

struct SharedFeed(Rc<RefCell<ViewFeed>>);

impl SessionSink for SharedFeed {
    fn on_session_event(&mut self, event: &SessionEvent<'_>) {
        self.0.borrow_mut().on_session_event(event);
    }
}

fn sample_roster() -> pf_core::RosterDoc {
    let team = |prefix: &str| -> Value {
        let roles = ["GK", "LB", "CB", "CB", "RB", "LM", "CM", "CM", "RM", "ST", "ST"];
        json!({
            "name": format!("{} XI", prefix),
            "players": roles.iter().enumerate().map(|(i, role)| json!({
                "id": i, "name": format!("{} {}", prefix, i + 1),
                "position": role, "number": i + 1
            })).collect::<Vec<_>>()
        })
    };
    serde_json::from_value(json!({"home": team("Home"), "away": team("Away")}))
        .unwrap_or_default()
}

fn run_scripted_match(
    minutes: u32,
    preset_name: &str,
    frame_ms: u32,
    board: bool,
    save_path: Option<PathBuf>,
) -> Result<()> {
    let preset = PipelinePreset::from_name_str(preset_name)
        .ok_or_else(|| anyhow!("unknown preset: {}", preset_name))?;

    let feed = Rc::new(RefCell::new(ViewFeed::new(&preset)));
    feed.borrow_mut().set_board_export_enabled(board);

    let identity = IdentityTable::from_roster(&sample_roster());
    let mut driver = SessionStepDriver::new(
        Some(Box::new(ScriptedEngine::new(minutes))),
        SnapshotNormalizer::new(identity),
        DriverConfig::default(),
    );
    driver.add_sink(Box::new(SharedFeed(feed.clone())));

    driver.start(&json!({"minutes": minutes}))?;

    let mut replay = ReplayDoc::default();
    let mut host_frames = 0u64;
    let mut emitted_frames = 0u64;
    let mut event_count = 0u64;

    while driver.state() != SessionState::Finished {
        driver.advance(frame_ms as f64);
        host_frames += 1;

        if driver.state() == SessionState::HalftimePaused {
            println!("half-time reached, resuming second half");
            driver.resume_second_half()?;
        }

        for frame in feed.borrow_mut().drain_frames() {
            emitted_frames += 1;
            event_count += frame.snapshot.events.len() as u64;
            for event in &frame.snapshot.events {
                println!(
                    "  {:>2}' {:<12} team={} player={}",
                    event.minute, event.kind, event.team_id, event.player_track_id
                );
            }
            if save_path.is_some() {
                replay.frames.push(ReplayFrame::from_snapshot(&frame.snapshot));
            }
        }

        // Safety valve against a scripted engine that never finishes
        if host_frames > minutes as u64 * 60_000 {
            return Err(anyhow!("scripted match did not finish"));
        }
    }

    let stats = feed.borrow().stats();
    println!("\n=== Feed summary ({} simulated minutes, preset {}) ===", minutes, preset_name);
    println!("host frames:      {}", host_frames);
    println!("frames emitted:   {}", emitted_frames);
    println!(
        "delta filter:     {} emitted / {} dropped",
        stats.delta.emitted, stats.delta.dropped
    );
    println!(
        "priority split:   {} high / {} low (cumulative)",
        stats.aoi.high_total, stats.aoi.low_total
    );
    println!("events surfaced:  {}", event_count);

    if board {
        let summary = feed.borrow().board().to_summary_export(5);
        println!(
            "board:            {}x{} cells, occupancy max {:.1}",
            summary.cols, summary.rows, summary.occupancy_max
        );
    }

    if let Some(path) = save_path {
        let frames = replay.frames.len();
        save_replay(&replay, &path)
            .with_context(|| format!("failed to write replay to {}", path.display()))?;
        println!("replay saved:     {} frames -> {}", frames, path.display());
    }

    Ok(())
}

// ============================================================================
// replay-dump
// ============================================================================

fn dump_replay(input: &std::path::Path, out: Option<&std::path::Path>) -> Result<()> {
    let doc = load_replay(input)
        .with_context(|| format!("failed to read replay from {}", input.display()))?;

    let json = serde_json::to_string_pretty(&doc)?;
    match out {
        Some(path) => {
            std::fs::write(path, &json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "dumped {} frames ({} tracks) -> {}",
                doc.frames.len(),
                doc.meta.track_count,
                path.display()
            );
        }
        None => println!("{}", json),
    }
    Ok(())
}
