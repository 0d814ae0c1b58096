//! Fixed-step session driver for the external simulation engine.
//!
//! Owns the session state machine and the accumulator loop: host frames hand
//! over wall-clock time, the driver converts it into engine steps of a fixed
//! logical size and fans the processed results out to registered sinks.
//!
//! Steps run strictly in simulation-time order, one at a time; the per-frame
//! step cap bounds catch-up cost while the accumulator carries remainder time,
//! so a host frame-rate dip causes catch-up over subsequent frames rather
//! than time loss.
//!
//! Collaborators (engine handle, identity table via the normalizer) are
//! constructor-injected. Output goes through an observer list; there is no
//! global state and no retry of failed engine calls here.

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, warn};

use super::events::substitution_swap;
use super::normalizer::{normalize_step_events, SnapshotNormalizer};
use super::raw::{EngineAck, RawStepResponse, StepRequest};
use super::snapshot::{Score, StandardSnapshot};
use crate::error::{FeedError, Result};

/// Logical step size handed to the engine, in ms.
pub const STEP_MS: u64 = 250;

/// Upper bound on catch-up steps within one host frame.
pub const MAX_STEPS_PER_FRAME: u32 = 4;

/// Session lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Running,
    HalftimePaused,
    /// Waiting for a user decision; stepping resumes on `submit_action`.
    HeroDecisionPaused,
    Finished,
}

/// Synchronous handle into the external simulation engine.
///
/// Every call runs to completion within the same logical tick; there is no
/// suspension point and no interleaving between steps.
pub trait EngineHandle {
    /// Whether the engine can accept a session right now.
    fn is_ready(&self) -> bool {
        true
    }

    fn start(&mut self, request: &Value) -> EngineAck;

    fn step(&mut self, request: StepRequest) -> RawStepResponse;

    fn submit_action(&mut self, action: &Value) -> EngineAck;

    fn resume_second_half(&mut self);

    /// Final aggregate result; called once when the engine signals finished.
    fn finish(&mut self) -> Value;
}

/// One processed occurrence fanned out to sinks.
#[derive(Debug)]
pub enum SessionEvent<'a> {
    /// Session accepted by the engine.
    Started,
    /// Un-normalized per-tick payload, for pipelines that want raw data.
    RawTick(&'a RawStepResponse),
    /// Canonical per-tick snapshot.
    Snapshot(&'a StandardSnapshot),
    HalfTime { score: Score },
    /// The engine waits for a user decision; stepping is halted.
    DecisionRequired(&'a Value),
    /// Final aggregate result from the engine.
    Finished { result: &'a Value },
    /// Fatal mid-session engine error. The session is torn down, no retry.
    EngineError { message: &'a str, response: &'a RawStepResponse },
}

/// Observer for session output. Registered on the driver; called in
/// registration order, synchronously, on the stepping thread.
pub trait SessionSink {
    fn on_session_event(&mut self, event: &SessionEvent<'_>);
}

/// Driver tuning.
#[derive(Debug, Clone, Copy)]
pub struct DriverConfig {
    pub step_ms: u64,
    pub max_steps_per_frame: u32,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self { step_ms: STEP_MS, max_steps_per_frame: MAX_STEPS_PER_FRAME }
    }
}

/// Fixed-step driver for one match session.
pub struct SessionStepDriver {
    engine: Option<Box<dyn EngineHandle>>,
    normalizer: SnapshotNormalizer,
    sinks: Vec<Box<dyn SessionSink>>,
    config: DriverConfig,

    state: SessionState,
    accumulated_ms: f64,
    halftime_latched: bool,

    created_at: Instant,
    last_polled: Instant,
}

impl SessionStepDriver {
    /// Default session TTL in seconds (1 hour).
    pub const DEFAULT_TTL_SECS: u64 = 3600;

    pub fn new(
        engine: Option<Box<dyn EngineHandle>>,
        normalizer: SnapshotNormalizer,
        config: DriverConfig,
    ) -> Self {
        let now = Instant::now();
        Self {
            engine,
            normalizer,
            sinks: Vec::new(),
            config,
            state: SessionState::Idle,
            accumulated_ms: 0.0,
            halftime_latched: false,
            created_at: now,
            last_polled: now,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn SessionSink>) {
        self.sinks.push(sink);
    }

    /// Inject a fresh engine handle (after `stop()` or an error teardown).
    pub fn set_engine(&mut self, engine: Box<dyn EngineHandle>) {
        self.engine = Some(engine);
    }

    #[inline]
    pub fn state(&self) -> SessionState {
        self.state
    }

    #[inline]
    pub fn normalizer(&self) -> &SnapshotNormalizer {
        &self.normalizer
    }

    #[inline]
    pub fn normalizer_mut(&mut self) -> &mut SnapshotNormalizer {
        &mut self.normalizer
    }

    // =========================================================================
    // Session TTL tracking
    // =========================================================================

    /// Update the last polled timestamp (called on each advance).
    pub fn touch(&mut self) {
        self.last_polled = Instant::now();
    }

    /// Whether the session has not been polled within the default TTL.
    pub fn is_stale(&self) -> bool {
        self.is_stale_with_ttl(Self::DEFAULT_TTL_SECS)
    }

    pub fn is_stale_with_ttl(&self, ttl_secs: u64) -> bool {
        self.last_polled.elapsed().as_secs() >= ttl_secs
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn idle_time(&self) -> Duration {
        self.last_polled.elapsed()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a session. Fails with `EngineUnavailable` when no ready engine
    /// handle is attached, `EngineRejected` when the engine's start call
    /// reports failure. In both cases the driver stays `Idle`.
    pub fn start(&mut self, request: &Value) -> Result<()> {
        if self.state != SessionState::Idle {
            warn!("session start ignored: driver is {:?}", self.state);
            return Ok(());
        }

        let ack = match self.engine.as_mut() {
            Some(engine) if engine.is_ready() => engine.start(request),
            _ => return Err(FeedError::EngineUnavailable),
        };
        if !ack.success {
            return Err(FeedError::EngineRejected(ack.error));
        }

        self.accumulated_ms = 0.0;
        self.halftime_latched = false;
        self.normalizer.reset();
        self.state = SessionState::Running;
        info!("match session started");
        self.emit(SessionEvent::Started);
        Ok(())
    }

    /// Halt the session and release the engine handle. A new handle must be
    /// injected via `set_engine` before the next `start`.
    pub fn stop(&mut self) {
        if self.engine.take().is_some() {
            info!("match session stopped");
        }
        self.state = SessionState::Idle;
        self.accumulated_ms = 0.0;
        self.halftime_latched = false;
        self.normalizer.reset();
    }

    /// Forward a user decision to the engine and resume stepping.
    pub fn submit_action(&mut self, action: &Value) -> Result<()> {
        if self.state != SessionState::HeroDecisionPaused {
            warn!("submit_action ignored: driver is {:?}", self.state);
            return Ok(());
        }
        let ack = match self.engine.as_mut() {
            Some(engine) => engine.submit_action(action),
            None => return Err(FeedError::EngineUnavailable),
        };
        if !ack.error.is_empty() {
            return Err(FeedError::EngineStep(ack.error));
        }
        self.state = SessionState::Running;
        Ok(())
    }

    /// Resume play after the half-time pause.
    pub fn resume_second_half(&mut self) -> Result<()> {
        if self.state != SessionState::HalftimePaused {
            warn!("resume_second_half ignored: driver is {:?}", self.state);
            return Ok(());
        }
        match self.engine.as_mut() {
            Some(engine) => engine.resume_second_half(),
            None => return Err(FeedError::EngineUnavailable),
        }
        self.state = SessionState::Running;
        Ok(())
    }

    // =========================================================================
    // Stepping
    // =========================================================================

    /// Per-host-frame entry point. Accumulates elapsed wall time and runs at
    /// most `max_steps_per_frame` engine steps; remainder time carries over.
    pub fn advance(&mut self, elapsed_ms: f64) {
        self.touch();
        if self.state != SessionState::Running {
            return;
        }

        self.accumulated_ms += elapsed_ms.max(0.0);
        let step_ms = self.config.step_ms as f64;
        let mut steps_this_frame = 0u32;

        while self.accumulated_ms >= step_ms
            && steps_this_frame < self.config.max_steps_per_frame
            && self.state == SessionState::Running
        {
            self.accumulated_ms -= step_ms;
            steps_this_frame += 1;

            let response = match self.engine.as_mut() {
                Some(engine) => {
                    engine.step(StepRequest { max_dt_ms: self.config.step_ms as u32 })
                }
                None => return,
            };
            self.process_step_result(response);
        }
    }

    /// Process one engine step result, in order:
    /// error teardown, roster side effects, normalization, decision pause,
    /// half-time latch, finish.
    fn process_step_result(&mut self, response: RawStepResponse) {
        if response.is_error() {
            warn!("engine step error, tearing down session: {}", response.error);
            self.state = SessionState::Finished;
            let message = response.error.clone();
            self.emit(SessionEvent::EngineError { message: &message, response: &response });
            self.engine = None;
            return;
        }

        // Roster slot swaps land before normalization so the same tick's
        // snapshot already reflects the new occupant of the slot.
        let events = normalize_step_events(&response);
        for event in &events {
            if let Some((slot_out, slot_in)) = substitution_swap(event) {
                self.normalizer.identity_mut().apply_substitution(slot_out, slot_in, None);
            }
        }

        let snapshot = self.normalizer.ingest_step(&response, events);

        self.emit(SessionEvent::RawTick(&response));
        self.emit(SessionEvent::Snapshot(&snapshot));

        if response.paused || response.user_decision.is_some() {
            // Pending host time is discarded: a paused match must not
            // fast-forward on resume.
            self.accumulated_ms = 0.0;
            self.state = SessionState::HeroDecisionPaused;
            let decision = response.user_decision.clone().unwrap_or(Value::Null);
            self.emit(SessionEvent::DecisionRequired(&decision));
        } else if response.halftime && !self.halftime_latched {
            self.accumulated_ms = 0.0;
            self.halftime_latched = true;
            self.state = SessionState::HalftimePaused;
            self.emit(SessionEvent::HalfTime { score: snapshot.score });
        } else if response.finished {
            let result = match self.engine.as_mut() {
                Some(engine) => engine.finish(),
                None => Value::Null,
            };
            self.state = SessionState::Finished;
            info!("match session finished");
            self.emit(SessionEvent::Finished { result: &result });
            self.engine = None;
        }
    }

    fn emit(&mut self, event: SessionEvent<'_>) {
        for sink in &mut self.sinks {
            sink.on_session_event(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::identity::IdentityTable;
    use crate::pipeline::raw::{RawBall, RawSnapshotPayload};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct MockState {
        ready: bool,
        accept_start: bool,
        responses: VecDeque<RawStepResponse>,
        steps: u32,
        actions: Vec<Value>,
        resumed: bool,
        finished: bool,
    }

    struct MockEngine(Rc<RefCell<MockState>>);

    impl EngineHandle for MockEngine {
        fn is_ready(&self) -> bool {
            self.0.borrow().ready
        }

        fn start(&mut self, _request: &Value) -> EngineAck {
            if self.0.borrow().accept_start {
                EngineAck::ok()
            } else {
                EngineAck::failed("teams missing")
            }
        }

        fn step(&mut self, _request: StepRequest) -> RawStepResponse {
            let mut state = self.0.borrow_mut();
            state.steps += 1;
            let t_ms = state.steps as u64 * STEP_MS;
            state.responses.pop_front().unwrap_or_else(|| tick_response(t_ms))
        }

        fn submit_action(&mut self, action: &Value) -> EngineAck {
            self.0.borrow_mut().actions.push(action.clone());
            EngineAck::ok()
        }

        fn resume_second_half(&mut self) {
            self.0.borrow_mut().resumed = true;
        }

        fn finish(&mut self) -> Value {
            self.0.borrow_mut().finished = true;
            json!({"score_home": 2, "score_away": 1})
        }
    }

    fn tick_response(t_ms: u64) -> RawStepResponse {
        RawStepResponse {
            t_ms,
            snapshot: RawSnapshotPayload {
                ball: Some(RawBall { x: 52.5, y: 34.0, ..RawBall::default() }),
                ..RawSnapshotPayload::default()
            },
            ..RawStepResponse::default()
        }
    }

    #[derive(Default)]
    struct TagSink(Rc<RefCell<Vec<String>>>);

    impl SessionSink for TagSink {
        fn on_session_event(&mut self, event: &SessionEvent<'_>) {
            let tag = match event {
                SessionEvent::Started => "started".to_string(),
                SessionEvent::RawTick(r) => format!("raw:{}", r.t_ms),
                SessionEvent::Snapshot(s) => format!("snap:{}", s.t_ms),
                SessionEvent::HalfTime { .. } => "halftime".to_string(),
                SessionEvent::DecisionRequired(_) => "decision".to_string(),
                SessionEvent::Finished { .. } => "finished".to_string(),
                SessionEvent::EngineError { message, .. } => format!("error:{}", message),
            };
            self.0.borrow_mut().push(tag);
        }
    }

    fn driver_with(
        state: Rc<RefCell<MockState>>,
        tags: Rc<RefCell<Vec<String>>>,
    ) -> SessionStepDriver {
        let mut driver = SessionStepDriver::new(
            Some(Box::new(MockEngine(state))),
            SnapshotNormalizer::new(IdentityTable::default()),
            DriverConfig::default(),
        );
        driver.add_sink(Box::new(TagSink(tags)));
        driver
    }

    fn running_driver(state: Rc<RefCell<MockState>>) -> (SessionStepDriver, Rc<RefCell<Vec<String>>>) {
        state.borrow_mut().ready = true;
        state.borrow_mut().accept_start = true;
        let tags = Rc::new(RefCell::new(Vec::new()));
        let mut driver = driver_with(state, tags.clone());
        driver.start(&json!({})).unwrap();
        (driver, tags)
    }

    #[test]
    fn test_start_without_engine_is_unavailable() {
        let mut driver = SessionStepDriver::new(
            None,
            SnapshotNormalizer::new(IdentityTable::default()),
            DriverConfig::default(),
        );
        assert!(matches!(driver.start(&json!({})), Err(FeedError::EngineUnavailable)));
        assert_eq!(driver.state(), SessionState::Idle);
    }

    #[test]
    fn test_start_with_unready_engine_is_unavailable() {
        let state = Rc::new(RefCell::new(MockState { accept_start: true, ..MockState::default() }));
        let mut driver = driver_with(state, Rc::new(RefCell::new(Vec::new())));
        assert!(matches!(driver.start(&json!({})), Err(FeedError::EngineUnavailable)));
        assert_eq!(driver.state(), SessionState::Idle);
    }

    #[test]
    fn test_rejected_start_stays_idle() {
        let state = Rc::new(RefCell::new(MockState { ready: true, ..MockState::default() }));
        let mut driver = driver_with(state, Rc::new(RefCell::new(Vec::new())));
        match driver.start(&json!({})) {
            Err(FeedError::EngineRejected(message)) => assert_eq!(message, "teams missing"),
            other => panic!("expected EngineRejected, got {:?}", other),
        }
        assert_eq!(driver.state(), SessionState::Idle);
    }

    #[test]
    fn test_accumulator_steps_and_carries_remainder() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let (mut driver, _tags) = running_driver(state.clone());

        // 1250ms: capped at 4 steps, 250ms remainder carries over
        driver.advance(1250.0);
        assert_eq!(state.borrow().steps, 4);

        // 250ms more: remainder + new time = 2 further steps, no time lost
        driver.advance(250.0);
        assert_eq!(state.borrow().steps, 6);

        // Sub-step frames accumulate until a step boundary
        driver.advance(100.0);
        assert_eq!(state.borrow().steps, 6);
        driver.advance(150.0);
        assert_eq!(state.borrow().steps, 7);
    }

    #[test]
    fn test_snapshot_and_raw_emitted_per_tick() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let (mut driver, tags) = running_driver(state);

        driver.advance(250.0);
        let tags = tags.borrow();
        assert_eq!(tags.as_slice(), ["started", "raw:250", "snap:250"]);
    }

    #[test]
    fn test_halftime_latches_once() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            let mut half = tick_response(250);
            half.halftime = true;
            s.responses.push_back(half);
            // A later tick that still reports the flag must not re-trigger
            let mut again = tick_response(500);
            again.halftime = true;
            s.responses.push_back(again);
        }
        let (mut driver, tags) = running_driver(state.clone());

        driver.advance(250.0);
        assert_eq!(driver.state(), SessionState::HalftimePaused);
        assert_eq!(tags.borrow().last().map(String::as_str), Some("halftime"));

        // Paused: no stepping
        driver.advance(1000.0);
        assert_eq!(state.borrow().steps, 1);

        driver.resume_second_half().unwrap();
        assert!(state.borrow().resumed);
        assert_eq!(driver.state(), SessionState::Running);

        driver.advance(250.0);
        assert_eq!(driver.state(), SessionState::Running, "halftime latch must hold");
        assert_eq!(tags.borrow().iter().filter(|t| *t == "halftime").count(), 1);
    }

    #[test]
    fn test_decision_pause_and_submit_action() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            let mut pause = tick_response(250);
            pause.paused = true;
            pause.user_decision = Some(json!({"options": ["shoot", "pass"]}));
            s.responses.push_back(pause);
        }
        let (mut driver, tags) = running_driver(state.clone());

        driver.advance(1000.0);
        assert_eq!(driver.state(), SessionState::HeroDecisionPaused);
        // Processing halted after the pause tick
        assert_eq!(state.borrow().steps, 1);
        assert_eq!(tags.borrow().last().map(String::as_str), Some("decision"));

        driver.submit_action(&json!({"action": "shoot"})).unwrap();
        assert_eq!(driver.state(), SessionState::Running);
        assert_eq!(state.borrow().actions.len(), 1);

        driver.advance(250.0);
        assert_eq!(state.borrow().steps, 2);
    }

    #[test]
    fn test_step_error_tears_down_without_retry() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            let mut bad = tick_response(250);
            bad.error = "engine panicked".to_string();
            s.responses.push_back(bad);
        }
        let (mut driver, tags) = running_driver(state.clone());

        driver.advance(1000.0);
        assert_eq!(driver.state(), SessionState::Finished);
        assert_eq!(state.borrow().steps, 1, "no retry after an error");
        assert_eq!(tags.borrow().last().map(String::as_str), Some("error:engine panicked"));

        // Engine handle released: further frames are inert
        driver.advance(1000.0);
        assert_eq!(state.borrow().steps, 1);
    }

    #[test]
    fn test_finished_invokes_engine_finish() {
        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            let mut last = tick_response(250);
            last.finished = true;
            s.responses.push_back(last);
        }
        let (mut driver, tags) = running_driver(state.clone());

        driver.advance(250.0);
        assert_eq!(driver.state(), SessionState::Finished);
        assert!(state.borrow().finished);
        assert_eq!(tags.borrow().last().map(String::as_str), Some("finished"));
    }

    #[test]
    fn test_substitution_applies_before_snapshot() {
        let roster = serde_json::from_value(json!({
            "home": {"players": [
                {"id": 5, "name": "Starter", "position": "CM", "number": 8},
                {"id": 7, "name": "Other", "position": "LW", "number": 11}
            ]},
            "away": {"players": []}
        }))
        .unwrap();

        let state = Rc::new(RefCell::new(MockState::default()));
        {
            let mut s = state.borrow_mut();
            let mut sub_tick = tick_response(250);
            sub_tick.events = vec![json!({
                "type": "substitution", "team_id": 0,
                "player_track_id": 5, "in_player": 7
            })];
            s.responses.push_back(sub_tick);
        }
        state.borrow_mut().ready = true;
        state.borrow_mut().accept_start = true;

        let mut driver = SessionStepDriver::new(
            Some(Box::new(MockEngine(state))),
            SnapshotNormalizer::new(IdentityTable::from_roster(&roster)),
            DriverConfig::default(),
        );
        driver.start(&json!({})).unwrap();
        driver.advance(250.0);

        // The same tick's identity table already reflects the swap
        assert_eq!(driver.normalizer().identity().slot(5).name, "Other");
        assert_eq!(driver.normalizer().identity().slot(7).name, "Starter");
    }

    #[test]
    fn test_stop_releases_engine_and_resets() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let (mut driver, _tags) = running_driver(state.clone());
        driver.advance(250.0);

        driver.stop();
        assert_eq!(driver.state(), SessionState::Idle);
        driver.advance(1000.0);
        assert_eq!(state.borrow().steps, 1, "stopped driver must not step");

        // Idle without an engine: start reports unavailable
        assert!(matches!(driver.start(&json!({})), Err(FeedError::EngineUnavailable)));
    }

    #[test]
    fn test_ttl_tracking() {
        let state = Rc::new(RefCell::new(MockState::default()));
        let (mut driver, _tags) = running_driver(state);
        assert!(!driver.is_stale());
        assert!(driver.is_stale_with_ttl(0));
        driver.touch();
        assert!(driver.idle_time() <= driver.age());
    }
}
