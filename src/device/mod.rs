//! The emulated device: button transitions, the bytecode scheduler, glyph
//! runs, and recording playback.
//!
//! [`Emulator`] is a cheap `Clone` handle around one shared state. All state
//! lives behind a single mutex that is never held across an `.await`, so every
//! timer callback runs to completion before the next one observes the state.
//! Transport sends are spawned and never block a callback.
//!
//! Every method that schedules work (`press_down`, `add_code`, `run`,
//! `send_glyph`, `play`) must be called from within a Tokio runtime.

pub mod events;
pub mod task;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{Config, TimingConfig};
use crate::error::{EmulatorError, Result};
use crate::models::recording::validate_entries;
use crate::models::{CellTarget, EventType, Glyph, PressOutcome, Recording, RecordingEntry};
use crate::services::{
    compile_script, ButtonInfo, ButtonRegistry, GlyphBook, Processor, Recorder, RecordingSummary,
    SaveOutcome, ScriptSource, INITIALIZE_CODE,
};
use crate::transport::{self, Transport};

use events::EventLog;
pub use events::{DeviceEvent, EventPage, LoggedEvent};
use task::sleep_or_cancel;
pub use task::{CancelToken, RunOutcome, TaskHandle};

const EVENT_CAPACITY: usize = 1024;
const EVENT_LOG_CAPACITY: usize = 1024;

/// Mutable device state. Only touched through [`Emulator::state`].
#[derive(Debug)]
struct DeviceState {
    registry: ButtonRegistry,
    processor: Processor,
    recorder: Recorder,
    target: Option<CellTarget>,
    scheduler: Vec<JoinHandle<()>>,
    glyph_run: Option<GlyphRun>,
    playback_run: Option<CancelToken>,
}

/// The glyph run currently allowed to mark a cell.
#[derive(Debug)]
struct GlyphRun {
    token: CancelToken,
    target: CellTarget,
}

struct Inner {
    state: Mutex<DeviceState>,
    glyphs: GlyphBook,
    transport: Arc<dyn Transport>,
    timing: TimingConfig,
    events: broadcast::Sender<DeviceEvent>,
    log: Mutex<EventLog>,
}

/// Handle to the emulated device.
#[derive(Clone)]
pub struct Emulator {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Emulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Emulator")
            .field("transport", &self.inner.transport.name())
            .field("timing", &self.inner.timing)
            .finish_non_exhaustive()
    }
}

impl Emulator {
    /// Creates an emulator. The scheduler is idle until [`Emulator::run`].
    pub fn new(
        registry: ButtonRegistry,
        glyphs: GlyphBook,
        transport: Arc<dyn Transport>,
        timing: TimingConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let state = DeviceState {
            registry,
            processor: Processor::new(),
            recorder: Recorder::new(),
            target: None,
            scheduler: Vec::new(),
            glyph_run: None,
            playback_run: None,
        };

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(state),
                glyphs,
                transport,
                timing,
                events,
                log: Mutex::new(EventLog::new(EVENT_LOG_CAPACITY)),
            }),
        }
    }

    /// Builds the emulator described by `config`: default layout with the
    /// configured overrides, the embedded glyph book, and the configured
    /// transport.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let registry = ButtonRegistry::with_overrides(&config.buttons);
        let glyphs = GlyphBook::load()?;
        let transport = transport::from_config(&config.transport)?;
        Ok(Self::new(registry, glyphs, transport, config.timing.clone()))
    }

    fn state(&self) -> MutexGuard<'_, DeviceState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: DeviceEvent) {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }

    /// Subscribes to device events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<DeviceEvent> {
        self.inner.events.subscribe()
    }

    /// Recent events starting at sequence number `offset`, for polling.
    #[must_use]
    pub fn events_since(&self, offset: u64, limit: usize) -> EventPage {
        self.inner
            .log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .page(offset, limit)
    }

    /// Timer settings in use.
    #[must_use]
    pub fn timing(&self) -> &TimingConfig {
        &self.inner.timing
    }

    /// The glyph book.
    #[must_use]
    pub fn glyphs(&self) -> &GlyphBook {
        &self.inner.glyphs
    }

    // ------------------------------------------------------------------
    // Scheduler
    // ------------------------------------------------------------------

    /// Starts the flush and holdings-refresh tasks. Calling it again while
    /// they run does nothing.
    pub fn run(&self) {
        let mut state = self.state();
        if !state.scheduler.is_empty() {
            return;
        }

        let flush_period = self.inner.timing.flush_interval();
        let flusher = self.clone();
        let flush_task = tokio::spawn(async move {
            let mut ticker = interval(flush_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                flusher.flush();
            }
        });

        let hold_period = self.inner.timing.holdings_interval();
        let refresher = self.clone();
        let holdings_task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + hold_period, hold_period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                refresher.refresh_holdings();
            }
        });

        state.scheduler = vec![flush_task, holdings_task];
        info!(
            "Scheduler running (flush every {flush_period:?}, holdings every {hold_period:?})"
        );
    }

    /// Whether the scheduler tasks are running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.state().scheduler.is_empty()
    }

    /// Stops the scheduler, cancels glyph and playback runs, and sends
    /// whatever is still pending.
    pub async fn shutdown(&self) {
        let pending = {
            let mut state = self.state();
            for task in state.scheduler.drain(..) {
                task.abort();
            }
            if let Some(run) = state.glyph_run.take() {
                run.token.cancel();
                self.emit(DeviceEvent::GlyphCleared { target: run.target });
            }
            if let Some(token) = state.playback_run.take() {
                token.cancel();
            }
            state.processor.drain()
        };

        if let Some(bytecode) = pending {
            self.send_now(bytecode).await;
        }
        info!("Scheduler stopped");
    }

    /// Enqueues `code` now and `count - 1` more times, one replication delay
    /// apart, without blocking.
    pub fn add_code(&self, code: &str, count: u32) {
        if count == 0 {
            return;
        }
        self.state().processor.enqueue(code);

        if count > 1 {
            let emulator = self.clone();
            let code = code.to_string();
            let delay = self.inner.timing.replication_delay();
            tokio::spawn(async move {
                for _ in 1..count {
                    tokio::time::sleep(delay).await;
                    emulator.state().processor.enqueue(code.clone());
                }
            });
        }
    }

    /// One flush step: sends every pending code as one transmission.
    /// Returns the transmitted bytecode, if any.
    pub fn flush(&self) -> Option<String> {
        let bytecode = self.state().processor.drain()?;
        self.transmit(bytecode.clone());
        Some(bytecode)
    }

    /// One holdings refresh: enqueues the code of every held button once.
    pub fn refresh_holdings(&self) -> usize {
        self.state().processor.enqueue_holdings()
    }

    /// Codes waiting for the next flush.
    #[must_use]
    pub fn pending(&self) -> Vec<String> {
        self.state().processor.pending().to_vec()
    }

    /// Ids of the buttons being refreshed.
    #[must_use]
    pub fn held_buttons(&self) -> Vec<String> {
        self.state()
            .processor
            .held_ids()
            .into_iter()
            .map(str::to_string)
            .collect()
    }

    /// Sends the initialise code straight to the transport, bypassing the queue.
    pub fn initialize(&self) {
        info!("Initializing device");
        self.transmit(INITIALIZE_CODE.to_string());
    }

    fn transmit(&self, bytecode: String) {
        let emulator = self.clone();
        tokio::spawn(async move { emulator.send_now(bytecode).await });
    }

    async fn send_now(&self, bytecode: String) {
        let transport = Arc::clone(&self.inner.transport);
        match transport.send(bytecode.clone()).await {
            Ok(()) => {
                debug!("Sent {bytecode:?} via {}", transport.name());
                self.emit(DeviceEvent::Transmitted { bytecode });
            }
            Err(e) => {
                let failure = EmulatorError::TransportFailure(e.to_string());
                error!("Failed to send {bytecode:?}: {failure}");
                self.emit(DeviceEvent::TransmitFailed {
                    bytecode,
                    error: failure.to_string(),
                });
            }
        }
    }

    // ------------------------------------------------------------------
    // Buttons
    // ------------------------------------------------------------------

    /// Registered buttons with their hold status.
    #[must_use]
    pub fn buttons(&self) -> Vec<ButtonInfo> {
        self.state().registry.list()
    }

    /// Whether a button id is registered.
    #[must_use]
    pub fn has_button(&self, id: &str) -> bool {
        self.state().registry.contains(id)
    }

    /// Presses a button down. Returns the previous hold status.
    pub fn press_down(&self, id: &str) -> Result<bool> {
        let (outcome, burst) = {
            let mut state = self.state();
            self.apply_press(&mut state, id, false)?
        };
        self.send_burst(burst);
        Ok(outcome.was_holding)
    }

    /// Releases a button. Returns true if it left the held set.
    pub fn press_up(&self, id: &str) -> Result<bool> {
        let mut state = self.state();
        self.apply_release(&mut state, id)
    }

    /// Toggles a hold on a button. Returns the previous hold status.
    ///
    /// Turning a hold off stops the refresh immediately; the release that
    /// usually follows is then a no-op.
    pub fn hold_down(&self, id: &str) -> Result<bool> {
        let (outcome, burst) = {
            let mut state = self.state();
            self.apply_press(&mut state, id, true)?
        };
        self.send_burst(burst);
        Ok(outcome.was_holding)
    }

    /// Press then release in one step.
    fn pulse(&self, id: &str) -> Result<()> {
        let burst = {
            let mut state = self.state();
            let (_, burst) = self.apply_press(&mut state, id, false)?;
            self.apply_release(&mut state, id)?;
            burst
        };
        self.send_burst(burst);
        Ok(())
    }

    fn apply_press(
        &self,
        state: &mut DeviceState,
        id: &str,
        hold: bool,
    ) -> Result<(PressOutcome, Option<String>)> {
        let button = state.registry.get_mut(id)?;
        let outcome = if hold {
            button.hold_down()
        } else {
            button.press_down()
        };
        if outcome.ended {
            self.end_activation(state, id);
            return Ok((outcome, None));
        }
        if !outcome.began {
            return Ok((outcome, None));
        }

        let code = button.code().to_string();
        state.processor.add_hold(id, &code);
        state
            .recorder
            .capture(id, EventType::Down, Instant::now());
        self.emit(DeviceEvent::ButtonActive { id: id.to_string() });
        Ok((outcome, Some(code)))
    }

    fn apply_release(&self, state: &mut DeviceState, id: &str) -> Result<bool> {
        let outcome = state.registry.get_mut(id)?.press_up();
        Ok(outcome.released && self.end_activation(state, id))
    }

    /// Releases a button even if it is latched.
    fn force_release(&self, id: &str) -> Result<bool> {
        let mut state = self.state();
        state.registry.get_mut(id)?.force_release();
        Ok(self.end_activation(&mut state, id))
    }

    /// Stops refreshing `id` and reports the UP. False if it was not held.
    fn end_activation(&self, state: &mut DeviceState, id: &str) -> bool {
        if !state.processor.remove_hold(id) {
            return false;
        }
        state.recorder.capture(id, EventType::Up, Instant::now());
        self.emit(DeviceEvent::ButtonInactive { id: id.to_string() });
        true
    }

    fn send_burst(&self, code: Option<String>) {
        if let Some(code) = code {
            self.add_code(&code, self.inner.timing.replication_count);
        }
    }

    // ------------------------------------------------------------------
    // Target context and glyphs
    // ------------------------------------------------------------------

    /// Sets the cell glyphs are typed into.
    pub fn set_target(&self, target: CellTarget) {
        debug!("Target set to {target}");
        self.state().target = Some(target);
    }

    /// Clears the target cell.
    pub fn clear_target(&self) {
        self.state().target = None;
    }

    /// The current target cell.
    #[must_use]
    pub fn target(&self) -> Option<CellTarget> {
        self.state().target
    }

    /// Pulses the dots of glyph `id` into the current target, one step delay
    /// apart. Returns `None` when no target is set. A run still in progress
    /// is cancelled first.
    pub fn send_glyph(&self, id: &str) -> Result<Option<TaskHandle>> {
        let glyph = self
            .inner
            .glyphs
            .get(id)
            .cloned()
            .ok_or_else(|| EmulatorError::UnknownGlyph(id.to_string()))?;

        let token = CancelToken::new();
        let target = {
            let mut state = self.state();
            let Some(target) = state.target else {
                debug!("No target cell; ignoring glyph {id:?}");
                return Ok(None);
            };
            let run = GlyphRun {
                token: token.clone(),
                target,
            };
            if let Some(previous) = state.glyph_run.replace(run) {
                previous.token.cancel();
                // Emitted under the lock so it precedes the new run's markers.
                self.emit(DeviceEvent::GlyphCleared {
                    target: previous.target,
                });
            }
            target
        };

        info!("Sending {glyph} to {target}");
        let emulator = self.clone();
        let run_token = token.clone();
        let join =
            tokio::spawn(async move { emulator.glyph_run(glyph, target, run_token).await });
        Ok(Some(TaskHandle::new(token, join)))
    }

    async fn glyph_run(&self, glyph: Glyph, target: CellTarget, token: CancelToken) -> RunOutcome {
        let step = self.inner.timing.glyph_step();

        for dot in &glyph.dots {
            if token.is_cancelled() {
                return self.finish_glyph(target, &token, RunOutcome::Cancelled);
            }

            let button_id = target.button_id(*dot);
            match self.pulse(&button_id) {
                Ok(()) => self.emit_marker(&token, DeviceEvent::GlyphDotMarked { target, button_id }),
                Err(e) => error!("Glyph {:?} on {target}: {e}", glyph.id),
            }

            if !sleep_or_cancel(&token, step).await {
                return self.finish_glyph(target, &token, RunOutcome::Cancelled);
            }
        }

        self.emit_marker(
            &token,
            DeviceEvent::GlyphCompleted {
                target,
                glyph: glyph.id.clone(),
            },
        );

        let outcome = if sleep_or_cancel(&token, self.inner.timing.glyph_visible()).await {
            RunOutcome::Completed
        } else {
            RunOutcome::Cancelled
        };
        self.finish_glyph(target, &token, outcome)
    }

    /// Emits a glyph marker unless the run was cancelled. Checked under the
    /// state lock, where a replaced run's markers are cleared.
    fn emit_marker(&self, token: &CancelToken, event: DeviceEvent) {
        let _state = self.state();
        if !token.is_cancelled() {
            self.emit(event);
        }
    }

    /// Whoever takes a run out of the state clears its markers.
    fn finish_glyph(&self, target: CellTarget, token: &CancelToken, outcome: RunOutcome) -> RunOutcome {
        if outcome == RunOutcome::Cancelled {
            debug!("Glyph run on {target} cancelled");
        }
        let mut state = self.state();
        if state.glyph_run.as_ref().is_some_and(|run| run.token.same_as(token)) {
            state.glyph_run = None;
            self.emit(DeviceEvent::GlyphCleared { target });
        }
        outcome
    }

    /// Cancels the glyph run in progress and clears its markers. Returns false
    /// if none was running.
    pub fn cancel_glyph(&self) -> bool {
        let mut state = self.state();
        match state.glyph_run.take() {
            Some(run) => {
                run.token.cancel();
                self.emit(DeviceEvent::GlyphCleared { target: run.target });
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Recording and playback
    // ------------------------------------------------------------------

    /// Starts a capture session. Returns false if one is already running.
    pub fn start_recording(&self) -> bool {
        let started = self.state().recorder.start();
        if started {
            self.emit(DeviceEvent::RecordingStarted);
        }
        started
    }

    /// Stops the capture session and saves it under `name`.
    pub fn stop_recording(&self, name: Option<&str>) -> Option<SaveOutcome> {
        let outcome = self.state().recorder.stop(name);
        if let Some(outcome) = &outcome {
            self.emit_save(outcome);
        }
        outcome
    }

    /// Starts a session if none is active, otherwise stops and saves it.
    pub fn toggle_recording(&self, name: Option<&str>) -> Option<SaveOutcome> {
        if self.is_recording() {
            self.stop_recording(name)
        } else {
            self.start_recording();
            None
        }
    }

    fn emit_save(&self, outcome: &SaveOutcome) {
        match outcome {
            SaveOutcome::Saved { index, name } => self.emit(DeviceEvent::RecordingSaved {
                index: *index,
                name: name.clone(),
            }),
            SaveOutcome::Discarded => self.emit(DeviceEvent::RecordingDiscarded),
        }
    }

    /// Whether a capture session is active.
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.state().recorder.is_recording()
    }

    /// Catalog listing.
    #[must_use]
    pub fn recordings(&self) -> Vec<RecordingSummary> {
        self.state().recorder.summaries()
    }

    /// A copy of one saved recording.
    pub fn recording(&self, index: usize) -> Result<Recording> {
        self.state().recorder.get(index).cloned()
    }

    /// Adds externally supplied entries to the catalog.
    pub fn import_recording(&self, name: &str, entries: Vec<RecordingEntry>) -> Result<usize> {
        self.state().recorder.import(name, entries)
    }

    /// Replays a saved recording.
    pub fn play(&self, index: usize) -> Result<TaskHandle> {
        let (name, entries) = {
            let state = self.state();
            let recording = state
                .recorder
                .playable(index, |id| state.registry.contains(id))?;
            (recording.name.clone(), recording.entries.clone())
        };
        Ok(self.start_playback(name, entries))
    }

    /// Replays entries that are not in the catalog, such as a compiled script.
    pub fn play_entries(&self, name: &str, entries: Vec<RecordingEntry>) -> Result<TaskHandle> {
        {
            let state = self.state();
            if state.recorder.is_recording() {
                return Err(EmulatorError::PlaybackConflict);
            }
            validate_entries(name, &entries, |id| state.registry.contains(id))?;
        }
        Ok(self.start_playback(name.to_string(), entries))
    }

    /// Compiles a script against the registry without playing it.
    #[must_use]
    pub fn compile(&self, actions: &[crate::models::ScriptAction]) -> Vec<RecordingEntry> {
        let state = self.state();
        compile_script(actions, &state.registry, self.inner.timing.click_settle_ms)
    }

    /// Fetches, compiles, and plays a script.
    pub fn run_script(&self, source: &dyn ScriptSource, name: &str) -> Result<TaskHandle> {
        let actions = source.fetch_script(name)?;
        let entries = self.compile(&actions);
        info!("Compiled script {name:?} to {} entries", entries.len());
        self.play_entries(name, entries)
    }

    /// Cancels the playback in progress. Returns false if none was running.
    pub fn cancel_playback(&self) -> bool {
        match self.state().playback_run.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    fn start_playback(&self, name: String, entries: Vec<RecordingEntry>) -> TaskHandle {
        let token = CancelToken::new();
        if let Some(previous) = self.state().playback_run.replace(token.clone()) {
            warn!("Cancelling the previous playback");
            previous.cancel();
        }

        info!("Playing {name:?} ({} entries)", entries.len());
        self.emit(DeviceEvent::PlaybackStarted {
            name: name.clone(),
            entries: entries.len(),
        });

        let emulator = self.clone();
        let run_token = token.clone();
        let join = tokio::spawn(async move { emulator.playback_run(name, entries, run_token).await });
        TaskHandle::new(token, join)
    }

    async fn playback_run(
        &self,
        name: String,
        entries: Vec<RecordingEntry>,
        token: CancelToken,
    ) -> RunOutcome {
        let mut pressed: Vec<String> = Vec::new();

        for (index, entry) in entries.iter().enumerate() {
            let on_time = if index == 0 {
                !token.is_cancelled()
            } else {
                sleep_or_cancel(&token, Duration::from_millis(entry.delta_ms)).await
            };
            if !on_time {
                self.release_all(&pressed);
                return self.finish_playback(name, &token, RunOutcome::Cancelled);
            }

            let id = entry.button_id.as_str();
            let result = match entry.event_type {
                EventType::Down => self.press_down(id).map(|_| {
                    if !pressed.iter().any(|p| p == id) {
                        pressed.push(id.to_string());
                    }
                }),
                // A release ignored by a latched button leaves it pressed.
                EventType::Up => self.press_up(id).map(|released| {
                    if released {
                        pressed.retain(|p| p != id);
                    }
                }),
            };
            if let Err(e) = result {
                error!("Playback {name:?} entry {index}: {e}");
            }
        }

        self.finish_playback(name, &token, RunOutcome::Completed)
    }

    fn release_all(&self, pressed: &[String]) {
        for id in pressed {
            if let Err(e) = self.force_release(id) {
                error!("Failed to release {id:?}: {e}");
            }
        }
    }

    fn finish_playback(&self, name: String, token: &CancelToken, outcome: RunOutcome) -> RunOutcome {
        {
            let mut state = self.state();
            if state.playback_run.as_ref().is_some_and(|t| t.same_as(token)) {
                state.playback_run = None;
            }
        }
        match outcome {
            RunOutcome::Completed => {
                info!("Playback {name:?} finished");
                self.emit(DeviceEvent::PlaybackFinished { name });
            }
            RunOutcome::Cancelled => {
                info!("Playback {name:?} cancelled");
                self.emit(DeviceEvent::PlaybackCancelled { name });
            }
        }
        outcome
    }
}
