//! Capture controller: drives button edges → capture session → render.
//!
//! [`CaptureController`] owns the [`Hardware`] and runs one synchronous
//! loop on the calling thread.  The only other thread involved is the audio
//! backend's, which feeds the session through the chunk callback installed
//! at arm time.
//!
//! # Cycle
//!
//! ```text
//! ArmedWaiting ──wait_for_level(Pressed)──▶ new session, arm   [Recording]
//!   └─▶ wait_for_level(Unpressed), tick → "RECORDING... n.ns"
//!         └─▶ disarm (blocks until the callback is quiet)     [Draining]
//!               └─▶ finalize
//!                     ├─ Empty    → "no audio recorded"       [ArmedWaiting]
//!                     └─ Recorded → render → preview + hold   [ArmedWaiting]
//! ```
//!
//! Faults inside a cycle abandon the session, show an Error status and
//! leave the controller in ArmedWaiting.  Only startup checks are fatal.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::audio::{
    AudioChannel, AudioError, Capture, CaptureSession, ChunkCallback, SampleChunk, SessionError,
    StreamFormat, StreamHandle,
};
use crate::cancel::CancelToken;
use crate::config::AppConfig;
use crate::display::Status;
use crate::input::{Edge, InputError, PinReader, Wait};
use crate::render::{RenderError, RenderPipeline};

use super::hardware::Hardware;
use super::state::{ControllerState, ControllerStats, CycleOutcome};

// ---------------------------------------------------------------------------
// ControllerError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("button check failed at startup: {0}")]
    StartupInput(#[source] InputError),

    #[error("audio check failed at startup: {0}")]
    StartupAudio(#[source] AudioError),

    #[error("controller has not been initialized")]
    NotInitialized,

    #[error("controller has shut down")]
    ShutDown,

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl ControllerError {
    /// Whether the controller cannot continue.  Everything raised inside a
    /// press/release cycle is recoverable.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ControllerError::StartupInput(_)
                | ControllerError::StartupAudio(_)
                | ControllerError::NotInitialized
                | ControllerError::ShutDown
        )
    }

    /// Short text for the second line of the Error status.
    pub fn reason(&self) -> &'static str {
        match self {
            ControllerError::StartupInput(_) | ControllerError::Input(_) => "Button fail",
            ControllerError::StartupAudio(_) | ControllerError::Audio(_) => "Mic fail",
            ControllerError::Session(_) => "Capture fail",
            ControllerError::Render(RenderError::Display(_)) => "Display fail",
            ControllerError::Render(_) => "Image save fail",
            ControllerError::NotInitialized | ControllerError::ShutDown => "Not ready",
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureController
// ---------------------------------------------------------------------------

/// Stream and session of the press currently being recorded.
struct ActiveCapture<H> {
    session: Arc<CaptureSession>,
    stream: H,
}

/// Press-to-record state machine.
///
/// ```rust,no_run
/// use stethoscope::audio::CpalChannel;
/// use stethoscope::cancel::CancelToken;
/// use stethoscope::config::{AppConfig, AppPaths};
/// use stethoscope::controller::{CaptureController, Hardware};
/// use stethoscope::display::ConsoleDisplay;
/// use stethoscope::input::{DigitalInputMonitor, SysfsPin};
/// use stethoscope::render::WaveformRenderer;
///
/// let config = AppConfig::default();
/// let pin = SysfsPin::claim(&config.button.sysfs_root, config.button.gpio).unwrap();
/// let monitor = DigitalInputMonitor::new(pin, true, config.button.poll_interval());
/// let audio = CpalChannel::open(None, None).unwrap();
/// let renderer = WaveformRenderer::from_config(&config.render, &config.preview, &AppPaths::new());
/// let hw = Hardware::new(monitor, audio, renderer, Box::new(ConsoleDisplay::new(128, 64)));
///
/// let mut controller = CaptureController::new(hw, &config, CancelToken::new());
/// let stats = controller.run().unwrap();
/// println!("{} captures rendered", stats.rendered);
/// ```
pub struct CaptureController<P: PinReader, A: AudioChannel, R: RenderPipeline> {
    hw: Hardware<P, A, R>,
    format: StreamFormat,
    max_samples: Option<usize>,
    preview_hold: Duration,
    cancel: CancelToken,
    state: ControllerState,
    stats: ControllerStats,
    active: Option<ActiveCapture<A::Handle>>,
}

impl<P: PinReader, A: AudioChannel, R: RenderPipeline> CaptureController<P, A, R> {
    pub fn new(hw: Hardware<P, A, R>, config: &AppConfig, cancel: CancelToken) -> Self {
        Self {
            hw,
            format: StreamFormat::from(&config.audio),
            max_samples: config.audio.max_samples(),
            preview_hold: config.preview.hold(),
            cancel,
            state: ControllerState::Idle,
            stats: ControllerStats::default(),
            active: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn stats(&self) -> ControllerStats {
        self.stats
    }

    // -----------------------------------------------------------------------
    // Startup / shutdown
    // -----------------------------------------------------------------------

    /// One-time hardware check: read the button once and probe the audio
    /// format.  On failure the hardware is released and the controller
    /// stays Idle for good.
    pub fn initialize(&mut self) -> Result<(), ControllerError> {
        if self.hw.is_released() {
            return Err(ControllerError::ShutDown);
        }
        if self.state != ControllerState::Idle {
            return Ok(());
        }

        let held = match self.hw.monitor.is_pressed() {
            Ok(held) => held,
            Err(e) => return Err(self.abort_startup(ControllerError::StartupInput(e))),
        };
        if let Err(e) = self.hw.audio.probe(&self.format) {
            return Err(self.abort_startup(ControllerError::StartupAudio(e)));
        }

        log::info!(
            "controller: ready (button {}, {} wiring, {} Hz mono, cap {})",
            if held { "held" } else { "up" },
            if self.hw.monitor.press_is_low() { "pull-up" } else { "pull-down" },
            self.format.sample_rate,
            match self.max_samples {
                Some(n) => format!("{n} samples"),
                None => "none".into(),
            }
        );
        self.set_state(ControllerState::ArmedWaiting);
        self.hw.notify(&Status::Ready);
        Ok(())
    }

    fn abort_startup(&mut self, err: ControllerError) -> ControllerError {
        log::error!("controller: {err}");
        self.shutdown();
        err
    }

    /// Disarm and discard any in-flight capture, then release the hardware.
    /// Safe to call any number of times.
    pub fn shutdown(&mut self) {
        if self.state.is_busy() {
            log::info!("controller: shutting down while {}", self.state.label());
        }
        self.abandon_capture();
        self.hw.release();
        self.set_state(ControllerState::Idle);
    }

    // -----------------------------------------------------------------------
    // Main loop
    // -----------------------------------------------------------------------

    /// Run cycles until the cancel token fires, then shut down.
    ///
    /// Initializes first when that has not happened yet.  Returns the run's
    /// statistics, or the fatal error that stopped it.
    pub fn run(&mut self) -> Result<ControllerStats, ControllerError> {
        if self.state == ControllerState::Idle {
            self.initialize()?;
        }

        while !self.cancel.is_cancelled() {
            match self.run_cycle() {
                Ok(CycleOutcome::Cancelled) => break,
                Ok(_) => {}
                Err(e) if e.is_fatal() => {
                    self.shutdown();
                    return Err(e);
                }
                // Logged, counted and shown by run_cycle.
                Err(_) => {}
            }
        }

        self.shutdown();
        log::info!(
            "controller: stopped after {} cycle(s): {} rendered, {} empty, {} fault(s)",
            self.stats.cycles,
            self.stats.rendered,
            self.stats.empty,
            self.stats.faults
        );
        Ok(self.stats)
    }

    /// Wait for one press, record until release, then finalize and render.
    ///
    /// Non-fatal faults are recovered before returning: the session is
    /// discarded, the Error status is shown and the controller is back in
    /// ArmedWaiting, ready for the next call.
    pub fn run_cycle(&mut self) -> Result<CycleOutcome, ControllerError> {
        if self.state == ControllerState::Idle {
            return Err(if self.hw.is_released() {
                ControllerError::ShutDown
            } else {
                ControllerError::NotInitialized
            });
        }

        self.cycle().map_err(|e| self.recover(e))
    }

    fn cycle(&mut self) -> Result<CycleOutcome, ControllerError> {
        // ── 1. Wait for press ────────────────────────────────────────────
        if self
            .hw
            .monitor
            .wait_for_level(Edge::Press.target(), &self.cancel, None)?
            == Wait::Cancelled
        {
            return Ok(CycleOutcome::Cancelled);
        }
        self.stats.cycles += 1;
        log::info!("controller: button pressed, recording");

        // ── 2. Arm ───────────────────────────────────────────────────────
        let session = match self.arm() {
            Ok(session) => session,
            Err(e) => {
                // Retry on the next press, not on every poll of this one.
                self.hw
                    .monitor
                    .wait_for_level(Edge::Release.target(), &self.cancel, None)?;
                return Err(e);
            }
        };

        // ── 3. Record until release ──────────────────────────────────────
        let released = {
            let Hardware {
                monitor, display, ..
            } = &mut self.hw;
            let mut last_tenth = 0_u128;
            let mut tick = || {
                let tenth = session.elapsed().as_millis() / 100;
                if tenth != last_tenth {
                    last_tenth = tenth;
                    let status = Status::Recording {
                        elapsed_secs: tenth as f32 / 10.0,
                    };
                    if let Err(e) = display.notify(&status) {
                        log::warn!("controller: display rejected recording status: {e}");
                    }
                }
            };
            monitor.wait_for_level(Edge::Release.target(), &self.cancel, Some(&mut tick))?
        };
        if released == Wait::Cancelled {
            self.abandon_capture();
            return Ok(CycleOutcome::Cancelled);
        }

        // ── 4. Drain ─────────────────────────────────────────────────────
        self.set_state(ControllerState::Draining);
        self.hw.notify(&Status::Processing);
        let buffer = match self.drain()? {
            Capture::Empty => {
                log::info!("controller: no audio recorded");
                self.stats.empty += 1;
                self.finish_cycle();
                return Ok(CycleOutcome::Empty);
            }
            Capture::Recorded(buffer) => buffer,
        };

        log::info!(
            "controller: captured {:.2}s ({} samples in {} chunks)",
            buffer.duration_secs(),
            buffer.len(),
            buffer.chunk_count()
        );
        if buffer.flagged_chunks() > 0 {
            log::warn!(
                "controller: {} chunk(s) arrived with overflow or device errors",
                buffer.flagged_chunks()
            );
        }
        if buffer.truncated() {
            log::warn!("controller: recording was cut at the configured maximum length");
        }

        // ── 5. Render + preview ──────────────────────────────────────────
        let artifact = self.hw.renderer.render(&buffer)?;
        drop(buffer);

        let Hardware {
            renderer, display, ..
        } = &mut self.hw;
        if renderer.preview(&artifact, &mut **display)? && self.cancel.sleep(self.preview_hold) {
            log::debug!("controller: preview hold cut short by cancellation");
        }

        self.stats.rendered += 1;
        self.finish_cycle();
        Ok(CycleOutcome::Rendered(artifact))
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    /// Start a session and a stream feeding it.
    fn arm(&mut self) -> Result<Arc<CaptureSession>, ControllerError> {
        let session = Arc::new(CaptureSession::begin(
            self.format.sample_rate,
            self.max_samples,
        ));

        let sink = Arc::clone(&session);
        let on_chunk: ChunkCallback = Box::new(move |chunk: SampleChunk| {
            if let Some(status) = chunk.status {
                log::warn!("controller: chunk flagged {status:?} ({} samples)", chunk.len());
            }
            sink.push(chunk);
        });

        let stream = self.hw.audio.arm(&self.format, on_chunk)?;
        self.active = Some(ActiveCapture {
            session: Arc::clone(&session),
            stream,
        });
        self.set_state(ControllerState::Recording);
        self.hw.notify(&Status::Recording { elapsed_secs: 0.0 });
        Ok(session)
    }

    /// Disarm, then finalize.  Once this returns the audio thread no longer
    /// touches the session.
    fn drain(&mut self) -> Result<Capture, ControllerError> {
        let Some(mut active) = self.active.take() else {
            return Err(SessionError::InvalidState.into());
        };

        if let Err(e) = active.stream.disarm() {
            active.session.discard();
            return Err(e.into());
        }

        let capture = active.session.finalize()?;
        let rejected = active.session.rejected_count();
        if rejected > 0 {
            log::warn!("controller: {rejected} chunk(s) arrived after finalize and were dropped");
        }
        Ok(capture)
    }

    /// Disarm and throw away the current capture, if there is one.
    fn abandon_capture(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Err(e) = active.stream.disarm() {
            log::warn!("controller: disarm failed while abandoning capture: {e}");
        }
        if active.session.is_recording() {
            log::info!(
                "controller: discarding in-flight session ({} samples)",
                active.session.sample_count()
            );
            active.session.discard();
        }
    }

    fn set_state(&mut self, next: ControllerState) {
        if next != self.state {
            log::debug!("controller: {} -> {}", self.state.label(), next.label());
            self.state = next;
        }
    }

    fn finish_cycle(&mut self) {
        self.set_state(ControllerState::ArmedWaiting);
        self.hw.notify(&Status::Ready);
    }

    /// Turn a cycle fault into the Error status and get back to waiting.
    fn recover(&mut self, err: ControllerError) -> ControllerError {
        self.abandon_capture();
        self.stats.faults += 1;
        self.set_state(ControllerState::ArmedWaiting);
        log::error!("controller: {err}");
        self.hw.notify(&Status::Error {
            reason: err.reason().into(),
        });
        if matches!(err, ControllerError::Input(_)) {
            // Back off before reading the pin again.
            self.cancel.sleep(self.hw.monitor.poll_interval());
        }
        err
    }
}

impl<P: PinReader, A: AudioChannel, R: RenderPipeline> Drop for CaptureController<P, A, R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::{DigitalInputMonitor, PinState};
    use crate::testing::{CountingRenderer, FakeAudio, RecordingDisplay, ScriptedPin, TimedPin};
    use std::time::Instant;

    const RATE: u32 = 44_100;
    const CHUNK: usize = 1_024;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.button.poll_interval_ms = 2;
        config.preview.hold_secs = 0.0;
        config
    }

    fn controller<P: PinReader>(
        pin: P,
        audio: FakeAudio,
        renderer: CountingRenderer,
        display: RecordingDisplay,
        config: &AppConfig,
        cancel: CancelToken,
    ) -> CaptureController<P, FakeAudio, CountingRenderer> {
        let monitor = DigitalInputMonitor::new(
            pin,
            config.button.press_is_low,
            config.button.poll_interval(),
        );
        let hw = Hardware::new(monitor, audio, renderer, Box::new(display));
        CaptureController::new(hw, config, cancel)
    }

    /// `High` for the startup read, `held` reads of `Low`, then `High`.
    fn one_press(held: usize) -> Vec<PinState> {
        let mut script = vec![PinState::High];
        script.extend(std::iter::repeat(PinState::Low).take(held));
        script.push(PinState::High);
        script
    }

    fn cancel_after(cancel: &CancelToken, delay: Duration) -> std::thread::JoinHandle<()> {
        let cancel = cancel.clone();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            cancel.cancel();
        })
    }

    // ---- Scenario -----------------------------------------------------------

    /// Press held for 2 s at 44.1 kHz with 1024-sample chunks.
    #[test]
    fn two_second_press_renders_once() {
        let config = test_config();
        let audio = FakeAudio::new(CHUNK);
        let log = audio.log();
        let renderer = CountingRenderer::new();
        let display = RecordingDisplay::new();
        let pin = TimedPin::new(Duration::from_millis(50), Duration::from_secs(2));

        let mut c = controller(
            pin,
            audio,
            renderer.clone(),
            display.clone(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();
        let outcome = c.run_cycle().unwrap();

        assert!(matches!(outcome, CycleOutcome::Rendered(_)));
        assert_eq!(renderer.renders.get(), 1);
        assert_eq!(c.state(), ControllerState::ArmedWaiting);
        assert_eq!(display.last(), Some(Status::Ready));

        // Duration fidelity: within one chunk of arm-to-disarm time.
        let armed = log.armed_for(0).unwrap().as_secs_f64();
        assert!((1.9..2.5).contains(&armed), "armed for {armed}s");
        let len = renderer.last_len().unwrap() as f64;
        let expected = armed * RATE as f64;
        assert!(
            (len - expected).abs() <= CHUNK as f64,
            "len {len}, expected {expected} ± {CHUNK}"
        );
        assert!(len >= 85.0 * CHUNK as f64 && len <= 90.0 * CHUNK as f64);

        let stats = c.stats();
        assert_eq!((stats.cycles, stats.rendered, stats.empty, stats.faults), (1, 1, 0, 0));
    }

    #[test]
    fn chunks_finalize_in_delivery_order() {
        let config = test_config();
        let renderer = CountingRenderer::new();
        let pin = TimedPin::new(Duration::from_millis(10), Duration::from_millis(300));
        let mut c = controller(
            pin,
            FakeAudio::new(256),
            renderer.clone(),
            RecordingDisplay::new(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();
        c.run_cycle().unwrap();

        let buffers = renderer.buffers.lock().unwrap();
        let samples = &buffers[0];
        assert!(samples.len() >= 256 * 10);
        for (k, chunk) in samples.chunks(256).enumerate() {
            assert!(chunk.iter().all(|&s| s == k as i16), "chunk {k} out of order");
        }
    }

    #[test]
    fn recording_status_refreshes_once_per_tenth() {
        let config = test_config();
        let display = RecordingDisplay::new();
        let pin = TimedPin::new(Duration::from_millis(10), Duration::from_millis(350));
        let mut c = controller(
            pin,
            FakeAudio::new(CHUNK),
            CountingRenderer::new(),
            display.clone(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();
        c.run_cycle().unwrap();

        let elapsed: Vec<f32> = display
            .statuses()
            .into_iter()
            .filter_map(|s| match s {
                Status::Recording { elapsed_secs } => Some(elapsed_secs),
                _ => None,
            })
            .collect();
        // 0.0 at arm, then one update per tenth of a second held.
        assert!((3..=6).contains(&elapsed.len()), "{elapsed:?}");
        assert!(elapsed.windows(2).all(|w| w[1] > w[0]));
    }

    // ---- Empty press --------------------------------------------------------

    #[test]
    fn empty_press_skips_render_without_fault() {
        let config = test_config();
        let audio = FakeAudio::silent();
        let log = audio.log();
        let renderer = CountingRenderer::new();
        let display = RecordingDisplay::new();
        let mut c = controller(
            ScriptedPin::new(one_press(1), PinState::High),
            audio,
            renderer.clone(),
            display.clone(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();

        assert!(matches!(c.run_cycle().unwrap(), CycleOutcome::Empty));
        assert_eq!(renderer.renders.get(), 0);
        assert_eq!(c.state(), ControllerState::ArmedWaiting);
        assert_eq!((log.arms.get(), log.disarms.get()), (1, 1));

        let stats = c.stats();
        assert_eq!((stats.empty, stats.faults), (1, 0));
        assert_eq!(display.last(), Some(Status::Ready));
        assert_eq!(display.count("Error"), 0);
    }

    // ---- Cancellation -------------------------------------------------------

    #[test]
    fn cancel_during_recording_disarms_and_releases_once() {
        let config = test_config();
        let cancel = CancelToken::new();
        let audio = FakeAudio::new(CHUNK);
        let log = audio.log();
        let renderer = CountingRenderer::new();
        let display = RecordingDisplay::new();
        let pin = TimedPin::new(Duration::from_millis(10), Duration::from_secs(60));
        let releases = pin.releases();

        let mut c = controller(
            pin,
            audio,
            renderer.clone(),
            display.clone(),
            &config,
            cancel.clone(),
        );
        let canceller = cancel_after(&cancel, Duration::from_millis(200));
        let started = Instant::now();
        let stats = c.run().unwrap();
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.cycles, 1);
        assert_eq!(stats.rendered, 0);
        assert_eq!(renderer.renders.get(), 0);
        assert_eq!((log.arms.get(), log.disarms.get()), (1, 1));
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(releases.get(), 1);
        assert_eq!(display.clears.get(), 1);
        assert_eq!(display.last(), Some(Status::ShuttingDown));

        c.shutdown();
        drop(c);
        assert_eq!(releases.get(), 1);
        assert_eq!(log.disarms.get(), 1);
    }

    #[test]
    fn cancel_while_waiting_returns_cancelled() {
        let config = test_config();
        let cancel = CancelToken::new();
        let audio = FakeAudio::new(CHUNK);
        let log = audio.log();
        let mut c = controller(
            ScriptedPin::new(vec![], PinState::High),
            audio,
            CountingRenderer::new(),
            RecordingDisplay::new(),
            &config,
            cancel.clone(),
        );
        c.initialize().unwrap();
        let canceller = cancel_after(&cancel, Duration::from_millis(30));

        assert!(matches!(c.run_cycle().unwrap(), CycleOutcome::Cancelled));
        canceller.join().unwrap();
        assert_eq!(log.arms.get(), 0);
        assert_eq!(c.stats().cycles, 0);
    }

    #[test]
    fn preview_hold_is_cut_short_by_cancel() {
        let mut config = test_config();
        config.preview.hold_secs = 30.0;
        let cancel = CancelToken::new();
        let renderer = CountingRenderer::new().with_preview();
        let display = RecordingDisplay::new();
        let pin = TimedPin::new(Duration::from_millis(10), Duration::from_millis(100));

        let mut c = controller(
            pin,
            FakeAudio::new(256),
            renderer.clone(),
            display.clone(),
            &config,
            cancel.clone(),
        );
        let canceller = cancel_after(&cancel, Duration::from_millis(400));
        let started = Instant::now();
        let stats = c.run().unwrap();
        canceller.join().unwrap();

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(stats.rendered, 1);
        assert_eq!(renderer.previews.get(), 1);
        assert_eq!(display.frames.get(), 1);
    }

    // ---- Fault recovery -----------------------------------------------------

    #[test]
    fn arm_failure_is_retried_on_next_press() {
        let config = test_config();
        let audio = FakeAudio::silent().failing_arms(1);
        let log = audio.log();
        let display = RecordingDisplay::new();
        let mut script = one_press(1);
        script.extend([PinState::Low, PinState::High]);

        let mut c = controller(
            ScriptedPin::new(script, PinState::High),
            audio,
            CountingRenderer::new(),
            display.clone(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();

        let err = c.run_cycle().unwrap_err();
        assert!(matches!(err, ControllerError::Audio(_)));
        assert!(!err.is_fatal());
        assert_eq!(c.state(), ControllerState::ArmedWaiting);
        assert_eq!(
            display.last(),
            Some(Status::Error {
                reason: "Mic fail".into()
            })
        );

        assert!(matches!(c.run_cycle().unwrap(), CycleOutcome::Empty));
        assert_eq!(log.arms.get(), 1);
        assert_eq!(c.stats().faults, 1);
        assert_eq!(c.stats().cycles, 2);
    }

    #[test]
    fn render_failure_recovers_to_armed() {
        let config = test_config();
        let renderer = CountingRenderer::new();
        renderer.set_failing(true);
        let display = RecordingDisplay::new();
        let pin = TimedPin::new(Duration::from_millis(10), Duration::from_millis(150));

        let mut c = controller(
            pin,
            FakeAudio::new(256),
            renderer.clone(),
            display.clone(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();

        let err = c.run_cycle().unwrap_err();
        assert!(matches!(err, ControllerError::Render(_)));
        assert!(!err.is_fatal());
        assert_eq!(renderer.renders.get(), 1);
        assert_eq!(c.state(), ControllerState::ArmedWaiting);
        assert_eq!(c.stats().faults, 1);
        assert_eq!(c.stats().rendered, 0);
        assert_eq!(
            display.last(),
            Some(Status::Error {
                reason: "Image save fail".into()
            })
        );
    }

    #[test]
    fn disarm_failure_abandons_session() {
        let config = test_config();
        let audio = FakeAudio::new(64).failing_disarm();
        let log = audio.log();
        let renderer = CountingRenderer::new();
        let mut c = controller(
            ScriptedPin::new(one_press(20), PinState::High),
            audio,
            renderer.clone(),
            RecordingDisplay::new(),
            &config,
            CancelToken::new(),
        );
        c.initialize().unwrap();

        assert!(matches!(c.run_cycle(), Err(ControllerError::Audio(_))));
        assert_eq!(renderer.renders.get(), 0);
        assert_eq!(log.disarms.get(), 1);
        assert_eq!(c.state(), ControllerState::ArmedWaiting);
    }

    #[test]
    fn pin_fault_mid_cycle_is_not_fatal() {
        let config = test_config();
        let cancel = CancelToken::new();
        let display = RecordingDisplay::new();
        let mut c = controller(
            ScriptedPin::failing_after(vec![PinState::High]),
            FakeAudio::silent(),
            CountingRenderer::new(),
            display.clone(),
            &config,
            cancel.clone(),
        );
        let canceller = cancel_after(&cancel, Duration::from_millis(60));
        let stats = c.run().unwrap();
        canceller.join().unwrap();

        assert!(stats.faults >= 1);
        assert_eq!(stats.cycles, 0);
        assert!(display.statuses().contains(&Status::Error {
            reason: "Button fail".into()
        }));
        assert_eq!(c.state(), ControllerState::Idle);
    }

    // ---- Startup ------------------------------------------------------------

    #[test]
    fn startup_probe_failure_is_fatal_and_releases() {
        let config = test_config();
        let pin = ScriptedPin::new(vec![], PinState::High);
        let releases = pin.releases();
        let display = RecordingDisplay::new();
        let mut c = controller(
            pin,
            FakeAudio::silent().failing_probe(),
            CountingRenderer::new(),
            display.clone(),
            &config,
            CancelToken::new(),
        );

        let err = c.initialize().unwrap_err();
        assert!(matches!(err, ControllerError::StartupAudio(_)));
        assert!(err.is_fatal());
        assert_eq!(c.state(), ControllerState::Idle);
        assert_eq!(releases.get(), 1);
        assert_eq!(display.last(), Some(Status::ShuttingDown));
        assert!(matches!(c.run_cycle(), Err(ControllerError::ShutDown)));
    }

    #[test]
    fn startup_pin_failure_stops_run() {
        let config = test_config();
        let mut c = controller(
            ScriptedPin::failing(),
            FakeAudio::silent(),
            CountingRenderer::new(),
            RecordingDisplay::new(),
            &config,
            CancelToken::new(),
        );
        let err = c.run().unwrap_err();
        assert!(matches!(err, ControllerError::StartupInput(_)));
        assert_eq!(err.reason(), "Button fail");
    }

    #[test]
    fn run_cycle_requires_initialize() {
        let config = test_config();
        let mut c = controller(
            ScriptedPin::new(vec![], PinState::High),
            FakeAudio::silent(),
            CountingRenderer::new(),
            RecordingDisplay::new(),
            &config,
            CancelToken::new(),
        );
        assert!(matches!(c.run_cycle(), Err(ControllerError::NotInitialized)));
    }

    // ---- ControllerError ----------------------------------------------------

    #[test]
    fn error_reasons() {
        assert_eq!(ControllerError::from(AudioError::NoDevice).reason(), "Mic fail");
        assert_eq!(
            ControllerError::from(SessionError::InvalidState).reason(),
            "Capture fail"
        );
        assert_eq!(
            ControllerError::from(RenderError::Encode("x".into())).reason(),
            "Image save fail"
        );
        assert!(!ControllerError::from(RenderError::Encode("x".into())).is_fatal());
    }
}
