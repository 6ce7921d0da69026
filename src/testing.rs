//! Test doubles shared by the unit tests: scripted and timed pins, a threaded
//! fake audio channel, a counting renderer and a recording display.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::audio::{
    AudioChannel, AudioError, CaptureBuffer, ChunkCallback, ChunkGate, Envelope, SampleChunk,
    StreamFormat, StreamHandle,
};
use crate::display::{DisplayError, MonoFrame, Status, StatusDisplay};
use crate::input::{InputError, PinReader, PinState};
use crate::render::{Artifact, RenderError, RenderPipeline};

// ---------------------------------------------------------------------------
// Counter
// ---------------------------------------------------------------------------

/// Shared call counter, readable after the double has been moved away.
#[derive(Debug, Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Pins
// ---------------------------------------------------------------------------

/// Returns scripted levels in order, then `then` forever (or fails forever
/// when `then` is `None`).
#[derive(Debug)]
pub struct ScriptedPin {
    script: VecDeque<PinState>,
    then: Option<PinState>,
    reads: Counter,
    releases: Counter,
}

impl ScriptedPin {
    pub fn new(script: Vec<PinState>, then: PinState) -> Self {
        Self {
            script: script.into(),
            then: Some(then),
            reads: Counter::default(),
            releases: Counter::default(),
        }
    }

    /// Play `script`, then fail every read.
    pub fn failing_after(script: Vec<PinState>) -> Self {
        Self {
            then: None,
            ..Self::new(script, PinState::High)
        }
    }

    pub fn failing() -> Self {
        Self::failing_after(Vec::new())
    }

    pub fn reads(&self) -> Counter {
        self.reads.clone()
    }

    pub fn releases(&self) -> Counter {
        self.releases.clone()
    }
}

impl PinReader for ScriptedPin {
    fn read(&mut self) -> Result<PinState, InputError> {
        self.reads.bump();
        match self.script.pop_front().or(self.then) {
            Some(state) => Ok(state),
            None => Err(InputError::BadValue("scripted failure".into())),
        }
    }

    fn release(&mut self) -> Result<(), InputError> {
        self.releases.bump();
        Ok(())
    }
}

/// Pull-up wired button pressed (LOW) from `press_after` until
/// `press_after + hold`, measured from construction.
#[derive(Debug)]
pub struct TimedPin {
    origin: Instant,
    press_after: Duration,
    hold: Duration,
    releases: Counter,
}

impl TimedPin {
    pub fn new(press_after: Duration, hold: Duration) -> Self {
        Self {
            origin: Instant::now(),
            press_after,
            hold,
            releases: Counter::default(),
        }
    }

    pub fn releases(&self) -> Counter {
        self.releases.clone()
    }
}

impl PinReader for TimedPin {
    fn read(&mut self) -> Result<PinState, InputError> {
        let t = self.origin.elapsed();
        if t >= self.press_after && t < self.press_after + self.hold {
            Ok(PinState::Low)
        } else {
            Ok(PinState::High)
        }
    }

    fn release(&mut self) -> Result<(), InputError> {
        self.releases.bump();
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeAudio
// ---------------------------------------------------------------------------

/// What a [`FakeAudio`] has been asked to do.
#[derive(Debug, Default)]
pub struct AudioLog {
    pub arms: Counter,
    pub disarms: Counter,
    pub delivered: Counter,
    pub armed_at: Mutex<Vec<Instant>>,
    pub disarmed_at: Mutex<Vec<Instant>>,
}

impl AudioLog {
    /// Arm-to-disarm time of the `n`th stream.
    pub fn armed_for(&self, n: usize) -> Option<Duration> {
        let armed = *self.armed_at.lock().unwrap().get(n)?;
        let disarmed = *self.disarmed_at.lock().unwrap().get(n)?;
        Some(disarmed - armed)
    }
}

/// Audio channel whose worker thread delivers `chunk_len`-sample chunks on
/// an absolute schedule: chunk `k` covers `[k, k + 1)` chunk durations after
/// arm and is delivered once that span has elapsed.
///
/// Chunk `k` is filled with the value `k`, so order can be checked on the
/// finalized buffer.
#[derive(Debug)]
pub struct FakeAudio {
    chunk_len: usize,
    fail_probe: bool,
    fail_arms: usize,
    fail_disarm: bool,
    log: Arc<AudioLog>,
}

impl FakeAudio {
    pub fn new(chunk_len: usize) -> Self {
        Self {
            chunk_len,
            fail_probe: false,
            fail_arms: 0,
            fail_disarm: false,
            log: Arc::default(),
        }
    }

    /// A channel that never delivers anything.
    pub fn silent() -> Self {
        Self::new(0)
    }

    pub fn failing_probe(mut self) -> Self {
        self.fail_probe = true;
        self
    }

    /// The next `n` arms fail.
    pub fn failing_arms(mut self, n: usize) -> Self {
        self.fail_arms = n;
        self
    }

    /// Every disarm stops the stream but reports an error.
    pub fn failing_disarm(mut self) -> Self {
        self.fail_disarm = true;
        self
    }

    pub fn log(&self) -> Arc<AudioLog> {
        Arc::clone(&self.log)
    }
}

impl AudioChannel for FakeAudio {
    type Handle = FakeStream;

    fn probe(&self, _format: &StreamFormat) -> Result<(), AudioError> {
        if self.fail_probe {
            return Err(AudioError::NoDevice);
        }
        Ok(())
    }

    fn arm(
        &mut self,
        format: &StreamFormat,
        on_chunk: ChunkCallback,
    ) -> Result<FakeStream, AudioError> {
        if self.fail_arms > 0 {
            self.fail_arms -= 1;
            return Err(AudioError::Unavailable("fake arm failure".into()));
        }

        self.log.arms.bump();
        let gate = ChunkGate::open(on_chunk);
        let stop: Arc<Mutex<Option<Instant>>> = Arc::default();
        let armed_at = Instant::now();
        self.log.armed_at.lock().unwrap().push(armed_at);

        let worker = if self.chunk_len == 0 {
            None
        } else {
            let gate = gate.clone();
            let stop = Arc::clone(&stop);
            let log = Arc::clone(&self.log);
            let chunk_len = self.chunk_len;
            let rate = format.sample_rate;
            let chunk_secs = chunk_len as f64 / rate as f64;

            Some(std::thread::spawn(move || {
                let mut next = 0_u64;
                loop {
                    let stop_at = *stop.lock().unwrap();
                    let until = stop_at.unwrap_or_else(Instant::now);
                    let due = (until.duration_since(armed_at).as_secs_f64() / chunk_secs) as u64;
                    while next < due {
                        let samples = vec![next as i16; chunk_len];
                        if gate.deliver(SampleChunk::new(samples, rate)) {
                            log.delivered.bump();
                        }
                        next += 1;
                    }
                    if stop_at.is_some() {
                        break;
                    }
                    std::thread::sleep(Duration::from_millis(1));
                }
            }))
        };

        Ok(FakeStream {
            gate,
            stop,
            worker,
            fail_disarm: self.fail_disarm,
            log: Arc::clone(&self.log),
            disarmed: false,
        })
    }
}

#[derive(Debug)]
pub struct FakeStream {
    gate: ChunkGate,
    stop: Arc<Mutex<Option<Instant>>>,
    worker: Option<JoinHandle<()>>,
    fail_disarm: bool,
    log: Arc<AudioLog>,
    disarmed: bool,
}

impl StreamHandle for FakeStream {
    fn disarm(&mut self) -> Result<(), AudioError> {
        if self.disarmed {
            return Ok(());
        }
        self.disarmed = true;

        let stop_at = Instant::now();
        *self.stop.lock().unwrap() = Some(stop_at);
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.gate.close();
        self.log.disarms.bump();
        self.log.disarmed_at.lock().unwrap().push(stop_at);

        if self.fail_disarm {
            return Err(AudioError::Unavailable("fake disarm failure".into()));
        }
        Ok(())
    }
}

impl Drop for FakeStream {
    fn drop(&mut self) {
        let _ = self.disarm();
    }
}

// ---------------------------------------------------------------------------
// CountingRenderer
// ---------------------------------------------------------------------------

/// Renderer that keeps the buffers it was given instead of drawing them.
#[derive(Debug, Clone, Default)]
pub struct CountingRenderer {
    pub renders: Counter,
    pub previews: Counter,
    pub buffers: Arc<Mutex<Vec<Vec<i16>>>>,
    fail: Arc<AtomicBool>,
    preview: bool,
}

impl CountingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_preview(mut self) -> Self {
        self.preview = true;
        self
    }

    /// Make every following render fail (or succeed again).
    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn last_len(&self) -> Option<usize> {
        self.buffers.lock().unwrap().last().map(Vec::len)
    }
}

impl RenderPipeline for CountingRenderer {
    fn render(&mut self, buffer: &CaptureBuffer) -> Result<Artifact, RenderError> {
        self.renders.bump();
        if self.fail.load(Ordering::SeqCst) {
            return Err(RenderError::Encode("fake render failure".into()));
        }
        self.buffers.lock().unwrap().push(buffer.samples().to_vec());
        Ok(Artifact {
            path: PathBuf::from("waveform.png"),
            width: 1_000,
            height: 400,
            sample_count: buffer.len(),
            duration_secs: buffer.duration_secs(),
            envelope: Envelope::compute(buffer.samples(), 1_000),
        })
    }

    fn preview(
        &mut self,
        _artifact: &Artifact,
        display: &mut dyn StatusDisplay,
    ) -> Result<bool, RenderError> {
        if !self.preview {
            return Ok(false);
        }
        self.previews.bump();
        display.show_frame(&MonoFrame::new(128, 64))?;
        Ok(true)
    }
}

// ---------------------------------------------------------------------------
// RecordingDisplay
// ---------------------------------------------------------------------------

/// Display that remembers every status it was shown.
#[derive(Debug, Clone, Default)]
pub struct RecordingDisplay {
    pub statuses: Arc<Mutex<Vec<Status>>>,
    pub frames: Counter,
    pub clears: Counter,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<Status> {
        self.statuses.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<Status> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn count(&self, label: &str) -> usize {
        self.statuses
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.label() == label)
            .count()
    }
}

impl StatusDisplay for RecordingDisplay {
    fn notify(&mut self, status: &Status) -> Result<(), DisplayError> {
        self.statuses.lock().unwrap().push(status.clone());
        Ok(())
    }

    fn show_frame(&mut self, _frame: &MonoFrame) -> Result<(), DisplayError> {
        self.frames.bump();
        Ok(())
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.clears.bump();
        Ok(())
    }
}
