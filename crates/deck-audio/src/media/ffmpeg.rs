//! `MediaElement` backed by an ffmpeg decoder process and a cpal output.
//!
//! ffmpeg fetches and decodes the source into interleaved s16le stereo on a
//! pipe. Decoded samples land in a bounded ring buffer; the cpal callback
//! drains it, runs the attached processor and applies the volume. `play()`
//! resolves when the first PCM block arrives.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{BlobRegistry, MediaElement, MediaEvent, MediaEventKind};
use crate::context::AudioProcessor;
use crate::error::{GraphError, PlayRejection};

const CHANNELS: usize = 2;
const BUFFER_SECS: usize = 2;
const READ_CHUNK: usize = 8192;
const STALL_TIMEOUT: Duration = Duration::from_secs(3);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(20);
const BACKPRESSURE_POLL: Duration = Duration::from_millis(20);
const STDERR_LIMIT: usize = 4096;

/// ffmpeg messages that mean "this is not audio we can decode".
const UNSUPPORTED_MARKERS: [&str; 5] = [
    "invalid data found",
    "could not find codec",
    "unknown input format",
    "does not contain any stream",
    "decoder not found",
];

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|p| p.into_inner())
}

#[derive(Debug, Clone)]
enum Readiness {
    Pending,
    Ready,
    Failed(PlayRejection),
}

// ── Output side ──────────────────────────────────────────────────────────────

/// State touched by the audio callback.
struct OutputShared {
    ring: Mutex<VecDeque<f32>>,
    /// Bumped on every reset; decoders stamp their pushes with the epoch
    /// they were spawned under.
    epoch: AtomicU64,
    volume: AtomicU32,
    processor: Mutex<Option<Box<dyn AudioProcessor>>>,
}

impl OutputShared {
    fn new() -> Self {
        Self {
            ring: Mutex::new(VecDeque::new()),
            epoch: AtomicU64::new(0),
            volume: AtomicU32::new(1.0f32.to_bits()),
            processor: Mutex::new(None),
        }
    }

    fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Append samples decoded under `epoch`. Returns false, dropping them,
    /// once the ring has been reset past that epoch.
    fn push(&self, epoch: u64, samples: &[f32]) -> bool {
        let mut ring = lock(&self.ring);
        if self.epoch() != epoch {
            return false;
        }
        ring.extend(samples.iter().copied());
        true
    }

    fn buffered(&self) -> usize {
        lock(&self.ring).len()
    }

    /// Empty the ring and retire every decoder spawned before now.
    fn reset(&self) {
        let mut ring = lock(&self.ring);
        self.epoch.fetch_add(1, Ordering::AcqRel);
        ring.clear();
    }

    fn volume(&self) -> f32 {
        f32::from_bits(self.volume.load(Ordering::Relaxed))
    }

    fn render(&self, out: &mut [f32]) {
        {
            let mut ring = lock(&self.ring);
            // whole frames only, so channels never swap after an underrun
            let n = (out.len().min(ring.len()) / CHANNELS) * CHANNELS;
            for (slot, s) in out.iter_mut().zip(ring.drain(..n)) {
                *slot = s;
            }
            out[n..].fill(0.0);
        }
        if let Some(processor) = lock(&self.processor).as_mut() {
            processor.process(out, CHANNELS);
        }
        let volume = self.volume();
        for s in out.iter_mut() {
            *s = (*s * volume).clamp(-1.0, 1.0);
        }
    }
}

/// Keeps the output thread (and its stream) alive until dropped.
struct OutputThread {
    _stop: std::sync::mpsc::Sender<()>,
}

fn open_stream(shared: Arc<OutputShared>, sample_rate: u32) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no output device".to_string())?;
    let config = cpal::StreamConfig {
        channels: CHANNELS as u16,
        sample_rate: cpal::SampleRate(sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };
    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| shared.render(data),
            |err| warn!("audio output error: {}", err),
            None,
        )
        .map_err(|e| e.to_string())?;
    stream.play().map_err(|e| e.to_string())?;
    Ok(stream)
}

// ── Decoder side ─────────────────────────────────────────────────────────────

struct Decoder {
    generation: u64,
    task: JoinHandle<()>,
    ready: watch::Receiver<Readiness>,
}

impl Drop for Decoder {
    fn drop(&mut self) {
        // the child is kill_on_drop, so aborting the task ends ffmpeg too
        self.task.abort();
    }
}

struct DecodeJob {
    ffmpeg: PathBuf,
    input: String,
    sample_rate: u32,
    generation: u64,
    epoch: u64,
    shared: Arc<OutputShared>,
    events: mpsc::UnboundedSender<MediaEvent>,
    ready: watch::Sender<Readiness>,
}

impl DecodeJob {
    fn emit(&self, kind: MediaEventKind) {
        let _ = self.events.send(MediaEvent {
            generation: self.generation,
            kind,
        });
    }

    async fn run(self) {
        let mut started = false;
        let result = self.decode(&mut started).await;
        if self.shared.epoch() != self.epoch {
            debug!("gen {} decoder retired", self.generation);
            return;
        }
        match (started, result) {
            (false, Err(rejection)) => {
                debug!("gen {} rejected: {}", self.generation, rejection);
                let _ = self.ready.send(Readiness::Failed(rejection));
            }
            (false, Ok(())) => {
                let _ = self.ready.send(Readiness::Failed(PlayRejection::Failed(
                    "stream ended before any audio".into(),
                )));
            }
            (true, Err(rejection)) => {
                warn!("gen {} stream failed: {}", self.generation, rejection);
                self.emit(MediaEventKind::Error(rejection.to_string()));
            }
            (true, Ok(())) => {
                info!("gen {} stream ended", self.generation);
                self.emit(MediaEventKind::Ended);
            }
        }
    }

    async fn decode(&self, started: &mut bool) -> Result<(), PlayRejection> {
        let rate = self.sample_rate.to_string();
        let mut child = Command::new(&self.ffmpeg)
            .args([
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostdin",
                "-fflags",
                "nobuffer",
                "-probesize",
                "64k",
                "-analyzeduration",
                "500000",
                "-i",
            ])
            .arg(&self.input)
            .args(["-vn", "-ac", "2", "-ar", &rate, "-f", "s16le", "pipe:1"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PlayRejection::Failed(format!("cannot start ffmpeg: {e}")))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| PlayRejection::Failed("ffmpeg stdout unavailable".into()))?;
        let stderr_task = child.stderr.take().map(|e| tokio::spawn(read_limited(e)));

        let capacity = self.sample_rate as usize * CHANNELS * BUFFER_SECS;
        let mut buf = vec![0u8; READ_CHUNK];
        let mut samples = Vec::with_capacity(READ_CHUNK / 2 + 1);
        let mut carry = None;
        let mut stalled = false;
        let opened = Instant::now();

        let read_result = loop {
            match tokio::time::timeout(STALL_TIMEOUT, stdout.read(&mut buf)).await {
                Ok(Ok(0)) => break Ok(()),
                Ok(Ok(n)) => {
                    decode_s16le(&mut carry, &buf[..n], &mut samples);
                    while self.shared.buffered() > capacity {
                        tokio::time::sleep(BACKPRESSURE_POLL).await;
                    }
                    if !self.shared.push(self.epoch, &samples) {
                        break Ok(());
                    }
                    if !*started {
                        *started = true;
                        debug!(
                            "gen {} first audio after {:?}",
                            self.generation,
                            opened.elapsed()
                        );
                        let _ = self.ready.send(Readiness::Ready);
                        self.emit(MediaEventKind::Playing);
                    } else if stalled {
                        stalled = false;
                        self.emit(MediaEventKind::Playing);
                    }
                }
                Ok(Err(e)) => break Err(PlayRejection::Failed(e.to_string())),
                Err(_) if *started => {
                    if !stalled {
                        stalled = true;
                        self.emit(MediaEventKind::Waiting);
                    }
                }
                Err(_) if opened.elapsed() > CONNECT_TIMEOUT => {
                    break Err(PlayRejection::Failed("timed out waiting for audio".into()));
                }
                Err(_) => {}
            }
        };

        drop(stdout);
        if read_result.is_err() {
            let _ = child.start_kill();
        }
        let status = child.wait().await.ok();
        let stderr_text = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        read_result?;
        match status {
            Some(s) if !s.success() => Err(classify_failure(&stderr_text, &s.to_string())),
            _ => Ok(()),
        }
    }
}

async fn read_limited<R: AsyncRead + Unpin>(mut reader: R) -> String {
    let mut out = Vec::new();
    let mut chunk = [0u8; 512];
    while let Ok(n) = reader.read(&mut chunk).await {
        if n == 0 {
            break;
        }
        if out.len() < STDERR_LIMIT {
            out.extend_from_slice(&chunk[..n]);
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Append little-endian i16 samples as f32, carrying an odd trailing byte
/// over to the next call.
fn decode_s16le(carry: &mut Option<u8>, mut bytes: &[u8], out: &mut Vec<f32>) {
    fn sample(lo: u8, hi: u8) -> f32 {
        i16::from_le_bytes([lo, hi]) as f32 / 32768.0
    }

    out.clear();
    if let Some(lo) = carry.take() {
        match bytes.split_first() {
            Some((&hi, rest)) => {
                out.push(sample(lo, hi));
                bytes = rest;
            }
            None => {
                *carry = Some(lo);
                return;
            }
        }
    }
    let mut pairs = bytes.chunks_exact(2);
    for pair in &mut pairs {
        out.push(sample(pair[0], pair[1]));
    }
    if let [lo] = pairs.remainder() {
        *carry = Some(*lo);
    }
}

fn classify_failure(stderr: &str, status: &str) -> PlayRejection {
    let detail = stderr
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("ffmpeg exited: {status}"));
    let lower = stderr.to_ascii_lowercase();
    if UNSUPPORTED_MARKERS.iter().any(|m| lower.contains(m)) {
        PlayRejection::NotSupported(detail)
    } else {
        PlayRejection::Failed(detail)
    }
}

// ── Element ──────────────────────────────────────────────────────────────────

struct Source {
    url: String,
    generation: u64,
    /// Cleared by `pause()`; a disarmed source refuses to start.
    armed: bool,
}

pub struct FfmpegElement {
    sample_rate: u32,
    ffmpeg: PathBuf,
    blobs: Arc<BlobRegistry>,
    events: mpsc::UnboundedSender<MediaEvent>,
    shared: Arc<OutputShared>,
    source: Mutex<Option<Source>>,
    decoder: Mutex<Option<Decoder>>,
    output: tokio::sync::Mutex<Option<OutputThread>>,
}

impl FfmpegElement {
    pub fn new(
        sample_rate: u32,
        blobs: Arc<BlobRegistry>,
        events: mpsc::UnboundedSender<MediaEvent>,
    ) -> Self {
        let ffmpeg = deck_proto::platform::find_ffmpeg_binary()
            .unwrap_or_else(|| PathBuf::from("ffmpeg"));
        debug!("using decoder {}", ffmpeg.display());
        Self {
            sample_rate,
            ffmpeg,
            blobs,
            events,
            shared: Arc::new(OutputShared::new()),
            source: Mutex::new(None),
            decoder: Mutex::new(None),
            output: tokio::sync::Mutex::new(None),
        }
    }

    fn resolve_input(&self, url: &str) -> Result<String, PlayRejection> {
        if deck_proto::catalog::is_session_local(url) {
            return self
                .blobs
                .resolve(url)
                .map(|p| p.to_string_lossy().into_owned())
                .ok_or_else(|| PlayRejection::Failed(format!("unknown local handle {url}")));
        }
        Ok(url.to_string())
    }

    async fn ensure_output(&self) -> Result<(), PlayRejection> {
        let mut output = self.output.lock().await;
        if output.is_some() {
            return Ok(());
        }

        let (ready_tx, ready_rx) = oneshot::channel();
        let (stop_tx, stop_rx) = std::sync::mpsc::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let rate = self.sample_rate;
        std::thread::Builder::new()
            .name("deck-audio-out".into())
            .spawn(move || match open_stream(shared, rate) {
                Ok(stream) => {
                    let _ = ready_tx.send(Ok(()));
                    // park until the element drops its handle
                    let _ = stop_rx.recv();
                    drop(stream);
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| PlayRejection::NotAllowed(e.to_string()))?;

        match ready_rx.await {
            Ok(Ok(())) => {
                info!("audio output open at {} Hz", rate);
                *output = Some(OutputThread { _stop: stop_tx });
                Ok(())
            }
            Ok(Err(e)) => Err(PlayRejection::NotAllowed(e)),
            Err(_) => Err(PlayRejection::NotAllowed("audio thread exited".into())),
        }
    }

    fn spawn_decoder(&self, input: String, generation: u64) -> Decoder {
        let (ready_tx, ready_rx) = watch::channel(Readiness::Pending);
        let job = DecodeJob {
            ffmpeg: self.ffmpeg.clone(),
            input,
            sample_rate: self.sample_rate,
            generation,
            epoch: self.shared.epoch(),
            shared: Arc::clone(&self.shared),
            events: self.events.clone(),
            ready: ready_tx,
        };
        Decoder {
            generation,
            task: tokio::spawn(job.run()),
            ready: ready_rx,
        }
    }

    fn stop_decoder(&self) {
        let mut slot = lock(&self.decoder);
        let retired = slot.take();
        self.shared.reset();
        drop(slot);
        drop(retired);
    }

    /// The url of `generation` if it is still current and armed.
    fn armed_source(&self, generation: u64) -> Result<String, PlayRejection> {
        let source = lock(&self.source);
        let src = source
            .as_ref()
            .ok_or_else(|| PlayRejection::Failed("no source".into()))?;
        if src.generation != generation || !src.armed {
            debug!("play gen {} withdrawn", generation);
            return Err(PlayRejection::Aborted);
        }
        Ok(src.url.clone())
    }
}

#[async_trait]
impl MediaElement for FfmpegElement {
    fn set_source(&self, url: &str, generation: u64) {
        *lock(&self.source) = Some(Source {
            url: url.to_string(),
            generation,
            armed: true,
        });
        self.stop_decoder();
    }

    fn load(&self) {
        self.stop_decoder();
    }

    async fn play(&self, generation: u64) -> Result<(), PlayRejection> {
        let url = self.armed_source(generation)?;
        let input = self.resolve_input(&url)?;
        self.ensure_output().await?;

        let mut ready = {
            // hold the decoder slot across the re-check so a concurrent
            // pause either sees the new decoder or disarms us first
            let mut decoder = lock(&self.decoder);
            self.armed_source(generation)?;
            match decoder.as_ref() {
                Some(d) if d.generation == generation && !d.task.is_finished() => d.ready.clone(),
                _ => {
                    let d = self.spawn_decoder(input, generation);
                    let rx = d.ready.clone();
                    *decoder = Some(d);
                    rx
                }
            }
        };

        loop {
            let state = ready.borrow_and_update().clone();
            match state {
                Readiness::Ready => return Ok(()),
                Readiness::Failed(rejection) => return Err(rejection),
                Readiness::Pending => {}
            }
            if ready.changed().await.is_err() {
                // sender gone: decoder aborted, unless it settled on the way out
                return match ready.borrow().clone() {
                    Readiness::Ready => Ok(()),
                    Readiness::Failed(rejection) => Err(rejection),
                    Readiness::Pending => Err(PlayRejection::Aborted),
                };
            }
        }
    }

    fn pause(&self) {
        // live sources cannot be held; resuming reconnects at the live edge
        if let Some(src) = lock(&self.source).as_mut() {
            src.armed = false;
        }
        self.stop_decoder();
    }

    fn set_volume(&self, volume: f32) {
        let v = if volume.is_finite() {
            volume.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.shared.volume.store(v.to_bits(), Ordering::Relaxed);
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> usize {
        CHANNELS
    }

    fn attach_processor(&self, processor: Box<dyn AudioProcessor>) -> Result<(), GraphError> {
        let mut slot = lock(&self.shared.processor);
        if slot.is_some() {
            return Err(GraphError::SourceAlreadyAttached);
        }
        *slot = Some(processor);
        Ok(())
    }
}
