use std::time::{Duration, Instant};

/// Where the canvas takes `iTime` from.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum TimePolicy {
    /// Wall-clock time elapsed since the canvas was constructed.
    #[default]
    Realtime,
    /// Always evaluate the shader at the given timestamp (seconds).
    Still { time: f32 },
}

/// Snapshot of the time state supplied to the shader uniforms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeSample {
    /// Elapsed wall-clock or simulated time in seconds.
    pub seconds: f32,
    /// Seconds since the previous sample.
    pub delta: f32,
    /// Monotonic frame counter for the running session.
    pub frame_index: u64,
}

impl TimeSample {
    pub fn new(seconds: f32, delta: f32, frame_index: u64) -> Self {
        Self {
            seconds,
            delta,
            frame_index,
        }
    }
}

/// Abstraction over where time values originate from.
pub trait TimeSource {
    /// Produces a time sample for the next frame.
    fn sample(&mut self) -> TimeSample;
}

/// Time source backed by the monotonic clock, truncated to whole milliseconds.
///
/// The origin is fixed when the source is created and never moves, so the
/// reported time does not depend on how often it is sampled.
#[derive(Debug, Clone, Copy)]
pub struct SystemTimeSource {
    origin: Instant,
    last_seconds: f32,
    frame: u64,
}

impl SystemTimeSource {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(origin: Instant) -> Self {
        Self {
            origin,
            last_seconds: 0.0,
            frame: 0,
        }
    }

    /// Samples the clock as if the current instant were `now`.
    pub fn sample_at(&mut self, now: Instant) -> TimeSample {
        let elapsed_ms = now.saturating_duration_since(self.origin).as_millis();
        let seconds = elapsed_ms as f32 / 1000.0;
        let delta = (seconds - self.last_seconds).max(0.0);
        let sample = TimeSample::new(seconds, delta, self.frame);
        self.last_seconds = seconds;
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

impl Default for SystemTimeSource {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeSource for SystemTimeSource {
    fn sample(&mut self) -> TimeSample {
        self.sample_at(Instant::now())
    }
}

/// Time source that always reports a fixed timestamp.
#[derive(Debug, Clone, Copy)]
pub struct FixedTimeSource {
    time: f32,
    frame: u64,
}

impl FixedTimeSource {
    pub fn new(time: f32) -> Self {
        Self { time, frame: 0 }
    }
}

impl TimeSource for FixedTimeSource {
    fn sample(&mut self) -> TimeSample {
        let sample = TimeSample::new(self.time, 0.0, self.frame);
        self.frame = self.frame.saturating_add(1);
        sample
    }
}

/// Convenient alias for owning time sources behind trait objects.
pub type BoxedTimeSource = Box<dyn TimeSource>;

/// Builds a time source suited to the requested policy.
pub fn time_source_for_policy(policy: TimePolicy) -> BoxedTimeSource {
    match policy {
        TimePolicy::Realtime => Box::new(SystemTimeSource::new()),
        TimePolicy::Still { time } => Box::new(FixedTimeSource::new(time)),
    }
}

/// Decides when the host should request the next redraw.
///
/// Without a cap every loop iteration is a frame; with a cap frames are
/// spaced by `1 / fps`.
#[derive(Debug, Clone)]
pub struct FrameScheduler {
    interval: Option<Duration>,
    last_frame: Option<Instant>,
}

impl FrameScheduler {
    pub fn new(target_fps: Option<f32>) -> Self {
        let interval = target_fps
            .filter(|fps| fps.is_finite() && *fps > 0.0)
            .map(|fps| Duration::from_nanos((1e9 / f64::from(fps)).round() as u64));
        Self {
            interval,
            last_frame: None,
        }
    }

    pub fn is_uncapped(&self) -> bool {
        self.interval.is_none()
    }

    pub fn ready_for_frame(&self, now: Instant) -> bool {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => now >= last + interval,
            _ => true,
        }
    }

    pub fn mark_rendered(&mut self, now: Instant) {
        self.last_frame = Some(now);
    }

    /// Instant the next frame becomes due; `None` when uncapped or nothing rendered yet.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.interval, self.last_frame) {
            (Some(interval), Some(last)) => Some(last + interval),
            _ => None,
        }
    }
}
