/// Fixed-rate simulation clock fed with variable frame times.
///
/// Time is counted in whole ticks so long runs do not drift. Frames longer
/// than `max_frame_time` are clipped and the lost time is kept in
/// [`FixedTimestep::clipped`].
#[derive(Debug, Clone)]
pub struct FixedTimestep {
    tick_rate: u32,
    dt: f32,
    max_frame_time: f32,
    accumulator: f32,
    ticks: u64,
    clipped: f32,
}

impl FixedTimestep {
    pub fn new(tick_rate: u32, max_frame_time: f32) -> Self {
        let tick_rate = tick_rate.max(1);
        let dt = 1.0 / tick_rate as f32;
        Self {
            tick_rate,
            dt,
            max_frame_time: max_frame_time.max(dt),
            accumulator: 0.0,
            ticks: 0,
            clipped: 0.0,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Simulated seconds covered by the ticks run so far.
    pub fn elapsed(&self) -> f32 {
        (self.ticks as f64 * self.dt as f64) as f32
    }

    pub fn clipped(&self) -> f32 {
        self.clipped
    }

    pub fn accumulate(&mut self, frame_time: f32) {
        let frame_time = frame_time.max(0.0);
        if frame_time > self.max_frame_time {
            log::debug!(
                "frame of {:.3}s clipped to {:.3}s",
                frame_time,
                self.max_frame_time
            );
            self.clipped += frame_time - self.max_frame_time;
        }
        self.accumulator += frame_time.min(self.max_frame_time);
    }

    /// Consumes one tick if enough time has accumulated and returns the
    /// simulated time at its end.
    pub fn next_tick(&mut self) -> Option<f32> {
        if self.accumulator < self.dt {
            return None;
        }
        self.accumulator -= self.dt;
        self.ticks += 1;
        Some(self.elapsed())
    }
}
