//! Fixed-rate timing for the VM.
//!
//! The delay and sound timers run at exactly 60 Hz whatever the host frame
//! rate. Elapsed wall-clock time is banked in units of timer ticks; every
//! whole tick that comes due is reported together with the number of CPU
//! cycles that belong to it. Fractions of a tick and of a cycle are carried
//! over to the next call, so rounding never drifts the long-run rates.

pub const TICKS_PER_SECOND: f64 = 60.0;
pub const TICK_INTERVAL: f64 = 1.0 / TICKS_PER_SECOND;

/// Absorbs floating-point error when a tick is assembled from many small
/// increments (e.g. ten 1/600 s steps).
const TICK_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq)]
pub struct FrameClock {
    cycles_per_tick: f64,
    /// Elapsed time not yet turned into ticks, measured in ticks.
    pending_ticks: f64,
    /// Fractional cycles owed from previous ticks.
    pending_cycles: f64,
}

impl FrameClock {
    pub fn new(cycles_per_second: f64) -> Self {
        FrameClock {
            cycles_per_tick: cycles_per_second * TICK_INTERVAL,
            pending_ticks: 0.0,
            pending_cycles: 0.0,
        }
    }

    pub fn reset(&mut self) {
        self.pending_ticks = 0.0;
        self.pending_cycles = 0.0;
    }

    /// Banks `dt` seconds. For every whole tick now due, calls `on_tick`
    /// with the number of cycles to run for that tick.
    pub fn advance(&mut self, dt: f64, mut on_tick: impl FnMut(u32)) {
        if !dt.is_finite() || dt <= 0.0 {
            return;
        }
        self.pending_ticks += dt * TICKS_PER_SECOND;
        while self.take_tick() {
            self.pending_cycles += self.cycles_per_tick;
            let cycles = self.pending_cycles.trunc();
            self.pending_cycles -= cycles;
            on_tick(cycles as u32);
        }
    }

    /// Banks the duration of a single cycle and returns how many ticks that
    /// completed. Used when single-stepping.
    pub fn advance_one_cycle(&mut self) -> u32 {
        self.pending_ticks += 1.0 / self.cycles_per_tick;
        let mut ticks = 0;
        while self.take_tick() {
            ticks += 1;
        }
        ticks
    }

    fn take_tick(&mut self) -> bool {
        if self.pending_ticks >= 1.0 - TICK_EPSILON {
            self.pending_ticks -= 1.0;
            true
        } else {
            false
        }
    }
}
