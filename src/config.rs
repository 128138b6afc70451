use anyhow::anyhow;

pub const DEFAULT_CYCLES_PER_SECOND: f64 = 1000.0;
/// Highest accepted rate. A frame at this rate runs under 17k cycles per tick.
pub const MAX_CYCLES_PER_SECOND: f64 = 1_000_000.0;

/// Tunables fixed for the lifetime of a [`crate::Chip8`] instance.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Instructions executed per emulated second.
    pub cycles_per_second: f64,
    /// Seed for the `CXNN` random source. `None` seeds from the OS.
    pub seed: Option<u64>,
    /// Wrap sprites around the display edges instead of clipping them.
    pub wrap_sprites: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            cycles_per_second: DEFAULT_CYCLES_PER_SECOND,
            seed: None,
            wrap_sprites: false,
        }
    }
}

impl Config {
    pub fn with_cycles_per_second(mut self, cycles_per_second: f64) -> Self {
        self.cycles_per_second = cycles_per_second;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_wrap_sprites(mut self, wrap: bool) -> Self {
        self.wrap_sprites = wrap;
        self
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.cycles_per_second.is_finite() || self.cycles_per_second <= 0.0 {
            return Err(anyhow!(
                "cycles per second must be a positive number, got {}",
                self.cycles_per_second
            ));
        }
        if self.cycles_per_second > MAX_CYCLES_PER_SECOND {
            return Err(anyhow!(
                "cycles per second must be at most {MAX_CYCLES_PER_SECOND}, got {}",
                self.cycles_per_second
            ));
        }
        Ok(())
    }
}
