use log::{debug, error, trace, warn};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::config::Config;
use crate::instruction::decode;
use crate::keypad::{Key, KeyWait};
use crate::state::{Address, Chip8State, Memory, NUM_REGISTERS};
use crate::timing::FrameClock;

/// A complete CHIP-8 machine driven by wall-clock time.
///
/// The host feeds elapsed time to [`Chip8::advance`] (or single-steps with
/// [`Chip8::step`]), forwards key events between calls, and reads the
/// framebuffer with [`Chip8::get_pixel`].
pub struct Chip8 {
    state: Chip8State,
    clock: FrameClock,
    rng: StdRng,
}

impl Chip8 {
    pub fn new(config: Config) -> anyhow::Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Chip8 {
            state: Chip8State::new(config.wrap_sprites),
            clock: FrameClock::new(config.cycles_per_second),
            rng,
        })
    }

    pub fn reset(&mut self) {
        debug!("Resetting machine");
        self.state.reset();
        self.clock.reset();
    }

    /// Resets the machine and copies `program` to 0x200. A program that does
    /// not fit is refused and the machine is left as it was.
    pub fn load_program(&mut self, program: &[u8]) -> anyhow::Result<()> {
        if let Err(err) = Memory::check_program_size(program.len()) {
            error!("{err}");
            return Err(err);
        }
        self.reset();
        self.state.memory.load_program(program)?;
        debug!("Loaded {} byte program", program.len());
        Ok(())
    }

    pub fn key_pressed(&mut self, key: u8) {
        match Key::from_index(key) {
            Ok(key) => self.state.keypad.press_key(key),
            Err(err) => warn!("Ignoring key press: {err}"),
        }
    }

    pub fn key_released(&mut self, key: u8) {
        match Key::from_index(key) {
            Ok(key) => self.state.keypad.release_key(key),
            Err(err) => warn!("Ignoring key release: {err}"),
        }
    }

    pub fn get_pixel(&self, x: usize, y: usize) -> bool {
        self.state.display.pixel(x, y)
    }

    /// Runs the machine forward by `dt` seconds of wall-clock time.
    pub fn advance(&mut self, dt: f64) {
        let Chip8 {
            state, clock, rng, ..
        } = self;
        clock.advance(dt, |cycles| {
            state.timers.tick();
            for _ in 0..cycles {
                Self::execute_cycle(state, rng);
            }
        });
    }

    /// Executes exactly one instruction. With `advance_time`, one cycle's
    /// worth of time is banked first and the timers tick for every whole
    /// interval it completes.
    pub fn step(&mut self, advance_time: bool) {
        if advance_time {
            for _ in 0..self.clock.advance_one_cycle() {
                self.state.timers.tick();
            }
        }
        Self::execute_cycle(&mut self.state, &mut self.rng);
    }

    fn execute_cycle(state: &mut Chip8State, rng: &mut StdRng) {
        let pc = state.pc;
        let instruction = decode(state.fetch());
        trace!("{pc:#05X}: {instruction}");
        instruction.execute(state, rng);
    }

    pub fn sound_active(&self) -> bool {
        self.state.timers.sound > 0
    }

    pub fn delay_timer(&self) -> u8 {
        self.state.timers.delay
    }

    pub fn sound_timer(&self) -> u8 {
        self.state.timers.sound
    }

    pub fn pc(&self) -> Address {
        self.state.pc
    }

    pub fn index(&self) -> Address {
        self.state.index
    }

    pub fn registers(&self) -> &[u8; NUM_REGISTERS] {
        self.state.registers.as_slice()
    }

    pub fn peek(&self, addr: Address) -> u8 {
        self.state.memory.read(addr)
    }

    pub fn waiting_for_key(&self) -> bool {
        self.state.keypad.wait_state() != KeyWait::NotWaiting
    }
}
