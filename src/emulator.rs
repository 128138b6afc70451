use std::io::Stdout;
use std::time::{Duration, Instant};

use chip8_vm::{Chip8, DISPLAY_HEIGHT, DISPLAY_WIDTH};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement};
use log::{info, warn};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Paragraph},
};
use rodio::{OutputStream, Sink, Source, source::SineWave};

pub const DEFAULT_FREQUENCY: f32 = 440.0;
const FRAME_RATE: f64 = 60.0;
/// Longest wall-clock gap fed to the VM in one frame, so a stalled terminal
/// does not trigger a burst of catch-up cycles.
const MAX_FRAME_DELTA: f64 = 0.25;
/// Without release events from the terminal, a key counts as held this long
/// after its last press or auto-repeat. Long enough to bridge the initial
/// auto-repeat delay of common keyboards.
const KEY_HOLD: Duration = Duration::from_millis(500);

pub struct Beep {
    sink: Sink,
    #[allow(dead_code)]
    stream: OutputStream,
}

impl Beep {
    pub fn new(freq: f32) -> anyhow::Result<Self> {
        let (stream, stream_handle) = OutputStream::try_default()?;
        let sink = Sink::try_new(&stream_handle)?;
        let source = SineWave::new(freq).repeat_infinite();

        sink.append(source);
        sink.pause();

        Ok(Self { sink, stream })
    }

    pub fn set(&mut self, on: bool) {
        if on {
            self.sink.play();
        } else {
            self.sink.pause();
        }
    }
}

/// Maps the left-hand 4x4 block of a QWERTY keyboard onto the hex keypad.
pub fn map_key(code: KeyCode) -> Option<u8> {
    let KeyCode::Char(c) = code else {
        return None;
    };
    match c.to_ascii_lowercase() {
        '1' => Some(0x1),
        '2' => Some(0x2),
        '3' => Some(0x3),
        '4' => Some(0xC),
        'q' => Some(0x4),
        'w' => Some(0x5),
        'e' => Some(0x6),
        'r' => Some(0xD),
        'a' => Some(0x7),
        's' => Some(0x8),
        'd' => Some(0x9),
        'f' => Some(0xE),
        'z' => Some(0xA),
        'x' => Some(0x0),
        'c' => Some(0xB),
        'v' => Some(0xF),
        _ => None,
    }
}

/// Host keys currently held, with the time each was last seen.
struct HeldKeys {
    release_events: bool,
    last_seen: [Option<Instant>; 16],
}

impl HeldKeys {
    fn new(release_events: bool) -> Self {
        HeldKeys {
            release_events,
            last_seen: [None; 16],
        }
    }

    fn handle(&mut self, vm: &mut Chip8, key: u8, kind: KeyEventKind, now: Instant) {
        let slot = &mut self.last_seen[usize::from(key)];
        match kind {
            KeyEventKind::Press | KeyEventKind::Repeat => {
                if slot.is_none() {
                    vm.key_pressed(key);
                }
                *slot = Some(now);
            }
            KeyEventKind::Release => {
                if slot.take().is_some() {
                    vm.key_released(key);
                }
            }
        }
    }

    fn expire(&mut self, vm: &mut Chip8, now: Instant) {
        if self.release_events {
            return;
        }
        for (key, slot) in (0u8..).zip(self.last_seen.iter_mut()) {
            if slot.is_some_and(|seen| now.duration_since(seen) >= KEY_HOLD) {
                *slot = None;
                vm.key_released(key);
            }
        }
    }
}

pub struct Emulator {
    vm: Chip8,
    beeper: Option<Beep>,
}

impl Emulator {
    pub fn new(vm: Chip8, tone: f32) -> anyhow::Result<Self> {
        let beeper = match Beep::new(tone) {
            Ok(beeper) => Some(beeper),
            Err(err) => {
                warn!("Audio unavailable, running silent: {err}");
                None
            }
        };
        Ok(Emulator { vm, beeper })
    }

    fn draw(&self, frame: &mut ratatui::Frame, area: Rect, rom_name: &str) {
        // 64x32 display plus borders
        let game_width = (DISPLAY_WIDTH as u16) + 2;
        let game_height = (DISPLAY_HEIGHT as u16) + 2;

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(game_height),
                Constraint::Length(7),
                Constraint::Min(0),
            ])
            .split(area);

        let game_area = if chunks[0].width > game_width {
            Layout::default()
                .direction(Direction::Horizontal)
                .constraints([
                    Constraint::Min(0),
                    Constraint::Length(game_width),
                    Constraint::Min(0),
                ])
                .split(chunks[0])[1]
        } else {
            chunks[0]
        };

        let mut screen = String::with_capacity(DISPLAY_WIDTH * DISPLAY_HEIGHT + DISPLAY_HEIGHT);
        for y in 0..DISPLAY_HEIGHT {
            for x in 0..DISPLAY_WIDTH {
                screen.push(if self.vm.get_pixel(x, y) { '█' } else { ' ' });
            }
            screen.push('\n');
        }
        let title = if self.vm.waiting_for_key() {
            format!("{rom_name} (waiting for key)")
        } else {
            rom_name.to_string()
        };
        let game_paragraph = Paragraph::new(screen)
            .block(Block::default().borders(Borders::ALL).title(title))
            .style(Style::default().fg(Color::White));
        frame.render_widget(game_paragraph, game_area);

        let key_mapping = "Key Mapping (Esc quits):\n\
    1 2 3 4    →    1 2 3 C\n\
    Q W E R    →    4 5 6 D\n\
    A S D F    →    7 8 9 E\n\
    Z X C V    →    A 0 B F";
        let key_paragraph = Paragraph::new(key_mapping)
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).title("Keypad"))
            .style(Style::default().fg(Color::Yellow));
        frame.render_widget(key_paragraph, chunks[1]);
    }

    /// Drains pending terminal events. Returns `false` once the user quits.
    fn pump_events(&mut self, held: &mut HeldKeys) -> anyhow::Result<bool> {
        while event::poll(Duration::ZERO)? {
            let Event::Key(KeyEvent { code, kind, .. }) = event::read()? else {
                continue;
            };
            if code == KeyCode::Esc {
                return Ok(false);
            }
            if let Some(key) = map_key(code) {
                held.handle(&mut self.vm, key, kind, Instant::now());
            }
        }
        held.expire(&mut self.vm, Instant::now());
        Ok(true)
    }

    fn main_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<Stdout>>,
        held: &mut HeldKeys,
        rom_name: &str,
    ) -> anyhow::Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / FRAME_RATE);
        let mut last_frame = Instant::now();

        while self.pump_events(held)? {
            let frame_start = Instant::now();
            let dt = frame_start.duration_since(last_frame).as_secs_f64();
            last_frame = frame_start;

            self.vm.advance(dt.min(MAX_FRAME_DELTA));

            let sound = self.vm.sound_active();
            if let Some(beeper) = self.beeper.as_mut() {
                beeper.set(sound);
            }

            terminal.draw(|frame| {
                let area = frame.area();
                self.draw(frame, area, rom_name);
            })?;

            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                std::thread::sleep(frame_duration - elapsed);
            }
        }
        Ok(())
    }

    pub fn run(&mut self, rom_name: &str) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        let release_events = supports_keyboard_enhancement().unwrap_or(false);
        if release_events {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }
        info!("Terminal release events: {release_events}");

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let mut held = HeldKeys::new(release_events);
        let result = self.main_loop(&mut terminal, &mut held, rom_name);

        if let Some(beeper) = self.beeper.as_mut() {
            beeper.set(false);
        }
        terminal.clear()?;
        if release_events {
            execute!(terminal.backend_mut(), PopKeyboardEnhancementFlags)?;
        }
        disable_raw_mode()?;

        result
    }
}
