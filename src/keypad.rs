use anyhow::anyhow;

pub const NUM_KEYS: usize = 16;

/// The hex keypad, laid out on the original hardware as:
///
/// ```text
/// 1 2 3 C
/// 4 5 6 D
/// 7 8 9 E
/// A 0 B F
/// ```
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Key {
    Key0,
    Key1,
    Key2,
    Key3,
    Key4,
    Key5,
    Key6,
    Key7,
    Key8,
    Key9,
    KeyA,
    KeyB,
    KeyC,
    KeyD,
    KeyE,
    KeyF,
}

impl Key {
    pub fn from_index(index: u8) -> anyhow::Result<Key> {
        match index {
            0 => Ok(Key::Key0),
            1 => Ok(Key::Key1),
            2 => Ok(Key::Key2),
            3 => Ok(Key::Key3),
            4 => Ok(Key::Key4),
            5 => Ok(Key::Key5),
            6 => Ok(Key::Key6),
            7 => Ok(Key::Key7),
            8 => Ok(Key::Key8),
            9 => Ok(Key::Key9),
            10 => Ok(Key::KeyA),
            11 => Ok(Key::KeyB),
            12 => Ok(Key::KeyC),
            13 => Ok(Key::KeyD),
            14 => Ok(Key::KeyE),
            15 => Ok(Key::KeyF),
            _ => Err(anyhow!("Invalid key index: {}", index)),
        }
    }

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// Progress of an `FX0A` instruction waiting for input.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum KeyWait {
    #[default]
    NotWaiting,
    Waiting,
    KeyReceived(Key),
}

pub struct Keypad {
    pressed: [bool; NUM_KEYS],
    wait: KeyWait,
}

impl Keypad {
    pub fn new() -> Self {
        Keypad {
            pressed: [false; NUM_KEYS],
            wait: KeyWait::NotWaiting,
        }
    }

    pub fn reset(&mut self) {
        self.pressed = [false; NUM_KEYS];
        self.wait = KeyWait::NotWaiting;
    }

    /// Marks `key` as held. The first press seen while an `FX0A` is waiting
    /// is latched for it.
    pub fn press_key(&mut self, key: Key) {
        self.pressed[usize::from(key.index())] = true;
        if self.wait == KeyWait::Waiting {
            self.wait = KeyWait::KeyReceived(key);
        }
    }

    pub fn release_key(&mut self, key: Key) {
        self.pressed[usize::from(key.index())] = false;
    }

    pub fn is_key_pressed(&self, key: Key) -> bool {
        self.pressed[usize::from(key.index())]
    }

    pub fn wait_state(&self) -> KeyWait {
        self.wait
    }

    /// Advances the wait machine by one `FX0A` execution. Returns the
    /// latched key once one has arrived, re-arming the machine.
    pub fn poll_wait(&mut self) -> Option<Key> {
        match self.wait {
            KeyWait::NotWaiting | KeyWait::Waiting => {
                self.wait = KeyWait::Waiting;
                None
            }
            KeyWait::KeyReceived(key) => {
                self.wait = KeyWait::NotWaiting;
                Some(key)
            }
        }
    }
}

impl Default for Keypad {
    fn default() -> Self {
        Self::new()
    }
}
