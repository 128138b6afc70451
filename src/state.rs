use anyhow::anyhow;

use crate::display::FrameBuffer;
use crate::keypad::Keypad;

pub type Timer = u8;
pub type Address = u16;

pub const MEM_SIZE: usize = 4096;
pub const ADDR_MASK: Address = 0x0FFF;
pub const FONT_ADDR: Address = 0x000;
pub const FONT_HEIGHT: usize = 5;
pub const PC_START_ADDR: Address = 0x200;
pub const MAX_PROGRAM_SIZE: usize = MEM_SIZE - PC_START_ADDR as usize;
pub const NUM_REGISTERS: usize = 16;
pub const STACK_CAPACITY: usize = 128;

pub const FONT_DATA: [u8; 16 * FONT_HEIGHT] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// 4 KiB of byte-addressable RAM. Every address is folded into the 12-bit
/// address space, so reads and writes never leave the array.
pub struct Memory {
    data: [u8; MEM_SIZE],
}

impl Memory {
    pub fn new() -> Self {
        let mut memory = Memory {
            data: [0; MEM_SIZE],
        };
        memory.load_font();
        memory
    }

    fn load_font(&mut self) {
        let start = usize::from(FONT_ADDR);
        self.data[start..start + FONT_DATA.len()].copy_from_slice(&FONT_DATA);
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
        self.load_font();
    }

    pub fn read(&self, addr: Address) -> u8 {
        self.data[usize::from(addr & ADDR_MASK)]
    }

    pub fn write(&mut self, addr: Address, value: u8) {
        self.data[usize::from(addr & ADDR_MASK)] = value;
    }

    /// Big-endian 16-bit read; the low byte wraps to 0x000 when `addr` is 0xFFF.
    pub fn read_word(&self, addr: Address) -> u16 {
        u16::from_be_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    /// Fails when a program of `len` bytes would run past the top of memory.
    pub fn check_program_size(len: usize) -> anyhow::Result<()> {
        if len > MAX_PROGRAM_SIZE {
            return Err(anyhow!(
                "Program of {len} bytes too large to fit in memory (max {MAX_PROGRAM_SIZE})"
            ));
        }
        Ok(())
    }

    pub fn load_program(&mut self, program: &[u8]) -> anyhow::Result<()> {
        Self::check_program_size(program.len())?;
        let start = usize::from(PC_START_ADDR);
        self.data[start..start + program.len()].copy_from_slice(program);
        Ok(())
    }

    /// Copies `rows` bytes starting at `addr`, wrapping at the top of memory.
    pub fn read_sprite(&self, addr: Address, rows: u8) -> Vec<u8> {
        (0..u16::from(rows))
            .map(|row| self.read(addr.wrapping_add(row)))
            .collect()
    }
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
    V0,
    V1,
    V2,
    V3,
    V4,
    V5,
    V6,
    V7,
    V8,
    V9,
    VA,
    VB,
    VC,
    VD,
    VE,
    VF,
}

impl Register {
    pub const ALL: [Register; NUM_REGISTERS] = [
        Register::V0,
        Register::V1,
        Register::V2,
        Register::V3,
        Register::V4,
        Register::V5,
        Register::V6,
        Register::V7,
        Register::V8,
        Register::V9,
        Register::VA,
        Register::VB,
        Register::VC,
        Register::VD,
        Register::VE,
        Register::VF,
    ];

    /// Maps the low nibble of `value` to a register; instruction operand
    /// fields are 4 bits wide so every nibble names a register.
    pub fn from_nibble(value: u8) -> Self {
        Self::ALL[usize::from(value & 0x0F)]
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// The sixteen V registers. VF doubles as the carry/borrow/collision flag.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct RegisterBank {
    registers: [u8; NUM_REGISTERS],
}

impl RegisterBank {
    pub fn new() -> Self {
        RegisterBank {
            registers: [0; NUM_REGISTERS],
        }
    }

    pub fn read(&self, reg: Register) -> u8 {
        self.registers[reg.index()]
    }

    pub fn write(&mut self, reg: Register, value: u8) {
        self.registers[reg.index()] = value;
    }

    pub fn flags(&self) -> u8 {
        self.read(Register::VF)
    }

    pub fn set_flag(&mut self, set: bool) {
        self.write(Register::VF, u8::from(set));
    }

    pub fn as_slice(&self) -> &[u8; NUM_REGISTERS] {
        &self.registers
    }

    pub fn clear(&mut self) {
        self.registers.fill(0);
    }
}

/// Return-address stack with a fixed capacity. Pushing onto a full stack
/// and popping an empty one are refused rather than faulting.
pub struct CallStack {
    entries: [Address; STACK_CAPACITY],
    sp: usize,
}

impl CallStack {
    pub fn new() -> Self {
        CallStack {
            entries: [0; STACK_CAPACITY],
            sp: 0,
        }
    }

    /// Returns `false` and leaves the stack untouched when it is full.
    pub fn push(&mut self, addr: Address) -> bool {
        if self.sp >= STACK_CAPACITY {
            return false;
        }
        self.entries[self.sp] = addr;
        self.sp += 1;
        true
    }

    pub fn pop(&mut self) -> Option<Address> {
        if self.sp == 0 {
            return None;
        }
        self.sp -= 1;
        Some(self.entries[self.sp])
    }

    pub fn len(&self) -> usize {
        self.sp
    }

    pub fn is_empty(&self) -> bool {
        self.sp == 0
    }

    pub fn clear(&mut self) {
        self.sp = 0;
    }
}

impl Default for CallStack {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timers {
    pub delay: Timer,
    pub sound: Timer,
}

impl Timers {
    /// One 60 Hz decrement of both timers, saturating at zero.
    pub fn tick(&mut self) {
        self.delay = self.delay.saturating_sub(1);
        self.sound = self.sound.saturating_sub(1);
    }
}

pub struct Chip8State {
    pub memory: Memory,
    pub registers: RegisterBank,
    pub pc: Address,
    pub index: Address,
    pub stack: CallStack,
    pub timers: Timers,
    pub display: FrameBuffer,
    pub keypad: Keypad,
}

impl Chip8State {
    pub fn new(wrap_sprites: bool) -> Self {
        Chip8State {
            memory: Memory::new(),
            registers: RegisterBank::new(),
            pc: PC_START_ADDR,
            index: 0,
            stack: CallStack::new(),
            timers: Timers::default(),
            display: FrameBuffer::new(wrap_sprites),
            keypad: Keypad::new(),
        }
    }

    /// Power-on state: zeroed RAM with the font reloaded, PC at 0x200.
    pub fn reset(&mut self) {
        self.memory.clear();
        self.registers.clear();
        self.pc = PC_START_ADDR;
        self.index = 0;
        self.stack.clear();
        self.timers = Timers::default();
        self.display.clear();
        self.keypad.reset();
    }

    /// Reads the instruction at PC and moves PC past it.
    pub fn fetch(&mut self) -> u16 {
        let raw = self.memory.read_word(self.pc);
        self.pc = self.pc.wrapping_add(2);
        raw
    }

    pub fn skip_next(&mut self) {
        self.pc = self.pc.wrapping_add(2);
    }
}
