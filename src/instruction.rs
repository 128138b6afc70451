use std::fmt;

use log::warn;
use rand::Rng;

use crate::keypad::Key;
use crate::state::{Address, Chip8State, FONT_ADDR, FONT_HEIGHT, Register};

/// Operand fields shared by every instruction encoding.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Operands {
    /// First nibble. Selects the instruction group.
    pub opcode: u8,
    /// Second nibble. Used to look up one of the 16 registers.
    pub x: Register,
    /// Third nibble. Used to look up one of the 16 registers.
    pub y: Register,
    /// Fourth nibble. A 4-bit number.
    pub n: u8,
    /// The second byte (third and fourth nibbles). An 8-bit immediate number.
    pub nn: u8,
    /// The second, third, and fourth nibbles. A 12-bit immediate address.
    pub nnn: Address,
}

impl Operands {
    pub fn new(raw: u16) -> Self {
        Operands {
            opcode: (raw >> 12) as u8,
            x: Register::from_nibble((raw >> 8) as u8),
            y: Register::from_nibble((raw >> 4) as u8),
            n: (raw & 0x0F) as u8,
            nn: (raw & 0x00FF) as u8,
            nnn: raw & 0x0FFF,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Instruction {
    /// `0NNN`: call a machine-code routine. Ignored.
    MachineRoutine(Address),
    /// `00E0`
    ClearScreen,
    /// `00EE`
    Return,
    /// `1NNN`
    Jump(Address),
    /// `2NNN`
    Call(Address),
    /// `3XNN`
    SkipEqImm(Register, u8),
    /// `4XNN`
    SkipNeqImm(Register, u8),
    /// `5XY0`
    SkipEqReg(Register, Register),
    /// `6XNN`
    LoadImm(Register, u8),
    /// `7XNN`
    AddImm(Register, u8),
    /// `8XY0`
    Move(Register, Register),
    /// `8XY1`
    Or(Register, Register),
    /// `8XY2`
    And(Register, Register),
    /// `8XY3`
    Xor(Register, Register),
    /// `8XY4`
    AddReg(Register, Register),
    /// `8XY5`
    Sub(Register, Register),
    /// `8XY6`
    ShiftRight(Register),
    /// `8XY7`
    SubN(Register, Register),
    /// `8XYE`
    ShiftLeft(Register),
    /// `9XY0`
    SkipNeqReg(Register, Register),
    /// `ANNN`
    LoadIndex(Address),
    /// `BNNN`
    JumpOffset(Address),
    /// `CXNN`
    Random(Register, u8),
    /// `DXYN`
    Draw(Register, Register, u8),
    /// `EX9E`
    SkipKeyPressed(Register),
    /// `EXA1`
    SkipKeyNotPressed(Register),
    /// `FX07`
    ReadDelay(Register),
    /// `FX0A`
    WaitKey(Register),
    /// `FX15`
    SetDelay(Register),
    /// `FX18`
    SetSound(Register),
    /// `FX1E`
    AddIndex(Register),
    /// `FX29`
    FontChar(Register),
    /// `FX33`
    StoreBcd(Register),
    /// `FX55`
    StoreRegisters(Register),
    /// `FX65`
    LoadRegisters(Register),
    /// A word with no matching encoding; executes as a no-op.
    Invalid(u16),
}

pub fn decode(raw: u16) -> Instruction {
    let ops = Operands::new(raw);

    match ops.opcode {
        0x0 => match ops.nn {
            0xE0 => Instruction::ClearScreen,
            0xEE => Instruction::Return,
            _ => Instruction::MachineRoutine(ops.nnn),
        },
        0x1 => Instruction::Jump(ops.nnn),
        0x2 => Instruction::Call(ops.nnn),
        0x3 => Instruction::SkipEqImm(ops.x, ops.nn),
        0x4 => Instruction::SkipNeqImm(ops.x, ops.nn),
        0x5 => Instruction::SkipEqReg(ops.x, ops.y),
        0x6 => Instruction::LoadImm(ops.x, ops.nn),
        0x7 => Instruction::AddImm(ops.x, ops.nn),
        0x8 => match ops.n {
            0x0 => Instruction::Move(ops.x, ops.y),
            0x1 => Instruction::Or(ops.x, ops.y),
            0x2 => Instruction::And(ops.x, ops.y),
            0x3 => Instruction::Xor(ops.x, ops.y),
            0x4 => Instruction::AddReg(ops.x, ops.y),
            0x5 => Instruction::Sub(ops.x, ops.y),
            0x6 => Instruction::ShiftRight(ops.x),
            0x7 => Instruction::SubN(ops.x, ops.y),
            0xE => Instruction::ShiftLeft(ops.x),
            _ => Instruction::Invalid(raw),
        },
        0x9 => Instruction::SkipNeqReg(ops.x, ops.y),
        0xA => Instruction::LoadIndex(ops.nnn),
        0xB => Instruction::JumpOffset(ops.nnn),
        0xC => Instruction::Random(ops.x, ops.nn),
        0xD => Instruction::Draw(ops.x, ops.y, ops.n),
        0xE => match ops.nn {
            0x9E => Instruction::SkipKeyPressed(ops.x),
            0xA1 => Instruction::SkipKeyNotPressed(ops.x),
            _ => Instruction::Invalid(raw),
        },
        // 0xF, the last value a nibble can take
        _ => match ops.nn {
            0x07 => Instruction::ReadDelay(ops.x),
            0x0A => Instruction::WaitKey(ops.x),
            0x15 => Instruction::SetDelay(ops.x),
            0x18 => Instruction::SetSound(ops.x),
            0x1E => Instruction::AddIndex(ops.x),
            0x29 => Instruction::FontChar(ops.x),
            0x33 => Instruction::StoreBcd(ops.x),
            0x55 => Instruction::StoreRegisters(ops.x),
            0x65 => Instruction::LoadRegisters(ops.x),
            _ => Instruction::Invalid(raw),
        },
    }
}

impl Instruction {
    /// Applies the instruction to `state`. PC has already been moved past
    /// the instruction; control flow instructions overwrite it.
    pub fn execute<R: Rng + ?Sized>(self, state: &mut Chip8State, rng: &mut R) {
        match self {
            Instruction::MachineRoutine(_) => {}
            Instruction::ClearScreen => state.display.clear(),
            Instruction::Return => match state.stack.pop() {
                Some(return_address) => state.pc = return_address,
                None => warn!("Stack underflow at {:#05X}: return ignored", state.pc),
            },
            Instruction::Jump(addr) => state.pc = addr,
            Instruction::Call(addr) => {
                if state.stack.push(state.pc) {
                    state.pc = addr;
                } else {
                    warn!("Stack overflow at {:#05X}: call to {:#05X} ignored", state.pc, addr);
                }
            }
            Instruction::SkipEqImm(x, nn) => {
                if state.registers.read(x) == nn {
                    state.skip_next();
                }
            }
            Instruction::SkipNeqImm(x, nn) => {
                if state.registers.read(x) != nn {
                    state.skip_next();
                }
            }
            Instruction::SkipEqReg(x, y) => {
                if state.registers.read(x) == state.registers.read(y) {
                    state.skip_next();
                }
            }
            Instruction::SkipNeqReg(x, y) => {
                if state.registers.read(x) != state.registers.read(y) {
                    state.skip_next();
                }
            }
            Instruction::LoadImm(x, nn) => state.registers.write(x, nn),
            Instruction::AddImm(x, nn) => {
                let value_x = state.registers.read(x);
                state.registers.write(x, value_x.wrapping_add(nn));
            }
            Instruction::Move(x, y) => {
                let value_y = state.registers.read(y);
                state.registers.write(x, value_y);
            }
            Instruction::Or(x, y) => {
                let value = state.registers.read(x) | state.registers.read(y);
                state.registers.write(x, value);
            }
            Instruction::And(x, y) => {
                let value = state.registers.read(x) & state.registers.read(y);
                state.registers.write(x, value);
            }
            Instruction::Xor(x, y) => {
                let value = state.registers.read(x) ^ state.registers.read(y);
                state.registers.write(x, value);
            }
            // The flag is written before the result, and the result is computed
            // from the registers as they stand after the flag write. When x is
            // VF the result therefore replaces the flag.
            Instruction::AddReg(x, y) => {
                let carry = u16::from(state.registers.read(x)) + u16::from(state.registers.read(y)) > 0xFF;
                state.registers.set_flag(carry);
                let sum = state.registers.read(x).wrapping_add(state.registers.read(y));
                state.registers.write(x, sum);
            }
            Instruction::Sub(x, y) => {
                let no_borrow = state.registers.read(x) >= state.registers.read(y);
                state.registers.set_flag(no_borrow);
                let difference = state.registers.read(x).wrapping_sub(state.registers.read(y));
                state.registers.write(x, difference);
            }
            Instruction::SubN(x, y) => {
                let no_borrow = state.registers.read(y) >= state.registers.read(x);
                state.registers.set_flag(no_borrow);
                let difference = state.registers.read(y).wrapping_sub(state.registers.read(x));
                state.registers.write(x, difference);
            }
            Instruction::ShiftRight(x) => {
                let shifted_out = state.registers.read(x) & 0x01 != 0;
                state.registers.set_flag(shifted_out);
                let value_x = state.registers.read(x);
                state.registers.write(x, value_x >> 1);
            }
            Instruction::ShiftLeft(x) => {
                let shifted_out = state.registers.read(x) & 0x80 != 0;
                state.registers.set_flag(shifted_out);
                let value_x = state.registers.read(x);
                state.registers.write(x, value_x << 1);
            }
            Instruction::LoadIndex(addr) => state.index = addr,
            Instruction::JumpOffset(addr) => {
                state.pc = Address::from(state.registers.read(Register::V0)) + addr;
            }
            Instruction::Random(x, nn) => {
                let random_value = rng.random::<u8>() & nn;
                state.registers.write(x, random_value);
            }
            Instruction::Draw(x, y, rows) => {
                let origin_x = usize::from(state.registers.read(x));
                let origin_y = usize::from(state.registers.read(y));
                let sprite = state.memory.read_sprite(state.index, rows);
                let collision = state.display.draw_sprite(origin_x, origin_y, &sprite);
                state.registers.set_flag(collision);
            }
            Instruction::SkipKeyPressed(x) => {
                if key_down(state, x) {
                    state.skip_next();
                }
            }
            Instruction::SkipKeyNotPressed(x) => {
                if !key_down(state, x) {
                    state.skip_next();
                }
            }
            Instruction::ReadDelay(x) => state.registers.write(x, state.timers.delay),
            Instruction::WaitKey(x) => match state.keypad.poll_wait() {
                Some(key) => state.registers.write(x, key.index()),
                // Rewind so this instruction runs again next cycle.
                None => state.pc = state.pc.wrapping_sub(2),
            },
            Instruction::SetDelay(x) => state.timers.delay = state.registers.read(x),
            Instruction::SetSound(x) => state.timers.sound = state.registers.read(x),
            Instruction::AddIndex(x) => {
                state.index = state
                    .index
                    .wrapping_add(Address::from(state.registers.read(x)));
            }
            Instruction::FontChar(x) => {
                let digit = Address::from(state.registers.read(x) & 0x0F);
                state.index = FONT_ADDR + digit * FONT_HEIGHT as Address;
            }
            Instruction::StoreBcd(x) => {
                let value_x = state.registers.read(x);
                let bcd = [value_x / 100, (value_x / 10) % 10, value_x % 10];
                for (offset, digit) in (0..).zip(bcd) {
                    state.memory.write(state.index.wrapping_add(offset), digit);
                }
            }
            Instruction::StoreRegisters(x) => {
                for (offset, reg) in (0..).zip(&Register::ALL[..=x.index()]) {
                    let value = state.registers.read(*reg);
                    state.memory.write(state.index.wrapping_add(offset), value);
                }
            }
            Instruction::LoadRegisters(x) => {
                for (offset, reg) in (0..).zip(&Register::ALL[..=x.index()]) {
                    let value = state.memory.read(state.index.wrapping_add(offset));
                    state.registers.write(*reg, value);
                }
            }
            Instruction::Invalid(raw) => {
                warn!("Invalid opcode {:#06X} at {:#05X}", raw, state.pc.wrapping_sub(2));
            }
        }
    }
}

/// Key named by register `x`; values of 16 and above are never pressed.
fn key_down(state: &Chip8State, x: Register) -> bool {
    Key::from_index(state.registers.read(x))
        .map(|key| state.keypad.is_key_pressed(key))
        .unwrap_or(false)
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Instruction::MachineRoutine(addr) => write!(f, "SYS {addr:#05X}"),
            Instruction::ClearScreen => write!(f, "CLS"),
            Instruction::Return => write!(f, "RET"),
            Instruction::Jump(addr) => write!(f, "JP {addr:#05X}"),
            Instruction::Call(addr) => write!(f, "CALL {addr:#05X}"),
            Instruction::SkipEqImm(x, nn) => write!(f, "SE {x:?}, {nn:#04X}"),
            Instruction::SkipNeqImm(x, nn) => write!(f, "SNE {x:?}, {nn:#04X}"),
            Instruction::SkipEqReg(x, y) => write!(f, "SE {x:?}, {y:?}"),
            Instruction::LoadImm(x, nn) => write!(f, "LD {x:?}, {nn:#04X}"),
            Instruction::AddImm(x, nn) => write!(f, "ADD {x:?}, {nn:#04X}"),
            Instruction::Move(x, y) => write!(f, "LD {x:?}, {y:?}"),
            Instruction::Or(x, y) => write!(f, "OR {x:?}, {y:?}"),
            Instruction::And(x, y) => write!(f, "AND {x:?}, {y:?}"),
            Instruction::Xor(x, y) => write!(f, "XOR {x:?}, {y:?}"),
            Instruction::AddReg(x, y) => write!(f, "ADD {x:?}, {y:?}"),
            Instruction::Sub(x, y) => write!(f, "SUB {x:?}, {y:?}"),
            Instruction::ShiftRight(x) => write!(f, "SHR {x:?}"),
            Instruction::SubN(x, y) => write!(f, "SUBN {x:?}, {y:?}"),
            Instruction::ShiftLeft(x) => write!(f, "SHL {x:?}"),
            Instruction::SkipNeqReg(x, y) => write!(f, "SNE {x:?}, {y:?}"),
            Instruction::LoadIndex(addr) => write!(f, "LD I, {addr:#05X}"),
            Instruction::JumpOffset(addr) => write!(f, "JP V0, {addr:#05X}"),
            Instruction::Random(x, nn) => write!(f, "RND {x:?}, {nn:#04X}"),
            Instruction::Draw(x, y, n) => write!(f, "DRW {x:?}, {y:?}, {n}"),
            Instruction::SkipKeyPressed(x) => write!(f, "SKP {x:?}"),
            Instruction::SkipKeyNotPressed(x) => write!(f, "SKNP {x:?}"),
            Instruction::ReadDelay(x) => write!(f, "LD {x:?}, DT"),
            Instruction::WaitKey(x) => write!(f, "LD {x:?}, K"),
            Instruction::SetDelay(x) => write!(f, "LD DT, {x:?}"),
            Instruction::SetSound(x) => write!(f, "LD ST, {x:?}"),
            Instruction::AddIndex(x) => write!(f, "ADD I, {x:?}"),
            Instruction::FontChar(x) => write!(f, "LD F, {x:?}"),
            Instruction::StoreBcd(x) => write!(f, "LD B, {x:?}"),
            Instruction::StoreRegisters(x) => write!(f, "LD [I], {x:?}"),
            Instruction::LoadRegisters(x) => write!(f, "LD {x:?}, [I]"),
            Instruction::Invalid(raw) => write!(f, "??? {raw:#06X}"),
        }
    }
}
