use chip8_vm::state::{MAX_PROGRAM_SIZE, PC_START_ADDR};
use chip8_vm::{Chip8, Config};

fn vm() -> Chip8 {
    Chip8::new(Config::default().with_cycles_per_second(600.0).with_seed(7))
        .expect("valid config")
}

fn program(words: &[u16]) -> Vec<u8> {
    words.iter().flat_map(|w| w.to_be_bytes()).collect()
}

fn run(vm: &mut Chip8, words: &[u16]) {
    vm.load_program(&program(words)).expect("program fits");
    for _ in 0..words.len() {
        vm.step(false);
    }
}

#[test]
fn largest_program_loads_and_one_more_byte_is_refused() -> anyhow::Result<()> {
    let mut vm = vm();
    vm.load_program(&program(&[0x6042]))?;
    vm.step(false);

    assert!(vm.load_program(&vec![0x11; MAX_PROGRAM_SIZE + 1]).is_err());
    assert_eq!(vm.pc(), PC_START_ADDR + 2);
    assert_eq!(vm.registers()[0], 0x42);
    assert_eq!(vm.peek(PC_START_ADDR), 0x60);

    vm.load_program(&vec![0x11; MAX_PROGRAM_SIZE])?;
    assert_eq!(vm.pc(), PC_START_ADDR);
    assert_eq!(vm.registers()[0], 0);
    assert_eq!(vm.peek(0xFFF), 0x11);
    Ok(())
}

#[test]
fn font_is_resident_after_load() -> anyhow::Result<()> {
    let mut vm = vm();
    vm.load_program(&[])?;
    let zero: Vec<u8> = (0..5).map(|a| vm.peek(a)).collect();
    assert_eq!(zero, vec![0xF0, 0x90, 0x90, 0x90, 0xF0]);
    let f: Vec<u8> = (75..80).map(|a| vm.peek(a)).collect();
    assert_eq!(f, vec![0xF0, 0x80, 0xF0, 0x80, 0x80]);
    Ok(())
}

#[test]
fn load_then_add_immediate_wraps() {
    let mut vm = vm();
    run(&mut vm, &[0x6005, 0x70FE]);
    assert_eq!(vm.registers()[0], 0x03);
    assert_eq!(vm.registers()[0xF], 0);
}

#[test]
fn register_add_reports_carry() {
    let mut vm = vm();
    run(&mut vm, &[0x60C8, 0x6164, 0x8014]);
    assert_eq!(vm.registers()[0], 44);
    assert_eq!(vm.registers()[0xF], 1);
}

#[test]
fn register_sub_reports_no_borrow() {
    let mut vm = vm();
    run(&mut vm, &[0x600A, 0x6103, 0x8015]);
    assert_eq!(vm.registers()[0], 7);
    assert_eq!(vm.registers()[0xF], 1);
}

#[test]
fn redrawing_a_sprite_erases_it_and_flags_collision() {
    let mut vm = vm();
    // I -> 0x20A, a single 0xFF row stored after the code
    let code = [0xA20A, 0xD011, 0x6E00, 0xD011, 0x1208, 0xFF00];
    vm.load_program(&program(&code)).expect("program fits");

    vm.step(false);
    vm.step(false);
    assert_eq!(vm.registers()[0xF], 0);
    assert!((0..8).all(|x| vm.get_pixel(x, 0)));

    vm.step(false);
    vm.step(false);
    assert_eq!(vm.registers()[0xF], 1);
    assert!((0..8).all(|x| !vm.get_pixel(x, 0)));
}

#[test]
fn sprites_clip_at_the_right_edge() {
    let mut vm = vm();
    let code = [0xA208, 0x603C, 0xD011, 0x1206, 0xFF00];
    vm.load_program(&program(&code)).expect("program fits");
    for _ in 0..3 {
        vm.step(false);
    }
    assert!((60..64).all(|x| vm.get_pixel(x, 0)));
    assert!((0..4).all(|x| !vm.get_pixel(x, 0)));
    assert_eq!(vm.registers()[0xF], 0);
}

#[test]
fn sprites_wrap_in_compatibility_mode() -> anyhow::Result<()> {
    let mut vm = Chip8::new(Config::default().with_wrap_sprites(true).with_seed(7))?;
    let code = [0xA208, 0x603C, 0xD011, 0x1206, 0xFF00];
    vm.load_program(&program(&code))?;
    for _ in 0..3 {
        vm.step(false);
    }
    assert!((60..64).all(|x| vm.get_pixel(x, 0)));
    assert!((0..4).all(|x| vm.get_pixel(x, 0)));
    Ok(())
}

/// Sets both timers to 100, then spins on a jump-to-self.
const TIMER_SPIN: [u16; 4] = [0x6064, 0xF015, 0xF018, 0x1206];

#[test]
fn one_second_ticks_timers_sixty_times() {
    let mut vm = vm();
    vm.load_program(&program(&TIMER_SPIN)).expect("program fits");
    for _ in 0..3 {
        vm.step(false);
    }
    vm.advance(1.0);
    assert_eq!(vm.delay_timer(), 40);
    assert_eq!(vm.sound_timer(), 40);
    assert!(vm.sound_active());

    vm.advance(1.0);
    assert_eq!(vm.delay_timer(), 0);
    assert!(!vm.sound_active());
}

#[test]
fn frame_size_does_not_change_cycle_or_tick_counts() {
    // Increments V1 once per pass through a two-instruction loop.
    let counter = [0x7101, 0x1200];

    let mut one_shot = vm();
    one_shot.load_program(&program(&counter)).expect("program fits");
    one_shot.advance(1.0);

    let mut sliced = vm();
    sliced.load_program(&program(&counter)).expect("program fits");
    for _ in 0..60 {
        sliced.advance(1.0 / 60.0);
    }

    // 600 cycles alternate between the two instructions: 300 increments.
    assert_eq!(one_shot.registers()[1], (300 % 256) as u8);
    assert_eq!(one_shot.pc(), PC_START_ADDR);
    assert_eq!(one_shot.registers(), sliced.registers());
    assert_eq!(one_shot.pc(), sliced.pc());
}

#[test]
fn timers_tick_sixty_times_across_sliced_frames() {
    let mut vm = vm();
    vm.load_program(&program(&TIMER_SPIN)).expect("program fits");
    for _ in 0..3 {
        vm.step(false);
    }
    for _ in 0..60 {
        vm.advance(1.0 / 60.0);
    }
    assert_eq!(vm.delay_timer(), 40);
}

#[test]
fn stepping_with_time_ticks_timers() {
    let mut vm = vm();
    vm.load_program(&program(&TIMER_SPIN)).expect("program fits");
    for _ in 0..3 {
        vm.step(false);
    }
    for _ in 0..600 {
        vm.step(true);
    }
    assert_eq!(vm.delay_timer(), 40);

    for _ in 0..600 {
        vm.step(false);
    }
    assert_eq!(vm.delay_timer(), 40);
}

#[test]
fn store_bcd() {
    let mut vm = vm();
    run(&mut vm, &[0x60EA, 0xA300, 0xF033]);
    assert_eq!(vm.peek(0x300), 2);
    assert_eq!(vm.peek(0x301), 3);
    assert_eq!(vm.peek(0x302), 4);
}

#[test]
fn wait_for_key_stalls_until_a_press() {
    let mut vm = vm();
    vm.load_program(&program(&[0xF50A, 0x6101])).expect("program fits");

    for _ in 0..10 {
        vm.step(false);
        assert_eq!(vm.pc(), PC_START_ADDR);
        assert!(vm.waiting_for_key());
    }
    vm.advance(0.5);
    assert_eq!(vm.pc(), PC_START_ADDR);
    assert_eq!(vm.registers()[1], 0);

    vm.key_pressed(0xC);
    vm.step(false);
    assert_eq!(vm.registers()[5], 0xC);
    assert_eq!(vm.pc(), PC_START_ADDR + 2);
    assert!(!vm.waiting_for_key());

    vm.step(false);
    assert_eq!(vm.registers()[1], 1);
}

#[test]
fn key_pressed_before_the_wait_is_not_consumed() {
    let mut vm = vm();
    vm.load_program(&program(&[0xF50A])).expect("program fits");
    vm.key_pressed(0x3);
    vm.step(false);
    vm.step(false);
    assert_eq!(vm.pc(), PC_START_ADDR);

    vm.key_released(0x3);
    vm.key_pressed(0x3);
    vm.step(false);
    assert_eq!(vm.registers()[5], 0x3);
}

#[test]
fn skip_if_key_pressed_follows_key_state() {
    let mut vm = vm();
    let code = program(&[0x6007, 0xE09E, 0x6101, 0x6202]);
    vm.load_program(&code).expect("program fits");
    vm.key_pressed(7);
    vm.step(false);
    vm.step(false);
    assert_eq!(vm.pc(), PC_START_ADDR + 6);

    vm.load_program(&code).expect("program fits");
    vm.key_pressed(7);
    vm.key_released(7);
    vm.step(false);
    vm.step(false);
    assert_eq!(vm.pc(), PC_START_ADDR + 4);
}

#[test]
fn out_of_range_keys_are_ignored() {
    let mut vm = vm();
    vm.load_program(&program(&[0xF50A])).expect("program fits");
    vm.step(false);
    vm.key_pressed(16);
    vm.key_released(200);
    vm.step(false);
    assert_eq!(vm.pc(), PC_START_ADDR);
    assert!(vm.waiting_for_key());
}

#[test]
fn call_then_return_resumes_after_the_call() {
    let mut vm = vm();
    // 0x200: CALL 0x206; 0x202: LD V1, 1; 0x204: JP 0x204; 0x206: RET
    vm.load_program(&program(&[0x2206, 0x6101, 0x1204, 0x00EE]))
        .expect("program fits");
    vm.step(false);
    assert_eq!(vm.pc(), 0x206);
    vm.step(false);
    assert_eq!(vm.pc(), 0x202);
    vm.step(false);
    assert_eq!(vm.registers()[1], 1);
}

#[test]
fn unbalanced_return_and_invalid_opcodes_fall_through() {
    let mut vm = vm();
    run(&mut vm, &[0x00EE, 0x8008, 0xE0FF, 0x6103]);
    assert_eq!(vm.pc(), PC_START_ADDR + 8);
    assert_eq!(vm.registers()[1], 3);
}

#[test]
fn runaway_recursion_does_not_crash() {
    let mut vm = vm();
    // CALL 0x200 forever; the 129th call finds the stack full
    vm.load_program(&program(&[0x2200])).expect("program fits");
    for _ in 0..128 {
        vm.step(false);
        assert_eq!(vm.pc(), 0x200);
    }
    vm.step(false);
    assert_eq!(vm.pc(), 0x202);
}

#[test]
fn seeded_random_is_reproducible() -> anyhow::Result<()> {
    let code = program(&[0xC0FF, 0xC1FF, 0xC20F]);
    let mut a = Chip8::new(Config::default().with_seed(1234))?;
    let mut b = Chip8::new(Config::default().with_seed(1234))?;
    for vm in [&mut a, &mut b] {
        vm.load_program(&code)?;
        for _ in 0..3 {
            vm.step(false);
        }
    }
    assert_eq!(a.registers(), b.registers());
    assert!(a.registers()[2] <= 0x0F);
    Ok(())
}

#[test]
fn memory_accesses_near_the_top_wrap() {
    let mut vm = vm();
    run(&mut vm, &[0x6001, 0x6102, 0xAFFF, 0xF155]);
    assert_eq!(vm.peek(0xFFF), 1);
    assert_eq!(vm.peek(0x000), 2);
}
