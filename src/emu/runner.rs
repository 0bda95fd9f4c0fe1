use std::time::Duration;

use super::{Buzzer, Chip8, Chip8Error, Keypad, Screen, ToneLatch};

pub const DEFAULT_CPU_HZ: u32 = 500;
pub const TIMER_HZ: u32 = 60;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// What a single `update` call did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RunnerReport {
    pub cycles: u32,
    pub timer_ticks: u32,
    pub redrawn: bool,
}

/// High-level emulator runner that manages timing internally.
///
/// Instruction cycles and timer ticks are two independent cadences. Each
/// accumulates elapsed nanoseconds multiplied by its rate, so one event is
/// due per whole second of scaled time and no period is ever rounded.
pub struct Chip8Runner {
    chip8: Chip8,
    cpu_hz: u32,
    cpu_accumulator: u128,
    timer_accumulator: u128,
    tone: ToneLatch,
}

impl Chip8Runner {
    pub fn new(chip8: Chip8) -> Self {
        Self::with_cpu_hz(chip8, DEFAULT_CPU_HZ)
    }

    /// Panics if `cpu_hz` is zero.
    pub fn with_cpu_hz(chip8: Chip8, cpu_hz: u32) -> Self {
        assert!(cpu_hz > 0, "instruction rate must be positive");
        Self {
            chip8,
            cpu_hz,
            cpu_accumulator: 0,
            timer_accumulator: 0,
            tone: ToneLatch::new(),
        }
    }

    /// Update emulator by delta time, handles both CPU and timer cycles.
    ///
    /// Runs every CPU cycle and timer tick that fell due within `dt`, oldest
    /// first. The screen is presented once at the end if any cycle changed
    /// the display; the buzzer only hears about sound timer transitions.
    pub fn update(
        &mut self,
        dt: Duration,
        keypad: &dyn Keypad,
        screen: &mut dyn Screen,
        buzzer: &mut dyn Buzzer,
    ) -> Result<RunnerReport, Chip8Error> {
        let nanos = dt.as_nanos();
        self.cpu_accumulator = self
            .cpu_accumulator
            .saturating_add(nanos.saturating_mul(u128::from(self.cpu_hz)));
        self.timer_accumulator = self
            .timer_accumulator
            .saturating_add(nanos.saturating_mul(u128::from(TIMER_HZ)));

        let mut report = RunnerReport::default();
        let result = self.run_due_ticks(keypad, buzzer, &mut report);

        // Present whatever was drawn before a fatal error too
        if report.redrawn {
            screen.present(&self.chip8.display);
        }

        result.map(|()| report)
    }

    fn run_due_ticks(
        &mut self,
        keypad: &dyn Keypad,
        buzzer: &mut dyn Buzzer,
        report: &mut RunnerReport,
    ) -> Result<(), Chip8Error> {
        while let Some(tick) = self.next_due_tick() {
            match tick {
                Tick::Timer => {
                    self.timer_accumulator -= NANOS_PER_SEC;
                    self.chip8.timers_cycle();
                    report.timer_ticks += 1;
                }
                Tick::Cpu => {
                    self.cpu_accumulator -= NANOS_PER_SEC;
                    let result = self.chip8.cpu_cycle(keypad)?;
                    report.cycles += 1;
                    report.redrawn |= result.is_dirty();
                }
            }

            self.tone.sync(self.chip8.should_beep(), buzzer);
        }

        Ok(())
    }

    /// Whichever due tick became due first. The larger overshoot past its
    /// period is the older one; timers win ties.
    fn next_due_tick(&self) -> Option<Tick> {
        let cpu_overdue = self.cpu_accumulator.checked_sub(NANOS_PER_SEC);
        let timer_overdue = self.timer_accumulator.checked_sub(NANOS_PER_SEC);

        match (cpu_overdue, timer_overdue) {
            (None, None) => None,
            (Some(_), None) => Some(Tick::Cpu),
            (None, Some(_)) => Some(Tick::Timer),
            // Overshoots are in rate-scaled units, compare them as times
            (Some(cpu), Some(timer))
                if timer.saturating_mul(u128::from(self.cpu_hz))
                    >= cpu.saturating_mul(u128::from(TIMER_HZ)) =>
            {
                Some(Tick::Timer)
            }
            (Some(_), Some(_)) => Some(Tick::Cpu),
        }
    }

    /// Returns true if the sound timer is active, indicating a beep should be played.
    pub fn should_beep(&self) -> bool {
        self.chip8.should_beep()
    }

    pub fn cpu_hz(&self) -> u32 {
        self.cpu_hz
    }

    pub fn chip8_ref(&self) -> &Chip8 {
        &self.chip8
    }
}

enum Tick {
    Cpu,
    Timer,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emu::{KeypadState, MockBuzzer, MockScreen};

    fn runner_with(program: &[u16], cpu_hz: u32) -> Chip8Runner {
        let mut chip8 = Chip8::default();
        let rom: Vec<u8> = program.iter().flat_map(|w| w.to_be_bytes()).collect();
        chip8.load(&rom).unwrap();
        Chip8Runner::with_cpu_hz(chip8, cpu_hz)
    }

    fn quiet_buzzer() -> MockBuzzer {
        let mut buzzer = MockBuzzer::new();
        buzzer.expect_start_tone().never();
        buzzer.expect_stop_tone().never();
        buzzer
    }

    fn idle_screen() -> MockScreen {
        let mut screen = MockScreen::new();
        screen.expect_present().never();
        screen
    }

    #[test]
    fn nothing_runs_before_a_full_period() {
        let mut runner = runner_with(&[0x1200], 500);
        let report = runner
            .update(
                Duration::from_micros(1_999),
                &KeypadState::new(),
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert_eq!(report, RunnerReport::default());
    }

    #[test]
    fn cadences_are_independent() {
        // 1200 loops forever on itself
        let mut chip8 = Chip8::default();
        chip8.load(&[0x12, 0x00]).unwrap();
        let mut runner = Chip8Runner::new(chip8);
        assert_eq!(runner.cpu_hz(), DEFAULT_CPU_HZ);
        let report = runner
            .update(
                Duration::from_secs(1),
                &KeypadState::new(),
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert_eq!(report.cycles, 500);
        assert_eq!(report.timer_ticks, 60);
    }

    #[test]
    fn remainders_carry_between_updates() {
        let mut runner = runner_with(&[0x1200], 500);
        let keypad = KeypadState::new();
        let mut screen = idle_screen();
        let mut buzzer = quiet_buzzer();

        let mut cycles = 0;
        let mut ticks = 0;
        // 1000 frames of 3ms: no tick may be lost to rounding
        for _ in 0..1000 {
            let report = runner
                .update(Duration::from_millis(3), &keypad, &mut screen, &mut buzzer)
                .unwrap();
            cycles += report.cycles;
            ticks += report.timer_ticks;
        }
        assert_eq!(cycles, 1500);
        assert_eq!(ticks, 180);
    }

    #[test]
    fn timer_ticks_interleave_with_cycles() {
        // V0 = 3, delay = V0, then spin reading the delay timer into V1
        let mut runner = runner_with(&[0x6003, 0xF015, 0xF107, 0x1204], 500);
        let keypad = KeypadState::new();

        // Two cycles at 500Hz happen before the first 60Hz tick
        runner
            .update(
                Duration::from_micros(4_500),
                &keypad,
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert_eq!(runner.chip8_ref().delay_timer(), 3);

        // A long frame still runs the tick at 16.7ms before the cycle at 18ms
        let report = runner
            .update(
                Duration::from_micros(14_000),
                &keypad,
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert_eq!(report.cycles, 7);
        assert_eq!(report.timer_ticks, 1);
        assert_eq!(runner.chip8_ref().delay_timer(), 2);
        assert_eq!(runner.chip8_ref().registers()[1], 2);
    }

    #[test]
    fn periods_are_not_rounded_down() {
        // A third of a second is 333_333_333.3ns, one nanosecond short is not enough
        let mut runner = runner_with(&[0x1200], 3);
        let keypad = KeypadState::new();
        let mut screen = idle_screen();
        let mut buzzer = quiet_buzzer();

        let report = runner
            .update(Duration::from_nanos(333_333_333), &keypad, &mut screen, &mut buzzer)
            .unwrap();
        assert_eq!(report.cycles, 0);

        let report = runner
            .update(Duration::from_nanos(1), &keypad, &mut screen, &mut buzzer)
            .unwrap();
        assert_eq!(report.cycles, 1);
    }

    #[test]
    fn rates_above_a_gigahertz_still_return() {
        let mut runner = runner_with(&[0x1200], 2_000_000_000);
        let report = runner
            .update(
                Duration::from_micros(1),
                &KeypadState::new(),
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert_eq!(report.cycles, 2_000);
        assert_eq!(report.timer_ticks, 0);
    }

    #[test]
    fn screen_is_presented_once_per_dirty_update() {
        // clear, clear, then spin
        let mut runner = runner_with(&[0x00E0, 0x00E0, 0x1204], 500);
        let keypad = KeypadState::new();

        let mut screen = MockScreen::new();
        screen.expect_present().times(1).return_const(());
        let report = runner
            .update(Duration::from_millis(10), &keypad, &mut screen, &mut quiet_buzzer())
            .unwrap();
        assert!(report.redrawn);

        let report = runner
            .update(
                Duration::from_millis(10),
                &keypad,
                &mut idle_screen(),
                &mut quiet_buzzer(),
            )
            .unwrap();
        assert!(!report.redrawn);
    }

    #[test]
    fn tone_starts_and_stops_once() {
        // V0 = 2, sound = V0, spin
        let mut runner = runner_with(&[0x6002, 0xF018, 0x1204], 500);
        let keypad = KeypadState::new();
        let mut screen = idle_screen();

        let mut buzzer = MockBuzzer::new();
        buzzer.expect_start_tone().times(1).return_const(());
        buzzer.expect_stop_tone().times(1).return_const(());

        // 2/60s of ticks with many cycles in between
        for _ in 0..10 {
            runner
                .update(Duration::from_millis(10), &keypad, &mut screen, &mut buzzer)
                .unwrap();
        }
        assert!(!runner.should_beep());
    }

    #[test]
    fn fatal_error_stops_the_update() {
        let mut runner = runner_with(&[0x00EE], 500);
        let result = runner.update(
            Duration::from_secs(1),
            &KeypadState::new(),
            &mut idle_screen(),
            &mut quiet_buzzer(),
        );
        assert_eq!(result, Err(Chip8Error::StackUnderflow));
    }
}
