//! The core execution unit: a 128-byte self-modifying tape interpreted
//! under a 10-opcode Brainfuck-variant instruction set.
//!
//! Bracket matching is dynamic (scanned against the live tape on every
//! taken jump) because the tape can rewrite its own brackets mid-run;
//! a precomputed jump table would go stale the moment a program
//! overwrites itself.

use crate::error::{Result, SoupError};

/// Length of a single program, as owned by the soup's population.
pub const PROGRAM_LEN: usize = 64;
/// Length of a tape: two concatenated programs.
pub const TAPE_LEN: usize = 128;

/// A single population member: a fixed-size, raw byte program.
pub type Program = [u8; PROGRAM_LEN];

const HEAD0_DEC: u8 = b'<';
const HEAD0_INC: u8 = b'>';
const HEAD1_DEC: u8 = b'{';
const HEAD1_INC: u8 = b'}';
const DECREMENT: u8 = b'-';
const INCREMENT: u8 = b'+';
const COPY_TO_H1: u8 = b'.';
const COPY_TO_H0: u8 = b',';
const LOOP_START: u8 = b'[';
const LOOP_END: u8 = b']';

/// Returns true if `byte` is one of the 10 real opcodes (as opposed to
/// a no-op byte).
pub fn is_instruction(byte: u8) -> bool {
    matches!(
        byte,
        HEAD0_DEC | HEAD0_INC | HEAD1_DEC | HEAD1_INC | DECREMENT | INCREMENT | COPY_TO_H1
            | COPY_TO_H0 | LOOP_START | LOOP_END
    )
}

/// Which pointer left the `[0, 128)` range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OobPointer {
    Pc,
    Head0,
    Head1,
}

/// Closed set of halt conditions. `Normal` is reserved for future
/// opcode extensions and is never emitted by this instruction set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HaltReason {
    StepLimit,
    OobPointer,
    PcOob,
    UnmatchedBracket,
    Normal,
}

/// The outcome of running a tape to its halt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunResult {
    pub steps: usize,
    pub halt_reason: HaltReason,
    /// Present only when `halt_reason` is `PcOob` or `OobPointer`.
    pub oob_pointer: Option<OobPointer>,
    /// Present only when `halt_reason` is `UnmatchedBracket`: the PC at
    /// which the unmatched bracket was read.
    pub unmatched_at: Option<usize>,
}

impl RunResult {
    fn halt(steps: usize, halt_reason: HaltReason) -> Self {
        Self { steps, halt_reason, oob_pointer: None, unmatched_at: None }
    }

    fn oob(steps: usize, reason: HaltReason, pointer: OobPointer) -> Self {
        Self { steps, halt_reason: reason, oob_pointer: Some(pointer), unmatched_at: None }
    }

    fn unmatched(steps: usize, at: usize) -> Self {
        Self { steps, halt_reason: HaltReason::UnmatchedBracket, oob_pointer: None, unmatched_at: Some(at) }
    }
}

/// Executes one tape to a well-defined halt. Borrows its tape; does no
/// allocation of its own.
pub struct Vm<'a> {
    tape: &'a mut [u8],
    step_limit: usize,
    pc: i64,
    head0: i64,
    head1: i64,
    steps: usize,
}

impl<'a> Vm<'a> {
    /// Standard construction: `head0` starts at 0, `head1` at 64 (the
    /// boundary between the two concatenated programs).
    pub fn new(tape: &'a mut [u8], step_limit: usize) -> Result<Self> {
        Self::with_heads(tape, step_limit, 0, PROGRAM_LEN)
    }

    /// Construction with explicit initial head positions, for callers
    /// that want a non-standard starting configuration (e.g. assays
    /// that run the VM from a custom cut point).
    pub fn with_heads(tape: &'a mut [u8], step_limit: usize, init_head0: usize, init_head1: usize) -> Result<Self> {
        if tape.len() != TAPE_LEN {
            return Err(SoupError::InvalidTape { expected: TAPE_LEN, actual: tape.len() });
        }
        Ok(Self {
            tape,
            step_limit,
            pc: 0,
            head0: init_head0 as i64,
            head1: init_head1 as i64,
            steps: 0,
        })
    }

    fn pc_in_bounds(&self) -> bool {
        self.pc >= 0 && (self.pc as usize) < TAPE_LEN
    }

    fn head_in_bounds(h: i64) -> bool {
        h >= 0 && (h as usize) < TAPE_LEN
    }

    /// Checks both heads, head0 first, and returns the halt for the
    /// first one found out of range (or `None` if both are in bounds).
    fn check_heads(&self) -> Option<RunResult> {
        if !Self::head_in_bounds(self.head0) {
            return Some(RunResult::oob(self.steps, HaltReason::OobPointer, OobPointer::Head0));
        }
        if !Self::head_in_bounds(self.head1) {
            return Some(RunResult::oob(self.steps, HaltReason::OobPointer, OobPointer::Head1));
        }
        None
    }

    fn check_head0(&self) -> Option<RunResult> {
        if !Self::head_in_bounds(self.head0) {
            return Some(RunResult::oob(self.steps, HaltReason::OobPointer, OobPointer::Head0));
        }
        None
    }

    /// Scan forward from `pc + 1` for the bracket matching a `[` at
    /// `pc`, tracking nesting depth against the *current* tape
    /// contents. Returns the index of the matching `]`.
    fn scan_forward(&self) -> Option<usize> {
        let mut depth: i64 = 1;
        let mut scan = self.pc + 1;
        while (scan as usize) < TAPE_LEN {
            match self.tape[scan as usize] {
                LOOP_START => depth += 1,
                LOOP_END => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(scan as usize);
                    }
                }
                _ => {}
            }
            scan += 1;
        }
        None
    }

    /// Scan backward from `pc - 1` for the bracket matching a `]` at
    /// `pc`. Returns the index of the matching `[`.
    fn scan_backward(&self) -> Option<usize> {
        let mut depth: i64 = 1;
        let mut scan = self.pc - 1;
        while scan >= 0 {
            match self.tape[scan as usize] {
                LOOP_END => depth += 1,
                LOOP_START => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(scan as usize);
                    }
                }
                _ => {}
            }
            scan -= 1;
        }
        None
    }

    /// Run the tape to its halt. Deterministic function of the initial
    /// state; consumes no randomness.
    pub fn run(mut self) -> RunResult {
        while self.steps < self.step_limit {
            if !self.pc_in_bounds() {
                return RunResult::oob(self.steps, HaltReason::PcOob, OobPointer::Pc);
            }
            let opcode = self.tape[self.pc as usize];
            match opcode {
                HEAD0_INC => {
                    self.head0 += 1;
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                }
                HEAD0_DEC => {
                    self.head0 -= 1;
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                }
                HEAD1_INC => {
                    self.head1 += 1;
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                }
                HEAD1_DEC => {
                    self.head1 -= 1;
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                }
                INCREMENT => {
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                    let idx = self.head0 as usize;
                    self.tape[idx] = self.tape[idx].wrapping_add(1);
                }
                DECREMENT => {
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                    let idx = self.head0 as usize;
                    self.tape[idx] = self.tape[idx].wrapping_sub(1);
                }
                COPY_TO_H1 => {
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                    let src = self.head0 as usize;
                    let dst = self.head1 as usize;
                    self.tape[dst] = self.tape[src];
                }
                COPY_TO_H0 => {
                    if let Some(halt) = self.check_heads() {
                        return halt;
                    }
                    let dst = self.head0 as usize;
                    let src = self.head1 as usize;
                    self.tape[dst] = self.tape[src];
                }
                LOOP_START => {
                    if let Some(halt) = self.check_head0() {
                        return halt;
                    }
                    if self.tape[self.head0 as usize] == 0 {
                        match self.scan_forward() {
                            Some(target) => self.pc = target as i64,
                            None => return RunResult::unmatched(self.steps, self.pc as usize),
                        }
                    }
                }
                LOOP_END => {
                    if let Some(halt) = self.check_head0() {
                        return halt;
                    }
                    if self.tape[self.head0 as usize] != 0 {
                        match self.scan_backward() {
                            Some(target) => self.pc = target as i64,
                            None => return RunResult::unmatched(self.steps, self.pc as usize),
                        }
                    }
                }
                _ => {} // no-op: still consumes a step
            }
            self.pc += 1;
            self.steps += 1;
        }
        RunResult::halt(self.steps, HaltReason::StepLimit)
    }
}

/// Human-readable disassembly of a tape, for ad hoc inspection (e.g.
/// behind `--log-events` in the driver). Has no effect on simulation
/// semantics.
pub fn disassemble(tape: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    for (addr, &b) in tape.iter().enumerate() {
        let (ch, mnemonic) = match b {
            HEAD0_DEC => ("<", "HEAD0--"),
            HEAD0_INC => (">", "HEAD0++"),
            HEAD1_DEC => ("{", "HEAD1--"),
            HEAD1_INC => ("}", "HEAD1++"),
            DECREMENT => ("-", "DEC"),
            INCREMENT => ("+", "INC"),
            COPY_TO_H1 => (".", "COPY0->1"),
            COPY_TO_H0 => (",", "COPY1->0"),
            LOOP_START => ("[", "LOOP_START"),
            LOOP_END => ("]", "LOOP_END"),
            _ => ("", "NOP"),
        };
        let _ = writeln!(out, "{addr:04X}: {b:02X}  {ch:<2} {mnemonic}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tape_of(bytes: &[u8]) -> Vec<u8> {
        let mut tape = vec![0u8; TAPE_LEN];
        tape[..bytes.len()].copy_from_slice(bytes);
        tape
    }

    #[test]
    fn identity_on_all_zero_tape_halts_on_step_limit() {
        let mut tape = vec![0u8; TAPE_LEN];
        let before = tape.clone();
        let result = Vm::new(&mut tape, 1024).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::StepLimit);
        assert_eq!(tape, before);
    }

    #[test]
    fn step_limit_zero_returns_immediately_unchanged() {
        let mut tape = tape_of(b"+");
        let before = tape.clone();
        let result = Vm::new(&mut tape, 0).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::StepLimit);
        assert_eq!(result.steps, 0);
        assert_eq!(tape, before);
    }

    #[test]
    fn single_pointer_increment_then_step_limit() {
        let mut tape = tape_of(b"+");
        let result = Vm::new(&mut tape, 1).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::StepLimit);
        assert_eq!(result.steps, 1);
        assert_eq!(tape[0], b'+' + 1);
    }

    #[test]
    fn invalid_tape_length_is_rejected() {
        let mut tape = vec![0u8; 64];
        let err = Vm::new(&mut tape, 1024).unwrap_err();
        matches!(err, SoupError::InvalidTape { expected: 128, actual: 64 });
    }

    #[test]
    fn head0_walks_off_the_end_halts_oob() {
        // 128 '>' bytes: head0 starts at 0 and runs off the right edge
        // on the 128th move (0 -> 128 is out of [0,128)).
        let mut tape = vec![b'>'; TAPE_LEN];
        let result = Vm::new(&mut tape, 10_000).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::OobPointer);
        assert_eq!(result.oob_pointer, Some(OobPointer::Head0));
    }

    #[test]
    fn head1_walks_off_the_start_halts_oob() {
        let mut tape = vec![b'{'; TAPE_LEN];
        // head1 starts at 64, so it takes 65 decrements to go negative.
        let result = Vm::new(&mut tape, 10_000).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::OobPointer);
        assert_eq!(result.oob_pointer, Some(OobPointer::Head1));
    }

    #[test]
    fn unmatched_open_bracket_halts_with_pc() {
        // '[' only attempts its forward jump when tape[head0] == 0, so park
        // head0 on an untouched (zero) cell before placing an unmatched '['.
        let mut tape = vec![0u8; TAPE_LEN];
        for i in 0..5 {
            tape[i] = b'>'; // head0 -> 5, pc -> 5
        }
        // tape[5] stays 0 (a no-op byte, also the cell head0 now points at).
        tape[6] = b'[';
        let result = Vm::new(&mut tape, 1024).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::UnmatchedBracket);
        assert_eq!(result.unmatched_at, Some(6));
    }

    #[test]
    fn unmatched_close_bracket_halts_with_pc() {
        let mut tape = tape_of(b"+]");
        let result = Vm::new(&mut tape, 1024).unwrap().run();
        assert_eq!(result.halt_reason, HaltReason::UnmatchedBracket);
        assert_eq!(result.unmatched_at, Some(1));
    }

    #[test]
    fn well_formed_loop_zeroes_a_counter() {
        let mut tape = vec![0u8; TAPE_LEN];
        // Program occupies [0..10): 10 '>' moves head0 to 10.
        for i in 0..10 {
            tape[i] = b'>';
        }
        tape[10] = 3; // data cell, head0 now at 10
        tape[11] = b'['; // while tape[10] != 0
        tape[12] = b'-';
        tape[13] = b']';
        let result = Vm::new(&mut tape, 1024).unwrap().run();
        assert_eq!(tape[10], 0);
        assert!(matches!(result.halt_reason, HaltReason::StepLimit | HaltReason::PcOob));
    }

    #[test]
    fn dynamic_bracket_scan_sees_self_modified_tape() {
        let mut tape = vec![0u8; TAPE_LEN];
        for i in 0..10 {
            tape[i] = b'>';
        }
        tape[10] = 3;
        tape[11] = b'[';
        tape[12] = b'-';
        tape[13] = b']';
        Vm::new(&mut tape, 8192).unwrap().run();
        assert_eq!(tape[10], 0);
    }

    #[test]
    fn is_instruction_classifies_the_ten_opcodes() {
        for b in b"<>{}+-.,[]" {
            assert!(is_instruction(*b));
        }
        assert!(!is_instruction(b'a'));
        assert!(!is_instruction(0));
    }
}
