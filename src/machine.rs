//////////////////////////////////////////////////////////////////
/// machine.rs
///
/// Forth Machine
///
/// This module defines the ForthMachine struct, which owns the kernel, the
/// host console, and the interpreter state, and performs the bootstrap:
/// installing the system variables at their fixed addresses, registering
/// every primitive with defcode, and building the handful of compound words
/// the prelude needs before it can take over.
///
use crate::internals::console::Console;
use crate::internals::dictionary::EntryFlags;
use crate::internals::messages::Msg;
use crate::internals::opcode::Opcode;
use crate::kernel::{
    Kernel, BASE_ADDR, DICT_START, HERE_ADDR, LATEST_ADDR, S0_ADDR, STATE_ADDR, WORD_BUF_ADDR,
    WORD_BUF_SIZE,
};

/// The version cell pushed by the VERSION primitive.
pub const FORTH_VERSION: i32 = 47;

/// Construction options: arena sizes and the trace switch.
#[derive(Debug, Clone, Copy)]
pub struct MachineOptions {
    pub data_size: usize,
    pub rstack_size: usize,
    pub trace: bool,
}

impl Default for MachineOptions {
    fn default() -> MachineOptions {
        MachineOptions {
            data_size: 64 * 1024,
            rstack_size: 4 * 1024,
            trace: false,
        }
    }
}

/// One element of a compound word's threaded body: a reference to a named
/// word, or an inline literal cell (branch offsets, cached cfas).
pub enum BodyCell<'a> {
    W(&'a str),
    L(i32),
}

pub struct ForthMachine {
    pub kernel: Kernel,
    pub console: Console,
    pub msg: Msg,
    pub trace: bool,
    pub exit_flag: bool,
    pub lit_cfa: i32,
}

impl ForthMachine {
    /// A machine wired to the interactive console (stdin/stdout).
    pub fn new(options: MachineOptions) -> ForthMachine {
        ForthMachine::with_console(options, Console::new())
    }

    /// A machine with a caller-supplied console; tests use a capturing one.
    pub fn with_console(options: MachineOptions, console: Console) -> ForthMachine {
        ForthMachine {
            kernel: Kernel::new(options.data_size, options.rstack_size),
            console,
            msg: Msg::new(),
            trace: options.trace,
            exit_flag: false,
            lit_cfa: 0,
        }
    }

    /// should_exit reports whether BYE or end of input has been seen.
    pub fn should_exit(&self) -> bool {
        self.exit_flag
    }

    /// clear_exit rearms the machine after a normal shutdown, so a test can
    /// feed more input.
    pub fn clear_exit(&mut self) {
        self.exit_flag = false;
    }

    /// cold_start installs the system variables and the whole primitive
    /// dictionary, then builds the bootstrap compound words.
    pub fn cold_start(&mut self) {
        let top = self.kernel.data_len() as i32;
        self.kernel.store_cell(S0_ADDR, top);
        self.kernel.store_cell(STATE_ADDR, 0);
        self.kernel.store_cell(BASE_ADDR, 10);
        self.kernel.store_cell(LATEST_ADDR, 0);
        self.kernel.store_cell(HERE_ADDR, DICT_START as i32);

        self.register_primitives();
        self.build_bootstrap_words();
        let lit = self.find_name(b"LIT");
        self.lit_cfa = self.cfa_of(lit) as i32;
        self.u_trace_event("cold start complete");
    }

    /// defcode lays out a primitive: a header whose code field is the opcode.
    fn defcode(&mut self, name: &str, flags: EntryFlags, op: Opcode) {
        self.create_entry(name.as_bytes());
        if !flags.is_empty() {
            let latest = self.latest();
            self.toggle_flag(latest, flags);
        }
        self.comma(op as i32);
    }

    /// defword lays out a compound word: a header whose code field is DOCOL,
    /// followed by the cfa of each referenced word and any literal cells.
    /// The body must arrange its own termination (EXIT, or a closing branch).
    fn defword(&mut self, name: &str, flags: EntryFlags, body: &[BodyCell]) {
        self.create_entry(name.as_bytes());
        if !flags.is_empty() {
            let latest = self.latest();
            self.toggle_flag(latest, flags);
        }
        self.comma(Opcode::Docol as i32);
        for cell in body {
            match cell {
                BodyCell::W(word) => {
                    let entry = self.find_name(word.as_bytes());
                    if entry == 0 {
                        panic!("bootstrap error: {} references undefined word {}", name, word);
                    }
                    let cfa = self.cfa_of(entry);
                    self.comma(cfa as i32);
                }
                BodyCell::L(value) => self.comma(*value),
            }
        }
    }

    fn register_primitives(&mut self) {
        use EntryFlags as F;
        use Opcode::*;

        self.defcode("DROP", F::empty(), Drop);
        self.defcode("SWAP", F::empty(), Swap);
        self.defcode("DUP", F::empty(), Dup);
        self.defcode("OVER", F::empty(), Over);
        self.defcode("ROT", F::empty(), Rot);
        self.defcode("-ROT", F::empty(), NRot);
        self.defcode("2DROP", F::empty(), TwoDrop);
        self.defcode("2DUP", F::empty(), TwoDup);
        self.defcode("2SWAP", F::empty(), TwoSwap);
        self.defcode("?DUP", F::empty(), QDup);
        self.defcode("1+", F::empty(), Incr);
        self.defcode("1-", F::empty(), Decr);
        self.defcode("4+", F::empty(), Incr4);
        self.defcode("4-", F::empty(), Decr4);
        self.defcode("+", F::empty(), Add);
        self.defcode("-", F::empty(), Sub);
        self.defcode("*", F::empty(), Mul);
        self.defcode("/MOD", F::empty(), DivMod);
        self.defcode("=", F::empty(), Equ);
        self.defcode("<>", F::empty(), NEqu);
        self.defcode("<", F::empty(), Lt);
        self.defcode(">", F::empty(), Gt);
        self.defcode("<=", F::empty(), Le);
        self.defcode(">=", F::empty(), Ge);
        self.defcode("0=", F::empty(), ZEqu);
        self.defcode("0<>", F::empty(), ZNEqu);
        self.defcode("0<", F::empty(), ZLt);
        self.defcode("0>", F::empty(), ZGt);
        self.defcode("0<=", F::empty(), ZLe);
        self.defcode("0>=", F::empty(), ZGe);
        self.defcode("AND", F::empty(), And);
        self.defcode("OR", F::empty(), Or);
        self.defcode("XOR", F::empty(), Xor);
        self.defcode("INVERT", F::empty(), Invert);
        self.defcode("EXIT", F::empty(), Exit);
        self.defcode("LIT", F::empty(), Lit);
        self.defcode("!", F::empty(), Store);
        self.defcode("@", F::empty(), Fetch);
        self.defcode("+!", F::empty(), AddStore);
        self.defcode("-!", F::empty(), SubStore);
        self.defcode("C!", F::empty(), StoreByte);
        self.defcode("C@", F::empty(), FetchByte);
        self.defcode("C@C!", F::empty(), CopyByte);
        self.defcode("CMOVE", F::empty(), CMove);
        self.defcode("STATE", F::empty(), State);
        self.defcode("HERE", F::empty(), Here);
        self.defcode("LATEST", F::empty(), Latest);
        self.defcode("S0", F::empty(), S0);
        self.defcode("BASE", F::empty(), Base);
        self.defcode("VERSION", F::empty(), Version);
        self.defcode("R0", F::empty(), R0);
        self.defcode("DOCOL", F::empty(), DocolConst);
        self.defcode("F_IMMED", F::empty(), FImmed);
        self.defcode("F_HIDDEN", F::empty(), FHidden);
        self.defcode("F_LENMASK", F::empty(), FLenMask);
        self.defcode(">R", F::empty(), ToR);
        self.defcode("R>", F::empty(), FromR);
        self.defcode("RSP@", F::empty(), RspFetch);
        self.defcode("RSP!", F::empty(), RspStore);
        self.defcode("RDROP", F::empty(), RDrop);
        self.defcode("DSP@", F::empty(), DspFetch);
        self.defcode("DSP!", F::empty(), DspStore);
        self.defcode("KEY", F::empty(), Key);
        self.defcode("EMIT", F::empty(), Emit);
        self.defcode("WORD", F::empty(), Word);
        self.defcode("TELL", F::empty(), Tell);
        self.defcode("NUMBER", F::empty(), Number);
        self.defcode("FIND", F::empty(), Find);
        self.defcode(">CFA", F::empty(), Tcfa);
        self.defcode("CREATE", F::empty(), Create);
        self.defcode(",", F::empty(), Comma);
        self.defcode("[", F::IMMEDIATE, LBrac);
        self.defcode("]", F::empty(), RBrac);
        self.defcode("IMMEDIATE", F::IMMEDIATE, Immediate);
        self.defcode("HIDDEN", F::empty(), Hidden);
        self.defcode("'", F::empty(), Tick);
        self.defcode("CHAR", F::empty(), Char);
        self.defcode("EXECUTE", F::empty(), Execute);
        self.defcode("INTERPRET", F::empty(), Interpret);
        self.defcode("BRANCH", F::empty(), Branch);
        self.defcode("0BRANCH", F::empty(), ZBranch);
        self.defcode("LITSTRING", F::empty(), LitString);
        self.defcode("BYE", F::empty(), Bye);
        self.defcode("UNUSED", F::empty(), Unused);
    }

    /// The compound words that must exist before the prelude can load.
    fn build_bootstrap_words(&mut self) {
        use BodyCell::{L, W};

        // : reads a name, builds a header with a DOCOL code field, hides the
        // word while it is being defined, and enters compile state.
        self.defword(
            ":",
            EntryFlags::empty(),
            &[
                W("WORD"),
                W("CREATE"),
                W("DOCOL"),
                W(","),
                W("LATEST"),
                W("@"),
                W("HIDDEN"),
                W("]"),
                W("EXIT"),
            ],
        );

        // ; closes the definition: append EXIT's cfa, unhide, leave compile
        // state. Immediate, since it must run while compiling.
        let exit_entry = self.find_name(b"EXIT");
        let exit_cfa = self.cfa_of(exit_entry) as i32;
        self.defword(
            ";",
            EntryFlags::IMMEDIATE,
            &[
                W("LIT"),
                L(exit_cfa),
                W(","),
                W("LATEST"),
                W("@"),
                W("HIDDEN"),
                W("["),
                W("EXIT"),
            ],
        );

        self.defword(
            ">DFA",
            EntryFlags::empty(),
            &[W(">CFA"), W("4+"), W("EXIT")],
        );

        self.defword(
            "HIDE",
            EntryFlags::empty(),
            &[W("WORD"), W("FIND"), W("HIDDEN"), W("EXIT")],
        );

        // QUIT clears the return stack, then loops on INTERPRET forever via
        // a backward branch over the two preceding cells.
        self.defword(
            "QUIT",
            EntryFlags::empty(),
            &[W("R0"), W("RSP!"), W("INTERPRET"), W("BRANCH"), L(-8)],
        );
    }

    /// set_word writes a name into the WORD buffer and pushes (addr, len),
    /// exactly as the WORD primitive would have left it.
    pub fn set_word(&mut self, name: &[u8]) {
        if name.len() > WORD_BUF_SIZE {
            panic!(
                "capacity error: word longer than the {}-byte WORD buffer",
                WORD_BUF_SIZE
            );
        }
        for (i, b) in name.iter().enumerate() {
            self.kernel.store_byte(WORD_BUF_ADDR + i, *b);
        }
        self.kernel.push(WORD_BUF_ADDR as i32);
        self.kernel.push(name.len() as i32);
    }

    /// run locates QUIT and executes it. Returns only after BYE or end of
    /// input; fatal conditions panic out through the abort path.
    pub fn run(&mut self) {
        let quit = self.find_name(b"QUIT");
        let cfa = self.cfa_of(quit);
        self.u_trace_event("run");
        self.execute_cfa(cfa);
        self.u_trace_event("normal exit");
    }
}

//////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use super::*;

    const PRELUDE: &str = include_str!("../forth/system.forth");

    fn machine() -> ForthMachine {
        let mut m = ForthMachine::with_console(MachineOptions::default(), Console::capture());
        m.cold_start();
        m
    }

    /// Run a program with the prelude loaded ahead of it, returning the
    /// machine and everything it wrote.
    fn run_with_prelude(program: &str) -> (ForthMachine, String) {
        let mut m = machine();
        m.console.push_text(program);
        m.console.push_text(PRELUDE);
        m.run();
        let out = String::from_utf8(m.console.take_output()).unwrap();
        (m, out)
    }

    #[test]
    fn test_bootstrap_words_exist() {
        let m = machine();
        for name in [":", ";", ">DFA", "HIDE", "QUIT", "DROP", "INTERPRET"] {
            assert!(m.find_name(name.as_bytes()) != 0, "missing {}", name);
        }
    }

    #[test]
    fn test_semicolon_is_immediate() {
        let m = machine();
        let entry = m.find_name(b";");
        assert!(m.entry_flags(entry).contains(EntryFlags::IMMEDIATE));
        let colon = m.find_name(b":");
        assert!(!m.entry_flags(colon).contains(EntryFlags::IMMEDIATE));
    }

    #[test]
    fn test_set_word_matches_word_primitive() {
        let mut m = machine();
        m.set_word(b"DROP");
        let len = m.kernel.pop() as usize;
        let addr = m.kernel.pop() as usize;
        assert_eq!((addr, len), (WORD_BUF_ADDR, 4));
        assert_eq!(m.read_bytes(addr, len), b"DROP");
    }

    #[test]
    fn test_run_to_eof_is_normal_exit() {
        let mut m = machine();
        m.console.push_text("1 2 +");
        m.run();
        assert!(m.should_exit());
        assert_eq!(m.kernel.stack_cells(), vec![3]);
        assert_eq!(m.kernel.rdepth(), 0);
    }

    #[test]
    fn test_bye_stops_reading() {
        let mut m = machine();
        m.console.push_text("65 EMIT BYE 66 EMIT");
        m.run();
        assert_eq!(m.console.take_output(), b"A");
    }

    #[test]
    fn test_dfa_is_one_cell_past_cfa() {
        let mut m = machine();
        m.console.push_text(": NOTHING ; LATEST @ >DFA LATEST @ >CFA");
        m.run();
        let cfa = m.kernel.pop();
        let dfa = m.kernel.pop();
        assert_eq!(dfa, cfa + 4);
    }

    #[test]
    fn test_hide_makes_word_unfindable() {
        let mut m = machine();
        m.console.push_text(": SECRET 42 ; HIDE SECRET");
        m.run();
        assert_eq!(m.find_name(b"SECRET"), 0);
    }

    #[test]
    fn test_prelude_loads_cleanly() {
        let (m, out) = run_with_prelude("");
        assert!(out.is_empty());
        assert_eq!(m.snapshot().state, 0);
        assert!(m.kernel.stack_cells().is_empty());
    }

    #[test]
    fn test_compile_and_run_double() {
        let (_, out) = run_with_prelude(": DOUBLE DUP + ; 21 DOUBLE .");
        assert_eq!(out, "42 ");
    }

    #[test]
    fn test_dot_prints_negative_numbers() {
        let (_, out) = run_with_prelude("-7 . 0 . -2147483648 .");
        assert_eq!(out, "-7 0 -2147483648 ");
    }

    #[test]
    fn test_dot_respects_base() {
        // push in decimal, print in hex, then back
        let (_, out) = run_with_prelude("255 HEX . DECIMAL 255 .");
        assert_eq!(out, "FF 255 ");
    }

    #[test]
    fn test_u_dot() {
        let (_, out) = run_with_prelude("42 U. 0 U.");
        assert_eq!(out, "42 0 ");
    }

    #[test]
    fn test_u_dot_sign_bit_prints_digits() {
        // a value with the sign bit set passes through unnegated, and
        // truncated division still walks the magnitude's digit sequence
        let (_, out) = run_with_prelude("-5 U.");
        assert_eq!(out, "5 ");
    }

    #[test]
    fn test_uwidth() {
        let (m, _) = run_with_prelude("0 UWIDTH 7 UWIDTH 12345 UWIDTH");
        assert_eq!(m.kernel.stack_cells(), vec![5, 1, 1]);
    }

    #[test]
    fn test_uwidth_respects_base() {
        let (m, _) = run_with_prelude("255 HEX UWIDTH DECIMAL");
        assert_eq!(m.kernel.stack_cells(), vec![2]);
    }

    #[test]
    fn test_u_dot_r_pads_to_width() {
        let (_, out) = run_with_prelude("42 5 U.R 7 1 U.R");
        assert_eq!(out, "   427");
    }

    #[test]
    fn test_dot_r_pads_and_signs() {
        // width counts the sign; a value wider than the field gets no padding
        let (_, out) = run_with_prelude("42 6 .R -42 6 .R 255 2 .R");
        assert_eq!(out, "    42   -42255");
    }

    #[test]
    fn test_if_then_else() {
        let (_, out) = run_with_prelude(
            ": SIGN DUP 0< IF DROP 45 EMIT ELSE 0> IF 43 EMIT ELSE 48 EMIT THEN THEN ; \
             -5 SIGN 5 SIGN 0 SIGN",
        );
        assert_eq!(out, "-+0");
    }

    #[test]
    fn test_begin_until_loop() {
        let (_, out) = run_with_prelude(": COUNTDOWN BEGIN DUP . 1- DUP 0= UNTIL DROP ; 5 COUNTDOWN");
        assert_eq!(out, "5 4 3 2 1 ");
    }

    #[test]
    fn test_while_repeat_loop() {
        let (_, out) = run_with_prelude(
            ": UPTO 0 BEGIN DUP 3 < WHILE DUP . 1+ REPEAT 2DROP ; 99 UPTO",
        );
        assert_eq!(out, "0 1 2 ");
    }

    #[test]
    fn test_recurse() {
        let (_, out) = run_with_prelude(
            ": FACT DUP 1 > IF DUP 1- RECURSE * THEN ; 5 FACT .",
        );
        assert_eq!(out, "120 ");
    }

    #[test]
    fn test_paren_comments() {
        let (_, out) = run_with_prelude(": SQ ( n -- n*n ) DUP * ; 6 SQ .");
        assert_eq!(out, "36 ");
    }

    #[test]
    fn test_dot_quote() {
        let (_, out) = run_with_prelude(": GREET .\" HELLO\" ; GREET");
        assert_eq!(out, "HELLO");
    }

    #[test]
    fn test_constant_and_variable() {
        let (_, out) = run_with_prelude(
            "10 CONSTANT TEN TEN TEN + . VARIABLE X 5 X ! X @ 1+ X ! X ? ",
        );
        assert_eq!(out, "20 6 ");
    }

    #[test]
    fn test_case_dispatch() {
        let (_, out) = run_with_prelude(
            ": NAME CASE 1 OF 65 EMIT ENDOF 2 OF 66 EMIT ENDOF 63 EMIT ENDCASE ; \
             1 NAME 2 NAME 9 NAME",
        );
        assert_eq!(out, "AB?");
    }

    #[test]
    fn test_arithmetic_wraparound_end_to_end() {
        let (m, _) = run_with_prelude("-2147483648 -1 + 1 +");
        // MIN + -1 wraps to MAX; MAX + 1 wraps back to MIN
        assert_eq!(m.kernel.stack_cells(), vec![i32::MIN]);
    }

    #[test]
    fn test_unused_and_version() {
        let (mut m, _) = run_with_prelude("VERSION UNUSED");
        let unused = m.kernel.pop();
        assert!(unused > 0);
        assert_eq!(m.kernel.pop(), FORTH_VERSION);
    }

    #[test]
    fn test_execute_via_tick() {
        let (_, out) = run_with_prelude(": RUN-IT ' DUP EXECUTE ; 4 RUN-IT + .");
        assert_eq!(out, "8 ");
    }

    #[test]
    fn test_allot_and_cells() {
        let (mut m, _) = run_with_prelude("3 CELLS ALLOT HERE @ SWAP -");
        assert_eq!(m.kernel.pop(), 12);
    }
}
