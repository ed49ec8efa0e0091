// Inner interpreter
//
// Execution is threaded through code-field addresses. execute_cfa reads the
// codeword at a cfa and hands it to execute_op, a single match over the
// opcode enumeration. Compound words carry the Docol opcode: Docol owns the
// threading loop for its own activation, reading one cfa per iteration from
// IP and detecting completion by the opcode it just executed. Nested
// activations stack their resume addresses on the return stack; EXIT pops
// one back into IP.

use crate::internals::dictionary::EntryFlags;
use crate::internals::opcode::Opcode;
use crate::kernel::{align, BASE_ADDR, CELL, HERE_ADDR, LATEST_ADDR, S0_ADDR, STATE_ADDR};
use crate::machine::{ForthMachine, FORTH_VERSION};

impl ForthMachine {
    /// Execute the word whose code field is at `cfa`.
    pub fn execute_cfa(&mut self, cfa: usize) {
        let op = self.kernel.fetch_cell(cfa);
        self.execute_op(op, cfa);
    }

    /// Dispatch one codeword. `cfa` is the code field it was read from,
    /// which Docol needs to locate the parameter field.
    pub fn execute_op(&mut self, op: i32, cfa: usize) {
        if self.trace {
            self.u_trace(op, cfa);
        }
        let Ok(code) = Opcode::try_from(op) else {
            panic!("invalid opcode {} in code field at {}", op, cfa);
        };
        match code {
            Opcode::Docol => self.f_docol(cfa),
            Opcode::Exit => self.f_exit(),
            Opcode::Lit => self.f_lit(),

            Opcode::Drop => self.f_drop(),
            Opcode::Swap => self.f_swap(),
            Opcode::Dup => self.f_dup(),
            Opcode::Over => self.f_over(),
            Opcode::Rot => self.f_rot(),
            Opcode::NRot => self.f_nrot(),
            Opcode::TwoDrop => self.f_2drop(),
            Opcode::TwoDup => self.f_2dup(),
            Opcode::TwoSwap => self.f_2swap(),
            Opcode::QDup => self.f_qdup(),

            Opcode::Incr => self.f_incr(),
            Opcode::Decr => self.f_decr(),
            Opcode::Incr4 => self.f_incr4(),
            Opcode::Decr4 => self.f_decr4(),
            Opcode::Add => self.f_add(),
            Opcode::Sub => self.f_sub(),
            Opcode::Mul => self.f_mul(),
            Opcode::DivMod => self.f_divmod(),

            Opcode::Equ => self.f_equ(),
            Opcode::NEqu => self.f_nequ(),
            Opcode::Lt => self.f_lt(),
            Opcode::Gt => self.f_gt(),
            Opcode::Le => self.f_le(),
            Opcode::Ge => self.f_ge(),
            Opcode::ZEqu => self.f_zequ(),
            Opcode::ZNEqu => self.f_znequ(),
            Opcode::ZLt => self.f_zlt(),
            Opcode::ZGt => self.f_zgt(),
            Opcode::ZLe => self.f_zle(),
            Opcode::ZGe => self.f_zge(),

            Opcode::And => self.f_and(),
            Opcode::Or => self.f_or(),
            Opcode::Xor => self.f_xor(),
            Opcode::Invert => self.f_invert(),

            Opcode::Store => self.f_store(),
            Opcode::Fetch => self.f_fetch(),
            Opcode::AddStore => self.f_addstore(),
            Opcode::SubStore => self.f_substore(),
            Opcode::StoreByte => self.f_storebyte(),
            Opcode::FetchByte => self.f_fetchbyte(),
            Opcode::CopyByte => self.f_copybyte(),
            Opcode::CMove => self.f_cmove(),

            Opcode::State => self.kernel.push(STATE_ADDR as i32),
            Opcode::Here => self.kernel.push(HERE_ADDR as i32),
            Opcode::Latest => self.kernel.push(LATEST_ADDR as i32),
            Opcode::S0 => self.kernel.push(S0_ADDR as i32),
            Opcode::Base => self.kernel.push(BASE_ADDR as i32),
            Opcode::Version => self.kernel.push(FORTH_VERSION),
            Opcode::R0 => {
                let r0 = self.kernel.rstack_len();
                self.kernel.push(r0 as i32);
            }
            Opcode::DocolConst => self.kernel.push(Opcode::Docol as i32),
            Opcode::FImmed => self.kernel.push(EntryFlags::IMMEDIATE.bits() as i32),
            Opcode::FHidden => self.kernel.push(EntryFlags::HIDDEN.bits() as i32),
            Opcode::FLenMask => self.kernel.push(crate::internals::dictionary::LEN_MASK as i32),

            Opcode::ToR => self.f_tor(),
            Opcode::FromR => self.f_fromr(),
            Opcode::RspFetch => self.f_rspfetch(),
            Opcode::RspStore => self.f_rspstore(),
            Opcode::RDrop => self.f_rdrop(),
            Opcode::DspFetch => self.f_dspfetch(),
            Opcode::DspStore => self.f_dspstore(),

            Opcode::Key => self.f_key(),
            Opcode::Emit => self.f_emit(),
            Opcode::Word => self.f_word(),
            Opcode::Tell => self.f_tell(),

            Opcode::Number => self.f_number(),
            Opcode::Find => self.f_find(),
            Opcode::Tcfa => self.f_tcfa(),
            Opcode::Create => self.f_create(),
            Opcode::Comma => self.f_comma(),
            Opcode::LBrac => self.set_state(0),
            Opcode::RBrac => self.set_state(1),
            Opcode::Immediate => self.f_immediate(),
            Opcode::Hidden => self.f_hidden(),
            Opcode::Tick => self.f_tick(),
            Opcode::Char => self.f_char(),
            Opcode::Execute => self.f_execute(),
            Opcode::Interpret => self.f_interpret(),

            Opcode::Branch => self.f_branch(),
            Opcode::ZBranch => self.f_zbranch(),
            Opcode::LitString => self.f_litstring(),

            Opcode::Bye => self.exit_flag = true,
            Opcode::Unused => self.f_unused(),
        }
    }

    /// The threaded-execution preamble of a compound word. Saves IP, points
    /// it at the parameter field, then runs one codeword per iteration until
    /// the codeword just executed was EXIT (which has already restored IP
    /// from the return stack) or the machine is shutting down.
    fn f_docol(&mut self, cfa: usize) {
        let ip = self.kernel.ip();
        self.kernel.rpush(ip as i32);
        self.kernel.set_ip(cfa + CELL);
        loop {
            if self.exit_flag {
                break;
            }
            let ip = self.kernel.ip();
            let target = self.kernel.fetch_cell(ip) as u32 as usize;
            self.kernel.set_ip(ip + CELL);
            let op = self.kernel.fetch_cell(target);
            self.execute_op(op, target);
            if op == Opcode::Exit as i32 {
                break;
            }
        }
    }

    /// EXIT pops the caller's resume address back into IP, ending the
    /// current activation.
    fn f_exit(&mut self) {
        let ip = self.kernel.rpop();
        self.kernel.set_ip(ip as u32 as usize);
    }

    /// LIT pushes the cell following it in the thread and skips IP past it.
    fn f_lit(&mut self) {
        let ip = self.kernel.ip();
        let value = self.kernel.fetch_cell(ip);
        self.kernel.push(value);
        self.kernel.set_ip(ip + CELL);
    }

    /// LITSTRING ( -- c-addr u ) pushes the address and length of the
    /// inline string following it and skips IP past its aligned end.
    fn f_litstring(&mut self) {
        let ip = self.kernel.ip();
        let len = self.kernel.fetch_cell(ip) as u32 as usize;
        self.kernel.push((ip + CELL) as i32);
        self.kernel.push(len as i32);
        self.kernel.set_ip(align(ip + CELL + len));
    }

    /// BRANCH adds the signed offset at IP to IP.
    fn f_branch(&mut self) {
        let ip = self.kernel.ip();
        let offset = self.kernel.fetch_cell(ip) as i64;
        let target = ip as i64 + offset;
        if target < 0 {
            panic!("invalid memory access: branch to {}", target);
        }
        self.kernel.set_ip(target as usize);
    }

    /// 0BRANCH branches only when the popped cell is zero; otherwise it
    /// skips the offset.
    fn f_zbranch(&mut self) {
        if self.kernel.pop() == 0 {
            self.f_branch();
        } else {
            let ip = self.kernel.ip();
            self.kernel.set_ip(ip + CELL);
        }
    }
}
