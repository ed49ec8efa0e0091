// Tracing help
//
// With tracing enabled every dispatched codeword emits one stderr line, and
// a few lifecycle events (cold start, run, shutdown) emit one line each.
// Output goes to stderr so traced programs still produce clean output.

use crate::internals::opcode::Opcode;
use crate::machine::ForthMachine;

impl ForthMachine {
    /// One line per dispatched codeword: the opcode (or the raw cell when it
    /// decodes to nothing), the code field it came from, and the machine
    /// registers.
    pub fn u_trace(&self, op: i32, cfa: usize) {
        let name = match Opcode::try_from(op) {
            Ok(code) => format!("{:?}", code),
            Err(_) => format!("op#{}", op),
        };
        eprintln!(
            "trace: {:<10} cfa={:<6} ip={:<6} sp={:<6} rsp={:<5} depth={}",
            name,
            cfa,
            self.kernel.ip(),
            self.kernel.sp(),
            self.kernel.rsp(),
            self.kernel.depth(),
        );
    }

    /// One line per lifecycle event.
    pub fn u_trace_event(&self, event: &str) {
        if self.trace {
            eprintln!("trace: == {} ==", event);
        }
    }
}
