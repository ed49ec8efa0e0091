// Read-only machine state bundle
//
// Used by tests and embedders to observe the machine without reaching into
// its internals: the register values, the system variables, the live cells
// of both stacks (top first), and the dictionary bytes up to HERE.

use crate::machine::ForthMachine;

#[derive(Debug, Clone)]
pub struct Snapshot {
    pub here: usize,
    pub latest: usize,
    pub state: i32,
    pub base: i32,
    pub ip: usize,
    pub sp: usize,
    pub rsp: usize,
    pub stack: Vec<i32>,
    pub rstack: Vec<i32>,
    pub dictionary: Vec<u8>,
}

impl ForthMachine {
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            here: self.here(),
            latest: self.latest(),
            state: self.state(),
            base: self.base(),
            ip: self.kernel.ip(),
            sp: self.kernel.sp(),
            rsp: self.kernel.rsp(),
            stack: self.kernel.stack_cells(),
            rstack: self.kernel.rstack_cells(),
            dictionary: self.kernel.data_bytes(self.here()),
        }
    }
}
