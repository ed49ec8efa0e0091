// General-purpose primitives: stack shuffling, arithmetic, comparison,
// bitwise, memory access, and return-stack transfer.
//
// Arithmetic wraps (two's-complement modular); comparisons push 1 for true
// and 0 for false. Addresses popped from the stack are reinterpreted as
// unsigned byte indices, so a negative cell becomes an out-of-range address
// and faults in the kernel.

use crate::kernel::{CELL, FALSE, TRUE};
use crate::machine::ForthMachine;

fn flag(b: bool) -> i32 {
    if b {
        TRUE
    } else {
        FALSE
    }
}

impl ForthMachine {
    /// Pop two cells; returns (second, top).
    fn pop2(&mut self) -> (i32, i32) {
        let b = self.kernel.pop();
        let a = self.kernel.pop();
        (a, b)
    }

    /// Pop an address cell as an unsigned byte index.
    pub fn pop_addr(&mut self) -> usize {
        self.kernel.pop() as u32 as usize
    }

    // stack shuffling

    pub fn f_drop(&mut self) {
        self.kernel.pop();
    }

    pub fn f_swap(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(b);
        self.kernel.push(a);
    }

    pub fn f_dup(&mut self) {
        let top = self.kernel.pick(0);
        self.kernel.push(top);
    }

    pub fn f_over(&mut self) {
        let second = self.kernel.pick(1);
        self.kernel.push(second);
    }

    pub fn f_rot(&mut self) {
        let c = self.kernel.pop();
        let b = self.kernel.pop();
        let a = self.kernel.pop();
        self.kernel.push(b);
        self.kernel.push(c);
        self.kernel.push(a);
    }

    pub fn f_nrot(&mut self) {
        let c = self.kernel.pop();
        let b = self.kernel.pop();
        let a = self.kernel.pop();
        self.kernel.push(c);
        self.kernel.push(a);
        self.kernel.push(b);
    }

    pub fn f_2drop(&mut self) {
        self.kernel.drop_cells(2);
    }

    pub fn f_2dup(&mut self) {
        let b = self.kernel.pick(0);
        let a = self.kernel.pick(1);
        self.kernel.push(a);
        self.kernel.push(b);
    }

    pub fn f_2swap(&mut self) {
        let d = self.kernel.pop();
        let c = self.kernel.pop();
        let b = self.kernel.pop();
        let a = self.kernel.pop();
        self.kernel.push(c);
        self.kernel.push(d);
        self.kernel.push(a);
        self.kernel.push(b);
    }

    /// ?DUP duplicates the top of stack only when it is nonzero.
    pub fn f_qdup(&mut self) {
        let top = self.kernel.pick(0);
        if top != 0 {
            self.kernel.push(top);
        }
    }

    // arithmetic

    pub fn f_incr(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(x.wrapping_add(1));
    }

    pub fn f_decr(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(x.wrapping_sub(1));
    }

    pub fn f_incr4(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(x.wrapping_add(CELL as i32));
    }

    pub fn f_decr4(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(x.wrapping_sub(CELL as i32));
    }

    pub fn f_add(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a.wrapping_add(b));
    }

    pub fn f_sub(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a.wrapping_sub(b));
    }

    pub fn f_mul(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a.wrapping_mul(b));
    }

    /// /MOD ( n1 n2 -- rem quot ) with truncated division: the remainder
    /// takes the sign of the dividend.
    pub fn f_divmod(&mut self) {
        let (a, b) = self.pop2();
        if b == 0 {
            panic!("division by zero: {} /MOD 0", a);
        }
        self.kernel.push(a.wrapping_rem(b));
        self.kernel.push(a.wrapping_div(b));
    }

    // comparison

    pub fn f_equ(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a == b));
    }

    pub fn f_nequ(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a != b));
    }

    pub fn f_lt(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a < b));
    }

    pub fn f_gt(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a > b));
    }

    pub fn f_le(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a <= b));
    }

    pub fn f_ge(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(flag(a >= b));
    }

    pub fn f_zequ(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x == 0));
    }

    pub fn f_znequ(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x != 0));
    }

    pub fn f_zlt(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x < 0));
    }

    pub fn f_zgt(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x > 0));
    }

    pub fn f_zle(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x <= 0));
    }

    pub fn f_zge(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(flag(x >= 0));
    }

    // bitwise

    pub fn f_and(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a & b);
    }

    pub fn f_or(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a | b);
    }

    pub fn f_xor(&mut self) {
        let (a, b) = self.pop2();
        self.kernel.push(a ^ b);
    }

    pub fn f_invert(&mut self) {
        let x = self.kernel.pop();
        self.kernel.push(!x);
    }

    // memory

    /// ! ( x a -- ) stores x at cell address a.
    pub fn f_store(&mut self) {
        let addr = self.pop_addr();
        let value = self.kernel.pop();
        self.kernel.store_cell(addr, value);
    }

    /// @ ( a -- x ) fetches the cell at address a.
    pub fn f_fetch(&mut self) {
        let addr = self.pop_addr();
        let value = self.kernel.fetch_cell(addr);
        self.kernel.push(value);
    }

    /// +! ( n a -- ) adds n to the cell at a, wrapping.
    pub fn f_addstore(&mut self) {
        let addr = self.pop_addr();
        let delta = self.kernel.pop();
        let value = self.kernel.fetch_cell(addr).wrapping_add(delta);
        self.kernel.store_cell(addr, value);
    }

    /// -! ( n a -- ) subtracts n from the cell at a, wrapping.
    pub fn f_substore(&mut self) {
        let addr = self.pop_addr();
        let delta = self.kernel.pop();
        let value = self.kernel.fetch_cell(addr).wrapping_sub(delta);
        self.kernel.store_cell(addr, value);
    }

    /// C! ( c a -- ) stores the low byte of c at a.
    pub fn f_storebyte(&mut self) {
        let addr = self.pop_addr();
        let value = self.kernel.pop();
        self.kernel.store_byte(addr, value as u8);
    }

    /// C@ ( a -- c ) fetches the byte at a, zero-extended.
    pub fn f_fetchbyte(&mut self) {
        let addr = self.pop_addr();
        let value = self.kernel.fetch_byte(addr);
        self.kernel.push(value as i32);
    }

    /// C@C! ( src dst -- src+1 dst+1 ) copies one byte and advances both
    /// addresses.
    pub fn f_copybyte(&mut self) {
        let dst = self.pop_addr();
        let src = self.pop_addr();
        let byte = self.kernel.fetch_byte(src);
        self.kernel.store_byte(dst, byte);
        self.kernel.push((src + 1) as i32);
        self.kernel.push((dst + 1) as i32);
    }

    /// CMOVE ( src dst u -- ) copies u bytes, strictly ascending. Callers
    /// must not rely on a copy direction for overlapping regions.
    pub fn f_cmove(&mut self) {
        let count = self.pop_addr();
        let dst = self.pop_addr();
        let src = self.pop_addr();
        for i in 0..count {
            let byte = self.kernel.fetch_byte(src + i);
            self.kernel.store_byte(dst + i, byte);
        }
    }

    // return-stack transfer

    pub fn f_tor(&mut self) {
        let x = self.kernel.pop();
        self.kernel.rpush(x);
    }

    pub fn f_fromr(&mut self) {
        let x = self.kernel.rpop();
        self.kernel.push(x);
    }

    pub fn f_rspfetch(&mut self) {
        let rsp = self.kernel.rsp();
        self.kernel.push(rsp as i32);
    }

    pub fn f_rspstore(&mut self) {
        let rsp = self.pop_addr();
        self.kernel.set_rsp(rsp);
    }

    pub fn f_rdrop(&mut self) {
        self.kernel.rpop();
    }

    pub fn f_dspfetch(&mut self) {
        let sp = self.kernel.sp();
        self.kernel.push(sp as i32);
    }

    pub fn f_dspstore(&mut self) {
        let sp = self.pop_addr();
        self.kernel.set_sp(sp);
    }

    /// UNUSED ( -- n ) pushes the free cells between the dictionary frontier
    /// and the data stack.
    pub fn f_unused(&mut self) {
        let free = (self.kernel.sp() - self.here()) / CELL;
        self.kernel.push(free as i32);
    }
}

//////////////////////////////////////////
/// TESTS
///
#[cfg(test)]
mod tests {
    use crate::machine::{ForthMachine, MachineOptions};

    fn machine() -> ForthMachine {
        let mut m = ForthMachine::new(MachineOptions::default());
        m.cold_start();
        m
    }

    #[test]
    fn test_shuffles() {
        let mut m = machine();
        m.kernel.push(1);
        m.kernel.push(2);
        m.f_dup();
        assert_eq!(m.kernel.stack_cells(), vec![2, 2, 1]);
        m.f_drop();
        assert_eq!(m.kernel.stack_cells(), vec![2, 1]);
        m.f_swap();
        assert_eq!(m.kernel.stack_cells(), vec![1, 2]);
        m.f_over();
        assert_eq!(m.kernel.stack_cells(), vec![2, 1, 2]);
    }

    #[test]
    fn test_rotations() {
        let mut m = machine();
        m.kernel.push(1);
        m.kernel.push(2);
        m.kernel.push(3);
        m.f_rot();
        assert_eq!(m.kernel.stack_cells(), vec![1, 3, 2]);
        m.f_nrot();
        assert_eq!(m.kernel.stack_cells(), vec![3, 2, 1]);
    }

    #[test]
    fn test_two_cell_shuffles() {
        let mut m = machine();
        for v in [1, 2, 3, 4] {
            m.kernel.push(v);
        }
        m.f_2swap();
        assert_eq!(m.kernel.stack_cells(), vec![2, 1, 4, 3]);
        m.f_2dup();
        assert_eq!(m.kernel.stack_cells(), vec![2, 1, 2, 1, 4, 3]);
        m.f_2drop();
        assert_eq!(m.kernel.stack_cells(), vec![2, 1, 4, 3]);
    }

    #[test]
    fn test_qdup() {
        let mut m = machine();
        m.kernel.push(0);
        m.f_qdup();
        assert_eq!(m.kernel.stack_cells(), vec![0]);
        m.kernel.push(9);
        m.f_qdup();
        assert_eq!(m.kernel.stack_cells(), vec![9, 9, 0]);
    }

    #[test]
    fn test_wrapping_add() {
        let mut m = machine();
        m.kernel.push(i32::MIN);
        m.kernel.push(-1);
        m.f_add();
        assert_eq!(m.kernel.pop(), i32::MAX);
        m.kernel.push(i32::MAX);
        m.kernel.push(1);
        m.f_add();
        assert_eq!(m.kernel.pop(), i32::MIN);
    }

    #[test]
    fn test_add_sub_inverse() {
        let mut m = machine();
        for (a, b) in [(5, 3), (i32::MAX, 1), (i32::MIN, i32::MAX)] {
            m.kernel.push(a);
            m.kernel.push(b);
            m.f_add();
            m.kernel.push(b);
            m.f_sub();
            assert_eq!(m.kernel.pop(), a);
        }
    }

    #[test]
    fn test_divmod() {
        let mut m = machine();
        m.kernel.push(30);
        m.kernel.push(7);
        m.f_divmod();
        assert_eq!(m.kernel.pop(), 4); // quotient on top
        assert_eq!(m.kernel.pop(), 2); // remainder below

        // remainder follows the dividend's sign
        m.kernel.push(-30);
        m.kernel.push(7);
        m.f_divmod();
        assert_eq!(m.kernel.pop(), -4);
        assert_eq!(m.kernel.pop(), -2);
    }

    #[test]
    fn test_divmod_identity() {
        let mut m = machine();
        for (a, b) in [(30, 7), (-30, 7), (30, -7), (-30, -7), (0, 5)] {
            m.kernel.push(a);
            m.kernel.push(b);
            m.f_divmod();
            let q = m.kernel.pop();
            let r = m.kernel.pop();
            assert_eq!(q.wrapping_mul(b).wrapping_add(r), a);
        }
    }

    #[test]
    #[should_panic(expected = "division by zero")]
    fn test_divide_by_zero_panics() {
        let mut m = machine();
        m.kernel.push(1);
        m.kernel.push(0);
        m.f_divmod();
    }

    #[test]
    fn test_comparisons_push_one_or_zero() {
        let mut m = machine();
        m.kernel.push(3);
        m.kernel.push(5);
        m.f_lt();
        assert_eq!(m.kernel.pop(), 1);
        m.kernel.push(3);
        m.kernel.push(5);
        m.f_ge();
        assert_eq!(m.kernel.pop(), 0);
        m.kernel.push(-1);
        m.f_zlt();
        assert_eq!(m.kernel.pop(), 1);
        m.kernel.push(0);
        m.f_zequ();
        assert_eq!(m.kernel.pop(), 1);
    }

    #[test]
    fn test_bitwise() {
        let mut m = machine();
        m.kernel.push(0b1100);
        m.kernel.push(0b1010);
        m.f_and();
        assert_eq!(m.kernel.pop(), 0b1000);
        m.kernel.push(0b1100);
        m.kernel.push(0b1010);
        m.f_xor();
        assert_eq!(m.kernel.pop(), 0b0110);
        m.kernel.push(0);
        m.f_invert();
        assert_eq!(m.kernel.pop(), -1);
    }

    #[test]
    fn test_store_fetch_roundtrip() {
        let mut m = machine();
        let addr = m.here() as i32 + 64;
        m.kernel.push(-99);
        m.kernel.push(addr);
        m.f_store();
        m.kernel.push(addr);
        m.f_fetch();
        assert_eq!(m.kernel.pop(), -99);
    }

    #[test]
    fn test_byte_roundtrip_and_addstore() {
        let mut m = machine();
        let addr = m.here() as i32 + 65; // deliberately unaligned
        m.kernel.push(0x41);
        m.kernel.push(addr);
        m.f_storebyte();
        m.kernel.push(addr);
        m.f_fetchbyte();
        assert_eq!(m.kernel.pop(), 0x41);

        let cell = m.here() as i32 + 72;
        m.kernel.push(10);
        m.kernel.push(cell);
        m.f_store();
        m.kernel.push(5);
        m.kernel.push(cell);
        m.f_addstore();
        m.kernel.push(2);
        m.kernel.push(cell);
        m.f_substore();
        assert_eq!(m.kernel.fetch_cell(cell as usize), 13);
    }

    #[test]
    fn test_cmove_and_copybyte() {
        let mut m = machine();
        let src = m.here() + 64;
        let dst = m.here() + 96;
        for (i, b) in b"FORTH".iter().enumerate() {
            m.kernel.store_byte(src + i, *b);
        }
        m.kernel.push(src as i32);
        m.kernel.push(dst as i32);
        m.kernel.push(5);
        m.f_cmove();
        assert_eq!(m.read_bytes(dst, 5), b"FORTH");

        m.kernel.push(src as i32);
        m.kernel.push((dst + 8) as i32);
        m.f_copybyte();
        assert_eq!(m.kernel.pop(), (dst + 9) as i32);
        assert_eq!(m.kernel.pop(), (src + 1) as i32);
        assert_eq!(m.kernel.fetch_byte(dst + 8), b'F');
    }

    #[test]
    fn test_return_stack_transfer() {
        let mut m = machine();
        m.kernel.push(42);
        m.f_tor();
        assert_eq!(m.kernel.rdepth(), 1);
        m.f_fromr();
        assert_eq!(m.kernel.pop(), 42);

        m.kernel.push(7);
        m.f_tor();
        m.f_rdrop();
        assert_eq!(m.kernel.rdepth(), 0);
    }

    #[test]
    fn test_pointer_words() {
        let mut m = machine();
        m.f_dspfetch();
        // DSP@ reads SP before pushing its result
        assert_eq!(m.kernel.pop() as usize, m.kernel.data_len());
        m.f_rspfetch();
        assert_eq!(m.kernel.pop() as usize, m.kernel.rstack_len());
    }

    #[test]
    fn test_unused_shrinks_as_dictionary_grows() {
        let mut m = machine();
        m.f_unused();
        let before = m.kernel.pop();
        m.comma(0);
        m.f_unused();
        assert_eq!(m.kernel.pop(), before - 1);
    }
}
