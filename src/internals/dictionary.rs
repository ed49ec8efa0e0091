// Dictionary management
//
// The dictionary is a linked chain of variable-length entries embedded in
// data space, newest first, headed by the LATEST variable. Each entry is
//
//     link (1 cell) | flags+length (1 byte) | name bytes | zero padding
//     | code field (1 cell) | parameter field
//
// aligned so that both the entry and its code field start on a cell
// boundary. The top three bits of the flags+length byte are flags, the low
// five are the name length.

use bitflags::bitflags;

use crate::kernel::{align, CELL, HERE_ADDR, LATEST_ADDR, STATE_ADDR, BASE_ADDR};
use crate::machine::ForthMachine;

bitflags! {
    /// The flag bits of an entry's flags+length byte.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct EntryFlags: u8 {
        const IMMEDIATE = 0x80;
        const HIDDEN = 0x20;
    }
}

/// Mask selecting the name length from the flags+length byte.
pub const LEN_MASK: u8 = 0x1f;

impl ForthMachine {
    // The four system variables live at fixed, published addresses; these
    // accessors are the Rust-side view of the same cells Forth code reads
    // with HERE @, LATEST @, and so on.

    pub fn here(&self) -> usize {
        self.kernel.fetch_cell(HERE_ADDR) as u32 as usize
    }

    pub fn set_here(&mut self, here: usize) {
        self.kernel.store_cell(HERE_ADDR, here as i32);
    }

    pub fn latest(&self) -> usize {
        self.kernel.fetch_cell(LATEST_ADDR) as u32 as usize
    }

    pub fn set_latest(&mut self, entry: usize) {
        self.kernel.store_cell(LATEST_ADDR, entry as i32);
    }

    pub fn state(&self) -> i32 {
        self.kernel.fetch_cell(STATE_ADDR)
    }

    pub fn set_state(&mut self, state: i32) {
        self.kernel.store_cell(STATE_ADDR, state);
    }

    pub fn base(&self) -> i32 {
        self.kernel.fetch_cell(BASE_ADDR)
    }

    /// comma appends one cell at HERE and advances it. The frontier must
    /// stay strictly below the data stack.
    pub fn comma(&mut self, value: i32) {
        let here = self.here();
        if here + CELL >= self.kernel.sp() {
            panic!("capacity error: dictionary collided with the data stack");
        }
        self.kernel.store_cell(here, value);
        self.set_here(here + CELL);
    }

    /// align_here rounds the frontier up to the next cell boundary.
    pub fn align_here(&mut self) {
        let here = align(self.here());
        self.set_here(here);
    }

    /// create_entry lays out a header for `name`: link to the old LATEST,
    /// flags+length byte (length clamped to the 5-bit field), name bytes,
    /// zero padding. LATEST then points at the new entry and HERE at its
    /// code field.
    pub fn create_entry(&mut self, name: &[u8]) {
        let len = name.len().min(LEN_MASK as usize);
        if self.find_name(&name[..len]) != 0 {
            self.msg.warning(
                "create",
                "redefining existing word",
                Some(String::from_utf8_lossy(&name[..len]).into_owned()),
            );
        }
        self.align_here();
        let entry = self.here();
        let cfa = align(entry + CELL + 1 + len);
        if cfa >= self.kernel.sp() {
            panic!("capacity error: dictionary collided with the data stack");
        }
        self.kernel.store_cell(entry, self.latest() as i32);
        self.kernel.store_byte(entry + CELL, len as u8);
        for (i, b) in name[..len].iter().enumerate() {
            self.kernel.store_byte(entry + CELL + 1 + i, *b);
        }
        let mut pad = entry + CELL + 1 + len;
        while pad < cfa {
            self.kernel.store_byte(pad, 0);
            pad += 1;
        }
        self.set_latest(entry);
        self.set_here(cfa);
    }

    /// cfa_of computes the code field address of an entry from its header.
    pub fn cfa_of(&self, entry: usize) -> usize {
        let len = (self.kernel.fetch_byte(entry + CELL) & LEN_MASK) as usize;
        align(entry + CELL + 1 + len)
    }

    /// find_name walks the chain from LATEST. An entry matches when its
    /// flags+length byte, masked with F_HIDDEN and the length mask, equals
    /// the requested length and the name bytes are identical; hidden entries
    /// therefore never match. The most recent definition wins.
    pub fn find_name(&self, name: &[u8]) -> usize {
        let want = name.len() as u8;
        let mut entry = self.latest();
        while entry != 0 {
            let flags_len = self.kernel.fetch_byte(entry + CELL);
            if flags_len & (EntryFlags::HIDDEN.bits() | LEN_MASK) == want {
                let mut matches = true;
                for (i, b) in name.iter().enumerate() {
                    if self.kernel.fetch_byte(entry + CELL + 1 + i) != *b {
                        matches = false;
                        break;
                    }
                }
                if matches {
                    return entry;
                }
            }
            entry = self.kernel.fetch_cell(entry) as u32 as usize;
        }
        0
    }

    /// The flag bits of an entry.
    pub fn entry_flags(&self, entry: usize) -> EntryFlags {
        EntryFlags::from_bits_truncate(self.kernel.fetch_byte(entry + CELL))
    }

    /// toggle_flag flips one flag bit on an entry, leaving the length bits
    /// alone. IMMEDIATE and the HIDDEN smudge both work this way.
    pub fn toggle_flag(&mut self, entry: usize, flag: EntryFlags) {
        let byte = self.kernel.fetch_byte(entry + CELL);
        self.kernel.store_byte(entry + CELL, byte ^ flag.bits());
    }

    /// entry_name reads an entry's name back out, for diagnostics.
    pub fn entry_name(&self, entry: usize) -> String {
        let len = (self.kernel.fetch_byte(entry + CELL) & LEN_MASK) as usize;
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            bytes.push(self.kernel.fetch_byte(entry + CELL + 1 + i));
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// read_bytes copies a (addr, len) region of data space out, used when a
    /// primitive needs a name that is sitting in the WORD buffer.
    pub fn read_bytes(&self, addr: usize, len: usize) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(len);
        for i in 0..len {
            bytes.push(self.kernel.fetch_byte(addr + i));
        }
        bytes
    }
}
