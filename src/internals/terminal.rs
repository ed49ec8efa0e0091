// Raw terminal mode
//
// Character-at-a-time interaction needs the terminal out of line-buffered
// mode. The guard restores the terminal when dropped, including on the
// unwind path of a fatal abort.

use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io;

pub struct RawModeGuard {
    active: bool,
}

impl RawModeGuard {
    /// Enable raw mode; the returned guard disables it again on drop.
    pub fn new(enable: bool) -> io::Result<RawModeGuard> {
        if enable {
            enable_raw_mode()?;
        }
        Ok(RawModeGuard { active: enable })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
        }
    }
}
