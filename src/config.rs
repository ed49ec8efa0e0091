// system configuration and command line processing

use std::fs::File;
use std::io::BufReader;

use argh::FromArgs;

use crate::internals::console::Source;
use crate::internals::messages::DebugLevel;
use crate::internals::terminal::RawModeGuard;
use crate::machine::{ForthMachine, MachineOptions};

pub const VERSION: &str = "0.1.0";
pub const DEFAULT_CORE: [&str; 3] = [
    "./system.forth",
    "./forth/system.forth",
    "/usr/local/share/forth32/system.forth",
];

/// A 32-bit Forth virtual machine and interpreter.
#[derive(FromArgs)]
pub struct Args {
    /// core library loaded ahead of all other input
    #[argh(option, short = 'l')]
    pub library: Option<String>,

    /// a source file interpreted before stdin
    #[argh(option, short = 'f')]
    pub file: Option<String>,

    /// start without the core library
    #[argh(switch, short = 'n')]
    pub nocore: bool,

    /// data space size in bytes
    #[argh(option, default = "65536")]
    pub data_size: usize,

    /// return stack size in bytes
    #[argh(option, default = "4096")]
    pub rstack_size: usize,

    /// emit one diagnostic line per executed opcode
    #[argh(switch, short = 't')]
    pub trace: bool,

    /// debug level: error, warning, info or debug
    #[argh(option)]
    pub debuglevel: Option<String>,

    /// put the terminal in raw mode while running
    #[argh(switch)]
    pub raw: bool,
}

pub struct Config {
    pub args: Args,
    pub debug_level: DebugLevel,
}

impl Config {
    pub fn new() -> Config {
        Config {
            args: argh::from_env(),
            debug_level: DebugLevel::Error,
        }
    }

    /// process_args settles everything that needs interpretation beyond what
    /// argh parsed, currently just the debug level.
    pub fn process_args(&mut self) -> &Config {
        if let Some(level) = &self.args.debuglevel {
            match level.as_str() {
                "debug" => self.debug_level = DebugLevel::Debug,
                "info" => self.debug_level = DebugLevel::Info,
                "warning" => self.debug_level = DebugLevel::Warning,
                _ => self.debug_level = DebugLevel::Error,
            }
        }
        self
    }

    /// Open the core library: the explicit --library path if given, else the
    /// first default candidate that exists.
    fn open_core(&self) -> Option<Source> {
        let candidates: Vec<&str> = match &self.args.library {
            Some(path) => vec![path.as_str()],
            None => DEFAULT_CORE.to_vec(),
        };
        for path in candidates {
            if let Ok(file) = File::open(path) {
                return Some(Source::File(BufReader::new(file)));
            }
        }
        None
    }

    /// run_forth builds the machine, stacks the input sources (stdin at the
    /// bottom, then --file input, the core library on top so it is read
    /// first), and runs to BYE or end of input.
    pub fn run_forth(&self) {
        let options = MachineOptions {
            data_size: self.args.data_size,
            rstack_size: self.args.rstack_size,
            trace: self.args.trace,
        };
        let mut machine = ForthMachine::new(options);
        machine.msg.set_level(self.debug_level);
        machine.cold_start();

        if let Some(path) = &self.args.file {
            match File::open(path) {
                Ok(file) => machine
                    .console
                    .push_source(Source::File(BufReader::new(file))),
                Err(e) => {
                    machine.msg.error("--file", &e.to_string(), Some(path));
                    return;
                }
            }
        }
        if !self.args.nocore {
            match self.open_core() {
                Some(source) => machine.console.push_source(source),
                None => machine.msg.warning(
                    "startup",
                    "core library not found, starting bare",
                    None::<bool>,
                ),
            }
        }

        let _raw = match RawModeGuard::new(self.args.raw) {
            Ok(guard) => Some(guard),
            Err(e) => {
                machine
                    .msg
                    .warning("terminal", "raw mode unavailable", Some(e.to_string()));
                None
            }
        };
        machine.run();
    }
}
