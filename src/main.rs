// forth32 main program

mod config;
mod kernel;
mod machine;
mod internals;

use config::Config;

fn main() {
    let mut config = Config::new();
    config.process_args();
    config.run_forth();
}
