//! Wake a test program paused at its checkpoint (`-p`).

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use usctest_harness::send_wake;

/// Deliver the wake-up signal to a paused test program.
#[derive(Debug, Parser)]
#[command(name = "usc-wake")]
#[command(about = "Wake a test program paused with -p")]
struct Cli {
    /// Process id of the paused test program.
    #[arg(long)]
    pid: i32,
    /// Signal the program is waiting for.
    #[arg(long, value_enum, default_value_t = WakeSignal::Usr1)]
    signal: WakeSignal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum WakeSignal {
    Usr1,
    Usr2,
}

impl WakeSignal {
    fn number(self) -> i32 {
        match self {
            Self::Usr1 => libc::SIGUSR1,
            Self::Usr2 => libc::SIGUSR2,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match send_wake(cli.pid, cli.signal.number()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("usc-wake: {err}");
            ExitCode::FAILURE
        }
    }
}
