use clap::Parser;
use plutus::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
