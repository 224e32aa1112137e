use clap::Parser;
use hourcross::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    hourcross::logging::init_logging();
    run(Cli::parse())
}
