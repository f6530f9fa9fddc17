use clap::Parser;
use ruletrader::cli::{Cli, run};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
