use std::process::ExitCode;

fn main() -> ExitCode {
    carepath_cli::run()
}
