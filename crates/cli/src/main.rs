use std::process::ExitCode;

fn main() -> ExitCode {
    cotation_cli::run()
}
