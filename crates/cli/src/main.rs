use std::process::ExitCode;

fn main() -> ExitCode {
    datadada_cli::run()
}
