use std::process::ExitCode;

fn main() -> ExitCode {
    studysite::cli::run()
}
