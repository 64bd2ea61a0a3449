use std::process::ExitCode;

fn main() -> ExitCode {
    match landmarkit::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            ExitCode::FAILURE
        }
    }
}
