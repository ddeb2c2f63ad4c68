use std::process::ExitCode;

fn main() -> ExitCode {
    match gred::run_module() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            tracing::error!(target: "gred::run", error = %error, "gred exited with an error");
            ExitCode::FAILURE
        }
    }
}
