use std::process::ExitCode;

fn main() -> ExitCode {
    match pine_cli::run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Erreur : {e:#}");
            ExitCode::FAILURE
        }
    }
}
