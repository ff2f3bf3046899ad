use std::process::ExitCode;

use tracing::error;

mod app;
mod audio;
mod bag;
mod battle;
mod monster;
mod net;
mod save;
mod scenes;
mod shop;
mod toast;
mod world;

fn main() -> ExitCode {
    match app::bootstrap::build_app() {
        Ok(wiring) => app::loop_runner::run(wiring),
        Err(err) => {
            error!(error = %err, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
