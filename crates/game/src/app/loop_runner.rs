use std::process::ExitCode;

use engine::run_app;
use tracing::error;

use super::bootstrap::AppWiring;
use crate::scenes::GameScene;

pub(crate) fn run(app: AppWiring) -> ExitCode {
    if let Err(err) = run_app(
        app.config,
        app.asset_root,
        app.scenes,
        app.context,
        GameScene::Menu,
    ) {
        error!(error = %err, "startup_failed");
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
