use std::path::PathBuf;

use engine::{resolve_app_paths, LoopConfig, SceneError, SceneMachine, StartupError};
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use super::context::{load_session, GameContext};
use super::settings::GameSettings;
use crate::save::SaveLoadError;
use crate::scenes::{self, GameScene};

#[derive(Debug, Error)]
pub(crate) enum BootstrapError {
    #[error(transparent)]
    Startup(#[from] StartupError),
    #[error("could not load the game session: {0}")]
    Session(#[from] SaveLoadError),
    #[error("scene registration failed: {0}")]
    Scenes(#[from] SceneError),
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) asset_root: PathBuf,
    pub(crate) scenes: SceneMachine<GameScene, GameContext>,
    pub(crate) context: GameContext,
}

pub(crate) fn build_app() -> Result<AppWiring, BootstrapError> {
    init_tracing();
    info!("=== Tilemon Startup ===");

    let paths = resolve_app_paths()?;
    let settings = GameSettings::from_env();
    info!(
        root = %paths.root.display(),
        online = settings.online,
        seed = ?settings.seed,
        target_tps = settings.target_tps,
        "settings_resolved"
    );

    let (world, bag) = load_session(&paths)?;
    info!(
        map = %world.current_map().id,
        monsters = bag.monsters.len(),
        items = bag.items.len(),
        "session_loaded"
    );

    let config = LoopConfig {
        target_tps: settings.target_tps,
        ..LoopConfig::default()
    };
    let asset_root = paths.assets_dir.clone();
    let context = GameContext::new(settings, paths, world, bag);
    let scenes = scenes::build_scene_machine()?;

    Ok(AppWiring {
        config,
        asset_root,
        scenes,
        context,
    })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
