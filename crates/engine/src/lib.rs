use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

pub mod app;
pub mod content;

pub use app::{
    glyph_advance, run_app, text_width_px, AppError, DrawCommand, DrawList, InputAction,
    InputSnapshot, LoopConfig, Rect, Renderer, Rgba, Scene, SceneCommand, SceneError, SceneKey,
    SceneMachine, TickOutcome, Vec2, GLYPH_HEIGHT,
};
pub use content::{
    load_tmx, parse_tmx, write_text_atomic, Properties, SourceLocation, TmxError, TmxMap,
    TmxObject, TmxObjectGroup, TmxTileLayer,
};

pub const ROOT_ENV_VAR: &str = "TILEMON_ROOT";

#[derive(Debug, Clone)]
pub struct AppPaths {
    pub root: PathBuf,
    pub assets_dir: PathBuf,
    pub saves_dir: PathBuf,
}

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to read environment variable {var}: {source}")]
    EnvVar {
        var: &'static str,
        #[source]
        source: env::VarError,
    },
    #[error("failed to create saves directory at {path}: {source}")]
    CreateSavesDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{var} points to {path}, which has no assets/maps directory")]
    InvalidEnvRoot { var: &'static str, path: PathBuf },
    #[error(
        "no directory with assets/maps found above {searched:?}\n\
Run from the game directory or set {var}, for example:\n\
export {var}=\"/path/to/tilemon\""
    )]
    RootNotFound {
        searched: Vec<PathBuf>,
        var: &'static str,
    },
}

/// Where the data root was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    EnvVar,
    WorkingDir,
    Executable,
}

/// Finds the data root: `TILEMON_ROOT` first, then the working directory and
/// the executable's directory and their ancestors.
pub fn resolve_app_paths() -> Result<AppPaths, StartupError> {
    let env_root = match env::var(ROOT_ENV_VAR) {
        Ok(value) => Some(PathBuf::from(value)),
        Err(env::VarError::NotPresent) => None,
        Err(source) => {
            return Err(StartupError::EnvVar {
                var: ROOT_ENV_VAR,
                source,
            })
        }
    };
    let cwd = env::current_dir().ok();
    let exe_dir = env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf));
    let (root, source) = locate_root(env_root, cwd.as_deref(), exe_dir.as_deref())?;
    info!(root = %root.display(), source = ?source, "app_root_resolved");
    app_paths_under(root)
}

/// Derives the asset and save directories under `root`, creating the save
/// directory if needed.
pub fn app_paths_under(root: PathBuf) -> Result<AppPaths, StartupError> {
    let assets_dir = root.join("assets");
    let saves_dir = root.join("saves");

    fs::create_dir_all(&saves_dir).map_err(|source| StartupError::CreateSavesDir {
        path: saves_dir.clone(),
        source,
    })?;

    Ok(AppPaths {
        root,
        assets_dir,
        saves_dir,
    })
}

fn locate_root(
    env_root: Option<PathBuf>,
    cwd: Option<&Path>,
    exe_dir: Option<&Path>,
) -> Result<(PathBuf, RootSource), StartupError> {
    if let Some(raw) = env_root {
        let root = canonical_or_raw(&raw);
        return if has_game_data(&root) {
            Ok((root, RootSource::EnvVar))
        } else {
            Err(StartupError::InvalidEnvRoot {
                var: ROOT_ENV_VAR,
                path: root,
            })
        };
    }

    let starts = [(cwd, RootSource::WorkingDir), (exe_dir, RootSource::Executable)];
    for (start, source) in starts {
        let Some(start) = start else { continue };
        if let Some(found) = start.ancestors().find(|dir| has_game_data(dir)) {
            return Ok((canonical_or_raw(found), source));
        }
    }
    Err(StartupError::RootNotFound {
        searched: starts
            .iter()
            .filter_map(|(start, _)| start.map(canonical_or_raw))
            .collect(),
        var: ROOT_ENV_VAR,
    })
}

fn has_game_data(dir: &Path) -> bool {
    dir.join("assets").join("maps").is_dir()
}

fn canonical_or_raw(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
