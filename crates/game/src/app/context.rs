use std::path::{Path, PathBuf};

use engine::AppPaths;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use crate::audio::{AudioSink, TracingAudio};
use crate::bag::Bag;
use crate::battle::BattleKind;
use crate::monster::MonsterRecord;
use crate::net::{LoopbackService, OnlineSession};
use crate::save::{self, SaveLoadError, NEW_GAME_FILE, SAVE_FILE};
use crate::toast::Toasts;
use crate::world::map::GameMap;
use crate::world::World;

use super::settings::GameSettings;

/// Battle queued by the scene that starts it; the battle scene takes it on
/// enter.
#[derive(Debug, Clone, PartialEq)]
pub struct BattleRequest {
    pub enemy: MonsterRecord,
    pub kind: BattleKind,
}

/// Shared state handed to every scene.
pub struct GameContext {
    pub settings: GameSettings,
    pub paths: AppPaths,
    pub world: World,
    pub bag: Bag,
    pub audio: Box<dyn AudioSink>,
    pub online: Option<OnlineSession>,
    pub toasts: Toasts,
    pub rng: StdRng,
    pub battle_request: Option<BattleRequest>,
}

impl GameContext {
    pub fn new(settings: GameSettings, paths: AppPaths, world: World, bag: Bag) -> Self {
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let online = settings
            .online
            .then(|| OnlineSession::new(Box::new(LoopbackService::new(1))));
        let audio = Box::new(TracingAudio::new(settings.effective_volume()));
        Self {
            settings,
            paths,
            world,
            bag,
            audio,
            online,
            toasts: Toasts::default(),
            rng,
            battle_request: None,
        }
    }

    pub fn save_path(&self) -> PathBuf {
        self.paths.saves_dir.join(SAVE_FILE)
    }

    pub fn save_game(&self) -> Result<PathBuf, SaveLoadError> {
        let path = self.save_path();
        save::write_save(&path, &save::capture(&self.world, &self.bag))?;
        Ok(path)
    }

    /// Replaces world and bag with the saved session. On error nothing
    /// changes.
    pub fn load_game(&mut self) -> Result<(), SaveLoadError> {
        let (world, bag) = load_session(&self.paths)?;
        self.world = world;
        self.bag = bag;
        self.battle_request = None;
        Ok(())
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.settings.bgm_volume = volume.clamp(0.0, 1.0);
        self.apply_volume();
    }

    pub fn toggle_mute(&mut self) {
        self.settings.muted = !self.settings.muted;
        info!(muted = self.settings.muted, "mute_toggled");
        self.apply_volume();
    }

    fn apply_volume(&mut self) {
        let volume = self.settings.effective_volume();
        self.audio.set_bgm_volume(volume);
    }
}

pub fn maps_dir(paths: &AppPaths) -> PathBuf {
    paths.assets_dir.join("maps")
}

/// Loads `saves/game0.json`, or the shipped new-game file when no save
/// exists yet.
pub fn load_session(paths: &AppPaths) -> Result<(World, Bag), SaveLoadError> {
    let save_path = paths.saves_dir.join(SAVE_FILE);
    let path = if save_path.is_file() {
        save_path
    } else {
        paths.assets_dir.join(NEW_GAME_FILE)
    };
    load_session_from(&path, &maps_dir(paths))
}

pub fn load_session_from(path: &Path, maps_dir: &Path) -> Result<(World, Bag), SaveLoadError> {
    let save = save::read_save(path)?;
    save::build_world(&save, |id| GameMap::load(maps_dir, id))
}


#[cfg(test)]
mod tests {
    use super::test_support::context;
    use super::*;
    use crate::bag::COINS_ITEM;
    use tempfile::TempDir;

    #[test]
    fn save_then_load_restores_bag_and_player() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        std::fs::create_dir_all(temp.path().join("assets/maps")).expect("maps dir");
        std::fs::write(
            temp.path().join("assets/maps/map.tmx"),
            r#"<map width="10" height="10" tilewidth="32" tileheight="32">
 <layer name="Ground" width="10" height="10"><data encoding="csv">
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1,
1,1,1,1,1,1,1,1,1,1
</data></layer>
</map>"#,
        )
        .expect("tmx");

        ctx.bag.add_item(COINS_ITEM, 40, "ui/coin");
        let path = ctx.save_game().expect("save");
        assert!(path.is_file());

        ctx.bag = Bag::default();
        ctx.world.player.position = engine::Vec2::new(160.0, 160.0);
        ctx.load_game().expect("load");
        assert_eq!(ctx.bag.coins(), 40);
        assert_eq!(ctx.world.player.position, engine::Vec2::new(32.0, 32.0));
    }

    #[test]
    fn shipped_new_game_loads() {
        let assets = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../assets");
        let (mut world, bag) =
            load_session_from(&assets.join(NEW_GAME_FILE), &assets.join("maps")).expect("new game");
        assert_eq!(world.current_map().id, "map.tmx");
        assert_eq!(world.maps().len(), 2);
        assert!(bag.coins() > 0);
        assert!(bag.first_healthy_monster().is_some());
        assert!(world.plan_route_to_point("Gym").expect("route to gym") > 0);
    }

    #[test]
    fn failed_load_keeps_current_session() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        ctx.bag.add_item(COINS_ITEM, 5, "ui/coin");
        assert!(ctx.load_game().is_err());
        assert_eq!(ctx.bag.coins(), 5);
    }

    #[test]
    fn mute_overrides_volume() {
        let temp = TempDir::new().expect("temp");
        let mut ctx = context(&temp);
        ctx.set_volume(0.8);
        assert_eq!(ctx.audio.bgm_volume(), 0.8);
        ctx.toggle_mute();
        assert_eq!(ctx.audio.bgm_volume(), 0.0);
        ctx.toggle_mute();
        assert_eq!(ctx.audio.bgm_volume(), 0.8);
    }
}
