mod backpack;
mod battle;
mod catch;
mod menu;
mod navigation;
mod overworld;
mod settings;
mod shop;
mod ui;

use engine::{SceneError, SceneKey, SceneMachine};

use crate::app::context::GameContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameScene {
    Menu,
    Overworld,
    Battle,
    Backpack,
    Shop,
    SettingsFromMenu,
    SettingsFromGame,
    Navigation,
    Catch,
}

impl SceneKey for GameScene {
    const COUNT: usize = 9;

    fn index(self) -> usize {
        self as usize
    }
}

pub type GameMachine = SceneMachine<GameScene, GameContext>;

pub fn build_scene_machine() -> Result<GameMachine, SceneError> {
    let mut machine = SceneMachine::new();
    machine.register(GameScene::Menu, Box::new(menu::MenuScene::new()))?;
    machine.register(GameScene::Overworld, Box::new(overworld::OverworldScene::new()))?;
    machine.register(GameScene::Battle, Box::new(battle::BattleScene::new()))?;
    machine.register(GameScene::Backpack, Box::new(backpack::BackpackScene::new()))?;
    machine.register(GameScene::Shop, Box::new(shop::ShopScene::new()))?;
    machine.register(
        GameScene::SettingsFromMenu,
        Box::new(settings::SettingsScene::new(GameScene::Menu)),
    )?;
    machine.register(
        GameScene::SettingsFromGame,
        Box::new(settings::SettingsScene::new(GameScene::Overworld)),
    )?;
    machine.register(GameScene::Navigation, Box::new(navigation::NavigationScene::new()))?;
    machine.register(GameScene::Catch, Box::new(catch::CatchScene::new()))?;
    Ok(machine)
}
