use std::fmt::Debug;

use thiserror::Error;
use tracing::{debug, info};

use super::draw::DrawList;
use super::input::InputSnapshot;

/// Closed set of scene identifiers. Keys index a fixed table, so a game
/// declares every scene it can ever switch to up front.
pub trait SceneKey: Copy + Eq + Debug + 'static {
    const COUNT: usize;

    fn index(self) -> usize;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SceneCommand<K> {
    None,
    SwitchTo(K),
    Quit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SceneError {
    #[error("scene {key} is not registered")]
    Unregistered { key: String },
    #[error("scene {key} is already registered")]
    Duplicate { key: String },
    #[error("scene key {key} has index {index} outside the table of {count} scenes")]
    IndexOutOfRange {
        key: String,
        index: usize,
        count: usize,
    },
}

/// A game mode. The machine owns every registered scene for the whole
/// session; `enter`/`exit` run on each switch and must tolerate repeats.
pub trait Scene<K: SceneKey, C> {
    fn enter(&mut self, ctx: &mut C);
    fn exit(&mut self, _ctx: &mut C) {}
    fn handle_input(&mut self, input: &InputSnapshot, ctx: &mut C) -> SceneCommand<K>;
    fn update(&mut self, dt_seconds: f32, ctx: &mut C) -> SceneCommand<K>;
    fn draw(&self, ctx: &C, frame: &mut DrawList);
    fn debug_title(&self, _ctx: &C) -> Option<String> {
        None
    }
}

pub struct SceneMachine<K: SceneKey, C> {
    scenes: Vec<Option<Box<dyn Scene<K, C>>>>,
    current: Option<K>,
}

impl<K: SceneKey, C> Default for SceneMachine<K, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: SceneKey, C> SceneMachine<K, C> {
    pub fn new() -> Self {
        let mut scenes = Vec::with_capacity(K::COUNT);
        scenes.resize_with(K::COUNT, || None);
        Self {
            scenes,
            current: None,
        }
    }

    pub fn register(&mut self, key: K, scene: Box<dyn Scene<K, C>>) -> Result<(), SceneError> {
        let index = checked_index(key)?;
        if self.scenes[index].is_some() {
            return Err(SceneError::Duplicate {
                key: format!("{key:?}"),
            });
        }
        self.scenes[index] = Some(scene);
        Ok(())
    }

    pub fn is_registered(&self, key: K) -> bool {
        checked_index(key)
            .map(|index| self.scenes[index].is_some())
            .unwrap_or(false)
    }

    pub fn current(&self) -> Option<K> {
        self.current
    }

    /// Exits the current scene, moves the pointer, then enters `key`.
    /// An unregistered key leaves the machine untouched.
    pub fn change_scene(&mut self, key: K, ctx: &mut C) -> Result<(), SceneError> {
        if !self.is_registered(key) {
            return Err(SceneError::Unregistered {
                key: format!("{key:?}"),
            });
        }

        let previous = self.current;
        if let Some(scene) = previous.and_then(|current| self.scene_mut(current)) {
            scene.exit(ctx);
        }
        self.current = Some(key);
        if let Some(scene) = self.scene_mut(key) {
            scene.enter(ctx);
        }
        info!(from = ?previous, to = ?key, "scene_changed");
        Ok(())
    }

    /// Runs one simulation tick: input first, then update unless input
    /// already switched scenes.
    pub fn tick(
        &mut self,
        dt_seconds: f32,
        input: &InputSnapshot,
        ctx: &mut C,
    ) -> Result<TickOutcome, SceneError> {
        let Some(current) = self.current else {
            return Ok(TickOutcome::Continue);
        };
        let command = match self.scene_mut(current) {
            Some(scene) => scene.handle_input(input, ctx),
            None => SceneCommand::None,
        };
        if command != SceneCommand::None {
            return self.apply(command, ctx);
        }

        let command = match self.scene_mut(current) {
            Some(scene) => scene.update(dt_seconds, ctx),
            None => SceneCommand::None,
        };
        self.apply(command, ctx)
    }

    pub fn apply(
        &mut self,
        command: SceneCommand<K>,
        ctx: &mut C,
    ) -> Result<TickOutcome, SceneError> {
        match command {
            SceneCommand::None => Ok(TickOutcome::Continue),
            SceneCommand::SwitchTo(next) => {
                self.change_scene(next, ctx)?;
                Ok(TickOutcome::Continue)
            }
            SceneCommand::Quit => {
                debug!(scene = ?self.current, "scene_requested_quit");
                Ok(TickOutcome::Quit)
            }
        }
    }

    pub fn draw(&self, ctx: &C, frame: &mut DrawList) {
        if let Some(scene) = self.current.and_then(|current| self.scene_ref(current)) {
            scene.draw(ctx, frame);
        }
    }

    pub fn debug_title(&self, ctx: &C) -> Option<String> {
        self.current
            .and_then(|current| self.scene_ref(current))
            .and_then(|scene| scene.debug_title(ctx))
    }

    pub fn shutdown(&mut self, ctx: &mut C) {
        if let Some(current) = self.current.take() {
            if let Some(scene) = self.scene_mut(current) {
                scene.exit(ctx);
            }
        }
    }

    fn scene_mut(&mut self, key: K) -> Option<&mut Box<dyn Scene<K, C>>> {
        self.scenes.get_mut(key.index()).and_then(Option::as_mut)
    }

    fn scene_ref(&self, key: K) -> Option<&dyn Scene<K, C>> {
        self.scenes
            .get(key.index())
            .and_then(Option::as_ref)
            .map(|scene| scene.as_ref())
    }
}

fn checked_index<K: SceneKey>(key: K) -> Result<usize, SceneError> {
    let index = key.index();
    if index >= K::COUNT {
        return Err(SceneError::IndexOutOfRange {
            key: format!("{key:?}"),
            index,
            count: K::COUNT,
        });
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::InputAction;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Key {
        Menu,
        Play,
        Pause,
    }

    impl SceneKey for Key {
        const COUNT: usize = 3;

        fn index(self) -> usize {
            self as usize
        }
    }

    #[derive(Default)]
    struct Log {
        events: Vec<String>,
    }

    struct TestScene {
        name: &'static str,
        next_on_confirm: Option<Key>,
        quit_on_update: bool,
    }

    impl TestScene {
        fn boxed(name: &'static str, next_on_confirm: Option<Key>) -> Box<Self> {
            Box::new(Self {
                name,
                next_on_confirm,
                quit_on_update: false,
            })
        }
    }

    impl Scene<Key, Log> for TestScene {
        fn enter(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("enter:{}", self.name));
        }

        fn exit(&mut self, ctx: &mut Log) {
            ctx.events.push(format!("exit:{}", self.name));
        }

        fn handle_input(&mut self, input: &InputSnapshot, _ctx: &mut Log) -> SceneCommand<Key> {
            match self.next_on_confirm {
                Some(next) if input.was_pressed(InputAction::Confirm) => {
                    SceneCommand::SwitchTo(next)
                }
                _ => SceneCommand::None,
            }
        }

        fn update(&mut self, _dt_seconds: f32, ctx: &mut Log) -> SceneCommand<Key> {
            ctx.events.push(format!("update:{}", self.name));
            if self.quit_on_update {
                SceneCommand::Quit
            } else {
                SceneCommand::None
            }
        }

        fn draw(&self, _ctx: &Log, frame: &mut DrawList) {
            frame.text(0, 0, self.name, [255, 255, 255, 255]);
        }
    }

    fn machine() -> SceneMachine<Key, Log> {
        let mut machine = SceneMachine::new();
        machine
            .register(Key::Menu, TestScene::boxed("menu", Some(Key::Play)))
            .expect("register menu");
        machine
            .register(Key::Play, TestScene::boxed("play", None))
            .expect("register play");
        machine
    }

    #[test]
    fn change_scene_exits_then_enters() {
        let mut machine = machine();
        let mut log = Log::default();

        machine.change_scene(Key::Menu, &mut log).expect("menu");
        machine.change_scene(Key::Play, &mut log).expect("play");

        assert_eq!(log.events, vec!["enter:menu", "exit:menu", "enter:play"]);
        assert_eq!(machine.current(), Some(Key::Play));
    }

    #[test]
    fn unregistered_key_is_rejected_without_state_change() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.change_scene(Key::Menu, &mut log).expect("menu");

        let result = machine.change_scene(Key::Pause, &mut log);

        assert!(matches!(result, Err(SceneError::Unregistered { .. })));
        assert_eq!(machine.current(), Some(Key::Menu));
        assert_eq!(log.events, vec!["enter:menu"]);
    }

    #[test]
    fn duplicate_registration_is_an_error() {
        let mut machine = machine();
        let result = machine.register(Key::Menu, TestScene::boxed("again", None));
        assert!(matches!(result, Err(SceneError::Duplicate { .. })));
    }

    #[test]
    fn input_switch_skips_update_of_old_scene() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.change_scene(Key::Menu, &mut log).expect("menu");

        let input = InputSnapshot::empty().with_action_pressed(InputAction::Confirm);
        let outcome = machine.tick(0.016, &input, &mut log).expect("tick");

        assert_eq!(outcome, TickOutcome::Continue);
        assert_eq!(machine.current(), Some(Key::Play));
        assert!(!log.events.iter().any(|event| event == "update:menu"));
    }

    #[test]
    fn quit_command_is_reported() {
        let mut machine: SceneMachine<Key, Log> = SceneMachine::new();
        machine
            .register(
                Key::Pause,
                Box::new(TestScene {
                    name: "pause",
                    next_on_confirm: None,
                    quit_on_update: true,
                }),
            )
            .expect("register");
        let mut log = Log::default();
        machine.change_scene(Key::Pause, &mut log).expect("pause");

        let outcome = machine
            .tick(0.016, &InputSnapshot::empty(), &mut log)
            .expect("tick");
        assert_eq!(outcome, TickOutcome::Quit);
    }

    #[test]
    fn reentering_same_scene_runs_both_hooks() {
        let mut machine = machine();
        let mut log = Log::default();
        machine.change_scene(Key::Play, &mut log).expect("play");
        machine.change_scene(Key::Play, &mut log).expect("play again");
        assert_eq!(log.events, vec!["enter:play", "exit:play", "enter:play"]);
    }

    #[test]
    fn draw_delegates_to_current_scene_only() {
        let mut machine = machine();
        let mut log = Log::default();
        let mut frame = DrawList::default();

        machine.draw(&log, &mut frame);
        assert!(frame.commands().is_empty());

        machine.change_scene(Key::Menu, &mut log).expect("menu");
        machine.draw(&log, &mut frame);
        assert_eq!(frame.commands().len(), 1);
    }
}
