use rand::Rng;
use thiserror::Error;
use tracing::{debug, info};

use crate::bag::{Bag, Potion};
use crate::monster::{element_multiplier, Monster, MonsterRecord};

pub const ATTACK_ANIM_SECONDS: f32 = 0.5;
pub const END_DELAY_SECONDS: f32 = 0.8;
pub const MESSAGE_SECONDS: f32 = 0.9;
pub const INTRO_MESSAGE_SECONDS: f32 = 1.0;
pub const BASE_POWER: u32 = 5;
pub const ENEMY_LEVEL_RANGE: std::ops::RangeInclusive<u32> = 5..=15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleState {
    Idle,
    PlayerTurn,
    PlayerAttackAnim,
    EnemyAttackAnim,
    ItemMenu,
    Win,
    Lose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleKind {
    Wild,
    /// Index into the current map's trainer list.
    Trainer(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerAction {
    Fight,
    Item,
    Switch,
    Run,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemChoice {
    Use(Potion),
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BattleOutcome {
    Won,
    Lost,
    Fled,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BattleError {
    #[error("No healthy monster can fight!")]
    NoHealthyMonster,
}

#[derive(Debug, Clone, PartialEq)]
struct TimedMessage {
    text: String,
    remaining: f32,
}

/// Turn-based fight between the first healthy bag monster and one enemy.
/// The player's monster stays in the bag and is addressed by index, so
/// damage and level-ups persist after the battle.
#[derive(Debug, Clone, PartialEq)]
pub struct Battle {
    kind: BattleKind,
    state: BattleState,
    player_index: usize,
    enemy: Monster,
    anim_timer: f32,
    end_timer: f32,
    message: Option<TimedMessage>,
}

/// `max(1, (5 + atk + atk_buff) * multiplier - (def + def_buff))`,
/// truncated toward zero.
pub fn calc_damage(attacker: &Monster, defender: &Monster) -> u32 {
    let multiplier = element_multiplier(attacker.element, defender.element);
    let power = BASE_POWER.saturating_add(attacker.attack_power());
    let raw = f64::from(power) * f64::from(multiplier) - f64::from(defender.defense());
    raw.clamp(1.0, f64::from(u32::MAX)) as u32
}

fn effectiveness_message(multiplier: f32, damage: u32, enemy_side: bool) -> String {
    match (multiplier > 1.0, multiplier < 1.0, enemy_side) {
        (true, _, false) => format!("It's super effective! (-{damage})"),
        (_, true, false) => format!("It's not very effective... (-{damage})"),
        (_, _, false) => format!("Hit! (-{damage})"),
        (true, _, true) => format!("Enemy: super effective! (-{damage})"),
        (_, true, true) => format!("Enemy: not very effective... (-{damage})"),
        (_, _, true) => format!("Enemy hit! (-{damage})"),
    }
}

impl Battle {
    /// Copies the enemy template and fills its missing stats. Enemies
    /// without a level get a random one.
    pub fn prepare(enemy: &MonsterRecord, kind: BattleKind, rng: &mut impl Rng) -> Self {
        let default_level = rng.gen_range(ENEMY_LEVEL_RANGE);
        Self {
            kind,
            state: BattleState::Idle,
            player_index: 0,
            enemy: enemy.normalize(default_level),
            anim_timer: 0.0,
            end_timer: 0.0,
            message: None,
        }
    }

    pub fn start(&mut self, bag: &Bag) -> Result<(), BattleError> {
        let player_index = bag
            .first_healthy_monster()
            .ok_or(BattleError::NoHealthyMonster)?;
        self.player_index = player_index;
        self.state = BattleState::PlayerTurn;
        let intro = match self.kind {
            BattleKind::Wild => "A wild enemy appeared!".to_string(),
            BattleKind::Trainer(_) => format!("Trainer sends out {}!", self.enemy.name),
        };
        self.set_message(intro, INTRO_MESSAGE_SECONDS);
        info!(
            kind = ?self.kind,
            enemy = %self.enemy.name,
            enemy_level = self.enemy.level,
            player_index,
            "battle_started"
        );
        Ok(())
    }

    pub fn state(&self) -> BattleState {
        self.state
    }

    pub fn kind(&self) -> BattleKind {
        self.kind
    }

    pub fn enemy(&self) -> &Monster {
        &self.enemy
    }

    pub fn player_index(&self) -> usize {
        self.player_index
    }

    pub fn player<'a>(&self, bag: &'a Bag) -> Option<&'a Monster> {
        bag.monsters.get(self.player_index)
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_ref().map(|message| message.text.as_str())
    }

    fn set_message(&mut self, text: impl Into<String>, seconds: f32) {
        self.message = Some(TimedMessage {
            text: text.into(),
            remaining: seconds,
        });
    }

    pub fn choose_action(&mut self, action: PlayerAction, bag: &mut Bag) -> Option<BattleOutcome> {
        if self.state != BattleState::PlayerTurn {
            return None;
        }
        match action {
            PlayerAction::Fight => {
                if self.enemy.is_fainted() {
                    self.enter_end(BattleState::Win);
                    return None;
                }
                let name = self
                    .player(bag)
                    .map(|monster| monster.name.clone())
                    .unwrap_or_default();
                self.set_message(format!("{name} attacks!"), MESSAGE_SECONDS);
                self.anim_timer = ATTACK_ANIM_SECONDS;
                self.state = BattleState::PlayerAttackAnim;
            }
            PlayerAction::Item => self.state = BattleState::ItemMenu,
            PlayerAction::Switch => {
                self.set_message("You hesitated...", MESSAGE_SECONDS);
                self.anim_timer = ATTACK_ANIM_SECONDS;
                self.state = BattleState::EnemyAttackAnim;
            }
            PlayerAction::Run => {
                self.finish(bag, BattleOutcome::Fled);
                return Some(BattleOutcome::Fled);
            }
        }
        None
    }

    /// A failed item use keeps the menu open and costs no turn.
    pub fn choose_item(&mut self, choice: ItemChoice, bag: &mut Bag) {
        if self.state != BattleState::ItemMenu {
            return;
        }
        let potion = match choice {
            ItemChoice::Back => {
                self.state = BattleState::PlayerTurn;
                return;
            }
            ItemChoice::Use(potion) => potion,
        };
        match bag.use_potion(potion, self.player_index) {
            Ok(effect) => {
                self.set_message(effect.message(), MESSAGE_SECONDS);
                self.anim_timer = ATTACK_ANIM_SECONDS;
                self.state = BattleState::EnemyAttackAnim;
            }
            Err(err) => {
                debug!(item = potion.item_name(), error = %err, "battle_item_refused");
                self.set_message(err.to_string(), MESSAGE_SECONDS);
            }
        }
    }

    /// Advances timers. Returns the outcome once the end delay has run out.
    pub fn update(&mut self, dt_seconds: f32, bag: &mut Bag) -> Option<BattleOutcome> {
        if self.state == BattleState::Idle {
            return None;
        }
        if let Some(message) = self.message.as_mut() {
            message.remaining -= dt_seconds;
            if message.remaining <= 0.0 {
                self.message = None;
            }
        }

        match self.state {
            BattleState::Win | BattleState::Lose => {
                self.end_timer -= dt_seconds;
                if self.end_timer <= 0.0 {
                    let outcome = if self.state == BattleState::Win {
                        BattleOutcome::Won
                    } else {
                        BattleOutcome::Lost
                    };
                    self.finish(bag, outcome);
                    return Some(outcome);
                }
            }
            BattleState::PlayerAttackAnim => {
                self.anim_timer -= dt_seconds;
                if self.anim_timer <= 0.0 {
                    self.resolve_player_attack(bag);
                }
            }
            BattleState::EnemyAttackAnim => {
                self.anim_timer -= dt_seconds;
                if self.anim_timer <= 0.0 {
                    self.resolve_enemy_attack(bag);
                }
            }
            BattleState::Idle | BattleState::PlayerTurn | BattleState::ItemMenu => {}
        }
        None
    }

    fn resolve_player_attack(&mut self, bag: &mut Bag) {
        let Some(player) = bag.monsters.get_mut(self.player_index) else {
            self.enter_end(BattleState::Lose);
            return;
        };
        let damage = calc_damage(player, &self.enemy);
        let multiplier = element_multiplier(player.element, self.enemy.element);
        self.enemy.take_damage(damage);
        self.set_message(effectiveness_message(multiplier, damage, false), MESSAGE_SECONDS);

        if !self.enemy.is_fainted() {
            self.anim_timer = ATTACK_ANIM_SECONDS;
            self.state = BattleState::EnemyAttackAnim;
            return;
        }

        if player.level_up() {
            let text = format!("{} evolved!", player.name);
            info!(monster = %player.name, level = player.level, "monster_evolved");
            self.set_message(text, MESSAGE_SECONDS);
        }
        self.enter_end(BattleState::Win);
    }

    fn resolve_enemy_attack(&mut self, bag: &mut Bag) {
        let Some(player) = bag.monsters.get_mut(self.player_index) else {
            self.enter_end(BattleState::Lose);
            return;
        };
        let damage = calc_damage(&self.enemy, player);
        let multiplier = element_multiplier(self.enemy.element, player.element);
        player.take_damage(damage);
        self.set_message(effectiveness_message(multiplier, damage, true), MESSAGE_SECONDS);

        if player.is_fainted() {
            self.enter_end(BattleState::Lose);
        } else {
            self.state = BattleState::PlayerTurn;
        }
    }

    fn enter_end(&mut self, state: BattleState) {
        self.state = state;
        self.end_timer = END_DELAY_SECONDS;
    }

    fn finish(&mut self, bag: &mut Bag, outcome: BattleOutcome) {
        if let Some(player) = bag.monsters.get_mut(self.player_index) {
            player.clear_buffs();
        }
        info!(kind = ?self.kind, outcome = ?outcome, enemy = %self.enemy.name, "battle_finished");
        self.state = BattleState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::Element;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn stats(name: &str, hp: u32, atk: u32, def: u32, element: Element) -> MonsterRecord {
        MonsterRecord {
            hp: Some(hp),
            max_hp: Some(hp),
            level: Some(5),
            atk: Some(atk),
            def: Some(def),
            element: Some(element),
            ..MonsterRecord::named(name)
        }
    }

    fn started(player: MonsterRecord, enemy: MonsterRecord) -> (Battle, Bag) {
        let mut bag = Bag {
            monsters: vec![player.normalize(1)],
            items: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(7);
        let mut battle = Battle::prepare(&enemy, BattleKind::Wild, &mut rng);
        battle.start(&bag).expect("start");
        assert_eq!(battle.update(0.0, &mut bag), None);
        (battle, bag)
    }

    fn run_until_not(battle: &mut Battle, bag: &mut Bag, state: BattleState) {
        for _ in 0..20 {
            if battle.state() != state {
                return;
            }
            battle.update(0.25, bag);
        }
        panic!("battle stuck in {state:?}");
    }

    #[test]
    fn damage_never_drops_below_one() {
        let weak = stats("Weak", 10, 0, 0, Element::Fire).normalize(1);
        let wall = stats("Wall", 10, 0, 500, Element::Water).normalize(1);
        assert_eq!(calc_damage(&weak, &wall), 1);
    }

    #[test]
    fn damage_saturates_for_extreme_stats() {
        let huge = MonsterRecord {
            atk: Some(u32::MAX),
            atk_buff: Some(u32::MAX),
            element: Some(Element::Water),
            ..MonsterRecord::named("Titan")
        }
        .normalize(1);
        let target = stats("Ember", 30, 8, 3, Element::Fire).normalize(1);
        assert_eq!(calc_damage(&huge, &target), u32::MAX);
        assert_eq!(calc_damage(&target, &huge), 1);
    }

    #[test]
    fn damage_truncates_fractional_results() {
        let enemy = stats("Ember", 30, 8, 3, Element::Fire).normalize(1);
        let player = stats("Drip", 50, 10, 5, Element::Water).normalize(1);
        assert_eq!(calc_damage(&enemy, &player), 1);
        let grass = stats("Leafy", 30, 10, 5, Element::Grass).normalize(1);
        assert_eq!(calc_damage(&grass, &player), 25);
    }

    #[test]
    fn super_effective_fight_then_win() {
        let (mut battle, mut bag) = started(
            stats("Drip", 50, 10, 5, Element::Water),
            stats("Ember", 30, 8, 3, Element::Fire),
        );

        battle.choose_action(PlayerAction::Fight, &mut bag);
        assert_eq!(battle.state(), BattleState::PlayerAttackAnim);
        run_until_not(&mut battle, &mut bag, BattleState::PlayerAttackAnim);
        assert_eq!(battle.enemy().hp, 3);
        assert_eq!(battle.message(), Some("It's super effective! (-27)"));
        assert_eq!(battle.state(), BattleState::EnemyAttackAnim);

        run_until_not(&mut battle, &mut bag, BattleState::EnemyAttackAnim);
        assert_eq!(battle.state(), BattleState::PlayerTurn);
        assert_eq!(bag.monsters[0].hp, 49);

        battle.choose_action(PlayerAction::Fight, &mut bag);
        run_until_not(&mut battle, &mut bag, BattleState::PlayerAttackAnim);
        assert_eq!(battle.enemy().hp, 0);
        assert_eq!(battle.state(), BattleState::Win);
        assert_eq!(bag.monsters[0].level, 6);

        let mut outcome = None;
        for _ in 0..10 {
            outcome = battle.update(0.25, &mut bag);
            if outcome.is_some() {
                break;
            }
        }
        assert_eq!(outcome, Some(BattleOutcome::Won));
    }

    #[test]
    fn start_without_healthy_monster_is_refused() {
        let mut fainted = stats("Drip", 50, 10, 5, Element::Water).normalize(1);
        fainted.hp = 0;
        let bag = Bag {
            monsters: vec![fainted],
            items: Vec::new(),
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut battle = Battle::prepare(&MonsterRecord::named("Rocko"), BattleKind::Wild, &mut rng);
        assert_eq!(battle.start(&bag), Err(BattleError::NoHealthyMonster));
        assert_eq!(battle.state(), BattleState::Idle);
    }

    #[test]
    fn enemy_without_level_gets_one_in_range() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..20 {
            let battle = Battle::prepare(&MonsterRecord::named("Rocko"), BattleKind::Wild, &mut rng);
            assert!(ENEMY_LEVEL_RANGE.contains(&battle.enemy().level));
        }
    }

    #[test]
    fn failed_item_use_stays_in_menu_without_cost() {
        let (mut battle, mut bag) = started(
            stats("Drip", 50, 10, 5, Element::Water),
            stats("Ember", 30, 8, 3, Element::Fire),
        );
        battle.choose_action(PlayerAction::Item, &mut bag);
        assert_eq!(battle.state(), BattleState::ItemMenu);

        battle.choose_item(ItemChoice::Use(Potion::Heal), &mut bag);
        assert_eq!(battle.state(), BattleState::ItemMenu);
        assert_eq!(battle.message(), Some("No Heal Potion!"));
        assert_eq!(bag.monsters[0].hp, 50);

        battle.choose_item(ItemChoice::Back, &mut bag);
        assert_eq!(battle.state(), BattleState::PlayerTurn);
    }

    #[test]
    fn buff_potion_ends_turn_and_buffs_clear_after_run() {
        let (mut battle, mut bag) = started(
            stats("Drip", 50, 10, 5, Element::Water),
            stats("Ember", 30, 8, 3, Element::Fire),
        );
        bag.add_item("Strength Potion", 1, "");
        battle.choose_action(PlayerAction::Item, &mut bag);
        battle.choose_item(ItemChoice::Use(Potion::Strength), &mut bag);
        assert_eq!(battle.state(), BattleState::EnemyAttackAnim);
        assert_eq!(battle.message(), Some("Used Strength Potion (+3 ATK)"));
        assert_eq!(bag.monsters[0].atk_buff, 3);

        run_until_not(&mut battle, &mut bag, BattleState::EnemyAttackAnim);
        assert_eq!(
            battle.choose_action(PlayerAction::Run, &mut bag),
            Some(BattleOutcome::Fled)
        );
        assert_eq!(bag.monsters[0].atk_buff, 0);
    }

    #[test]
    fn switch_forfeits_the_turn() {
        let (mut battle, mut bag) = started(
            stats("Drip", 50, 10, 5, Element::Water),
            stats("Ember", 30, 8, 3, Element::Fire),
        );
        battle.choose_action(PlayerAction::Switch, &mut bag);
        assert_eq!(battle.state(), BattleState::EnemyAttackAnim);
        assert_eq!(battle.message(), Some("You hesitated..."));
    }

    #[test]
    fn player_fainting_loses() {
        let (mut battle, mut bag) = started(
            stats("Sprout", 5, 1, 0, Element::Grass),
            stats("Blaze", 80, 30, 50, Element::Fire),
        );
        battle.choose_action(PlayerAction::Fight, &mut bag);
        run_until_not(&mut battle, &mut bag, BattleState::PlayerAttackAnim);
        run_until_not(&mut battle, &mut bag, BattleState::EnemyAttackAnim);
        assert_eq!(battle.state(), BattleState::Lose);
        assert!(bag.monsters[0].is_fainted());
    }
}
