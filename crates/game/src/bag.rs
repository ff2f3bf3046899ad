use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monster::{Monster, MonsterRecord, PLAYER_DEFAULT_LEVEL};

pub const COINS_ITEM: &str = "Coins";
pub const HEAL_AMOUNT: u32 = 25;
pub const STRENGTH_BONUS: u32 = 3;
pub const DEFENSE_BONUS: u32 = 2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    #[serde(default)]
    pub count: u32,
    #[serde(default, alias = "sprite_path")]
    pub sprite: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Potion {
    Heal,
    Strength,
    Defense,
}

impl Potion {
    pub const ALL: [Potion; 3] = [Potion::Heal, Potion::Strength, Potion::Defense];

    pub fn item_name(self) -> &'static str {
        match self {
            Potion::Heal => "Heal Potion",
            Potion::Strength => "Strength Potion",
            Potion::Defense => "Defense Potion",
        }
    }

    fn matches(self, name: &str) -> bool {
        name.eq_ignore_ascii_case(self.item_name())
            || (self == Potion::Heal && name.eq_ignore_ascii_case("potion"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PotionEffect {
    Healed(u32),
    AttackRaised(u32),
    DefenseRaised(u32),
}

impl PotionEffect {
    pub fn message(self) -> String {
        match self {
            PotionEffect::Healed(amount) => format!("Used Heal Potion (+{amount} HP)"),
            PotionEffect::AttackRaised(amount) => format!("Used Strength Potion (+{amount} ATK)"),
            PotionEffect::DefenseRaised(amount) => {
                format!("Used Defense Potion (+{amount} DEF)")
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ItemUseError {
    #[error("No {item}!")]
    Missing { item: &'static str },
    #[error("HP already full!")]
    HpFull,
    #[error("No monster to use it on!")]
    NoTarget,
}

/// Bag as stored on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BagRecord {
    pub monsters: Vec<MonsterRecord>,
    pub items: Vec<Item>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bag {
    pub monsters: Vec<Monster>,
    pub items: Vec<Item>,
}

impl Bag {
    pub fn from_record(record: &BagRecord) -> Self {
        Self {
            monsters: record
                .monsters
                .iter()
                .map(|monster| monster.normalize(PLAYER_DEFAULT_LEVEL))
                .collect(),
            items: record.items.clone(),
        }
    }

    pub fn to_record(&self) -> BagRecord {
        BagRecord {
            monsters: self.monsters.iter().map(Monster::to_record).collect(),
            items: self.items.clone(),
        }
    }

    pub fn item_count(&self, name: &str) -> u32 {
        self.items
            .iter()
            .filter(|item| item.name.eq_ignore_ascii_case(name))
            .map(|item| item.count)
            .sum()
    }

    pub fn potion_count(&self, potion: Potion) -> u32 {
        self.items
            .iter()
            .filter(|item| potion.matches(&item.name))
            .map(|item| item.count)
            .sum()
    }

    pub fn coins(&self) -> u32 {
        self.item_count(COINS_ITEM)
    }

    /// Adds `count` to an existing stack or appends a new one.
    pub fn add_item(&mut self, name: &str, count: u32, sprite: &str) {
        if let Some(item) = self
            .items
            .iter_mut()
            .find(|item| item.name.eq_ignore_ascii_case(name))
        {
            item.count = item.count.saturating_add(count);
            return;
        }
        self.items.push(Item {
            name: name.to_string(),
            count,
            sprite: sprite.to_string(),
        });
    }

    /// Removes `count` from the named stack. Nothing changes unless the whole
    /// amount is available.
    pub fn take_item(&mut self, name: &str, count: u32) -> bool {
        if self.item_count(name) < count {
            return false;
        }
        let mut remaining = count;
        for item in self
            .items
            .iter_mut()
            .filter(|item| item.name.eq_ignore_ascii_case(name))
        {
            let taken = remaining.min(item.count);
            item.count -= taken;
            remaining -= taken;
            if remaining == 0 {
                break;
            }
        }
        true
    }

    fn take_potion(&mut self, potion: Potion) -> bool {
        match self
            .items
            .iter_mut()
            .find(|item| potion.matches(&item.name) && item.count > 0)
        {
            Some(item) => {
                item.count -= 1;
                true
            }
            None => false,
        }
    }

    pub fn first_healthy_monster(&self) -> Option<usize> {
        self.monsters.iter().position(|monster| !monster.is_fainted())
    }

    pub fn remove_monster(&mut self, index: usize) -> Option<Monster> {
        (index < self.monsters.len()).then(|| self.monsters.remove(index))
    }

    /// Uses one potion on the monster at `target`. On error neither the
    /// bag nor the monster changes.
    pub fn use_potion(&mut self, potion: Potion, target: usize) -> Result<PotionEffect, ItemUseError> {
        if self.potion_count(potion) == 0 {
            return Err(ItemUseError::Missing {
                item: potion.item_name(),
            });
        }
        let monster = self.monsters.get(target).ok_or(ItemUseError::NoTarget)?;
        if potion == Potion::Heal && monster.hp >= monster.max_hp {
            return Err(ItemUseError::HpFull);
        }
        if !self.take_potion(potion) {
            return Err(ItemUseError::Missing {
                item: potion.item_name(),
            });
        }
        let monster = self
            .monsters
            .get_mut(target)
            .ok_or(ItemUseError::NoTarget)?;
        let effect = match potion {
            Potion::Heal => PotionEffect::Healed(monster.heal(HEAL_AMOUNT)),
            Potion::Strength => {
                monster.atk_buff = monster.atk_buff.saturating_add(STRENGTH_BONUS);
                PotionEffect::AttackRaised(STRENGTH_BONUS)
            }
            Potion::Defense => {
                monster.def_buff = monster.def_buff.saturating_add(DEFENSE_BONUS);
                PotionEffect::DefenseRaised(DEFENSE_BONUS)
            }
        };
        Ok(effect)
    }
}
