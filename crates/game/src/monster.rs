use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_HP: u32 = 50;
pub const DEFAULT_ATK: u32 = 10;
pub const DEFAULT_DEF: u32 = 5;
pub const PLAYER_DEFAULT_LEVEL: u32 = 1;

const FNV1A_OFFSET_BASIS_64: u64 = 0xcbf2_9ce4_8422_2325;
const FNV1A_PRIME_64: u64 = 0x0000_0100_0000_01b3;
const FALLBACK_ELEMENTS: [Element; 3] = [Element::Water, Element::Fire, Element::Grass];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Element {
    Water,
    Fire,
    Grass,
    Normal,
}

impl Element {
    pub fn label(self) -> &'static str {
        match self {
            Element::Water => "Water",
            Element::Fire => "Fire",
            Element::Grass => "Grass",
            Element::Normal => "Normal",
        }
    }

    /// Keyword match on the monster name; `None` when nothing matches.
    pub fn from_name_keywords(name: &str) -> Option<Element> {
        let lower = name.to_ascii_lowercase();
        if lower.contains("water") {
            Some(Element::Water)
        } else if lower.contains("fire") {
            Some(Element::Fire)
        } else if lower.contains("grass") || lower.contains("leaf") {
            Some(Element::Grass)
        } else {
            None
        }
    }

    /// Stable pick among the three real elements, keyed by name.
    pub fn fallback_for_name(name: &str) -> Element {
        let mut hash = FNV1A_OFFSET_BASIS_64;
        for byte in name.as_bytes() {
            hash ^= *byte as u64;
            hash = hash.wrapping_mul(FNV1A_PRIME_64);
        }
        FALLBACK_ELEMENTS[(hash % FALLBACK_ELEMENTS.len() as u64) as usize]
    }
}

/// Damage multiplier for `attacker` hitting `defender`.
pub fn element_multiplier(attacker: Element, defender: Element) -> f32 {
    use Element::{Fire, Grass, Water};
    match (attacker, defender) {
        (Water, Fire) | (Fire, Grass) | (Grass, Water) => 2.0,
        (Fire, Water) | (Grass, Fire) | (Water, Grass) => 0.5,
        _ => 1.0,
    }
}

/// Monster as it appears in save files and templates. Every stat is
/// optional; `normalize` fills the gaps once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonsterRecord {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_hp: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<u32>,
    #[serde(alias = "sprite_path", skip_serializing_if = "Option::is_none")]
    pub sprite: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub element: Option<Element>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atk: Option<u32>,
    #[serde(rename = "def", skip_serializing_if = "Option::is_none")]
    pub def: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub atk_buff: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub def_buff: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evolve_level: Option<u32>,
    #[serde(alias = "evolve_to_sprite_path", skip_serializing_if = "Option::is_none")]
    pub evolve_to_sprite: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub evolved: bool,
}

impl MonsterRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn normalize(&self, default_level: u32) -> Monster {
        let max_hp = self.max_hp.unwrap_or(DEFAULT_MAX_HP).max(1);
        let element = self
            .element
            .or_else(|| Element::from_name_keywords(&self.name))
            .unwrap_or_else(|| Element::fallback_for_name(&self.name));
        Monster {
            name: self.name.clone(),
            hp: self.hp.unwrap_or(max_hp).min(max_hp),
            max_hp,
            level: self.level.unwrap_or(default_level).max(1),
            sprite: self.sprite.clone().unwrap_or_default(),
            element,
            atk: self.atk.unwrap_or(DEFAULT_ATK),
            def: self.def.unwrap_or(DEFAULT_DEF),
            atk_buff: self.atk_buff.unwrap_or(0),
            def_buff: self.def_buff.unwrap_or(0),
            evolve_level: self.evolve_level,
            evolve_to_sprite: self
                .evolve_to_sprite
                .clone()
                .filter(|sprite| !sprite.is_empty()),
            evolved: self.evolved,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Monster {
    pub name: String,
    pub hp: u32,
    pub max_hp: u32,
    pub level: u32,
    pub sprite: String,
    pub element: Element,
    pub atk: u32,
    pub def: u32,
    pub atk_buff: u32,
    pub def_buff: u32,
    pub evolve_level: Option<u32>,
    pub evolve_to_sprite: Option<String>,
    pub evolved: bool,
}

impl Monster {
    pub fn to_record(&self) -> MonsterRecord {
        MonsterRecord {
            name: self.name.clone(),
            hp: Some(self.hp),
            max_hp: Some(self.max_hp),
            level: Some(self.level),
            sprite: Some(self.sprite.clone()),
            element: Some(self.element),
            atk: Some(self.atk),
            def: Some(self.def),
            atk_buff: Some(self.atk_buff),
            def_buff: Some(self.def_buff),
            evolve_level: self.evolve_level,
            evolve_to_sprite: self.evolve_to_sprite.clone(),
            evolved: self.evolved,
        }
    }

    pub fn is_fainted(&self) -> bool {
        self.hp == 0
    }

    pub fn attack_power(&self) -> u32 {
        self.atk.saturating_add(self.atk_buff)
    }

    pub fn defense(&self) -> u32 {
        self.def.saturating_add(self.def_buff)
    }

    /// Returns the hp actually lost.
    pub fn take_damage(&mut self, amount: u32) -> u32 {
        let lost = amount.min(self.hp);
        self.hp -= lost;
        lost
    }

    /// Returns the hp actually restored.
    pub fn heal(&mut self, amount: u32) -> u32 {
        let restored = amount.min(self.max_hp.saturating_sub(self.hp));
        self.hp += restored;
        restored
    }

    pub fn clear_buffs(&mut self) {
        self.atk_buff = 0;
        self.def_buff = 0;
    }

    pub fn can_evolve(&self) -> bool {
        !self.evolved
            && self.evolve_to_sprite.is_some()
            && self
                .evolve_level
                .is_some_and(|threshold| self.level >= threshold)
    }

    /// Applies the one-time evolution if its conditions hold.
    pub fn try_evolve(&mut self) -> bool {
        if !self.can_evolve() {
            return false;
        }
        let Some(target) = self.evolve_to_sprite.clone() else {
            return false;
        };
        self.sprite = target;
        self.max_hp = grown(self.max_hp, 10, 13, 10);
        self.atk = grown(self.atk, 3, 13, 10);
        self.def = grown(self.def, 2, 6, 5);
        self.hp = self.max_hp;
        self.evolved = true;
        true
    }

    /// Level up by one and try to evolve. Returns whether evolution fired.
    pub fn level_up(&mut self) -> bool {
        self.level = self.level.saturating_add(1);
        self.try_evolve()
    }
}

/// `max(stat + bonus, floor(stat * num / den))`, saturating at `u32::MAX`.
fn grown(stat: u32, bonus: u32, num: u64, den: u64) -> u32 {
    let scaled = u64::from(stat) * num / den;
    let stepped = u64::from(stat) + u64::from(bonus);
    u32::try_from(scaled.max(stepped)).unwrap_or(u32::MAX)
}
