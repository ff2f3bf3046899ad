use thiserror::Error;
use tracing::info;

use crate::bag::{Bag, COINS_ITEM};

pub const SELL_VISIBLE_ROWS: usize = 4;
pub const SELL_PRICE_PER_LEVEL: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogEntry {
    pub name: &'static str,
    pub price: u32,
    pub sprite: &'static str,
}

pub const CATALOG: [CatalogEntry; 4] = [
    CatalogEntry {
        name: "Heal Potion",
        price: 5,
        sprite: "ui/heal_potion",
    },
    CatalogEntry {
        name: "Strength Potion",
        price: 10,
        sprite: "ui/strength_potion",
    },
    CatalogEntry {
        name: "Defense Potion",
        price: 15,
        sprite: "ui/defense_potion",
    },
    CatalogEntry {
        name: "Pokeball",
        price: 10,
        sprite: "ui/ball",
    },
];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShopError {
    #[error("Not enough coins! ({have}/{price})")]
    InsufficientCoins { have: u32, price: u32 },
    #[error("That monster is no longer in your bag")]
    NoSuchMonster,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SellOffer {
    pub monster_index: usize,
    pub name: String,
    pub level: u32,
    pub price: u32,
}

pub fn sell_price(level: u32) -> u32 {
    level.saturating_mul(SELL_PRICE_PER_LEVEL)
}

pub fn sell_offers(bag: &Bag) -> Vec<SellOffer> {
    bag.monsters
        .iter()
        .enumerate()
        .map(|(monster_index, monster)| SellOffer {
            monster_index,
            name: monster.name.clone(),
            level: monster.level,
            price: sell_price(monster.level),
        })
        .collect()
}

/// Buys one unit. Fails without touching the bag when coins run short.
pub fn buy(bag: &mut Bag, entry: &CatalogEntry) -> Result<u32, ShopError> {
    let have = bag.coins();
    if have < entry.price || !bag.take_item(COINS_ITEM, entry.price) {
        return Err(ShopError::InsufficientCoins {
            have,
            price: entry.price,
        });
    }
    bag.add_item(entry.name, 1, entry.sprite);
    info!(item = entry.name, price = entry.price, coins_left = bag.coins(), "shop_bought");
    Ok(bag.coins())
}

/// Sells the monster at `monster_index` for `level * 20` coins.
pub fn sell(bag: &mut Bag, monster_index: usize) -> Result<u32, ShopError> {
    let monster = bag
        .remove_monster(monster_index)
        .ok_or(ShopError::NoSuchMonster)?;
    let price = sell_price(monster.level);
    bag.add_item(COINS_ITEM, price, "ui/coin");
    info!(monster = %monster.name, price, coins = bag.coins(), "shop_sold");
    Ok(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monster::MonsterRecord;

    fn bag_with_coins(coins: u32, levels: &[u32]) -> Bag {
        let mut bag = Bag::default();
        bag.add_item(COINS_ITEM, coins, "ui/coin");
        for (index, level) in levels.iter().enumerate() {
            bag.monsters.push(
                MonsterRecord {
                    level: Some(*level),
                    ..MonsterRecord::named(format!("Mon{index}"))
                }
                .normalize(1),
            );
        }
        bag
    }

    #[test]
    fn buying_spends_coins_and_stacks_items() {
        let mut bag = bag_with_coins(20, &[]);
        assert_eq!(buy(&mut bag, &CATALOG[0]), Ok(15));
        assert_eq!(buy(&mut bag, &CATALOG[0]), Ok(10));
        assert_eq!(bag.item_count("Heal Potion"), 2);
        assert_eq!(bag.items.len(), 2);
    }

    #[test]
    fn buying_without_enough_coins_changes_nothing() {
        let mut bag = bag_with_coins(12, &[]);
        let before = bag.clone();
        assert_eq!(
            buy(&mut bag, &CATALOG[2]),
            Err(ShopError::InsufficientCoins { have: 12, price: 15 })
        );
        assert_eq!(bag, before);
    }

    #[test]
    fn selling_pays_level_times_twenty() {
        let mut bag = bag_with_coins(0, &[3, 7]);
        assert_eq!(sell(&mut bag, 1), Ok(140));
        assert_eq!(bag.coins(), 140);
        assert_eq!(bag.monsters.len(), 1);
        assert_eq!(sell(&mut bag, 5), Err(ShopError::NoSuchMonster));
    }

    #[test]
    fn sell_offers_follow_bag_order() {
        let bag = bag_with_coins(0, &[2, 4]);
        let offers = sell_offers(&bag);
        assert_eq!(offers[0].price, 40);
        assert_eq!(offers[1].monster_index, 1);
    }
}
