//! Players, their science pool and element stockpile.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::city::CityId;
use crate::combat::StatusPayload;
use crate::data::{EconomyRules, GameRules};
use crate::element::ElementType;
use crate::error::Result;
use crate::production::ResourceSource;
use crate::storage::entity_id;
use crate::tech::{TechEffect, TechTree};

entity_id!(
    /// Player handle.
    PlayerId
);

/// Who issues a player's commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Controller {
    /// A person at the host UI.
    Human,
    /// The built-in AI.
    Ai,
}

/// RGBA identity color.
pub type Color = [u8; 4];

/// Identity colors handed out in join order.
pub const PLAYER_COLORS: [Color; 6] = [
    [64, 128, 255, 255],
    [255, 64, 64, 255],
    [64, 200, 64, 255],
    [255, 200, 64, 255],
    [200, 64, 255, 255],
    [64, 220, 220, 255],
];

/// Collected element counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementStock {
    counts: [u32; 3],
}

impl ElementStock {
    /// Add to one element.
    pub fn add(&mut self, element: ElementType, amount: u32) {
        self.counts[element.index()] += amount;
    }

    /// Count of one element.
    #[must_use]
    pub const fn get(&self, element: ElementType) -> u32 {
        self.counts[element.index()]
    }
}

/// A player's science budget, fed by their cities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SciencePool {
    /// Science of the current turn.
    pub science: i32,
    /// Science earned for the next turn.
    pub next_turn: i32,
    /// Science not yet drawn this turn.
    pub free: i32,
}

impl SciencePool {
    /// Roll the next-turn accumulator into the current turn.
    pub fn turn_over(&mut self) {
        self.science = self.next_turn;
        self.free = self.science.max(0);
        self.next_turn = 0;
    }

    /// Science a city of `population` contributes per turn.
    #[must_use]
    pub fn city_yield(population: u32, rules: &EconomyRules) -> i32 {
        rules.base_science + rules.science_per_population * population as i32
    }
}

impl ResourceSource for SciencePool {
    fn draw(&mut self, requested: i32) -> i32 {
        let granted = requested.clamp(0, self.free);
        self.free -= granted;
        granted
    }

    fn take_worker(&mut self) -> bool {
        true
    }

    fn refund_worker(&mut self) {}
}

/// A participant in the match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Handle.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Identity color.
    pub color: Color,
    /// Command source.
    pub controller: Controller,
    /// Research state.
    pub tech: TechTree,
    /// Science budget.
    pub science: SciencePool,
    /// Collected elements.
    pub elements: ElementStock,
    /// Cities in founding order.
    pub cities: Vec<CityId>,
}

impl Player {
    /// A new player with a fresh technology tree.
    pub fn new(
        id: PlayerId,
        name: impl Into<String>,
        controller: Controller,
        rules: &GameRules,
    ) -> Result<Self> {
        let color = PLAYER_COLORS[(id.0 as usize).saturating_sub(1) % PLAYER_COLORS.len()];
        Ok(Self {
            id,
            name: name.into(),
            color,
            controller,
            tech: TechTree::from_defs(&rules.techs)?,
            science: SciencePool::default(),
            elements: ElementStock::default(),
            cities: Vec::new(),
        })
    }

    /// Status payloads this player's bullets of `element` carry.
    #[must_use]
    pub fn status_payloads(&self, element: ElementType) -> Vec<StatusPayload> {
        self.tech
            .completed_effects()
            .filter_map(|effect| match effect {
                TechEffect::BulletStatus {
                    element: e,
                    payload,
                } if *e == element => Some(*payload),
                _ => None,
            })
            .collect()
    }

    /// Whether this player may place `kind`.
    ///
    /// Kinds named by an unlock effect stay locked until that node completes.
    #[must_use]
    pub fn can_build(&self, kind: BuildingKind) -> bool {
        self.tech.is_unlocked(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::StatusKind;

    #[test]
    fn test_element_stock() {
        let mut stock = ElementStock::default();
        stock.add(ElementType::Grass, 3);
        assert_eq!(stock.get(ElementType::Grass), 3);
        assert_eq!(stock.get(ElementType::Fire), 0);
    }

    #[test]
    fn test_science_pool_turn() {
        let mut pool = SciencePool::default();
        pool.next_turn = 7;
        pool.turn_over();
        assert_eq!(pool.free, 7);
        assert_eq!(pool.draw(5), 5);
        assert_eq!(pool.draw(5), 2);
        assert_eq!(pool.next_turn, 0);
    }

    #[test]
    fn test_payloads_follow_research() {
        let rules = GameRules::default();
        let mut player = Player::new(PlayerId(1), "p1", Controller::Ai, &rules).unwrap();
        assert!(player.status_payloads(ElementType::Fire).is_empty());

        let wildfire = player.tech.find("Wildfire").unwrap();
        player.tech.complete(wildfire);
        let payloads = player.status_payloads(ElementType::Fire);
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0].kind, StatusKind::Ignited);
        assert!(player.status_payloads(ElementType::Water).is_empty());
    }

    #[test]
    fn test_new_city_locked_until_researched() {
        let rules = GameRules::default();
        let mut player = Player::new(PlayerId(2), "p2", Controller::Human, &rules).unwrap();
        assert!(!player.can_build(BuildingKind::City));
        assert!(player.can_build(BuildingKind::Farm));

        let planning = player.tech.find("Urban Planning").unwrap();
        player.tech.complete(planning);
        assert!(player.can_build(BuildingKind::City));
    }

    #[test]
    fn test_colors_cycle() {
        let rules = GameRules::default();
        let a = Player::new(PlayerId(1), "a", Controller::Ai, &rules).unwrap();
        let g = Player::new(PlayerId(7), "g", Controller::Ai, &rules).unwrap();
        assert_eq!(a.color, g.color);
    }
}
