//! Game rules: the data-driven configuration of a match.
//!
//! [`GameRules::default`] is the built-in ruleset. Hosts may load an
//! override from RON text with [`GameRules::from_ron_str`]; parsed rules
//! are validated before use so the simulation can index catalogs by kind.
//!
//! This module contains no IO. Reading files is left to the host.

mod catalog;

use serde::{Deserialize, Serialize};

pub use catalog::{
    default_buildings, default_techs, default_units, BuildingInfo, TechDef, UnitInfo, WorkerYield,
};

use crate::buildings::BuildingKind;
use crate::clock::TICK_RATE;
use crate::combat::StatusKind;
use crate::error::{GameError, Result};
use crate::units::UnitKind;

/// Turn and round cadence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TempoRules {
    /// Ticks between pool turn-overs.
    pub turn_ticks: u32,
    /// Ticks between unit spawn rounds.
    pub round_ticks: u32,
}

/// Map dimensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapRules {
    /// Columns.
    pub width: u32,
    /// Rows.
    pub height: u32,
    /// Tile edge size in world units.
    pub tile_size: i32,
}

/// City income and growth.
///
/// Amounts are in hundredths: 100 means one whole unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomyRules {
    /// Production every city makes each turn without buildings.
    pub base_production: i32,
    /// Food every city makes each turn without buildings.
    pub base_food: i32,
    /// Food eaten per citizen each turn.
    pub food_upkeep: i32,
    /// Science every city makes each turn.
    pub base_science: i32,
    /// Extra science per citizen each turn.
    pub science_per_population: i32,
    /// Claim an adjacent tile whenever a city grows.
    pub annex_on_growth: bool,
    /// Neighbour steps from a city within which a new city may be founded.
    pub new_city_radius: u32,
}

/// Parameters of one status effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRules {
    /// Accumulated exposure needed to proc.
    pub resistance: i32,
    /// Ticks the status lasts once procced.
    pub duration_ticks: u32,
    /// Base damage per one-third-second while active.
    pub tick_damage: i32,
}

/// Combat, targeting and projectile constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombatRules {
    /// Bullet speed in world units per second.
    pub bullet_speed: i32,
    /// Bullet lifetime.
    pub bullet_ttl_ticks: u32,
    /// Bullet collision radius.
    pub bullet_radius: i32,
    /// Building collision radius.
    pub building_radius: i32,
    /// Half-width of the hostile search box, in tiles.
    pub search_tiles: i32,
    /// Shortest delay between target searches.
    pub retarget_min_ticks: u32,
    /// Longest delay between target searches.
    pub retarget_max_ticks: u32,
    /// Extra distance allowed when deciding to fire.
    pub range_slack: i32,
    /// Spawn offset from the producing building, per axis.
    pub spawn_jitter: i32,
    /// Ignited parameters.
    pub ignited: StatusRules,
    /// Poisoned parameters.
    pub poisoned: StatusRules,
}

impl CombatRules {
    /// Parameters for a status kind.
    #[must_use]
    pub const fn status(&self, kind: StatusKind) -> &StatusRules {
        match kind {
            StatusKind::Ignited => &self.ignited,
            StatusKind::Poisoned => &self.poisoned,
        }
    }
}

/// Complete ruleset for a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRules {
    /// Cadence.
    pub tempo: TempoRules,
    /// Map size.
    pub map: MapRules,
    /// Economy.
    pub economy: EconomyRules,
    /// Combat.
    pub combat: CombatRules,
    /// Building catalog in [`BuildingKind::ALL`] order.
    pub buildings: Vec<BuildingInfo>,
    /// Unit catalog in [`UnitKind::ALL`] order.
    pub units: Vec<UnitInfo>,
    /// Technology tree, root first.
    pub techs: Vec<TechDef>,
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            tempo: TempoRules {
                turn_ticks: 1,
                round_ticks: 30 * TICK_RATE,
            },
            map: MapRules {
                width: 60,
                height: 30,
                tile_size: 32,
            },
            economy: EconomyRules {
                base_production: 10,
                base_food: 12,
                food_upkeep: 2,
                base_science: 3,
                science_per_population: 1,
                annex_on_growth: true,
                new_city_radius: 3,
            },
            combat: CombatRules {
                bullet_speed: 100,
                bullet_ttl_ticks: 2 * TICK_RATE,
                bullet_radius: 1,
                building_radius: 10,
                search_tiles: 2,
                retarget_min_ticks: TICK_RATE / 2,
                retarget_max_ticks: TICK_RATE,
                range_slack: 1,
                spawn_jitter: 5,
                ignited: StatusRules {
                    resistance: 100,
                    duration_ticks: 3 * TICK_RATE,
                    tick_damage: 20,
                },
                poisoned: StatusRules {
                    resistance: 150,
                    duration_ticks: 5 * TICK_RATE,
                    tick_damage: 10,
                },
            },
            buildings: default_buildings(),
            units: default_units(),
            techs: default_techs(),
        }
    }
}

impl GameRules {
    /// Parse and validate rules from RON text.
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let rules: Self = ron::from_str(text)?;
        rules.validate()?;
        Ok(rules)
    }

    /// Render the rules as pretty RON.
    pub fn to_ron_string(&self) -> Result<String> {
        Ok(ron::ser::to_string_pretty(
            self,
            ron::ser::PrettyConfig::default(),
        )?)
    }

    /// Catalog entry for a building kind.
    ///
    /// Rules are validated on load, so every kind has an entry.
    #[must_use]
    pub fn building(&self, kind: BuildingKind) -> &BuildingInfo {
        &self.buildings[kind.index()]
    }

    /// Catalog entry for a unit kind.
    #[must_use]
    pub fn unit(&self, kind: UnitKind) -> &UnitInfo {
        &self.units[kind.index()]
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if self.tempo.turn_ticks == 0 || self.tempo.round_ticks == 0 {
            errors.push("tempo intervals must be positive".to_string());
        }
        if self.map.width == 0 || self.map.height == 0 || self.map.tile_size <= 0 {
            errors.push("map dimensions must be positive".to_string());
        }
        if self.combat.retarget_min_ticks > self.combat.retarget_max_ticks {
            errors.push("retarget_min_ticks exceeds retarget_max_ticks".to_string());
        }
        for status in [&self.combat.ignited, &self.combat.poisoned] {
            if status.resistance <= 0 {
                errors.push("status resistance must be positive".to_string());
            }
        }

        if self.buildings.len() != BuildingKind::ALL.len() {
            errors.push(format!(
                "expected {} building entries, found {}",
                BuildingKind::ALL.len(),
                self.buildings.len()
            ));
        }
        for (info, kind) in self.buildings.iter().zip(BuildingKind::ALL) {
            if info.kind != kind {
                errors.push(format!("building entry {:?} out of order, expected {kind:?}", info.kind));
            }
            if info.hp_max <= 0 {
                errors.push(format!("{kind:?} hp_max must be positive"));
            }
            if info.constructible && info.need_production <= 0 {
                errors.push(format!("{kind:?} need_production must be positive"));
            }
        }

        if self.units.len() != UnitKind::ALL.len() {
            errors.push(format!(
                "expected {} unit entries, found {}",
                UnitKind::ALL.len(),
                self.units.len()
            ));
        }
        for (info, kind) in self.units.iter().zip(UnitKind::ALL) {
            if info.kind != kind {
                errors.push(format!("unit entry {:?} out of order, expected {kind:?}", info.kind));
            }
            if info.cost <= 0 || info.hp_max <= 0 || info.mass <= 0 || info.radius <= 0 {
                errors.push(format!("{kind:?} cost, hp_max, mass and radius must be positive"));
            }
            if info.attack_interval_ticks == 0 {
                errors.push(format!("{kind:?} attack interval must be positive"));
            }
        }

        match self.techs.first() {
            None => errors.push("technology tree needs a root".to_string()),
            Some(root) if root.parent.is_some() => {
                errors.push("technology root must not have a parent".to_string());
            }
            Some(_) => {}
        }
        for (index, tech) in self.techs.iter().enumerate().skip(1) {
            match tech.parent {
                Some(parent) if parent < index => {}
                _ => errors.push(format!(
                    "technology '{}' must name an earlier node as parent",
                    tech.name
                )),
            }
            if tech.cost <= 0 {
                errors.push(format!("technology '{}' cost must be positive", tech.name));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(GameError::InvalidRules(errors.join("; ")))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_validate() {
        GameRules::default().validate().unwrap();
    }

    #[test]
    fn test_ron_round_trip() {
        let rules = GameRules::default();
        let text = rules.to_ron_string().unwrap();
        let parsed = GameRules::from_ron_str(&text).unwrap();
        assert_eq!(parsed, rules);
    }

    #[test]
    fn test_catalog_lookup() {
        let rules = GameRules::default();
        assert_eq!(rules.building(BuildingKind::City).need_production, 15000);
        assert_eq!(
            rules.building(BuildingKind::Farm).worker_yield,
            Some(WorkerYield::Food(6))
        );
        assert_eq!(rules.unit(UnitKind::WaterElemental).element, crate::element::ElementType::Water);
    }

    #[test]
    fn test_rejects_misordered_catalog() {
        let mut rules = GameRules::default();
        rules.buildings.swap(1, 2);
        let err = rules.validate().unwrap_err();
        assert!(matches!(err, GameError::InvalidRules(_)));
    }

    #[test]
    fn test_rejects_forward_tech_parent() {
        let mut rules = GameRules::default();
        rules.techs[1].parent = Some(4);
        assert!(rules.validate().is_err());
    }

    #[test]
    fn test_parse_error_is_reported() {
        let err = GameRules::from_ron_str("(tempo: oops)").unwrap_err();
        assert!(matches!(err, GameError::RulesParse(_)));
    }
}
