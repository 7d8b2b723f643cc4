//! Per-kind catalog entries for buildings, units and technologies.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::combat::{StatusKind, StatusPayload};
use crate::element::ElementType;
use crate::tech::TechEffect;
use crate::units::UnitKind;

/// What a worker building adds to its city's next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkerYield {
    /// Production per turn.
    Production(i32),
    /// Food per turn.
    Food(i32),
}

/// Static properties of a building kind.
///
/// # Example RON
///
/// ```ron
/// (
///     kind: Farm,
///     name: "Farm",
///     description: "Provide food",
///     required_element: Some(Grass),
///     need_production: 3000,
///     hp_max: 3000,
///     worker_yield: Some(Food(6)),
///     produces: None,
///     constructible: true,
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildingInfo {
    /// Kind this entry describes.
    pub kind: BuildingKind,
    /// Display name.
    pub name: String,
    /// Short description.
    #[serde(default)]
    pub description: String,
    /// Tile element the building must stand on.
    #[serde(default)]
    pub required_element: Option<ElementType>,
    /// Production needed to finish a construction site of this kind.
    pub need_production: i32,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Worker output, for buildings that employ a citizen.
    #[serde(default)]
    pub worker_yield: Option<WorkerYield>,
    /// Unit trained here.
    #[serde(default)]
    pub produces: Option<UnitKind>,
    /// Whether players may place construction sites of this kind.
    #[serde(default)]
    pub constructible: bool,
}

/// Static properties of a unit kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitInfo {
    /// Kind this entry describes.
    pub kind: UnitKind,
    /// Display name.
    pub name: String,
    /// Elemental affinity.
    pub element: ElementType,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Production needed to train one.
    pub cost: i32,
    /// Top speed in world units per second.
    pub max_speed: i32,
    /// Body mass.
    pub mass: i32,
    /// Body radius in world units.
    pub radius: i32,
    /// Firing distance in world units.
    pub attack_range: i32,
    /// Ticks between shots.
    pub attack_interval_ticks: u32,
    /// Base bullet damage before effectiveness.
    pub damage: i32,
}

/// One node of the technology tree definition.
///
/// Node 0 is the root; every other node names an earlier node as parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechDef {
    /// Display name.
    pub name: String,
    /// Index of the parent node.
    #[serde(default)]
    pub parent: Option<usize>,
    /// Science needed to complete.
    pub cost: i32,
    /// Effects granted on completion.
    #[serde(default)]
    pub effects: Vec<TechEffect>,
}

fn building(
    kind: BuildingKind,
    name: &str,
    description: &str,
    required_element: Option<ElementType>,
    need_production: i32,
) -> BuildingInfo {
    BuildingInfo {
        kind,
        name: name.to_string(),
        description: description.to_string(),
        required_element,
        need_production,
        hp_max: 3000,
        worker_yield: None,
        produces: None,
        constructible: true,
    }
}

/// Built-in building catalog, one entry per [`BuildingKind::ALL`] slot.
#[must_use]
pub fn default_buildings() -> Vec<BuildingInfo> {
    use ElementType::{Fire, Grass, Water};

    vec![
        BuildingInfo {
            hp_max: 1,
            constructible: false,
            ..building(BuildingKind::Construction, "Construction", "Under construction", None, 0)
        },
        building(BuildingKind::City, "New City", "Found a new city", None, 15000),
        building(
            BuildingKind::ElementCollector,
            "Element Collector",
            "Gather one element of the tile type per second",
            None,
            3000,
        ),
        BuildingInfo {
            produces: Some(UnitKind::FireElemental),
            ..building(BuildingKind::FireBarracks, "Fire Barracks", "Produce Fire Elemental", Some(Fire), 3000)
        },
        BuildingInfo {
            produces: Some(UnitKind::WaterElemental),
            ..building(BuildingKind::WaterBarracks, "Water Barracks", "Produce Water Elemental", Some(Water), 3000)
        },
        BuildingInfo {
            produces: Some(UnitKind::GrassElemental),
            ..building(BuildingKind::GrassBarracks, "Grass Barracks", "Produce Grass Elemental", Some(Grass), 3000)
        },
        BuildingInfo {
            worker_yield: Some(WorkerYield::Production(5)),
            ..building(BuildingKind::SteamMachine, "Steam Machine", "Provide production", Some(Fire), 3000)
        },
        BuildingInfo {
            worker_yield: Some(WorkerYield::Production(5)),
            ..building(BuildingKind::WaterWheel, "Water Wheel", "Provide production", Some(Water), 3000)
        },
        BuildingInfo {
            worker_yield: Some(WorkerYield::Food(6)),
            ..building(BuildingKind::Farm, "Farm", "Provide food", Some(Grass), 3000)
        },
    ]
}

/// Built-in unit catalog, one entry per [`UnitKind::ALL`] slot.
#[must_use]
pub fn default_units() -> Vec<UnitInfo> {
    UnitKind::ALL
        .iter()
        .map(|&kind| {
            let (name, element) = match kind {
                UnitKind::FireElemental => ("Fire Elemental", ElementType::Fire),
                UnitKind::WaterElemental => ("Water Elemental", ElementType::Water),
                UnitKind::GrassElemental => ("Grass Elemental", ElementType::Grass),
            };
            UnitInfo {
                kind,
                name: name.to_string(),
                element,
                hp_max: 3000,
                cost: 1500,
                max_speed: 32,
                mass: 1,
                radius: 5,
                attack_range: 50,
                attack_interval_ticks: 60,
                damage: 100,
            }
        })
        .collect()
}

/// Built-in technology tree.
#[must_use]
pub fn default_techs() -> Vec<TechDef> {
    let node = |name: &str, parent: Option<usize>, cost: i32, effects: Vec<TechEffect>| TechDef {
        name: name.to_string(),
        parent,
        cost,
        effects,
    };

    vec![
        node("Civilization", None, 0, Vec::new()),
        node("Combustion", Some(0), 2000, Vec::new()),
        node(
            "Wildfire",
            Some(1),
            4000,
            vec![TechEffect::BulletStatus {
                element: ElementType::Fire,
                payload: StatusPayload::new(StatusKind::Ignited, 40),
            }],
        ),
        node("Herbalism", Some(0), 2000, Vec::new()),
        node(
            "Venom",
            Some(3),
            4000,
            vec![TechEffect::BulletStatus {
                element: ElementType::Grass,
                payload: StatusPayload::new(StatusKind::Poisoned, 50),
            }],
        ),
        node(
            "Urban Planning",
            Some(0),
            3000,
            vec![TechEffect::UnlockBuilding(BuildingKind::City)],
        ),
    ]
}
