//! Elemental units and their combat AI.
//!
//! A unit has no explicit state machine. Its behavior follows from whether
//! it holds a target and how far away that target is, which
//! [`Unit::state`] exposes as a [`UnitState`].
//!
//! Each tick [`Unit::think`]:
//!
//! 1. counts down the search timer; on expiry looks for the nearest hostile
//!    unit in a box around itself, falling back to the nearest hostile city
//!    center, and re-arms the timer with seeded jitter;
//! 2. steers toward the target with a corrective force until within range;
//! 3. counts down the shot timer and, when the target is within range,
//!    returns a [`FireOrder`] for the world to turn into a bullet.

use serde::{Deserialize, Serialize};

use crate::clock::TickContext;
use crate::combat::{Damageable, StatusEffects, StatusPayload};
use crate::data::{CombatRules, GameRules};
use crate::element::ElementType;
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::physics::Body;
use crate::player::PlayerId;
use crate::rng::SimRng;
use crate::spatial::SpatialQuery;
use crate::storage::entity_id;

entity_id!(
    /// Unit handle.
    UnitId
);

/// Unit discriminant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UnitKind {
    /// Fire elemental.
    FireElemental,
    /// Water elemental.
    WaterElemental,
    /// Grass elemental.
    GrassElemental,
}

impl UnitKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 3] = [Self::FireElemental, Self::WaterElemental, Self::GrassElemental];

    /// Catalog index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// The elemental of an element.
    #[must_use]
    pub const fn for_element(element: ElementType) -> Self {
        match element {
            ElementType::Fire => Self::FireElemental,
            ElementType::Water => Self::WaterElemental,
            ElementType::Grass => Self::GrassElemental,
        }
    }
}

/// Derived behavior state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnitState {
    /// No target.
    Idle,
    /// Moving toward a target out of range.
    Seeking,
    /// Target within range.
    Engaging,
}

/// Request to spawn a bullet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FireOrder {
    /// Spawn point, one body radius out from the shooter.
    pub origin: Vec2Fixed,
    /// Unit direction of travel.
    pub direction: Vec2Fixed,
}

/// What a unit can see while thinking.
pub struct Surroundings<'a, Q: SpatialQuery> {
    /// Unit positions.
    pub spatial: &'a Q,
    /// `(owner, position)` of every city center.
    pub cities: &'a [(PlayerId, Vec2Fixed)],
    /// Half-width of the search box in world units.
    pub search_reach: Fixed,
    /// Ruleset.
    pub rules: &'a CombatRules,
}

/// A combat unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Handle.
    pub id: UnitId,
    /// Discriminant.
    pub kind: UnitKind,
    /// Owning player.
    pub player: PlayerId,
    /// Elemental affinity.
    pub element: ElementType,
    /// Hit points.
    pub hp: i32,
    /// Maximum hit points.
    pub hp_max: i32,
    /// Physical body.
    pub body: Body,
    /// Top speed in world units per second.
    #[serde(with = "fixed_serde")]
    pub max_speed: Fixed,
    /// Position of the current target.
    pub target: Option<Vec2Fixed>,
    /// Ticks until the next target search.
    pub find_timer: u32,
    /// Ticks until the next shot is allowed.
    pub shoot_timer: u32,
    /// Firing distance.
    #[serde(with = "fixed_serde")]
    pub attack_range: Fixed,
    /// Ticks between shots.
    pub attack_interval: u32,
    /// Base bullet damage.
    pub damage: i32,
    /// Status slots.
    pub status: StatusEffects,
    /// Awaiting removal.
    pub dead: bool,
}

impl Unit {
    /// A fresh unit from the catalog.
    ///
    /// Timers start expired, so it searches on its first tick.
    #[must_use]
    pub fn new(id: UnitId, kind: UnitKind, player: PlayerId, position: Vec2Fixed, rules: &GameRules) -> Self {
        let info = rules.unit(kind);
        Self {
            id,
            kind,
            player,
            element: info.element,
            hp: info.hp_max,
            hp_max: info.hp_max,
            body: Body::new(
                position,
                Fixed::from_num(info.mass),
                Fixed::from_num(info.radius),
            ),
            max_speed: Fixed::from_num(info.max_speed),
            target: None,
            find_timer: 0,
            shoot_timer: 0,
            attack_range: Fixed::from_num(info.attack_range),
            attack_interval: info.attack_interval_ticks,
            damage: info.damage,
            status: StatusEffects::new(&rules.combat),
            dead: false,
        }
    }

    /// Current position.
    #[must_use]
    pub const fn position(&self) -> Vec2Fixed {
        self.body.position
    }

    /// Behavior state derived from the target.
    #[must_use]
    pub fn state(&self) -> UnitState {
        match self.target {
            None => UnitState::Idle,
            Some(target) if self.position().distance(target) > self.attack_range => {
                UnitState::Seeking
            }
            Some(_) => UnitState::Engaging,
        }
    }

    /// Run one tick of AI. Returns a shot to fire, if any.
    pub fn think<Q: SpatialQuery>(
        &mut self,
        around: &Surroundings<'_, Q>,
        rng: &mut SimRng,
    ) -> Option<FireOrder> {
        self.find_timer = self.find_timer.saturating_sub(1);
        if self.find_timer == 0 {
            self.target = self.find_target(around);
            let jitter = rng.next_range(
                around.rules.retarget_min_ticks as i32,
                around.rules.retarget_max_ticks as i32,
            );
            self.find_timer = jitter.max(1) as u32;
        }

        let position = self.position();
        // Range to the target picked this tick, not the previous one.
        let distance = self.target.map(|target| position.distance(target));

        let mut desired = Vec2Fixed::ZERO;
        if let (Some(target), Some(distance)) = (self.target, distance) {
            if distance > self.attack_range {
                desired = (target - position).normalize().scale(self.max_speed);
            }
        }
        self.body
            .apply_force((desired - self.body.velocity).scale(self.body.mass));

        self.shoot_timer = self.shoot_timer.saturating_sub(1);
        if self.shoot_timer > 0 {
            return None;
        }
        let (Some(target), Some(distance)) = (self.target, distance) else {
            return None;
        };
        if distance > self.attack_range + Fixed::from_num(around.rules.range_slack) {
            return None;
        }

        self.shoot_timer = self.attack_interval;
        let direction = (target - position).normalize();
        Some(FireOrder {
            origin: position + direction.scale(self.body.radius),
            direction,
        })
    }

    fn find_target<Q: SpatialQuery>(&self, around: &Surroundings<'_, Q>) -> Option<Vec2Fixed> {
        let position = self.position();
        let reach = Vec2Fixed::new(around.search_reach, around.search_reach);

        let units = around
            .spatial
            .query_box(position - reach, position + reach)
            .into_iter()
            .filter(|e| e.player != self.player && e.id != self.id)
            .map(|e| e.position);
        if let Some(nearest) = nearest(position, units) {
            return Some(nearest);
        }

        let cities = around
            .cities
            .iter()
            .filter(|(player, _)| *player != self.player)
            .map(|(_, position)| *position);
        nearest(position, cities)
    }

    /// Count down statuses and apply their damage. Returns `true` if it died.
    pub fn tick_status(&mut self, ctx: &TickContext, rules: &CombatRules) -> bool {
        if self.dead {
            return false;
        }
        let damage = self.status.tick(ctx, rules, self.element);
        damage > 0 && self.apply_damage(damage)
    }
}

fn nearest(from: Vec2Fixed, candidates: impl Iterator<Item = Vec2Fixed>) -> Option<Vec2Fixed> {
    let mut best: Option<(Fixed, Vec2Fixed)> = None;
    for candidate in candidates {
        let distance = from.distance_squared(candidate);
        if best.map_or(true, |(d, _)| distance < d) {
            best = Some((distance, candidate));
        }
    }
    best.map(|(_, position)| position)
}

impl Damageable for Unit {
    fn owner(&self) -> PlayerId {
        self.player
    }

    fn defender_element(&self) -> ElementType {
        self.element
    }

    fn is_dead(&self) -> bool {
        self.dead
    }

    fn apply_damage(&mut self, amount: i32) -> bool {
        if self.dead {
            return false;
        }
        self.hp -= amount;
        if self.hp <= 0 {
            self.dead = true;
            return true;
        }
        false
    }

    fn apply_status(&mut self, payload: StatusPayload, rules: &CombatRules) -> bool {
        self.status.apply(payload, rules)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::StatusKind;
    use crate::data::TempoRules;
    use crate::spatial::{SpatialEntry, SpatialHash};

    fn unit(id: u32, player: u32, x: i32, y: i32, rules: &GameRules) -> Unit {
        Unit::new(
            UnitId(id),
            UnitKind::FireElemental,
            PlayerId(player),
            Vec2Fixed::from_int(x, y),
            rules,
        )
    }

    fn grid(units: &[&Unit]) -> SpatialHash {
        SpatialHash::from_entries(
            Fixed::from_num(64),
            units.iter().map(|u| SpatialEntry {
                id: u.id,
                player: u.player,
                position: u.position(),
            }),
        )
    }

    #[test]
    fn test_targets_nearest_hostile_unit() {
        let rules = GameRules::default();
        let mut me = unit(1, 1, 0, 0, &rules);
        let friend = unit(2, 1, 5, 0, &rules);
        let near = unit(3, 2, 30, 0, &rules);
        let far = unit(4, 2, 50, 0, &rules);
        let spatial = grid(&[&me, &friend, &near, &far]);
        let cities = [(PlayerId(2), Vec2Fixed::from_int(10, 0))];
        let around = Surroundings {
            spatial: &spatial,
            cities: &cities,
            search_reach: Fixed::from_num(64),
            rules: &rules.combat,
        };

        let mut rng = SimRng::new(1);
        let shot = me.think(&around, &mut rng);
        assert_eq!(me.target, Some(Vec2Fixed::from_int(30, 0)));
        assert_eq!(me.state(), UnitState::Engaging);
        assert!(me.find_timer >= 30 && me.find_timer <= 60);

        let shot = shot.unwrap();
        assert_eq!(shot.direction, Vec2Fixed::from_int(1, 0));
        assert_eq!(shot.origin, Vec2Fixed::from_int(5, 0));
        assert_eq!(me.shoot_timer, 60);
    }

    #[test]
    fn test_fires_at_new_target_on_retarget_tick() {
        let rules = GameRules::default();
        let mut me = unit(1, 1, 0, 0, &rules);
        me.target = Some(Vec2Fixed::from_int(1000, 0));
        me.find_timer = 1;
        let enemy = unit(2, 2, 0, 30, &rules);
        let spatial = grid(&[&me, &enemy]);
        let around = Surroundings {
            spatial: &spatial,
            cities: &[],
            search_reach: Fixed::from_num(64),
            rules: &rules.combat,
        };

        let shot = me.think(&around, &mut SimRng::new(3)).unwrap();
        assert_eq!(me.target, Some(Vec2Fixed::from_int(0, 30)));
        assert_eq!(shot.direction, Vec2Fixed::from_int(0, 1));
        assert_eq!(me.body.force, Vec2Fixed::ZERO, "in range, so no steering");
    }

    #[test]
    fn test_falls_back_to_city_and_seeks() {
        let rules = GameRules::default();
        let mut me = unit(1, 1, 0, 0, &rules);
        let spatial = grid(&[&me]);
        let cities = [
            (PlayerId(1), Vec2Fixed::from_int(10, 0)),
            (PlayerId(2), Vec2Fixed::from_int(400, 0)),
            (PlayerId(3), Vec2Fixed::from_int(0, 300)),
        ];
        let around = Surroundings {
            spatial: &spatial,
            cities: &cities,
            search_reach: Fixed::from_num(64),
            rules: &rules.combat,
        };

        let mut rng = SimRng::new(2);
        assert!(me.think(&around, &mut rng).is_none());
        assert_eq!(me.target, Some(Vec2Fixed::from_int(0, 300)));
        assert_eq!(me.state(), UnitState::Seeking);
        assert!(me.body.force.y > Fixed::ZERO);
        assert_eq!(me.body.force.x, Fixed::ZERO);
    }

    #[test]
    fn test_idle_without_enemies() {
        let rules = GameRules::default();
        let mut me = unit(1, 1, 0, 0, &rules);
        let spatial = grid(&[&me]);
        let around = Surroundings {
            spatial: &spatial,
            cities: &[],
            search_reach: Fixed::from_num(64),
            rules: &rules.combat,
        };
        assert!(me.think(&around, &mut SimRng::new(3)).is_none());
        assert_eq!(me.state(), UnitState::Idle);
    }

    #[test]
    fn test_shot_respects_interval() {
        let rules = GameRules::default();
        let mut me = unit(1, 1, 0, 0, &rules);
        let enemy = unit(2, 2, 20, 0, &rules);
        let spatial = grid(&[&me, &enemy]);
        let around = Surroundings {
            spatial: &spatial,
            cities: &[],
            search_reach: Fixed::from_num(64),
            rules: &rules.combat,
        };
        let mut rng = SimRng::new(4);
        let shots = (0..120)
            .filter(|_| me.think(&around, &mut rng).is_some())
            .count();
        assert_eq!(shots, 2);
    }

    #[test]
    fn test_status_damage_can_kill() {
        let rules = GameRules::default();
        let tempo = TempoRules {
            turn_ticks: 1,
            round_ticks: 1800,
        };
        let mut grass = Unit::new(
            UnitId(1),
            UnitKind::GrassElemental,
            PlayerId(1),
            Vec2Fixed::ZERO,
            &rules,
        );
        grass.hp = 50;
        grass.apply_status(StatusPayload::new(StatusKind::Ignited, 100), &rules.combat);

        let died = (1..=40).any(|tick| grass.tick_status(&TickContext::at(tick, &tempo), &rules.combat));
        assert!(died);
        assert!(grass.dead);
    }
}
