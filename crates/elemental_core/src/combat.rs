//! Projectiles, status effects and hit resolution.
//!
//! Units fire [`Bullet`]s. When the physics pass reports a bullet touching
//! a hostile unit or building, [`resolve_hit`] applies elemental damage
//! and, for units, any status payloads the bullet carries.
//!
//! # Status effects
//!
//! Each payload adds exposure to the target's matching [`StatusState`].
//! Once exposure reaches the resistance threshold the status procs: it
//! lasts a fixed number of ticks and deals damage on every one-third-second
//! edge. Exposure is ignored while the status is active.

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingId;
use crate::clock::TickContext;
use crate::data::CombatRules;
use crate::element::{scaled_damage, ElementType};
use crate::math::{fixed_serde, Fixed, Vec2Fixed};
use crate::player::PlayerId;
use crate::storage::entity_id;
use crate::units::UnitId;

entity_id!(
    /// Bullet handle.
    BulletId
);

/// Damage-over-time conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum StatusKind {
    /// Burning.
    Ignited,
    /// Poisoned.
    Poisoned,
}

impl StatusKind {
    /// All kinds.
    pub const ALL: [Self; 2] = [Self::Ignited, Self::Poisoned];

    /// Element used for the effectiveness of status damage.
    #[must_use]
    pub const fn element(self) -> ElementType {
        match self {
            Self::Ignited => ElementType::Fire,
            Self::Poisoned => ElementType::Grass,
        }
    }
}

/// Exposure a bullet adds to one status on hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusPayload {
    /// Status affected.
    pub kind: StatusKind,
    /// Exposure added.
    pub amount: i32,
}

impl StatusPayload {
    /// Create a payload.
    #[must_use]
    pub const fn new(kind: StatusKind, amount: i32) -> Self {
        Self { kind, amount }
    }
}

/// Exposure and duration of one status on one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusState {
    /// Exposure collected toward the threshold.
    pub accumulated: i32,
    /// Threshold at which the status procs.
    pub resistance: i32,
    /// Ticks left while active.
    pub remaining_ticks: u32,
}

impl StatusState {
    /// Inactive state with the given threshold.
    #[must_use]
    pub const fn new(resistance: i32) -> Self {
        Self {
            accumulated: 0,
            resistance,
            remaining_ticks: 0,
        }
    }

    /// Whether the status is running.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.remaining_ticks > 0
    }

    /// Add exposure. Returns `true` if this procs the status.
    pub fn expose(&mut self, amount: i32, duration_ticks: u32) -> bool {
        if self.is_active() {
            return false;
        }
        self.accumulated += amount.max(0);
        if self.accumulated < self.resistance {
            return false;
        }
        self.accumulated = 0;
        self.remaining_ticks = duration_ticks;
        true
    }
}

/// Both status slots of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusEffects {
    /// Burning.
    pub ignited: StatusState,
    /// Poisoned.
    pub poisoned: StatusState,
}

impl StatusEffects {
    /// Fresh slots using the configured thresholds.
    #[must_use]
    pub const fn new(rules: &CombatRules) -> Self {
        Self {
            ignited: StatusState::new(rules.ignited.resistance),
            poisoned: StatusState::new(rules.poisoned.resistance),
        }
    }

    /// Slot for a kind.
    #[must_use]
    pub const fn get(&self, kind: StatusKind) -> &StatusState {
        match kind {
            StatusKind::Ignited => &self.ignited,
            StatusKind::Poisoned => &self.poisoned,
        }
    }

    fn get_mut(&mut self, kind: StatusKind) -> &mut StatusState {
        match kind {
            StatusKind::Ignited => &mut self.ignited,
            StatusKind::Poisoned => &mut self.poisoned,
        }
    }

    /// Apply a payload. Returns `true` if it procced.
    pub fn apply(&mut self, payload: StatusPayload, rules: &CombatRules) -> bool {
        let duration = rules.status(payload.kind).duration_ticks;
        self.get_mut(payload.kind).expose(payload.amount, duration)
    }

    /// Count down active statuses and return the damage dealt this tick.
    pub fn tick(&mut self, ctx: &TickContext, rules: &CombatRules, defender: ElementType) -> i32 {
        let mut damage = 0;
        for kind in StatusKind::ALL {
            let state = self.get_mut(kind);
            if !state.is_active() {
                continue;
            }
            if ctx.one_third_second {
                damage += scaled_damage(rules.status(kind).tick_damage, kind.element(), defender);
            }
            state.remaining_ticks -= 1;
        }
        damage
    }
}

/// A projectile in flight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bullet {
    /// Handle.
    pub id: BulletId,
    /// Firing player.
    pub player: PlayerId,
    /// Element of the firing unit.
    pub element: ElementType,
    /// World position.
    pub position: Vec2Fixed,
    /// World units per second.
    pub velocity: Vec2Fixed,
    /// Collision radius.
    #[serde(with = "fixed_serde")]
    pub radius: Fixed,
    /// Ticks until expiry.
    pub ttl: u32,
    /// Base damage before effectiveness.
    pub damage: i32,
    /// Status exposure applied to units on hit.
    pub payloads: Vec<StatusPayload>,
    /// Spent or expired.
    pub dead: bool,
}

impl Bullet {
    /// Count down the lifetime. Returns `true` when the bullet expires.
    pub fn age(&mut self) -> bool {
        self.ttl = self.ttl.saturating_sub(1);
        if self.ttl == 0 {
            self.dead = true;
        }
        self.dead
    }
}

/// Handle to anything that takes part in a contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityRef {
    /// A unit.
    Unit(UnitId),
    /// A building.
    Building(BuildingId),
    /// A bullet.
    Bullet(BulletId),
}

/// Something bullets can hit.
pub trait Damageable {
    /// Owning player.
    fn owner(&self) -> PlayerId;

    /// Element used as the defender in the effectiveness table.
    fn defender_element(&self) -> ElementType;

    /// Already dead and awaiting removal.
    fn is_dead(&self) -> bool;

    /// Subtract hit points. Returns `true` if this killed the target.
    fn apply_damage(&mut self, amount: i32) -> bool;

    /// Apply a status payload. Returns `true` if it procced.
    fn apply_status(&mut self, payload: StatusPayload, rules: &CombatRules) -> bool;
}

/// Result of a bullet striking a target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HitOutcome {
    /// Damage dealt after effectiveness.
    pub damage: i32,
    /// Whether the hit killed the target.
    pub killed: bool,
    /// Statuses that procced.
    pub procs: Vec<StatusKind>,
}

/// Apply a bullet to a target.
///
/// Returns `None` without touching either side for spent bullets, dead
/// targets and friendly contacts.
pub fn resolve_hit(
    bullet: &mut Bullet,
    target: &mut impl Damageable,
    rules: &CombatRules,
) -> Option<HitOutcome> {
    if bullet.dead || target.is_dead() || target.owner() == bullet.player {
        return None;
    }

    bullet.dead = true;
    let damage = scaled_damage(bullet.damage, bullet.element, target.defender_element());
    let killed = target.apply_damage(damage);

    let mut procs = Vec::new();
    if !killed {
        for payload in &bullet.payloads {
            if target.apply_status(*payload, rules) {
                procs.push(payload.kind);
            }
        }
    }

    Some(HitOutcome {
        damage,
        killed,
        procs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{GameRules, TempoRules};

    struct Dummy {
        owner: PlayerId,
        element: ElementType,
        hp: i32,
        status: StatusEffects,
    }

    impl Damageable for Dummy {
        fn owner(&self) -> PlayerId {
            self.owner
        }

        fn defender_element(&self) -> ElementType {
            self.element
        }

        fn is_dead(&self) -> bool {
            self.hp <= 0
        }

        fn apply_damage(&mut self, amount: i32) -> bool {
            self.hp -= amount;
            self.hp <= 0
        }

        fn apply_status(&mut self, payload: StatusPayload, rules: &CombatRules) -> bool {
            self.status.apply(payload, rules)
        }
    }

    fn dummy(element: ElementType, rules: &CombatRules) -> Dummy {
        Dummy {
            owner: PlayerId(2),
            element,
            hp: 3000,
            status: StatusEffects::new(rules),
        }
    }

    fn bullet(element: ElementType, payloads: Vec<StatusPayload>) -> Bullet {
        Bullet {
            id: BulletId(1),
            player: PlayerId(1),
            element,
            position: Vec2Fixed::ZERO,
            velocity: Vec2Fixed::ZERO,
            radius: Fixed::ONE,
            ttl: 10,
            damage: 100,
            payloads,
            dead: false,
        }
    }

    #[test]
    fn test_hit_scales_by_element() {
        let rules = GameRules::default().combat;
        let mut target = dummy(ElementType::Grass, &rules);
        let mut shot = bullet(ElementType::Fire, Vec::new());

        let outcome = resolve_hit(&mut shot, &mut target, &rules).unwrap();
        assert_eq!(outcome.damage, 200);
        assert!(shot.dead);
        assert_eq!(target.hp, 2800);
    }

    #[test]
    fn test_spent_bullet_and_friendly_fire_ignored() {
        let rules = GameRules::default().combat;
        let mut target = dummy(ElementType::Water, &rules);

        let mut spent = bullet(ElementType::Fire, Vec::new());
        spent.dead = true;
        assert!(resolve_hit(&mut spent, &mut target, &rules).is_none());

        let mut friendly = bullet(ElementType::Fire, Vec::new());
        friendly.player = PlayerId(2);
        assert!(resolve_hit(&mut friendly, &mut target, &rules).is_none());
        assert!(!friendly.dead);
        assert_eq!(target.hp, 3000);
    }

    #[test]
    fn test_status_procs_exactly_once() {
        let rules = GameRules::default().combat;
        let mut state = StatusState::new(100);

        assert!(!state.expose(40, 180));
        assert!(!state.expose(40, 180));
        assert!(state.expose(40, 180));
        assert_eq!(state.remaining_ticks, 180);

        // Ignored while active.
        assert!(!state.expose(500, 180));
        assert_eq!(state.accumulated, 0);

        let mut effects = StatusEffects::new(&rules);
        let ignite = StatusPayload::new(StatusKind::Ignited, 100);
        assert!(effects.apply(ignite, &rules));
        assert!(!effects.apply(ignite, &rules));
        assert!(effects.get(StatusKind::Ignited).is_active());
        assert!(!effects.get(StatusKind::Poisoned).is_active());
    }

    #[test]
    fn test_status_damage_over_duration() {
        let rules = GameRules::default().combat;
        let tempo = TempoRules {
            turn_ticks: 1,
            round_ticks: 1800,
        };
        let mut effects = StatusEffects::new(&rules);
        effects.apply(StatusPayload::new(StatusKind::Ignited, 100), &rules);

        let mut total = 0;
        for tick in 1..=400 {
            total += effects.tick(&TickContext::at(tick, &tempo), &rules, ElementType::Grass);
        }
        // 180 ticks hold 9 third-second edges; fire doubles against grass.
        assert_eq!(total, 9 * 40);
        assert!(!effects.get(StatusKind::Ignited).is_active());
    }

    #[test]
    fn test_payloads_apply_on_hit() {
        let rules = GameRules::default().combat;
        let mut target = dummy(ElementType::Water, &rules);
        let mut shot = bullet(
            ElementType::Grass,
            vec![StatusPayload::new(StatusKind::Poisoned, 200)],
        );
        let outcome = resolve_hit(&mut shot, &mut target, &rules).unwrap();
        assert_eq!(outcome.procs, vec![StatusKind::Poisoned]);
        assert!(target.status.poisoned.is_active());
    }

    #[test]
    fn test_bullet_expires() {
        let mut shot = bullet(ElementType::Fire, Vec::new());
        shot.ttl = 2;
        assert!(!shot.age());
        assert!(shot.age());
        assert!(shot.dead);
    }
}
