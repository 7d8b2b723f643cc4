//! Technology tree.
//!
//! Each player owns a rooted tree of research nodes. The root is always
//! completed. Research state propagates along the tree:
//!
//! - starting a node marks it and every ancestor `researching`;
//! - stopping a node clears it and every descendant;
//! - the node that receives science is the first one, breadth-first from
//!   the root, that is researching and not yet completed.
//!
//! Starting research first stops everything else, so at most one path from
//! the root is ever active. Prerequisites on that path are researched
//! before the node that was asked for.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::buildings::BuildingKind;
use crate::clock::TickContext;
use crate::combat::StatusPayload;
use crate::data::TechDef;
use crate::element::ElementType;
use crate::error::{GameError, Result};
use crate::production::{Advance, Production, ProductionTarget, ResourceSource};

/// Index of a node in its tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TechId(pub u32);

/// What completing a node grants its player.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TechEffect {
    /// Bullets of `element` carry `payload`.
    BulletStatus {
        /// Element of the firing unit.
        element: ElementType,
        /// Status exposure per hit.
        payload: StatusPayload,
    },
    /// Construction of this kind becomes available.
    UnlockBuilding(BuildingKind),
}

/// One research node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechNode {
    /// Handle.
    pub id: TechId,
    /// Display name.
    pub name: String,
    /// Parent node; `None` only for the root.
    pub parent: Option<TechId>,
    /// Child nodes in definition order.
    pub children: Vec<TechId>,
    /// Research finished.
    pub completed: bool,
    /// On the active research path.
    pub researching: bool,
    /// Granted on completion.
    pub effects: Vec<TechEffect>,
    /// Science accumulated toward this node.
    pub research: Production,
}

/// A player's technology tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechTree {
    nodes: Vec<TechNode>,
}

impl TechTree {
    /// Build a tree from definitions. Node 0 is the root.
    pub fn from_defs(defs: &[TechDef]) -> Result<Self> {
        if defs.is_empty() {
            return Err(GameError::InvalidRules(
                "technology tree needs a root".to_string(),
            ));
        }

        let mut nodes: Vec<TechNode> = Vec::with_capacity(defs.len());
        for (index, def) in defs.iter().enumerate() {
            let id = TechId(index as u32);
            let parent = match (index, def.parent) {
                (0, _) => None,
                (_, Some(parent)) if parent < index => Some(TechId(parent as u32)),
                _ => {
                    return Err(GameError::InvalidRules(format!(
                        "technology '{}' must name an earlier node as parent",
                        def.name
                    )))
                }
            };
            if let Some(parent) = parent {
                nodes[parent.0 as usize].children.push(id);
            }

            let mut research =
                Production::new(ProductionTarget::Research(id), def.cost, false, false);
            let completed = index == 0;
            if completed {
                research.accumulated = research.target_amount;
            }

            nodes.push(TechNode {
                id,
                name: def.name.clone(),
                parent,
                children: Vec::new(),
                completed,
                researching: false,
                effects: def.effects.clone(),
                research,
            });
        }

        Ok(Self { nodes })
    }

    /// The root node.
    #[must_use]
    pub const fn root(&self) -> TechId {
        TechId(0)
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the tree is empty (never true for a built tree).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Look up a node.
    #[must_use]
    pub fn node(&self, id: TechId) -> Option<&TechNode> {
        self.nodes.get(id.0 as usize)
    }

    /// All nodes in definition order.
    pub fn nodes(&self) -> impl Iterator<Item = &TechNode> {
        self.nodes.iter()
    }

    /// Find a node by name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<TechId> {
        self.nodes.iter().find(|n| n.name == name).map(|n| n.id)
    }

    fn check(&self, id: TechId) -> Result<()> {
        if (id.0 as usize) < self.nodes.len() {
            Ok(())
        } else {
            Err(GameError::InvalidTechId(id.0))
        }
    }

    /// Make `id` the research target.
    ///
    /// Clears any other research, then marks `id` and its ancestors.
    /// Returns `false` (and changes nothing) if `id` is already completed.
    pub fn start_researching(&mut self, id: TechId) -> Result<bool> {
        self.check(id)?;
        if self.nodes[id.0 as usize].completed {
            return Ok(false);
        }

        self.stop_researching(self.root())?;
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            let node = &mut self.nodes[current.0 as usize];
            node.researching = true;
            cursor = node.parent;
        }
        Ok(true)
    }

    /// Clear `researching` on `id` and all of its descendants.
    pub fn stop_researching(&mut self, id: TechId) -> Result<()> {
        self.check(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current.0 as usize];
            node.researching = false;
            stack.extend(node.children.iter().copied());
        }
        Ok(())
    }

    /// The node that receives science this tick.
    #[must_use]
    pub fn get_researching(&self) -> Option<TechId> {
        let mut queue = VecDeque::from([self.root()]);
        while let Some(current) = queue.pop_front() {
            let node = &self.nodes[current.0 as usize];
            if node.researching && !node.completed {
                return Some(current);
            }
            queue.extend(node.children.iter().copied());
        }
        None
    }

    /// Mark a node completed.
    pub fn complete(&mut self, id: TechId) {
        if let Some(node) = self.nodes.get_mut(id.0 as usize) {
            node.completed = true;
            node.researching = false;
            node.research.accumulated = node.research.target_amount;
        }
    }

    /// Whether a node is completed.
    #[must_use]
    pub fn is_completed(&self, id: TechId) -> bool {
        self.node(id).is_some_and(|n| n.completed)
    }

    /// Uncompleted nodes whose parent is completed.
    #[must_use]
    pub fn available(&self) -> Vec<TechId> {
        self.nodes
            .iter()
            .filter(|n| !n.completed && n.parent.is_some_and(|p| self.is_completed(p)))
            .map(|n| n.id)
            .collect()
    }

    /// Effects of every completed node.
    pub fn completed_effects(&self) -> impl Iterator<Item = &TechEffect> {
        self.nodes
            .iter()
            .filter(|n| n.completed)
            .flat_map(|n| n.effects.iter())
    }

    /// Whether `kind` is unlocked.
    ///
    /// A kind no node unlocks is always available.
    #[must_use]
    pub fn is_unlocked(&self, kind: BuildingKind) -> bool {
        let mut gated = false;
        for node in &self.nodes {
            if node.effects.contains(&TechEffect::UnlockBuilding(kind)) {
                if node.completed {
                    return true;
                }
                gated = true;
            }
        }
        !gated
    }

    /// Feed science to the active node. Returns the node if it completed.
    pub fn advance(&mut self, source: &mut impl ResourceSource, ctx: &TickContext) -> Option<TechId> {
        let id = self.get_researching()?;
        let outcome = self.nodes[id.0 as usize].research.advance(source, ctx);
        if outcome == Advance::Completed {
            self.complete(id);
            return Some(id);
        }
        None
    }
}
