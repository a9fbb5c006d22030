// Static spell definitions. Built once at startup and shared read-only.

use super::registry::{IRIDIUM_BAR, ItemRegistry, RegistryKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::warn;

pub const METEOR: &str = "eldritch:meteor";
pub const SHOCKWAVE: &str = "nature:shockwave";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum School {
    Arcane,
    Elemental,
    Nature,
    Life,
    Eldritch,
    Toil,
}

/// Mana cost as a function of the cast level. Negative values refund mana.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManaCost {
    Flat(i32),
    PerLevel { base: i32, per_level: i32 },
}

impl ManaCost {
    pub fn at(&self, level: u32) -> i32 {
        match *self {
            ManaCost::Flat(cost) => cost,
            ManaCost::PerLevel { base, per_level } => base + per_level * level as i32,
        }
    }
}

/// How a cast picks its anchor point.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetRule {
    // Requested point, which must lie inside the caster's location.
    Cursor,
    // Caster's own position; the requested point is ignored.
    Caster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReagentRequirement {
    pub item_id: i32,
    pub quantity: u32,
    // Whether a successful cast uses the reagent up.
    pub consumed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Meteor,
    Shockwave,
}

#[derive(Debug, Clone)]
pub struct SpellDefinition {
    pub id: String,
    pub school: School,
    pub mana_cost: ManaCost,
    /// Highest castable level, inclusive.
    pub max_level: u32,
    pub target: TargetRule,
    pub reagent: Option<ReagentRequirement>,
    pub effect: EffectKind,
}

impl SpellDefinition {
    pub fn cost(&self, level: u32) -> i32 {
        self.mana_cost.at(level)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpellCatalog {
    spells: BTreeMap<String, SpellDefinition>,
}

impl SpellCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shipped spell table. Spells whose reagent is unknown to `registry` are left out.
    pub fn standard(registry: &ItemRegistry) -> Self {
        let mut catalog = Self::new();

        match registry.name_to_id(RegistryKind::Object, IRIDIUM_BAR) {
            Some(item_id) => catalog.register(SpellDefinition {
                id: METEOR.to_string(),
                school: School::Eldritch,
                mana_cost: ManaCost::Flat(0),
                max_level: 0,
                target: TargetRule::Cursor,
                reagent: Some(ReagentRequirement {
                    item_id,
                    quantity: 1,
                    consumed: true,
                }),
                effect: EffectKind::Meteor,
            }),
            None => warn!(
                spell_id = METEOR,
                reagent = IRIDIUM_BAR,
                "reagent not registered; spell unavailable"
            ),
        }

        catalog.register(SpellDefinition {
            id: SHOCKWAVE.to_string(),
            school: School::Nature,
            mana_cost: ManaCost::PerLevel {
                base: 5,
                per_level: 5,
            },
            max_level: 2,
            target: TargetRule::Caster,
            reagent: None,
            effect: EffectKind::Shockwave,
        });

        catalog
    }

    pub fn register(&mut self, spell: SpellDefinition) {
        self.spells.insert(spell.id.clone(), spell);
    }

    pub fn get(&self, spell_id: &str) -> Option<&SpellDefinition> {
        self.spells.get(spell_id)
    }

    /// Highest level any spell casts `effect` at. None when no spell produces it.
    pub fn max_level_of(&self, effect: EffectKind) -> Option<u32> {
        self.spells
            .values()
            .filter(|spell| spell.effect == effect)
            .map(|spell| spell.max_level)
            .max()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.spells.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.spells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_registry_knows_iridium_then_meteor_is_free_and_needs_one_bar() {
        let catalog = SpellCatalog::standard(&ItemRegistry::vanilla());
        let meteor = catalog.get(METEOR).expect("meteor registered");

        assert_eq!(meteor.school, School::Eldritch);
        assert_eq!(meteor.cost(0), 0);
        assert_eq!(meteor.max_level, 0);
        assert_eq!(
            meteor.reagent,
            Some(ReagentRequirement {
                item_id: 337,
                quantity: 1,
                consumed: true,
            })
        );
    }

    #[test]
    fn when_reagent_unregistered_then_meteor_is_left_out() {
        let catalog = SpellCatalog::standard(&ItemRegistry::new());

        assert!(catalog.get(METEOR).is_none());
        assert!(catalog.get(SHOCKWAVE).is_some());
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.max_level_of(EffectKind::Meteor), None);
        assert_eq!(catalog.max_level_of(EffectKind::Shockwave), Some(2));
    }

    #[test]
    fn per_level_cost_scales_with_level() {
        let cost = ManaCost::PerLevel {
            base: 5,
            per_level: 5,
        };

        assert_eq!(cost.at(0), 5);
        assert_eq!(cost.at(2), 15);
        assert_eq!(ManaCost::Flat(-3).at(7), -3);
    }
}
