// Cast validation: turns a player's request into a live effect, or rejects it untouched.

use super::catalog::{EffectKind, SpellCatalog, SpellDefinition, TargetRule};
use super::effects::{ActiveEffect, EffectRecord, Meteor, Shockwave};
use super::ledger::{Inventory, ResourceLedger};
use super::spellbook::SpellBook;
use super::state::Location;
use super::tuning::{MeteorTuning, ShockwaveTuning};
use super::PlayerId;
use glam::Vec2;
use std::fmt;
use std::sync::Arc;

/// Rejections surfaced to the casting player. None of them mutate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CastError {
    SpellNotKnownOrLevelTooHigh,
    InsufficientResources,
    TargetInvalid,
}

impl fmt::Display for CastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            CastError::SpellNotKnownOrLevelTooHigh => "spell not known at that level",
            CastError::InsufficientResources => "not enough resources",
            CastError::TargetInvalid => "invalid target",
        };
        f.write_str(msg)
    }
}

impl std::error::Error for CastError {}

#[derive(Debug, Clone, PartialEq)]
pub struct CastRequest {
    pub spell_id: String,
    pub level: u32,
    pub target: Vec2,
}

/// Everything about the caster a cast may read or debit, passed in per call.
pub struct CastContext<'a> {
    pub caster: PlayerId,
    pub caster_position: Vec2,
    pub location: &'a Location,
    pub ledger: &'a mut ResourceLedger,
    pub spell_book: &'a SpellBook,
    pub inventory: &'a mut Inventory,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EffectTuning {
    pub meteor: MeteorTuning,
    pub shockwave: ShockwaveTuning,
}

impl EffectTuning {
    /// Stand-in for an effect another peer simulates. It plays the same timeline
    /// but never changes the world.
    pub fn replica(&self, caster: PlayerId, record: &EffectRecord) -> Box<dyn ActiveEffect> {
        match record.kind {
            EffectKind::Meteor => Box::new(
                Meteor::new(caster, record.location.as_str(), record.anchor, self.meteor)
                    .into_replica(),
            ),
            EffectKind::Shockwave => Box::new(
                Shockwave::new(
                    caster,
                    record.location.as_str(),
                    record.anchor,
                    record.level,
                    self.shockwave,
                )
                .into_replica(),
            ),
        }
    }
}

pub struct CastController {
    catalog: Arc<SpellCatalog>,
    tuning: EffectTuning,
}

impl CastController {
    pub fn new(catalog: Arc<SpellCatalog>, tuning: EffectTuning) -> Self {
        Self { catalog, tuning }
    }

    pub fn catalog(&self) -> &SpellCatalog {
        &self.catalog
    }

    pub fn tuning(&self) -> &EffectTuning {
        &self.tuning
    }

    /// Validates and commits a cast. Checks run in order and the first failure wins:
    /// spell/level, resources (mana and reagents), then target acquisition.
    /// Nothing is debited unless the effect is returned.
    pub fn try_cast(
        &self,
        ctx: CastContext<'_>,
        request: &CastRequest,
    ) -> Result<Box<dyn ActiveEffect>, CastError> {
        let spell = self
            .catalog
            .get(&request.spell_id)
            .filter(|spell| request.level <= spell.max_level)
            .filter(|spell| ctx.spell_book.knows(&spell.id, request.level))
            .ok_or(CastError::SpellNotKnownOrLevelTooHigh)?;

        let cost = spell.cost(request.level);
        if !ctx.ledger.can_afford(cost) {
            return Err(CastError::InsufficientResources);
        }
        if let Some(reagent) = spell.reagent {
            if !ctx.inventory.has(reagent.item_id, reagent.quantity) {
                return Err(CastError::InsufficientResources);
            }
        }

        let anchor = acquire_target(spell, &ctx, request.target)?;

        // Commit: every check passed, so debit and effect creation happen together.
        ctx.ledger.apply_cost(cost);
        if let Some(reagent) = spell.reagent.filter(|r| r.consumed) {
            ctx.inventory.consume(reagent.item_id, reagent.quantity);
        }

        Ok(self.build_effect(spell, ctx.caster, &ctx.location.name, anchor, request.level))
    }

    fn build_effect(
        &self,
        spell: &SpellDefinition,
        caster: PlayerId,
        location: &str,
        anchor: Vec2,
        level: u32,
    ) -> Box<dyn ActiveEffect> {
        match spell.effect {
            EffectKind::Meteor => Box::new(Meteor::new(caster, location, anchor, self.tuning.meteor)),
            EffectKind::Shockwave => Box::new(Shockwave::new(
                caster,
                location,
                anchor,
                level,
                self.tuning.shockwave,
            )),
        }
    }
}

fn acquire_target(
    spell: &SpellDefinition,
    ctx: &CastContext<'_>,
    requested: Vec2,
) -> Result<Vec2, CastError> {
    match spell.target {
        TargetRule::Cursor if ctx.location.contains(requested) => Ok(requested),
        TargetRule::Cursor => Err(CastError::TargetInvalid),
        TargetRule::Caster if ctx.location.contains(ctx.caster_position) => {
            Ok(ctx.caster_position)
        }
        TargetRule::Caster => Err(CastError::TargetInvalid),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{METEOR, SHOCKWAVE};
    use crate::domain::registry::ItemRegistry;

    const CASTER: PlayerId = 11;
    const IRIDIUM: i32 = 337;

    struct Caster {
        ledger: ResourceLedger,
        book: SpellBook,
        inventory: Inventory,
        position: Vec2,
    }

    impl Caster {
        fn new(mana: u32) -> Self {
            let mut book = SpellBook::new();
            book.learn(METEOR, 0);
            book.learn(SHOCKWAVE, 1);
            Self {
                ledger: ResourceLedger::new(mana, 100, 2),
                book,
                inventory: Inventory::new(),
                position: Vec2::new(320.0, 320.0),
            }
        }

        fn cast(
            &mut self,
            controller: &CastController,
            location: &Location,
            spell_id: &str,
            level: u32,
            target: Vec2,
        ) -> Result<Box<dyn ActiveEffect>, CastError> {
            let ctx = CastContext {
                caster: CASTER,
                caster_position: self.position,
                location,
                ledger: &mut self.ledger,
                spell_book: &self.book,
                inventory: &mut self.inventory,
            };
            let request = CastRequest {
                spell_id: spell_id.to_string(),
                level,
                target,
            };
            controller.try_cast(ctx, &request)
        }
    }

    fn controller() -> CastController {
        CastController::new(
            Arc::new(SpellCatalog::standard(&ItemRegistry::vanilla())),
            EffectTuning::default(),
        )
    }

    fn farm() -> Location {
        Location::new("Farm", Vec2::new(1280.0, 1280.0))
    }

    #[test]
    fn when_no_iridium_then_meteor_rejected_and_nothing_changes() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(50);
        let ledger_before = caster.ledger.clone();
        let inventory_before = caster.inventory.clone();

        let result = caster.cast(&controller, &location, METEOR, 0, Vec2::new(100.0, 100.0));

        assert!(matches!(result, Err(CastError::InsufficientResources)));
        assert_eq!(caster.ledger, ledger_before);
        assert_eq!(caster.inventory, inventory_before);
    }

    #[test]
    fn when_meteor_cast_with_iridium_then_bar_consumed_and_effect_returned() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(50);
        caster.inventory.add(IRIDIUM, 2);

        let effect = caster
            .cast(&controller, &location, METEOR, 0, Vec2::new(100.0, 100.0))
            .expect("cast should succeed");

        assert_eq!(effect.caster(), CASTER);
        assert_eq!(caster.inventory.count(IRIDIUM), 1);
        assert_eq!(caster.ledger.mana, 50);
    }

    #[test]
    fn when_mana_short_then_rejected_and_ledger_untouched() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(9);
        let before = caster.ledger.clone();

        // Level 1 shockwave costs 10.
        let result = caster.cast(&controller, &location, SHOCKWAVE, 1, Vec2::ZERO);

        assert!(matches!(result, Err(CastError::InsufficientResources)));
        assert_eq!(caster.ledger, before);
    }

    #[test]
    fn when_shockwave_cast_then_mana_debited_by_level_cost() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(30);

        let result = caster.cast(&controller, &location, SHOCKWAVE, 1, Vec2::ZERO);

        assert!(result.is_ok());
        assert_eq!(caster.ledger.mana, 20);
    }

    #[test]
    fn when_level_above_max_or_unlearned_then_spell_not_known() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(100);
        caster.inventory.add(IRIDIUM, 1);

        let too_high = caster.cast(&controller, &location, METEOR, 1, Vec2::ONE);
        let unlearned = caster.cast(&controller, &location, SHOCKWAVE, 2, Vec2::ONE);
        let unknown = caster.cast(&controller, &location, "arcane:rewind", 0, Vec2::ONE);

        assert!(matches!(too_high, Err(CastError::SpellNotKnownOrLevelTooHigh)));
        assert!(matches!(unlearned, Err(CastError::SpellNotKnownOrLevelTooHigh)));
        assert!(matches!(unknown, Err(CastError::SpellNotKnownOrLevelTooHigh)));
        assert_eq!(caster.inventory.count(IRIDIUM), 1);
    }

    #[test]
    fn when_target_outside_location_then_target_invalid_and_reagent_kept() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(100);
        caster.inventory.add(IRIDIUM, 1);

        let result = caster.cast(&controller, &location, METEOR, 0, Vec2::new(5000.0, 10.0));

        assert!(matches!(result, Err(CastError::TargetInvalid)));
        assert_eq!(caster.inventory.count(IRIDIUM), 1);
    }

    #[test]
    fn when_resources_and_target_both_fail_then_resources_error_wins() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(100);

        let result = caster.cast(&controller, &location, METEOR, 0, Vec2::new(-1.0, -1.0));

        assert!(matches!(result, Err(CastError::InsufficientResources)));
    }

    #[test]
    fn when_cast_effect_is_replicated_then_replica_reports_same_record() {
        let controller = controller();
        let location = farm();
        let mut caster = Caster::new(100);

        let effect = caster
            .cast(&controller, &location, SHOCKWAVE, 1, Vec2::ZERO)
            .expect("shockwave accepted");
        let record = effect.record();
        let replica = controller.tuning().replica(CASTER, &record);

        assert_eq!(record.kind, EffectKind::Shockwave);
        assert_eq!(record.level, 1);
        assert_eq!(record.anchor, caster.position);
        assert_eq!(replica.record(), record);
        assert_eq!(replica.caster(), CASTER);
        assert_eq!(replica.location(), location.name);
    }
}
