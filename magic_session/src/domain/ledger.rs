// Per-player casting resources. Reagents live in the inventory, not here.

use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceLedger {
    pub mana: u32,
    pub max_mana: u32,
    pub free_points: u32,
}

impl ResourceLedger {
    pub fn new(mana: u32, max_mana: u32, free_points: u32) -> Self {
        Self {
            mana: mana.min(max_mana),
            max_mana,
            free_points,
        }
    }

    /// Whether a mana cost can be paid. Zero and negative (refund) costs always can.
    pub fn can_afford(&self, cost: i32) -> bool {
        cost <= 0 || self.mana >= cost.unsigned_abs()
    }

    /// Applies a cost previously checked with [`can_afford`](Self::can_afford).
    /// Negative costs refund mana up to the maximum.
    pub(crate) fn apply_cost(&mut self, cost: i32) {
        if cost >= 0 {
            self.mana = self.mana.saturating_sub(cost.unsigned_abs());
        } else {
            self.mana = self
                .mana
                .saturating_add(cost.unsigned_abs())
                .min(self.max_mana);
        }
    }

    /// Credit from leveling/reward systems.
    pub fn credit_points(&mut self, points: u32) {
        self.free_points = self.free_points.saturating_add(points);
    }

    /// Spends one free point (e.g. learning a spell). False when none are left.
    pub fn spend_point(&mut self) -> bool {
        if self.free_points == 0 {
            return false;
        }
        self.free_points -= 1;
        true
    }

    pub fn restore_mana(&mut self, amount: u32) {
        self.mana = self.mana.saturating_add(amount).min(self.max_mana);
    }
}

// Item id -> held quantity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Inventory {
    items: BTreeMap<i32, u32>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, item_id: i32) -> u32 {
        self.items.get(&item_id).copied().unwrap_or(0)
    }

    pub fn has(&self, item_id: i32, quantity: u32) -> bool {
        self.count(item_id) >= quantity
    }

    pub fn add(&mut self, item_id: i32, quantity: u32) {
        if quantity == 0 {
            return;
        }
        *self.items.entry(item_id).or_default() += quantity;
    }

    /// Removes `quantity` units; leaves the inventory untouched if not enough are held.
    pub fn consume(&mut self, item_id: i32, quantity: u32) -> bool {
        let Some(held) = self.items.get_mut(&item_id) else {
            return quantity == 0;
        };
        if *held < quantity {
            return false;
        }
        *held -= quantity;
        if *held == 0 {
            self.items.remove(&item_id);
        }
        true
    }
}
