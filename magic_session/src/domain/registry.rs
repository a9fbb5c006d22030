// Name -> numeric id lookups for content items, keyed by item kind.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryKind {
    Object,
    Crop,
    FruitTree,
    BigCraftable,
}

pub const IRIDIUM_BAR: &str = "Iridium Bar";
const IRIDIUM_BAR_ID: i32 = 337;

#[derive(Debug, Clone, Default)]
pub struct ItemRegistry {
    ids: HashMap<(RegistryKind, String), i32>,
}

impl ItemRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry seeded with the base-game items the spell catalog depends on.
    pub fn vanilla() -> Self {
        let mut registry = Self::new();
        registry.register(RegistryKind::Object, IRIDIUM_BAR, IRIDIUM_BAR_ID);
        registry
    }

    pub fn register(&mut self, kind: RegistryKind, name: impl Into<String>, id: i32) {
        self.ids.insert((kind, name.into()), id);
    }

    pub fn name_to_id(&self, kind: RegistryKind, name: &str) -> Option<i32> {
        self.ids.get(&(kind, name.to_string())).copied()
    }
}
