use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// Known spells and the highest level learned for each.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpellBook {
    #[serde(default)]
    pub known_spells: BTreeMap<String, u32>,
}

impl SpellBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when `spell_id` has been learned at `level` or higher.
    pub fn knows(&self, spell_id: &str, level: u32) -> bool {
        self.known_spells
            .get(spell_id)
            .is_some_and(|known| *known >= level)
    }

    /// Records a learned level; never lowers an existing one.
    pub fn learn(&mut self, spell_id: impl Into<String>, level: u32) {
        let entry = self.known_spells.entry(spell_id.into()).or_insert(level);
        *entry = (*entry).max(level);
    }

    pub fn forget(&mut self, spell_id: &str) -> bool {
        self.known_spells.remove(spell_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn when_spell_learned_at_level_one_then_level_zero_is_known_too() {
        let mut book = SpellBook::new();
        book.learn("shockwave", 1);

        assert!(book.knows("shockwave", 0));
        assert!(book.knows("shockwave", 1));
        assert!(!book.knows("shockwave", 2));
        assert!(!book.knows("meteor", 0));
    }

    #[test]
    fn when_relearning_lower_level_then_known_level_is_kept() {
        let mut book = SpellBook::new();
        book.learn("shockwave", 2);
        book.learn("shockwave", 0);

        assert_eq!(book.known_spells.get("shockwave"), Some(&2));
    }
}
