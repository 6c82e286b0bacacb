//! Distribution tag rules.
//!
//! Which of the host's categorical tags a capability joins (or leaves),
//! from its own flags and the global distribution switches.

use enchantry_domain::{known, CapabilityDefinition, TagKey};

use crate::infrastructure::config::DistributionSettings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagEdit {
    Add(TagKey),
    Remove(TagKey),
}

impl TagEdit {
    pub fn tag(&self) -> &TagKey {
        match self {
            TagEdit::Add(tag) | TagEdit::Remove(tag) => tag,
        }
    }
}

/// Tag edits for one definition, in the order they are applied.
pub fn distribution_edits(
    definition: &CapabilityDefinition,
    settings: &DistributionSettings,
) -> Vec<TagEdit> {
    let flags = &definition.distribution;
    let mut edits = Vec::new();

    if flags.treasure {
        edits.push(TagEdit::Add(known::TREASURE));
        edits.push(TagEdit::Add(known::DOUBLE_TRADE_PRICE));
    } else {
        edits.push(TagEdit::Add(known::NON_TREASURE));
    }

    if flags.on_random_loot && settings.random_loot {
        edits.push(TagEdit::Add(known::ON_RANDOM_LOOT));
    }

    if !flags.treasure {
        if flags.on_mob_equipment && settings.mob_equipment {
            edits.push(TagEdit::Add(known::ON_MOB_SPAWN_EQUIPMENT));
        }
        if flags.on_traded_equipment && settings.traded_equipment {
            edits.push(TagEdit::Add(known::ON_TRADED_EQUIPMENT));
        }
    }

    let tradable = flags.tradable && settings.trading;
    if settings.trade_rebalance {
        if tradable {
            edits.extend(flags.trades.iter().map(|t| TagEdit::Add(t.tag())));
        }
    } else if tradable {
        edits.push(TagEdit::Add(known::TRADEABLE));
    } else {
        edits.push(TagEdit::Remove(known::TRADEABLE));
    }

    if flags.curse {
        edits.push(TagEdit::Add(known::CURSE));
    } else if !flags.treasure {
        if flags.discoverable && settings.enchanting {
            edits.push(TagEdit::Add(known::IN_ENCHANTING_TABLE));
        } else {
            edits.push(TagEdit::Remove(known::IN_ENCHANTING_TABLE));
        }
    }

    edits
}
