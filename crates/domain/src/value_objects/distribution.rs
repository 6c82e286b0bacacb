//! Where a capability may show up: loot, trades, mobs, enchanting tables.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;
use crate::value_objects::TagKey;

/// Villager trade pool a capability can be offered from when the host runs
/// with rebalanced trades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    DesertCommon,
    DesertSpecial,
    PlainsCommon,
    PlainsSpecial,
    SavannaCommon,
    SavannaSpecial,
    JungleCommon,
    JungleSpecial,
    SnowCommon,
    SnowSpecial,
    SwampCommon,
    SwampSpecial,
    TaigaCommon,
    TaigaSpecial,
}

impl TradeType {
    pub const ALL: [TradeType; 14] = [
        Self::DesertCommon,
        Self::DesertSpecial,
        Self::PlainsCommon,
        Self::PlainsSpecial,
        Self::SavannaCommon,
        Self::SavannaSpecial,
        Self::JungleCommon,
        Self::JungleSpecial,
        Self::SnowCommon,
        Self::SnowSpecial,
        Self::SwampCommon,
        Self::SwampSpecial,
        Self::TaigaCommon,
        Self::TaigaSpecial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DesertCommon => "desert_common",
            Self::DesertSpecial => "desert_special",
            Self::PlainsCommon => "plains_common",
            Self::PlainsSpecial => "plains_special",
            Self::SavannaCommon => "savanna_common",
            Self::SavannaSpecial => "savanna_special",
            Self::JungleCommon => "jungle_common",
            Self::JungleSpecial => "jungle_special",
            Self::SnowCommon => "snow_common",
            Self::SnowSpecial => "snow_special",
            Self::SwampCommon => "swamp_common",
            Self::SwampSpecial => "swamp_special",
            Self::TaigaCommon => "taiga_common",
            Self::TaigaSpecial => "taiga_special",
        }
    }

    /// Host tag of this trade pool.
    pub fn tag(&self) -> TagKey {
        match self {
            Self::DesertCommon => TagKey::host("trades/desert_common"),
            Self::DesertSpecial => TagKey::host("trades/desert_special"),
            Self::PlainsCommon => TagKey::host("trades/plains_common"),
            Self::PlainsSpecial => TagKey::host("trades/plains_special"),
            Self::SavannaCommon => TagKey::host("trades/savanna_common"),
            Self::SavannaSpecial => TagKey::host("trades/savanna_special"),
            Self::JungleCommon => TagKey::host("trades/jungle_common"),
            Self::JungleSpecial => TagKey::host("trades/jungle_special"),
            Self::SnowCommon => TagKey::host("trades/snow_common"),
            Self::SnowSpecial => TagKey::host("trades/snow_special"),
            Self::SwampCommon => TagKey::host("trades/swamp_common"),
            Self::SwampSpecial => TagKey::host("trades/swamp_special"),
            Self::TaigaCommon => TagKey::host("trades/taiga_common"),
            Self::TaigaSpecial => TagKey::host("trades/taiga_special"),
        }
    }
}

impl fmt::Display for TradeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TradeType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .ok_or_else(|| DomainError::parse(format!("Unknown trade type: {}", s)))
    }
}

/// Distribution flags of a capability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Distribution {
    pub treasure: bool,
    pub curse: bool,
    pub discoverable: bool,
    pub tradable: bool,
    pub on_random_loot: bool,
    pub on_mob_equipment: bool,
    pub on_traded_equipment: bool,
    /// Trade pools used when the host runs with rebalanced trades.
    pub trades: Vec<TradeType>,
}

impl Distribution {
    /// A regular capability: found everywhere a non-treasure one can be.
    pub fn regular(trades: impl IntoIterator<Item = TradeType>) -> Self {
        Self {
            treasure: false,
            curse: false,
            discoverable: true,
            tradable: true,
            on_random_loot: true,
            on_mob_equipment: true,
            on_traded_equipment: true,
            trades: trades.into_iter().collect(),
        }
    }

    /// A treasure capability: loot and trades only.
    pub fn treasure(trades: impl IntoIterator<Item = TradeType>) -> Self {
        Self {
            treasure: true,
            curse: false,
            discoverable: false,
            tradable: true,
            on_random_loot: true,
            on_mob_equipment: false,
            on_traded_equipment: false,
            trades: trades.into_iter().collect(),
        }
    }

    pub fn cursed(mut self) -> Self {
        self.curse = true;
        self
    }

    pub fn with_discoverable(mut self, discoverable: bool) -> Self {
        self.discoverable = discoverable;
        self
    }

    pub fn with_tradable(mut self, tradable: bool) -> Self {
        self.tradable = tradable;
        self
    }
}

impl Default for Distribution {
    fn default() -> Self {
        Self::regular([])
    }
}
