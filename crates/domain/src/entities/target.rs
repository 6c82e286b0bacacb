//! Targets - live simulation entities passive effects apply to.

use serde::{Deserialize, Serialize};

use crate::ids::{RegionId, TargetId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Player,
    NonPlayer,
}

/// A snapshot of a live entity.
///
/// `region` is the region the entity was in when the snapshot was taken; the
/// host is the authority on where it is now.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub id: TargetId,
    pub kind: TargetKind,
    pub region: RegionId,
}

impl Target {
    pub fn player(id: TargetId, region: RegionId) -> Self {
        Self {
            id,
            kind: TargetKind::Player,
            region,
        }
    }

    pub fn non_player(id: TargetId, region: RegionId) -> Self {
        Self {
            id,
            kind: TargetKind::NonPlayer,
            region,
        }
    }

    pub fn is_player(&self) -> bool {
        self.kind == TargetKind::Player
    }

    pub fn in_region(mut self, region: RegionId) -> Self {
        self.region = region;
        self
    }
}
