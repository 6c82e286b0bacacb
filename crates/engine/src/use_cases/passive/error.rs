//! Passive effect errors.

use std::fmt;

use enchantry_domain::CapabilityId;

/// Which capability call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerStage {
    Availability,
    Charges,
    Trigger,
    Consume,
}

impl fmt::Display for TriggerStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TriggerStage::Availability => "availability check",
            TriggerStage::Charges => "charge check",
            TriggerStage::Trigger => "trigger",
            TriggerStage::Consume => "charge consumption",
        };
        f.write_str(s)
    }
}

/// Failure of one (target, item, capability) unit.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TriggerError {
    #[error("{capability} failed during {stage}: {message}")]
    Failed {
        capability: CapabilityId,
        stage: TriggerStage,
        message: String,
    },

    #[error("{capability} panicked: {message}")]
    Panicked {
        capability: CapabilityId,
        message: String,
    },
}

impl TriggerError {
    pub fn failed(capability: &CapabilityId, stage: TriggerStage, error: anyhow::Error) -> Self {
        Self::Failed {
            capability: capability.clone(),
            stage,
            message: format!("{:#}", error),
        }
    }

    pub fn capability(&self) -> &CapabilityId {
        match self {
            Self::Failed { capability, .. } | Self::Panicked { capability, .. } => capability,
        }
    }
}

/// Failure of a whole tick. Logged; never stops the timer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoopError {
    #[error("Passive tick panicked: {0}")]
    Panicked(String),

    #[error("Dispatcher is shut down")]
    DispatcherShutDown,
}

impl LoopError {
    /// A pointer for whoever reads the log.
    pub fn hint(&self, region_sharded: bool) -> &'static str {
        match (self, region_sharded) {
            (LoopError::DispatcherShutDown, _) => {
                "the engine is stopping or the host scheduler was torn down early"
            }
            (LoopError::Panicked(_), true) => {
                "region-sharded host: make sure no capability touches a target \
                 outside its owning region"
            }
            (LoopError::Panicked(_), false) => {
                "check the world adapter; capability failures are isolated per unit \
                 and never reach the tick"
            }
        }
    }
}
