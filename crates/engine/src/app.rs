//! Engine composition.

use std::sync::Arc;

use enchantry_domain::{CapabilityDefinition, ItemGroup};

use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::ports::{
    ClockPort, DispatchError, HostDispatcher, HostRegistry, ItemDurableStore, TargetLiveness,
    TaskHandle, WorldPort,
};
use crate::use_cases::passive::{PassiveCapability, PassiveEffectCoordinator, PassiveStats};
use crate::use_cases::registration::{BatchReport, CapabilityRegistry, RegistryStateError};

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Registry boot failed: {0}")]
    Registry(#[from] RegistryStateError),

    #[error("Dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),
}

/// Everything the engine needs from the host.
#[derive(Clone)]
pub struct HostPorts {
    pub registry: Arc<dyn HostRegistry>,
    pub dispatcher: Arc<dyn HostDispatcher>,
    pub world: Arc<dyn WorldPort>,
    pub liveness: Arc<dyn TargetLiveness>,
    pub store: Arc<dyn ItemDurableStore>,
    pub clock: Arc<dyn ClockPort>,
}

/// Main engine state.
///
/// Holds the sealed capability registry and the passive coordinator built
/// from the capabilities the host accepted.
pub struct Engine {
    pub registry: CapabilityRegistry,
    pub passive: PassiveEffectCoordinator,
    config: EngineConfig,
    report: BatchReport,
}

impl Engine {
    /// Run the registry protocol and wire passive effects.
    ///
    /// Passives whose capability was not registered are dropped with a
    /// warning. Per-capability failures land in [`Engine::boot_report`];
    /// only protocol misuse fails the boot.
    pub fn boot(
        config: EngineConfig,
        ports: HostPorts,
        groups: &[ItemGroup],
        definitions: Vec<CapabilityDefinition>,
        passives: Vec<PassiveCapability>,
    ) -> Result<Self, EngineError> {
        let mut registry = CapabilityRegistry::new(ports.registry, config.distribution);
        let report = registry.boot(groups, definitions)?;

        for failure in &report.failed {
            tracing::error!(
                capability = %failure.capability(),
                error = %failure,
                "Capability not registered"
            );
        }
        for unresolved in &report.unresolved_partners {
            tracing::warn!(
                capability = %unresolved.capability(),
                error = %unresolved,
                "Exclusivity partner unresolved"
            );
        }

        let (active, dropped): (Vec<_>, Vec<_>) = passives
            .into_iter()
            .partition(|passive| registry.contains(passive.id()));
        for passive in &dropped {
            tracing::warn!(
                capability = %passive.id(),
                "Passive behavior has no registered capability, skipping"
            );
        }

        tracing::info!(
            registered = report.registered.len(),
            failed = report.failed.len(),
            passives = active.len(),
            "Engine booted"
        );

        let passive = PassiveEffectCoordinator::new(
            active,
            ports.world,
            ports.liveness,
            ports.dispatcher,
            ports.store,
            ports.clock,
            config.passive.clone(),
        );

        Ok(Self {
            registry,
            passive,
            config,
            report,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn boot_report(&self) -> &BatchReport {
        &self.report
    }

    /// Schedule the passive tick. `None` when no passive survived boot.
    pub fn start(&self) -> Result<Option<TaskHandle>, EngineError> {
        Ok(self.passive.start()?)
    }

    pub fn stats(&self) -> PassiveStats {
        self.passive.stats()
    }

    pub fn shutdown(&self) {
        self.passive.shutdown();
    }
}
