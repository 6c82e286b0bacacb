//! Passive effect coordinator.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use enchantry_domain::{EquippedItem, Target};

use crate::entities::TriggerLedger;
use crate::infrastructure::config::PassiveConfig;
use crate::infrastructure::isolation::isolate;
use crate::infrastructure::ports::{
    ClockPort, DispatchError, HostDispatcher, ItemDurableStore, TargetLiveness, TaskHandle,
    WorldPort,
};

use super::error::{LoopError, TriggerError, TriggerStage};
use super::PassiveCapability;

/// What one trigger attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Applied,
    Unavailable,
    OutOfCharges,
    /// Last successful trigger was less than the minimum dwell time ago.
    Dwell,
    /// The capability ran but reported nothing applied.
    NotApplied,
}

/// Summary of one tick, as seen by the tick itself. Per-target work runs
/// later on the dispatcher and is reflected in [`PassiveStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub ready_capabilities: usize,
    pub targets: usize,
    pub scheduled: usize,
    pub dispatch_failures: usize,
}

/// Summary of one target job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TargetReport {
    pub attempts: usize,
    pub applied: usize,
    pub failures: usize,
}

/// Counters since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassiveStats {
    pub ticks: u64,
    pub applied: u64,
    pub trigger_failures: u64,
    pub target_failures: u64,
    pub dispatch_failures: u64,
    pub loop_failures: u64,
}

#[derive(Default)]
struct Counters {
    ticks: AtomicU64,
    applied: AtomicU64,
    trigger_failures: AtomicU64,
    target_failures: AtomicU64,
    dispatch_failures: AtomicU64,
    loop_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PassiveStats {
        PassiveStats {
            ticks: self.ticks.load(Ordering::Relaxed),
            applied: self.applied.load(Ordering::Relaxed),
            trigger_failures: self.trigger_failures.load(Ordering::Relaxed),
            target_failures: self.target_failures.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            loop_failures: self.loop_failures.load(Ordering::Relaxed),
        }
    }
}

struct Slot {
    passive: PassiveCapability,
    period_ticks: u64,
    countdown: AtomicU64,
}

struct Inner {
    slots: Vec<Slot>,
    world: Arc<dyn WorldPort>,
    liveness: Arc<dyn TargetLiveness>,
    dispatcher: Arc<dyn HostDispatcher>,
    ledger: TriggerLedger,
    clock: Arc<dyn ClockPort>,
    config: PassiveConfig,
    region_sharded: bool,
    degrade_warned: AtomicBool,
    /// Set by shutdown; queued target jobs check it before touching items.
    stopped: AtomicBool,
    counters: Counters,
}

/// Runs passive capabilities against live targets on a repeating tick.
///
/// The passive set is fixed at construction. Ticks are serialized by the
/// dispatcher's repeating timer; target jobs run on whatever worker owns the
/// target and may run in parallel with each other.
pub struct PassiveEffectCoordinator {
    inner: Arc<Inner>,
    timer: Mutex<Option<TaskHandle>>,
}

impl PassiveEffectCoordinator {
    pub fn new(
        passives: Vec<PassiveCapability>,
        world: Arc<dyn WorldPort>,
        liveness: Arc<dyn TargetLiveness>,
        dispatcher: Arc<dyn HostDispatcher>,
        store: Arc<dyn ItemDurableStore>,
        clock: Arc<dyn ClockPort>,
        config: PassiveConfig,
    ) -> Self {
        let slots = passives
            .into_iter()
            .map(|passive| {
                let period_ticks = passive.period_ticks(config.tick_interval);
                Slot {
                    passive,
                    period_ticks,
                    countdown: AtomicU64::new(period_ticks),
                }
            })
            .collect();
        // Fixed for the life of the host; read once.
        let region_sharded = dispatcher.is_region_sharded();

        Self {
            inner: Arc::new(Inner {
                slots,
                world,
                liveness,
                dispatcher,
                ledger: TriggerLedger::new(store),
                clock,
                config,
                region_sharded,
                degrade_warned: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                counters: Counters::default(),
            }),
            timer: Mutex::new(None),
        }
    }

    pub fn passive_count(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn stats(&self) -> PassiveStats {
        self.inner.counters.snapshot()
    }

    /// Schedule the repeating tick. Returns `None` when there is nothing to
    /// run; calling it again returns the running timer.
    pub fn start(&self) -> Result<Option<TaskHandle>, DispatchError> {
        let mut timer = self.timer.lock();
        if let Some(handle) = timer.as_ref().filter(|h| h.is_alive()) {
            return Ok(Some(handle.clone()));
        }
        if self.inner.slots.is_empty() {
            tracing::info!("No passive capabilities registered, passive tick not started");
            return Ok(None);
        }

        self.inner.stopped.store(false, Ordering::Release);
        let inner = Arc::clone(&self.inner);
        let handle = self.inner.dispatcher.schedule_repeating(
            self.inner.config.tick_interval,
            Arc::new(move || {
                inner.tick();
            }),
        )?;
        tracing::info!(
            passives = self.inner.slots.len(),
            interval_ms = self.inner.config.tick_interval.as_millis() as u64,
            region_sharded = self.inner.region_sharded,
            "Passive tick started"
        );
        *timer = Some(handle.clone());
        Ok(Some(handle))
    }

    /// Cancel the repeating tick. Target jobs already queued on the
    /// dispatcher become no-ops.
    pub fn shutdown(&self) {
        self.inner.stopped.store(true, Ordering::Release);
        if let Some(handle) = self.timer.lock().take() {
            self.inner.dispatcher.cancel(&handle);
            tracing::info!("Passive tick stopped");
        }
    }

    /// Run one tick now. Never panics.
    pub fn tick(&self) -> TickReport {
        self.inner.tick()
    }

    /// Run every ready-or-not passive against one target. Must be called on
    /// the worker that owns the target.
    pub fn process_target(&self, target: &Target) -> TargetReport {
        let all: Vec<usize> = (0..self.inner.slots.len()).collect();
        self.inner.process_target(target, &all)
    }

    /// Try one capability on one item. Must be called on the worker that
    /// owns the target.
    pub fn attempt_trigger(
        &self,
        passive: &PassiveCapability,
        target: &Target,
        item: &EquippedItem,
    ) -> Result<TriggerOutcome, TriggerError> {
        self.inner.attempt_trigger(passive, target, item)
    }
}

impl Drop for PassiveEffectCoordinator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn tick(self: &Arc<Self>) -> TickReport {
        Counters::bump(&self.counters.ticks, 1);
        let outcome = isolate(|| self.run_tick());
        let error = match outcome {
            Ok(Ok(report)) => return report,
            Ok(Err(e)) => e,
            Err(panic) => LoopError::Panicked(panic),
        };
        Counters::bump(&self.counters.loop_failures, 1);
        tracing::error!(
            error = %error,
            hint = error.hint(self.region_sharded),
            "Passive tick failed"
        );
        TickReport::default()
    }

    fn run_tick(self: &Arc<Self>) -> Result<TickReport, LoopError> {
        let ready: Arc<[usize]> = self.ready_slots().into();
        let mut report = TickReport {
            ready_capabilities: ready.len(),
            ..TickReport::default()
        };
        if ready.is_empty() {
            return Ok(report);
        }

        let targets: Vec<Target> = self
            .snapshot()
            .into_iter()
            .filter(|t| self.liveness.is_valid(t))
            .collect();
        report.targets = targets.len();

        for target in targets {
            let inner = Arc::clone(self);
            let ready = Arc::clone(&ready);
            let job_target = target.clone();
            let job = Box::new(move || inner.run_target_job(&job_target, &ready));

            match self.dispatcher.schedule_at_affinity(&target, job) {
                Ok(_) => report.scheduled += 1,
                Err(DispatchError::ShutDown) => return Err(LoopError::DispatcherShutDown),
                Err(e) => {
                    report.dispatch_failures += 1;
                    Counters::bump(&self.counters.dispatch_failures, 1);
                    tracing::warn!(
                        target_id = %target.id,
                        error = %e,
                        "Failed to schedule passive job, skipping target this tick"
                    );
                }
            }
        }

        tracing::trace!(
            ready = report.ready_capabilities,
            targets = report.targets,
            scheduled = report.scheduled,
            "Passive tick dispatched"
        );
        Ok(report)
    }

    /// Advance every countdown; return slots that reached zero.
    fn ready_slots(&self) -> Vec<usize> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| {
                let left = slot.countdown.load(Ordering::Relaxed).saturating_sub(1);
                if left == 0 {
                    slot.countdown.store(slot.period_ticks, Ordering::Relaxed);
                    Some(i)
                } else {
                    slot.countdown.store(left, Ordering::Relaxed);
                    None
                }
            })
            .collect()
    }

    fn snapshot(&self) -> Vec<Target> {
        let mut targets = self.world.online_players();
        if !self.config.include_non_player_targets {
            return targets;
        }

        if self.region_sharded && !self.world.supports_region_safe_enumeration() {
            if !self.degrade_warned.swap(true, Ordering::Relaxed) {
                tracing::warn!(
                    "Non-player targets are enabled but this region-sharded host cannot \
                     enumerate them safely; passive effects apply to players only"
                );
            }
            return targets;
        }

        match self.world.non_player_targets() {
            Ok(others) => targets.extend(others),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Non-player enumeration failed, using players only this tick"
                )
            }
        }
        targets
    }

    fn run_target_job(&self, target: &Target, ready: &[usize]) {
        if self.stopped.load(Ordering::Acquire) {
            tracing::debug!(target_id = %target.id, "Passive stopped, skipping queued target job");
            return;
        }
        if let Err(panic) = isolate(|| self.process_target(target, ready)) {
            Counters::bump(&self.counters.target_failures, 1);
            tracing::error!(
                target_id = %target.id,
                panic = %panic,
                "Passive job failed for target"
            );
        }
    }

    fn process_target(&self, target: &Target, ready: &[usize]) -> TargetReport {
        let mut report = TargetReport::default();

        for slot in ready.iter().filter_map(|&i| self.slots.get(i)) {
            let passive = &slot.passive;
            for item in self.items_for(target, passive) {
                report.attempts += 1;
                match self.attempt_trigger(passive, target, &item) {
                    Ok(TriggerOutcome::Applied) => report.applied += 1,
                    Ok(outcome) => {
                        tracing::debug!(
                            capability = %passive.id(),
                            target_id = %target.id,
                            item = %item.item_id,
                            outcome = ?outcome,
                            "Passive not applied"
                        )
                    }
                    Err(e) => {
                        report.failures += 1;
                        tracing::error!(
                            capability = %e.capability(),
                            target_id = %target.id,
                            item = %item.item_id,
                            error = %e,
                            "Passive trigger failed"
                        );
                    }
                }
            }
        }

        Counters::bump(&self.counters.applied, report.applied as u64);
        Counters::bump(&self.counters.trigger_failures, report.failures as u64);
        report
    }

    /// Equipped items, plus inventory when the capability asks for it.
    /// Each item appears once.
    fn items_for(&self, target: &Target, passive: &PassiveCapability) -> Vec<EquippedItem> {
        let mut items = self.world.equipped_items(target, passive.id());
        if passive.scans_full_inventory() {
            items.extend(self.world.inventory_items(target, passive.id()));
        }
        let mut seen = HashSet::new();
        items.retain(|item| seen.insert(item.item_id));
        items
    }

    fn attempt_trigger(
        &self,
        passive: &PassiveCapability,
        target: &Target,
        item: &EquippedItem,
    ) -> Result<TriggerOutcome, TriggerError> {
        let capability = passive.capability();
        let id = passive.id();

        let attempt = || -> Result<TriggerOutcome, TriggerError> {
            let fail =
                |stage: TriggerStage| move |e: anyhow::Error| TriggerError::failed(id, stage, e);

            if !capability
                .is_available(target)
                .map_err(fail(TriggerStage::Availability))?
            {
                return Ok(TriggerOutcome::Unavailable);
            }
            if !capability
                .has_charges(item)
                .map_err(fail(TriggerStage::Charges))?
            {
                return Ok(TriggerOutcome::OutOfCharges);
            }

            let now = self.clock.now();
            if let Some(last) = self.ledger.get(item.item_id, id) {
                let elapsed = now.signed_duration_since(last).num_milliseconds();
                if elapsed < self.min_dwell_millis() {
                    return Ok(TriggerOutcome::Dwell);
                }
            }

            if !capability
                .trigger(target, item, item.level)
                .map_err(fail(TriggerStage::Trigger))?
            {
                return Ok(TriggerOutcome::NotApplied);
            }

            // Stamp before consuming so a failing consume cannot re-apply.
            if let Err(e) = self.ledger.set(item.item_id, id, now) {
                tracing::warn!(
                    capability = %id,
                    item = %item.item_id,
                    error = %e,
                    "Failed to record trigger time"
                );
            }
            capability
                .consume_charges(item, item.level)
                .map_err(fail(TriggerStage::Consume))?;
            Ok(TriggerOutcome::Applied)
        };

        isolate(attempt).unwrap_or_else(|message| {
            Err(TriggerError::Panicked {
                capability: passive.id().clone(),
                message,
            })
        })
    }

    fn min_dwell_millis(&self) -> i64 {
        i64::try_from(self.config.min_dwell.as_millis()).unwrap_or(i64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::clock::StepClock;
    use crate::infrastructure::item_store::InMemoryItemStore;
    use crate::infrastructure::manual_dispatcher::ManualDispatcher;
    use crate::infrastructure::ports::{
        Capability, MockCapability, MockWorldPort, WorldError,
    };
    use chrono::{TimeZone, Utc};
    use enchantry_domain::{
        CapabilityId, EquipmentSlot, ItemId, ItemLocation, RegionId, TargetId,
    };
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl CapturedLogs {
        fn count(&self, needle: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock()).matches(needle).count()
        }
    }

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for CapturedLogs {
        type Writer = Self;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    // -------------------------------------------------------------------------
    // Fakes
    // -------------------------------------------------------------------------

    #[derive(Default)]
    struct FakeWorld {
        players: Mutex<Vec<Target>>,
        npcs: Vec<Target>,
        region_safe: bool,
        equipped: Mutex<HashMap<TargetId, Vec<EquippedItem>>>,
        inventory: Mutex<HashMap<TargetId, Vec<EquippedItem>>>,
        invalid: Mutex<HashSet<TargetId>>,
        exploding: Mutex<HashSet<TargetId>>,
        exploding_snapshots: AtomicUsize,
        npc_calls: AtomicUsize,
    }

    impl FakeWorld {
        fn add_player(&self, items: Vec<EquippedItem>) -> Target {
            let target = Target::player(TargetId::new(), RegionId::new());
            self.players.lock().push(target.clone());
            self.equipped.lock().insert(target.id, items);
            target
        }
    }

    impl WorldPort for FakeWorld {
        fn online_players(&self) -> Vec<Target> {
            if self.exploding_snapshots.load(Ordering::SeqCst) > 0 {
                self.exploding_snapshots.fetch_sub(1, Ordering::SeqCst);
                panic!("world unavailable");
            }
            self.players.lock().clone()
        }

        fn non_player_targets(&self) -> Result<Vec<Target>, WorldError> {
            self.npc_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.npcs.clone())
        }

        fn supports_region_safe_enumeration(&self) -> bool {
            self.region_safe
        }

        fn equipped_items(&self, target: &Target, _: &CapabilityId) -> Vec<EquippedItem> {
            if self.exploding.lock().contains(&target.id) {
                panic!("entity data corrupted");
            }
            self.equipped
                .lock()
                .get(&target.id)
                .cloned()
                .unwrap_or_default()
        }

        fn inventory_items(&self, target: &Target, _: &CapabilityId) -> Vec<EquippedItem> {
            self.inventory
                .lock()
                .get(&target.id)
                .cloned()
                .unwrap_or_default()
        }
    }

    impl TargetLiveness for FakeWorld {
        fn is_valid(&self, target: &Target) -> bool {
            !self.invalid.lock().contains(&target.id)
        }

        fn current_region(&self, target: &Target) -> Option<RegionId> {
            Some(target.region)
        }
    }

    /// Applies once per charge; charges live here, keyed by item.
    struct ChargedEffect {
        id: CapabilityId,
        charges: Mutex<HashMap<ItemId, u32>>,
        applied: Mutex<Vec<(ItemId, u32)>>,
        failing: Mutex<HashSet<ItemId>>,
        panicking: Mutex<HashSet<ItemId>>,
    }

    impl ChargedEffect {
        fn new(id: &str) -> Self {
            Self {
                id: CapabilityId::new(id).unwrap(),
                charges: Mutex::default(),
                applied: Mutex::default(),
                failing: Mutex::default(),
                panicking: Mutex::default(),
            }
        }

        fn applied_to(&self) -> Vec<ItemId> {
            self.applied.lock().iter().map(|(item, _)| *item).collect()
        }
    }

    impl Capability for ChargedEffect {
        fn id(&self) -> &CapabilityId {
            &self.id
        }

        fn is_available(&self, _: &Target) -> anyhow::Result<bool> {
            Ok(true)
        }

        fn has_charges(&self, item: &EquippedItem) -> anyhow::Result<bool> {
            let stored = self.charges.lock().get(&item.item_id).copied();
            Ok(stored.or(item.charges).map_or(true, |c| c > 0))
        }

        fn trigger(&self, _: &Target, item: &EquippedItem, level: u32) -> anyhow::Result<bool> {
            if self.panicking.lock().contains(&item.item_id) {
                panic!("effect bug");
            }
            if self.failing.lock().contains(&item.item_id) {
                anyhow::bail!("no space to apply effect");
            }
            self.applied.lock().push((item.item_id, level));
            Ok(true)
        }

        fn consume_charges(&self, item: &EquippedItem, _: u32) -> anyhow::Result<()> {
            if let Some(start) = item.charges {
                let mut charges = self.charges.lock();
                let left = charges.entry(item.item_id).or_insert(start);
                *left = left.saturating_sub(1);
            }
            Ok(())
        }
    }

    struct Harness {
        world: Arc<FakeWorld>,
        dispatcher: Arc<ManualDispatcher>,
        clock: Arc<StepClock>,
        coordinator: PassiveEffectCoordinator,
    }

    impl Harness {
        /// One tick, then every job it scheduled.
        fn tick(&self) -> TickReport {
            let report = self.coordinator.tick();
            self.dispatcher.run_pending();
            report
        }
    }

    fn config() -> PassiveConfig {
        PassiveConfig {
            tick_interval: Duration::from_millis(1000),
            include_non_player_targets: false,
            min_dwell: Duration::from_millis(50),
        }
    }

    fn harness_with(
        world: FakeWorld,
        dispatcher: ManualDispatcher,
        passives: Vec<PassiveCapability>,
        config: PassiveConfig,
    ) -> Harness {
        let world = Arc::new(world);
        let dispatcher = Arc::new(dispatcher);
        let clock = Arc::new(StepClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        let coordinator = PassiveEffectCoordinator::new(
            passives,
            world.clone(),
            world.clone(),
            dispatcher.clone(),
            Arc::new(InMemoryItemStore::new()),
            clock.clone(),
            config,
        );
        Harness {
            world,
            dispatcher,
            clock,
            coordinator,
        }
    }

    fn harness(effect: &Arc<ChargedEffect>) -> Harness {
        let passive = PassiveCapability::new(effect.clone(), Duration::from_millis(1000));
        harness_with(
            FakeWorld::default(),
            ManualDispatcher::new(),
            vec![passive],
            config(),
        )
    }

    fn item(level: u32) -> EquippedItem {
        EquippedItem::new(
            ItemId::new(),
            "diamond_pickaxe",
            ItemLocation::Equipped(EquipmentSlot::MainHand),
            level,
        )
    }

    // -------------------------------------------------------------------------
    // Trigger attempts
    // -------------------------------------------------------------------------

    #[test]
    fn single_charge_applies_once() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let held = item(2).with_charges(1);
        h.world.add_player(vec![held.clone()]);

        h.tick();
        assert_eq!(*effect.applied.lock(), vec![(held.item_id, 2)]);
        assert_eq!(effect.charges.lock().get(&held.item_id), Some(&0));

        h.clock.advance(chrono::Duration::seconds(1));
        h.tick();
        assert_eq!(effect.applied.lock().len(), 1);
        assert_eq!(h.coordinator.stats().trigger_failures, 0);
        assert_eq!(h.coordinator.stats().applied, 1);
    }

    #[test]
    fn dwell_time_blocks_rapid_retriggers() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let passive = PassiveCapability::new(effect.clone(), Duration::from_millis(1000));
        let target = h.world.add_player(vec![]);
        let held = item(1).with_charges(5);

        let first = h.coordinator.attempt_trigger(&passive, &target, &held);
        h.clock.advance(chrono::Duration::milliseconds(10));
        let second = h.coordinator.attempt_trigger(&passive, &target, &held);

        assert_eq!(first, Ok(TriggerOutcome::Applied));
        assert_eq!(second, Ok(TriggerOutcome::Dwell));
        assert_eq!(effect.applied.lock().len(), 1);
        assert_eq!(effect.charges.lock().get(&held.item_id), Some(&4));

        h.clock.advance(chrono::Duration::milliseconds(40));
        let third = h.coordinator.attempt_trigger(&passive, &target, &held);
        assert_eq!(third, Ok(TriggerOutcome::Applied));
    }

    #[test]
    fn unavailable_capabilities_are_never_triggered() {
        let mut mock = MockCapability::new();
        mock.expect_id()
            .return_const(CapabilityId::new("night_vision").unwrap());
        mock.expect_is_available().returning(|_| Ok(false));
        mock.expect_trigger().times(0);
        mock.expect_consume_charges().times(0);
        let passive = PassiveCapability::new(Arc::new(mock), Duration::from_secs(1));

        let h = harness_with(
            FakeWorld::default(),
            ManualDispatcher::new(),
            vec![passive.clone()],
            config(),
        );
        let target = h.world.add_player(vec![]);

        let outcome = h.coordinator.attempt_trigger(&passive, &target, &item(1));
        assert_eq!(outcome, Ok(TriggerOutcome::Unavailable));
    }

    #[test]
    fn not_applied_does_not_consume_or_stamp() {
        let mut mock = MockCapability::new();
        mock.expect_id()
            .return_const(CapabilityId::new("saturation").unwrap());
        mock.expect_is_available().returning(|_| Ok(true));
        mock.expect_has_charges().returning(|_| Ok(true));
        mock.expect_trigger().times(2).returning(|_, _, _| Ok(false));
        mock.expect_consume_charges().times(0);
        let passive = PassiveCapability::new(Arc::new(mock), Duration::from_secs(1));

        let h = harness_with(
            FakeWorld::default(),
            ManualDispatcher::new(),
            vec![passive.clone()],
            config(),
        );
        let target = h.world.add_player(vec![]);
        let held = item(1);

        // No stamp, so the second attempt is not held back by dwell.
        for _ in 0..2 {
            let outcome = h.coordinator.attempt_trigger(&passive, &target, &held);
            assert_eq!(outcome, Ok(TriggerOutcome::NotApplied));
        }
    }

    #[test]
    fn availability_errors_become_trigger_errors() {
        let mut mock = MockCapability::new();
        mock.expect_id()
            .return_const(CapabilityId::new("regrowth").unwrap());
        mock.expect_is_available()
            .returning(|_| Err(anyhow::anyhow!("world not loaded")));
        let passive = PassiveCapability::new(Arc::new(mock), Duration::from_secs(1));

        let h = harness_with(
            FakeWorld::default(),
            ManualDispatcher::new(),
            vec![passive.clone()],
            config(),
        );
        let target = h.world.add_player(vec![]);

        let err = h
            .coordinator
            .attempt_trigger(&passive, &target, &item(1))
            .unwrap_err();
        assert!(matches!(
            err,
            TriggerError::Failed {
                stage: TriggerStage::Availability,
                ..
            }
        ));
    }

    // -------------------------------------------------------------------------
    // Failure isolation
    // -------------------------------------------------------------------------

    #[test]
    fn failing_unit_does_not_stop_its_neighbours() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let items = vec![item(1), item(1), item(1)];
        effect.failing.lock().insert(items[1].item_id);
        h.world.add_player(items.clone());

        h.tick();

        assert_eq!(effect.applied_to(), vec![items[0].item_id, items[2].item_id]);
        assert_eq!(h.coordinator.stats().trigger_failures, 1);
    }

    #[test]
    fn panicking_unit_does_not_stop_its_neighbours() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let items = vec![item(1), item(1), item(1)];
        effect.panicking.lock().insert(items[1].item_id);
        let target = h.world.add_player(items.clone());

        let report = h.coordinator.process_target(&target);

        assert_eq!(
            report,
            TargetReport {
                attempts: 3,
                applied: 2,
                failures: 1
            }
        );
        assert_eq!(effect.applied_to(), vec![items[0].item_id, items[2].item_id]);
    }

    #[test]
    fn failing_target_does_not_stop_other_targets() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let broken = h.world.add_player(vec![item(1)]);
        let fine_item = item(1);
        h.world.add_player(vec![fine_item.clone()]);
        h.world.exploding.lock().insert(broken.id);

        h.tick();

        assert_eq!(effect.applied_to(), vec![fine_item.item_id]);
        assert_eq!(h.coordinator.stats().target_failures, 1);
    }

    #[test]
    fn failing_tick_is_contained_and_the_next_one_runs() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        h.world.add_player(vec![item(1)]);
        h.world.exploding_snapshots.store(1, Ordering::SeqCst);

        let failed = h.tick();
        assert_eq!(failed, TickReport::default());
        assert_eq!(h.coordinator.stats().loop_failures, 1);

        let report = h.tick();
        assert_eq!(report.scheduled, 1);
        assert_eq!(effect.applied.lock().len(), 1);
    }

    #[test]
    fn dispatch_failure_skips_only_that_target() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let rejected = h.world.add_player(vec![item(1)]);
        h.world.add_player(vec![item(1)]);
        h.dispatcher.reject_target(rejected.id);

        let report = h.tick();

        assert_eq!(report.targets, 2);
        assert_eq!(report.scheduled, 1);
        assert_eq!(report.dispatch_failures, 1);
        assert_eq!(effect.applied.lock().len(), 1);
    }

    // -------------------------------------------------------------------------
    // Snapshot
    // -------------------------------------------------------------------------

    #[test]
    fn invalid_targets_are_not_dispatched() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let gone = h.world.add_player(vec![item(1)]);
        let here = h.world.add_player(vec![item(1)]);
        h.world.invalid.lock().insert(gone.id);

        h.tick();

        assert_eq!(h.dispatcher.affinity_submissions(), vec![here]);
    }

    #[test]
    fn sharded_host_without_safe_enumeration_degrades_to_players() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let mut world = MockWorldPort::new();
        let player = Target::player(TargetId::new(), RegionId::new());
        let players = vec![player.clone()];
        world
            .expect_online_players()
            .returning(move || players.clone());
        world
            .expect_supports_region_safe_enumeration()
            .return_const(false);
        world.expect_non_player_targets().times(0);
        world.expect_equipped_items().returning(|_, _| Vec::new());

        let coordinator = PassiveEffectCoordinator::new(
            vec![PassiveCapability::new(effect, Duration::from_secs(1))],
            Arc::new(world),
            Arc::new(FakeWorld::default()),
            Arc::new(ManualDispatcher::new().region_sharded()),
            Arc::new(InMemoryItemStore::new()),
            Arc::new(StepClock::new(Utc::now())),
            PassiveConfig {
                include_non_player_targets: true,
                ..config()
            },
        );

        let logs = CapturedLogs::default();
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            for _ in 0..3 {
                assert_eq!(coordinator.tick().targets, 1);
            }
        });

        assert_eq!(logs.count("cannot enumerate them safely"), 1);
    }

    #[test]
    fn non_players_are_included_when_enumeration_is_safe() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let npc = Target::non_player(TargetId::new(), RegionId::new());
        let world = FakeWorld {
            npcs: vec![npc.clone()],
            region_safe: true,
            ..FakeWorld::default()
        };
        let passive = PassiveCapability::new(effect, Duration::from_secs(1));
        let h = harness_with(
            world,
            ManualDispatcher::new().region_sharded(),
            vec![passive],
            PassiveConfig {
                include_non_player_targets: true,
                ..config()
            },
        );
        let player = h.world.add_player(vec![]);

        h.tick();

        assert_eq!(h.dispatcher.affinity_submissions(), vec![player, npc]);
    }

    #[test]
    fn non_players_are_skipped_unless_configured() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let world = FakeWorld {
            npcs: vec![Target::non_player(TargetId::new(), RegionId::new())],
            region_safe: true,
            ..FakeWorld::default()
        };
        let passive = PassiveCapability::new(effect, Duration::from_secs(1));
        let h = harness_with(world, ManualDispatcher::new(), vec![passive], config());

        h.tick();

        assert_eq!(h.world.npc_calls.load(Ordering::SeqCst), 0);
    }

    // -------------------------------------------------------------------------
    // Scheduling
    // -------------------------------------------------------------------------

    #[test]
    fn capabilities_run_on_their_own_period() {
        let fast = Arc::new(ChargedEffect::new("fast"));
        let slow = Arc::new(ChargedEffect::new("slow"));
        let passives = vec![
            PassiveCapability::new(fast.clone(), Duration::from_millis(1000)),
            PassiveCapability::new(slow.clone(), Duration::from_millis(2500)),
        ];
        let h = harness_with(FakeWorld::default(), ManualDispatcher::new(), passives, config());
        h.world.add_player(vec![item(1)]);

        let mut ready = Vec::new();
        for _ in 0..6 {
            h.clock.advance(chrono::Duration::seconds(1));
            ready.push(h.tick().ready_capabilities);
        }

        // 2500 ms rounds up to 3 ticks.
        assert_eq!(ready, vec![1, 1, 2, 1, 1, 2]);
        assert_eq!(fast.applied.lock().len(), 6);
        assert_eq!(slow.applied.lock().len(), 2);
    }

    #[test]
    fn full_inventory_scan_visits_each_item_once() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let passive = PassiveCapability::new(effect.clone(), Duration::from_millis(1000))
            .with_full_inventory_scan();
        let h = harness_with(
            FakeWorld::default(),
            ManualDispatcher::new(),
            vec![passive],
            config(),
        );
        let worn = item(1);
        let stored = EquippedItem::new(ItemId::new(), "iron_sword", ItemLocation::Inventory(12), 1);
        let target = h.world.add_player(vec![worn.clone()]);
        h.world
            .inventory
            .lock()
            .insert(target.id, vec![worn.clone(), stored.clone()]);

        let report = h.coordinator.process_target(&target);

        assert_eq!(report.attempts, 2);
        assert_eq!(effect.applied_to(), vec![worn.item_id, stored.item_id]);
    }

    #[test]
    fn equipped_only_scan_ignores_inventory() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        let target = h.world.add_player(vec![]);
        h.world.inventory.lock().insert(target.id, vec![item(1)]);

        assert_eq!(h.coordinator.process_target(&target).attempts, 0);
    }

    #[test]
    fn start_schedules_one_repeating_tick() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        h.world.add_player(vec![item(1)]);

        let handle = h.coordinator.start().unwrap().unwrap();
        let again = h.coordinator.start().unwrap().unwrap();
        assert_eq!(handle, again);
        assert_eq!(
            h.dispatcher.repeating_intervals(),
            vec![Duration::from_millis(1000)]
        );

        h.dispatcher.fire_repeating();
        h.dispatcher.run_pending();
        assert_eq!(effect.applied.lock().len(), 1);

        h.coordinator.shutdown();
        assert!(!handle.is_alive());
        assert_eq!(h.dispatcher.fire_repeating(), 0);
    }

    #[test]
    fn queued_target_jobs_do_nothing_after_shutdown() {
        let effect = Arc::new(ChargedEffect::new("self_repair"));
        let h = harness(&effect);
        h.world.add_player(vec![item(1)]);

        h.coordinator.start().unwrap().unwrap();
        assert_eq!(h.dispatcher.fire_repeating(), 1);
        assert_eq!(h.dispatcher.pending(), 1);

        h.coordinator.shutdown();
        h.dispatcher.run_pending();

        assert!(effect.applied.lock().is_empty());
        assert_eq!(h.coordinator.stats().applied, 0);
        assert_eq!(h.coordinator.stats().target_failures, 0);
    }

    #[test]
    fn start_without_passives_schedules_nothing() {
        let h = harness_with(FakeWorld::default(), ManualDispatcher::new(), vec![], config());

        assert_eq!(h.coordinator.start().unwrap(), None);
        assert!(h.dispatcher.repeating_intervals().is_empty());
        assert_eq!(h.coordinator.passive_count(), 0);
    }

    #[test]
    fn period_ticks_round_up() {
        let effect: Arc<dyn Capability> = Arc::new(ChargedEffect::new("x"));
        let tick = Duration::from_millis(1000);

        let period = |millis| PassiveCapability::new(effect.clone(), Duration::from_millis(millis));

        assert_eq!(period(0).period_ticks(tick), 1);
        assert_eq!(period(1000).period_ticks(tick), 1);
        assert_eq!(period(1001).period_ticks(tick), 2);
    }
}
