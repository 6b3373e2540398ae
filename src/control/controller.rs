use std::{collections::HashMap, sync::Arc};

use chrono::Utc;
use log::{debug, info, warn};
use tokio::sync::{broadcast, Mutex};

use crate::api::{ApiError, CampsiteApi, CampsiteState, Command, DeviceInfo, DeviceStatus, Utility};

use super::{BarrierMotion, ControlError, ControlEvent, ControlPhase, ControllerSettings, Scheduler};

const ALL_UTILITIES: [Utility; 3] = [Utility::Electricity, Utility::Water, Utility::Barrier];

/// Utilities a post-command reconciliation may overwrite. Barrier reports flap
/// shortly after a command, so the local barrier value is kept.
const RECONCILED_UTILITIES: [Utility; 2] = [Utility::Electricity, Utility::Water];

#[derive(Debug,Clone,Copy,Default)]
struct UtilitySlot {
    phase: ControlPhase,
    busy: bool,
    /// sequence number of the latest command dispatched for this utility
    last_seq: u64
}

struct SharedState {
    state: Option<CampsiteState>,
    slots: HashMap<Utility, UtilitySlot>,
    barrier_motion: BarrierMotion,
    seq: u64
}

impl SharedState {
    fn slot(&self, utility: Utility) -> UtilitySlot {
        self.slots.get(&utility).copied().unwrap_or_default()
    }

    fn slot_mut(&mut self, utility: Utility) -> &mut UtilitySlot {
        self.slots.entry(utility).or_default()
    }
}

/// Copy `include` utilities and the device record from `fresh` into `local`.
fn merge_state(local: &mut CampsiteState, fresh: &CampsiteState, include: &[Utility]) {
    for utility in include {
        local.set(*utility, fresh.get(*utility));
    }
    local.device = fresh.device.clone();
}

struct Inner {
    campsite_id: String,
    api: Arc<dyn CampsiteApi>,
    settings: ControllerSettings,
    /// shared state lock
    lock: Mutex<SharedState>,
    /// broadcasts control events
    events: broadcast::Sender<ControlEvent>,
    scheduler: Scheduler
}

impl Inner {
    fn emit(&self, evt: ControlEvent) {
        // ignore no-one listening error
        self.events.send(evt).unwrap_or(0);
    }

    fn check_device(&self, device: &DeviceInfo) -> Result<(), ControlError> {
        if device.status == DeviceStatus::Offline {
            return Err(ControlError::DeviceOffline);
        }
        if let (Some(stale_after), Some(last)) = (self.settings.stale_after, device.last_connected) {
            let silent = Utc::now().signed_duration_since(last).to_std().unwrap_or_default();
            if silent > stale_after {
                return Err(ControlError::DeviceStale(last));
            }
        }
        Ok(())
    }

    /// Check preconditions, then write the desired value into the local copy.
    /// Returns (previous, desired, seq).
    async fn project(&self, utility: Utility) -> Result<(bool, bool, u64), ControlError> {
        let mut ss = self.lock.lock().await;

        let previous = match &ss.state {
            None => return Err(ControlError::NotLoaded),
            Some(state) => {
                self.check_device(&state.device)?;
                state.get(utility)
            }
        };

        if ss.slot(utility).busy {
            return Err(ControlError::Busy(utility));
        }

        let desired = !previous;
        ss.seq += 1;
        let seq = ss.seq;

        let slot = ss.slot_mut(utility);
        slot.busy = true;
        slot.last_seq = seq;
        slot.phase = ControlPhase::InFlight { previous, desired };

        if let Some(state) = ss.state.as_mut() {
            state.set(utility, desired);
        }
        if utility == Utility::Barrier {
            ss.barrier_motion = if desired { BarrierMotion::Opening } else { BarrierMotion::Closing };
        }

        Ok((previous, desired, seq))
    }

    async fn accepted(&self, utility: Utility, seq: u64, desired: bool) {
        let mut ss = self.lock.lock().await;
        let slot = ss.slot_mut(utility);
        if slot.last_seq == seq {
            slot.phase = ControlPhase::AwaitingReconcile { desired };
        }
    }

    async fn rollback(&self, utility: Utility, seq: u64, previous: bool, err: &ApiError) {
        {
            let mut ss = self.lock.lock().await;
            if let Some(state) = ss.state.as_mut() {
                state.set(utility, previous);
            }
            let slot = ss.slot_mut(utility);
            if slot.last_seq == seq {
                slot.phase = ControlPhase::Idle;
            }
            if utility == Utility::Barrier {
                ss.barrier_motion = BarrierMotion::Idle;
            }
        }

        warn!("Command #{} {} on campsite {} failed, rolled back! ({})", seq, utility, self.campsite_id, err);
        self.emit(ControlEvent::RolledBack { utility, value: previous, reason: err.to_string() });
    }

    async fn reconcile(&self, utility: Utility, seq: u64) {
        debug!("Reconcile campsite {} after command #{}", self.campsite_id, seq);

        let fresh = self.api.fetch_state(&self.campsite_id).await;

        let mut ss = self.lock.lock().await;
        {
            let slot = ss.slot_mut(utility);
            if slot.last_seq == seq {
                slot.phase = ControlPhase::Idle;
            }
        }

        match fresh {
            Ok(fresh) => {
                // skip utilities with a newer command or a POST still pending
                let include: Vec<Utility> = RECONCILED_UTILITIES.iter()
                    .copied()
                    .filter(|u| {
                        let slot = ss.slot(*u);
                        slot.last_seq <= seq && !matches!(slot.phase, ControlPhase::InFlight { .. })
                    })
                    .collect();

                let mut state = ss.state.clone().unwrap_or_default();
                merge_state(&mut state, &fresh, &include);
                ss.state = Some(state.clone());
                drop(ss);

                if fresh.get(utility) != state.get(utility) {
                    info!("Campsite {} reports {}={}, local copy keeps {}", self.campsite_id, utility, fresh.get(utility), state.get(utility));
                }
                self.emit(ControlEvent::Reconciled { utility, state });
            },
            Err(err) => {
                drop(ss);
                warn!("Reconcile of campsite {} failed! ({})", self.campsite_id, err);
                self.emit(ControlEvent::ReconcileFailed { utility, reason: err.to_string() });
            }
        }
    }

    async fn clear_busy(&self, utility: Utility, seq: u64) {
        {
            let mut ss = self.lock.lock().await;
            let slot = ss.slot_mut(utility);
            if slot.last_seq != seq {
                return;
            }
            slot.busy = false;
            if utility == Utility::Barrier {
                ss.barrier_motion = BarrierMotion::Idle;
            }
        }

        debug!("{} ready on campsite {}", utility, self.campsite_id);
        self.emit(ControlEvent::BusyCleared { utility });
    }
}

/// Drives the utilities of one campsite. Clones share the same state; pending
/// timers are cancelled once the last clone is dropped.
#[derive(Clone)]
pub struct CampsiteController {
    inner: Arc<Inner>
}

impl CampsiteController {
    pub fn new(api: Arc<dyn CampsiteApi>, campsite_id: &str, settings: ControllerSettings) -> Self {
        let (evt_sender, _) = broadcast::channel::<ControlEvent>(128);
        CampsiteController {
            inner: Arc::new(Inner {
                campsite_id: campsite_id.to_string(),
                api: api,
                settings: settings,
                lock: Mutex::new(SharedState {
                    state: None,
                    slots: HashMap::new(),
                    barrier_motion: BarrierMotion::Idle,
                    seq: 0
                }),
                events: evt_sender,
                scheduler: Scheduler::new()
            })
        }
    }

    pub fn campsite_id(&self) -> &str {
        &self.inner.campsite_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.inner.events.subscribe()
    }

    /// Load authoritative state. Utilities with a command in progress keep
    /// their provisional value.
    pub async fn refresh(&self) -> Result<CampsiteState, ApiError> {
        let fresh = self.inner.api.fetch_state(&self.inner.campsite_id).await?;

        let state = {
            let mut ss = self.inner.lock.lock().await;
            let include: Vec<Utility> = ALL_UTILITIES.iter()
                .copied()
                .filter(|u| ss.slot(*u).phase == ControlPhase::Idle)
                .collect();

            let mut state = ss.state.clone().unwrap_or_else(|| fresh.clone());
            merge_state(&mut state, &fresh, &include);
            ss.state = Some(state.clone());
            state
        };

        self.inner.emit(ControlEvent::Refreshed { state: state.clone() });
        Ok(state)
    }

    /// Flip a utility. The new value shows immediately; the backend is
    /// queried again after the reconcile delay. Returns the requested value.
    pub async fn toggle(&self, utility: Utility) -> Result<bool, ControlError> {
        let kind = utility.command_type().ok_or(ControlError::ReadOnly(utility))?;
        let inner = &self.inner;

        let (previous, desired, seq) = match inner.project(utility).await {
            Ok(projection) => projection,
            Err(err) => {
                warn!("{} on campsite {} refused: {}", utility, inner.campsite_id, err);
                inner.emit(ControlEvent::Blocked { utility, reason: err.to_string() });
                return Err(err);
            }
        };

        info!("Command #{} set {}={} on campsite {}", seq, utility, desired, inner.campsite_id);
        inner.emit(ControlEvent::Projected { utility, value: desired });

        let command = Command { kind: kind, state: desired };
        let result = inner.api.send_command(&inner.campsite_id, &command).await;

        match result {
            Ok(()) => {
                inner.accepted(utility, seq, desired).await;

                let weak = Arc::downgrade(inner);
                inner.scheduler.schedule(inner.settings.reconcile_delay, async move {
                    if let Some(inner) = weak.upgrade() {
                        inner.reconcile(utility, seq).await;
                    }
                }).await;
                self.schedule_clear_busy(utility, seq).await;

                Ok(desired)
            },
            Err(err) => {
                inner.rollback(utility, seq, previous, &err).await;
                self.schedule_clear_busy(utility, seq).await;

                Err(ControlError::Command(err))
            }
        }
    }

    async fn schedule_clear_busy(&self, utility: Utility, seq: u64) {
        let weak = Arc::downgrade(&self.inner);
        self.inner.scheduler.schedule(self.inner.settings.busy_clear_delay, async move {
            if let Some(inner) = weak.upgrade() {
                inner.clear_busy(utility, seq).await;
            }
        }).await;
    }

    pub async fn state(&self) -> Option<CampsiteState> {
        self.inner.lock.lock().await.state.clone()
    }

    pub async fn is_busy(&self, utility: Utility) -> bool {
        self.inner.lock.lock().await.slot(utility).busy
    }

    pub async fn phase(&self, utility: Utility) -> ControlPhase {
        self.inner.lock.lock().await.slot(utility).phase
    }

    pub async fn barrier_motion(&self) -> BarrierMotion {
        self.inner.lock.lock().await.barrier_motion
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tokio::time::{sleep, Duration};

    use crate::api::CommandType;

    use super::*;

    struct FakeApi {
        state: std::sync::Mutex<CampsiteState>,
        commands: std::sync::Mutex<Vec<Command>>,
        fetches: AtomicUsize,
        fail_with: Option<u16>,
        fetch_fails: AtomicBool,
        /// backend applies accepted commands to its state
        apply_commands: bool,
        command_delay: Duration,
        /// only commands of this kind are delayed, all when `None`
        delayed_kind: Option<CommandType>
    }

    impl FakeApi {
        fn new(state: CampsiteState) -> Self {
            FakeApi {
                state: std::sync::Mutex::new(state),
                commands: std::sync::Mutex::new(Vec::new()),
                fetches: AtomicUsize::new(0),
                fail_with: None,
                fetch_fails: AtomicBool::new(false),
                apply_commands: true,
                command_delay: Duration::ZERO,
                delayed_kind: None
            }
        }

        fn commands(&self) -> Vec<Command> {
            self.commands.lock().unwrap().clone()
        }

        fn fetches(&self) -> usize {
            self.fetches.load(Ordering::SeqCst)
        }

        fn modify(&self, cb: impl FnOnce(&mut CampsiteState)) {
            cb(&mut self.state.lock().unwrap());
        }
    }

    #[async_trait]
    impl CampsiteApi for FakeApi {
        async fn fetch_state(&self, _campsite_id: &str) -> Result<CampsiteState, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fetch_fails.load(Ordering::SeqCst) {
                return Err(ApiError::Server { status: 503, message: "gateway busy".to_string() });
            }
            Ok(self.state.lock().unwrap().clone())
        }

        async fn send_command(&self, _campsite_id: &str, command: &Command) -> Result<(), ApiError> {
            if !self.command_delay.is_zero() && self.delayed_kind.map_or(true, |k| k == command.kind) {
                sleep(self.command_delay).await;
            }
            self.commands.lock().unwrap().push(command.clone());
            if let Some(status) = self.fail_with {
                return Err(ApiError::Server { status, message: "device unreachable".to_string() });
            }
            if self.apply_commands {
                let mut state = self.state.lock().unwrap();
                match command.kind {
                    CommandType::SetElectricity => state.electricity = command.state,
                    CommandType::SetBarrier => state.barrier = command.state
                }
            }
            Ok(())
        }
    }

    fn online() -> CampsiteState {
        CampsiteState {
            electricity: false,
            water: true,
            barrier: false,
            device: DeviceInfo { status: DeviceStatus::Online, last_connected: Some(Utc::now()) }
        }
    }

    async fn loaded(api: &Arc<FakeApi>, settings: ControllerSettings) -> CampsiteController {
        let ctl = CampsiteController::new(api.clone(), "c1", settings);
        ctl.refresh().await.unwrap();
        ctl
    }

    #[tokio::test(start_paused = true)]
    async fn electricity_on_is_confirmed_then_ready() {
        let api = Arc::new(FakeApi::new(online()));
        let ctl = loaded(&api, ControllerSettings::default()).await;
        let mut events = ctl.subscribe();

        assert!(ctl.toggle(Utility::Electricity).await.unwrap());
        assert!(ctl.state().await.unwrap().electricity);
        assert!(ctl.is_busy(Utility::Electricity).await);
        assert_eq!(ctl.phase(Utility::Electricity).await, ControlPhase::AwaitingReconcile { desired: true });
        assert_eq!(api.commands(), vec![Command { kind: CommandType::SetElectricity, state: true }]);
        assert_eq!(events.recv().await.unwrap(), ControlEvent::Projected { utility: Utility::Electricity, value: true });

        sleep(Duration::from_millis(2400)).await;
        assert_eq!(api.fetches(), 1);

        sleep(Duration::from_millis(200)).await;
        assert_eq!(api.fetches(), 2);
        assert!(ctl.state().await.unwrap().electricity);
        assert_eq!(ctl.phase(Utility::Electricity).await, ControlPhase::Idle);
        assert!(ctl.is_busy(Utility::Electricity).await);
        match events.recv().await.unwrap() {
            ControlEvent::Reconciled { utility: Utility::Electricity, state } => assert!(state.electricity),
            other => panic!("unexpected event {:?}", other)
        }

        sleep(Duration::from_millis(300)).await;
        assert!(ctl.is_busy(Utility::Electricity).await);

        sleep(Duration::from_millis(200)).await;
        assert!(!ctl.is_busy(Utility::Electricity).await);
        assert_eq!(events.recv().await.unwrap(), ControlEvent::BusyCleared { utility: Utility::Electricity });
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_takes_server_values_except_barrier() {
        let api = Arc::new(FakeApi { apply_commands: false, ..FakeApi::new(online()) });
        let ctl = loaded(&api, ControllerSettings::default()).await;

        // changed behind our back, barrier never reported open
        api.modify(|s| {
            s.electricity = true;
            s.water = false;
        });

        assert!(ctl.toggle(Utility::Barrier).await.unwrap());
        sleep(Duration::from_millis(2600)).await;

        let state = ctl.state().await.unwrap();
        assert!(state.barrier);
        assert!(state.electricity);
        assert!(!state.water);
    }

    #[tokio::test(start_paused = true)]
    async fn barrier_failure_rolls_back() {
        let api = Arc::new(FakeApi {
            fail_with: Some(500),
            command_delay: Duration::from_secs(1),
            ..FakeApi::new(online())
        });
        let ctl = loaded(&api, ControllerSettings::default()).await;
        let mut events = ctl.subscribe();
        let before = ctl.state().await.unwrap();

        let c = ctl.clone();
        let handle = tokio::spawn(async move { c.toggle(Utility::Barrier).await });

        sleep(Duration::from_millis(500)).await;
        assert!(ctl.state().await.unwrap().barrier);
        assert_eq!(ctl.barrier_motion().await, BarrierMotion::Opening);
        assert_eq!(ctl.phase(Utility::Barrier).await, ControlPhase::InFlight { previous: false, desired: true });

        match handle.await.unwrap() {
            Err(ControlError::Command(ApiError::Server { status: 500, .. })) => {},
            other => panic!("unexpected result {:?}", other)
        }

        assert_eq!(ctl.state().await.unwrap(), before);
        assert_eq!(ctl.barrier_motion().await, BarrierMotion::Idle);
        assert_eq!(ctl.phase(Utility::Barrier).await, ControlPhase::Idle);

        assert_eq!(events.recv().await.unwrap(), ControlEvent::Projected { utility: Utility::Barrier, value: true });
        match events.recv().await.unwrap() {
            ControlEvent::RolledBack { utility: Utility::Barrier, value: false, reason } => assert!(reason.contains("500")),
            other => panic!("unexpected event {:?}", other)
        }

        // busy until 3s after the failed POST settled at 1s
        sleep(Duration::from_millis(2900)).await;
        assert!(ctl.is_busy(Utility::Barrier).await);
        sleep(Duration::from_millis(200)).await;
        assert!(!ctl.is_busy(Utility::Barrier).await);

        // no reconciliation after a failure
        assert_eq!(api.fetches(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn offline_device_is_blocked_without_request() {
        let mut state = online();
        state.device.status = DeviceStatus::Offline;
        let api = Arc::new(FakeApi::new(state));
        let ctl = loaded(&api, ControllerSettings::default()).await;
        let mut events = ctl.subscribe();

        assert!(matches!(ctl.toggle(Utility::Electricity).await, Err(ControlError::DeviceOffline)));
        assert!(api.commands().is_empty());
        assert!(!ctl.is_busy(Utility::Electricity).await);
        assert!(!ctl.state().await.unwrap().electricity);
        match events.recv().await.unwrap() {
            ControlEvent::Blocked { utility: Utility::Electricity, reason } => assert_eq!(reason, "device is offline"),
            other => panic!("unexpected event {:?}", other)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stale_device_is_blocked_when_configured() {
        let mut state = online();
        state.device.last_connected = Some(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        let api = Arc::new(FakeApi::new(state));
        let settings = ControllerSettings { stale_after: Some(Duration::from_secs(600)), ..Default::default() };
        let ctl = loaded(&api, settings).await;

        assert!(matches!(ctl.toggle(Utility::Barrier).await, Err(ControlError::DeviceStale(_))));
        assert!(api.commands().is_empty());

        api.modify(|s| s.device.last_connected = Some(Utc::now()));
        ctl.refresh().await.unwrap();
        assert!(ctl.toggle(Utility::Barrier).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn read_only_and_unloaded_are_refused() {
        let api = Arc::new(FakeApi::new(online()));
        let ctl = CampsiteController::new(api.clone(), "c1", ControllerSettings::default());

        assert!(matches!(ctl.toggle(Utility::Electricity).await, Err(ControlError::NotLoaded)));
        assert!(matches!(ctl.toggle(Utility::Water).await, Err(ControlError::ReadOnly(Utility::Water))));

        ctl.refresh().await.unwrap();
        assert!(matches!(ctl.toggle(Utility::Water).await, Err(ControlError::ReadOnly(Utility::Water))));
        assert!(api.commands().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn busy_utility_refuses_second_toggle() {
        let api = Arc::new(FakeApi::new(online()));
        let ctl = loaded(&api, ControllerSettings::default()).await;

        ctl.toggle(Utility::Electricity).await.unwrap();
        assert!(matches!(ctl.toggle(Utility::Electricity).await, Err(ControlError::Busy(Utility::Electricity))));
        // other utilities are independent
        ctl.toggle(Utility::Barrier).await.unwrap();
        assert_eq!(api.commands().len(), 2);

        sleep(Duration::from_millis(3100)).await;
        assert!(!ctl.toggle(Utility::Electricity).await.unwrap());
        assert_eq!(api.commands().last(), Some(&Command { kind: CommandType::SetElectricity, state: false }));
    }

    #[tokio::test(start_paused = true)]
    async fn late_reconcile_keeps_newer_optimistic_value() {
        let api = Arc::new(FakeApi { apply_commands: false, ..FakeApi::new(online()) });
        let ctl = loaded(&api, ControllerSettings::default()).await;

        ctl.toggle(Utility::Barrier).await.unwrap();
        sleep(Duration::from_secs(1)).await;
        ctl.toggle(Utility::Electricity).await.unwrap();

        // barrier reconcile at 2.5s sees electricity still off on the server
        sleep(Duration::from_millis(1600)).await;
        assert_eq!(api.fetches(), 2);
        assert!(ctl.state().await.unwrap().electricity);

        // the electricity reconcile at 3.5s is authoritative
        sleep(Duration::from_secs(1)).await;
        assert_eq!(api.fetches(), 3);
        assert!(!ctl.state().await.unwrap().electricity);
    }

    #[tokio::test(start_paused = true)]
    async fn reconcile_of_other_utility_keeps_pending_value() {
        let api = Arc::new(FakeApi {
            command_delay: Duration::from_secs(5),
            delayed_kind: Some(CommandType::SetElectricity),
            ..FakeApi::new(online())
        });
        let ctl = loaded(&api, ControllerSettings::default()).await;

        let c = ctl.clone();
        let handle = tokio::spawn(async move { c.toggle(Utility::Electricity).await });
        sleep(Duration::from_millis(100)).await;
        ctl.toggle(Utility::Barrier).await.unwrap();

        // barrier reconcile at 2.6s, the electricity POST is still pending
        sleep(Duration::from_millis(2600)).await;
        assert_eq!(api.fetches(), 2);
        let state = ctl.state().await.unwrap();
        assert!(state.electricity);
        assert!(state.barrier);
        assert_eq!(ctl.phase(Utility::Electricity).await, ControlPhase::InFlight { previous: false, desired: true });

        assert!(handle.await.unwrap().unwrap());
        sleep(Duration::from_millis(2600)).await;
        assert_eq!(api.fetches(), 3);
        assert!(ctl.state().await.unwrap().electricity);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconcile_keeps_optimistic_value() {
        let api = Arc::new(FakeApi { apply_commands: false, ..FakeApi::new(online()) });
        let ctl = loaded(&api, ControllerSettings::default()).await;
        api.fetch_fails.store(true, Ordering::SeqCst);
        let mut events = ctl.subscribe();

        assert!(ctl.toggle(Utility::Electricity).await.unwrap());
        assert_eq!(events.recv().await.unwrap(), ControlEvent::Projected { utility: Utility::Electricity, value: true });

        sleep(Duration::from_millis(2600)).await;
        assert_eq!(api.fetches(), 2);
        assert!(ctl.state().await.unwrap().electricity);
        assert_eq!(ctl.phase(Utility::Electricity).await, ControlPhase::Idle);
        match events.recv().await.unwrap() {
            ControlEvent::ReconcileFailed { utility: Utility::Electricity, reason } => assert!(reason.contains("503")),
            other => panic!("unexpected event {:?}", other)
        }

        // no retry
        sleep(Duration::from_secs(10)).await;
        assert_eq!(api.fetches(), 2);
        assert!(ctl.state().await.unwrap().electricity);
        assert_eq!(events.recv().await.unwrap(), ControlEvent::BusyCleared { utility: Utility::Electricity });
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_keeps_value_of_command_in_flight() {
        let api = Arc::new(FakeApi { command_delay: Duration::from_secs(1), apply_commands: false, ..FakeApi::new(online()) });
        let ctl = loaded(&api, ControllerSettings::default()).await;

        let c = ctl.clone();
        let handle = tokio::spawn(async move { c.toggle(Utility::Electricity).await });
        sleep(Duration::from_millis(500)).await;

        api.modify(|s| s.barrier = true);
        let state = ctl.refresh().await.unwrap();
        assert!(state.electricity);
        assert!(state.barrier);

        handle.await.unwrap().unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_controller_cancels_pending_timers() {
        let api = Arc::new(FakeApi::new(online()));
        let ctl = loaded(&api, ControllerSettings::default()).await;

        ctl.toggle(Utility::Electricity).await.unwrap();
        drop(ctl);

        sleep(Duration::from_secs(5)).await;
        assert_eq!(api.fetches(), 1);
    }
}
