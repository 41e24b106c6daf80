//! Discovery manager orchestrating cache revalidation and subnet scans.
//!
//! A run moves `CheckingCache -> Scanning -> Found | Failed`, skipping the
//! scan when the cached address still answers. Only one run is active at a
//! time: starting a new run cancels the previous one, and every state or
//! cache write is checked against the current run generation under the
//! run-slot lock, so a superseded run can never publish.

use std::sync::{Arc, Mutex as StdMutex};

use tokio::sync::{Mutex, mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wakemate_discovery::{PlanError, Prober, ScanOutcome, ScanPlan, Scanner};

use crate::cache::AddressCache;
use crate::types::{DiscoveryConfig, DiscoveryEvent, DiscoveryPhase, DiscoveryState};

/// The currently active run, if any.
#[derive(Default)]
struct RunSlot {
    generation: u64,
    cancel: Option<CancellationToken>,
}

/// State shared between the manager and its run tasks.
struct Shared {
    prober: Arc<dyn Prober>,
    cache: Arc<dyn AddressCache>,
    config: DiscoveryConfig,
    plan: Arc<ScanPlan>,
    state_tx: watch::Sender<DiscoveryState>,
    events_tx: mpsc::Sender<DiscoveryEvent>,
    slot: StdMutex<RunSlot>,
}

/// Owns the discovery state and runs discovery on demand.
pub struct DiscoveryManager {
    shared: Arc<Shared>,
    events_rx: Mutex<Option<mpsc::Receiver<DiscoveryEvent>>>,
}

impl DiscoveryManager {
    /// Creates a manager. Fails if the configured scan plan is invalid.
    pub fn new(
        prober: Arc<dyn Prober>,
        cache: Arc<dyn AddressCache>,
        config: DiscoveryConfig,
    ) -> Result<Self, PlanError> {
        let plan = Arc::new(config.plan()?);
        let (events_tx, events_rx) = mpsc::channel(64);
        let (state_tx, _) = watch::channel(DiscoveryState::default());

        Ok(Self {
            shared: Arc::new(Shared {
                prober,
                cache,
                config,
                plan,
                state_tx,
                events_tx,
                slot: StdMutex::new(RunSlot::default()),
            }),
            events_rx: Mutex::new(Some(events_rx)),
        })
    }

    /// Takes the event receiver. Can only be called once.
    pub async fn take_events(&self) -> Option<mpsc::Receiver<DiscoveryEvent>> {
        self.events_rx.lock().await.take()
    }

    /// Returns the current state.
    pub fn state(&self) -> DiscoveryState {
        self.shared.state_tx.borrow().clone()
    }

    /// Returns a receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<DiscoveryState> {
        self.shared.state_tx.subscribe()
    }

    /// Returns the scan plan used by every run.
    pub fn plan(&self) -> &ScanPlan {
        &self.shared.plan
    }

    /// Starts a discovery run. Must be called within a Tokio runtime.
    ///
    /// Any run already in flight is cancelled first. Returns the new run's
    /// generation.
    pub fn start(&self) -> u64 {
        let Ok(mut slot) = self.shared.slot.lock() else {
            warn!("run slot poisoned, discovery not started");
            return 0;
        };
        let previous = slot.generation;
        if let Some(token) = slot.cancel.take() {
            token.cancel();
            self.shared.emit(DiscoveryEvent::Cancelled { run: previous });
            debug!(run = previous, "superseded active discovery run");
        }
        slot.generation = previous.wrapping_add(1);
        let generation = slot.generation;
        let cancel = CancellationToken::new();
        slot.cancel = Some(cancel.clone());

        self.shared.state_tx.send_replace(DiscoveryState::checking_cache());
        self.shared.emit(DiscoveryEvent::Started { run: generation });
        info!(run = generation, "discovery started");

        tokio::spawn(run_discovery(self.shared.clone(), generation, cancel));
        generation
    }

    /// Restarts discovery from the cache check, cancelling any active run.
    pub fn retry(&self) -> u64 {
        self.start()
    }

    /// Stops the active run, if any, and returns to `Idle`.
    pub fn cancel(&self) {
        let Ok(mut slot) = self.shared.slot.lock() else {
            return;
        };
        let Some(token) = slot.cancel.take() else {
            return;
        };
        token.cancel();
        let run = slot.generation;
        slot.generation = run.wrapping_add(1);

        self.shared.state_tx.send_modify(|s| {
            if !s.phase.is_terminal() {
                *s = DiscoveryState::default();
            }
        });
        self.shared.emit(DiscoveryEvent::Cancelled { run });
        debug!(run, "discovery cancelled");
    }

    /// Returns true while a run is searching.
    pub fn is_active(&self) -> bool {
        self.shared.state_tx.borrow().searching
    }

    /// Waits until the current run stops searching and returns its state.
    pub async fn wait_until_settled(&self) -> DiscoveryState {
        let mut rx = self.subscribe();
        match rx.wait_for(DiscoveryState::is_settled).await {
            Ok(state) => state.clone(),
            Err(_) => self.state(),
        }
    }
}

impl Drop for DiscoveryManager {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.shared.slot.lock()
            && let Some(token) = slot.cancel.take()
        {
            token.cancel();
        }
    }
}

impl Shared {
    /// Runs `f` only if `generation` is still the current run. The run-slot
    /// lock is held for the duration of `f`.
    fn if_current<R>(&self, generation: u64, f: impl FnOnce(&Self) -> R) -> Option<R> {
        let slot = self.slot.lock().ok()?;
        if slot.generation != generation || slot.cancel.is_none() {
            return None;
        }
        let result = f(self);
        drop(slot);
        Some(result)
    }

    /// Marks the run identified by `generation` as finished.
    fn finish(&self, generation: u64) {
        if let Ok(mut slot) = self.slot.lock()
            && slot.generation == generation
        {
            slot.cancel = None;
        }
    }

    fn emit(&self, event: DiscoveryEvent) {
        if let Err(e) = self.events_tx.try_send(event) {
            debug!("discovery event dropped: {e}");
        }
    }

    /// Probes the cached address. Returns it if still live; otherwise
    /// clears the cache. Storage failures count as a cache miss.
    async fn revalidate_cache(&self, generation: u64, cancel: &CancellationToken) -> Option<String> {
        let cached = match self.cache.load() {
            Ok(Some(address)) => address,
            Ok(None) => {
                debug!(run = generation, "no cached server address");
                return None;
            }
            Err(e) => {
                warn!(run = generation, error = %e, "failed to read cached server address");
                return None;
            }
        };

        debug!(run = generation, address = %cached, "revalidating cached address");
        let result = self
            .prober
            .probe(&cached, self.config.revalidate_timeout())
            .await;
        if cancel.is_cancelled() {
            return None;
        }

        let valid = result.success;
        self.if_current(generation, |shared| {
            shared.emit(DiscoveryEvent::CacheChecked {
                address: cached.clone(),
                valid,
            });
            if !valid {
                info!(address = %cached, reason = %result.message, "cached address no longer valid");
                if let Err(e) = shared.cache.clear() {
                    warn!(error = %e, "failed to clear cached server address");
                }
            }
        })?;

        valid.then_some(cached)
    }
}

/// One discovery run from cache check to a terminal state.
async fn run_discovery(shared: Arc<Shared>, generation: u64, cancel: CancellationToken) {
    if let Some(address) = shared.revalidate_cache(generation, &cancel).await {
        shared.if_current(generation, |s| {
            s.state_tx.send_modify(|st| st.found(address.clone()));
            s.emit(DiscoveryEvent::Found {
                address: address.clone(),
                from_cache: true,
            });
            info!(run = generation, address = %address, "using cached server address");
        });
        shared.finish(generation);
        return;
    }

    let started = shared.if_current(generation, |s| {
        s.state_tx.send_modify(|st| st.phase = DiscoveryPhase::Scanning);
        s.emit(DiscoveryEvent::ScanStarted);
    });
    if started.is_none() {
        return;
    }

    let scanner = Scanner::new(shared.prober.clone()).with_timeout(shared.config.scan_timeout());
    let outcome = scanner
        .scan(&shared.plan, &cancel, |progress| {
            shared.if_current(generation, |s| {
                let mut subnet_changed = false;
                s.state_tx.send_modify(|st| {
                    if st.current_subnet.as_deref() != Some(progress.subnet.as_str()) {
                        st.current_subnet = Some(progress.subnet.clone());
                        subnet_changed = true;
                    }
                    st.progress_percent = progress.percent;
                });
                if subnet_changed {
                    s.emit(DiscoveryEvent::SubnetChanged {
                        subnet: progress.subnet.clone(),
                    });
                }
            });
        })
        .await;

    match outcome {
        ScanOutcome::Found(address) => {
            shared.if_current(generation, |s| {
                if let Err(e) = s.cache.save(&address) {
                    warn!(address = %address, error = %e, "failed to persist server address");
                }
                s.state_tx.send_modify(|st| st.found(address.clone()));
                s.emit(DiscoveryEvent::Found {
                    address: address.clone(),
                    from_cache: false,
                });
            });
        }
        ScanOutcome::Exhausted => {
            shared.if_current(generation, |s| {
                s.state_tx.send_modify(DiscoveryState::fail);
                s.emit(DiscoveryEvent::Failed);
                warn!(run = generation, "no server found on the network");
            });
        }
        ScanOutcome::Cancelled => return,
    }
    shared.finish(generation);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    use tokio::sync::Notify;
    use wakemate_discovery::ProbeResult;

    use crate::cache::MemoryAddressCache;
    use crate::store::StoreError;

    /// Blocks the first probe of one address until released.
    struct Gate {
        address: String,
        armed: AtomicBool,
        reached: Arc<Notify>,
        release: Arc<Notify>,
    }

    /// Prober that succeeds only for listed addresses and records every call.
    struct ScriptedProber {
        live: HashSet<String>,
        calls: StdMutex<Vec<String>>,
        gate: Option<Gate>,
    }

    impl ScriptedProber {
        fn new(live: &[&str]) -> Self {
            Self {
                live: live.iter().map(|s| s.to_string()).collect(),
                calls: StdMutex::new(Vec::new()),
                gate: None,
            }
        }

        fn gated(live: &[&str], address: &str) -> (Self, Arc<Notify>, Arc<Notify>) {
            let reached = Arc::new(Notify::new());
            let release = Arc::new(Notify::new());
            let mut prober = Self::new(live);
            prober.gate = Some(Gate {
                address: address.into(),
                armed: AtomicBool::new(true),
                reached: reached.clone(),
                release: release.clone(),
            });
            (prober, reached, release)
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl Prober for ScriptedProber {
        fn probe<'a>(
            &'a self,
            address: &'a str,
            _timeout: Duration,
        ) -> Pin<Box<dyn Future<Output = ProbeResult> + Send + 'a>> {
            Box::pin(async move {
                self.calls.lock().unwrap().push(address.to_string());
                if let Some(gate) = &self.gate
                    && gate.address == address
                    && gate.armed.swap(false, Ordering::SeqCst)
                {
                    gate.reached.notify_one();
                    gate.release.notified().await;
                }
                if self.live.contains(address) {
                    ProbeResult::online("ok")
                } else {
                    ProbeResult::offline("refused")
                }
            })
        }
    }

    /// Cache whose storage always fails.
    struct BrokenCache;

    impl AddressCache for BrokenCache {
        fn load(&self) -> Result<Option<String>, StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk unavailable")))
        }

        fn save(&self, _address: &str) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk unavailable")))
        }

        fn clear(&self) -> Result<(), StoreError> {
            Err(StoreError::Io(std::io::Error::other("disk unavailable")))
        }
    }

    fn manager(
        prober: Arc<ScriptedProber>,
        cache: Arc<dyn AddressCache>,
        config: DiscoveryConfig,
    ) -> DiscoveryManager {
        DiscoveryManager::new(prober, cache, config).unwrap()
    }

    fn drain(rx: &mut mpsc::Receiver<DiscoveryEvent>) -> Vec<DiscoveryEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e);
        }
        events
    }

    #[tokio::test]
    async fn new_manager_is_idle() {
        let mgr = manager(
            Arc::new(ScriptedProber::new(&[])),
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        assert_eq!(mgr.state(), DiscoveryState::default());
        assert!(!mgr.is_active());
        assert_eq!(mgr.plan().subnets().len(), 8);
    }

    #[tokio::test]
    async fn take_events_once() {
        let mgr = manager(
            Arc::new(ScriptedProber::new(&[])),
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        assert!(mgr.take_events().await.is_some());
        assert!(mgr.take_events().await.is_none());
    }

    #[test]
    fn invalid_config_rejected() {
        let config = DiscoveryConfig {
            priority_hosts: vec![0],
            ..DiscoveryConfig::default()
        };
        let result = DiscoveryManager::new(
            Arc::new(ScriptedProber::new(&[])),
            Arc::new(MemoryAddressCache::new()),
            config,
        );
        assert!(matches!(result, Err(PlanError::InvalidHost(0))));
    }

    #[tokio::test]
    async fn valid_cached_address_skips_scan() {
        let prober = Arc::new(ScriptedProber::new(&["10.0.0.50"]));
        let cache = Arc::new(MemoryAddressCache::with_address("10.0.0.50"));
        let mgr = manager(prober.clone(), cache.clone(), DiscoveryConfig::default());
        let mut events = mgr.take_events().await.unwrap();

        mgr.start();
        let state = mgr.wait_until_settled().await;

        assert_eq!(state.server_address.as_deref(), Some("10.0.0.50"));
        assert_eq!(state.phase, DiscoveryPhase::Found);
        assert_eq!(prober.calls(), vec!["10.0.0.50"]);
        assert_eq!(cache.load().unwrap().as_deref(), Some("10.0.0.50"));
        assert_eq!(
            drain(&mut events),
            vec![
                DiscoveryEvent::Started { run: 1 },
                DiscoveryEvent::CacheChecked {
                    address: "10.0.0.50".into(),
                    valid: true
                },
                DiscoveryEvent::Found {
                    address: "10.0.0.50".into(),
                    from_cache: true
                },
            ]
        );
    }

    #[tokio::test]
    async fn stale_cache_falls_back_to_scan() {
        let prober = Arc::new(ScriptedProber::new(&["192.168.1.1"]));
        let cache = Arc::new(MemoryAddressCache::with_address("10.0.0.50"));
        let mgr = manager(prober.clone(), cache.clone(), DiscoveryConfig::default());

        mgr.start();
        let state = mgr.wait_until_settled().await;

        assert_eq!(state.server_address.as_deref(), Some("192.168.1.1"));
        assert!(!state.searching);
        assert!(!state.failed);
        assert_eq!(state.current_subnet.as_deref(), Some("192.168.1."));
        assert_eq!(cache.load().unwrap().as_deref(), Some("192.168.1.1"));

        let calls = prober.calls();
        assert_eq!(calls[0], "10.0.0.50");
        assert_eq!(calls[1], "10.0.0.1");
        assert_eq!(calls.last().unwrap(), "192.168.1.1");
        assert_eq!(calls.len(), 1 + 254 * 2 + 1);
    }

    #[tokio::test]
    async fn exhausted_scan_fails_and_clears_cache() {
        let prober = Arc::new(ScriptedProber::new(&[]));
        let cache = Arc::new(MemoryAddressCache::with_address("10.0.0.50"));
        let mgr = manager(prober.clone(), cache.clone(), DiscoveryConfig::default());
        let mut events = mgr.take_events().await.unwrap();

        mgr.start();
        let state = mgr.wait_until_settled().await;

        assert!(state.failed);
        assert!(!state.searching);
        assert!(state.server_address.is_none());
        assert_eq!(state.phase, DiscoveryPhase::Failed);
        assert_eq!(state.current_subnet.as_deref(), Some("10.0.1."));
        assert_eq!(state.progress_percent, 100);
        assert!(cache.load().unwrap().is_none());
        assert_eq!(prober.calls().len(), 1 + 254 * 8);

        let events = drain(&mut events);
        assert_eq!(events.last(), Some(&DiscoveryEvent::Failed));
        let subnets: Vec<&DiscoveryEvent> = events
            .iter()
            .filter(|e| matches!(e, DiscoveryEvent::SubnetChanged { .. }))
            .collect();
        assert_eq!(subnets.len(), 8);
    }

    #[tokio::test]
    async fn storage_failure_is_a_cache_miss() {
        let prober = Arc::new(ScriptedProber::new(&["10.0.0.1"]));
        let mgr = manager(prober.clone(), Arc::new(BrokenCache), DiscoveryConfig::default());

        mgr.start();
        let state = mgr.wait_until_settled().await;

        assert_eq!(state.server_address.as_deref(), Some("10.0.0.1"));
        assert_eq!(prober.calls(), vec!["10.0.0.1"]);
    }

    #[tokio::test]
    async fn retry_mid_scan_yields_single_terminal_event() {
        let (prober, reached, release) = ScriptedProber::gated(&["192.168.1.1"], "10.0.0.100");
        let prober = Arc::new(prober);
        let mgr = manager(
            prober.clone(),
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        let mut events = mgr.take_events().await.unwrap();

        assert_eq!(mgr.start(), 1);
        reached.notified().await;
        assert_eq!(mgr.state().phase, DiscoveryPhase::Scanning);

        assert_eq!(mgr.retry(), 2);
        let state = mgr.state();
        assert_eq!(state.phase, DiscoveryPhase::CheckingCache);
        assert_eq!(state.progress_percent, 0);
        assert!(state.current_subnet.is_none());

        release.notify_one();
        let state = mgr.wait_until_settled().await;
        assert_eq!(state.server_address.as_deref(), Some("192.168.1.1"));

        // Give the superseded run time to observe its cancellation.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(mgr.state(), state);

        let events = drain(&mut events);
        let terminal: Vec<&DiscoveryEvent> = events.iter().filter(|e| e.is_terminal()).collect();
        assert_eq!(
            terminal,
            vec![&DiscoveryEvent::Found {
                address: "192.168.1.1".into(),
                from_cache: false
            }]
        );
        assert!(events.contains(&DiscoveryEvent::Cancelled { run: 1 }));
    }

    #[tokio::test]
    async fn retry_after_failure_revalidates_cache_first() {
        let prober = Arc::new(ScriptedProber::new(&["172.16.0.9"]));
        let cache = Arc::new(MemoryAddressCache::new());
        let config = DiscoveryConfig {
            subnets: vec!["10.0.0.".into()],
            ..DiscoveryConfig::default()
        };
        let mgr = manager(prober.clone(), cache.clone(), config);

        mgr.start();
        assert!(mgr.wait_until_settled().await.failed);

        cache.save("172.16.0.9").unwrap();
        mgr.retry();
        let state = mgr.wait_until_settled().await;

        assert_eq!(state.server_address.as_deref(), Some("172.16.0.9"));
        assert!(!state.failed);
        assert_eq!(prober.calls().len(), 254 + 1);
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_without_terminal_event() {
        let (prober, reached, release) = ScriptedProber::gated(&["10.0.0.2"], "10.0.0.1");
        let prober = Arc::new(prober);
        let mgr = manager(
            prober.clone(),
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        let mut events = mgr.take_events().await.unwrap();

        mgr.start();
        reached.notified().await;
        mgr.cancel();
        assert_eq!(mgr.state(), DiscoveryState::default());

        release.notify_one();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(mgr.state(), DiscoveryState::default());
        assert_eq!(prober.calls(), vec!["10.0.0.1"]);
        let events = drain(&mut events);
        assert!(!events.iter().any(DiscoveryEvent::is_terminal));
        assert_eq!(events.last(), Some(&DiscoveryEvent::Cancelled { run: 1 }));
    }

    #[tokio::test]
    async fn cancel_without_active_run_is_noop() {
        let mgr = manager(
            Arc::new(ScriptedProber::new(&[])),
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        let mut events = mgr.take_events().await.unwrap();
        mgr.cancel();
        assert!(drain(&mut events).is_empty());
    }

    #[tokio::test]
    async fn subscribers_observe_progress() {
        let prober = Arc::new(ScriptedProber::new(&["192.168.0.2"]));
        let mgr = manager(
            prober,
            Arc::new(MemoryAddressCache::new()),
            DiscoveryConfig::default(),
        );
        let mut rx = mgr.subscribe();

        mgr.start();
        let state = rx
            .wait_for(|s| s.current_subnet.as_deref() == Some("192.168.0.") || !s.searching)
            .await
            .unwrap()
            .clone();
        assert_eq!(state.current_subnet.as_deref(), Some("192.168.0."));

        let state = mgr.wait_until_settled().await;
        assert_eq!(state.progress_percent, 0);
        assert_eq!(state.server_address.as_deref(), Some("192.168.0.2"));
    }
}
