//! Top-level control loop
//!
//! A single cooperative worker owns every piece of state: the connection
//! supervisor, the time sync client, the clock, the display and both timers.
//! Nothing is shared, so nothing is locked.
//!
//! ## Startup
//! 1. Join the link (the only unbounded wait)
//! 2. One broker connect attempt
//! 3. One time fetch
//!
//! ## Steady state, in order, every pass
//! 1. Session down and reconnect cooldown elapsed: one connect attempt
//! 2. Session up and resync interval elapsed: one time fetch
//! 3. Pump the broker client
//! 4. Render the clock, write the display only if the digits changed
//! 5. Yield briefly
//!
//! Both timers are reset when they fire, whatever the outcome, so a failed
//! attempt waits a full period before the next one. Because the reconnect
//! check runs before the pump, a session established this pass is pumped
//! this pass.

use core::convert::Infallible;

use hal_abstractions::{BrokerSession, DelayNs, DisplaySink, HttpClient, LinkLayer, Monotonic};

use crate::clock::ClockModel;
use crate::config::{DeviceConfig, LoopConfig};
use crate::display::{DisplayTracker, DisplayUpdate};
use crate::error::LinkError;
use crate::logging::{info, warn};
use crate::supervisor::ConnectionSupervisor;
use crate::time_sync::TimeSyncClient;
use crate::timer::{ResyncTimer, RetryTimer};

/// Where the loop is in its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Phase {
    Startup,
    Steady,
}

/// What one steady-state pass did
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    pub reconnect_attempted: bool,
    pub resync_attempted: bool,
    pub messages_forwarded: usize,
    pub display_written: bool,
}

/// The device's control loop
pub struct ControlLoop<L, B, H, D, M> {
    supervisor: ConnectionSupervisor<L, B>,
    time_sync: TimeSyncClient<H>,
    clock: ClockModel,
    display: D,
    tracker: DisplayTracker,
    mono: M,
    retry: RetryTimer,
    resync: ResyncTimer,
    pacing: LoopConfig,
    phase: Phase,
}

impl<L, B, H, D, M> ControlLoop<L, B, H, D, M>
where
    L: LinkLayer,
    B: BrokerSession,
    H: HttpClient,
    D: DisplaySink,
    M: Monotonic,
{
    pub fn new(link: L, session: B, http: H, display: D, mono: M, config: &DeviceConfig) -> Self {
        Self {
            supervisor: ConnectionSupervisor::new(link, session, config),
            time_sync: TimeSyncClient::new(http, config.time_sync),
            clock: ClockModel::new(config.time_sync.default_utc_offset_secs),
            display,
            tracker: DisplayTracker::new(),
            mono,
            retry: RetryTimer::new(config.control.reconnect_cooldown_ms),
            resync: ResyncTimer::new(config.time_sync.resync_interval_ms),
            pacing: config.control,
            phase: Phase::Startup,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn supervisor(&self) -> &ConnectionSupervisor<L, B> {
        &self.supervisor
    }

    pub fn time_sync(&self) -> &TimeSyncClient<H> {
        &self.time_sync
    }

    pub fn clock(&self) -> &ClockModel {
        &self.clock
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Bring the link, the session and the clock up
    ///
    /// Only a capped link retry policy can make this fail. Session and time
    /// failures are logged and left to the steady-state timers.
    pub async fn startup<Dl: DelayNs>(&mut self, delay: &mut Dl) -> Result<(), LinkError> {
        info!("Control loop starting");
        self.supervisor.ensure_link_up(delay).await?;

        if let Err(e) = self.supervisor.ensure_session_up().await {
            warn!("Initial MQTT connection failed: {}", e);
        }

        if let Err(e) = self.time_sync.fetch_time(&mut self.clock, &self.mono).await {
            warn!("Initial time sync failed: {}", e);
        }

        let now = self.mono.now_ms();
        self.retry.reset(now);
        self.resync.reset(now);
        self.phase = Phase::Steady;
        info!("Control loop entering steady state");
        Ok(())
    }

    /// Run one steady-state pass, without the trailing yield
    pub async fn poll_once(&mut self) -> PassReport {
        let mut report = PassReport::default();
        let now = self.mono.now_ms();

        if !self.supervisor.is_session_active() && self.retry.is_due(now) {
            info!("Reconnecting MQTT");
            self.retry.reset(now);
            report.reconnect_attempted = true;
            if let Err(e) = self.supervisor.ensure_session_up().await {
                warn!(
                    "{}, will try again in {} ms",
                    e,
                    self.retry.period_ms()
                );
            }
        }

        if self.supervisor.is_session_active() && self.resync.is_due(now) {
            self.resync.reset(now);
            report.resync_attempted = true;
            if let Err(e) = self.time_sync.fetch_time(&mut self.clock, &self.mono).await {
                warn!("Time resync failed: {}", e);
            }
        }

        report.messages_forwarded = self.supervisor.pump(&mut self.display).await;

        let local = self.clock.advance(self.mono.now_ms());
        report.display_written = self.forward_time(local.hms().as_str());

        report
    }

    /// Write `formatted` to the display if it changed and is well-formed
    fn forward_time(&mut self, formatted: &str) -> bool {
        match self.tracker.observe(formatted) {
            DisplayUpdate::Unchanged => false,
            DisplayUpdate::Render(digits) => {
                self.display.show(digits.as_bytes(), false);
                true
            }
            DisplayUpdate::Rejected(e) => {
                warn!("Skipping display update for {}: {}", formatted, e);
                false
            }
        }
    }

    /// Start up, then pass forever
    ///
    /// Returns only if startup fails under a capped link retry policy.
    pub async fn run<Dl: DelayNs>(&mut self, delay: &mut Dl) -> Result<Infallible, LinkError> {
        self.startup(delay).await?;
        loop {
            self.poll_once().await;
            delay.delay_ms(self.pacing.yield_ms).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TimeSyncConfig;
    use crate::fakes::{
        FakeBroker, ManualClock, ManualDelay, RecordingDisplay, ScriptedHttp, ScriptedLink,
    };
    use crate::supervisor::ConnectionState;
    use embassy_futures::block_on;

    const TIME_BODY: &[u8] = br#"{"unixtime": 1732464068, "raw_offset": -18000}"#;

    type TestLoop = ControlLoop<ScriptedLink, FakeBroker, ScriptedHttp, RecordingDisplay, ManualClock>;

    struct Harness {
        control: TestLoop,
        broker: FakeBroker,
        clock: ManualClock,
        delay: ManualDelay,
    }

    fn harness(link: ScriptedLink, broker: FakeBroker, http: ScriptedHttp) -> Harness {
        let clock = ManualClock::new(0);
        let delay = ManualDelay::new(&clock);
        let control = ControlLoop::new(
            link,
            broker.clone(),
            http,
            RecordingDisplay::default(),
            clock.clone(),
            &DeviceConfig::default(),
        );
        Harness {
            control,
            broker,
            clock,
            delay,
        }
    }

    /// Harness already through startup at tick 10_000
    fn started(broker: FakeBroker, http: ScriptedHttp) -> Harness {
        let mut h = harness(ScriptedLink::already_up(), broker, http);
        h.clock.set(10_000);
        block_on(h.control.startup(&mut h.delay)).unwrap();
        h
    }

    #[test]
    fn test_startup_sequence() {
        let mut h = harness(
            ScriptedLink::succeeding_after(2),
            FakeBroker::default(),
            ScriptedHttp::responding(TIME_BODY),
        );
        assert_eq!(h.control.phase(), Phase::Startup);

        block_on(h.control.startup(&mut h.delay)).unwrap();

        assert_eq!(h.control.phase(), Phase::Steady);
        assert_eq!(h.control.supervisor().link().attempts, 3);
        assert_eq!(h.delay.delays_ms, vec![1000, 1000]);
        assert_eq!(h.control.supervisor().state(), ConnectionState::SessionActive);
        assert_eq!(h.broker.log().connects.len(), 1);
        assert_eq!(h.broker.log().publishes.len(), 1);
        assert!(h.control.clock().is_synced());
        assert_eq!(h.control.time_sync().http().requests.len(), 1);
    }

    #[test]
    fn test_startup_tolerates_session_and_time_failures() {
        let mut h = harness(
            ScriptedLink::already_up(),
            FakeBroker::rejecting(),
            ScriptedHttp::failing(),
        );
        block_on(h.control.startup(&mut h.delay)).unwrap();

        assert_eq!(h.control.phase(), Phase::Steady);
        assert_eq!(h.control.supervisor().state(), ConnectionState::LinkJoined);
        assert!(!h.control.clock().is_synced());
    }

    #[test]
    fn test_startup_fails_when_link_cap_reached() {
        let clock = ManualClock::new(0);
        let mut delay = ManualDelay::new(&clock);
        let mut config = DeviceConfig::default();
        config.link_retry.max_attempts = Some(2);
        let mut control = ControlLoop::new(
            ScriptedLink::never(),
            FakeBroker::default(),
            ScriptedHttp::responding(TIME_BODY),
            RecordingDisplay::default(),
            clock,
            &config,
        );

        assert_eq!(
            block_on(control.run(&mut delay)),
            Err(LinkError::AttemptsExhausted { attempts: 2 })
        );
        assert_eq!(control.phase(), Phase::Startup);
        assert!(control.supervisor().session().log().connects.is_empty());
    }

    #[test]
    fn test_no_reconnect_inside_cooldown() {
        let mut h = started(FakeBroker::rejecting(), ScriptedHttp::responding(TIME_BODY));
        assert_eq!(h.broker.log().connects.len(), 1);

        for d in [0, 1, 1000, 4999] {
            h.clock.set(10_000 + d);
            let report = block_on(h.control.poll_once());
            assert!(!report.reconnect_attempted, "reconnect after {} ms", d);
        }
        assert_eq!(h.broker.log().connects.len(), 1);
    }

    #[test]
    fn test_one_reconnect_per_elapsed_cooldown() {
        let mut h = started(FakeBroker::rejecting(), ScriptedHttp::responding(TIME_BODY));

        let polls_before = h.broker.log().polls;
        h.clock.set(15_000);
        assert!(block_on(h.control.poll_once()).reconnect_attempted);
        assert_eq!(h.broker.log().connects.len(), 2);
        // Pumped even though the attempt failed
        assert_eq!(h.broker.log().polls, polls_before + 1);

        // Failed attempt still restarted the cooldown
        let report = block_on(h.control.poll_once());
        assert!(!report.reconnect_attempted);
        h.clock.set(19_999);
        assert!(!block_on(h.control.poll_once()).reconnect_attempted);
        assert_eq!(h.broker.log().connects.len(), 2);

        h.clock.set(20_000);
        assert!(block_on(h.control.poll_once()).reconnect_attempted);
        assert_eq!(h.broker.log().connects.len(), 3);
    }

    #[test]
    fn test_reconnect_then_pump_in_same_pass() {
        let mut h = started(FakeBroker::rejecting(), ScriptedHttp::responding(TIME_BODY));
        h.broker.accept_all();
        h.broker.deliver("splitflap/text/set", b"HELLO");
        let polls_before = h.broker.log().polls;

        h.clock.set(15_000);
        let report = block_on(h.control.poll_once());

        assert!(report.reconnect_attempted);
        assert_eq!(h.broker.log().connects.len(), 2);
        assert_eq!(h.broker.log().polls, polls_before + 1);
        assert_eq!(report.messages_forwarded, 1);
        assert_eq!(h.control.display().writes[0], (b"HELLO".to_vec(), true));
        assert_eq!(h.control.supervisor().state(), ConnectionState::SessionActive);
    }

    #[test]
    fn test_active_session_is_not_reconnected() {
        let mut h = started(FakeBroker::default(), ScriptedHttp::responding(TIME_BODY));
        h.clock.set(60_000);
        assert!(!block_on(h.control.poll_once()).reconnect_attempted);
        assert_eq!(h.broker.log().connects.len(), 1);
    }

    #[test]
    fn test_dropped_session_reconnects_after_cooldown() {
        let mut h = started(FakeBroker::default(), ScriptedHttp::responding(TIME_BODY));
        h.broker.drop_connection();

        h.clock.set(60_000);
        assert!(block_on(h.control.poll_once()).reconnect_attempted);
        assert_eq!(h.control.supervisor().state(), ConnectionState::SessionActive);
        // Discovery is republished on every reconnection
        assert_eq!(h.broker.log().publishes.len(), 2);
    }

    #[test]
    fn test_resync_waits_for_interval() {
        let mut h = started(FakeBroker::default(), ScriptedHttp::responding(TIME_BODY));
        let interval = TimeSyncConfig::default().resync_interval_ms;

        h.clock.set(10_000 + interval - 1);
        let report = block_on(h.control.poll_once());
        assert!(!report.resync_attempted);
        assert!(report.display_written);
        assert_eq!(h.control.time_sync().http().requests.len(), 1);

        h.clock.set(10_000 + interval);
        assert!(block_on(h.control.poll_once()).resync_attempted);
        assert_eq!(h.control.time_sync().http().requests.len(), 2);
    }

    #[test]
    fn test_failed_resync_waits_full_interval() {
        let mut h = started(
            FakeBroker::default(),
            ScriptedHttp::responding(TIME_BODY).then_failing(),
        );
        let interval = TimeSyncConfig::default().resync_interval_ms;

        h.clock.set(10_000 + interval);
        assert!(block_on(h.control.poll_once()).resync_attempted);
        h.clock.set(10_000 + interval + 1000);
        assert!(!block_on(h.control.poll_once()).resync_attempted);
        h.clock.set(10_000 + 2 * interval);
        assert!(block_on(h.control.poll_once()).resync_attempted);
        assert_eq!(h.control.time_sync().http().requests.len(), 3);
        // Clock kept its first sync
        assert!(h.control.clock().is_synced());
    }

    #[test]
    fn test_no_resync_without_session() {
        let mut h = started(FakeBroker::rejecting(), ScriptedHttp::responding(TIME_BODY));
        let interval = TimeSyncConfig::default().resync_interval_ms;

        h.clock.set(10_000 + interval);
        let report = block_on(h.control.poll_once());
        assert!(report.reconnect_attempted);
        assert!(!report.resync_attempted);
        assert_eq!(h.control.time_sync().http().requests.len(), 1);
    }

    #[test]
    fn test_same_second_writes_display_once() {
        let mut h = started(FakeBroker::default(), ScriptedHttp::responding(TIME_BODY));

        let first = block_on(h.control.poll_once());
        h.clock.advance(400);
        let second = block_on(h.control.poll_once());
        assert!(first.display_written);
        assert!(!second.display_written);
        assert_eq!(h.control.display().clock_writes(), vec![&b"110108"[..]]);

        h.clock.advance(600);
        assert!(block_on(h.control.poll_once()).display_written);
        assert_eq!(
            h.control.display().clock_writes(),
            vec![&b"110108"[..], &b"110109"[..]]
        );
    }

    #[test]
    fn test_malformed_time_skips_display() {
        let mut h = started(FakeBroker::default(), ScriptedHttp::responding(TIME_BODY));

        assert!(!h.control.forward_time("1:01:08"));
        assert!(!h.control.forward_time("1:01:08"));
        assert!(h.control.display().writes.is_empty());
        assert!(h.control.forward_time("06:01:08"));
        assert_eq!(h.control.display().clock_writes(), vec![&b"060108"[..]]);
    }
}
