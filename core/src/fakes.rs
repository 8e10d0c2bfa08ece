//! Scripted collaborators for unit tests
//!
//! Broker and link state live behind `Rc<RefCell<_>>` handles so a test can
//! keep observing (and poking) them after ownership moves into the loop.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use hal_abstractions::network::status;
use hal_abstractions::{
    BrokerSession, Credentials, DelayNs, DisplaySink, HttpClient, HttpResponse, InboundHandler,
    LinkLayer, Monotonic,
};

/// Millisecond tick source moved by hand
#[derive(Clone, Default)]
pub struct ManualClock(Rc<Cell<u64>>);

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self(Rc::new(Cell::new(start_ms)))
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }
}

impl Monotonic for ManualClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

/// Delay that advances a [`ManualClock`] instead of sleeping
pub struct ManualDelay {
    clock: ManualClock,
    pub delays_ms: Vec<u32>,
}

impl ManualDelay {
    pub fn new(clock: &ManualClock) -> Self {
        Self {
            clock: clock.clone(),
            delays_ms: Vec::new(),
        }
    }
}

impl DelayNs for ManualDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.clock.advance(u64::from(ns / 1_000_000));
    }

    async fn delay_ms(&mut self, ms: u32) {
        self.delays_ms.push(ms);
        self.clock.advance(u64::from(ms));
    }
}

/// Link layer that joins on attempt `fail_first + 1`
pub struct ScriptedLink {
    fail_first: u32,
    pub attempts: u32,
    up: bool,
}

impl ScriptedLink {
    pub fn succeeding_after(fail_first: u32) -> Self {
        Self {
            fail_first,
            attempts: 0,
            up: false,
        }
    }

    pub fn already_up() -> Self {
        Self {
            fail_first: 0,
            attempts: 0,
            up: true,
        }
    }

    pub fn never() -> Self {
        Self::succeeding_after(u32::MAX)
    }
}

impl LinkLayer for ScriptedLink {
    type Error = ();

    async fn join(&mut self) -> Result<(), ()> {
        self.attempts += 1;
        if self.attempts > self.fail_first {
            self.up = true;
            Ok(())
        } else {
            Err(())
        }
    }

    fn is_up(&self) -> bool {
        self.up
    }
}

/// Everything the fake broker observed
#[derive(Default)]
pub struct BrokerLog {
    /// Outcome of upcoming connect attempts; empty means accept
    pub connect_script: VecDeque<bool>,
    pub reject_subscribe: bool,
    pub connected: bool,
    pub status: i32,
    pub connects: Vec<(String, String, String)>,
    pub subscriptions: Vec<String>,
    pub publishes: Vec<(String, Vec<u8>, bool)>,
    pub polls: usize,
    /// Messages delivered on the next poll while connected
    pub inbox: VecDeque<(String, Vec<u8>)>,
}

#[derive(Clone, Default)]
pub struct FakeBroker(pub Rc<RefCell<BrokerLog>>);

impl FakeBroker {
    pub fn rejecting() -> Self {
        let broker = Self::default();
        broker.reject_next(usize::from(u8::MAX));
        broker
    }

    pub fn reject_next(&self, n: usize) {
        let mut log = self.0.borrow_mut();
        log.connect_script.clear();
        log.connect_script.extend(core::iter::repeat(false).take(n));
    }

    pub fn accept_all(&self) {
        self.0.borrow_mut().connect_script.clear();
    }

    pub fn drop_connection(&self) {
        let mut log = self.0.borrow_mut();
        log.connected = false;
        log.status = status::CONNECTION_LOST;
    }

    pub fn deliver(&self, topic: &str, payload: &[u8]) {
        self.0
            .borrow_mut()
            .inbox
            .push_back((topic.to_string(), payload.to_vec()));
    }

    pub fn log(&self) -> std::cell::Ref<'_, BrokerLog> {
        self.0.borrow()
    }
}

impl BrokerSession for FakeBroker {
    type Error = i32;

    async fn connect(&mut self, credentials: &Credentials<'_>) -> Result<(), i32> {
        let mut log = self.0.borrow_mut();
        log.connects.push((
            credentials.client_id.to_string(),
            credentials.username.to_string(),
            credentials.password.to_string(),
        ));
        if log.connect_script.pop_front().unwrap_or(true) {
            log.connected = true;
            log.status = status::CONNECTED;
            Ok(())
        } else {
            log.connected = false;
            log.status = status::CONNECT_FAILED;
            Err(status::CONNECT_FAILED)
        }
    }

    fn is_connected(&self) -> bool {
        self.0.borrow().connected
    }

    fn status_code(&self) -> i32 {
        self.0.borrow().status
    }

    async fn subscribe(&mut self, topic: &str) -> Result<(), i32> {
        let mut log = self.0.borrow_mut();
        if log.reject_subscribe {
            return Err(-1);
        }
        log.subscriptions.push(topic.to_string());
        Ok(())
    }

    async fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), i32> {
        self.0
            .borrow_mut()
            .publishes
            .push((topic.to_string(), payload.to_vec(), retain));
        Ok(())
    }

    async fn poll<H: InboundHandler>(&mut self, handler: &mut H) -> Result<(), i32> {
        let pending: Vec<(String, Vec<u8>)> = {
            let mut log = self.0.borrow_mut();
            log.polls += 1;
            if !log.connected {
                return Ok(());
            }
            log.inbox.drain(..).collect()
        };
        for (topic, payload) in pending {
            handler.on_message(&topic, &payload);
        }
        Ok(())
    }
}

/// HTTP client replaying canned replies; the last reply repeats
pub struct ScriptedHttp {
    replies: Vec<Option<Vec<u8>>>,
    pub requests: Vec<(String, String)>,
}

impl ScriptedHttp {
    pub fn responding(body: &[u8]) -> Self {
        Self {
            replies: vec![Some(body.to_vec())],
            requests: Vec::new(),
        }
    }

    pub fn failing() -> Self {
        Self {
            replies: vec![None],
            requests: Vec::new(),
        }
    }

    pub fn then_failing(mut self) -> Self {
        self.replies.push(None);
        self
    }
}

impl HttpClient for ScriptedHttp {
    type Error = ();

    async fn get(&mut self, url: &str, accept: &str, body: &mut [u8]) -> Result<HttpResponse, ()> {
        let index = self.requests.len().min(self.replies.len() - 1);
        self.requests.push((url.to_string(), accept.to_string()));
        match &self.replies[index] {
            Some(reply) => {
                let len = reply.len().min(body.len());
                body[..len].copy_from_slice(&reply[..len]);
                Ok(HttpResponse {
                    status: 200,
                    body_len: len,
                })
            }
            None => Err(()),
        }
    }
}

/// Display sink keeping every write
#[derive(Default)]
pub struct RecordingDisplay {
    pub writes: Vec<(Vec<u8>, bool)>,
}

impl RecordingDisplay {
    /// Writes made with the full-rotation flag cleared (clock updates)
    pub fn clock_writes(&self) -> Vec<&[u8]> {
        self.writes
            .iter()
            .filter(|(_, full)| !*full)
            .map(|(text, _)| text.as_slice())
            .collect()
    }
}

impl DisplaySink for RecordingDisplay {
    fn show(&mut self, text: &[u8], force_full_rotation: bool) {
        self.writes.push((text.to_vec(), force_full_rotation));
    }
}
