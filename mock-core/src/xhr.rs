//! Interception for XMLHttpRequest-style handles
//!
//! An [`XhrHandle`] is opened, then sent. The interceptor records the
//! open-time method and URL in a side table keyed by the handle id, and at
//! send time either completes the handle with a synthetic response on a
//! deferred task or hands it to the original transport.

use crate::engine::{InterceptionEngine, Resolution};
use crate::scheduler::Scheduler;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tracing::debug;
use uuid::Uuid;

/// Identity of a request handle
pub type XhrId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[repr(u8)]
pub enum ReadyState {
    #[default]
    Unsent = 0,
    Opened = 1,
    HeadersReceived = 2,
    Loading = 3,
    Done = 4,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XhrEventKind {
    ReadyStateChange,
    Load,
    LoadEnd,
}

impl XhrEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            XhrEventKind::ReadyStateChange => "readystatechange",
            XhrEventKind::Load => "load",
            XhrEventKind::LoadEnd => "loadend",
        }
    }
}

impl fmt::Display for XhrEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Observable state of a handle
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct XhrState {
    pub ready_state: ReadyState,
    pub status: u16,
    pub status_text: String,
    pub response_url: String,
    pub response: String,
    pub response_text: String,
}

type Listener = Arc<dyn Fn(&XhrHandle) + Send + Sync>;

struct XhrInner {
    id: XhrId,
    state: Mutex<XhrState>,
    listeners: Mutex<Vec<(XhrEventKind, Listener)>>,
}

/// A request handle. Clones share the same underlying request.
#[derive(Clone)]
pub struct XhrHandle {
    inner: Arc<XhrInner>,
}

impl Default for XhrHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for XhrHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("XhrHandle")
            .field("id", &self.inner.id)
            .field("state", &*self.state())
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl XhrHandle {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(XhrInner {
                id: Uuid::new_v4(),
                state: Mutex::new(XhrState::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> XhrId {
        self.inner.id
    }

    fn state(&self) -> MutexGuard<'_, XhrState> {
        lock(&self.inner.state)
    }

    pub fn snapshot(&self) -> XhrState {
        self.state().clone()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state().ready_state
    }

    pub fn status(&self) -> u16 {
        self.state().status
    }

    pub fn status_text(&self) -> String {
        self.state().status_text.clone()
    }

    pub fn response_url(&self) -> String {
        self.state().response_url.clone()
    }

    pub fn response(&self) -> String {
        self.state().response.clone()
    }

    pub fn response_text(&self) -> String {
        self.state().response_text.clone()
    }

    /// Mutate the observable state. Used by transports driving a real request.
    pub fn update_state(&self, f: impl FnOnce(&mut XhrState)) {
        let mut state = self.state();
        f(&mut *state);
    }

    pub fn add_event_listener<F>(&self, kind: XhrEventKind, listener: F)
    where
        F: Fn(&XhrHandle) + Send + Sync + 'static,
    {
        lock(&self.inner.listeners).push((kind, Arc::new(listener)));
    }

    /// Invoke every listener registered for `kind`, in registration order.
    pub fn dispatch_event(&self, kind: XhrEventKind) {
        let listeners: Vec<Listener> = lock(&self.inner.listeners)
            .iter()
            .filter(|(registered, _)| *registered == kind)
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(self);
        }
    }

    /// Jump straight to DONE with the synthetic response, then fire
    /// `readystatechange`, `load` and `loadend`.
    fn complete(&self, resolution: Resolution) {
        let response = resolution.response;
        self.update_state(|state| {
            state.ready_state = ReadyState::Done;
            state.status = response.status;
            state.status_text = response.status_text;
            state.response_url = resolution.url;
            state.response_text = response.body.clone();
            state.response = response.body;
        });

        self.dispatch_event(XhrEventKind::ReadyStateChange);
        self.dispatch_event(XhrEventKind::Load);
        self.dispatch_event(XhrEventKind::LoadEnd);
    }
}

/// The original open/send implementation
pub trait XhrTransport: Send + Sync {
    fn open(&self, handle: &XhrHandle, method: &str, url: &str);
    fn send(&self, handle: &XhrHandle, body: Option<String>);
}

/// Metadata recorded when a handle is opened
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    pub method: String,
    pub url: String,
}

/// Side table entry; the weak reference lets records of dropped handles go.
struct OpenEntry {
    handle: Weak<XhrInner>,
    record: OpenRecord,
}

/// XHR interception, installed through
/// [`InterceptionEngine::patch_xhr`](crate::InterceptionEngine::patch_xhr).
pub struct XhrInterceptor {
    engine: Arc<InterceptionEngine>,
    original: Arc<dyn XhrTransport>,
    scheduler: Arc<dyn Scheduler>,
    opened: DashMap<XhrId, OpenEntry>,
}

impl XhrInterceptor {
    pub(crate) fn new(
        engine: Arc<InterceptionEngine>,
        original: Arc<dyn XhrTransport>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            engine,
            original,
            scheduler,
            opened: DashMap::new(),
        }
    }

    /// Record the method and URL, then run the original open.
    ///
    /// Records of handles dropped without a `send` are pruned here.
    pub fn open(&self, handle: &XhrHandle, method: &str, url: &str) {
        self.opened.retain(|_, entry| entry.handle.strong_count() > 0);
        self.opened.insert(
            handle.id(),
            OpenEntry {
                handle: Arc::downgrade(&handle.inner),
                record: OpenRecord {
                    method: method.to_string(),
                    url: url.to_string(),
                },
            },
        );
        self.original.open(handle, method, url);
    }

    pub fn open_record(&self, handle: &XhrHandle) -> Option<OpenRecord> {
        self.opened.get(&handle.id()).map(|entry| entry.record.clone())
    }

    /// Number of opened handles still waiting for `send`.
    pub fn pending_opens(&self) -> usize {
        self.opened.len()
    }

    /// Serve the request from the first matching rule or run the original send.
    ///
    /// A synthetic completion is deferred through the scheduler and never
    /// happens before this call returns. Each send consumes the open record.
    pub fn send(&self, handle: &XhrHandle, body: Option<String>) {
        let Some((_, OpenEntry { record, .. })) = self.opened.remove(&handle.id()) else {
            debug!("Send on unopened handle {}, delegating", handle.id());
            return self.original.send(handle, body);
        };

        match self.engine.resolve(&record.url) {
            Some(resolution) => {
                debug!(
                    "Serving {} {} from rule [{}]",
                    record.method, resolution.url, resolution.rule_id
                );
                let handle = handle.clone();
                self.scheduler
                    .defer(Box::new(move || handle.complete(resolution)));
            }
            None => self.original.send(handle, body),
        }
    }
}
