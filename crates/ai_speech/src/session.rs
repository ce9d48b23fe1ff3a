//! Single-session bookkeeping shared by the adapters
//!
//! Each session gets a fresh id. Background tasks report their outcome with
//! the id they were started under, and only the current, still-active
//! session may publish; this is what keeps a stopped or replaced session
//! from emitting a late event.

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Default)]
struct State {
    id: u64,
    active: bool,
    task: Option<JoinHandle<()>>,
}

#[derive(Debug)]
pub(crate) struct Session<E> {
    state: Mutex<State>,
    events: broadcast::Sender<E>,
}

impl<E: Clone> Session<E> {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(State::default()),
            events,
        }
    }

    /// Start a session unless one is active
    pub(crate) fn begin(&self) -> Option<u64> {
        let mut state = self.state.lock();
        if state.active {
            return None;
        }
        state.id += 1;
        state.active = true;
        Some(state.id)
    }

    /// Start a session, aborting the active one
    pub(crate) fn replace(&self) -> u64 {
        let mut state = self.state.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        state.id += 1;
        state.active = true;
        state.id
    }

    /// Hand the session's task over so `stop` can abort it
    pub(crate) fn attach(&self, id: u64, task: JoinHandle<()>) {
        let mut state = self.state.lock();
        if state.id == id && state.active {
            state.task = Some(task);
        } else {
            task.abort();
        }
    }

    /// End the active session silently; returns whether one was active
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.state.lock();
        if let Some(task) = state.task.take() {
            task.abort();
        }
        let was_active = state.active;
        state.active = false;
        state.id += 1;
        was_active
    }

    /// Publish the outcome of session `id` if it is still the current one
    pub(crate) fn finish(&self, id: u64, event: E) -> bool {
        let mut state = self.state.lock();
        if state.id != id || !state.active {
            return false;
        }
        state.active = false;
        state.task = None;
        // No receivers is fine; nobody was listening for this session.
        let _ = self.events.send(event);
        true
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state.lock().active
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<E> {
        self.events.subscribe()
    }
}
