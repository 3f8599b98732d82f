//! Change notification for the stores.
//!
//! Every state change that actually happened is announced as a
//! [`StoreEvent`] to the listeners registered on the store. An [`EventSink`]
//! can be registered as a listener to mirror events as JSON lines.
//!
//! Listeners run synchronously inside the mutating call. They must not call
//! back into the store that notified them.

use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{Error, Result};
use crate::task::{SortKey, SortOrder};

pub const EVENT_SCHEMA_VERSION: &str = "tasknest.event.v1";

/// A state change in the task store or the session store
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum StoreEvent {
    TaskAdded { task_id: u64 },
    TaskCompleted { task_id: u64 },
    TaskDeleted { task_id: u64 },
    TaskEdited { task_id: u64 },
    TasksLoaded { count: usize },
    TasksSorted { key: SortKey, order: SortOrder },
    SearchQueryChanged { query: String },
    SessionRestored { user_id: u64 },
    Registered { user_id: u64 },
    SignedIn { user_id: u64 },
    SignedOut,
}

/// Handle returned by `subscribe`, used to unsubscribe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent)>;

/// Listener registry owned by a store
#[derive(Default)]
pub struct Subscribers {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener)>,
}

impl Subscribers {
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Returns false when `id` was not registered
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(entry, _)| *entry != id);
        self.listeners.len() != before
    }

    pub fn notify(&mut self, event: &StoreEvent) {
        for (_, listener) in self.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl fmt::Debug for Subscribers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscribers")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    /// `-` means stdout, anything else is a file path. Blank disables events.
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

#[derive(Serialize)]
struct EventRecord<'a> {
    schema_version: &'static str,
    timestamp: DateTime<Utc>,
    #[serde(flatten)]
    event: &'a StoreEvent,
}

/// Event sink that writes JSONL output to a destination
pub struct EventSink {
    writer: Box<dyn Write>,
}

impl EventSink {
    pub fn stdout() -> Self {
        Self::from_writer(std::io::stdout())
    }

    /// Append to a file, creating it if necessary
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self::from_writer(file))
    }

    pub fn from_writer(writer: impl Write + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write a single event as one JSON line
    pub fn emit(&mut self, event: &StoreEvent) -> Result<()> {
        let record = EventRecord {
            schema_version: EVENT_SCHEMA_VERSION,
            timestamp: Utc::now(),
            event,
        };
        let serialized = serde_json::to_vec(&record)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }

    /// Share the sink between several stores
    pub fn shared(self) -> SharedEventSink {
        SharedEventSink(Rc::new(RefCell::new(self)))
    }
}

/// Event sink registered as a listener on more than one store
#[derive(Clone)]
pub struct SharedEventSink(Rc<RefCell<EventSink>>);

impl SharedEventSink {
    /// Store listener. Write failures are logged, not raised.
    pub fn listener(&self) -> impl FnMut(&StoreEvent) + 'static {
        let sink = Rc::clone(&self.0);
        move |event| {
            if let Err(err) = sink.borrow_mut().emit(event) {
                tracing::warn!(error = %err, "failed to write event");
            }
        }
    }
}
