//! Persistence port: a synchronous, string-keyed store of JSON values.
//!
//! The stores only ever talk to [`KeyValueStore`]. Two adapters ship with the
//! crate: [`MemoryStore`] here and [`crate::storage::FileStore`] on disk.
//!
//! Methods take `&self`; adapters use interior mutability so a single handle
//! can be shared by the task store and the session store.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

/// Synchronous key-value persistence
pub trait KeyValueStore {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> Result<Option<Value>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: Value) -> Result<()>;

    /// Remove `key`. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> Result<()>;
}

/// In-process store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Rc<RefCell<BTreeMap<String, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys currently present, sorted
    pub fn keys(&self) -> Vec<String> {
        self.entries.borrow().keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.borrow().contains_key(key)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: Value) -> Result<()> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

/// Read and decode `key`. A stored JSON `null` reads as `None`.
pub fn get_json<T, S>(store: &S, key: &str) -> Result<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    match store.get(key)? {
        None | Some(Value::Null) => Ok(None),
        Some(value) => serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::Persistence(format!("invalid value under '{key}': {e}"))),
    }
}

/// Encode and store `value` under `key`
pub fn set_json<T, S>(store: &S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let value = serde_json::to_value(value)?;
    store.set(key, value)
}

/// A group of writes that is undone unless committed.
///
/// Each write records the prior value of its key. Dropping an uncommitted
/// batch restores those values in reverse order, so a failure halfway
/// through a multi-key update leaves storage as it was.
pub struct WriteBatch<'a, S: KeyValueStore + ?Sized> {
    store: &'a S,
    undo: Vec<(String, Option<Value>)>,
}

impl<'a, S: KeyValueStore + ?Sized> WriteBatch<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self {
            store,
            undo: Vec::new(),
        }
    }

    pub fn set_json<T: Serialize + ?Sized>(&mut self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        let prior = self.store.get(key)?;
        self.store.set(key, value)?;
        self.undo.push((key.to_string(), prior));
        Ok(())
    }

    pub fn delete(&mut self, key: &str) -> Result<()> {
        let prior = self.store.get(key)?;
        self.store.delete(key)?;
        self.undo.push((key.to_string(), prior));
        Ok(())
    }

    /// Keep every write made through this batch
    pub fn commit(mut self) {
        self.undo.clear();
    }
}

impl<S: KeyValueStore + ?Sized> Drop for WriteBatch<'_, S> {
    fn drop(&mut self) {
        while let Some((key, prior)) = self.undo.pop() {
            let restored = match prior {
                Some(value) => self.store.set(&key, value),
                None => self.store.delete(&key),
            };
            if let Err(err) = restored {
                tracing::warn!(key = %key, error = %err, "failed to roll back write");
            }
        }
    }
}
