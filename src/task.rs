//! Task collection and its query state.
//!
//! The [`TaskStore`] is the runtime truth for tasks. It never fails: an
//! operation naming an id that is not present does nothing and reports
//! `false`. Persistence is caller-driven through [`TaskStore::load`] and
//! [`TaskStore::save`].

use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::events::{StoreEvent, SubscriptionId, Subscribers};
use crate::port::{self, KeyValueStore};

/// Port key holding the task collection
pub const TASKS_KEY: &str = "tasks";

/// Task store shared between the UI and the session store
pub type SharedTaskStore = Rc<RefCell<TaskStore>>;

/// Free-form details attached to a task
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskDescription {
    pub title: String,
    /// Duration as entered, e.g. "2 hours"
    pub time_to_be_completed: String,
    #[serde(default)]
    pub extra_info_required: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: u64,
    pub title: String,
    pub description: TaskDescription,
    pub due_date: String,
    /// Conventionally low/medium/high; not validated
    pub priority: String,
    pub category: String,
    #[serde(default)]
    pub subtasks: Vec<String>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub attachments: Vec<serde_json::Value>,
    #[serde(default)]
    pub comments: Vec<serde_json::Value>,
    #[serde(default)]
    pub is_completed: bool,
    pub user_id: u64,
}

impl Task {
    /// A task with the given identity and every other field empty
    pub fn new(id: u64, title: impl Into<String>, user_id: u64) -> Self {
        Self {
            id,
            title: title.into(),
            description: TaskDescription::default(),
            due_date: String::new(),
            priority: String::new(),
            category: String::new(),
            subtasks: Vec::new(),
            is_recurring: false,
            attachments: Vec::new(),
            comments: Vec::new(),
            is_completed: false,
            user_id,
        }
    }

    /// Case-sensitive substring match on the title or the description title
    pub fn matches_query(&self, query: &str) -> bool {
        self.title.contains(query) || self.description.title.contains(query)
    }
}

/// The two tasks a fresh installation of the app starts with
pub fn sample_tasks() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            title: "Buy ingredients to make Tacos".to_string(),
            description: TaskDescription {
                title: "Go to the latin shop next to my house to buy groceries for this friday's dinner with friends".to_string(),
                time_to_be_completed: "2 hours".to_string(),
                extra_info_required: vec!["Guacamole".to_string(), "Nachos".to_string()],
            },
            due_date: "2024-07-14".to_string(),
            priority: "medium".to_string(),
            category: "Groceries".to_string(),
            subtasks: vec!["Buy Guacamole".to_string(), "Buy Nachos".to_string()],
            is_recurring: false,
            attachments: Vec::new(),
            comments: Vec::new(),
            is_completed: true,
            user_id: 1,
        },
        Task {
            id: 2,
            title: "Clean out House".to_string(),
            description: TaskDescription {
                title: "Clean House by friday for friends dinner".to_string(),
                time_to_be_completed: "1 hour".to_string(),
                extra_info_required: vec!["swap".to_string(), "mop".to_string(), "dust".to_string()],
            },
            due_date: "2024-07-15".to_string(),
            priority: "high".to_string(),
            category: "Chores".to_string(),
            subtasks: vec!["Swap".to_string(), "Mop".to_string(), "Dust".to_string()],
            is_recurring: false,
            attachments: Vec::new(),
            comments: Vec::new(),
            is_completed: false,
            user_id: 2,
        },
    ]
}

/// Scalar task fields a collection can be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    #[serde(rename = "id")]
    Id,
    #[serde(rename = "title")]
    Title,
    #[serde(rename = "description.title")]
    DescriptionTitle,
    #[serde(rename = "dueDate")]
    DueDate,
    #[serde(rename = "priority")]
    Priority,
    #[serde(rename = "category")]
    Category,
    #[serde(rename = "isRecurring")]
    IsRecurring,
    #[serde(rename = "isCompleted")]
    IsCompleted,
    #[serde(rename = "userId")]
    UserId,
}

/// Field value extracted for comparison. Values of one key share a variant.
#[derive(Debug, PartialEq, PartialOrd)]
enum FieldValue<'a> {
    Int(u64),
    Text(&'a str),
    Flag(bool),
}

impl SortKey {
    pub const ALL: [SortKey; 9] = [
        SortKey::Id,
        SortKey::Title,
        SortKey::DescriptionTitle,
        SortKey::DueDate,
        SortKey::Priority,
        SortKey::Category,
        SortKey::IsRecurring,
        SortKey::IsCompleted,
        SortKey::UserId,
    ];

    /// Field name as it appears in task JSON
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Id => "id",
            SortKey::Title => "title",
            SortKey::DescriptionTitle => "description.title",
            SortKey::DueDate => "dueDate",
            SortKey::Priority => "priority",
            SortKey::Category => "category",
            SortKey::IsRecurring => "isRecurring",
            SortKey::IsCompleted => "isCompleted",
            SortKey::UserId => "userId",
        }
    }

    fn value(self, task: &Task) -> FieldValue<'_> {
        match self {
            SortKey::Id => FieldValue::Int(task.id),
            SortKey::Title => FieldValue::Text(&task.title),
            SortKey::DescriptionTitle => FieldValue::Text(&task.description.title),
            SortKey::DueDate => FieldValue::Text(&task.due_date),
            SortKey::Priority => FieldValue::Text(&task.priority),
            SortKey::Category => FieldValue::Text(&task.category),
            SortKey::IsRecurring => FieldValue::Flag(task.is_recurring),
            SortKey::IsCompleted => FieldValue::Flag(task.is_completed),
            SortKey::UserId => FieldValue::Int(task.user_id),
        }
    }
}

impl FromStr for SortKey {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let normalized: String = trimmed
            .chars()
            .filter(|ch| *ch != '_' && *ch != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        SortKey::ALL
            .into_iter()
            .find(|key| key.as_str().to_ascii_lowercase() == normalized)
            .ok_or_else(|| {
                Error::InvalidArgument(format!(
                    "unknown sort key '{trimmed}' (expected one of: {})",
                    SortKey::ALL.map(SortKey::as_str).join(", ")
                ))
            })
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortOrder {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "descending" => Ok(SortOrder::Descending),
            other => Err(Error::InvalidArgument(format!(
                "invalid sort order '{other}' (expected asc|desc)"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ascending => f.write_str("asc"),
            SortOrder::Descending => f.write_str("desc"),
        }
    }
}

/// Current ordering state. `key: None` leaves the order untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub key: Option<SortKey>,
    pub order: SortOrder,
}

impl Default for SortSpec {
    fn default() -> Self {
        Self {
            key: Some(SortKey::DueDate),
            order: SortOrder::Ascending,
        }
    }
}

/// Two-valued comparison: never returns `Equal`.
///
/// Ascending answers "is `a` greater than `b`", descending answers "is `a`
/// less than `b`"; every other case, ties included, is `Less`.
pub fn weak_compare(a: &Task, b: &Task, key: SortKey, order: SortOrder) -> Ordering {
    let (left, right) = (key.value(a), key.value(b));
    let after = match order {
        SortOrder::Ascending => left > right,
        SortOrder::Descending => left < right,
    };
    if after {
        Ordering::Greater
    } else {
        Ordering::Less
    }
}

/// Stable insertion sort driven by [`weak_compare`].
///
/// An element moves left past its neighbour whenever the comparator ranks it
/// `Less`. Because ties rank `Less`, tasks with equal keys end up in reverse
/// relative order, and sorting twice restores them. The standard library
/// sorts are not used: they may panic on a comparator that is not a total
/// order.
fn weak_sort<T, F>(items: &mut [T], task_of: F, key: SortKey, order: SortOrder)
where
    F: Fn(&T) -> &Task,
{
    for i in 1..items.len() {
        let mut j = i;
        while j > 0
            && weak_compare(task_of(&items[j]), task_of(&items[j - 1]), key, order)
                == Ordering::Less
        {
            items.swap(j, j - 1);
            j -= 1;
        }
    }
}

#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Task>,
    search_query: String,
    sort_spec: SortSpec,
    subscribers: Subscribers,
}

impl TaskStore {
    /// Empty store sorted by due date, ascending
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding [`sample_tasks`]
    pub fn with_samples() -> Self {
        Self::from_tasks(sample_tasks())
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        Self {
            tasks,
            ..Self::default()
        }
    }

    pub fn with_sort_spec(mut self, sort_spec: SortSpec) -> Self {
        self.sort_spec = sort_spec;
        self
    }

    /// Wrap for sharing with a session store
    pub fn into_shared(self) -> SharedTaskStore {
        Rc::new(RefCell::new(self))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// The live collection in its current order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, task_id: u64) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == task_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Next free id for callers that do not assign their own.
    ///
    /// One past the largest id, or the smallest unused id once `u64::MAX`
    /// is taken.
    pub fn next_id(&self) -> u64 {
        let Some(max) = self.tasks.iter().map(|task| task.id).max() else {
            return 1;
        };
        if let Some(id) = max.checked_add(1) {
            return id;
        }
        let used: BTreeSet<u64> = self.tasks.iter().map(|task| task.id).collect();
        (1..u64::MAX).find(|id| !used.contains(id)).unwrap_or(0)
    }

    /// Tasks owned by `user_id`, in collection order
    pub fn by_user(&self, user_id: u64) -> Vec<&Task> {
        self.tasks
            .iter()
            .filter(|task| task.user_id == user_id)
            .collect()
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    pub fn sort_spec(&self) -> SortSpec {
        self.sort_spec
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Append `task`. Duplicate ids are the caller's problem.
    pub fn add(&mut self, task: Task) {
        let task_id = task.id;
        tracing::debug!(task_id, title = %task.title, "task added");
        self.tasks.push(task);
        self.subscribers.notify(&StoreEvent::TaskAdded { task_id });
    }

    /// Mark the first task with `task_id` completed. Returns false if absent.
    pub fn mark_completed(&mut self, task_id: u64) -> bool {
        let Some(task) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            tracing::debug!(task_id, "complete: no such task");
            return false;
        };
        task.is_completed = true;
        tracing::debug!(task_id, "task completed");
        self.subscribers.notify(&StoreEvent::TaskCompleted { task_id });
        true
    }

    /// Remove the first task with `task_id`. Returns false if absent.
    pub fn delete(&mut self, task_id: u64) -> bool {
        let Some(index) = self.tasks.iter().position(|task| task.id == task_id) else {
            tracing::debug!(task_id, "delete: no such task");
            return false;
        };
        self.tasks.remove(index);
        tracing::debug!(task_id, "task deleted");
        self.subscribers.notify(&StoreEvent::TaskDeleted { task_id });
        true
    }

    /// Replace the task with the same id wholesale. Never inserts.
    pub fn edit(&mut self, updated: Task) -> bool {
        let task_id = updated.id;
        let Some(slot) = self.tasks.iter_mut().find(|task| task.id == task_id) else {
            tracing::debug!(task_id, "edit: no such task");
            return false;
        };
        *slot = updated;
        tracing::debug!(task_id, "task edited");
        self.subscribers.notify(&StoreEvent::TaskEdited { task_id });
        true
    }

    /// Store the query used by [`TaskStore::filter_and_sort`]. Does not filter.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.search_query = query.into();
        tracing::debug!(query = %self.search_query, "search query set");
        self.subscribers.notify(&StoreEvent::SearchQueryChanged {
            query: self.search_query.clone(),
        });
    }

    /// Remember `key`/`order` and reorder the live collection now.
    pub fn sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort_spec = SortSpec {
            key: Some(key),
            order,
        };
        weak_sort(&mut self.tasks, |task| task, key, order);
        tracing::debug!(%key, %order, count = self.tasks.len(), "tasks sorted");
        self.subscribers.notify(&StoreEvent::TasksSorted { key, order });
    }

    /// Apply the search query, then the sort spec.
    ///
    /// Side effect: with an empty query the live collection itself is sorted
    /// in place and returned. With a query only the filtered view is sorted
    /// and the stored order is left alone.
    pub fn filter_and_sort(&mut self) -> Vec<&Task> {
        if self.search_query.is_empty() {
            if let Some(key) = self.sort_spec.key {
                let order = self.sort_spec.order;
                weak_sort(&mut self.tasks, |task| task, key, order);
                self.subscribers.notify(&StoreEvent::TasksSorted { key, order });
            }
            return self.tasks.iter().collect();
        }

        let query = self.search_query.as_str();
        let mut view: Vec<&Task> = self
            .tasks
            .iter()
            .filter(|task| task.matches_query(query))
            .collect();
        if let Some(key) = self.sort_spec.key {
            weak_sort(&mut view, |task| *task, key, self.sort_spec.order);
        }
        tracing::debug!(query, matched = view.len(), "tasks filtered");
        view
    }

    // =========================================================================
    // Persistence and notification
    // =========================================================================

    /// Replace the collection with the one stored under [`TASKS_KEY`].
    ///
    /// A missing key loads an empty collection. Returns the task count.
    pub fn load<S: KeyValueStore + ?Sized>(&mut self, store: &S) -> Result<usize> {
        let tasks: Vec<Task> = port::get_json(store, TASKS_KEY)?.unwrap_or_default();
        let count = tasks.len();
        self.tasks = tasks;
        tracing::debug!(count, "tasks loaded");
        self.subscribers.notify(&StoreEvent::TasksLoaded { count });
        Ok(count)
    }

    /// Write the collection, in its current order, under [`TASKS_KEY`]
    pub fn save<S: KeyValueStore + ?Sized>(&self, store: &S) -> Result<()> {
        port::set_json(store, TASKS_KEY, &self.tasks)?;
        tracing::debug!(count = self.tasks.len(), "tasks saved");
        Ok(())
    }

    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.subscribers.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.subscribers.unsubscribe(id)
    }
}
