use std::cell::RefCell;
use std::rc::Rc;

use tasknest::events::StoreEvent;
use tasknest::port::MemoryStore;
use tasknest::task::{sample_tasks, SortKey, SortOrder, SortSpec, Task, TaskStore};

fn task(id: u64, title: &str, due: &str, user_id: u64) -> Task {
    let mut task = Task::new(id, title, user_id);
    task.due_date = due.to_string();
    task
}

fn ids(store: &TaskStore) -> Vec<u64> {
    store.tasks().iter().map(|task| task.id).collect()
}

#[test]
fn added_task_is_visible_to_its_owner() {
    let mut store = TaskStore::with_samples();
    let new_task = task(3, "Water plants", "2024-07-20", 2);
    store.add(new_task.clone());

    assert!(store.by_user(2).contains(&&new_task));
    assert!(!store.by_user(1).contains(&&new_task));
}

#[test]
fn delete_changes_size_by_at_most_one() {
    let mut store = TaskStore::with_samples();
    store.add(task(1, "Duplicate id", "", 1));
    assert_eq!(store.len(), 3);

    assert!(store.delete(1));
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(1).unwrap().title, "Duplicate id");

    assert!(!store.delete(1000));
    assert_eq!(store.len(), 2);
}

#[test]
fn two_element_sort_reverses_exactly() {
    let mut store = TaskStore::new();
    store.add(task(1, "a", "2024-07-15", 1));
    store.add(task(2, "b", "2024-07-14", 1));

    store.sort(SortKey::DueDate, SortOrder::Ascending);
    let ascending = ids(&store);
    store.sort(SortKey::DueDate, SortOrder::Descending);
    let descending = ids(&store);

    assert_eq!(ascending, vec![2, 1]);
    assert_eq!(descending, vec![1, 2]);
}

#[test]
fn seeded_search_for_tacos() {
    let mut store = TaskStore::with_samples();
    store.set_search_query("Tacos");

    let view = store.filter_and_sort();
    assert_eq!(view.len(), 1);
    assert_eq!(view[0].title, "Buy ingredients to make Tacos");
}

#[test]
fn search_view_does_not_touch_live_order() {
    let mut store = TaskStore::new().with_sort_spec(SortSpec {
        key: Some(SortKey::Title),
        order: SortOrder::Descending,
    });
    store.add(task(1, "alpha errand", "", 1));
    store.add(task(2, "beta errand", "", 1));
    store.add(task(3, "gamma", "", 1));
    store.set_search_query("errand");

    let view: Vec<u64> = store.filter_and_sort().iter().map(|task| task.id).collect();
    assert_eq!(view, vec![2, 1]);
    assert_eq!(ids(&store), vec![1, 2, 3]);

    // Clearing the query sorts the live collection itself
    store.set_search_query("");
    store.filter_and_sort();
    assert_eq!(ids(&store), vec![3, 2, 1]);
}

#[test]
fn tasks_survive_a_port_round_trip() {
    let port = MemoryStore::new();
    let mut store = TaskStore::with_samples();
    store.mark_completed(2);
    store.save(&port).unwrap();

    let mut reloaded = TaskStore::new();
    assert_eq!(reloaded.load(&port).unwrap(), 2);
    assert_eq!(reloaded.tasks(), store.tasks());
    assert!(reloaded.get(2).unwrap().is_completed);
    assert_eq!(reloaded.tasks(), sample_tasks_completed().as_slice());
}

fn sample_tasks_completed() -> Vec<Task> {
    sample_tasks()
        .into_iter()
        .map(|mut task| {
            task.is_completed = true;
            task
        })
        .collect()
}

#[test]
fn unsubscribed_listener_stops_hearing() {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let mut store = TaskStore::new();
    let sink = Rc::clone(&seen);
    let id = store.subscribe(move |event| sink.borrow_mut().push(event.clone()));

    store.add(task(1, "one", "", 1));
    assert!(store.unsubscribe(id));
    store.add(task(2, "two", "", 1));

    assert_eq!(*seen.borrow(), vec![StoreEvent::TaskAdded { task_id: 1 }]);
}
