// Task store: sole owner and mutator of the ordered task collection

use crate::models::{Category, Task, TaskId};
use crate::persist::{self, PersistenceAdapter};
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{debug, warn};

type Observer = Box<dyn Fn(&[Task])>;

/// Ordered collection of tasks with persistence on every mutation.
///
/// The store is constructor-injected with its persistence adapter and hydrated
/// once from it at open. Mutations take `&mut self`, reads take `&self`;
/// nothing else holds a mutable handle on the collection.
///
/// Validation failures (empty text, unknown id, out-of-range index) are silent
/// no-ops rather than errors: the store never mutates, persists, or notifies
/// for a rejected operation.
pub struct TaskStore {
    tasks: Vec<Task>,
    next_id: TaskId,
    adapter: Box<dyn PersistenceAdapter>,
    observers: Vec<Observer>,
}

impl TaskStore {
    /// Open a store over the given adapter, hydrating from whatever blob it
    /// holds. A missing or malformed blob yields an empty store; load errors
    /// never propagate past this point.
    pub fn open(adapter: Box<dyn PersistenceAdapter>) -> Self {
        let mut store = Self {
            tasks: Vec::new(),
            next_id: 1,
            adapter,
            observers: Vec::new(),
        };

        match store.adapter.load() {
            Ok(Some(blob)) => store.hydrate(&blob),
            Ok(None) => debug!("No persisted tasks, starting empty"),
            Err(e) => warn!(error = ?e, "Failed to load persisted tasks, starting empty"),
        }

        store
    }

    // ------------------------------------------------------------------
    // Read surface
    // ------------------------------------------------------------------

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Register a callback invoked with the full collection after every
    /// successful mutation.
    pub fn subscribe<F: Fn(&[Task]) + 'static>(&mut self, observer: F) {
        self.observers.push(Box::new(observer));
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add a new task at the front of the list (newest first).
    ///
    /// Returns `None` without touching the collection if `text` trims empty.
    pub fn create(
        &mut self,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Option<Category>,
    ) -> Option<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            debug!("Rejected create with empty text");
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        self.tasks.insert(
            0,
            Task {
                id,
                text: text.to_string(),
                completed: false,
                due_date,
                category,
            },
        );

        self.persist_and_notify();
        Some(id)
    }

    /// Replace a task's text, due date, and category wholesale.
    ///
    /// Fields not resupplied become absent; `id` and `completed` are
    /// preserved. No-op on unknown id or empty trimmed text.
    pub fn update(
        &mut self,
        id: TaskId,
        text: &str,
        due_date: Option<NaiveDate>,
        category: Option<Category>,
    ) {
        let text = text.trim();
        if text.is_empty() {
            debug!(id, "Rejected update with empty text");
            return;
        }

        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "Update for unknown task id");
            return;
        };

        task.text = text.to_string();
        task.due_date = due_date;
        task.category = category;

        self.persist_and_notify();
    }

    /// Flip a task's completed flag. No-op on unknown id.
    pub fn toggle_completed(&mut self, id: TaskId) {
        let Some(task) = self.tasks.iter_mut().find(|t| t.id == id) else {
            debug!(id, "Toggle for unknown task id");
            return;
        };

        task.completed = !task.completed;
        self.persist_and_notify();
    }

    /// Remove a task. No-op on unknown id; the id is never reused.
    pub fn delete(&mut self, id: TaskId) {
        let before = self.tasks.len();
        self.tasks.retain(|t| t.id != id);

        if self.tasks.len() == before {
            debug!(id, "Delete for unknown task id");
            return;
        }

        self.persist_and_notify();
    }

    /// Move the task at `from` to position `to`, shifting the entries between.
    ///
    /// No-op if either index is out of bounds or they are equal.
    pub fn reorder(&mut self, from: usize, to: usize) {
        if from == to || from >= self.tasks.len() || to >= self.tasks.len() {
            debug!(from, to, len = self.tasks.len(), "Rejected reorder");
            return;
        }

        let task = self.tasks.remove(from);
        self.tasks.insert(to, task);

        self.persist_and_notify();
    }

    /// Replace the entire collection from a serialized blob.
    ///
    /// A malformed blob leaves the collection empty; the parse error is logged
    /// and never propagated. Records that would violate store invariants
    /// (empty text, duplicate id) are skipped individually. Re-seeds the id
    /// counter past the largest surviving id.
    pub fn hydrate(&mut self, blob: &str) {
        self.tasks.clear();

        let parsed = match persist::decode(blob) {
            Ok(tasks) => tasks,
            Err(e) => {
                warn!(error = ?e, "Discarding malformed task blob, starting empty");
                self.next_id = 1;
                self.notify();
                return;
            }
        };

        let mut seen: HashSet<TaskId> = HashSet::new();
        for task in parsed {
            if task.text.trim().is_empty() {
                warn!(id = task.id, "Skipping persisted task with empty text");
                continue;
            }
            if !seen.insert(task.id) {
                warn!(id = task.id, "Skipping persisted task with duplicate id");
                continue;
            }
            self.tasks.push(task);
        }

        self.next_id = self.tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1;
        debug!(count = self.tasks.len(), "Hydrated task collection");
        self.notify();
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    /// Persist the collection and tell observers. Save failures are logged
    /// and swallowed; durability is best-effort by contract.
    fn persist_and_notify(&self) {
        match persist::encode(&self.tasks) {
            Ok(blob) => {
                if let Err(e) = self.adapter.save(&blob) {
                    warn!(error = ?e, "Failed to persist tasks");
                }
            }
            Err(e) => warn!(error = ?e, "Failed to serialize tasks"),
        }

        self.notify();
    }

    fn notify(&self) {
        for observer in &self.observers {
            observer(&self.tasks);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist::MemoryAdapter;
    use std::cell::Cell;
    use std::rc::Rc;

    fn empty_store() -> TaskStore {
        TaskStore::open(Box::new(MemoryAdapter::new()))
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_appends_only_nonempty_text() {
        let mut store = empty_store();

        assert!(store.create("Buy milk", None, None).is_some());
        assert!(store.create("", None, None).is_none());
        assert!(store.create("   ", None, None).is_none());
        assert!(store.create("Walk dog", None, None).is_some());

        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_create_trims_and_prepends() {
        let mut store = empty_store();

        store.create("first", None, None).unwrap();
        let id = store.create("  second  ", None, None).unwrap();

        // Newest first
        assert_eq!(store.tasks()[0].id, id);
        assert_eq!(store.tasks()[0].text, "second");
        assert!(!store.tasks()[0].completed);
        assert_eq!(store.tasks()[1].text, "first");
    }

    #[test]
    fn test_ids_are_unique_and_not_reused() {
        let mut store = empty_store();

        let a = store.create("a", None, None).unwrap();
        let b = store.create("b", None, None).unwrap();
        assert_ne!(a, b);

        store.delete(b);
        let c = store.create("c", None, None).unwrap();
        assert_ne!(c, b);
        assert_ne!(c, a);
    }

    #[test]
    fn test_toggle_is_involution() {
        let mut store = empty_store();
        let id = store.create("task", None, None).unwrap();

        store.toggle_completed(id);
        assert!(store.get(id).unwrap().completed);

        store.toggle_completed(id);
        assert!(!store.get(id).unwrap().completed);
    }

    #[test]
    fn test_toggle_unknown_id_is_noop() {
        let mut store = empty_store();
        store.create("task", None, None).unwrap();

        store.toggle_completed(999);
        assert!(!store.tasks()[0].completed);
    }

    #[test]
    fn test_update_replaces_whole_record() {
        let mut store = empty_store();
        let id = store
            .create("original", Some(date("2025-06-01")), Some(Category::Work))
            .unwrap();
        store.toggle_completed(id);

        // Not resupplying due date and category clears them
        store.update(id, "edited", None, None);

        let task = store.get(id).unwrap();
        assert_eq!(task.text, "edited");
        assert_eq!(task.due_date, None);
        assert_eq!(task.category, None);
        // id and completed preserved
        assert_eq!(task.id, id);
        assert!(task.completed);
    }

    #[test]
    fn test_update_rejects_empty_text_and_unknown_id() {
        let mut store = empty_store();
        let id = store.create("keep me", None, Some(Category::Other)).unwrap();

        store.update(id, "   ", None, None);
        assert_eq!(store.get(id).unwrap().text, "keep me");
        assert_eq!(store.get(id).unwrap().category, Some(Category::Other));

        store.update(999, "new text", None, None);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get(id).unwrap().text, "keep me");
    }

    #[test]
    fn test_delete_is_permanent() {
        let mut store = empty_store();
        let id = store.create("doomed", None, None).unwrap();

        store.delete(id);
        assert!(store.is_empty());

        // Later operations on the dead id are all no-ops
        store.toggle_completed(id);
        store.update(id, "ghost", None, None);
        store.delete(id);
        assert!(store.is_empty());
        assert!(store.get(id).is_none());
    }

    #[test]
    fn test_reorder_moves_and_inverts() {
        let mut store = empty_store();
        // Prepend order: list reads c, b, a
        store.create("a", None, None).unwrap();
        store.create("b", None, None).unwrap();
        store.create("c", None, None).unwrap();

        let original: Vec<String> = store.tasks().iter().map(|t| t.text.clone()).collect();

        store.reorder(0, 2);
        let moved: Vec<String> = store.tasks().iter().map(|t| t.text.clone()).collect();
        assert_eq!(moved, vec!["b", "a", "c"]);

        store.reorder(2, 0);
        let restored: Vec<String> = store.tasks().iter().map(|t| t.text.clone()).collect();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_reorder_out_of_bounds_or_equal_is_noop() {
        let mut store = empty_store();
        store.create("a", None, None).unwrap();
        store.create("b", None, None).unwrap();

        let before: Vec<TaskId> = store.tasks().iter().map(|t| t.id).collect();

        store.reorder(0, 5);
        store.reorder(5, 0);
        store.reorder(1, 1);

        let after: Vec<TaskId> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn test_mutations_are_persisted() {
        let mut store = empty_store();
        let id = store.create("persisted", None, None).unwrap();
        store.toggle_completed(id);

        let blob = persist::encode(store.tasks()).unwrap();
        let reloaded = TaskStore::open(Box::new(MemoryAdapter::with_blob(blob)));

        assert_eq!(reloaded.tasks(), store.tasks());
    }

    #[test]
    fn test_round_trip_preserves_order_and_fields() {
        let mut store = empty_store();
        store
            .create("one", Some(date("2025-03-04")), Some(Category::Travel))
            .unwrap();
        store.create("two", None, None).unwrap();
        store.create("three", None, Some(Category::Work)).unwrap();
        store.reorder(0, 2);

        let blob = persist::encode(store.tasks()).unwrap();
        let mut reloaded = TaskStore::open(Box::new(MemoryAdapter::new()));
        reloaded.hydrate(&blob);

        assert_eq!(reloaded.tasks(), store.tasks());
    }

    #[test]
    fn test_hydrate_malformed_blob_leaves_empty() {
        let mut store = empty_store();
        store.create("will vanish", None, None).unwrap();

        store.hydrate("{not json");
        assert!(store.is_empty());

        store.hydrate("[{\"id\":1,\"text\":\"truncat");
        assert!(store.is_empty());

        // Store remains usable after the failed load
        assert!(store.create("fresh start", None, None).is_some());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_hydrate_skips_invariant_violations() {
        let mut store = empty_store();
        store.hydrate(
            r#"[
                {"id":1,"text":"keep","completed":false},
                {"id":2,"text":"  ","completed":false},
                {"id":1,"text":"duplicate","completed":true},
                {"id":3,"text":"also keep","completed":true}
            ]"#,
        );

        let ids: Vec<TaskId> = store.tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(store.get(1).unwrap().text, "keep");
    }

    #[test]
    fn test_hydrate_reseeds_id_counter() {
        let mut store = empty_store();
        store.hydrate(r#"[{"id":41,"text":"old","completed":false}]"#);

        let id = store.create("new", None, None).unwrap();
        assert_eq!(id, 42);
    }

    #[test]
    fn test_observers_fire_on_successful_mutations_only() {
        let mut store = empty_store();
        let calls = Rc::new(Cell::new(0usize));

        let counter = Rc::clone(&calls);
        store.subscribe(move |_| counter.set(counter.get() + 1));

        let id = store.create("task", None, None).unwrap();
        store.toggle_completed(id);
        assert_eq!(calls.get(), 2);

        // Rejected operations do not notify
        assert!(store.create("", None, None).is_none());
        store.toggle_completed(999);
        store.reorder(0, 9);
        assert_eq!(calls.get(), 2);

        store.delete(id);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn test_scenario_buy_milk() {
        use crate::filter::{CategoryFilter, StatusFilter, visible_tasks};

        let mut store = empty_store();
        let id = store
            .create("Buy milk", Some(date("2025-01-01")), Some(Category::Personal))
            .unwrap();

        assert_eq!(store.len(), 1);
        let task = store.get(id).unwrap();
        assert!(!task.completed);
        assert_eq!(task.category, Some(Category::Personal));
        assert_eq!(task.due_date, Some(date("2025-01-01")));

        store.toggle_completed(id);
        assert!(store.get(id).unwrap().completed);

        let completed = visible_tasks(store.tasks(), StatusFilter::Completed, CategoryFilter::All);
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, id);

        let active = visible_tasks(store.tasks(), StatusFilter::Active, CategoryFilter::All);
        assert!(active.is_empty());
    }
}
