use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct TaskItem {
    id: u64,
    text: String,
    done: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TaskFilter {
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BoardState {
    tasks: Vec<TaskItem>,
    filter: TaskFilter,
    next_id: u64,
}

impl BoardState {
    fn empty() -> Self {
        Self {
            tasks: Vec::new(),
            filter: TaskFilter::All,
            next_id: 1,
        }
    }

    fn visible_tasks(&self) -> Vec<&TaskItem> {
        self.tasks
            .iter()
            .filter(|task| match self.filter {
                TaskFilter::All => true,
                TaskFilter::Active => !task.done,
                TaskFilter::Completed => task.done,
            })
            .collect()
    }
}

#[derive(Debug)]
enum BoardAction {
    Add(String),
    Toggle(u64),
    Remove(u64),
    SetFilter(TaskFilter),
}

struct BoardReducer;

impl Reducer for BoardReducer {
    type State = BoardState;
    type Action = BoardAction;

    fn reduce(&self, state: &BoardState, action: &BoardAction) -> BoardState {
        let mut next = state.clone();
        match action {
            BoardAction::Add(text) => {
                next.tasks.push(TaskItem {
                    id: next.next_id,
                    text: text.clone(),
                    done: false,
                });
                next.next_id += 1;
            }
            BoardAction::Toggle(id) => {
                for task in &mut next.tasks {
                    if task.id == *id {
                        task.done = !task.done;
                    }
                }
            }
            BoardAction::Remove(id) => {
                next.tasks.retain(|task| task.id != *id);
            }
            BoardAction::SetFilter(filter) => {
                next.filter = *filter;
            }
        }
        next
    }
}

fn board_store() -> Store<BoardReducer> {
    Store::new(BoardReducer, BoardState::empty())
}

#[test]
fn dispatch_folds_actions_through_the_reducer() {
    let store = board_store();

    store.dispatch(BoardAction::Add("write".into()));
    store.dispatch(BoardAction::Add("review".into()));
    store.dispatch(BoardAction::Toggle(1));

    let state = store.snapshot();
    assert_eq!(state.tasks.len(), 2);
    assert!(state.tasks[0].done);
    assert!(!state.tasks[1].done);
    assert_eq!(state.next_id, 3);
}

#[test]
fn remove_deletes_only_the_addressed_task() {
    let store = board_store();

    store.dispatch(BoardAction::Add("keep".into()));
    store.dispatch(BoardAction::Add("drop".into()));
    store.dispatch(BoardAction::Remove(2));

    let state = store.snapshot();
    assert_eq!(state.tasks.len(), 1);
    assert_eq!(state.tasks[0].text, "keep");
}

#[test]
fn toggle_of_an_unknown_id_leaves_state_unchanged() {
    let store = board_store();
    store.dispatch(BoardAction::Add("only".into()));

    let before = store.snapshot();
    store.dispatch(BoardAction::Toggle(99));

    assert_eq!(store.snapshot(), before);
}

#[test]
fn filter_controls_visible_tasks_without_mutating_them() {
    let store = board_store();
    store.dispatch(BoardAction::Add("open".into()));
    store.dispatch(BoardAction::Add("closed".into()));
    store.dispatch(BoardAction::Toggle(2));

    store.dispatch(BoardAction::SetFilter(TaskFilter::Active));
    let state = store.snapshot();
    let visible: Vec<&str> = state
        .visible_tasks()
        .iter()
        .map(|task| task.text.as_str())
        .collect();
    assert_eq!(visible, vec!["open"]);

    store.dispatch(BoardAction::SetFilter(TaskFilter::Completed));
    let state = store.snapshot();
    let visible: Vec<&str> = state
        .visible_tasks()
        .iter()
        .map(|task| task.text.as_str())
        .collect();
    assert_eq!(visible, vec!["closed"]);

    assert_eq!(state.tasks.len(), 2);
}

#[tokio::test]
async fn observers_are_notified_of_dispatched_changes() {
    let store = board_store();
    let mut rx = store.subscribe();

    store.dispatch(BoardAction::Add("observed".into()));

    rx.changed().await.expect("store dropped");
    assert_eq!(rx.borrow().tasks[0].text, "observed");
    assert_eq!(*rx.borrow(), store.snapshot());
}

#[tokio::test]
async fn slow_observers_see_the_latest_state_not_a_reordering() {
    let store = board_store();
    let mut rx = store.subscribe();

    store.dispatch(BoardAction::Add("a".into()));
    store.dispatch(BoardAction::Add("b".into()));
    store.dispatch(BoardAction::Toggle(1));

    rx.changed().await.expect("store dropped");
    let seen = rx.borrow_and_update().clone();
    assert_eq!(seen, store.snapshot());
    assert!(seen.tasks[0].done);
}
