use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use fetch_lifecycle::{DebouncedInput, FetchController, FetchOutcome, KeyedFetcher};
use serde::Serialize;
use state_store::{Reducer, Store};
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Parser, Debug)]
struct Args {
    /// Simulated latency for odd keys, in milliseconds.
    #[arg(long, default_value_t = 300)]
    slow_ms: u64,
    /// Simulated latency for even keys, in milliseconds.
    #[arg(long, default_value_t = 40)]
    fast_ms: u64,
    /// Quiet period for the debounced selector, in milliseconds.
    #[arg(long, default_value_t = 25)]
    debounce_ms: u64,
}

/// Variable-latency fetcher: odd keys are slow, even keys are fast, so a
/// quick reselection reliably finishes before the superseded fetch does.
struct SimulatedFetcher {
    slow: Duration,
    fast: Duration,
}

#[async_trait]
impl KeyedFetcher for SimulatedFetcher {
    type Key = u32;
    type Payload = String;

    async fn fetch(&self, key: u32, cancel: CancellationToken) -> Result<String> {
        let latency = if key % 2 == 1 { self.slow } else { self.fast };
        tokio::select! {
            _ = cancel.cancelled() => anyhow::bail!("request for key {key} aborted"),
            _ = tokio::time::sleep(latency) => Ok(format!("profile:{key}")),
        }
    }
}

async fn terminal_outcome(
    controller: &FetchController<SimulatedFetcher>,
) -> FetchOutcome<String> {
    let mut rx = controller.subscribe();
    loop {
        {
            let current = rx.borrow_and_update();
            if current.is_terminal() {
                return current.clone();
            }
        }
        rx.changed().await.expect("outcome channel closed");
    }
}

#[derive(Debug, Clone, Serialize)]
struct TaskItem {
    id: u64,
    text: String,
    done: bool,
}

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "snake_case")]
enum TaskFilter {
    All,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize)]
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
}

#[derive(Debug)]
enum BoardAction {
    Add(String),
    Toggle(u64),
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
            BoardAction::SetFilter(filter) => {
                next.filter = *filter;
            }
        }
        next
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();
    let args = Args::parse();

    let slow = Duration::from_millis(args.slow_ms);
    let fast = Duration::from_millis(args.fast_ms);

    println!("== stale-response suppression ==");
    let controller = FetchController::new(SimulatedFetcher { slow, fast });
    controller.on_key_changed(1).await?;
    info!("selected key 1 (slow fetch in flight)");
    tokio::time::sleep(fast / 2).await;
    controller.on_key_changed(2).await?;
    info!("selected key 2 before key 1 resolved");

    let outcome = terminal_outcome(&controller).await;
    println!("visible outcome: {}", serde_json::to_string(&outcome)?);
    // Give the superseded fetch time to finish and be discarded.
    tokio::time::sleep(slow).await;
    println!(
        "visible outcome after the superseded fetch finished: {}",
        serde_json::to_string(&controller.current_outcome())?
    );
    println!(
        "lifecycle stats: {}",
        serde_json::to_string(&controller.stats().await)?
    );
    controller.teardown().await;

    println!("\n== debounced selection burst ==");
    let controller = FetchController::new(SimulatedFetcher { slow, fast });
    let (input, forwarded) = DebouncedInput::new(Duration::from_millis(args.debounce_ms));
    for key in [2u32, 4, 6] {
        input.submit(key).await;
        tokio::time::sleep(Duration::from_millis(args.debounce_ms / 5)).await;
    }
    drop(input);
    controller
        .run_key_stream(UnboundedReceiverStream::new(forwarded))
        .await;
    let outcome = terminal_outcome(&controller).await;
    println!("visible outcome: {}", serde_json::to_string(&outcome)?);
    println!(
        "lifecycle stats (one launch for a burst of three): {}",
        serde_json::to_string(&controller.stats().await)?
    );
    controller.teardown().await;

    println!("\n== teardown finality ==");
    let controller = FetchController::new(SimulatedFetcher { slow, fast });
    controller.on_key_changed(1).await?;
    controller.teardown().await;
    tokio::time::sleep(slow + fast).await;
    println!(
        "visible outcome stays frozen after teardown: {}",
        serde_json::to_string(&controller.current_outcome())?
    );
    println!(
        "lifecycle stats: {}",
        serde_json::to_string(&controller.stats().await)?
    );

    println!("\n== reducer store ==");
    let store = Store::new(BoardReducer, BoardState::empty());
    for action in [
        BoardAction::Add("learn ownership".into()),
        BoardAction::Add("learn lifetimes".into()),
        BoardAction::Toggle(1),
        BoardAction::SetFilter(TaskFilter::Active),
    ] {
        println!("dispatching {action:?}");
        store.dispatch(action);
        println!("state: {}", serde_json::to_string(&store.snapshot())?);
    }

    Ok(())
}
