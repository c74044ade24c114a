use super::*;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Barrier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Event {
    Start(TaskName),
    End(TaskName),
}

/// Records start/end events instead of running pipelines.
#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
    failing: Vec<TaskName>,
    /// Tasks that must all be running at once to get past the barrier.
    rendezvous: Option<(Vec<TaskName>, Arc<Barrier>)>,
}

struct RecordingRunner(Arc<Recorder>);

impl TaskRunner for RecordingRunner {
    fn run(&self, task: TaskName) -> TaskFuture {
        let recorder = Arc::clone(&self.0);
        Box::pin(async move {
            recorder.events.lock().push(Event::Start(task));
            if let Some((tasks, barrier)) = &recorder.rendezvous
                && tasks.contains(&task)
            {
                barrier.wait().await;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
            recorder.events.lock().push(Event::End(task));
            if recorder.failing.contains(&task) {
                anyhow::bail!("{task} broke");
            }
            Ok(())
        })
    }
}

fn position(events: &[Event], event: Event) -> usize {
    events.iter().position(|e| *e == event).unwrap()
}

async fn run_recorded(graph: &TaskGraph, recorder: Recorder) -> (RunSummary, Vec<Event>) {
    let recorder = Arc::new(recorder);
    let runner: Arc<dyn TaskRunner> = Arc::new(RecordingRunner(Arc::clone(&recorder)));
    let summary = run_graph(graph, runner).await.unwrap();
    let events = recorder.events.lock().clone();
    (summary, events)
}

// ============================================================================
// graph validation
// ============================================================================

#[test]
fn test_build_graph_is_valid() {
    let graph = TaskGraph::build();
    graph.validate().unwrap();
    assert_eq!(graph.nodes().len(), 6);
    let mut after_html: Vec<_> = graph.dependents(TaskName::Html).collect();
    after_html.sort();
    assert_eq!(after_html, [TaskName::Styles, TaskName::Scripts, TaskName::Images]);
}

#[test]
fn test_unknown_dependency_rejected() {
    let graph = TaskGraph::new().task(TaskName::Styles, &[TaskName::Clean]);
    assert_eq!(
        graph.validate(),
        Err(GraphError::UnknownDependency {
            task: TaskName::Styles,
            dependency: TaskName::Clean,
        })
    );
}

#[test]
fn test_cycle_rejected() {
    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Clean, TaskName::Scripts])
        .task(TaskName::Scripts, &[TaskName::Html]);
    assert_eq!(
        graph.validate(),
        Err(GraphError::Cycle(vec![TaskName::Html, TaskName::Scripts]))
    );
}

#[test]
fn test_self_dependency_is_cycle() {
    let graph = TaskGraph::new().task(TaskName::Watch, &[TaskName::Watch]);
    assert!(matches!(graph.validate(), Err(GraphError::Cycle(_))));
}

#[test]
fn test_duplicate_rejected() {
    let graph = TaskGraph::single(TaskName::Clean).task(TaskName::Clean, &[]);
    assert_eq!(graph.validate(), Err(GraphError::Duplicate(TaskName::Clean)));
}

#[test]
fn test_repeated_dependency_counts_once() {
    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Clean, TaskName::Clean]);
    assert_eq!(graph.nodes()[1].deps, [TaskName::Clean]);
}

#[tokio::test]
async fn test_repeated_dependency_still_runs() {
    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Clean, TaskName::Clean]);
    let (summary, events) = run_recorded(&graph, Recorder::default()).await;

    assert_eq!(summary.outcome(TaskName::Html), Some(&TaskOutcome::Succeeded));
    assert!(events.contains(&Event::End(TaskName::Html)));
}

#[tokio::test]
async fn test_invalid_graph_runs_nothing() {
    let recorder = Arc::new(Recorder::default());
    let runner: Arc<dyn TaskRunner> = Arc::new(RecordingRunner(Arc::clone(&recorder)));
    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Html]);

    assert!(run_graph(&graph, runner).await.is_err());
    assert!(recorder.events.lock().is_empty());
}

// ============================================================================
// scheduling
// ============================================================================

#[tokio::test]
async fn test_dependents_start_after_dependencies_finish() {
    let graph = TaskGraph::build();
    let (summary, events) = run_recorded(&graph, Recorder::default()).await;

    assert!(summary.is_success());
    assert_eq!(summary.outcomes.len(), 6);
    for node in graph.nodes() {
        let start = position(&events, Event::Start(node.name));
        for dep in &node.deps {
            assert!(
                position(&events, Event::End(*dep)) < start,
                "{} started before {} finished",
                node.name,
                dep
            );
        }
    }
}

#[tokio::test]
async fn test_independent_tasks_overlap() {
    let parallel = vec![TaskName::Styles, TaskName::Scripts, TaskName::Images];
    let recorder = Recorder {
        rendezvous: Some((parallel, Arc::new(Barrier::new(3)))),
        ..Recorder::default()
    };

    // Sequential execution would never get past the barrier
    let result = tokio::time::timeout(
        Duration::from_secs(5),
        run_recorded(&TaskGraph::build(), recorder),
    )
    .await;
    let (summary, _) = result.expect("parallel stages did not run concurrently");
    assert!(summary.is_success());
}

#[tokio::test]
async fn test_failure_skips_dependents() {
    let recorder = Recorder {
        failing: vec![TaskName::Html],
        ..Recorder::default()
    };
    let (summary, events) = run_recorded(&TaskGraph::build(), recorder).await;

    assert!(!summary.is_success());
    assert_eq!(summary.outcome(TaskName::Clean), Some(&TaskOutcome::Succeeded));
    assert!(matches!(summary.outcome(TaskName::Html), Some(TaskOutcome::Failed(_))));
    for skipped in [TaskName::Styles, TaskName::Scripts, TaskName::Images, TaskName::Watch] {
        assert_eq!(summary.outcome(skipped), Some(&TaskOutcome::Skipped));
        assert!(!events.contains(&Event::Start(skipped)));
    }
    assert_eq!(summary.first_failure().map(|(n, _)| n), Some(TaskName::Html));
}

#[tokio::test]
async fn test_sibling_failure_lets_running_tasks_settle() {
    let recorder = Recorder {
        failing: vec![TaskName::Scripts],
        ..Recorder::default()
    };
    let (summary, events) = run_recorded(&TaskGraph::build(), recorder).await;

    assert_eq!(summary.outcome(TaskName::Styles), Some(&TaskOutcome::Succeeded));
    assert_eq!(summary.outcome(TaskName::Images), Some(&TaskOutcome::Succeeded));
    assert_eq!(summary.outcome(TaskName::Watch), Some(&TaskOutcome::Skipped));
    assert!(events.contains(&Event::End(TaskName::Styles)));
    assert!(!events.contains(&Event::Start(TaskName::Watch)));
}

#[tokio::test]
async fn test_panicking_task_is_failure() {
    struct Panicking;
    impl TaskRunner for Panicking {
        fn run(&self, _task: TaskName) -> TaskFuture {
            Box::pin(async {
                if true {
                    panic!("boom");
                }
                Ok::<(), anyhow::Error>(())
            })
        }
    }

    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Clean]);
    let summary = run_graph(&graph, Arc::new(Panicking)).await.unwrap();
    assert!(matches!(summary.outcome(TaskName::Clean), Some(TaskOutcome::Failed(_))));
    assert_eq!(summary.outcome(TaskName::Html), Some(&TaskOutcome::Skipped));
}

// ============================================================================
// pipeline runner
// ============================================================================

#[tokio::test]
async fn test_pipeline_runner_runs_clean_and_html() {
    let dir = tempfile::TempDir::new().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::create_dir_all(dir.path().join("dist/js")).unwrap();
    std::fs::write(dir.path().join("src/index.html"), "<p>\n  hi\n</p>").unwrap();

    let config = Arc::new(crate::config::test_config_at(dir.path()));
    let runner = PipelineRunner::new(config, ShutdownToken::new());
    let graph = TaskGraph::new()
        .task(TaskName::Clean, &[])
        .task(TaskName::Html, &[TaskName::Clean]);

    let summary = run_graph(&graph, Arc::new(runner.clone())).await.unwrap();
    assert!(summary.is_success());
    assert_eq!(runner.compile_failures(), 0);
    assert!(!dir.path().join("dist/js").exists());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("dist/main.min.html")).unwrap(),
        "<p> hi </p>"
    );
}
