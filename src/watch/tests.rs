use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use rustc_hash::FxHashMap;
use tempfile::TempDir;

use super::debouncer::{DEBOUNCE_MS, Debouncer, is_temp_file};
use super::router::GroupRouter;
use super::types::ChangeKind;
use super::worker::{self, RebuildFn, messages_for};
use crate::config::section::StyleDialect;
use crate::config::{AssetflowConfig, test_config_at};
use crate::core::{AssetGroup, ShutdownToken};
use crate::pipeline::{InjectedCss, RunReport};
use crate::reload::{ReloadHub, ReloadMessage};

fn make_event(paths: Vec<&str>, kind: notify::EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: paths.into_iter().map(PathBuf::from).collect(),
        attrs: Default::default(),
    }
}

fn modify_kind() -> notify::EventKind {
    notify::EventKind::Modify(notify::event::ModifyKind::Data(
        notify::event::DataChange::Any,
    ))
}

fn create_kind() -> notify::EventKind {
    notify::EventKind::Create(notify::event::CreateKind::File)
}

fn remove_kind() -> notify::EventKind {
    notify::EventKind::Remove(notify::event::RemoveKind::File)
}

fn project(files: &[(&str, &str)]) -> (TempDir, AssetflowConfig) {
    let dir = TempDir::new().unwrap();
    for (rel, content) in files {
        let path = dir.path().join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    let root = dir.path().canonicalize().unwrap();
    let mut config = test_config_at(&root);
    config.serve.port = 0;
    config.serve.ws_port = 0;
    (dir, config)
}

// ============================================================================
// Debouncer
// ============================================================================

#[test]
fn test_debouncer_empty() {
    let mut debouncer = Debouncer::new();
    assert!(!debouncer.is_ready());
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_event_routing_by_kind() {
    let mut debouncer = Debouncer::new();

    debouncer.add_event(&make_event(vec!["/tmp/a.scss"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/b.scss"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/c.scss"], remove_kind()));

    assert_eq!(debouncer.changes.len(), 3);
    assert_eq!(debouncer.changes[Path::new("/tmp/a.scss")], ChangeKind::Created);
    assert_eq!(debouncer.changes[Path::new("/tmp/b.scss")], ChangeKind::Modified);
    assert_eq!(debouncer.changes[Path::new("/tmp/c.scss")], ChangeKind::Removed);
}

#[test]
fn test_metadata_changes_ignored() {
    let mut debouncer = Debouncer::new();
    let kind = notify::EventKind::Modify(notify::event::ModifyKind::Metadata(
        notify::event::MetadataKind::WriteTime,
    ));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], kind));
    assert!(debouncer.changes.is_empty());
    assert!(debouncer.last_event.is_none());
}

#[test]
fn test_temp_files_ignored() {
    for name in ["/tmp/a.scss.swp", "/tmp/a.js~", "/tmp/.a.js", "/tmp/4913.tmp", "/tmp/x.bak"] {
        assert!(is_temp_file(Path::new(name)), "{name}");
    }
    assert!(!is_temp_file(Path::new("/tmp/main.scss")));

    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/real.js"], modify_kind()));
    let first = debouncer.last_event.unwrap();
    std::thread::sleep(Duration::from_millis(5));

    debouncer.add_event(&make_event(vec!["/tmp/.real.js.swp"], modify_kind()));
    assert_eq!(debouncer.last_event.unwrap(), first);
    assert_eq!(debouncer.changes.len(), 1);
}

#[test]
fn test_dedup_first_event_wins() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));

    assert_eq!(debouncer.changes.len(), 1);
    assert_eq!(debouncer.changes[Path::new("/tmp/a.js")], ChangeKind::Created);
}

#[test]
fn test_remove_then_create_restores() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    assert_eq!(debouncer.changes[Path::new("/tmp/a.js")], ChangeKind::Created);
}

#[test]
fn test_create_then_remove_discards() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    assert!(debouncer.changes.is_empty());
}

#[test]
fn test_create_then_remove_goes_idle() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], create_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));

    assert!(debouncer.last_event.is_none());
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
    assert!(debouncer.take_if_ready().is_none());
}

#[test]
fn test_sleep_is_long_without_pending_changes() {
    let mut debouncer = Debouncer::new();
    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS * 2));
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));
}

#[test]
fn test_modify_then_remove_upgrades() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], remove_kind()));
    assert_eq!(debouncer.changes[Path::new("/tmp/a.js")], ChangeKind::Removed);
}

#[test]
fn test_sleep_duration() {
    let mut debouncer = Debouncer::new();
    assert!(debouncer.sleep_duration() >= Duration::from_secs(3600));

    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));
    debouncer.last_event = Some(Instant::now());
    let dur = debouncer.sleep_duration();
    assert!(dur >= Duration::from_millis(DEBOUNCE_MS - 10));
    assert!(dur <= Duration::from_millis(DEBOUNCE_MS));
}

#[test]
fn test_ready_after_quiet_period() {
    let mut debouncer = Debouncer::new();
    debouncer.add_event(&make_event(vec!["/tmp/a.js"], modify_kind()));
    assert!(!debouncer.is_ready());

    debouncer.last_event = Some(Instant::now() - Duration::from_millis(DEBOUNCE_MS));
    let changes = debouncer.take_if_ready().unwrap();
    assert_eq!(changes.len(), 1);
    assert!(debouncer.changes.is_empty());
    assert!(!debouncer.is_ready());
}

// ============================================================================
// Router
// ============================================================================

#[test]
fn test_route_by_group() {
    let (_dir, config) = project(&[]);
    let router = GroupRouter::new(&config).unwrap();
    let src = config.root.join("src");

    let mut changes = FxHashMap::default();
    changes.insert(src.join("styles/main.scss"), ChangeKind::Modified);
    changes.insert(src.join("img/logo.png"), ChangeKind::Created);
    assert_eq!(
        router.route(&changes),
        [AssetGroup::Styles, AssetGroup::Images]
    );

    let mut changes = FxHashMap::default();
    changes.insert(src.join("index.html"), ChangeKind::Modified);
    changes.insert(src.join("scripts/app.js"), ChangeKind::Removed);
    assert_eq!(
        router.route(&changes),
        [AssetGroup::Html, AssetGroup::Scripts]
    );
}

#[test]
fn test_route_ignores_templates_and_unrelated() {
    let (_dir, config) = project(&[]);
    let router = GroupRouter::new(&config).unwrap();

    let mut changes = FxHashMap::default();
    changes.insert(config.root.join("src/index.pug"), ChangeKind::Modified);
    changes.insert(config.root.join("README.md"), ChangeKind::Modified);
    changes.insert(config.root.join("dist/css/main.min.css"), ChangeKind::Modified);
    assert!(router.route(&changes).is_empty());
}

#[test]
fn test_watch_roots_deduplicated() {
    let (_dir, config) = project(&[]);
    let router = GroupRouter::new(&config).unwrap();
    assert_eq!(router.watch_roots(), [config.root.join("src")]);
}

// ============================================================================
// Worker
// ============================================================================

fn report(group: AssetGroup) -> RunReport {
    RunReport::new(group)
}

#[test]
fn test_messages_for_policies() {
    let mut failing = false;

    let msgs = messages_for(&report(AssetGroup::Scripts), &mut failing);
    assert_eq!(msgs, [ReloadMessage::reload("scripts")]);

    assert!(messages_for(&report(AssetGroup::Images), &mut failing).is_empty());

    let mut styles = report(AssetGroup::Styles);
    styles.injected = Some(InjectedCss {
        path: "/css/main.min.css".into(),
        content: "a{}".into(),
    });
    let msgs = messages_for(&styles, &mut failing);
    assert_eq!(msgs, [ReloadMessage::css("/css/main.min.css", "a{}")]);
}

#[test]
fn test_messages_for_failure_then_recovery() {
    let mut failing = false;
    let mut failed = report(AssetGroup::Html);
    failed.fail(Path::new("src/index.html"), "boom");

    let msgs = messages_for(&failed, &mut failing);
    assert!(failing);
    assert!(matches!(&msgs[..], [ReloadMessage::Error { group, message }]
        if group == "html" && message.contains("boom")));

    let msgs = messages_for(&report(AssetGroup::Html), &mut failing);
    assert!(!failing);
    assert_eq!(msgs, [ReloadMessage::ClearError, ReloadMessage::reload("html")]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_triggers_during_run_coalesce_into_one() {
    let runs = Arc::new(AtomicUsize::new(0));
    let rebuild: RebuildFn = {
        let runs = Arc::clone(&runs);
        Arc::new(move |group| {
            runs.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(200));
            Ok(RunReport::new(group))
        })
    };

    let (handle, task) = worker::spawn(AssetGroup::Images, rebuild, ReloadHub::new());
    assert!(handle.trigger());

    // Wait until the first run is in progress
    let deadline = Instant::now() + Duration::from_secs(5);
    while runs.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "first run never started");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let accepted = (0..5).filter(|_| handle.trigger()).count();
    assert_eq!(accepted, 1);

    drop(handle);
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("worker should stop")
        .unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

// ============================================================================
// Watch task
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watch_rebuilds_changed_group_and_stops() {
    let (dir, mut config) = project(&[("src/styles/main.css", ".a { color: red; }")]);
    config.styles.dialect = StyleDialect::Css;
    config.paths.styles.sources = vec!["src/styles/**/*.css".to_string()];
    let shutdown = ShutdownToken::new();
    let task = tokio::spawn(super::run(Arc::new(config), shutdown.clone()));

    // Let the watches attach before editing
    tokio::time::sleep(Duration::from_millis(300)).await;
    fs::write(dir.path().join("src/styles/main.css"), ".b { color: blue; }").unwrap();

    let output = dir.path().join("dist/css/main.min.css");
    let deadline = Instant::now() + Duration::from_secs(10);
    while !fs::read_to_string(&output).is_ok_and(|css| css.contains(".b{")) {
        assert!(Instant::now() < deadline, "styles were not rebuilt");
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("watch should stop")
        .unwrap()
        .unwrap();
}
