use std::error::Error;
use std::fs::File;
use std::time::Duration;

use mediaguard::notifier::Category;
use mediaguard::session::{MonitorSession, SessionOptions, SessionState};
use mediaguard::watch::{SemanticEvent, TreeOptions};
use mediaguard_test_utils::{init_tracing, wait_for, RecordingNotifier, TempMediaRoot};

type TestResult = Result<(), Box<dyn Error>>;

const WAIT: Duration = Duration::from_secs(3);

fn fast_options() -> SessionOptions {
    SessionOptions {
        event_backoff: Duration::from_millis(10),
        tree: TreeOptions {
            pending_move_ttl: Duration::from_millis(500),
            ..TreeOptions::default()
        },
    }
}

#[test]
fn stop_joins_and_is_idempotent() -> TestResult {
    init_tracing();
    let media = TempMediaRoot::new();
    let root = media.attach("stick");
    std::fs::create_dir(root.path().join("docs"))?;

    let recorder = RecordingNotifier::new();
    let mut session = MonitorSession::start(root.clone(), fast_options(), recorder.shared())?;
    assert!(wait_for(WAIT, || session.state() == SessionState::Watching));
    assert!(session.is_running());

    let file = root.path().join("docs").join("report.pdf");
    File::create(&file)?;
    assert!(wait_for(WAIT, || !recorder.events_for(&root).is_empty()));
    assert_eq!(
        recorder.events_for(&root),
        vec![SemanticEvent::Created {
            path: file,
            is_dir: false
        }]
    );

    session.stop();
    assert_eq!(session.state(), SessionState::Stopped);
    assert!(!session.is_running());
    let report = session.report().cloned().ok_or("no report after stop")?;
    assert_eq!(report.released_watches, 2);
    assert_eq!(report.error, None);

    session.stop();
    assert_eq!(recorder.count_containing("Stopped monitoring"), 1);
    assert_eq!(recorder.count_containing("Monitoring"), 1);
    Ok(())
}

#[test]
fn reattach_starts_a_fresh_session() -> TestResult {
    init_tracing();
    let media = TempMediaRoot::new();
    let root = media.attach("stick");
    let recorder = RecordingNotifier::new();

    let mut first = MonitorSession::start(root.clone(), fast_options(), recorder.shared())?;
    assert!(wait_for(WAIT, || first.state() == SessionState::Watching));
    first.stop();

    media.detach("stick");
    let root = media.attach("stick");
    recorder.clear();

    let mut second = MonitorSession::start(root.clone(), fast_options(), recorder.shared())?;
    assert!(wait_for(WAIT, || second.state() == SessionState::Watching));

    let file = root.path().join("again.txt");
    File::create(&file)?;
    assert!(wait_for(WAIT, || !recorder.events_for(&root).is_empty()));
    assert_eq!(
        recorder.events_for(&root),
        vec![SemanticEvent::Created {
            path: file,
            is_dir: false
        }]
    );

    second.stop();
    assert_eq!(second.report().map(|r| r.released_watches), Some(1));
    assert_eq!(recorder.messages(&Category::Session).len(), 2);
    Ok(())
}

#[test]
fn events_are_attributed_to_their_own_device() -> TestResult {
    init_tracing();
    let media = TempMediaRoot::new();
    let recorder = RecordingNotifier::new();

    let roots: Vec<_> = ["a", "b", "c"].iter().map(|n| media.attach(n)).collect();
    let mut sessions = Vec::new();
    for root in &roots {
        sessions.push(MonitorSession::start(
            root.clone(),
            fast_options(),
            recorder.shared(),
        )?);
    }
    assert!(wait_for(WAIT, || sessions
        .iter()
        .all(|s| s.state() == SessionState::Watching)));

    for root in &roots {
        File::create(root.path().join("own.txt"))?;
    }
    assert!(wait_for(WAIT, || recorder.file_events().len() >= roots.len()));

    for root in &roots {
        let events = recorder.events_for(root);
        assert_eq!(events.len(), 1, "events for {root}: {events:?}");
        for event in events {
            assert!(event.paths().iter().all(|p| p.starts_with(root.path())));
        }
    }

    for mut session in sessions {
        session.stop();
    }
    Ok(())
}

#[test]
fn vanished_root_does_not_affect_siblings() -> TestResult {
    init_tracing();
    let media = TempMediaRoot::new();
    let recorder = RecordingNotifier::new();

    let good = media.attach("good");
    let gone = media.attach("gone");
    media.detach("gone");

    let mut ok = MonitorSession::start(good.clone(), fast_options(), recorder.shared())?;
    let mut empty = MonitorSession::start(gone.clone(), fast_options(), recorder.shared())?;
    assert!(wait_for(WAIT, || ok.state() == SessionState::Watching));
    assert!(wait_for(WAIT, || empty.state() == SessionState::Watching));

    File::create(good.path().join("still.txt"))?;
    assert!(wait_for(WAIT, || recorder.events_for(&good).len() == 1));

    empty.stop();
    assert_eq!(empty.report().map(|r| r.released_watches), Some(0));
    ok.stop();
    Ok(())
}
