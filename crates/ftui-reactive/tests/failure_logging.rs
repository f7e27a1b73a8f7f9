//! Diagnostics emitted through `tracing`.

use std::io;
use std::rc::Rc;
use std::sync::{Arc, Mutex};

use ftui_reactive::{FrameScheduler, Listener, ListenerSet, Observable, ObservableConfig, bind};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Clone, Default)]
struct Capture(Arc<Mutex<Vec<u8>>>);

impl Capture {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for Capture {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Capture {
    type Writer = Capture;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn captured(f: impl FnOnce()) -> String {
    let capture = Capture::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(capture.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    capture.contents()
}

#[test]
fn listener_panic_is_logged_as_warning() {
    let logs = captured(|| {
        let obs = Observable::with_config(ObservableConfig::new().label("counter"));
        obs.add_listener(Listener::new(|| panic!("render exploded")))
            .unwrap();
        obs.notify();
    });
    assert!(logs.contains("WARN"), "logs: {logs}");
    assert!(logs.contains("listener panicked: render exploded"), "logs: {logs}");
    assert!(logs.contains("counter"), "logs: {logs}");
}

#[test]
fn fallible_listener_error_is_logged() {
    let logs = captured(|| {
        let obs = Observable::new();
        obs.add_listener(Listener::fallible(|| Err::<(), _>("widget gone")))
            .unwrap();
        obs.notify();
    });
    assert!(logs.contains("listener failed: widget gone"), "logs: {logs}");
}

#[test]
fn disabled_reporting_is_silent() {
    let logs = captured(|| {
        let obs = Observable::with_config(ObservableConfig::new().report_failures(false));
        obs.add_listener(Listener::new(|| panic!("quiet")))
            .unwrap();
        obs.notify();
    });
    assert!(!logs.contains("listener panicked"), "logs: {logs}");
}

#[test]
fn membership_failure_is_logged_at_debug() {
    let logs = captured(|| {
        let set = {
            let mut set = ListenerSet::new(Listener::new(|| {}));
            set.add_observable(Observable::new()).unwrap();
            let dead = Observable::new();
            let _ = set.add_observable(&dead);
            dead.dispose();
            set
        };
        let outcome = set.notify_all();
        assert_eq!(outcome.failure_count(), 1);
    });
    assert!(logs.contains("DEBUG"), "logs: {logs}");
    assert!(logs.contains("member #1 unusable"), "logs: {logs}");
}

#[test]
fn binding_transitions_are_traced() {
    let logs = captured(|| {
        let obs = Observable::new();
        let mut node = bind(obs, |_| ());
        node.attach(Rc::new(FrameScheduler::new())).unwrap();
        node.detach();
    });
    assert!(logs.contains("binding attached"), "logs: {logs}");
    assert!(logs.contains("binding detached"), "logs: {logs}");
}
