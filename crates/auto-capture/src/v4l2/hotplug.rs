use crate::v4l2::{V4l2Parser, scan};

use auto_capture_core::{CoreResult, HotplugEvent, HotplugSink};

use std::{
    collections::BTreeSet,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use tracing::{debug, info, warn};

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Background thread diffing the set of attached capture devices.
///
/// V4L2 has no hot-plug callback of its own, so arrivals and departures are
/// derived from successive enumerations keyed by USB bus info.
pub(crate) struct HotplugWatcher {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl HotplugWatcher {
    pub fn spawn(
        pattern: String,
        parser: Arc<V4l2Parser>,
        interval: Duration,
        sink: HotplugSink,
    ) -> std::io::Result<Self> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread_stop = Arc::clone(&stop);

        let handle = thread::Builder::new()
            .name("hotplug-watcher".to_string())
            .spawn(move || watch(&pattern, &parser, interval, &sink, &thread_stop))?;

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it. Returns within one stop-check interval
    /// plus whatever enumeration is in flight.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Hot-plug watcher thread panicked");
            }
        }
    }
}

impl Drop for HotplugWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

fn attached(pattern: &str, parser: &V4l2Parser) -> CoreResult<BTreeSet<String>> {
    Ok(scan(pattern, parser)?
        .into_iter()
        .map(|n| n.instance_path())
        .collect())
}

/// Fold one enumeration into `known` and return the resulting events.
///
/// A failed enumeration says nothing about what is attached, so it leaves
/// `known` alone and produces no events. Until the first success there is
/// no baseline to diff against.
pub(crate) fn advance(
    known: &mut Option<BTreeSet<String>>,
    scanned: CoreResult<BTreeSet<String>>,
) -> Vec<HotplugEvent> {
    let current = match scanned {
        Ok(current) => current,
        Err(e) => {
            warn!(error = %e, "Hot-plug enumeration failed, keeping previous device set");
            return Vec::new();
        }
    };

    let events = match known.as_ref() {
        Some(before) => diff(before, &current),
        None => Vec::new(),
    };
    *known = Some(current);
    events
}

fn watch(
    pattern: &str,
    parser: &V4l2Parser,
    interval: Duration,
    sink: &HotplugSink,
    stop: &AtomicBool,
) {
    let mut known = None;
    let initial = advance(&mut known, attached(pattern, parser));
    debug!(
        devices = known.as_ref().map_or(0, BTreeSet::len),
        events = initial.len(),
        "Hot-plug watcher started"
    );

    loop {
        let deadline = Instant::now() + interval;
        while Instant::now() < deadline {
            if stop.load(Ordering::SeqCst) {
                debug!("Hot-plug watcher stopped");
                return;
            }
            thread::sleep(STOP_CHECK_INTERVAL.min(interval));
        }

        for event in advance(&mut known, attached(pattern, parser)) {
            info!(event = ?event, "USB hot-plug event");
            if sink.send(event).is_err() {
                debug!("Hot-plug receiver gone, watcher exiting");
                return;
            }
        }
    }
}

/// Events turning `before` into `after`: departures first, then arrivals.
pub(crate) fn diff(before: &BTreeSet<String>, after: &BTreeSet<String>) -> Vec<HotplugEvent> {
    before
        .difference(after)
        .map(|path| HotplugEvent::Left(path.clone()))
        .chain(
            after
                .difference(before)
                .map(|path| HotplugEvent::Arrived(path.clone())),
        )
        .collect()
}
