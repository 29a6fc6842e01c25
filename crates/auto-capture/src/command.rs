//! Short-lived helper programs run with a hard deadline.
//!
//! The control loop calls these synchronously, so a wedged device driver must
//! not hold it forever: the child is killed once the deadline passes.

use std::{
    io::Read,
    process::{Child, Command, Stdio},
    thread,
    time::{Duration, Instant},
};

const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Run `program` with `args` and return its stdout.
///
/// Fails when the program cannot be started, exits unsuccessfully, or is
/// still running after `deadline`, in which case it is killed.
pub(crate) fn run_bounded(program: &str, args: &[&str], deadline: Duration) -> Result<String, String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to run {program}: {e}"))?;

    let stdout = drain(child.stdout.take());
    let stderr = drain(child.stderr.take());

    let status = wait_until(&mut child, Instant::now() + deadline);

    let stdout = stdout.join().unwrap_or_default();
    let stderr = stderr.join().unwrap_or_default();

    match status {
        Some(Ok(status)) if status.success() => Ok(stdout),
        Some(Ok(status)) => Err(format!(
            "{program} {} exited with {status}: {}",
            args.join(" "),
            stderr.trim()
        )),
        Some(Err(e)) => Err(format!("waiting for {program} failed: {e}")),
        None => Err(format!(
            "{program} {} timed out after {} ms",
            args.join(" "),
            deadline.as_millis()
        )),
    }
}

/// Poll `child` until it exits or `deadline` passes; `None` means it was killed.
fn wait_until(child: &mut Child, deadline: Instant) -> Option<std::io::Result<std::process::ExitStatus>> {
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(Ok(status)),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return None;
            }
            Ok(None) => thread::sleep(WAIT_POLL_INTERVAL),
            Err(e) => return Some(Err(e)),
        }
    }
}

/// Read a pipe to the end on its own thread so a chatty child never blocks on a full pipe.
fn drain<R: Read + Send + 'static>(pipe: Option<R>) -> thread::JoinHandle<String> {
    thread::spawn(move || {
        let mut text = String::new();
        if let Some(mut pipe) = pipe {
            let mut bytes = Vec::new();
            if pipe.read_to_end(&mut bytes).is_ok() {
                text = String::from_utf8_lossy(&bytes).into_owned();
            }
        }
        text
    })
}
