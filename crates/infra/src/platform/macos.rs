//! macOS probe implementations
//!
//! Both probes shell out rather than binding system frameworks: `ioreg`
//! exposes the HID idle counter and System Events reports the frontmost
//! process. Subprocesses run under a hard timeout so a wedged helper can
//! never stall a capture tick.

use std::process::{Command, Stdio};
use std::time::Duration;

use tempo_domain::errors::{Result, TempoError};
use wait_timeout::ChildExt;

const COMMAND_TIMEOUT: Duration = Duration::from_secs(3);

const FRONTMOST_SCRIPT: &str = "tell application \"System Events\" to get name of first \
                                application process whose frontmost is true";

/// Current HID idle duration via `ioreg -c IOHIDSystem`.
pub fn hid_idle_duration() -> Result<Duration> {
    let output = run_with_timeout("ioreg", &["-c", "IOHIDSystem", "-d", "4"])?;
    parse_hid_idle_ns(&output)
        .map(Duration::from_nanos)
        .ok_or_else(|| TempoError::Platform("HIDIdleTime not found in ioreg output".to_string()))
}

/// Name of the frontmost application process via System Events.
pub fn frontmost_app_name() -> Result<String> {
    let output = run_with_timeout("osascript", &["-e", FRONTMOST_SCRIPT])?;
    let name = output.trim();
    if name.is_empty() {
        return Err(TempoError::Platform("empty frontmost application name".to_string()));
    }
    Ok(name.to_string())
}

/// Run a command, killing it if it exceeds the probe timeout.
fn run_with_timeout(program: &str, args: &[&str]) -> Result<String> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .stdin(Stdio::null())
        .spawn()
        .map_err(|e| TempoError::Platform(format!("failed to spawn {program}: {e}")))?;

    match child
        .wait_timeout(COMMAND_TIMEOUT)
        .map_err(|e| TempoError::Platform(format!("failed to wait for {program}: {e}")))?
    {
        Some(status) if status.success() => {
            let mut stdout = String::new();
            if let Some(mut out) = child.stdout.take() {
                use std::io::Read;
                out.read_to_string(&mut stdout)
                    .map_err(|e| TempoError::Platform(format!("failed to read {program}: {e}")))?;
            }
            Ok(stdout)
        }
        Some(status) => {
            Err(TempoError::Platform(format!("{program} exited with status {status}")))
        }
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(TempoError::Platform(format!(
                "{program} timed out after {COMMAND_TIMEOUT:?}"
            )))
        }
    }
}

/// Capture every attached display via `screencapture`.
///
/// The utility accepts one output path per display and writes only as many
/// files as displays exist; missing trailing files are not an error.
pub fn capture_displays() -> Result<Vec<tempo_core::tracking::CapturedFrame>> {
    const MAX_DISPLAYS: usize = 4;

    let dir = tempfile::tempdir()
        .map_err(|e| TempoError::Platform(format!("failed to create capture dir: {e}")))?;
    let paths: Vec<_> =
        (1..=MAX_DISPLAYS).map(|n| dir.path().join(format!("display{n}.png"))).collect();

    let mut args = vec!["-x", "-t", "png"];
    let rendered: Vec<String> =
        paths.iter().map(|p| p.to_string_lossy().into_owned()).collect();
    args.extend(rendered.iter().map(String::as_str));
    run_with_timeout("screencapture", &args)?;

    let mut frames = Vec::new();
    for (idx, path) in paths.iter().enumerate() {
        if !path.exists() {
            break;
        }
        let png = std::fs::read(path)?;
        frames.push(tempo_core::tracking::CapturedFrame {
            display: (idx + 1).to_string(),
            png,
        });
    }
    if frames.is_empty() {
        return Err(TempoError::Platform("screencapture produced no frames".to_string()));
    }
    Ok(frames)
}

/// Extract the `HIDIdleTime` value (nanoseconds) from `ioreg` output.
pub fn parse_hid_idle_ns(output: &str) -> Option<u64> {
    output
        .lines()
        .find(|line| line.contains("HIDIdleTime"))
        .and_then(|line| line.rsplit('=').next())
        .and_then(|value| value.trim().parse::<u64>().ok())
}
