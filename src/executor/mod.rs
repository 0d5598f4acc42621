// src/executor/mod.rs

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use regex::Regex;

use crate::protocol::{ExecutionResult, ReportKind};

const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Runs one step's generated code in an isolated subprocess, or returns a
/// canned outcome in mock mode. The temporary code file lives only for the
/// duration of one `execute` call and is removed on every exit path.
pub struct Executor {
    working_dir: PathBuf,
    interpreter: String,
    timeout: Duration,
}

impl Executor {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            interpreter: "python3".to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Deterministic canned outcome for a step's action label, used to
    /// exercise the control loop without the toolchain installed. The
    /// report-producing actions attach a report bundle so the metrics path
    /// runs end to end.
    pub fn mock_execute(&self, action: &str) -> ExecutionResult {
        let (stdout, with_reports) = match action {
            "read_design" => ("Design read: 5420 instances, 3 clocks", false),
            "floorplan" => ("Floorplan initialized: utilization 70%", false),
            "placement" => ("Placement complete: HPWL 1.24e6 um", false),
            "cts" => ("Clock tree synthesis complete: 142 buffers inserted", false),
            "routing" => ("Routing complete: 0 shorts", true),
            "write_gds" => ("GDS written to out/design.gds", true),
            other => {
                tracing::debug!(action = other, "mock execution of unrecognized action");
                ("Step completed", false)
            }
        };

        let mut reports = BTreeMap::new();
        if with_reports {
            reports.insert(
                ReportKind::Timing,
                "Timing summary\nWNS: 0.12\nTNS: 0.00\nViolations: 0".to_string(),
            );
            reports.insert(
                ReportKind::Congestion,
                "Congestion map\nMax: 45%\nAvg: 18%".to_string(),
            );
            reports.insert(ReportKind::Drc, "DRC report\nViolations: 0".to_string());
        }

        ExecutionResult {
            success: true,
            stdout: Some(stdout.to_string()),
            stderr: None,
            error: None,
            exit_code: None,
            reports,
        }
    }

    /// Write the code to a uniquely named file, run it under the configured
    /// interpreter with a wall-clock timeout, and capture the outcome. A
    /// timeout or any invocation failure becomes a failed result rather
    /// than an error; this call does not fail.
    pub fn execute(&self, code: &str) -> ExecutionResult {
        tracing::info!(bytes = code.len(), "executing generated code");
        match self.run_code(code) {
            Ok(result) => {
                tracing::info!(success = result.success, exit_code = ?result.exit_code, "execution finished");
                result
            }
            Err(e) => {
                tracing::warn!(error = %e, "execution failed to launch");
                ExecutionResult::failure(e.to_string())
            }
        }
    }

    fn run_code(&self, code: &str) -> io::Result<ExecutionResult> {
        fs::create_dir_all(&self.working_dir)?;

        // Owned by this scope: dropped (and unlinked) on success, timeout,
        // I/O error, and panic alike.
        let script = tempfile::Builder::new()
            .prefix("step_")
            .suffix(".py")
            .tempfile_in(&self.working_dir)?;
        fs::write(script.path(), code)?;

        let mut out_file = tempfile::tempfile()?;
        let mut err_file = tempfile::tempfile()?;

        let mut child = Command::new(&self.interpreter)
            .arg(script.path())
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(out_file.try_clone()?))
            .stderr(Stdio::from(err_file.try_clone()?))
            .spawn()?;

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                return Ok(ExecutionResult::failure(format!(
                    "execution timeout after {}s",
                    self.timeout.as_secs()
                )));
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(ExecutionResult {
            success: status.success(),
            stdout: Some(read_back(&mut out_file)?),
            stderr: Some(read_back(&mut err_file)?),
            error: None,
            exit_code: status.code(),
            reports: BTreeMap::new(),
        })
    }
}

fn read_back(file: &mut File) -> io::Result<String> {
    let mut buf = String::new();
    file.seek(SeekFrom::Start(0))?;
    file.read_to_string(&mut buf)?;
    Ok(buf)
}

/// Pull an embedded code block out of free-form model output: the first
/// fenced block if one exists, otherwise a heuristic run of lines starting
/// at the first import statement and ending at the first line that looks
/// like a bare, non-assignment, non-call statement.
pub fn extract_code(text: &str) -> Option<String> {
    let fence = Regex::new(r"(?s)```(?:python)?\n(.*?)\n```").unwrap();
    if let Some(captures) = fence.captures(text) {
        return Some(captures[1].trim().to_string());
    }

    if !text.contains("from openroad import") && !text.contains("import openroad") {
        return None;
    }

    let mut code_lines = Vec::new();
    let mut started = false;

    for line in text.lines() {
        if line.contains("import") {
            started = true;
        }
        if started {
            code_lines.push(line);
            let trimmed = line.trim();
            let is_code = trimmed.is_empty()
                || trimmed.starts_with('#')
                || trimmed.starts_with("from")
                || trimmed.starts_with("import")
                || trimmed.contains('=')
                || trimmed.contains('(');
            if !is_code {
                break;
            }
        }
    }

    if code_lines.is_empty() {
        None
    } else {
        Some(code_lines.join("\n").trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn leftover_scripts(dir: &std::path::Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|ext| ext == "py"))
                    .collect()
            })
            .unwrap_or_default()
    }

    #[test]
    fn mock_outcomes_are_deterministic() {
        let executor = Executor::new(".");
        let a = executor.mock_execute("floorplan");
        let b = executor.mock_execute("floorplan");
        assert!(a.success);
        assert_eq!(a.stdout, b.stdout);
        assert!(a.reports.is_empty());
    }

    #[test]
    fn mock_final_actions_carry_reports() {
        let executor = Executor::new(".");
        for action in ["routing", "write_gds"] {
            let result = executor.mock_execute(action);
            assert!(result.success);
            assert!(result.reports.contains_key(&ReportKind::Timing));
            assert!(result.reports.contains_key(&ReportKind::Congestion));
            assert!(result.reports.contains_key(&ReportKind::Drc));
        }
    }

    #[test]
    fn successful_run_captures_stdout_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(dir.path()).with_interpreter("sh");
        let result = executor.execute("echo hello from step");

        assert!(result.success);
        assert_eq!(result.exit_code, Some(0));
        assert!(result.stdout.unwrap().contains("hello from step"));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[test]
    fn nonzero_exit_is_failure_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(dir.path()).with_interpreter("sh");
        let result = executor.execute("echo boom >&2\nexit 3");

        assert!(!result.success);
        assert_eq!(result.exit_code, Some(3));
        assert!(result.stderr.unwrap().contains("boom"));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[test]
    fn timeout_kills_the_process_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(dir.path())
            .with_interpreter("sh")
            .with_timeout(Duration::from_secs(1));
        let result = executor.execute("sleep 30");

        assert!(!result.success);
        assert!(result.error.unwrap().contains("timeout after 1s"));
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[test]
    fn missing_interpreter_is_failure_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let executor = Executor::new(dir.path()).with_interpreter("orflow-no-such-interpreter");
        let result = executor.execute("echo never runs");

        assert!(!result.success);
        assert!(result.error.is_some());
        assert!(leftover_scripts(dir.path()).is_empty());
    }

    #[test]
    fn extracts_fenced_block_first() {
        let text = "Here you go:\n```python\nfrom openroad import Design\ndesign.link('top')\n```\ntrailing prose";
        let code = extract_code(text).unwrap();
        assert_eq!(code, "from openroad import Design\ndesign.link('top')");
    }

    #[test]
    fn extracts_import_run_without_fences() {
        let text = "Sure! The code below reads the design.\nfrom openroad import Tech, Design\ntech = Tech()\ndesign = Design(tech)\ndone\nmore prose";
        let code = extract_code(text).unwrap();
        assert!(code.starts_with("from openroad import"));
        assert!(code.ends_with("done"));
    }

    #[test]
    fn no_code_yields_none() {
        assert_eq!(extract_code("just a chatty answer, no code at all"), None);
    }
}
