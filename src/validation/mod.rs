// src/validation/mod.rs

use std::io::Write;
use std::process::{Command, Stdio};

/// Outcome of statically checking one step's generated code. Advisory:
/// execution is still attempted with best-effort corrected code even when
/// errors remain.
#[derive(Clone, Debug, Default)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Static acceptability checks for generated OpenROAD Python code. All
/// checks run; outcomes accumulate rather than short-circuit.
pub struct CodeValidator {
    valid_imports: &'static [&'static str],
    invalid_patterns: &'static [&'static str],
    interpreter: String,
}

const VALID_IMPORTS: &[&str] = &["from openroad import", "import openroad", "import odb"];

const INVALID_PATTERNS: &[&str] = &[
    "parseVerilogFile",
    "ord.Flow()",
    "runRTL2PDN",
    "design.compile()",
];

impl CodeValidator {
    pub fn new() -> Self {
        Self {
            valid_imports: VALID_IMPORTS,
            invalid_patterns: INVALID_PATTERNS,
            interpreter: "python3".to_string(),
        }
    }

    /// Override the interpreter used for the syntax check.
    pub fn with_interpreter(mut self, interpreter: &str) -> Self {
        self.interpreter = interpreter.to_string();
        self
    }

    pub fn validate(&self, code: &str) -> ValidationResult {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();

        let has_import = self.valid_imports.iter().any(|imp| code.contains(imp));
        if !has_import {
            errors.push("Missing OpenROAD imports".to_string());
        }

        match self.check_syntax(code) {
            Ok(Some(message)) => errors.push(format!("Syntax error: {message}")),
            Ok(None) => {}
            Err(e) => {
                // No interpreter on this host; the check is skipped, not failed.
                tracing::debug!(error = %e, "syntax check unavailable");
                warnings.push("Syntax check skipped: interpreter unavailable".to_string());
            }
        }

        for invalid in self.invalid_patterns {
            if code.contains(invalid) {
                errors.push(format!("Invalid API call: {invalid}"));
            }
        }

        if code.len() < 20 {
            warnings.push("Code seems too short".to_string());
        }
        if code.len() > 2000 {
            warnings.push("Code seems very long".to_string());
        }

        ValidationResult {
            is_valid: errors.is_empty(),
            errors,
            warnings,
        }
    }

    /// Parse the code with the host language's own parser. `Ok(Some)` holds
    /// the parser's complaint, `Ok(None)` means the code parsed, `Err` means
    /// the interpreter could not be spawned.
    fn check_syntax(&self, code: &str) -> std::io::Result<Option<String>> {
        let mut child = Command::new(&self.interpreter)
            .args(["-c", "import ast, sys; ast.parse(sys.stdin.read())"])
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            // The child may exit before reading everything; a broken pipe
            // here is not a validation outcome.
            let _ = stdin.write_all(code.as_bytes());
        }

        let output = child.wait_with_output()?;
        if output.status.success() {
            Ok(None)
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = stderr.lines().last().unwrap_or("invalid syntax").to_string();
            Ok(Some(message))
        }
    }

    /// Human-readable remediation hints for known error shapes. Advisory
    /// text only; the corrector does not consume these.
    pub fn suggestions(&self, errors: &[String]) -> Vec<String> {
        let mut suggestions = Vec::new();

        for error in errors {
            if error.contains("parseVerilogFile") {
                suggestions.push("Use design.readVerilog() instead".to_string());
            } else if error.contains("Flow()") {
                suggestions.push("Use individual OpenROAD commands".to_string());
            } else if error.contains("Missing OpenROAD imports") {
                suggestions.push("Add: from openroad import Tech, Design".to_string());
            }
        }

        suggestions
    }
}

impl Default for CodeValidator {
    fn default() -> Self {
        Self::new()
    }
}
