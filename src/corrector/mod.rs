// src/corrector/mod.rs

/// Comment left in place of a removed, unsupported API call. `clean`
/// strips lines consisting solely of this marker.
pub const REMOVED_MARKER: &str = "# removed: unsupported API";

/// Ordered (wrong, replacement) rules, applied in this exact order. Kept as
/// explicit pairs so rule data stays separate from the iteration logic. No
/// replacement contains its own pattern, which keeps correction idempotent.
const CORRECTION_RULES: &[(&str, &str)] = &[
    // Method name fixes
    ("parseVerilogFile", "readVerilog"),
    ("loadVerilog", "readVerilog"),
    ("design.linK_design", "design.link"),
    // Non-existent APIs
    ("design.compile()", REMOVED_MARKER),
    ("ord.Flow()", REMOVED_MARKER),
    ("runRTL2PDN", REMOVED_MARKER),
    ("design.synthesize()", REMOVED_MARKER),
    // Parameter name fixes
    ("density=", "utilization="),
];

/// What one correction pass produced: the rewritten code plus a
/// "wrong->right" note per applied rule.
#[derive(Clone, Debug)]
pub struct Correction {
    pub code: String,
    pub fixes: Vec<String>,
}

/// Deterministic string-substitution repair for known-bad API usage.
/// Purely syntactic: it has no notion of code structure and can rewrite a
/// matching substring anywhere, including inside string literals.
pub struct CodeCorrector {
    rules: &'static [(&'static str, &'static str)],
}

impl CodeCorrector {
    pub fn new() -> Self {
        Self {
            rules: CORRECTION_RULES,
        }
    }

    pub fn auto_correct(&self, code: &str) -> Correction {
        let mut corrected = code.to_string();
        let mut fixes = Vec::new();

        for (wrong, right) in self.rules {
            if corrected.contains(wrong) {
                corrected = corrected.replace(wrong, right);
                fixes.push(format!("{wrong}->{right}"));
            }
        }

        Correction {
            code: corrected,
            fixes,
        }
    }

    /// Drop lines that are exactly a removal marker, so substitutions do
    /// not leave dangling stub lines behind.
    pub fn clean(&self, code: &str) -> String {
        code.lines()
            .filter(|line| {
                let trimmed = line.trim();
                trimmed != "#" && trimmed != REMOVED_MARKER
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CodeCorrector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn replaces_known_wrong_tokens() {
        let corrector = CodeCorrector::new();
        let result = corrector.auto_correct("design.parseVerilogFile('top.v')");
        assert_eq!(result.code, "design.readVerilog('top.v')");
        assert_eq!(result.fixes, vec!["parseVerilogFile->readVerilog".to_string()]);
    }

    #[test]
    fn records_one_fix_per_applied_rule() {
        let corrector = CodeCorrector::new();
        let code = "ord.Flow()\nfloorplan.init(density=0.7)\n";
        let result = corrector.auto_correct(code);
        assert!(result.code.contains("utilization=0.7"));
        assert!(result.code.contains(REMOVED_MARKER));
        assert_eq!(result.fixes.len(), 2);
    }

    #[test]
    fn correction_is_idempotent() {
        let corrector = CodeCorrector::new();
        let code = "design.loadVerilog('a.v')\ninit(density=0.6)\nrunRTL2PDN\n";
        let once = corrector.auto_correct(code);
        let twice = corrector.auto_correct(&once.code);
        assert_eq!(once.code, twice.code);
        assert!(twice.fixes.is_empty());
    }

    #[test]
    fn untouched_code_reports_no_fixes() {
        let corrector = CodeCorrector::new();
        let code = "from openroad import Design\ndesign.readVerilog('top.v')";
        let result = corrector.auto_correct(code);
        assert_eq!(result.code, code);
        assert!(result.fixes.is_empty());
    }

    #[test]
    fn clean_strips_marker_lines_only() {
        let corrector = CodeCorrector::new();
        let code = format!("import odb\n{REMOVED_MARKER}\n#\nx = 1  # keep this comment");
        let cleaned = corrector.clean(&code);
        assert_eq!(cleaned, "import odb\nx = 1  # keep this comment");
    }
}
