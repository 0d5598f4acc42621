// src/metrics/mod.rs

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::protocol::ReportKind;

/// Flat numeric quality metrics extracted from report text. `None` means
/// the report did not mention the field, which is distinct from zero.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wns: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tns: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timing_violations: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_congestion: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_congestion: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drc_violations: Option<u32>,
}

/// Regex-based extraction of labeled numeric fields from the three
/// recognized report kinds. Each kind is parsed independently; the merged
/// result has disjoint fields by construction.
pub struct MetricsParser {
    wns: Regex,
    tns: Regex,
    timing_violations: Regex,
    max_congestion: Regex,
    avg_congestion: Regex,
    drc_violations: Regex,
}

impl MetricsParser {
    pub fn new() -> Self {
        Self {
            wns: Regex::new(r"WNS:\s*(-?[\d.]+)").unwrap(),
            tns: Regex::new(r"TNS:\s*(-?[\d.]+)").unwrap(),
            timing_violations: Regex::new(r"(?i)violations:\s*(\d+)").unwrap(),
            max_congestion: Regex::new(r"Max:\s*(\d+)%").unwrap(),
            avg_congestion: Regex::new(r"Avg:\s*(\d+)%").unwrap(),
            drc_violations: Regex::new(r"(?i)violations:\s*(\d+)").unwrap(),
        }
    }

    pub fn parse_timing(&self, report: &str) -> Metrics {
        Metrics {
            wns: capture_f64(&self.wns, report),
            tns: capture_f64(&self.tns, report),
            timing_violations: capture_u32(&self.timing_violations, report),
            ..Metrics::default()
        }
    }

    pub fn parse_congestion(&self, report: &str) -> Metrics {
        Metrics {
            max_congestion: capture_u32(&self.max_congestion, report),
            avg_congestion: capture_u32(&self.avg_congestion, report),
            ..Metrics::default()
        }
    }

    pub fn parse_drc(&self, report: &str) -> Metrics {
        Metrics {
            drc_violations: capture_u32(&self.drc_violations, report),
            ..Metrics::default()
        }
    }

    /// Merge the per-kind extractions into one flat metrics value.
    pub fn parse_all(&self, reports: &BTreeMap<ReportKind, String>) -> Metrics {
        let mut metrics = Metrics::default();

        if let Some(report) = reports.get(&ReportKind::Timing) {
            let timing = self.parse_timing(report);
            metrics.wns = timing.wns;
            metrics.tns = timing.tns;
            metrics.timing_violations = timing.timing_violations;
        }

        if let Some(report) = reports.get(&ReportKind::Congestion) {
            let congestion = self.parse_congestion(report);
            metrics.max_congestion = congestion.max_congestion;
            metrics.avg_congestion = congestion.avg_congestion;
        }

        if let Some(report) = reports.get(&ReportKind::Drc) {
            metrics.drc_violations = self.parse_drc(report).drc_violations;
        }

        metrics
    }
}

impl Default for MetricsParser {
    fn default() -> Self {
        Self::new()
    }
}

fn capture_f64(re: &Regex, text: &str) -> Option<f64> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

fn capture_u32(re: &Regex, text: &str) -> Option<u32> {
    re.captures(text)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parses_all_three_kinds_exactly() {
        let mut reports = BTreeMap::new();
        reports.insert(ReportKind::Timing, "WNS: -0.25\nTNS: -1.40".to_string());
        reports.insert(ReportKind::Congestion, "Max: 95%\nAvg: 40%".to_string());
        reports.insert(ReportKind::Drc, "Violations: 3".to_string());

        let metrics = MetricsParser::new().parse_all(&reports);
        assert_eq!(metrics.wns, Some(-0.25));
        assert_eq!(metrics.tns, Some(-1.40));
        assert_eq!(metrics.max_congestion, Some(95));
        assert_eq!(metrics.avg_congestion, Some(40));
        assert_eq!(metrics.drc_violations, Some(3));
    }

    #[test]
    fn absent_fields_stay_absent() {
        let parser = MetricsParser::new();
        let timing = parser.parse_timing("nothing useful in this report");
        assert_eq!(timing, Metrics::default());

        // A lone congestion report must not invent timing or DRC numbers.
        let mut reports = BTreeMap::new();
        reports.insert(ReportKind::Congestion, "Max: 72%".to_string());
        let metrics = parser.parse_all(&reports);
        assert_eq!(metrics.max_congestion, Some(72));
        assert_eq!(metrics.avg_congestion, None);
        assert_eq!(metrics.wns, None);
        assert_eq!(metrics.drc_violations, None);
    }

    #[test]
    fn timing_violations_match_is_case_insensitive() {
        let parser = MetricsParser::new();
        let metrics = parser.parse_timing("WNS: 0.05\nviolations: 2");
        assert_eq!(metrics.wns, Some(0.05));
        assert_eq!(metrics.timing_violations, Some(2));
    }

    #[test]
    fn negative_wns_keeps_its_sign() {
        let parser = MetricsParser::new();
        let metrics = parser.parse_timing("Setup summary WNS: -2.75 TNS: -10.1");
        assert_eq!(metrics.wns, Some(-2.75));
        assert_eq!(metrics.tns, Some(-10.1));
    }
}
