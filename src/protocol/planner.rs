// src/protocol/planner.rs

use regex::Regex;
use serde_json::{Map, Value};

use crate::llm::Generator;
use crate::protocol::{Plan, PlanStep};

/// Turns a goal plus the current run state into an ordered step list by
/// prompting the generation capability for a strict-JSON plan. Every parse
/// failure falls back to the fixed default RTL-to-GDS plan, so planning
/// never fails and the call is never retried.
pub struct PlanGenerator;

impl PlanGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn create_plan(
        &self,
        generator: &dyn Generator,
        goal: &str,
        current_state: &Map<String, Value>,
    ) -> Plan {
        let state_info = if current_state.is_empty() {
            String::new()
        } else {
            format!(
                "\n\nCurrent state:\n{}",
                serde_json::to_string_pretty(&Value::Object(current_state.clone()))
                    .unwrap_or_default()
            )
        };

        let prompt = format!(
            r#"You are an OpenROAD execution planner. Create a JSON plan.

Goal: {goal}{state_info}

Output ONLY valid JSON:
{{
  "goal": "{goal}",
  "steps": [
    {{"step": 1, "action": "read_design", "description": "Read Verilog and tech files"}},
    {{"step": 2, "action": "floorplan", "description": "Initialize floorplan"}},
    ...
  ]
}}
"#
        );

        let raw = match generator.generate(&prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "plan generation failed, using default plan");
                return self.default_plan();
            }
        };

        // First brace-delimited block in the raw response.
        let json = Regex::new(r"\{[\s\S]*\}")
            .unwrap()
            .find(&raw)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        match serde_json::from_str::<Plan>(&json) {
            Ok(plan) => {
                tracing::info!(steps = plan.steps.len(), "plan created");
                plan
            }
            Err(e) => {
                tracing::warn!(error = %e, raw_len = raw.len(), "plan parse failed, using default plan");
                self.default_plan()
            }
        }
    }

    /// The deterministic fallback: a six-step RTL-to-GDS flow with no
    /// dependency on the external model.
    pub fn default_plan(&self) -> Plan {
        let steps = [
            (1, "read_design", "Read Verilog, LEF, LIB files"),
            (2, "floorplan", "Initialize floorplan with 70% utilization"),
            (3, "placement", "Global and detailed placement"),
            (4, "cts", "Clock tree synthesis"),
            (5, "routing", "Global and detailed routing"),
            (6, "write_gds", "Write GDS output"),
        ];

        Plan {
            goal: "RTL to GDS".to_string(),
            steps: steps
                .into_iter()
                .map(|(step, action, description)| PlanStep {
                    step,
                    action: action.to_string(),
                    description: description.to_string(),
                })
                .collect(),
        }
    }
}

impl Default for PlanGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;
    use pretty_assertions::assert_eq;

    struct CannedGenerator(&'static str);

    impl Generator for CannedGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, FlowError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    impl Generator for FailingGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, FlowError> {
            Err(FlowError::MalformedLlmResponse)
        }
    }

    #[test]
    fn parses_plan_embedded_in_prose() {
        let raw = concat!(
            "Sure, here is the plan:\n",
            "{\"goal\": \"close timing\", \"steps\": [",
            "{\"step\": 1, \"action\": \"placement\", \"description\": \"Replace cells\"}",
            "]}\n"
        );
        let plan =
            PlanGenerator::new().create_plan(&CannedGenerator(raw), "close timing", &Map::new());
        assert_eq!(plan.goal, "close timing");
        assert_eq!(plan.steps.len(), 1);
        assert_eq!(plan.steps[0].action, "placement");
    }

    #[test]
    fn garbage_output_yields_default_plan() {
        let planner = PlanGenerator::new();
        for raw in ["", "no json here", "{not valid json", "{\"steps\": \"oops\"}"] {
            let plan = planner.create_plan(&CannedGenerator(raw), "goal", &Map::new());
            let fallback = planner.default_plan();
            assert_eq!(plan.goal, fallback.goal);
            assert_eq!(plan.steps.len(), fallback.steps.len());
        }
    }

    #[test]
    fn generator_failure_yields_default_plan() {
        let plan = PlanGenerator::new().create_plan(&FailingGenerator, "goal", &Map::new());
        assert_eq!(plan.steps.len(), 6);
        assert_eq!(plan.steps[0].action, "read_design");
        assert_eq!(plan.steps[5].action, "write_gds");
    }

    #[test]
    fn default_plan_is_strictly_ordered() {
        let plan = PlanGenerator::new().default_plan();
        for (i, step) in plan.steps.iter().enumerate() {
            assert_eq!(step.step as usize, i + 1);
        }
    }
}
