// src/agent/mod.rs

use std::path::PathBuf;
use std::time::Duration;

use serde_json::json;

use crate::corrector::CodeCorrector;
use crate::decision::{Constraints, Decision, DecisionEngine, DecisionStatus};
use crate::error::FlowError;
use crate::executor::{Executor, extract_code};
use crate::llm::Generator;
use crate::memory::RunMemory;
use crate::metrics::MetricsParser;
use crate::protocol::planner::PlanGenerator;
use crate::protocol::{ExecutionResult, PlanStep, RunStatus, RunSummary};
use crate::validation::CodeValidator;

/// Whether step code really runs in a subprocess or the executor returns
/// canned outcomes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExecMode {
    Mock,
    Real,
}

pub struct FlowConfig {
    pub max_iterations: u32,
    pub mode: ExecMode,
    pub constraints: Constraints,
    pub work_dir: PathBuf,
    pub log_path: PathBuf,
    pub step_timeout: Duration,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            max_iterations: 3,
            mode: ExecMode::Mock,
            constraints: Constraints::default(),
            work_dir: PathBuf::from("."),
            log_path: PathBuf::from("flow_log.json"),
            step_timeout: Duration::from_secs(30),
        }
    }
}

/// The flow controller: plan, generate code per step, validate, correct,
/// execute, extract metrics, decide, then replan or stop. The only
/// stateful piece of the system; it owns the run memory outright and the
/// other components only ever return data to it.
pub struct FlowAgent {
    generator: Box<dyn Generator>,
    planner: PlanGenerator,
    validator: CodeValidator,
    corrector: CodeCorrector,
    executor: Executor,
    parser: MetricsParser,
    decision_engine: DecisionEngine,
    memory: RunMemory,
    config: FlowConfig,
}

impl FlowAgent {
    pub fn new(generator: Box<dyn Generator>, config: FlowConfig) -> Self {
        let executor = Executor::new(&config.work_dir).with_timeout(config.step_timeout);
        Self {
            generator,
            planner: PlanGenerator::new(),
            validator: CodeValidator::new(),
            corrector: CodeCorrector::new(),
            executor,
            parser: MetricsParser::new(),
            decision_engine: DecisionEngine::new(config.constraints.clone()),
            memory: RunMemory::new(),
            config,
        }
    }

    pub fn memory(&self) -> &RunMemory {
        &self.memory
    }

    /// Drive the whole flow for one goal, bounded by the iteration budget.
    /// The loop never aborts on plan, validation, or execution failures;
    /// they end up in the run memory and, at worst, in an `Incomplete`
    /// summary. Run memory is persisted unconditionally before returning.
    pub fn run(&mut self, goal: &str) -> Result<RunSummary, FlowError> {
        tracing::info!(
            goal,
            max_iterations = self.config.max_iterations,
            mode = ?self.config.mode,
            "starting autonomous flow"
        );

        let mut iteration = 0;
        let mut final_decision: Option<Decision> = None;

        while iteration < self.config.max_iterations {
            iteration += 1;
            tracing::info!(iteration, max = self.config.max_iterations, "iteration start");

            let mut plan = self
                .planner
                .create_plan(self.generator.as_ref(), goal, &self.memory.state);
            plan.steps.sort_by_key(|s| s.step);
            self.memory.store("plan", json!(&plan));

            for step in &plan.steps {
                self.run_step(step);
            }

            let reports = self
                .memory
                .execution_log
                .last()
                .map(|record| record.result.reports.clone())
                .unwrap_or_default();
            let metrics = self.parser.parse_all(&reports);
            self.memory.store("metrics", json!(&metrics));

            let decision = self.decision_engine.evaluate(&metrics);
            self.memory.store("last_decision", json!(&decision));
            let done = decision.status == DecisionStatus::Success;
            final_decision = Some(decision);

            if done {
                tracing::info!(iteration, "goal achieved");
                break;
            } else if iteration < self.config.max_iterations {
                tracing::info!("replanning to fix issues");
            } else {
                tracing::warn!("iteration budget exhausted");
            }
        }

        self.memory.save(&self.config.log_path)?;

        let status = match final_decision {
            Some(decision) if decision.status == DecisionStatus::Success => RunStatus::Success,
            _ => RunStatus::Incomplete,
        };

        Ok(RunSummary {
            goal: goal.to_string(),
            iterations: iteration,
            status,
            total_steps: self.memory.execution_log.len(),
        })
    }

    /// One step of the plan: generate, validate, correct if invalid,
    /// execute, and log. A failed step never aborts the remaining steps;
    /// later diagnostics want the full picture.
    fn run_step(&mut self, step: &PlanStep) {
        tracing::info!(step = step.step, action = %step.action, "{}", step.description);

        let prompt = format!("Write OpenROAD Python code to: {}", step.description);
        let raw = match self.generator.generate(&prompt) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(step = step.step, error = %e, "code generation failed");
                self.memory.log_execution(
                    step.step,
                    String::new(),
                    ExecutionResult::failure(format!("code generation failed: {e}")),
                );
                return;
            }
        };
        self.memory.add_conversation(&prompt, &raw);

        let mut code = extract_code(&raw).unwrap_or_else(|| raw.clone());

        let validation = self.validator.validate(&code);
        if !validation.is_valid {
            tracing::warn!(step = step.step, errors = ?validation.errors, "validation failed");
            for suggestion in self.validator.suggestions(&validation.errors) {
                tracing::info!(step = step.step, "suggestion: {suggestion}");
            }

            // Best-effort repair; the corrected code is not re-validated
            // and execution proceeds regardless of remaining errors.
            let correction = self.corrector.auto_correct(&code);
            tracing::info!(step = step.step, fixes = correction.fixes.len(), "applied corrections");
            code = self.corrector.clean(&correction.code);
        }

        let result = match self.config.mode {
            ExecMode::Mock => self.executor.mock_execute(&step.action),
            ExecMode::Real => self.executor.execute(&code),
        };

        tracing::info!(step = step.step, success = result.success, "step finished");
        self.memory.log_execution(step.step, code, result);
    }
}
