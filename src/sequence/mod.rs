//! Dependency-ordered step runner
//!
//! Scenario steps declare a numeric priority and explicit depends-on edges;
//! the plan orders them so every dependency runs before its dependents, with
//! priority (then declaration order) breaking ties. Execution is strictly
//! sequential: state one step stashes in the property bag is visible to the
//! next, and a failed step skips everything downstream of it instead of
//! running against missing state.

use crate::config::MissingProperty;
use crate::fixture::FixtureError;
use crate::rest::RestError;
use crate::upload::UploadError;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// A step failed
#[derive(Error, Debug)]
pub enum StepError {
    #[error(transparent)]
    Rest(#[from] RestError),

    #[error(transparent)]
    Fixture(#[from] FixtureError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    MissingProperty(#[from] MissingProperty),

    #[error("Expected field '{field}' missing from {context} response body")]
    MissingField { context: String, field: String },

    #[error("Assertion failed: {0}")]
    Check(String),
}

/// The step set cannot be ordered
#[derive(Error, Debug)]
pub enum PlanError {
    #[error("Step '{step}' depends on unknown step '{dependency}'")]
    UnknownDependency { step: String, dependency: String },

    #[error("Duplicate step name '{0}'")]
    DuplicateStep(String),

    #[error("Dependency cycle involving steps: {0:?}")]
    DependencyCycle(Vec<String>),
}

/// One scenario step.
///
/// Implementations issue requests through the shared context and return
/// `Err` when an assertion or a request fails. `C` is the shared harness
/// context type.
#[async_trait]
pub trait Step<C: Send + Sync>: Send + Sync {
    /// Unique step name, referenced by `depends_on` edges
    fn name(&self) -> &str;

    /// Ordering hint among steps whose dependencies are satisfied
    fn priority(&self) -> u8 {
        1
    }

    /// Names of steps that must pass before this one runs
    fn depends_on(&self) -> Vec<&str> {
        Vec::new()
    }

    async fn run(&self, ctx: &C) -> Result<(), StepError>;
}

/// Outcome of one step
#[derive(Debug)]
pub enum StepStatus {
    Passed,
    Failed(StepError),
    /// A (transitive) dependency did not pass
    Skipped { blocked_by: String },
}

/// Per-step record in a suite report
#[derive(Debug)]
pub struct StepOutcome {
    pub name: String,
    pub status: StepStatus,
}

/// Result of running a full plan
#[derive(Debug, Default)]
pub struct SuiteReport {
    pub outcomes: Vec<StepOutcome>,
}

impl SuiteReport {
    pub fn all_passed(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| matches!(o.status, StepStatus::Passed))
    }

    pub fn passed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Passed))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed(_)))
    }

    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Skipped { .. }))
    }

    fn count(&self, predicate: impl Fn(&StepStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| predicate(&o.status)).count()
    }

    pub fn outcome(&self, name: &str) -> Option<&StepStatus> {
        self.outcomes
            .iter()
            .find(|o| o.name == name)
            .map(|o| &o.status)
    }
}

/// Validated, ordered set of steps.
pub struct Plan<C: Send + Sync> {
    steps: Vec<Box<dyn Step<C>>>,
    order: Vec<usize>,
}

impl<C: Send + Sync> Plan<C> {
    /// Validate dependencies and compute the execution order.
    ///
    /// Kahn's algorithm; among ready steps the lowest (priority, declaration
    /// index) runs first, so priorities order independent steps while
    /// dependency edges always win.
    pub fn new(steps: Vec<Box<dyn Step<C>>>) -> Result<Self, PlanError> {
        let mut index_by_name: HashMap<String, usize> = HashMap::new();
        for (index, step) in steps.iter().enumerate() {
            if index_by_name
                .insert(step.name().to_string(), index)
                .is_some()
            {
                return Err(PlanError::DuplicateStep(step.name().to_string()));
            }
        }

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); steps.len()];
        let mut indegree: Vec<usize> = vec![0; steps.len()];
        for (index, step) in steps.iter().enumerate() {
            for dependency in step.depends_on() {
                let dep_index = *index_by_name.get(dependency).ok_or_else(|| {
                    PlanError::UnknownDependency {
                        step: step.name().to_string(),
                        dependency: dependency.to_string(),
                    }
                })?;
                dependents[dep_index].push(index);
                indegree[index] += 1;
            }
        }

        let mut ready: Vec<usize> = (0..steps.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(steps.len());
        while !ready.is_empty() {
            let pos = ready
                .iter()
                .enumerate()
                .min_by_key(|(_, &i)| (steps[i].priority(), i))
                .map(|(pos, _)| pos)
                .unwrap();
            let next = ready.swap_remove(pos);
            order.push(next);
            for &dependent in &dependents[next] {
                indegree[dependent] -= 1;
                if indegree[dependent] == 0 {
                    ready.push(dependent);
                }
            }
        }

        if order.len() != steps.len() {
            let stuck = (0..steps.len())
                .filter(|&i| indegree[i] > 0)
                .map(|i| steps[i].name().to_string())
                .collect();
            return Err(PlanError::DependencyCycle(stuck));
        }

        Ok(Self { steps, order })
    }

    /// Step names in execution order
    pub fn execution_order(&self) -> Vec<&str> {
        self.order.iter().map(|&i| self.steps[i].name()).collect()
    }

    /// Run every step in order, skipping dependents of failures.
    pub async fn run(&self, ctx: &C) -> SuiteReport {
        let mut report = SuiteReport::default();
        let mut not_passed: HashSet<String> = HashSet::new();

        for &index in &self.order {
            let step = &self.steps[index];
            let name = step.name().to_string();

            let blocked_by = step
                .depends_on()
                .iter()
                .find(|dep| not_passed.contains(**dep))
                .map(|dep| dep.to_string());

            let status = match blocked_by {
                Some(blocked_by) => {
                    tracing::warn!(step = %name, blocked_by = %blocked_by, "step skipped");
                    not_passed.insert(name.clone());
                    StepStatus::Skipped { blocked_by }
                }
                None => {
                    tracing::info!(step = %name, "step starting");
                    match step.run(ctx).await {
                        Ok(()) => {
                            tracing::info!(step = %name, "step passed");
                            StepStatus::Passed
                        }
                        Err(err) => {
                            tracing::error!(step = %name, error = %err, "step failed");
                            not_passed.insert(name.clone());
                            StepStatus::Failed(err)
                        }
                    }
                }
            };

            report.outcomes.push(StepOutcome { name, status });
        }

        report
    }
}
