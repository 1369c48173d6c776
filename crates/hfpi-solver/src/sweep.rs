//! Sweep orchestration over the Cartesian product of analysis parameters.
//!
//! Every case runs independently on a caller-owned [`CasePool`]. Workers
//! publish their [`CaseResult`](hfpi_model::CaseResult) to the
//! [`ResultStore`] and hand back only a [`CaseState`]; a failed case never
//! disturbs the others.

use std::any::Any;
use std::collections::HashSet;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use hfpi_io::{CaseState, ManifestEntry, ResultStore, SweepManifest};
use hfpi_model::CaseParameters;
use log::{info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};

use crate::case_runner::CaseRunner;
use crate::error::{SolverError, SweepError};

/// Upper bound on concurrent cases; each one holds full force histories in memory.
pub const MAX_WORKERS: usize = 10;

/// Ordered, duplicate-free list of cases to compute.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepPlan {
    cases: Vec<CaseParameters>,
}

impl SweepPlan {
    /// Cartesian product, direction-major then damping ratio then period.
    pub fn new(
        directions: &[f64],
        damping_ratios: &[f64],
        recurrence_periods: &[f64],
    ) -> Result<Self, SweepError> {
        let cases = directions
            .iter()
            .flat_map(|&d| {
                damping_ratios.iter().flat_map(move |&xi| {
                    recurrence_periods
                        .iter()
                        .map(move |&rp| CaseParameters::new(d, xi, rp))
                })
            })
            .collect();
        Self::from_cases(cases)
    }

    /// Rejects two cases that would publish to the same result file.
    pub fn from_cases(cases: Vec<CaseParameters>) -> Result<Self, SweepError> {
        let mut seen = HashSet::with_capacity(cases.len());
        for case in &cases {
            let key = case.key();
            if !seen.insert(key.clone()) {
                return Err(SweepError::DuplicateCase(key));
            }
        }
        Ok(Self { cases })
    }

    pub fn cases(&self) -> &[CaseParameters] {
        &self.cases
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}

/// Bounded worker pool, scoped to the sweep that owns it.
pub struct CasePool {
    pool: ThreadPool,
    size: usize,
}

impl CasePool {
    /// `min(MAX_WORKERS, available CPUs)`
    pub fn default_size() -> usize {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1)
            .min(MAX_WORKERS)
    }

    pub fn new(size: usize) -> Result<Self, SweepError> {
        if size == 0 {
            return Err(SweepError::Pool("worker count must be at least 1".to_string()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(size)
            .thread_name(|i| format!("hfpi-case-{i}"))
            .build()
            .map_err(|err| SweepError::Pool(err.to_string()))?;
        Ok(Self { pool, size })
    }

    pub fn with_default_size() -> Result<Self, SweepError> {
        Self::new(Self::default_size())
    }

    pub fn size(&self) -> usize {
        self.size
    }
}

/// What to do with undispatched cases once one has failed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    #[default]
    Continue,
    /// Leave cases that have not started yet `Pending`.
    StopDispatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CaseOutcome {
    pub parameters: CaseParameters,
    pub state: CaseState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SweepReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcomes: Vec<CaseOutcome>,
}

impl SweepReport {
    pub fn completed(&self) -> impl Iterator<Item = &CaseParameters> {
        self.outcomes
            .iter()
            .filter(|o| o.state == CaseState::Completed)
            .map(|o| &o.parameters)
    }

    /// Failed cases with their error messages.
    pub fn failed(&self) -> impl Iterator<Item = (&CaseParameters, &str)> {
        self.outcomes.iter().filter_map(|o| match &o.state {
            CaseState::Failed(message) => Some((&o.parameters, message.as_str())),
            _ => None,
        })
    }

    pub fn pending(&self) -> impl Iterator<Item = &CaseParameters> {
        self.outcomes
            .iter()
            .filter(|o| !o.state.is_finished())
            .map(|o| &o.parameters)
    }

    pub fn to_manifest(&self) -> SweepManifest {
        SweepManifest {
            started_at: self.started_at,
            finished_at: self.finished_at,
            cases: self
                .outcomes
                .iter()
                .map(|o| ManifestEntry {
                    key: o.parameters.key(),
                    parameters: o.parameters,
                    state: o.state.clone(),
                })
                .collect(),
        }
    }
}

pub struct Sweep {
    plan: SweepPlan,
}

impl Sweep {
    pub fn new(plan: SweepPlan) -> Self {
        Self { plan }
    }

    pub fn plan(&self) -> &SweepPlan {
        &self.plan
    }

    /// Runs every case of the plan on `pool`.
    ///
    /// Per-case failures (numerical errors, persistence errors, panics) are
    /// recorded in the report. The call itself fails only when every case
    /// failed.
    pub fn run(
        &self,
        pool: &CasePool,
        runner: &dyn CaseRunner,
        store: &ResultStore,
        policy: FailurePolicy,
    ) -> Result<SweepReport, SweepError> {
        let started_at = Utc::now();
        info!(
            "sweep: {} cases on {} workers, results in {}",
            self.plan.len(),
            pool.size(),
            store.root().display()
        );

        let board = Mutex::new(vec![CaseState::Pending; self.plan.len()]);
        let stop = AtomicBool::new(false);
        let set = |index: usize, state: CaseState| {
            board.lock().unwrap_or_else(PoisonError::into_inner)[index] = state;
        };

        pool.pool.install(|| {
            self.plan.cases.par_iter().enumerate().for_each(|(index, params)| {
                if stop.load(Ordering::Acquire) {
                    return;
                }
                set(index, CaseState::Running);
                let state = match run_case(runner, store, params) {
                    Ok(()) => {
                        info!("case {} completed", params.key());
                        CaseState::Completed
                    }
                    Err(err) => {
                        warn!("case {} failed: {err}", params.key());
                        if policy == FailurePolicy::StopDispatch {
                            stop.store(true, Ordering::Release);
                        }
                        CaseState::Failed(err.to_string())
                    }
                };
                set(index, state);
            });
        });

        let states = board.into_inner().unwrap_or_else(PoisonError::into_inner);
        let report = SweepReport {
            started_at,
            finished_at: Utc::now(),
            outcomes: self
                .plan
                .cases
                .iter()
                .zip(states)
                .map(|(parameters, state)| CaseOutcome {
                    parameters: *parameters,
                    state,
                })
                .collect(),
        };

        let failed = report.failed().count();
        info!(
            "sweep finished: {} completed, {failed} failed, {} pending",
            report.completed().count(),
            report.pending().count()
        );

        if !report.outcomes.is_empty() && failed == report.outcomes.len() {
            return Err(SweepError::AllCasesFailed {
                report: Box::new(report),
            });
        }
        Ok(report)
    }
}

fn run_case(
    runner: &dyn CaseRunner,
    store: &ResultStore,
    params: &CaseParameters,
) -> Result<(), SolverError> {
    let result = catch_unwind(AssertUnwindSafe(|| runner.run(params)))
        .map_err(|payload| SolverError::Panicked(panic_message(payload.as_ref())))??;
    store.save(params, &result)?;
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
