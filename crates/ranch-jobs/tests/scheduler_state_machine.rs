//! Stateful property testing for the job scheduler.
//!
//! Uses proptest-state-machine to check admission, FIFO hand-off and slot
//! accounting against a reference model across random interleavings of
//! submissions and completions.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use proptest::prelude::*;
use proptest_state_machine::{ReferenceStateMachine, StateMachineTest, prop_state_machine};
use tokio::runtime::Runtime;
use tokio::sync::oneshot;

use ranch_jobs::{JobDescriptor, JobStatus, Scheduler, SchedulerConfig};

/// Operations that can be performed on the scheduler.
#[derive(Debug, Clone)]
pub enum SchedulerOperation {
    /// Submit a job whose work waits for a signal.
    Submit,
    /// Let a running job's work succeed.
    Succeed { job: usize },
    /// Let a running job's work fail.
    Fail { job: usize },
}

/// Reference model of the scheduler.
#[derive(Clone, Debug)]
pub struct SchedulerModel {
    pub concurrency: usize,
    pub next_job: usize,
    pub queued: VecDeque<usize>,
    pub running: Vec<usize>,
    /// Finished jobs and whether they succeeded.
    pub finished: HashMap<usize, bool>,
}

impl SchedulerModel {
    fn finish(&mut self, job: usize, succeeded: bool) {
        self.running.retain(|j| *j != job);
        self.finished.insert(job, succeeded);
        if let Some(next) = self.queued.pop_front() {
            self.running.push(next);
        }
    }
}

impl ReferenceStateMachine for SchedulerModel {
    type State = Self;
    type Transition = SchedulerOperation;

    fn init_state() -> BoxedStrategy<Self::State> {
        (1usize..4)
            .prop_map(|concurrency| SchedulerModel {
                concurrency,
                next_job: 0,
                queued: VecDeque::new(),
                running: Vec::new(),
                finished: HashMap::new(),
            })
            .boxed()
    }

    fn transitions(state: &Self::State) -> BoxedStrategy<Self::Transition> {
        if state.running.is_empty() {
            return Just(SchedulerOperation::Submit).boxed();
        }

        let running = state.running.clone();
        prop_oneof![
            3 => Just(SchedulerOperation::Submit),
            2 => proptest::sample::select(running.clone())
                .prop_map(|job| SchedulerOperation::Succeed { job }),
            1 => proptest::sample::select(running)
                .prop_map(|job| SchedulerOperation::Fail { job }),
        ]
        .boxed()
    }

    fn apply(mut state: Self::State, transition: &Self::Transition) -> Self::State {
        match transition {
            SchedulerOperation::Submit => {
                let job = state.next_job;
                state.next_job += 1;
                if state.running.len() < state.concurrency {
                    state.running.push(job);
                } else {
                    state.queued.push_back(job);
                }
            }
            SchedulerOperation::Succeed { job } => state.finish(*job, true),
            SchedulerOperation::Fail { job } => state.finish(*job, false),
        }
        state
    }

    fn preconditions(state: &Self::State, transition: &Self::Transition) -> bool {
        match transition {
            SchedulerOperation::Submit => true,
            SchedulerOperation::Succeed { job } | SchedulerOperation::Fail { job } => {
                state.running.contains(job)
            }
        }
    }
}

fn job_id(job: usize) -> String {
    format!("job-{job}")
}

/// Test harness wrapping a real scheduler on a single-threaded runtime.
pub struct SchedulerHarness {
    runtime: Runtime,
    scheduler: Scheduler,
    next_job: usize,
    signals: HashMap<usize, oneshot::Sender<bool>>,
}

impl SchedulerHarness {
    fn new(concurrency: usize) -> Self {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("Failed to create tokio runtime");

        Self {
            runtime,
            scheduler: Scheduler::new(SchedulerConfig::new(
                concurrency,
                Duration::from_secs(3600),
            )),
            next_job: 0,
            signals: HashMap::new(),
        }
    }

    fn expected_status(model: &SchedulerModel, job: usize) -> JobStatus {
        if model.running.contains(&job) {
            JobStatus::Running
        } else if model.queued.contains(&job) {
            JobStatus::Queued
        } else if model.finished.get(&job) == Some(&true) {
            JobStatus::Completed
        } else {
            JobStatus::Failed
        }
    }

    fn matches(&self, model: &SchedulerModel) -> bool {
        (0..model.next_job).all(|job| {
            self.scheduler.status_of(&job_id(job)).map(|v| v.status)
                == Some(Self::expected_status(model, job))
        })
    }

    fn apply_operation(&mut self, op: &SchedulerOperation, model: &SchedulerModel) {
        let scheduler = self.scheduler.clone();
        let signals = &mut self.signals;
        let next_job = &mut self.next_job;

        self.runtime.block_on(async {
            match op {
                SchedulerOperation::Submit => {
                    let job = *next_job;
                    *next_job += 1;
                    let (tx, rx) = oneshot::channel::<bool>();
                    signals.insert(job, tx);
                    scheduler
                        .submit(JobDescriptor::new(job_id(job), "model", move || async move {
                            match rx.await {
                                Ok(true) => Ok("done"),
                                Ok(false) => Err("failed".to_string()),
                                Err(_) => Err("signal dropped".to_string()),
                            }
                        }))
                        .expect("submission should be accepted");
                }
                SchedulerOperation::Succeed { job } | SchedulerOperation::Fail { job } => {
                    let succeed = matches!(op, SchedulerOperation::Succeed { .. });
                    if let Some(tx) = signals.remove(job) {
                        let _ = tx.send(succeed);
                    }
                }
            }
        });

        // Let completions and the dispatch passes they trigger run.
        for _ in 0..200 {
            if self.matches(model) {
                break;
            }
            self.runtime.block_on(tokio::task::yield_now());
        }
    }
}

impl StateMachineTest for SchedulerHarness {
    type SystemUnderTest = Self;
    type Reference = SchedulerModel;

    fn init_test(
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) -> Self::SystemUnderTest {
        Self::new(ref_state.concurrency)
    }

    fn apply(
        mut state: Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
        transition: <Self::Reference as ReferenceStateMachine>::Transition,
    ) -> Self::SystemUnderTest {
        state.apply_operation(&transition, ref_state);
        state
    }

    fn check_invariants(
        state: &Self::SystemUnderTest,
        ref_state: &<Self::Reference as ReferenceStateMachine>::State,
    ) {
        // Invariant: every job is in the state the model predicts
        for job in 0..ref_state.next_job {
            let view = state
                .scheduler
                .status_of(&job_id(job))
                .expect("jobs inside the retention window stay queryable");
            assert_eq!(
                view.status,
                SchedulerHarness::expected_status(ref_state, job),
                "job {job} diverged from the model"
            );

            // Invariant: timestamps match the lifecycle position
            assert_eq!(view.started_at.is_some(), view.status != JobStatus::Queued);
            assert_eq!(view.finished_at.is_some(), view.status.is_terminal());
        }

        // Invariant: slot accounting never exceeds the limit
        let stats = state.scheduler.stats();
        assert_eq!(stats.active, ref_state.running.len());
        assert!(stats.active <= ref_state.concurrency);
        assert_eq!(stats.queued, ref_state.queued.len());
    }
}

// Run the state machine tests
prop_state_machine! {
    #![proptest_config(ProptestConfig {
        cases: 50,
        max_shrink_iters: 5000,
        ..ProptestConfig::default()
    })]

    #[test]
    fn scheduler_state_machine_test(sequential 1..40 => SchedulerHarness);
}
