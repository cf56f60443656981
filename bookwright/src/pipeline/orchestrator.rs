//! The pipeline orchestrator: drives a project from planning to a
//! finished book, resumably and cancellably.
//!
//! All orchestration for one project runs as sequential async steps;
//! modules are generated strictly one at a time so the context window
//! stays ordered and rate-limit behavior stays predictable. The durable
//! pause flag is polled between iterations only; an in-flight call is
//! never aborted by pause, only by cancellation or timeout.

use crate::book::{ModuleResult, ModuleStatus, Project, ProjectStatus, Roadmap, RoadmapModule};
use crate::cancellation::TokenRegistry;
use crate::errors::{GenerateError, PipelineError};
use crate::events::{CurrentModule, PipelineEvent, RunStatus, StatusBus, StatusSnapshot};
use crate::pipeline::{
    assemble_book, prompts, GenerationOutcome, GenerationSession, PipelineConfig,
};
use crate::provider::{parse_roadmap, GenerateResult, GenerationRequest, TextGenerator};
use crate::recovery::{
    classify, wait_hint, DecisionGate, GateSignal, RetryDecision, RetryInfo, RetryPolicy,
};
use crate::store::{Checkpoint, CheckpointStore, KeyValueStore};
use dashmap::DashMap;
use futures::StreamExt;
use std::sync::Arc;
use tokio::time::timeout;
use uuid::Uuid;

const CANCEL_REASON: &str = "cancelled by user";

/// Removes the project from the active-run set when the run ends.
struct RunGuard {
    runs: Arc<DashMap<Uuid, ()>>,
    project_id: Uuid,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.runs.remove(&self.project_id);
    }
}

/// The book-generation orchestrator.
///
/// One instance serves many projects; each project has at most one
/// active run at a time (a second invocation is rejected with
/// [`PipelineError::RunInProgress`]).
pub struct BookPipeline {
    generator: Arc<dyn TextGenerator>,
    store: CheckpointStore,
    bus: StatusBus,
    policy: RetryPolicy,
    config: PipelineConfig,
    runs: Arc<DashMap<Uuid, ()>>,
    gate: DecisionGate,
    tokens: TokenRegistry,
}

impl std::fmt::Debug for BookPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BookPipeline")
            .field("active_runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl BookPipeline {
    /// Creates a pipeline over a generator and a key-value backend.
    #[must_use]
    pub fn new(generator: Arc<dyn TextGenerator>, kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            generator,
            store: CheckpointStore::new(kv),
            bus: StatusBus::default(),
            policy: RetryPolicy::default(),
            config: PipelineConfig::default(),
            runs: Arc::new(DashMap::new()),
            gate: DecisionGate::new(),
            tokens: TokenRegistry::new(),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the pipeline configuration.
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// The event bus observers subscribe to.
    #[must_use]
    pub fn bus(&self) -> &StatusBus {
        &self.bus
    }

    /// The checkpoint store, exposed for host-side inspection.
    #[must_use]
    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.store
    }

    // ---- commands -------------------------------------------------------

    /// Generates the roadmap for a project in `Planning` status (or
    /// `Error`, when retrying a failed planning call).
    ///
    /// A single structural call with no automatic retry: a malformed or
    /// failed response moves the project to `Error` and surfaces to the
    /// caller as a blocking condition. Cancellation leaves the project
    /// untouched. The roadmap is immutable once generation has moved
    /// past planning; calling this later is rejected before any
    /// provider call is made.
    ///
    /// # Errors
    ///
    /// [`PipelineError::InvalidTransition`] when the project is past
    /// planning; [`PipelineError::RunInProgress`] if a run is active;
    /// [`PipelineError::Generation`] for the failing call.
    pub async fn create_roadmap(
        &self,
        project: &mut Project,
        session: &GenerationSession,
    ) -> Result<Roadmap, PipelineError> {
        let planning_retry =
            project.status == ProjectStatus::Error && project.roadmap.is_none();
        if project.status != ProjectStatus::Planning && !planning_retry {
            return Err(PipelineError::InvalidTransition {
                from: project.status,
                to: ProjectStatus::RoadmapCompleted,
            });
        }
        let _guard = self.acquire_run(project.id)?;
        tracing::info!(project_id = %project.id, provider = %session.provider, model = %session.model, "creating roadmap");
        self.publish_status(self.snapshot(project, RunStatus::Generating, "Creating roadmap"));

        let request = prompts::roadmap_request(project, session);
        let text = match self.call_generator(project.id, &request).await {
            Ok(text) => text,
            Err(e) if e.is_cancellation() => {
                self.publish_status(self.snapshot(project, RunStatus::Idle, "Roadmap creation cancelled"));
                return Err(e.into());
            }
            Err(e) => {
                project.fail(e.to_string());
                self.publish_status(self.snapshot(project, RunStatus::Error, e.to_string()));
                self.publish_project(project);
                return Err(e.into());
            }
        };

        match parse_roadmap(&text, project.request.complexity) {
            Ok(roadmap) => {
                project.roadmap = Some(roadmap.clone());
                project.set_status(ProjectStatus::RoadmapCompleted)?;
                project.recompute_totals();
                self.publish_project(project);
                Ok(roadmap)
            }
            Err(e) => {
                project.fail(e.to_string());
                self.publish_status(self.snapshot(project, RunStatus::Error, e.to_string()));
                self.publish_project(project);
                Err(e.into())
            }
        }
    }

    /// Runs the module loop for every roadmap module without a
    /// completed result, resuming from the checkpoint when one exists.
    ///
    /// The checkpoint is trusted over in-memory project state, which
    /// may be only partially persisted across a reload.
    ///
    /// # Errors
    ///
    /// [`PipelineError::MissingRoadmap`], [`PipelineError::RunInProgress`],
    /// or a fatal [`PipelineError::Generation`] (auth failure).
    pub async fn generate_all_modules(
        &self,
        project: &mut Project,
        session: &GenerationSession,
    ) -> Result<GenerationOutcome, PipelineError> {
        let roadmap = project
            .roadmap
            .clone()
            .ok_or(PipelineError::MissingRoadmap(project.id))?;
        let _guard = self.acquire_run(project.id)?;
        project.set_status(ProjectStatus::GeneratingContent)?;
        self.publish_project(project);

        let mut completed: Vec<String> = self
            .store
            .load(project.id)
            .await
            .map(|c| c.completed_module_ids)
            .unwrap_or_default();
        for id in project.completed_module_ids() {
            if !completed.contains(&id) {
                completed.push(id);
            }
        }
        let targets: Vec<usize> = roadmap
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| !completed.contains(&m.id))
            .map(|(i, _)| i)
            .collect();

        self.run_modules(project, &roadmap, session, &targets, completed)
            .await
    }

    /// Sets the durable pause flag.
    ///
    /// The in-flight call, if any, finishes or fails naturally; the
    /// loop honors the flag at its next iteration boundary.
    pub async fn pause_generation(&self, project_id: Uuid) {
        tracing::info!(project_id = %project_id, "pause requested");
        self.store.set_pause_flag(project_id).await;
    }

    /// Clears the pause flag and re-enters the module loop from the
    /// checkpoint. With nothing left to do this is a no-op that
    /// finishes immediately.
    ///
    /// # Errors
    ///
    /// As for [`generate_all_modules`](Self::generate_all_modules).
    pub async fn resume_generation(
        &self,
        project: &mut Project,
        session: &GenerationSession,
    ) -> Result<GenerationOutcome, PipelineError> {
        self.store.clear_pause_flag(project.id).await;
        self.generate_all_modules(project, session).await
    }

    /// Re-runs only modules whose result status is `Error`, in roadmap
    /// order. Attempt counts start fresh.
    ///
    /// # Errors
    ///
    /// As for [`generate_all_modules`](Self::generate_all_modules).
    pub async fn retry_failed_modules(
        &self,
        project: &mut Project,
        session: &GenerationSession,
    ) -> Result<GenerationOutcome, PipelineError> {
        let roadmap = project
            .roadmap
            .clone()
            .ok_or(PipelineError::MissingRoadmap(project.id))?;
        let _guard = self.acquire_run(project.id)?;
        project.set_status(ProjectStatus::GeneratingContent)?;
        self.publish_project(project);

        let targets: Vec<usize> = roadmap
            .modules
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                project
                    .module_result(&m.id)
                    .is_some_and(|r| r.status == ModuleStatus::Error)
            })
            .map(|(i, _)| i)
            .collect();
        let completed = project.completed_module_ids();

        self.run_modules(project, &roadmap, session, &targets, completed)
            .await
    }

    /// Assembles the final book: one summary call, then concatenation
    /// in roadmap order. Clears the checkpoint and pause flag on
    /// success. Failure moves the project to `Error` without touching
    /// completed module content.
    ///
    /// # Errors
    ///
    /// [`PipelineError::ModulesIncomplete`] when a module lacks a
    /// completed result, plus the usual run-guard and generation errors.
    pub async fn assemble_final_book(
        &self,
        project: &mut Project,
        session: &GenerationSession,
    ) -> Result<(), PipelineError> {
        let roadmap = project
            .roadmap
            .clone()
            .ok_or(PipelineError::MissingRoadmap(project.id))?;
        let _guard = self.acquire_run(project.id)?;

        let missing = roadmap
            .modules
            .iter()
            .filter(|m| !project.module_result(&m.id).is_some_and(ModuleResult::is_completed))
            .count();
        if missing > 0 {
            return Err(PipelineError::ModulesIncomplete {
                missing,
                total: roadmap.modules.len(),
            });
        }

        project.set_status(ProjectStatus::Assembling)?;
        self.publish_status(self.snapshot(project, RunStatus::Generating, "Assembling final book"));

        let request = prompts::summary_request(project, &roadmap, session);
        let summary = match self.call_generator(project.id, &request).await {
            Ok(summary) => summary,
            Err(e) if e.is_cancellation() => {
                self.publish_status(self.snapshot(project, RunStatus::Idle, "Assembly cancelled"));
                return Err(e.into());
            }
            Err(e) => {
                project.fail(e.to_string());
                self.publish_status(self.snapshot(project, RunStatus::Error, e.to_string()));
                self.publish_project(project);
                return Err(e.into());
            }
        };

        let book = assemble_book(project, &roadmap, &summary);
        project.set_final_book(book);
        project.set_status(ProjectStatus::Completed)?;
        project.recompute_totals();

        if let Err(e) = self.store.clear(project.id).await {
            tracing::warn!(project_id = %project.id, error = %e, "checkpoint clear failed after completion");
        }
        self.store.clear_pause_flag(project.id).await;

        let mut snapshot = self.snapshot(project, RunStatus::Completed, "Book completed");
        snapshot.progress = 100;
        self.publish_status(snapshot);
        self.publish_project(project);
        tracing::info!(project_id = %project.id, words = project.total_words.unwrap_or(0), "book assembled");
        Ok(())
    }

    /// Resolves a pending `waiting_retry` suspension. Ignored (returns
    /// false) when nothing is pending for the project.
    pub fn set_retry_decision(&self, project_id: Uuid, decision: RetryDecision) -> bool {
        tracing::info!(project_id = %project_id, ?decision, "retry decision received");
        self.gate.resolve(project_id, decision)
    }

    /// Aborts in-flight generation calls for one project, or for all
    /// projects when `project_id` is `None`. A run suspended in
    /// `waiting_retry` is ended the same way. Generation state remains
    /// whatever was last checkpointed; no partial module is recorded.
    pub fn cancel_active_requests(&self, project_id: Option<Uuid>) {
        match project_id {
            Some(id) => {
                self.tokens.cancel(id, CANCEL_REASON);
                self.gate.cancel(id);
            }
            None => {
                self.tokens.cancel_all(CANCEL_REASON);
                self.gate.cancel_all();
            }
        }
    }

    /// Purges the project's durable artifacts (checkpoint, pause flag)
    /// and aborts anything in flight. Part of project deletion.
    ///
    /// # Errors
    ///
    /// Propagates a checkpoint-removal failure so the host can retry
    /// the purge.
    pub async fn delete_project_artifacts(&self, project_id: Uuid) -> Result<(), PipelineError> {
        self.cancel_active_requests(Some(project_id));
        self.store.clear_pause_flag(project_id).await;
        self.store.clear(project_id).await?;
        Ok(())
    }

    // ---- internals ------------------------------------------------------

    fn acquire_run(&self, project_id: Uuid) -> Result<RunGuard, PipelineError> {
        match self.runs.entry(project_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                Err(PipelineError::RunInProgress(project_id))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(());
                Ok(RunGuard {
                    runs: self.runs.clone(),
                    project_id,
                })
            }
        }
    }

    /// The shared module loop behind generate-all and retry-failed.
    async fn run_modules(
        &self,
        project: &mut Project,
        roadmap: &Roadmap,
        session: &GenerationSession,
        targets: &[usize],
        mut completed: Vec<String>,
    ) -> Result<GenerationOutcome, PipelineError> {
        for &index in targets {
            let module = &roadmap.modules[index];

            // Pause is honored only here, between iterations.
            if self.store.is_paused(project.id).await {
                self.store
                    .save(&Checkpoint::new(project.id, index, completed.clone()))
                    .await;
                self.publish_status(self.snapshot(
                    project,
                    RunStatus::Paused,
                    format!("Paused before '{}'", module.title),
                ));
                return Ok(GenerationOutcome::Paused);
            }

            match self
                .generate_one_module(project, roadmap, index, session, &mut completed)
                .await?
            {
                ModuleOutcome::Settled => {}
                ModuleOutcome::Cancelled => {
                    self.publish_status(self.snapshot(
                        project,
                        RunStatus::Idle,
                        "Generation cancelled",
                    ));
                    return Ok(GenerationOutcome::Cancelled);
                }
                ModuleOutcome::SwitchRequested => {
                    self.store
                        .save(&Checkpoint::new(project.id, index, completed.clone()))
                        .await;
                    self.publish_status(self.snapshot(
                        project,
                        RunStatus::Idle,
                        "Waiting for provider switch",
                    ));
                    return Ok(GenerationOutcome::SwitchRequested);
                }
            }
        }

        // Ready-to-assemble marker, distinct from `Completed`. The
        // status check makes the transition fire exactly once per run
        // even though the condition is re-evaluated on every update.
        if project.all_modules_completed() && project.status == ProjectStatus::GeneratingContent {
            project.set_status(ProjectStatus::RoadmapCompleted)?;
            self.publish_status(self.snapshot(
                project,
                RunStatus::Generating,
                "All modules completed, ready to assemble",
            ));
        }
        project.recompute_totals();
        self.publish_project(project);
        Ok(GenerationOutcome::Finished)
    }

    /// Drives one module to a terminal result (completed or failed),
    /// or reports that the run should stop.
    async fn generate_one_module(
        &self,
        project: &mut Project,
        roadmap: &Roadmap,
        index: usize,
        session: &GenerationSession,
        completed: &mut Vec<String>,
    ) -> Result<ModuleOutcome, PipelineError> {
        let module = &roadmap.modules[index];
        let mut attempt: u32 = 1;

        loop {
            self.publish_module_status(project, module, attempt, "", RunStatus::Generating);
            tracing::debug!(project_id = %project.id, module_id = %module.id, attempt, "generating module");

            let prior = prompts::context_window(project, roadmap, index, &self.config);
            let request =
                prompts::module_request(project, module, &prior, session, &self.config);

            let result = if session.stream {
                self.stream_module(project, module, attempt, &request).await
            } else {
                self.call_generator(project.id, &request).await
            };

            match result {
                Ok(content) => {
                    project.upsert_module_result(ModuleResult::completed(module, content));
                    project.recompute_totals();
                    completed.push(module.id.clone());
                    self.store
                        .save(&Checkpoint::new(project.id, index + 1, completed.clone()))
                        .await;
                    self.publish_status(self.snapshot(
                        project,
                        RunStatus::Generating,
                        format!("Completed '{}'", module.title),
                    ));
                    self.publish_project(project);
                    return Ok(ModuleOutcome::Settled);
                }
                Err(e) if e.is_cancellation() => {
                    tracing::info!(project_id = %project.id, module_id = %module.id, "module generation cancelled");
                    return Ok(ModuleOutcome::Cancelled);
                }
                Err(GenerateError::Auth(message)) => {
                    project.fail(format!("authentication failed: {message}"));
                    self.publish_status(self.snapshot(project, RunStatus::Error, message.clone()));
                    self.publish_project(project);
                    return Err(GenerateError::Auth(message).into());
                }
                Err(error) => {
                    match self.recover(project, module, attempt, &error).await {
                        Recovery::RetryNow => attempt += 1,
                        Recovery::SwitchRequested => return Ok(ModuleOutcome::SwitchRequested),
                        Recovery::Cancelled => {
                            tracing::info!(project_id = %project.id, module_id = %module.id, "run cancelled while awaiting retry decision");
                            return Ok(ModuleOutcome::Cancelled);
                        }
                        Recovery::PermanentFailure => {
                            project.upsert_module_result(ModuleResult::failed(
                                module,
                                error.to_string(),
                            ));
                            project.recompute_totals();
                            self.publish_status(self.snapshot(
                                project,
                                RunStatus::Generating,
                                format!("Module '{}' failed permanently", module.title),
                            ));
                            self.publish_project(project);
                            return Ok(ModuleOutcome::Settled);
                        }
                    }
                }
            }
        }
    }

    /// Classifies a module failure and, when attempts remain and
    /// someone is listening, suspends on the decision gate.
    async fn recover(
        &self,
        project: &Project,
        module: &RoadmapModule,
        attempt: u32,
        error: &GenerateError,
    ) -> Recovery {
        let kind = classify(error);
        tracing::warn!(
            project_id = %project.id,
            module_id = %module.id,
            attempt,
            kind = %kind,
            error = %error,
            "module generation failed"
        );

        if !self.policy.allows_another_attempt(attempt) {
            return Recovery::PermanentFailure;
        }
        // With no decision channel wired we must never block; silent
        // auto-retry against a paid API is equally off the table.
        if self.bus.subscriber_count() == 0 {
            tracing::warn!(project_id = %project.id, module_id = %module.id, "no subscriber for retry decision, failing module");
            return Recovery::PermanentFailure;
        }

        let wait = self.policy.backoff_delay(kind, attempt, wait_hint(error));
        let receiver = self.gate.arm(project.id);

        let mut snapshot = self.snapshot(project, RunStatus::WaitingRetry, format!(
            "'{}' failed, waiting for decision",
            module.title
        ));
        snapshot.current_module = Some(CurrentModule {
            id: module.id.clone(),
            title: module.title.clone(),
            attempt,
            progress: 0,
            partial_text: String::new(),
        });
        snapshot.retry = Some(RetryInfo {
            module_title: module.title.clone(),
            error: error.to_string(),
            kind,
            attempt,
            max_attempts: self.policy.max_attempts,
            wait,
        });
        self.publish_status(snapshot);

        // Suspends indefinitely; a decision or a cancellation resumes
        // the loop. A dropped gate (replaced by a re-arm) reads as skip.
        match receiver.await {
            Ok(GateSignal::Decision(RetryDecision::Retry)) => Recovery::RetryNow,
            Ok(GateSignal::Decision(RetryDecision::Switch)) => Recovery::SwitchRequested,
            Ok(GateSignal::Decision(RetryDecision::Skip)) | Err(_) => Recovery::PermanentFailure,
            Ok(GateSignal::Cancelled) => Recovery::Cancelled,
        }
    }

    /// One full-text generation call with timeout and cancellation.
    async fn call_generator(
        &self,
        project_id: Uuid,
        request: &GenerationRequest,
    ) -> GenerateResult<String> {
        let token = self.tokens.issue(project_id);
        let outcome = match timeout(
            self.config.request_timeout,
            self.generator.generate(request, token.clone()),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                // Same path as explicit cancellation, classified as a
                // network failure rather than a user stop.
                token.cancel("request timeout");
                Err(GenerateError::Network(format!(
                    "request timed out after {}s",
                    self.config.request_timeout.as_secs()
                )))
            }
        };
        self.tokens.release(project_id);
        outcome
    }

    /// Streaming variant of a module call; forwards partial text on the
    /// bus as it accumulates.
    async fn stream_module(
        &self,
        project: &Project,
        module: &RoadmapModule,
        attempt: u32,
        request: &GenerationRequest,
    ) -> GenerateResult<String> {
        let token = self.tokens.issue(project.id);
        let outcome = timeout(self.config.request_timeout, async {
            let mut stream = self.generator.generate_stream(request, token.clone()).await?;
            let mut text = String::new();
            while let Some(chunk) = stream.next().await {
                text.push_str(&chunk?);
                self.publish_module_status(project, module, attempt, &text, RunStatus::Generating);
            }
            Ok(text)
        })
        .await
        .unwrap_or_else(|_| {
            token.cancel("request timeout");
            Err(GenerateError::Network(format!(
                "request timed out after {}s",
                self.config.request_timeout.as_secs()
            )))
        });
        self.tokens.release(project.id);
        outcome
    }

    fn snapshot(
        &self,
        project: &Project,
        status: RunStatus,
        message: impl Into<String>,
    ) -> StatusSnapshot {
        let mut snapshot = StatusSnapshot::new(project.id, status, message);
        snapshot.progress = project.progress_percent();
        snapshot.total_words = project.generated_words();
        snapshot
    }

    fn publish_module_status(
        &self,
        project: &Project,
        module: &RoadmapModule,
        attempt: u32,
        partial_text: &str,
        status: RunStatus,
    ) {
        let mut snapshot = self.snapshot(
            project,
            status,
            format!("Generating '{}' (attempt {attempt})", module.title),
        );
        snapshot.current_module = Some(CurrentModule {
            id: module.id.clone(),
            title: module.title.clone(),
            attempt,
            progress: 0,
            partial_text: partial_text.to_string(),
        });
        self.publish_status(snapshot);
    }

    fn publish_status(&self, snapshot: StatusSnapshot) {
        self.bus.publish(PipelineEvent::Status(snapshot));
    }

    fn publish_project(&self, project: &Project) {
        self.bus
            .publish(PipelineEvent::ProjectUpdated(Box::new(project.clone())));
    }
}

/// Terminal disposition of one module within the loop.
enum ModuleOutcome {
    /// The module reached a terminal result; continue with the next.
    Settled,
    /// The run was cancelled mid-flight.
    Cancelled,
    /// The user asked to switch providers; stop and return control.
    SwitchRequested,
}

/// Outcome of the recovery path for one failed attempt.
enum Recovery {
    RetryNow,
    SwitchRequested,
    PermanentFailure,
    Cancelled,
}
