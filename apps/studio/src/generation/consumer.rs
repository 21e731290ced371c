//! Streaming Result Consumer — runs one generation at a time, publishing every
//! partial result as it arrives.
//!
//! State lives in a single `watch` channel; every transition goes through
//! `GenerationPhase::next` and is applied atomically with `send_if_modified`,
//! guarded by the run id so a cancelled or replaced run can never write again.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ResubmitPolicy;
use crate::form::models::GenerationRequest;
use crate::generation::models::{CompletedGeneration, FinalCoverLetter, GenerationResult};
use crate::generation::partial_json::PartialObjectDecoder;
use crate::notifications::Notifier;
use crate::remote::GenerationBackend;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    Idle,
    Streaming,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationEvent {
    Submit,
    Partial,
    Finish,
    Stop,
    Fail,
}

impl GenerationPhase {
    /// Transition table. `None` means the event does not apply in this phase.
    pub fn next(self, event: GenerationEvent) -> Option<GenerationPhase> {
        use GenerationEvent as E;
        use GenerationPhase as P;

        match (self, event) {
            (P::Idle | P::Complete | P::Error, E::Submit) => Some(P::Streaming),
            // Only reachable under the restart policy.
            (P::Streaming, E::Submit) => Some(P::Streaming),
            (P::Streaming, E::Partial) => Some(P::Streaming),
            (P::Streaming, E::Finish | E::Stop) => Some(P::Complete),
            (P::Streaming, E::Fail) => Some(P::Error),
            _ => None,
        }
    }
}

/// What observers see after every transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSnapshot {
    pub run_id: Option<Uuid>,
    pub phase: GenerationPhase,
    pub result: Option<GenerationResult>,
    pub is_loading: bool,
    pub error: Option<String>,
    /// The run was ended by `stop` rather than by the stream finishing.
    pub stopped: bool,
    /// Partial updates applied during this run.
    pub updates: u64,
}

impl Default for GenerationSnapshot {
    fn default() -> Self {
        Self {
            run_id: None,
            phase: GenerationPhase::Idle,
            result: None,
            is_loading: false,
            error: None,
            stopped: false,
            updates: 0,
        }
    }
}

impl GenerationSnapshot {
    /// The result, once its stream has ended without error.
    pub fn completed(&self) -> Option<CompletedGeneration> {
        match (self.phase, self.run_id, &self.result) {
            (GenerationPhase::Complete, Some(run_id), Some(result)) => Some(CompletedGeneration {
                run_id,
                result: result.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("A cover letter is already being generated")]
    AlreadyRunning,
}

pub struct StreamingConsumer {
    backend: Arc<dyn GenerationBackend>,
    notifier: Notifier,
    policy: ResubmitPolicy,
    state: watch::Sender<GenerationSnapshot>,
    in_flight: Mutex<Option<(Uuid, CancellationToken)>>,
}

impl StreamingConsumer {
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        notifier: Notifier,
        policy: ResubmitPolicy,
    ) -> Self {
        let (state, _) = watch::channel(GenerationSnapshot::default());
        Self {
            backend,
            notifier,
            policy,
            state,
            in_flight: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> GenerationSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<GenerationSnapshot> {
        self.state.subscribe()
    }

    /// Starts a generation and returns its run id. While another run is
    /// streaming the configured `ResubmitPolicy` decides between refusing and
    /// cancelling the old run.
    pub async fn submit(self: &Arc<Self>, request: GenerationRequest) -> Result<Uuid, GenerationError> {
        let mut in_flight = self.in_flight.lock().await;
        let run_id = Uuid::new_v4();
        let mut rejected = false;

        let policy = self.policy;
        self.state.send_if_modified(|snap| {
            if snap.phase == GenerationPhase::Streaming && policy == ResubmitPolicy::Reject {
                rejected = true;
                return false;
            }
            let Some(next) = snap.phase.next(GenerationEvent::Submit) else {
                return false;
            };
            *snap = GenerationSnapshot {
                run_id: Some(run_id),
                phase: next,
                is_loading: true,
                ..GenerationSnapshot::default()
            };
            true
        });

        if rejected {
            warn!("Generation submit rejected: a run is already streaming");
            return Err(GenerationError::AlreadyRunning);
        }

        if let Some((previous, token)) = in_flight.take() {
            info!(%previous, "Cancelling generation replaced by a new submission");
            token.cancel();
        }
        let token = CancellationToken::new();
        *in_flight = Some((run_id, token.clone()));
        drop(in_flight);

        info!(%run_id, role = %request.body.role, "Cover letter generation started");
        // No await between the transition and the spawn.
        tokio::spawn(Arc::clone(self).run(run_id, token, request));
        Ok(run_id)
    }

    /// Cancels the in-flight run. Text received so far stays visible and no
    /// error is raised. Returns false when nothing was streaming.
    pub async fn stop(&self) -> bool {
        let mut in_flight = self.in_flight.lock().await;
        let stopped = self.state.send_if_modified(|snap| {
            let Some(next) = snap.phase.next(GenerationEvent::Stop) else {
                return false;
            };
            snap.phase = next;
            snap.is_loading = false;
            snap.stopped = true;
            true
        });

        if let Some((run_id, token)) = in_flight.take() {
            token.cancel();
            if stopped {
                info!(%run_id, "Generation stopped by user");
            }
        }
        stopped
    }

    async fn run(
        self: Arc<Self>,
        run_id: Uuid,
        token: CancellationToken,
        request: GenerationRequest,
    ) {
        self.notifier
            .info(
                "Cover Letter Generation Started",
                "Your cover letter is being generated.",
            )
            .await;

        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return,
            opened = self.backend.open_stream(&request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => {
                self.fail(run_id, e.to_string()).await;
                return;
            }
        };

        let mut decoder = PartialObjectDecoder::<GenerationResult>::default();
        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(%run_id, "Generation stream cancelled");
                    return;
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    if let Some(partial) = decoder.push(&fragment) {
                        self.apply_partial(run_id, partial);
                    }
                }
                Some(Err(e)) => {
                    self.fail(run_id, e.to_string()).await;
                    return;
                }
                None => break,
            }
        }

        match decoder.finish::<FinalCoverLetter>() {
            Ok(done) => self.finish(run_id, done.into()).await,
            Err(e) => self.fail(run_id, e.to_string()).await,
        }
    }

    /// Applies `event` only if `run_id` is still the current, streaming run.
    fn transition(
        &self,
        run_id: Uuid,
        event: GenerationEvent,
        update: impl FnOnce(&mut GenerationSnapshot),
    ) -> bool {
        self.state.send_if_modified(|snap| {
            if snap.run_id != Some(run_id) || snap.phase != GenerationPhase::Streaming {
                return false;
            }
            let Some(next) = snap.phase.next(event) else {
                return false;
            };
            snap.phase = next;
            snap.is_loading = next == GenerationPhase::Streaming;
            update(snap);
            true
        })
    }

    fn apply_partial(&self, run_id: Uuid, partial: GenerationResult) {
        self.transition(run_id, GenerationEvent::Partial, |snap| {
            snap.result = Some(partial);
            snap.updates += 1;
        });
    }

    async fn finish(&self, run_id: Uuid, result: GenerationResult) {
        if let Some(sources) = &result.sources {
            for source in sources {
                if let Some(share) = source.contributions {
                    if !(0.0..=100.0).contains(&share) {
                        warn!(%run_id, id = %source.id, share, "Source contribution outside 0-100");
                    }
                }
            }
        }

        let has_text = !result.text.is_empty();
        if !self.transition(run_id, GenerationEvent::Finish, |snap| {
            snap.result = Some(result);
        }) {
            return;
        }
        self.release(run_id).await;

        info!(%run_id, "Cover letter generation complete");
        if has_text {
            self.notifier
                .success(
                    "Cover Letter Generated",
                    "Your cover letter has been successfully generated.",
                )
                .await;
        }
    }

    async fn fail(&self, run_id: Uuid, message: String) {
        let error = message.clone();
        if !self.transition(run_id, GenerationEvent::Fail, |snap| {
            snap.error = Some(error);
        }) {
            return;
        }
        self.release(run_id).await;
        self.notifier.error("Generation Error", message).await;
    }

    async fn release(&self, run_id: Uuid) {
        let mut in_flight = self.in_flight.lock().await;
        if matches!(in_flight.as_ref(), Some((id, _)) if *id == run_id) {
            *in_flight = None;
        }
    }
}
