//! Save Workflow Controller — uploads a completed cover letter once, driving
//! a blocking progress dialog through its phases.
//!
//! Like the generation consumer, all state sits in one `watch` channel and
//! every transition is applied with `send_if_modified`, so the "in progress"
//! and "already saved" guards are checked and set in a single step.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::form::state::SaveMetadata;
use crate::generation::models::{CompletedGeneration, SourceAttribution};
use crate::notifications::Notifier;
use crate::remote::{CoverLetterUpload, SessionLookup, UploadBackend};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SavePhase {
    Idle,
    Uploading,
    Complete,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveEvent {
    Start,
    Succeed,
    Fail,
}

impl SavePhase {
    /// Transition table. `None` means the event does not apply in this phase.
    pub fn next(self, event: SaveEvent) -> Option<SavePhase> {
        use SaveEvent as E;
        use SavePhase as P;

        match (self, event) {
            (P::Idle | P::Complete | P::Error, E::Start) => Some(P::Uploading),
            (P::Uploading, E::Succeed) => Some(P::Complete),
            (P::Uploading, E::Fail) => Some(P::Error),
            _ => None,
        }
    }
}

/// Step shown in the progress dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveStep {
    Processing,
    UploadingFile,
    Completed,
}

impl SaveStep {
    pub fn label(&self) -> &'static str {
        match self {
            SaveStep::Processing => "Processing...",
            SaveStep::UploadingFile => "Uploading file...",
            SaveStep::Completed => "Save completed",
        }
    }
}

/// The blocking dialog. Present from the start of a save until it is
/// dismissed or the upload fails.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveProgress {
    pub step: SaveStep,
    pub label: &'static str,
    pub percent: u8,
    /// The user asked to keep viewing the dialog; auto-dismiss is skipped.
    pub held: bool,
}

impl SaveProgress {
    fn at(step: SaveStep, percent: u8) -> Self {
        Self {
            step,
            label: step.label(),
            percent,
            held: false,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveSnapshot {
    pub phase: SavePhase,
    pub saving: bool,
    /// Run id of the last result uploaded successfully.
    pub saved_run: Option<Uuid>,
    pub progress: Option<SaveProgress>,
    pub error: Option<String>,
    /// Incremented by every started save; stale dismiss timers compare it.
    pub attempt: u64,
}

impl Default for SaveSnapshot {
    fn default() -> Self {
        Self {
            phase: SavePhase::Idle,
            saving: false,
            saved_run: None,
            progress: None,
            error: None,
            attempt: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    EmptyResult,
    InProgress,
    AlreadySaved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DismissOutcome {
    Dismissed,
    Blocked,
    NotOpen,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("{0}")]
    Upload(String),

    #[error("Failed to encode save payload: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Everything the detached upload task needs from one `save` call.
struct UploadJob {
    run_id: Uuid,
    attempt: u64,
    text: String,
    references: String,
    metadata: String,
}

pub struct SaveController {
    uploader: Arc<dyn UploadBackend>,
    sessions: Arc<dyn SessionLookup>,
    notifier: Notifier,
    wallet_address: String,
    dismiss_delay: Duration,
    state: watch::Sender<SaveSnapshot>,
}

impl SaveController {
    pub fn new(
        uploader: Arc<dyn UploadBackend>,
        sessions: Arc<dyn SessionLookup>,
        notifier: Notifier,
        wallet_address: String,
        dismiss_delay: Duration,
    ) -> Self {
        let (state, _) = watch::channel(SaveSnapshot::default());
        Self {
            uploader,
            sessions,
            notifier,
            wallet_address,
            dismiss_delay,
            state,
        }
    }

    pub fn snapshot(&self) -> SaveSnapshot {
        self.state.borrow().clone()
    }

    pub fn is_saved(&self, run_id: Uuid) -> bool {
        self.state.borrow().saved_run == Some(run_id)
    }

    /// Uploads `generation` unless it is empty, a save is running, or this
    /// run was already saved; those cases return `Skipped` without side
    /// effects. A failed upload leaves the result retryable.
    pub async fn save(
        self: &Arc<Self>,
        generation: &CompletedGeneration,
        metadata: &SaveMetadata,
    ) -> Result<SaveOutcome, SaveError> {
        let run_id = generation.run_id;
        let text = &generation.result.text;
        if text.is_empty() {
            return Ok(SaveOutcome::Skipped(SkipReason::EmptyResult));
        }

        let sources: &[SourceAttribution] = generation.result.sources.as_deref().unwrap_or(&[]);
        let references = serde_json::to_string(sources)?;
        let metadata = serde_json::to_string(metadata)?;

        let mut skipped = None;
        let mut attempt = 0;
        self.state.send_if_modified(|snap| {
            if snap.saving {
                skipped = Some(SkipReason::InProgress);
                return false;
            }
            if snap.saved_run == Some(run_id) {
                skipped = Some(SkipReason::AlreadySaved);
                return false;
            }
            let Some(next) = snap.phase.next(SaveEvent::Start) else {
                return false;
            };
            snap.phase = next;
            snap.saving = true;
            snap.error = None;
            snap.attempt += 1;
            snap.progress = Some(SaveProgress::at(SaveStep::Processing, 0));
            attempt = snap.attempt;
            true
        });
        if let Some(reason) = skipped {
            debug!(%run_id, ?reason, "Save skipped");
            return Ok(SaveOutcome::Skipped(reason));
        }

        // Detached: dropping the caller does not cancel the upload.
        let job = UploadJob {
            run_id,
            attempt,
            text: text.clone(),
            references,
            metadata,
        };
        match tokio::spawn(Arc::clone(self).run_upload(job)).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let message = format!("Upload task failed: {e}");
                self.fail(message.clone()).await;
                Err(SaveError::Upload(message))
            }
        }
    }

    async fn run_upload(self: Arc<Self>, job: UploadJob) -> Result<SaveOutcome, SaveError> {
        let UploadJob {
            run_id,
            attempt,
            text,
            references,
            metadata,
        } = job;

        let user_id = match self.sessions.current_user_id().await {
            Ok(Some(id)) => id,
            Ok(None) => String::new(),
            Err(e) => {
                warn!("Session lookup failed, saving without a user id: {e}");
                String::new()
            }
        };

        self.state.send_modify(|snap| {
            snap.progress = Some(SaveProgress::at(SaveStep::UploadingFile, 0));
        });
        info!(%run_id, attempt, "Uploading cover letter");

        let upload = CoverLetterUpload {
            pdf: Bytes::from(text.clone().into_bytes()),
            text,
            wallet_address: self.wallet_address.clone(),
            user_id,
            references,
            metadata,
        };

        match self.uploader.upload_cover_letter(upload).await {
            Ok(()) => {
                self.state.send_modify(|snap| {
                    if let Some(next) = snap.phase.next(SaveEvent::Succeed) {
                        snap.phase = next;
                    }
                    snap.saving = false;
                    snap.saved_run = Some(run_id);
                    snap.progress = Some(SaveProgress::at(SaveStep::Completed, 100));
                });
                self.notifier
                    .success(
                        "Cover Letter Saved",
                        "Your cover letter has been successfully converted to PDF and saved.",
                    )
                    .await;
                self.schedule_dismiss(attempt);
                Ok(SaveOutcome::Saved)
            }
            Err(e) => {
                let message = e.to_string();
                self.fail(message.clone()).await;
                Err(SaveError::Upload(message))
            }
        }
    }

    /// Tears the dialog down and leaves the result retryable.
    async fn fail(&self, message: String) {
        let shown = message.clone();
        self.state.send_if_modified(|snap| {
            let Some(next) = snap.phase.next(SaveEvent::Fail) else {
                return false;
            };
            snap.phase = next;
            snap.saving = false;
            snap.progress = None;
            snap.error = Some(shown);
            true
        });
        self.notifier.error("Upload Error", message).await;
    }

    /// User dismissal. Refused while an upload is running short of 100%.
    pub fn dismiss_dialog(&self) -> DismissOutcome {
        let mut outcome = DismissOutcome::NotOpen;
        self.state.send_if_modified(|snap| match &snap.progress {
            None => false,
            Some(progress) if snap.saving && progress.percent < 100 => {
                outcome = DismissOutcome::Blocked;
                false
            }
            Some(_) => {
                snap.progress = None;
                outcome = DismissOutcome::Dismissed;
                true
            }
        });
        outcome
    }

    /// Keeps the dialog open past the auto-dismiss delay. Returns false when
    /// no dialog is showing.
    pub fn hold_dialog(&self) -> bool {
        let mut open = false;
        self.state.send_if_modified(|snap| {
            let Some(progress) = snap.progress.as_mut() else {
                return false;
            };
            open = true;
            if progress.held {
                return false;
            }
            progress.held = true;
            true
        });
        open
    }

    fn schedule_dismiss(self: &Arc<Self>, attempt: u64) {
        let this = Arc::clone(self);
        let delay = self.dismiss_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.auto_dismiss(attempt);
        });
    }

    fn auto_dismiss(&self, attempt: u64) {
        self.state.send_if_modified(|snap| {
            let open = matches!(&snap.progress, Some(p) if !p.held);
            if snap.attempt != attempt || snap.saving || !open {
                return false;
            }
            snap.progress = None;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::models::ExperienceBucket;
    use crate::generation::models::GenerationResult;
    use crate::notifications::NotificationKind;
    use crate::remote::fakes::{CountingUploader, StaticSession};

    const DISMISS: Duration = Duration::from_millis(2000);

    fn controller(
        uploader: Arc<CountingUploader>,
        sessions: StaticSession,
    ) -> (Arc<SaveController>, Notifier) {
        let notifier = Notifier::default();
        let controller = Arc::new(SaveController::new(
            uploader,
            Arc::new(sessions),
            notifier.clone(),
            "0xabc123".to_string(),
            DISMISS,
        ));
        (controller, notifier)
    }

    fn completed(text: &str) -> CompletedGeneration {
        CompletedGeneration {
            run_id: Uuid::new_v4(),
            result: GenerationResult {
                text: text.to_string(),
                sources: Some(vec![SourceAttribution {
                    id: "letter-3".into(),
                    contributions: Some(70.0),
                }]),
            },
        }
    }

    fn metadata() -> SaveMetadata {
        SaveMetadata {
            role: "Backend Developer".into(),
            experience: ExperienceBucket::ThreeToFive,
        }
    }

    async fn wait_until(mut f: impl FnMut() -> bool) {
        for _ in 0..200 {
            if f() {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition never became true");
    }

    #[test]
    fn test_transition_table() {
        use SaveEvent as E;
        use SavePhase as P;

        assert_eq!(P::Idle.next(E::Start), Some(P::Uploading));
        assert_eq!(P::Uploading.next(E::Succeed), Some(P::Complete));
        assert_eq!(P::Uploading.next(E::Fail), Some(P::Error));
        assert_eq!(P::Error.next(E::Start), Some(P::Uploading));
        assert_eq!(P::Complete.next(E::Start), Some(P::Uploading));
        assert_eq!(P::Uploading.next(E::Start), None);
        assert_eq!(P::Idle.next(E::Succeed), None);
    }

    #[tokio::test]
    async fn test_second_save_of_same_result_is_a_no_op() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, notifier) = controller(uploader.clone(), StaticSession::user("u-1"));
        let generation = completed("Dear hiring manager");

        let first = controller.save(&generation, &metadata()).await.unwrap();
        let second = controller.save(&generation, &metadata()).await.unwrap();

        assert_eq!(first, SaveOutcome::Saved);
        assert_eq!(second, SaveOutcome::Skipped(SkipReason::AlreadySaved));
        assert_eq!(uploader.calls(), 1);
        assert!(controller.is_saved(generation.run_id));

        let saved = notifier.recent().await;
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].title, "Cover Letter Saved");
    }

    #[tokio::test]
    async fn test_upload_payload() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-42"));
        let generation = completed("Dear team");

        controller.save(&generation, &metadata()).await.unwrap();

        let upload = uploader.last().unwrap();
        assert_eq!(upload.text, "Dear team");
        assert_eq!(upload.pdf, Bytes::from_static(b"Dear team"));
        assert_eq!(upload.wallet_address, "0xabc123");
        assert_eq!(upload.user_id, "u-42");
        assert_eq!(upload.references, r#"[{"id":"letter-3","contributions":70.0}]"#);
        assert_eq!(
            upload.metadata,
            r#"{"role":"Backend Developer","experience":"3-5 years"}"#
        );
    }

    #[tokio::test]
    async fn test_missing_sources_upload_empty_references() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-1"));
        let mut generation = completed("Dear team");
        generation.result.sources = None;

        controller.save(&generation, &metadata()).await.unwrap();
        assert_eq!(uploader.last().unwrap().references, "[]");
    }

    #[tokio::test]
    async fn test_failed_session_lookup_saves_without_user() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader.clone(), StaticSession::failing());

        let outcome = controller.save(&completed("Hello"), &metadata()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Saved);
        assert_eq!(uploader.last().unwrap().user_id, "");
    }

    #[tokio::test]
    async fn test_failed_upload_is_retryable() {
        let uploader = Arc::new(CountingUploader::default());
        uploader.fail_next("disk full");
        let (controller, notifier) = controller(uploader.clone(), StaticSession::user("u-1"));
        let generation = completed("Dear hiring manager");

        let err = controller.save(&generation, &metadata()).await.unwrap_err();
        assert_eq!(err.to_string(), "disk full");

        let snap = controller.snapshot();
        assert_eq!(snap.phase, SavePhase::Error);
        assert!(!snap.saving);
        assert!(snap.progress.is_none(), "dialog torn down on failure");
        assert!(!controller.is_saved(generation.run_id));

        let errors = notifier.recent().await;
        assert_eq!(errors[0].kind, NotificationKind::Error);
        assert_eq!(errors[0].title, "Upload Error");

        let retry = controller.save(&generation, &metadata()).await.unwrap();
        assert_eq!(retry, SaveOutcome::Saved);
        assert_eq!(uploader.calls(), 2);
        assert_eq!(controller.snapshot().phase, SavePhase::Complete);
    }

    #[tokio::test]
    async fn test_new_result_can_be_saved_again() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-1"));

        controller.save(&completed("First"), &metadata()).await.unwrap();
        let second = controller.save(&completed("Second"), &metadata()).await.unwrap();

        assert_eq!(second, SaveOutcome::Saved);
        assert_eq!(uploader.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_uploaded() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-1"));

        let outcome = controller.save(&completed(""), &metadata()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped(SkipReason::EmptyResult));
        assert_eq!(uploader.calls(), 0);
        assert_eq!(controller.snapshot().phase, SavePhase::Idle);
    }

    #[tokio::test]
    async fn test_dialog_cannot_be_dismissed_mid_upload() {
        let uploader = Arc::new(CountingUploader::gated());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-1"));
        let generation = completed("Dear hiring manager");

        let task = {
            let controller = controller.clone();
            let generation = generation.clone();
            tokio::spawn(async move { controller.save(&generation, &metadata()).await })
        };
        wait_until(|| uploader.calls() == 1).await;

        let snap = controller.snapshot();
        assert!(snap.saving);
        assert_eq!(snap.progress.as_ref().unwrap().step, SaveStep::UploadingFile);
        assert_eq!(controller.dismiss_dialog(), DismissOutcome::Blocked);

        let concurrent = controller.save(&generation, &metadata()).await.unwrap();
        assert_eq!(concurrent, SaveOutcome::Skipped(SkipReason::InProgress));

        uploader.release();
        assert_eq!(task.await.unwrap().unwrap(), SaveOutcome::Saved);
        assert_eq!(uploader.calls(), 1);

        let done = controller.snapshot().progress.unwrap();
        assert_eq!(done.percent, 100);
        assert_eq!(done.label, "Save completed");
        assert_eq!(controller.dismiss_dialog(), DismissOutcome::Dismissed);
        assert_eq!(controller.dismiss_dialog(), DismissOutcome::NotOpen);
    }

    #[tokio::test]
    async fn test_abandoned_save_still_finishes() {
        let uploader = Arc::new(CountingUploader::gated());
        let (controller, _) = controller(uploader.clone(), StaticSession::user("u-1"));
        let generation = completed("Dear hiring manager");

        let caller = {
            let controller = controller.clone();
            let generation = generation.clone();
            tokio::spawn(async move { controller.save(&generation, &metadata()).await })
        };
        wait_until(|| uploader.calls() == 1).await;
        caller.abort();
        assert!(caller.await.unwrap_err().is_cancelled());

        uploader.release();
        let mut rx = controller.state.subscribe();
        let done = {
            let seen = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| !s.saving))
                .await
                .expect("upload never finished")
                .unwrap();
            SaveSnapshot::clone(&seen)
        };

        assert_eq!(done.phase, SavePhase::Complete);
        assert_eq!(done.progress.as_ref().unwrap().percent, 100);
        assert!(controller.is_saved(generation.run_id));
        assert_eq!(controller.dismiss_dialog(), DismissOutcome::Dismissed);

        let retry = controller.save(&generation, &metadata()).await.unwrap();
        assert_eq!(retry, SaveOutcome::Skipped(SkipReason::AlreadySaved));
        assert_eq!(uploader.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dialog_auto_dismisses_after_delay() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader, StaticSession::user("u-1"));

        controller.save(&completed("Hi"), &metadata()).await.unwrap();
        assert!(controller.snapshot().progress.is_some());

        tokio::time::sleep(DISMISS - Duration::from_millis(1)).await;
        assert!(controller.snapshot().progress.is_some());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert!(controller.snapshot().progress.is_none());
        assert_eq!(controller.snapshot().phase, SavePhase::Complete);
    }

    #[tokio::test(start_paused = true)]
    async fn test_held_dialog_stays_open() {
        let uploader = Arc::new(CountingUploader::default());
        let (controller, _) = controller(uploader, StaticSession::user("u-1"));

        assert!(!controller.hold_dialog());
        controller.save(&completed("Hi"), &metadata()).await.unwrap();
        assert!(controller.hold_dialog());

        tokio::time::sleep(DISMISS * 2).await;
        assert!(controller.snapshot().progress.is_some());
        assert_eq!(controller.dismiss_dialog(), DismissOutcome::Dismissed);
    }
}
