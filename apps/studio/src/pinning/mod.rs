//! PDF pinning: forwards one uploaded file at a time to the pinning endpoint
//! and reports the outcome as a notification.

pub mod handlers;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;
use tracing::{info, warn};

use crate::notifications::Notifier;
use crate::remote::{PinBackend, PinFile, PinnedFile, RemoteError, SessionLookup};

#[derive(Debug, Error)]
pub enum PinError {
    #[error("Please upload a file")]
    MissingFile,

    #[error("A file is already being uploaded")]
    Busy,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

/// A file received from the client, not yet pinned.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Bytes,
}

pub struct PinService {
    backend: Arc<dyn PinBackend>,
    sessions: Arc<dyn SessionLookup>,
    notifier: Notifier,
    uploading: AtomicBool,
}

/// Clears the `uploading` flag when the pin attempt ends, however it ends.
struct UploadingGuard<'a>(&'a AtomicBool);

impl Drop for UploadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl PinService {
    pub fn new(
        backend: Arc<dyn PinBackend>,
        sessions: Arc<dyn SessionLookup>,
        notifier: Notifier,
    ) -> Self {
        Self {
            backend,
            sessions,
            notifier,
            uploading: AtomicBool::new(false),
        }
    }

    fn begin(&self) -> Option<UploadingGuard<'_>> {
        self.uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| UploadingGuard(&self.uploading))
    }

    pub async fn pin(&self, file: Option<IncomingFile>) -> Result<PinnedFile, PinError> {
        let Some(file) = file.filter(|f| !f.bytes.is_empty()) else {
            return Err(PinError::MissingFile);
        };
        let Some(_guard) = self.begin() else {
            return Err(PinError::Busy);
        };

        let user_id = match self.sessions.current_user_id().await {
            Ok(id) => id.unwrap_or_default(),
            Err(e) => {
                warn!("Session lookup failed, pinning without a user id: {e}");
                String::new()
            }
        };

        info!(file = %file.file_name, size = file.bytes.len(), "Pinning file");
        let result = self
            .backend
            .pin_file(PinFile {
                file_name: file.file_name,
                content_type: file.content_type,
                bytes: file.bytes,
                user_id,
            })
            .await;

        match result {
            Ok(pinned) => {
                self.notifier
                    .success("PDF Pinned", format!("Your file is available at {}", pinned.url))
                    .await;
                Ok(pinned)
            }
            Err(e) => {
                self.notifier.error("Pinning Error", e.to_string()).await;
                Err(e.into())
            }
        }
    }
}
