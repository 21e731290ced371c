//! In-memory stand-ins for the remote seams, used by controller and route tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::{mpsc, Semaphore};
use tokio_stream::wrappers::UnboundedReceiverStream;

use super::*;

pub type ChunkSender = mpsc::UnboundedSender<Result<String, RemoteError>>;

enum Script {
    Stream(mpsc::UnboundedReceiver<Result<String, RemoteError>>),
    OpenError(RemoteError),
}

/// Generation backend whose streams are fed chunk by chunk from the test.
#[derive(Default)]
pub struct ScriptedGeneration {
    scripts: Mutex<VecDeque<Script>>,
    opened: AtomicUsize,
}

impl ScriptedGeneration {
    /// Queues a stream for the next `open_stream` call and returns its feeder.
    pub fn next_stream(&self) -> ChunkSender {
        let (tx, rx) = mpsc::unbounded_channel();
        self.scripts.lock().unwrap().push_back(Script::Stream(rx));
        tx
    }

    pub fn next_open_fails(&self, error: RemoteError) {
        self.scripts
            .lock()
            .unwrap()
            .push_back(Script::OpenError(error));
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl GenerationBackend for ScriptedGeneration {
    async fn open_stream(&self, _request: &GenerationRequest) -> Result<TextStream, RemoteError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        match self.scripts.lock().unwrap().pop_front() {
            Some(Script::Stream(rx)) => Ok(UnboundedReceiverStream::new(rx).boxed()),
            Some(Script::OpenError(e)) => Err(e),
            None => Err(RemoteError::Rejected("no scripted stream".to_string())),
        }
    }
}

/// Upload backend that counts calls and replays queued outcomes (default: success).
/// A gated uploader holds every call until `release` is called.
#[derive(Default)]
pub struct CountingUploader {
    outcomes: Mutex<VecDeque<Result<(), String>>>,
    uploads: Mutex<Vec<CoverLetterUpload>>,
    gate: Option<Semaphore>,
}

impl CountingUploader {
    pub fn gated() -> Self {
        Self {
            gate: Some(Semaphore::new(0)),
            ..Self::default()
        }
    }

    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    pub fn fail_next(&self, message: &str) {
        self.outcomes
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn calls(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn last(&self) -> Option<CoverLetterUpload> {
        self.uploads.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl UploadBackend for CountingUploader {
    async fn upload_cover_letter(&self, upload: CoverLetterUpload) -> Result<(), RemoteError> {
        self.uploads.lock().unwrap().push(upload);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        match self.outcomes.lock().unwrap().pop_front() {
            Some(Err(message)) => Err(RemoteError::Rejected(message)),
            _ => Ok(()),
        }
    }
}

/// Session lookup returning a fixed user, or an error when built with `failing()`.
pub struct StaticSession {
    user_id: Option<String>,
    fail: bool,
}

impl StaticSession {
    pub fn user(id: &str) -> Self {
        Self {
            user_id: Some(id.to_string()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            user_id: None,
            fail: true,
        }
    }
}

#[async_trait]
impl SessionLookup for StaticSession {
    async fn current_user_id(&self) -> Result<Option<String>, RemoteError> {
        if self.fail {
            return Err(RemoteError::Api {
                status: 503,
                message: "session store down".to_string(),
            });
        }
        Ok(self.user_id.clone())
    }
}

/// Pinning backend that echoes a deterministic CID, or fails on demand.
#[derive(Default)]
pub struct FakePinner {
    fail: bool,
    pinned: Mutex<Vec<PinFile>>,
}

impl FakePinner {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn pinned(&self) -> Vec<PinFile> {
        self.pinned.lock().unwrap().clone()
    }
}

#[async_trait]
impl PinBackend for FakePinner {
    async fn pin_file(&self, file: PinFile) -> Result<PinnedFile, RemoteError> {
        if self.fail {
            return Err(RemoteError::Api {
                status: 500,
                message: "pinning unavailable".to_string(),
            });
        }
        let cid = format!("bafy{}", file.bytes.len());
        self.pinned.lock().unwrap().push(file);
        Ok(PinnedFile {
            url: format!("https://gateway.example/ipfs/{cid}"),
            cid,
        })
    }
}
