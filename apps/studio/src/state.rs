use std::sync::Arc;

use tokio::sync::RwLock;

use crate::form::models::ModelParams;
use crate::form::state::FormState;
use crate::generation::consumer::StreamingConsumer;
use crate::notifications::Notifier;
use crate::pinning::PinService;
use crate::save::controller::SaveController;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub form: Arc<RwLock<FormState>>,
    /// Dials sent with the next generation; defaults until the user changes them.
    pub model_params: Arc<RwLock<ModelParams>>,
    pub consumer: Arc<StreamingConsumer>,
    pub saver: Arc<SaveController>,
    pub pins: Arc<PinService>,
    pub notifier: Notifier,
}
