use crate::status::StatusService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<StatusService>,
}
