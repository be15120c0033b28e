use std::sync::Arc;

use crate::generation::GenerationService;

#[derive(Clone)]
pub struct ServerState {
    pub(crate) generation: Arc<dyn GenerationService>,
}

impl ServerState {
    pub fn new(generation: Arc<dyn GenerationService>) -> Self {
        Self { generation }
    }
}
