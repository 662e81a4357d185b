//! Shared handler state. Everything is `Arc`-wrapped so the router clone
//! per request stays cheap.

use crate::queue::JobQueue;
use crate::store::TaskStore;
use crate::tracker::PipelineTracker;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<JobQueue>,
    pub tasks: Arc<TaskStore>,
    pub tracker: Arc<PipelineTracker>,
}
