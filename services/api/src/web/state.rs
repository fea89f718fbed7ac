//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::web::auth::AccessGate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tax_blog_core::{AuthorProfile, ContentPipeline, GenerationState, HistoryRepository};

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub pipeline: ContentPipeline,
    pub gate: AccessGate,
    pub author: AuthorProfile,
    /// What the client sees: progress of the current run, or the last result.
    generation: Arc<RwLock<GenerationState>>,
    /// Set while a run is in flight; a second submission is refused.
    processing: AtomicBool,
}

impl AppState {
    pub fn new(pipeline: ContentPipeline, gate: AccessGate) -> Self {
        Self {
            pipeline,
            gate,
            author: AuthorProfile::house_author(),
            generation: Arc::new(RwLock::new(GenerationState::default())),
            processing: AtomicBool::new(false),
        }
    }

    pub fn history(&self) -> &Arc<dyn HistoryRepository> {
        self.pipeline.history()
    }

    pub fn current_generation(&self) -> GenerationState {
        self.generation
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn update_generation(&self, update: impl FnOnce(&mut GenerationState)) {
        let mut state = self
            .generation
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        update(&mut state);
    }

    /// Claims the processing flag, or `None` if a run is already in flight.
    /// The guard owns a handle to the state so it can move into a spawned run.
    pub fn begin_processing(self: &Arc<Self>) -> Option<ProcessingGuard> {
        self.processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ProcessingGuard {
                state: Arc::clone(self),
            })
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }
}

/// Releases the processing flag when dropped.
pub struct ProcessingGuard {
    state: Arc<AppState>,
}

impl ProcessingGuard {
    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }
}

impl Drop for ProcessingGuard {
    fn drop(&mut self) {
        self.state.processing.store(false, Ordering::Release);
    }
}
