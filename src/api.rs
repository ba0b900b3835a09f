//! HTTP surface for the voice platform

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::*;

use crate::skill::Skill;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub skill: Arc<Skill>,
}

impl AppState {
    pub fn new(skill: Skill) -> Self {
        Self {
            skill: Arc::new(skill),
        }
    }
}
