use axum::extract::FromRef;
use std::sync::Arc;
use std::time::Instant;

use crate::coordinator::Coordinator;
use crate::dls::DlsEngine;
use crate::slideshow::SlideshowEngine;
use crate::validator::ContentValidator;

#[derive(Clone)]
pub struct ServerState {
    pub start_time: Instant,
    pub coordinator: Arc<Coordinator>,
    pub slideshow: Arc<SlideshowEngine>,
    pub dls: Arc<DlsEngine>,
    pub validator: Arc<ContentValidator>,
}

impl FromRef<ServerState> for Arc<Coordinator> {
    fn from_ref(input: &ServerState) -> Self {
        input.coordinator.clone()
    }
}

impl FromRef<ServerState> for Arc<SlideshowEngine> {
    fn from_ref(input: &ServerState) -> Self {
        input.slideshow.clone()
    }
}

impl FromRef<ServerState> for Arc<DlsEngine> {
    fn from_ref(input: &ServerState) -> Self {
        input.dls.clone()
    }
}

impl FromRef<ServerState> for Arc<ContentValidator> {
    fn from_ref(input: &ServerState) -> Self {
        input.validator.clone()
    }
}
