//! # Chutes Engine
//!
//! Invoke heterogeneous chutes through one uniform interface.
//!
//! A chute advertises (or fails to advertise) its request schema at
//! `/openapi.json`. The engine classifies that schema into operation
//! families, translates a flat [`SemanticFieldBag`](chutes_core::SemanticFieldBag)
//! into the exact body the chute expects, and sends it with rate-limit aware
//! retries.
//!
//! ## Pipeline
//!
//! 1. [`discover_chute_capabilities`] fetches and classifies the schema,
//!    falling back to optimistic defaults when it is unavailable
//! 2. [`build_request_body`] produces a [`RequestPlan`], or `None` when the
//!    chute cannot perform the operation
//! 3. [`chutes_transport::ResilientTransport`] sends the plan
//!
//! [`ChuteClient`] wires the three together.

mod adapter;
mod capabilities;
mod classifier;
mod client;
mod models;

pub use adapter::{
    ImageConvention, RequestPlan, build_request_body, image_convention, split_resolution,
    strip_data_uri,
};
pub use capabilities::{
    CANONICAL_ENDPOINTS, CapabilitySource, ChuteCapabilities, FamilyResolution,
};
pub use classifier::{
    IMAGE_FIELDS, VIDEO_HINT_FIELDS, classify, discover_chute_capabilities, matches_signature,
    path_matches_alias,
};
pub use client::ChuteClient;
pub use models::{ModelProfile, round_frames};
