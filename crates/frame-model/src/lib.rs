//! Snaplapse Frame Model
//!
//! Data contracts between the (external) snapshot catalogue and the render
//! engine. The catalogue resolves a query into an ordered list of
//! [`FrameDescriptor`]s; the engine turns them into a [`VideoArtifact`].
//! Nothing in this crate has behavior beyond construction and
//! serialization.

pub mod artifact;
pub mod descriptor;

pub use artifact::{ArtifactRecord, CodecChoice, VideoArtifact};
pub use descriptor::FrameDescriptor;
