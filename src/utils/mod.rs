//! Utility modules shared by the build and serve pipelines.

pub mod mime;
pub mod path;
