//! Pipeline-level scenarios across build, persistence and serving.

pub(crate) mod support;
