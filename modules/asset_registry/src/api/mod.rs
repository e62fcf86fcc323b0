//! API layer - in-process entry points

pub mod native;
