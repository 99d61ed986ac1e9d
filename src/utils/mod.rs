//! Shared helpers: atomic file writes and shutdown state.

pub mod fs;
pub mod shutdown;
