//! Small shared helpers: the injectable clock and atomic file writes.

pub mod clock;
pub mod fs;
