//! Shared utilities for the Agora chat workspace.

pub mod logger;
pub mod time;
