//! Format-independent pipeline stages.
//!
//! ```text
//! input ──▶ (backend) ──▶ postprocess
//! (URL/path)              (cleanup)
//! ```
//!
//! 1. [`input`]: load the user-supplied path or URL into memory
//! 2. [`postprocess`]: deterministic cleanup of the rendered Markdown
//!
//! The format-specific step in between lives in [`crate::backend`].

pub mod input;
pub mod postprocess;
