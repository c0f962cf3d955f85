/*!
 * Progress sessions for in-flight translations.
 *
 * This module provides:
 * - The phase state machine of a translation job
 * - A registry keyed by session id with TTL cleanup
 * - Single-writer progress updates and snapshot polling or subscription
 */

pub mod manager;
pub mod models;

// Re-export main types
pub use manager::{SessionRegistry, SessionWriter};
pub use models::{CANCELLED_MESSAGE, Phase, ProgressSnapshot};
