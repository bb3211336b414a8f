//! Task identifier generation.

/// Generate a fresh task identifier (UUID v4, hyphenated).
#[must_use]
pub fn generate_task_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
