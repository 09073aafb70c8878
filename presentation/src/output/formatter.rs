//! Output formatter trait

use roundtable_domain::Session;

/// Trait for rendering a stored session
pub trait OutputFormatter {
    /// Format the session for display
    fn format(&self, session: &Session) -> String;

    /// Format as JSON (the persisted representation)
    fn format_json(&self, session: &Session) -> String {
        serde_json::to_string_pretty(session).unwrap_or_else(|_| "{}".to_string())
    }
}
