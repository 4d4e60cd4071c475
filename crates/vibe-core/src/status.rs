//! Progress reporting
//!
//! Human-readable status lines emitted at stage transitions. Advisory
//! only: nothing reads them back.

use parking_lot::Mutex;

/// Status while planning
pub const STATUS_PLANNING: &str = "Planning Agent: Analyzing request...";
/// Status while coding
pub const STATUS_CODING: &str = "Design & Code Agents: Writing HTML & CSS...";
/// Status while scanning for placeholders
pub const STATUS_SCANNING_IMAGES: &str = "Image Agent: Scanning for images...";
/// Status after the last stage
pub const STATUS_FINALIZING: &str = "Finalizing...";

/// Status while synthesizing `count` images
#[must_use]
pub fn status_generating_images(count: usize) -> String {
    let noun = if count == 1 { "image" } else { "images" };
    format!("Image Agent: Generating {count} custom {noun}...")
}

/// Receives status lines
pub trait StatusSink: Send + Sync {
    /// Report a status line
    fn report(&self, status: &str);
}

/// Discards status lines
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStatus;

impl StatusSink for NoStatus {
    fn report(&self, _status: &str) {}
}

/// Keeps every status line
#[derive(Debug, Default)]
pub struct StatusLog {
    lines: Mutex<Vec<String>>,
}

impl StatusLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines reported so far
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

impl StatusSink for StatusLog {
    fn report(&self, status: &str) {
        self.lines.lock().push(status.to_string());
    }
}

impl<F> StatusSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn report(&self, status: &str) {
        self(status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_status_counts() {
        assert_eq!(status_generating_images(1), "Image Agent: Generating 1 custom image...");
        assert_eq!(status_generating_images(3), "Image Agent: Generating 3 custom images...");
    }

    #[test]
    fn log_keeps_order() {
        let log = StatusLog::new();
        log.report("a");
        log.report("b");
        assert_eq!(log.lines(), vec!["a", "b"]);
    }
}
