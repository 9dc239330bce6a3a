//! Status icons for CLI output

/// Status icons for different states
pub struct StatusIcon;

impl StatusIcon {
    /// Finished / reachable
    pub const CHECK: &'static str = "✓";

    /// Stack exists but is not serving
    pub const WARNING: &'static str = "⚠";

    /// Stack torn down
    pub const ERROR: &'static str = "✗";

    /// Work in flight
    pub const PENDING: &'static str = "⏳";

    /// Dot spinner frames
    pub const SPINNER: &'static [&'static str] =
        &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "];

    /// Get status icon from a stack's endpoint and last operation
    pub fn get_stack_icon(has_url: bool, last_operation: Option<&str>) -> &'static str {
        match Self::get_status_text(has_url, last_operation) {
            "Running" => Self::CHECK,
            "Destroyed" => Self::ERROR,
            _ => Self::WARNING,
        }
    }

    /// Get status text from a stack's endpoint and last operation
    pub fn get_status_text(has_url: bool, last_operation: Option<&str>) -> &'static str {
        match last_operation {
            Some("destroy") => "Destroyed",
            _ if has_url => "Running",
            _ => "Pending",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_stack_icon() {
        assert_eq!(StatusIcon::get_stack_icon(true, Some("update")), StatusIcon::CHECK);
        assert_eq!(StatusIcon::get_stack_icon(false, Some("destroy")), StatusIcon::ERROR);
        assert_eq!(StatusIcon::get_stack_icon(false, Some("create")), StatusIcon::WARNING);
    }

    #[test]
    fn test_get_status_text() {
        assert_eq!(StatusIcon::get_status_text(true, Some("refresh")), "Running");
        assert_eq!(StatusIcon::get_status_text(true, Some("destroy")), "Destroyed");
        assert_eq!(StatusIcon::get_status_text(false, None), "Pending");
    }

    #[test]
    fn test_spinner_frames_share_width() {
        let widths: Vec<usize> = StatusIcon::SPINNER.iter().map(|f| f.chars().count()).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
    }
}
