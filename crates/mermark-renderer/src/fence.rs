//! Code fence tracking for document segmentation.
//!
//! Tracks whether we're inside a fenced code block so that fence-looking lines
//! inside an ordinary code block are not mistaken for diagram fences.

/// A line that opens or closes a fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceLine<'a> {
    /// Opening fence with its info string (trimmed, possibly empty).
    Open { info: &'a str },
    /// Closing fence.
    Close,
}

/// Tracks code fence state during line-by-line processing.
///
/// Code fences in `CommonMark` can use backticks or tildes (three or more).
/// The closing fence must use the same character and be at least as long
/// as the opening fence.
#[derive(Debug, Default)]
pub(crate) struct FenceTracker {
    /// Character used for the current fence (backtick or tilde).
    fence_char: Option<char>,
    /// Length of the opening fence (minimum length for closing).
    fence_len: usize,
}

impl FenceTracker {
    /// Check if currently inside a fenced code block.
    #[cfg(test)]
    pub(crate) fn in_fence(&self) -> bool {
        self.fence_char.is_some()
    }

    /// Update fence state based on a line (without its line terminator).
    ///
    /// Returns the fence line kind if the line opens or closes a fence.
    pub(crate) fn update<'a>(&mut self, line: &'a str) -> Option<FenceLine<'a>> {
        let trimmed = line.trim_start();

        if let Some(fence_char) = self.fence_char {
            if is_fence_line(trimmed, fence_char, self.fence_len) {
                self.fence_char = None;
                self.fence_len = 0;
                return Some(FenceLine::Close);
            }
            None
        } else {
            let (ch, len) = detect_fence(trimmed)?;
            self.fence_char = Some(ch);
            self.fence_len = len;
            Some(FenceLine::Open {
                info: trimmed[len..].trim(),
            })
        }
    }
}

/// Detect if a line starts a code fence.
///
/// Returns the fence character and length (in bytes, fence chars are ASCII).
fn detect_fence(trimmed: &str) -> Option<(char, usize)> {
    let first = trimmed.chars().next()?;
    if first != '`' && first != '~' {
        return None;
    }

    let count = trimmed.chars().take_while(|&c| c == first).count();
    if count >= 3 { Some((first, count)) } else { None }
}

/// Check if a line is a valid closing fence.
///
/// The closing fence must:
/// - Use the same character as opening
/// - Be at least as long as opening
/// - Contain only fence characters (optionally followed by whitespace)
fn is_fence_line(trimmed: &str, expected_char: char, min_len: usize) -> bool {
    if !trimmed.starts_with(expected_char) {
        return false;
    }

    let count = trimmed.chars().take_while(|&c| c == expected_char).count();
    if count < min_len {
        return false;
    }

    trimmed[count..].chars().all(char::is_whitespace)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_fence_initially() {
        let tracker = FenceTracker::default();
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_backtick_fence_with_info() {
        let mut tracker = FenceTracker::default();

        assert_eq!(
            tracker.update("```mermaid"),
            Some(FenceLine::Open { info: "mermaid" })
        );
        assert!(tracker.in_fence());
        assert_eq!(tracker.update("graph TD"), None);
        assert_eq!(tracker.update("```"), Some(FenceLine::Close));
        assert!(!tracker.in_fence());
    }

    #[test]
    fn test_tilde_fence() {
        let mut tracker = FenceTracker::default();

        assert_eq!(
            tracker.update("~~~ python "),
            Some(FenceLine::Open { info: "python" })
        );
        assert_eq!(tracker.update("~~~"), Some(FenceLine::Close));
    }

    #[test]
    fn test_shorter_fence_not_closing() {
        let mut tracker = FenceTracker::default();

        assert!(tracker.update("````").is_some());
        assert_eq!(tracker.update("```"), None);
        assert!(tracker.in_fence());
        assert_eq!(tracker.update("`````"), Some(FenceLine::Close));
    }

    #[test]
    fn test_mixed_fence_chars() {
        let mut tracker = FenceTracker::default();

        assert!(tracker.update("```").is_some());
        assert_eq!(tracker.update("~~~"), None);
        assert_eq!(tracker.update("```"), Some(FenceLine::Close));
    }

    #[test]
    fn test_closing_fence_with_text_is_content() {
        let mut tracker = FenceTracker::default();

        assert!(tracker.update("```").is_some());
        assert_eq!(tracker.update("``` not a close"), None);
        assert!(tracker.in_fence());
    }

    #[test]
    fn test_indented_fence_and_carriage_return() {
        let mut tracker = FenceTracker::default();

        assert_eq!(
            tracker.update("  ```diagram\r"),
            Some(FenceLine::Open { info: "diagram" })
        );
        assert_eq!(tracker.update("   ```\r"), Some(FenceLine::Close));
    }

    #[test]
    fn test_two_backticks_not_fence() {
        let mut tracker = FenceTracker::default();

        assert_eq!(tracker.update("``inline code``"), None);
        assert!(!tracker.in_fence());
    }
}
