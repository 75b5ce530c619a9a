/// Default output truncation limit (10 KB).
pub const MAX_OUTPUT_SIZE: usize = 10 * 1024;

/// Truncate `text` to at most `max_bytes` of UTF-8, appending a marker.
///
/// Truncation happens at a byte boundary, backed off to the nearest char
/// boundary so the kept prefix never exceeds `max_bytes` and never splits a
/// multi-byte character. Returns the (possibly truncated) text and the
/// original byte size, which is `None` when nothing was cut. That flag, not
/// a length comparison, is the downstream truncation signal.
pub fn truncate_output(text: &str, max_bytes: usize) -> (String, Option<usize>) {
    if text.is_empty() {
        return (String::new(), None);
    }
    let original_size = text.len();
    if original_size <= max_bytes {
        return (text.to_string(), None);
    }

    let mut end = max_bytes;
    while end > 0 && !text.is_char_boundary(end) {
        end -= 1;
    }
    let marker = format!(
        "\n[TRUNCATED - original size: {:.1} KB]",
        original_size as f64 / 1024.0
    );
    (format!("{}{marker}", &text[..end]), Some(original_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_untouched() {
        let (text, size) = truncate_output("hello", 100);
        assert_eq!(text, "hello");
        assert!(size.is_none());
    }

    #[test]
    fn empty_text_untouched() {
        let (text, size) = truncate_output("", 10);
        assert_eq!(text, "");
        assert!(size.is_none());
    }

    #[test]
    fn exact_limit_is_not_truncated() {
        let input = "a".repeat(64);
        let (text, size) = truncate_output(&input, 64);
        assert_eq!(text, input);
        assert!(size.is_none());
    }

    #[test]
    fn long_text_truncated_with_marker() {
        let input = "x".repeat(2048);
        let (text, size) = truncate_output(&input, 1024);
        assert_eq!(size, Some(2048));
        assert!(text.starts_with(&"x".repeat(1024)));
        assert!(text.contains("[TRUNCATED - original size: 2.0 KB]"));
    }

    #[test]
    fn multibyte_boundary_never_splits_chars() {
        // 'é' is 2 bytes; an odd limit lands mid-character
        let input = "é".repeat(100);
        let (text, size) = truncate_output(&input, 33);
        assert_eq!(size, Some(200));
        let kept = text.split('\n').next().unwrap();
        assert!(kept.len() <= 33);
        assert_eq!(kept, "é".repeat(16));
    }

    #[test]
    fn four_byte_chars_survive_truncation() {
        let input = "𝄞".repeat(50); // 4 bytes each
        let (text, size) = truncate_output(&input, 10);
        assert_eq!(size, Some(200));
        let kept = text.split('\n').next().unwrap();
        assert_eq!(kept, "𝄞".repeat(2));
        assert!(kept.len() <= 10);
    }

    #[test]
    fn marker_reports_fractional_kb() {
        let input = "y".repeat(1536);
        let (text, size) = truncate_output(&input, 512);
        assert_eq!(size, Some(1536));
        assert!(text.ends_with("[TRUNCATED - original size: 1.5 KB]"));
    }
}
