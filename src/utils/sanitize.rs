//! Filename sanitization utilities

/// Sanitize a playlist or directory name for safe filesystem usage
///
/// Replaces filesystem-unsafe characters with visually similar Unicode
/// alternatives that are safe across all major operating systems.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' => '⧸',  // U+29F8 - Big Solidus
            '\\' => '⧹', // U+29F9 - Big Reverse Solidus
            ':' => '꞉',  // U+A789 - Modifier Letter Colon
            '*' => '⁎',  // U+204E - Low Asterisk
            '?' => '？', // U+FF1F - Fullwidth Question Mark
            '"' => '″',  // U+2033 - Double Prime
            '<' => '‹',  // U+2039 - Single Left Angle Quote
            '>' => '›',  // U+203A - Single Right Angle Quote
            '|' => '｜', // U+FF5C - Fullwidth Vertical Line
            '\0' => '_', // Null byte has no good lookalike
            _ => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_slashes_and_colon() {
        assert_eq!(sanitize_filename("Drive / Night"), "Drive ⧸ Night");
        assert_eq!(sanitize_filename("Mix: Vol 2"), "Mix꞉ Vol 2");
    }

    #[test]
    fn test_no_changes_needed() {
        assert_eq!(
            sanitize_filename("Normal Playlist Name"),
            "Normal Playlist Name"
        );
    }

    #[test]
    fn test_trim_whitespace() {
        assert_eq!(sanitize_filename("  Mix  "), "Mix");
    }
}
