//! M3U playlist persistence
//!
//! Uses relative paths (just filenames) so playlist directories stay
//! self-contained and portable.

/// Generate M3U file content from a list of track filenames
pub fn generate_m3u(tracks: &[String]) -> String {
    let mut content = String::from("#EXTM3U\n");
    for track in tracks {
        content.push_str(track);
        content.push('\n');
    }
    content
}

/// Parse M3U content back into a list of track filenames, skipping
/// directives and blank lines
pub fn parse_m3u(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_m3u_empty() {
        let result = generate_m3u(&[]);
        assert_eq!(result, "#EXTM3U\n");
    }

    #[test]
    fn test_generate_m3u_tracks() {
        let tracks = vec!["aaa.m4a".to_string(), "bbb.m4a".to_string()];
        let result = generate_m3u(&tracks);
        assert_eq!(result, "#EXTM3U\naaa.m4a\nbbb.m4a\n");
    }

    #[test]
    fn test_parse_roundtrip() {
        let tracks = vec!["aaa.m4a".to_string(), "bbb.m4a".to_string()];
        assert_eq!(parse_m3u(&generate_m3u(&tracks)), tracks);
    }

    #[test]
    fn test_parse_skips_directives_and_blanks() {
        let content = "#EXTM3U\n\n#EXTINF:123,Song\naaa.m4a\n";
        assert_eq!(parse_m3u(content), vec!["aaa.m4a"]);
    }
}
