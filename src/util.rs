use std::path::{Component, Path};
use std::sync::OnceLock;

use regex::Regex;

/// Replaces path separators and NUL bytes so `s` can be used as a single path segment.
pub fn sanitize_path_segment(s: &str) -> String {
    s.chars()
        .map(|c| if c == '/' || c == '\0' { '_' } else { c })
        .collect()
}

fn id_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?:v=|/)([0-9A-Za-z_-]{11})").expect("valid id regex"))
}

fn video_url_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:https?://)?(?:www\.)?(?:youtube\.com/(?:watch\?v=|embed/|v/|shorts/)|youtu\.be/)([a-zA-Z0-9_-]{11})(?:\S+)?$",
        )
        .expect("valid video url regex")
    })
}

/// Pulls the first 11-character video id out of a watch/short link.
pub fn video_id_from_url(url: &str) -> Option<String> {
    id_pattern()
        .captures(url)
        .and_then(|c| c.get(1))
        .map(|m| sanitize_path_segment(m.as_str()))
}

/// Whether `url` has the shape the browser front end accepts.
pub fn is_recognized_video_url(url: &str) -> bool {
    video_url_pattern().is_match(url.trim())
}

/// True when `name` names an entry directly inside a directory: no separators,
/// no `.`/`..`, no NUL.
pub fn is_plain_filename(name: &str) -> bool {
    if name.is_empty() || name.contains('\0') {
        return false;
    }
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) => c == name,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizer_removes_separators_and_nul() {
        for input in ["a/b", "a\0b", "../../etc/passwd", "/\0/\0", "plain title"] {
            let out = sanitize_path_segment(input);
            assert!(!out.contains('/'), "{out:?}");
            assert!(!out.contains('\0'), "{out:?}");
            assert_eq!(sanitize_path_segment(&out), out);
        }
        assert_eq!(sanitize_path_segment("AC/DC\0live"), "AC_DC_live");
    }

    #[test]
    fn sanitizer_keeps_other_text() {
        assert_eq!(sanitize_path_segment("Ünïcode: \"title\" | x"), "Ünïcode: \"title\" | x");
    }

    #[test]
    fn extracts_ids_from_common_links() {
        assert_eq!(
            video_id_from_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=42"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            video_id_from_url("https://youtu.be/dQw4w9WgXcQ"),
            Some("dQw4w9WgXcQ".to_string())
        );
        assert_eq!(
            video_id_from_url("https://www.youtube.com/shorts/abcDEF_123-"),
            Some("abcDEF_123-".to_string())
        );
        assert_eq!(video_id_from_url("not a link"), None);
    }

    #[test]
    fn recognizes_front_end_link_shapes() {
        assert!(is_recognized_video_url("https://youtu.be/dQw4w9WgXcQ"));
        assert!(is_recognized_video_url("youtube.com/embed/dQw4w9WgXcQ"));
        assert!(is_recognized_video_url("https://www.youtube.com/watch?v=dQw4w9WgXcQ&list=x"));
        assert!(!is_recognized_video_url("https://vimeo.com/123456"));
        assert!(!is_recognized_video_url("https://youtu.be/short"));
    }

    #[test]
    fn plain_filename_rejects_paths() {
        assert!(is_plain_filename("song_abc_123.mp3"));
        assert!(is_plain_filename("..hidden.mp3"));
        assert!(!is_plain_filename("../secret"));
        assert!(!is_plain_filename("a/b"));
        assert!(!is_plain_filename("/etc/passwd"));
        assert!(!is_plain_filename(".."));
        assert!(!is_plain_filename("."));
        assert!(!is_plain_filename(""));
        assert!(!is_plain_filename("a\0b"));
        assert!(!is_plain_filename("dir/"));
    }
}
