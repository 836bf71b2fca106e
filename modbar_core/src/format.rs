//! Text helpers shared by modules

use humansize::{BINARY, format_size};
use std::time::Duration;

const ELLIPSIS: char = '⋯';

/// Shorten `text` to at most `limit` characters, marking the cut with an
/// ellipsis. A negative limit keeps the end of the text instead of the start.
pub fn truncate(text: &str, limit: isize) -> String {
    let keep_end = limit < 0;
    let limit = limit.unsigned_abs();
    let len = text.chars().count();
    if len <= limit {
        return text.to_string();
    }
    if limit == 0 {
        return String::new();
    }
    if keep_end {
        let tail: String = text.chars().skip(len - limit + 1).collect();
        format!("{}{}", ELLIPSIS, tail)
    } else {
        let mut head: String = text.chars().take(limit - 1).collect();
        head.push(ELLIPSIS);
        head
    }
}

/// Split a duration into whole hours, minutes and seconds.
pub fn hms(d: Duration) -> (u64, u64, u64) {
    let secs = d.as_secs();
    (secs / 3600, secs / 60 % 60, secs % 60)
}

/// `m:ss`, or `h:mm:ss` once the duration reaches an hour.
pub fn format_media_time(d: Duration) -> String {
    match hms(d) {
        (0, m, s) => format!("{}:{:02}", m, s),
        (h, m, s) => format!("{}:{:02}:{:02}", h, m, s),
    }
}

/// `h:mm` under a day, `NdHHh` from then on.
pub fn format_uptime(d: Duration) -> String {
    let (h, m, _) = hms(d);
    if h < 24 {
        format!("{}:{:02}", h, m)
    } else {
        format!("{}d{:02}h", h / 24, h % 24)
    }
}

/// Byte count with binary units, e.g. `3.50 GiB`.
pub fn ibytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncate_keeps_short_text() {
        assert_eq!(truncate("abc", 3), "abc");
        assert_eq!(truncate("abc", -5), "abc");
        assert_eq!(truncate("", 0), "");
    }

    #[test]
    fn truncate_from_either_end() {
        assert_eq!(truncate("abcdef", 4), "abc⋯");
        assert_eq!(truncate("abcdef", -4), "⋯def");
        assert_eq!(truncate("abcdef", 1), "⋯");
        assert_eq!(truncate("abcdef", 0), "");
    }

    #[test]
    fn truncate_counts_characters() {
        assert_eq!(truncate("日本語テキスト", 3), "日本⋯");
        assert_eq!(truncate("日本語テキスト", -3), "⋯スト");
    }

    #[test]
    fn media_time() {
        assert_eq!(format_media_time(Duration::from_secs(65)), "1:05");
        assert_eq!(format_media_time(Duration::from_secs(3725)), "1:02:05");
        assert_eq!(format_media_time(Duration::ZERO), "0:00");
    }

    #[test]
    fn uptime() {
        assert_eq!(format_uptime(Duration::from_secs(3 * 3600 + 7 * 60)), "3:07");
        assert_eq!(format_uptime(Duration::from_secs(50 * 3600)), "2d02h");
    }

    #[test]
    fn binary_sizes() {
        assert_eq!(ibytes(0), "0 B");
        assert_eq!(ibytes(1024), "1 KiB");
    }
}
