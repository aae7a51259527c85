/// Truncate a string to at most `max` characters (not bytes, so multi-byte
/// text never splits mid-character).
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    s.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_strings_pass_through() {
        assert_eq!(truncate_chars("hello", 500), "hello");
    }

    #[test]
    fn long_strings_are_cut() {
        let long = "x".repeat(600);
        assert_eq!(truncate_chars(&long, 500).len(), 500);
    }

    #[test]
    fn multibyte_boundary_is_respected() {
        let s = "日本語テキスト";
        let cut = truncate_chars(s, 3);
        assert_eq!(cut, "日本語");
    }
}
