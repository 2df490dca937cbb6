//! Property-based tests for prompt matching and sanitizing

use np_ios_tools::{PromptMatcher, RegexPromptMatcher, Sanitizer};
use proptest::prelude::*;

fn output_lines() -> impl Strategy<Value = String> {
    prop::collection::vec("[ -~]{0,40}", 0..6).prop_map(|lines| lines.join("\r\n"))
}

/// Output that may or may not end in a line break, so the prompt can sit
/// anywhere on the last line.
fn any_prefix() -> impl Strategy<Value = String> {
    (output_lines(), "[ -~\t]{0,30}").prop_map(|(lines, tail)| format!("{lines}{tail}"))
}

proptest! {
    #[test]
    fn test_privileged_prompt_finishes(
        output in any_prefix(),
        host in "[A-Za-z][A-Za-z0-9_-]{0,20}",
    ) {
        let buffer = format!("{output}{host}#");
        prop_assert!(RegexPromptMatcher::new().looks_finished(&buffer));
    }

    #[test]
    fn test_config_prompt_finishes(
        output in any_prefix(),
        host in "[A-Za-z][A-Za-z0-9-]{0,20}",
        mode in "config(-[a-z]{1,8})?",
    ) {
        let buffer = format!("{output}{host}({mode})#");
        prop_assert!(RegexPromptMatcher::new().looks_finished(&buffer));
    }

    #[test]
    fn test_user_prompt_finishes(
        output in any_prefix(),
        host in "[A-Za-z][A-Za-z0-9-]{0,20}",
    ) {
        let buffer = format!("{output}{host}>");
        prop_assert!(RegexPromptMatcher::new().looks_finished(&buffer));
    }

    #[test]
    fn test_no_prompt_char_never_finishes(buffer in "[^#>]{0,200}") {
        prop_assert!(!RegexPromptMatcher::new().looks_finished(&buffer));
    }

    #[test]
    fn test_output_after_prompt_not_finished(
        host in "[A-Za-z][A-Za-z0-9-]{0,20}",
        tail in "[A-Za-z0-9 ]{0,30}[A-Za-z0-9]",
    ) {
        let buffer = format!("{host}#\r\n{tail}");
        prop_assert!(!RegexPromptMatcher::new().looks_finished(&buffer));
    }

    #[test]
    fn test_matcher_doesnt_panic(s in "\\PC*") {
        let matcher = RegexPromptMatcher::new();
        let _ = matcher.looks_finished(&s);
        let _ = matcher.has_more_marker(&s);
    }

    #[test]
    fn test_garbled_bytes_never_panic(bytes in prop::collection::vec(any::<u8>(), 0..256)) {
        let text = String::from_utf8_lossy(&bytes);
        let _ = RegexPromptMatcher::new().looks_finished(&text);
    }

    #[test]
    fn test_sanitize_preserves_order(
        lines in prop::collection::vec("[ ]{0,3}[a-z][a-z0-9 /.]{0,20}", 0..12),
    ) {
        let raw = lines.join("\n");
        let batch = Sanitizer::default().sanitize(&raw);
        let expected: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
        let sent: Vec<&str> = batch.executable().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(sent, expected);
    }

    #[test]
    fn test_sanitize_excludes_inline_sentinel_lines(
        lines in prop::collection::vec(("[a-z][a-z0-9 ]{0,15}", any::<bool>()), 0..12),
    ) {
        let raw = lines
            .iter()
            .map(|(text, marked)| if *marked { format!("#DANGER {text}") } else { text.clone() })
            .collect::<Vec<_>>()
            .join("\n");
        let batch = Sanitizer::default().sanitize(&raw);

        let expected: Vec<&str> = lines
            .iter()
            .filter(|(_, marked)| !marked)
            .map(|(text, _)| text.trim())
            .collect();
        let sent: Vec<&str> = batch.executable().map(|c| c.text.as_str()).collect();
        prop_assert_eq!(sent, expected);
    }
}
