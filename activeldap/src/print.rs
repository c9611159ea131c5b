//! LDIF output -- attribute lines with base64 selection and line folding.

use crate::base64;

// ---------------------------------------------------------------------------
// String classification helpers
// ---------------------------------------------------------------------------

/// SAFE-CHAR from RFC 2849: any 7-bit value except NUL, LF and CR.
pub(crate) fn safe_char_p(c: u8) -> bool {
    c != 0 && c != b'\n' && c != b'\r' && c < 0x80
}

/// SAFE-INIT-CHAR: a SAFE-CHAR that is not space, colon or less-than.
pub(crate) fn safe_init_char_p(c: u8) -> bool {
    safe_char_p(c) && c != b' ' && c != b':' && c != b'<'
}

/// Check if the value can be printed as an LDIF SAFE-STRING.
pub fn safe_string_p(data: &[u8]) -> bool {
    match data.split_first() {
        None => true,
        Some((&first, rest)) => safe_init_char_p(first) && rest.iter().all(|&c| safe_char_p(c)),
    }
}

/// Does `value` have to be written with `::` and base64?
pub fn binary_value_p(value: &[u8]) -> bool {
    value.last() == Some(&b' ') || !safe_string_p(value)
}

// ---------------------------------------------------------------------------
// Attribute lines
// ---------------------------------------------------------------------------

/// Encode one `name: value` line (or `name:: base64`), folded so that no
/// output line is longer than `width` characters.  Continuation lines start
/// with a single space.  An empty value is written as `name:`.
pub fn encode_attribute(name: &str, value: &[u8], width: usize) -> String {
    let mut line = format!("{}:", name);
    if !value.is_empty() {
        if binary_value_p(value) {
            line.push_str(": ");
            base64::append_base64(&mut line, value);
        } else {
            line.push(' ');
            // safe strings are 7-bit, so this never replaces anything
            line.push_str(&String::from_utf8_lossy(value));
        }
    }
    fold_line(&line, width)
}

/// Fold one logical line.  The first physical line holds up to `width`
/// characters, each continuation a space plus up to `width - 1`.  The
/// result ends with a newline.
pub fn fold_line(line: &str, width: usize) -> String {
    let first = width.max(1);
    let chunk = width.saturating_sub(1).max(1);
    let mut result = String::with_capacity(line.len() + line.len() / chunk * 2 + 1);

    let mut start = 0;
    let mut budget = first;
    let mut count = 0;
    for (i, _) in line.char_indices().skip(1) {
        count += 1;
        if count == budget {
            if start > 0 {
                result.push(' ');
            }
            result.push_str(&line[start..i]);
            result.push('\n');
            start = i;
            budget = chunk;
            count = 0;
        }
    }
    if start > 0 {
        result.push(' ');
    }
    result.push_str(&line[start..]);
    result.push('\n');
    result
}

/// Encode a list of `(options, value)` pairs for one attribute name, each
/// option appended to the name as `;option`.
pub fn encode_values(name: &str, values: &[(Vec<String>, Vec<u8>)], width: usize) -> String {
    let mut out = String::new();
    for (options, value) in values {
        let mut full_name = name.to_string();
        for option in options {
            full_name.push(';');
            full_name.push_str(option);
        }
        out.push_str(&encode_attribute(&full_name, value, width));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base64::read_base64;
    use crate::config::DEFAULT_LINE_WIDTH;

    fn encode(name: &str, value: &[u8]) -> String {
        encode_attribute(name, value, DEFAULT_LINE_WIDTH)
    }

    // ── Group 1: classification ──────────────────────────────────────────

    #[test]
    fn safe_strings() {
        assert!(safe_string_p(b""));
        assert!(safe_string_p(b"hello world"));
        assert!(safe_string_p(b"a:b<c"));
    }

    #[test]
    fn unsafe_strings() {
        assert!(!safe_string_p(b" leading"));
        assert!(!safe_string_p(b":colon"));
        assert!(!safe_string_p(b"<less"));
        assert!(!safe_string_p(b"line\nbreak"));
        assert!(!safe_string_p(b"cr\r"));
        assert!(!safe_string_p(b"nul\0"));
        assert!(!safe_string_p("José".as_bytes()));
    }

    #[test]
    fn trailing_space_is_binary() {
        assert!(binary_value_p(b"trailing "));
        assert!(!binary_value_p(b"plain"));
    }

    // ── Group 2: encoding ────────────────────────────────────────────────

    #[test]
    fn empty_value() {
        assert_eq!(encode("description", b""), "description:\n");
    }

    #[test]
    fn plain_value() {
        assert_eq!(encode("cn", b"foo"), "cn: foo\n");
    }

    #[test]
    fn base64_value() {
        assert_eq!(encode("cn", "José".as_bytes()), "cn:: Sm9zw6k=\n");
    }

    #[test]
    fn whitespace_only_value_is_base64() {
        assert_eq!(encode("cn", b" "), "cn:: IA==\n");
    }

    // ── Group 3: folding ─────────────────────────────────────────────────

    #[test]
    fn fold_long_plain_value() {
        let value = "x".repeat(200);
        let out = encode("description", value.as_bytes());
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.len() > 1);
        assert_eq!(lines[0].len(), 75);
        assert!(lines[0].starts_with("description: "));
        for line in &lines[1..] {
            assert!(line.starts_with(' '));
            assert!(!line[1..].starts_with(' '));
            assert!(line.len() <= 75);
        }
        let unfolded: String = lines[0]["description: ".len()..].to_string()
            + &lines[1..].iter().map(|l| &l[1..]).collect::<String>();
        assert_eq!(unfolded, value);
    }

    #[test]
    fn fold_long_base64_value() {
        let value: Vec<u8> = (0..=255).collect();
        let out = encode("jpegPhoto", &value);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0].len(), 75);
        let unfolded: String = lines[0]["jpegPhoto:: ".len()..].to_string()
            + &lines[1..].iter().map(|l| &l[1..]).collect::<String>();
        assert_eq!(read_base64(&unfolded).unwrap(), value);
    }

    #[test]
    fn exact_fit_is_not_folded() {
        let value = "y".repeat(75 - "cn: ".len());
        assert_eq!(encode("cn", value.as_bytes()).lines().count(), 1);
    }

    fn unfold(out: &str) -> String {
        let mut lines = out.lines();
        let mut logical = lines.next().unwrap_or_default().to_string();
        for line in lines {
            logical.push_str(&line[1..]);
        }
        logical
    }

    #[test]
    fn fold_long_attribute_name() {
        let out = encode_attribute("aVeryLongAttributeNameHere", b"value", 20);
        assert!(out.lines().all(|line| line.len() <= 20), "{}", out);
        assert!(out.lines().skip(1).all(|line| line.starts_with(' ')));
        assert_eq!(unfold(&out), "aVeryLongAttributeNameHere: value");
    }

    #[test]
    fn fold_long_name_with_empty_value() {
        let out = encode_attribute("aVeryLongAttributeNameHere", b"", 10);
        assert_eq!(out, "aVeryLongA\n ttributeN\n ameHere:\n");
    }

    #[test]
    fn fold_line_counts_characters() {
        assert_eq!(fold_line("abcdef", 3), "abc\n de\n f\n");
        assert_eq!(fold_line("abc", 3), "abc\n");
        assert_eq!(fold_line("désolé", 4), "déso\n lé\n");
    }

    #[test]
    fn values_with_options() {
        let values = vec![
            (vec![], b"plain".to_vec()),
            (vec!["lang-en".to_string()], b"english".to_vec()),
        ];
        assert_eq!(
            encode_values("cn", &values, DEFAULT_LINE_WIDTH),
            "cn: plain\ncn;lang-en: english\n"
        );
    }
}
