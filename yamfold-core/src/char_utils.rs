#[inline]
#[must_use]
pub(crate) fn is_blank(c: u8) -> bool {
    c == b' ' || c == b'\t'
}

#[inline]
#[must_use]
pub(crate) fn is_break(c: u8) -> bool {
    c == b'\r' || c == b'\n'
}

#[inline]
#[must_use]
pub(crate) fn is_blank_or_break(c: u8) -> bool {
    is_blank(c) || is_break(c)
}

#[inline]
#[must_use]
pub(crate) fn is_yaml_non_space(c: u8) -> bool {
    !is_blank(c) && !is_break(c)
}

#[inline]
#[must_use]
pub(crate) fn is_flow(c: u8) -> bool {
    matches!(c, b',' | b'[' | b']' | b'{' | b'}')
}

/// Bytes of an anchor name. Non-ASCII bytes are accepted, so whole UTF-8 chars always pass.
#[inline]
#[must_use]
pub(crate) fn is_anchor_char(c: u8) -> bool {
    is_yaml_non_space(c) && !is_flow(c) && c != b'\0'
}

/// Characters that start a YAML construct when they begin a plain scalar.
#[inline]
#[must_use]
pub(crate) fn is_indicator(c: char) -> bool {
    matches!(
        c,
        '-' | '?'
            | ':'
            | ','
            | '['
            | ']'
            | '{'
            | '}'
            | '#'
            | '&'
            | '*'
            | '!'
            | '|'
            | '>'
            | '\''
            | '"'
            | '%'
            | '@'
            | '`'
    )
}

/// Printable in the YAML sense (`c-printable`), excluding the byte order mark.
#[must_use]
pub(crate) fn is_printable(c: char) -> bool {
    matches!(c,
        '\x09' | '\x0A' | '\x0D'
        | '\x20'..='\x7E'
        | '\u{85}'
        | '\u{A0}'..='\u{D7FF}'
        | '\u{E000}'..='\u{FEFE}'
        | '\u{FF00}'..='\u{FFFD}'
        | '\u{10000}'..='\u{10FFFF}')
}

/// Line breaks a scalar cannot carry in plain or single-quoted form without being folded.
#[inline]
#[must_use]
pub(crate) fn is_unicode_break(c: char) -> bool {
    matches!(c, '\u{85}' | '\u{2028}' | '\u{2029}')
}

#[cfg(test)]
mod test {
    use super::{is_anchor_char, is_indicator, is_printable};

    #[test]
    fn test_anchor_chars() {
        assert!("base-1_x".bytes().all(is_anchor_char));
        assert!("ünï".bytes().all(is_anchor_char));
        assert!(!is_anchor_char(b'['));
        assert!(!is_anchor_char(b' '));
    }

    #[test]
    fn test_indicator_and_printable() {
        assert!(is_indicator('&'));
        assert!(!is_indicator('a'));
        assert!(is_printable('ü'));
        assert!(!is_printable('\x07'));
        assert!(!is_printable('\u{FEFF}'));
    }
}
