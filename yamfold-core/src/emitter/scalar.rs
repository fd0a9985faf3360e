use core::fmt;

use crate::char_utils::{
    is_blank, is_blank_or_break, is_indicator, is_printable, is_unicode_break,
};

/// A convenience alias for emitter functions that may fail without returning a value.
pub type EmitResult = Result<(), fmt::Error>;

/// What a scalar's text allows, in the manner of libyaml's `yaml_emitter_analyze_scalar`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct ScalarAnalysis {
    pub multiline: bool,
    pub flow_plain_allowed: bool,
    pub block_plain_allowed: bool,
    pub single_quoted_allowed: bool,
    pub block_allowed: bool,
}

pub(crate) fn analyze(value: &str, unicode: bool) -> ScalarAnalysis {
    if value.is_empty() {
        return ScalarAnalysis {
            multiline: false,
            flow_plain_allowed: false,
            block_plain_allowed: true,
            single_quoted_allowed: true,
            block_allowed: false,
        };
    }

    let mut flow_indicators = value.starts_with("---") || value.starts_with("...");
    let mut block_indicators = flow_indicators;
    let mut line_breaks = false;
    let mut special_characters = false;
    let mut leading_space = false;
    let mut leading_break = false;
    let mut trailing_space = false;
    let mut trailing_break = false;
    let mut break_space = false;
    let mut space_break = false;
    let mut previous_space = false;
    let mut previous_break = false;
    let mut preceded_by_whitespace = true;

    let mut chars = value.chars().peekable();
    let mut first = true;
    while let Some(c) = chars.next() {
        let next = chars.peek().copied();
        let last = next.is_none();
        let followed_by_whitespace =
            next.map_or(true, |n| n.is_ascii() && is_blank_or_break(n as u8));

        if first {
            match c {
                '?' | ':' => {
                    flow_indicators = true;
                    block_indicators |= followed_by_whitespace;
                }
                '-' => {
                    flow_indicators |= followed_by_whitespace;
                    block_indicators |= followed_by_whitespace;
                }
                c if is_indicator(c) => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        } else {
            match c {
                ',' | '?' | '[' | ']' | '{' | '}' => flow_indicators = true,
                ':' => {
                    flow_indicators = true;
                    block_indicators |= followed_by_whitespace;
                }
                '#' if preceded_by_whitespace => {
                    flow_indicators = true;
                    block_indicators = true;
                }
                _ => {}
            }
        }

        if c == '\n' {
            line_breaks = true;
        } else if !is_printable(c)
            || c == '\r'
            || is_unicode_break(c)
            || (!c.is_ascii() && !unicode)
        {
            special_characters = true;
        }

        if c == ' ' || c == '\t' {
            leading_space |= first;
            trailing_space |= last;
            break_space |= previous_break;
            previous_space = true;
            previous_break = false;
        } else if c == '\n' {
            leading_break |= first;
            trailing_break |= last;
            space_break |= previous_space;
            previous_break = true;
            previous_space = false;
        } else {
            previous_space = false;
            previous_break = false;
        }

        preceded_by_whitespace = c.is_ascii() && is_blank_or_break(c as u8);
        first = false;
    }

    let mut analysis = ScalarAnalysis {
        multiline: line_breaks,
        flow_plain_allowed: true,
        block_plain_allowed: true,
        single_quoted_allowed: true,
        block_allowed: true,
    };
    if leading_space || leading_break || trailing_space || trailing_break {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if trailing_space {
        analysis.block_allowed = false;
    }
    if break_space {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
        analysis.single_quoted_allowed = false;
    }
    if space_break || special_characters {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
        analysis.single_quoted_allowed = false;
        analysis.block_allowed = false;
    }
    if line_breaks {
        analysis.flow_plain_allowed = false;
        analysis.block_plain_allowed = false;
    }
    if flow_indicators {
        analysis.flow_plain_allowed = false;
    }
    if block_indicators {
        analysis.block_plain_allowed = false;
    }
    // block scalars made of line breaks alone lose them to chomping
    if value.bytes().all(|b| b == b'\n') {
        analysis.block_allowed = false;
    }
    analysis
}

/// Check if an otherwise plain-safe string would be read back as something other than a string.
///
/// Strings like these must be quoted:
/// * the empty string, booleans (`true`, `yes`, `off`, ...) and nulls (`null`, `~`);
/// * anything that looks like a number, such as integers (e.g. 2, 14, etc.), floats (e.g. 2.6, 14.9),
///   exponential numbers (e.g. 12e7), hexadecimal, octal and binary numbers, `.inf` and `.nan`;
/// * YAML 1.1 numbers with `_` separators (e.g. 1_000) and base 60 numbers (e.g. 12:30);
/// * dates (e.g. 2014-12-31), which some loaders turn into timestamps;
/// * the merge key `<<` and the value key `=`.
///
/// ```
/// use yamfold_core::looks_like_non_string;
///
/// assert!(looks_like_non_string("1_000"));
/// assert!(!looks_like_non_string("v1_000"));
/// ```
#[allow(clippy::doc_markdown)]
pub fn looks_like_non_string(string: &str) -> bool {
    if string.is_empty() {
        return true;
    }
    [
        // http://yaml.org/type/bool.html
        // Note: 'y', 'Y', 'n', 'N', is not quoted deliberately, as in libyaml. PyYAML also parse
        // them as string, not booleans, although it is violating the YAML 1.1 specification.
        // See https://github.com/dtolnay/serde-yaml/pull/83#discussion_r152628088.
        "yes", "Yes", "YES", "no", "No", "NO", "True", "TRUE", "true", "False", "FALSE", "false",
        "on", "On", "ON", "off", "Off", "OFF",
        // http://yaml.org/type/null.html
        "null", "Null", "NULL", "~", "<<", "=",
    ]
    .contains(&string)
        || string.starts_with('.')
        || string.starts_with("0x")
        || string.starts_with("0o")
        || string.starts_with("+.")
        || string.starts_with("-.")
        || string.parse::<i64>().is_ok()
        || string.parse::<f64>().is_ok()
        || looks_like_yaml11_number(string)
        || looks_like_date(string)
}

fn looks_like_yaml11_number(string: &str) -> bool {
    let digits = string.strip_prefix(&['+', '-'][..]).unwrap_or(string);
    if let Some(bin) = digits.strip_prefix("0b") {
        return !bin.is_empty() && bin.bytes().all(|b| matches!(b, b'0' | b'1' | b'_'));
    }
    if let Some(hex) = digits.strip_prefix("0x") {
        return !hex.is_empty() && hex.bytes().all(|b| b.is_ascii_hexdigit() || b == b'_');
    }
    if !digits.starts_with(|c: char| c.is_ascii_digit()) {
        return false;
    }
    let separated = digits.contains('_')
        && digits
            .bytes()
            .all(|b| b.is_ascii_digit() || b == b'_' || b == b'.');
    separated || looks_like_sexagesimal(digits)
}

/// `[0-9][0-9_]*(:[0-5]?[0-9])+(\.[0-9_]*)?`
fn looks_like_sexagesimal(digits: &str) -> bool {
    let Some((head, rest)) = digits.split_once(':') else {
        return false;
    };
    let (rest, fraction) = match rest.split_once('.') {
        Some((rest, fraction)) => (rest, fraction),
        None => (rest, ""),
    };
    head.bytes().all(|b| b.is_ascii_digit() || b == b'_')
        && rest.split(':').all(|part| {
            (1..=2).contains(&part.len())
                && part.bytes().all(|b| b.is_ascii_digit())
                && part.parse::<u8>().is_ok_and(|n| n < 60)
        })
        && fraction.bytes().all(|b| b.is_ascii_digit() || b == b'_')
}

fn looks_like_date(string: &str) -> bool {
    let bytes = string.as_bytes();
    bytes.len() >= 10
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4] == b'-'
        && bytes[5..7].iter().all(u8::is_ascii_digit)
        && bytes[7] == b'-'
        && bytes[8..10].iter().all(u8::is_ascii_digit)
}

// from serialize::json
pub(crate) fn escape_str(wr: &mut dyn fmt::Write, v: &str, unicode: bool) -> EmitResult {
    wr.write_str("\"")?;

    let mut start = 0;
    for (i, c) in v.char_indices() {
        let escaped: Option<&str> = match c {
            '"' => Some("\\\""),
            '\\' => Some("\\\\"),
            '\0' => Some("\\0"),
            '\x07' => Some("\\a"),
            '\x08' => Some("\\b"),
            '\t' => Some("\\t"),
            '\n' => Some("\\n"),
            '\x0b' => Some("\\v"),
            '\x0c' => Some("\\f"),
            '\r' => Some("\\r"),
            '\x1b' => Some("\\e"),
            '\u{85}' => Some("\\N"),
            '\u{A0}' => Some("\\_"),
            '\u{2028}' => Some("\\L"),
            '\u{2029}' => Some("\\P"),
            _ => None,
        };
        let needs_hex = escaped.is_none()
            && (!is_printable(c) || c == '\u{FEFF}' || (!unicode && !c.is_ascii()));
        if escaped.is_none() && !needs_hex {
            continue;
        }
        if start < i {
            wr.write_str(&v[start..i])?;
        }
        match escaped {
            Some(escaped) => wr.write_str(escaped)?,
            None => {
                let code = u32::from(c);
                if code <= 0xFF {
                    write!(wr, "\\x{code:02X}")?;
                } else if code <= 0xFFFF {
                    write!(wr, "\\u{code:04X}")?;
                } else {
                    write!(wr, "\\U{code:08X}")?;
                }
            }
        }
        start = i + c.len_utf8();
    }
    if start < v.len() {
        wr.write_str(&v[start..])?;
    }

    wr.write_str("\"")?;
    Ok(())
}

/// Single-quoted scalar. Line breaks are written as an empty line, continuation lines start
/// with `indent` spaces.
pub(crate) fn write_single_quoted(wr: &mut dyn fmt::Write, v: &str, indent: usize) -> EmitResult {
    wr.write_char('\'')?;
    let mut in_breaks = false;
    for c in v.chars() {
        match c {
            '\n' => {
                if !in_breaks {
                    wr.write_char('\n')?;
                }
                wr.write_char('\n')?;
                in_breaks = true;
            }
            _ => {
                if in_breaks {
                    write_spaces(wr, indent)?;
                    in_breaks = false;
                }
                if c == '\'' {
                    wr.write_str("''")?;
                } else {
                    wr.write_char(c)?;
                }
            }
        }
    }
    if in_breaks {
        write_spaces(wr, indent)?;
    }
    wr.write_char('\'')
}

/// Header of a literal or folded block scalar, like `|2-`.
pub(crate) fn write_block_header(
    wr: &mut dyn fmt::Write,
    indicator: char,
    v: &str,
    indent_hint: usize,
) -> EmitResult {
    wr.write_char(indicator)?;
    let first_content = v.trim_start_matches('\n');
    if first_content.starts_with(' ') || first_content.starts_with('\t') {
        write!(wr, "{indent_hint}")?;
    }
    let trailing = v.len() - v.trim_end_matches('\n').len();
    match trailing {
        0 => wr.write_char('-'),
        1 => Ok(()),
        _ => wr.write_char('+'),
    }
}

/// Body lines of a literal block scalar, each on its own line, empty lines left unindented.
pub(crate) fn write_literal_body(wr: &mut dyn fmt::Write, v: &str, indent: usize) -> EmitResult {
    // lines() will omit the last line if it is empty.
    for line in v.lines() {
        wr.write_char('\n')?;
        if !line.is_empty() {
            write_spaces(wr, indent)?;
            // It's literal text, so don't escape special chars.
            wr.write_str(line)?;
        }
    }
    Ok(())
}

/// Body lines of a folded block scalar. A single line break between two lines that do not
/// start with white space would be folded into a space, so such breaks get an extra empty line.
pub(crate) fn write_folded_body(wr: &mut dyn fmt::Write, v: &str, indent: usize) -> EmitResult {
    let mut previous_foldable: Option<bool> = None;
    let mut pending_breaks = 0;
    for line in v.lines() {
        if line.is_empty() {
            pending_breaks += 1;
            continue;
        }
        let foldable = !line.starts_with(|c: char| c.is_ascii() && is_blank(c as u8));
        let extra = usize::from(previous_foldable == Some(true) && foldable);
        for _ in 0..pending_breaks + extra {
            wr.write_char('\n')?;
        }
        wr.write_char('\n')?;
        write_spaces(wr, indent)?;
        wr.write_str(line)?;
        pending_breaks = 0;
        previous_foldable = Some(foldable);
    }
    for _ in 0..pending_breaks {
        wr.write_char('\n')?;
    }
    Ok(())
}

pub(crate) fn write_spaces(wr: &mut dyn fmt::Write, count: usize) -> EmitResult {
    for _ in 0..count {
        wr.write_char(' ')?;
    }
    Ok(())
}
