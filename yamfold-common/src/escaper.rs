use std::borrow::Cow;

/// Escapes scalar text the way yaml-test-suite event files write it (`\n`, `\t`, `\\`, ...).
pub fn escape_event_value(input: &str) -> Cow<'_, str> {
    escape(input, |ch| matches!(ch, b'\n' | b'\t' | b'\r' | b'\x08' | b'\\'))
}

pub(crate) fn escape<F: Fn(u8) -> bool>(input: &str, escape_fn: F) -> Cow<'_, str> {
    let raw = input.as_bytes();
    let mut pos = 0;
    let mut escaped: Option<String> = None;
    while let Some(i) = raw[pos..].iter().position(|&b| escape_fn(b)) {
        let escaped = escaped.get_or_insert_with(|| String::with_capacity(raw.len() + 8));
        let new_pos = pos + i;
        // escape_fn only matches ASCII, so both ends are char boundaries
        escaped.push_str(&input[pos..new_pos]);
        match raw[new_pos] {
            b'\\' => escaped.push_str("\\\\"),
            b'\t' => escaped.push_str("\\t"),
            b'\r' => escaped.push_str("\\r"),
            b'\n' => escaped.push_str("\\n"),
            b'\x08' => escaped.push_str("\\b"),
            b'\'' => escaped.push_str("\\'"),
            b'"' => escaped.push_str("\\\""),
            other => escaped.push(char::from(other)),
        }
        pos = new_pos + 1;
    }

    match escaped {
        Some(mut escaped) => {
            escaped.push_str(&input[pos..]);
            Cow::Owned(escaped)
        }
        None => Cow::Borrowed(input),
    }
}
