use std::fmt::Write;

use yamfold_common::{CollectionStyle, Event, EventSink, ScalarStyle, YamlError, YamlResult};
use yamfold_core::{encode, load_str, looks_like_non_string, AliasMode, EncodeOptions};

/// Writes every event it receives in yaml-test-suite notation, one per line.
#[derive(Debug, Default)]
pub struct EventWriter {
    out: String,
}

impl EventWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.out
    }
}

impl EventSink for EventWriter {
    fn on_event(&mut self, event: Event<'_>) -> YamlResult<()> {
        writeln!(self.out, "{event}")?;
        Ok(())
    }
}

/// Events of the first document of `input`, encoded under `options`, in yaml-test-suite notation.
///
/// # Errors
/// Any load or encode error.
pub fn event_text(input: &str, options: EncodeOptions) -> YamlResult<String> {
    let tree = load_str(input)?;
    let mut writer = EventWriter::new();
    encode(&tree, &mut writer, options)?;
    Ok(writer.into_string())
}

///
/// Assert that for given input, the encoder generates expected set of events
///
/// # Panics
///
///    Function panics if there is a difference between expected events string and one generated
///    from the input, or if the input fails to encode.
pub fn assert_eq_events(input: &str, options: EncodeOptions, events: &str) {
    match event_text(input, options) {
        Ok(actual) => assert_eq!(actual, events, "Error in case: {input}"),
        Err(err) => panic!("Failed to encode {input:?}: {err}"),
    }
}

/// Event with its presentation dropped: scalar and collection styles, implicit flags and
/// document markers. What remains is kinds, tags, anchors, aliases and values.
///
/// Untagged quoted scalars that would read as something else when plain (`'true'`, `'12'`)
/// keep a single-quoted marker, so they stay distinct from their plain forms.
#[must_use]
pub fn semantic_event(event: &Event<'_>) -> String {
    let stripped = match event {
        Event::DocumentStart { .. } => Event::DocumentStart {
            version: None,
            tags: Vec::new(),
            implicit: true,
        },
        Event::DocumentEnd { .. } => Event::DocumentEnd { implicit: true },
        Event::MappingStart { anchor, tag, .. } => Event::MappingStart {
            anchor: anchor.clone(),
            tag: tag.clone(),
            implicit: true,
            style: CollectionStyle::Block,
        },
        Event::SequenceStart { anchor, tag, .. } => Event::SequenceStart {
            anchor: anchor.clone(),
            tag: tag.clone(),
            implicit: true,
            style: CollectionStyle::Block,
        },
        Event::Scalar {
            anchor,
            tag,
            value,
            style,
            ..
        } => {
            let typed_as_string = tag.is_none()
                && !matches!(style, ScalarStyle::Plain | ScalarStyle::Any)
                && looks_like_non_string(value);
            Event::Scalar {
                anchor: anchor.clone(),
                tag: tag.clone(),
                value: value.clone(),
                plain_implicit: true,
                quoted_implicit: true,
                style: if typed_as_string {
                    ScalarStyle::SingleQuoted
                } else {
                    ScalarStyle::Plain
                },
            }
        }
        other => other.clone(),
    };
    stripped.to_string()
}

/// Semantic events of `input` under the given alias mode, see [`semantic_event`].
///
/// # Errors
/// Any load or encode error.
pub fn semantic_events(input: &str, aliases: AliasMode) -> YamlResult<Vec<String>> {
    let tree = load_str(input)?;
    let mut events: Vec<Event<'static>> = Vec::new();
    encode(
        &tree,
        &mut events,
        EncodeOptions::default().keep_style().with_aliases(aliases),
    )?;
    Ok(events.iter().map(semantic_event).collect())
}

/// Checks that `output` reads back as the same data as `input`. Output produced with aliases
/// resolved is compared against the resolved form of the input.
///
/// # Errors
/// A description of the first differing event, or the error of loading either text.
pub fn check_round_trip(input: &str, output: &str, aliases: AliasMode) -> Result<(), String> {
    let describe = |err: YamlError| err.to_string();
    let expected = semantic_events(input, aliases).map_err(describe)?;
    let actual = semantic_events(output, AliasMode::Preserve).map_err(describe)?;
    if let Some(pos) = expected.iter().zip(&actual).position(|(e, a)| e != a) {
        return Err(format!(
            "event {pos} differs: expected `{}`, found `{}`",
            expected[pos], actual[pos]
        ));
    }
    if expected.len() != actual.len() {
        return Err(format!(
            "expected {} events, found {}",
            expected.len(),
            actual.len()
        ));
    }
    Ok(())
}
