#![no_std]
extern crate alloc;
extern crate core;
extern crate yamfold_common;

use alloc::string::String;
use core::fmt;

pub use alias::{follow_aliases, AliasMode, ExpansionGuard};
pub use emitter::{looks_like_non_string, YamlEmitter};
pub use encoder::{encode, EncodeOptions, Encoder, StyleMode};
pub use merge::{is_merge_key, resolve_merges, MergedMapping};
pub use treebuild::{load_bytes, load_str, YamlLoader};
use yamfold_common::{Tree, YamlResult};

pub mod alias;
pub mod emitter;
pub mod encoder;
pub mod merge;
pub mod treebuild;

mod char_utils;

/// Writes `tree` as YAML text into `writer`, using the default emitter settings.
///
/// # Errors
/// Any merge, alias or emitter error, see [`Encoder::encode`].
pub fn encode_to_writer(
    tree: &Tree,
    writer: &mut dyn fmt::Write,
    options: EncodeOptions,
) -> YamlResult<()> {
    let mut emitter = YamlEmitter::new(writer);
    encode(tree, &mut emitter, options)
}

/// Same as [`encode_to_writer`] but collects the output in a new string.
///
/// # Errors
/// See [`encode_to_writer`].
pub fn encode_to_string(tree: &Tree, options: EncodeOptions) -> YamlResult<String> {
    let mut out = String::new();
    encode_to_writer(tree, &mut out, options)?;
    Ok(out)
}

/// Loads the first document of `input` and writes it back out under `options`.
///
/// ```
/// use yamfold_core::{fold_str, EncodeOptions};
///
/// let input = "base: &b {x: 1}\nuse:\n  <<: *b\n  y: 2\n";
/// let folded = fold_str(input, EncodeOptions::default().resolve_aliases()).unwrap();
/// assert_eq!(folded, "base:\n  x: 1\nuse:\n  y: 2\n  x: 1\n");
/// ```
///
/// # Errors
/// Parse errors of the input, then anything [`encode_to_writer`] reports.
pub fn fold_str(input: &str, options: EncodeOptions) -> YamlResult<String> {
    let tree = load_str(input)?;
    encode_to_string(&tree, options)
}
