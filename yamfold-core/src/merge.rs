use alloc::vec::Vec;

use hashbrown::HashSet;
use log::debug;
use yamfold_common::{NodeData, NodeId, ScalarStyle, Tree, YamlError, YamlResult};

use crate::alias::{follow_aliases, ExpansionGuard};

/// Pairs of a mapping after its `<<` merge keys are applied.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergedMapping {
    /// Own pairs in document order, followed by the pairs contributed by merge sources.
    pub pairs: Vec<(NodeId, NodeId)>,
    /// `directives[i]` tells whether own pair `i` is a merge directive. Merged pairs have no entry.
    pub directives: Vec<bool>,
}

impl MergedMapping {
    /// Pairs that end up in the output, merge directives left out.
    pub fn emitted(&self) -> impl Iterator<Item = (NodeId, NodeId)> + '_ {
        self.pairs
            .iter()
            .enumerate()
            .filter(|(i, _)| !self.directives.get(*i).copied().unwrap_or(false))
            .map(|(_, pair)| *pair)
    }
}

/// Whether `key` is a merge key: a plain untagged `<<` or a `!!merge` scalar, possibly
/// reached through aliases.
///
/// # Errors
/// Fails if following an alias fails, see [`follow_aliases`].
pub fn is_merge_key(tree: &Tree, key: NodeId) -> YamlResult<bool> {
    let node = &tree[follow_aliases(tree, key)?];
    Ok(match (&node.data, &node.tag) {
        (NodeData::Scalar { value, style }, None) => {
            value == "<<" && matches!(style, ScalarStyle::Plain | ScalarStyle::Any)
        }
        (NodeData::Scalar { value, .. }, Some(tag)) => tag.is_merge() && value == "<<",
        _ => false,
    })
}

/// Text of a scalar key, after following aliases. Other keys take no part in deduplication.
fn scalar_key(tree: &Tree, key: NodeId) -> YamlResult<Option<&str>> {
    Ok(tree[follow_aliases(tree, key)?].scalar())
}

/// Computes the effective pairs of mapping `map`.
///
/// Explicit keys win over merged ones, and among merge sources the earlier one wins: a merged
/// pair is only added if no pair with the same scalar key was added before it.
///
/// # Errors
/// - [`YamlError::UnsupportedMergeValue`] if a `<<` value is not a mapping, a sequence of
///   mappings or an alias to one of those.
/// - [`YamlError::CyclicAlias`] if a merge source is being expanded already.
pub fn resolve_merges(
    tree: &Tree,
    map: NodeId,
    guard: &mut ExpansionGuard,
) -> YamlResult<MergedMapping> {
    let mut merged = MergedMapping::default();
    let mut keys = HashSet::new();
    let mut sources = Vec::new();

    for (key, value) in tree.pairs(map) {
        let directive = is_merge_key(tree, key)?;
        merged.pairs.push((key, value));
        merged.directives.push(directive);
        if directive {
            sources.push(value);
        } else if let Some(text) = scalar_key(tree, key)? {
            keys.insert(text);
        }
    }

    for source in sources {
        for (key, value) in source_pairs(tree, source, guard)? {
            match scalar_key(tree, key)? {
                Some(text) if !keys.insert(text) => {
                    debug!("Merge key `{text}` of {map} is already defined, skipping");
                }
                _ => merged.pairs.push((key, value)),
            }
        }
    }
    Ok(merged)
}

/// Pairs contributed by the value of a `<<` key.
fn source_pairs(
    tree: &Tree,
    source: NodeId,
    guard: &mut ExpansionGuard,
) -> YamlResult<Vec<(NodeId, NodeId)>> {
    match &tree[source].data {
        NodeData::Mapping { .. } => effective_pairs(tree, source, guard),
        NodeData::Alias { .. } => {
            let target = guard.expand(tree, source)?;
            let entered = guard.enter(target);
            let pairs = source_pairs(tree, target, guard);
            if entered {
                guard.leave(target);
            }
            pairs
        }
        NodeData::Sequence { children, .. } => {
            let mut pairs = Vec::new();
            for &element in children {
                pairs.extend(element_pairs(tree, element, guard)?);
            }
            Ok(pairs)
        }
        other => Err(YamlError::UnsupportedMergeValue { found: other.kind() }),
    }
}

/// Pairs of one element of a `<<: [...]` sequence, which must be a mapping or an alias to one.
fn element_pairs(
    tree: &Tree,
    element: NodeId,
    guard: &mut ExpansionGuard,
) -> YamlResult<Vec<(NodeId, NodeId)>> {
    match &tree[element].data {
        NodeData::Mapping { .. } => effective_pairs(tree, element, guard),
        NodeData::Alias { .. } => {
            let target = guard.expand(tree, element)?;
            let entered = guard.enter(target);
            let pairs = element_pairs(tree, target, guard);
            if entered {
                guard.leave(target);
            }
            pairs
        }
        other => Err(YamlError::UnsupportedMergeValue { found: other.kind() }),
    }
}

/// Own non-directive pairs of a merge source followed by what its own merge keys contribute.
fn effective_pairs(
    tree: &Tree,
    map: NodeId,
    guard: &mut ExpansionGuard,
) -> YamlResult<Vec<(NodeId, NodeId)>> {
    let entered = guard.enter(map);
    let merged = resolve_merges(tree, map, guard);
    if entered {
        guard.leave(map);
    }
    Ok(merged?.emitted().collect())
}
