use alloc::string::ToString;

use hashbrown::HashSet;
use yamfold_common::{NodeData, NodeId, Tree, YamlError, YamlResult};

/// What happens to `*alias` nodes and `&anchor` declarations on output.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub enum AliasMode {
    /// Aliases are written as back-references and anchors are kept.
    #[default]
    Preserve,
    /// Every alias is replaced by a copy of its target, and merge keys are flattened.
    /// No anchors are written.
    Resolve,
}

/// Nodes on the active expansion path.
///
/// An alias may only be inlined if its target is not on the path, which rules out any alias
/// that points at one of its own ancestors, directly or through a chain of merges.
#[derive(Debug, Default)]
pub struct ExpansionGuard {
    active: HashSet<NodeId>,
}

impl ExpansionGuard {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Puts `id` on the active path. Returns `false` if it already was there, in which case the
    /// caller must not [`leave`](Self::leave) it.
    pub fn enter(&mut self, id: NodeId) -> bool {
        self.active.insert(id)
    }

    pub fn leave(&mut self, id: NodeId) {
        self.active.remove(&id);
    }

    #[must_use]
    pub fn is_active(&self, id: NodeId) -> bool {
        self.active.contains(&id)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.active.len()
    }

    /// Target of the alias node `alias`, checked against the active path.
    ///
    /// Non-alias nodes are returned unchanged.
    ///
    /// # Errors
    /// [`YamlError::CyclicAlias`] if the target is being expanded already,
    /// [`YamlError::UnresolvedAliasTarget`] if the alias has no target.
    pub fn expand(&self, tree: &Tree, alias: NodeId) -> YamlResult<NodeId> {
        match &tree[alias].data {
            NodeData::Alias {
                name,
                target: Some(target),
            } => {
                if self.is_active(*target) {
                    return Err(YamlError::CyclicAlias(name.to_string()));
                }
                Ok(*target)
            }
            NodeData::Alias { name, target: None } => {
                Err(YamlError::UnresolvedAliasTarget(name.to_string()))
            }
            _ => Ok(alias),
        }
    }
}

/// Follows aliases from `id` until a node that is not an alias.
///
/// # Errors
/// [`YamlError::UnresolvedAliasTarget`] for an alias without target and
/// [`YamlError::CyclicAlias`] for aliases that only lead to other aliases in a loop.
pub fn follow_aliases(tree: &Tree, mut id: NodeId) -> YamlResult<NodeId> {
    let mut seen = HashSet::new();
    while let NodeData::Alias { name, target } = &tree[id].data {
        if !seen.insert(id) {
            return Err(YamlError::CyclicAlias(name.to_string()));
        }
        id = target.ok_or_else(|| YamlError::UnresolvedAliasTarget(name.to_string()))?;
    }
    Ok(id)
}

#[cfg(test)]
mod test {
    use yamfold_common::{CollectionStyle, ScalarStyle, Tree, YamlError};

    use super::{follow_aliases, ExpansionGuard};

    #[test]
    fn test_expand_inactive_target() {
        let mut tree = Tree::new();
        let base = tree.add_scalar("x", ScalarStyle::Plain);
        tree.set_anchor(base, "base");
        let alias = tree.add_alias("base");

        let mut guard = ExpansionGuard::new();
        assert_eq!(guard.expand(&tree, alias), Ok(base));
        assert_eq!(guard.expand(&tree, base), Ok(base));

        assert!(guard.enter(base));
        assert!(!guard.enter(base));
        assert_eq!(
            guard.expand(&tree, alias),
            Err(YamlError::CyclicAlias("base".into()))
        );
        guard.leave(base);
        assert_eq!(guard.depth(), 0);
        assert_eq!(guard.expand(&tree, alias), Ok(base));
    }

    #[test]
    fn test_missing_target() {
        let mut tree = Tree::new();
        let alias = tree.add_alias("nowhere");
        let guard = ExpansionGuard::new();
        assert_eq!(
            guard.expand(&tree, alias),
            Err(YamlError::UnresolvedAliasTarget("nowhere".into()))
        );
        assert_eq!(
            follow_aliases(&tree, alias),
            Err(YamlError::UnresolvedAliasTarget("nowhere".into()))
        );
    }

    #[test]
    fn test_follow_chain() {
        let mut tree = Tree::new();
        let map = tree.add_mapping(CollectionStyle::Block);
        let first = tree.add_alias_to("a", Some(map));
        let second = tree.add_alias_to("b", Some(first));
        assert_eq!(follow_aliases(&tree, second), Ok(map));
        assert_eq!(follow_aliases(&tree, map), Ok(map));

        // ids are positional, so a scratch tree yields the ids of nodes not yet created
        let mut scratch = Tree::new();
        let first_id = scratch.add_alias_to("", None);
        let second_id = scratch.add_alias_to("", None);

        let mut looped = Tree::new();
        let a = looped.add_alias_to("a", Some(second_id));
        let b = looped.add_alias_to("b", Some(a));
        assert_eq!((a, b), (first_id, second_id));
        assert_eq!(
            follow_aliases(&looped, a),
            Err(YamlError::CyclicAlias("a".into()))
        );
    }
}
