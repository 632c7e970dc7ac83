//! Depth-first include traversal over resource relationships.

use std::collections::{HashMap, HashSet};

use crate::include::IncludeTree;
use crate::resource::{FieldSet, Identity, ResourceRef};
use crate::Result;

/// Outcome of one traversal.
pub struct Traversal {
    /// Root resources, deduplicated, in input order.
    pub primary: Vec<ResourceRef>,
    /// Side-loaded resources in discovery order.
    pub included: Vec<ResourceRef>,
    /// Relationship keys to render per resource: the union of the keys
    /// requested on every path that reached it.
    pub include_keys: HashMap<Identity, FieldSet>,
}

impl Traversal {
    /// Keys to render for `identity` (empty if it was never reached).
    pub fn keys_for(&self, identity: &Identity) -> FieldSet {
        self.include_keys.get(identity).cloned().unwrap_or_default()
    }
}

/// Pending relationship expansion: resource, path prefix, include subtree.
type Pending<'t> = (ResourceRef, String, &'t IncludeTree);

/// Per-call traversal state.
struct TraversalState<'t> {
    /// `(type, id, path prefix)` already enqueued or processed.
    visited: HashSet<(Identity, String)>,
    include_keys: HashMap<Identity, FieldSet>,
    primary: Vec<ResourceRef>,
    included: Vec<ResourceRef>,
    /// LIFO work list; popping from the end yields depth-first order.
    stack: Vec<Pending<'t>>,
}

impl<'t> TraversalState<'t> {
    fn new() -> Self {
        Self {
            visited: HashSet::new(),
            include_keys: HashMap::new(),
            primary: Vec::new(),
            included: Vec::new(),
            stack: Vec::new(),
        }
    }

    /// Merge `keys` for the resource and place it in an output list the
    /// first time its identity is seen.
    fn record(&mut self, res: &ResourceRef, keys: FieldSet, primary: bool) {
        let identity = res.identity();
        match self.include_keys.get_mut(&identity) {
            Some(existing) => existing.extend(keys),
            None => {
                self.include_keys.insert(identity, keys);
                if primary {
                    self.primary.push(res.clone());
                } else {
                    self.included.push(res.clone());
                }
            }
        }
    }

    /// Push every non-null related resource for the keys of `tree` whose
    /// path-identity has not been visited yet.
    fn enqueue_related(&mut self, res: &ResourceRef, prefix: &str, tree: &'t IncludeTree) -> Result<()> {
        if tree.is_empty() {
            return Ok(());
        }
        let related = res.related_resources(&tree.key_set())?;
        for key in tree.keys() {
            let Some(children) = related.get(key) else {
                continue;
            };
            let child_prefix = format!("{}.{}", prefix, key);
            for child in children.iter().flatten() {
                let path_identity = (child.identity(), child_prefix.clone());
                if self.visited.contains(&path_identity) {
                    continue;
                }
                log::trace!("Enqueue {} at {}", path_identity.0, child_prefix);
                self.visited.insert(path_identity);
                self.stack
                    .push((child.clone(), child_prefix.clone(), tree.child(key)));
            }
        }
        Ok(())
    }
}

/// Walk the resource graph from `roots` following `include`.
///
/// Roots always land in `primary` (first occurrence per identity); every other
/// resource reached through an included relationship lands in `included`
/// exactly once. The same resource reached along different relationship
/// paths is expanded along each of them, so its include keys are the union of
/// what each path asks for.
pub fn traverse(roots: &[ResourceRef], include: &IncludeTree) -> Result<Traversal> {
    let mut state = TraversalState::new();

    for root in roots {
        state.visited.insert((root.identity(), String::new()));
        state.record(root, include.key_set(), true);
        state.enqueue_related(root, "", include)?;
    }

    while let Some((res, prefix, tree)) = state.stack.pop() {
        state.record(&res, tree.key_set(), false);
        state.enqueue_related(&res, &prefix, tree)?;
    }

    log::debug!(
        "Traversal complete: {} primary, {} included, {} paths visited",
        state.primary.len(),
        state.included.len(),
        state.visited.len()
    );

    Ok(Traversal {
        primary: state.primary,
        included: state.included,
        include_keys: state.include_keys,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::field_set;
    use crate::test_support::{CountingResource, Graph};
    use crate::RenderError;
    use std::sync::Arc;

    fn identities(list: &[ResourceRef]) -> Vec<String> {
        list.iter().map(|r| r.identity().to_string()).collect()
    }

    #[test]
    fn test_traverse_empty_roots() {
        let result = traverse(&[], &IncludeTree::parse("posts")).unwrap();
        assert!(result.primary.is_empty());
        assert!(result.included.is_empty());
        assert!(result.include_keys.is_empty());
    }

    #[test]
    fn test_traverse_without_include() {
        let g = Graph::blog();
        let result = traverse(&[g.user(1), g.user(2)], &IncludeTree::new()).unwrap();
        assert_eq!(identities(&result.primary), vec!["users:1", "users:2"]);
        assert!(result.included.is_empty());
        assert!(result.keys_for(&Identity::new("users", "1")).is_empty());
    }

    #[test]
    fn test_shared_related_resource_included_once() {
        let mut g = Graph::new();
        g.add("users", "1", &[("posts", &[Some(("posts", "9"))])]);
        g.add("users", "2", &[("posts", &[Some(("posts", "9"))])]);
        g.add("posts", "9", &[]);

        let result = traverse(&[g.get("users", "1"), g.get("users", "2")], &IncludeTree::parse("posts")).unwrap();

        assert_eq!(identities(&result.primary), vec!["users:1", "users:2"]);
        assert_eq!(identities(&result.included), vec!["posts:9"]);
        assert!(result.keys_for(&Identity::new("posts", "9")).is_empty());
        assert_eq!(result.keys_for(&Identity::new("users", "2")), field_set(["posts"]));
    }

    #[test]
    fn test_duplicate_roots_merged() {
        let g = Graph::blog();
        let result = traverse(&[g.user(1), g.user(1)], &IncludeTree::new()).unwrap();
        assert_eq!(identities(&result.primary), vec!["users:1"]);
    }

    #[test]
    fn test_root_reachable_by_relationship_stays_primary() {
        // users:2 wrote posts:1, whose author is users:2 again
        let g = Graph::blog();
        let result = traverse(&[g.user(2)], &IncludeTree::parse("posts.author")).unwrap();

        assert_eq!(identities(&result.primary), vec!["users:2"]);
        assert_eq!(identities(&result.included), vec!["posts:3", "posts:1"]);
        // users:2 was reached as root (keys: posts) and as author (no keys)
        assert_eq!(result.keys_for(&Identity::new("users", "2")), field_set(["posts"]));
        assert_eq!(result.keys_for(&Identity::new("posts", "1")), field_set(["author"]));
    }

    #[test]
    fn test_depth_first_discovery_order() {
        let mut g = Graph::new();
        g.add("users", "1", &[("posts", &[Some(("posts", "1")), Some(("posts", "2"))])]);
        g.add("posts", "1", &[("comments", &[Some(("comments", "11"))])]);
        g.add("posts", "2", &[("comments", &[Some(("comments", "21"))])]);
        g.add("comments", "11", &[]);
        g.add("comments", "21", &[]);

        let result = traverse(&[g.get("users", "1")], &IncludeTree::parse("posts.comments")).unwrap();

        // Stack pops the last pushed post first and descends before siblings
        assert_eq!(
            identities(&result.included),
            vec!["posts:2", "comments:21", "posts:1", "comments:11"]
        );
    }

    #[test]
    fn test_converging_paths_merge_keys() {
        // users:1 -> posts:5 directly and via comments:7 -> post
        let mut g = Graph::new();
        g.add(
            "users",
            "1",
            &[
                ("posts", &[Some(("posts", "5"))]),
                ("comments", &[Some(("comments", "7"))]),
            ],
        );
        g.add("comments", "7", &[("post", &[Some(("posts", "5"))])]);
        g.add(
            "posts",
            "5",
            &[("author", &[Some(("users", "3"))]), ("tags", &[Some(("tags", "1"))])],
        );
        g.add("users", "3", &[]);
        g.add("tags", "1", &[]);

        let include = IncludeTree::parse("posts.author,comments.post.tags");
        let result = traverse(&[g.get("users", "1")], &include).unwrap();

        assert_eq!(
            result.keys_for(&Identity::new("posts", "5")),
            field_set(["author", "tags"])
        );
        let mut included = identities(&result.included);
        included.sort();
        assert_eq!(
            included,
            vec!["comments:7", "posts:5", "tags:1", "users:3"]
        );
    }

    #[test]
    fn test_object_include_keeps_string_order() {
        let mut g = Graph::new();
        g.add(
            "users",
            "1",
            &[
                ("posts", &[Some(("posts", "1"))]),
                ("comments", &[Some(("comments", "1"))]),
            ],
        );
        g.add("posts", "1", &[]);
        g.add("comments", "1", &[]);

        let from_string = traverse(&[g.get("users", "1")], &IncludeTree::parse("posts,comments")).unwrap();
        let object = IncludeTree::from_value(&serde_json::json!({ "posts": {}, "comments": {} })).unwrap();
        let from_object = traverse(&[g.get("users", "1")], &object).unwrap();

        assert_eq!(identities(&from_string.included), vec!["comments:1", "posts:1"]);
        assert_eq!(identities(&from_object.included), identities(&from_string.included));
    }

    #[test]
    fn test_cycle_terminates() {
        let mut g = Graph::new();
        g.add("nodes", "a", &[("next", &[Some(("nodes", "b"))])]);
        g.add("nodes", "b", &[("next", &[Some(("nodes", "a"))])]);

        let include = IncludeTree::parse("next.next.next.next.next");
        let result = traverse(&[g.get("nodes", "a")], &include).unwrap();

        assert_eq!(identities(&result.primary), vec!["nodes:a"]);
        assert_eq!(identities(&result.included), vec!["nodes:b"]);
        assert_eq!(
            result.keys_for(&Identity::new("nodes", "a")),
            field_set(["next"])
        );
    }

    #[test]
    fn test_null_slots_and_unknown_keys_skipped() {
        let mut g = Graph::new();
        g.add("posts", "1", &[("author", &[None])]);

        let result = traverse(&[g.get("posts", "1")], &IncludeTree::parse("author,missing")).unwrap();

        assert_eq!(identities(&result.primary), vec!["posts:1"]);
        assert!(result.included.is_empty());
    }

    #[test]
    fn test_distinct_instances_same_identity_deduplicated() {
        let first: ResourceRef = Arc::new(CountingResource::new("users", "1", None));
        let second: ResourceRef = Arc::new(CountingResource::new("users", "1", None));
        let result = traverse(&[first, second], &IncludeTree::new()).unwrap();
        assert_eq!(result.primary.len(), 1);
    }

    #[test]
    fn test_relationship_error_propagates() {
        let failing: ResourceRef = Arc::new(CountingResource::failing("users", "1"));
        let err = traverse(&[failing], &IncludeTree::parse("posts")).err().unwrap();
        assert!(matches!(err, RenderError::Resource(_)));
    }
}
