//! Assembles a flat node list into a tree rooted at a given id.

use std::collections::BTreeMap;

use crate::domain::Node;

/// Build the subtree rooted at `root_id` from `nodes`. Children keep the
/// input order within equal positions (stable sort by `position`); nodes
/// whose parent is absent from the input are dropped. Paths and levels are
/// recomputed during assembly so stale persisted values never leak through.
/// Returns `None` when `root_id` is not in the input.
pub fn build_tree(nodes: Vec<Node>, root_id: i64) -> Option<Node> {
    let mut index: BTreeMap<i64, Node> = BTreeMap::new();
    let mut children_of: BTreeMap<i64, Vec<i64>> = BTreeMap::new();

    for node in nodes {
        children_of.entry(node.parent_id).or_default().push(node.id);
        index.insert(node.id, node);
    }

    let root = index.remove(&root_id)?.with_fixed_path_and_level(None);
    Some(attach_children(root, &mut index, &children_of))
}

fn attach_children(
    mut parent: Node,
    index: &mut BTreeMap<i64, Node>,
    children_of: &BTreeMap<i64, Vec<i64>>,
) -> Node {
    let Some(ids) = children_of.get(&parent.id) else {
        return parent;
    };

    let mut children: Vec<Node> = ids.iter().filter_map(|id| index.remove(id)).collect();
    children.sort_by_key(|child| child.position);

    parent.children = children
        .into_iter()
        .map(|child| {
            let child = child.with_fixed_path_and_level(Some(&parent));
            attach_children(child, index, children_of)
        })
        .collect();
    parent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: i64, parent_id: i64, position: i32) -> Node {
        Node {
            id,
            parent_id,
            position,
            name: format!("node-{id}"),
            ..Node::default()
        }
    }

    fn flatten(node: &Node, out: &mut Vec<(i64, i64)>) {
        for child in &node.children {
            out.push((child.parent_id, child.id));
            flatten(child, out);
        }
    }

    #[test]
    fn builds_tree_and_sorts_children_by_position() {
        let tree = build_tree(
            vec![node(1, 0, 0), node(3, 1, 2), node(2, 1, 1), node(4, 2, 0)],
            1,
        )
        .expect("tree");

        assert_eq!(tree.id, 1);
        let ids: Vec<i64> = tree.children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(tree.children[0].children[0].id, 4);
    }

    #[test]
    fn recomputes_path_and_level() {
        let mut stale = node(2, 1, 0);
        stale.path = "9/9".into();
        stale.level = 9;

        let tree = build_tree(vec![node(1, 0, 0), stale], 1).expect("tree");
        assert_eq!(tree.path, "1");
        assert_eq!(tree.level, 0);
        assert_eq!(tree.children[0].path, "1/2");
        assert_eq!(tree.children[0].level, 1);
    }

    #[test]
    fn orphans_are_dropped() {
        let tree = build_tree(vec![node(1, 0, 0), node(2, 1, 0), node(5, 99, 0)], 1)
            .expect("tree");

        let mut edges = Vec::new();
        flatten(&tree, &mut edges);
        assert_eq!(edges, vec![(1, 2)]);
    }

    #[test]
    fn missing_root_yields_none() {
        assert!(build_tree(vec![node(2, 1, 0)], 1).is_none());
    }

    #[test]
    fn equal_positions_keep_input_order() {
        let tree = build_tree(
            vec![node(1, 0, 0), node(4, 1, 0), node(2, 1, 0), node(3, 1, 0)],
            1,
        )
        .expect("tree");
        let ids: Vec<i64> = tree.children.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![4, 2, 3]);
    }

    #[test]
    fn round_trip_preserves_relationships_and_order() {
        let input = vec![
            node(1, 0, 0),
            node(2, 1, 1),
            node(3, 1, 0),
            node(4, 3, 0),
            node(5, 3, 1),
        ];
        let tree = build_tree(input, 1).expect("tree");

        let mut edges = Vec::new();
        flatten(&tree, &mut edges);
        assert_eq!(edges, vec![(1, 3), (3, 4), (3, 5), (1, 2)]);
    }
}
