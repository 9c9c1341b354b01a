use super::*;
use proptest::prelude::*;

fn check_invariants(tree: &AvlTree<i32>) {
    let mut count = 0;
    if let Some(root) = tree.root() {
        assert!(tree.node(root).parent.is_none());
        count = check_subtree(tree, root);
    }
    assert_eq!(count, tree.len() as u32);

    // the neighbor list visits every node in nondecreasing order
    let values: Vec<i32> = tree.iter().map(|id| *tree.value(id)).collect();
    assert_eq!(values.len(), tree.len());
    assert!(values.windows(2).all(|w| w[0] <= w[1]), "{values:?}");

    // select agrees with the traversal
    for (n, id) in tree.iter().enumerate() {
        assert_eq!(tree.select(n), Some(id));
    }
    assert_eq!(tree.select(tree.len()), None);
}

fn check_subtree(tree: &AvlTree<i32>, id: NodeId) -> u32 {
    let node = tree.node(id);
    let mut len = 1;
    let mut level = 0;
    if let Some(l) = node.left {
        assert_eq!(tree.node(l).parent, Some(id));
        assert!(tree.value(l) <= tree.value(id));
        len += check_subtree(tree, l);
        level = tree.node(l).level;
    }
    let mut rlevel = 0;
    if let Some(r) = node.right {
        assert_eq!(tree.node(r).parent, Some(id));
        // duplicates descend left on insert, but rotations may move an equal
        // key into a right subtree
        assert!(tree.value(r) >= tree.value(id));
        len += check_subtree(tree, r);
        rlevel = tree.node(r).level;
    }
    assert_eq!(node.len, len);
    assert_eq!(node.level, level.max(rlevel) + 1);
    assert_eq!(node.factor as i64, rlevel as i64 - level as i64);
    assert!(node.factor.abs() <= 1, "unbalanced node {id:?}");
    len
}

fn build(values: &[i32]) -> AvlTree<i32> {
    let mut tree = AvlTree::new();
    for &v in values {
        tree.insert(v, i32::cmp);
        check_invariants(&tree);
    }
    tree
}

#[test]
fn insert_single_rotation() {
    // ascending insert forces left rotations
    let tree = build(&[1, 2, 3, 4, 5]);
    assert_eq!(*tree.value(tree.root().unwrap()), 2);

    // descending insert forces right rotations
    let tree = build(&[5, 4, 3, 2, 1]);
    assert_eq!(*tree.value(tree.root().unwrap()), 4);
}

#[test]
fn insert_double_rotation() {
    let tree = build(&[2, 9, 5]);
    assert_eq!(*tree.value(tree.root().unwrap()), 5);

    let tree = build(&[9, 2, 5]);
    assert_eq!(*tree.value(tree.root().unwrap()), 5);
}

#[test]
fn remove_min_drains_in_order() {
    let mut tree = build(&[6, 3, 8, 1, 0, 9, 4, 7, 2, 5]);
    for expected in 0..10 {
        assert_eq!(tree.remove_min(), Some(expected));
        check_invariants(&tree);
    }
    assert_eq!(tree.remove_min(), None);
    assert!(tree.is_empty());
}

#[test]
fn remove_inner_node() {
    let mut tree = build(&[5, 2, 8, 1, 3, 7, 9, 4]);
    let id = tree.search(|v| 5.cmp(v)).unwrap();
    assert_eq!(tree.remove_node(id), 5);
    check_invariants(&tree);
    assert_eq!(tree.search(|v| 5.cmp(v)), None);
    let values: Vec<i32> = tree.iter().map(|id| *tree.value(id)).collect();
    assert_eq!(values, [1, 2, 3, 4, 7, 8, 9]);
}

#[test]
fn remove_keeps_other_handles_valid() {
    let mut tree = AvlTree::new();
    let ids: Vec<NodeId> = (0..32).map(|v| tree.insert(v, i32::cmp)).collect();

    // remove every even value by handle; odd handles must still resolve
    for (v, &id) in ids.iter().enumerate() {
        if v % 2 == 0 {
            assert_eq!(tree.remove_node(id), v as i32);
            check_invariants(&tree);
        }
    }
    for (v, &id) in ids.iter().enumerate() {
        if v % 2 == 1 {
            assert_eq!(*tree.value(id), v as i32);
        }
    }
}

#[test]
fn insert_before_and_after() {
    // duplicate keys placed positionally: build [10, 20, 30], then wedge
    // neighbors around the middle node without a root search.
    let mut tree = AvlTree::new();
    tree.insert(10, i32::cmp);
    let mid = tree.insert(20, i32::cmp);
    tree.insert(30, i32::cmp);

    let l = tree.insert_before(mid, 19);
    let r = tree.insert_after(mid, 21);
    tree.rebalance_to_root(mid);
    check_invariants(&tree);

    assert_eq!(tree.prev(mid), Some(l));
    assert_eq!(tree.next(mid), Some(r));
    let values: Vec<i32> = tree.iter().map(|id| *tree.value(id)).collect();
    assert_eq!(values, [10, 19, 20, 21, 30]);
}

#[test]
fn search_three_way() {
    let tree = build(&[4, 1, 7, 0, 2, 5, 9]);
    for v in [0, 1, 2, 4, 5, 7, 9] {
        let id = tree.search(|stored| v.cmp(stored)).unwrap();
        assert_eq!(*tree.value(id), v);
    }
    assert_eq!(tree.search(|stored| 3.cmp(stored)), None);
    assert_eq!(tree.search(|stored| 100.cmp(stored)), None);
}

proptest! {
    #[test]
    fn prop_fuzz_insert_remove(values in proptest::collection::vec(-100..100i32, 0..64)) {
        let mut tree = AvlTree::new();
        let mut model = values.clone();
        for &v in &values {
            tree.insert(v, i32::cmp);
        }
        check_invariants(&tree);
        model.sort();
        let got: Vec<i32> = tree.iter().map(|id| *tree.value(id)).collect();
        prop_assert_eq!(&got, &model);

        while let Some(min) = tree.remove_min() {
            prop_assert_eq!(min, model.remove(0));
            check_invariants(&tree);
        }
        prop_assert!(model.is_empty());
    }

    #[test]
    fn prop_fuzz_remove_by_handle(
        values in proptest::collection::vec(0..1000i32, 1..64),
        seed in 0..u64::MAX,
    ) {
        use rand::seq::SliceRandom;
        use rand::SeedableRng;

        let mut tree = AvlTree::new();
        let mut handles: Vec<(i32, NodeId)> = values
            .iter()
            .map(|&v| (v, tree.insert(v, i32::cmp)))
            .collect();

        let mut rng = rand::rngs::SmallRng::seed_from_u64(seed);
        handles.shuffle(&mut rng);

        for (v, id) in handles {
            prop_assert_eq!(tree.remove_node(id), v);
            check_invariants(&tree);
        }
        prop_assert!(tree.is_empty());
    }
}
