#![no_main]

use libfuzzer_sys::fuzz_target;
use rulenav_core::{ExpansionState, annotate, visible_count, visible_rows};
use rulenav_runtime::parse_hierarchy;

fuzz_target!(|data: &[u8]| {
    let Ok(body) = std::str::from_utf8(data) else {
        return;
    };
    if body.len() > 4096 {
        return;
    }

    // Malformed payloads must surface as errors, never panics.
    let Ok(hierarchy) = parse_hierarchy(body) else {
        return;
    };
    let Some(root) = hierarchy.root() else {
        return;
    };

    let mut expansion = ExpansionState::new();
    expansion.seed_if_empty(root.id());
    for selected in [None, Some(root.id())] {
        let Some(tree) = annotate(Some(root), &expansion, selected) else {
            panic!("non-empty hierarchy must annotate");
        };
        assert_eq!(tree.node_count(), root.node_count());
        assert_eq!(tree.to_rule(), *root);
        assert_eq!(visible_rows(&tree).len(), visible_count(&tree));
    }
});
