#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use rulenav_core::{Hierarchy, MappingRule};
use rulenav_runtime::{
    FetchError, MappingsNav, NavMsg, NotificationBus, ProgramSimulator, StaticSource,
};

#[derive(Arbitrary, Debug)]
enum Event {
    Reload,
    Fail,
    Select { node: u8, parent: Option<u8> },
    Toggle(u8),
    Current(Option<u8>),
    Resolve(u8),
}

fn id(n: u8) -> String {
    format!("n{}", n % 8)
}

fn tree() -> MappingRule {
    let mut root = MappingRule::root("n0");
    for i in 1..4u8 {
        let mut object = MappingRule::object(id(i));
        for j in 0..2u8 {
            object = object.child(MappingRule::object(id(i + 3 + j)));
        }
        root = root.child(object);
    }
    root
}

fuzz_target!(|events: Vec<Event>| {
    if events.len() > 256 {
        return;
    }
    let source = StaticSource::new(Hierarchy::new(tree()));
    let mut sim =
        ProgramSimulator::new(MappingsNav::new(source.clone(), NotificationBus::new()))
            .defer_tasks();
    sim.init();

    let mut loaded = false;
    for event in events {
        match event {
            Event::Reload => sim.send(NavMsg::Reload),
            Event::Fail => source.set_response(Err(FetchError::Unavailable("fuzz".into()))),
            Event::Select { node, parent } => sim.send(NavMsg::SelectionChanged {
                new_selected_id: id(node),
                parent_id: parent.map(id),
            }),
            Event::Toggle(n) => sim.send(NavMsg::ToggleExpand(id(n))),
            Event::Current(n) => sim.send(NavMsg::CurrentRule(n.map(id))),
            Event::Resolve(i) => {
                let pending = sim.pending_tasks().len();
                if pending > 0 {
                    sim.resolve_task(usize::from(i) % pending);
                }
            }
        }

        let view = sim.view();
        let nav = sim.model();
        // A failed fetch never drops a loaded tree.
        assert_eq!(view.tree.is_some(), nav.tree().is_some());
        loaded |= nav.tree().is_some();
        assert_eq!(loaded, nav.tree().is_some());
        if let Some(tree) = &view.tree {
            assert!(tree.highlighted_ids().len() <= tree.node_count());
        }
    }
});
