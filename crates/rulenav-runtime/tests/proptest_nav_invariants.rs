//! Property-based invariant tests for the navigation-tree coordinator.
//!
//! Random sequences of reloads, toggles, selection changes and fetch
//! completions (resolved in any order, succeeding or failing) are applied
//! to [`MappingsNav`] through a deferred simulator and checked against a
//! small reference model:
//!
//! 1. Once a tree is loaded it is never lost, whatever fails afterwards
//! 2. The root seed is applied at most once, and only into an empty store
//! 3. Expansion flags match the reference after every step
//! 4. The view agrees with the model on tree presence and loading
//! 5. Every reload issues exactly one fetch

use proptest::prelude::*;
use rulenav_core::{Hierarchy, MappingRule};
use rulenav_runtime::{
    FetchError, MappingsNav, NavMsg, NavPhase, NotificationBus, ProgramSimulator, StaticSource,
};
use std::collections::BTreeMap;

const IDS: [&str; 5] = ["root", "a", "b", "c", "ghost"];

fn tree() -> MappingRule {
    MappingRule::root("root")
        .child(MappingRule::object("a").child(MappingRule::object("b")))
        .child(MappingRule::object("c"))
}

// ── Strategy helpers ────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Reload,
    Toggle(usize),
    Select(usize, Option<usize>),
    CurrentRule(Option<usize>),
    Resolve { index: usize, succeed: bool },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    let id = 0..IDS.len();
    prop_oneof![
        2 => Just(Op::Reload),
        3 => id.clone().prop_map(Op::Toggle),
        2 => (id.clone(), proptest::option::of(id.clone())).prop_map(|(s, p)| Op::Select(s, p)),
        1 => proptest::option::of(id).prop_map(Op::CurrentRule),
        3 => (0usize..4, any::<bool>()).prop_map(|(index, succeed)| Op::Resolve { index, succeed }),
    ]
}

fn ops_strategy() -> impl Strategy<Value = Vec<Op>> {
    proptest::collection::vec(op_strategy(), 0..60)
}

// ── Reference model ─────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Reference {
    expansion: BTreeMap<&'static str, bool>,
    loaded: bool,
    seeds: usize,
    pending: usize,
    reloads: u64,
    phase: Option<NavPhase>,
}

impl Reference {
    fn get(&self, id: &str) -> bool {
        self.expansion.get(id).copied().unwrap_or(false)
    }
}

struct Harness {
    sim: ProgramSimulator<MappingsNav>,
    source: StaticSource,
    reference: Reference,
}

impl Harness {
    fn new() -> Self {
        let source = StaticSource::new(Hierarchy::new(tree()));
        let mut sim =
            ProgramSimulator::new(MappingsNav::new(source.clone(), NotificationBus::new()))
                .defer_tasks();
        sim.init();
        Self {
            sim,
            source,
            reference: Reference {
                pending: 1,
                phase: Some(NavPhase::Loading),
                ..Reference::default()
            },
        }
    }

    fn apply(&mut self, op: &Op) {
        let reference = &mut self.reference;
        match op {
            Op::Reload => {
                self.sim.send(NavMsg::Reload);
                reference.reloads += 1;
                reference.pending += 1;
                reference.phase = Some(NavPhase::Loading);
            }
            Op::Toggle(i) => {
                self.sim.send(NavMsg::ToggleExpand(IDS[*i].into()));
                if reference.loaded {
                    let next = !reference.get(IDS[*i]);
                    reference.expansion.insert(IDS[*i], next);
                }
            }
            Op::Select(selected, parent) => {
                self.sim.send(NavMsg::SelectionChanged {
                    new_selected_id: IDS[*selected].into(),
                    parent_id: parent.map(|p| IDS[p].to_owned()),
                });
                reference.expansion.insert(IDS[*selected], true);
                if let Some(p) = parent {
                    reference.expansion.insert(IDS[*p], true);
                }
            }
            Op::CurrentRule(id) => {
                self.sim
                    .send(NavMsg::CurrentRule(id.map(|i| IDS[i].to_owned())));
            }
            Op::Resolve { index, succeed } => {
                if reference.pending == 0 {
                    return;
                }
                let index = index % reference.pending;
                if *succeed {
                    self.source.set_response(Ok(Hierarchy::new(tree())));
                } else {
                    self.source
                        .set_response(Err(FetchError::Unavailable("offline".into())));
                }
                assert!(self.sim.resolve_task(index), "parked fetch {index} missing");
                reference.pending -= 1;
                if *succeed {
                    if reference.expansion.is_empty() {
                        reference.expansion.insert("root", true);
                        reference.seeds += 1;
                    }
                    reference.loaded = true;
                    reference.phase = Some(NavPhase::Ready);
                } else {
                    reference.phase = Some(NavPhase::Error);
                }
            }
        }
    }

    fn check(&self) -> Result<(), TestCaseError> {
        let model = self.sim.model();
        let reference = &self.reference;

        prop_assert_eq!(model.tree().is_some(), reference.loaded);
        prop_assert!(reference.seeds <= 1);
        for id in IDS {
            prop_assert_eq!(model.expansion().get(id), reference.get(id), "flag of {}", id);
        }
        prop_assert_eq!(model.expansion().len(), reference.expansion.len());

        let view = self.sim.view();
        prop_assert_eq!(view.tree.is_some(), model.tree().is_some());
        prop_assert_eq!(view.loading, model.is_loading());
        prop_assert_eq!(Some(model.phase()), reference.phase);

        prop_assert_eq!(self.sim.pending_tasks().len(), reference.pending);
        prop_assert_eq!(model.requests_issued(), 1 + reference.reloads);
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 1-5. Coordinator state tracks the reference across any event order
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn coordinator_matches_reference(ops in ops_strategy()) {
        let mut harness = Harness::new();
        harness.check()?;
        for op in &ops {
            harness.apply(op);
            harness.check()?;
        }
    }

    #[test]
    fn loaded_tree_survives_later_failures(
        before in ops_strategy(),
        after in ops_strategy(),
    ) {
        let mut harness = Harness::new();
        for op in &before {
            harness.apply(op);
        }
        harness.apply(&Op::Reload);
        let last = harness.reference.pending - 1;
        harness.apply(&Op::Resolve { index: last, succeed: true });
        prop_assert!(harness.sim.model().tree().is_some());

        harness.source.set_response(Err(FetchError::Unavailable("offline".into())));
        for op in &after {
            let op = match op {
                Op::Resolve { index, .. } => Op::Resolve { index: *index, succeed: false },
                other => other.clone(),
            };
            harness.apply(&op);
            prop_assert!(harness.sim.model().tree().is_some());
            prop_assert!(harness.sim.view().tree.is_some());
        }
    }

    #[test]
    fn untouched_store_seeds_root_only(resolutions in proptest::collection::vec(any::<bool>(), 1..8)) {
        let mut harness = Harness::new();
        for _ in 1..resolutions.len() {
            harness.apply(&Op::Reload);
        }
        for succeed in resolutions {
            harness.apply(&Op::Resolve { index: 0, succeed });
        }
        let expanded = harness.sim.model().expansion().expanded_ids();
        if harness.reference.loaded {
            prop_assert_eq!(expanded, vec!["root"]);
        } else {
            prop_assert!(expanded.is_empty());
        }
    }
}
