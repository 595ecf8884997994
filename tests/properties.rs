//! Property-based invariant tests for the undo ring.
//!
//! 1. Undo followed by redo restores depths and records
//! 2. Depth ceiling evicts the oldest atoms exactly once
//! 3. Size ceiling holds after every commit
//! 4. Separators group pushes into atoms
//! 5. A new edit drops the redo side in the same call
//! 6. Ring invariants survive arbitrary operation sequences
//! 7. Every record is released or handed back exactly once

use proptest::prelude::*;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use undoring::{History, HistoryConfig};

// ── Harness ─────────────────────────────────────────────────────────────

/// Counts record instances created and released.
#[derive(Clone, Default)]
struct Ledger {
    created: Rc<Cell<usize>>,
    released: Rc<RefCell<Vec<u32>>>,
}

/// History whose apply callback pushes the records back in reverse.
fn inverse_history(config: HistoryConfig) -> (History<u32>, Ledger) {
    let ledger = Ledger::default();
    let created = Rc::clone(&ledger.created);
    let released = Rc::clone(&ledger.released);
    let history = History::<u32>::new(config)
        .with_apply(move |atom, sink| {
            for record in atom.iter().rev() {
                created.set(created.get() + 1);
                let _ = sink.push(record.item, record.size);
            }
        })
        .with_release(move |record| released.borrow_mut().push(record.item));
    (history, ledger)
}

fn snapshot(history: &History<u32>) -> (Vec<Vec<(u32, usize)>>, Vec<Vec<(u32, usize)>>) {
    let side = |atoms: Vec<&undoring::Atom<u32>>| {
        atoms
            .into_iter()
            .map(|atom| atom.iter().map(|r| (r.item, r.size)).collect())
            .collect()
    };
    (
        side(history.undo_atoms().collect()),
        side(history.redo_atoms().collect()),
    )
}

// ── Strategies ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Op {
    Push(usize),
    Separator(bool),
    Undo,
    UndoDiscarding,
    Redo,
    RedoDiscarding,
    PushRedo(usize),
    Swap(usize),
    SetMaxDepth(usize, Option<usize>),
    SetMaxSize(usize, bool),
    ClearUndo,
    ClearRedo,
    Reset(bool),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        6 => (0usize..20).prop_map(Op::Push),
        3 => any::<bool>().prop_map(Op::Separator),
        3 => Just(Op::Undo),
        1 => Just(Op::UndoDiscarding),
        3 => Just(Op::Redo),
        1 => Just(Op::RedoDiscarding),
        1 => (0usize..20).prop_map(Op::PushRedo),
        1 => (0usize..20).prop_map(Op::Swap),
        1 => (0usize..12, proptest::option::of(0usize..6)).prop_map(|(u, r)| Op::SetMaxDepth(u, r)),
        1 => (0usize..200, any::<bool>()).prop_map(|(s, now)| Op::SetMaxSize(s, now)),
        1 => Just(Op::ClearUndo),
        1 => Just(Op::ClearRedo),
        1 => any::<bool>().prop_map(Op::Reset),
    ]
}

fn config_strategy() -> impl Strategy<Value = HistoryConfig> {
    (0usize..10, proptest::option::of(0usize..5), prop_oneof![Just(0usize), 10usize..200])
        .prop_map(|(depth, redo, size)| HistoryConfig::new(depth, redo, size))
}

/// Apply `ops`, returning how many records were handed back by swaps.
fn apply_ops(history: &mut History<u32>, ledger: &Ledger, ops: &[Op]) -> usize {
    let mut next_item = 0u32;
    let mut handed_back = 0;
    let mut fresh = || {
        next_item += 1;
        ledger.created.set(ledger.created.get() + 1);
        next_item
    };

    for op in ops {
        match op {
            Op::Push(size) => {
                let _ = history.push_item(fresh(), *size);
            }
            Op::Separator(now) => history.push_separator(*now),
            Op::Undo => {
                let _ = history.do_undo();
            }
            Op::UndoDiscarding => {
                let _ = history.undo_with(|_, _| {});
            }
            Op::Redo => {
                let _ = history.do_redo();
            }
            Op::RedoDiscarding => {
                let _ = history.redo_with(|_, _| {});
            }
            Op::PushRedo(size) => {
                let _ = history.push_redo_item(fresh(), *size);
            }
            Op::Swap(size) => {
                if history.swap_last_item(fresh(), *size).is_ok() {
                    handed_back += 1;
                }
            }
            Op::SetMaxDepth(undo, redo) => history.set_max_depth(*undo, *redo).unwrap(),
            Op::SetMaxSize(size, now) => history.set_max_size(*size, *now).unwrap(),
            Op::ClearUndo => {
                history.clear_undo_only().unwrap();
            }
            Op::ClearRedo => {
                history.clear_redo_only().unwrap();
            }
            Op::Reset(mark) => history.reset(*mark).unwrap(),
        }
    }
    handed_back
}

// ═══════════════════════════════════════════════════════════════════════
// 1. Round trip
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn undo_then_redo_restores_state(
        atoms in prop::collection::vec(prop::collection::vec(0usize..50, 1..5), 1..20),
    ) {
        let (mut history, _) = inverse_history(HistoryConfig::unlimited());
        let mut item = 0u32;
        for atom in &atoms {
            for &size in atom {
                item += 1;
                history.push_item(item, size).unwrap();
            }
            history.push_separator(true);
        }

        let before = snapshot(&history);
        let stats = history.stats();

        history.do_undo().unwrap();
        history.do_redo().unwrap();

        prop_assert_eq!(snapshot(&history), before);
        prop_assert_eq!(history.stats(), stats);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 2. Depth ceiling
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn depth_ceiling_evicts_oldest(max in 1usize..20, extra in 1usize..10) {
        let (mut history, ledger) = inverse_history(HistoryConfig::new(max, None, 0));
        let total = max + extra;
        for item in 0..total as u32 {
            history.push_item(item, 1).unwrap();
            history.push_separator(true);
        }

        prop_assert_eq!(history.undo_depth(), max);
        prop_assert!(history.is_irreversible());
        let expected: Vec<u32> = (0..extra as u32).collect();
        prop_assert_eq!(ledger.released.borrow().clone(), expected);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 3. Size ceiling
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn size_ceiling_holds_after_every_commit(
        max_size in 1usize..200,
        ops in prop::collection::vec(
            prop_oneof![
                4 => (0usize..60).prop_map(Op::Push),
                3 => any::<bool>().prop_map(Op::Separator),
                2 => Just(Op::Undo),
                2 => Just(Op::Redo),
                1 => (0usize..60).prop_map(Op::PushRedo),
            ],
            1..150,
        ),
    ) {
        let (mut history, ledger) = inverse_history(HistoryConfig::unlimited().with_max_size(max_size));
        for op in &ops {
            apply_ops(&mut history, &ledger, std::slice::from_ref(op));
            prop_assert!(
                history.size() <= max_size,
                "committed size {} over budget {}",
                history.size(),
                max_size
            );
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 4. Separator grouping
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn separators_group_pushes(groups in prop::collection::vec(1usize..6, 1..15)) {
        let (mut history, _) = inverse_history(HistoryConfig::unlimited());
        let mut item = 0u32;
        for (i, &len) in groups.iter().enumerate() {
            if i > 0 {
                history.push_separator(true);
            }
            for _ in 0..len {
                item += 1;
                history.push_item(item, 1).unwrap();
            }
        }
        history.push_separator(true);

        let lens: Vec<usize> = history.undo_atoms().map(|a| a.len()).collect();
        let expected: Vec<usize> = groups.iter().rev().copied().collect();
        prop_assert_eq!(lens, expected);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 5. Redo invalidation
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn new_edit_clears_redo(atoms in 1usize..10, undos in 1usize..10) {
        let (mut history, _) = inverse_history(HistoryConfig::unlimited());
        for item in 0..atoms as u32 {
            history.push_item(item, 1).unwrap();
            history.push_separator(true);
        }
        for _ in 0..undos.min(atoms) {
            history.do_undo().unwrap();
        }
        prop_assert!(history.redo_depth() > 0);

        history.push_item(1_000, 1).unwrap();
        prop_assert_eq!(history.redo_depth(), 0);
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 6. Ring invariants
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn ring_stays_consistent(
        config in config_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let (mut history, ledger) = inverse_history(config);
        for op in &ops {
            apply_ops(&mut history, &ledger, std::slice::from_ref(op));
            prop_assert!(history.validate().is_ok(), "invalid after {:?}", op);
            if let Some(max) = history.config().max_redo_depth {
                prop_assert!(history.redo_depth() <= max);
            }
            let max_depth = history.config().max_undo_depth;
            if max_depth > 0 {
                prop_assert!(history.depth() <= max_depth);
            }
            prop_assert_eq!(history.is_modified(), history.undo_depth() > 0 || history.is_irreversible());
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════
// 7. Release accounting
// ═══════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn every_record_released_once(
        config in config_strategy(),
        ops in prop::collection::vec(op_strategy(), 1..200),
    ) {
        let (mut history, ledger) = inverse_history(config);
        let handed_back = apply_ops(&mut history, &ledger, &ops);
        history.reset(false).unwrap();

        prop_assert_eq!(
            ledger.released.borrow().len() + handed_back,
            ledger.created.get()
        );
        prop_assert_eq!(history.depth(), 0);
        prop_assert_eq!(history.pending_len(), 0);
    }
}
