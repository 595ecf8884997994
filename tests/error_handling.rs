//! Error handling and edge case tests.

use std::cell::RefCell;
use std::rc::Rc;
use undoring::{History, HistoryConfig, HistoryError, Journal, Mode, Side};

fn inverse_history(config: HistoryConfig) -> (History<u32>, Rc<RefCell<Vec<u32>>>) {
    let released = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&released);
    let history = History::<u32>::new(config)
        .with_apply(|atom, comp| {
            for record in atom.iter().rev() {
                let _ = comp.push(record.item, record.size);
            }
        })
        .with_release(move |record| sink.borrow_mut().push(record.item));
    (history, released)
}

fn push_atom(history: &mut History<u32>, item: u32, size: usize) {
    history.push_item(item, size).unwrap();
    history.push_separator(true);
}

// --- Empty sides ---

#[test]
fn test_undo_on_empty_history() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    let err = history.do_undo().unwrap_err();
    assert!(matches!(err, HistoryError::NothingToUndo));
    assert!(err.is_empty());
    assert!(!err.is_busy());
}

#[test]
fn test_redo_on_empty_history() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    push_atom(&mut history, 1, 1);
    let err = history.do_redo().unwrap_err();
    assert!(matches!(err, HistoryError::NothingToRedo));
    assert_eq!(history.undo_depth(), 1);
}

#[test]
fn test_error_messages() {
    assert_eq!(HistoryError::NothingToUndo.to_string(), "Nothing to undo");
    assert_eq!(
        HistoryError::Busy(Mode::Redoing).to_string(),
        "History is busy: Redoing in progress"
    );
    assert_eq!(
        HistoryError::CapacityExceeded(Side::Redo).to_string(),
        "Redo side is at its depth ceiling"
    );
    assert_eq!(
        HistoryError::ChecksumMismatch { expected: 1, got: 2 }.to_string(),
        "Checksum mismatch: expected 1, got 2"
    );
}

// --- Undo/redo in progress ---

#[test]
fn test_compensation_sees_redo_mode() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    push_atom(&mut history, 1, 1);
    history.do_undo().unwrap();

    history
        .redo_with(|atom, comp| {
            comp.push(atom.records()[0].item, 1).unwrap();
            assert_eq!(comp.mode(), Mode::Redoing);
            assert!(comp.history().is_performing_redo());
            assert!(!comp.history().is_performing_undo());
        })
        .unwrap();

    assert_eq!(history.mode(), Mode::Idle);
    let err = history.redo_with(|_, _| {}).unwrap_err();
    assert!(matches!(err, HistoryError::NothingToRedo));
}

#[test]
fn test_compensation_push_respects_redo_ceiling() {
    let (mut history, released) = inverse_history(HistoryConfig::new(0, Some(0), 0));
    push_atom(&mut history, 7, 3);

    let mut rejected = None;
    history
        .undo_with(|atom, comp| {
            rejected = Some(comp.push(atom.records()[0].item, 3));
        })
        .unwrap();

    assert!(matches!(
        rejected,
        Some(Err(HistoryError::CapacityExceeded(Side::Redo)))
    ));
    assert_eq!(history.redo_depth(), 0);
    assert_eq!(history.undo_depth(), 0);
    // Once for the rejected compensation, once for the undone atom.
    assert_eq!(released.borrow().as_slice(), &[7, 7]);
}

#[test]
fn test_push_redo_item_without_room() {
    let (mut history, released) = inverse_history(HistoryConfig::new(1, None, 0));
    push_atom(&mut history, 1, 1);
    assert!(history.undo_full());

    let err = history.push_redo_item(2, 1).unwrap_err();
    assert!(matches!(err, HistoryError::CapacityExceeded(Side::Redo)));
    assert_eq!(released.borrow().as_slice(), &[2]);
    assert_eq!(history.redo_depth(), 0);
}

// --- Swap ---

#[test]
fn test_swap_last_on_empty_history() {
    let (mut history, released) = inverse_history(HistoryConfig::default());
    assert!(matches!(
        history.swap_last_item(3, 1),
        Err(HistoryError::NoRecord)
    ));
    assert_eq!(released.borrow().as_slice(), &[3]);
}

#[test]
fn test_swap_last_scenario() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    history.push_item(10, 5).unwrap();

    let (old, old_size) = history.swap_last_item(11, 8).unwrap();
    assert_eq!(old, 10);
    assert_eq!(old_size, 5);
    assert_eq!(history.pending_size(), 8);

    history.push_separator(true);
    assert_eq!(history.undo_size(), 8);
}

// --- Limits ---

#[test]
fn test_zero_size_atoms_under_size_limit() {
    let (mut history, _) = inverse_history(HistoryConfig::unlimited().with_max_size(1));
    for i in 0..10 {
        push_atom(&mut history, i, 0);
    }
    assert_eq!(history.undo_depth(), 10);
    assert_eq!(history.size(), 0);
    assert!(!history.is_irreversible());
}

#[test]
fn test_single_atom_larger_than_budget() {
    let (mut history, released) = inverse_history(HistoryConfig::unlimited().with_max_size(4));
    push_atom(&mut history, 1, 5);

    assert_eq!(history.undo_depth(), 0);
    assert!(history.is_irreversible());
    assert!(history.is_modified());
    assert_eq!(released.borrow().as_slice(), &[1]);
}

#[test]
fn test_set_max_depth_zero_means_unlimited() {
    let (mut history, _) = inverse_history(HistoryConfig::new(2, None, 0));
    push_atom(&mut history, 1, 1);
    push_atom(&mut history, 2, 1);
    history.set_max_depth(0, None).unwrap();
    push_atom(&mut history, 3, 1);
    assert_eq!(history.undo_depth(), 3);
    assert!(!history.is_irreversible());
}

#[test]
fn test_clear_on_empty_history() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    assert!(!history.clear_undo_only().unwrap());
    assert!(!history.clear_redo_only().unwrap());
    assert!(!history.is_irreversible());
    history.reset(false).unwrap();
    history.validate().unwrap();
}

// --- Config ---

#[test]
fn test_invalid_config_json() {
    let result = HistoryConfig::from_json(r#"{"max_undo_depth": "deep"}"#);
    assert!(matches!(result, Err(HistoryError::Deserialization(_))));
}

// --- Journal ---

#[test]
fn test_truncated_journal() {
    let (mut history, _) = inverse_history(HistoryConfig::default());
    push_atom(&mut history, 1, 1);
    let bytes = Journal::capture(&history, |&i| i).unwrap().to_bytes().unwrap();

    let result = Journal::<u32>::from_bytes(&bytes[..bytes.len() - 2]);
    assert!(matches!(
        result,
        Err(HistoryError::ChecksumMismatch { .. })
    ));
}

#[test]
fn test_journal_body_of_wrong_type() {
    let journal: Journal<String> = Journal::default();
    let bytes = journal.to_bytes().unwrap();
    // An empty journal decodes as any item type.
    assert!(Journal::<u32>::from_bytes(&bytes).unwrap().is_empty());

    let bad = Journal::<u32>::from_json(r#"{"undo": 3}"#);
    assert!(matches!(bad, Err(HistoryError::Deserialization(_))));
}

#[test]
fn test_restore_over_limit() {
    let (mut source, _) = inverse_history(HistoryConfig::unlimited());
    for i in 0..3 {
        push_atom(&mut source, i, 1);
    }
    source.do_undo().unwrap();
    source.do_undo().unwrap();
    let journal = Journal::capture(&source, |&i| i).unwrap();

    let (mut target, _) = inverse_history(HistoryConfig::new(2, None, 0));
    let result = journal.restore(&mut target, |i| i);
    assert!(matches!(result, Err(HistoryError::CapacityExceeded(Side::Redo))));
    target.validate().unwrap();
}
