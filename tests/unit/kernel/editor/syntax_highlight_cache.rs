use super::*;
use crate::kernel::grammar::RuleId;
use crate::kernel::scope::ScopePath;

fn cached(state: RuleStack) -> CachedLine {
    CachedLine {
        tokens: Arc::from(vec![Token {
            range: 0..1,
            scopes: ScopePath::empty(),
        }]),
        end_state: state,
        degraded: false,
    }
}

fn inside() -> RuleStack {
    RuleStack::empty().push(RuleId::new(1), None, ScopePath::empty(), ScopePath::empty())
}

fn filled(line_count: usize) -> LineStateCache {
    let mut cache = LineStateCache::new(line_count);
    for line in 0..line_count {
        cache.store(line, cached(RuleStack::empty()));
        cache.settle_line(line, false);
    }
    cache
}

#[test]
fn new_cache_is_dirty_from_the_first_line() {
    let cache = LineStateCache::new(3);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.first_dirty(), Some(0));
    assert_eq!(cache.dirty_segments(), vec![(0, 3)]);
    assert_eq!(LineStateCache::new(0).len(), 1);
}

#[test]
fn settling_every_line_leaves_nothing_pending() {
    let cache = filled(3);
    assert_eq!(cache.first_dirty(), None);
    assert!(cache.dirty_segments().is_empty());
}

#[test]
fn apply_edit_shape_shift_splice_keeps_alignment() {
    let mut cache = filled(3);
    cache.store(2, cached(inside()));

    // Line 1 split into two lines.
    cache.apply_edit_shape_shift(&EditEvent::new(1, 2, 2), 4);

    assert_eq!(cache.len(), 4);
    assert!(cache.line(0).is_some());
    assert!(cache.line(1).is_none());
    // The old line 1 result stays as the baseline of the new last line.
    assert!(cache.line(2).is_some());
    assert_eq!(cache.line(3).map(|l| &l.end_state), Some(&inside()));
    assert_eq!(cache.first_dirty(), Some(1));
    assert_eq!(cache.dirty_segments(), vec![(1, 3)]);
}

#[test]
fn apply_edit_shape_shift_join_drops_lines() {
    let mut cache = filled(4);
    cache.apply_edit_shape_shift(&EditEvent::new(1, 3, 1), 2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.dirty_segments(), vec![(1, 2)]);
    assert_eq!(cache.first_dirty(), Some(1));
}

#[test]
fn removed_lines_keep_the_moved_up_result_as_baseline() {
    let mut cache = filled(5);
    cache.store(3, cached(inside()));

    // Lines 1 and 2 deleted outright.
    cache.apply_edit_shape_shift(&EditEvent::new(1, 3, 0), 3);

    assert_eq!(cache.len(), 3);
    assert_eq!(cache.line(1).map(|l| &l.end_state), Some(&inside()));
    assert_eq!(cache.first_dirty(), Some(1));
    assert_eq!(cache.dirty_segments(), vec![(1, 2)]);
}

#[test]
fn removing_trailing_or_all_lines() {
    let mut cache = filled(3);
    cache.apply_edit_shape_shift(&EditEvent::new(2, 3, 0), 2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.first_dirty(), None);
    assert!(cache.line(1).is_some());

    let mut cache = filled(3);
    cache.apply_edit_shape_shift(&EditEvent::new(0, 3, 0), 1);
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.dirty_segments(), vec![(0, 1)]);
}

#[test]
fn incoming_state_is_previous_outgoing_state() {
    let mut cache = filled(2);
    cache.store(0, cached(inside()));
    assert_eq!(cache.incoming_state(0), RuleStack::empty());
    assert_eq!(cache.incoming_state(1), inside());
}

#[test]
fn converged_line_skips_to_next_changed_line() {
    let mut cache = filled(6);
    cache.apply_edit_shape_shift(&EditEvent::line(1), 6);
    cache.apply_edit_shape_shift(&EditEvent::line(4), 6);
    assert_eq!(cache.first_dirty(), Some(1));

    cache.store(1, cached(RuleStack::empty()));
    cache.settle_line(1, true);
    assert_eq!(cache.first_dirty(), Some(4));

    cache.store(4, cached(RuleStack::empty()));
    cache.settle_line(4, true);
    assert_eq!(cache.first_dirty(), None);
}

#[test]
fn unconverged_line_moves_to_the_next_line() {
    let mut cache = filled(3);
    cache.apply_edit_shape_shift(&EditEvent::line(0), 3);
    cache.store(0, cached(inside()));
    cache.settle_line(0, false);
    assert_eq!(cache.first_dirty(), Some(1));
}

#[test]
fn earlier_edit_keeps_interrupted_pass_pending() {
    let mut cache = filled(6);
    cache.apply_edit_shape_shift(&EditEvent::line(2), 6);
    // Pass reached line 4 without converging.
    for line in 2..4 {
        cache.store(line, cached(inside()));
        cache.settle_line(line, false);
    }
    assert_eq!(cache.first_dirty(), Some(4));

    cache.apply_edit_shape_shift(&EditEvent::line(0), 6);
    assert_eq!(cache.first_dirty(), Some(0));
    assert_eq!(cache.dirty_segments(), vec![(0, 1), (4, 5)]);

    cache.store(0, cached(RuleStack::empty()));
    cache.settle_line(0, true);
    assert_eq!(cache.first_dirty(), Some(4));
}

#[test]
fn ensure_shape_follows_the_document() {
    let mut cache = filled(2);
    cache.ensure_shape(4);
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.first_dirty(), Some(1));
    assert_eq!(cache.dirty_segments(), vec![(1, 4)]);

    let mut cache = filled(4);
    cache.ensure_shape(2);
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.first_dirty(), Some(1));
}

#[test]
fn inconsistent_edit_resets_the_cache() {
    let mut cache = filled(2);
    cache.apply_edit_shape_shift(&EditEvent::new(1, 5, 1), 3);
    assert_eq!(cache.len(), 3);
    assert_eq!(cache.dirty_segments(), vec![(0, 3)]);
}
