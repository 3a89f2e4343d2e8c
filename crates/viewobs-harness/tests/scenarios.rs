#![forbid(unsafe_code)]

//! Integration tests: end-to-end observer scenarios against the mock
//! capability.

use pretty_assertions::assert_eq;
use viewobs_core::dom::NodeRef;
use viewobs_core::{IntersectionEntry, ObservationConfig, Platform, ResolvedRoot, Threshold};
use viewobs_harness::{
    BatchRecorder, EmissionRecorder, Fixture, ManualClock, MockIntersectionSource, Timeline, ms,
};
use viewobs_runtime::source::Delivery;
use viewobs_runtime::{ObserverState, RuntimeConfig, ViewObserver, VisibilityObserver};

type Observer = ViewObserver<NodeRef, MockIntersectionSource>;

/// Attach an observer whose batch arrivals are stamped by the returned clock.
fn attach_timed(fixture: &Fixture) -> (MockIntersectionSource, Observer, ManualClock) {
    let source = MockIntersectionSource::new();
    let clock = ManualClock::new();
    let observer = ViewObserver::with_clock(
        fixture.target.clone(),
        source.clone(),
        Platform::Browser,
        &RuntimeConfig::default(),
        clock.clone(),
    );
    (source, observer, clock)
}

fn attach(fixture: &Fixture) -> (MockIntersectionSource, Observer) {
    let (source, observer, _clock) = attach_timed(fixture);
    (source, observer)
}

// ============================================================================
// Basic visibility
// ============================================================================

#[test]
fn visible_then_hidden_with_defaults() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    let mut timeline = Timeline::new();

    observer.step(clock.now());
    let created = source.last_created().expect("handle created on first step");
    assert_eq!(created.options.threshold, Threshold::Single(0.1));
    assert_eq!(created.options.root_margin.as_str(), "0px");
    assert!(created.options.root.is_viewport());
    assert_eq!(created.target, fixture.target);
    timeline.configured(clock.now(), created.generation, "viewport");

    source.fire_intersecting(true);
    timeline.fired(clock.now(), created.generation, &[true]);
    let result = observer.step(clock.advance(ms(1)));
    timeline.stepped(clock.now(), &result);
    let result = observer.step(clock.advance(ms(11)));
    timeline.stepped(clock.now(), &result);
    assert_eq!(emissions.values(), vec![true], "{}", timeline.to_jsonl());

    source.fire_intersecting(false);
    observer.step(clock.advance(ms(1)));
    observer.step(clock.advance(ms(11)));
    assert_eq!(emissions.values(), vec![true, false]);
    assert_eq!(observer.is_visible(), Some(false));
}

#[test]
fn burst_within_one_window_emits_last_value_once() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(clock.now());

    let values = [true, false, true, true, false, true, false];
    for value in values {
        source.fire_intersecting(value);
        observer.step(clock.advance(ms(1)));
    }
    assert_eq!(emissions.count(), 0);

    // The last value arrived at 6ms.
    observer.step(clock.advance(ms(9)));
    assert_eq!(emissions.count(), 0);
    observer.step(clock.advance(ms(1)));
    assert_eq!(emissions.values(), vec![false]);

    observer.step(clock.advance(ms(100)));
    assert_eq!(emissions.count(), 1);
}

#[test]
fn burst_across_animation_frames_emits_last_value_once() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    let mut timeline = Timeline::new();
    observer.step(clock.now());

    clock.set(ms(10));
    source.fire_intersecting(true);
    timeline.fired(clock.now(), 1, &[true]);
    let result = observer.step(clock.set(ms(16)));
    timeline.stepped(clock.now(), &result);

    clock.set(ms(20));
    source.fire_intersecting(false);
    timeline.fired(clock.now(), 1, &[false]);
    for frame in [32, 48, 64] {
        let result = observer.step(clock.set(ms(frame)));
        timeline.stepped(clock.now(), &result);
    }

    assert_eq!(emissions.values(), vec![false], "{}", timeline.to_jsonl());
}

#[test]
fn one_late_tick_replays_arrivals_in_order() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(clock.now());

    source.fire_intersecting(true);
    clock.set(ms(15));
    source.fire_intersecting(false);
    clock.set(ms(20));
    source.fire_intersecting(true);

    let result = observer.step(clock.set(ms(40)));
    assert_eq!(result.batches_processed, 3);
    // `false` was superseded 5ms after it arrived.
    assert_eq!(emissions.values(), vec![true, true]);
}

#[test]
fn events_more_than_a_window_apart_emit_in_order() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(clock.now());

    source.fire_intersecting(false);
    observer.step(clock.now());
    clock.advance(ms(12));
    source.fire_intersecting(true);
    observer.step(clock.now());
    observer.step(clock.advance(ms(12)));

    assert_eq!(emissions.values(), vec![false, true]);
}

#[test]
fn repeated_equal_values_each_settle() {
    let fixture = Fixture::new();
    let (source, mut observer, clock) = attach_timed(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(clock.now());

    for _ in 0..3 {
        source.fire_intersecting(true);
        observer.step(clock.now());
        observer.step(clock.advance(ms(11)));
    }
    assert_eq!(emissions.values(), vec![true, true, true]);
}

#[test]
fn first_record_of_a_batch_decides() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(ms(0));

    source.fire(vec![
        IntersectionEntry::new(false, 0.0),
        IntersectionEntry::new(true, 0.8),
    ]);
    observer.step(ms(0));
    observer.step(ms(11));
    assert_eq!(emissions.values(), vec![false]);
}

// ============================================================================
// Root resolution
// ============================================================================

#[test]
fn ancestor_selector_before_first_activation() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    observer.ancestor_selector().set(Some(".ancestor".into()));
    observer.step(ms(0));

    assert_eq!(source.create_count(), 1);
    assert_eq!(
        source.last_created().map(|c| c.options.root),
        Some(ResolvedRoot::Ancestor(fixture.ancestor.clone()))
    );
}

#[test]
fn selector_changes_move_the_root() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    observer.step(ms(0));
    assert!(source.last_created().is_some_and(|c| c.options.root.is_viewport()));

    observer.ancestor_selector().set(Some("section.page".into()));
    observer.step(ms(1));
    assert_eq!(
        source.last_created().map(|c| c.options.root),
        Some(ResolvedRoot::Ancestor(fixture.page.clone()))
    );

    observer.ancestor_selector().set(Some(".missing".into()));
    observer.step(ms(2));
    assert!(source.last_created().is_some_and(|c| c.options.root.is_viewport()));

    observer.ancestor_selector().set(Some("#list".into()));
    observer.step(ms(3));
    assert_eq!(
        source.last_created().map(|c| c.options.root),
        Some(ResolvedRoot::Ancestor(fixture.ancestor.clone()))
    );

    observer.ancestor_selector().set(Some(String::new()));
    observer.step(ms(4));
    assert!(source.last_created().is_some_and(|c| c.options.root.is_viewport()));

    observer.ancestor_selector().set(None);
    observer.step(ms(5));
    // None after "" is still a change of input, hence one more handle.
    assert_eq!(source.create_count(), 6);
    assert_eq!(source.max_alive(), 1);
    assert_eq!(source.disposed(), vec![1, 2, 3, 4, 5]);
}

#[test]
fn descendant_selector_resolves_the_scroll_container() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    observer.ancestor_selector().set(Some(".page .ancestor".into()));
    observer.step(ms(0));
    assert_eq!(
        source.last_created().map(|c| c.options.root),
        Some(ResolvedRoot::Ancestor(fixture.ancestor.clone()))
    );

    observer.ancestor_selector().set(Some("aside .ancestor".into()));
    observer.step(ms(1));
    assert!(source.last_created().is_some_and(|c| c.options.root.is_viewport()));
}

#[test]
fn root_is_resolved_against_the_tree_at_reconfiguration() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    observer.ancestor_selector().set(Some(".scroller".into()));
    observer.step(ms(0));
    assert!(source.last_created().is_some_and(|c| c.options.root.is_viewport()));

    // A matching class appearing later is picked up only by the next handle.
    fixture.ancestor.add_class("scroller");
    observer.step(ms(1));
    assert_eq!(source.create_count(), 1);

    observer.root_margin().set("10px".into());
    observer.step(ms(2));
    assert_eq!(
        source.last_created().map(|c| c.options.root),
        Some(ResolvedRoot::Ancestor(fixture.ancestor.clone()))
    );
}

// ============================================================================
// Teardown
// ============================================================================

#[test]
fn destroy_before_any_event() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(ms(0));
    observer.destroy();

    assert_eq!(source.disposed(), vec![1]);
    assert_eq!(source.fire_intersecting(true), Some(Delivery::Closed));
    observer.step(ms(100));
    drop(observer);
    assert_eq!(source.disposed(), vec![1]);
    assert_eq!(emissions.count(), 0);
}

#[test]
fn destroy_without_configuration_is_a_no_op() {
    let source = MockIntersectionSource::new();
    let mut observer: VisibilityObserver<NodeRef, _> =
        VisibilityObserver::new(source.clone(), Platform::Browser);
    observer.teardown();
    observer.teardown();
    assert_eq!(observer.state(), ObserverState::Disposed);
    assert!(source.disposed().is_empty());
    assert_eq!(source.create_count(), 0);
}

#[test]
fn destroy_mid_window_suppresses_emission() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    let mut timeline = Timeline::new();
    observer.step(ms(0));

    source.fire_intersecting(true);
    observer.step(ms(3));
    assert_eq!(observer.controller().pending_visibility(), Some(true));
    observer.destroy();
    timeline.destroyed(ms(5));

    let result = observer.step(ms(50));
    timeline.stepped(ms(50), &result);
    assert_eq!(emissions.count(), 0, "{}", timeline.to_jsonl());
    assert!(observer.visible_change().is_detached());
}

// ============================================================================
// Reconfiguration and stale delivery
// ============================================================================

#[test]
fn batches_from_a_replaced_handle_are_dropped() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(ms(0));

    observer.threshold().set(Threshold::from([0.0, 0.5, 1.0]));
    observer.step(ms(1));
    assert_eq!(
        source.fire_on(1, vec![IntersectionEntry::visible()]),
        Some(Delivery::Stale)
    );
    observer.step(ms(2));
    observer.step(ms(30));
    assert_eq!(emissions.count(), 0);
    assert_eq!(observer.controller().stale_batches(), 1);
}

#[test]
fn pending_value_survives_reconfiguration() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(ms(0));

    source.fire_intersecting(true);
    observer.step(ms(2));
    observer.root_margin().set("20px".into());
    observer.step(ms(5));
    assert_eq!(source.create_count(), 2);
    observer.step(ms(13));
    assert_eq!(emissions.values(), vec![true]);
}

#[test]
fn delivery_inside_create_waits_for_the_handle() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    source.deliver_on_create(vec![IntersectionEntry::visible()]);

    let result = observer.step(ms(0));
    assert!(observer.controller().has_live_handle());
    assert_eq!(result.batches_processed, 1);
    assert_eq!(observer.controller().pending_visibility(), Some(true));
    observer.step(ms(11));
    assert_eq!(emissions.values(), vec![true]);
}

#[test]
fn rejected_options_leave_observer_running_without_handle() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    source.reject("rootMargin must be specified in pixels or percent");
    observer.root_margin().set("10em".into());
    observer.step(ms(0));
    assert_eq!(observer.state(), ObserverState::Observing);
    assert!(!observer.controller().has_live_handle());
    assert_eq!(source.fire_intersecting(true), None);

    source.accept();
    observer.root_margin().set("10px".into());
    observer.step(ms(1));
    assert!(observer.controller().has_live_handle());
    assert_eq!(observer.controller().stats().create_failures, 1);
}

// ============================================================================
// Raw callback
// ============================================================================

#[test]
fn raw_callback_receives_every_batch_with_handle_info() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let batches = BatchRecorder::new();
    observer.observer_callback().set(Some(batches.callback()));
    observer.ancestor_selector().set(Some(".ancestor".into()));
    observer.step(ms(0));

    source.fire(vec![IntersectionEntry::visible(), IntersectionEntry::hidden()]);
    source.fire(Vec::new());
    observer.step(ms(1));

    let seen = batches.batches();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[0].generation, 1);
    assert_eq!(seen[0].entries.len(), 2);
    assert_eq!(seen[0].root, ResolvedRoot::Ancestor(fixture.ancestor.clone()));
    assert!(seen[1].entries.is_empty());
}

#[test]
fn raw_callback_runs_after_debouncer_sees_the_batch() {
    let fixture = Fixture::new();
    let (source, mut observer) = attach(&fixture);
    let emissions = EmissionRecorder::attach(observer.visible_change());
    observer.step(ms(0));

    // Clearing the callback input from inside the callback is allowed.
    let input = observer.observer_callback().clone();
    observer
        .observer_callback()
        .set(Some(viewobs_runtime::ObserverCallback::new(move |_, _| {
            input.set(None);
        })));
    source.fire_intersecting(true);
    observer.step(ms(1));
    assert!(observer.observer_callback().get().is_none());
    observer.step(ms(12));
    assert_eq!(emissions.values(), vec![true]);
}

// ============================================================================
// Platform
// ============================================================================

#[test]
fn non_browser_platforms_are_inert() {
    for platform in [Platform::Server, Platform::Worker] {
        let fixture = Fixture::new();
        let source = MockIntersectionSource::new();
        let mut observer = ViewObserver::new(fixture.target.clone(), source.clone(), platform);
        let emissions = EmissionRecorder::attach(observer.visible_change());
        observer.set_config(&ObservationConfig::default().with_ancestor_selector(".ancestor"));
        observer.step(ms(0));
        observer.step(ms(50));
        observer.destroy();
        assert_eq!(source.create_count(), 0, "{platform}");
        assert_eq!(emissions.count(), 0);
    }
}
