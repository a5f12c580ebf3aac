//! Call-stack capture must name the function that was executing.

use crashwatch_core::trace;

#[inline(never)]
fn known_probe_function() -> Vec<String> {
    trace::readable_call_stack()
}

#[test]
fn capture_includes_executing_function() {
    let stack = known_probe_function();
    assert!(!stack.is_empty());
    assert!(
        stack
            .iter()
            .any(|frame| frame.contains("known_probe_function")),
        "probe frame missing from stack: {:#?}",
        stack
    );
}

#[test]
fn probe_frame_precedes_test_harness_frames() {
    let stack = known_probe_function();
    let probe = stack
        .iter()
        .position(|frame| frame.contains("known_probe_function"));
    let harness = stack.iter().position(|frame| frame.contains("test::run"));
    if let (Some(probe), Some(harness)) = (probe, harness) {
        // Innermost first: the probe was called by the harness.
        assert!(probe < harness, "stack was: {:#?}", stack);
    }
}

#[test]
fn frames_are_indexed_and_formatted() {
    let frames = trace::capture();
    assert!(!frames.is_empty());
    for (position, frame) in frames.iter().enumerate() {
        assert_eq!(frame.index, position);
        assert!(frame.to_string().starts_with('['));
        assert!(!frame.symbol.is_empty());
    }
}
