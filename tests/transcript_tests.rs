use talkback::engine::transcript::{Role, TranscriptAggregator};

#[test]
fn test_turn_flush_emits_user_before_agent() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_fragment(Role::User, "Hello ");
    aggregator.append_fragment(Role::User, "world");
    aggregator.append_fragment(Role::Agent, "Hi ");
    aggregator.append_fragment(Role::Agent, "there");

    let appended = aggregator.on_turn_complete();
    assert_eq!(appended.len(), 2);
    assert_eq!(appended[0].role, Role::User);
    assert_eq!(appended[0].text, "Hello world");
    assert_eq!(appended[1].role, Role::Agent);
    assert_eq!(appended[1].text, "Hi there");

    // Both accumulators cleared
    assert!(aggregator.pending(Role::User).is_empty());
    assert!(aggregator.pending(Role::Agent).is_empty());
}

#[test]
fn test_turn_with_one_empty_role_emits_one_message() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_fragment(Role::User, "only me");
    let appended = aggregator.on_turn_complete();

    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].role, Role::User);
    assert_eq!(aggregator.messages().len(), 1);
}

#[test]
fn test_empty_turn_emits_nothing_and_clears() {
    let mut aggregator = TranscriptAggregator::new();

    let appended = aggregator.on_turn_complete();
    assert!(appended.is_empty());
    assert!(aggregator.messages().is_empty());
    assert!(aggregator.pending(Role::User).is_empty());
    assert!(aggregator.pending(Role::Agent).is_empty());
}

#[test]
fn test_log_is_append_only_across_turns() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_fragment(Role::Agent, "first");
    aggregator.on_turn_complete();

    aggregator.append_fragment(Role::User, "second");
    aggregator.append_fragment(Role::Agent, "third");
    aggregator.on_turn_complete();

    let log = aggregator.messages();
    assert_eq!(log.len(), 3);
    assert_eq!(log[0].text, "first");
    assert_eq!(log[1].text, "second");
    assert_eq!(log[2].text, "third");
}

#[test]
fn test_fragments_after_flush_start_a_new_turn() {
    let mut aggregator = TranscriptAggregator::new();

    aggregator.append_fragment(Role::User, "turn one");
    aggregator.on_turn_complete();

    aggregator.append_fragment(Role::User, "turn ");
    aggregator.append_fragment(Role::User, "two");
    let appended = aggregator.on_turn_complete();

    assert_eq!(appended.len(), 1);
    assert_eq!(appended[0].text, "turn two");
}
