//! Property-based tests for the routing predicates

use super::*;
use crate::conversation::ToolCall;
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_tool_call() -> impl Strategy<Value = ToolCall> {
    ("[a-z0-9]{6}", prop_oneof![Just("search_internet"), Just("generate_csv_file")])
        .prop_map(|(id, name)| ToolCall::new(id, name, serde_json::json!({})))
}

fn arb_plain_turn() -> impl Strategy<Value = Turn> {
    prop_oneof![
        "[a-zA-Z ]{0,20}".prop_map(Turn::user),
        "[a-zA-Z ]{0,20}".prop_map(Turn::assistant),
        ("[a-z0-9]{6}", "[a-zA-Z ]{0,20}").prop_map(|(id, c)| Turn::tool_result(id, c)),
        "[a-zA-Z ]{0,20}".prop_map(Turn::system),
    ]
}

fn arb_calling_turn() -> impl Strategy<Value = Turn> {
    prop::collection::vec(arb_tool_call(), 1..4)
        .prop_map(|calls| Turn::assistant_with_calls("", calls))
}

fn arb_turns() -> impl Strategy<Value = Vec<Turn>> {
    prop::collection::vec(prop_oneof![arb_plain_turn(), arb_calling_turn()], 0..8)
}

fn arb_tag() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("headlines".to_string()),
        Just("stories".to_string()),
        Just("summary".to_string()),
        "[a-z&]{0,12}",
    ]
}

proptest! {
    #[test]
    fn route_is_total_and_matches_tag(tag in arb_tag()) {
        let state = ConversationState {
            segment: Some(Segment::from_tag(&tag)),
            ..Default::default()
        };
        let expected = match tag.as_str() {
            "headlines" => NewsNode::Headlines,
            "stories" => NewsNode::Stories,
            _ => NewsNode::Query,
        };
        prop_assert_eq!(route(&state), expected);
    }

    #[test]
    fn needs_tools_follows_last_turn(messages in arb_turns(), queries in arb_turns()) {
        let expected = messages.last().is_some_and(Turn::has_pending_tool_calls)
            || queries.last().is_some_and(Turn::has_pending_tool_calls);
        let state = ConversationState { messages, queries, ..Default::default() };
        let branch = needs_tools(&state);
        prop_assert_eq!(branch == Branch::Tools, expected);
    }

    #[test]
    fn answering_every_call_ends_the_turn(
        history in prop::collection::vec(arb_plain_turn(), 0..5),
        calls in prop::collection::vec(arb_tool_call(), 1..4),
    ) {
        let mut messages = history;
        messages.push(Turn::assistant_with_calls("", calls.clone()));
        let state = ConversationState { messages: messages.clone(), ..Default::default() };
        prop_assert_eq!(needs_tools(&state), Branch::Tools);

        messages.extend(calls.iter().map(|c| Turn::tool_result(c.id.clone(), "ok")));
        let answered = ConversationState { messages, ..Default::default() };
        prop_assert_eq!(needs_tools(&answered), Branch::End);
    }

    #[test]
    fn json_record_and_typed_state_agree(messages in arb_turns()) {
        let state = ConversationState { messages: messages.clone(), ..Default::default() };
        let record = serde_json::to_value(&state).unwrap();
        prop_assert_eq!(needs_tools_json(&record).unwrap(), needs_tools(&state));

        let list = serde_json::to_value(&messages).unwrap();
        prop_assert_eq!(needs_tools_json(&list).unwrap(), needs_tools_in(&messages));
    }
}
