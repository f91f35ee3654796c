use recipe_core::interpret;
use serde_json::{json, Value};

fn samples() -> Vec<Value> {
    vec![
        json!({"is_qa": true}),
        json!({"ok": true, "items": [1, 2, 3], "meta": {"source": "agent", "score": 0.75}}),
        json!([{"id": "a"}, {"id": "b"}]),
        json!({"text": "contains } and { and ``` fences"}),
        json!({}),
        json!([]),
    ]
}

#[test]
fn test_round_trip_through_dump() {
    for value in samples() {
        assert_eq!(interpret(&serde_json::to_string(&value).unwrap()), Some(value.clone()));
        assert_eq!(
            interpret(&serde_json::to_string_pretty(&value).unwrap()),
            Some(value)
        );
    }
}

#[test]
fn test_round_trip_through_fenced_json_block() {
    for value in samples() {
        let fenced = format!("```json\n{}\n```", serde_json::to_string(&value).unwrap());
        assert_eq!(interpret(&fenced), Some(value));
    }
}

#[test]
fn test_fenced_block_surrounded_by_prose() {
    let text = "Sure, here is the result:\n\n```json\n{\"ok\": true}\n```\n\nLet me know if you need anything else.";
    assert_eq!(interpret(text), Some(json!({"ok": true})));
}

#[test]
fn test_untagged_fenced_block() {
    let text = "Result:\n```\n{\"ok\": false, \"reason\": \"missing tests\"}\n```";
    assert_eq!(
        interpret(text),
        Some(json!({"ok": false, "reason": "missing tests"}))
    );
}

#[test]
fn test_nested_embedded_object_uses_balanced_brackets() {
    // A greedy `\{.*\}` match would run to the last closing brace in the prose.
    let text = r#"Analysis complete. {"outer": {"inner": [1, {"deep": true}]}, "note": "a } in a string"} Reply {ack} when done."#;
    assert_eq!(
        interpret(text),
        Some(json!({"outer": {"inner": [1, {"deep": true}]}, "note": "a } in a string"}))
    );
}

#[test]
fn test_embedded_array() {
    let text = "The failing files are [\"a.rs\", \"b.rs\"] as far as I can tell.";
    assert_eq!(interpret(text), Some(json!(["a.rs", "b.rs"])));
}

#[test]
fn test_single_object_preferred_over_bracketed_noise() {
    let text = r#"Step [1] finished. Final answer: {"status": "done"}"#;
    assert_eq!(interpret(text), Some(json!({"status": "done"})));
}

#[test]
fn test_ambiguous_objects_yield_absence() {
    let text = r#"I first thought {"answer": 1} but then decided {"answer": 2}."#;
    assert_eq!(interpret(text), None);
}

#[test]
fn test_prose_without_json_yields_absence() {
    assert_eq!(interpret("Here is my answer: 42"), None);
    assert_eq!(interpret("Everything looks fine, no changes required."), None);
}

#[test]
fn test_empty_and_whitespace_yield_absence() {
    assert_eq!(interpret(""), None);
    assert_eq!(interpret("   \n\t  "), None);
}

#[test]
fn test_truncated_json_yields_absence() {
    assert_eq!(interpret(r#"Result: {"ok": true, "items": [1, 2"#), None);
    assert_eq!(interpret("```json\n{\"ok\": \n```"), None);
}
