use super::*;

#[test]
fn object_id_is_read_from_root() {
    let json = serde_json::json!({ "id": "asst_123", "object": "assistant" }).to_string();
    assert_eq!(parse_object_id(&json).unwrap(), "asst_123");
}

#[test]
fn object_id_missing_is_parse_error() {
    let json = serde_json::json!({ "object": "thread" }).to_string();
    assert!(matches!(parse_object_id(&json), Err(AssistantError::ApiParse(_))));
}

#[test]
fn malformed_json_is_parse_error() {
    assert!(matches!(parse_object_id("not json"), Err(AssistantError::ApiParse(_))));
}

#[test]
fn run_parses_status() {
    let json = serde_json::json!({
        "id": "run_1",
        "object": "thread.run",
        "thread_id": "thread_9",
        "assistant_id": "asst_1",
        "status": "queued"
    })
    .to_string();
    let run = parse_run(&json).unwrap();
    assert_eq!(run.id, "run_1");
    assert_eq!(run.thread_id, "thread_9");
    assert_eq!(run.status, RunStatus::Queued);
}

#[test]
fn run_without_status_errors() {
    let json = serde_json::json!({ "id": "run_1" }).to_string();
    assert!(parse_run(&json).is_err());
}

#[test]
fn message_list_extracts_first_text_block() {
    let json = serde_json::json!({
        "object": "list",
        "data": [
            {
                "id": "msg_2",
                "role": "assistant",
                "run_id": "run_1",
                "content": [
                    { "type": "image_file", "image_file": { "file_id": "f" } },
                    { "type": "text", "text": { "value": "Keep a cash buffer.", "annotations": [] } }
                ]
            },
            {
                "id": "msg_1",
                "role": "user",
                "run_id": null,
                "content": [{ "type": "text", "text": { "value": "How do I budget?", "annotations": [] } }]
            }
        ]
    })
    .to_string();

    let messages = parse_message_list(&json).unwrap();
    assert_eq!(messages.len(), 2);
    assert!(messages[0].is_assistant());
    assert_eq!(messages[0].run_id.as_deref(), Some("run_1"));
    assert_eq!(messages[0].text.as_deref(), Some("Keep a cash buffer."));
    assert!(!messages[1].is_assistant());
    assert_eq!(messages[1].run_id, None);
}

#[test]
fn message_list_without_data_errors() {
    let json = serde_json::json!({ "object": "list" }).to_string();
    assert!(parse_message_list(&json).is_err());
}

#[test]
fn message_without_text_block_has_no_text() {
    let json = serde_json::json!({
        "data": [{ "id": "msg_3", "role": "assistant", "run_id": "run_2", "content": [] }]
    })
    .to_string();
    let messages = parse_message_list(&json).unwrap();
    assert_eq!(messages[0].text, None);
}
