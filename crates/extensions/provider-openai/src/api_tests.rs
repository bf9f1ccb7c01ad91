    use super::*;
    use serde_json::json;

    #[test]
    fn test_api_request_serialization() {
        let request = ApiRequest {
            model: "gpt-4o".to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: Some("Hello".to_string()),
                tool_calls: None,
                tool_call_id: None,
            }],
            max_tokens: Some(1024),
            tools: vec![json!({"type": "function", "function": {"name": "click"}})],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "gpt-4o");
        assert_eq!(json["max_tokens"], 1024);
        assert_eq!(json["messages"][0]["content"], "Hello");
        assert_eq!(json["tools"][0]["function"]["name"], "click");
    }

    #[test]
    fn test_api_request_skip_none_fields() {
        let request = ApiRequest {
            model: "gpt-4o".to_string(),
            messages: vec![],
            max_tokens: None,
            tools: vec![],
        };

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("max_tokens").is_none());
        assert!(json.get("tools").is_none());
    }

    #[test]
    fn test_assistant_tool_call_message_has_null_content() {
        let message = ApiMessage {
            role: "assistant".to_string(),
            content: None,
            tool_calls: Some(vec![ToolCall {
                id: "call_1".to_string(),
                call_type: "function".to_string(),
                function: FunctionCall {
                    name: "click".to_string(),
                    arguments: r##"{"selector":"#buy"}"##.to_string(),
                },
            }]),
            tool_call_id: None,
        };

        let json = serde_json::to_value(&message).unwrap();
        assert!(json["content"].is_null());
        assert_eq!(json["tool_calls"][0]["type"], "function");
        assert_eq!(json["tool_calls"][0]["function"]["arguments"], r##"{"selector":"#buy"}"##);
        assert!(json.get("tool_call_id").is_none());
    }

    #[test]
    fn test_api_response_deserialization() {
        let json = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "model": "gpt-4o",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "scroll_page", "arguments": "{\"direction\":\"down\"}"}
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        });

        let response: ApiResponse = serde_json::from_value(json).unwrap();
        assert_eq!(response.id, "chatcmpl-123");
        assert_eq!(response.choices.len(), 1);
        let choice = &response.choices[0];
        assert!(choice.message.content.is_none());
        assert_eq!(choice.message.tool_calls[0].function.name, "scroll_page");
        assert_eq!(choice.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.usage.unwrap().prompt_tokens, 10);
    }

    #[test]
    fn test_error_body_deserialization() {
        let body: ApiErrorBody = serde_json::from_str(
            r#"{"error": {"message": "Invalid API key", "type": "invalid_request_error"}}"#,
        )
        .unwrap();
        assert_eq!(body.error.message, "Invalid API key");
    }
