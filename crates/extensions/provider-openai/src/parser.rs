//! Response parsing for OpenAI API.

use tracing::warn;

use webpilot_protocols::provider::ensure_tool_call_ids;
use webpilot_protocols::{ChatResponse, ProviderError, StopReason, ToolCall, Usage};

use crate::api::ApiResponse;

/// Parse API response to ChatResponse using the first choice.
pub fn parse_response(response: ApiResponse) -> Result<ChatResponse, ProviderError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::InvalidResponse("response has no choices".to_string()))?;

    let mut tool_calls: Vec<ToolCall> = choice
        .message
        .tool_calls
        .into_iter()
        .map(|tc| {
            let arguments = parse_arguments(&tc.function.name, &tc.function.arguments);
            ToolCall::new(tc.id, tc.function.name, arguments)
        })
        .collect();
    ensure_tool_call_ids(&mut tool_calls);

    let usage = response
        .usage
        .map(|u| Usage::new(u.prompt_tokens, u.completion_tokens))
        .unwrap_or_default();

    Ok(ChatResponse {
        id: response.id,
        model: response.model,
        content: choice.message.content.filter(|c| !c.is_empty()),
        stop_reason: parse_finish_reason(choice.finish_reason.as_deref()),
        tool_calls,
        usage,
    })
}

/// Arguments arrive as a JSON string; an empty or malformed one becomes `{}`.
pub fn parse_arguments(tool: &str, raw: &str) -> serde_json::Value {
    if raw.trim().is_empty() {
        return serde_json::json!({});
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        warn!(tool = tool, error = %e, "Malformed tool arguments, using empty object");
        serde_json::json!({})
    })
}

/// Parse finish reason string.
pub fn parse_finish_reason(reason: Option<&str>) -> StopReason {
    match reason {
        Some("length") => StopReason::MaxTokens,
        Some("tool_calls") | Some("function_call") => StopReason::ToolUse,
        _ => StopReason::EndTurn,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{ApiUsage, Choice, FunctionCall, ResponseMessage};
    use serde_json::json;

    fn api_tool_call(id: &str, name: &str, arguments: &str) -> crate::api::ToolCall {
        crate::api::ToolCall {
            id: id.to_string(),
            call_type: "function".to_string(),
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    fn response(content: Option<&str>, tool_calls: Vec<crate::api::ToolCall>, finish: &str) -> ApiResponse {
        ApiResponse {
            id: "chatcmpl-1".to_string(),
            model: "gpt-4o".to_string(),
            choices: vec![Choice {
                message: ResponseMessage {
                    content: content.map(String::from),
                    tool_calls,
                },
                finish_reason: Some(finish.to_string()),
            }],
            usage: Some(ApiUsage {
                prompt_tokens: 40,
                completion_tokens: 8,
            }),
        }
    }

    #[test]
    fn test_parse_finish_reason() {
        assert_eq!(parse_finish_reason(Some("stop")), StopReason::EndTurn);
        assert_eq!(parse_finish_reason(Some("length")), StopReason::MaxTokens);
        assert_eq!(parse_finish_reason(Some("tool_calls")), StopReason::ToolUse);
        assert_eq!(parse_finish_reason(Some("content_filter")), StopReason::EndTurn);
        assert_eq!(parse_finish_reason(None), StopReason::EndTurn);
    }

    #[test]
    fn test_parse_text_response() {
        let parsed = parse_response(response(Some("FAILED: Site is down"), vec![], "stop")).unwrap();
        assert_eq!(parsed.content.as_deref(), Some("FAILED: Site is down"));
        assert!(parsed.tool_calls.is_empty());
        assert_eq!(parsed.usage, Usage::new(40, 8));
        assert_eq!(parsed.stop_reason, StopReason::EndTurn);
    }

    #[test]
    fn test_parse_tool_calls() {
        let parsed = parse_response(response(
            None,
            vec![
                api_tool_call("call_a", "type_text", r##"{"selector":"#q","text":"laptop"}"##),
                api_tool_call("", "press_key", r#"{"key":"Enter"}"#),
            ],
            "tool_calls",
        ))
        .unwrap();
        assert!(parsed.content.is_none());
        assert_eq!(parsed.tool_calls.len(), 2);
        assert_eq!(parsed.tool_calls[0].id, "call_a");
        assert_eq!(parsed.tool_calls[0].arguments, json!({"selector": "#q", "text": "laptop"}));
        assert_eq!(parsed.tool_calls[1].id, "call_1");
        assert_eq!(parsed.stop_reason, StopReason::ToolUse);
    }

    #[test]
    fn test_parse_arguments_fallbacks() {
        assert_eq!(parse_arguments("go_back", ""), json!({}));
        assert_eq!(parse_arguments("click", "{not json"), json!({}));
        assert_eq!(parse_arguments("wait", r#"{"seconds": 2}"#), json!({"seconds": 2}));
    }

    #[test]
    fn test_empty_choices_is_invalid() {
        let api = ApiResponse {
            id: "x".to_string(),
            model: "gpt-4o".to_string(),
            choices: vec![],
            usage: None,
        };
        assert!(matches!(parse_response(api), Err(ProviderError::InvalidResponse(_))));
    }

    #[test]
    fn test_missing_usage_defaults_to_zero() {
        let mut api = response(Some("DONE: ok"), vec![], "stop");
        api.usage = None;
        assert_eq!(parse_response(api).unwrap().usage, Usage::default());
    }
}
