use serde::Deserialize;

pub const DATA_PREFIX: &str = "data: ";

const FUNCTION_CALL_FINISH: &str = "function_call";

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: Option<StreamDelta>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    function_call: Option<FunctionCallDelta>,
}

#[derive(Debug, Default, Deserialize)]
struct FunctionCallDelta {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}

/// One decoded upstream record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Content(String),
    /// A piece of a function invocation. `name` starts a new call; `arguments`
    /// extends the current one. `finished` is set when the same record carries
    /// the function-call finish reason.
    FunctionCall {
        name: Option<String>,
        arguments: Option<String>,
        finished: bool,
    },
    /// Finish reason `function_call` on a record without a function fragment.
    FunctionCallFinished,
}

/// Decode one framed line. Anything that is not a usable delta is logged and skipped.
pub fn decode_line(line: &str) -> Option<StreamEvent> {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        log::debug!("Ignoring non-data line: {}", line);
        return None;
    };

    let chunk: StreamChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            log::warn!("Skipping malformed stream record ({}): {}", e, payload);
            return None;
        }
    };

    let choice = chunk.choices.into_iter().next()?;
    let finished = choice.finish_reason.as_deref() == Some(FUNCTION_CALL_FINISH);

    let Some(delta) = choice.delta else {
        return finished.then_some(StreamEvent::FunctionCallFinished);
    };

    if let Some(call) = delta.function_call {
        return Some(StreamEvent::FunctionCall {
            name: call.name.filter(|n| !n.is_empty()),
            arguments: call.arguments.filter(|a| !a.is_empty()),
            finished,
        });
    }

    match delta.content {
        Some(content) if !content.is_empty() => Some(StreamEvent::Content(content)),
        _ if finished => Some(StreamEvent::FunctionCallFinished),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relay::framer::LineFramer;

    #[test]
    fn content_delta() {
        let event = decode_line(r#"data: {"choices":[{"delta":{"content":"Olá"}}]}"#);
        assert_eq!(event, Some(StreamEvent::Content("Olá".into())));
    }

    #[test]
    fn function_call_fragments() {
        let start = decode_line(
            r#"data: {"choices":[{"delta":{"role":"assistant","content":null,"function_call":{"name":"search_faq","arguments":""}}}]}"#,
        );
        assert_eq!(
            start,
            Some(StreamEvent::FunctionCall {
                name: Some("search_faq".into()),
                arguments: None,
                finished: false,
            })
        );

        let args = decode_line(
            r#"data: {"choices":[{"delta":{"function_call":{"arguments":"{\"query\":"}}}]}"#,
        );
        assert_eq!(
            args,
            Some(StreamEvent::FunctionCall {
                name: None,
                arguments: Some("{\"query\":".into()),
                finished: false,
            })
        );
    }

    #[test]
    fn finish_reason_without_fragment() {
        let event = decode_line(r#"data: {"choices":[{"delta":{},"finish_reason":"function_call"}]}"#);
        assert_eq!(event, Some(StreamEvent::FunctionCallFinished));

        let stop = decode_line(r#"data: {"choices":[{"delta":{},"finish_reason":"stop"}]}"#);
        assert_eq!(stop, None);
    }

    #[test]
    fn ignores_unusable_lines() {
        assert_eq!(decode_line("event: ping"), None);
        assert_eq!(decode_line(": keep-alive"), None);
        assert_eq!(decode_line("data: {\"choices\":[{\"delta\""), None);
        assert_eq!(decode_line(r#"data: {"id":"x"}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":[]}"#), None);
        assert_eq!(decode_line(r#"data: {"choices":[{"index":0}]}"#), None);
    }

    #[test]
    fn every_well_formed_record_decodes_once() {
        let records: Vec<String> = (0..5)
            .map(|i| format!(r#"data: {{"choices":[{{"delta":{{"content":"t{i}"}}}}]}}"#))
            .collect();
        let body = format!("{}\n\ndata: [DONE]\n\n", records.join("\n\n"));

        for size in [1, 3, 7, 64, body.len()] {
            let mut framer = LineFramer::new();
            let mut events = Vec::new();
            for chunk in body.as_bytes().chunks(size) {
                events.extend(framer.push(chunk).iter().filter_map(|l| decode_line(l)));
            }
            events.extend(framer.finish().and_then(|l| decode_line(&l)));

            let expected: Vec<StreamEvent> =
                (0..5).map(|i| StreamEvent::Content(format!("t{i}"))).collect();
            assert_eq!(events, expected, "fragment size {size}");
        }
    }
}
