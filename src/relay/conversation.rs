use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Function,
}

/// Function invocation as observed on the stream: the raw argument text is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCallDescriptor {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCallDescriptor>,
}

impl Message {
    pub fn text(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: Some(content.into()),
            name: None,
            function_call: None,
        }
    }
}

/// Messages exchanged with the upstream for one request, in chronological order.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push_system(&mut self, content: impl Into<String>) {
        self.messages.push(Message::text(Role::System, content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::text(Role::Assistant, content));
    }

    /// The assistant turn that requested a function; it carries no content.
    pub fn push_function_call(&mut self, name: &str, arguments: &str) {
        self.messages.push(Message {
            role: Role::Assistant,
            content: None,
            name: None,
            function_call: Some(FunctionCallDescriptor {
                name: name.to_string(),
                arguments: arguments.to_string(),
            }),
        });
    }

    pub fn push_function_result(&mut self, name: &str, content: String) {
        self.messages.push(Message {
            role: Role::Function,
            content: Some(content),
            name: Some(name.to_string()),
            function_call: None,
        });
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn function_call_message_wire_shape() {
        let mut conversation = Conversation::default();
        conversation.push_function_call("add_faq", r#"{"question":"Q"}"#);
        conversation.push_function_result("add_faq", r#"{"id":"1"}"#.into());

        let wire = serde_json::to_value(conversation.messages()).unwrap();
        assert_eq!(
            wire,
            json!([
                {
                    "role": "assistant",
                    "content": null,
                    "function_call": {"name": "add_faq", "arguments": "{\"question\":\"Q\"}"}
                },
                {"role": "function", "content": "{\"id\":\"1\"}", "name": "add_faq"}
            ])
        );
    }

    #[test]
    fn inbound_messages_accept_missing_content() {
        let messages: Vec<Message> =
            serde_json::from_value(json!([{"role": "user", "content": "oi"}, {"role": "assistant"}]))
                .unwrap();
        assert_eq!(messages[0], Message::text(Role::User, "oi"));
        assert_eq!(messages[1].content, None);
    }
}
