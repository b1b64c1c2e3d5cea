//! Per-session chat state. One `ChatSession` is created at startup, mutated
//! only through the operations below, and dropped at exit — there is no
//! ambient global state behind it.

use uuid::Uuid;

use crate::config::Config;
use crate::store::Conversation;
use crate::{Message, Role};

#[derive(Clone, Copy, Debug)]
pub struct SessionFlags {
    pub stream: bool,
    pub markdown: bool,
    pub auto_title: bool,
    /// Temporary sessions are never persisted.
    pub temporary: bool,
}

pub struct ChatSession {
    pub conversation_id: Option<String>,
    pub messages: Vec<Message>,
    pub system_prompt: String,
    pub flags: SessionFlags,
    saved_once: bool,
}

impl ChatSession {
    pub fn from_config(config: &Config) -> Self {
        Self {
            conversation_id: None,
            messages: Vec::new(),
            system_prompt: config.system_prompt.clone(),
            flags: SessionFlags {
                stream: config.stream,
                markdown: config.markdown,
                auto_title: config.auto_title,
                temporary: config.temporary,
            },
            saved_once: false,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.messages.push(Message::user(content));
    }

    pub fn push_assistant(&mut self, content: impl Into<String>) {
        self.messages.push(Message::assistant(content));
    }

    /// Messages for an inference request: the system prompt followed by the
    /// conversation history.
    pub fn request_messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(self.messages.len() + 1);
        if !self.system_prompt.trim().is_empty() {
            messages.push(Message::system(self.system_prompt.clone()));
        }
        messages.extend(self.messages.iter().cloned());
        messages
    }

    pub fn first_user_message(&self) -> Option<&Message> {
        self.messages.iter().find(|m| m.role == Role::User)
    }

    /// Assign a fresh id for a conversation that has never been saved.
    pub fn begin_conversation(&mut self) -> String {
        let id = Uuid::new_v4().to_string();
        self.conversation_id = Some(id.clone());
        self.saved_once = false;
        id
    }

    /// True until `mark_saved` — drives the caller's decision to set the
    /// title on save.
    pub fn first_save(&self) -> bool {
        !self.saved_once
    }

    pub fn mark_saved(&mut self) {
        self.saved_once = true;
    }

    /// Continue a previously persisted conversation.
    pub fn adopt(&mut self, conversation: Conversation) {
        self.conversation_id = Some(conversation.id);
        self.messages = conversation.messages;
        self.system_prompt = conversation.system_prompt;
        self.saved_once = true;
    }

    /// Start over: empty history, no id until the next save.
    pub fn reset(&mut self) {
        self.conversation_id = None;
        self.messages.clear();
        self.saved_once = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ChatSession {
        ChatSession::from_config(&Config::default())
    }

    #[test]
    fn request_messages_lead_with_system_prompt() {
        let mut session = session();
        session.push_user("hi");
        session.push_assistant("hello");

        let messages = session.request_messages();
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content, "hi");
    }

    #[test]
    fn empty_system_prompt_is_omitted() {
        let mut session = session();
        session.system_prompt = String::new();
        session.push_user("hi");
        assert_eq!(session.request_messages().len(), 1);
    }

    #[test]
    fn begin_conversation_assigns_id_once_per_reset() {
        let mut session = session();
        assert!(session.conversation_id.is_none());
        assert!(session.first_save());

        let id = session.begin_conversation();
        assert_eq!(session.conversation_id.as_deref(), Some(id.as_str()));

        session.mark_saved();
        assert!(!session.first_save());

        session.reset();
        assert!(session.conversation_id.is_none());
        assert!(session.first_save());
        assert!(session.messages.is_empty());
    }

    #[test]
    fn adopt_counts_as_already_saved() {
        let mut session = session();
        session.adopt(crate::store::Conversation {
            id: "abc".to_string(),
            title: "old chat".to_string(),
            messages: vec![Message::user("hi")],
            system_prompt: "be terse".to_string(),
            created_at: 1,
            updated_at: 2,
        });

        assert_eq!(session.conversation_id.as_deref(), Some("abc"));
        assert_eq!(session.system_prompt, "be terse");
        assert!(!session.first_save());
    }
}
