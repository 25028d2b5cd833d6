//! Conversation state threaded through a workflow run.
//!
//! A conversation is an append-only list of messages. Every message records
//! which participant authored it; the wire role sent to a model is derived
//! from the author.

use graphwright_abstraction::{ChatMessage, MessageContent, Role};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The participant that produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Author {
    /// The person who started the run.
    User,
    /// The multimodal model describing a diagram.
    ImageInterpreter,
    /// Code generated or formatted from a description.
    JuniorDeveloper,
    /// Code revised after a lint failure.
    SeniorDeveloper,
    /// Lint findings; each one counts as a retry.
    CodeReviewer,
}

impl Author {
    /// Returns the wire role used when this author's message is sent to a model.
    #[must_use]
    pub const fn role(self) -> Role {
        match self {
            Self::User => Role::User,
            Self::ImageInterpreter
            | Self::JuniorDeveloper
            | Self::SeniorDeveloper
            | Self::CodeReviewer => Role::Assistant,
        }
    }

    /// Returns `true` for authors whose messages carry generated code.
    #[must_use]
    pub const fn writes_code(self) -> bool {
        matches!(self, Self::JuniorDeveloper | Self::SeniorDeveloper)
    }

    /// Human-readable name.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::User => "User",
            Self::ImageInterpreter => "Image Interpreter",
            Self::JuniorDeveloper => "Junior Developer",
            Self::SeniorDeveloper => "Senior Developer",
            Self::CodeReviewer => "Code Reviewer",
        }
    }
}

impl fmt::Display for Author {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// One authored entry in a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Who produced the message.
    pub author: Author,
    /// Text or multi-part content.
    pub content: MessageContent,
}

impl Message {
    /// Creates a message from the given author.
    #[must_use]
    pub fn new(author: Author, content: impl Into<MessageContent>) -> Self {
        Self { author, content: content.into() }
    }

    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self::new(Author::User, content)
    }

    /// Returns `true` if the content references an image.
    #[must_use]
    pub fn has_image(&self) -> bool {
        self.content.has_image()
    }

    /// Returns the text of the message, ignoring image parts.
    #[must_use]
    pub fn text(&self) -> String {
        self.content.text()
    }

    /// Converts the message into the wire form sent to a model.
    #[must_use]
    pub fn to_chat(&self) -> ChatMessage {
        ChatMessage::new(self.author.role(), self.content.clone())
    }

    /// Wire form with every image part removed.
    #[must_use]
    pub fn to_chat_without_images(&self) -> ChatMessage {
        ChatMessage::new(self.author.role(), self.content.without_images())
    }
}

/// Append-only message history of a single workflow run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    /// Creates an empty conversation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a conversation holding a single user message.
    #[must_use]
    pub fn from_user(content: impl Into<MessageContent>) -> Self {
        Self { messages: vec![Message::user(content)] }
    }

    /// Appends a message.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Appends every message in order.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    /// Returns the most recent message.
    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Returns all messages in order.
    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Returns `true` if no message has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Counts messages written by `author`.
    #[must_use]
    pub fn count_by(&self, author: Author) -> usize {
        self.messages.iter().filter(|m| m.author == author).count()
    }

    /// Number of lint reports so far; this is the retry counter of the fix loop.
    #[must_use]
    pub fn reviewer_count(&self) -> usize {
        self.count_by(Author::CodeReviewer)
    }

    /// Wire form of the whole conversation.
    #[must_use]
    pub fn to_chat_messages(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat).collect()
    }

    /// Wire form of the whole conversation with all images removed.
    #[must_use]
    pub fn to_chat_messages_without_images(&self) -> Vec<ChatMessage> {
        self.messages.iter().map(Message::to_chat_without_images).collect()
    }

    /// Text of the most recent message that is not a lint report.
    ///
    /// A run that stops because the retry cap was reached ends on a reviewer
    /// message; the best-effort result is the code that preceded it.
    #[must_use]
    pub fn final_output(&self) -> Option<String> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.author != Author::CodeReviewer)
            .map(Message::text)
    }
}

impl<'a> IntoIterator for &'a Conversation {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}
