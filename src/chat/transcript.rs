//! Ordered, role-tagged chat transcript.

use crate::types::{Annotation, Message, Role};

/// Message list plus a handle to the message that incoming deltas extend.
///
/// Entries are appended and never reordered or removed; only the open
/// message changes in place.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
    open: Option<usize>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// The message deltas currently extend, if any.
    pub fn open_message(&self) -> Option<&Message> {
        self.open.and_then(|i| self.messages.get(i))
    }

    /// Append a message and return its index. Assistant and code messages
    /// become the open message; a user message closes it.
    pub fn push(&mut self, role: Role, content: impl Into<String>) -> usize {
        self.messages.push(Message::new(role, content));
        let index = self.messages.len() - 1;
        self.open = match role {
            Role::User => None,
            Role::Assistant | Role::Code => Some(index),
        };
        index
    }

    /// Append text to the open message, opening an assistant message first
    /// when none is open. Returns the index written to.
    pub fn append(&mut self, text: &str) -> usize {
        let index = match self.open {
            Some(index) => index,
            None => self.push(Role::Assistant, ""),
        };
        self.messages[index].content.push_str(text);
        index
    }

    /// Rewrite file-path annotations in the open message. Returns the index
    /// when the content changed.
    pub fn annotate(&mut self, annotations: &[Annotation]) -> Option<usize> {
        let index = self.open?;
        let message = &mut self.messages[index];
        let mut changed = false;
        for annotation in annotations {
            if let Annotation::FilePath { text, file_id } = annotation {
                let rewritten = rewrite_file_path(&message.content, text, file_id);
                if rewritten != message.content {
                    message.content = rewritten;
                    changed = true;
                }
            }
        }
        changed.then_some(index)
    }
}

/// Local path a run-produced file is served from.
pub fn file_link(file_id: &str) -> String {
    format!("/files/{file_id}")
}

/// Replace every occurrence of `text` with the file's link.
///
/// A match lying inside an existing occurrence of the link is left alone,
/// so applying the same annotation again changes nothing.
pub fn rewrite_file_path(content: &str, text: &str, file_id: &str) -> String {
    if text.is_empty() {
        return content.to_string();
    }
    let link = file_link(file_id);
    let links: Vec<(usize, usize)> = content
        .match_indices(link.as_str())
        .map(|(start, l)| (start, start + l.len()))
        .collect();

    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for (start, matched) in content.match_indices(text) {
        let end = start + matched.len();
        if links.iter().any(|&(ls, le)| ls <= start && end <= le) {
            continue;
        }
        out.push_str(&content[last..start]);
        out.push_str(&link);
        last = end;
    }
    out.push_str(&content[last..]);
    out
}
