//! Named, append-only conversation logs
//!
//! Entries are only ever appended; the sole removal is [`ConversationLog::clear`],
//! which truncates the whole log.

use crate::highlight::HighlightedLine;

/// The log surfaces the console knows about. Using an enum means a render
/// target always refers to an existing surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogId {
    /// Operator conversation with the assistant
    Chat,
    /// Robot activity
    Robot,
}

impl LogId {
    pub fn all() -> [LogId; 2] {
        [LogId::Chat, LogId::Robot]
    }

    pub fn title(&self) -> &'static str {
        match self {
            LogId::Chat => "Chat",
            LogId::Robot => "Robot",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CodeBlock {
    pub language: &'static str,
    pub source: String,
    /// Filled in by the highlighting pass
    pub highlighted: Option<Vec<HighlightedLine>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineImage {
    pub mime: &'static str,
    pub base64: String,
    /// Byte length of the decoded payload, `None` if it is not valid base64
    pub decoded_len: Option<usize>,
}

impl InlineImage {
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime, self.base64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderedBody {
    Text(String),
    Image(InlineImage),
    Code(CodeBlock),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedMessage {
    pub label: String,
    pub role: String,
    pub body: RenderedBody,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEntry {
    Message(RenderedMessage),
    /// Appended once after every rendered batch
    Separator,
}

#[derive(Debug, Clone)]
pub struct ConversationLog {
    id: LogId,
    entries: Vec<LogEntry>,
}

impl ConversationLog {
    pub fn new(id: LogId) -> Self {
        Self {
            id,
            entries: Vec::new(),
        }
    }

    pub fn id(&self) -> LogId {
        self.id
    }

    pub fn push(&mut self, entry: LogEntry) {
        self.entries.push(entry);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn messages(&self) -> impl Iterator<Item = &RenderedMessage> {
        self.entries.iter().filter_map(|entry| match entry {
            LogEntry::Message(message) => Some(message),
            LogEntry::Separator => None,
        })
    }

    pub fn separator_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|entry| matches!(entry, LogEntry::Separator))
            .count()
    }

    pub fn code_blocks_mut(&mut self) -> impl Iterator<Item = &mut CodeBlock> {
        self.entries.iter_mut().filter_map(|entry| match entry {
            LogEntry::Message(RenderedMessage {
                body: RenderedBody::Code(block),
                ..
            }) => Some(block),
            _ => None,
        })
    }
}

/// Every log surface of one console session
#[derive(Debug, Clone)]
pub struct Logs {
    chat: ConversationLog,
    robot: ConversationLog,
}

impl Default for Logs {
    fn default() -> Self {
        Self::new()
    }
}

impl Logs {
    pub fn new() -> Self {
        Self {
            chat: ConversationLog::new(LogId::Chat),
            robot: ConversationLog::new(LogId::Robot),
        }
    }

    pub fn get(&self, id: LogId) -> &ConversationLog {
        match id {
            LogId::Chat => &self.chat,
            LogId::Robot => &self.robot,
        }
    }

    pub fn get_mut(&mut self, id: LogId) -> &mut ConversationLog {
        match id {
            LogId::Chat => &mut self.chat,
            LogId::Robot => &mut self.robot,
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ConversationLog> {
        [&mut self.chat, &mut self.robot].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_entry(content: &str) -> LogEntry {
        LogEntry::Message(RenderedMessage {
            label: "USER:".to_string(),
            role: "user".to_string(),
            body: RenderedBody::Text(content.to_string()),
        })
    }

    #[test]
    fn test_clear_then_append_starts_fresh() {
        let mut log = ConversationLog::new(LogId::Chat);
        log.push(text_entry("old"));
        log.push(LogEntry::Separator);
        log.clear();
        assert!(log.is_empty());

        log.push(text_entry("new"));
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0], text_entry("new"));
    }

    #[test]
    fn test_logs_are_independent() {
        let mut logs = Logs::new();
        logs.get_mut(LogId::Robot).push(LogEntry::Separator);
        assert_eq!(logs.get(LogId::Robot).len(), 1);
        assert!(logs.get(LogId::Chat).is_empty());
        assert_eq!(logs.get(LogId::Robot).id(), LogId::Robot);
    }

    #[test]
    fn test_image_data_uri() {
        let image = InlineImage {
            mime: "image/jpeg",
            base64: "aGk=".to_string(),
            decoded_len: Some(2),
        };
        assert_eq!(image.data_uri(), "data:image/jpeg;base64,aGk=");
    }
}
