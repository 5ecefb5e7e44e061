//! Message renderer
//!
//! Projects immutable [`Message`]s into entries of a named [`ConversationLog`].
//! Rendering never mutates the message itself.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::highlight::{self, CODE_LANGUAGE};
use crate::log::{CodeBlock, InlineImage, LogEntry, LogId, Logs, RenderedBody, RenderedMessage};
use crate::message::{Message, MessageKind};

/// MIME type every inline image is rendered with
pub const IMAGE_MIME: &str = "image/jpeg";

/// Turn one message into a log entry. Messages of an unknown kind yield `None`.
pub fn project(message: &Message) -> Option<RenderedMessage> {
    let body = match message.kind {
        MessageKind::Text => RenderedBody::Text(message.content.clone()),
        MessageKind::Image => RenderedBody::Image(InlineImage {
            mime: IMAGE_MIME,
            base64: message.content.clone(),
            decoded_len: STANDARD.decode(message.content.trim()).ok().map(|bytes| bytes.len()),
        }),
        MessageKind::Code => RenderedBody::Code(CodeBlock {
            language: CODE_LANGUAGE,
            source: message.content.clone(),
            highlighted: None,
        }),
        MessageKind::Unknown => return None,
    };
    Some(RenderedMessage {
        label: message.label(),
        role: message.role.clone(),
        body,
    })
}

/// Append one message to `log`. Returns whether anything was appended.
///
/// A code message triggers a highlighting pass over every code block in every
/// log, not just the new one.
pub fn render(logs: &mut Logs, log: LogId, message: &Message) -> bool {
    let Some(rendered) = project(message) else {
        tracing::debug!(role = %message.role, log = ?log, "dropping message of unknown kind");
        return false;
    };
    let is_code = matches!(rendered.body, RenderedBody::Code(_));
    logs.get_mut(log).push(LogEntry::Message(rendered));
    if is_code {
        let blocks = highlight::highlight_all(logs);
        tracing::trace!(blocks, "re-highlighted code blocks");
    }
    true
}

/// Render a whole reply batch in order, then append exactly one separator.
pub fn render_batch(logs: &mut Logs, log: LogId, messages: &[Message]) {
    for message in messages {
        render(logs, log, message);
    }
    logs.get_mut(log).push(LogEntry::Separator);
}

/// Empty `log`. Lifecycle state is not touched.
pub fn clear(logs: &mut Logs, log: LogId) {
    logs.get_mut(log).clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_message_label_is_uppercased_role() {
        let mut logs = Logs::new();
        assert!(render(&mut logs, LogId::Chat, &Message::text("assistant", "hi")));
        let rendered = logs.get(LogId::Chat).messages().next().unwrap();
        assert_eq!(rendered.label, "ASSISTANT:");
        assert_eq!(rendered.body, RenderedBody::Text("hi".to_string()));
    }

    #[test]
    fn test_render_batch_appends_in_order_with_one_separator() {
        let mut logs = Logs::new();
        let batch = vec![
            Message::text("llm", "one"),
            Message::text("llm", "two"),
            Message::text("llm", "three"),
        ];
        render_batch(&mut logs, LogId::Chat, &batch);

        let log = logs.get(LogId::Chat);
        assert_eq!(log.len(), 4);
        assert_eq!(log.separator_count(), 1);
        assert_eq!(log.entries()[3], LogEntry::Separator);
        let contents: Vec<_> = log
            .messages()
            .map(|m| match &m.body {
                RenderedBody::Text(t) => t.clone(),
                other => panic!("unexpected body {other:?}"),
            })
            .collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_empty_batch_still_appends_separator() {
        let mut logs = Logs::new();
        render_batch(&mut logs, LogId::Robot, &[]);
        assert_eq!(logs.get(LogId::Robot).entries(), &[LogEntry::Separator]);
    }

    #[test]
    fn test_unknown_kind_is_dropped() {
        let mut logs = Logs::new();
        let odd = Message::new("vlm", MessageKind::Unknown, "???");
        render_batch(&mut logs, LogId::Chat, &[odd, Message::system("ok")]);
        let log = logs.get(LogId::Chat);
        assert_eq!(log.messages().count(), 1);
        assert_eq!(log.separator_count(), 1);
    }

    #[test]
    fn test_code_content_is_preserved_verbatim() {
        let source = "if width < 0.05:\n    gripper.close()\n# <done> & \"quoted\"";
        let mut logs = Logs::new();
        render(&mut logs, LogId::Chat, &Message::code("llm", source));
        let rendered = logs.get(LogId::Chat).messages().next().unwrap();
        match &rendered.body {
            RenderedBody::Code(block) => {
                assert_eq!(block.source, source);
                assert_eq!(block.language, "python");
                assert!(block.highlighted.is_some());
            }
            other => panic!("expected code block, got {other:?}"),
        }
    }

    #[test]
    fn test_code_render_rehighlights_every_block() {
        let mut logs = Logs::new();
        render(&mut logs, LogId::Chat, &Message::code("llm", "a = 1"));
        // Simulate a block that has not been highlighted yet.
        for block in logs.get_mut(LogId::Chat).code_blocks_mut() {
            block.highlighted = None;
        }
        render(&mut logs, LogId::Robot, &Message::code("llm", "b = 2"));

        for id in LogId::all() {
            for block in logs.get_mut(id).code_blocks_mut() {
                assert!(block.highlighted.is_some());
            }
        }
        assert_eq!(highlight::highlight_all(&mut logs), 2);
    }

    #[test]
    fn test_image_is_base64_with_fixed_mime() {
        let mut logs = Logs::new();
        render(
            &mut logs,
            LogId::Chat,
            &Message::new("vlm", MessageKind::Image, "aGVsbG8="),
        );
        let rendered = logs.get(LogId::Chat).messages().next().unwrap();
        match &rendered.body {
            RenderedBody::Image(image) => {
                assert_eq!(image.mime, IMAGE_MIME);
                assert_eq!(image.decoded_len, Some(5));
                assert_eq!(image.data_uri(), "data:image/jpeg;base64,aGVsbG8=");
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn test_clear_only_touches_target_log() {
        let mut logs = Logs::new();
        render_batch(&mut logs, LogId::Chat, &[Message::system("a")]);
        render_batch(&mut logs, LogId::Robot, &[Message::system("b")]);
        clear(&mut logs, LogId::Chat);
        assert!(logs.get(LogId::Chat).is_empty());
        assert_eq!(logs.get(LogId::Robot).len(), 2);
    }
}
