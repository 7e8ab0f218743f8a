use chat_provider::{Message, Role};
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

const SEPARATOR: &str = "\n\n---\n\n";

/// Plain-text projection of a conversation in the local timezone.
#[must_use]
pub fn export_transcript(messages: &[Message]) -> String {
    let offset = UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC);
    export_with_offset(messages, offset)
}

/// Like [`export_transcript`] with an explicit UTC offset.
#[must_use]
pub fn export_with_offset(messages: &[Message], offset: UtcOffset) -> String {
    messages
        .iter()
        .filter(|message| !message.is_placeholder())
        .map(|message| export_block(message, offset))
        .collect::<Vec<_>>()
        .join(SEPARATOR)
}

fn export_block(message: &Message, offset: UtcOffset) -> String {
    let role = match message.role {
        Role::User => "USER",
        Role::Model => "MODEL",
    };
    let mut block = format!(
        "[{role} - {}]\n{}",
        format_timestamp(message.timestamp, offset),
        message.content
    );

    if !message.attachments.is_empty() {
        let names: Vec<&str> = message
            .attachments
            .iter()
            .map(|attachment| attachment.name())
            .collect();
        block.push_str("\nAttachments: ");
        block.push_str(&names.join(", "));
    }

    block
}

fn format_timestamp(millis: i64, offset: UtcOffset) -> String {
    let format = format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .map(|instant| instant.to_offset(offset))
        .and_then(|instant| instant.format(&format).ok())
        .unwrap_or_else(|| millis.to_string())
}
