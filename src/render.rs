//! Plain-text rendering of conversation state for the terminal.

use chat_provider::{Attachment, Message, Role};
use conversation::{ModeSet, PersistenceStatus};
use session_store::Session;
use time::formatting::Formattable;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Renders `transcript`; real messages are numbered from 1, placeholders are not.
#[must_use]
pub fn render_transcript(transcript: &[Message], offset: UtcOffset) -> String {
    let mut position = 0;
    transcript
        .iter()
        .map(|message| {
            if message.is_placeholder() {
                render_placeholder(message)
            } else {
                position += 1;
                render_message(position, message, offset)
            }
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[must_use]
pub fn render_message(position: usize, message: &Message, offset: UtcOffset) -> String {
    let speaker = match message.role {
        Role::User => "you",
        Role::Model => "assistant",
    };
    let mut rendered = format!(
        "#{position} {speaker} [{}]\n{}",
        clock(message.timestamp, offset),
        message.content
    );

    for attachment in &message.attachments {
        rendered.push('\n');
        rendered.push_str(&render_attachment(attachment));
    }

    rendered
}

fn render_placeholder(message: &Message) -> String {
    format!("~ {}", message.content)
}

#[must_use]
pub fn render_attachment(attachment: &Attachment) -> String {
    format!("  + {} ({})", attachment.name(), attachment.mime_type())
}

/// Numbered saved-session list; the active session is starred.
#[must_use]
pub fn render_sessions(sessions: &[Session], active: Option<&str>, offset: UtcOffset) -> String {
    if sessions.is_empty() {
        return "No saved chats yet.".to_string();
    }

    sessions
        .iter()
        .enumerate()
        .map(|(index, session)| {
            let marker = if Some(session.id.as_str()) == active {
                "*"
            } else {
                " "
            };
            format!(
                "{marker}{:>3}. {}  ({} messages, {})",
                index + 1,
                session.title,
                session.messages.len(),
                date_time(session.last_updated, offset)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// One-line summary of modes and staged attachments; `None` when both are empty.
#[must_use]
pub fn render_status(modes: ModeSet, staged: &[Attachment]) -> Option<String> {
    let mut sections = Vec::new();

    let active: Vec<&str> = modes.active().map(|flag| flag.label()).collect();
    if !active.is_empty() {
        sections.push(format!("modes: {}", active.join(", ")));
    }

    if !staged.is_empty() {
        let names: Vec<String> = staged
            .iter()
            .enumerate()
            .map(|(index, attachment)| format!("{}:{}", index + 1, attachment.name()))
            .collect();
        sections.push(format!("staged: {}", names.join(" ")));
    }

    (!sections.is_empty()).then(|| format!("[{}]", sections.join(" | ")))
}

#[must_use]
pub fn render_persistence(status: &PersistenceStatus) -> Option<String> {
    match status {
        PersistenceStatus::Synced => None,
        PersistenceStatus::Degraded(error) => Some(format!("! not saved: {error}")),
    }
}

fn clock(millis: i64, offset: UtcOffset) -> String {
    format_millis(millis, offset, format_description!("[hour]:[minute]"))
}

fn date_time(millis: i64, offset: UtcOffset) -> String {
    format_millis(
        millis,
        offset,
        format_description!("[year]-[month]-[day] [hour]:[minute]"),
    )
}

fn format_millis(
    millis: i64,
    offset: UtcOffset,
    format: &(impl Formattable + ?Sized),
) -> String {
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000)
        .ok()
        .map(|instant| instant.to_offset(offset))
        .and_then(|instant| instant.format(format).ok())
        .unwrap_or_else(|| millis.to_string())
}

#[cfg(test)]
mod tests {
    use conversation::ModeFlag;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn transcript_numbers_real_messages_only() {
        let transcript = vec![
            Message::user(
                "Why is this slow?",
                vec![Attachment::new("main.rs", "text/plain", "AA==")],
                1_700_000_000_000,
            ),
            Message::model("You clone inside the loop.", 1_700_000_060_000),
            Message::placeholder("Thinking...", 1_700_000_060_000),
        ];

        assert_eq!(
            render_transcript(&transcript, UtcOffset::UTC),
            "#1 you [22:13]\nWhy is this slow?\n  + main.rs (text/plain)\n\n\
             #2 assistant [22:14]\nYou clone inside the loop.\n\n\
             ~ Thinking..."
        );
    }

    #[test]
    fn status_lists_modes_and_staged_files() {
        assert_eq!(render_status(ModeSet::default(), &[]), None);

        let modes = ModeSet::default().with(ModeFlag::Analyze);
        let staged = vec![
            Attachment::new("a.png", "image/png", "AA=="),
            Attachment::new("b.txt", "text/plain", "AA=="),
        ];
        assert_eq!(
            render_status(modes, &staged).as_deref(),
            Some("[modes: Analysis | staged: 1:a.png 2:b.txt]")
        );
    }

    #[test]
    fn persistence_warning_only_when_degraded() {
        assert_eq!(render_persistence(&PersistenceStatus::Synced), None);
        assert_eq!(
            render_persistence(&PersistenceStatus::Degraded("disk full".to_string())).as_deref(),
            Some("! not saved: disk full")
        );
    }
}
