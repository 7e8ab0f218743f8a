//! Line-oriented front end over a [`Conversation`].

use std::io::{self, Write};
use std::path::Path;

use conversation::{Conversation, ConversationError, ModeFlag};
use session_store::Session;
use time::UtcOffset;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::commands::{parse_slash_command, SlashCommand, HELP_TEXT};
use crate::render::{
    render_message, render_persistence, render_sessions, render_status,
    render_transcript,
};

const PROMPT: &str = "> ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Repl<W> {
    conversation: Conversation,
    out: W,
    offset: UtcOffset,
    // Last listing shown by /sessions; /load and /delete positions refer to it.
    listed: Vec<Session>,
}

impl<W: Write> Repl<W> {
    pub fn new(conversation: Conversation, out: W) -> Self {
        Self {
            conversation,
            out,
            offset: UtcOffset::current_local_offset().unwrap_or(UtcOffset::UTC),
            listed: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_offset(mut self, offset: UtcOffset) -> Self {
        self.offset = offset;
        self
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    /// Reads lines until end of input or `/quit`.
    pub async fn run<R>(&mut self, input: R) -> io::Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        self.show_transcript()?;
        writeln!(self.out, "Type /help for commands.")?;

        let mut lines = input.lines();
        loop {
            write!(self.out, "{PROMPT}")?;
            self.out.flush()?;

            let Some(line) = lines.next_line().await? else {
                writeln!(self.out)?;
                break;
            };

            if self.handle_line(&line).await? == Flow::Quit {
                break;
            }
        }

        self.out.flush()
    }

    pub async fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        match parse_slash_command(line) {
            Some(command) => self.handle_command(command).await,
            None => {
                self.send(line).await?;
                Ok(Flow::Continue)
            }
        }
    }

    async fn handle_command(&mut self, command: SlashCommand) -> io::Result<Flow> {
        match command {
            SlashCommand::Help => writeln!(self.out, "{HELP_TEXT}")?,
            SlashCommand::Quit => return Ok(Flow::Quit),
            SlashCommand::New => match self.conversation.new_chat() {
                Ok(()) => {
                    writeln!(self.out, "Started a new chat.")?;
                    self.show_transcript()?;
                }
                Err(error) => self.report(&error)?,
            },
            SlashCommand::Sessions => self.list_sessions().await?,
            SlashCommand::Load(position) => self.load(position).await?,
            SlashCommand::Delete(position) => self.delete(position).await?,
            SlashCommand::Show => self.show_transcript()?,
            SlashCommand::Edit { position, text } => self.edit(position, &text).await?,
            SlashCommand::Attach(path) => self.attach(&path).await?,
            SlashCommand::Detach(position) => {
                match self.conversation.remove_staged_attachment(position.wrapping_sub(1)) {
                    Ok(attachment) => writeln!(self.out, "Unstaged {}.", attachment.name())?,
                    Err(error) => self.report(&error)?,
                }
            }
            SlashCommand::Mode(flag) => self.toggle_mode(flag)?,
            SlashCommand::Modes => self.show_status(true)?,
            SlashCommand::Export(path) => self.export(path.as_deref()).await?,
            SlashCommand::Usage(usage) => writeln!(self.out, "usage: {usage}")?,
            SlashCommand::Unknown(command) => {
                writeln!(self.out, "Unknown command {command}. Try /help.")?
            }
        }

        Ok(Flow::Continue)
    }

    async fn send(&mut self, line: &str) -> io::Result<()> {
        let has_staged = self
            .conversation
            .inspect(|engine| !engine.staged_attachments().is_empty());
        if line.trim().is_empty() && !has_staged {
            return Ok(());
        }

        self.conversation.set_input(line);
        match self.conversation.submit().await {
            Ok(reply) => {
                let position = self.conversation.messages().len();
                writeln!(self.out, "{}", render_message(position, &reply, self.offset))?;
                self.show_persistence()
            }
            Err(error) => self.report(&error),
        }
    }

    async fn edit(&mut self, position: usize, text: &str) -> io::Result<()> {
        let Some(target) = self
            .conversation
            .messages()
            .get(position.wrapping_sub(1))
            .map(|message| message.id.clone())
        else {
            return writeln!(self.out, "! there is no message #{position}");
        };

        match self.conversation.edit(&target, text).await {
            Ok(_) => {
                self.show_transcript()?;
                self.show_persistence()
            }
            Err(error) => self.report(&error),
        }
    }

    async fn list_sessions(&mut self) -> io::Result<()> {
        match self.conversation.sessions().await {
            Ok(sessions) => {
                self.listed = sessions;
                let active = self
                    .conversation
                    .inspect(|engine| engine.session_id().map(str::to_string));
                writeln!(
                    self.out,
                    "{}",
                    render_sessions(&self.listed, active.as_deref(), self.offset)
                )
            }
            Err(error) => self.report(&error),
        }
    }

    async fn listed_session_id(&mut self, position: usize) -> io::Result<Option<String>> {
        if self.listed.is_empty() {
            if let Ok(sessions) = self.conversation.sessions().await {
                self.listed = sessions;
            }
        }

        match self.listed.get(position.wrapping_sub(1)) {
            Some(session) => Ok(Some(session.id.clone())),
            None => {
                writeln!(self.out, "! there is no saved chat #{position}; see /sessions")?;
                Ok(None)
            }
        }
    }

    async fn load(&mut self, position: usize) -> io::Result<()> {
        let Some(session_id) = self.listed_session_id(position).await? else {
            return Ok(());
        };

        match self.conversation.load(&session_id).await {
            Ok(()) => self.show_transcript(),
            Err(error) => self.report(&error),
        }
    }

    async fn delete(&mut self, position: usize) -> io::Result<()> {
        let Some(session_id) = self.listed_session_id(position).await? else {
            return Ok(());
        };

        match self.conversation.delete_session(&session_id).await {
            Ok(was_active) => {
                self.listed.retain(|session| session.id != session_id);
                if was_active {
                    writeln!(self.out, "Deleted the open chat; started a new one.")
                } else {
                    writeln!(self.out, "Deleted saved chat #{position}.")
                }
            }
            Err(error) => self.report(&error),
        }
    }

    async fn attach(&mut self, path: &Path) -> io::Result<()> {
        match self.conversation.attach_file(path).await {
            Ok(attachment) => {
                writeln!(
                    self.out,
                    "Staged {} ({}).",
                    attachment.name(),
                    attachment.mime_type()
                )?;
                self.show_status(false)
            }
            Err(error) => self.report(&error),
        }
    }

    fn toggle_mode(&mut self, flag: ModeFlag) -> io::Result<()> {
        let active = self.conversation.toggle_mode(flag);
        let state = if active { "on" } else { "off" };
        writeln!(self.out, "{} {state}.", flag.label())
    }

    async fn export(&mut self, path: Option<&Path>) -> io::Result<()> {
        let exported = self.conversation.export();
        if exported.is_empty() {
            return writeln!(self.out, "Nothing to export yet.");
        }

        match path {
            None => writeln!(self.out, "{exported}"),
            Some(path) => match tokio::fs::write(path, format!("{exported}\n")).await {
                Ok(()) => writeln!(self.out, "Exported chat to {}.", path.display()),
                Err(error) => {
                    tracing::warn!(path = %path.display(), %error, "export failed");
                    writeln!(self.out, "! could not write {}: {error}", path.display())
                }
            },
        }
    }

    fn show_transcript(&mut self) -> io::Result<()> {
        let transcript = self.conversation.inspect(|engine| engine.transcript());
        writeln!(self.out, "{}", render_transcript(&transcript, self.offset))
    }

    fn show_status(&mut self, always: bool) -> io::Result<()> {
        let status = self
            .conversation
            .inspect(|engine| render_status(engine.modes(), engine.staged_attachments()));
        match status {
            Some(status) => writeln!(self.out, "{status}"),
            None if always => writeln!(self.out, "No modes active, nothing staged."),
            None => Ok(()),
        }
    }

    fn show_persistence(&mut self) -> io::Result<()> {
        let warning = self
            .conversation
            .inspect(|engine| render_persistence(engine.persistence()));
        match warning {
            Some(warning) => writeln!(self.out, "{warning}"),
            None => Ok(()),
        }
    }

    fn report(&mut self, error: &ConversationError) -> io::Result<()> {
        tracing::debug!(%error, "command rejected");
        writeln!(self.out, "! {error}")
    }
}
