use std::path::PathBuf;

use conversation::ModeFlag;

/// A parsed `/command` line. Positions are 1-based as shown on screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    Help,
    New,
    Sessions,
    Load(usize),
    Delete(usize),
    Edit { position: usize, text: String },
    Attach(PathBuf),
    Detach(usize),
    Mode(ModeFlag),
    Modes,
    Show,
    Export(Option<PathBuf>),
    Quit,
    /// Known command with malformed arguments; carries its usage line.
    Usage(&'static str),
    Unknown(String),
}

pub const HELP_TEXT: &str = "\
Type a message and press enter to send it.

  /new                 start a new chat
  /sessions            list saved chats
  /load <n>            open saved chat n
  /delete <n>          delete saved chat n
  /show                reprint the current chat
  /edit <n> <text>     rewrite message n and regenerate from there
  /attach <path>       stage a file for the next message
  /detach <n>          unstage attachment n
  /mode <name>         toggle deep, analyze or optimize
  /modes               show active modes
  /export [path]       print or save the chat as plain text
  /help                show this help
  /quit                exit";

pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let trimmed = input.trim();
    if !trimmed.starts_with('/') {
        return None;
    }

    let (command, rest) = match trimmed.split_once(char::is_whitespace) {
        Some((command, rest)) => (command, rest.trim()),
        None => (trimmed, ""),
    };

    let parsed = match command {
        "/help" => SlashCommand::Help,
        "/new" => SlashCommand::New,
        "/sessions" => SlashCommand::Sessions,
        "/show" => SlashCommand::Show,
        "/modes" => SlashCommand::Modes,
        "/quit" | "/exit" => SlashCommand::Quit,
        "/load" => position(rest)
            .map(SlashCommand::Load)
            .unwrap_or(SlashCommand::Usage("/load <n>")),
        "/delete" => position(rest)
            .map(SlashCommand::Delete)
            .unwrap_or(SlashCommand::Usage("/delete <n>")),
        "/detach" => position(rest)
            .map(SlashCommand::Detach)
            .unwrap_or(SlashCommand::Usage("/detach <n>")),
        "/edit" => parse_edit(rest).unwrap_or(SlashCommand::Usage("/edit <n> <text>")),
        "/attach" if !rest.is_empty() => SlashCommand::Attach(PathBuf::from(rest)),
        "/attach" => SlashCommand::Usage("/attach <path>"),
        "/mode" => rest
            .parse::<ModeFlag>()
            .map(SlashCommand::Mode)
            .unwrap_or(SlashCommand::Usage("/mode <deep|analyze|optimize>")),
        "/export" if rest.is_empty() => SlashCommand::Export(None),
        "/export" => SlashCommand::Export(Some(PathBuf::from(rest))),
        _ => SlashCommand::Unknown(command.to_string()),
    };

    Some(parsed)
}

fn position(raw: &str) -> Option<usize> {
    raw.parse::<usize>().ok().filter(|position| *position > 0)
}

fn parse_edit(rest: &str) -> Option<SlashCommand> {
    let (raw_position, text) = rest.split_once(char::is_whitespace)?;
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    Some(SlashCommand::Edit {
        position: position(raw_position)?,
        text: text.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_not_a_command() {
        assert_eq!(parse_slash_command("hello /new"), None);
        assert_eq!(parse_slash_command("   "), None);
    }

    #[test]
    fn bare_commands_parse() {
        assert_eq!(parse_slash_command(" /new "), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/sessions"), Some(SlashCommand::Sessions));
        assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
        assert_eq!(parse_slash_command("/export"), Some(SlashCommand::Export(None)));
    }

    #[test]
    fn positional_arguments_are_one_based() {
        assert_eq!(parse_slash_command("/load 2"), Some(SlashCommand::Load(2)));
        assert_eq!(
            parse_slash_command("/load 0"),
            Some(SlashCommand::Usage("/load <n>"))
        );
        assert_eq!(
            parse_slash_command("/delete"),
            Some(SlashCommand::Usage("/delete <n>"))
        );
    }

    #[test]
    fn edit_keeps_the_rest_of_the_line_verbatim() {
        assert_eq!(
            parse_slash_command("/edit 3   why is  this slow?"),
            Some(SlashCommand::Edit {
                position: 3,
                text: "why is  this slow?".to_string(),
            })
        );
        assert_eq!(
            parse_slash_command("/edit 3"),
            Some(SlashCommand::Usage("/edit <n> <text>"))
        );
    }

    #[test]
    fn attach_and_mode_arguments() {
        assert_eq!(
            parse_slash_command("/attach src/main rs.txt"),
            Some(SlashCommand::Attach(PathBuf::from("src/main rs.txt")))
        );
        assert_eq!(
            parse_slash_command("/mode analysis"),
            Some(SlashCommand::Mode(ModeFlag::Analyze))
        );
        assert!(matches!(
            parse_slash_command("/mode turbo"),
            Some(SlashCommand::Usage(_))
        ));
    }

    #[test]
    fn unknown_commands_are_reported() {
        assert_eq!(
            parse_slash_command("/frobnicate now"),
            Some(SlashCommand::Unknown("/frobnicate".to_string()))
        );
    }
}
