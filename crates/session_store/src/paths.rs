use std::path::{Path, PathBuf};

pub const SESSION_DIR: [&str; 2] = [".cowrite", "sessions"];

#[must_use]
pub fn session_root(cwd: &Path) -> PathBuf {
    cwd.join(SESSION_DIR[0]).join(SESSION_DIR[1])
}

#[must_use]
pub fn session_file_name(session_id: &str) -> String {
    format!("{session_id}.json")
}

/// Session ids double as file names, so only `[A-Za-z0-9_-]` is accepted.
#[must_use]
pub(crate) fn is_valid_session_id(session_id: &str) -> bool {
    !session_id.is_empty()
        && session_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
