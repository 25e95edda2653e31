use super::content::plain_text;
use crate::models::Block;

/// Titles the system assigns to notes nobody has named yet.
pub const PLACEHOLDER_TITLES: &[&str] = &["未命名笔记", "新笔记", "untitled", "untitled note", "new note"];

/// Title a freshly created note gets.
pub const DEFAULT_NOTE_TITLE: &str = "未命名笔记";

pub fn is_placeholder_title(title: &str) -> bool {
    let t = title.trim();
    t.is_empty() || PLACEHOLDER_TITLES.iter().any(|p| t.eq_ignore_ascii_case(p))
}

/// Whether a note is effectively empty.
///
/// Content text always wins: any non-blank text makes the note non-empty whatever its
/// title. Only when the content carries no text does the title decide.
pub fn is_empty(title: &str, content: &[Block]) -> bool {
    if content.is_empty() {
        return is_placeholder_title(title);
    }

    if !plain_text(content).trim().is_empty() {
        return false;
    }

    is_placeholder_title(title)
}
