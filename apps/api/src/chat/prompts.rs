//! System prompt for proxied chat turns.

use crate::models::User;

const BASE_PROMPT: &str = "You are a friendly, knowledgeable assistant inside a Telegram chat. \
    Answer clearly and concisely. Use Markdown sparingly: Telegram renders bold, italics and \
    code blocks, but not tables or headings.";

pub fn system_prompt(user: &User) -> String {
    format!(
        "{BASE_PROMPT}\n\nThe user's name is {name}. Reply in the language with code '{lang}' \
         unless the user writes in another language.",
        name = user.first_name,
        lang = user.language_code,
    )
}
