//! UI utilities for the client.

use std::io::Write;

/// Prompt label for the chat the user currently types into.
pub fn prompt_label(current_chat: Option<i64>) -> String {
    match current_chat {
        Some(chat_id) => format!("chat {}> ", chat_id),
        None => "tsudoi> ".to_string(),
    }
}

/// Redisplay the prompt after receiving a message
pub fn redisplay_prompt(current_chat: Option<i64>) {
    print!("{}", prompt_label(current_chat));
    std::io::stdout().flush().ok();
}
