//! Markup fragments for rich chat replies
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0
//!
//! ## Changelog
//! - 1.0.0: Replaces Discord embeds with HTML fragments sent through the markup chat opcode

use html_escape::{encode_double_quoted_attribute, encode_text};

use crate::database::EmojiRecord;

/// Maximum rendered size of an emoji image, in pixels
pub const EMOJI_MAX_SIZE: u32 = 64;

/// Usage card for the help command
pub fn help_card(prefix: &str, shorthand: bool) -> String {
    let prefix = encode_text(prefix);
    let mut html = String::from("<div class=\"vmbot-help\"><b>Emoji bot commands</b><ul>");
    html.push_str(&format!("<li><code>{prefix}help</code> - show this message</li>"));
    html.push_str(&format!(
        "<li><code>{prefix}emojilist</code> - list the emojis available on this VM</li>"
    ));
    html.push_str(&format!(
        "<li><code>{prefix}emoji &lt;name&gt;</code> - send an emoji (staff only)</li>"
    ));
    if shorthand {
        html.push_str("<li><code>:name:</code> - shorthand for the emoji command</li>");
    }
    html.push_str("</ul></div>");
    html
}

/// List of emojis with their previews
pub fn emoji_list(records: &[EmojiRecord]) -> String {
    let mut html = String::from("<div class=\"vmbot-emojilist\"><b>Available emojis</b><ul>");
    for record in records {
        html.push_str(&format!(
            "<li><img src=\"{url}\" alt=\"{alt}\" style=\"max-height:16px\"> <code>{name}</code>",
            url = encode_double_quoted_attribute(&record.url),
            alt = encode_double_quoted_attribute(&record.name),
            name = encode_text(&record.name),
        ));
        if !record.description.is_empty() {
            html.push_str(&format!(" - {}", encode_text(&record.description)));
        }
        html.push_str("</li>");
    }
    html.push_str("</ul></div>");
    html
}

/// Inline image for one emoji
pub fn emoji_image(record: &EmojiRecord) -> String {
    format!(
        "<img src=\"{url}\" alt=\":{name}:\" title=\"{title}\" style=\"max-width:{size}px;max-height:{size}px\">",
        url = encode_double_quoted_attribute(&record.url),
        name = encode_double_quoted_attribute(&record.name),
        title = encode_double_quoted_attribute(&record.description),
        size = EMOJI_MAX_SIZE,
    )
}
