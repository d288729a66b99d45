//! Request payloads accepted by the services and text sanitization.

use serde::Deserialize;
use validator::{Validate, ValidationError};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketReq {
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct TicketReq {
    #[serde(rename = "ticketID")]
    #[validate(range(min = 1))]
    pub ticket_id: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendMessageReq {
    #[serde(rename = "ticketID")]
    #[validate(range(min = 1))]
    pub ticket_id: i64,

    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub message: String,
}

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Escape the five HTML-special characters. Applied once, when a message is stored.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
