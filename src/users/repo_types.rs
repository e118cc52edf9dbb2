use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String, // Argon2 PHC string, never plaintext
    pub age: i32,
    pub favorite_color: String,
    pub favorite_operating_system: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Client-supplied user fields, as received on create/update/login.
///
/// Every field is optional on the wire; missing strings become empty and are
/// rejected by validation where required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserDraft {
    /// Ignored by the store; ids are always server-assigned.
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    pub favorite_color: String,
    pub favorite_operating_system: String,
}

impl UserDraft {
    /// Normalise the draft for persistence: drop the id, trim and HTML-escape
    /// the free-text fields. The password is left untouched.
    pub fn prepared(mut self) -> Self {
        self.id = None;
        self.name = escape_html(self.name.trim());
        self.email = escape_html(self.email.trim());
        self.favorite_color = escape_html(self.favorite_color.trim());
        self.favorite_operating_system = escape_html(self.favorite_operating_system.trim());
        self
    }
}

/// Escapes `<`, `>`, `&`, `'` and `"` the same way Go's `html.EscapeString` does.
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '\'' => out.push_str("&#39;"),
            '"' => out.push_str("&#34;"),
            _ => out.push(c),
        }
    }
    out
}
