//! HTML pages and fragments from templates embedded at compile time.
//!
//! Templates use `{{ key }}` slots. `Value::Text` is HTML-escaped on the way
//! in; `Value::Html` is inserted as-is and must already be safe markup.

use tracing::warn;

use inbox_types::api::UserProfile;
use inbox_types::models::Message;

pub struct Template {
    name: &'static str,
    source: &'static str,
}

pub enum Value<'a> {
    Text(&'a str),
    Html(&'a str),
}

pub const LAYOUT: Template = Template {
    name: "layout",
    source: include_str!("../templates/layout.html"),
};
pub const INDEX: Template = Template {
    name: "index",
    source: include_str!("../templates/index.html"),
};
pub const DASHBOARD: Template = Template {
    name: "dashboard",
    source: include_str!("../templates/dashboard.html"),
};
pub const NOT_FOUND: Template = Template {
    name: "404",
    source: include_str!("../templates/404.html"),
};
pub const MESSAGE: Template = Template {
    name: "partials/message",
    source: include_str!("../templates/partials/message.html"),
};
pub const MESSAGE_DETAIL: Template = Template {
    name: "partials/message_detail",
    source: include_str!("../templates/partials/message_detail.html"),
};

impl Template {
    pub fn render(&self, context: &[(&str, Value<'_>)]) -> String {
        let mut out = String::with_capacity(self.source.len());
        let mut rest = self.source;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];

            let Some(end) = after.find("}}") else {
                // Unterminated slot: emit the remainder untouched.
                out.push_str(&rest[start..]);
                return out;
            };

            let key = after[..end].trim();
            match context.iter().find(|(k, _)| *k == key) {
                Some((_, Value::Text(text))) => escape_into(&mut out, text),
                Some((_, Value::Html(html))) => out.push_str(html),
                None => warn!("Template '{}' has no value for '{}'", self.name, key),
            }
            rest = &after[end + 2..];
        }

        out.push_str(rest);
        out
    }
}

pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
}

fn page(title: &str, body: &str) -> String {
    LAYOUT.render(&[("title", Value::Text(title)), ("body", Value::Html(body))])
}

pub fn index_page(auth_failed: bool) -> String {
    let banner = if auth_failed {
        r#"<p class="error">Sign-in failed. Please try again.</p>"#
    } else {
        ""
    };
    page("Sign in", &INDEX.render(&[("error_banner", Value::Html(banner))]))
}

/// `user` is absent only when the auth gate is bypassed for local development.
pub fn dashboard_page(user: Option<&UserProfile>) -> String {
    let name = user.map_or("Developer", UserProfile::display_name);
    let email = user.and_then(|u| u.email.as_deref()).unwrap_or_default();
    let avatar = user
        .and_then(|u| u.picture.as_deref())
        .map(|src| {
            format!(
                r#"<img class="avatar" src="{}" alt="" referrerpolicy="no-referrer">"#,
                escape(src)
            )
        })
        .unwrap_or_default();

    let body = DASHBOARD.render(&[
        ("avatar", Value::Html(&avatar)),
        ("name", Value::Text(name)),
        ("email", Value::Text(email)),
    ]);
    page("Dashboard", &body)
}

pub fn not_found_page() -> String {
    page("Not found", &NOT_FOUND.render(&[]))
}

pub fn message_fragment(message: &Message) -> String {
    let id = message.id.to_string();
    let created_at = message.created_at.to_rfc3339();
    let date = message.created_at.format("%b %e, %Y").to_string();

    MESSAGE.render(&[
        ("state", Value::Text(if message.is_read { "read" } else { "unread" })),
        ("id", Value::Text(&id)),
        ("sender", Value::Text(&message.sender.sender_name)),
        ("subject", Value::Text(&message.subject)),
        ("created_at", Value::Text(&created_at)),
        ("date", Value::Text(&date)),
    ])
}

pub fn message_list(messages: &[Message]) -> String {
    messages.iter().map(message_fragment).collect()
}

pub fn message_detail(message: &Message) -> String {
    let id = message.id.to_string();
    let created_at = message.created_at.to_rfc3339();
    let date = message.created_at.format("%b %e, %Y %H:%M").to_string();

    MESSAGE_DETAIL.render(&[
        ("id", Value::Text(&id)),
        ("sender", Value::Text(&message.sender.sender_name)),
        ("created_at", Value::Text(&created_at)),
        ("date", Value::Text(&date)),
        ("message", Value::Text(&message.message)),
    ])
}
