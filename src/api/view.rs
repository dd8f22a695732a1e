//! HTML status page

use std::fmt::Write;

use axum::extract::State;
use axum::response::Html;

use crate::api::AppState;
use crate::message::MessageRecord;
use crate::store::RECENT_LIMIT;

/// Characters of the text body shown per message
const PREVIEW_CHARS: usize = 200;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 40px; }
.header { background: #2c3e50; color: white; padding: 20px; border-radius: 5px; }
.stats { background: #ecf0f1; padding: 20px; margin: 20px 0; border-radius: 5px; }
.email { border: 1px solid #bdc3c7; margin: 10px 0; padding: 15px; border-radius: 5px; }
.email-header { font-weight: bold; color: #2c3e50; }
.email-meta { color: #7f8c8d; font-size: 0.9em; }
.email-body { margin-top: 10px; max-height: 100px; overflow: hidden; white-space: pre-wrap; }
button { background: #3498db; color: white; border: none; padding: 10px 20px; border-radius: 3px; cursor: pointer; }
button:hover { background: #2980b9; }";

const SCRIPT: &str = r#"
function escapeHtml(s) {
    return String(s).replace(/[&<>"']/g, c => ({'&':'&amp;','<':'&lt;','>':'&gt;','"':'&quot;',"'":'&#39;'}[c]));
}
function preview(text) {
    return escapeHtml(text.substring(0, 200)) + (text.length > 200 ? '...' : '');
}
function loadEmails() {
    fetch('/api/emails?limit=10')
        .then(response => response.json())
        .then(data => {
            document.getElementById('totalEmails').textContent = data.total;
            document.getElementById('totalReceived').textContent = data.stats.totalReceived;
            document.getElementById('lastReceived').textContent = data.stats.lastReceivedAt || 'Never';
            document.getElementById('emailsList').innerHTML = data.emails.map(email => `
                <div class="email">
                    <div class="email-header">${escapeHtml(email.subject)}</div>
                    <div class="email-meta">From: ${escapeHtml(email.from)} | To: ${escapeHtml(email.to)} | ${new Date(email.receivedAt).toLocaleString()}</div>
                    <div class="email-body">${preview(email.text)}</div>
                </div>`).join('');
        });
}
function clearAllEmails() {
    if (confirm('Are you sure you want to clear all emails?')) {
        fetch('/api/emails', { method: 'DELETE' }).then(() => loadEmails());
    }
}
setInterval(loadEmails, 5000);
"#;

pub async fn status_page(State(state): State<AppState>) -> Html<String> {
    let page = state.store.list(0, RECENT_LIMIT);
    let stats = &page.stats;

    let last_received = stats
        .last_received_at
        .map(|at| at.to_rfc3339())
        .unwrap_or_else(|| "Never".to_owned());

    let mut emails = String::new();
    for record in &page.messages {
        render_email(&mut emails, record);
    }

    let service = escape_html(&state.service);
    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{service}</title>
<style>{STYLE}</style>
</head>
<body>
<div class="header">
    <h1>{service}</h1>
    <p>Development and testing mail sink</p>
</div>
<div class="stats">
    <h3>Statistics</h3>
    <p><strong>Stored Emails:</strong> <span id="totalEmails">{current}</span></p>
    <p><strong>Total Received:</strong> <span id="totalReceived">{total}</span></p>
    <p><strong>Last Received:</strong> <span id="lastReceived">{last_received}</span></p>
    <button onclick="loadEmails()">Refresh</button>
    <button onclick="clearAllEmails()">Clear All</button>
</div>
<div id="emails">
    <h3>Recent Emails</h3>
    <div id="emailsList">{emails}</div>
</div>
<script>{SCRIPT}</script>
</body>
</html>"#,
        current = stats.current_count,
        total = stats.total_received,
    ))
}

fn render_email(out: &mut String, record: &MessageRecord) {
    let mut preview: String = record.text.chars().take(PREVIEW_CHARS).collect();
    if record.text.chars().count() > PREVIEW_CHARS {
        preview.push_str("...");
    }

    // Writing to a String cannot fail
    let _ = write!(
        out,
        r#"
        <div class="email">
            <div class="email-header">{subject}</div>
            <div class="email-meta">From: {from} | To: {to} | {received}</div>
            <div class="email-body">{preview}</div>
        </div>"#,
        subject = escape_html(&record.subject),
        from = escape_html(&record.from),
        to = escape_html(&record.to),
        received = record.received_at.format("%Y-%m-%d %H:%M:%S UTC"),
        preview = escape_html(&preview),
    );
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
