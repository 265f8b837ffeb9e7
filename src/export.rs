// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! CSV export of the waitlist.

use crate::model::WaitlistEntry;
use chrono::SecondsFormat;

pub const EXPORT_FILENAME: &str = "waitlist-export.csv";

const HEADER: &str = "Email,Profile URL,Willing to Pay,Status,Created At,Source Address";

/// Render entries as RFC 4180 CSV, one row per entry in the given order.
///
/// Every field is quoted and embedded quotes are doubled, so commas and
/// line breaks inside values survive.
pub fn render_csv(entries: &[WaitlistEntry]) -> String {
    let mut out = String::with_capacity(HEADER.len() + 2 + entries.len() * 96);
    out.push_str(HEADER);
    out.push_str("\r\n");

    for entry in entries {
        let created_at = entry.created_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let fields = [
            entry.email.as_str(),
            entry.profile_url.as_deref().unwrap_or(""),
            if entry.willing_to_pay { "Yes" } else { "No" },
            entry.status().as_str(),
            created_at.as_str(),
            entry.source_address.as_str(),
        ];
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            push_quoted(&mut out, field);
        }
        out.push_str("\r\n");
    }
    out
}

fn push_quoted(out: &mut String, field: &str) {
    out.push('"');
    for c in field.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
}
