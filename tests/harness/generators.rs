// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test data generators for signup simulation.

use std::net::{IpAddr, Ipv4Addr};

/// Generate a pool of caller addresses.
pub fn generate_sources(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            // Use 10.x.x.x private range
            let a = ((i >> 16) & 0xFF) as u8;
            let b = ((i >> 8) & 0xFF) as u8;
            let c = (i & 0xFF) as u8;
            IpAddr::V4(Ipv4Addr::new(10, a, b, c)).to_string()
        })
        .collect()
}

/// Generate distinct, well-formed email addresses.
pub fn generate_emails(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| format!("user{}@mail-{}.example.com", i, i % 7))
        .collect()
}

/// Generate accepted profile URLs, with and without a scheme.
pub fn generate_profile_urls(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| match i % 3 {
            0 => format!("facebook.com/person.{}", i),
            1 => format!("https://www.facebook.com/person.{}", i),
            _ => format!("http://m.fb.com/profile.php?id={}", i),
        })
        .collect()
}

/// Email inputs that must be rejected.
pub fn generate_malformed_emails() -> Vec<&'static str> {
    vec![
        "",
        "   ",
        "plainaddress",
        "@example.com",
        "alice@",
        "alice@example",
        "alice@.com",
        "alice@example.",
        "alice@@example.com",
        "al ice@example.com",
        "alice@exa mple.com",
        "alice@b@example.com",
    ]
}

/// Profile URLs that must be rejected: wrong host, lookalike host, or
/// unusable scheme.
pub fn generate_foreign_profile_urls() -> Vec<&'static str> {
    vec![
        "https://example.com/alice",
        "https://notfacebook.com/alice",
        "https://facebook.com.evil.test/alice",
        "https://evil.test/facebook.com/alice",
        "ftp://facebook.com/alice",
        "javascript:alert(1)",
        "https://",
        "not a url at all",
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_sources() {
        let sources = generate_sources(256);
        assert_eq!(sources.len(), 256);
        // All should be unique
        let unique: std::collections::HashSet<_> = sources.iter().collect();
        assert_eq!(unique.len(), 256);
    }

    #[test]
    fn test_generate_emails_unique() {
        let emails = generate_emails(100);
        let unique: std::collections::HashSet<_> = emails.iter().collect();
        assert_eq!(unique.len(), 100);
    }
}
