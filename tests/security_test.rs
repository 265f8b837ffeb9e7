// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Security tests for the signup path.
//!
//! These tests replay abusive signup patterns through the admission
//! pipeline and check that each is contained.

mod harness;

use harness::{
    attacks::AttackConfig,
    generators,
    metrics::{AttackMetrics, Outcome},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use waitlist_service::{
    config::{RateLimitConfig, ValidationConfig},
    notifier::DisabledNotifier,
    validate_email, validate_profile_url, AdmissionError, AdmissionPipeline, MemoryStore,
    SignupRequest, SignupValidator, SlidingWindowLimiter,
};

/// Run a simulation against a fresh pipeline.
async fn run_attack(config: &AttackConfig, rate_config: RateLimitConfig) -> AttackMetrics {
    let pipeline = AdmissionPipeline::new(
        Arc::new(SlidingWindowLimiter::new(rate_config)),
        SignupValidator::new(ValidationConfig::default()),
        Arc::new(MemoryStore::new()),
        Arc::new(DisabledNotifier),
    );

    let sources = generators::generate_sources(config.unique_sources);
    let emails = generators::generate_emails(config.unique_emails);
    let malformed = generators::generate_malformed_emails();
    let profiles = generators::generate_profile_urls(config.total_requests);
    let foreign = generators::generate_foreign_profile_urls();

    let mut metrics = AttackMetrics::new();
    metrics.start();

    for i in 0..config.total_requests {
        let source = &sources[i % sources.len()];

        let email = if rand_bool(config.malformed_email_ratio, i) {
            malformed[i % malformed.len()].to_string()
        } else {
            emails[i % emails.len()].clone()
        };

        let profile_url = if rand_bool(config.foreign_profile_ratio, i) {
            Some(foreign[i % foreign.len()].to_string())
        } else if rand_bool(config.with_profile_ratio, i) {
            Some(profiles[i].clone())
        } else {
            None
        };

        let start = Instant::now();
        let result = pipeline
            .submit(SignupRequest {
                email: Some(email),
                profile_url,
                willing_to_pay: Some(i % 2 == 0),
                source_address: source.clone(),
                client_agent: Some("attack-sim/1.0".to_string()),
            })
            .await;
        let latency = start.elapsed();

        let outcome = match result {
            Ok(_) => Outcome::Admitted,
            Err(AdmissionError::RateLimited { .. }) => Outcome::RateLimited,
            Err(AdmissionError::MissingEmail | AdmissionError::InvalidEmail) => {
                Outcome::InvalidEmail
            }
            Err(AdmissionError::InvalidProfileUrl) => Outcome::InvalidProfileUrl,
            Err(AdmissionError::DuplicateEmail) => Outcome::Duplicate,
            Err(AdmissionError::StoreUnavailable(_)) => Outcome::StoreUnavailable,
        };
        metrics.record(outcome, source, latency);
    }

    metrics.finish();
    metrics
}

/// Simple deterministic "random" based on index and ratio.
fn rand_bool(ratio: f64, index: usize) -> bool {
    if ratio >= 1.0 {
        true
    } else if ratio <= 0.0 {
        false
    } else {
        (index as f64 * 0.618033988749895) % 1.0 < ratio
    }
}

// ============================================================================
// Attack Simulation Tests
// ============================================================================

#[tokio::test]
async fn test_single_source_flood() {
    let config = AttackConfig::single_source_flood();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.admitted, 5);
    assert_eq!(report.rate_limited, 195);
    assert_eq!(report.admitted, config.admitted_ceiling(5));
}

#[tokio::test]
async fn test_distributed_flood_capped_per_source() {
    let config = AttackConfig::distributed_flood();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    // Each address gets its own allowance and nothing more
    assert_eq!(report.unique_sources, 100);
    assert_eq!(report.admitted, config.admitted_ceiling(5));
    assert_eq!(report.rate_limited, 500);
}

#[tokio::test]
async fn test_duplicate_replay_single_entry() {
    let config = AttackConfig::duplicate_replay();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.admitted, 1);
    assert_eq!(report.duplicates, 49);
}

#[tokio::test]
async fn test_malformed_email_spray() {
    let config = AttackConfig::malformed_email_spray();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.admitted, 0);
    assert_eq!(report.validation_failed, report.total_requests);
}

#[tokio::test]
async fn test_foreign_profile_spray() {
    let config = AttackConfig::foreign_profile_spray();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.admitted, 0);
    assert_eq!(report.validation_failed, report.total_requests);
}

#[tokio::test]
async fn test_rate_limit_precedes_validation() {
    // Garbage from a single address burns its allowance like anything else
    let config = AttackConfig {
        total_requests: 20,
        unique_sources: 1,
        malformed_email_ratio: 1.0,
        ..Default::default()
    };
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.validation_failed, 5);
    assert_eq!(report.rate_limited, 15);
}

#[tokio::test]
async fn test_legitimate_trickle_admitted() {
    let config = AttackConfig::legitimate_trickle();
    let report = run_attack(&config, RateLimitConfig::default()).await.report();
    println!("{}", report);

    assert_eq!(report.admitted, report.total_requests);
    assert_eq!(report.block_rate, 0.0);
}

#[tokio::test]
async fn test_tighter_limit_respected() {
    let config = AttackConfig::single_source_flood();
    let report = run_attack(
        &config,
        RateLimitConfig {
            max_attempts: 2,
            window_secs: 60,
        },
    )
    .await
    .report();

    assert_eq!(report.admitted, 2);
}

// ============================================================================
// Input Validation Tests
// ============================================================================

#[test]
fn test_malformed_emails_rejected() {
    for email in generators::generate_malformed_emails() {
        assert!(!validate_email(email), "Malformed email {:?} should be rejected", email);
    }
}

#[test]
fn test_generated_emails_accepted() {
    for email in generators::generate_emails(50) {
        assert!(validate_email(&email), "Email {:?} should be accepted", email);
    }
}

#[test]
fn test_foreign_profile_urls_rejected() {
    for url in generators::generate_foreign_profile_urls() {
        assert!(!validate_profile_url(url), "Profile URL {:?} should be rejected", url);
    }
}

#[test]
fn test_generated_profile_urls_accepted() {
    for url in generators::generate_profile_urls(30) {
        assert!(validate_profile_url(&url), "Profile URL {:?} should be accepted", url);
    }
}

// ============================================================================
// Latency Tests
// ============================================================================

#[tokio::test]
async fn test_rate_limiter_latency() {
    let limiter = SlidingWindowLimiter::new(RateLimitConfig::default());

    let mut latencies = Vec::new();

    for i in 0..100 {
        let key = format!("10.0.0.{}", i % 20);
        let start = Instant::now();
        let _ = limiter.check(&key).await;
        latencies.push(start.elapsed());
    }

    latencies.sort();
    let median = latencies[latencies.len() / 2];
    let p99 = latencies[(latencies.len() as f64 * 0.99) as usize];

    println!("Rate limiter latency: median={:?}, p99={:?}", median, p99);

    // Rate limiting should be very fast (< 1ms)
    assert!(
        median < Duration::from_millis(1),
        "Median latency {:?} should be < 1ms",
        median
    );
}
