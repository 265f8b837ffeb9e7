// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Test harness for signup abuse simulation.
//!
//! Drives the admission pipeline with generated traffic and tallies how
//! each request was handled.

pub mod attacks;
pub mod generators;
pub mod metrics;
