//! Integrity scoring and risk classification.
//!
//! Each violation kind tolerates a small number of occurrences; only
//! the excess beyond that threshold is penalized, weighted by kind and
//! normalized against a fixed worst case of three excess violations
//! per kind.

use crate::db::models::{RiskLevel, ViolationCounts, ViolationKind};

const MAX_EXCESS_PER_KIND: f64 = 3.0;

fn threshold(kind: ViolationKind) -> u64 {
    match kind {
        ViolationKind::MultipleFaces => 1,
        ViolationKind::NoFace => 5,
        ViolationKind::LookingAway => 3,
        ViolationKind::TabSwitch => 2,
    }
}

fn weight(kind: ViolationKind) -> f64 {
    match kind {
        ViolationKind::MultipleFaces => 100.0,
        ViolationKind::NoFace => 80.0,
        ViolationKind::LookingAway => 60.0,
        ViolationKind::TabSwitch => 70.0,
    }
}

pub fn integrity_score(counts: &ViolationCounts) -> u8 {
    let mut penalty = 0.0;
    let mut max_penalty = 0.0;

    for kind in ViolationKind::ALL {
        let excess = counts.get(kind).saturating_sub(threshold(kind)) as f64;
        penalty += excess * weight(kind);
        max_penalty += weight(kind) * MAX_EXCESS_PER_KIND;
    }

    let score = 100.0 - (penalty / max_penalty) * 100.0;
    score.clamp(0.0, 100.0).round() as u8
}

pub fn risk_level(integrity_score: u8) -> RiskLevel {
    match integrity_score {
        90..=100 => RiskLevel::VeryLow,
        75..=89 => RiskLevel::Low,
        60..=74 => RiskLevel::Medium,
        40..=59 => RiskLevel::High,
        _ => RiskLevel::Critical,
    }
}
