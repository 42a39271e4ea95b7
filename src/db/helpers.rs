use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::{RiskLevel, SessionPhase, Severity, ViolationKind};
use crate::geometry::GazeDirection;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_phase(value: &str) -> Result<SessionPhase> {
    match value {
        "Active" => Ok(SessionPhase::Active),
        "Finalized" => Ok(SessionPhase::Finalized),
        other => Err(anyhow!("unknown session phase {other}")),
    }
}

pub fn parse_risk_level(value: &str) -> Result<RiskLevel> {
    match value {
        "VERY_LOW" => Ok(RiskLevel::VeryLow),
        "LOW" => Ok(RiskLevel::Low),
        "MEDIUM" => Ok(RiskLevel::Medium),
        "HIGH" => Ok(RiskLevel::High),
        "CRITICAL" => Ok(RiskLevel::Critical),
        other => Err(anyhow!("unknown risk level {other}")),
    }
}

pub fn parse_violation_kind(value: &str) -> Result<ViolationKind> {
    match value {
        "no_face" => Ok(ViolationKind::NoFace),
        "multiple_faces" => Ok(ViolationKind::MultipleFaces),
        "looking_away" => Ok(ViolationKind::LookingAway),
        "tab_switch" => Ok(ViolationKind::TabSwitch),
        other => Err(anyhow!("unknown violation kind {other}")),
    }
}

pub fn parse_severity(value: &str) -> Result<Severity> {
    match value {
        "LOW" => Ok(Severity::Low),
        "MEDIUM" => Ok(Severity::Medium),
        "HIGH" => Ok(Severity::High),
        "CRITICAL" => Ok(Severity::Critical),
        other => Err(anyhow!("unknown severity {other}")),
    }
}

pub fn parse_gaze_direction(value: &str) -> Result<GazeDirection> {
    match value {
        "center" => Ok(GazeDirection::Center),
        "left" => Ok(GazeDirection::Left),
        "right" => Ok(GazeDirection::Right),
        "up" => Ok(GazeDirection::Up),
        "down" => Ok(GazeDirection::Down),
        "away" => Ok(GazeDirection::Away),
        other => Err(anyhow!("unknown gaze direction {other}")),
    }
}
