//! Temporal correlation between looking-away events and question timing.
//!
//! A candidate who glances off-screen in the seconds before questions
//! are asked — repeatedly — is likely reading from something. The
//! finding is advisory: it carries a confidence, never a verdict.

use chrono::Duration;

use crate::db::models::{QuestionMark, SuspiciousPatterns};

/// How far before a question a looking-away event counts as correlated.
const CORRELATION_WINDOW_SECS: i64 = 10;
/// Fraction of preceded questions above which the pattern is flagged.
const SUSPICION_RATIO: f64 = 0.3;

pub fn correlate_with_questions(
    marks: &[QuestionMark],
    looking_away: &[chrono::DateTime<chrono::Utc>],
) -> SuspiciousPatterns {
    if marks.is_empty() {
        return SuspiciousPatterns {
            is_suspicious: false,
            confidence: 0.0,
            details: "no questions recorded".to_string(),
        };
    }

    if looking_away.is_empty() {
        return SuspiciousPatterns {
            is_suspicious: false,
            confidence: 0.0,
            details: "no looking-away violations recorded".to_string(),
        };
    }

    let window = Duration::seconds(CORRELATION_WINDOW_SECS);
    let preceded = marks
        .iter()
        .filter(|mark| {
            looking_away
                .iter()
                .any(|t| *t <= mark.asked_at && mark.asked_at - *t <= window)
        })
        .count();

    let ratio = preceded as f64 / marks.len() as f64;

    SuspiciousPatterns {
        is_suspicious: ratio > SUSPICION_RATIO,
        confidence: ratio,
        details: format!(
            "looking-away events preceded {} of {} questions",
            preceded,
            marks.len()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap()
    }

    fn mark(index: u32, offset_secs: i64) -> QuestionMark {
        QuestionMark {
            id: None,
            session_id: "s".to_string(),
            question_index: index,
            asked_at: t0() + Duration::seconds(offset_secs),
        }
    }

    #[test]
    fn four_of_ten_preceded_questions_flag_suspicion() {
        // Questions a minute apart; looking-away events 5s before four
        // of them.
        let marks: Vec<QuestionMark> = (0..10).map(|i| mark(i, i as i64 * 60)).collect();
        let looking_away: Vec<DateTime<Utc>> = [0i64, 2, 5, 8]
            .iter()
            .map(|i| t0() + Duration::seconds(i * 60 - 5))
            .collect();

        let finding = correlate_with_questions(&marks, &looking_away);
        assert!(finding.is_suspicious);
        assert!((finding.confidence - 0.4).abs() < 1e-9);
        assert_eq!(
            finding.details,
            "looking-away events preceded 4 of 10 questions"
        );
    }

    #[test]
    fn three_of_ten_is_below_the_flag_line() {
        let marks: Vec<QuestionMark> = (0..10).map(|i| mark(i, i as i64 * 60)).collect();
        let looking_away: Vec<DateTime<Utc>> = [1i64, 4, 7]
            .iter()
            .map(|i| t0() + Duration::seconds(i * 60 - 3))
            .collect();

        let finding = correlate_with_questions(&marks, &looking_away);
        assert!(!finding.is_suspicious);
        assert!((finding.confidence - 0.3).abs() < 1e-9);
    }

    #[test]
    fn events_outside_the_window_do_not_count() {
        let marks = vec![mark(0, 60)];
        // 11 seconds before, and 1 second after: neither correlates.
        let looking_away = vec![
            t0() + Duration::seconds(49),
            t0() + Duration::seconds(61),
        ];

        let finding = correlate_with_questions(&marks, &looking_away);
        assert!(!finding.is_suspicious);
        assert_eq!(finding.confidence, 0.0);
    }

    #[test]
    fn no_questions_yield_neutral_finding() {
        let finding = correlate_with_questions(&[], &[t0()]);
        assert!(!finding.is_suspicious);
        assert_eq!(finding.details, "no questions recorded");
    }

    #[test]
    fn no_events_yield_neutral_finding() {
        let finding = correlate_with_questions(&[mark(0, 0)], &[]);
        assert!(!finding.is_suspicious);
        assert_eq!(finding.details, "no looking-away violations recorded");
    }
}
