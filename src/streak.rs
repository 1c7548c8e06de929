//! Streak engine: recurrence rules, calendar arithmetic and the streak
//! transition applied on every accepted log event.
//!
//! Everything in this module is pure. The caller injects `today` (the UTC
//! date of the log event), so the transition can be exercised with fixed
//! dates instead of the wall clock. All calendar math is UTC; weeks run
//! Sunday through Saturday.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use thiserror::Error;

/// Raised when a stored or submitted recurrence rule cannot be parsed.
///
/// Rule dispatch itself is exhaustive over [`RecurrenceRule`]; this error
/// only exists on the boundary where the label/day-name pair enters the
/// typed world.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidRule {
    #[error("unknown frequency label '{0}'")]
    UnknownLabel(String),
    #[error("unknown weekday '{0}'")]
    UnknownWeekday(String),
}

/// How often a habit is due.
///
/// Stored and transmitted as a lowercase label plus a list of full weekday
/// names (only meaningful for `custom`), the pair [`RecurrenceRule::from_parts`]
/// accepts and [`RecurrenceRule::label`]/[`RecurrenceRule::day_names`] emit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecurrenceRule {
    Daily,
    Weekly,
    Weekdays,
    Weekends,
    Custom(Vec<Weekday>),
}

impl RecurrenceRule {
    pub fn from_parts(label: &str, days: &[String]) -> Result<Self, InvalidRule> {
        match label.trim().to_lowercase().as_str() {
            "daily" => Ok(Self::Daily),
            "weekly" => Ok(Self::Weekly),
            "weekdays" => Ok(Self::Weekdays),
            "weekends" => Ok(Self::Weekends),
            "custom" => {
                let mut parsed: Vec<Weekday> = Vec::with_capacity(days.len());
                for day in days {
                    let weekday = parse_weekday(day)
                        .ok_or_else(|| InvalidRule::UnknownWeekday(day.clone()))?;
                    if !parsed.contains(&weekday) {
                        parsed.push(weekday);
                    }
                }
                Ok(Self::Custom(parsed))
            }
            other => Err(InvalidRule::UnknownLabel(other.to_string())),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Weekdays => "weekdays",
            Self::Weekends => "weekends",
            Self::Custom(_) => "custom",
        }
    }

    /// Full weekday names for the `custom` day set; empty for every other rule.
    pub fn day_names(&self) -> Vec<String> {
        match self {
            Self::Custom(days) => days.iter().map(|d| full_name(*d).to_string()).collect(),
            _ => Vec::new(),
        }
    }
}

/// Streak counter plus the UTC date of the most recent accepted log.
///
/// `streak == 0` exactly when the habit has never been logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreakState {
    pub streak: u32,
    pub last_logged: Option<NaiveDate>,
}

fn full_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

fn parse_weekday(name: &str) -> Option<Weekday> {
    match name.trim().to_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Full English weekday name of a UTC calendar date, locale-independent.
#[allow(dead_code)]
pub fn weekday_name(date: NaiveDate) -> &'static str {
    full_name(date.weekday())
}

/// Whether two UTC timestamps fall on the same UTC calendar date.
pub fn is_same_utc_day(d1: DateTime<Utc>, d2: DateTime<Utc>) -> bool {
    d1.date_naive() == d2.date_naive()
}

/// The Sunday at or before `date` and the Saturday six days after it.
pub fn week_range(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let sunday = date - Duration::days(date.weekday().num_days_from_sunday() as i64);
    (sunday, sunday + Duration::days(6))
}

/// The UTC calendar date immediately preceding `date`.
pub fn previous_day(date: NaiveDate) -> NaiveDate {
    date - Duration::days(1)
}

/// Whether `date` counts as a scheduled day under `rule`.
///
/// `Weekly` is week-granularity; any day of the week can carry the week's
/// occurrence, so per-day evaluation always answers yes. The break decision
/// for weekly habits lives in [`should_break_streak`] instead.
pub fn is_scheduled(rule: &RecurrenceRule, date: NaiveDate) -> bool {
    match rule {
        RecurrenceRule::Daily | RecurrenceRule::Weekly => true,
        RecurrenceRule::Weekdays => !matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        RecurrenceRule::Weekends => matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        RecurrenceRule::Custom(days) => days.contains(&date.weekday()),
    }
}

/// Decide whether logging on `today` breaks the running streak.
///
/// A first-ever log never breaks. `daily` breaks unless the last log was
/// exactly yesterday. `weekly` breaks when the last log predates the Sunday
/// starting the week containing `today`. The remaining rules break when
/// yesterday was itself a scheduled day that went unlogged; an unscheduled
/// gap day is free.
pub fn should_break_streak(
    rule: &RecurrenceRule,
    last_logged: Option<NaiveDate>,
    today: NaiveDate,
) -> bool {
    let Some(last) = last_logged else {
        return false;
    };
    match rule {
        RecurrenceRule::Daily => previous_day(today) != last,
        RecurrenceRule::Weekly => last < week_range(today).0,
        RecurrenceRule::Weekdays | RecurrenceRule::Weekends | RecurrenceRule::Custom(_) => {
            let yesterday = previous_day(today);
            is_scheduled(rule, yesterday) && last != yesterday
        }
    }
}

/// Apply one accepted log event to the streak state.
///
/// Pure: no clock, no storage, deterministic for identical inputs. The
/// caller is responsible for the idempotency check (no existing log on
/// `today`) before invoking this.
pub fn evaluate_transition(
    state: &StreakState,
    rule: &RecurrenceRule,
    today: NaiveDate,
) -> StreakState {
    let streak = if should_break_streak(rule, state.last_logged, today) {
        1
    } else {
        state.streak + 1
    };
    StreakState {
        streak,
        last_logged: Some(today),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn state(streak: u32, last_logged: Option<NaiveDate>) -> StreakState {
        StreakState { streak, last_logged }
    }

    // 2025-01-05 is a Sunday; the week runs through Saturday 2025-01-11.

    #[test]
    fn weekday_names_are_locale_independent() {
        assert_eq!(weekday_name(date(2025, 1, 5)), "Sunday");
        assert_eq!(weekday_name(date(2025, 1, 6)), "Monday");
        assert_eq!(weekday_name(date(2025, 1, 11)), "Saturday");
    }

    #[test]
    fn week_range_spans_sunday_through_saturday() {
        let (start, end) = week_range(date(2025, 1, 8));
        assert_eq!(start, date(2025, 1, 5));
        assert_eq!(end, date(2025, 1, 11));

        // A Sunday is its own week start.
        let (start, end) = week_range(date(2025, 1, 5));
        assert_eq!(start, date(2025, 1, 5));
        assert_eq!(end, date(2025, 1, 11));
    }

    #[test]
    fn previous_day_crosses_month_and_year_boundaries() {
        assert_eq!(previous_day(date(2025, 3, 1)), date(2025, 2, 28));
        assert_eq!(previous_day(date(2025, 1, 1)), date(2024, 12, 31));
    }

    #[test]
    fn same_utc_day_ignores_time_of_day() {
        let morning = Utc.with_ymd_and_hms(2025, 1, 6, 0, 0, 1).unwrap();
        let night = Utc.with_ymd_and_hms(2025, 1, 6, 23, 59, 59).unwrap();
        let next = Utc.with_ymd_and_hms(2025, 1, 7, 0, 0, 0).unwrap();
        assert!(is_same_utc_day(morning, night));
        assert!(!is_same_utc_day(night, next));
    }

    #[test]
    fn rule_parsing_accepts_labels_case_insensitively() {
        assert_eq!(
            RecurrenceRule::from_parts("Daily", &[]).unwrap(),
            RecurrenceRule::Daily
        );
        assert_eq!(
            RecurrenceRule::from_parts(" weekends ", &[]).unwrap(),
            RecurrenceRule::Weekends
        );
        let custom = RecurrenceRule::from_parts(
            "custom",
            &["Monday".into(), "monday".into(), "WEDNESDAY".into()],
        )
        .unwrap();
        assert_eq!(
            custom,
            RecurrenceRule::Custom(vec![Weekday::Mon, Weekday::Wed])
        );
    }

    #[test]
    fn rule_parsing_rejects_unknown_labels_and_days() {
        assert_eq!(
            RecurrenceRule::from_parts("fortnightly", &[]),
            Err(InvalidRule::UnknownLabel("fortnightly".into()))
        );
        assert_eq!(
            RecurrenceRule::from_parts("custom", &["Mondayish".into()]),
            Err(InvalidRule::UnknownWeekday("Mondayish".into()))
        );
    }

    #[test]
    fn rule_round_trips_through_label_and_day_names() {
        let rule = RecurrenceRule::from_parts(
            "custom",
            &["Monday".into(), "Wednesday".into()],
        )
        .unwrap();
        assert_eq!(rule.label(), "custom");
        assert_eq!(rule.day_names(), vec!["Monday", "Wednesday"]);
        assert!(RecurrenceRule::Daily.day_names().is_empty());
    }

    #[test]
    fn scheduling_per_rule() {
        let monday = date(2025, 1, 6);
        let saturday = date(2025, 1, 11);
        assert!(is_scheduled(&RecurrenceRule::Daily, saturday));
        assert!(is_scheduled(&RecurrenceRule::Weekdays, monday));
        assert!(!is_scheduled(&RecurrenceRule::Weekdays, saturday));
        assert!(is_scheduled(&RecurrenceRule::Weekends, saturday));
        assert!(!is_scheduled(&RecurrenceRule::Weekends, monday));
        let custom = RecurrenceRule::Custom(vec![Weekday::Mon]);
        assert!(is_scheduled(&custom, monday));
        assert!(!is_scheduled(&custom, saturday));
    }

    #[test]
    fn first_log_never_breaks_for_any_rule() {
        let rules = [
            RecurrenceRule::Daily,
            RecurrenceRule::Weekly,
            RecurrenceRule::Weekdays,
            RecurrenceRule::Weekends,
            RecurrenceRule::Custom(vec![Weekday::Mon]),
        ];
        for rule in &rules {
            let next = evaluate_transition(&state(0, None), rule, date(2025, 1, 6));
            assert_eq!(next.streak, 1, "rule {:?}", rule);
            assert_eq!(next.last_logged, Some(date(2025, 1, 6)));
        }
    }

    #[test]
    fn daily_consecutive_days_increment() {
        let next = evaluate_transition(
            &state(3, Some(date(2025, 1, 6))),
            &RecurrenceRule::Daily,
            date(2025, 1, 7),
        );
        assert_eq!(next.streak, 4);
    }

    #[test]
    fn daily_skipped_day_resets() {
        let next = evaluate_transition(
            &state(3, Some(date(2025, 1, 6))),
            &RecurrenceRule::Daily,
            date(2025, 1, 8),
        );
        assert_eq!(next.streak, 1);
        assert_eq!(next.last_logged, Some(date(2025, 1, 8)));
    }

    #[test]
    fn weekly_second_log_in_same_week_increments() {
        // Logged Monday, logging again Friday of the same week.
        let next = evaluate_transition(
            &state(2, Some(date(2025, 1, 6))),
            &RecurrenceRule::Weekly,
            date(2025, 1, 10),
        );
        assert_eq!(next.streak, 3);
    }

    #[test]
    fn weekly_log_after_week_boundary_resets() {
        // Last log Friday 2025-01-10; next log Tuesday 2025-01-14, whose week
        // starts Sunday 2025-01-12. The last log predates the week start.
        let next = evaluate_transition(
            &state(4, Some(date(2025, 1, 10))),
            &RecurrenceRule::Weekly,
            date(2025, 1, 14),
        );
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn weekly_skipping_a_whole_week_resets() {
        // Logged in the week of Jan 5, first log again in the week of Jan 19.
        let next = evaluate_transition(
            &state(7, Some(date(2025, 1, 8))),
            &RecurrenceRule::Weekly,
            date(2025, 1, 21),
        );
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn weekdays_friday_to_monday_survives_the_weekend() {
        // Friday 2025-01-10 -> Monday 2025-01-13. Sunday was not scheduled.
        let next = evaluate_transition(
            &state(5, Some(date(2025, 1, 10))),
            &RecurrenceRule::Weekdays,
            date(2025, 1, 13),
        );
        assert_eq!(next.streak, 6);
    }

    #[test]
    fn weekdays_missed_scheduled_day_resets() {
        // Monday 2025-01-06 logged, Tuesday skipped, Wednesday logged.
        let next = evaluate_transition(
            &state(5, Some(date(2025, 1, 6))),
            &RecurrenceRule::Weekdays,
            date(2025, 1, 8),
        );
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn weekends_friday_gap_is_free() {
        // Sunday 2025-01-12 -> Saturday 2025-01-18; Friday was unscheduled.
        let next = evaluate_transition(
            &state(2, Some(date(2025, 1, 12))),
            &RecurrenceRule::Weekends,
            date(2025, 1, 18),
        );
        assert_eq!(next.streak, 3);
    }

    #[test]
    fn weekends_missed_sunday_resets() {
        // Saturday 2025-01-11 logged, Sunday skipped, logging Monday.
        let next = evaluate_transition(
            &state(2, Some(date(2025, 1, 11))),
            &RecurrenceRule::Weekends,
            date(2025, 1, 13),
        );
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn custom_unscheduled_gap_days_increment() {
        let rule = RecurrenceRule::Custom(vec![Weekday::Mon, Weekday::Wed]);
        // Monday 2025-01-06 -> Wednesday 2025-01-08; Tuesday is not in the set.
        let next = evaluate_transition(&state(1, Some(date(2025, 1, 6))), &rule, date(2025, 1, 8));
        assert_eq!(next.streak, 2);
    }

    #[test]
    fn custom_missed_scheduled_day_resets() {
        let rule = RecurrenceRule::Custom(vec![Weekday::Mon, Weekday::Wed]);
        // Wednesday 2025-01-08 logged, Monday 2025-01-13 skipped, logging
        // Tuesday 2025-01-14: yesterday was a scheduled Monday with no log.
        let next = evaluate_transition(&state(2, Some(date(2025, 1, 8))), &rule, date(2025, 1, 14));
        assert_eq!(next.streak, 1);
    }

    #[test]
    fn transition_is_pure_and_deterministic() {
        let before = state(3, Some(date(2025, 1, 6)));
        let rule = RecurrenceRule::Daily;
        let first = evaluate_transition(&before, &rule, date(2025, 1, 7));
        let second = evaluate_transition(&before, &rule, date(2025, 1, 7));
        assert_eq!(first, second);
        assert_eq!(before, state(3, Some(date(2025, 1, 6))));
    }
}
