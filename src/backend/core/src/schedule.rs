//! Schedule arithmetic: frequency parsing, time-of-day anchors and the
//! next-run calculation.
//!
//! Everything here is a pure function of its arguments; the orchestrator
//! supplies `now` so the arithmetic stays deterministic under test.

use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchedulerError};

/// How often a job runs, parsed from `<integer><unit>`.
///
/// Supported units: `s`/`seconds`, `m`/`minutes`, `h`/`hours`, `d`/`days`,
/// `w`/`weeks`. The raw string is retained for display and error reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frequency {
    raw: String,
    seconds: i64,
}

impl Frequency {
    /// Parse a frequency string, e.g. `"7d"`, `"90m"`, `"2weeks"`.
    pub fn parse(value: &str) -> Result<Self> {
        let trimmed = value.trim();
        let digits_end = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(trimmed.len());
        let (digits, unit) = trimmed.split_at(digits_end);

        let amount: i64 = digits.parse().map_err(|_| SchedulerError::FrequencyFormat {
            value: value.to_string(),
        })?;
        if amount <= 0 {
            return Err(SchedulerError::FrequencyFormat {
                value: value.to_string(),
            });
        }

        let per_unit: i64 = match unit.trim() {
            "s" | "seconds" => 1,
            "m" | "minutes" => 60,
            "h" | "hours" => 60 * 60,
            "d" | "days" => 60 * 60 * 24,
            "w" | "weeks" => 60 * 60 * 24 * 7,
            _ => {
                return Err(SchedulerError::FrequencyFormat {
                    value: value.to_string(),
                })
            }
        };

        // Reject amounts that overflow or exceed the representable
        // duration range; grammatical nonsense must never panic.
        let seconds = amount
            .checked_mul(per_unit)
            .filter(|&s| Duration::try_seconds(s).is_some())
            .ok_or_else(|| SchedulerError::FrequencyFormat {
                value: value.to_string(),
            })?;

        Ok(Self {
            raw: trimmed.to_string(),
            seconds,
        })
    }

    /// The frequency as a chrono duration.
    pub fn as_duration(&self) -> Duration {
        // `parse` bounds `seconds`; the fallback only protects values
        // deserialized from elsewhere.
        Duration::try_seconds(self.seconds).unwrap_or(Duration::MAX)
    }

    /// The frequency in whole days, if it resolves to one or more of them.
    pub fn whole_days(&self) -> Option<i64> {
        const DAY: i64 = 60 * 60 * 24;
        if self.seconds >= DAY && self.seconds % DAY == 0 {
            Some(self.seconds / DAY)
        } else {
            None
        }
    }

    /// The original frequency string as configured.
    pub fn raw(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// A fixed wall-clock time of day (`HH:MM`, 24-hour) that a daily-or-longer
/// schedule aligns to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnchorTime {
    pub hour: u32,
    pub minute: u32,
}

impl AnchorTime {
    /// Parse an `HH:MM` string; hour must be in [0,24), minute in [0,60).
    pub fn parse(value: &str) -> Result<Self> {
        let bad = || SchedulerError::TimeFormat {
            value: value.to_string(),
        };

        let (h, m) = value.trim().split_once(':').ok_or_else(bad)?;
        let hour: u32 = h.parse().map_err(|_| bad())?;
        let minute: u32 = m.parse().map_err(|_| bad())?;
        if hour >= 24 || minute >= 60 {
            return Err(bad());
        }
        Ok(Self { hour, minute })
    }
}

impl fmt::Display for AnchorTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Validate a frequency/anchor pair: an anchor is only meaningful when the
/// frequency resolves to a whole number of days >= 1.
pub fn validate_schedule(frequency: &Frequency, anchor: Option<&AnchorTime>) -> Result<()> {
    if let Some(anchor) = anchor {
        if frequency.whole_days().is_none() {
            return Err(SchedulerError::FrequencyDefinition {
                value: frequency.raw.clone(),
                reason: format!(
                    "a time of day ({anchor}) requires a frequency of whole days (>= 1d)"
                ),
            });
        }
    }
    Ok(())
}

/// Compute the next instant a job is due.
///
/// Base case: `now + frequency`. Anchored case: same, then the time-of-day
/// fields are overwritten with the anchor's (seconds and sub-seconds
/// zeroed). The day advances by the frequency while the time of day stays
/// pinned. The pinned result can land before `now`; it is deliberately not
/// re-advanced by another period, matching the historical behavior the run
/// history was built against.
pub fn next_run(
    now: DateTime<Utc>,
    frequency: &Frequency,
    anchor: Option<&AnchorTime>,
) -> DateTime<Utc> {
    // Saturate instead of panicking when an extreme frequency pushes the
    // instant past the representable range.
    let base = now
        .checked_add_signed(frequency.as_duration())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    match anchor {
        None => base,
        Some(anchor) => base
            .with_hour(anchor.hour)
            .and_then(|t| t.with_minute(anchor.minute))
            .and_then(|t| t.with_second(0))
            .and_then(|t| t.with_nanosecond(0))
            .unwrap_or(base),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn test_parse_all_units() {
        assert_eq!(Frequency::parse("30s").unwrap().as_duration(), Duration::seconds(30));
        assert_eq!(Frequency::parse("45m").unwrap().as_duration(), Duration::minutes(45));
        assert_eq!(Frequency::parse("6h").unwrap().as_duration(), Duration::hours(6));
        assert_eq!(Frequency::parse("7d").unwrap().as_duration(), Duration::days(7));
        assert_eq!(Frequency::parse("2w").unwrap().as_duration(), Duration::weeks(2));
        assert_eq!(Frequency::parse("3days").unwrap().as_duration(), Duration::days(3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for bad in ["", "d", "3e", "3", "-1d", "1.5h", "d3"] {
            assert!(
                matches!(
                    Frequency::parse(bad),
                    Err(SchedulerError::FrequencyFormat { .. })
                ),
                "expected FrequencyFormat for {bad:?}"
            );
        }
    }

    #[test]
    fn test_parse_rejects_overflowing_amounts() {
        // Matches the grammar but cannot be represented; must be a
        // normal parse error, not a panic.
        for bad in [
            "9000000000000000000w",
            "9223372036854775807d",
            "99999999999999999999s",
        ] {
            assert!(
                matches!(
                    Frequency::parse(bad),
                    Err(SchedulerError::FrequencyFormat { .. })
                ),
                "expected FrequencyFormat for {bad:?}"
            );
        }
    }

    #[test]
    fn test_whole_days() {
        assert_eq!(Frequency::parse("1d").unwrap().whole_days(), Some(1));
        assert_eq!(Frequency::parse("2w").unwrap().whole_days(), Some(14));
        assert_eq!(Frequency::parse("24h").unwrap().whole_days(), Some(1));
        assert_eq!(Frequency::parse("3h").unwrap().whole_days(), None);
        assert_eq!(Frequency::parse("30s").unwrap().whole_days(), None);
    }

    #[test]
    fn test_anchor_time_parse() {
        let anchor = AnchorTime::parse("03:00").unwrap();
        assert_eq!((anchor.hour, anchor.minute), (3, 0));
        assert_eq!(anchor.to_string(), "03:00");

        for bad in ["24:00", "12:60", "noon", "3", "03:0x"] {
            assert!(
                matches!(AnchorTime::parse(bad), Err(SchedulerError::TimeFormat { .. })),
                "expected TimeFormat for {bad:?}"
            );
        }
    }

    #[test]
    fn test_validate_anchor_requires_whole_days() {
        let anchor = AnchorTime::parse("23:59").unwrap();
        let daily = Frequency::parse("1d").unwrap();
        let hourly = Frequency::parse("3h").unwrap();

        assert!(validate_schedule(&daily, Some(&anchor)).is_ok());
        assert!(validate_schedule(&hourly, None).is_ok());
        assert!(matches!(
            validate_schedule(&hourly, Some(&anchor)),
            Err(SchedulerError::FrequencyDefinition { .. })
        ));
    }

    #[test]
    fn test_next_run_unanchored() {
        let now = at(2026, 3, 10, 14, 25, 31);
        let freq = Frequency::parse("90m").unwrap();
        assert_eq!(next_run(now, &freq, None), now + Duration::minutes(90));
    }

    #[test]
    fn test_next_run_anchored_pins_time_of_day() {
        let now = at(2026, 3, 10, 10, 30, 45);
        let freq = Frequency::parse("7d").unwrap();
        let anchor = AnchorTime::parse("03:00").unwrap();

        let next = next_run(now, &freq, Some(&anchor));
        assert_eq!(next, at(2026, 3, 17, 3, 0, 0));
    }

    #[test]
    fn test_next_run_anchored_not_readvanced() {
        // Pinning the time of day can pull next_run earlier than
        // now + frequency; the gap is accepted as-is.
        let now = at(2026, 3, 10, 23, 50, 0);
        let freq = Frequency::parse("1d").unwrap();
        let anchor = AnchorTime::parse("00:05").unwrap();

        let next = next_run(now, &freq, Some(&anchor));
        assert_eq!(next, at(2026, 3, 11, 0, 5, 0));
        assert!(next < now + freq.as_duration());
    }
}
