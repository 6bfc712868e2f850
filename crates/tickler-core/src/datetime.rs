use std::fs;
use std::path::PathBuf;
use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{
    DateTime, Datelike, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc, Weekday,
};
use chrono_tz::Tz;
use regex::Regex;
use serde::Deserialize;

const TIMEZONE_CONFIG_FILE: &str = "tickler-time.toml";
const TIMEZONE_ENV_VAR: &str = "TICKLER_TIMEZONE";
const TIMEZONE_CONFIG_ENV_VAR: &str = "TICKLER_TIME_CONFIG";

#[derive(Debug, Deserialize)]
struct TimezoneConfig {
    timezone: Option<String>,
}

/// Timezone reminders are entered and displayed in. Resolution order:
/// env var, `tickler-time.toml`, UTC.
pub fn project_timezone() -> &'static Tz {
    static PROJECT_TZ: OnceLock<Tz> = OnceLock::new();
    PROJECT_TZ.get_or_init(resolve_project_timezone)
}

#[must_use]
pub fn to_project_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(project_timezone()).date_naive()
}

#[must_use]
pub fn format_project_datetime(dt: DateTime<Utc>) -> String {
    dt.with_timezone(project_timezone())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

fn resolve_project_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = timezone_config_path()
        && let Some(tz) = load_timezone_from_file(&path)
    {
        return tz;
    }

    chrono_tz::UTC
}

fn timezone_config_path() -> Option<PathBuf> {
    if let Ok(raw) = std::env::var(TIMEZONE_CONFIG_ENV_VAR) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    std::env::current_dir()
        .ok()
        .map(|dir| dir.join(TIMEZONE_CONFIG_FILE))
}

fn load_timezone_from_file(path: &PathBuf) -> Option<Tz> {
    if !path.exists() {
        return None;
    }

    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed reading timezone config file"
            );
            return None;
        }
    };

    let parsed = match toml::from_str::<TimezoneConfig>(&raw) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed parsing timezone config file"
            );
            return None;
        }
    };

    let timezone = parsed.timezone?;
    parse_timezone(timezone.as_str(), &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured project timezone");
            Some(tz)
        }
        Err(err) => {
            tracing::error!(
                source,
                timezone = %trimmed,
                error = %err,
                "failed to parse timezone id"
            );
            None
        }
    }
}

fn to_utc_from_project_local(
    local_naive: NaiveDateTime,
    context: &str,
) -> anyhow::Result<DateTime<Utc>> {
    match project_timezone().from_local_datetime(&local_naive) {
        LocalResult::Single(local_dt) => Ok(local_dt.with_timezone(&Utc)),
        LocalResult::Ambiguous(first, second) => {
            tracing::warn!(
                context,
                first = %first,
                second = %second,
                "ambiguous local datetime; using earliest"
            );
            let chosen = if first <= second { first } else { second };
            Ok(chosen.with_timezone(&Utc))
        }
        LocalResult::None => Err(anyhow!(
            "local datetime does not exist in configured timezone: {context}"
        )),
    }
}

/// Parses a due-time expression relative to `now`.
#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_date_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Ok(now),
        "today" => {
            let local_now = now.with_timezone(project_timezone());
            let midnight = local_now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("failed to construct midnight for today"))?;
            return to_utc_from_project_local(midnight, "today");
        }
        "tomorrow" => {
            let today = parse_date_expr("today", now)?;
            return Ok(today + Duration::days(1));
        }
        _ => {}
    }

    if let Some(target_weekday) = parse_weekday_name(&lower) {
        let local_today = now.with_timezone(project_timezone()).date_naive();
        let target_date = next_weekday_date(local_today, target_weekday);
        let midnight = target_date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("failed to construct weekday midnight"))?;
        return to_utc_from_project_local(midnight, "weekday-name");
    }

    if let Some((hour, minute)) = parse_clock_time(token) {
        let local_now = now.with_timezone(project_timezone());
        let mut day = local_now.date_naive();
        let local_candidate = day
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("failed to construct clock time candidate"))?;
        if local_candidate <= local_now.naive_local() {
            day = day
                .checked_add_signed(Duration::days(1))
                .ok_or_else(|| anyhow!("failed to advance to next day"))?;
        }
        let next_candidate = day
            .and_hms_opt(hour, minute, 0)
            .ok_or_else(|| anyhow!("failed to construct next clock time candidate"))?;
        return to_utc_from_project_local(next_candidate, "clock-time");
    }

    if let Some(caps) = relative_offset_regex().captures(token) {
        let negative = caps.name("sign").map(|m| m.as_str()) == Some("-");
        let num: i64 = caps
            .name("num")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative amount"))?
            .parse()
            .context("invalid relative number")?;
        let unit = caps
            .name("unit")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative unit"))?;

        let duration = match unit {
            "d" => Duration::days(num),
            "h" => Duration::hours(num),
            "m" => Duration::minutes(num),
            "s" => Duration::seconds(num),
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return Ok(if negative { now - duration } else { now + duration });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("failed to construct midnight for date"))?;
        return to_utc_from_project_local(midnight, "date");
    }

    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(token, fmt) {
            return to_utc_from_project_local(ndt, fmt);
        }
    }

    Err(anyhow!("unrecognized date expression: {input}")).with_context(|| {
        "supported formats: now/today/tomorrow, weekday names (e.g. monday), \
         clock times (e.g. 3:23pm or 15:23), Nm/Nh/Nd/Ns relative offsets, \
         RFC3339, YYYY-MM-DD, YYYY-MM-DDTHH:MM, YYYY-MM-DD HH:MM"
    })
}

fn relative_offset_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<sign>[+-])?(?P<num>\d+)(?P<unit>[dhms])$")
            .expect("relative offset pattern compiles")
    })
}

fn clock_time_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(?P<hour>\d{1,2}):(?P<minute>\d{2})\s*(?P<ampm>[ap]m)?$")
            .expect("clock time pattern compiles")
    })
}

fn parse_weekday_name(token: &str) -> Option<Weekday> {
    match token.trim() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" | "tues" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" | "thur" | "thurs" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn next_weekday_date(from: NaiveDate, target: Weekday) -> NaiveDate {
    let from_idx = from.weekday().num_days_from_monday() as i64;
    let target_idx = target.num_days_from_monday() as i64;
    let mut delta = (7 + target_idx - from_idx) % 7;
    if delta == 0 {
        delta = 7;
    }
    from.checked_add_signed(Duration::days(delta)).unwrap_or(from)
}

fn parse_clock_time(token: &str) -> Option<(u32, u32)> {
    let captures = clock_time_regex().captures(token.trim())?;

    let raw_hour = captures.name("hour")?.as_str().parse::<u32>().ok()?;
    let minute = captures.name("minute")?.as_str().parse::<u32>().ok()?;
    if minute > 59 {
        return None;
    }

    let hour = if let Some(ampm_match) = captures.name("ampm") {
        let ampm = ampm_match.as_str().to_ascii_lowercase();
        if raw_hour == 0 || raw_hour > 12 {
            return None;
        }
        match ampm.as_str() {
            "am" => {
                if raw_hour == 12 {
                    0
                } else {
                    raw_hour
                }
            }
            "pm" => {
                if raw_hour == 12 {
                    12
                } else {
                    raw_hour + 12
                }
            }
            _ => return None,
        }
    } else {
        if raw_hour > 23 {
            return None;
        }
        raw_hour
    };

    Some((hour, minute))
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{parse_date_expr, to_project_date};

    #[test]
    fn parses_weekday_name() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let parsed = parse_date_expr("wednesday", now).expect("parse weekday");
        assert_eq!(
            to_project_date(parsed).format("%Y-%m-%d").to_string(),
            "2026-02-18"
        );
    }

    #[test]
    fn parses_relative_minutes() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        let parsed = parse_date_expr("10m", now).expect("parse relative");
        assert_eq!(parsed - now, chrono::Duration::minutes(10));
    }

    #[test]
    fn parses_clock_time_rolls_to_next_day() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 23, 0, 0)
            .single()
            .expect("valid now");
        let parsed = parse_date_expr("3:23pm", now).expect("parse clock time");
        assert!(parsed > now);
        assert_eq!(
            parsed
                .with_timezone(super::project_timezone())
                .format("%H:%M")
                .to_string(),
            "15:23"
        );
    }

    #[test]
    fn rejects_garbage() {
        let now = Utc
            .with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now");
        assert!(parse_date_expr("whenever", now).is_err());
    }
}
