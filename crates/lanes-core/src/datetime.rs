use std::sync::OnceLock;

use anyhow::{Context, anyhow};
use chrono::{DateTime, Duration, LocalResult, Months, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;

const TIMEZONE_ENV_VAR: &str = "LANES_TIMEZONE";

pub fn board_timezone() -> &'static Tz {
    static BOARD_TZ: OnceLock<Tz> = OnceLock::new();
    BOARD_TZ.get_or_init(resolve_board_timezone)
}

#[must_use]
pub fn to_board_date(dt: DateTime<Utc>) -> NaiveDate {
    dt.with_timezone(board_timezone()).date_naive()
}

#[must_use]
pub fn format_board_date(dt: DateTime<Utc>) -> String {
    dt.with_timezone(board_timezone())
        .format("%Y-%m-%d")
        .to_string()
}

#[must_use]
pub fn format_board_datetime(dt: DateTime<Utc>) -> String {
    dt.with_timezone(board_timezone())
        .format("%Y-%m-%d %H:%M")
        .to_string()
}

#[must_use]
pub fn month_ago(now: DateTime<Utc>) -> DateTime<Utc> {
    now.checked_sub_months(Months::new(1))
        .unwrap_or_else(|| now - Duration::days(30))
}

fn resolve_board_timezone() -> Tz {
    if let Ok(raw) = std::env::var(TIMEZONE_ENV_VAR)
        && let Some(tz) = parse_timezone(&raw, TIMEZONE_ENV_VAR)
    {
        return tz;
    }

    if let Some(path) = crate::config::default_config_path()
        && let Some(tz) = timezone_from_config_file(&path)
    {
        return tz;
    }

    tracing::debug!("no timezone configured; using UTC");
    chrono_tz::UTC
}

fn timezone_from_config_file(path: &std::path::Path) -> Option<Tz> {
    if !path.exists() {
        tracing::debug!(file = %path.display(), "config file not found while resolving timezone");
        return None;
    }

    let cfg = match crate::config::Config::load(Some(path)) {
        Ok(cfg) => cfg,
        Err(err) => {
            tracing::error!(
                file = %path.display(),
                error = %err,
                "failed loading config while resolving timezone"
            );
            return None;
        }
    };

    let timezone = cfg.timezone?;
    parse_timezone(&timezone, &format!("file:{}", path.display()))
}

fn parse_timezone(raw: &str, source: &str) -> Option<Tz> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        tracing::warn!(source, "timezone source was empty");
        return None;
    }

    match trimmed.parse::<Tz>() {
        Ok(tz) => {
            tracing::info!(source, timezone = %trimmed, "configured board timezone");
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

fn to_utc_from_board_local(
    local_naive: NaiveDateTime,
    context: &str,
) -> anyhow::Result<DateTime<Utc>> {
    match board_timezone().from_local_datetime(&local_naive) {
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

#[tracing::instrument(skip(now), fields(input = input))]
pub fn parse_due_expr(input: &str, now: DateTime<Utc>) -> anyhow::Result<DateTime<Utc>> {
    let token = input.trim();
    let lower = token.to_ascii_lowercase();

    match lower.as_str() {
        "now" => return Ok(now),
        "today" => {
            let date = to_board_date(now);
            let midnight = date
                .and_hms_opt(0, 0, 0)
                .ok_or_else(|| anyhow!("failed to construct midnight for today"))?;
            return to_utc_from_board_local(midnight, "today");
        }
        "tomorrow" => {
            let today = parse_due_expr("today", now)?;
            return Ok(today + Duration::days(1));
        }
        _ => {}
    }

    let rel_re = Regex::new(r"^(?P<sign>[+-])(?P<num>\d+)(?P<unit>[dhm])$")
        .map_err(|e| anyhow!("internal regex compile failure: {e}"))?;

    if let Some(caps) = rel_re.captures(token) {
        let sign = caps
            .name("sign")
            .map(|m| m.as_str())
            .ok_or_else(|| anyhow!("missing relative sign"))?;
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
            _ => return Err(anyhow!("unknown relative unit: {unit}")),
        };

        return Ok(if sign == "-" { now - duration } else { now + duration });
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(token) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Ok(date) = NaiveDate::parse_from_str(token, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| anyhow!("failed to construct midnight for date"))?;
        return to_utc_from_board_local(midnight, "date");
    }

    for fmt in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ndt) = NaiveDateTime::parse_from_str(token, fmt) {
            return to_utc_from_board_local(ndt, fmt);
        }
    }

    Err(anyhow!("unrecognized due date expression: {input}")).with_context(|| {
        "supported formats: now/today/tomorrow, +Nd/+Nh/+Nm, RFC3339, \
         YYYY-MM-DD, YYYY-MM-DDTHH:MM, YYYY-MM-DD HH:MM"
    })
}

pub mod iso_date_serde {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match dt {
                Some(value) => super::serialize(value, serializer),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let opt = Option::<String>::deserialize(deserializer)?;
            match opt {
                Some(raw) => DateTime::parse_from_rfc3339(&raw)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(serde::de::Error::custom),
                None => Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, TimeZone, Utc};

    use super::{iso_date_serde, month_ago, parse_due_expr, to_board_date};

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 17, 12, 0, 0)
            .single()
            .expect("valid now")
    }

    #[test]
    fn parses_today_as_boards_current_date() {
        let now = fixed_now();
        let parsed = parse_due_expr("today", now).expect("parse today");
        assert_eq!(to_board_date(parsed), to_board_date(now));
    }

    #[test]
    fn parses_relative_days_and_hours() {
        let now = fixed_now();
        let in_two_days = parse_due_expr("+2d", now).expect("parse +2d");
        assert_eq!(in_two_days, now + Duration::days(2));
        let three_hours_ago = parse_due_expr("-3h", now).expect("parse -3h");
        assert_eq!(three_hours_ago, now - Duration::hours(3));
    }

    #[test]
    fn parses_rfc3339_passthrough() {
        let now = fixed_now();
        let parsed = parse_due_expr("2026-03-01T09:30:00.000Z", now).expect("parse rfc3339");
        assert_eq!(
            parsed,
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 30, 0)
                .single()
                .expect("valid due")
        );
    }

    #[test]
    fn parses_plain_date_as_board_midnight() {
        let now = fixed_now();
        let parsed = parse_due_expr("2026-03-05", now).expect("parse date");
        assert_eq!(
            to_board_date(parsed).format("%Y-%m-%d").to_string(),
            "2026-03-05"
        );
    }

    #[test]
    fn rejects_garbage_expression() {
        let now = fixed_now();
        assert!(parse_due_expr("whenever", now).is_err());
    }

    #[test]
    fn month_ago_steps_back_one_calendar_month() {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 31, 10, 0, 0)
            .single()
            .expect("valid now");
        let back = month_ago(now);
        assert_eq!(
            back,
            Utc.with_ymd_and_hms(2026, 2, 28, 10, 0, 0)
                .single()
                .expect("valid clamp")
        );
    }

    #[test]
    fn iso_serde_round_trips_with_millis() {
        #[derive(serde::Serialize, serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "iso_date_serde")]
            at: DateTime<Utc>,
        }

        let wrapper = Wrapper { at: fixed_now() };
        let json = serde_json::to_string(&wrapper).expect("serialize");
        assert_eq!(json, r#"{"at":"2026-02-17T12:00:00.000Z"}"#);
        let back: Wrapper = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back.at, fixed_now());
    }

    #[test]
    fn iso_serde_accepts_offset_timestamps() {
        #[derive(serde::Deserialize)]
        struct Wrapper {
            #[serde(with = "iso_date_serde")]
            at: DateTime<Utc>,
        }

        let back: Wrapper =
            serde_json::from_str(r#"{"at":"2026-02-17T06:00:00-06:00"}"#).expect("deserialize");
        assert_eq!(back.at, fixed_now());
    }
}
