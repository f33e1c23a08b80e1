use chrono::{DateTime, SecondsFormat, Utc};

pub fn time_millis() -> i64 {
    let time: DateTime<chrono::Utc> = Utc::now();
    time.timestamp_millis()
}

/// ISO-8601 timestamp with the `T` separator spelled out, safe to embed in a workflow name.
///
/// `2025-01-02T03:04:05.678Z` becomes `2025-01-02-time-03:04:05.678Z`.
pub fn workflow_timestamp(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true).replacen('T', "-time-", 1)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_workflow_timestamp() {
        let time = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(workflow_timestamp(time), "2025-01-02-time-03:04:05.000Z");
    }
}
