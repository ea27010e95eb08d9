use anyhow::Result;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;

/// Compact UTC timestamp for artifact file names, e.g. `20250807_142512`.
pub fn timestamp_slug() -> Result<String> {
    let now = OffsetDateTime::now_utc();
    let slug = now.format(&format_description!(
        "[year][month][day]_[hour][minute][second]"
    ))?;
    Ok(slug)
}

/// Human-readable elapsed time for summary banners.
pub fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, seconds)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, seconds)
    } else {
        format!("{:.2}s", elapsed.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_elapsed_buckets() {
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "1h 2m 5s");
        assert_eq!(format_elapsed(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_elapsed(Duration::from_millis(1500)), "1.50s");
    }

    #[test]
    fn test_timestamp_slug_shape() {
        let slug = timestamp_slug().unwrap();
        assert_eq!(slug.len(), 15);
        assert_eq!(slug.chars().nth(8), Some('_'));
    }
}
