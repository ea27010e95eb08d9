use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use time::{Date, OffsetDateTime};

use super::flatten::WorkRecord;

/// A record headed for the normalizer, tagged with its provenance.
///
/// Routing is determined by where the record came from (transformation
/// engine vs. raw passthrough), never by sniffing key sets, so a raw record
/// that happens to carry overlapping key names cannot be misrouted.
#[derive(Debug, Clone)]
pub enum PipelineRecord {
    Transformed(WorkRecord),
    Raw(Value),
}

/// The flat target schema persisted downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub title: String,
    pub authors: String,
    pub published_date: Option<String>,
    pub doi: String,
    pub journal: String,
    pub publisher: String,
    pub is_referenced_by_count: i64,
    pub reference_count: i64,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("missing key `{0}` in raw record")]
    MissingKey(&'static str),
}

/// Maps transformed or raw records into the target schema.
///
/// The two paths keep their historical date policies: the transformed path
/// emits a date whenever a sanitized year is present (month/day default to
/// 01), the raw legacy path always fills, clamping out-of-range parts and
/// bottoming out at 1970-01-01 when no date exists at all.
pub struct Normalizer {
    today: Date,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::with_today(OffsetDateTime::now_utc().date())
    }

    pub fn with_today(today: Date) -> Self {
        Self { today }
    }

    pub fn normalize(&self, record: &PipelineRecord) -> Result<NormalizedRecord, NormalizeError> {
        match record {
            PipelineRecord::Transformed(work) => Ok(self.normalize_transformed(work)),
            PipelineRecord::Raw(value) => self.normalize_raw(value),
        }
    }

    /// Format conversion only; the sanitizers already repaired the fields.
    fn normalize_transformed(&self, work: &WorkRecord) -> NormalizedRecord {
        let published_date = work.pub_year.map(|year| {
            format!(
                "{:04}-{:02}-{:02}",
                year,
                work.pub_month.unwrap_or(1),
                work.pub_day.unwrap_or(1)
            )
        });

        NormalizedRecord {
            title: work.title.clone(),
            authors: work.authors.clone(),
            published_date,
            doi: work.doi.clone(),
            journal: work.journal.clone(),
            publisher: work.publisher.clone(),
            is_referenced_by_count: work.is_referenced_by_count,
            reference_count: work.reference_count,
        }
    }

    /// Legacy support for batches that bypassed the transformation engine.
    fn normalize_raw(&self, data: &Value) -> Result<NormalizedRecord, NormalizeError> {
        let title = required_first_element(data, "title")?;
        let journal = required_first_element(data, "container-title")?;

        let authors: Vec<&str> = data
            .get("author")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .map(|entry| entry.get("family").and_then(Value::as_str).unwrap_or(""))
                    .collect()
            })
            .unwrap_or_default();

        Ok(NormalizedRecord {
            title,
            authors: authors.join(", "),
            published_date: Some(self.extract_raw_date(data)),
            doi: data.get("DOI").and_then(Value::as_str).unwrap_or("").to_string(),
            journal,
            publisher: data
                .get("publisher")
                .and_then(Value::as_str)
                .unwrap_or("")
                .to_string(),
            is_referenced_by_count: data
                .get("is-referenced-by-count")
                .and_then(Value::as_i64)
                .unwrap_or(0),
            reference_count: data
                .get("reference-count")
                .and_then(Value::as_i64)
                .unwrap_or(0),
        })
    }

    /// Polyfill a date from the first usable date field.
    ///
    /// Missing month/day fill to 1; out-of-range parts clamp to
    /// current-year/1/1; no usable field at all yields the epoch floor.
    fn extract_raw_date(&self, data: &Value) -> String {
        const DATE_FIELDS: [&str; 3] = ["issued", "published", "published-print"];

        for field in DATE_FIELDS {
            let parts = data
                .get(field)
                .and_then(|value| value.get("date-parts"))
                .and_then(Value::as_array)
                .and_then(|outer| outer.first())
                .and_then(Value::as_array);

            let Some(parts) = parts else { continue };
            let Some(year) = parts.first().and_then(Value::as_i64).map(|y| y as i32) else {
                continue;
            };

            let current_year = self.today.year();
            let year = if year < 1 || year > current_year {
                current_year
            } else {
                year
            };
            let month = parts.get(1).and_then(Value::as_i64).unwrap_or(1) as i32;
            let month = if (1..=12).contains(&month) { month } else { 1 };
            let day = parts.get(2).and_then(Value::as_i64).unwrap_or(1) as i32;
            let day = if (1..=31).contains(&day) { day } else { 1 };

            return format!("{:04}-{:02}-{:02}", year, month, day);
        }

        "1970-01-01".to_string()
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// First element of a required array field; absence, a non-array value, or
/// an empty array is a missing-key failure.
fn required_first_element(data: &Value, key: &'static str) -> Result<String, NormalizeError> {
    data.get(key)
        .and_then(Value::as_array)
        .and_then(|items| items.first())
        .and_then(Value::as_str)
        .map(|s| s.to_string())
        .ok_or(NormalizeError::MissingKey(key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use time::macros::date;

    const TODAY: Date = date!(2025 - 06 - 15);

    fn normalizer() -> Normalizer {
        Normalizer::with_today(TODAY)
    }

    fn transformed_work() -> WorkRecord {
        WorkRecord {
            doi: "10.1234/test".to_string(),
            title: "Title".to_string(),
            publisher: "Press".to_string(),
            journal: "Journal".to_string(),
            volume: "1".to_string(),
            issue: "2".to_string(),
            page: "3-4".to_string(),
            reference_count: 5,
            is_referenced_by_count: 6,
            pub_year: Some(2021),
            pub_month: Some(7),
            pub_day: Some(9),
            authors: "A One; B Two".to_string(),
            author_count: 2,
        }
    }

    #[test]
    fn test_transformed_full_date() {
        let record = PipelineRecord::Transformed(transformed_work());
        let normalized = normalizer().normalize(&record).unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2021-07-09"));
        assert_eq!(normalized.authors, "A One; B Two");
        assert_eq!(normalized.doi, "10.1234/test");
        assert_eq!(normalized.reference_count, 5);
        assert_eq!(normalized.is_referenced_by_count, 6);
    }

    #[test]
    fn test_transformed_partial_dates_default_to_01() {
        let mut work = transformed_work();
        work.pub_day = None;
        let normalized = normalizer()
            .normalize(&PipelineRecord::Transformed(work.clone()))
            .unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2021-07-01"));

        work.pub_month = None;
        let normalized = normalizer()
            .normalize(&PipelineRecord::Transformed(work))
            .unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2021-01-01"));
    }

    #[test]
    fn test_transformed_missing_year_yields_no_date() {
        let mut work = transformed_work();
        work.pub_year = None;
        work.pub_month = None;
        work.pub_day = None;
        let normalized = normalizer()
            .normalize(&PipelineRecord::Transformed(work))
            .unwrap();
        assert_eq!(normalized.published_date, None);
    }

    #[test]
    fn test_raw_record_basic_mapping() {
        let raw = PipelineRecord::Raw(json!({
            "DOI": "10.1/raw",
            "title": ["Raw Title"],
            "container-title": ["Raw Journal"],
            "publisher": "Raw Press",
            "author": [{"family": "Smith", "given": "J"}, {"family": "Doe"}],
            "issued": {"date-parts": [[2018, 3, 2]]},
            "reference-count": 11,
            "is-referenced-by-count": 12
        }));

        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.title, "Raw Title");
        assert_eq!(normalized.journal, "Raw Journal");
        assert_eq!(normalized.authors, "Smith, Doe");
        assert_eq!(normalized.published_date.as_deref(), Some("2018-03-02"));
        assert_eq!(normalized.reference_count, 11);
    }

    #[test]
    fn test_raw_date_polyfill_fills_missing_parts() {
        let raw = PipelineRecord::Raw(json!({
            "title": ["T"],
            "container-title": ["J"],
            "issued": {"date-parts": [[2018]]}
        }));
        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2018-01-01"));
    }

    #[test]
    fn test_raw_date_out_of_range_parts_clamped() {
        let raw = PipelineRecord::Raw(json!({
            "title": ["T"],
            "container-title": ["J"],
            "issued": {"date-parts": [[2999, 13, 40]]}
        }));
        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2025-01-01"));
    }

    #[test]
    fn test_raw_date_falls_through_field_priority() {
        let raw = PipelineRecord::Raw(json!({
            "title": ["T"],
            "container-title": ["J"],
            "published": {"date-parts": [[2017, 5]]}
        }));
        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("2017-05-01"));
    }

    #[test]
    fn test_raw_date_defaults_to_epoch() {
        let raw = PipelineRecord::Raw(json!({
            "title": ["T"],
            "container-title": ["J"]
        }));
        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.published_date.as_deref(), Some("1970-01-01"));
    }

    #[test]
    fn test_raw_missing_title_is_missing_key() {
        let raw = PipelineRecord::Raw(json!({"container-title": ["J"]}));
        assert_eq!(
            normalizer().normalize(&raw),
            Err(NormalizeError::MissingKey("title"))
        );

        let raw = PipelineRecord::Raw(json!({"title": [], "container-title": ["J"]}));
        assert_eq!(
            normalizer().normalize(&raw),
            Err(NormalizeError::MissingKey("title"))
        );
    }

    #[test]
    fn test_raw_missing_doi_defaults_to_empty() {
        let raw = PipelineRecord::Raw(json!({
            "title": ["T"],
            "container-title": ["J"]
        }));
        let normalized = normalizer().normalize(&raw).unwrap();
        assert_eq!(normalized.doi, "");
    }
}
