use serde_json::Value;

use serde::{Deserialize, Serialize};

/// A CrossRef work flattened into the column set the sanitizers operate on.
///
/// Produced by [`flatten_record`] with lenient defaults; the sanitization
/// passes ([`crate::preprocess::transform`] batch-wide or
/// [`crate::preprocess::sanitize`] per record) repair it in place by value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub doi: String,
    pub title: String,
    pub publisher: String,
    pub journal: String,
    pub volume: String,
    pub issue: String,
    pub page: String,
    pub reference_count: i64,
    pub is_referenced_by_count: i64,
    pub pub_year: Option<i32>,
    pub pub_month: Option<i32>,
    pub pub_day: Option<i32>,
    /// Semicolon-joined "given family" pairs, in source order.
    pub authors: String,
    /// Number of non-empty author entries behind `authors`.
    pub author_count: i64,
}

/// Flatten one raw CrossRef work into a [`WorkRecord`].
///
/// Never fails: absent, empty, or wrong-shaped fields degrade to defaults
/// (empty string, zero, None).
pub fn flatten_record(record: &Value) -> WorkRecord {
    let (pub_year, pub_month, pub_day) = extract_date_parts(record);
    let (authors, author_count) = extract_authors(record);

    WorkRecord {
        doi: string_field(record, "DOI"),
        title: first_element(record.get("title")),
        publisher: string_field(record, "publisher"),
        journal: first_element(record.get("container-title")),
        volume: string_field(record, "volume"),
        issue: string_field(record, "issue"),
        page: string_field(record, "page"),
        reference_count: int_field(record, "reference-count"),
        is_referenced_by_count: int_field(record, "is-referenced-by-count"),
        pub_year,
        pub_month,
        pub_day,
        authors,
        author_count,
    }
}

fn string_field(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or("")
        .to_string()
}

fn int_field(record: &Value, key: &str) -> i64 {
    record.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// First element of a sequence field, trimmed; a plain string passes through
/// trimmed; anything else degrades to "".
fn first_element(field: Option<&Value>) -> String {
    match field {
        Some(Value::Array(items)) => match items.first() {
            Some(Value::String(s)) => s.trim().to_string(),
            Some(Value::Number(n)) => n.to_string(),
            _ => String::new(),
        },
        Some(Value::String(s)) => s.trim().to_string(),
        _ => String::new(),
    }
}

/// Read the first `issued.date-parts` triple as (year, month, day).
fn extract_date_parts(record: &Value) -> (Option<i32>, Option<i32>, Option<i32>) {
    let parts = record
        .get("issued")
        .and_then(|issued| issued.get("date-parts"))
        .and_then(Value::as_array)
        .and_then(|outer| outer.first())
        .and_then(Value::as_array);

    match parts {
        Some(triple) => {
            let at = |i: usize| triple.get(i).and_then(Value::as_i64).map(|v| v as i32);
            (at(0), at(1), at(2))
        }
        None => (None, None, None),
    }
}

/// Collect "given family" names for every author entry with a non-empty
/// family or given name; entries with both empty are skipped entirely.
fn extract_authors(record: &Value) -> (String, i64) {
    let entries = match record.get("author").and_then(Value::as_array) {
        Some(entries) => entries,
        None => return (String::new(), 0),
    };

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        if !entry.is_object() {
            continue;
        }
        let family = entry.get("family").and_then(Value::as_str).unwrap_or("").trim();
        let given = entry.get("given").and_then(Value::as_str).unwrap_or("").trim();

        if !family.is_empty() || !given.is_empty() {
            names.push(format!("{} {}", given, family).trim().to_string());
        }
    }

    let count = names.len() as i64;
    (names.join("; "), count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flatten_full_record() {
        let record = json!({
            "DOI": "10.1234/test",
            "title": ["A Study of Things"],
            "publisher": "Test Press",
            "container-title": ["Journal of Tests"],
            "volume": "12",
            "issue": "3",
            "page": "45-67",
            "reference-count": 10,
            "is-referenced-by-count": 4,
            "issued": {"date-parts": [[2021, 6, 15]]},
            "author": [
                {"family": "Smith", "given": "Jane"},
                {"family": "Doe", "given": "John"}
            ]
        });

        let flat = flatten_record(&record);
        assert_eq!(flat.doi, "10.1234/test");
        assert_eq!(flat.title, "A Study of Things");
        assert_eq!(flat.journal, "Journal of Tests");
        assert_eq!(flat.publisher, "Test Press");
        assert_eq!(flat.volume, "12");
        assert_eq!(flat.page, "45-67");
        assert_eq!(flat.reference_count, 10);
        assert_eq!(flat.is_referenced_by_count, 4);
        assert_eq!(flat.pub_year, Some(2021));
        assert_eq!(flat.pub_month, Some(6));
        assert_eq!(flat.pub_day, Some(15));
        assert_eq!(flat.authors, "Jane Smith; John Doe");
        assert_eq!(flat.author_count, 2);
    }

    #[test]
    fn test_flatten_empty_record_defaults() {
        let flat = flatten_record(&json!({}));
        assert_eq!(flat.doi, "");
        assert_eq!(flat.title, "");
        assert_eq!(flat.journal, "");
        assert_eq!(flat.reference_count, 0);
        assert_eq!(flat.pub_year, None);
        assert_eq!(flat.pub_month, None);
        assert_eq!(flat.pub_day, None);
        assert_eq!(flat.authors, "");
        assert_eq!(flat.author_count, 0);
    }

    #[test]
    fn test_no_author_field_yields_empty_authors() {
        let flat = flatten_record(&json!({"DOI": "10.1/x", "title": ["T"]}));
        assert_eq!(flat.authors, "");
        assert_eq!(flat.author_count, 0);
    }

    #[test]
    fn test_authors_with_both_fields_empty_are_skipped() {
        let record = json!({
            "author": [
                {"family": "", "given": ""},
                {"family": "Only", "given": ""},
                {"given": "Solo"},
                {}
            ]
        });
        let flat = flatten_record(&record);
        assert_eq!(flat.authors, "Only; Solo");
        assert_eq!(flat.author_count, 2);
    }

    #[test]
    fn test_empty_title_list_yields_empty_string() {
        let flat = flatten_record(&json!({"title": []}));
        assert_eq!(flat.title, "");
    }

    #[test]
    fn test_title_as_plain_string_is_trimmed() {
        let flat = flatten_record(&json!({"title": "  Plain  "}));
        assert_eq!(flat.title, "Plain");
    }

    #[test]
    fn test_partial_date_triple() {
        let flat = flatten_record(&json!({"issued": {"date-parts": [[2020, 4]]}}));
        assert_eq!(flat.pub_year, Some(2020));
        assert_eq!(flat.pub_month, Some(4));
        assert_eq!(flat.pub_day, None);
    }

    #[test]
    fn test_empty_date_parts_triple() {
        let flat = flatten_record(&json!({"issued": {"date-parts": [[]]}}));
        assert_eq!(flat.pub_year, None);
        assert_eq!(flat.pub_month, None);
        assert_eq!(flat.pub_day, None);
    }

    #[test]
    fn test_malformed_date_parts_shape() {
        let flat = flatten_record(&json!({"issued": {"date-parts": "2020"}}));
        assert_eq!(flat.pub_year, None);

        let flat = flatten_record(&json!({"issued": {"date-parts": [[null, 5, 1]]}}));
        assert_eq!(flat.pub_year, None);
        assert_eq!(flat.pub_month, Some(5));
        assert_eq!(flat.pub_day, Some(1));
    }

    #[test]
    fn test_author_field_not_a_list() {
        let flat = flatten_record(&json!({"author": "Smith, J."}));
        assert_eq!(flat.authors, "");
        assert_eq!(flat.author_count, 0);
    }
}
