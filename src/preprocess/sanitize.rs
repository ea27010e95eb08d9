use lazy_static::lazy_static;
use regex::Regex;
use time::Date;

use super::flatten::WorkRecord;

pub const TITLE_PLACEHOLDER: &str = "[Title Missing]";
pub const JOURNAL_PLACEHOLDER: &str = "[Journal Missing]";
pub const PUBLISHER_PLACEHOLDER: &str = "[Publisher Missing]";

/// Regex sources shared with the vectorized batch path; both paths must stay
/// rule-for-rule identical.
pub const WHITESPACE_RUN_PATTERN: &str = r"\s+";
pub const REPEATED_SEMICOLON_PATTERN: &str = r";\s*;";
pub const DOI_URL_PREFIX_PATTERN: &str = r"^(https?://)?(dx\.)?doi\.org/";
pub const DOI_SCHEME_PREFIX_PATTERN: &str = r"^doi:";

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(WHITESPACE_RUN_PATTERN).unwrap();
    static ref REPEATED_SEMICOLON: Regex = Regex::new(REPEATED_SEMICOLON_PATTERN).unwrap();
    static ref DOI_URL_PREFIX: Regex = Regex::new(DOI_URL_PREFIX_PATTERN).unwrap();
    static ref DOI_SCHEME_PREFIX: Regex = Regex::new(DOI_SCHEME_PREFIX_PATTERN).unwrap();
}

/// Apply the full sanitization policy to a single flattened record.
///
/// This is the degraded path the transformation engine uses when a batch
/// table cannot be built; rules and their order match the batch expressions:
/// date repair -> author cleanup -> identifier normalization ->
/// missing-field fill -> text cleanup.
pub fn sanitize_record(mut record: WorkRecord, today: Date) -> WorkRecord {
    fix_dates(&mut record, today);
    clean_authors(&mut record);
    record.doi = clean_doi(&record.doi);
    fill_missing_fields(&mut record);
    record.title = collapse_whitespace(&record.title);
    record.journal = collapse_whitespace(&record.journal);
    record.publisher = collapse_whitespace(&record.publisher);
    record
}

fn fix_dates(record: &mut WorkRecord, today: Date) {
    let current_year = today.year();
    let current_month = u8::from(today.month()) as i32;
    let current_day = today.day() as i32;

    if record.pub_year.is_some_and(|y| y > current_year) {
        record.pub_year = None;
    }
    if record.pub_month.is_some_and(|m| !(1..=12).contains(&m)) {
        record.pub_month = None;
    }
    if record.pub_day.is_some_and(|d| !(1..=31).contains(&d)) {
        record.pub_day = None;
    }

    // A complete triple strictly after today invalidates the year as well.
    if let (Some(y), Some(m), Some(d)) = (record.pub_year, record.pub_month, record.pub_day) {
        if (y, m, d) > (current_year, current_month, current_day) {
            record.pub_year = None;
        }
    }

    // No month or day without a year.
    if record.pub_year.is_none() {
        record.pub_month = None;
        record.pub_day = None;
    }
}

fn clean_authors(record: &mut WorkRecord) {
    let cleaned = WHITESPACE_RUN.replace_all(&record.authors, " ");
    let cleaned = REPEATED_SEMICOLON.replace_all(&cleaned, ";");
    record.authors = cleaned.trim().to_string();
    record.author_count = count_authors(&record.authors);
}

/// Non-empty semicolon-delimited segments of a cleaned authors string.
pub fn count_authors(authors: &str) -> i64 {
    if authors.is_empty() {
        return 0;
    }
    authors.split(';').filter(|segment| !segment.trim().is_empty()).count() as i64
}

/// Trim, lowercase, and strip URL/scheme prefixes from a DOI.
pub fn clean_doi(doi: &str) -> String {
    let doi = doi.trim().to_lowercase();
    let doi = DOI_URL_PREFIX.replace_all(&doi, "");
    let doi = DOI_SCHEME_PREFIX.replace_all(&doi, "");
    doi.into_owned()
}

fn fill_missing_fields(record: &mut WorkRecord) {
    if record.title.trim().is_empty() {
        record.title = TITLE_PLACEHOLDER.to_string();
    }
    if record.journal.trim().is_empty() {
        record.journal = JOURNAL_PLACEHOLDER.to_string();
    }
    if record.publisher.trim().is_empty() {
        record.publisher = PUBLISHER_PLACEHOLDER.to_string();
    }
}

/// Collapse internal whitespace runs to single spaces and trim.
pub fn collapse_whitespace(text: &str) -> String {
    WHITESPACE_RUN.replace_all(text, " ").trim().to_string()
}
