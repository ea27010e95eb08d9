use log::warn;
use polars::prelude::*;
use serde_json::Value;
use time::{Date, OffsetDateTime};

use super::flatten::{flatten_record, WorkRecord};
use super::sanitize::{
    sanitize_record, DOI_SCHEME_PREFIX_PATTERN, DOI_URL_PREFIX_PATTERN, JOURNAL_PLACEHOLDER,
    PUBLISHER_PLACEHOLDER, REPEATED_SEMICOLON_PATTERN, TITLE_PLACEHOLDER, WHITESPACE_RUN_PATTERN,
};

/// Result of transforming one raw batch.
///
/// Degraded-mode control flow is explicit: callers match on the outcome
/// instead of catching errors, and decide logging themselves.
#[derive(Debug)]
pub enum TransformOutcome {
    /// The batch was fully sanitized (via the vectorized path, or the
    /// per-record path if a uniform table could not be built).
    Transformed(Vec<WorkRecord>),
    /// Transformation failed outright; the raw batch is returned untouched
    /// so the caller can pass it through the legacy path.
    FellBack { reason: String, raw: Vec<Value> },
}

/// Descriptive summary of a transformation run.
#[derive(Debug, Clone)]
pub struct TransformSummary {
    pub input_records: usize,
    pub output_records: usize,
    pub transformations_applied: &'static [&'static str],
}

const TRANSFORMATIONS_APPLIED: &[&str] = &[
    "Nulled implausible future publication years",
    "Standardized author formatting",
    "Cleaned DOI identifiers",
    "Filled missing titles/journals/publishers",
    "Normalized text whitespace",
    "Validated date ranges",
];

/// Batch transformation engine for flattened CrossRef works.
///
/// Flattens every record, then sanitizes the whole batch with Polars column
/// expressions. The reference date is injectable so date repair is
/// deterministic under test.
pub struct Transformer {
    today: Date,
}

impl Transformer {
    pub fn new() -> Self {
        Self::with_today(OffsetDateTime::now_utc().date())
    }

    pub fn with_today(today: Date) -> Self {
        Self { today }
    }

    /// Transform a raw batch. Empty input yields an empty transformed batch.
    pub fn transform(&self, raw: Vec<Value>) -> TransformOutcome {
        if raw.is_empty() {
            return TransformOutcome::Transformed(Vec::new());
        }

        let flattened: Vec<WorkRecord> = raw.iter().map(flatten_record).collect();

        let df = match build_frame(&flattened) {
            Ok(df) => df,
            Err(e) => {
                warn!(
                    "Batch table construction failed ({}); sanitizing {} records individually",
                    e,
                    flattened.len()
                );
                return TransformOutcome::Transformed(
                    flattened
                        .into_iter()
                        .map(|record| sanitize_record(record, self.today))
                        .collect(),
                );
            }
        };

        match self.sanitize_frame(df) {
            Ok(records) => TransformOutcome::Transformed(records),
            Err(e) => TransformOutcome::FellBack {
                reason: e.to_string(),
                raw,
            },
        }
    }

    /// Summary of the categories of repair a transform run applies.
    pub fn summary(&self, input_records: usize, output_records: usize) -> TransformSummary {
        TransformSummary {
            input_records,
            output_records,
            transformations_applied: TRANSFORMATIONS_APPLIED,
        }
    }

    fn sanitize_frame(&self, df: DataFrame) -> PolarsResult<Vec<WorkRecord>> {
        let lf = df.lazy();
        let lf = fix_date_issues(lf, self.today);
        let lf = clean_author_data(lf);
        let lf = standardize_identifiers(lf);
        let lf = handle_missing_fields(lf);
        let lf = validate_and_clean_text(lf);
        frame_to_records(&lf.collect()?)
    }
}

impl Default for Transformer {
    fn default() -> Self {
        Self::new()
    }
}

fn build_frame(records: &[WorkRecord]) -> PolarsResult<DataFrame> {
    let mut dois = Vec::with_capacity(records.len());
    let mut titles = Vec::with_capacity(records.len());
    let mut publishers = Vec::with_capacity(records.len());
    let mut journals = Vec::with_capacity(records.len());
    let mut volumes = Vec::with_capacity(records.len());
    let mut issues = Vec::with_capacity(records.len());
    let mut pages = Vec::with_capacity(records.len());
    let mut reference_counts = Vec::with_capacity(records.len());
    let mut cited_by_counts = Vec::with_capacity(records.len());
    let mut years: Vec<Option<i32>> = Vec::with_capacity(records.len());
    let mut months: Vec<Option<i32>> = Vec::with_capacity(records.len());
    let mut days: Vec<Option<i32>> = Vec::with_capacity(records.len());
    let mut authors = Vec::with_capacity(records.len());
    let mut author_counts = Vec::with_capacity(records.len());

    for record in records {
        dois.push(record.doi.clone());
        titles.push(record.title.clone());
        publishers.push(record.publisher.clone());
        journals.push(record.journal.clone());
        volumes.push(record.volume.clone());
        issues.push(record.issue.clone());
        pages.push(record.page.clone());
        reference_counts.push(record.reference_count);
        cited_by_counts.push(record.is_referenced_by_count);
        years.push(record.pub_year);
        months.push(record.pub_month);
        days.push(record.pub_day);
        authors.push(record.authors.clone());
        author_counts.push(record.author_count);
    }

    DataFrame::new(vec![
        Column::new("doi".into(), dois),
        Column::new("title".into(), titles),
        Column::new("publisher".into(), publishers),
        Column::new("journal".into(), journals),
        Column::new("volume".into(), volumes),
        Column::new("issue".into(), issues),
        Column::new("page".into(), pages),
        Column::new("reference_count".into(), reference_counts),
        Column::new("is_referenced_by_count".into(), cited_by_counts),
        Column::new("pub_year".into(), years),
        Column::new("pub_month".into(), months),
        Column::new("pub_day".into(), days),
        Column::new("authors".into(), authors),
        Column::new("author_count".into(), author_counts),
    ])
}

/// Null out implausible date parts, then complete dates in the future, then
/// enforce "no month/day without a year". The three projections are
/// sequential: the cascade must observe the future-date nulling.
fn fix_date_issues(lf: LazyFrame, today: Date) -> LazyFrame {
    let current_year = today.year();
    let current_month = u8::from(today.month()) as i32;
    let current_day = today.day() as i32;

    let complete_future_date = col("pub_year")
        .is_not_null()
        .and(col("pub_month").is_not_null())
        .and(col("pub_day").is_not_null())
        .and(
            col("pub_year")
                .gt(lit(current_year))
                .or(col("pub_year")
                    .eq(lit(current_year))
                    .and(col("pub_month").gt(lit(current_month))))
                .or(col("pub_year")
                    .eq(lit(current_year))
                    .and(col("pub_month").eq(lit(current_month)))
                    .and(col("pub_day").gt(lit(current_day)))),
        );

    lf.with_columns(vec![
        when(col("pub_year").gt(lit(current_year)))
            .then(lit(NULL))
            .otherwise(col("pub_year"))
            .alias("pub_year"),
        when(
            col("pub_month")
                .is_null()
                .or(col("pub_month").lt(lit(1)))
                .or(col("pub_month").gt(lit(12))),
        )
        .then(lit(NULL))
        .otherwise(col("pub_month"))
        .alias("pub_month"),
        when(
            col("pub_day")
                .is_null()
                .or(col("pub_day").lt(lit(1)))
                .or(col("pub_day").gt(lit(31))),
        )
        .then(lit(NULL))
        .otherwise(col("pub_day"))
        .alias("pub_day"),
    ])
    .with_columns(vec![when(complete_future_date)
        .then(lit(NULL))
        .otherwise(col("pub_year"))
        .alias("pub_year")])
    .with_columns(vec![
        when(col("pub_year").is_null())
            .then(lit(NULL))
            .otherwise(col("pub_month"))
            .alias("pub_month"),
        when(col("pub_year").is_null())
            .then(lit(NULL))
            .otherwise(col("pub_day"))
            .alias("pub_day"),
    ])
}

/// Collapse whitespace runs and repeated separators in the authors string,
/// then recount the non-empty segments of the cleaned string.
fn clean_author_data(lf: LazyFrame) -> LazyFrame {
    lf.with_columns(vec![col("authors")
        .str()
        .replace_all(lit(WHITESPACE_RUN_PATTERN), lit(" "), false)
        .str()
        .replace_all(lit(REPEATED_SEMICOLON_PATTERN), lit(";"), false)
        .str()
        .strip_chars(lit(NULL))
        .alias("authors")])
    .with_columns(vec![when(col("authors").eq(lit("")))
        .then(lit(0i64))
        .otherwise(
            col("authors")
                .str()
                .split(lit(";"))
                .list()
                .eval(
                    col("").filter(col("").str().strip_chars(lit(NULL)).neq(lit(""))),
                    false,
                )
                .list()
                .len()
                .cast(DataType::Int64),
        )
        .alias("author_count")])
}

fn standardize_identifiers(lf: LazyFrame) -> LazyFrame {
    lf.with_columns(vec![col("doi")
        .str()
        .strip_chars(lit(NULL))
        .str()
        .to_lowercase()
        .str()
        .replace_all(lit(DOI_URL_PREFIX_PATTERN), lit(""), false)
        .str()
        .replace_all(lit(DOI_SCHEME_PREFIX_PATTERN), lit(""), false)
        .alias("doi")])
}

/// Substitute placeholders for required text fields that are missing or
/// blank, and zero-default the count columns.
fn handle_missing_fields(lf: LazyFrame) -> LazyFrame {
    let fill = |name: &str, placeholder: &'static str| {
        when(
            col(name)
                .is_null()
                .or(col(name).str().strip_chars(lit(NULL)).eq(lit(""))),
        )
        .then(lit(placeholder))
        .otherwise(col(name))
        .alias(name)
    };

    lf.with_columns(vec![
        fill("title", TITLE_PLACEHOLDER),
        fill("journal", JOURNAL_PLACEHOLDER),
        fill("publisher", PUBLISHER_PLACEHOLDER),
        col("reference_count").fill_null(lit(0i64)),
        col("is_referenced_by_count").fill_null(lit(0i64)),
    ])
}

fn validate_and_clean_text(lf: LazyFrame) -> LazyFrame {
    let clean = |name: &str| {
        col(name)
            .str()
            .replace_all(lit(WHITESPACE_RUN_PATTERN), lit(" "), false)
            .str()
            .strip_chars(lit(NULL))
            .alias(name)
    };

    lf.with_columns(vec![clean("title"), clean("journal"), clean("publisher")])
}

fn frame_to_records(df: &DataFrame) -> PolarsResult<Vec<WorkRecord>> {
    let doi = df.column("doi")?.str()?;
    let title = df.column("title")?.str()?;
    let publisher = df.column("publisher")?.str()?;
    let journal = df.column("journal")?.str()?;
    let volume = df.column("volume")?.str()?;
    let issue = df.column("issue")?.str()?;
    let page = df.column("page")?.str()?;
    let reference_count = df.column("reference_count")?.i64()?;
    let is_referenced_by_count = df.column("is_referenced_by_count")?.i64()?;
    let pub_year = df.column("pub_year")?.i32()?;
    let pub_month = df.column("pub_month")?.i32()?;
    let pub_day = df.column("pub_day")?.i32()?;
    let authors = df.column("authors")?.str()?;
    let author_count = df.column("author_count")?.i64()?;

    let mut records = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        records.push(WorkRecord {
            doi: doi.get(i).unwrap_or("").to_string(),
            title: title.get(i).unwrap_or("").to_string(),
            publisher: publisher.get(i).unwrap_or("").to_string(),
            journal: journal.get(i).unwrap_or("").to_string(),
            volume: volume.get(i).unwrap_or("").to_string(),
            issue: issue.get(i).unwrap_or("").to_string(),
            page: page.get(i).unwrap_or("").to_string(),
            reference_count: reference_count.get(i).unwrap_or(0),
            is_referenced_by_count: is_referenced_by_count.get(i).unwrap_or(0),
            pub_year: pub_year.get(i),
            pub_month: pub_month.get(i),
            pub_day: pub_day.get(i),
            authors: authors.get(i).unwrap_or("").to_string(),
            author_count: author_count.get(i).unwrap_or(0),
        });
    }

    Ok(records)
}
