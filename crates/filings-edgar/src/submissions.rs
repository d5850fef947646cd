//! Recent filing history flattening.

use filings_core::{Cik, CompanySubmissions, FilingsError, Result, SubmissionRow, Ticker};

/// Zips the recent-filings parallel arrays into one row per filing.
///
/// Rows are produced for every position of `accessionNumber`. A document with
/// no filing history yields no rows.
///
/// # Errors
/// Returns [`FilingsError::MalformedSubmissions`] if `form`, `filingDate` or
/// `reportDate` is shorter than `accessionNumber`.
pub fn flatten_submissions(
    cik: &Cik,
    ticker: &Ticker,
    submissions: &CompanySubmissions,
) -> Result<Vec<SubmissionRow>> {
    let Some(recent) = submissions.recent() else {
        return Ok(Vec::new());
    };

    let count = recent.accession_number.len();
    for (name, column) in [
        ("form", &recent.form),
        ("filingDate", &recent.filing_date),
        ("reportDate", &recent.report_date),
    ] {
        if column.len() < count {
            return Err(FilingsError::MalformedSubmissions {
                ticker: ticker.to_string(),
                detail: format!(
                    "{name} has {} entries but accessionNumber has {count}",
                    column.len()
                ),
            });
        }
    }

    let company_name = submissions.name.clone().unwrap_or_default();
    Ok(recent
        .accession_number
        .iter()
        .zip(&recent.form)
        .zip(&recent.filing_date)
        .zip(&recent.report_date)
        .map(|(((accession, form), filed), report)| SubmissionRow {
            cik: cik.clone(),
            ticker: ticker.clone(),
            company_name: company_name.clone(),
            accession_no: accession.clone(),
            form: form.clone(),
            filed: filed.clone(),
            report_period: report.clone(),
        })
        .collect())
}
