//! EDGAR API response documents.
//!
//! Submissions and the ticker directory have a stable shape and are typed.
//! Company facts are schema-varying four levels deep (namespace, concept,
//! unit, observation), so everything under `facts` stays a JSON map and is
//! walked with explicit optional checks by the normalizer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry of the SEC ticker directory (`company_tickers.json`).
///
/// The SEC returns: `{"0": {"cik_str": 320193, "ticker": "AAPL", "title": "Apple Inc."}, ...}`
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerEntry {
    /// CIK as a number (SEC returns this as an integer despite the name)
    pub cik_str: u64,
    /// Ticker symbol
    pub ticker: String,
    /// Company name
    #[serde(default)]
    pub title: String,
}

/// Response from the SEC EDGAR Company Facts API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFacts {
    /// Entity name
    #[serde(default)]
    pub entity_name: Option<String>,
    /// Facts organized by namespace and concept, in document order
    #[serde(default)]
    pub facts: Option<Map<String, Value>>,
}

impl CompanyFacts {
    /// Iterates namespaces whose body is a mapping, in document order.
    ///
    /// Namespace values of any other JSON type are skipped.
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.facts
            .iter()
            .flat_map(|facts| facts.iter())
            .filter_map(|(namespace, body)| body.as_object().map(|b| (namespace.as_str(), b)))
    }

    /// Returns true if the document carries no namespaces at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.as_ref().is_none_or(Map::is_empty)
    }
}

/// Company submissions/filings metadata.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanySubmissions {
    /// Company name
    #[serde(default, alias = "companyName")]
    pub name: Option<String>,
    /// Filing history container
    #[serde(default)]
    pub filings: Option<FilingHistory>,
}

impl CompanySubmissions {
    /// The recent filings block, if the document has one.
    #[must_use]
    pub fn recent(&self) -> Option<&RecentFilings> {
        self.filings.as_ref().and_then(|f| f.recent.as_ref())
    }
}

/// Container for filings data.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingHistory {
    /// Recent filings
    #[serde(default)]
    pub recent: Option<RecentFilings>,
}

/// Recent filings as parallel arrays, one position per filing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentFilings {
    /// Accession numbers
    #[serde(default)]
    pub accession_number: Vec<String>,
    /// Form types (e.g., "10-K", "10-Q")
    #[serde(default)]
    pub form: Vec<String>,
    /// Filing dates
    #[serde(default)]
    pub filing_date: Vec<String>,
    /// Report dates
    #[serde(default)]
    pub report_date: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_company_facts_tolerates_missing_facts() {
        let facts: CompanyFacts = serde_json::from_value(json!({})).unwrap();
        assert!(facts.is_empty());
        assert_eq!(facts.namespaces().count(), 0);

        let facts: CompanyFacts = serde_json::from_value(json!({"facts": null})).unwrap();
        assert!(facts.is_empty());
    }

    #[test]
    fn test_namespaces_skip_non_mappings_and_keep_order() {
        let facts: CompanyFacts = serde_json::from_value(json!({
            "cik": 320193,
            "entityName": "Apple Inc.",
            "facts": {
                "us-gaap": {},
                "broken": 42,
                "dei": {}
            }
        }))
        .unwrap();

        let names: Vec<&str> = facts.namespaces().map(|(ns, _)| ns).collect();
        assert_eq!(names, vec!["us-gaap", "dei"]);
        assert_eq!(facts.entity_name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_submissions_parse_recent_block() {
        let subs: CompanySubmissions = serde_json::from_value(json!({
            "cik": "320193",
            "name": "Apple Inc.",
            "filings": {
                "recent": {
                    "accessionNumber": ["0000320193-24-000001"],
                    "form": ["10-K"],
                    "filingDate": ["2024-11-01"],
                    "reportDate": ["2024-09-28"],
                    "primaryDocument": ["aapl-20240928.htm"]
                }
            }
        }))
        .unwrap();

        let recent = subs.recent().unwrap();
        assert_eq!(recent.accession_number.len(), 1);
        assert_eq!(recent.report_date[0], "2024-09-28");
        assert_eq!(subs.name.as_deref(), Some("Apple Inc."));
    }

    #[test]
    fn test_submissions_without_history() {
        let subs: CompanySubmissions = serde_json::from_value(json!({"name": "Shell Co"})).unwrap();
        assert!(subs.recent().is_none());
    }
}
