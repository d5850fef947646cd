//! XBRL company facts normalization.
//!
//! A company facts document nests four levels deep: namespace, concept, unit,
//! observation. [`normalize_company_facts`] flattens it into [`FactRow`]s for
//! a chosen set of concepts.
//!
//! Which concepts are kept depends on what the filer reported:
//!
//! 1. If any [`PREFERRED_CONCEPTS`] entry is present, the preferred list is used.
//! 2. Otherwise up to two revenue/sales concepts and up to two income/earnings
//!    concepts are picked by case-insensitive substring match.
//! 3. If nothing matches, the first five concepts of the document are used.
//!
//! Matching follows document order, which the SEC does not guarantee to be
//! stable between fetches. Companies landing on different tiers yield
//! different concept sets; downstream consumers are expected to cope.
//!
//! Malformed or missing substructure never fails normalization. It yields no
//! rows for the narrowest enclosing scope.

use filings_core::{Cik, CompanyFacts, FactRow, Ticker};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Concepts extracted whenever a filer reports at least one of them, all in
/// the standard `us-gaap` taxonomy.
pub const PREFERRED_CONCEPTS: [&str; 6] = [
    "us-gaap:Revenues",
    "us-gaap:SalesRevenueNet",
    "us-gaap:CostOfRevenue",
    "us-gaap:GrossProfit",
    "us-gaap:NetIncomeLoss",
    "us-gaap:EarningsPerShareDiluted",
];

/// Revenue/sales vocabulary for the fallback scan.
const REVENUE_TERMS: [&str; 2] = ["revenue", "sales"];

/// Income/earnings vocabulary for the fallback scan.
const INCOME_TERMS: [&str; 2] = ["income", "earnings"];

/// Fallback matches kept per vocabulary.
const MATCHES_PER_VOCABULARY: usize = 2;

/// Concepts kept when no vocabulary term matches.
const ARBITRARY_PREFIX_LEN: usize = 5;

/// Which rule produced a [`ConceptSelection`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SelectionTier {
    /// At least one preferred concept was available.
    Preferred,
    /// Revenue/sales and income/earnings vocabulary matches.
    Vocabulary,
    /// Leading concepts of the document, no match at all.
    Arbitrary,
}

/// The effective concept set for one company.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConceptSelection {
    tier: SelectionTier,
    concepts: Vec<String>,
}

impl ConceptSelection {
    /// Rule that produced this selection.
    #[must_use]
    pub const fn tier(&self) -> SelectionTier {
        self.tier
    }

    /// Selected `namespace:concept` names.
    #[must_use]
    pub fn concepts(&self) -> &[String] {
        &self.concepts
    }

    /// Returns true if `concept` is selected.
    #[must_use]
    pub fn contains(&self, concept: &str) -> bool {
        self.concepts.iter().any(|c| c == concept)
    }
}

/// Lists every `namespace:concept` in the document, in document order.
#[must_use]
pub fn available_concepts(facts: &CompanyFacts) -> Vec<String> {
    facts
        .namespaces()
        .flat_map(|(namespace, concepts)| {
            concepts
                .keys()
                .map(move |name| format!("{namespace}:{name}"))
        })
        .collect()
}

/// Chooses the effective concept set from the available concepts.
#[must_use]
pub fn select_concepts(available: &[String]) -> ConceptSelection {
    if PREFERRED_CONCEPTS
        .iter()
        .any(|preferred| available.iter().any(|c| c == preferred))
    {
        return ConceptSelection {
            tier: SelectionTier::Preferred,
            concepts: PREFERRED_CONCEPTS.iter().map(ToString::to_string).collect(),
        };
    }

    let concepts: Vec<String> = vocabulary_matches(available, &REVENUE_TERMS)
        .take(MATCHES_PER_VOCABULARY)
        .chain(vocabulary_matches(available, &INCOME_TERMS).take(MATCHES_PER_VOCABULARY))
        .cloned()
        .collect();

    if !concepts.is_empty() {
        return ConceptSelection {
            tier: SelectionTier::Vocabulary,
            concepts,
        };
    }

    ConceptSelection {
        tier: SelectionTier::Arbitrary,
        concepts: available.iter().take(ARBITRARY_PREFIX_LEN).cloned().collect(),
    }
}

/// Concepts whose lowercased name contains any of `terms`.
fn vocabulary_matches<'a>(
    available: &'a [String],
    terms: &'a [&str],
) -> impl Iterator<Item = &'a String> + 'a {
    available.iter().filter(move |concept| {
        let lower = concept.to_lowercase();
        terms.iter().any(|term| lower.contains(term))
    })
}

/// Period marker of one observation, or `None` if it must be dropped.
///
/// The period end date wins; the fiscal year is used only when the end date is
/// absent or empty.
#[must_use]
pub fn observation_period(observation: &Map<String, Value>) -> Option<String> {
    if let Some(end) = observation
        .get("end")
        .and_then(Value::as_str)
        .filter(|end| !end.is_empty())
    {
        return Some(end.to_string());
    }

    match observation.get("fy")? {
        Value::Number(fy) => Some(fy.to_string()),
        Value::String(fy) if !fy.is_empty() => Some(fy.clone()),
        _ => None,
    }
}

/// Lazily walks the document, yielding one row per retained observation of a
/// selected concept.
///
/// The iterator borrows its inputs and can be recreated at will.
pub fn fact_rows<'a>(
    cik: &'a Cik,
    ticker: &'a Ticker,
    facts: &'a CompanyFacts,
    selection: &'a ConceptSelection,
) -> impl Iterator<Item = FactRow> + 'a {
    facts
        .namespaces()
        .flat_map(move |(namespace, concepts)| {
            concepts.iter().filter_map(move |(name, body)| {
                let concept = format!("{namespace}:{name}");
                selection.contains(&concept).then_some((concept, body))
            })
        })
        .flat_map(move |(concept, body)| {
            unit_observations(body).flat_map(move |(unit, observations)| {
                let concept = concept.clone();
                observations
                    .iter()
                    .filter_map(move |observation| build_row(cik, ticker, &concept, unit, observation))
            })
        })
}

/// Units of a concept body with their observation arrays.
fn unit_observations(body: &Value) -> impl Iterator<Item = (&str, &Vec<Value>)> {
    body.get("units")
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|units| units.iter())
        .filter_map(|(unit, observations)| {
            observations
                .as_array()
                .map(|observations| (unit.as_str(), observations))
        })
}

fn build_row(
    cik: &Cik,
    ticker: &Ticker,
    concept: &str,
    unit: &str,
    observation: &Value,
) -> Option<FactRow> {
    let observation = observation.as_object()?;
    let period_end_date = observation_period(observation)?;
    let text = |key: &str| {
        observation
            .get(key)
            .and_then(Value::as_str)
            .map(ToString::to_string)
    };

    Some(FactRow {
        cik: cik.clone(),
        ticker: ticker.clone(),
        concept: concept.to_string(),
        unit: unit.to_string(),
        period_end_date,
        val: observation.get("val").and_then(Value::as_number).cloned(),
        accn: text("accn"),
        fy: observation.get("fy").and_then(Value::as_i64),
        fp: text("fp"),
        form: text("form"),
        filed: text("filed"),
    })
}

/// Flattens a company facts document into rows.
///
/// A document without namespaces yields no rows. See the module docs for how
/// concepts are chosen.
#[must_use]
pub fn normalize_company_facts(cik: &Cik, ticker: &Ticker, facts: &CompanyFacts) -> Vec<FactRow> {
    if facts.is_empty() {
        debug!(%ticker, "No facts found");
        return Vec::new();
    }

    let available = available_concepts(facts);
    let selection = select_concepts(&available);
    match selection.tier() {
        SelectionTier::Preferred => {
            let present = selection
                .concepts()
                .iter()
                .filter(|c| available.contains(*c))
                .count();
            info!(%ticker, present, "Using preferred concepts");
        }
        SelectionTier::Vocabulary | SelectionTier::Arbitrary => {
            info!(
                %ticker,
                tier = ?selection.tier(),
                concepts = ?selection.concepts(),
                "Using fallback concepts"
            );
        }
    }

    fact_rows(cik, ticker, facts, &selection).collect()
}
