//! List filters and their canonical query encoding
//!
//! A filter is rendered as `(key, value)` query pairs: absent fields are
//! omitted, instants are RFC 3339 in UTC with second precision, numbers are
//! plain decimal strings. The canonical key is the sorted, URL-encoded form
//! of those pairs; two filters with the same canonical key are the same
//! request, however they were built.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::time::DateRange;

/// Query pairs sent with a list request
pub type QueryPairs = Vec<(&'static str, String)>;

/// A filter that can be sent as query parameters
pub trait QueryFilter {
    fn query_pairs(&self) -> QueryPairs;

    /// Value-based identity of the request this filter produces
    fn canonical_key(&self) -> String {
        let mut pairs = self.query_pairs();
        pairs.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(&b.1)));
        pairs
            .iter()
            .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }
}

fn instant(value: &DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn push_page(pairs: &mut QueryPairs, skip: Option<u32>, limit: Option<u32>) {
    if let Some(skip) = skip {
        pairs.push(("skip", skip.to_string()));
    }
    if let Some(limit) = limit {
        pairs.push(("limit", limit.to_string()));
    }
}

/// Filter for `GET /bank-accounts`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl AccountFilter {
    pub fn paginate(mut self, skip: u32, limit: u32) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }
}

impl QueryFilter for AccountFilter {
    fn query_pairs(&self) -> QueryPairs {
        let mut pairs = Vec::new();
        push_page(&mut pairs, self.skip, self.limit);
        pairs
    }
}

/// Filter for `GET /transactions`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    pub bank_account_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub skip: Option<u32>,
    pub limit: Option<u32>,
}

impl TransactionFilter {
    /// Only transactions of one account
    pub fn for_account(mut self, id: Uuid) -> Self {
        self.bank_account_id = Some(id);
        self
    }

    /// Restrict to a date range; unbounded ends are left out
    pub fn between(mut self, range: DateRange) -> Self {
        self.start_date = range.start;
        self.end_date = range.end;
        self
    }

    pub fn paginate(mut self, skip: u32, limit: u32) -> Self {
        self.skip = Some(skip);
        self.limit = Some(limit);
        self
    }
}

impl QueryFilter for TransactionFilter {
    fn query_pairs(&self) -> QueryPairs {
        let mut pairs = Vec::new();
        if let Some(id) = self.bank_account_id {
            pairs.push(("bank_account_id", id.to_string()));
        }
        if let Some(start) = &self.start_date {
            pairs.push(("start_date", instant(start)));
        }
        if let Some(end) = &self.end_date {
            pairs.push(("end_date", instant(end)));
        }
        push_page(&mut pairs, self.skip, self.limit);
        pairs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};

    #[test]
    fn test_empty_filter_has_empty_key() {
        assert!(TransactionFilter::default().query_pairs().is_empty());
        assert_eq!(TransactionFilter::default().canonical_key(), "");
        assert_eq!(AccountFilter::default().canonical_key(), "");
    }

    #[test]
    fn test_absent_fields_omitted() {
        let filter = TransactionFilter::default().paginate(0, 50);
        assert_eq!(filter.query_pairs(), vec![("skip", "0".to_string()), ("limit", "50".to_string())]);
    }

    #[test]
    fn test_dates_are_utc_instants() {
        let paris = FixedOffset::east_opt(3600).unwrap();
        let start = paris.with_ymd_and_hms(2024, 1, 1, 1, 0, 0).unwrap().with_timezone(&Utc);
        let filter = TransactionFilter { start_date: Some(start), ..Default::default() };
        assert_eq!(filter.query_pairs(), vec![("start_date", "2024-01-01T00:00:00Z".to_string())]);
        assert_eq!(filter.canonical_key(), "start_date=2024-01-01T00%3A00%3A00Z");
    }

    #[test]
    fn test_equal_filters_share_key_regardless_of_construction() {
        let account = Uuid::new_v4();
        let range = DateRange {
            start: Some(Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap()),
            end: None,
        };
        let a = TransactionFilter::default().for_account(account).between(range).paginate(0, 100);
        let b = TransactionFilter {
            limit: Some(100),
            skip: Some(0),
            start_date: range.start,
            bank_account_id: Some(account),
            end_date: None,
        };
        assert_eq!(a.canonical_key(), b.canonical_key());
        assert_ne!(a.canonical_key(), a.clone().paginate(100, 100).canonical_key());
    }

    #[test]
    fn test_canonical_key_is_sorted() {
        let filter = TransactionFilter::default()
            .for_account(Uuid::nil())
            .paginate(10, 20);
        assert_eq!(
            filter.canonical_key(),
            "bank_account_id=00000000-0000-0000-0000-000000000000&limit=20&skip=10"
        );
    }
}
