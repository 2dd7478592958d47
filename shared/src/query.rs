//! Inbound query parameters and the resource queries built from them.

use std::collections::HashMap;

use lambda_http::{Request, RequestExt};

use crate::{Error, Result};

/// Query string parameters of one request. Empty values count as absent.
#[derive(Debug, Default, Clone)]
pub struct QueryParams(HashMap<String, String>);

impl QueryParams {
    /// Collect parameters from the Lambda event, falling back to the raw URI
    /// query when the event carries none.
    pub fn from_request(event: &Request) -> Self {
        let map = event.query_string_parameters();
        if !map.is_empty() {
            let mut params = HashMap::new();
            for (key, value) in map.iter() {
                params
                    .entry(key.to_string())
                    .or_insert_with(|| value.to_string());
            }
            return Self(params);
        }

        event.uri().query().map(Self::parse).unwrap_or_default()
    }

    /// Parse a raw `a=1&b=2` query string. The first occurrence of a key wins.
    pub fn parse(query: &str) -> Self {
        let mut params = HashMap::new();
        for pair in query.split('&').filter(|p| !p.is_empty()) {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            params
                .entry(decode(key))
                .or_insert_with(|| decode(value));
        }
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// `1` or `true` switch a flag on; anything else leaves it off.
    pub fn flag(&self, key: &str) -> bool {
        matches!(self.get(key), Some("1") | Some("true"))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn decode(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|v| v.into_owned())
        .unwrap_or(spaced)
}

/// The function a request was routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Branches,
    Staff,
    Schedule,
}

impl Route {
    pub fn name(&self) -> &'static str {
        match self {
            Route::Branches => "branches",
            Route::Staff => "staff",
            Route::Schedule => "schedule",
        }
    }
}

/// A validated request for one resource kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceQuery {
    Branches(BranchesQuery),
    Staff(StaffQuery),
    Schedule(ScheduleQuery),
}

impl ResourceQuery {
    pub fn parse(route: Route, params: &QueryParams) -> Result<Self> {
        match route {
            Route::Branches => Ok(ResourceQuery::Branches(BranchesQuery {
                raw: params.flag("raw"),
            })),
            Route::Staff => StaffQuery::parse(params).map(ResourceQuery::Staff),
            Route::Schedule => ScheduleQuery::parse(params).map(ResourceQuery::Schedule),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BranchesQuery {
    /// Return the unwrapped upstream list without normalization
    pub raw: bool,
}

/// How the branch of a staff query is identified.
#[derive(Debug, Clone, PartialEq)]
pub enum StaffTarget {
    Branch(String),
    /// Must be resolved to a branch through the branches collection first
    Account(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StaffQuery {
    pub target: StaffTarget,
    pub include_inactive: bool,
    pub raw: bool,
    pub try_all: bool,
}

impl StaffQuery {
    pub fn parse(params: &QueryParams) -> Result<Self> {
        let target = match (params.get("branchId"), params.get("accountId")) {
            (Some(branch_id), _) => StaffTarget::Branch(branch_id.to_string()),
            (None, Some(account_id)) => StaffTarget::Account(account_id.to_string()),
            (None, None) => {
                return Err(Error::Validation("branchId or accountId required".to_string()))
            }
        };

        Ok(Self {
            target,
            include_inactive: params.flag("includeInactive"),
            raw: params.flag("raw"),
            try_all: params.flag("tryAll"),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleQuery {
    pub branch_id: String,
    pub staff_id: String,
    pub from: String,
    pub to: String,
}

impl ScheduleQuery {
    pub fn parse(params: &QueryParams) -> Result<Self> {
        match (
            params.get("branchId"),
            params.get("staffId"),
            params.get("from"),
            params.get("to"),
        ) {
            (Some(branch_id), Some(staff_id), Some(from), Some(to)) => Ok(Self {
                branch_id: branch_id.to_string(),
                staff_id: staff_id.to_string(),
                from: from.to_string(),
                to: to.to_string(),
            }),
            _ => Err(Error::Validation("branchId, staffId, from, to required".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_raw_query() {
        let params = QueryParams::parse("branchId=a%2Fb&name=Jo+Ann&empty=&branchId=ignored&flag");
        assert_eq!(params.get("branchId"), Some("a/b"));
        assert_eq!(params.get("name"), Some("Jo Ann"));
        assert_eq!(params.get("empty"), None);
        assert_eq!(params.get("flag"), None);
    }

    #[test]
    fn test_flags() {
        let params: QueryParams = [("raw", "1"), ("tryAll", "true"), ("includeInactive", "yes")]
            .into_iter()
            .collect();
        assert!(params.flag("raw"));
        assert!(params.flag("tryAll"));
        assert!(!params.flag("includeInactive"));
        assert!(!params.flag("missing"));
    }

    #[test]
    fn test_staff_query_prefers_branch_id() {
        let params: QueryParams = [("branchId", "b1"), ("accountId", "acc")].into_iter().collect();
        let query = StaffQuery::parse(&params).unwrap();
        assert_eq!(query.target, StaffTarget::Branch("b1".into()));
        assert!(!query.include_inactive);

        let params: QueryParams = [("accountId", "acc"), ("includeInactive", "1")]
            .into_iter()
            .collect();
        let query = StaffQuery::parse(&params).unwrap();
        assert_eq!(query.target, StaffTarget::Account("acc".into()));
        assert!(query.include_inactive);
    }

    #[test]
    fn test_staff_query_requires_identifier() {
        let err = StaffQuery::parse(&QueryParams::parse("raw=1")).unwrap_err();
        assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn test_schedule_query_requires_all_fields() {
        for missing in ["branchId", "staffId", "from", "to"] {
            let params: QueryParams = [
                ("branchId", "b"),
                ("staffId", "s"),
                ("from", "2024-01-01"),
                ("to", "2024-01-07"),
            ]
            .into_iter()
            .filter(|(k, _)| *k != missing)
            .collect();
            let err = ScheduleQuery::parse(&params).unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "missing {}", missing);
        }
    }

    #[test]
    fn test_branches_query() {
        let query = ResourceQuery::parse(Route::Branches, &QueryParams::parse("raw=1")).unwrap();
        assert_eq!(query, ResourceQuery::Branches(BranchesQuery { raw: true }));
    }
}
