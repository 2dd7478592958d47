//! Upstream URL shapes and response envelopes.
//!
//! The same logical resource is exposed under different path segments and
//! wrapper keys depending on deployment. Each [`Shape`] is a pure URL builder
//! paired with the [`Envelope`] its response is expected in. Shape tables are
//! tried in order.

use serde_json::Value;

use crate::query::ScheduleQuery;

/// Ordered JSON pointers under which a payload collection may be wrapped.
#[derive(Debug)]
pub struct Envelope {
    pub name: &'static str,
    pointers: &'static [&'static str],
}

impl Envelope {
    pub const BRANCHES: Envelope = Envelope {
        name: "branches",
        pointers: &["/_embedded/branches", "/branches", "/_embedded/branch", "/branch"],
    };

    pub const STAFF: Envelope = Envelope {
        name: "staff",
        pointers: &["/_embedded/staff", "/staff", "/_embedded/staffs"],
    };

    pub const ROSTERS: Envelope = Envelope {
        name: "rosters",
        pointers: &["/_embedded/rosters", "/rosters"],
    };

    /// Extract the payload collection: a bare array as-is, otherwise the
    /// first wrapped array, otherwise nothing.
    pub fn extract(&self, body: &Value) -> Vec<Value> {
        if let Value::Array(items) = body {
            return items.clone();
        }
        self.pointers
            .iter()
            .find_map(|pointer| body.pointer(pointer).and_then(Value::as_array))
            .cloned()
            .unwrap_or_default()
    }
}

/// Root of every upstream URL for one business.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
    business_id: String,
}

impl Endpoints {
    pub fn new(base: &str, business_id: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
            business_id: business_id.to_string(),
        }
    }

    /// `{base}/business/{business_id}/{tail}`
    pub fn business(&self, tail: &str) -> String {
        format!("{}/business/{}/{}", self.base, enc(&self.business_id), tail)
    }

    /// Materialize a shape table into concrete candidates, preserving order.
    pub fn candidates<P: ?Sized>(&self, shapes: &[Shape<P>], params: &P) -> Vec<Candidate> {
        shapes
            .iter()
            .map(|shape| Candidate {
                label: shape.label,
                url: (shape.url)(self, params),
                envelope: shape.envelope,
            })
            .collect()
    }
}

/// One way the upstream may expose a resource.
pub struct Shape<P: ?Sized> {
    pub label: &'static str,
    url: fn(&Endpoints, &P) -> String,
    pub envelope: &'static Envelope,
}

/// A fully-formed URL to try, with the envelope to unwrap on success.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: &'static str,
    pub url: String,
    pub envelope: &'static Envelope,
}

pub const BRANCH_SHAPES: &[Shape<()>] = &[
    Shape {
        label: "branches",
        url: branches_plural,
        envelope: &Envelope::BRANCHES,
    },
    Shape {
        label: "branch",
        url: branches_singular,
        envelope: &Envelope::BRANCHES,
    },
];

/// Branch-scoped staff collections, keyed by branch id.
pub const BRANCH_STAFF_SHAPES: &[Shape<str>] = &[
    Shape {
        label: "branch-staff",
        url: staff_under_branch,
        envelope: &Envelope::STAFF,
    },
    Shape {
        label: "branches-staff",
        url: staff_under_branches,
        envelope: &Envelope::STAFF,
    },
    Shape {
        label: "staff-by-branch-query",
        url: staff_by_branch_query,
        envelope: &Envelope::STAFF,
    },
];

/// Business-wide staff collection used for client-side filtering.
pub const ALL_STAFF_SHAPES: &[Shape<()>] = &[Shape {
    label: "all-staff",
    url: all_staff,
    envelope: &Envelope::STAFF,
}];

pub const ROSTER_SHAPES: &[Shape<ScheduleQuery>] = &[Shape {
    label: "rosters",
    url: staff_rosters,
    envelope: &Envelope::ROSTERS,
}];

fn branches_plural(endpoints: &Endpoints, _: &()) -> String {
    endpoints.business("branches")
}

fn branches_singular(endpoints: &Endpoints, _: &()) -> String {
    endpoints.business("branch")
}

fn staff_under_branch(endpoints: &Endpoints, branch_id: &str) -> String {
    endpoints.business(&format!("branch/{}/staff", enc(branch_id)))
}

fn staff_under_branches(endpoints: &Endpoints, branch_id: &str) -> String {
    endpoints.business(&format!("branches/{}/staff", enc(branch_id)))
}

fn staff_by_branch_query(endpoints: &Endpoints, branch_id: &str) -> String {
    endpoints.business(&format!("staff?branchId={}", enc(branch_id)))
}

fn all_staff(endpoints: &Endpoints, _: &()) -> String {
    endpoints.business("staff")
}

fn staff_rosters(endpoints: &Endpoints, query: &ScheduleQuery) -> String {
    endpoints.business(&format!(
        "branch/{}/staff/{}/rosters?startDate={}&endDate={}",
        enc(&query.branch_id),
        enc(&query.staff_id),
        enc(&query.from),
        enc(&query.to)
    ))
}

fn enc(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
