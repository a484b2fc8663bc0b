use std::collections::HashMap;

/// Environment suffixes stripped before comparing a backend to a route, in this order.
pub const ENVIRONMENT_SUFFIXES: [&str; 5] = ["-stg", "-prd", "-dev", "-staging", "-production"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimDecision {
    /// nobody owned the route yet
    Claimed,
    /// the claimant took the route over
    Replaced { previous: String },
    /// a dedicated owner keeps the route
    Rejected { owner: String },
}

impl ClaimDecision {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, ClaimDecision::Rejected { .. })
    }
}

/// Route name -> owning backend, for one cycle.
///
/// Ownership only moves towards a dedicated backend. Among equally specific
/// claimants the last one processed wins.
#[derive(Debug, Clone, Default)]
pub struct RouteOwnership {
    owners: HashMap<String, String>,
}

impl RouteOwnership {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn owner(&self, route: &str) -> Option<&str> {
        self.owners.get(route).map(String::as_str)
    }

    pub fn claim(&mut self, route: &str, backend: &str) -> ClaimDecision {
        let decision = match self.owners.get(route) {
            None => ClaimDecision::Claimed,
            Some(existing) if is_dedicated(route, existing) && !is_dedicated(route, backend) => {
                return ClaimDecision::Rejected { owner: existing.clone() };
            }
            Some(existing) => ClaimDecision::Replaced { previous: existing.clone() },
        };
        self.owners.insert(route.to_owned(), backend.to_owned());
        decision
    }
}

/// Backend name without its environment suffixes (`lab1-c2-stg` -> `lab1-c2`).
pub fn normalize_backend_name(backend: &str) -> &str {
    ENVIRONMENT_SUFFIXES
        .iter()
        .fold(backend, |name, suffix| name.strip_suffix(suffix).unwrap_or(name))
}

/// A backend is dedicated to a route when its normalized name is the route
/// name, compared with and without hyphens.
pub fn is_dedicated(route: &str, backend: &str) -> bool {
    let normalized = normalize_backend_name(backend);
    if normalized == route {
        return true;
    }
    normalized.replace('-', "") == route.replace('-', "")
}
