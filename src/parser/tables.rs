//! Static lookup tables for the label DSL.
//!
//! Label values cannot carry backticks or most rule syntax, so long matchers
//! are referenced by id through [`RULES`].

use crate::utils::constants::DEFAULT_ROUTE_PRIORITY;

/// rule id -> Traefik rule expression
pub const RULES: &[(&str, &str)] = &[
    ("home-index-root", "PathPrefix(`/`)"),
    ("home-index-signin", "Path(`/sign-in`) || Path(`/sign-up`)"),
    ("home-seo", "PathPrefix(`/api/seo`)"),
    ("labs-analytics", "PathPrefix(`/api/analytics`)"),
    ("lab1", "PathPrefix(`/lab1`)"),
    ("lab1-static", "PathPrefix(`/lab1/css/`) || PathPrefix(`/lab1/js/`) || PathPrefix(`/lab1/images/`) || PathPrefix(`/lab1/img/`) || PathPrefix(`/lab1/static/`) || PathPrefix(`/lab1/assets/`)"),
    ("lab1-c2", "PathPrefix(`/lab1/c2`)"),
    ("lab2", "PathPrefix(`/lab2`)"),
    ("lab2-static", "PathPrefix(`/lab2/css/`) || PathPrefix(`/lab2/js/`) || PathPrefix(`/lab2/images/`) || PathPrefix(`/lab2/img/`) || PathPrefix(`/lab2/static/`) || PathPrefix(`/lab2/assets/`)"),
    ("lab2-c2", "PathPrefix(`/lab2/c2`)"),
    ("lab3", "PathPrefix(`/lab3`)"),
    ("lab3-static", "PathPrefix(`/lab3/css/`) || PathPrefix(`/lab3/js/`) || PathPrefix(`/lab3/images/`) || PathPrefix(`/lab3/img/`) || PathPrefix(`/lab3/static/`) || PathPrefix(`/lab3/assets/`)"),
    ("lab3-extension", "PathPrefix(`/lab3/extension`)"),
];

/// Higher matches first.
/// 1 catch-all, 100 sign-in, 200 lab roots, 250 static assets, 300 sub-routes, 500 APIs.
pub const PRIORITIES: &[(&str, i32)] = &[
    ("home-index", 1),
    ("home-index-root", 1),
    ("home-index-signin", 100),
    ("home-seo", 500),
    ("labs-analytics", 500),
    ("lab1", 200),
    ("lab1-static", 250),
    ("lab1-c2", 300),
    ("lab2", 200),
    ("lab2-main", 200),
    ("lab2-static", 250),
    ("lab2-c2", 300),
    ("lab3", 200),
    ("lab3-main", 200),
    ("lab3-static", 250),
    ("lab3-extension", 300),
];

/// route name -> strip-prefix middleware defined in the static file provider
pub const STRIP_PREFIX_MIDDLEWARES: &[(&str, &str)] = &[
    ("lab1", "strip-lab1-prefix@file"),
    ("lab1-static", "strip-lab1-prefix@file"),
    ("lab1-c2", "strip-lab1-c2-prefix@file"),
    ("lab2", "strip-lab2-prefix@file"),
    ("lab2-main", "strip-lab2-prefix@file"),
    ("lab2-static", "strip-lab2-prefix@file"),
    ("lab2-c2", "strip-lab2-c2-prefix@file"),
    ("lab3", "strip-lab3-prefix@file"),
    ("lab3-main", "strip-lab3-prefix@file"),
    ("lab3-static", "strip-lab3-prefix@file"),
    ("lab3-extension", "strip-lab3-extension-prefix@file"),
    ("home-seo", "strip-seo-prefix@file"),
    ("labs-analytics", "strip-analytics-prefix@file"),
];

fn lookup<T: Copy>(table: &[(&str, T)], key: &str) -> Option<T> {
    table.iter().find(|(name, _)| *name == key).map(|(_, value)| *value)
}

pub fn rule_for(rule_id: &str) -> Option<&'static str> {
    lookup(RULES, rule_id)
}

pub fn default_priority(route: &str) -> i32 {
    lookup(PRIORITIES, route).unwrap_or(DEFAULT_ROUTE_PRIORITY)
}

/// Exact name first, then `<known>-...` unless the route is its own c2/extension sub-route.
pub fn strip_prefix_middleware(route: &str) -> Option<&'static str> {
    if let Some(middleware) = lookup(STRIP_PREFIX_MIDDLEWARES, route) {
        return Some(middleware);
    }
    if route.contains("-c2") || route.contains("-extension") {
        return None;
    }
    STRIP_PREFIX_MIDDLEWARES
        .iter()
        .find(|(prefix, _)| route.starts_with(&format!("{}-", prefix)))
        .map(|(_, middleware)| *middleware)
}
