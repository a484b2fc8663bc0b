//! Label DSL: `<ns>_http_routers_<route>_<property> = value`.
//!
//! Route names carry no underscore, so everything after the first `_` that
//! follows the route name is the property (`rule_id` is one property).

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::errors::ReconcileError;
use crate::parser::tables::rule_for;
use crate::routing::types::{default_entry_points, RouteDefinition};

const ENABLED_VALUE: &str = "true";
const FILE_PROVIDER_SUFFIX: &str = "-file";
const FILE_PROVIDER_REF: &str = "@file";
/// first separator present wins
const MIDDLEWARE_SEPARATORS: [&str; 3] = ["__", ";", ","];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteProperty {
    Rule,
    RuleId,
    Service,
    Priority,
    EntryPoints,
    Middlewares,
}

impl RouteProperty {
    pub fn from_label(property: &str) -> Option<Self> {
        match property {
            "rule" => Some(RouteProperty::Rule),
            "rule_id" => Some(RouteProperty::RuleId),
            "service" => Some(RouteProperty::Service),
            "priority" => Some(RouteProperty::Priority),
            "entrypoints" => Some(RouteProperty::EntryPoints),
            "middlewares" => Some(RouteProperty::Middlewares),
            _ => None,
        }
    }
}

/// Non-fatal problem with one label; a default was substituted or the label ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelWarning {
    pub route: String,
    pub label: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedRoutes {
    /// sorted by route name
    pub routes: Vec<RouteDefinition>,
    pub warnings: Vec<LabelWarning>,
}

#[derive(Debug, Clone)]
pub struct LabelParser {
    enable_key: String,
    router_prefix: String,
}

impl LabelParser {
    pub fn new(namespace: &str) -> Self {
        Self {
            enable_key: format!("{}_enable", namespace),
            router_prefix: format!("{}_http_routers_", namespace),
        }
    }

    /// Opt-in marker `<ns>_enable=true`.
    pub fn is_enabled(&self, labels: &BTreeMap<String, String>) -> bool {
        labels.get(&self.enable_key).map(String::as_str) == Some(ENABLED_VALUE)
    }

    pub fn enable_key(&self) -> &str {
        &self.enable_key
    }

    /// Group router labels by route name and apply each property in key order.
    pub fn parse(&self, backend: &str, labels: &BTreeMap<String, String>) -> Result<ParsedRoutes, ReconcileError> {
        let mut routes: BTreeMap<String, RouteDefinition> = BTreeMap::new();
        let mut warnings = Vec::new();

        for (key, value) in labels {
            let Some(rest) = key.strip_prefix(&self.router_prefix) else {
                continue;
            };
            let Some((route, property)) = rest.split_once('_').filter(|(route, _)| !route.is_empty()) else {
                warnings.push(LabelWarning {
                    route: rest.to_owned(),
                    label: key.to_owned(),
                    message: "expected <route>_<property> after the router prefix".to_owned(),
                });
                continue;
            };

            let definition = routes
                .entry(route.to_owned())
                .or_insert_with(|| RouteDefinition::new(route));

            match RouteProperty::from_label(property) {
                Some(property) => apply_property(definition, property, key, value, &mut warnings),
                None => warnings.push(LabelWarning {
                    route: route.to_owned(),
                    label: key.to_owned(),
                    message: format!("unknown property '{}' ignored", property),
                }),
            }
        }

        let mut parsed = Vec::with_capacity(routes.len());
        for (name, definition) in routes {
            if definition.rule.is_none() {
                warnings.push(LabelWarning {
                    route: name.clone(),
                    label: format!("{}{}_rule", self.router_prefix, name),
                    message: "route has no rule and is dropped".to_owned(),
                });
                continue;
            }
            parsed.push(definition);
        }

        for warning in &warnings {
            warn!(backend = %backend, route = %warning.route, label = %warning.label, "{}", warning.message);
        }

        if parsed.is_empty() {
            return Err(ReconcileError::NoRoutesDefined { backend: backend.to_owned() });
        }
        debug!(backend = %backend, routes = parsed.len(), "router labels parsed");

        Ok(ParsedRoutes { routes: parsed, warnings })
    }
}

fn apply_property(
    definition: &mut RouteDefinition,
    property: RouteProperty,
    label: &str,
    value: &str,
    warnings: &mut Vec<LabelWarning>,
) {
    let route = definition.name.clone();
    let mut warn_route = |message: String| {
        warnings.push(LabelWarning {
            route: route.clone(),
            label: label.to_owned(),
            message,
        })
    };

    match property {
        RouteProperty::Rule | RouteProperty::RuleId => {
            definition.rule = Some(rule_for(value).map(str::to_owned).unwrap_or_else(|| value.to_owned()));
        }
        RouteProperty::Service => {
            let service = value.trim();
            if service.is_empty() {
                warn_route("empty service ignored".to_owned());
            } else {
                definition.service = Some(service.to_owned());
            }
        }
        RouteProperty::Priority => match value.trim().parse::<i32>() {
            Ok(priority) => definition.priority = priority,
            Err(_) => warn_route(format!(
                "invalid priority '{}', keeping {}",
                value, definition.priority
            )),
        },
        RouteProperty::EntryPoints => {
            let (entry_points, malformed) = split_entry_points(value);
            if entry_points.is_empty() {
                warn_route(format!("empty entrypoints '{}', defaulting to web", value));
                definition.entry_points = default_entry_points();
            } else {
                if malformed {
                    warn_route(format!("empty entries dropped from entrypoints '{}'", value));
                }
                definition.entry_points = entry_points;
            }
        }
        RouteProperty::Middlewares => {
            for middleware in split_middlewares(value) {
                definition.push_middleware(&middleware);
            }
        }
    }
}

/// Comma-split and trim; the flag is set when empty entries were dropped.
pub fn split_entry_points(value: &str) -> (Vec<String>, bool) {
    let mut malformed = false;
    let entry_points: Vec<String> = value
        .split(',')
        .map(str::trim)
        .filter(|entry| {
            malformed |= entry.is_empty();
            !entry.is_empty()
        })
        .map(str::to_owned)
        .collect();
    (entry_points, malformed)
}

/// Split on `__`, else `;`, else `,`; `name-file` becomes `name@file`.
pub fn split_middlewares(value: &str) -> Vec<String> {
    let parts: Vec<&str> = match MIDDLEWARE_SEPARATORS.iter().find(|sep| value.contains(*sep)) {
        Some(separator) => value.split(*separator).collect(),
        None => vec![value],
    };

    let mut middlewares: Vec<String> = Vec::with_capacity(parts.len());
    for part in parts.into_iter().map(str::trim).filter(|part| !part.is_empty()) {
        let middleware = rewrite_file_reference(part);
        if !middlewares.contains(&middleware) {
            middlewares.push(middleware);
        }
    }
    middlewares
}

fn rewrite_file_reference(middleware: &str) -> String {
    match middleware.strip_suffix(FILE_PROVIDER_SUFFIX) {
        Some(base) if !base.is_empty() => format!("{}{}", base, FILE_PROVIDER_REF),
        _ => middleware.to_owned(),
    }
}
