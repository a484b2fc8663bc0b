use std::collections::BTreeMap;

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};

use crate::parser::tables::default_priority;
use crate::utils::constants::DEFAULT_ENTRY_POINT;

/// A route as declared by one backend's labels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub name: String,
    pub rule: Option<String>,
    /// explicit backend override (`..._service` label)
    pub service: Option<String>,
    pub priority: i32,
    /// never empty
    pub entry_points: Vec<String>,
    /// ordered, no duplicates
    pub middlewares: Vec<String>,
}

impl RouteDefinition {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            rule: None,
            service: None,
            priority: default_priority(name),
            entry_points: default_entry_points(),
            middlewares: Vec::new(),
        }
    }

    pub fn has_middleware(&self, middleware: &str) -> bool {
        self.middlewares.iter().any(|m| m == middleware)
    }

    /// Appends unless already present.
    pub fn push_middleware(&mut self, middleware: &str) -> bool {
        if self.has_middleware(middleware) {
            return false;
        }
        self.middlewares.push(middleware.to_owned());
        true
    }

    /// Inserts at the front (runs first) unless already present.
    pub fn prepend_middleware(&mut self, middleware: &str) -> bool {
        if self.has_middleware(middleware) {
            return false;
        }
        self.middlewares.insert(0, middleware.to_owned());
        true
    }
}

pub fn default_entry_points() -> Vec<String> {
    vec![DEFAULT_ENTRY_POINT.to_owned()]
}

/// ================================
/// Emitted configuration
/// ================================

/// One complete snapshot. Each emission fully supersedes the previous one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RoutingConfiguration {
    pub routers: BTreeMap<String, Router>,
    #[serde(rename = "services")]
    pub backends: BTreeMap<String, Backend>,
    pub middlewares: BTreeMap<String, Middleware>,
}

#[derive(Serialize)]
struct DynamicDocument<'a> {
    http: &'a RoutingConfiguration,
}

impl RoutingConfiguration {
    /// Traefik dynamic configuration document (`http:` root).
    pub fn to_yaml(&self) -> Result<String, serde_yaml::Error> {
        serde_yaml::to_string(&DynamicDocument { http: self })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Router {
    #[serde(rename = "rule")]
    pub match_expression: String,
    #[serde(rename = "service")]
    pub backend_name: String,
    pub priority: i32,
    pub entry_points: Vec<String>,
    #[serde(rename = "middlewares", skip_serializing_if = "Vec::is_empty")]
    pub middleware_refs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backend {
    pub target_urls: Vec<String>,
    pub pass_host_header: bool,
}

impl Serialize for Backend {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Server<'a> {
            url: &'a str,
        }

        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct LoadBalancer<'a> {
            servers: Vec<Server<'a>>,
            pass_host_header: bool,
        }

        let load_balancer = LoadBalancer {
            servers: self.target_urls.iter().map(|url| Server { url }).collect(),
            pass_host_header: self.pass_host_header,
        };
        let mut state = serializer.serialize_struct("Backend", 1)?;
        state.serialize_field("loadBalancer", &load_balancer)?;
        state.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Middleware {
    Headers(HeadersMiddleware),
    ForwardAuth(ForwardAuthMiddleware),
}

/// Single-key map (`headers:` / `forwardAuth:`); serde_yaml would otherwise emit a YAML tag.
impl Serialize for Middleware {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        match self {
            Middleware::Headers(headers) => map.serialize_entry("headers", headers)?,
            Middleware::ForwardAuth(forward_auth) => map.serialize_entry("forwardAuth", forward_auth)?,
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HeadersMiddleware {
    pub custom_request_headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardAuthMiddleware {
    pub address: String,
    pub trust_forward_header: bool,
    #[serde(rename = "authResponseHeaders")]
    pub response_headers_to_copy: Vec<String>,
    #[serde(rename = "authRequestHeaders")]
    pub request_headers_to_forward: Vec<String>,
}
