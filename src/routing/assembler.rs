use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use crate::config::service::RoutingConfig;
use crate::discovery::BackendDescriptor;
use crate::parser::labels::ParsedRoutes;
use crate::parser::tables::strip_prefix_middleware;
use crate::routing::ownership::{ClaimDecision, RouteOwnership};
use crate::routing::types::{
    default_entry_points, Backend, ForwardAuthMiddleware, HeadersMiddleware, Middleware, RouteDefinition,
    Router, RoutingConfiguration,
};
use crate::utils::constants::*;

const FILE_PROVIDER_REF: &str = "@file";

/// Fixed policy applied to every emitted route.
#[derive(Debug, Clone)]
pub struct AssemblyPolicy {
    pub user_auth_enabled: bool,
    pub forward_auth_middlewares: Vec<String>,
}

impl Default for AssemblyPolicy {
    fn default() -> Self {
        Self {
            user_auth_enabled: false,
            forward_auth_middlewares: DEFAULT_FORWARD_AUTH_MIDDLEWARES.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl AssemblyPolicy {
    pub fn from_config(cfg: &RoutingConfig) -> Self {
        Self {
            user_auth_enabled: cfg.user_auth_enabled,
            forward_auth_middlewares: cfg.forward_auth_middlewares.clone(),
        }
    }
}

/// What happened to one backend's routes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendAssembly {
    pub service: String,
    pub credential_middleware: Option<String>,
    pub accepted: Vec<String>,
    /// accepted routes taken over from another backend
    pub replaced: Vec<String>,
    pub rejected: Vec<String>,
}

/// Builds one snapshot; create a new assembler per cycle.
#[derive(Debug, Default)]
pub struct ConfigAssembler {
    policy: AssemblyPolicy,
    ownership: RouteOwnership,
    config: RoutingConfiguration,
}

impl ConfigAssembler {
    pub fn new(policy: AssemblyPolicy) -> Self {
        Self { policy, ownership: RouteOwnership::new(), config: RoutingConfiguration::default() }
    }

    /// Add one backend: its service, its credential middleware (only for a
    /// non-empty token) and every route it wins ownership of.
    pub fn add_backend(
        &mut self,
        descriptor: &BackendDescriptor,
        parsed: ParsedRoutes,
        credential: Option<&str>,
    ) -> BackendAssembly {
        let service = primary_service_name(&descriptor.name, &parsed.routes);

        let auth_middleware = credential
            .filter(|token| !token.is_empty())
            .map(|token| {
                let name = format!("{}{}", service, CREDENTIAL_MIDDLEWARE_SUFFIX);
                self.config.middlewares.insert(name.clone(), credential_middleware(token));
                name
            });
        if auth_middleware.is_none() {
            debug!(backend = %descriptor.name, "no identity token, credential middleware omitted");
        }

        let mut assembly = BackendAssembly {
            service: service.clone(),
            credential_middleware: auth_middleware.clone(),
            ..Default::default()
        };

        for mut route in parsed.routes {
            self.bind_service(&mut route, &service);
            self.decorate(&mut route, auth_middleware.as_deref());

            let route_name = route.name.clone();
            match self.ownership.claim(&route_name, &descriptor.name) {
                ClaimDecision::Rejected { owner } => {
                    info!(route = %route_name, backend = %descriptor.name, owner = %owner, "route kept by dedicated backend");
                    assembly.rejected.push(route_name);
                    continue;
                }
                ClaimDecision::Replaced { previous } => {
                    info!(route = %route_name, backend = %descriptor.name, previous = %previous, "route ownership transferred");
                    assembly.replaced.push(route_name.clone());
                }
                ClaimDecision::Claimed => {}
            }

            info!(
                route = %route_name,
                rule = route.rule.as_deref().unwrap_or_default(),
                service = %service,
                middlewares = ?route.middlewares,
                "router configured"
            );
            self.config.routers.insert(route_name.clone(), into_router(route, &service));
            assembly.accepted.push(route_name);
        }

        self.config.backends.insert(
            service,
            Backend { target_urls: vec![descriptor.url.clone()], pass_host_header: false },
        );
        assembly
    }

    pub fn ownership(&self) -> &RouteOwnership {
        &self.ownership
    }

    /// Global synthesis: admin routes and, with user auth on, forward-auth
    /// middlewares pointing at the identity backend.
    pub fn finish(mut self, identity_url: Option<&str>) -> RoutingConfiguration {
        for (name, rule) in [
            ("traefik-api", "PathPrefix(`/api/http`) || PathPrefix(`/api/rawdata`) || PathPrefix(`/api/overview`) || Path(`/api/version`)"),
            ("traefik-dashboard", "PathPrefix(`/dashboard`)"),
        ] {
            self.config.routers.insert(
                name.to_owned(),
                Router {
                    match_expression: rule.to_owned(),
                    backend_name: INTERNAL_API_SERVICE.to_owned(),
                    priority: ADMIN_ROUTE_PRIORITY,
                    entry_points: default_entry_points(),
                    middleware_refs: Vec::new(),
                },
            );
        }

        match (self.policy.user_auth_enabled, identity_url.filter(|url| !url.is_empty())) {
            (true, Some(url)) => {
                info!(identity_url = %url, "user auth enabled, generating forward-auth middlewares");
                for name in &self.policy.forward_auth_middlewares {
                    self.config.middlewares.insert(name.clone(), forward_auth_middleware(url));
                }
            }
            (true, None) => warn!("user auth enabled but no identity backend found, forward-auth middlewares not generated"),
            (false, _) => debug!("user auth disabled, skipping forward-auth middlewares"),
        }

        self.config
    }

    fn bind_service(&self, route: &mut RouteDefinition, service: &str) {
        match route.service.as_deref() {
            None => route.service = Some(service.to_owned()),
            Some(explicit) if explicit != service && !explicit.contains('@') => {
                warn!(route = %route.name, service = %explicit, backend_service = %service, "route targets an unknown service, retargeting");
                route.service = Some(service.to_owned());
            }
            Some(_) => {}
        }
    }

    /// auth-check filter, strip-prefix, credential first, cold-start retry last.
    fn decorate(&self, route: &mut RouteDefinition, credential_middleware: Option<&str>) {
        if !self.policy.user_auth_enabled {
            let name = route.name.clone();
            route.middlewares.retain(|middleware| {
                let keep = !middleware.contains(AUTH_CHECK_MARKER);
                if !keep {
                    debug!(route = %name, middleware = %middleware, "user auth disabled, dropping auth-check middleware");
                }
                keep
            });
        }

        if let Some(strip) = strip_prefix_middleware(&route.name) {
            let has_strip = route
                .middlewares
                .iter()
                .any(|middleware| middleware.contains("strip-") && middleware.contains("-prefix"));
            if !has_strip {
                route.push_middleware(strip);
            }
        }

        if let Some(credential) = credential_middleware {
            let file_ref = format!("{}{}", credential, FILE_PROVIDER_REF);
            if !route.has_middleware(&file_ref) {
                route.prepend_middleware(credential);
            }
        }

        route.push_middleware(RETRY_MIDDLEWARE);
    }
}

/// First explicit local `service` label among the routes, else the backend name.
fn primary_service_name(backend: &str, routes: &[RouteDefinition]) -> String {
    routes
        .iter()
        .filter_map(|route| route.service.as_deref())
        .find(|service| !service.contains('@'))
        .unwrap_or(backend)
        .to_owned()
}

fn into_router(route: RouteDefinition, service: &str) -> Router {
    Router {
        match_expression: route.rule.unwrap_or_default(),
        backend_name: route.service.unwrap_or_else(|| service.to_owned()),
        priority: route.priority,
        entry_points: route.entry_points,
        middleware_refs: route.middlewares,
    }
}

/// Separate header so an end-user `Authorization` header passes through untouched.
pub fn credential_middleware(token: &str) -> Middleware {
    let mut headers = BTreeMap::new();
    headers.insert(CREDENTIAL_HEADER.to_owned(), format!("Bearer {}", token));
    Middleware::Headers(HeadersMiddleware { custom_request_headers: headers })
}

pub fn forward_auth_middleware(identity_url: &str) -> Middleware {
    Middleware::ForwardAuth(ForwardAuthMiddleware {
        address: format!("{}{}", identity_url.trim_end_matches('/'), FORWARD_AUTH_PATH),
        trust_forward_header: true,
        response_headers_to_copy: ["X-User-Id", "X-User-Email", "X-Authorization"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
        request_headers_to_forward: ["Authorization", "Cookie", "X-Forwarded-For", "X-Forwarded-Host"]
            .iter()
            .map(|h| h.to_string())
            .collect(),
    })
}
