#[cfg(test)]
mod tests {
    use crate::parser::labels::LabelParser;
    use crate::routing::assembler::{AssemblyPolicy, ConfigAssembler};
    use crate::routing::types::{Middleware, RoutingConfiguration};
    use crate::tests::common::{backend, fake_jwt};

    fn policy(user_auth_enabled: bool) -> AssemblyPolicy {
        AssemblyPolicy { user_auth_enabled, ..AssemblyPolicy::default() }
    }

    fn add(assembler: &mut ConfigAssembler, name: &str, pairs: &[(&str, &str)], token: Option<&str>) {
        let descriptor = backend(name, pairs);
        let parsed = LabelParser::new("traefik").parse(name, &descriptor.labels).unwrap();
        assembler.add_backend(&descriptor, parsed, token);
    }

    fn assemble_one(policy: AssemblyPolicy, name: &str, pairs: &[(&str, &str)], token: Option<&str>) -> RoutingConfiguration {
        let mut assembler = ConfigAssembler::new(policy);
        add(&mut assembler, name, pairs, token);
        assembler.finish(None)
    }

    #[test]
    fn credential_failure_omits_middleware_but_keeps_route() {
        let config = assemble_one(
            policy(false),
            "orders-svc",
            &[("traefik_http_routers_orders_rule", "PathPrefix(`/orders`)")],
            None,
        );

        assert!(!config.middlewares.contains_key("orders-svc-auth"));
        let router = &config.routers["orders"];
        assert_eq!(router.backend_name, "orders-svc");
        assert_eq!(router.middleware_refs, vec!["retry-cold-start@file"]);
        assert!(config.backends.contains_key("orders-svc"));
    }

    #[test]
    fn empty_token_is_treated_as_missing() {
        let config = assemble_one(
            policy(false),
            "orders-svc",
            &[("traefik_http_routers_orders_rule", "PathPrefix(`/orders`)")],
            Some(""),
        );
        assert!(!config.middlewares.contains_key("orders-svc-auth"));
    }

    #[test]
    fn credential_middleware_runs_first_and_retry_last() {
        let token = fake_jwt("lab1");
        let config = assemble_one(
            policy(false),
            "lab1",
            &[
                ("traefik_http_routers_lab1_rule_id", "lab1"),
                ("traefik_http_routers_lab1_middlewares", "cors-file__lab1-auth-check"),
            ],
            Some(token.as_str()),
        );

        assert_eq!(
            config.routers["lab1"].middleware_refs,
            vec!["lab1-auth", "cors@file", "strip-lab1-prefix@file", "retry-cold-start@file"]
        );
        match &config.middlewares["lab1-auth"] {
            Middleware::Headers(headers) => {
                assert_eq!(headers.custom_request_headers.len(), 1);
                assert_eq!(
                    headers.custom_request_headers["X-Serverless-Authorization"],
                    format!("Bearer {}", token)
                );
            }
            other => panic!("unexpected middleware {:?}", other),
        }
    }

    #[test]
    fn existing_references_are_not_duplicated() {
        let config = assemble_one(
            policy(true),
            "lab2",
            &[
                ("traefik_http_routers_lab2_rule_id", "lab2"),
                (
                    "traefik_http_routers_lab2_middlewares",
                    "lab2-auth-file__strip-custom-prefix-file__lab2-auth-check__retry-cold-start-file",
                ),
            ],
            Some(fake_jwt("lab2").as_str()),
        );

        assert_eq!(
            config.routers["lab2"].middleware_refs,
            vec!["lab2-auth@file", "strip-custom-prefix@file", "lab2-auth-check", "retry-cold-start@file"]
        );
    }

    #[test]
    fn explicit_service_names_the_backend() {
        let config = assemble_one(
            policy(false),
            "lab3-stg",
            &[
                ("traefik_http_routers_lab3_rule_id", "lab3"),
                ("traefik_http_routers_lab3_service", "lab3"),
                ("traefik_http_routers_lab3-static_rule_id", "lab3-static"),
                ("traefik_http_routers_lab3-dash_rule", "PathPrefix(`/lab3/dash`)"),
                ("traefik_http_routers_lab3-dash_service", "api@internal"),
            ],
            Some(fake_jwt("lab3").as_str()),
        );

        assert!(config.backends.contains_key("lab3"));
        assert!(!config.backends.contains_key("lab3-stg"));
        assert!(config.middlewares.contains_key("lab3-auth"));
        assert_eq!(config.routers["lab3"].backend_name, "lab3");
        assert_eq!(config.routers["lab3-static"].backend_name, "lab3");
        assert_eq!(config.routers["lab3-dash"].backend_name, "api@internal");
    }

    #[test]
    fn every_router_targets_an_existing_backend() {
        let mut assembler = ConfigAssembler::new(policy(false));
        add(&mut assembler, "catalog-svc", &[("traefik_http_routers_widget-detail_rule", "PathPrefix(`/w`)")], None);
        add(&mut assembler, "widget-detail-stg", &[("traefik_http_routers_widget-detail_rule", "PathPrefix(`/w`)")], None);
        add(&mut assembler, "home-index", &[("traefik_http_routers_home-index_rule_id", "home-index-root")], None);
        let config = assembler.finish(None);

        assert_eq!(config.routers["widget-detail"].backend_name, "widget-detail-stg");
        for (name, router) in &config.routers {
            assert!(!router.entry_points.is_empty(), "{}", name);
            if !router.backend_name.contains('@') {
                assert!(config.backends.contains_key(&router.backend_name), "{}", name);
            }
        }
    }

    #[test]
    fn rejected_claim_keeps_dedicated_router() {
        let mut assembler = ConfigAssembler::new(policy(false));
        add(&mut assembler, "widget-detail-stg", &[("traefik_http_routers_widget-detail_rule", "PathPrefix(`/dedicated`)")], None);
        add(&mut assembler, "catalog-svc", &[("traefik_http_routers_widget-detail_rule", "PathPrefix(`/generic`)")], None);
        assert_eq!(assembler.ownership().owner("widget-detail"), Some("widget-detail-stg"));
        let config = assembler.finish(None);
        assert_eq!(config.routers["widget-detail"].match_expression, "PathPrefix(`/dedicated`)");
        assert_eq!(config.routers["widget-detail"].backend_name, "widget-detail-stg");
    }

    #[test]
    fn admin_routes_are_always_present() {
        let config = ConfigAssembler::new(policy(false)).finish(None);

        for name in ["traefik-api", "traefik-dashboard"] {
            let router = &config.routers[name];
            assert_eq!(router.priority, 1000);
            assert_eq!(router.backend_name, "api@internal");
            assert_eq!(router.entry_points, vec!["web"]);
        }
        assert_eq!(config.routers["traefik-dashboard"].match_expression, "PathPrefix(`/dashboard`)");
        assert!(config.middlewares.is_empty());
    }

    #[test]
    fn forward_auth_targets_identity_backend() {
        let config = ConfigAssembler::new(policy(true)).finish(Some("https://home-index.a.run.app/"));

        assert_eq!(config.middlewares.len(), 3);
        match &config.middlewares["lab2-auth-check"] {
            Middleware::ForwardAuth(auth) => {
                assert_eq!(auth.address, "https://home-index.a.run.app/api/auth/check");
                assert!(auth.trust_forward_header);
                assert_eq!(auth.response_headers_to_copy, vec!["X-User-Id", "X-User-Email", "X-Authorization"]);
                assert_eq!(
                    auth.request_headers_to_forward,
                    vec!["Authorization", "Cookie", "X-Forwarded-For", "X-Forwarded-Host"]
                );
            }
            other => panic!("unexpected middleware {:?}", other),
        }

        let without_identity = ConfigAssembler::new(policy(true)).finish(None);
        assert!(without_identity.middlewares.is_empty());

        let disabled = ConfigAssembler::new(policy(false)).finish(Some("https://home-index.a.run.app"));
        assert!(disabled.middlewares.is_empty());
    }

    #[test]
    fn yaml_document_matches_dynamic_configuration_shape() {
        let config = assemble_one(
            policy(false),
            "lab1",
            &[("traefik_http_routers_lab1_rule_id", "lab1")],
            Some(fake_jwt("lab1").as_str()),
        );
        let yaml = config.to_yaml().unwrap();
        let doc: serde_yaml::Value = serde_yaml::from_str(&yaml).unwrap();

        let http = &doc["http"];
        assert_eq!(http["routers"]["lab1"]["rule"].as_str(), Some("PathPrefix(`/lab1`)"));
        assert_eq!(http["routers"]["lab1"]["service"].as_str(), Some("lab1"));
        assert_eq!(http["routers"]["lab1"]["entryPoints"][0].as_str(), Some("web"));
        assert_eq!(http["routers"]["lab1"]["middlewares"][0].as_str(), Some("lab1-auth"));
        assert!(http["routers"]["traefik-api"]["middlewares"].is_null());
        assert_eq!(
            http["services"]["lab1"]["loadBalancer"]["servers"][0]["url"].as_str(),
            Some("https://lab1.a.run.app")
        );
        assert_eq!(http["services"]["lab1"]["loadBalancer"]["passHostHeader"].as_bool(), Some(false));
        assert!(http["middlewares"]["lab1-auth"]["headers"]["customRequestHeaders"]["X-Serverless-Authorization"]
            .as_str()
            .unwrap()
            .starts_with("Bearer eyJ"));
    }
}
