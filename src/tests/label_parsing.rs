#[cfg(test)]
mod tests {
    use crate::errors::ReconcileError;
    use crate::parser::labels::{split_entry_points, split_middlewares, LabelParser};
    use crate::parser::tables::strip_prefix_middleware;
    use crate::tests::common::labels;

    #[test]
    fn single_route_gets_defaults() {
        let parser = LabelParser::new("routing");
        let metadata = labels(&[
            ("routing_enable", "true"),
            ("routing_http_routers_widget_rule", "Host(`a.example.com`)"),
        ]);

        assert!(parser.is_enabled(&metadata));
        let parsed = parser.parse("widget-svc", &metadata).unwrap();

        assert_eq!(parsed.routes.len(), 1);
        let route = &parsed.routes[0];
        assert_eq!(route.name, "widget");
        assert_eq!(route.rule.as_deref(), Some("Host(`a.example.com`)"));
        assert_eq!(route.priority, 200);
        assert_eq!(route.entry_points, vec!["web".to_string()]);
        assert!(route.middlewares.is_empty());
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn metadata_without_router_keys_has_no_routes() {
        let parser = LabelParser::new("traefik");
        let metadata = labels(&[("traefik_enable", "true"), ("team", "labs"), ("routing_http_routers_x_rule", "Path(`/x`)")]);

        let err = parser.parse("plain-svc", &metadata).unwrap_err();
        assert_eq!(err, ReconcileError::NoRoutesDefined { backend: "plain-svc".to_string() });
    }

    #[test]
    fn rule_ids_and_priorities_come_from_tables() {
        let parser = LabelParser::new("traefik");
        let metadata = labels(&[
            ("traefik_http_routers_lab1-static_rule_id", "lab1-static"),
            ("traefik_http_routers_home-index-root_rule", "home-index-root"),
            ("traefik_http_routers_lab1-c2_priority", "300"),
        ]);

        let parsed = parser.parse("lab1", &metadata).unwrap();
        let names: Vec<&str> = parsed.routes.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["home-index-root", "lab1-static"]);

        assert_eq!(parsed.routes[0].rule.as_deref(), Some("PathPrefix(`/`)"));
        assert_eq!(parsed.routes[0].priority, 1);
        assert!(parsed.routes[1].rule.as_deref().unwrap().starts_with("PathPrefix(`/lab1/css/`)"));
        assert_eq!(parsed.routes[1].priority, 250);

        // a route without any rule is dropped with a warning
        assert!(parsed.warnings.iter().any(|w| w.route == "lab1-c2" && w.message.contains("dropped")));
    }

    #[test]
    fn unknown_rule_id_is_used_verbatim() {
        let parser = LabelParser::new("traefik");
        let metadata = labels(&[("traefik_http_routers_orders_rule_id", "PathPrefix(`/orders`)")]);

        let parsed = parser.parse("orders-svc", &metadata).unwrap();

        assert_eq!(parsed.routes.len(), 1);
        assert_eq!(parsed.routes[0].name, "orders");
        assert_eq!(parsed.routes[0].rule.as_deref(), Some("PathPrefix(`/orders`)"));
        assert!(parsed.warnings.is_empty());
    }

    #[test]
    fn properties_override_defaults_and_bad_values_warn() {
        let parser = LabelParser::new("traefik");
        let metadata = labels(&[
            ("traefik_http_routers_api_rule", "PathPrefix(`/api`)"),
            ("traefik_http_routers_api_priority", "high"),
            ("traefik_http_routers_api_entrypoints", " , "),
            ("traefik_http_routers_api_colour", "blue"),
            ("traefik_http_routers_admin_rule", "PathPrefix(`/admin`)"),
            ("traefik_http_routers_admin_priority", "700"),
            ("traefik_http_routers_admin_entrypoints", "web, websecure,"),
            ("traefik_http_routers_admin_service", "admin-svc"),
        ]);

        let parsed = parser.parse("api-svc", &metadata).unwrap();
        let admin = &parsed.routes[0];
        let api = &parsed.routes[1];

        assert_eq!(admin.priority, 700);
        assert_eq!(admin.entry_points, vec!["web".to_string(), "websecure".to_string()]);
        assert_eq!(admin.service.as_deref(), Some("admin-svc"));

        assert_eq!(api.priority, 200);
        assert_eq!(api.entry_points, vec!["web".to_string()]);

        let messages: Vec<&str> = parsed.warnings.iter().map(|w| w.message.as_str()).collect();
        assert!(messages.iter().any(|m| m.contains("invalid priority")));
        assert!(messages.iter().any(|m| m.contains("empty entrypoints")));
        assert!(messages.iter().any(|m| m.contains("unknown property 'colour'")));
        assert!(messages.iter().any(|m| m.contains("empty entries dropped")));
    }

    #[test]
    fn entry_points_are_never_empty() {
        let parser = LabelParser::new("traefik");
        for value in ["", ",", " ", "web", "a,,b"] {
            let metadata = labels(&[
                ("traefik_http_routers_r_rule", "Path(`/r`)"),
                ("traefik_http_routers_r_entrypoints", value),
            ]);
            let parsed = parser.parse("r-svc", &metadata).unwrap();
            assert!(!parsed.routes[0].entry_points.is_empty(), "value {:?}", value);
        }
    }

    #[test]
    fn middleware_lists_split_on_first_separator() {
        assert_eq!(split_middlewares("a__b__c"), vec!["a", "b", "c"]);
        assert_eq!(split_middlewares("x-file"), vec!["x@file"]);
        assert_eq!(split_middlewares("a;b,c"), vec!["a", "b,c"]);
        assert_eq!(split_middlewares(" a , b ,a,, "), vec!["a", "b"]);
        assert_eq!(split_middlewares("cors-file__lab1-auth-check"), vec!["cors@file", "lab1-auth-check"]);
        assert!(split_middlewares("").is_empty());
    }

    #[test]
    fn middleware_labels_accumulate_without_duplicates() {
        let parser = LabelParser::new("traefik");
        let metadata = labels(&[
            ("traefik_http_routers_r_rule", "Path(`/r`)"),
            ("traefik_http_routers_r_middlewares", "gzip__cors-file__gzip"),
        ]);
        let parsed = parser.parse("r-svc", &metadata).unwrap();
        assert_eq!(parsed.routes[0].middlewares, vec!["gzip", "cors@file"]);
    }

    #[test]
    fn entry_point_split_reports_dropped_entries() {
        assert_eq!(split_entry_points("web"), (vec!["web".to_string()], false));
        assert_eq!(split_entry_points("web,,secure"), (vec!["web".to_string(), "secure".to_string()], true));
        assert_eq!(split_entry_points(""), (Vec::<String>::new(), true));
    }

    #[test]
    fn strip_prefix_lookup() {
        assert_eq!(strip_prefix_middleware("lab2"), Some("strip-lab2-prefix@file"));
        assert_eq!(strip_prefix_middleware("lab1-c2"), Some("strip-lab1-c2-prefix@file"));
        assert_eq!(strip_prefix_middleware("lab2-docs"), Some("strip-lab2-prefix@file"));
        assert_eq!(strip_prefix_middleware("lab2-c2-admin"), None);
        assert_eq!(strip_prefix_middleware("home-index"), None);
    }
}
