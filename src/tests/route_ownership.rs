#[cfg(test)]
mod tests {
    use crate::routing::ownership::{is_dedicated, normalize_backend_name, ClaimDecision, RouteOwnership};

    #[test]
    fn dedicated_backend_wins_in_either_order() {
        for order in [["catalog-svc", "widget-detail-stg"], ["widget-detail-stg", "catalog-svc"]] {
            let mut ownership = RouteOwnership::new();
            for backend in order {
                ownership.claim("widget-detail", backend);
            }
            assert_eq!(ownership.owner("widget-detail"), Some("widget-detail-stg"), "order {:?}", order);
        }
    }

    #[test]
    fn claim_decisions() {
        let mut ownership = RouteOwnership::new();

        assert_eq!(ownership.claim("lab1", "labs-generic"), ClaimDecision::Claimed);
        assert_eq!(
            ownership.claim("lab1", "lab1-stg"),
            ClaimDecision::Replaced { previous: "labs-generic".to_string() }
        );
        let rejected = ownership.claim("lab1", "labs-other");
        assert_eq!(rejected, ClaimDecision::Rejected { owner: "lab1-stg".to_string() });
        assert!(!rejected.is_accepted());
        assert_eq!(ownership.owner("lab1"), Some("lab1-stg"));
    }

    #[test]
    fn equally_specific_claimants_last_one_wins() {
        let mut ownership = RouteOwnership::new();
        ownership.claim("shared", "alpha");
        ownership.claim("shared", "beta");
        assert_eq!(ownership.owner("shared"), Some("beta"));

        ownership.claim("lab2", "lab2-stg");
        assert!(ownership.claim("lab2", "lab2-prd").is_accepted());
        assert_eq!(ownership.owner("lab2"), Some("lab2-prd"));
    }

    #[test]
    fn normalization_strips_environment_suffixes() {
        assert_eq!(normalize_backend_name("lab1-c2-stg"), "lab1-c2");
        assert_eq!(normalize_backend_name("home-index-production"), "home-index");
        assert_eq!(normalize_backend_name("home-index"), "home-index");
        assert!(is_dedicated("lab1c2", "lab1-c2-dev"));
        assert!(is_dedicated("lab1-c2", "lab1c2-staging"));
        assert!(!is_dedicated("lab1", "lab1-c2-stg"));
    }
}
