//! Integration tests for backend dispatch.
//!
//! These tests verify strategy ordering, selection bounds and connection
//! bookkeeping of the load balancer.

mod common;

use ares_dispatch::dispatch::{LoadBalancer, LoadBalancingConfig, SelectionStrategy};

fn balancer(strategy: SelectionStrategy) -> LoadBalancer {
    common::init_tracing();
    LoadBalancer::new(LoadBalancingConfig::default().with_strategy(strategy))
}

#[cfg(test)]
mod selection_bounds_tests {
    use super::*;
    use ares_dispatch::types::DispatchRequest;
    use rstest::rstest;
    use std::collections::HashSet;

    #[rstest]
    fn test_selection_is_bounded_and_unique(
        #[values(
            SelectionStrategy::RoundRobin,
            SelectionStrategy::Weighted,
            SelectionStrategy::LeastConnections,
            SelectionStrategy::HealthBased
        )]
        strategy: SelectionStrategy,
        #[values(0, 1, 3, 5, 8)] max_sources: usize,
    ) {
        let balancer = balancer(strategy);
        let roster = common::research_roster();
        let request = DispatchRequest::new().with_max_sources(max_sources);

        for _ in 0..4 {
            let selected = balancer.select_backends(&roster, &request);
            assert_eq!(selected.len(), max_sources.min(roster.len()));

            let unique: HashSet<_> = selected.iter().map(|b| b.name.as_str()).collect();
            assert_eq!(unique.len(), selected.len());
        }
    }

    #[rstest]
    #[case(SelectionStrategy::RoundRobin)]
    #[case(SelectionStrategy::Weighted)]
    #[case(SelectionStrategy::LeastConnections)]
    #[case(SelectionStrategy::HealthBased)]
    fn test_empty_roster_yields_empty_selection(#[case] strategy: SelectionStrategy) {
        let balancer = balancer(strategy);
        let selected = balancer.select_backends(&[], &DispatchRequest::new());
        assert!(selected.is_empty());
    }

    #[test]
    fn test_default_max_sources_is_three() {
        let balancer = balancer(SelectionStrategy::Weighted);
        let selected = balancer.select_backends(&common::research_roster(), &DispatchRequest::new());
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_requested_sources_take_precedence() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let request = DispatchRequest::new()
            .with_sources(["hackernews", "not-configured"])
            .with_max_sources(3);

        let selected = balancer.select_backends(&common::research_roster(), &request);
        assert_eq!(common::names(&selected), vec!["hackernews"]);
    }

    #[test]
    fn test_requested_sources_ranked_by_strategy() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let request = DispatchRequest::new().with_sources(["github", "duckduckgo", "arxiv"]);

        let selected = balancer.select_backends(&common::research_roster(), &request);
        assert_eq!(common::names(&selected), vec!["arxiv", "duckduckgo", "github"]);
    }

    #[test]
    fn test_unavailable_requested_sources_fall_back_to_roster() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let request = DispatchRequest::new()
            .with_sources(["bing", "scholar"])
            .with_max_sources(2);

        let selected = balancer.select_backends(&common::research_roster(), &request);
        assert_eq!(common::names(&selected), vec!["wikipedia", "arxiv"]);
    }
}

#[cfg(test)]
mod strategy_tests {
    use super::*;
    use ares_dispatch::dispatch::WeightingPolicy;
    use ares_dispatch::types::{BackendDescriptor, DispatchRequest};
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn test_round_robin_distribution_within_one() {
        let balancer = balancer(SelectionStrategy::RoundRobin);
        let roster = common::uniform_roster(&["a", "b", "c", "d", "e"]);
        let request = DispatchRequest::new().with_max_sources(2);

        let (k, m, n) = (7usize, 2usize, roster.len());
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..k {
            for backend in balancer.select_backends(&roster, &request) {
                *counts.entry(backend.name).or_default() += 1;
            }
        }

        let floor = k * m / n;
        let ceil = (k * m + n - 1) / n;
        for backend in &roster {
            let count = counts.get(&backend.name).copied().unwrap_or(0);
            assert!(
                count == floor || count == ceil,
                "{} selected {} times, expected {} or {}",
                backend.name,
                count,
                floor,
                ceil
            );
        }
    }

    #[test]
    fn test_least_connections_scenario() {
        let balancer = balancer(SelectionStrategy::LeastConnections);
        let roster = common::uniform_roster(&["A", "B", "C"]);
        for _ in 0..3 {
            balancer.record_connection("A");
        }
        balancer.record_connection("C");

        let selected =
            balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(2));
        assert_eq!(common::names(&selected), vec!["B", "C"]);
    }

    #[test]
    fn test_least_connections_ties_keep_roster_order() {
        let balancer = balancer(SelectionStrategy::LeastConnections);
        let roster = common::uniform_roster(&["x", "y", "z"]);
        balancer.record_connection("x");

        let selected =
            balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(3));
        assert_eq!(common::names(&selected), vec!["y", "z", "x"]);
    }

    #[test]
    fn test_weighted_prefers_higher_priority() {
        let balancer = balancer(SelectionStrategy::Weighted);
        let selected = balancer.select_backends(
            &common::research_roster(),
            &DispatchRequest::new().with_max_sources(2),
        );
        assert_eq!(common::names(&selected), vec!["arxiv", "wikipedia"]);
    }

    #[test]
    fn test_weighted_idle_backend_ranks_above_loaded_peer() {
        let balancer = balancer(SelectionStrategy::Weighted);
        let roster = vec![
            BackendDescriptor::new("busy", 4),
            BackendDescriptor::new("idle", 4),
        ];
        for _ in 0..11 {
            balancer.record_connection("busy");
        }

        let selected =
            balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(2));
        assert_eq!(common::names(&selected), vec!["idle", "busy"]);
    }

    #[test]
    fn test_weighted_recency_bonus_returns_after_window() {
        common::init_tracing();
        let balancer = LoadBalancer::new(
            LoadBalancingConfig::default()
                .with_strategy(SelectionStrategy::Weighted)
                .with_weighting(
                    WeightingPolicy::default().with_recency_window(Duration::from_millis(20)),
                ),
        );
        let roster = vec![
            BackendDescriptor::new("steady", 10),
            BackendDescriptor::new("preferred", 11),
        ];
        let request = DispatchRequest::new().with_max_sources(1);

        assert_eq!(common::names(&balancer.select_backends(&roster, &request)), vec!["preferred"]);

        // 11 * 1.0 < 10 * 1.2 while the recent use is inside the window
        balancer.record_connection("preferred");
        balancer.release_connection("preferred");
        assert_eq!(common::names(&balancer.select_backends(&roster, &request)), vec!["steady"]);

        std::thread::sleep(Duration::from_millis(40));
        assert_eq!(common::names(&balancer.select_backends(&roster, &request)), vec!["preferred"]);
    }

    #[test]
    fn test_health_based_ordering() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let selected = balancer.select_backends(
            &common::research_roster(),
            &DispatchRequest::new().with_max_sources(5),
        );
        assert_eq!(
            common::names(&selected),
            vec!["wikipedia", "arxiv", "duckduckgo", "hackernews", "github"]
        );
    }
}

#[cfg(test)]
mod fallback_tests {
    use super::*;
    use ares_dispatch::types::{BackendDescriptor, DispatchRequest};

    #[test]
    fn test_fallback_excludes_failed_backend() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let roster = common::research_roster();
        balancer.select_backends(&roster, &DispatchRequest::new());

        let failed = roster.iter().find(|b| b.name == "wikipedia").unwrap();
        let fallback = balancer.fallback_backend(failed).unwrap();
        assert_eq!(fallback.name, "arxiv");
    }

    #[test]
    fn test_round_robin_fallback_is_next_in_rotation() {
        let balancer = balancer(SelectionStrategy::RoundRobin);
        let roster = common::uniform_roster(&["a", "b", "c", "d"]);

        let round = balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(2));
        assert_eq!(common::names(&round), vec!["a", "b"]);

        let fallback = balancer.fallback_backend(&round[0]).unwrap();
        assert!(!common::names(&round).contains(&fallback.name.as_str()));

        let next = balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(1));
        assert_eq!(fallback.name, next[0].name);
        assert_eq!(fallback.name, "c");
    }

    #[test]
    fn test_round_robin_fallback_skips_tripped_backend() {
        let balancer = LoadBalancer::new(
            LoadBalancingConfig::default()
                .with_strategy(SelectionStrategy::RoundRobin)
                .with_failover_threshold(1),
        );
        let roster = common::uniform_roster(&["a", "b", "c", "d"]);
        let round = balancer.select_backends(&roster, &DispatchRequest::new().with_max_sources(2));

        balancer.record_failure("c");
        assert_eq!(balancer.fallback_backend(&round[0]).unwrap().name, "d");
    }

    #[test]
    fn test_fallback_none_without_alternative() {
        let balancer = balancer(SelectionStrategy::Weighted);
        let only = vec![BackendDescriptor::new("solo", 1)];
        balancer.select_backends(&only, &DispatchRequest::new());

        assert!(balancer.fallback_backend(&only[0]).is_none());
    }

    #[test]
    fn test_fallback_none_before_any_roster() {
        let balancer = balancer(SelectionStrategy::Weighted);
        assert!(balancer
            .fallback_backend(&BackendDescriptor::new("web", 1))
            .is_none());
    }

    #[test]
    fn test_fallback_skips_backends_past_failover_threshold() {
        common::init_tracing();
        let balancer = LoadBalancer::new(
            LoadBalancingConfig::default()
                .with_strategy(SelectionStrategy::HealthBased)
                .with_failover_threshold(2),
        );
        let roster = common::research_roster();
        balancer.refresh_roster(roster.clone());

        balancer.record_failure("arxiv");
        balancer.record_failure("arxiv");

        let failed = roster.iter().find(|b| b.name == "wikipedia").unwrap();
        assert_eq!(balancer.fallback_backend(failed).unwrap().name, "duckduckgo");

        balancer.record_success("arxiv");
        assert_eq!(balancer.fallback_backend(failed).unwrap().name, "arxiv");
    }

    #[test]
    fn test_refreshed_reliability_changes_fallback() {
        let balancer = balancer(SelectionStrategy::HealthBased);
        let mut roster = common::research_roster();
        balancer.refresh_roster(roster.clone());

        let failed = roster[4].clone();
        assert_eq!(balancer.fallback_backend(&failed).unwrap().name, "arxiv");

        // Health monitor downgrades arxiv between rounds
        roster[1].reliability = Some(0.1);
        balancer.refresh_roster(roster);
        assert_eq!(balancer.fallback_backend(&failed).unwrap().name, "duckduckgo");
    }
}

#[cfg(test)]
mod connection_tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_release_at_zero_is_noop() {
        let balancer = balancer(SelectionStrategy::LeastConnections);
        balancer.release_connection("never-used");
        assert_eq!(balancer.open_connections("never-used"), 0);

        balancer.record_connection("web");
        balancer.release_connection("web");
        balancer.release_connection("web");
        assert_eq!(balancer.open_connections("web"), 0);
        assert_eq!(balancer.stats().connection_counts.get("web"), Some(&0));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record_and_release() {
        let balancer = Arc::new(balancer(SelectionStrategy::LeastConnections));
        let mut set = tokio::task::JoinSet::new();

        for i in 0..64 {
            let balancer = Arc::clone(&balancer);
            set.spawn(async move {
                let name = if i % 2 == 0 { "arxiv" } else { "github" };
                balancer.record_connection(name);
                tokio::task::yield_now().await;
                balancer.release_connection(name);
            });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap();
        }

        assert_eq!(balancer.open_connections("arxiv"), 0);
        assert_eq!(balancer.open_connections("github"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_records_are_not_lost() {
        let balancer = Arc::new(balancer(SelectionStrategy::LeastConnections));
        let mut set = tokio::task::JoinSet::new();

        for _ in 0..100 {
            let balancer = Arc::clone(&balancer);
            set.spawn(async move { balancer.record_connection("web") });
        }
        while let Some(res) = set.join_next().await {
            res.unwrap();
        }

        assert_eq!(balancer.open_connections("web"), 100);
        assert_eq!(balancer.stats().total_open(), 100);
    }
}
