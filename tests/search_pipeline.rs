//! End-to-end search over scripted registries

mod common;

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use serde_json::json;

use cnpj_process_search::aggregator::Aggregator;
use cnpj_process_search::catalog::{AuthTier, Catalog, Category};
use cnpj_process_search::dispatcher::DEADLINE_EXCEEDED;
use cnpj_process_search::error::{SearchError, TransportError};
use cnpj_process_search::SearchRequest;

use common::*;

#[tokio::test]
async fn test_two_registry_summary() {
    let catalog = Catalog::new(vec![
        endpoint("a", Category::Civil, AuthTier::Anonymous),
        endpoint("b", Category::Labor, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(
                "a",
                Reply::Body(hits(vec![
                    process("0001", "2020-01-01", "Cobrança", "Sentença"),
                    process("0002", "2021-06-15", "Dano Moral", "Sentença"),
                ])),
            )
            .reply("b", Reply::Body(hits(vec![]))),
    );
    let orchestrator = orchestrator(
        catalog,
        transport.clone(),
        Arc::new(ScriptedProvider::accepting()),
        &fast_config(),
    );

    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();
    let report = &outcome.report;

    assert_eq!(outcome.merged.cnpj, "08.049.394/0001-84");
    assert_eq!(outcome.merged.endpoints_attempted, 2);
    assert_eq!(outcome.merged.endpoints_succeeded, 2);
    assert_eq!(outcome.merged.total_items, 2);
    assert_eq!(outcome.merged.coverage, "60-70%");

    assert_eq!(report.total_items, 2);
    assert_eq!(report.endpoints_with_items, 1);
    assert_eq!(report.date_range.earliest, NaiveDate::from_ymd_opt(2020, 1, 1));
    assert_eq!(report.date_range.latest, NaiveDate::from_ymd_opt(2021, 6, 15));

    let civil = report.category(Category::Civil).unwrap();
    assert_eq!(civil.count, 2);
    assert_eq!(civil.endpoints.len(), 1);
    assert_eq!(civil.endpoints[0].endpoint_id, "a");
    assert_eq!(civil.endpoints[0].count, 2);

    let labor = report.category(Category::Labor).unwrap();
    assert_eq!(labor.count, 0);
    assert!(labor.endpoints.is_empty());

    assert_eq!(report.status_histogram.len(), 1);
    assert_eq!(report.status_histogram[0].label, "Sentença");
    assert_eq!(report.status_histogram[0].count, 2);
    assert_eq!(report.items[0].process_number, "0001");
    assert_eq!(report.items[0].registry, "A");
}

#[tokio::test]
async fn test_failing_endpoint_does_not_affect_batch_peers() {
    let catalog = Catalog::new(vec![
        endpoint("x", Category::Civil, AuthTier::Anonymous),
        endpoint("y", Category::Civil, AuthTier::Anonymous),
        endpoint("z", Category::Federal, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(
                "x",
                Reply::Fail(TransportError::Status {
                    status: 503,
                    body: "unavailable".to_string(),
                }),
            )
            .reply("y", Reply::Body(hits(vec![process("1", "2019-03-01", "Tributário", "Baixa")])))
            .reply("z", Reply::Body(hits(vec![process("2", "2018-07-20", "Tributário", "Baixa")]))),
    );
    let orchestrator = orchestrator(
        catalog,
        transport,
        Arc::new(ScriptedProvider::accepting()),
        &fast_config(),
    );

    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();

    assert_eq!(outcome.merged.endpoints_attempted, 3);
    assert_eq!(outcome.merged.endpoints_succeeded, 2);
    assert!(outcome.merged.is_partial());
    assert_eq!(outcome.merged.errors.len(), 1);
    assert_eq!(outcome.merged.errors[0].endpoint_id, "x");
    assert_eq!(outcome.merged.errors[0].message, "HTTP status 503: unavailable");

    let x = outcome.merged.result("x").unwrap();
    assert_eq!(x.total, 0);
    assert!(x.items.is_empty());
    assert_eq!(outcome.merged.result("y").unwrap().total, 1);
    assert_eq!(outcome.merged.result("z").unwrap().total, 1);

    assert_eq!(outcome.report.total_items, 2);
    assert_eq!(outcome.report.errors.len(), 1);
    assert!(outcome.report.by_endpoint.iter().all(|e| e.endpoint_id != "x"));
}

#[tokio::test(start_paused = true)]
async fn test_timed_out_endpoint_does_not_affect_batch_peers() {
    let catalog = Catalog::new(vec![
        endpoint("x", Category::Civil, AuthTier::Anonymous),
        endpoint("y", Category::Civil, AuthTier::Anonymous),
        endpoint("z", Category::Labor, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply("x", Reply::Hang)
            .reply("y", Reply::Body(hits(vec![process("1", "2019-03-01", "Cobrança", "Baixa")])))
            .reply(
                "z",
                Reply::Delayed(
                    Duration::from_millis(500),
                    hits(vec![process("2", "2018-07-20", "Rescisão", "Baixa")]),
                ),
            ),
    );
    let config = fast_config().with_request_timeout(Duration::from_secs(2));
    let orchestrator = orchestrator(
        catalog,
        transport,
        Arc::new(ScriptedProvider::accepting()),
        &config,
    );

    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();
    let merged = &outcome.merged;

    assert_eq!(merged.endpoints_attempted, 3);
    assert_eq!(merged.endpoints_succeeded, 2);
    assert_eq!(merged.errors.len(), 1);
    assert_eq!(merged.errors[0].endpoint_id, "x");
    assert_eq!(merged.errors[0].message, "Request timed out after 2000ms");
    assert_eq!(merged.result("x").unwrap().total, 0);
    assert_eq!(merged.result("y").unwrap().total, 1);
    assert_eq!(merged.result("z").unwrap().total, 1);
    assert_eq!(outcome.report.total_items, 2);
}

#[tokio::test(start_paused = true)]
async fn test_result_order_ignores_completion_order() {
    let catalog = Catalog::new(vec![
        endpoint("slow", Category::Civil, AuthTier::Anonymous),
        endpoint("fast", Category::Civil, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(
                "slow",
                Reply::Delayed(Duration::from_secs(3), hits(vec![process("s", "2020-01-01", "A", "B")])),
            )
            .reply("fast", Reply::Body(hits(vec![process("f", "2020-01-02", "A", "B")]))),
    );
    let orchestrator = orchestrator(
        catalog,
        transport,
        Arc::new(ScriptedProvider::accepting()),
        &fast_config(),
    );

    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();

    let ids: Vec<&str> = outcome
        .merged
        .results
        .iter()
        .map(|r| r.endpoint_id.as_str())
        .collect();
    assert_eq!(ids, vec!["slow", "fast"]);
    assert_eq!(outcome.report.items[0].process_number, "s");
}

#[tokio::test(start_paused = true)]
async fn test_deadline_abandons_unsettled_endpoints() {
    let catalog = Catalog::new(vec![
        endpoint("stuck", Category::Civil, AuthTier::Anonymous),
        endpoint("quick", Category::Civil, AuthTier::Anonymous),
        endpoint("late", Category::Civil, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(ScriptedTransport::new().reply("stuck", Reply::Hang));
    let config = fast_config()
        .with_batch_size(2)
        .with_pacing_delay(Duration::from_secs(1))
        .with_search_deadline(Duration::from_secs(5));
    let orchestrator = orchestrator(
        catalog,
        transport.clone(),
        Arc::new(ScriptedProvider::accepting()),
        &config,
    );

    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();

    assert_eq!(outcome.merged.endpoints_attempted, 3);
    assert_eq!(outcome.merged.endpoints_succeeded, 1);
    assert_eq!(
        outcome.merged.result("stuck").unwrap().error.as_deref(),
        Some(DEADLINE_EXCEEDED)
    );
    assert_eq!(
        outcome.merged.result("late").unwrap().error.as_deref(),
        Some(DEADLINE_EXCEEDED)
    );
    assert_eq!(transport.called_ids(), vec!["stuck", "quick"]);
}

#[tokio::test]
async fn test_invalid_identifier_precedes_any_request() {
    let transport = Arc::new(ScriptedTransport::new());
    let provider = Arc::new(ScriptedProvider::accepting());
    let orchestrator = orchestrator(
        Catalog::builtin(),
        transport.clone(),
        provider.clone(),
        &fast_config(),
    );

    for raw in ["", "123", "08.049.394/0001-85", "00000000000000"] {
        let err = orchestrator
            .run_search(SearchRequest::new(raw, AuthTier::Anonymous))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidIdentifier(_)), "{raw}");
    }
    assert!(transport.calls().is_empty());
    assert!(provider.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_category_and_empty_selection() {
    let catalog = Catalog::new(vec![endpoint("a", Category::Civil, AuthTier::Anonymous)]).unwrap();
    let transport = Arc::new(ScriptedTransport::new());
    let orchestrator = orchestrator(
        catalog,
        transport.clone(),
        Arc::new(ScriptedProvider::accepting()),
        &fast_config(),
    );

    let err = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous).with_category("tax"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::UnknownCategory(_)));

    let err = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous).with_category("Military"))
        .await
        .unwrap_err();
    assert!(matches!(err, SearchError::NoEndpoints(_)));
    assert!(transport.calls().is_empty());
}

#[tokio::test]
async fn test_report_is_idempotent() {
    let catalog = Catalog::new(vec![
        endpoint("a", Category::Civil, AuthTier::Anonymous),
        endpoint("b", Category::Federal, AuthTier::Anonymous),
    ])
    .unwrap();
    let transport = Arc::new(
        ScriptedTransport::new()
            .reply(
                "a",
                Reply::Body(hits(vec![
                    process("1", "2020-01-01", "Cobrança", "Sentença"),
                    json!({ "classe": { "nome": "Execução Fiscal" } }),
                ])),
            )
            .reply("b", Reply::Body(hits(vec![process("2", "20190105", "Cobrança", "Baixa")]))),
    );
    let orchestrator = orchestrator(
        catalog,
        transport,
        Arc::new(ScriptedProvider::accepting()),
        &fast_config(),
    );
    let outcome = orchestrator
        .run_search(SearchRequest::new(VALID_CNPJ, AuthTier::Anonymous))
        .await
        .unwrap();

    let aggregator = Aggregator::default();
    let first = serde_json::to_vec(&aggregator.aggregate(&outcome.merged)).unwrap();
    let second = serde_json::to_vec(&aggregator.aggregate(&outcome.merged)).unwrap();
    assert_eq!(first, second);

    let types: Vec<(&str, u64)> = outcome
        .report
        .type_histogram
        .iter()
        .map(|e| (e.label.as_str(), e.count))
        .collect();
    assert_eq!(types, vec![("Cobrança", 2), ("Execução Fiscal", 1)]);
    assert_eq!(outcome.report.date_range.earliest, NaiveDate::from_ymd_opt(2019, 1, 5));
}
