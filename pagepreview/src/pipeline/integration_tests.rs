//! End-to-end tests for the preview pipeline.

#[cfg(test)]
mod tests {
    use crate::config::{
        DomainFailurePolicy, FetchStrategy, MergeStrategy, PipelineConfig, PreviewConfig,
    };
    use crate::errors::{FetchError, PipelineError, SearchError};
    use crate::fetch::{HttpResponse, PageFetcher};
    use crate::pipeline::PreviewPipeline;
    use crate::search::ImageSearchClient;
    use crate::testing::{MockImageSearch, MockRenderer, MockTransport};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;

    const URL: &str = "https://www.example.com/products/42";

    const PRODUCT_PAGE: &str = r#"<html><head>
        <title>Example — Buy Now | Example Co</title>
        <meta property="og:site_name" content="Example Co">
        <meta name="description" content="Everything you need">
        <link rel="shortcut icon" href="/favicon.ico">
        </head><body></body></html>"#;

    fn direct_only() -> PipelineConfig {
        PipelineConfig::default().with_fetch_strategy(FetchStrategy::DirectOnly)
    }

    fn pipeline(
        transport: MockTransport,
        search: Arc<MockImageSearch>,
        config: PipelineConfig,
    ) -> PreviewPipeline {
        PreviewPipeline::new(
            PageFetcher::new(Arc::new(transport)),
            ImageSearchClient::new(search),
            config,
        )
    }

    #[tokio::test]
    async fn test_full_preview_interleaves_images() {
        let search = Arc::new(
            MockImageSearch::new()
                .with_results("Buy Now", &["p0", "p1", "p2"])
                .with_results("example", &["d0", "d1"]),
        );
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(200, PRODUCT_PAGE)),
            Arc::clone(&search),
            direct_only(),
        );

        let result = pipeline.run(URL).await;

        assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
        assert_eq!(result.image_search_string, "Buy Now");
        assert_eq!(result.image_urls, vec!["p0", "d0", "p1", "d1", "p2"]);

        let metadata = result.metadata.expect("metadata");
        assert_eq!(metadata.site_name.as_deref(), Some("Example Co"));
        assert_eq!(metadata.description.as_deref(), Some("Everything you need"));
        assert_eq!(
            metadata.favicon.as_deref(),
            Some("https://www.example.com/favicon.ico")
        );

        let mut queries = search.queries();
        queries.sort();
        assert_eq!(queries, vec!["Buy Now", "example"]);
    }

    #[tokio::test]
    async fn test_fixed_offset_merge() {
        let page: Vec<String> = (0..6).map(|i| format!("p{i}")).collect();
        let page_refs: Vec<&str> = page.iter().map(String::as_str).collect();
        let search = Arc::new(
            MockImageSearch::new()
                .with_results("Buy Now", &page_refs)
                .with_results("example", &["d0", "d1"]),
        );
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(200, PRODUCT_PAGE)),
            search,
            direct_only().with_merge_strategy(MergeStrategy::FixedOffset),
        );

        let result = pipeline.run(URL).await;

        assert_eq!(
            result.image_urls,
            vec!["p0", "p1", "d0", "p2", "p3", "d1", "p4", "p5"]
        );
    }

    #[tokio::test]
    async fn test_unresolvable_host_disables_domain_branch() {
        let search = Arc::new(MockImageSearch::new().with_results("Dashboard", &["p0"]));
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(
                200,
                "<html><head><title>Dashboard</title></head></html>",
            )),
            Arc::clone(&search),
            direct_only().with_domain_failure_policy(DomainFailurePolicy::DisableDomainBranch),
        );

        let result = pipeline.run("http://localhost:3000/").await;

        assert!(result.has_error_kind("domain.root_not_found"));
        assert_eq!(result.image_urls, vec!["p0"]);
        assert_eq!(search.queries(), vec!["Dashboard"]);
        assert!(result.metadata.is_some());
    }

    #[tokio::test]
    async fn test_unresolvable_host_aborts_by_default() {
        let transport = Arc::new(MockTransport::ok(HttpResponse::new(200, PRODUCT_PAGE)));
        let search = Arc::new(MockImageSearch::new());
        let pipeline = PreviewPipeline::new(
            PageFetcher::new(transport.clone()),
            ImageSearchClient::new(search.clone()),
            direct_only(),
        );

        let result = pipeline.run("http://localhost:3000/").await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, "domain.root_not_found");
        assert!(result.image_urls.is_empty());
        assert!(result.metadata.is_none());
        assert_eq!(transport.call_count(), 0);
        assert!(search.queries().is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_keeps_domain_images() {
        let search = Arc::new(MockImageSearch::new().with_results("example", &["d0", "d1"]));
        let pipeline = pipeline(
            MockTransport::failing(FetchError::transport(URL, "connection refused")),
            Arc::clone(&search),
            direct_only(),
        );

        let result = pipeline.run(URL).await;

        assert!(result.metadata.is_none());
        assert_eq!(result.image_search_string, "");
        assert_eq!(result.image_urls, vec!["d0", "d1"]);
        assert!(result.has_error_kind("fetch.transport"));
        assert_eq!(search.queries(), vec!["example"]);
    }

    #[tokio::test]
    async fn test_rendered_fallback_feeds_extraction() {
        let renderer = Arc::new(MockRenderer::ok(PRODUCT_PAGE));
        let search = Arc::new(MockImageSearch::new().with_results("Buy Now", &["p0"]));
        let fetcher = PageFetcher::new(Arc::new(MockTransport::ok(HttpResponse::new(403, ""))))
            .with_renderer(renderer.clone());
        let pipeline = PreviewPipeline::new(
            fetcher,
            ImageSearchClient::new(search),
            PipelineConfig::default(),
        );

        let result = pipeline.run(URL).await;

        assert_eq!(result.image_search_string, "Buy Now");
        assert_eq!(result.image_urls, vec!["p0"]);
        assert!(!result.has_error_kind("fetch."), "unexpected errors: {:?}", result.errors);
        assert_eq!(renderer.acquire_count(), 1);
        assert_eq!(renderer.release_count(), 1);
    }

    #[tokio::test]
    async fn test_search_failure_keeps_other_branch() {
        let search = Arc::new(
            MockImageSearch::new()
                .with_results("Buy Now", &["p0", "p1"])
                .with_failure("example", SearchError::QuotaExceeded),
        );
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(200, PRODUCT_PAGE)),
            search,
            direct_only(),
        );

        let result = pipeline.run(URL).await;

        assert_eq!(result.image_urls, vec!["p0", "p1"]);
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, "search.quota");
    }

    #[tokio::test]
    async fn test_title_normalizing_to_empty_skips_page_search() {
        let search = Arc::new(MockImageSearch::new().with_results("example", &["d0"]));
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(
                200,
                "<html><head><title>Example.com | Example</title></head></html>",
            )),
            Arc::clone(&search),
            direct_only(),
        );

        let result = pipeline.run(URL).await;

        assert!(!result.has_errors());
        assert_eq!(result.image_search_string, "");
        assert_eq!(result.image_urls, vec!["d0"]);
        assert_eq!(search.queries(), vec!["example"]);
    }

    #[tokio::test]
    async fn test_run_with_timeout_reports_timeout_and_tears_down_browser() {
        let renderer = Arc::new(MockRenderer::ok(PRODUCT_PAGE).with_delay(Duration::from_secs(5)));
        let fetcher = PageFetcher::new(Arc::new(MockTransport::ok(HttpResponse::new(200, ""))))
            .with_renderer(renderer.clone());
        let pipeline = PreviewPipeline::new(
            fetcher,
            ImageSearchClient::new(Arc::new(MockImageSearch::new())),
            PipelineConfig::default(),
        );

        let result = pipeline
            .run_with_timeout(URL, Duration::from_millis(50))
            .await;

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind, "pipeline.timeout");
        assert!(result.image_urls.is_empty());
        assert!(result.metadata.is_none());

        // The in-flight session is dropped with the abandoned run.
        assert_eq!(renderer.acquire_count(), 1);
        assert_eq!(renderer.release_count(), 0);
        assert_eq!(renderer.abandoned_count(), 1);
    }

    #[test]
    fn test_from_config_rejects_invalid_timeouts() {
        let config: PreviewConfig =
            serde_json::from_str(r#"{"fetch": {"timeout_seconds": -1.0}}"#).unwrap();
        assert!(matches!(
            PreviewPipeline::from_config(&config),
            Err(PipelineError::Setup(_))
        ));

        let config: PreviewConfig =
            serde_json::from_str(r#"{"render": {"render_timeout_seconds": -3.0}}"#).unwrap();
        assert!(matches!(
            PreviewPipeline::from_config(&config),
            Err(PipelineError::Setup(_))
        ));
    }

    #[tokio::test]
    async fn test_result_serializes_with_camel_case_keys() {
        let pipeline = pipeline(
            MockTransport::ok(HttpResponse::new(200, PRODUCT_PAGE)),
            Arc::new(MockImageSearch::new()),
            direct_only(),
        );

        let json = pipeline.run(URL).await.to_json();

        assert_eq!(json["imageSearchString"], "Buy Now");
        assert!(json["imageUrls"].as_array().is_some());
        assert_eq!(json["metadata"]["siteName"], "Example Co");
    }
}
