mod test_utils;

use cheeseshop_cache::{AsyncCache, CacheConfig};
use cheeseshop_core::{Package, Release, SearchHit, SearchOperator, SearchQuery};
use cheeseshop_proxy::{
    MemoryCatalog, PackageCatalog, PackageProvider, ProviderChain, ProxyConfig, PypiClient,
    RetryPolicy, UpstreamProvider,
};
use std::sync::Arc;
use test_utils::{MockIndex, release, release_file};

async fn local_catalog() -> Arc<MemoryCatalog> {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.create_package(Package::new("Flask", false)).await.unwrap();
    catalog
        .add_release(
            "flask",
            Release::current("3.0"),
            release("Flask", "3.0", "A simple micro framework", Vec::new()),
        )
        .await
        .unwrap();
    catalog
        .add_release(
            "flask",
            Release::current("2.3"),
            release("Flask", "2.3", "A simple micro framework", Vec::new()),
        )
        .await
        .unwrap();
    catalog
}

fn upstream(index: MockIndex) -> (Arc<MockIndex>, Arc<UpstreamProvider>) {
    let index = Arc::new(index);
    let client = PypiClient::new(
        index.clone(),
        AsyncCache::new(CacheConfig::default()),
        &ProxyConfig::default(),
    )
    .with_retry(RetryPolicy::none());
    (index, Arc::new(UpstreamProvider::new(Arc::new(client))))
}

fn upstream_index() -> MockIndex {
    MockIndex::new()
        .with_package("Flask", &["0.1"], &[])
        .with_package("requests", &["2.31.0"], &["0.1"])
        .with_release(
            "requests",
            "2.31.0",
            release("requests", "2.31.0", "Python HTTP for Humans.", Vec::new()),
        )
        .with_hits(vec![SearchHit::new(
            "requests",
            "2.31.0",
            Some("Python HTTP for Humans.".into()),
        )])
}

#[tokio::test]
async fn local_catalog_wins_over_upstream() {
    let catalog = local_catalog().await;
    let (index, upstream) = upstream(upstream_index());
    let chain = ProviderChain::new()
        .with_provider(catalog)
        .with_provider(upstream);

    let package = chain.find_package("FLASK").await.unwrap();
    assert!(!package.is_proxy());

    let releases = chain.releases("flask").await.unwrap();
    assert_eq!(releases, vec![Release::current("2.3"), Release::current("3.0")]);
    assert_eq!(index.calls("list_packages"), 0);
}

#[tokio::test]
async fn unknown_locally_falls_through_to_upstream() {
    let catalog = local_catalog().await;
    let (_, upstream) = upstream(upstream_index());
    let chain = ProviderChain::new()
        .with_provider(catalog)
        .with_provider(upstream);

    let package = chain.find_package("Requests").await.unwrap();
    assert_eq!(package.name(), "requests");
    assert!(package.is_proxy());

    let releases = chain.releases("requests").await.unwrap();
    assert_eq!(releases, vec![Release::hidden("0.1"), Release::current("2.31.0")]);

    let data = chain.release_data("requests", "2.31.0").await.unwrap();
    assert_eq!(data.info.summary.as_deref(), Some("Python HTTP for Humans."));
}

#[tokio::test]
async fn nobody_knows_the_package() {
    let catalog = local_catalog().await;
    let (_, upstream) = upstream(upstream_index());
    let chain = ProviderChain::new()
        .with_provider(catalog)
        .with_provider(upstream);

    assert!(chain.find_package("left-pad").await.unwrap_err().is_not_found());
    assert!(chain.releases("left-pad").await.unwrap_err().is_not_found());
    assert!(
        chain
            .release_data("flask", "9.9")
            .await
            .unwrap_err()
            .is_not_found()
    );
}

#[tokio::test]
async fn search_merges_local_and_upstream() {
    let catalog = local_catalog().await;
    let (_, upstream) = upstream(upstream_index());
    let chain = ProviderChain::new()
        .with_provider(catalog)
        .with_provider(upstream);

    let query = SearchQuery::new(
        vec!["flask".into(), "requests".into()],
        Vec::new(),
        SearchOperator::Or,
    );
    let hits = chain.search(&query).await.unwrap();
    let found: Vec<(&str, &str)> = hits
        .iter()
        .map(|hit| (hit.name().as_str(), hit.version().as_str()))
        .collect();
    assert_eq!(
        found,
        vec![("Flask", "2.3"), ("Flask", "3.0"), ("requests", "2.31.0")]
    );
}

#[tokio::test]
async fn failing_upstream_search_fails_the_merge() {
    let catalog = local_catalog().await;
    let (_, upstream) = upstream(upstream_index().with_search_fault());
    let chain = ProviderChain::new()
        .with_provider(catalog)
        .with_provider(upstream);

    let query = SearchQuery::new(vec!["flask".into()], Vec::new(), SearchOperator::Or);
    assert!(chain.search(&query).await.is_err());
}

#[tokio::test]
async fn local_search_honours_operator() {
    let catalog = local_catalog().await;

    let both = SearchQuery::new(
        vec!["flask".into()],
        vec!["MICRO".into()],
        SearchOperator::And,
    );
    assert_eq!(catalog.search(&both).await.unwrap().len(), 2);

    let mismatch = SearchQuery::new(
        vec!["flask".into()],
        vec!["database".into()],
        SearchOperator::And,
    );
    assert!(catalog.search(&mismatch).await.unwrap().is_empty());

    let either = SearchQuery::new(Vec::new(), vec!["micro".into()], SearchOperator::Or);
    assert_eq!(catalog.search(&either).await.unwrap().len(), 2);
}

#[tokio::test]
async fn local_search_reads_long_descriptions() {
    let catalog = Arc::new(MemoryCatalog::new());
    catalog.create_package(Package::new("Quart", false)).await.unwrap();
    let mut data = release("Quart", "0.19", "Async web framework", Vec::new());
    data.info.description = Some("A reimplementation of the Flask API on asyncio".into());
    catalog
        .add_release("quart", Release::current("0.19"), data)
        .await
        .unwrap();

    let query = SearchQuery::new(Vec::new(), vec!["ASYNCIO".into()], SearchOperator::Or);
    let hits = catalog.search(&query).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].summary().as_deref(), Some("Async web framework"));

    let missing = SearchQuery::new(Vec::new(), vec!["django".into()], SearchOperator::Or);
    assert!(catalog.search(&missing).await.unwrap().is_empty());
}

#[tokio::test]
async fn catalog_rejects_duplicates() {
    let catalog = local_catalog().await;

    let err = catalog
        .create_package(Package::new("flask", true))
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let err = catalog
        .add_release(
            "Flask",
            Release::current("3.0"),
            release("Flask", "3.0", "again", Vec::new()),
        )
        .await
        .unwrap_err();
    assert!(err.is_conflict());

    let err = catalog
        .add_release("nope", Release::current("1.0"), Default::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn catalog_marks_files_fetched() {
    let catalog = MemoryCatalog::new();
    catalog
        .create_package(Package::new("sample", true))
        .await
        .unwrap();
    catalog
        .add_release(
            "sample",
            Release::current("1.0"),
            release(
                "sample",
                "1.0",
                "sample",
                vec![release_file("sample-1.0.tar.gz", 3, None, None)],
            ),
        )
        .await
        .unwrap();

    catalog
        .mark_fetched("sample", "1.0", "sample-1.0.tar.gz")
        .await
        .unwrap();
    let data = PackageCatalog::release_data(&catalog, "sample", "1.0")
        .await
        .unwrap()
        .unwrap();
    assert!(data.file("sample-1.0.tar.gz").unwrap().fetched());

    let err = catalog
        .mark_fetched("sample", "1.0", "missing.whl")
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(catalog.packages().await.unwrap().len(), 1);
}
