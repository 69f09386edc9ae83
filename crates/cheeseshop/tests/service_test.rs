use cheeseshop::{Cheeseshop, CheeseshopConfig};
use cheeseshop_core::{
    Package, Release, ReleaseData, ReleaseFileBuilder, ReleaseInfo, SearchOperator, SearchQuery,
};
use cheeseshop_proxy::PackageCatalog;
use cheeseshop_storage::BytesPayload;
use std::io::Write;

/// A shop with one in-memory backend and upstream proxying switched off.
async fn offline_shop() -> Cheeseshop {
    let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
    file.write_all(b"[proxy]\nenabled = false\n\n[[storage.backends]]\nkind = \"memory\"\n")
        .unwrap();
    let config = CheeseshopConfig::from_file(file.path()).unwrap();
    Cheeseshop::from_config(&config).await.unwrap()
}

fn release_data(version: &str, files: &[&str]) -> ReleaseData {
    ReleaseData {
        info: ReleaseInfo {
            name: "Sample".to_string(),
            version: version.to_string(),
            summary: Some("A sample package".to_string()),
            ..Default::default()
        },
        files: files
            .iter()
            .map(|filename| {
                ReleaseFileBuilder::default()
                    .filename(*filename)
                    .url(format!("https://files.example/{}", filename))
                    .size(5u64)
                    .build()
                    .unwrap()
            })
            .collect(),
    }
}

async fn with_local_package(shop: &Cheeseshop) {
    let catalog = shop.catalog();
    catalog
        .create_package(Package::new("Sample", false))
        .await
        .unwrap();
    catalog
        .add_release(
            "sample",
            Release::current("1.0"),
            release_data("1.0", &["sample-1.0.tar.gz"]),
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn local_packages_are_served_without_upstream() {
    let shop = offline_shop().await;
    with_local_package(&shop).await;

    assert!(!shop.client().is_enabled());
    let package = shop.find_package("SAMPLE").await.unwrap();
    assert_eq!(package.name(), "Sample");
    assert_eq!(shop.releases("sample").await.unwrap(), vec![Release::current("1.0")]);

    let data = shop.release_data("sample", "1.0").await.unwrap();
    assert_eq!(data.files.len(), 1);
}

#[tokio::test]
async fn unknown_packages_are_not_found_offline() {
    let shop = offline_shop().await;

    assert!(shop.find_package("requests").await.unwrap_err().is_not_found());
    assert!(shop.releases("requests").await.unwrap_err().is_not_found());
    assert!(shop.mirror("requests").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn search_only_sees_local_packages_offline() {
    let shop = offline_shop().await;
    with_local_package(&shop).await;

    let query = SearchQuery::new(Vec::new(), vec!["sample".into()], SearchOperator::Or);
    let hits = shop.search(&query).await.unwrap();
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].name(), "Sample");
    assert_eq!(hits[0].version(), "1.0");
}

#[tokio::test]
async fn fetch_serves_files_already_in_storage() {
    let shop = offline_shop().await;
    with_local_package(&shop).await;
    shop.storages()
        .put("sample-1.0.tar.gz", BytesPayload::from_bytes("hello"))
        .await
        .unwrap();

    let payload = shop.fetch("sample", "1.0", "sample-1.0.tar.gz").await.unwrap();
    assert_eq!(payload.into_bytes().await.unwrap().as_ref(), b"hello");

    let data = shop
        .catalog()
        .release_data("sample", "1.0")
        .await
        .unwrap()
        .unwrap();
    assert!(data.file("sample-1.0.tar.gz").unwrap().fetched());
}

#[tokio::test]
async fn fetch_without_stored_bytes_needs_upstream() {
    let shop = offline_shop().await;
    with_local_package(&shop).await;

    let err = shop
        .fetch("sample", "1.0", "sample-1.0.tar.gz")
        .await
        .unwrap_err();
    assert!(!err.is_not_found());
    assert!(shop.storages().get("sample-1.0.tar.gz").await.is_err());
}
