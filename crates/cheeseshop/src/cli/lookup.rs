//! Read-only lookups printed as JSON.

use cheeseshop::Cheeseshop;
use cheeseshop_core::{SearchOperator, SearchQuery};
use cheeseshop_error::{CheeseshopResult, JsonError};
use serde::Serialize;

fn print_json(value: &impl Serialize) -> CheeseshopResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| JsonError::new(format!("Failed to render output: {}", e)))?;
    println!("{}", rendered);
    Ok(())
}

/// Print every release of `name`, hidden ones included.
pub async fn handle_releases(shop: &Cheeseshop, name: &str) -> CheeseshopResult<()> {
    let releases = shop.releases(name).await?;
    print_json(&releases)
}

/// Print metadata and files of one release.
pub async fn handle_release(shop: &Cheeseshop, name: &str, version: &str) -> CheeseshopResult<()> {
    let data = shop.release_data(name, version).await?;
    print_json(&data)
}

/// Print merged search hits.
pub async fn handle_search(
    shop: &Cheeseshop,
    terms: Vec<String>,
    description: Vec<String>,
    operator: &str,
) -> CheeseshopResult<()> {
    let operator: SearchOperator = operator.parse()?;
    let hits = shop
        .search(&SearchQuery::new(terms, description, operator))
        .await?;
    print_json(&hits)
}

/// Mirror `name` and print the package with its recorded releases.
pub async fn handle_mirror(shop: &Cheeseshop, name: &str) -> CheeseshopResult<()> {
    let package = shop.mirror(name).await?;
    let releases = shop.releases(package.name()).await?;
    print_json(&serde_json::json!({
        "package": package,
        "releases": releases,
    }))
}
