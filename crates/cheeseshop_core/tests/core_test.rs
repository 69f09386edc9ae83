use cheeseshop_core::{
    Release, ReleaseData, ReleaseFileBuilder, ReleaseVersion, SearchOperator, SearchQuery,
    normalize_package_name,
};
use std::collections::BTreeSet;

#[test]
fn normalization_collapses_separators() {
    assert_eq!(normalize_package_name("Flask_SQLAlchemy"), "flask-sqlalchemy");
    assert_eq!(normalize_package_name("zope.interface"), "zope-interface");
    assert_eq!(normalize_package_name("a-_.b"), "a-b");
    assert_eq!(normalize_package_name("plain"), "plain");
}

#[test]
fn versions_order_numerically() {
    let mut versions: Vec<ReleaseVersion> = ["1.10", "1.2", "1.9.1", "0.9", "1.0a1", "1.0"]
        .into_iter()
        .map(ReleaseVersion::from)
        .collect();
    versions.sort();

    let ordered: Vec<&str> = versions.iter().map(ReleaseVersion::as_str).collect();
    assert_eq!(ordered, vec!["0.9", "1.0", "1.0a1", "1.2", "1.9.1", "1.10"]);
}

#[test]
fn versions_equal_by_components() {
    assert_eq!(ReleaseVersion::from("1.0"), ReleaseVersion::from("1-0"));
    assert_ne!(ReleaseVersion::from("1.0"), ReleaseVersion::from("1.0.0"));
}

#[test]
fn release_sets_keep_hidden_flag() {
    let releases: BTreeSet<Release> = [Release::current("2.0"), Release::hidden("1.0")]
        .into_iter()
        .collect();

    let hidden: Vec<String> = releases
        .iter()
        .filter(|r| r.hidden)
        .map(|r| r.to_string())
        .collect();
    assert_eq!(hidden, vec!["1.0".to_string()]);
}

#[test]
fn release_version_serializes_as_string() {
    let json = serde_json::to_string(&Release::current("3.1.4")).unwrap();
    assert_eq!(json, r#"{"version":"3.1.4","hidden":false}"#);
}

#[test]
fn release_data_finds_files_by_name() {
    let file = ReleaseFileBuilder::default()
        .filename("pkg-1.0.tar.gz")
        .url("https://files.example/pkg-1.0.tar.gz")
        .md5_digest(Some("d41d8cd98f00b204e9800998ecf8427e".to_string()))
        .size(0u64)
        .build()
        .unwrap();
    let data = ReleaseData {
        info: Default::default(),
        files: vec![file],
    };

    assert!(data.file("pkg-1.0.tar.gz").is_some());
    assert!(data.file("pkg-2.0.tar.gz").is_none());
}

#[test]
fn operator_parsing_rejects_unknown() {
    assert_eq!("or".parse::<SearchOperator>().unwrap(), SearchOperator::Or);
    assert_eq!(" And ".parse::<SearchOperator>().unwrap(), SearchOperator::And);
    let err = "nand".parse::<SearchOperator>().unwrap_err();
    assert!(err.to_string().contains("Operator must be"));
}

#[test]
fn or_query_matches_either_side() {
    let query = SearchQuery::new(
        vec!["left_pad".into()],
        vec!["pad".into()],
        SearchOperator::Or,
    );
    assert!(query.matches("left-pad", None));
    assert!(query.matches("right-pad", Some("Pads strings")));
    assert!(!query.matches("other", Some("unrelated")));
}

#[test]
fn empty_criterion_never_matches() {
    let query = SearchQuery::new(vec!["pkg".into()], vec![], SearchOperator::And);
    assert!(!query.matches("pkg", Some("anything")));
}
