//! Loading contracts over HTTP.

#![cfg(feature = "remote")]

use api_conformance::{
    load_contract_auto, load_contract_url, ContractChecker, LoadError, SimpleRequest,
};

const CONTRACT: &str = "baseUri: http://api.test/v2\nresources:\n  - relativeUri: /ping\n    methods:\n      get: {}\n";

#[test]
fn fetches_yaml_contract() {
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/api.yaml")
        .with_status(200)
        .with_header("content-type", "application/yaml")
        .with_body(CONTRACT)
        .create();

    let api = load_contract_url(&format!("{}/api.yaml", server.url())).unwrap();
    mock.assert();

    assert_eq!(api.base_uri.as_deref(), Some("http://api.test/v2"));
    let report = ContractChecker::new(api)
        .check_request(&SimpleRequest::get("http://api.test/v2/ping"))
        .unwrap();
    assert!(report.is_empty(), "{:?}", report.request);
}

#[test]
fn auto_detects_urls() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/api.json")
        .with_status(200)
        .with_body(r#"{"resources": [{"relativeUri": "/a"}]}"#)
        .create();

    let api = load_contract_auto(&format!("{}/api.json", server.url())).unwrap();
    assert_eq!(api.resources.len(), 1);
}

#[test]
fn http_errors_are_network_errors() {
    let mut server = mockito::Server::new();
    let _mock = server.mock("GET", "/missing.yaml").with_status(404).create();

    let err = load_contract_url(&format!("{}/missing.yaml", server.url())).unwrap_err();
    assert!(matches!(err, LoadError::NetworkError { .. }));
    assert_eq!(err.exit_code(), 3);
}

#[test]
fn fetched_content_must_parse() {
    let mut server = mockito::Server::new();
    let _mock = server
        .mock("GET", "/broken")
        .with_status(200)
        .with_body("{ broken")
        .create();

    let err = load_contract_url(&format!("{}/broken", server.url())).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
