//! Conformance checking integration tests.

use api_conformance::{
    load_contract_str, Category, CheckerConfig, ContractChecker, MediaType, Report,
    SimpleRequest, SimpleResponse, UriTemplate,
};

fn checker(contract: &str) -> ContractChecker {
    ContractChecker::new(load_contract_str(contract).unwrap())
}

fn keys(report: &Report, category: Category) -> Vec<String> {
    report
        .violations(category)
        .iter()
        .map(|v| v.key.clone())
        .collect()
}

fn request_keys(report: &Report) -> Vec<String> {
    keys(report, Category::Request)
}

mod resolution {
    use super::*;

    const TREE: &str = r#"{"resources": [
        {"relativeUri": "/users", "methods": {"get": {}},
         "resources": [
            {"relativeUri": "/{id}", "methods": {"get": {}}},
            {"relativeUri": "/me", "methods": {"get": {}}}
         ]},
        {"relativeUri": "/orders", "methods": {"get": {}}},
        {"relativeUri": "/{a}-{b}", "methods": {"get": {}}},
        {"relativeUri": "/{x}-{y}", "methods": {"get": {}}}
    ]}"#;

    #[test]
    fn disjoint_literal_prefixes_resolve() {
        let c = checker(TREE);
        for path in ["/users", "/orders", "/users/12", "/users/me"] {
            let report = c.check_request(&SimpleRequest::get(path)).unwrap();
            assert!(report.is_empty(), "{}: {:?}", path, report.request);
        }
    }

    #[test]
    fn literal_child_beats_variable_child() {
        let c = checker(TREE);
        let report = c.check_request(&SimpleRequest::get("/users/me")).unwrap();
        assert!(report.usage.resources["/users/me"].uses == 1);
        assert!(report.usage.resources["/users/{id}"].uses == 0);
    }

    #[test]
    fn undefined_resource_aborts() {
        let report = checker(TREE)
            .check_request(&SimpleRequest::get("/nothing/here"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["resource.undefined"]);
    }

    #[test]
    fn equally_specific_siblings_are_ambiguous() {
        let report = checker(TREE)
            .check_request(&SimpleRequest::get("/p-q"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["resource.ambiguous"]);
        assert!(report.request.messages()[0].contains("/{a}-{b}"));
    }

    #[test]
    fn undefined_action_aborts() {
        let report = checker(TREE)
            .check_request(&SimpleRequest::new("PATCH", "/orders"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["action.undefined"]);
    }

    #[test]
    fn template_matching_example() {
        let t = UriTemplate::parse("abc{var}xyz").unwrap();

        let complete = t.best_match("abc123xyz");
        assert!(complete.complete);
        assert_eq!(complete.get("var"), Some("123"));

        let partial = t.best_match("abc123xyz000");
        assert!(partial.matched && !partial.complete);
        assert_eq!(partial.suffix, "000");

        assert!(!t.best_match("ade").matched);
    }

    #[test]
    fn unterminated_template_is_an_error() {
        assert!(UriTemplate::parse("/users/{id").is_err());
    }
}

mod parameters {
    use super::*;

    const SEARCH: &str = r#"{"resources": [{"relativeUri": "/search", "methods": {"get": {
        "queryParameters": {
            "q": {"type": "string", "required": true},
            "limit": {"type": "integer", "maximum": 666},
            "ratio": {"type": "number", "minimum": 0},
            "tag": {"type": "string", "repeat": true},
            "sort": {"type": "string", "enum": ["asc", "desc"]}
        },
        "headers": {
            "X-Tenant-{?}": {"type": "string", "pattern": "^[a-z]+$"}
        }
    }}}]}"#;

    #[test]
    fn missing_required_parameter() {
        let c = checker(SEARCH);
        let report = c.check_request(&SimpleRequest::get("/search")).unwrap();
        assert_eq!(request_keys(&report), vec!["required.missing"]);

        let report = c.check_request(&SimpleRequest::get("/search?q=")).unwrap();
        assert!(report.is_empty(), "{:?}", report.request);
    }

    #[test]
    fn non_repeatable_parameter_given_twice() {
        let c = checker(SEARCH);
        for url in ["/search?q=a&q=b", "/search?q=a&q=a", "/search?q=&q=x&q=y"] {
            let report = c.check_request(&SimpleRequest::get(url)).unwrap();
            assert_eq!(request_keys(&report), vec!["repeat.superfluous"], "{}", url);
        }

        let report = c
            .check_request(&SimpleRequest::get("/search?q=a&tag=x&tag=y"))
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn integer_maximum_boundary() {
        let c = checker(SEARCH);
        let report = c
            .check_request(&SimpleRequest::get("/search?q=a&limit=667"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["value.tooBig"]);

        let report = c
            .check_request(&SimpleRequest::get("/search?q=a&limit=666"))
            .unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn unbound_numbers_with_range() {
        let c = checker(SEARCH);
        for value in ["inf", "-inf", "nan"] {
            let url = format!("/search?q=a&ratio={}", value);
            let report = c.check_request(&SimpleRequest::get(url)).unwrap();
            assert_eq!(request_keys(&report), vec!["unbound"], "{}", value);
        }
    }

    #[test]
    fn enum_and_message_prefix() {
        let report = checker(SEARCH)
            .check_request(&SimpleRequest::get("/search?q=a&sort=up"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["enum.invalid"]);
        assert!(report.request.messages()[0]
            .starts_with("Query parameter 'sort' on action(GET /search): "));
    }

    #[test]
    fn wildcard_header_names_are_case_insensitive() {
        let c = checker(SEARCH);
        let ok = SimpleRequest::get("/search?q=a").header("x-tenant-id", "acme");
        assert!(c.check_request(&ok).unwrap().is_empty());

        let bad = SimpleRequest::get("/search?q=a").header("X-TENANT-ID", "ACME");
        let report = c.check_request(&bad).unwrap();
        assert_eq!(request_keys(&report), vec!["pattern.mismatch"]);
    }

    #[test]
    fn header_spellings_count_as_one_parameter() {
        let c = checker(SEARCH);
        let request = SimpleRequest::get("/search?q=a")
            .header("X-Tenant-Id", "a")
            .header("x-tenant-id", "b");
        let report = c.check_request(&request).unwrap();
        assert_eq!(request_keys(&report), vec!["repeat.superfluous"]);
    }

    #[test]
    fn undeclared_headers() {
        let c = checker(SEARCH);
        let request = SimpleRequest::get("/search?q=a")
            .header("User-Agent", "test")
            .header("X-Debug", "1");
        let report = c.check_request(&request).unwrap();
        assert_eq!(request_keys(&report), vec!["headerParam.undefined"]);

        let api = load_contract_str(SEARCH).unwrap();
        let lenient = ContractChecker::with_config(api, CheckerConfig::new().ignore_x_headers(true));
        assert!(lenient.check_request(&request).unwrap().is_empty());
    }
}

mod media_types {
    use super::*;

    const UPLOAD: &str = r#"{"resources": [{"relativeUri": "/docs", "methods": {
        "post": {"body": {
            "application/json": {"schema": "{\"type\": \"object\", \"required\": [\"title\"]}"},
            "multipart/form-data": {"formParameters": {
                "file": {"type": "file", "required": true},
                "title": {"type": "string"}
            }}
        }},
        "put": {"body": {
            "text/plain; charset=utf-8": {},
            "text/plain; format=flowed": {}
        }},
        "delete": {}
    }}]}"#;

    #[test]
    fn suffix_wildcard_compatibility() {
        let wildcard = MediaType::parse("application/*+xml").unwrap();
        assert!(wildcard.is_compatible_with(&MediaType::parse("application/vnd.foo+xml").unwrap()));
        assert!(!wildcard.is_compatible_with(&MediaType::parse("application/json").unwrap()));
    }

    #[test]
    fn json_body_is_validated() {
        let c = checker(UPLOAD);
        let ok = SimpleRequest::post("/docs").body("application/json", r#"{"title": "a"}"#);
        assert!(c.check_request(&ok).unwrap().is_empty());

        let missing = SimpleRequest::post("/docs").body("application/json", "{}");
        let report = c.check_request(&missing).unwrap();
        assert_eq!(request_keys(&report), vec!["schema.mismatch"]);
        assert!(report.request.iter().next().unwrap().cause.is_some());

        let broken = SimpleRequest::post("/docs").body("application/json", "{");
        let report = c.check_request(&broken).unwrap();
        assert_eq!(request_keys(&report), vec!["body.invalid"]);
    }

    #[test]
    fn undefined_and_illegal_media_types() {
        let c = checker(UPLOAD);
        let report = c
            .check_request(&SimpleRequest::post("/docs").body("application/xml", "<a/>"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["mediaType.undefined"]);

        let report = c
            .check_request(&SimpleRequest::post("/docs").body("json", "{}"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["mediaType.illegal"]);
    }

    #[test]
    fn equally_specific_bodies_are_ambiguous() {
        let report = checker(UPLOAD)
            .check_request(&SimpleRequest::new("PUT", "/docs").body("text/plain", "hi"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["mediaType.ambiguous"]);
    }

    #[test]
    fn missing_content_type() {
        let c = checker(UPLOAD);
        let mut request = SimpleRequest::post("/docs");
        request.body = b"{}".to_vec();
        let report = c.check_request(&request).unwrap();
        assert_eq!(request_keys(&report), vec!["contentType.missing"]);
    }

    #[test]
    fn superfluous_body() {
        let c = checker(UPLOAD);
        let report = c
            .check_request(&SimpleRequest::new("DELETE", "/docs").body("text/plain", "x"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["body.superfluous"]);

        let report = c.check_request(&SimpleRequest::new("DELETE", "/docs")).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn multipart_form() {
        let c = checker(UPLOAD);
        let ok = SimpleRequest::post("/docs")
            .body("multipart/form-data; boundary=x", "")
            .form_file("file", "a.txt", "hello")
            .form_field("title", "A");
        assert!(c.check_request(&ok).unwrap().is_empty());

        let missing = SimpleRequest::post("/docs")
            .body("multipart/form-data; boundary=x", "")
            .form_field("title", "A")
            .form_field("extra", "1");
        let report = c.check_request(&missing).unwrap();
        assert_eq!(
            request_keys(&report),
            vec!["required.missing", "formParam.undefined"]
        );
    }

    #[test]
    fn malformed_utf8_is_not_decoded_lossily() {
        let report = checker(UPLOAD)
            .check_request(&SimpleRequest::post("/docs").body("application/json", &b"\xff\xfe"[..]))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["charset.invalid"]);
    }

    #[test]
    fn unsupported_charset() {
        let report = checker(UPLOAD)
            .check_request(
                &SimpleRequest::post("/docs").body("application/json; charset=ebcdic", "{}"),
            )
            .unwrap();
        assert_eq!(request_keys(&report), vec!["charset.invalid"]);
    }
}

mod responses {
    use super::*;

    const ITEMS: &str = r#"{"resources": [{"relativeUri": "/items", "methods": {"get": {
        "responses": {
            "200": {
                "headers": {"X-Total": {"type": "integer", "required": true}},
                "body": {
                    "application/json": {"schema": "{\"type\": \"array\"}"},
                    "application/xml": {}
                }
            },
            "204": {}
        }
    }}}]}"#;

    fn response_keys(report: &Report) -> Vec<String> {
        keys(report, Category::Response)
    }

    #[test]
    fn conforming_response() {
        let c = checker(ITEMS);
        let request = SimpleRequest::get("/items").header("Accept", "application/json");
        let response = SimpleResponse::new(200)
            .header("X-Total", "3")
            .body("application/json", "[1, 2, 3]");
        let report = c.check(&request, Some(&response)).unwrap();
        assert!(report.is_empty(), "{:?}", report.response);
    }

    #[test]
    fn response_headers_and_body() {
        let c = checker(ITEMS);
        let request = SimpleRequest::get("/items");
        let response = SimpleResponse::new(200)
            .header("X-Page", "1")
            .body("application/json", "{}");
        let report = c.check(&request, Some(&response)).unwrap();
        assert_eq!(
            response_keys(&report),
            vec!["required.missing", "responseHeader.undefined", "schema.mismatch"]
        );
    }

    #[test]
    fn content_on_bodyless_response_is_superfluous() {
        let c = checker(ITEMS);
        let response = SimpleResponse::new(204).body("text/plain", "unexpected content");
        let report = c.check(&SimpleRequest::get("/items"), Some(&response)).unwrap();
        assert_eq!(response_keys(&report), vec!["body.superfluous"]);
        assert!(report.response.messages()[0].contains("response(204) of action(GET /items)"));

        let report = c
            .check(&SimpleRequest::get("/items"), Some(&SimpleResponse::new(204)))
            .unwrap();
        assert!(report.is_empty(), "{:?}", report.response);
    }

    #[test]
    fn better_match_for_accept_header() {
        let c = checker(ITEMS);
        let request = SimpleRequest::get("/items").header("Accept", "application/xml, application/json;q=0.5");
        let response = SimpleResponse::new(200)
            .header("X-Total", "0")
            .body("application/json", "[]");
        let report = c.check(&request, Some(&response)).unwrap();
        assert_eq!(response_keys(&report), vec!["mediaType.better"]);
    }

    #[test]
    fn content_type_not_accepted() {
        let c = checker(ITEMS);
        let request = SimpleRequest::get("/items").header("Accept", "text/html");
        let response = SimpleResponse::new(200)
            .header("X-Total", "0")
            .body("application/json", "[]");
        let report = c.check(&request, Some(&response)).unwrap();
        assert_eq!(response_keys(&report), vec!["contentType.mismatch"]);
    }
}

mod security {
    use super::*;

    const SECURED: &str = r#"{
        "securitySchemes": {
            "A": {"type": "x-a", "describedBy": {"headers": {"X-A": {"required": true}}}},
            "B": {"type": "x-b", "describedBy": {
                "headers": {"X-B": {"required": true}},
                "responses": {"401": {}}
            }}
        },
        "resources": [{"relativeUri": "/vault", "securedBy": ["A", "B"], "methods": {"get": {}}}]
    }"#;

    #[test]
    fn tie_reports_every_scheme() {
        let report = checker(SECURED)
            .check_request(&SimpleRequest::get("/vault"))
            .unwrap();
        assert_eq!(
            request_keys(&report),
            vec!["required.missing", "required.missing"]
        );
        let messages = report.request.messages();
        assert!(messages[0].starts_with("Assuming security scheme 'A': "));
        assert!(messages[1].starts_with("Assuming security scheme 'B': "));
    }

    #[test]
    fn single_best_scheme_is_unqualified() {
        let report = checker(SECURED)
            .check_request(&SimpleRequest::get("/vault").header("X-A", "token"))
            .unwrap();
        assert!(report.is_empty(), "{:?}", report.request);
    }

    #[test]
    fn headers_of_both_schemes_tie() {
        let report = checker(SECURED)
            .check_request(&SimpleRequest::get("/vault").header("X-A", "t").header("X-B", "t"))
            .unwrap();
        assert_eq!(
            request_keys(&report),
            vec!["headerParam.undefined", "headerParam.undefined"]
        );
        assert!(report.request.messages()[0].contains("'X-B'"));
        assert!(report.request.messages()[1].contains("'X-A'"));
    }

    #[test]
    fn scheme_responses_are_declared() {
        let c = checker(SECURED);
        let request = SimpleRequest::get("/vault").header("X-B", "t");
        let report = c.check(&request, Some(&SimpleResponse::new(401))).unwrap();
        assert!(report.is_empty(), "{:?} {:?}", report.request, report.response);
    }

    #[test]
    fn unsecured_alternative() {
        let c = checker(
            r#"{
                "securitySchemes": {"A": {"type": "x-a", "describedBy": {"headers": {"X-A": {"required": true}}}}},
                "securedBy": [null, "A"],
                "resources": [{"relativeUri": "/open", "methods": {"get": {}}}]
            }"#,
        );
        let report = c.check_request(&SimpleRequest::get("/open")).unwrap();
        assert!(report.is_empty(), "{:?}", report.request);
    }
}

mod usage {
    use super::*;
    use api_conformance::SharedUsage;

    const SHOP: &str = r#"{"resources": [{"relativeUri": "/products", "methods": {"get": {
        "queryParameters": {"page": {"type": "integer"}},
        "headers": {"X-Tenant": {}},
        "responses": {"200": {"headers": {"X-Total": {}}}, "404": {}}
    }}}]}"#;

    #[test]
    fn fresh_contract_is_fully_unused() {
        let c = checker(SHOP);
        assert_eq!(c.empty_usage().coverage().unused_ratio(), 1.0);
    }

    #[test]
    fn exercising_everything_leaves_nothing_unused() {
        let c = checker(SHOP);
        let usage = SharedUsage::new(c.empty_usage());

        let request = SimpleRequest::get("/products?page=1").header("X-Tenant", "a");
        let ok = SimpleResponse::new(200).header("X-Total", "1");
        usage.merge(&c.check(&request, Some(&ok)).unwrap().usage);

        let not_found = SimpleResponse::new(404);
        usage.merge(&c.check(&request, Some(&not_found)).unwrap().usage);

        let coverage = usage.snapshot().coverage();
        assert_eq!(coverage.unused(), 0, "{:?}", coverage);
        assert_eq!(coverage.unused_ratio(), 0.0);
    }

    #[test]
    fn usage_counts_even_failing_values() {
        let c = checker(SHOP);
        let report = c
            .check_request(&SimpleRequest::get("/products?page=x"))
            .unwrap();
        assert_eq!(request_keys(&report), vec!["integer.invalid"]);
        assert_eq!(
            report.usage.resources["/products"].actions["GET"].query_parameters["page"],
            1
        );
    }

    #[test]
    fn parallel_checks_share_one_checker() {
        let c = checker(SHOP);
        let usage = SharedUsage::new(c.empty_usage());
        std::thread::scope(|s| {
            for _ in 0..8 {
                let (c, usage) = (&c, usage.clone());
                s.spawn(move || {
                    let report = c.check_request(&SimpleRequest::get("/products")).unwrap();
                    usage.merge(&report.usage);
                });
            }
        });
        assert_eq!(usage.snapshot().resources["/products"].uses, 8);
    }
}

mod contract_validation {
    use super::*;

    #[test]
    fn findings_are_attached_to_reports() {
        let c = checker(r#"{"resources": [{"relativeUri": "/a", "methods": {"get": {
            "queryParameters": {"n": {"type": "integer", "minimum": 5, "maximum": 1}}
        }}}]}"#);
        let report = c.check_request(&SimpleRequest::get("/a")).unwrap();
        assert!(report.is_empty());
        assert_eq!(keys(&report, Category::Validation), vec!["range.invalid"]);
    }

    #[test]
    fn validation_can_be_disabled() {
        let api = load_contract_str(r#"{"resources": [{"relativeUri": "a"}]}"#).unwrap();
        let c = ContractChecker::with_config(api, CheckerConfig::new().validate_contract(false));
        assert!(c.contract_violations().is_empty());
    }
}
