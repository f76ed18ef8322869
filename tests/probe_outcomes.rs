use bibxml_tools::probe::{Resolution, join_url, method_label, parse_methods_tried};

#[test]
fn resolution_labels_and_failure_flags() {
    assert_eq!(Resolution::ResolvedPrimary.label(), "resolved-primary");
    assert_eq!(Resolution::ResolvedAlias.label(), "resolved-alias");
    assert_eq!(Resolution::NotFound.label(), "not-found");
    assert_eq!(Resolution::TransportError.label(), "transport-error");

    assert!(!Resolution::ResolvedPrimary.is_failure());
    assert!(!Resolution::ResolvedAlias.is_failure());
    assert!(Resolution::NotFound.is_failure());
    assert!(Resolution::TransportError.is_failure());
}

#[test]
fn url_join_handles_trailing_slash() {
    assert_eq!(
        join_url("http://api.test/", "bibxml4/rfc1.xml"),
        "http://api.test/bibxml4/rfc1.xml"
    );
    assert_eq!(
        join_url("http://api.test", "bibxml4/rfc1.xml"),
        "http://api.test/bibxml4/rfc1.xml"
    );
}

#[test]
fn methods_headers_parse_into_outcomes() {
    let (tried, successful) = parse_methods_tried(
        Some("auto;manual;fallback"),
        Some("cfg-a,no match;cfg-m,;,no xml"),
    );

    assert_eq!(tried.len(), 3);
    assert_eq!(tried[0].method, "auto");
    assert!(!tried[0].success);
    assert_eq!(tried[0].error.as_deref(), Some("no match"));
    assert_eq!(tried[0].config.as_deref(), Some("cfg-a"));

    let successful = successful.expect("manual succeeded");
    assert_eq!(successful.method, "manual");
    assert_eq!(successful.config.as_deref(), Some("cfg-m"));
    assert!(successful.error.is_none());

    // fallback had empty config and a non-empty error.
    assert!(!tried[2].success);
    assert!(tried[2].config.is_none());
    assert_eq!(tried[2].error.as_deref(), Some("no xml"));
}

#[test]
fn malformed_methods_headers_yield_nothing() {
    // No headers at all.
    assert_eq!(parse_methods_tried(None, None).0.len(), 0);
    // Single method without the `;` marker the service always sends.
    assert_eq!(parse_methods_tried(Some("auto"), Some("cfg,")).0.len(), 0);
    // Mismatched list lengths.
    assert_eq!(
        parse_methods_tried(Some("auto;manual"), Some("cfg,")).0.len(),
        0
    );
}

#[test]
fn method_labels_are_human_readable() {
    assert_eq!(method_label("auto"), "Automatic resolution");
    assert_eq!(method_label("manual"), "Mapping by primary docid");
    assert_eq!(method_label("fallback"), "Fallback to bibxml data archive");
    assert_eq!(method_label("custom"), "custom");
}
