use promql_parser::parser::{self, Expr};
use promql_template::{
    LabelMatcher, TemplateError, VariableApplier, VariableDefinition, inject_as_alert,
    inject_groupings, inject_matchers, list_metrics, validate,
};

/// Matchers of each `or` alternative of a single vector selector
fn matcher_groups(query: &str) -> Vec<Vec<String>> {
    let Expr::VectorSelector(vs) = parser::parse(query).unwrap() else {
        panic!("not a vector selector: {query}");
    };
    let render = |group: &Vec<promql_parser::label::Matcher>| -> Vec<String> {
        group.iter().map(|m| m.to_string()).collect()
    };
    let mut groups = Vec::new();
    if !vs.matchers.matchers.is_empty() {
        groups.push(render(&vs.matchers.matchers));
    }
    groups.extend(vs.matchers.or_matchers.iter().map(render));
    groups
}

fn dashboard_vars() -> VariableApplier {
    VariableApplier::from_definitions(&[
        VariableDefinition::with_options("sentinel_sampling_duration", &["1m", "5m", "1h"]),
        VariableDefinition::with_label_values(
            "instance",
            "src_updatecheck_client_duration_seconds_sum",
            "instance",
            "sourcegraph-frontend:3090",
        ),
    ])
    .unwrap()
}

#[test]
fn test_validate_templates() {
    let vars = dashboard_vars();

    assert!(
        validate(
            r#"sum(rate(src_search_response_latency_seconds_sum{source=~"searchblitz.*", status="success"}[$sentinel_sampling_duration])) by (source)"#,
            Some(&vars),
        )
        .is_ok()
    );
    assert!(validate(r#"up{instance="$instance"}"#, Some(&vars)).is_ok());
    assert!(validate("up{instance=}", Some(&vars)).is_err());
}

#[test]
fn test_parse_error_carries_substituted_expression() {
    let vars = dashboard_vars();
    let err = validate("rate(foo[$sentinel_sampling_duration]", Some(&vars)).unwrap_err();
    assert!(
        matches!(&err, TemplateError::Parse { expression, .. } if expression == "rate(foo[1m]"),
        "{err}"
    );
}

#[test]
fn test_inject_matchers_appends_after_existing() {
    let result = inject_matchers(
        r#"foo{a="b"}"#,
        &[LabelMatcher::equal("key", "value")],
        None,
    )
    .unwrap();
    assert_eq!(result, r#"foo{a="b",key="value"}"#);
}

#[test]
fn test_inject_matchers_into_every_selector() {
    let result = inject_matchers(
        "sum(rate(a_total[5m])) / sum(rate(b_total[5m]))",
        &[LabelMatcher::regex_match("job", "frontend|api")],
        None,
    )
    .unwrap();
    assert_eq!(
        result,
        r#"sum(rate(a_total{job=~"frontend|api"}[5m])) / sum(rate(b_total{job=~"frontend|api"}[5m]))"#
    );
}

#[test]
fn test_inject_matchers_does_not_deduplicate() {
    let result = inject_matchers(
        r#"foo{job="a"}"#,
        &[LabelMatcher::equal("job", "b")],
        None,
    )
    .unwrap();
    assert_eq!(result, r#"foo{job="a",job="b"}"#);
}

#[test]
fn test_inject_matchers_restores_variables() {
    let vars = dashboard_vars();
    let result = inject_matchers(
        r#"sum(rate(src_search_response_latency_seconds_sum{source=~"searchblitz.*"}[$sentinel_sampling_duration])) by (source)"#,
        &[LabelMatcher::equal("status", "success")],
        Some(&vars),
    )
    .unwrap();
    assert_eq!(
        result,
        r#"sum by (source) (rate(src_search_response_latency_seconds_sum{source=~"searchblitz.*",status="success"}[$sentinel_sampling_duration]))"#
    );
}

#[test]
fn test_quoted_variable_survives_injection() {
    let vars = dashboard_vars();
    let result = inject_matchers(r#"up{instance="$instance"}"#, &[], Some(&vars)).unwrap();
    assert_eq!(result, r#"up{instance="$instance"}"#);
}

#[test]
fn test_zero_matcher_injection_is_stable() {
    let once = inject_matchers("sum(rate(foo[5m]))by(job)", &[], None).unwrap();
    assert_eq!(once, "sum by (job) (rate(foo[5m]))");
    let twice = inject_matchers(&once, &[], None).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn test_inject_groupings_recurses_into_nested_aggregations() {
    let result = inject_groupings("max(max(x))", &["id"], None).unwrap();
    assert_eq!(result, "max by (id) (max by (id) (x))");
}

#[test]
fn test_inject_groupings_repeated_application_duplicates() {
    let once = inject_groupings("sum(x)", &["id"], None).unwrap();
    let twice = inject_groupings(&once, &["id"], None).unwrap();
    assert_eq!(twice, "sum by (id, id) (x)");
}

#[test]
fn test_inject_groupings_restores_variables() {
    let vars = dashboard_vars();
    let result = inject_groupings(
        "sum(rate(foo[$sentinel_sampling_duration]))",
        &["instance".to_string()],
        Some(&vars),
    )
    .unwrap();
    assert_eq!(
        result,
        "sum by (instance) (rate(foo[$sentinel_sampling_duration]))"
    );
}

#[test]
fn test_list_metrics_histogram_companions() {
    let metrics = list_metrics("rate(req_count[5m])", None).unwrap();
    assert_eq!(metrics, vec!["req_count", "req_sum", "req_bucket"]);
}

#[test]
fn test_list_metrics_first_seen_order() {
    let vars = dashboard_vars();
    let metrics = list_metrics(
        r#"histogram_quantile(0.9, sum by (le) (rate(src_latency_seconds_bucket[$sentinel_sampling_duration]))) / up{instance="$instance"} + src_latency_seconds_sum"#,
        Some(&vars),
    )
    .unwrap();
    assert_eq!(
        metrics,
        vec![
            "src_latency_seconds_bucket",
            "src_latency_seconds_count",
            "src_latency_seconds_sum",
            "up",
        ]
    );
}

#[test]
fn test_alert_drops_regex_variable_matcher() {
    let vars = VariableApplier::new().with_variable("queue", "bar");
    let result = inject_as_alert(r#"foo{queue=~"${queue:regex}"}"#, &[], Some(&vars)).unwrap();
    assert_eq!(result, "foo");
}

#[test]
fn test_alert_appends_matchers_to_safe_ones() {
    let vars = dashboard_vars();
    let result = inject_as_alert(
        r#"sum(rate(src_http_requests_total{code="500",instance=~"${instance:regex}"}[5m]))"#,
        &[LabelMatcher::equal("job", "frontend")],
        Some(&vars),
    )
    .unwrap();
    assert_eq!(
        result,
        r#"sum(rate(src_http_requests_total{code="500",job="frontend"}[5m]))"#
    );
}

#[test]
fn test_alert_rejects_variable_in_plain_regex() {
    let vars = VariableApplier::new().with_variable("source", "frontend");
    let err = inject_as_alert(r#"foo{job=~"^$source.*"}"#, &[], Some(&vars)).unwrap_err();
    match err {
        TemplateError::UnsafeRegexVariable { variable, .. } => assert_eq!(variable, "source"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_alert_rejects_variable_in_negated_regex() {
    let vars = VariableApplier::new().with_variable("source", "frontend");
    let err = inject_as_alert(r#"foo{job!~"^$source.*"}"#, &[], Some(&vars)).unwrap_err();
    match err {
        TemplateError::UnsafeRegexVariable { variable, .. } => assert_eq!(variable, "source"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_empty_sentinel_is_an_error() {
    let vars = VariableApplier::new().with_variable("source", "");
    let err = inject_as_alert(r#"foo{job=~"^$source.*"}"#, &[], Some(&vars)).unwrap_err();
    assert!(matches!(err, TemplateError::InvalidVariable { .. }), "{err}");

    let err = inject_matchers(
        r#"foo{job=~"^$source.*"}"#,
        &[LabelMatcher::equal("env", "prod")],
        Some(&vars),
    )
    .unwrap_err();
    assert!(matches!(err, TemplateError::InvalidVariable { .. }), "{err}");
}

#[test]
fn test_inject_matchers_into_every_or_group() {
    let result = inject_matchers(
        r#"{job="api" or job="web"}"#,
        &[LabelMatcher::equal("env", "prod")],
        None,
    )
    .unwrap();

    let groups = matcher_groups(&result);
    assert_eq!(groups.len(), 2, "{result}");
    for group in &groups {
        assert!(group.contains(&r#"env="prod""#.to_string()), "{result}");
    }
    assert!(groups[0].contains(&r#"job="api""#.to_string()), "{result}");
    assert!(groups[1].contains(&r#"job="web""#.to_string()), "{result}");
}

#[test]
fn test_alert_sanitizes_each_or_group() {
    let vars = VariableApplier::new().with_variable("instance", "frontend:3090");
    let result = inject_as_alert(
        r#"{job="api",instance="$instance" or job="web"}"#,
        &[LabelMatcher::equal("env", "prod")],
        Some(&vars),
    )
    .unwrap();

    let groups = matcher_groups(&result);
    assert_eq!(groups.len(), 2, "{result}");
    for group in &groups {
        assert!(group.contains(&r#"env="prod""#.to_string()), "{result}");
        assert!(!group.iter().any(|m| m.starts_with("instance")), "{result}");
    }
    assert!(groups[0].contains(&r#"job="api""#.to_string()), "{result}");
    assert!(groups[1].contains(&r#"job="web""#.to_string()), "{result}");
}

#[test]
fn test_list_metrics_from_or_groups() {
    let metrics = list_metrics(r#"{__name__="x" or __name__="y"}"#, None).unwrap();
    assert_eq!(metrics, vec!["x", "y"]);
}

#[test]
fn test_alert_fails_when_variable_cannot_be_dropped() {
    let vars = dashboard_vars();
    let err = inject_as_alert(
        r#"rate(foo{job="api"}[$sentinel_sampling_duration])"#,
        &[],
        Some(&vars),
    )
    .unwrap_err();
    assert_eq!(
        err.rendered(),
        Some(r#"rate(foo{job="api"}[$sentinel_sampling_duration])"#)
    );
}

#[test]
fn test_scalar_literal_round_trips_everywhere() {
    let vars = dashboard_vars();
    assert!(validate("42", Some(&vars)).is_ok());
    assert_eq!(
        inject_matchers("42", &[LabelMatcher::equal("job", "api")], Some(&vars)).unwrap(),
        "42"
    );
    assert_eq!(inject_groupings("42", &["id"], Some(&vars)).unwrap(), "42");
    assert!(list_metrics("42", Some(&vars)).unwrap().is_empty());
    assert_eq!(
        inject_as_alert("42", &[LabelMatcher::equal("job", "api")], Some(&vars)).unwrap(),
        "42"
    );
}
