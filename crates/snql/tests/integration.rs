//! Black-box integration tests for snql
//!
//! These tests exercise the full parse → transform → serialize pipeline.

use chrono::{Duration, TimeZone, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use snql::{
    ArithmeticOperator, Column, Condition, Direction, Filter, Formula, FormulaParameter, Metric,
    MetricsQuery, MetricsScope, Op, OrOptimizer, QueryExpr, Rollup, Scalar, SnqlError, Timeseries,
    parse_mql,
};

const MRI: &str = "d:transactions/duration@millisecond";

fn assert_parses(mql: &str, expected: impl Into<QueryExpr>) {
    match parse_mql(mql) {
        Ok(query) => assert_eq!(query.query, Some(expected.into()), "{mql}"),
        Err(e) => panic!("failed to parse {mql:?}: {e}"),
    }
}

fn by_name(name: &str, aggregate: &str) -> Timeseries {
    Timeseries::new(Metric::public_name(name), aggregate)
}

fn by_mri(aggregate: &str) -> Timeseries {
    Timeseries::new(Metric::mri(MRI), aggregate)
}

fn eq(key: &str, value: &str) -> Filter {
    Condition::new(Column::new(key), Op::Eq, value).into()
}

fn cond(key: &str, op: Op, value: impl Into<snql::Expr>) -> Filter {
    Condition::new(Column::new(key), op, value).into()
}

fn columns(names: &[&str]) -> Option<Vec<Column>> {
    Some(names.iter().map(|n| Column::new(*n)).collect())
}

fn envelope(query: impl Into<QueryExpr>) -> MetricsQuery {
    let now = Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap();
    MetricsQuery::new(query)
        .set_start(now)
        .set_end(now + Duration::days(14))
        .set_rollup(Rollup::interval(3600).with_granularity(3600))
        .set_scope(MetricsScope::new(vec![1], vec![11]).set_use_case_id("transactions"))
}

// ============ Metric names ============

#[test]
fn metric_name_forms() {
    let cases = [
        ("sum(`d:transactions/duration@millisecond`)", Metric::mri(MRI)),
        ("sum(d:transactions/duration@millisecond)", Metric::mri(MRI)),
        ("sum(`transactions.duration`)", Metric::public_name("transactions.duration")),
        ("sum(`foo`)", Metric::public_name("foo")),
        ("sum(transactions.duration)", Metric::public_name("transactions.duration")),
        ("sum(foo)", Metric::public_name("foo")),
        ("(sum(foo))", Metric::public_name("foo")),
        ("  sum( foo )  ", Metric::public_name("foo")),
    ];
    for (mql, metric) in cases {
        assert_parses(mql, Timeseries::new(metric, "sum"));
    }
}

// ============ Filters ============

#[test]
fn single_filter_forms() {
    let cases = [
        (r#"sum(foo){bar:"baz"}"#, eq("bar", "baz")),
        ("sum(foo){bar:baz}", eq("bar", "baz")),
        (r#"sum(foo){bar:"2023-01-03T10:00:00"}"#, eq("bar", "2023-01-03T10:00:00")),
        ("sum(foo){bar:2023-01-03T10:00:00}", eq("bar", "2023-01-03T10:00:00")),
        (r#"sum(foo){!bar:"baz"}"#, cond("bar", Op::Neq, "baz")),
        ("sum(foo){!bar:baz}", cond("bar", Op::Neq, "baz")),
        (r#"sum(foo){bar:["baz", "bap"]}"#, cond("bar", Op::In, vec!["baz", "bap"])),
        (r#"sum(foo){bar:["baz", bap]}"#, cond("bar", Op::In, vec!["baz", "bap"])),
        ("sum(foo){bar:[baz, bap]}", cond("bar", Op::In, vec!["baz", "bap"])),
        (r#"sum(foo){!bar:["baz", "bap"]}"#, cond("bar", Op::NotIn, vec!["baz", "bap"])),
        ("sum(foo){!bar:[baz, bap]}", cond("bar", Op::NotIn, vec!["baz", "bap"])),
        ("sum(foo){bar:baz*}", cond("bar", Op::Like, "baz*")),
        (r#"sum(foo){!bar:"baz*"}"#, cond("bar", Op::NotLike, "baz*")),
        (r#"sum(foo{bar:"baz"})"#, eq("bar", "baz")),
        ("sum(foo{bar:baz})", eq("bar", "baz")),
    ];
    for (mql, filter) in cases {
        let expected = by_name("foo", "sum").set_filters(Some(vec![filter]));
        assert_parses(mql, expected);
    }
}

#[test]
fn filter_delimiters_build_one_and() {
    let two = Filter::and(vec![eq("bar", "baz"), eq("foo", "foz")]);
    for mql in [
        r#"sum(user{bar:"baz", foo:"foz"})"#,
        r#"sum(user{bar:"baz" foo:"foz"})"#,
        r#"sum(user{bar:"baz" AND foo:"foz"})"#,
        "sum(user{bar:baz, foo:foz})",
        "sum(user{bar:baz foo:foz})",
        r#"sum(user{bar:"baz", foo:foz})"#,
        r#"sum(user{bar:"baz" foo:foz})"#,
    ] {
        let expected = by_name("user", "sum").set_filters(Some(vec![two.clone()]));
        assert_parses(mql, expected);
    }

    let four = Filter::and(vec![
        eq("bar", "baz"),
        eq("foo", "foz"),
        eq("hee", "haw"),
        eq("key", "value"),
    ]);
    assert_parses(
        r#"sum(user{bar:"baz" foo:"foz", hee:"haw" AND key:"value"})"#,
        by_name("user", "sum").set_filters(Some(vec![four]))
    );

    let complex = Filter::and(vec![
        eq("bar", "baz"),
        eq("foo", "foz"),
        cond("hee", Op::NotIn, vec!["haw", "hoo"]),
    ]);
    assert_parses(
        r#"sum(user{bar:baz foo:"foz", !hee:["haw", hoo]})"#,
        by_name("user", "sum").set_filters(Some(vec![complex]))
    );
}

#[test]
fn and_binds_tighter_than_or() {
    assert_parses(
        r#"sum(user{bar:"baz" OR foo:"foz" AND (hee:"haw")})"#,
        by_name("user", "sum").set_filters(Some(vec![Filter::or(vec![
            eq("bar", "baz"),
            Filter::and(vec![eq("foo", "foz"), eq("hee", "haw")]),
        ])])),
    );
    assert_parses(
        r#"sum(user{(bar:"baz" OR foo:"foz") AND hee:"haw"})"#,
        by_name("user", "sum").set_filters(Some(vec![Filter::and(vec![
            Filter::or(vec![eq("bar", "baz"), eq("foo", "foz")]),
            eq("hee", "haw"),
        ])])),
    );
}

#[test]
fn outer_filters_come_first() {
    assert_parses(
        r#"sum(`d:transactions/duration@millisecond`{foo:"foz", hee:"haw"}){bar:"baz"}"#,
        by_mri("sum")
            .set_filters(Some(vec![
                eq("bar", "baz"),
                Filter::and(vec![eq("foo", "foz"), eq("hee", "haw")]),
            ]))
    );
}

#[test]
fn quote_styles() {
    let expected = by_mri("quantiles")
        .set_aggregate("quantiles", Some(vec![Scalar::Float(0.5)]))
        .set_filters(Some(vec![
            eq("bar", "baz"),
            Filter::and(vec![eq("foo", "'foz'"), eq("hee", "hoo")]),
        ]))
        .set_groupby(columns(&["a", "b"]));
    assert_parses(
        r#"quantiles(0.5)(`d:transactions/duration@millisecond`{foo:'foz' AND hee:"hoo"}){bar:baz} by (a, b)"#,
        expected
    );
}

// ============ Group by ============

#[test]
fn group_by_forms() {
    assert_parses(
        r#"max(`d:transactions/duration@millisecond`{foo:"foz"}) by transaction"#,
        by_mri("max")
            .set_filters(Some(vec![eq("foo", "foz")]))
            .set_groupby(columns(&["transaction"]))
    );
    assert_parses(
        "max(`d:transactions/duration@millisecond`{transaction.status:foz} by http.status_code)",
        by_mri("max")
            .set_filters(Some(vec![eq("transaction.status", "foz")]))
            .set_groupby(columns(&["http.status_code"]))
    );
    assert_parses(
        r#"max(`d:transactions/duration@millisecond`{transaction.status:"foz"}){transaction.op:baz} by (a.something, b.something)"#,
        by_mri("max")
            .set_filters(Some(vec![
                eq("transaction.op", "baz"),
                eq("transaction.status", "foz"),
            ]))
            .set_groupby(columns(&["a.something", "b.something"]))
    );
}

// ============ Curried aggregates ============

#[test]
fn curried_aggregates() {
    let cases = [
        (
            "quantiles(0.5)(`d:transactions/duration@millisecond`)",
            "quantiles",
            vec![Scalar::Float(0.5)],
        ),
        (
            "quantiles(0.5, 0.95)(`d:transactions/duration@millisecond`)",
            "quantiles",
            vec![Scalar::Float(0.5), Scalar::Float(0.95)],
        ),
        ("topK()(`d:transactions/duration@millisecond`)", "topK", vec![]),
        (
            r#"test(0.5, "random", other, 9)(`d:transactions/duration@millisecond`)"#,
            "test",
            vec![
                Scalar::Float(0.5),
                Scalar::from("random"),
                Scalar::from("other"),
                Scalar::Int(9),
            ],
        ),
    ];
    for (mql, aggregate, params) in cases {
        let expected = by_mri(aggregate).set_aggregate(aggregate, Some(params));
        assert_parses(mql, expected);
    }
}

// ============ Terms and arbitrary functions ============

fn divide(lhs: impl Into<FormulaParameter>, rhs: impl Into<FormulaParameter>) -> Formula {
    Formula::arithmetic(ArithmeticOperator::Divide, lhs, rhs)
}

#[test]
fn arithmetic_terms() {
    assert_parses(
        "sum(foo) / 1000",
        divide(by_name("foo", "sum"), 1000)
    );
    assert_parses(
        "sum(foo) * max(bar)",
        Formula::arithmetic(
            ArithmeticOperator::Multiply,
            by_name("foo", "sum"),
            by_name("bar", "max")
        )
    );
    assert_parses(
        "(sum(foo) * sum(bar)) / 1000",
        divide(
            Formula::arithmetic(
                ArithmeticOperator::Multiply,
                by_name("foo", "sum"),
                by_name("bar", "sum")
            ),
            1000
        )
    );
    assert_parses(
        "sum(foo) + sum(bar) - 2.5",
        Formula::arithmetic(
            ArithmeticOperator::Minus,
            Formula::arithmetic(ArithmeticOperator::Plus, by_name("foo", "sum"), by_name("bar", "sum")),
            2.5
        )
    );
}

#[test]
fn filters_and_group_by_on_terms() {
    let plain = divide(by_name("foo", "sum"), by_name("bar", "sum"));
    assert_parses(
        r#"(sum(foo) / sum(bar)){tag:"tag_value"}"#,
        plain.clone().set_filters(Some(vec![eq("tag", "tag_value")]))
    );
    assert_parses(
        r#"(sum(foo) / sum(bar)){tag:"tag_value"} by transaction"#,
        plain
            .clone()
            .set_filters(Some(vec![eq("tag", "tag_value")]))
            .set_groupby(columns(&["transaction"]))
    );

    let tagged = |name: &str| by_name(name, "sum").set_filters(Some(vec![eq("tag", "tag_value")]));
    assert_parses(
        r#"sum(foo{tag:"tag_value"}) / sum(bar{tag:"tag_value"})"#,
        divide(tagged("foo"), tagged("bar"))
    );

    let grouped = |name: &str| by_name(name, "sum").set_groupby(columns(&["transaction"]));
    assert_parses(
        "(sum(foo) by transaction / sum(bar) by transaction)",
        divide(grouped("foo"), grouped("bar"))
    );
    assert_parses(
        r#"(sum(foo) by transaction / sum(bar) by transaction){tag:"tag_value"}"#,
        divide(grouped("foo"), grouped("bar"))
            .set_filters(Some(vec![eq("tag", "tag_value")]))
    );
    assert_parses(
        r#"(sum(foo{tag:"tag_value"}) by transaction) / (sum(bar{tag:"tag_value"}) by transaction)"#,
        divide(
            tagged("foo").set_groupby(columns(&["transaction"])),
            tagged("bar").set_groupby(columns(&["transaction"]))
        )
    );
}

#[test]
fn complex_nested_terms() {
    let expected = Formula::arithmetic(
        ArithmeticOperator::Multiply,
        divide(
            by_name("foo", "sum")
                .set_filters(Some(vec![eq("tag2", "tag_value2"), eq("tag", "tag_value")])),
            by_name("bar", "sum"),
        )
        .set_filters(Some(vec![eq("tag3", "tag_value3")])),
        by_name("pop", "sum"),
    )
    .set_groupby(columns(&["transaction"]));
    assert_parses(
        r#"((sum(foo{tag:"tag_value"}){tag2:"tag_value2"} / sum(bar)){tag3:"tag_value3"} * sum(pop)) by transaction"#,
        expected
    );
}

#[test]
fn arbitrary_functions() {
    assert_parses(
        "apdex(sum(transaction.duration), 500)",
        Formula::new(
            "apdex",
            vec![by_name("transaction.duration", "sum").into(), 500.into()]
        )
    );
    assert_parses(
        "topK(10)((sum(transaction.duration) / count(transaction.duration)))",
        Formula::new(
            "topK",
            vec![divide(by_name("transaction.duration", "sum"), by_name("transaction.duration", "count")).into()]
        )
        .set_aggregate_params(Some(vec![Scalar::Int(10)]))
    );
}

#[test]
fn unsupported_inputs() {
    for mql in ["sum($foo)", "$foo"] {
        assert!(parse_mql(mql).is_err(), "{mql}");
    }
    assert_parses("sum(foo){bar:$baz}", by_name("foo", "sum").set_filters(Some(vec![eq("bar", "$baz")])));
    assert!(matches!(
        parse_mql("sum(foo){$bar:baz}"),
        Err(SnqlError::InvalidQuery(msg)) if msg == "Variables are not supported yet"
    ));
    assert!(matches!(
        parse_mql("sum(foo) {"),
        Err(SnqlError::Syntax(_))
    ));
}

// ============ Concrete scenarios ============

#[test]
fn scenario_plain_aggregate() {
    let query = parse_mql("sum(foo)").unwrap();
    assert_eq!(query, MetricsQuery::new(by_name("foo", "sum")));
}

#[test]
fn scenario_malformed_mri_is_a_syntax_error() {
    let err = parse_mql("sum(d:transactions/duration)").unwrap_err();
    assert!(matches!(err, SnqlError::Syntax(_)), "{err:?}");
    assert!(err.to_string().starts_with("Invalid metrics syntax: "));
}

#[test]
fn scenario_or_collapses_to_in() {
    let filters = vec![Filter::or(vec![eq("col", "a"), eq("col", "b"), eq("col", "c")])];
    assert_eq!(
        OrOptimizer::new().optimize(&filters),
        Some(vec![cond("col", Op::In, vec!["a", "b", "c"])])
    );
}

#[test]
fn scenario_empty_metric() {
    let err = Metric::new(None, None, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Metric must have at least one of public_name, mri or id"
    );
}

// ============ Serialization ============

#[test]
fn serialize_basic_mri_query() {
    let request = envelope(by_mri("max")).serialize().unwrap();
    assert_eq!(
        request.to_json(),
        json!({
            "mql": "max(d:transactions/duration@millisecond)",
            "mql_context": {
                "entity": null,
                "start": "2023-01-02T03:04:05+00:00",
                "end": "2023-01-16T03:04:05+00:00",
                "rollup": {
                    "orderby": null,
                    "granularity": 3600,
                    "interval": 3600,
                    "with_totals": null,
                },
                "scope": {
                    "org_ids": [1],
                    "project_ids": [11],
                    "use_case_id": "transactions",
                },
                "limit": null,
                "offset": null,
                "indexer_mappings": {},
            },
        })
    );
}

#[test]
fn serialize_mql_strings() {
    let special = " !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~";
    let cases: Vec<(QueryExpr, &str)> = vec![
        (
            by_mri("quantiles").set_aggregate("quantiles", Some(vec![Scalar::Float(0.5)])).into(),
            "quantiles(0.5)(d:transactions/duration@millisecond)",
        ),
        (
            by_mri("topK").set_aggregate("topK", Some(vec![Scalar::Int(10)])).into(),
            "topK(10)(d:transactions/duration@millisecond)",
        ),
        (
            by_name("transactions.duration", "max").into(),
            "max(transactions.duration)",
        ),
        (
            by_mri("max").set_filters(Some(vec![cond("bar", Op::Like, "baz*")])).into(),
            r#"max(d:transactions/duration@millisecond){bar:"baz*"}"#,
        ),
        (
            by_mri("max")
                .set_filters(Some(vec![Filter::and(vec![
                    cond("bar", Op::NotLike, "baz*"),
                    cond("foo", Op::Like, "prefix*"),
                ])]))
                .into(),
            r#"max(d:transactions/duration@millisecond){(!bar:"baz*" AND foo:"prefix*")}"#,
        ),
        (
            by_mri("max")
                .set_groupby(columns(&["a", "b"]))
                .into(),
            "max(d:transactions/duration@millisecond) by (a, b)",
        ),
        (
            by_mri("max")
                .set_filters(Some(vec![eq("bar", special)]))
                .set_groupby(columns(&["transaction"]))
                .into(),
            r##"max(d:transactions/duration@millisecond){bar:" !\"#$%&'()*+,-./0123456789:;<=>?@ABCDEFGHIJKLMNOPQRSTUVWXYZ[\\]^_`abcdefghijklmnopqrstuvwxyz{|}~"} by (transaction)"##,
        ),
        (
            divide(by_name("foo", "sum"), 1000).into(),
            "(sum(foo) / 1000)",
        ),
        (
            Formula::new(
                "apdex",
                vec![
                    by_name("foo", "sum")
                        .set_aggregate("quantiles", Some(vec![Scalar::Float(0.5)]))
                        .into(),
                    1000.into(),
                ],
            )
            .into(),
            "apdex(quantiles(0.5)(foo), 1000)",
        ),
        (
            Formula::new(
                "apdex",
                vec![
                    Formula::new("failure_rate", vec![by_name("foo", "sum").into()]).into(),
                    1000.into(),
                ],
            )
            .into(),
            "apdex(failure_rate(sum(foo)), 1000)",
        ),
        (
            Formula::new(
                "apdex",
                vec![divide(by_name("foo", "sum"), by_name("bar", "sum")).into(), 500.into()],
            )
            .set_filters(Some(vec![eq("tag", "tag_value")]))
            .set_groupby(columns(&["transaction"]))
            .into(),
            r#"apdex((sum(foo) / sum(bar)), 500){tag:"tag_value"} by (transaction)"#,
        ),
    ];
    for (query, mql) in cases {
        assert_eq!(envelope(query).serialize().unwrap().mql, mql);
    }
}

#[test]
fn serialize_collapses_or_but_print_does_not() {
    let query = envelope(by_mri("max").set_filters(Some(vec![Filter::or(vec![
        eq("transaction", "a"),
        eq("transaction", "b"),
        eq("transaction", "c"),
    ])])));
    assert_eq!(
        query.serialize().unwrap().mql,
        r#"max(d:transactions/duration@millisecond){transaction:["a", "b", "c"]}"#
    );
    assert_eq!(
        query.print().unwrap().mql,
        r#"max(d:transactions/duration@millisecond){(transaction:"a" OR transaction:"b" OR transaction:"c")}"#
    );
}

#[test]
fn serialize_context_options() {
    let query = envelope(
        Timeseries::new(Metric::mri(MRI).with_entity("generic_metrics_distributions"), "max"),
    )
    .set_rollup(
        Rollup::totals(true)
            .with_orderby(Direction::Asc)
            .with_granularity(60),
    )
    .set_limit(100)
    .set_offset(5)
    .set_indexer_mappings(
        [("d:transactions/duration@millisecond".to_string(), 123.into())]
            .into_iter()
            .collect(),
    );
    let context = query.serialize().unwrap().to_json()["mql_context"].clone();
    assert_eq!(context["entity"], json!("generic_metrics_distributions"));
    assert_eq!(
        context["rollup"],
        json!({"orderby": "ASC", "granularity": 60, "interval": null, "with_totals": "True"})
    );
    assert_eq!(context["limit"], json!(100));
    assert_eq!(context["offset"], json!(5));
    assert_eq!(
        context["indexer_mappings"],
        json!({"d:transactions/duration@millisecond": 123})
    );
}

#[test]
fn parse_then_serialize() {
    let query = parse_mql(r#"sum(transaction.duration){status_code:"500"} by transaction"#)
        .unwrap()
        .set_start(Utc.with_ymd_and_hms(2023, 1, 2, 3, 4, 5).unwrap())
        .set_end(Utc.with_ymd_and_hms(2023, 1, 16, 3, 4, 5).unwrap())
        .set_rollup(Rollup::interval(3600).with_granularity(3600))
        .set_scope(MetricsScope::new(vec![1], vec![11]));
    assert_eq!(
        query.serialize().unwrap().mql,
        r#"sum(transaction.duration){status_code:"500"} by (transaction)"#
    );

    let negated = parse_mql("-sum(transaction.duration) + -1.0").unwrap();
    let negated = MetricsQuery {
        query: negated.query,
        ..envelope(by_mri("max"))
    };
    assert_eq!(
        negated.serialize().unwrap().mql,
        "(-(sum(transaction.duration)) + -1.0)"
    );
}

// ============ Validation ============

#[test]
fn validation_errors() {
    let bare = MetricsQuery {
        query: parse_mql("foo").unwrap().query,
        ..envelope(by_mri("max"))
    };
    assert!(matches!(
        bare.serialize(),
        Err(SnqlError::Expression(e)) if e.to_string() == "aggregate must be set on a timeseries"
    ));

    let unprintable = envelope(Timeseries::new(Metric::id(123), "sum"));
    assert!(matches!(
        unprintable.serialize(),
        Err(SnqlError::InvalidQuery(msg)) if msg == "metric.mri or metric.public_name is required for serialization"
    ));

    let ordered = envelope(by_mri("max"))
        .set_rollup(Rollup::interval(3600).with_orderby(Direction::Asc).with_granularity(3600));
    assert_eq!(
        ordered.serialize().unwrap_err().to_string(),
        "Timeseries queries can't be ordered when using interval"
    );

    let starred = envelope(by_mri("max").set_filters(Some(vec![eq("bar", "baz*")])));
    assert!(matches!(
        starred.serialize(),
        Err(SnqlError::InvalidQuery(msg)) if msg == r#"value "baz*" would read back as a wildcard match"#
    ));

    let bracketed = envelope(by_mri("max").set_groupby(columns(&["tags[transaction]"])));
    assert!(matches!(bracketed.serialize(), Err(SnqlError::InvalidQuery(_))));

    let too_many = envelope(by_mri("max")).set_limit(10_001);
    assert_eq!(
        too_many.serialize().unwrap_err().to_string(),
        "limit '10001' is capped at 10,000"
    );
}

// ============ SnQL ============

#[test]
fn snql_for_parsed_query() {
    let parsed = parse_mql(r#"max(d:transactions/duration@millisecond){tags[transaction]:foo, tags[transaction]:bar}"#);
    // Square brackets are not part of tag keys in MQL.
    assert!(parsed.is_err());

    let query = envelope(
        Timeseries::new(
            Metric::mri(MRI).with_id(123).with_entity("metrics_sets"),
            "max",
        )
        .set_filters(Some(vec![eq("tags[transaction]", "foo")])),
    );
    assert_eq!(
        query.serialize_snql().unwrap(),
        "MATCH (metrics_sets) SELECT max(value) AS `aggregate_value` BY toStartOfInterval(timestamp, toIntervalSecond(3600), 'Universal') AS `time` WHERE granularity = 3600 AND metric_id = 123 AND tags[transaction] = 'foo' AND (org_id IN array(1) AND project_id IN array(11) AND use_case_id = 'transactions') AND timestamp >= toDateTime('2023-01-02T03:04:05') AND timestamp < toDateTime('2023-01-16T03:04:05') ORDER BY time ASC"
    );
    assert_eq!(query.print_snql().unwrap().lines().count(), 5);
}

#[test]
fn snql_optimizes_or_filters() {
    let query = envelope(
        Timeseries::new(
            Metric::mri(MRI).with_id(123).with_entity("metrics_sets"),
            "max",
        )
        .set_filters(Some(vec![Filter::or(vec![eq("env", "a"), eq("env", "b")])])),
    );
    assert!(
        query
            .serialize_snql()
            .unwrap()
            .contains("env IN array('a', 'b')")
    );
    assert!(
        query
            .print_snql()
            .unwrap()
            .contains("(env = 'a' OR env = 'b')")
    );
}
