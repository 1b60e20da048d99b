use page_harness::{Error, MockConnection, PageStatus, WebClient};
use proptest::collection::vec;
use proptest::prelude::*;
use proptest::test_runner::{FileFailurePersistence, TestCaseResult};

const SCRIPT_PROPTEST_REGRESSION_FILE: &str =
    "tests/proptest-regressions/script_property_fuzz_test.txt";
const DEFAULT_SCRIPT_PROPTEST_CASES: u32 = 128;

const PAGE_URL: &str = "http://localhost/fuzz.html";

fn script_proptest_cases() -> u32 {
    std::env::var("PAGE_HARNESS_PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_SCRIPT_PROPTEST_CASES)
}

fn identifier_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("a"),
        Just("b"),
        Just("x"),
        Just("value"),
        Just("items"),
        Just("state"),
        Just("_tmp"),
    ]
    .prop_map(str::to_string)
    .boxed()
}

/// Never referenced by generated expressions, so helpers cannot recurse.
fn helper_name_strategy() -> BoxedStrategy<String> {
    prop_oneof![Just("helper"), Just("other_helper")]
        .prop_map(str::to_string)
        .boxed()
}

fn literal_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("undefined".to_string()),
        Just("null".to_string()),
        Just("true".to_string()),
        Just("false".to_string()),
        any::<i16>().prop_map(|v| v.to_string()),
        Just("'x'".to_string()),
        Just("'日本語'".to_string()),
        Just("\"double\"".to_string()),
        Just("`template ${1 + 1}`".to_string()),
    ]
    .boxed()
}

fn regex_literal_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("/a/".to_string()),
        Just("/\\d+/".to_string()),
        Just("/^\\w+$/".to_string()),
        Just("/foo(?=bar)/".to_string()),
        Just("/[a-z]{1,3}/gi".to_string()),
    ]
    .boxed()
}

fn host_read_strategy() -> BoxedStrategy<String> {
    prop_oneof![
        Just("document.title".to_string()),
        Just("document.getElementById('out')".to_string()),
        Just("document.getElementById('out').textContent".to_string()),
        Just("location.pathname".to_string()),
        Just("document.forms.length".to_string()),
    ]
    .boxed()
}

fn binary_operator_strategy() -> BoxedStrategy<&'static str> {
    prop_oneof![
        Just("+"),
        Just("-"),
        Just("*"),
        Just("/"),
        Just("%"),
        Just("&&"),
        Just("||"),
        Just("==="),
        Just("!=="),
        Just("<"),
        Just(">="),
    ]
    .boxed()
}

fn expression_strategy() -> BoxedStrategy<String> {
    let leaf = prop_oneof![
        identifier_strategy(),
        literal_strategy(),
        regex_literal_strategy(),
        host_read_strategy(),
    ]
    .boxed();

    leaf.prop_recursive(4, 64, 6, |inner| {
        prop_oneof![
            inner.clone().prop_map(|expr| format!("({expr})")),
            inner.clone().prop_map(|expr| format!("!({expr})")),
            inner.clone().prop_map(|expr| format!("-({expr})")),
            (inner.clone(), binary_operator_strategy(), inner.clone())
                .prop_map(|(lhs, op, rhs)| format!("({lhs} {op} {rhs})")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(cond, left, right)| format!("({cond} ? {left} : {right})")),
            vec(inner.clone(), 0..=3).prop_map(|items| format!("[{}]", items.join(", "))),
            (inner.clone(), inner.clone())
                .prop_map(|(left, right)| format!("{{ left: {left}, right: {right} }}")),
            (identifier_strategy(), vec(inner.clone(), 0..=2))
                .prop_map(|(name, args)| format!("{name}({})", args.join(", "))),
            (inner.clone(), inner.clone()).prop_map(|(target, index)| format!("{target}[{index}]")),
            inner.clone().prop_map(|expr| format!("String({expr}).length")),
        ]
    })
    .boxed()
}

fn simple_statement_strategy() -> BoxedStrategy<String> {
    let ident = identifier_strategy();
    let expr = expression_strategy();

    prop_oneof![
        (ident.clone(), expr.clone()).prop_map(|(name, value)| format!("var {name} = {value};")),
        (ident.clone(), expr.clone()).prop_map(|(name, value)| format!("{name} = {value};")),
        expr.clone().prop_map(|value| format!("{value};")),
        expr.clone().prop_map(|value| format!("alert({value});")),
        expr.clone().prop_map(|value| {
            format!("document.getElementById('out').textContent = {value};")
        }),
    ]
    .boxed()
}

fn statement_strategy() -> BoxedStrategy<String> {
    simple_statement_strategy()
        .prop_recursive(3, 96, 6, |inner| {
            let expr = expression_strategy();
            let ident = identifier_strategy();

            prop_oneof![
                (expr.clone(), vec(inner.clone(), 1..=3), vec(inner.clone(), 0..=2)).prop_map(
                    |(cond, then_body, else_body)| {
                        format!(
                            "if ({cond}) {{ {} }} else {{ {} }}",
                            then_body.join(" "),
                            else_body.join(" ")
                        )
                    }
                ),
                (ident.clone(), 0u8..4, vec(inner.clone(), 1..=2)).prop_map(
                    |(name, end, body)| {
                        format!(
                            "for (let {name} = 0; {name} < {end}; {name}++) {{ {} }}",
                            body.join(" ")
                        )
                    }
                ),
                (expr.clone(), vec(inner.clone(), 1..=2)).prop_map(|(cond, body)| {
                    format!("while ({cond}) {{ {} break; }}", body.join(" "))
                }),
                (helper_name_strategy(), vec(inner.clone(), 1..=3)).prop_map(|(name, body)| {
                    format!(
                        "function {name}(arg) {{ {} return arg; }} {name}(1);",
                        body.join(" ")
                    )
                }),
                (vec(inner.clone(), 1..=2), vec(inner.clone(), 1..=2)).prop_map(
                    |(try_body, catch_body)| {
                        format!(
                            "try {{ {} }} catch (err) {{ {} }}",
                            try_body.join(" "),
                            catch_body.join(" ")
                        )
                    }
                ),
            ]
        })
        .boxed()
}

fn script_strategy() -> BoxedStrategy<String> {
    vec(statement_strategy(), 1..=8)
        .prop_map(|statements| statements.join("\n"))
        .boxed()
}

fn page_with_scripts(first: &str, second: &str) -> String {
    format!(
        "<html><head><title>fuzz</title></head><body>\
         <form name='f'><input name='q'></form><p id='out'></p>\
         <script>{first}</script><script>alert('second ran')</script>\
         <script>{second}</script></body></html>"
    )
}

fn load(html: &str, throw_on_script_error: bool) -> (WebClient, page_harness::PageResult) {
    let mut connection = MockConnection::new();
    connection.set_response(PAGE_URL, html);
    let mut client = WebClient::with_connection(connection);
    client.set_throw_on_script_error(throw_on_script_error);
    let result = client.load_page(PAGE_URL);
    (client, result)
}

fn assert_generated_scripts_settle(first: &str, second: &str) -> TestCaseResult {
    let html = page_with_scripts(first, second);

    let outcome = std::panic::catch_unwind(|| load(&html, true).1.status());
    prop_assert!(outcome.is_ok(), "load panicked for generated scripts:\n{first}\n---\n{second}");

    let (_, result) = load(&html, true);
    match result.status() {
        PageStatus::Idle => prop_assert!(result.error().is_none()),
        PageStatus::Failed => match result.error() {
            Some(Error::Script(err)) => prop_assert_eq!(err.url(), PAGE_URL),
            other => prop_assert!(false, "unexpected failure {other:?}"),
        },
        other => prop_assert!(false, "unexpected terminal status {other:?}"),
    }

    // With faults recorded, every task still gets its turn.
    let (mut client, result) = load(&html, false);
    prop_assert_eq!(result.status(), PageStatus::Idle);
    let errors = result.page().map_or(0, |page| page.script_errors().len());
    prop_assert!(errors <= 2, "at most one fault per failing task, got {errors}");
    prop_assert!(
        client
            .take_alert_messages()
            .iter()
            .any(|message| message == "second ran")
    );
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: script_proptest_cases(),
        failure_persistence: Some(Box::new(
            FileFailurePersistence::Direct(SCRIPT_PROPTEST_REGRESSION_FILE),
        )),
        .. ProptestConfig::default()
    })]

    #[test]
    fn generated_scripts_settle_without_panicking(
        first in script_strategy(),
        second in script_strategy(),
    ) {
        assert_generated_scripts_settle(&first, &second)?;
    }
}
