use super::*;

const NEXT_URL: &str = "http://localhost/next.html";

fn script_error(result: &PageResult) -> Option<&ScriptExecutionError> {
    match result.error() {
        Some(Error::Script(err)) => Some(err),
        _ => None,
    }
}

#[test]
fn location_change_drops_the_rest_of_the_queue_and_onload() -> Result<()> {
    let (mut client, connection) = client_with(&[
        (
            PAGE_URL,
            "<html><body onload=\"alert('onload')\">\
             <script>alert('first')</script>\
             <script>location = 'next.html'; alert('same task continues');</script>\
             <script>alert('third')</script>\
             <script src='late.js'></script>\
             </body></html>",
        ),
        (NEXT_URL, "<html><body><script>alert('next page')</script></body></html>"),
    ]);
    let result = client.load_page(PAGE_URL);
    assert!(result.is_idle());
    assert_eq!(result.final_url(), NEXT_URL);
    assert_eq!(
        client.take_alert_messages(),
        vec!["first", "same task continues", "next page"]
    );
    assert_eq!(connection.requested_urls(), vec![PAGE_URL, NEXT_URL]);
    Ok(())
}

#[test]
fn last_navigation_request_in_a_task_wins() -> Result<()> {
    let (mut client, _) = client_with(&[
        (
            PAGE_URL,
            "<script>location.href = 'a.html'; location.replace('next.html');</script>",
        ),
        (NEXT_URL, "<p id='landed'>here</p>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.url(), NEXT_URL);
    assert!(page.element_exists("landed"));
    Ok(())
}

#[test]
fn navigation_starts_a_fresh_session_without_old_globals() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<script>var carried = 1; location = 'next.html';</script>"),
        (NEXT_URL, "<script>alert(typeof carried)</script>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.session_id(), 2);
    assert_eq!(client.take_alert_messages(), vec!["undefined"]);
    Ok(())
}

#[test]
fn missing_external_script_fails_with_the_script_url() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<body><p id='status'>start</p>\
         <script>document.getElementById('status').textContent = 'ran';</script>\
         <script src='missing.js'></script>\
         <script>alert('never')</script></body>",
    )]);
    let result = client.load_page(PAGE_URL);
    assert_eq!(result.status(), PageStatus::Failed);
    let err = script_error(&result).ok_or_else(|| Error::InvalidUrl("no script error".into()))?;
    assert_eq!(err.url(), "http://localhost/missing.js");
    assert_eq!(err.fetch_failure().and_then(FetchFailure::status_code), Some(404));
    assert!(client.take_alert_messages().is_empty());

    let page = result.into_page().ok_or_else(|| Error::InvalidUrl("no page".into()))?;
    assert_eq!(page.text_content("status")?, "ran");
    assert_eq!(page.status(), PageStatus::Failed);
    Ok(())
}

#[test]
fn external_script_runs_in_the_shared_global_scope() -> Result<()> {
    let mut connection = MockConnection::new();
    connection.set_response(
        PAGE_URL,
        "<script src='lib.js'></script><script>alert(helper())</script>",
    );
    connection.set_response_full(
        "http://localhost/lib.js",
        "function helper() { return 'from lib'; }",
        200,
        "OK",
        "text/javascript",
    );
    let mut client = WebClient::with_connection(connection);
    client.get_page(PAGE_URL)?;
    assert_eq!(client.take_alert_messages(), vec!["from lib"]);
    Ok(())
}

#[test]
fn external_script_fault_reports_the_script_url() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<script src='broken.js'></script>"),
        ("http://localhost/broken.js", "let a = 1;\nnope();"),
    ]);
    let result = client.load_page(PAGE_URL);
    let err = script_error(&result).ok_or_else(|| Error::InvalidUrl("no script error".into()))?;
    assert_eq!(err.url(), "http://localhost/broken.js");
    let fault = err
        .runtime_fault()
        .ok_or_else(|| Error::InvalidUrl("no runtime fault".into()))?;
    assert_eq!(fault.kind(), FaultKind::Reference);
    assert_eq!(fault.location().map(|location| location.line), Some(2));
    Ok(())
}

#[test]
fn inline_fault_reports_the_page_url() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<script>alert('before')</script><script>throw new TypeError('bad');</script>\
         <script>alert('after')</script>",
    )]);
    let result = client.load_page(PAGE_URL);
    assert_eq!(result.status(), PageStatus::Failed);
    assert_eq!(result.final_url(), PAGE_URL);
    let err = script_error(&result).ok_or_else(|| Error::InvalidUrl("no script error".into()))?;
    assert_eq!(err.url(), PAGE_URL);
    assert_eq!(err.runtime_fault().map(RuntimeFault::kind), Some(FaultKind::Type));
    assert_eq!(client.take_alert_messages(), vec!["before"]);
    Ok(())
}

#[test]
fn recorded_faults_let_later_scripts_run() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<script>missing();</script><script>alert('still here')</script>",
    )]);
    client.set_throw_on_script_error(false);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.status(), PageStatus::Idle);
    assert_eq!(page.script_errors().len(), 1);
    assert_eq!(page.script_errors()[0].url(), PAGE_URL);
    assert_eq!(client.take_alert_messages(), vec!["still here"]);
    Ok(())
}

#[test]
fn script_fetch_failures_abort_even_when_faults_are_recorded() -> Result<()> {
    let (mut client, _) = client_with(&[(PAGE_URL, "<script src='gone.js'></script>")]);
    client.set_throw_on_script_error(false);
    let result = client.load_page(PAGE_URL);
    assert_eq!(result.status(), PageStatus::Failed);
    assert!(script_error(&result).is_some_and(|err| err.fetch_failure().is_some()));
    Ok(())
}

#[test]
fn page_fetch_failures_leave_no_page() -> Result<()> {
    let mut connection = MockConnection::new();
    connection.set_io_failure(PAGE_URL, "connection reset");
    let mut client = WebClient::with_connection(connection);

    let result = client.load_page(PAGE_URL);
    assert_eq!(result.status(), PageStatus::Failed);
    assert!(result.page().is_none());
    match result.into_error() {
        Some(Error::Load(err)) => {
            assert_eq!(err.url(), PAGE_URL);
            assert_eq!(
                err.cause(),
                &FetchFailure::Io {
                    message: "connection reset".to_string()
                }
            );
        }
        other => panic!("expected load error, got {other:?}"),
    }

    let result = client.load_page("http://localhost/absent.html");
    match result.error() {
        Some(Error::Load(err)) => assert_eq!(err.status_code(), Some(404)),
        other => panic!("expected load error, got {other:?}"),
    }
    Ok(())
}

#[test]
fn navigation_to_a_missing_page_fails_with_the_target_url() -> Result<()> {
    let (mut client, _) = client_with(&[(PAGE_URL, "<script>location = 'nowhere.html'</script>")]);
    let result = client.load_page(PAGE_URL);
    assert_eq!(result.status(), PageStatus::Failed);
    assert_eq!(result.final_url(), "http://localhost/nowhere.html");
    assert!(matches!(result.error(), Some(Error::Load(_))));
    Ok(())
}

#[test]
fn invalid_urls_are_rejected_before_fetching() -> Result<()> {
    let (mut client, connection) = client_with(&[]);
    let result = client.load_page("not a url");
    assert!(matches!(result.error(), Some(Error::InvalidUrl(_))));
    assert_eq!(connection.request_count(), 0);
    Ok(())
}

#[test]
fn redirects_are_followed_and_the_final_url_is_the_page_url() -> Result<()> {
    let mut connection = MockConnection::new();
    connection.set_redirect("http://localhost/old.html", "/new.html", 301);
    connection.set_response(
        "http://localhost/new.html",
        "<script>alert(location.pathname)</script>",
    );
    let mut client = WebClient::with_connection(connection);
    let page = client.get_page("http://localhost/old.html")?;
    assert_eq!(page.url(), "http://localhost/new.html");
    assert_eq!(client.take_alert_messages(), vec!["/new.html"]);
    Ok(())
}

#[test]
fn redirect_loops_stop_at_the_limit() -> Result<()> {
    let mut connection = MockConnection::new();
    connection.set_redirect("http://localhost/a.html", "/b.html", 302);
    connection.set_redirect("http://localhost/b.html", "/a.html", 302);
    let connection = Arc::new(connection);
    let mut client = WebClient::new(connection.clone());
    client.set_max_redirects(3);

    let result = client.load_page("http://localhost/a.html");
    match result.error() {
        Some(Error::Load(err)) => {
            assert!(err.cause().to_string().contains("too many redirects"));
        }
        other => panic!("expected load error, got {other:?}"),
    }
    assert_eq!(connection.request_count(), 4);
    Ok(())
}

#[test]
fn navigation_loops_stop_at_the_limit() -> Result<()> {
    let (mut client, connection) =
        client_with(&[(PAGE_URL, "<script>location.reload()</script>")]);
    client.set_max_navigations(3);
    let result = client.load_page(PAGE_URL);
    assert_eq!(
        result.error(),
        Some(&Error::NavigationLimit {
            url: PAGE_URL.to_string(),
            limit: 3,
        })
    );
    assert_eq!(connection.request_count(), 4);
    Ok(())
}

#[test]
fn body_onload_runs_after_every_script() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<body onload=\"alert('loaded ' + document.readyState)\">\
         <script>alert('script ' + document.readyState)</script>\
         <p>text</p><script>alert('second')</script></body>",
    )]);
    client.get_page(PAGE_URL)?;
    assert_eq!(
        client.take_alert_messages(),
        vec!["script loading", "second", "loaded complete"]
    );
    Ok(())
}

#[test]
fn assigned_window_onload_replaces_the_body_attribute() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<body onload=\"alert('attribute')\">\
         <script>window.onload = function () { alert('assigned ' + (this === window)); };\n\
         window.addEventListener('load', function (e) { alert('listener ' + e.type); });</script>\
         </body>",
    )]);
    client.get_page(PAGE_URL)?;
    assert_eq!(
        client.take_alert_messages(),
        vec!["assigned true", "listener load"]
    );
    Ok(())
}

#[test]
fn load_handlers_without_a_body_attribute_still_fire() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<script>onload = function () { alert('window load'); };</script>",
    )]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(client.take_alert_messages(), vec!["window load"]);

    // Later actions on the same page do not fire load again.
    let result = client.execute_script(page, "alert('later')");
    assert!(result.is_idle());
    assert_eq!(client.take_alert_messages(), vec!["later"]);
    Ok(())
}

#[test]
fn onload_can_navigate() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<body onload=\"location = 'next.html'\"></body>"),
        (NEXT_URL, "<title>Next</title>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.url(), NEXT_URL);
    assert_eq!(page.title_text(), "Next");
    Ok(())
}

#[test]
fn script_urls_assigned_to_location_run_in_place() -> Result<()> {
    let (mut client, connection) = client_with(&[(
        PAGE_URL,
        "<script>alert('a'); location.href = 'javascript:alert(1)';</script>\
         <script>location.assign(' JavaScript:alert(2)'); location = 'javascript:alert(3)';</script>\
         <script>alert('still here')</script>",
    )]);
    let result = client.load_page(PAGE_URL);
    assert!(result.is_idle());
    assert_eq!(result.final_url(), PAGE_URL);
    assert_eq!(
        client.take_alert_messages(),
        vec!["a", "1", "2", "3", "still here"]
    );
    assert_eq!(connection.requested_urls(), vec![PAGE_URL]);
    Ok(())
}

#[test]
fn clicking_a_link_navigates() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<a id='go' href='next.html'>next</a>"),
        (NEXT_URL, "<p id='arrived'>ok</p>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.session_id(), 1);
    let page = client.click(page, "go").into_result()?;
    assert_eq!(page.url(), NEXT_URL);
    assert_eq!(page.session_id(), 2);
    assert!(page.element_exists("arrived"));
    Ok(())
}

#[test]
fn clicking_a_missing_element_keeps_the_page() -> Result<()> {
    let (mut client, _) = client_with(&[(PAGE_URL, "<p id='here'>x</p>")]);
    let page = client.get_page(PAGE_URL)?;
    let result = client.click(page, "absent");
    assert_eq!(
        result.error(),
        Some(&Error::ElementNotFound("absent".to_string()))
    );
    let page = result.into_page().ok_or_else(|| Error::InvalidUrl("no page".into()))?;
    assert!(page.element_exists("here"));
    Ok(())
}

#[test]
fn click_handlers_update_the_page_in_place() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<button id='inc' onclick=\"count++; document.getElementById('n').textContent = count\">+</button>\
         <span id='n'>0</span><script>var count = 0;</script>",
    )]);
    let page = client.get_page(PAGE_URL)?;
    let page = client.click(page, "inc").into_result()?;
    let page = client.click(page, "inc").into_result()?;
    assert_eq!(page.text_content("n")?, "2");
    assert_eq!(page.session_id(), 1);
    Ok(())
}

#[test]
fn submitting_a_get_form_encodes_the_query() -> Result<()> {
    let (mut client, connection) = client_with(&[
        (
            PAGE_URL,
            "<form id='search' action='/search'>\
             <input name='q' value='rust lang'><input type='checkbox' name='exact' checked>\
             </form>",
        ),
        ("http://localhost/search", "<p id='results'>found</p>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    let page = client.submit(page, "search").into_result()?;
    assert_eq!(page.url(), "http://localhost/search?q=rust+lang&exact=on");
    assert_eq!(
        connection.last_request().map(|request| request.method),
        Some(HttpMethod::Get)
    );
    Ok(())
}

#[test]
fn submit_buttons_post_forms_and_redirects_turn_into_get() -> Result<()> {
    let mut connection = MockConnection::new();
    connection.set_response(
        PAGE_URL,
        "<form method='post' action='/save'><input name='title' value='draft'>\
         <button id='save'>Save</button></form>",
    );
    connection.set_redirect("http://localhost/save", "/saved.html", 303);
    connection.set_response("http://localhost/saved.html", "<p id='ok'>saved</p>");
    let connection = Arc::new(connection);
    let mut client = WebClient::new(connection.clone());

    let page = client.get_page(PAGE_URL)?;
    let page = client.click(page, "save").into_result()?;
    assert_eq!(page.url(), "http://localhost/saved.html");

    let requests = connection.requests();
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[1].method, HttpMethod::Post);
    assert_eq!(
        requests[1].form_data,
        vec![("title".to_string(), "draft".to_string())]
    );
    assert_eq!(requests[2].method, HttpMethod::Get);
    assert!(requests[2].form_data.is_empty());
    Ok(())
}

#[test]
fn cancelled_submit_stays_on_the_page() -> Result<()> {
    let (mut client, connection) = client_with(&[(
        PAGE_URL,
        "<form id='f' action='/never' onsubmit=\"alert('checked'); return false\">\
         <input name='x' value='1'></form>",
    )]);
    let page = client.get_page(PAGE_URL)?;
    let result = client.submit(page, "f");
    assert!(result.is_idle());
    assert_eq!(result.final_url(), PAGE_URL);
    assert_eq!(client.take_alert_messages(), vec!["checked"]);
    assert_eq!(connection.request_count(), 1);
    Ok(())
}

#[test]
fn caller_focus_and_blur_fire_handlers() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<input id='name' onfocus=\"alert('in')\" onblur=\"alert('out')\">",
    )]);
    let page = client.get_page(PAGE_URL)?;
    let page = client.focus(page, "name").into_result()?;
    assert_eq!(page.focused_element().as_deref(), Some("name"));
    let page = client.blur(page, "name").into_result()?;
    assert_eq!(page.focused_element(), None);
    assert_eq!(client.take_alert_messages(), vec!["in", "out"]);
    Ok(())
}

#[test]
fn execute_script_runs_against_the_settled_page() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<script>var greeting = 'hi';</script><p id='p'></p>"),
        (NEXT_URL, "<title>Next</title>"),
    ]);
    let page = client.get_page(PAGE_URL)?;
    let page = client
        .execute_script(
            page,
            "document.getElementById('p').textContent = greeting + ' ' + document.readyState;",
        )
        .into_result()?;
    assert_eq!(page.text_content("p")?, "hi complete");

    let page = client.execute_script(page, "location.assign('next.html')").into_result()?;
    assert_eq!(page.url(), NEXT_URL);
    assert_eq!(page.title_text(), "Next");
    Ok(())
}

#[test]
fn hash_change_keeps_the_session() -> Result<()> {
    let (mut client, connection) =
        client_with(&[(PAGE_URL, "<script>location.hash = '#part'; alert(location.hash)</script>")]);
    let page = client.get_page(PAGE_URL)?;
    assert_eq!(page.url(), "http://localhost/page.html#part");
    assert_eq!(page.session_id(), 1);
    assert_eq!(connection.request_count(), 1);
    assert_eq!(client.take_alert_messages(), vec!["#part"]);
    Ok(())
}

#[test]
fn lifecycle_trace_names_each_transition() -> Result<()> {
    let (mut client, _) = client_with(&[
        (PAGE_URL, "<script>location = 'next.html'</script><script>1</script>"),
        (NEXT_URL, "<p>done</p>"),
    ]);
    client.enable_trace(true);
    client.set_trace_stderr(false);
    client.get_page(PAGE_URL)?;
    let logs = client.take_trace_logs();
    let has = |needle: &str| logs.iter().any(|line| line.contains(needle));
    assert!(has("[lifecycle] Loading http://localhost/page.html"));
    assert!(has("1 pending task(s) dropped"));
    assert!(has("[lifecycle] Navigated (Assign)"));
    assert!(has("[lifecycle] Idle http://localhost/next.html (session 2)"));
    assert!(has("[fetch] GET http://localhost/next.html"));
    Ok(())
}

#[test]
fn trace_categories_can_be_silenced() -> Result<()> {
    let (mut client, _) = client_with(&[(PAGE_URL, "<p>plain</p>")]);
    client.enable_trace(true);
    client.set_trace_stderr(false);
    client.set_trace_fetch(false);
    client.set_trace_lifecycle(false);
    client.get_page(PAGE_URL)?;
    let logs = client.take_trace_logs();
    assert!(logs.iter().all(|line| !line.starts_with("[fetch]")));
    assert!(logs.iter().all(|line| !line.starts_with("[lifecycle]")));
    Ok(())
}

#[test]
fn invalid_configuration_is_rejected() -> Result<()> {
    let (mut client, _) = client_with(&[]);
    assert!(matches!(
        client.set_call_depth_limit(0),
        Err(Error::InvalidConfig(_))
    ));
    assert!(matches!(
        client.set_trace_log_limit(0),
        Err(Error::InvalidConfig(_))
    ));
    client.set_call_depth_limit(8)?;
    client.set_trace_log_limit(2)?;
    Ok(())
}

#[test]
fn call_depth_limit_applies_to_new_pages() -> Result<()> {
    let (mut client, _) = client_with(&[(
        PAGE_URL,
        "<script>function down(n) { return n === 0 ? 0 : down(n - 1); } alert(down(20));</script>",
    )]);
    client.set_call_depth_limit(8)?;
    let result = client.load_page(PAGE_URL);
    let err = script_error(&result).ok_or_else(|| Error::InvalidUrl("no script error".into()))?;
    assert_eq!(err.runtime_fault().map(RuntimeFault::kind), Some(FaultKind::Range));

    client.set_call_depth_limit(64)?;
    client.get_page(PAGE_URL)?;
    assert_eq!(client.take_alert_messages(), vec!["0"]);
    Ok(())
}
