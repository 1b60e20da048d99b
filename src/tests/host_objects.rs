use super::*;

const FORM_PAGE: &str = r#"
<html>
<head><title>Orders</title></head>
<body>
  <form id="order" name="orderForm" action="/submit" method="get">
    <input id="qty" name="quantity" value="1">
    <input id="gift" type="checkbox" name="gift">
    <input id="express" type="radio" name="ship" value="express">
    <input id="ground" type="radio" name="ship" value="ground" checked>
    <select id="color" name="color">
      <option value="red">Red</option>
      <option value="blue" selected>Blue</option>
    </select>
    <textarea id="note" name="note">hello</textarea>
    <input id="skip" name="skipped" value="x" disabled>
    <button id="send" type="submit">Send</button>
  </form>
  <p id="out"></p>
  <a id="link" href="next.html">next</a>
</body>
</html>
"#;

#[test]
fn document_surface_reads_the_dom() -> Result<()> {
    let mut bench = ScriptBench::new(FORM_PAGE)?;
    bench.run(
        "alert(document.title);\n\
         alert(document.getElementById('qty').value);\n\
         alert(document.getElementsByTagName('input').length);\n\
         alert(document.forms.length);\n\
         alert(document.orderForm.id);\n\
         alert(document.getElementById('missing') === null);\n\
         alert(document.body.tagName);\n\
         alert(document.URL);",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec![
            "Orders",
            "1",
            "5",
            "1",
            "order",
            "true",
            "BODY",
            "http://localhost/page.html"
        ]
    );
    Ok(())
}

#[test]
fn wrappers_are_identity_stable_within_a_session() -> Result<()> {
    let mut bench = ScriptBench::new(FORM_PAGE)?;
    bench.run(
        "const a = document.getElementById('out');\n\
         const b = document.getElementsByTagName('p')[0];\n\
         alert(a === b);\n\
         a.custom = 'kept';\n\
         alert(document.getElementById('out').custom);",
    )?;
    assert_eq!(bench.take_alerts(), vec!["true", "kept"]);
    assert_eq!(bench.session.runtime.wrappers.len(), 1);
    Ok(())
}

#[test]
fn title_and_text_writes_update_the_dom() -> Result<()> {
    let mut bench = ScriptBench::new(FORM_PAGE)?;
    bench.run(
        "document.title = 'Changed';\n\
         document.getElementById('out').textContent = 'done';\n\
         document.getElementById('qty').value = 5;",
    )?;
    assert_eq!(bench.session.dom.title_text(), "Changed");
    assert_eq!(bench.text("out")?, "done");
    let qty = bench.session.dom.by_id("qty");
    assert_eq!(
        qty.map(|node| host::control_value(&bench.session.dom, node)),
        Some("5".to_string())
    );
    Ok(())
}

#[test]
fn attributes_and_tree_navigation() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><div id='box' class='a'><span id='first'>1</span><span id='second'>2</span></div></body>",
    )?;
    bench.run(
        "const box = document.getElementById('box');\n\
         alert(box.getAttribute('class') + '|' + box.className);\n\
         box.setAttribute('data-x', 'y');\n\
         alert(box.hasAttribute('data-x'));\n\
         box.removeAttribute('class');\n\
         alert(box.getAttribute('class'));\n\
         alert(box.firstChild.id + ',' + box.lastChild.id);\n\
         alert(box.children.length + ':' + box.firstChild.nextSibling.textContent);\n\
         alert(document.getElementById('second').parentNode === box);",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec!["a|a", "true", "null", "first,second", "2:2", "true"]
    );
    Ok(())
}

#[test]
fn create_append_and_remove_nodes() -> Result<()> {
    let mut bench = ScriptBench::new("<body><ul id='list'></ul></body>")?;
    bench.run(
        "const list = document.getElementById('list');\n\
         for (let i = 1; i <= 3; i++) {\n\
           const item = document.createElement('LI');\n\
           item.appendChild(document.createTextNode('item ' + i));\n\
           list.appendChild(item);\n\
         }\n\
         list.removeChild(list.firstChild);\n\
         alert(list.childNodes.length);\n\
         alert(list.firstChild.tagName);",
    )?;
    assert_eq!(bench.take_alerts(), vec!["2", "LI"]);
    assert_eq!(bench.text("list")?, "item 2item 3");

    let fault = bench.fault(
        "const list = document.getElementById('list');\n\
         list.removeChild(document.body);",
    );
    assert_eq!(fault.kind(), FaultKind::Thrown);
    Ok(())
}

#[test]
fn inner_html_parses_markup_without_running_scripts() -> Result<()> {
    let mut bench = ScriptBench::new("<body><div id='mount'></div></body>")?;
    bench.run(
        "const mount = document.getElementById('mount');\n\
         mount.innerHTML = '<b id=\"bold\">hi</b><script>alert(\"nope\")</script>';\n\
         alert(document.getElementById('bold').textContent);\n\
         alert(mount.innerHTML.indexOf('<b id=\"bold\">hi</b>') === 0);",
    )?;
    assert_eq!(bench.take_alerts(), vec!["hi", "true"]);
    Ok(())
}

#[test]
fn form_controls_expose_state() -> Result<()> {
    let mut bench = ScriptBench::new(FORM_PAGE)?;
    bench.run(
        "const form = document.getElementById('order');\n\
         alert(form.quantity.value + ',' + form.elements.length);\n\
         alert(form.color.value);\n\
         alert(document.getElementById('ground').checked + ',' + document.getElementById('express').checked);\n\
         document.getElementById('express').checked = true;\n\
         alert(document.getElementById('ground').checked);\n\
         alert(document.getElementById('qty').form === form);\n\
         alert(document.getElementById('skip').disabled);\n\
         alert(document.getElementById('gift').type + ',' + document.getElementById('send').type);",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec!["1,8", "blue", "true,false", "false", "true", "true", "checkbox,submit"]
    );
    Ok(())
}

#[test]
fn form_data_skips_unsuccessful_controls() -> Result<()> {
    let bench = ScriptBench::new(FORM_PAGE)?;
    let dom = &bench.session.dom;
    let form = dom.by_id("order").ok_or_else(|| Error::ElementNotFound("order".into()))?;
    let pairs = host::form_data(dom, form);
    assert_eq!(
        pairs,
        vec![
            ("quantity".to_string(), "1".to_string()),
            ("ship".to_string(), "ground".to_string()),
            ("color".to_string(), "blue".to_string()),
            ("note".to_string(), "hello".to_string()),
        ]
    );

    let request = host::form_request(dom, &bench.session.url, form)
        .ok_or_else(|| Error::InvalidUrl("form action".into()))?;
    assert_eq!(request.method, HttpMethod::Get);
    assert_eq!(
        request.url.as_str(),
        "http://localhost/submit?quantity=1&ship=ground&color=blue&note=hello"
    );
    Ok(())
}

#[test]
fn post_forms_carry_form_data() -> Result<()> {
    let bench = ScriptBench::new(
        "<form id='f' method='POST'><input name='q' value='a b'></form>",
    )?;
    let dom = &bench.session.dom;
    let form = dom.by_id("f").ok_or_else(|| Error::ElementNotFound("f".into()))?;
    let request = host::form_request(dom, &bench.session.url, form)
        .ok_or_else(|| Error::InvalidUrl("form action".into()))?;
    assert_eq!(request.method, HttpMethod::Post);
    assert_eq!(request.url.as_str(), PAGE_URL);
    assert_eq!(request.form_data, vec![("q".to_string(), "a b".to_string())]);
    Ok(())
}

#[test]
fn inline_handlers_run_before_listeners_and_bubble() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><div id='outer' onclick=\"alert('outer attr')\">\
         <button id='inner' onclick=\"alert('inner attr ' + event.type)\">go</button></div></body>",
    )?;
    bench.run(
        "const inner = document.getElementById('inner');\n\
         inner.addEventListener('click', function (e) { alert('listener ' + (this === inner) + ' ' + (e.target === inner)); });\n\
         inner.click();",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec!["inner attr click", "listener true true", "outer attr"]
    );
    Ok(())
}

#[test]
fn script_assigned_handler_replaces_the_attribute() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><button id='b' onclick=\"alert('attr')\">go</button></body>",
    )?;
    bench.run(
        "const b = document.getElementById('b');\n\
         alert(typeof b.onclick);\n\
         b.onclick = function () { alert('assigned'); };\n\
         b.click();",
    )?;
    assert_eq!(bench.take_alerts(), vec!["function", "assigned"]);
    Ok(())
}

#[test]
fn cancelled_checkbox_click_reverts_the_toggle() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><input id='c' type='checkbox' onclick='return false'>\
         <input id='d' type='checkbox'></body>",
    )?;
    bench.run(
        "document.getElementById('c').click();\n\
         document.getElementById('d').click();\n\
         alert(document.getElementById('c').checked + ',' + document.getElementById('d').checked);",
    )?;
    assert_eq!(bench.take_alerts(), vec!["false,true"]);
    Ok(())
}

#[test]
fn location_reads_parts_of_the_page_url() -> Result<()> {
    let mut bench = ScriptBench::blank()?;
    bench.session.url = parse_url("http://example.com:8080/path/file.html?x=1#top")?;
    bench.run(
        "alert(location.protocol + '|' + location.host + '|' + location.hostname + '|' + location.port);\n\
         alert(location.pathname + '|' + location.search + '|' + location.hash);\n\
         alert(window.location.href === document.location.href);\n\
         alert('' + location);",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec![
            "http:|example.com:8080|example.com|8080",
            "/path/file.html|?x=1|#top",
            "true",
            "http://example.com:8080/path/file.html?x=1#top"
        ]
    );
    Ok(())
}

#[test]
fn hash_writes_update_the_url_in_place() -> Result<()> {
    let mut bench = ScriptBench::blank()?;
    bench.run("location.hash = 'section2';")?;
    assert_eq!(bench.session.url.as_str(), "http://localhost/page.html#section2");
    assert!(!bench.session.gate.has_pending());
    Ok(())
}

#[test]
fn location_writes_only_record_a_request() -> Result<()> {
    let mut bench = ScriptBench::blank()?;
    bench.run(
        "location = 'a.html';\n\
         alert('still running');\n\
         location.href = 'b.html';",
    )?;
    assert_eq!(bench.take_alerts(), vec!["still running"]);
    assert_eq!(bench.session.url.as_str(), PAGE_URL);
    let pending = bench.session.gate.consume_pending();
    assert_eq!(
        pending.map(|navigation| navigation.request.url.to_string()),
        Some("http://localhost/b.html".to_string())
    );
    Ok(())
}

#[test]
fn anchors_resolve_href_and_javascript_links_run_inline() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><a id='rel' href='docs/intro.html'>docs</a>\
         <a id='js' href=\"javascript:alert('from link')\">run</a></body>",
    )?;
    bench.run(
        "alert(document.getElementById('rel').href);\n\
         document.getElementById('js').click();",
    )?;
    assert_eq!(
        bench.take_alerts(),
        vec!["http://localhost/docs/intro.html", "from link"]
    );
    assert!(!bench.session.gate.has_pending());
    Ok(())
}

#[test]
fn focus_moves_between_elements_with_events() -> Result<()> {
    let mut bench = ScriptBench::new(
        "<body><input id='a' onfocus=\"alert('focus a')\" onblur=\"alert('blur a')\">\
         <input id='b' onfocus=\"alert('focus b')\"></body>",
    )?;
    bench.run(
        "document.getElementById('a').focus();\n\
         document.getElementById('b').focus();",
    )?;
    assert_eq!(bench.take_alerts(), vec!["focus a", "blur a", "focus b"]);
    assert_eq!(bench.session.focused, bench.session.dom.by_id("b"));
    Ok(())
}

#[test]
fn console_output_goes_to_the_trace() -> Result<()> {
    let mut bench = ScriptBench::blank()?;
    bench.trace.enabled = true;
    bench.trace.to_stderr = false;
    bench.run("console.log('value', 42);")?;
    let logs = bench.trace.take();
    assert!(logs.iter().any(|line| line == "[console] log: value 42"));
    Ok(())
}
