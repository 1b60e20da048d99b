use super::*;
use html::ScriptSource;
use script::{Tok, parse_handler_body, parse_program, tokenize};

fn sources(html: &str) -> Result<Vec<ScriptSource>> {
    let parsed = html::parse_html(html)?;
    Ok(parsed.scripts.into_iter().map(|script| script.source).collect())
}

#[test]
fn scripts_are_discovered_in_document_order() -> Result<()> {
    let found = sources(
        "<html><head><script>var a = 1;</script>\
         <script src=\"lib/app.js\"></script></head>\
         <body><p>text</p><script type=\"text/javascript\">var b = 2;</script>\
         <script src=\"tail.js\" /></body></html>",
    )?;
    assert_eq!(
        found,
        vec![
            ScriptSource::Inline("var a = 1;".to_string()),
            ScriptSource::External("lib/app.js".to_string()),
            ScriptSource::Inline("var b = 2;".to_string()),
            ScriptSource::External("tail.js".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn non_script_types_are_kept_in_the_dom_but_not_run() -> Result<()> {
    let html = "<script type=\"text/template\"><b>{{name}}</b></script>\
                <script type=\"module\">import x from './x.js';</script>\
                <script type=\"application/javascript; charset=utf-8\">run()</script>";
    assert_eq!(
        sources(html)?,
        vec![ScriptSource::Inline("run()".to_string())]
    );
    let parsed = html::parse_html(html)?;
    assert_eq!(parsed.dom.elements_by_tag_name(parsed.dom.root, "script").len(), 3);
    Ok(())
}

#[test]
fn script_bodies_are_raw_text() -> Result<()> {
    let found = sources("<script>if (a < b && c > d) { s = '<p>&amp;</p>'; }</script>")?;
    assert_eq!(
        found,
        vec![ScriptSource::Inline(
            "if (a < b && c > d) { s = '<p>&amp;</p>'; }".to_string()
        )]
    );
    Ok(())
}

#[test]
fn optional_end_tags_close_implicitly() -> Result<()> {
    let parsed = html::parse_html(
        "<ul id='list'><li>one<li>two</ul><p id='first'>a<div id='block'>b</div>\
         <select id='s'><option>x<option>y</select>",
    )?;
    let dom = &parsed.dom;
    let list = dom.by_id("list").ok_or_else(|| Error::ElementNotFound("list".into()))?;
    assert_eq!(dom.element_children(list).len(), 2);

    let first = dom.by_id("first").ok_or_else(|| Error::ElementNotFound("first".into()))?;
    let block = dom.by_id("block").ok_or_else(|| Error::ElementNotFound("block".into()))?;
    assert_ne!(dom.parent(block), Some(first));

    let select = dom.by_id("s").ok_or_else(|| Error::ElementNotFound("s".into()))?;
    assert_eq!(dom.element_children(select).len(), 2);
    Ok(())
}

#[test]
fn deeply_nested_markup_builds_and_serializes() -> Result<()> {
    let depth = 20_000;
    let markup = format!(
        "{}<span id='leaf'>x</span>{}<p id='after'>y</p>",
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    );
    let parsed = html::parse_html(&markup)?;
    let dom = &parsed.dom;
    let leaf = dom.by_id("leaf").ok_or_else(|| Error::ElementNotFound("leaf".into()))?;
    let after = dom.by_id("after").ok_or_else(|| Error::ElementNotFound("after".into()))?;
    assert_eq!(dom.parent(after), Some(dom.root));

    let mut levels = 0;
    let mut current = dom.parent(leaf);
    while let Some(node) = current.filter(|node| *node != dom.root) {
        levels += 1;
        current = dom.parent(node);
    }
    assert_eq!(levels, depth);
    assert_eq!(dom.text_content(dom.root), "xy");
    assert!(dom.inner_html(dom.root).ends_with("</div><p id=\"after\">y</p>"));
    Ok(())
}

#[test]
fn paragraphs_close_under_nested_blocks_near_the_insertion_point() -> Result<()> {
    let parsed = html::parse_html(&format!(
        "<p id='para'>{}<div id='inner'></div>",
        "<span>".repeat(8)
    ))?;
    let dom = &parsed.dom;
    let para = dom.by_id("para").ok_or_else(|| Error::ElementNotFound("para".into()))?;
    let inner = dom.by_id("inner").ok_or_else(|| Error::ElementNotFound("inner".into()))?;
    assert!(!dom.is_descendant_of(inner, para));
    assert_eq!(dom.parent(inner), Some(dom.root));
    Ok(())
}

#[test]
fn text_and_attributes_decode_character_references() -> Result<()> {
    let parsed = html::parse_html(
        "<p id='t' title='a &amp; b'>&lt;tag&gt; &#65;&#x42; &copy; &unknown; &amp</p>",
    )?;
    let dom = &parsed.dom;
    let node = dom.by_id("t").ok_or_else(|| Error::ElementNotFound("t".into()))?;
    assert_eq!(dom.text_content(node), "<tag> AB © &unknown; &amp");
    assert_eq!(dom.attr(node, "title").as_deref(), Some("a & b"));
    Ok(())
}

#[test]
fn void_elements_do_not_take_children() -> Result<()> {
    let parsed = html::parse_html("<form id='f'><input id='i'><span id='s'>x</span><br></form>")?;
    let dom = &parsed.dom;
    let input = dom.by_id("i").ok_or_else(|| Error::ElementNotFound("i".into()))?;
    let span = dom.by_id("s").ok_or_else(|| Error::ElementNotFound("s".into()))?;
    assert!(dom.children(input).is_empty());
    assert_eq!(dom.parent(span), dom.by_id("f"));
    Ok(())
}

#[test]
fn comments_and_doctype_are_skipped() -> Result<()> {
    let parsed = html::parse_html(
        "<!DOCTYPE html><!-- <script>hidden()</script> --><p id='p'>shown</p>",
    )?;
    assert!(parsed.scripts.is_empty());
    let node = parsed
        .dom
        .by_id("p")
        .ok_or_else(|| Error::ElementNotFound("p".into()))?;
    assert_eq!(parsed.dom.text_content(node), "shown");
    Ok(())
}

#[test]
fn malformed_markup_is_a_parse_error() {
    assert!(matches!(
        html::parse_html("<p>open <!-- never closed"),
        Err(Error::HtmlParse(_))
    ));
    assert!(matches!(
        html::parse_html("<script>var a = 1;"),
        Err(Error::HtmlParse(_))
    ));
}

#[test]
fn textarea_and_checked_state_come_from_markup() -> Result<()> {
    let parsed = html::parse_html(
        "<textarea id='t'>line &amp; more</textarea><input id='c' type='checkbox' checked>",
    )?;
    let dom = &parsed.dom;
    let textarea = dom.by_id("t").ok_or_else(|| Error::ElementNotFound("t".into()))?;
    let checkbox = dom.by_id("c").ok_or_else(|| Error::ElementNotFound("c".into()))?;
    assert_eq!(host::control_value(dom, textarea), "line & more");
    assert!(dom.element(checkbox).is_some_and(|element| element.checked));
    Ok(())
}

#[test]
fn form_owner_follows_ancestors_and_form_attribute() -> Result<()> {
    let parsed = html::parse_html(
        "<form id='f'><input id='inside'></form><input id='outside' form='f'><input id='loose'>",
    )?;
    let dom = &parsed.dom;
    let form = dom.by_id("f");
    assert_eq!(dom.by_id("inside").and_then(|node| dom.form_owner(node)), form);
    assert_eq!(dom.by_id("outside").and_then(|node| dom.form_owner(node)), form);
    assert_eq!(dom.by_id("loose").and_then(|node| dom.form_owner(node)), None);
    let controls = form.map(|form| dom.form_controls(form).len());
    assert_eq!(controls, Some(2));
    Ok(())
}

#[test]
fn tree_edits_keep_the_structure_acyclic() -> Result<()> {
    let mut dom = html::parse_html("<div id='outer'><div id='inner'></div></div><p id='p'></p>")?.dom;
    let outer = dom.by_id("outer").ok_or_else(|| Error::ElementNotFound("outer".into()))?;
    let inner = dom.by_id("inner").ok_or_else(|| Error::ElementNotFound("inner".into()))?;
    let para = dom.by_id("p").ok_or_else(|| Error::ElementNotFound("p".into()))?;

    assert!(!dom.append_child(inner, outer));
    assert!(!dom.append_child(outer, outer));
    assert!(dom.append_child(inner, para));
    assert_eq!(dom.parent(para), Some(inner));
    assert!(!dom.remove_child(outer, para));
    assert!(dom.remove_child(inner, para));
    assert_eq!(dom.parent(para), None);
    assert!(!dom.is_connected(para));
    Ok(())
}

#[test]
fn serialization_escapes_text_and_attributes() -> Result<()> {
    let mut dom = html::parse_html("<p id='p'></p>")?.dom;
    let para = dom.by_id("p").ok_or_else(|| Error::ElementNotFound("p".into()))?;
    dom.set_attr(para, "title", "say \"hi\"");
    dom.set_text_content(para, "1 < 2 & 3");
    assert_eq!(
        dom.dump_node(para),
        "<p id=\"p\" title=\"say &quot;hi&quot;\">1 &lt; 2 &amp; 3</p>"
    );
    Ok(())
}

#[test]
fn setting_a_title_creates_one_when_missing() -> Result<()> {
    let mut dom = html::parse_html("<html><head></head><body></body></html>")?.dom;
    assert_eq!(dom.title_text(), "");
    dom.set_title("Fresh");
    assert_eq!(dom.title_text(), "Fresh");
    assert_eq!(dom.elements_by_tag_name(dom.root, "title").len(), 1);
    Ok(())
}

#[test]
fn slash_is_division_or_regex_by_context() {
    let tokens = tokenize("a = b / c / d; re = /x+/gi; (e) / 2").map(|tokens| {
        tokens
            .into_iter()
            .map(|token| token.tok)
            .filter(|tok| matches!(tok, Tok::Punct("/") | Tok::Regex { .. }))
            .collect::<Vec<_>>()
    });
    assert_eq!(
        tokens,
        Ok(vec![
            Tok::Punct("/"),
            Tok::Punct("/"),
            Tok::Regex {
                pattern: "x+".to_string(),
                flags: "gi".to_string()
            },
            Tok::Punct("/"),
        ])
    );
}

#[test]
fn tokens_remember_preceding_newlines() {
    let flags = tokenize("a\nb /* multi\nline */ c d").map(|tokens| {
        tokens
            .into_iter()
            .filter(|token| matches!(token.tok, Tok::Ident(_)))
            .map(|token| token.newline_before)
            .collect::<Vec<_>>()
    });
    assert_eq!(flags, Ok(vec![false, true, true, false]));
}

#[test]
fn escapes_and_unterminated_literals() {
    let strings = tokenize(r#"'tab\there' "\x41B""#).map(|tokens| {
        tokens
            .into_iter()
            .filter_map(|token| match token.tok {
                Tok::Str(text) => Some(text),
                _ => None,
            })
            .collect::<Vec<_>>()
    });
    assert_eq!(strings, Ok(vec!["tab\there".to_string(), "AB".to_string()]));
    assert!(tokenize("'open").is_err());
    assert!(tokenize("/* open").is_err());
}

#[test]
fn programs_parse_into_statements_with_offsets() {
    let source: Rc<str> = Rc::from("var a = 1;\nfunction f() { return a; }\nf();");
    let offsets = parse_program(&source)
        .map(|statements| statements.iter().map(|stmt| stmt.offset).collect::<Vec<_>>());
    assert_eq!(offsets, Ok(vec![0, 11, 38]));
}

#[test]
fn top_level_return_is_only_allowed_in_handlers() {
    let source: Rc<str> = Rc::from("if (x) return false;");
    let err = parse_program(&source).err();
    assert_eq!(
        err.map(|err| err.message),
        Some("illegal return statement".to_string())
    );
    assert!(parse_handler_body(&source).is_ok());
}
