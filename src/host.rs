//! Script-visible host objects backed by the page session's DOM.
//!
//! Every host object answers the same capability set (`get`, `set`,
//! `invoke`). Node wrappers are dispatched by node kind; kinds with extra
//! surface (forms, controls, anchors) fall back to the plain element surface.

use super::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct WrapperId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum HostRef {
    Window,
    Document,
    Location,
    Console,
    Node(WrapperId),
}

impl HostRef {
    pub(crate) fn object_tag(self) -> &'static str {
        match self {
            Self::Window => "[object Window]",
            Self::Document => "[object HTMLDocument]",
            Self::Location => "[object Location]",
            Self::Console => "[object Console]",
            Self::Node(_) => "[object HTMLElement]",
        }
    }
}

/// Lazily created, identity-stable wrappers: one per DOM node per session.
#[derive(Debug, Default)]
pub(crate) struct WrapperRegistry {
    by_node: HashMap<NodeId, WrapperId>,
    nodes: Vec<NodeId>,
}

impl WrapperRegistry {
    pub(crate) fn wrap(&mut self, node: NodeId) -> WrapperId {
        if let Some(id) = self.by_node.get(&node) {
            return *id;
        }
        let id = WrapperId(self.nodes.len());
        self.nodes.push(node);
        self.by_node.insert(node, id);
        id
    }

    pub(crate) fn node(&self, id: WrapperId) -> Option<NodeId> {
        self.nodes.get(id.0).copied()
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }
}

pub(crate) trait HostCapabilities {
    fn has_method(&self, name: &str) -> bool;

    /// `None` means the name is not part of this object's surface.
    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>>;

    /// `false` means the write was not handled and becomes an expando.
    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool>;

    /// Only called for names accepted by `has_method`.
    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value>;
}

fn arg(args: &[Value], index: usize) -> Value {
    args.get(index).cloned().unwrap_or(Value::Undefined)
}

fn text_arg(it: &Interpreter<'_>, args: &[Value], index: usize) -> String {
    it.stringify(&arg(args, index))
}

pub(crate) fn node_value(it: &mut Interpreter<'_>, node: NodeId) -> Value {
    if node == it.session.dom.root {
        return Value::Host(HostRef::Document);
    }
    Value::Host(HostRef::Node(it.session.runtime.wrappers.wrap(node)))
}

fn optional_node(it: &mut Interpreter<'_>, node: Option<NodeId>) -> Value {
    match node {
        Some(node) => node_value(it, node),
        None => Value::Null,
    }
}

fn node_list(it: &mut Interpreter<'_>, nodes: Vec<NodeId>) -> Value {
    let items = nodes.into_iter().map(|node| node_value(it, node)).collect();
    new_array(items)
}

pub(crate) fn node_of(it: &Interpreter<'_>, value: &Value) -> Option<NodeId> {
    match value {
        Value::Host(HostRef::Node(id)) => it.session.runtime.wrappers.node(*id),
        Value::Host(HostRef::Document) => Some(it.session.dom.root),
        _ => None,
    }
}

fn host_of_node(it: &mut Interpreter<'_>, node: NodeId) -> HostRef {
    match node_value(it, node) {
        Value::Host(host_ref) => host_ref,
        _ => HostRef::Document,
    }
}

fn method(host_ref: HostRef, name: &str) -> Value {
    Value::Method {
        this: Box::new(Value::Host(host_ref)),
        name: Rc::from(name),
    }
}

enum HostObject {
    Window(WindowHost),
    Document(DocumentHost),
    Location(LocationHost),
    Console(ConsoleHost),
    Element(ElementHost),
    Form(FormHost),
    Control(ControlHost),
    Anchor(AnchorHost),
    Text(TextHost),
}

impl HostObject {
    fn resolve(it: &Interpreter<'_>, host_ref: HostRef) -> Self {
        match host_ref {
            HostRef::Window => Self::Window(WindowHost),
            HostRef::Document => Self::Document(DocumentHost),
            HostRef::Location => Self::Location(LocationHost),
            HostRef::Console => Self::Console(ConsoleHost),
            HostRef::Node(id) => {
                let dom = &it.session.dom;
                let Some(node) = it.session.runtime.wrappers.node(id) else {
                    return Self::Document(DocumentHost);
                };
                if node == dom.root {
                    return Self::Document(DocumentHost);
                }
                match dom.tag_name(node) {
                    None => Self::Text(TextHost(node)),
                    Some("form") => Self::Form(FormHost(node)),
                    Some("input" | "textarea" | "select" | "button") => {
                        Self::Control(ControlHost(node))
                    }
                    Some("a" | "area") => Self::Anchor(AnchorHost(node)),
                    Some(_) => Self::Element(ElementHost(node)),
                }
            }
        }
    }

    fn capabilities(&self) -> &dyn HostCapabilities {
        match self {
            Self::Window(host) => host,
            Self::Document(host) => host,
            Self::Location(host) => host,
            Self::Console(host) => host,
            Self::Element(host) => host,
            Self::Form(host) => host,
            Self::Control(host) => host,
            Self::Anchor(host) => host,
            Self::Text(host) => host,
        }
    }
}

pub(crate) fn host_get(it: &mut Interpreter<'_>, host_ref: HostRef, name: &str) -> Flow<Value> {
    let object = HostObject::resolve(it, host_ref);
    let capabilities = object.capabilities();
    if let Some(value) = it.session.runtime.expando(host_ref, name) {
        return Ok(value);
    }
    if capabilities.has_method(name) {
        return Ok(method(host_ref, name));
    }
    if let Some(value) = capabilities.get(it, name)? {
        return Ok(value);
    }
    // Inline handler attributes read back as functions.
    if let (Some(event), HostRef::Node(_)) = (name.strip_prefix("on"), host_ref) {
        if let Some(node) = node_of(it, &Value::Host(host_ref)) {
            if let Some(source) = it.session.dom.attr(node, &format!("on{event}")) {
                return it.compile_handler(&source);
            }
        }
    }
    Ok(Value::Undefined)
}

pub(crate) fn host_set(
    it: &mut Interpreter<'_>,
    host_ref: HostRef,
    name: &str,
    value: Value,
) -> Flow<()> {
    let object = HostObject::resolve(it, host_ref);
    if !object.capabilities().set(it, name, &value)? {
        it.session.runtime.set_expando(host_ref, name, value);
    }
    Ok(())
}

pub(crate) fn host_invoke(
    it: &mut Interpreter<'_>,
    host_ref: HostRef,
    name: &str,
    args: Vec<Value>,
) -> Flow<Value> {
    let object = HostObject::resolve(it, host_ref);
    let capabilities = object.capabilities();
    if !capabilities.has_method(name) {
        return Err(it.throw_error("TypeError", format!("{name} is not a function")));
    }
    capabilities.invoke(it, name, &args)
}

/// Window properties visible as free identifiers.
pub(crate) fn window_lookup(it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
    if WindowHost.has_method(name) {
        return Ok(Some(method(HostRef::Window, name)));
    }
    WindowHost.get(it, name)
}

pub(crate) fn host_to_string(it: &Interpreter<'_>, host_ref: HostRef) -> String {
    match host_ref {
        HostRef::Location => it.session.url.to_string(),
        HostRef::Node(id) => {
            let Some(node) = it.session.runtime.wrappers.node(id) else {
                return host_ref.object_tag().to_string();
            };
            if it.session.dom.has_tag(node, "a") {
                return anchor_href(it, node);
            }
            match it.session.dom.tag_name(node) {
                Some(tag) => format!("[object HTML{}Element]", element_interface(tag)),
                None => "[object Text]".to_string(),
            }
        }
        other => other.object_tag().to_string(),
    }
}

fn element_interface(tag: &str) -> &'static str {
    match tag {
        "a" => "Anchor",
        "body" => "Body",
        "button" => "Button",
        "div" => "Div",
        "form" => "Form",
        "html" => "Html",
        "input" => "Input",
        "p" => "Paragraph",
        "script" => "Script",
        "select" => "Select",
        "span" => "Span",
        "textarea" => "TextArea",
        "title" => "Title",
        _ => "",
    }
}

fn resolve_against_page(it: &Interpreter<'_>, raw: &str) -> Option<Url> {
    it.session.url.join(raw.trim()).ok()
}

fn anchor_href(it: &Interpreter<'_>, node: NodeId) -> String {
    match it.session.dom.attr(node, "href") {
        Some(raw) => resolve_against_page(it, &raw).map_or(raw, |url| url.to_string()),
        None => String::new(),
    }
}

/// Records a navigation request on the session gate. Never navigates
/// synchronously.
pub(crate) fn request_navigation(it: &mut Interpreter<'_>, request: WebRequest, kind: NavigationKind) {
    let target = request.url.to_string();
    let accepted = it
        .session
        .gate
        .request_navigation(NavigationRequest { request, kind });
    if accepted {
        it.trace
            .lifecycle_line(format!("[lifecycle] navigation requested ({kind:?}) -> {target}"));
    } else {
        it.trace.lifecycle_line(format!(
            "[lifecycle] navigation to {target} ignored: no active script execution"
        ));
    }
}

/// Location writes, `assign`/`replace` and link activation. A `javascript:`
/// URL runs in the current page and never reaches the fetcher.
fn navigate_to(it: &mut Interpreter<'_>, raw: &str, kind: NavigationKind) -> Flow<()> {
    let trimmed = raw.trim();
    let is_script = trimmed
        .get(..11)
        .is_some_and(|scheme| scheme.eq_ignore_ascii_case("javascript:"));
    if is_script {
        return it.eval_source(&trimmed[11..]);
    }
    match resolve_against_page(it, trimmed) {
        Some(url) => request_navigation(it, WebRequest::get(url), kind),
        None => it
            .trace
            .line(format!("[script] ignoring navigation to unresolvable url {raw:?}")),
    }
    Ok(())
}

struct WindowHost;

const WINDOW_UNSUPPORTED: &[&str] = &[
    "open",
    "prompt",
    "print",
    "setTimeout",
    "setInterval",
    "showModalDialog",
];

impl HostCapabilities for WindowHost {
    fn has_method(&self, name: &str) -> bool {
        matches!(name, "alert" | "focus" | "blur" | "addEventListener")
            || WINDOW_UNSUPPORTED.contains(&name)
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        Ok(match name {
            "window" | "self" | "top" | "parent" | "frames" => Some(Value::Host(HostRef::Window)),
            "document" => Some(Value::Host(HostRef::Document)),
            "location" => Some(Value::Host(HostRef::Location)),
            "console" => Some(Value::Host(HostRef::Console)),
            _ => it.session.runtime.global(name),
        })
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        match name {
            "location" => {
                let target = it.stringify(value);
                navigate_to(it, &target, NavigationKind::Assign)?;
            }
            "window" | "self" | "top" | "parent" | "document" | "console" => {}
            _ => it.session.runtime.set_global(name, value.clone()),
        }
        Ok(true)
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        match name {
            "alert" => {
                let message = match args.first() {
                    Some(value) => it.stringify(value),
                    None => String::new(),
                };
                it.trace.line(format!("[script] alert: {message}"));
                it.alerts.push(message);
                Ok(Value::Undefined)
            }
            "addEventListener" => {
                add_listener(it, HostRef::Window, args);
                Ok(Value::Undefined)
            }
            "focus" | "blur" => Ok(Value::Undefined),
            other => Err(it.unsupported(&format!("window.{other}"))),
        }
    }
}

fn add_listener(it: &mut Interpreter<'_>, host_ref: HostRef, args: &[Value]) {
    let event_type = text_arg(it, args, 0);
    let listener = arg(args, 1);
    if !listener.is_callable() {
        return;
    }
    let listeners = it.session.runtime.listeners.entry(host_ref).or_default();
    if !listeners
        .iter()
        .any(|(kind, existing)| *kind == event_type && existing.strict_equals(&listener))
    {
        listeners.push((event_type, listener));
    }
}

fn remove_listener(it: &mut Interpreter<'_>, host_ref: HostRef, args: &[Value]) {
    let event_type = text_arg(it, args, 0);
    let listener = arg(args, 1);
    if let Some(listeners) = it.session.runtime.listeners.get_mut(&host_ref) {
        listeners.retain(|(kind, existing)| !(*kind == event_type && existing.strict_equals(&listener)));
    }
}

struct DocumentHost;

impl HostCapabilities for DocumentHost {
    fn has_method(&self, name: &str) -> bool {
        matches!(
            name,
            "getElementById"
                | "getElementsByTagName"
                | "getElementsByName"
                | "createElement"
                | "createTextNode"
                | "addEventListener"
                | "write"
                | "writeln"
                | "open"
        )
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let dom = &it.session.dom;
        Ok(match name {
            "title" => Some(Value::String(dom.title_text())),
            "body" => {
                let body = dom.body();
                Some(optional_node(it, body))
            }
            "documentElement" => {
                let root = dom.document_element();
                Some(optional_node(it, root))
            }
            "forms" => {
                let forms = dom.elements_by_tag_name(dom.root, "form");
                Some(node_list(it, forms))
            }
            "URL" => Some(Value::String(it.session.url.to_string())),
            "location" => Some(Value::Host(HostRef::Location)),
            "nodeType" => Some(Value::Number(9.0)),
            "nodeName" => Some(Value::String("#document".to_string())),
            "readyState" => Some(Value::String(it.session.ready_state().to_string())),
            _ => {
                // Named forms, e.g. `document.form1`.
                let form = dom.find_element(dom.root, |element| {
                    element.tag_name == "form" && element.attr("name") == Some(name)
                });
                form.map(|form| node_value(it, form))
            }
        })
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        match name {
            "title" => {
                let title = it.stringify(value);
                it.session.dom.set_title(&title);
                Ok(true)
            }
            "location" => {
                let target = it.stringify(value);
                navigate_to(it, &target, NavigationKind::Assign)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        let dom = &it.session.dom;
        match name {
            "getElementById" => {
                let found = dom.by_id(&text_arg(it, args, 0));
                Ok(optional_node(it, found))
            }
            "getElementsByTagName" => {
                let found = dom.elements_by_tag_name(dom.root, &text_arg(it, args, 0));
                Ok(node_list(it, found))
            }
            "getElementsByName" => {
                let wanted = text_arg(it, args, 0);
                let found = dom.filter_elements(dom.root, |element| {
                    element.attr("name") == Some(wanted.as_str())
                });
                Ok(node_list(it, found))
            }
            "createElement" => {
                let tag = text_arg(it, args, 0);
                let node = it.session.dom.create_element(None, &tag, Vec::new());
                Ok(node_value(it, node))
            }
            "createTextNode" => {
                let text = text_arg(it, args, 0);
                let node = it.session.dom.create_text(None, &text);
                Ok(node_value(it, node))
            }
            "addEventListener" => {
                add_listener(it, HostRef::Document, args);
                Ok(Value::Undefined)
            }
            other => Err(it.unsupported(&format!("document.{other}"))),
        }
    }
}

struct LocationHost;

impl HostCapabilities for LocationHost {
    fn has_method(&self, name: &str) -> bool {
        matches!(name, "assign" | "replace" | "reload" | "toString")
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let url = &it.session.url;
        let text = match name {
            "href" => url.to_string(),
            "protocol" => format!("{}:", url.scheme()),
            "host" => match (url.host_str(), url.port()) {
                (Some(host), Some(port)) => format!("{host}:{port}"),
                (Some(host), None) => host.to_string(),
                _ => String::new(),
            },
            "hostname" => url.host_str().unwrap_or_default().to_string(),
            "port" => url.port().map(|port| port.to_string()).unwrap_or_default(),
            "pathname" => url.path().to_string(),
            "search" => url
                .query()
                .filter(|query| !query.is_empty())
                .map(|query| format!("?{query}"))
                .unwrap_or_default(),
            "hash" => url
                .fragment()
                .filter(|fragment| !fragment.is_empty())
                .map(|fragment| format!("#{fragment}"))
                .unwrap_or_default(),
            "origin" => url.origin().ascii_serialization(),
            _ => return Ok(None),
        };
        Ok(Some(Value::String(text)))
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        let text = it.stringify(value);
        match name {
            "href" => navigate_to(it, &text, NavigationKind::Assign)?,
            "hash" => {
                // Fragment changes stay on the current document.
                let fragment = text.strip_prefix('#').unwrap_or(&text);
                let fragment = (!fragment.is_empty()).then_some(fragment);
                it.session.url.set_fragment(fragment);
                it.trace.lifecycle_line(format!(
                    "[lifecycle] fragment changed in place -> {}",
                    it.session.url
                ));
            }
            "search" | "pathname" => {
                let mut url = it.session.url.clone();
                if name == "search" {
                    let query = text.strip_prefix('?').unwrap_or(&text);
                    url.set_query((!query.is_empty()).then_some(query));
                } else {
                    url.set_path(&text);
                }
                url.set_fragment(None);
                request_navigation(it, WebRequest::get(url), NavigationKind::Assign);
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        let target = text_arg(it, args, 0);
        match name {
            "assign" => navigate_to(it, &target, NavigationKind::Assign)?,
            "replace" => navigate_to(it, &target, NavigationKind::Replace)?,
            "reload" => {
                let current = it.session.url.clone();
                request_navigation(it, WebRequest::get(current), NavigationKind::Reload);
            }
            _ => return Ok(Value::String(it.session.url.to_string())),
        }
        Ok(Value::Undefined)
    }
}

struct ConsoleHost;

impl HostCapabilities for ConsoleHost {
    fn has_method(&self, name: &str) -> bool {
        matches!(name, "log" | "info" | "warn" | "error" | "debug")
    }

    fn get(&self, _it: &mut Interpreter<'_>, _name: &str) -> Flow<Option<Value>> {
        Ok(None)
    }

    fn set(&self, _it: &mut Interpreter<'_>, _name: &str, _value: &Value) -> Flow<bool> {
        Ok(false)
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        let line = args
            .iter()
            .map(|value| it.stringify(value))
            .collect::<Vec<_>>()
            .join(" ");
        it.trace.line(format!("[console] {name}: {line}"));
        Ok(Value::Undefined)
    }
}

struct ElementHost(NodeId);

const ELEMENT_METHODS: &[&str] = &[
    "getAttribute",
    "setAttribute",
    "removeAttribute",
    "hasAttribute",
    "appendChild",
    "removeChild",
    "getElementsByTagName",
    "addEventListener",
    "removeEventListener",
    "focus",
    "blur",
    "click",
];

impl HostCapabilities for ElementHost {
    fn has_method(&self, name: &str) -> bool {
        ELEMENT_METHODS.contains(&name)
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let node = self.0;
        let dom = &it.session.dom;
        let attr_text = |name: &str| Value::String(dom.attr(node, name).unwrap_or_default());
        Ok(Some(match name {
            "id" => attr_text("id"),
            "className" => attr_text("class"),
            "name" => attr_text("name"),
            "title" => attr_text("title"),
            "tagName" | "nodeName" => Value::String(
                dom.tag_name(node)
                    .unwrap_or_default()
                    .to_ascii_uppercase(),
            ),
            "nodeType" => Value::Number(1.0),
            "textContent" | "innerText" => Value::String(dom.text_content(node)),
            "innerHTML" => Value::String(dom.inner_html(node)),
            "outerHTML" => Value::String(dom.dump_node(node)),
            "parentNode" | "parentElement" => {
                let parent = dom.parent(node);
                optional_node(it, parent)
            }
            "firstChild" => {
                let child = dom.children(node).first().copied();
                optional_node(it, child)
            }
            "lastChild" => {
                let child = dom.children(node).last().copied();
                optional_node(it, child)
            }
            "childNodes" => {
                let children = dom.children(node).to_vec();
                node_list(it, children)
            }
            "children" => {
                let children = dom.element_children(node);
                node_list(it, children)
            }
            "nextSibling" => {
                let sibling = dom.sibling(node, 1);
                optional_node(it, sibling)
            }
            "previousSibling" => {
                let sibling = dom.sibling(node, -1);
                optional_node(it, sibling)
            }
            "ownerDocument" => Value::Host(HostRef::Document),
            _ => return Ok(None),
        }))
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        let node = self.0;
        let text = it.stringify(value);
        match name {
            "id" | "name" | "title" => it.session.dom.set_attr(node, name, &text),
            "className" => it.session.dom.set_attr(node, "class", &text),
            "textContent" | "innerText" => it.session.dom.set_text_content(node, &text),
            "innerHTML" => {
                let fragment = html::parse_fragment(&text)
                    .map_err(|err| it.throw_error("SyntaxError", err.to_string()))?;
                let dom = &mut it.session.dom;
                dom.clear_children(node);
                for child in fragment.children(fragment.root) {
                    dom.import_subtree(node, &fragment, *child);
                }
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        let node = self.0;
        match name {
            "getAttribute" => {
                let name = text_arg(it, args, 0);
                Ok(it
                    .session
                    .dom
                    .attr(node, &name)
                    .map_or(Value::Null, Value::String))
            }
            "setAttribute" => {
                let name = text_arg(it, args, 0);
                let value = text_arg(it, args, 1);
                it.session.dom.set_attr(node, &name, &value);
                Ok(Value::Undefined)
            }
            "removeAttribute" => {
                let name = text_arg(it, args, 0);
                it.session.dom.remove_attr(node, &name);
                Ok(Value::Undefined)
            }
            "hasAttribute" => {
                let name = text_arg(it, args, 0);
                Ok(Value::Bool(it.session.dom.attr(node, &name).is_some()))
            }
            "appendChild" => {
                let child_value = arg(args, 0);
                let Some(child) = node_of(it, &child_value) else {
                    return Err(it.throw_error("TypeError", "appendChild argument is not a node"));
                };
                if !it.session.dom.append_child(node, child) {
                    return Err(it.throw_error(
                        "HierarchyRequestError",
                        "the new child is an ancestor of the parent",
                    ));
                }
                Ok(child_value)
            }
            "removeChild" => {
                let child_value = arg(args, 0);
                let removed = node_of(it, &child_value)
                    .is_some_and(|child| it.session.dom.remove_child(node, child));
                if !removed {
                    return Err(it.throw_error("NotFoundError", "the node is not a child of this node"));
                }
                Ok(child_value)
            }
            "getElementsByTagName" => {
                let tag = text_arg(it, args, 0);
                let found = it.session.dom.elements_by_tag_name(node, &tag);
                Ok(node_list(it, found))
            }
            "addEventListener" => {
                let host_ref = host_of_node(it, node);
                add_listener(it, host_ref, args);
                Ok(Value::Undefined)
            }
            "removeEventListener" => {
                let host_ref = host_of_node(it, node);
                remove_listener(it, host_ref, args);
                Ok(Value::Undefined)
            }
            "focus" => {
                focus(it, node)?;
                Ok(Value::Undefined)
            }
            "blur" => {
                blur(it, node)?;
                Ok(Value::Undefined)
            }
            _ => {
                click(it, node)?;
                Ok(Value::Undefined)
            }
        }
    }
}

struct FormHost(NodeId);

impl FormHost {
    fn named_control(&self, it: &Interpreter<'_>, name: &str) -> Option<NodeId> {
        let dom = &it.session.dom;
        dom.form_controls(self.0).into_iter().find(|control| {
            dom.attr(*control, "name").as_deref() == Some(name)
                || dom.attr(*control, "id").as_deref() == Some(name)
        })
    }
}

impl HostCapabilities for FormHost {
    fn has_method(&self, name: &str) -> bool {
        matches!(name, "submit" | "reset") || ElementHost(self.0).has_method(name)
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let dom = &it.session.dom;
        match name {
            "elements" => {
                let controls = dom.form_controls(self.0);
                Ok(Some(node_list(it, controls)))
            }
            "length" => Ok(Some(Value::Number(dom.form_controls(self.0).len() as f64))),
            "action" | "method" => Ok(Some(Value::String(
                dom.attr(self.0, name).unwrap_or_default(),
            ))),
            _ => {
                if let Some(value) = ElementHost(self.0).get(it, name)? {
                    return Ok(Some(value));
                }
                let control = self.named_control(it, name);
                Ok(control.map(|control| node_value(it, control)))
            }
        }
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        match name {
            "action" | "method" => {
                let text = it.stringify(value);
                it.session.dom.set_attr(self.0, name, &text);
                Ok(true)
            }
            _ => ElementHost(self.0).set(it, name, value),
        }
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        match name {
            // `form.submit()` skips the submit event.
            "submit" => {
                submit_form(it, self.0, false)?;
                Ok(Value::Undefined)
            }
            "reset" => {
                let dom = &mut it.session.dom;
                for control in dom.form_controls(self.0) {
                    let initial_value = dom.attr(control, "value").unwrap_or_default();
                    let initial_checked = dom.attr(control, "checked").is_some();
                    if let Some(element) = dom.element_mut(control) {
                        element.value = initial_value;
                        element.checked = initial_checked;
                    }
                }
                Ok(Value::Undefined)
            }
            _ => ElementHost(self.0).invoke(it, name, args),
        }
    }
}

struct ControlHost(NodeId);

impl ControlHost {
    fn control_type(&self, dom: &Dom) -> String {
        match dom.tag_name(self.0) {
            Some("input") => dom
                .attr(self.0, "type")
                .map(|kind| kind.to_ascii_lowercase())
                .unwrap_or_else(|| "text".to_string()),
            Some("button") => dom
                .attr(self.0, "type")
                .map(|kind| kind.to_ascii_lowercase())
                .unwrap_or_else(|| "submit".to_string()),
            Some("select") => "select-one".to_string(),
            Some(tag) => tag.to_string(),
            None => String::new(),
        }
    }
}

impl HostCapabilities for ControlHost {
    fn has_method(&self, name: &str) -> bool {
        ElementHost(self.0).has_method(name)
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let dom = &it.session.dom;
        let Some(element) = dom.element(self.0) else {
            return Ok(None);
        };
        match name {
            "value" => Ok(Some(Value::String(control_value(dom, self.0)))),
            "checked" => Ok(Some(Value::Bool(element.checked))),
            "disabled" => Ok(Some(Value::Bool(element.attr("disabled").is_some()))),
            "type" => Ok(Some(Value::String(self.control_type(dom)))),
            "form" => {
                let form = dom.form_owner(self.0);
                Ok(Some(optional_node(it, form)))
            }
            _ => ElementHost(self.0).get(it, name),
        }
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        match name {
            "value" => {
                let text = it.stringify(value);
                if let Some(element) = it.session.dom.element_mut(self.0) {
                    element.value = text;
                }
                Ok(true)
            }
            "checked" => {
                set_checked(&mut it.session.dom, self.0, value.truthy());
                Ok(true)
            }
            "disabled" => {
                if value.truthy() {
                    it.session.dom.set_attr(self.0, "disabled", "");
                } else {
                    it.session.dom.remove_attr(self.0, "disabled");
                }
                Ok(true)
            }
            _ => ElementHost(self.0).set(it, name, value),
        }
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        ElementHost(self.0).invoke(it, name, args)
    }
}

struct AnchorHost(NodeId);

impl HostCapabilities for AnchorHost {
    fn has_method(&self, name: &str) -> bool {
        name == "toString" || ElementHost(self.0).has_method(name)
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        match name {
            "href" => Ok(Some(Value::String(anchor_href(it, self.0)))),
            "target" => Ok(Some(Value::String(
                it.session.dom.attr(self.0, "target").unwrap_or_default(),
            ))),
            _ => ElementHost(self.0).get(it, name),
        }
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        match name {
            "href" | "target" => {
                let text = it.stringify(value);
                it.session.dom.set_attr(self.0, name, &text);
                Ok(true)
            }
            _ => ElementHost(self.0).set(it, name, value),
        }
    }

    fn invoke(&self, it: &mut Interpreter<'_>, name: &str, args: &[Value]) -> Flow<Value> {
        match name {
            "toString" => Ok(Value::String(anchor_href(it, self.0))),
            _ => ElementHost(self.0).invoke(it, name, args),
        }
    }
}

struct TextHost(NodeId);

impl HostCapabilities for TextHost {
    fn has_method(&self, _name: &str) -> bool {
        false
    }

    fn get(&self, it: &mut Interpreter<'_>, name: &str) -> Flow<Option<Value>> {
        let dom = &it.session.dom;
        Ok(Some(match name {
            "nodeType" => Value::Number(3.0),
            "nodeName" => Value::String("#text".to_string()),
            "nodeValue" | "data" | "textContent" => Value::String(dom.text_content(self.0)),
            "parentNode" => {
                let parent = dom.parent(self.0);
                optional_node(it, parent)
            }
            "nextSibling" => {
                let sibling = dom.sibling(self.0, 1);
                optional_node(it, sibling)
            }
            "previousSibling" => {
                let sibling = dom.sibling(self.0, -1);
                optional_node(it, sibling)
            }
            _ => return Ok(None),
        }))
    }

    fn set(&self, it: &mut Interpreter<'_>, name: &str, value: &Value) -> Flow<bool> {
        if matches!(name, "nodeValue" | "data" | "textContent") {
            let text = it.stringify(value);
            it.session.dom.set_text_content(self.0, &text);
            return Ok(true);
        }
        Ok(false)
    }

    fn invoke(&self, _it: &mut Interpreter<'_>, _name: &str, _args: &[Value]) -> Flow<Value> {
        Ok(Value::Undefined)
    }
}

pub(crate) fn control_value(dom: &Dom, node: NodeId) -> String {
    if dom.has_tag(node, "select") {
        let options = dom.elements_by_tag_name(node, "option");
        let chosen = options
            .iter()
            .copied()
            .find(|option| dom.attr(*option, "selected").is_some())
            .or_else(|| options.first().copied());
        return chosen
            .map(|option| {
                dom.attr(option, "value")
                    .unwrap_or_else(|| dom.text_content(option).trim().to_string())
            })
            .unwrap_or_default();
    }
    dom.element(node)
        .map(|element| element.value.clone())
        .unwrap_or_default()
}

fn set_checked(dom: &mut Dom, node: NodeId, checked: bool) {
    let is_radio = dom
        .attr(node, "type")
        .is_some_and(|kind| kind.eq_ignore_ascii_case("radio"));
    if checked && is_radio {
        // Radio groups share a name within one form.
        let group = dom.attr(node, "name");
        let owner = dom.form_owner(node);
        let peers: Vec<NodeId> = dom
            .filter_elements(dom.root, |element| {
                element.tag_name == "input"
                    && element
                        .attr("type")
                        .is_some_and(|kind| kind.eq_ignore_ascii_case("radio"))
                    && element.attr("name") == group.as_deref()
            })
            .into_iter()
            .filter(|peer| dom.form_owner(*peer) == owner)
            .collect();
        for peer in peers {
            if let Some(element) = dom.element_mut(peer) {
                element.checked = false;
            }
        }
    }
    if let Some(element) = dom.element_mut(node) {
        element.checked = checked;
    }
}

/// Runs the handler slot (script-assigned `on<type>` or the inline
/// attribute) and then listeners for one node.
fn run_handlers(
    it: &mut Interpreter<'_>,
    node: NodeId,
    event_type: &str,
    event: &Value,
) -> Flow<()> {
    let this = node_value(it, node);
    let host_ref = match &this {
        Value::Host(host_ref) => *host_ref,
        _ => return Ok(()),
    };
    let slot = format!("on{event_type}");
    let handler = match it.session.runtime.expando(host_ref, &slot) {
        Some(handler) => Some(handler),
        None => match it.session.dom.attr(node, &slot) {
            Some(source) => Some(it.compile_handler(&source)?),
            None => None,
        },
    };
    if let Some(handler) = handler.filter(Value::is_callable) {
        let result = it.call_function(&handler, this.clone(), vec![event.clone()])?;
        if let Value::Bool(false) = result {
            prevent_default(event);
        }
    }
    let listeners: Vec<Value> = it
        .session
        .runtime
        .listeners
        .get(&host_ref)
        .map(|listeners| {
            listeners
                .iter()
                .filter(|(kind, _)| kind == event_type)
                .map(|(_, listener)| listener.clone())
                .collect()
        })
        .unwrap_or_default();
    for listener in listeners {
        it.call_function(&listener, this.clone(), vec![event.clone()])?;
    }
    Ok(())
}

fn prevent_default(event: &Value) {
    if let Value::Object(object) = event {
        object.borrow_mut().set("defaultPrevented", Value::Bool(true));
    }
}

fn is_default_prevented(event: &Value) -> bool {
    match event {
        Value::Object(object) => object
            .borrow()
            .get("defaultPrevented")
            .is_some_and(Value::truthy),
        _ => false,
    }
}

/// Dispatches `event_type` at `target`, bubbling through its ancestors when
/// `bubbles` is set. Returns `false` when a handler cancelled the default
/// action.
pub(crate) fn dispatch_event(
    it: &mut Interpreter<'_>,
    target: NodeId,
    event_type: &str,
    bubbles: bool,
) -> Flow<bool> {
    let target_value = node_value(it, target);
    let event = new_object(
        ObjectClass::Event,
        vec![
            ("type", Value::String(event_type.to_string())),
            ("target", target_value),
            ("bubbles", Value::Bool(bubbles)),
            ("defaultPrevented", Value::Bool(false)),
        ],
    );
    let mut path = vec![target];
    if bubbles {
        let mut cursor = it.session.dom.parent(target);
        while let Some(node) = cursor {
            if node == it.session.dom.root {
                break;
            }
            path.push(node);
            cursor = it.session.dom.parent(node);
        }
    }
    for node in path {
        run_handlers(it, node, event_type, &event)?;
    }
    Ok(!is_default_prevented(&event))
}

fn is_disabled(dom: &Dom, node: NodeId) -> bool {
    dom.is_form_control(node) && dom.attr(node, "disabled").is_some()
}

fn is_checkable(dom: &Dom, node: NodeId) -> bool {
    dom.has_tag(node, "input")
        && dom
            .attr(node, "type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("checkbox") || kind.eq_ignore_ascii_case("radio"))
}

fn is_submit_button(dom: &Dom, node: NodeId) -> bool {
    let kind = dom.attr(node, "type").map(|kind| kind.to_ascii_lowercase());
    match dom.tag_name(node) {
        Some("input") => matches!(kind.as_deref(), Some("submit" | "image")),
        Some("button") => matches!(kind.as_deref(), None | Some("submit")),
        _ => false,
    }
}

/// A user-style click: checkbox/radio toggling, `click` dispatch, then the
/// default action (link navigation or form submission) unless cancelled.
pub(crate) fn click(it: &mut Interpreter<'_>, node: NodeId) -> Flow<()> {
    if is_disabled(&it.session.dom, node) {
        return Ok(());
    }
    let previous_states = if is_checkable(&it.session.dom, node) {
        let snapshot: Vec<(NodeId, bool)> = it
            .session
            .dom
            .filter_elements(it.session.dom.root, |element| element.tag_name == "input")
            .into_iter()
            .filter_map(|input| {
                it.session
                    .dom
                    .element(input)
                    .map(|element| (input, element.checked))
            })
            .collect();
        let is_radio = it
            .session
            .dom
            .attr(node, "type")
            .is_some_and(|kind| kind.eq_ignore_ascii_case("radio"));
        let checked = it.session.dom.element(node).is_some_and(|e| e.checked);
        set_checked(&mut it.session.dom, node, is_radio || !checked);
        Some(snapshot)
    } else {
        None
    };

    let proceed = dispatch_event(it, node, "click", true)?;
    if !proceed {
        if let Some(snapshot) = previous_states {
            for (input, checked) in snapshot {
                if let Some(element) = it.session.dom.element_mut(input) {
                    element.checked = checked;
                }
            }
        }
        return Ok(());
    }

    let dom = &it.session.dom;
    if dom.has_tag(node, "a") || dom.has_tag(node, "area") {
        if let Some(href) = dom.attr(node, "href") {
            navigate_to(it, &href, NavigationKind::Link)?;
        }
        return Ok(());
    }
    if is_submit_button(dom, node) {
        if let Some(form) = dom.form_owner(node) {
            submit_form(it, form, true)?;
        }
    }
    Ok(())
}

/// Successful controls of a form as `name=value` pairs, in document order.
pub(crate) fn form_data(dom: &Dom, form: NodeId) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for control in dom.form_controls(form) {
        let Some(name) = dom.attr(control, "name").filter(|name| !name.is_empty()) else {
            continue;
        };
        if is_disabled(dom, control) || dom.has_tag(control, "button") {
            continue;
        }
        let kind = dom
            .attr(control, "type")
            .map(|kind| kind.to_ascii_lowercase())
            .unwrap_or_default();
        if matches!(
            kind.as_str(),
            "submit" | "button" | "reset" | "image" | "file"
        ) {
            continue;
        }
        if matches!(kind.as_str(), "checkbox" | "radio") {
            let checked = dom.element(control).is_some_and(|e| e.checked);
            if !checked {
                continue;
            }
            let value = dom.attr(control, "value").unwrap_or_else(|| "on".to_string());
            pairs.push((name, value));
            continue;
        }
        pairs.push((name, control_value(dom, control)));
    }
    pairs
}

/// Builds the request a form submission navigates with.
pub(crate) fn form_request(dom: &Dom, page_url: &Url, form: NodeId) -> Option<WebRequest> {
    let action = dom.attr(form, "action").unwrap_or_default();
    let mut url = if action.trim().is_empty() {
        page_url.clone()
    } else {
        page_url.join(action.trim()).ok()?
    };
    url.set_fragment(None);
    let method = HttpMethod::parse(&dom.attr(form, "method").unwrap_or_default());
    let pairs = form_data(dom, form);
    Some(match method {
        HttpMethod::Get => {
            url.set_query(None);
            if !pairs.is_empty() {
                url.query_pairs_mut().extend_pairs(pairs.iter());
            }
            WebRequest::get(url)
        }
        HttpMethod::Post => WebRequest {
            url,
            method,
            form_data: pairs,
        },
    })
}

/// Submits `form`; with `fire_event` the `submit` event runs first and may
/// cancel.
pub(crate) fn submit_form(it: &mut Interpreter<'_>, form: NodeId, fire_event: bool) -> Flow<()> {
    if fire_event && !dispatch_event(it, form, "submit", true)? {
        it.trace
            .lifecycle_line("[lifecycle] form submission cancelled by handler".to_string());
        return Ok(());
    }
    match form_request(&it.session.dom, &it.session.url, form) {
        Some(request) => request_navigation(it, request, NavigationKind::FormSubmit),
        None => it
            .trace
            .line("[script] form action does not resolve to a url".to_string()),
    }
    Ok(())
}

pub(crate) fn focus(it: &mut Interpreter<'_>, node: NodeId) -> Flow<()> {
    if it.session.focused == Some(node) || is_disabled(&it.session.dom, node) {
        return Ok(());
    }
    if let Some(previous) = it.session.focused {
        blur(it, previous)?;
    }
    it.session.focused = Some(node);
    dispatch_event(it, node, "focus", false)?;
    Ok(())
}

pub(crate) fn blur(it: &mut Interpreter<'_>, node: NodeId) -> Flow<()> {
    if it.session.focused != Some(node) {
        return Ok(());
    }
    it.session.focused = None;
    dispatch_event(it, node, "blur", false)?;
    Ok(())
}
