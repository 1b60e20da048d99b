#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: Vec<(String, String)>,
    pub(crate) value: String,
    pub(crate) checked: bool,
}

impl Element {
    pub(crate) fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Arena-backed document tree. Nodes are never freed while the owning page
/// session lives; detached nodes simply lose their parent link.
#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
}

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Serializing and copying recurse once per nesting level.
const DOM_STACK_RED_ZONE: usize = 64 * 1024;
const DOM_STACK_SEGMENT: usize = 2 * 1024 * 1024;

pub(crate) fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.iter().any(|void| void.eq_ignore_ascii_case(tag))
}

impl Dom {
    pub(crate) fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
        }
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub(crate) fn create_element(
        &mut self,
        parent: Option<NodeId>,
        tag_name: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let value = attrs
            .iter()
            .find(|(key, _)| key == "value")
            .map(|(_, value)| value.clone())
            .unwrap_or_default();
        let checked = attrs.iter().any(|(key, _)| key == "checked");
        let element = Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
            value,
            checked,
        };
        self.create_node(parent, NodeType::Element(element))
    }

    pub(crate) fn create_text(&mut self, parent: Option<NodeId>, text: &str) -> NodeId {
        self.create_node(parent, NodeType::Text(text.to_string()))
    }

    pub(crate) fn element(&self, node_id: NodeId) -> Option<&Element> {
        match &self.nodes.get(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, node_id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(node_id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn tag_name(&self, node_id: NodeId) -> Option<&str> {
        self.element(node_id).map(|e| e.tag_name.as_str())
    }

    pub(crate) fn has_tag(&self, node_id: NodeId, tag: &str) -> bool {
        self.tag_name(node_id)
            .is_some_and(|name| name.eq_ignore_ascii_case(tag))
    }

    pub(crate) fn attr(&self, node_id: NodeId, name: &str) -> Option<String> {
        self.element(node_id)
            .and_then(|element| element.attr(name))
            .map(str::to_string)
    }

    pub(crate) fn set_attr(&mut self, node_id: NodeId, name: &str, value: &str) {
        let Some(element) = self.element_mut(node_id) else {
            return;
        };
        let name = name.to_ascii_lowercase();
        if name == "value" {
            element.value = value.to_string();
        }
        if name == "checked" {
            element.checked = true;
        }
        match element.attrs.iter_mut().find(|(key, _)| *key == name) {
            Some(slot) => slot.1 = value.to_string(),
            None => element.attrs.push((name, value.to_string())),
        }
    }

    pub(crate) fn remove_attr(&mut self, node_id: NodeId, name: &str) {
        if let Some(element) = self.element_mut(node_id) {
            element
                .attrs
                .retain(|(key, _)| !key.eq_ignore_ascii_case(name));
        }
    }

    pub(crate) fn parent(&self, node_id: NodeId) -> Option<NodeId> {
        self.nodes.get(node_id.0)?.parent
    }

    pub(crate) fn children(&self, node_id: NodeId) -> &[NodeId] {
        &self.nodes[node_id.0].children
    }

    pub(crate) fn element_children(&self, node_id: NodeId) -> Vec<NodeId> {
        self.children(node_id)
            .iter()
            .copied()
            .filter(|child| self.element(*child).is_some())
            .collect()
    }

    pub(crate) fn sibling(&self, node_id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.parent(node_id)?;
        let siblings = self.children(parent);
        let index = siblings.iter().position(|child| *child == node_id)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    pub(crate) fn is_descendant_of(&self, node_id: NodeId, ancestor: NodeId) -> bool {
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if current == ancestor {
                return true;
            }
            cursor = self.parent(current);
        }
        false
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self, node_id: NodeId) -> bool {
        node_id == self.root || self.is_descendant_of(node_id, self.root)
    }

    /// Descendants of `scope` in document order, `scope` itself excluded.
    pub(crate) fn descendants(&self, scope: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(scope).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    pub(crate) fn find_element(
        &self,
        scope: NodeId,
        predicate: impl Fn(&Element) -> bool,
    ) -> Option<NodeId> {
        self.descendants(scope)
            .into_iter()
            .find(|node| self.element(*node).is_some_and(&predicate))
    }

    pub(crate) fn filter_elements(
        &self,
        scope: NodeId,
        predicate: impl Fn(&Element) -> bool,
    ) -> Vec<NodeId> {
        self.descendants(scope)
            .into_iter()
            .filter(|node| self.element(*node).is_some_and(&predicate))
            .collect()
    }

    pub(crate) fn by_id(&self, id: &str) -> Option<NodeId> {
        self.find_element(self.root, |element| element.attr("id") == Some(id))
    }

    pub(crate) fn elements_by_tag_name(&self, scope: NodeId, tag: &str) -> Vec<NodeId> {
        let all = tag == "*";
        self.filter_elements(scope, |element| {
            all || element.tag_name.eq_ignore_ascii_case(tag)
        })
    }

    pub(crate) fn first_by_tag(&self, tag: &str) -> Option<NodeId> {
        self.find_element(self.root, |element| element.tag_name.eq_ignore_ascii_case(tag))
    }

    pub(crate) fn body(&self) -> Option<NodeId> {
        self.first_by_tag("body")
    }

    pub(crate) fn document_element(&self) -> Option<NodeId> {
        self.element_children(self.root).first().copied()
    }

    pub(crate) fn title_text(&self) -> String {
        self.first_by_tag("title")
            .map(|title| self.text_content(title).trim().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn set_title(&mut self, title: &str) {
        let node = match self.first_by_tag("title") {
            Some(node) => node,
            None => {
                let parent = self
                    .first_by_tag("head")
                    .or_else(|| self.document_element())
                    .unwrap_or(self.root);
                self.create_element(Some(parent), "title", Vec::new())
            }
        };
        self.set_text_content(node, title);
    }

    /// The nearest `form` ancestor, or the form named by a `form` attribute.
    pub(crate) fn form_owner(&self, node_id: NodeId) -> Option<NodeId> {
        if let Some(form_id) = self.attr(node_id, "form") {
            if let Some(form) = self.by_id(&form_id) {
                if self.has_tag(form, "form") {
                    return Some(form);
                }
            }
        }
        let mut cursor = self.parent(node_id);
        while let Some(current) = cursor {
            if self.has_tag(current, "form") {
                return Some(current);
            }
            cursor = self.parent(current);
        }
        None
    }

    pub(crate) fn is_form_control(&self, node_id: NodeId) -> bool {
        self.tag_name(node_id).is_some_and(|tag| {
            matches!(tag, "input" | "select" | "textarea" | "button")
        })
    }

    pub(crate) fn form_controls(&self, form: NodeId) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|node| self.is_form_control(*node) && self.form_owner(*node) == Some(form))
            .collect()
    }

    pub(crate) fn text_content(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document | NodeType::Element(_) => self
                .descendants(node_id)
                .into_iter()
                .filter_map(|node| match &self.nodes[node.0].node_type {
                    NodeType::Text(text) => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
            NodeType::Text(text) => text.clone(),
        }
    }

    pub(crate) fn set_text_content(&mut self, node_id: NodeId, value: &str) {
        match &mut self.nodes[node_id.0].node_type {
            NodeType::Text(text) => {
                *text = value.to_string();
            }
            NodeType::Element(element) if element.tag_name == "textarea" => {
                element.value = value.to_string();
                self.replace_children_with_text(node_id, value);
            }
            _ => self.replace_children_with_text(node_id, value),
        }
    }

    fn replace_children_with_text(&mut self, node_id: NodeId, value: &str) {
        self.clear_children(node_id);
        if !value.is_empty() {
            self.create_text(Some(node_id), value);
        }
    }

    pub(crate) fn clear_children(&mut self, node_id: NodeId) {
        let children = std::mem::take(&mut self.nodes[node_id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    pub(crate) fn append_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.is_descendant_of(parent, child) {
            return false;
        }
        self.detach(child);
        self.nodes[parent.0].children.push(child);
        self.nodes[child.0].parent = Some(parent);
        true
    }

    pub(crate) fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.parent(child) != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    fn detach(&mut self, node_id: NodeId) {
        if let Some(old_parent) = self.nodes[node_id.0].parent.take() {
            self.nodes[old_parent.0]
                .children
                .retain(|child| *child != node_id);
        }
    }

    /// Copies the subtree rooted at `source_node` from `source` under `parent`.
    pub(crate) fn import_subtree(&mut self, parent: NodeId, source: &Dom, source_node: NodeId) {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_SEGMENT, || {
            self.import_subtree_inner(parent, source, source_node)
        })
    }

    fn import_subtree_inner(&mut self, parent: NodeId, source: &Dom, source_node: NodeId) {
        let copied = match &source.nodes[source_node.0].node_type {
            NodeType::Document => parent,
            NodeType::Element(element) => {
                self.create_node(Some(parent), NodeType::Element(element.clone()))
            }
            NodeType::Text(text) => {
                self.create_text(Some(parent), text);
                return;
            }
        };
        for child in &source.nodes[source_node.0].children {
            self.import_subtree(copied, source, *child);
        }
    }

    pub(crate) fn inner_html(&self, node_id: NodeId) -> String {
        let mut out = String::new();
        for child in &self.nodes[node_id.0].children {
            out.push_str(&self.dump_node(*child));
        }
        out
    }

    pub(crate) fn dump_node(&self, node_id: NodeId) -> String {
        stacker::maybe_grow(DOM_STACK_RED_ZONE, DOM_STACK_SEGMENT, || {
            self.dump_node_inner(node_id)
        })
    }

    fn dump_node_inner(&self, node_id: NodeId) -> String {
        match &self.nodes[node_id.0].node_type {
            NodeType::Document => self.inner_html(node_id),
            NodeType::Text(text) => {
                let raw_parent = self
                    .parent(node_id)
                    .and_then(|parent| self.tag_name(parent))
                    .is_some_and(|tag| matches!(tag, "script" | "style"));
                if raw_parent {
                    text.clone()
                } else {
                    escape_html_text(text)
                }
            }
            NodeType::Element(element) => {
                let mut out = format!("<{}", element.tag_name);
                for (name, value) in &element.attrs {
                    out.push_str(&format!(" {name}=\"{}\"", escape_html_attr(value)));
                }
                out.push('>');
                if is_void_tag(&element.tag_name) {
                    return out;
                }
                out.push_str(&self.inner_html(node_id));
                out.push_str(&format!("</{}>", element.tag_name));
                out
            }
        }
    }
}

fn escape_html_text(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_html_attr(value: &str) -> String {
    escape_html_text(value).replace('"', "&quot;")
}
