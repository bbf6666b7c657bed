//! A parsed page plus just enough event plumbing to drive the page's
//! click handlers without a browser.

use kuchiki::NodeRef;
use kuchiki::traits::TendrilSink as _;

pub struct ClickEvent {
    pub target: NodeRef,
}

pub type ClickListener = Box<dyn Fn(&ClickEvent)>;

/// Delegated click subscription: a listener registered on `root` sees every
/// click whose target is `root` or one of its descendants.
pub trait ClickEvents {
    fn listen(&mut self, root: NodeRef, listener: ClickListener);
}

pub struct Document {
    root: NodeRef,
    listeners: Vec<(NodeRef, ClickListener)>,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            root: kuchiki::parse_html().one(html),
            listeners: Vec::new(),
        }
    }

    pub fn root(&self) -> &NodeRef {
        &self.root
    }

    /// The `<html>` element.
    pub fn document_element(&self) -> Option<NodeRef> {
        self.select_first("html")
    }

    pub fn select_first(&self, selector: &str) -> Option<NodeRef> {
        self.root
            .select_first(selector)
            .ok()
            .map(|n| n.as_node().clone())
    }

    pub fn select_all(&self, selector: &str) -> Vec<NodeRef> {
        self.root
            .select(selector)
            .map(|nodes| nodes.map(|n| n.as_node().clone()).collect())
            .unwrap_or_default()
    }

    pub fn element_by_id(&self, id: &str) -> Option<NodeRef> {
        element_by_id(&self.root, id)
    }

    /// Delivers a click on `target` to every listener whose root contains it.
    pub fn click(&self, target: &NodeRef) {
        let event = ClickEvent {
            target: target.clone(),
        };
        for (root, listener) in &self.listeners {
            if target.inclusive_ancestors().any(|n| n == *root) {
                listener(&event);
            }
        }
    }

    pub fn to_html(&self) -> String {
        self.root.to_string()
    }
}

impl ClickEvents for Document {
    fn listen(&mut self, root: NodeRef, listener: ClickListener) {
        self.listeners.push((root, listener));
    }
}

/// Ids on the page may contain characters CSS selectors would need escaped,
/// so this walks the tree instead.
pub fn element_by_id(root: &NodeRef, id: &str) -> Option<NodeRef> {
    root.inclusive_descendants()
        .find(|n| attr(n, "id").as_deref() == Some(id))
}

pub fn attr(node: &NodeRef, name: &str) -> Option<String> {
    node.as_element()?
        .attributes
        .borrow()
        .get(name)
        .map(str::to_string)
}

pub fn local_name(node: &NodeRef) -> Option<String> {
    node.as_element().map(|e| e.name.local.to_string())
}

pub fn has_class(node: &NodeRef, class: &str) -> bool {
    attr(node, "class")
        .map(|c| c.split_whitespace().any(|c| c == class))
        .unwrap_or(false)
}

/// Adds or removes `class`. Returns whether the class is present afterwards.
pub fn toggle_class(node: &NodeRef, class: &str) -> bool {
    let present = !has_class(node, class);
    set_class(node, class, present);
    present
}

pub fn set_class(node: &NodeRef, class: &str, present: bool) {
    let Some(element) = node.as_element() else {
        return;
    };
    let mut attrs = element.attributes.borrow_mut();
    let mut classes: Vec<String> = attrs
        .get("class")
        .map(|c| c.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    classes.retain(|c| c != class);
    if present {
        classes.push(class.to_string());
    }
    if classes.is_empty() {
        attrs.remove("class");
    } else {
        attrs.insert("class", classes.join(" "));
    }
}

pub fn set_text(node: &NodeRef, text: &str) {
    for child in node.children().collect::<Vec<_>>() {
        child.detach();
    }
    node.append(NodeRef::new_text(text));
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;
    use std::rc::Rc;

    use super::*;

    #[test]
    fn class_helpers() {
        let doc = Document::parse(r#"<div id="x" class="answer hidden"></div>"#);
        let node = doc.element_by_id("x").unwrap();

        assert!(has_class(&node, "hidden"));
        assert!(!toggle_class(&node, "hidden"));
        assert_eq!(attr(&node, "class").as_deref(), Some("answer"));
        assert!(toggle_class(&node, "hidden"));
        assert_eq!(attr(&node, "class").as_deref(), Some("answer hidden"));

        set_class(&node, "answer", false);
        set_class(&node, "hidden", false);
        assert_eq!(attr(&node, "class"), None);
    }

    #[test]
    fn set_text_replaces_children() {
        let doc = Document::parse(r#"<button id="b">old <b>bold</b></button>"#);
        let node = doc.element_by_id("b").unwrap();
        set_text(&node, "new");
        assert_eq!(node.text_contents(), "new");
    }

    #[test]
    fn clicks_reach_only_enclosing_listeners() {
        let mut doc = Document::parse(
            r#"<div id="outer"><span id="inner">x</span></div><p id="elsewhere">y</p>"#,
        );
        let hits = Rc::new(Cell::new(0));
        let outer = doc.element_by_id("outer").unwrap();
        let counter = hits.clone();
        doc.listen(outer, Box::new(move |_| counter.set(counter.get() + 1)));

        doc.click(&doc.element_by_id("inner").unwrap());
        doc.click(&doc.element_by_id("outer").unwrap());
        doc.click(&doc.element_by_id("elsewhere").unwrap());
        assert_eq!(hits.get(), 2);
    }
}
