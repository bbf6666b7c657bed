use std::collections::HashMap;

use kuchiki::NodeRef;

use crate::builtin::{HIDDEN_CLASS, TOGGLE_ANSWER_ACTION};
use crate::dom::{self, Document};
use crate::html::CONTENT_CLASS;

/// Sanity checks on the rendered page before it is written: ids are
/// unique, every TOC link has a target, and every answer button has a
/// hidden panel to reveal.
///
/// Only markup the renderer produced is checked. Task and theory text comes
/// from task sources verbatim, so clashes inside it are logged and left be.
pub fn assert_page_consistent(html: &str) -> anyhow::Result<()> {
    let doc = Document::parse(html);

    for required in ["toc", "themesRoot"] {
        if doc.element_by_id(required).is_none() {
            anyhow::bail!("page check failed: #{required} is missing");
        }
    }

    let mut ids: HashMap<String, NodeRef> = HashMap::new();
    for node in doc.root().inclusive_descendants() {
        let Some(id) = dom::attr(&node, "id") else {
            continue;
        };
        if in_content(&node) {
            continue;
        }
        if ids.insert(id.clone(), node).is_some() {
            anyhow::bail!("page check failed: duplicate id {id:?}");
        }
    }
    let mut content_ids = HashMap::<String, usize>::new();
    for node in doc.select_all(&format!(".{CONTENT_CLASS} [id]")) {
        if let Some(id) = dom::attr(&node, "id") {
            *content_ids.entry(id).or_default() += 1;
        }
    }
    for (id, count) in content_ids {
        if count > 1 || ids.contains_key(&id) {
            tracing::warn!(id = %id, "id inside task text is not unique on the page");
        }
    }

    for link in doc.select_all("#toc a[href]") {
        let href = dom::attr(&link, "href").unwrap_or_default();
        let Some(target) = href.strip_prefix('#') else {
            anyhow::bail!("page check failed: toc link {href:?} is not an anchor");
        };
        if !ids.contains_key(target) {
            anyhow::bail!("page check failed: toc link {href:?} has no target");
        }
    }

    let buttons = doc.select_all(&format!("button[data-action=\"{TOGGLE_ANSWER_ACTION}\"]"));
    for button in buttons.iter().filter(|b| !in_content(b)) {
        let id = dom::attr(button, "data-id").unwrap_or_default();
        let Some(panel) = ids.get(&format!("answer-{id}")) else {
            anyhow::bail!("page check failed: answer button for task {id:?} has no panel");
        };
        if !dom::has_class(panel, HIDDEN_CLASS) {
            anyhow::bail!("page check failed: answer for task {id:?} is not hidden");
        }
    }

    Ok(())
}

fn in_content(node: &NodeRef) -> bool {
    node.ancestors().any(|a| dom::has_class(&a, CONTENT_CLASS))
}
