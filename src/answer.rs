use kuchiki::NodeRef;

use crate::builtin::{HIDDEN_CLASS, HIDE_ANSWER_LABEL, SHOW_ANSWER_LABEL, TOGGLE_ANSWER_ACTION};
use crate::dom::{self, ClickEvent, ClickEvents};

/// Shows and hides answer panels in response to clicks on their buttons.
///
/// Mirrors `builtin::ANSWER_TOGGLE_JS`, which is what actually runs in the
/// browser.
#[derive(Clone)]
pub struct AnswerToggle {
    document: NodeRef,
}

impl AnswerToggle {
    /// `document` is searched for answer panels by id.
    pub fn new(document: NodeRef) -> Self {
        Self { document }
    }

    /// Registers one delegated listener on `root` (the themes container).
    pub fn attach(self, events: &mut impl ClickEvents, root: NodeRef) {
        events.listen(
            root,
            Box::new(move |event| {
                self.handle(event);
            }),
        );
    }

    /// Returns the panel's visibility after the click, or `None` when the
    /// click was not on a toggle button or the panel does not exist.
    pub fn handle(&self, event: &ClickEvent) -> Option<bool> {
        let button = event
            .target
            .inclusive_ancestors()
            .find(is_toggle_button)?;
        let id = dom::attr(&button, "data-id")?;
        let panel = dom::element_by_id(&self.document, &format!("answer-{id}"))?;

        let hidden = dom::toggle_class(&panel, HIDDEN_CLASS);
        dom::set_text(
            &button,
            if hidden {
                SHOW_ANSWER_LABEL
            } else {
                HIDE_ANSWER_LABEL
            },
        );
        Some(!hidden)
    }
}

fn is_toggle_button(node: &NodeRef) -> bool {
    dom::local_name(node).as_deref() == Some("button")
        && dom::attr(node, "data-action").as_deref() == Some(TOGGLE_ANSWER_ACTION)
}
