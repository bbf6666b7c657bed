use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use kuchiki::NodeRef;

use crate::builtin::{DARK_CLASS, THEME_STORAGE_KEY};
use crate::dom::{self, ClickEvents};

/// Key/value storage in the shape of the browser's `localStorage`.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str);
}

impl<S: Storage + ?Sized> Storage for Rc<S> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }
}

#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: RefCell<HashMap<String, String>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.values.borrow().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.values
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeMode {
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

/// Light/dark switch on the document root, remembered in [`Storage`].
///
/// Mirrors `builtin::THEME_TOGGLE_JS`.
pub struct ThemeToggle<S> {
    root: NodeRef,
    storage: S,
}

impl<S: Storage> ThemeToggle<S> {
    /// Applies the persisted mode to `root`. Anything but `"dark"` leaves
    /// the page light.
    pub fn init(root: NodeRef, storage: S) -> Self {
        if storage.get(THEME_STORAGE_KEY).as_deref() == Some(ThemeMode::Dark.as_str()) {
            dom::set_class(&root, DARK_CLASS, true);
        }
        Self { root, storage }
    }

    pub fn mode(&self) -> ThemeMode {
        if dom::has_class(&self.root, DARK_CLASS) {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        }
    }

    /// Flips the mode and persists it right away.
    pub fn toggle(&self) -> ThemeMode {
        let mode = if dom::toggle_class(&self.root, DARK_CLASS) {
            ThemeMode::Dark
        } else {
            ThemeMode::Light
        };
        self.storage.set(THEME_STORAGE_KEY, mode.as_str());
        mode
    }
}

impl<S: Storage + 'static> ThemeToggle<S> {
    /// Toggles on every click on `trigger`.
    pub fn attach(self, events: &mut impl ClickEvents, trigger: NodeRef) {
        events.listen(
            trigger,
            Box::new(move |_| {
                self.toggle();
            }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::Document;

    const PAGE: &str = r#"<html><body><button id="themeToggle">Сменить тему</button></body></html>"#;

    #[test]
    fn saved_dark_mode_is_applied_on_init() {
        let doc = Document::parse(PAGE);
        let storage = MemoryStorage::default();
        storage.set("theme", "dark");

        let toggle = ThemeToggle::init(doc.document_element().unwrap(), storage);
        assert_eq!(toggle.mode(), ThemeMode::Dark);
        assert!(dom::has_class(&doc.document_element().unwrap(), "dark"));
    }

    #[test]
    fn unknown_or_missing_value_means_light() {
        let doc = Document::parse(PAGE);
        let storage = MemoryStorage::default();
        storage.set("theme", "sepia");
        assert_eq!(
            ThemeToggle::init(doc.document_element().unwrap(), storage).mode(),
            ThemeMode::Light
        );

        let doc = Document::parse(PAGE);
        assert_eq!(
            ThemeToggle::init(doc.document_element().unwrap(), MemoryStorage::default()).mode(),
            ThemeMode::Light
        );
    }

    #[test]
    fn clicks_flip_and_persist() {
        let mut doc = Document::parse(PAGE);
        let storage = Rc::new(MemoryStorage::default());
        let trigger = doc.element_by_id("themeToggle").unwrap();
        ThemeToggle::init(doc.document_element().unwrap(), storage.clone())
            .attach(&mut doc, trigger.clone());

        doc.click(&trigger);
        assert_eq!(storage.get("theme").as_deref(), Some("dark"));
        assert!(dom::has_class(&doc.document_element().unwrap(), "dark"));

        doc.click(&trigger);
        assert_eq!(storage.get("theme").as_deref(), Some("light"));
        assert!(!dom::has_class(&doc.document_element().unwrap(), "dark"));
    }
}
