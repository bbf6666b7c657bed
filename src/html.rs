use maud::{DOCTYPE, Markup, PreEscaped, html};
use url::Url;

use crate::builtin;
use crate::outline::{Item, Outline, Section, SlotState, TaskSlot};
use crate::source::{FileRef, ResolvedTask};

pub const DEFAULT_PAGE_TITLE: &str = "Задачи";

/// Wraps task and theory text, which is inserted into the page as is.
pub const CONTENT_CLASS: &str = "task-text";

/// How the page gets its stylesheet and scripts.
pub enum PageAssets<'a> {
    /// Everything embedded in the HTML.
    Inline,
    /// Separate files written next to the page.
    Linked { css_href: &'a str, js_href: &'a str },
}

pub struct PageMeta<'a> {
    pub title: &'a str,
    /// MathJax build to load, if any.
    pub mathjax_src: Option<&'a Url>,
    /// Placeholders to hand to MathJax after load.
    pub typeset: &'a [String],
}

/// The page's own scripts, in the order they must run.
pub fn page_script() -> String {
    format!(
        "{}\n{}\n",
        builtin::THEME_TOGGLE_JS,
        builtin::ANSWER_TOGGLE_JS
    )
}

pub fn build_html(outline: &Outline, meta: &PageMeta<'_>, assets: &PageAssets<'_>) -> String {
    let markup: Markup = html! {
        (DOCTYPE)
        html lang="ru" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                meta name="color-scheme" content="light dark";
                title { (meta.title) }
                @match assets {
                    PageAssets::Inline => {
                        style { (PreEscaped(builtin::BUILTIN_CSS)) }
                    }
                    PageAssets::Linked { css_href, .. } => {
                        link rel="stylesheet" href=(css_href);
                    }
                }
                @if let Some(src) = meta.mathjax_src {
                    script src=(src.as_str()) async {}
                }
            }
            body {
                header class="topbar" {
                    div class="container topbar-inner" {
                        h1 id="pageTitle" { (meta.title) }
                        button type="button" id="themeToggle" class="btn" { "Сменить тему" }
                    }
                }
                main class="container" {
                    nav class="toc-block" {
                        h2 { "Содержание" }
                        ul id="toc" class="toc" {
                            @for entry in &outline.toc {
                                li {
                                    a class="social-link toc-link" href=(format!("#{}", entry.anchor)) { (entry.title) }
                                }
                            }
                        }
                    }
                    div id="themesRoot" {
                        @for section in &outline.sections {
                            (render_section(section))
                        }
                    }
                }
                footer class="footer" {
                    div class="container" {
                        "Задач: " (outline.slots().count())
                    }
                }
                @match assets {
                    PageAssets::Inline => {
                        script { (PreEscaped(page_script())) }
                    }
                    PageAssets::Linked { js_href, .. } => {
                        script src=(js_href) {}
                    }
                }
                @if meta.mathjax_src.is_some() && !meta.typeset.is_empty() {
                    script { (PreEscaped(builtin::mathjax_typeset_js(meta.typeset))) }
                }
            }
        }
    };
    markup.into_string()
}

fn render_section(section: &Section) -> Markup {
    html! {
        div class="theme-block" {
            div id=(section.anchor) class="anchor-offset" {}
            h2 class="theme-title" { (section.title) }
            @for item in &section.items {
                @match item {
                    Item::Theory(theory) => {
                        div class="task theory-block" {
                            @if let Some(title) = &theory.title {
                                h3 { (title) }
                            }
                            div class=(CONTENT_CLASS) { (PreEscaped(&theory.text)) }
                        }
                    }
                    Item::Task(slot) => {
                        (render_slot(slot))
                    }
                }
            }
        }
    }
}

/// One problem placeholder in whatever state it settled in.
pub fn render_slot(slot: &TaskSlot) -> Markup {
    let task_id = slot.task.id.as_str();
    html! {
        @match slot.state() {
            SlotState::Skeleton => {
                article class="task" id=(slot.element_id()) {
                    (render_heading(slot))
                }
            }
            SlotState::Resolved(task) => {
                article class="task" id=(slot.element_id()) {
                    (render_heading(slot))
                    (render_resolved_body(task, task_id, &slot.answer_id()))
                }
            }
            SlotState::Failed(message) => {
                article class="task task-failed" id=(slot.element_id()) {
                    (render_heading(slot))
                    p class="task-error" { (message) }
                }
            }
        }
    }
}

fn render_heading(slot: &TaskSlot) -> Markup {
    html! {
        h3 {
            (slot.heading())
            @if let Some(citation) = &slot.citation {
                " "
                span class="muted" { (citation) }
            }
        }
    }
}

fn render_resolved_body(task: &ResolvedTask, task_id: &str, answer_id: &str) -> Markup {
    html! {
        div class=(CONTENT_CLASS) { (PreEscaped(&task.text)) }
        (render_files(&task.files))
        button class="btn" type="button" data-action=(builtin::TOGGLE_ANSWER_ACTION) data-id=(task_id) {
            (builtin::SHOW_ANSWER_LABEL)
        }
        div class=(format!("answer {}", builtin::HIDDEN_CLASS)) id=(answer_id) {
            p { (task.key) }
        }
    }
}

fn render_files(files: &[FileRef]) -> Markup {
    html! {
        @if !files.is_empty() {
            div class="task-files-inline" {
                "Файлы к заданию: "
                @for (i, file) in files.iter().enumerate() {
                    @if i > 0 {
                        ", "
                    }
                    @if file.name.is_empty() {
                        a class="file-link" href=(file.url) download { (file.title) }
                    } @else {
                        a class="file-link" href=(file.url) download=(file.name) { (file.title) }
                    }
                }
            }
        }
    }
}
