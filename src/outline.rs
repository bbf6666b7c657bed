use std::collections::HashSet;

use crate::config::{PageConfig, ProblemEntry, Source, TaskEntry, TheoryEntry};
use crate::slug::{AnchorRegistry, slugify};
use crate::source::{LoadError, ResolvedTask};

/// The page skeleton: table of contents plus one section per theme.
#[derive(Debug, Default)]
pub struct Outline {
    pub toc: Vec<TocEntry>,
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub anchor: String,
    pub title: String,
}

#[derive(Debug)]
pub struct Section {
    pub anchor: String,
    pub title: String,
    pub items: Vec<Item>,
}

#[derive(Debug)]
pub enum Item {
    Theory(TheoryEntry),
    Task(TaskSlot),
}

/// Placeholder for one problem entry.
#[derive(Debug)]
pub struct TaskSlot {
    pub task: ProblemEntry,
    /// 1-based position among the page's problem entries.
    pub number: usize,
    /// Where the task came from, shown next to remote tasks.
    pub citation: Option<String>,
    /// Another entry earlier on the page has the same id. Such a slot is
    /// never fetched and settles as failed.
    pub duplicate: bool,
    state: SlotState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotState {
    Skeleton,
    Resolved(ResolvedTask),
    Failed(String),
}

impl TaskSlot {
    pub fn new(task: ProblemEntry, number: usize, citation: Option<String>) -> Self {
        Self {
            task,
            number,
            citation,
            duplicate: false,
            state: SlotState::Skeleton,
        }
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn element_id(&self) -> String {
        if self.duplicate {
            format!("task-{}-{}", self.task.id, self.number)
        } else {
            format!("task-{}", self.task.id)
        }
    }

    pub fn answer_id(&self) -> String {
        format!("answer-{}", self.task.id)
    }

    /// Header text without the citation, e.g. `3. Сумма цифр`.
    pub fn heading(&self) -> String {
        format!("{}. {}", self.number, self.task.title.as_deref().unwrap_or(""))
    }

    /// Moves the slot out of `Skeleton`. Returns `false` and leaves the slot
    /// untouched if it has already settled.
    pub fn settle(&mut self, result: Result<ResolvedTask, &LoadError>) -> bool {
        if self.state != SlotState::Skeleton {
            tracing::warn!(task = %self.task.id, "task placeholder settled twice; ignoring");
            return false;
        }
        self.state = match result {
            Ok(task) => SlotState::Resolved(task),
            Err(e) => SlotState::Failed(e.to_string()),
        };
        true
    }
}

impl Outline {
    pub fn slots(&self) -> impl Iterator<Item = &TaskSlot> {
        self.sections
            .iter()
            .flat_map(|s| s.items.iter())
            .filter_map(|item| match item {
                Item::Task(slot) => Some(slot),
                Item::Theory(_) => None,
            })
    }

    pub fn slots_mut(&mut self) -> impl Iterator<Item = &mut TaskSlot> {
        self.sections
            .iter_mut()
            .flat_map(|s| s.items.iter_mut())
            .filter_map(|item| match item {
                Item::Task(slot) => Some(slot),
                Item::Theory(_) => None,
            })
    }
}

/// Builds anchors, the table of contents and numbered placeholders, in
/// declaration order. Nothing here touches the network.
///
/// `remote_host` names the task API in citations of remote tasks.
pub fn build_outline(
    config: &PageConfig,
    anchors: &mut AnchorRegistry,
    remote_host: &str,
) -> Outline {
    let mut outline = Outline::default();
    let mut number = 0usize;
    let mut seen = HashSet::new();

    for (i, theme) in config.themes.iter().enumerate() {
        let position = i + 1;
        let title = theme.display_title(position);
        let slug = slugify(&title);
        let anchor = anchors.assign(&format!("theme-{position}-{slug}"));

        outline.toc.push(TocEntry {
            anchor: anchor.clone(),
            title: title.clone(),
        });

        let items = theme
            .tasks
            .iter()
            .map(|entry| match entry {
                TaskEntry::Theory(theory) => Item::Theory(theory.clone()),
                TaskEntry::Problem(problem) => {
                    number += 1;
                    let citation = match problem.source {
                        Source::Kompege => {
                            Some(format!("(задача {} с {})", problem.id, remote_host))
                        }
                        Source::Local => None,
                    };
                    let mut slot = TaskSlot::new(problem.clone(), number, citation);
                    slot.duplicate = !seen.insert(problem.id.clone());
                    Item::Task(slot)
                }
            })
            .collect();

        outline.sections.push(Section {
            anchor,
            title,
            items,
        });
    }

    tracing::debug!(
        themes = outline.sections.len(),
        tasks = number,
        "outline built"
    );
    outline
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TaskId;

    fn config(json: &str) -> PageConfig {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn numbers_only_problems_across_themes() {
        let config = config(
            r#"{ "themes": [
  { "title": "Тема 1", "tasks": [
    { "type": "theory", "text": "x" },
    { "id": 5 },
    { "id": 6, "source": "local" }
  ] },
  { "title": "Тема 2", "tasks": [
    { "type": "theory", "text": "y" },
    { "id": 7, "title": "Сумма" }
  ] }
] }"#,
        );
        let outline = build_outline(&config, &mut AnchorRegistry::new(), "kompege.ru");

        let numbered: Vec<_> = outline
            .slots()
            .map(|s| (s.task.id.as_str(), s.number))
            .collect();
        assert_eq!(numbered, [("5", 1), ("6", 2), ("7", 3)]);

        let last = outline.slots().last().unwrap();
        assert_eq!(last.heading(), "3. Сумма");
        assert_eq!(last.element_id(), "task-7");
        assert_eq!(last.answer_id(), "answer-7");
    }

    #[test]
    fn citation_only_for_remote_tasks() {
        let config = config(
            r#"{ "themes": [ { "tasks": [ { "id": 5 }, { "id": "a", "source": "local" } ] } ] }"#,
        );
        let outline = build_outline(&config, &mut AnchorRegistry::new(), "kompege.ru");
        let citations: Vec<_> = outline.slots().map(|s| s.citation.clone()).collect();
        assert_eq!(
            citations,
            [Some("(задача 5 с kompege.ru)".to_string()), None]
        );
    }

    #[test]
    fn toc_follows_declaration_order_with_unique_anchors() {
        let config = config(
            r#"{ "themes": [ { "title": "Тема 1" }, {}, { "title": "" }, { "title": "Тема 1" } ] }"#,
        );
        let mut anchors = AnchorRegistry::new();
        let outline = build_outline(&config, &mut anchors, "kompege.ru");

        assert_eq!(
            outline.toc,
            vec![
                TocEntry {
                    anchor: "theme-1-тема-1".into(),
                    title: "Тема 1".into(),
                },
                TocEntry {
                    anchor: "theme-2-тема-2".into(),
                    title: "Тема 2".into(),
                },
                TocEntry {
                    anchor: "theme-3-".into(),
                    title: "".into(),
                },
                TocEntry {
                    anchor: "theme-4-тема-1".into(),
                    title: "Тема 1".into(),
                },
            ]
        );
        assert_eq!(outline.sections[0].anchor, outline.toc[0].anchor);
        assert_eq!(anchors.assign("theme-1-тема-1"), "theme-1-тема-1-2");
    }

    #[test]
    fn repeated_task_id_gets_its_own_element() {
        let config = config(
            r#"{ "themes": [ { "tasks": [ { "id": 5 }, { "id": 6 } ] }, { "tasks": [ { "id": "5" } ] } ] }"#,
        );
        let outline = build_outline(&config, &mut AnchorRegistry::new(), "kompege.ru");

        let slots: Vec<_> = outline
            .slots()
            .map(|s| (s.element_id(), s.duplicate))
            .collect();
        assert_eq!(
            slots,
            [
                ("task-5".to_string(), false),
                ("task-6".to_string(), false),
                ("task-5-3".to_string(), true),
            ]
        );
    }

    #[test]
    fn slot_settles_once() {
        let task = ProblemEntry {
            id: TaskId::new("1"),
            title: None,
            source: Source::Local,
        };
        let mut slot = TaskSlot::new(task, 1, None);
        assert_eq!(slot.state(), &SlotState::Skeleton);
        assert_eq!(slot.heading(), "1. ");

        let err = LoadError::LocalNotFound {
            id: TaskId::new("1"),
        };
        assert!(slot.settle(Err(&err)));
        assert!(!slot.settle(Ok(ResolvedTask::default())));
        assert!(matches!(slot.state(), SlotState::Failed(msg) if msg.contains('1')));
    }
}
