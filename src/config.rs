use std::fmt;

use serde::Deserialize;

/// Page description, the same object the browser page reads as
/// `window.TASK_PAGE_CONFIG`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageConfig {
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(default)]
    pub local_tasks_url: Option<String>,
    #[serde(default)]
    pub themes: Vec<Theme>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Theme {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tasks: Vec<TaskEntry>,
}

impl Theme {
    /// Title shown for the theme at 1-based `position` on the page.
    pub fn display_title(&self, position: usize) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Тема {position}"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskEntry {
    Theory(TheoryEntry),
    Problem(ProblemEntry),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TheoryEntry {
    pub title: Option<String>,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemEntry {
    pub id: TaskId,
    pub title: Option<String>,
    pub source: Source,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// The public task API (kompege.ru by default).
    #[default]
    Kompege,
    /// The page's local task dictionary.
    Local,
}

/// Task identifier; the config may spell it as a JSON string or number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        Ok(match RawId::deserialize(deserializer)? {
            RawId::Text(s) => TaskId(s),
            RawId::Number(n) => TaskId(n.to_string()),
        })
    }
}

#[derive(Deserialize)]
struct RawTaskEntry {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    id: Option<TaskId>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    source: Option<Source>,
}

impl TryFrom<RawTaskEntry> for TaskEntry {
    type Error = String;

    fn try_from(raw: RawTaskEntry) -> Result<Self, Self::Error> {
        if raw.kind.as_deref() == Some("theory") {
            return Ok(TaskEntry::Theory(TheoryEntry {
                title: raw.title,
                text: raw.text.unwrap_or_default(),
            }));
        }

        let id = raw.id.ok_or_else(|| {
            format!(
                "task entry {:?} has no id",
                raw.title.as_deref().unwrap_or_default()
            )
        })?;
        Ok(TaskEntry::Problem(ProblemEntry {
            id,
            title: raw.title,
            source: raw.source.unwrap_or_default(),
        }))
    }
}

impl<'de> Deserialize<'de> for TaskEntry {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawTaskEntry::deserialize(deserializer)?;
        TaskEntry::try_from(raw).map_err(serde::de::Error::custom)
    }
}

impl PageConfig {
    /// Problem entries across all themes, in declaration order.
    pub fn problems(&self) -> impl Iterator<Item = &ProblemEntry> {
        self.themes
            .iter()
            .flat_map(|theme| theme.tasks.iter())
            .filter_map(|entry| match entry {
                TaskEntry::Problem(p) => Some(p),
                TaskEntry::Theory(_) => None,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mixed_entries() {
        let config: PageConfig = serde_json::from_str(
            r#"{
  "pageTitle": "Задание 27",
  "localTasksUrl": "tasks.json",
  "themes": [
    {
      "title": "Тема 1",
      "tasks": [
        { "type": "theory", "title": "Идея", "text": "<p>x</p>" },
        { "id": 5, "source": "kompege" },
        { "id": "l-1", "title": "Своя", "source": "local" },
        { "id": 7 }
      ]
    },
    {}
  ]
}"#,
        )
        .unwrap();

        assert_eq!(config.page_title.as_deref(), Some("Задание 27"));
        assert_eq!(config.local_tasks_url.as_deref(), Some("tasks.json"));
        assert_eq!(config.themes.len(), 2);
        assert_eq!(config.themes[1].display_title(2), "Тема 2");

        let tasks = &config.themes[0].tasks;
        assert_eq!(
            tasks[0],
            TaskEntry::Theory(TheoryEntry {
                title: Some("Идея".into()),
                text: "<p>x</p>".into(),
            })
        );
        assert_eq!(
            tasks[1],
            TaskEntry::Problem(ProblemEntry {
                id: TaskId::new("5"),
                title: None,
                source: Source::Kompege,
            })
        );
        assert!(matches!(&tasks[2], TaskEntry::Problem(p) if p.source == Source::Local));
        assert!(matches!(&tasks[3], TaskEntry::Problem(p) if p.source == Source::Kompege));

        let ids: Vec<_> = config.problems().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, ["5", "l-1", "7"]);
    }

    #[test]
    fn empty_object_is_an_empty_page() {
        let config: PageConfig = serde_json::from_str("{}").unwrap();
        assert!(config.themes.is_empty());
        assert!(config.page_title.is_none());
    }

    #[test]
    fn problem_without_id_is_rejected() {
        let err = serde_json::from_str::<PageConfig>(
            r#"{ "themes": [ { "tasks": [ { "title": "oops" } ] } ] }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("has no id"));
    }

    #[test]
    fn problem_without_id_keeps_title_in_error() {
        let err = serde_json::from_str::<TaskEntry>(r#"{ "title": "Сумма" }"#).unwrap_err();
        assert!(err.to_string().contains("\"Сумма\" has no id"));
    }

    #[test]
    fn unknown_source_is_rejected() {
        assert!(
            serde_json::from_str::<PageConfig>(
                r#"{ "themes": [ { "tasks": [ { "id": 1, "source": "ftp" } ] } ] }"#,
            )
            .is_err()
        );
    }
}
