use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context as _;
use reqwest::StatusCode;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::config::{ProblemEntry, Source, TaskId};
use crate::fetcher::{Fetcher, HttpError};

pub const DEFAULT_FILE_TITLE: &str = "Файл";

/// Task content in the same shape whichever source it came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTask {
    pub text: String,
    pub key: String,
    pub files: Vec<FileRef>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    pub url: String,
    pub name: String,
    pub title: String,
}

/// Why a single task could not be loaded. Shown to the reader in place of
/// the task, so the messages are in the page's language.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Ошибка загрузки задачи {id} (HTTP {status})")]
    Remote { id: TaskId, status: StatusCode },

    #[error("Ошибка загрузки задачи {id}: {source}")]
    Transport {
        id: TaskId,
        #[source]
        source: HttpError,
    },

    #[error("Ошибка загрузки задачи {id}: некорректный ответ сервера")]
    Decode {
        id: TaskId,
        #[source]
        source: HttpError,
    },

    #[error("Ошибка загрузки задачи {id}: некорректный адрес API {base}")]
    Endpoint { id: TaskId, base: Url },

    #[error("Локальная задача не найдена: {id}")]
    LocalNotFound { id: TaskId },

    #[error("Задача {id} уже есть на странице выше")]
    Duplicate { id: TaskId },
}

impl LoadError {
    pub fn task_id(&self) -> &TaskId {
        match self {
            LoadError::Remote { id, .. }
            | LoadError::Transport { id, .. }
            | LoadError::Decode { id, .. }
            | LoadError::Endpoint { id, .. }
            | LoadError::LocalNotFound { id }
            | LoadError::Duplicate { id } => id,
        }
    }

    fn from_http(id: &TaskId, err: HttpError) -> Self {
        let id = id.clone();
        match err {
            HttpError::Status { status, .. } => LoadError::Remote { id, status },
            err @ HttpError::Transport { .. } => LoadError::Transport { id, source: err },
            err @ HttpError::Decode { .. } => LoadError::Decode { id, source: err },
        }
    }
}

/// The public task API: `GET {base}/api/v1/task/{id}`.
#[derive(Clone)]
pub struct RemoteSource {
    fetcher: Fetcher,
    base: Url,
}

#[derive(Debug, Deserialize)]
struct RemoteTask {
    #[serde(default, deserialize_with = "lenient_text")]
    text: String,
    #[serde(default, deserialize_with = "lenient_text")]
    key: String,
    #[serde(default, deserialize_with = "lenient_list")]
    files: Vec<RemoteFile>,
}

#[derive(Debug, Deserialize)]
struct RemoteFile {
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl RemoteSource {
    pub fn new(fetcher: Fetcher, base: Url) -> Self {
        Self { fetcher, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    pub fn task_url(&self, id: &TaskId) -> Option<Url> {
        let mut url = self.base.clone();
        url.path_segments_mut()
            .ok()?
            .pop_if_empty()
            .extend(["api", "v1", "task", id.as_str()]);
        Some(url)
    }

    pub async fn load(&self, id: &TaskId) -> Result<ResolvedTask, LoadError> {
        let url = self.task_url(id).ok_or_else(|| LoadError::Endpoint {
            id: id.clone(),
            base: self.base.clone(),
        })?;
        let task: RemoteTask = self
            .fetcher
            .get_json(url)
            .await
            .map_err(|e| LoadError::from_http(id, e))?;

        Ok(ResolvedTask {
            text: task.text,
            key: task.key,
            files: extract_files(task.files, &self.base),
        })
    }
}

/// Keeps entries that carry a URL and makes those URLs absolute.
fn extract_files(raw: Vec<RemoteFile>, base: &Url) -> Vec<FileRef> {
    raw.into_iter()
        .filter_map(|f| {
            let href = f.url.filter(|u| !u.trim().is_empty())?;
            let url = match base.join(href.trim()) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(url = %href, error = %e, "skipping task file with bad url");
                    return None;
                }
            };
            let name = f.name.unwrap_or_default();
            let title = if name.is_empty() {
                DEFAULT_FILE_TITLE.to_string()
            } else {
                name.clone()
            };
            Some(FileRef {
                url: url.to_string(),
                name,
                title,
            })
        })
        .collect()
}

/// Where the local task dictionary lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DictLocation {
    Remote(Url),
    File(PathBuf),
}

impl DictLocation {
    /// `http(s)` URLs are fetched; anything else is a path relative to
    /// `config_dir`.
    pub fn parse(raw: &str, config_dir: &Path) -> Self {
        match Url::parse(raw.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => DictLocation::Remote(url),
            _ => DictLocation::File(config_dir.join(raw.trim())),
        }
    }
}

impl std::fmt::Display for DictLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DictLocation::Remote(url) => write!(f, "{url}"),
            DictLocation::File(path) => write!(f, "{}", path.display()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LocalEntry {
    #[serde(default, deserialize_with = "lenient_text")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient_text")]
    pub key: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub files: Vec<LocalFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LocalFile {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Tasks bundled with the page, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct LocalDict {
    entries: HashMap<String, LocalEntry>,
}

impl<'de> Deserialize<'de> for LocalDict {
    /// Entries are read one by one: a `null` or malformed entry only drops
    /// that id, the rest of the dictionary stays usable.
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = HashMap::<String, serde_json::Value>::deserialize(deserializer)?;
        let mut entries = HashMap::with_capacity(raw.len());
        for (id, value) in raw {
            match serde_json::from_value::<Option<LocalEntry>>(value) {
                Ok(Some(entry)) => {
                    entries.insert(id, entry);
                }
                Ok(None) => {}
                Err(e) => tracing::warn!(task = %id, error = %e, "skipping malformed local task"),
            }
        }
        Ok(Self { entries })
    }
}

impl LocalDict {
    #[cfg(test)]
    pub fn from_entries(entries: impl IntoIterator<Item = (String, LocalEntry)>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn get(&self, id: &TaskId) -> Result<ResolvedTask, LoadError> {
        let entry = self
            .entries
            .get(id.as_str())
            .ok_or_else(|| LoadError::LocalNotFound { id: id.clone() })?;

        let files = entry
            .files
            .iter()
            .filter_map(|f| {
                let url = f.url.clone().filter(|u| !u.trim().is_empty())?;
                let name = f.name.clone().unwrap_or_default();
                let title = f
                    .title
                    .clone()
                    .filter(|t| !t.is_empty())
                    .or_else(|| Some(name.clone()).filter(|n| !n.is_empty()))
                    .unwrap_or_else(|| DEFAULT_FILE_TITLE.to_string());
                Some(FileRef { url, name, title })
            })
            .collect();

        Ok(ResolvedTask {
            text: entry.text.clone(),
            key: entry.key.clone(),
            files,
        })
    }

    /// Loads the dictionary once per render. A missing location gives an
    /// empty dictionary; so does a failed load, which is logged and not
    /// reported further.
    pub async fn load(location: Option<&DictLocation>, fetcher: &Fetcher) -> Self {
        let Some(location) = location else {
            return Self::default();
        };
        match Self::try_load(location, fetcher).await {
            Ok(dict) => {
                tracing::info!(%location, tasks = dict.len(), "loaded local tasks");
                dict
            }
            Err(e) => {
                tracing::error!(%location, error = %format!("{e:#}"), "local tasks unavailable");
                Self::default()
            }
        }
    }

    async fn try_load(location: &DictLocation, fetcher: &Fetcher) -> anyhow::Result<Self> {
        match location {
            DictLocation::Remote(url) => Ok(fetcher.get_json(url.clone()).await?),
            DictLocation::File(path) => {
                let bytes =
                    std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
                serde_json::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))
            }
        }
    }
}

/// Both task sources, picked per entry.
#[derive(Clone)]
pub struct Sources {
    remote: RemoteSource,
    local: LocalDict,
}

impl Sources {
    pub fn new(remote: RemoteSource, local: LocalDict) -> Self {
        Self { remote, local }
    }

    pub fn remote(&self) -> &RemoteSource {
        &self.remote
    }

    pub async fn resolve(&self, task: &ProblemEntry) -> Result<ResolvedTask, LoadError> {
        match task.source {
            Source::Kompege => self.remote.load(&task.id).await,
            Source::Local => self.local.get(&task.id),
        }
    }
}

/// Accepts a string, a number, a bool or null where the page expects text.
fn lenient_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}

/// A list where one is expected. Anything other than an array reads as
/// empty; array items that do not fit `T` are dropped.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: serde::de::DeserializeOwned,
{
    Ok(match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://kompege.ru").unwrap()
    }

    #[test]
    fn remote_files_are_filtered_and_absolutized() {
        let task: RemoteTask = serde_json::from_str(
            r#"{
  "text": "<p>t</p>",
  "key": 42,
  "files": [
    { "url": "/files/27_A.txt", "name": "27_A.txt" },
    { "url": "", "name": "empty" },
    { "name": "no-url" },
    null,
    { "url": "https://cdn.example.com/b.xlsx" }
  ]
}"#,
        )
        .unwrap();
        assert_eq!(task.key, "42");

        let files = extract_files(task.files, &base());
        assert_eq!(
            files,
            vec![
                FileRef {
                    url: "https://kompege.ru/files/27_A.txt".into(),
                    name: "27_A.txt".into(),
                    title: "27_A.txt".into(),
                },
                FileRef {
                    url: "https://cdn.example.com/b.xlsx".into(),
                    name: String::new(),
                    title: DEFAULT_FILE_TITLE.into(),
                },
            ]
        );
    }

    #[test]
    fn remote_task_tolerates_missing_fields() {
        let task: RemoteTask = serde_json::from_str(r#"{ "key": null, "files": null }"#).unwrap();
        assert_eq!(task.text, "");
        assert_eq!(task.key, "");
        assert!(task.files.is_empty());
    }

    #[test]
    fn task_url_appends_to_base_path() {
        let fetcher = Fetcher::new("test", 1).unwrap();
        let remote = RemoteSource::new(fetcher.clone(), base());
        assert_eq!(
            remote.task_url(&TaskId::new("5")).unwrap().as_str(),
            "https://kompege.ru/api/v1/task/5"
        );

        let nested = RemoteSource::new(fetcher, Url::parse("http://127.0.0.1:9/mirror/").unwrap());
        assert_eq!(
            nested.task_url(&TaskId::new("a b")).unwrap().as_str(),
            "http://127.0.0.1:9/mirror/api/v1/task/a%20b"
        );
    }

    #[test]
    fn local_lookup_hit_and_miss() {
        let dict: LocalDict = serde_json::from_str(
            r#"{
  "l-1": { "text": "локальная", "key": "17", "files": [ { "url": "data/1.txt", "name": "1.txt" } ] },
  "l-2": {}
}"#,
        )
        .unwrap();

        let hit = dict.get(&TaskId::new("l-1")).unwrap();
        assert_eq!(hit.text, "локальная");
        assert_eq!(hit.key, "17");
        assert_eq!(hit.files[0].title, "1.txt");

        let bare = dict.get(&TaskId::new("l-2")).unwrap();
        assert_eq!(bare, ResolvedTask::default());

        let err = dict.get(&TaskId::new("l-9")).unwrap_err();
        assert!(matches!(err, LoadError::LocalNotFound { .. }));
        assert!(err.to_string().contains("l-9"));
        assert_eq!(err.task_id().as_str(), "l-9");
    }

    #[test]
    fn malformed_local_entries_only_affect_themselves() {
        let dict: LocalDict = serde_json::from_str(
            r#"{
  "a": { "text": "первая", "key": "1" },
  "b": { "files": [ { "name": "no-url.txt" }, "junk", { "url": "b.txt" } ] },
  "c": { "files": "not a list" },
  "d": null,
  "e": "not an entry"
}"#,
        )
        .unwrap();

        assert_eq!(dict.get(&TaskId::new("a")).unwrap().text, "первая");
        assert_eq!(
            dict.get(&TaskId::new("b")).unwrap().files,
            vec![FileRef {
                url: "b.txt".into(),
                name: String::new(),
                title: DEFAULT_FILE_TITLE.into(),
            }]
        );
        assert!(dict.get(&TaskId::new("c")).unwrap().files.is_empty());
        assert!(matches!(
            dict.get(&TaskId::new("d")),
            Err(LoadError::LocalNotFound { .. })
        ));
        assert!(matches!(
            dict.get(&TaskId::new("e")),
            Err(LoadError::LocalNotFound { .. })
        ));
        assert_eq!(dict.len(), 3);
    }

    #[test]
    fn dict_location_parsing() {
        let dir = Path::new("/site");
        assert_eq!(
            DictLocation::parse("https://example.com/tasks.json", dir),
            DictLocation::Remote(Url::parse("https://example.com/tasks.json").unwrap())
        );
        assert_eq!(
            DictLocation::parse("data/tasks.json", dir),
            DictLocation::File(PathBuf::from("/site/data/tasks.json"))
        );
    }

    #[tokio::test]
    async fn failed_dict_load_degrades_to_empty() {
        let fetcher = Fetcher::new("test", 1).unwrap();
        let location = DictLocation::File(PathBuf::from("/definitely/not/here.json"));
        let dict = LocalDict::load(Some(&location), &fetcher).await;
        assert_eq!(dict.len(), 0);

        let dict = LocalDict::load(None, &fetcher).await;
        assert_eq!(dict.len(), 0);
    }
}
