use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use url::Url;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Mode {
    Dir,
    Single,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ProgressMode {
    /// Enable progress UI when stderr is a TTY.
    Auto,
    /// Always enable progress UI (even when piped).
    Always,
    /// Never show progress UI.
    Never,
}

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Args {
    /// Page configuration JSON: `pageTitle`, `localTasksUrl` and `themes`.
    #[arg(long)]
    pub config: PathBuf,

    /// Output path. For `single` mode: an HTML file path. For `dir` mode: a directory.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Output mode: `single` (one self-contained HTML) or `dir` (HTML + assets/).
    #[arg(long, value_enum, default_value = "single")]
    pub mode: Mode,

    /// Base URL of the task API; tasks are fetched from `{api_base}/api/v1/task/{id}`
    /// and relative file links are resolved against it.
    #[arg(long, default_value = "https://kompege.ru")]
    pub api_base: Url,

    /// Local task dictionary (URL or path), overriding `localTasksUrl` from the config.
    ///
    /// Relative paths are resolved against the config file's directory.
    #[arg(long)]
    pub local_tasks: Option<String>,

    /// MathJax script to load; resolved tasks are typeset once it is ready.
    #[arg(long)]
    pub mathjax: Option<Url>,

    /// Assets directory name for `dir` mode.
    #[arg(long, default_value = "assets")]
    pub assets_dir_name: String,

    /// Max concurrent task downloads.
    #[arg(long, default_value_t = 8)]
    pub max_concurrency: usize,

    /// HTTP User-Agent used for API requests.
    #[arg(long, default_value = "task-page-render/0.1")]
    pub user_agent: String,

    /// Progress display: `auto`, `always`, or `never`.
    #[arg(long, value_enum, default_value = "auto")]
    pub progress: ProgressMode,
}
