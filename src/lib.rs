mod answer;
mod builtin;
mod check;
mod cli;
mod config;
mod dom;
mod fetcher;
mod html;
mod outline;
mod progress;
mod resolve;
mod slug;
mod source;
mod theme;

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use cli::Args;
use fetcher::Fetcher;
use outline::Outline;
use resolve::{MathJaxQueue, Typesetter};
use source::{DictLocation, LocalDict, RemoteSource, Sources};

pub use answer::AnswerToggle;
pub use cli::ProgressMode;
pub use cli::{Args as CliArgs, Mode};
pub use config::{PageConfig, ProblemEntry, Source, TaskEntry, TaskId, Theme, TheoryEntry};
pub use dom::{ClickEvent, ClickEvents, Document};
pub use slug::{AnchorRegistry, slugify};
pub use theme::{MemoryStorage, Storage, ThemeMode, ThemeToggle};

pub async fn run(args: Args) -> anyhow::Result<()> {
    use std::io::IsTerminal as _;

    let progress_enabled = match args.progress {
        ProgressMode::Always => true,
        ProgressMode::Never => false,
        ProgressMode::Auto => std::io::stderr().is_terminal(),
    };
    let progress = progress::Progress::new(progress_enabled);
    progress.set_stage("Чтение конфигурации");

    let config: PageConfig = {
        let bytes = std::fs::read(&args.config)
            .with_context(|| format!("read {}", args.config.display()))?;
        serde_json::from_slice(&bytes).context("parse page config")?
    };

    let fetcher = Fetcher::new(&args.user_agent, args.max_concurrency)?;

    progress.set_stage("Загрузка локальных задач");
    let config_dir = args
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();
    let location = args
        .local_tasks
        .as_deref()
        .or(config.local_tasks_url.as_deref())
        .map(|raw| DictLocation::parse(raw, &config_dir));
    let local = LocalDict::load(location.as_ref(), &fetcher).await;
    let sources = Sources::new(RemoteSource::new(fetcher, args.api_base.clone()), local);

    let res = match args.mode {
        Mode::Dir => render_dir(&config, &args, &sources, &progress).await,
        Mode::Single => render_single(&config, &args, &sources, &progress).await,
    };
    progress.finish();
    res
}

/// Builds the outline and settles every task in it. Returns the outline and
/// the placeholders queued for math typesetting.
async fn render_outline(
    config: &PageConfig,
    args: &Args,
    sources: &Sources,
    progress: &progress::Progress,
) -> (Outline, Vec<String>) {
    progress.set_stage("Построение содержания");
    let mut anchors = slug::AnchorRegistry::new();
    let api_base = sources.remote().base();
    let host = api_base.host_str().unwrap_or(api_base.as_str());
    let mut outline = outline::build_outline(config, &mut anchors, host);
    progress.set_tasks_total(outline.slots().count());

    progress.set_stage("Загрузка задач");
    let mathjax = MathJaxQueue::new();
    let typesetter = args
        .mathjax
        .as_ref()
        .map(|_| &mathjax as &dyn Typesetter);
    let outcomes = resolve::resolve_outline(&mut outline, sources, typesetter, Some(progress)).await;
    let summary = resolve::summarize(&outcomes);
    tracing::info!(
        resolved = summary.resolved,
        failed = summary.failed,
        "tasks settled"
    );

    (outline, mathjax.containers())
}

fn page_title(config: &PageConfig) -> &str {
    config
        .page_title
        .as_deref()
        .filter(|title| !title.is_empty())
        .unwrap_or(html::DEFAULT_PAGE_TITLE)
}

async fn render_dir(
    config: &PageConfig,
    args: &Args,
    sources: &Sources,
    progress: &progress::Progress,
) -> anyhow::Result<()> {
    let out_dir = args.out.clone().unwrap_or_else(|| PathBuf::from("out"));
    std::fs::create_dir_all(&out_dir).with_context(|| format!("create {}", out_dir.display()))?;

    let (outline, typeset) = render_outline(config, args, sources, progress).await;

    progress.set_stage("Генерация HTML");
    let css_rel = write_asset_file(&out_dir, &args.assets_dir_name, "css/site.css", builtin::BUILTIN_CSS)?;
    let js_rel = write_asset_file(
        &out_dir,
        &args.assets_dir_name,
        "js/task-page.js",
        &html::page_script(),
    )?;
    let html = html::build_html(
        &outline,
        &html::PageMeta {
            title: page_title(config),
            mathjax_src: args.mathjax.as_ref(),
            typeset: &typeset,
        },
        &html::PageAssets::Linked {
            css_href: &css_rel,
            js_href: &js_rel,
        },
    );
    check::assert_page_consistent(&html)?;

    progress.set_stage("Запись результата");
    let html_path = out_dir.join("index.html");
    std::fs::write(&html_path, html).with_context(|| format!("write {}", html_path.display()))?;
    tracing::info!(path = %html_path.display(), "page written");
    Ok(())
}

async fn render_single(
    config: &PageConfig,
    args: &Args,
    sources: &Sources,
    progress: &progress::Progress,
) -> anyhow::Result<()> {
    let out_path = args
        .out
        .clone()
        .unwrap_or_else(|| PathBuf::from("index.html"));

    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
    }

    let (outline, typeset) = render_outline(config, args, sources, progress).await;

    progress.set_stage("Генерация HTML");
    let html = html::build_html(
        &outline,
        &html::PageMeta {
            title: page_title(config),
            mathjax_src: args.mathjax.as_ref(),
            typeset: &typeset,
        },
        &html::PageAssets::Inline,
    );
    check::assert_page_consistent(&html)?;

    progress.set_stage("Запись результата");
    std::fs::write(&out_path, html).with_context(|| format!("write {}", out_path.display()))?;
    tracing::info!(path = %out_path.display(), "page written");
    Ok(())
}

fn write_asset_file(
    out_dir: &Path,
    assets_dir_name: &str,
    name: &str,
    contents: &str,
) -> anyhow::Result<String> {
    let rel = format!("{assets_dir_name}/{name}");
    let abs = out_dir.join(&rel);
    if let Some(parent) = abs.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("create {}", parent.display()))?;
    }
    std::fs::write(&abs, contents).with_context(|| format!("write {}", abs.display()))?;
    Ok(rel)
}
