use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use indicatif::{HumanDuration, MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use crate::config::TaskId;

pub struct Progress {
    enabled: bool,
    start: Instant,

    // UI
    mp: Option<MultiProgress>,
    stage: ProgressBar,
    tasks: ProgressBar,

    // Counters
    tasks_total: AtomicU64,
    tasks_ok: AtomicU64,
    tasks_failed: AtomicU64,
}

impl Progress {
    pub fn new(enabled: bool) -> Arc<Self> {
        let start = Instant::now();

        if !enabled {
            return Arc::new(Self {
                enabled: false,
                start,
                mp: None,
                stage: ProgressBar::hidden(),
                tasks: ProgressBar::hidden(),
                tasks_total: AtomicU64::new(0),
                tasks_ok: AtomicU64::new(0),
                tasks_failed: AtomicU64::new(0),
            });
        }

        let mp = MultiProgress::with_draw_target(ProgressDrawTarget::stderr());

        let stage = mp.add(ProgressBar::new_spinner());
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}  [{elapsed_precise}]") {
            stage.set_style(style);
        }
        stage.enable_steady_tick(Duration::from_millis(80));
        stage.set_message("Подготовка");

        let tasks = mp.add(ProgressBar::new(0));
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
            tasks.set_style(style.progress_chars("##-"));
        }
        tasks.set_message("задачи");

        Arc::new(Self {
            enabled: true,
            start,
            mp: Some(mp),
            stage,
            tasks,
            tasks_total: AtomicU64::new(0),
            tasks_ok: AtomicU64::new(0),
            tasks_failed: AtomicU64::new(0),
        })
    }

    pub fn set_stage(&self, msg: impl Into<String>) {
        if !self.enabled {
            return;
        }
        self.stage.set_message(msg.into());
    }

    pub fn set_tasks_total(&self, total: usize) {
        self.tasks_total.store(total as u64, Ordering::Relaxed);
        if self.enabled {
            self.tasks.set_length(total as u64);
        }
    }

    pub fn task_done(&self, id: &TaskId, ok: bool) {
        if ok {
            self.tasks_ok.fetch_add(1, Ordering::Relaxed);
        } else {
            self.tasks_failed.fetch_add(1, Ordering::Relaxed);
        }
        if self.enabled {
            self.tasks.inc(1);
            self.tasks.set_message(format!(
                "задача {id} | ошибок {}",
                self.tasks_failed.load(Ordering::Relaxed)
            ));
        }
    }

    /// `(settled, failed, total)` so far.
    pub fn counts(&self) -> (u64, u64, u64) {
        let ok = self.tasks_ok.load(Ordering::Relaxed);
        let failed = self.tasks_failed.load(Ordering::Relaxed);
        (ok + failed, failed, self.tasks_total.load(Ordering::Relaxed))
    }

    pub fn finish(&self) {
        if !self.enabled {
            return;
        }
        self.stage.finish_with_message("Готово");
        self.tasks.finish_and_clear();
        if let Some(mp) = &self.mp {
            let (settled, failed, total) = self.counts();
            // Best effort: ensure the last render flushes.
            let _ = mp.println(format!(
                "Done in {}: tasks {settled}/{total}, failed {failed}",
                HumanDuration(self.start.elapsed())
            ));
        }
    }
}
