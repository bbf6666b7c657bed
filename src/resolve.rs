use std::future::Future;
use std::sync::Mutex;

use crate::config::TaskId;
use crate::outline::Outline;
use crate::progress::Progress;
use crate::source::{LoadError, Sources};

/// Outcome of one future passed to [`settle_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Settled<T, E> {
    Fulfilled(T),
    Rejected(E),
}

impl<T, E> Settled<T, E> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }
}

impl<T, E> From<Result<T, E>> for Settled<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(v) => Settled::Fulfilled(v),
            Err(e) => Settled::Rejected(e),
        }
    }
}

/// Drives all futures concurrently and waits for every one of them. A
/// failure never cuts the others short. Results come back in input order.
pub async fn settle_all<I, F, T, E>(futures: I) -> Vec<Settled<T, E>>
where
    I: IntoIterator<Item = F>,
    F: Future<Output = Result<T, E>>,
{
    futures::future::join_all(futures)
        .await
        .into_iter()
        .map(Settled::from)
        .collect()
}

/// Post-processor run on each placeholder once its content is in place,
/// e.g. math typesetting.
pub trait Typesetter {
    fn typeset(&self, container_id: &str);
}

/// Collects resolved placeholders for a single `MathJax.typesetPromise`
/// call in the page.
#[derive(Debug, Default)]
pub struct MathJaxQueue {
    containers: Mutex<Vec<String>>,
}

impl MathJaxQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn containers(&self) -> Vec<String> {
        self.containers
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Typesetter for MathJaxQueue {
    fn typeset(&self, container_id: &str) {
        if let Ok(mut containers) = self.containers.lock() {
            containers.push(container_id.to_string());
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ResolveSummary {
    pub resolved: usize,
    pub failed: usize,
}

/// Fills every placeholder of `outline` from its source.
///
/// Fetches are started in declaration order and each placeholder is updated
/// as soon as its own fetch settles. Returns one entry per placeholder, in
/// declaration order.
pub async fn resolve_outline(
    outline: &mut Outline,
    sources: &Sources,
    typesetter: Option<&dyn Typesetter>,
    progress: Option<&Progress>,
) -> Vec<Settled<TaskId, LoadError>> {
    let pending = outline.slots_mut().map(move |slot| async move {
        let result = if slot.duplicate {
            Err(LoadError::Duplicate {
                id: slot.task.id.clone(),
            })
        } else {
            sources.resolve(&slot.task).await
        };
        let id = slot.task.id.clone();
        if let Some(progress) = progress {
            progress.task_done(&id, result.is_ok());
        }
        match result {
            Ok(task) => {
                slot.settle(Ok(task));
                if let Some(typesetter) = typesetter {
                    typesetter.typeset(&slot.element_id());
                }
                Ok(id)
            }
            Err(e) => {
                tracing::warn!(task = %e.task_id(), error = %e, "task failed to load");
                slot.settle(Err(&e));
                Err(e)
            }
        }
    });
    settle_all(pending).await
}

pub fn summarize(outcomes: &[Settled<TaskId, LoadError>]) -> ResolveSummary {
    let resolved = outcomes.iter().filter(|o| o.is_fulfilled()).count();
    ResolveSummary {
        resolved,
        failed: outcomes.len() - resolved,
    }
}
