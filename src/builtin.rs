pub const BUILTIN_CSS: &str = include_str!("builtin.css");

/// Storage key and root class shared by the page script and [`crate::theme`].
pub const THEME_STORAGE_KEY: &str = "theme";
pub const DARK_CLASS: &str = "dark";

pub const SHOW_ANSWER_LABEL: &str = "Показать ответ";
pub const HIDE_ANSWER_LABEL: &str = "Скрыть ответ";
pub const HIDDEN_CLASS: &str = "hidden";
pub const TOGGLE_ANSWER_ACTION: &str = "toggle-answer";

pub const THEME_TOGGLE_JS: &str = r#"(function () {
  var storageKey = "theme";
  var root = document.documentElement;
  var button = document.getElementById("themeToggle");

  var saved = null;
  try {
    saved = localStorage.getItem(storageKey);
  } catch (_) {
    saved = null;
  }
  if (saved === "dark") {
    root.classList.add("dark");
  }

  if (button) {
    button.addEventListener("click", function () {
      root.classList.toggle("dark");
      try {
        localStorage.setItem(storageKey, root.classList.contains("dark") ? "dark" : "light");
      } catch (_) {}
    });
  }
})();"#;

pub const ANSWER_TOGGLE_JS: &str = r#"(function () {
  var themesRoot = document.getElementById("themesRoot");
  if (!themesRoot) return;

  themesRoot.addEventListener("click", function (e) {
    var btn = e.target.closest('button[data-action="toggle-answer"]');
    if (!btn) return;

    var ans = document.getElementById("answer-" + btn.dataset.id);
    if (!ans) return;

    ans.classList.toggle("hidden");
    btn.textContent = ans.classList.contains("hidden") ? "Показать ответ" : "Скрыть ответ";
  });
})();"#;

/// Script asking MathJax to typeset the given containers once it has loaded.
pub fn mathjax_typeset_js(container_ids: &[String]) -> String {
    let ids = serde_json::to_string(container_ids)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/");
    format!(
        r#"window.addEventListener("load", function () {{
  if (!window.MathJax || !window.MathJax.typesetPromise) return;
  var nodes = {ids}.map(function (id) {{ return document.getElementById(id); }}).filter(Boolean);
  window.MathJax.typesetPromise(nodes);
}});"#
    )
}
