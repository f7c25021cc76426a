use std::collections::{BTreeMap, HashMap};

use crate::api::dto::ContextSuggestion;
use crate::services::api_client::{ApiClient, FileSource};

/// Per target file, the context files to send along with generation.
///
/// Paths keep insertion order and appear at most once. A file is never
/// its own context.
#[derive(Debug, Clone, Default)]
pub struct ContextSelection {
    selections: HashMap<String, Vec<String>>,
}

impl ContextSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking `file_path` (selected for batch processing).
    pub fn track(&mut self, file_path: &str) {
        self.selections.entry(file_path.to_string()).or_default();
    }

    /// Stops tracking `file_path` and drops its selection.
    pub fn untrack(&mut self, file_path: &str) {
        self.selections.remove(file_path);
    }

    pub fn is_tracked(&self, file_path: &str) -> bool {
        self.selections.contains_key(file_path)
    }

    /// Forgets every selection, e.g. after a new upload.
    pub fn clear(&mut self) {
        self.selections.clear();
    }

    pub fn selection(&self, file_path: &str) -> &[String] {
        self.selections
            .get(file_path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn has_selection(&self, file_path: &str) -> bool {
        !self.selection(file_path).is_empty()
    }

    /// Adds `context_path` if absent, removes it otherwise.
    pub fn toggle(&mut self, file_path: &str, context_path: &str) {
        if file_path == context_path {
            tracing::debug!("Ignoring self-reference for {}", file_path);
            return;
        }

        let selected = self.selections.entry(file_path.to_string()).or_default();
        if let Some(pos) = selected.iter().position(|p| p == context_path) {
            selected.remove(pos);
        } else {
            selected.push(context_path.to_string());
        }
    }

    /// Appends the paths not already selected.
    pub fn add<I, S>(&mut self, file_path: &str, context_paths: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected = self.selections.entry(file_path.to_string()).or_default();
        for path in context_paths {
            let path = path.into();
            if path != file_path && !selected.contains(&path) {
                selected.push(path);
            }
        }
    }

    pub fn remove(&mut self, file_path: &str, context_path: &str) {
        if let Some(selected) = self.selections.get_mut(file_path) {
            selected.retain(|p| p != context_path);
        }
    }

    /// Replaces the selection with the `n` highest-scoring suggestions.
    /// Ties keep the backend's order.
    pub fn select_top_n(&mut self, file_path: &str, suggestions: &[ContextSuggestion], n: usize) {
        let mut ranked: Vec<&ContextSuggestion> = suggestions
            .iter()
            .filter(|s| s.path != file_path)
            .collect();
        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));

        let mut top: Vec<String> = Vec::with_capacity(n);
        for suggestion in ranked {
            if top.len() == n {
                break;
            }
            if !top.contains(&suggestion.path) {
                top.push(suggestion.path.clone());
            }
        }

        self.selections.insert(file_path.to_string(), top);
    }
}

/// Backend suggestions for `file_path`, or none when the backend cannot
/// provide them.
pub async fn fetch_suggestions(client: &ApiClient, file_path: &str) -> Vec<ContextSuggestion> {
    match client.suggest_context_files(file_path).await {
        Ok(response) => {
            tracing::debug!(
                "{} suggestions for {} (ai_enhanced={:?})",
                response.suggestions.len(),
                file_path,
                response.ai_enhanced
            );
            response.suggestions
        }
        Err(e) => {
            tracing::warn!("Failed to load smart suggestions for {}: {}", file_path, e);
            Vec::new()
        }
    }
}

/// Reads every context path, keyed by file name. Paths that fail to read
/// are logged and left out.
pub async fn resolve_context_content(
    source: &dyn FileSource,
    paths: &[String],
) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();

    for path in paths {
        match source.read_source(path).await {
            Ok(code) => {
                context.insert(file_name_of(path).to_string(), code);
            }
            Err(e) => {
                tracing::warn!("Failed to load context file: {}: {}", path, e);
            }
        }
    }

    context
}

/// Last segment of a `/` or `\` separated path.
pub fn file_name_of(path: &str) -> &str {
    path.rsplit(|c| c == '/' || c == '\\')
        .next()
        .filter(|name| !name.is_empty())
        .unwrap_or(path)
}
