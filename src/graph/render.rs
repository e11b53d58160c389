//! Plain-text dump of the whole graph, one block per class.

use std::fmt::Write as _;

use crate::error::Result;
use crate::graph::traversal::TraversalEngine;

/// Call lists longer than this are cut and suffixed with `...`.
const MAX_CALLS_WIDTH: usize = 50;
const METHOD_INDENT: &str = "                   |____> ";

fn truncate_calls(calls: &str) -> String {
    if calls.chars().count() <= MAX_CALLS_WIDTH {
        return calls.to_string();
    }
    let kept: String = calls.chars().take(MAX_CALLS_WIDTH - 3).collect();
    format!("{kept}...")
}

impl TraversalEngine<'_> {
    /// Render every class and its methods:
    ///
    /// ```text
    /// OrderService (Properties - Type:Class,FilePath:src/OrderService.cs,Visibility:Public)
    ///                    |____> Place  (Properties - Type:Method,Visibility:Public,Calls:[Save,Validate])
    /// ```
    ///
    /// `Calls` lists the raw call names of every outgoing CALLS edge, sorted.
    pub fn render_text(&self) -> Result<String> {
        let backend = self.backend();
        let mut out = String::new();
        for class in backend.classes()? {
            let _ = writeln!(
                out,
                "{} (Properties - Type:Class,FilePath:{},Visibility:{})",
                class.name, class.file_path, class.visibility
            );
            for method in backend.declared_methods(class.id)? {
                let mut names: Vec<String> = backend
                    .outgoing_calls(method.id)?
                    .into_iter()
                    .map(|e| e.call_name)
                    .collect();
                names.sort();
                names.dedup();
                let _ = writeln!(
                    out,
                    "{METHOD_INDENT}{}  (Properties - Type:Method,Visibility:{},Calls:[{}])",
                    method.name,
                    method.visibility,
                    truncate_calls(&names.join(","))
                );
            }
            out.push('\n');
        }
        Ok(out)
    }
}
