//! Plain-text preview cards for artifacts.
//!
//! Each [`Preview`] variant has its own fixed layout; the match is exhaustive
//! so a new artifact kind cannot be added without a renderer.

use std::fmt::Write;

use super::{Artifact, Preview};

/// Render an artifact as a multi-line preview card.
pub fn render_preview(artifact: &Artifact) -> String {
    let mut out = String::with_capacity(256);
    let status = if artifact.is_saved() { "Saved" } else { "Unsaved" };
    let _ = writeln!(
        out,
        "Preview: {} - {} [{}]",
        artifact.kind(),
        artifact.name,
        status
    );

    match &artifact.preview {
        Preview::Rule { condition, actions } => {
            out.push_str("Rule Definition\n");
            let _ = writeln!(out, "  Name:      {}", artifact.name);
            let _ = writeln!(out, "  Condition: {condition}");
            let _ = writeln!(out, "  Actions:   {actions}");
        }
        Preview::Feature {
            feature_type,
            expression,
        } => {
            out.push_str("Feature Definition\n");
            let _ = writeln!(out, "  Name:       {}", artifact.name);
            let _ = writeln!(out, "  Type:       {feature_type}");
            let _ = writeln!(out, "  Expression: {expression}");
        }
        Preview::Dataset { rows } => {
            out.push_str("Dataset Sample\n");
            let _ = writeln!(
                out,
                "  {:<10} {:<10} {:>10}  {}",
                "event_id", "user_id", "amount", "timestamp"
            );
            for row in rows {
                let _ = writeln!(
                    out,
                    "  {:<10} {:<10} {:>10.2}  {}",
                    row.event_id, row.user_id, row.amount, row.ts
                );
            }
        }
    }

    if let Some(path) = artifact.edit_reference() {
        let _ = writeln!(out, "Open in editor: {path}");
    }
    out
}
