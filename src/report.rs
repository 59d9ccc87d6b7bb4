//! Rendering of batch outcomes.

use std::fmt::Write as _;

use crate::config::ReportFormat;
use crate::error::Result;
use crate::types::ResourceDescriptor;

/// Render outcomes as the two-section text report.
///
/// The first section has one line per item: id and title on success, a failure
/// line keyed by address otherwise. The second section lists commenter names
/// for every item that has a comment list (possibly empty) and a failure line
/// for the rest.
pub fn render_text(results: &[ResourceDescriptor]) -> String {
    let mut out = String::new();

    for (i, descriptor) in results.iter().enumerate() {
        match descriptor.post() {
            Some(post) => {
                writeln!(out, "🔹 {} - id={} title={:?}", i + 1, post.id, post.title).ok();
            }
            None => {
                writeln!(out, "❌ error getting post: {}", descriptor.address()).ok();
            }
        }
    }

    out.push('\n');

    for descriptor in results {
        match (descriptor.post(), descriptor.comments()) {
            (Some(post), Some(comments)) => {
                writeln!(out, "Following people commented on Post id {}:", post.id).ok();
                for (i, comment) in comments.iter().enumerate() {
                    writeln!(out, "\t({i}) 🔹Name: {}", comment.name).ok();
                }
            }
            _ => {
                writeln!(out, "❌ error getting comments: {}", descriptor.address()).ok();
            }
        }
    }

    out
}

/// Render outcomes as a pretty-printed JSON array, newline-terminated.
pub fn render_json(results: &[ResourceDescriptor]) -> Result<String> {
    let mut out = serde_json::to_string_pretty(results)?;
    out.push('\n');
    Ok(out)
}

/// Render outcomes in `format`.
pub fn render(results: &[ResourceDescriptor], format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Text => Ok(render_text(results)),
        ReportFormat::Json => render_json(results),
    }
}
