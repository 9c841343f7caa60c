//! HTML snippet and manifest fragment: the data model and the writers.

use crate::context::OutputLayout;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::Path;
use tracing::error;

const HTML_BANNER: &str = "<!-- PWA Icons Generated by pwa-icon-gen -->";
const HTML_FOOTER: &str = "<!-- End PWA Icons -->";

/// One entry of a web app manifest `icons` array.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Icon path relative to the page that links the manifest.
    pub src: String,

    /// `"WxH"`.
    pub sizes: String,

    /// MIME type; always `image/png` for generated icons.
    #[serde(rename = "type")]
    pub mime_type: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub purpose: Option<String>,
}

impl ManifestEntry {
    pub fn png(src: String, sizes: String, purpose: Option<&str>) -> Self {
        Self {
            src,
            sizes,
            mime_type: "image/png".to_string(),
            purpose: purpose.map(str::to_string),
        }
    }
}

/// The full HTML snippet: banner, tags sorted and indented, footer.
pub fn render_html(tags: &[String]) -> String {
    let mut sorted = tags.to_vec();
    sorted.sort();
    let body: Vec<String> = sorted.iter().map(|tag| format!("  {tag}")).collect();
    format!("{HTML_BANNER}\n{}\n{HTML_FOOTER}", body.join("\n"))
}

/// The manifest fragment: entries sorted by `src`, as a 2-space indented
/// JSON array.
pub fn render_manifest(entries: &[ManifestEntry]) -> Result<String> {
    let mut sorted = entries.to_vec();
    sorted.sort_by(|a, b| a.src.cmp(&b.src));
    serde_json::to_string_pretty(&sorted).context("Failed to serialize manifest icons")
}

/// Which of the two outputs were requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputToggles {
    pub html: bool,
    pub manifest: bool,
}

/// Writes the snippet and the fragment. Each write is independent: a failure
/// is logged and does not stop the other.
pub fn write_outputs(
    tags: &[String],
    entries: &[ManifestEntry],
    layout: &OutputLayout,
    toggles: OutputToggles,
) {
    if toggles.html {
        println!("Generating HTML snippet...");
        if tags.is_empty() {
            println!("  No HTML tags generated.");
        } else {
            let path = layout.html_path();
            match write_file(&path, &render_html(tags)) {
                Ok(()) => println!("  ✓ HTML snippet saved to {}", path.display()),
                Err(err) => error!("{err:#}"),
            }
        }
    }

    if toggles.manifest {
        println!("Generating manifest fragment...");
        if entries.is_empty() {
            println!("  No manifest icons generated.");
        } else {
            let path = layout.manifest_path();
            match render_manifest(entries).and_then(|json| write_file(&path, &json)) {
                Ok(()) => println!("  ✓ Manifest icons fragment saved to {}", path.display()),
                Err(err) => error!("{err:#}"),
            }
        }
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    std::fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}
