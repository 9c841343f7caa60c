//! Runs one category: every target size through the transform engine, then
//! the file name, the `<head>` tag and the manifest entry for it.

use crate::category::{CategoryConfig, HtmlTag};
use crate::context::{CategoryMode, GenerationContext};
use crate::output::ManifestEntry;
use crate::resolution::{FilePrefixes, Resolution};
use crate::source::SourceImage;
use crate::transform;
use anyhow::{anyhow, Result};
use path_slash::PathExt as _;
use std::path::Path;
use tracing::{debug, info, warn};

/// What one category contributes to the output files.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CategoryOutput {
    pub html_tags: Vec<String>,
    pub manifest_entries: Vec<ManifestEntry>,
}

/// Processes every size of `config`'s size group.
///
/// An empty size group or an unresolved source yields an empty result. A
/// failure at one size is logged and the remaining sizes still run.
pub fn process_category(
    config: &CategoryConfig,
    mode: CategoryMode,
    ctx: &GenerationContext,
) -> CategoryOutput {
    let mut output = CategoryOutput::default();
    if mode == CategoryMode::Skip || !config.is_image_category {
        return output;
    }
    let (Some(group), Some(source_key)) = (config.size_group, config.source_key) else {
        return output;
    };

    let sizes = ctx.catalog.sizes(group);
    if sizes.is_empty() {
        info!("No {group} sizes in the catalog, skipping {}", config.name);
        return output;
    }
    let Some(source) = ctx.sources.get(source_key) else {
        warn!(
            "No resolved '{source_key}' source image, skipping {}",
            config.name
        );
        return output;
    };

    println!("Processing {} icons...", config.name);
    for &size in sizes {
        match process_size(config, mode, ctx, source, size) {
            Ok((tag, entry)) => {
                output.html_tags.extend(tag);
                output.manifest_entries.extend(entry);
            }
            Err(err) => warn!("Skipping {} {size}: {err:#}", config.name),
        }
    }
    output
}

fn process_size(
    config: &CategoryConfig,
    mode: CategoryMode,
    ctx: &GenerationContext,
    source: &SourceImage,
    size: Resolution,
) -> Result<(Option<String>, Option<ManifestEntry>)> {
    let file_name = icon_file_name(config, &ctx.prefix, size);
    debug!("{file_name}: {size}, aspect ratio {}", size.aspect_ratio());
    let output_path = ctx.layout.category_dir(config).join(&file_name);

    if mode == CategoryMode::Generate {
        let image = transform::render_icon(source, size, config.requirements, ctx.background)?;
        transform::save_png(&image, &output_path)?;
        println!("  ✓ Generated {file_name}");
    }

    let href = relative_href(
        &output_path,
        &ctx.layout.html_destination,
        &ctx.layout.destination,
    )?;
    Ok((html_tag(config, size, &href), manifest_entry(config, size, &href)))
}

/// `{prefix}[-{slug}]-{W}x{H}.png`.
pub fn icon_file_name(config: &CategoryConfig, prefix: &str, size: Resolution) -> String {
    let stem = if config.slug_in_file_name {
        format!("{prefix}-{}", config.slug())
    } else {
        prefix.to_string()
    };
    // Wide tiles use the same stem as square ones.
    size.file_name(&FilePrefixes {
        icon: stem.clone(),
        launch_screen: stem,
    })
}

/// The icon path as referenced from the HTML destination, with forward
/// slashes. Icons outside that directory fall back to a path relative to the
/// destination's parent.
pub fn relative_href(icon: &Path, html_destination: &Path, destination: &Path) -> Result<String> {
    let relative = match icon.strip_prefix(html_destination) {
        Ok(relative) => relative,
        Err(_) => {
            let parent = destination.parent().unwrap_or(destination);
            let relative = icon.strip_prefix(parent).map_err(|_| {
                anyhow!(
                    "{} is neither under {} nor under {}",
                    icon.display(),
                    html_destination.display(),
                    parent.display()
                )
            })?;
            warn!(
                "Icon {} is outside the HTML destination {}, using a path relative to {}",
                icon.display(),
                html_destination.display(),
                parent.display()
            );
            relative
        }
    };
    Ok(relative.to_slash_lossy().into_owned())
}

fn html_tag(config: &CategoryConfig, size: Resolution, href: &str) -> Option<String> {
    match config.html_tag {
        HtmlTag::None => None,
        HtmlTag::AppleTouchIcon => Some(format!(
            r#"<link rel="apple-touch-icon" sizes="{size}" href="{href}">"#
        )),
        HtmlTag::AppleTouchIconDark => Some(format!(
            r#"<link rel="apple-touch-icon" sizes="{size}" href="{href}" media="(prefers-color-scheme: dark)">"#
        )),
        HtmlTag::MsApplicationTile => {
            let shape = if size.is_square() { "square" } else { "wide" };
            Some(format!(
                r#"<meta name="msapplication-{shape}{size}logo" content="{href}">"#
            ))
        }
    }
}

fn manifest_entry(config: &CategoryConfig, size: Resolution, href: &str) -> Option<ManifestEntry> {
    if !config.in_manifest {
        return None;
    }
    let purpose = config
        .manifest_purpose
        .and_then(|purpose| purpose.manifest_value());
    Some(ManifestEntry::png(href.to_string(), size.to_string(), purpose))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::{config_for, Category};
    use crate::context::OutputLayout;
    use crate::output::OutputToggles;
    use crate::size_catalog::SizeCatalog;
    use crate::source::{self, ImageFormat};
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    fn base_png() -> SourceImage {
        let img = RgbaImage::from_pixel(64, 64, Rgba([20, 120, 220, 255]));
        let png = transform::encode_png(&DynamicImage::ImageRgba8(img)).unwrap();
        SourceImage::new(png, ImageFormat::Raster)
    }

    fn context(temp: &TempDir, catalog: &str) -> GenerationContext {
        let layout = OutputLayout {
            destination: temp.path().join("assets"),
            html_destination: temp.path().to_path_buf(),
            html_file_name: "head.html".to_string(),
        };
        let plan = crate::context::plan_categories(&BTreeMap::new(), false);
        GenerationContext {
            catalog: SizeCatalog::load(catalog.as_bytes()).unwrap(),
            sources: source::resolve(base_png(), &BTreeMap::new()),
            layout: layout.provision(&plan).unwrap(),
            plan,
            prefix: "icon".to_string(),
            background: Rgba([255, 255, 255, 255]),
            outputs: OutputToggles {
                html: true,
                manifest: true,
            },
        }
    }

    const CATALOG: &str = r#"{
        "touchIcons": [32],
        "macosIcons": [32],
        "msTiles": [[70, 70], [62, 30]],
        "maskedIcons": [48]
    }"#;

    #[test]
    fn test_file_names() {
        let size = Resolution::square(180).unwrap();
        assert_eq!(
            icon_file_name(config_for(Category::AppleTouch), "apple-touch-icon", size),
            "apple-touch-icon-180x180.png"
        );
        assert_eq!(
            icon_file_name(config_for(Category::Masked), "apple-touch-icon", size),
            "apple-touch-icon-android-masked-180x180.png"
        );
    }

    #[test]
    fn test_href_fallback_outside_html_destination() {
        let href = relative_href(
            Path::new("/srv/assets/masked/a.png"),
            Path::new("/srv/site"),
            Path::new("/srv/assets"),
        )
        .unwrap();
        assert_eq!(href, "assets/masked/a.png");

        let href = relative_href(
            Path::new("/srv/site/assets/a.png"),
            Path::new("/srv/site"),
            Path::new("/srv/site/assets"),
        )
        .unwrap();
        assert_eq!(href, "assets/a.png");

        assert!(relative_href(
            Path::new("/elsewhere/masked/a.png"),
            Path::new("/srv/site"),
            Path::new("/srv/assets"),
        )
        .is_err());
    }

    #[test]
    fn test_empty_group_skips_category() {
        let temp = TempDir::new().unwrap();
        let ctx = context(
            &temp,
            r#"{ "touchIcons": [32], "macosIcons": [], "msTiles": [], "maskedIcons": [] }"#,
        );
        let output = process_category(config_for(Category::Masked), CategoryMode::Generate, &ctx);
        assert_eq!(output, CategoryOutput::default());
        let written = std::fs::read_dir(ctx.layout.destination.join("masked"))
            .unwrap()
            .filter(|e| e.as_ref().unwrap().path().is_file())
            .count();
        assert_eq!(written, 0);
    }

    #[test]
    fn test_monochrome_purpose_pairs() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, CATALOG);
        let output =
            process_category(config_for(Category::Monochrome), CategoryMode::Generate, &ctx);

        assert!(output.html_tags.is_empty());
        assert_eq!(output.manifest_entries.len(), 1);
        let purpose = output.manifest_entries[0].purpose.as_deref().unwrap();
        assert!(purpose.contains("maskable"));
        assert!(purpose.contains("monochrome"));
        assert_eq!(
            output.manifest_entries[0].src,
            "assets/masked/monochrome/icon-android-monochrome-48x48.png"
        );
        assert!(ctx
            .layout
            .destination
            .join("masked/monochrome/icon-android-monochrome-48x48.png")
            .is_file());
    }

    #[test]
    fn test_dark_mode_tag_and_no_manifest() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, CATALOG);
        let output = process_category(config_for(Category::DarkMode), CategoryMode::Generate, &ctx);

        assert_eq!(
            output.html_tags,
            [r#"<link rel="apple-touch-icon" sizes="32x32" href="assets/apple-dark/icon-apple-dark-mode-32x32.png" media="(prefers-color-scheme: dark)">"#]
        );
        assert!(output.manifest_entries.is_empty());
    }

    #[test]
    fn test_ms_tiles_square_and_wide() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, CATALOG);
        let output = process_category(config_for(Category::MsTiles), CategoryMode::Generate, &ctx);

        assert_eq!(
            output.html_tags,
            [
                r#"<meta name="msapplication-wide62x30logo" content="assets/mstile/icon-ms-tiles-62x30.png">"#,
                r#"<meta name="msapplication-square70x70logo" content="assets/mstile/icon-ms-tiles-70x70.png">"#,
            ]
        );
        assert_eq!(output.manifest_entries.len(), 2);
        assert!(output.manifest_entries.iter().all(|e| e.purpose.is_none()));
    }

    #[test]
    fn test_macos_clip_size_failure_is_skipped() {
        let temp = TempDir::new().unwrap();
        let ctx = context(
            &temp,
            r#"{ "touchIcons": [], "macosIcons": [[40, 20], 32], "msTiles": [], "maskedIcons": [] }"#,
        );
        let output = process_category(config_for(Category::MacOs), CategoryMode::Generate, &ctx);

        assert_eq!(output.manifest_entries.len(), 1);
        assert_eq!(output.manifest_entries[0].sizes, "32x32");
        assert_eq!(output.manifest_entries[0].purpose, None);
    }

    #[test]
    fn test_metadata_only_writes_no_image() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, CATALOG);
        let output = process_category(
            config_for(Category::AppleTouch),
            CategoryMode::MetadataOnly,
            &ctx,
        );

        assert_eq!(output.html_tags.len(), 1);
        assert!(!ctx.layout.destination.join("icon-32x32.png").exists());
    }
}
