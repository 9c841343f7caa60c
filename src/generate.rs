//! Run orchestration: read inputs, resolve sources, plan and process the
//! categories, write the aggregated outputs.

use crate::category::{config_for, Category};
use crate::context::{plan_categories, CategoryMode, GenerationContext, OutputLayout};
use crate::output::{write_outputs, OutputToggles};
use crate::processor::process_category;
use crate::resolution::Resolution;
use crate::size_catalog::{SizeCatalog, BUNDLED_DATA};
use crate::source::{self, ImageFormat, SourceImage, SourceKey};
use crate::transform;
use anyhow::{bail, Context, Result};
use image::RgbaImage;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Below this, the base icon gets upscaled for the largest targets.
const RECOMMENDED_MIN_SIZE: u32 = 1024;
/// Android masks may crop anything in the outer 10% of each side.
const SAFE_ZONE_BORDER: f64 = 0.1;
/// Share of border pixels allowed to differ from the corner colour.
const BUSY_BORDER_RATIO: f64 = 0.05;
const CHANNEL_TOLERANCE: u8 = 24;
const VISIBLE_ALPHA: u8 = 16;

/// Inputs of one `generate-icons` run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub base_icon: PathBuf,
    /// Explicit images for non-base roles.
    pub sources: BTreeMap<SourceKey, PathBuf>,
    pub prefix: String,
    pub destination: PathBuf,
    pub html_destination: PathBuf,
    pub html_file_name: String,
    pub alternate_data: Option<PathBuf>,
    pub background_color: String,
    /// `true` for `--<category>`, `false` for `--no-<category>`.
    pub category_flags: BTreeMap<Category, bool>,
    pub no_icons: bool,
    pub outputs: OutputToggles,
}

pub fn generate_icons(options: GenerateOptions) -> Result<()> {
    let catalog = load_catalog(options.alternate_data.as_deref())?;
    debug!(
        "catalog lists {} device screen sizes",
        catalog.screen_sizes().len()
    );
    let background = transform::parse_color(&options.background_color)
        .context("Invalid --background-color")?;

    let base = read_source(&options.base_icon, SourceKey::Base)?;
    check_base_icon(&base)?;

    let mut explicit = BTreeMap::new();
    for (key, path) in &options.sources {
        explicit.insert(*key, read_source(path, *key)?);
    }
    let sources = source::resolve(base, &explicit);
    debug!("resolved {} source images", sources.len());

    let plan = plan_categories(&options.category_flags, options.no_icons);
    for (category, mode) in &plan {
        debug!("{}: {mode:?}", category.flag_key());
    }

    let layout = OutputLayout {
        destination: options.destination,
        html_destination: options.html_destination,
        html_file_name: options.html_file_name,
    }
    .provision(&plan)?;

    let masked_mode = plan
        .iter()
        .find(|(category, _)| *category == Category::Masked)
        .map(|(_, mode)| *mode);
    if masked_mode == Some(CategoryMode::Generate) {
        if let Some(masked) = sources.get(SourceKey::Masked) {
            check_masked_padding(masked);
        }
    }

    let ctx = GenerationContext {
        catalog,
        sources,
        plan,
        layout,
        prefix: options.prefix,
        background,
        outputs: options.outputs,
    };

    let mut html_tags = Vec::new();
    let mut manifest_entries = Vec::new();
    for (category, mode) in &ctx.plan {
        let output = process_category(config_for(*category), *mode, &ctx);
        html_tags.extend(output.html_tags);
        manifest_entries.extend(output.manifest_entries);
    }

    write_outputs(&html_tags, &manifest_entries, &ctx.layout, ctx.outputs);

    println!("\n✅ Icon generation complete!");
    println!("📁 Icons written to: {}", ctx.layout.destination.display());
    Ok(())
}

fn load_catalog(alternate: Option<&Path>) -> Result<SizeCatalog> {
    match alternate {
        Some(path) => {
            let data = std::fs::read(path)
                .with_context(|| format!("Failed to read size data {}", path.display()))?;
            SizeCatalog::load(&data)
                .with_context(|| format!("Invalid size data in {}", path.display()))
        }
        None => SizeCatalog::bundled().context("Bundled size data is invalid"),
    }
}

/// Reads one input image fully into memory.
fn read_source(path: &Path, key: SourceKey) -> Result<SourceImage> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read {key} image {}", path.display()))?;
    let format = ImageFormat::detect(path, &data);
    debug!("{key} image {} is {format}", path.display());
    Ok(SourceImage::new(data, format))
}

/// Decodes a raster base icon, failing the run if it cannot be decoded, and
/// warns about small or non-square images.
fn check_base_icon(base: &SourceImage) -> Result<()> {
    if base.format == ImageFormat::Svg {
        return Ok(());
    }
    let image = transform::decode_raster(&base.data).context("Base icon is not a usable image")?;
    let (width, height) = (image.width(), image.height());
    if width < RECOMMENDED_MIN_SIZE || height < RECOMMENDED_MIN_SIZE {
        warn!(
            "Base icon is {width}x{height}; at least {RECOMMENDED_MIN_SIZE}x{RECOMMENDED_MIN_SIZE} is recommended"
        );
    }
    if width.abs_diff(height) > 1 {
        let ratio = Resolution::new(i64::from(width), i64::from(height))
            .map(|r| r.aspect_ratio_str())
            .unwrap_or_default();
        warn!("Base icon is not square ({width}x{height}, {ratio}); icons will be stretched");
    }
    Ok(())
}

fn check_masked_padding(masked: &SourceImage) {
    if masked.format == ImageFormat::Svg {
        info!("Masked source is SVG, skipping the safe-zone padding check");
        return;
    }
    match transform::decode_raster(&masked.data) {
        Ok(image) => {
            if border_is_busy(&image.to_rgba8()) {
                warn!(
                    "Masked icon has content in the outer {}% border; Android masks may crop it",
                    (SAFE_ZONE_BORDER * 100.0) as u32
                );
            }
        }
        Err(err) => warn!("Could not check masked icon padding: {err:#}"),
    }
}

/// Whether more than [`BUSY_BORDER_RATIO`] of the border pixels differ from
/// the top-left corner.
fn border_is_busy(image: &RgbaImage) -> bool {
    let (width, height) = image.dimensions();
    let border_x = ((f64::from(width) * SAFE_ZONE_BORDER).round() as u32).max(1);
    let border_y = ((f64::from(height) * SAFE_ZONE_BORDER).round() as u32).max(1);
    let corner = *image.get_pixel(0, 0);

    let mut total = 0u64;
    let mut differing = 0u64;
    for (x, y, pixel) in image.enumerate_pixels() {
        let in_border = x < border_x
            || y < border_y
            || x >= width.saturating_sub(border_x)
            || y >= height.saturating_sub(border_y);
        if !in_border {
            continue;
        }
        total += 1;
        let differs = if corner[3] < VISIBLE_ALPHA {
            pixel[3] >= VISIBLE_ALPHA
        } else {
            pixel
                .0
                .iter()
                .zip(corner.0.iter())
                .any(|(a, b)| a.abs_diff(*b) > CHANNEL_TOLERANCE)
        };
        if differs {
            differing += 1;
        }
    }

    total > 0 && differing as f64 / total as f64 > BUSY_BORDER_RATIO
}

/// Writes the bundled size catalog to `destination`, or prints it.
pub fn export_catalog(destination: &Path, force: bool, print: bool) -> Result<()> {
    if print {
        println!("{BUNDLED_DATA}");
        return Ok(());
    }

    let target = if destination.is_dir() {
        destination.join("sizes.json")
    } else {
        destination.to_path_buf()
    };
    if target.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            target.display()
        );
    }
    if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Can't create directory {}", parent.display()))?;
    }
    std::fs::write(&target, BUNDLED_DATA)
        .with_context(|| format!("Failed to write {}", target.display()))?;
    println!("  ✓ Size data written to {}", target.display());
    Ok(())
}
