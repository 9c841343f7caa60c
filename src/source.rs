//! Source images and the fallback chain that picks one for every role.
//!
//! Only the base image is mandatory. Every other role (masked, monochrome,
//! dark, tinted, tile rectangle) either gets an explicitly supplied image or
//! borrows the image of the role it falls back to. The fallback graph is a
//! static table walked iteratively, so a cycle can be detected instead of
//! recursing forever.

use crate::error::IconError;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// The logical role an input image plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SourceKey {
    Base,
    Masked,
    Monochrome,
    Dark,
    Tinted,
    TileRectangle,
}

impl SourceKey {
    /// Every key, in resolution order.
    pub const ALL: [SourceKey; 6] = [
        SourceKey::Base,
        SourceKey::Masked,
        SourceKey::Monochrome,
        SourceKey::Dark,
        SourceKey::Tinted,
        SourceKey::TileRectangle,
    ];
}

impl fmt::Display for SourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SourceKey::Base => "base",
            SourceKey::Masked => "masked",
            SourceKey::Monochrome => "monochrome",
            SourceKey::Dark => "dark",
            SourceKey::Tinted => "tinted",
            SourceKey::TileRectangle => "tile-rectangle",
        })
    }
}

/// One hop per key. `Base` is terminal.
pub type FallbackTable = [(SourceKey, Option<SourceKey>)];

pub static FALLBACKS: [(SourceKey, Option<SourceKey>); 6] = [
    (SourceKey::Base, None),
    (SourceKey::Masked, Some(SourceKey::Base)),
    (SourceKey::Monochrome, Some(SourceKey::Masked)),
    (SourceKey::Dark, Some(SourceKey::Base)),
    (SourceKey::Tinted, Some(SourceKey::Dark)),
    (SourceKey::TileRectangle, Some(SourceKey::Base)),
];

fn next_hop(table: &FallbackTable, from: SourceKey) -> Option<SourceKey> {
    table
        .iter()
        .find(|(key, _)| *key == from)
        .and_then(|(_, next)| *next)
}

/// Whether the bytes need rasterizing or decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Svg,
    Raster,
}

impl ImageFormat {
    /// Picks the format from the file extension, then from the content.
    pub fn detect(path: &Path, data: &[u8]) -> Self {
        let by_extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("svg"));
        match by_extension {
            Some(true) => ImageFormat::Svg,
            _ if looks_like_svg(data) => ImageFormat::Svg,
            _ => ImageFormat::Raster,
        }
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageFormat::Svg => "svg",
            ImageFormat::Raster => "raster",
        })
    }
}

fn looks_like_svg(data: &[u8]) -> bool {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let head = &data[start..];
    head.starts_with(b"<svg") || head.starts_with(b"<?xml")
}

/// Raw image bytes plus their format. Cloning shares the bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceImage {
    pub data: Arc<[u8]>,
    pub format: ImageFormat,
}

impl SourceImage {
    pub fn new(data: impl Into<Arc<[u8]>>, format: ImageFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }
}

/// The resolved image for every key that could be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SourceMap {
    images: BTreeMap<SourceKey, SourceImage>,
}

impl SourceMap {
    pub fn get(&self, key: SourceKey) -> Option<&SourceImage> {
        self.images.get(&key)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }
}

/// Resolves an image for every [`SourceKey`] using the built-in fallback table.
///
/// `explicit` may contain any key, including `Base`; the `base` argument wins
/// for `Base`. Neither input is modified.
pub fn resolve(base: SourceImage, explicit: &BTreeMap<SourceKey, SourceImage>) -> SourceMap {
    resolve_with(&FALLBACKS, base, explicit)
}

/// Same as [`resolve`] but walks the given table.
///
/// A key whose chain loops or dead-ends is left out of the map with a warning;
/// the category that needs it is then skipped by the processor.
pub fn resolve_with(
    table: &FallbackTable,
    base: SourceImage,
    explicit: &BTreeMap<SourceKey, SourceImage>,
) -> SourceMap {
    let mut images = explicit.clone();
    images.insert(SourceKey::Base, base);

    for key in SourceKey::ALL {
        if images.contains_key(&key) {
            continue;
        }
        match walk_chain(table, key, explicit, &images) {
            Ok(image) => {
                images.insert(key, image);
            }
            Err(err) => warn!("{err}"),
        }
    }

    SourceMap { images }
}

fn walk_chain(
    table: &FallbackTable,
    key: SourceKey,
    explicit: &BTreeMap<SourceKey, SourceImage>,
    resolved: &BTreeMap<SourceKey, SourceImage>,
) -> Result<SourceImage, IconError> {
    let mut visited = BTreeSet::from([key]);
    let mut current = key;
    while let Some(next) = next_hop(table, current) {
        if !visited.insert(next) {
            return Err(IconError::UnresolvableSource {
                key,
                reason: format!("fallback cycle through '{next}'"),
            });
        }
        if let Some(image) = explicit.get(&next).or_else(|| resolved.get(&next)) {
            return Ok(image.clone());
        }
        current = next;
    }

    Err(IconError::UnresolvableSource {
        key,
        reason: format!("fallback chain ended at '{current}' without an image"),
    })
}
