//! The size catalog: which pixel sizes each platform group needs.
//!
//! The catalog is a small JSON document. A default copy is compiled into the
//! binary (see [`BUNDLED_DATA`]); `--alternate-data` swaps in a user file with
//! the same shape.

use crate::error::IconError;
use crate::resolution::Resolution;
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// The catalog shipped with the tool.
pub const BUNDLED_DATA: &str = include_str!("../data/sizes.json");

/// The four size groups a category can draw its target sizes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeGroup {
    TouchIcons,
    MacosIcons,
    MsTiles,
    MaskedIcons,
}

impl fmt::Display for SizeGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SizeGroup::TouchIcons => "touch_icons",
            SizeGroup::MacosIcons => "macos_icons",
            SizeGroup::MsTiles => "ms_tiles",
            SizeGroup::MaskedIcons => "masked_icons",
        })
    }
}

/// Validated, deduplicated and sorted sizes per group.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SizeCatalog {
    touch_icons: Vec<Resolution>,
    macos_icons: Vec<Resolution>,
    ms_tiles: Vec<Resolution>,
    masked_icons: Vec<Resolution>,
    screen_sizes: Vec<Resolution>,
}

#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(rename = "touchIcons", alias = "touch_icons")]
    touch_icons: Vec<Value>,
    #[serde(rename = "macosIcons", alias = "macOSIcons", alias = "macos_icons")]
    macos_icons: Vec<Value>,
    #[serde(rename = "msTiles", alias = "ms_tiles")]
    ms_tiles: Vec<Value>,
    #[serde(rename = "maskedIcons", alias = "masked_icons")]
    masked_icons: Vec<Value>,
    #[serde(default)]
    devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize)]
struct DeviceEntry {
    #[serde(rename = "actualResolution", alias = "actual_resolution")]
    actual_resolution: Value,
}

impl SizeCatalog {
    /// Parses and validates a catalog document.
    ///
    /// # Errors
    /// * [`IconError::Schema`] if the JSON is malformed, a required group is
    ///   missing, or a group is not a list.
    /// * [`IconError::InvalidDimension`] / [`IconError::InvalidFormat`] for an
    ///   entry that is not a usable size.
    pub fn load(source: &[u8]) -> Result<Self, IconError> {
        let document: CatalogDocument =
            serde_json::from_slice(source).map_err(|e| IconError::Schema(e.to_string()))?;

        let screens: Vec<Value> = document
            .devices
            .into_iter()
            .map(|device| device.actual_resolution)
            .collect();

        Ok(Self {
            touch_icons: parse_group(&document.touch_icons)?,
            macos_icons: parse_group(&document.macos_icons)?,
            ms_tiles: parse_group(&document.ms_tiles)?,
            masked_icons: parse_group(&document.masked_icons)?,
            screen_sizes: parse_group(&screens)?,
        })
    }

    /// The catalog compiled into the binary.
    pub fn bundled() -> Result<Self, IconError> {
        Self::load(BUNDLED_DATA.as_bytes())
    }

    /// Target sizes for one group, sorted by (width, height).
    pub fn sizes(&self, group: SizeGroup) -> &[Resolution] {
        match group {
            SizeGroup::TouchIcons => &self.touch_icons,
            SizeGroup::MacosIcons => &self.macos_icons,
            SizeGroup::MsTiles => &self.ms_tiles,
            SizeGroup::MaskedIcons => &self.masked_icons,
        }
    }

    /// Unique device screen resolutions, for launch screens.
    pub fn screen_sizes(&self) -> &[Resolution] {
        &self.screen_sizes
    }
}

fn parse_group(entries: &[Value]) -> Result<Vec<Resolution>, IconError> {
    let unique = entries
        .iter()
        .map(parse_entry)
        .collect::<Result<BTreeSet<_>, _>>()?;
    Ok(unique.into_iter().collect())
}

/// One catalog entry: an integer (square), a `[w, h]` pair or a `"WxH"` string.
fn parse_entry(value: &Value) -> Result<Resolution, IconError> {
    match value {
        Value::Number(number) => match number.as_i64() {
            Some(size) => Resolution::square(size),
            None => Err(IconError::InvalidDimension(format!(
                "{number} is not a whole number"
            ))),
        },
        Value::Array(pair) => match pair.as_slice() {
            [w, h] => match (w.as_i64(), h.as_i64()) {
                (Some(w), Some(h)) => Resolution::new(w, h),
                _ => Err(IconError::InvalidDimension(format!(
                    "{value} must hold two whole numbers"
                ))),
            },
            _ => Err(IconError::InvalidDimension(format!(
                "{value} must be a [width, height] pair"
            ))),
        },
        Value::String(pair) => Resolution::from_pair(pair),
        other => Err(IconError::InvalidDimension(format!("{other} is not a size"))),
    }
}
