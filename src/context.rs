//! Per-run state: which categories run and how, where files go, and the
//! resolved inputs every category reads from.

use crate::category::{config_for, Category, CategoryConfig};
use crate::output::OutputToggles;
use crate::size_catalog::SizeCatalog;
use crate::source::SourceMap;
use anyhow::{Context, Result};
use image::Rgba;
use std::collections::BTreeMap;
use std::fs::create_dir_all;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const MANIFEST_FILE_NAME: &str = "manifest-icons-fragment.json";

/// What a category does during a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryMode {
    /// Render and write images, and emit their metadata.
    Generate,
    /// Emit HTML and manifest metadata only; no image is written.
    MetadataOnly,
    Skip,
}

/// Decides the mode of every image category.
///
/// `explicit` holds the per-category flags the user actually passed:
/// `true` for `--masked`, `false` for `--no-masked`. Categories that are
/// absent follow `no_icons`. Monochrome with no flag of its own follows an
/// explicit `--no-masked`.
pub fn plan_categories(
    explicit: &BTreeMap<Category, bool>,
    no_icons: bool,
) -> Vec<(Category, CategoryMode)> {
    let implicit = if no_icons {
        CategoryMode::MetadataOnly
    } else {
        CategoryMode::Generate
    };

    Category::IMAGE_CATEGORIES
        .into_iter()
        .map(|category| {
            let flag = match (category, explicit.get(&category)) {
                (_, Some(flag)) => Some(*flag),
                (Category::Monochrome, None) => match explicit.get(&Category::Masked) {
                    Some(false) => Some(false),
                    _ => None,
                },
                _ => None,
            };
            let mode = match flag {
                Some(true) => CategoryMode::Generate,
                Some(false) => CategoryMode::Skip,
                None => implicit,
            };
            (category, mode)
        })
        .collect()
}

/// Where everything is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub destination: PathBuf,
    pub html_destination: PathBuf,
    pub html_file_name: String,
}

impl OutputLayout {
    pub fn category_dir(&self, config: &CategoryConfig) -> PathBuf {
        if config.output_subdir.is_empty() {
            self.destination.clone()
        } else {
            self.destination.join(config.output_subdir)
        }
    }

    pub fn html_path(&self) -> PathBuf {
        self.html_destination.join(&self.html_file_name)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.html_destination.join(MANIFEST_FILE_NAME)
    }

    /// Creates the destination roots and the directory of every category that
    /// will write images, then canonicalizes both roots.
    ///
    /// Any failure here is fatal for the run.
    pub fn provision(self, plan: &[(Category, CategoryMode)]) -> Result<Self> {
        ensure_dir(&self.destination)?;
        ensure_dir(&self.html_destination)?;
        for (category, mode) in plan {
            if *mode == CategoryMode::Generate {
                ensure_dir(&self.category_dir(config_for(*category)))?;
            }
        }

        Ok(Self {
            destination: canonical(&self.destination)?,
            html_destination: canonical(&self.html_destination)?,
            html_file_name: self.html_file_name,
        })
    }
}

fn ensure_dir(path: &Path) -> Result<()> {
    debug!("creating {}", path.display());
    create_dir_all(path).with_context(|| format!("Can't create directory {}", path.display()))
}

fn canonical(path: &Path) -> Result<PathBuf> {
    dunce::canonicalize(path).with_context(|| format!("Can't resolve {}", path.display()))
}

/// Everything a category processor reads. Assembled once, then read-only.
#[derive(Debug)]
pub struct GenerationContext {
    pub catalog: SizeCatalog,
    pub sources: SourceMap,
    pub plan: Vec<(Category, CategoryMode)>,
    pub layout: OutputLayout,
    pub prefix: String,
    pub background: Rgba<u8>,
    pub outputs: OutputToggles,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn mode_of(plan: &[(Category, CategoryMode)], category: Category) -> CategoryMode {
        plan.iter()
            .find(|(c, _)| *c == category)
            .map(|(_, mode)| *mode)
            .unwrap()
    }

    #[test]
    fn test_defaults_generate_everything() {
        let plan = plan_categories(&BTreeMap::new(), false);
        assert_eq!(plan.len(), Category::IMAGE_CATEGORIES.len());
        assert!(plan.iter().all(|(_, mode)| *mode == CategoryMode::Generate));
    }

    #[test]
    fn test_negative_flag_skips() {
        let explicit = BTreeMap::from([(Category::MacOs, false)]);
        let plan = plan_categories(&explicit, false);
        assert_eq!(mode_of(&plan, Category::MacOs), CategoryMode::Skip);
        assert_eq!(mode_of(&plan, Category::Tinted), CategoryMode::Generate);
    }

    #[test]
    fn test_no_icons_keeps_metadata() {
        let explicit = BTreeMap::from([(Category::Masked, true), (Category::DarkMode, false)]);
        let plan = plan_categories(&explicit, true);
        assert_eq!(mode_of(&plan, Category::Masked), CategoryMode::Generate);
        assert_eq!(mode_of(&plan, Category::DarkMode), CategoryMode::Skip);
        assert_eq!(mode_of(&plan, Category::AppleTouch), CategoryMode::MetadataOnly);
    }

    #[test]
    fn test_monochrome_follows_disabled_masked() {
        let explicit = BTreeMap::from([(Category::Masked, false)]);
        let plan = plan_categories(&explicit, false);
        assert_eq!(mode_of(&plan, Category::Monochrome), CategoryMode::Skip);

        let explicit = BTreeMap::from([(Category::Masked, false), (Category::Monochrome, true)]);
        let plan = plan_categories(&explicit, false);
        assert_eq!(mode_of(&plan, Category::Monochrome), CategoryMode::Generate);

        let explicit = BTreeMap::from([(Category::Masked, true)]);
        let plan = plan_categories(&explicit, true);
        assert_eq!(mode_of(&plan, Category::Monochrome), CategoryMode::MetadataOnly);
    }

    #[test]
    fn test_provision_only_generated_dirs() {
        let temp = TempDir::new().unwrap();
        let layout = OutputLayout {
            destination: temp.path().join("assets"),
            html_destination: temp.path().join("site"),
            html_file_name: "head.html".to_string(),
        };
        let plan = vec![
            (Category::Masked, CategoryMode::Generate),
            (Category::Monochrome, CategoryMode::Generate),
            (Category::MacOs, CategoryMode::MetadataOnly),
            (Category::Tinted, CategoryMode::Skip),
        ];

        let layout = layout.provision(&plan).unwrap();
        assert!(layout.destination.is_absolute());
        assert!(temp.path().join("assets/masked/monochrome").is_dir());
        assert!(!temp.path().join("assets/macos").exists());
        assert!(!temp.path().join("assets/tinted").exists());
        assert!(temp.path().join("site").is_dir());
        assert!(layout.html_path().ends_with("head.html"));
        assert!(layout.manifest_path().ends_with(MANIFEST_FILE_NAME));
    }
}
