//! The category registry.
//!
//! Every generation category, image or not, has exactly one row in
//! [`REGISTRY`]. The processor reads behaviour from the row instead of
//! matching on the category, so the compatibility matrix lives in one place.

use crate::size_catalog::SizeGroup;
use crate::source::SourceKey;
use std::fmt;

/// A generation category, in processing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    AppleTouch,
    Masked,
    Monochrome,
    DarkMode,
    Tinted,
    MacOs,
    MsTiles,
    Html,
    Manifest,
    NoIcons,
}

impl Category {
    /// The image categories in the order they are generated.
    pub const IMAGE_CATEGORIES: [Category; 7] = [
        Category::AppleTouch,
        Category::Masked,
        Category::Monochrome,
        Category::DarkMode,
        Category::Tinted,
        Category::MacOs,
        Category::MsTiles,
    ];

    /// The command-line flag name (`--masked`, `--no-masked`, ...).
    pub fn flag_key(self) -> &'static str {
        config_for(self).flag_key
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(config_for(*self).name)
    }
}

/// The web app manifest `purpose` a category's icons carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestPurpose {
    Any,
    Maskable,
    Monochrome,
    /// Both maskable and monochrome.
    MaskableMonochrome,
    NotManifested,
}

impl ManifestPurpose {
    /// The string for the manifest `purpose` field, or `None` when the field
    /// should be left out.
    pub fn manifest_value(self) -> Option<&'static str> {
        match self {
            ManifestPurpose::Maskable => Some("maskable"),
            ManifestPurpose::Monochrome => Some("monochrome"),
            ManifestPurpose::MaskableMonochrome => Some("maskable monochrome"),
            ManifestPurpose::Any | ManifestPurpose::NotManifested => None,
        }
    }
}

/// Which `<head>` tag a category's icons get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HtmlTag {
    None,
    AppleTouchIcon,
    AppleTouchIconDark,
    MsApplicationTile,
}

/// What has to happen to a rendered image before it is saved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProcessingRequirements {
    pub desaturate: bool,
    pub opaque_background: bool,
    pub transparent_background: bool,
    pub macos_clip: bool,
}

const fn requirements(
    desaturate: bool,
    opaque_background: bool,
    transparent_background: bool,
    macos_clip: bool,
) -> ProcessingRequirements {
    ProcessingRequirements {
        desaturate,
        opaque_background,
        transparent_background,
        macos_clip,
    }
}

/// The static description of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryConfig {
    pub category: Category,
    pub flag_key: &'static str,
    pub name: &'static str,
    pub source_key: Option<SourceKey>,
    pub size_group: Option<SizeGroup>,
    /// Relative to the destination directory; empty means the root.
    pub output_subdir: &'static str,
    pub is_image_category: bool,
    pub requirements: ProcessingRequirements,
    pub manifest_purpose: Option<ManifestPurpose>,
    pub html_tag: HtmlTag,
    pub in_manifest: bool,
    /// Whether file names carry the category slug after the prefix.
    pub slug_in_file_name: bool,
}

impl CategoryConfig {
    /// `"Android Masked"` -> `"android-masked"`.
    pub fn slug(&self) -> String {
        self.name.to_lowercase().replace(' ', "-")
    }
}

#[allow(clippy::too_many_arguments)]
const fn image(
    category: Category,
    flag_key: &'static str,
    name: &'static str,
    source_key: SourceKey,
    size_group: SizeGroup,
    output_subdir: &'static str,
    requirements: ProcessingRequirements,
    purpose: ManifestPurpose,
    html_tag: HtmlTag,
    in_manifest: bool,
) -> CategoryConfig {
    CategoryConfig {
        category,
        flag_key,
        name,
        source_key: Some(source_key),
        size_group: Some(size_group),
        output_subdir,
        is_image_category: true,
        requirements,
        manifest_purpose: Some(purpose),
        html_tag,
        in_manifest,
        slug_in_file_name: !matches!(category, Category::AppleTouch),
    }
}

const fn pseudo(category: Category, flag_key: &'static str, name: &'static str) -> CategoryConfig {
    CategoryConfig {
        category,
        flag_key,
        name,
        source_key: None,
        size_group: None,
        output_subdir: "",
        is_image_category: false,
        requirements: requirements(false, false, false, false),
        manifest_purpose: None,
        html_tag: HtmlTag::None,
        in_manifest: false,
        slug_in_file_name: false,
    }
}

#[rustfmt::skip]
pub static REGISTRY: [CategoryConfig; 10] = [
    image(Category::AppleTouch, "apple_touch", "Apple Touch", SourceKey::Base, SizeGroup::TouchIcons, "",
          requirements(false, true, false, false), ManifestPurpose::NotManifested, HtmlTag::AppleTouchIcon, false),
    image(Category::Masked, "masked", "Android Masked", SourceKey::Masked, SizeGroup::MaskedIcons, "masked",
          requirements(false, true, false, false), ManifestPurpose::Maskable, HtmlTag::None, true),
    image(Category::Monochrome, "monochrome", "Android Monochrome", SourceKey::Monochrome, SizeGroup::MaskedIcons, "masked/monochrome",
          requirements(true, true, false, false), ManifestPurpose::MaskableMonochrome, HtmlTag::None, true),
    image(Category::DarkMode, "darkmode", "Apple Dark Mode", SourceKey::Dark, SizeGroup::TouchIcons, "apple-dark",
          requirements(false, false, true, false), ManifestPurpose::NotManifested, HtmlTag::AppleTouchIconDark, false),
    image(Category::Tinted, "tinted", "Apple Tinted", SourceKey::Tinted, SizeGroup::TouchIcons, "tinted",
          requirements(true, false, true, false), ManifestPurpose::Monochrome, HtmlTag::None, true),
    image(Category::MacOs, "macos", "macOS", SourceKey::Base, SizeGroup::MacosIcons, "macos",
          requirements(false, true, false, true), ManifestPurpose::Any, HtmlTag::None, true),
    image(Category::MsTiles, "ms_tiles", "MS Tiles", SourceKey::TileRectangle, SizeGroup::MsTiles, "mstile",
          requirements(false, true, false, false), ManifestPurpose::NotManifested, HtmlTag::MsApplicationTile, true),
    pseudo(Category::Html, "html", "HTML"),
    pseudo(Category::Manifest, "manifest", "Manifest Json"),
    pseudo(Category::NoIcons, "no_icons", "No Icons"),
];

/// Looks up the registry row for a category.
pub fn config_for(category: Category) -> &'static CategoryConfig {
    // Rows are declared in enum order.
    let config = &REGISTRY[category as usize];
    debug_assert_eq!(config.category, category);
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_rows_match_enum_order() {
        for (index, row) in REGISTRY.iter().enumerate() {
            assert_eq!(row.category as usize, index, "row for {}", row.name);
        }
    }

    #[test]
    fn test_non_image_categories() {
        for category in [Category::Html, Category::Manifest, Category::NoIcons] {
            let config = config_for(category);
            assert!(!config.is_image_category);
            assert_eq!(config.source_key, None);
            assert_eq!(config.size_group, None);
            assert_eq!(config.manifest_purpose, None);
        }
    }

    #[test]
    fn test_image_category_table() {
        let expect = |category, source, group, subdir, flags: [bool; 4], purpose| {
            let config = config_for(category);
            assert!(config.is_image_category);
            assert_eq!(config.source_key, Some(source), "{category}");
            assert_eq!(config.size_group, Some(group), "{category}");
            assert_eq!(config.output_subdir, subdir, "{category}");
            assert_eq!(
                config.requirements,
                requirements(flags[0], flags[1], flags[2], flags[3]),
                "{category}"
            );
            assert_eq!(config.manifest_purpose, Some(purpose), "{category}");
        };

        use ManifestPurpose as P;
        use SizeGroup as G;
        use SourceKey as K;
        expect(Category::AppleTouch, K::Base, G::TouchIcons, "", [false, true, false, false], P::NotManifested);
        expect(Category::Masked, K::Masked, G::MaskedIcons, "masked", [false, true, false, false], P::Maskable);
        expect(Category::Monochrome, K::Monochrome, G::MaskedIcons, "masked/monochrome", [true, true, false, false], P::MaskableMonochrome);
        expect(Category::DarkMode, K::Dark, G::TouchIcons, "apple-dark", [false, false, true, false], P::NotManifested);
        expect(Category::Tinted, K::Tinted, G::TouchIcons, "tinted", [true, false, true, false], P::Monochrome);
        expect(Category::MacOs, K::Base, G::MacosIcons, "macos", [false, true, false, true], P::Any);
        expect(Category::MsTiles, K::TileRectangle, G::MsTiles, "mstile", [false, true, false, false], P::NotManifested);
    }

    #[test]
    fn test_manifest_membership() {
        let manifested: Vec<Category> = Category::IMAGE_CATEGORIES
            .into_iter()
            .filter(|c| config_for(*c).in_manifest)
            .collect();
        assert_eq!(
            manifested,
            [
                Category::Masked,
                Category::Monochrome,
                Category::Tinted,
                Category::MacOs,
                Category::MsTiles
            ]
        );
    }

    #[test]
    fn test_purpose_strings() {
        let value = ManifestPurpose::MaskableMonochrome.manifest_value().unwrap();
        assert!(value.contains("maskable"));
        assert!(value.contains("monochrome"));
        assert_eq!(ManifestPurpose::Any.manifest_value(), None);
        assert_eq!(ManifestPurpose::NotManifested.manifest_value(), None);
    }

    #[test]
    fn test_slugs() {
        assert_eq!(config_for(Category::Masked).slug(), "android-masked");
        assert_eq!(config_for(Category::DarkMode).slug(), "apple-dark-mode");
        assert_eq!(config_for(Category::MacOs).slug(), "macos");
        assert_eq!(config_for(Category::MsTiles).slug(), "ms-tiles");
        assert!(!config_for(Category::AppleTouch).slug_in_file_name);
        assert!(config_for(Category::Tinted).slug_in_file_name);
    }
}
