//! Per-size rendering: rasterize or resize, then post-process according to a
//! category's [`ProcessingRequirements`].

use crate::category::ProcessingRequirements;
use crate::clip;
use crate::error::IconError;
use crate::resolution::Resolution;
use crate::source::{ImageFormat, SourceImage};
use anyhow::{Context, Result};
use image::{
    codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder},
    imageops::{self, FilterType},
    ColorType, DynamicImage, ImageEncoder, Rgba, RgbaImage,
};
use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{Options, Tree};
use std::collections::BTreeSet;
use std::sync::OnceLock;
use std::{fs::File, io::BufWriter, io::Write, path::Path, str::FromStr};
use tracing::{debug, warn};

// Generic font families, most preferred first. usvg's own defaults (Times New
// Roman, Arial, Courier New) are often missing on Linux.
const SERIF_FAMILIES: &[&str] = &[
    "Times New Roman",
    "DejaVu Serif",
    "Liberation Serif",
    "Noto Serif",
];
const SANS_SERIF_FAMILIES: &[&str] = &[
    "Arial",
    "Helvetica",
    "DejaVu Sans",
    "Liberation Sans",
    "Noto Sans",
];
const MONOSPACE_FAMILIES: &[&str] = &[
    "Courier New",
    "DejaVu Sans Mono",
    "Liberation Mono",
    "Noto Sans Mono",
];

/// Parses a CSS colour into an opaque RGBA pixel.
pub fn parse_color(value: &str) -> Result<Rgba<u8>> {
    let color = css_color::Srgb::from_str(value)
        .map_err(|_| anyhow::anyhow!("'{value}' is not a valid CSS color"))?;
    Ok(Rgba([
        (color.red * 255.).round() as u8,
        (color.green * 255.).round() as u8,
        (color.blue * 255.).round() as u8,
        255,
    ]))
}

/// Renders one icon of `target` size from `source`.
///
/// The result is `ImageRgb8` when an opaque background was applied and
/// `ImageRgba8` otherwise.
pub fn render_icon(
    source: &SourceImage,
    target: Resolution,
    requirements: ProcessingRequirements,
    background: Rgba<u8>,
) -> Result<DynamicImage> {
    if requirements.macos_clip {
        // The background, if any, is painted inside the clip so the corners
        // stay transparent.
        let fill = requirements.opaque_background.then_some(background);
        let mut clipped = DynamicImage::ImageRgba8(clip::render_clipped(source, target, fill)?);
        if requirements.desaturate {
            clipped = desaturate(&clipped);
        }
        return Ok(ensure_alpha(clipped));
    }

    let mut rendered = match source.format {
        ImageFormat::Svg => DynamicImage::ImageRgba8(rasterize_svg(
            &source.data,
            target.width(),
            target.height(),
        )?),
        ImageFormat::Raster => resize_raster(&source.data, target)?,
    };

    if requirements.desaturate {
        rendered = desaturate(&rendered);
    }

    if requirements.opaque_background {
        Ok(flatten_onto(&rendered, background))
    } else if requirements.transparent_background {
        Ok(ensure_alpha(rendered))
    } else {
        Ok(rendered)
    }
}

/// SVG parse options with the system fonts loaded, built on first use.
fn svg_options() -> &'static Options<'static> {
    static OPTIONS: OnceLock<Options<'static>> = OnceLock::new();
    OPTIONS.get_or_init(|| {
        let mut options = Options::default();
        let fontdb = options.fontdb_mut();
        fontdb.load_system_fonts();
        debug!("loaded {} font faces", fontdb.len());

        let installed: BTreeSet<String> = fontdb
            .faces()
            .flat_map(|face| face.families.iter().map(|(name, _)| name.clone()))
            .collect();
        if installed.is_empty() {
            warn!("No system fonts found; text in SVG sources will not be rendered");
            return options;
        }
        let pick = |candidates: &[&str]| {
            candidates
                .iter()
                .find(|name| installed.contains(**name))
                .map(|name| name.to_string())
                .or_else(|| installed.iter().next().cloned())
                .unwrap_or_default()
        };

        let serif = pick(SERIF_FAMILIES);
        fontdb.set_serif_family(serif.clone());
        fontdb.set_sans_serif_family(pick(SANS_SERIF_FAMILIES));
        fontdb.set_monospace_family(pick(MONOSPACE_FAMILIES));
        options.font_family = serif;
        options
    })
}

/// Rasterizes SVG bytes into a `width`x`height` canvas, scaling the drawing to
/// fit and centring it.
pub fn rasterize_svg(data: &[u8], width: u32, height: u32) -> Result<RgbaImage, IconError> {
    let tree = Tree::from_data(data, svg_options())
        .map_err(|e| IconError::Render(format!("SVG parse failed: {e}")))?;
    let mut pixmap = Pixmap::new(width, height)
        .ok_or_else(|| IconError::Render(format!("cannot allocate a {width}x{height} canvas")))?;

    let svg_size = tree.size();
    let (width_f, height_f) = (width as f32, height as f32);
    let scale = (width_f / svg_size.width()).min(height_f / svg_size.height());
    let offset_x = (width_f - svg_size.width() * scale) / 2.0;
    let offset_y = (height_f - svg_size.height() * scale) / 2.0;

    let transform = Transform::from_scale(scale, scale).post_translate(offset_x, offset_y);
    resvg::render(&tree, transform, &mut pixmap.as_mut());

    Ok(pixmap_to_rgba_image(&pixmap))
}

fn pixmap_to_rgba_image(pixmap: &Pixmap) -> RgbaImage {
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    // tiny-skia stores premultiplied alpha
    for (dst, src) in img.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        *dst = Rgba([color.red(), color.green(), color.blue(), color.alpha()]);
    }
    img
}

/// Decodes a raster source and resizes it to `target`, if it is not that size
/// already. The decoded colour type is kept.
pub fn resize_raster(data: &[u8], target: Resolution) -> Result<DynamicImage> {
    let decoded = decode_raster(data)?;
    Ok(fit_exact(decoded, target.width(), target.height()))
}

pub fn decode_raster(data: &[u8]) -> Result<DynamicImage> {
    image::load_from_memory(data).context("Failed to decode raster image")
}

pub(crate) fn fit_exact(image: DynamicImage, width: u32, height: u32) -> DynamicImage {
    if image.width() == width && image.height() == height {
        image
    } else {
        image.resize_exact(width, height, FilterType::Lanczos3)
    }
}

/// Converts to grayscale. An alpha channel, if present, is kept.
pub fn desaturate(image: &DynamicImage) -> DynamicImage {
    image.grayscale()
}

/// Makes sure the image carries an alpha channel. No colour keying or
/// background removal happens here.
pub fn ensure_alpha(image: DynamicImage) -> DynamicImage {
    match image {
        DynamicImage::ImageRgba8(_) => image,
        other => DynamicImage::ImageRgba8(other.to_rgba8()),
    }
}

/// Composites `image` over a solid `background` and drops the alpha channel.
pub fn flatten_onto(image: &DynamicImage, background: Rgba<u8>) -> DynamicImage {
    let Rgba([r, g, b, _]) = background;
    let mut canvas = RgbaImage::from_pixel(image.width(), image.height(), Rgba([r, g, b, 255]));
    imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
    DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8())
}

/// Writes `image` as a PNG file.
pub fn save_png(image: &DynamicImage, path: &Path) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create PNG file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_png(image, &mut writer)
        .with_context(|| format!("Failed to write PNG {}", path.display()))?;
    writer.flush().context("Failed to flush PNG file")?;
    Ok(())
}

/// Encodes `image` as PNG into memory.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    write_png(image, &mut buf)?;
    Ok(buf)
}

// Encode image data as PNG with compression; RGB stays RGB, anything else
// becomes RGBA.
fn write_png<W: Write>(image: &DynamicImage, w: W) -> Result<()> {
    let encoder = PngEncoder::new_with_quality(w, CompressionType::Best, PngFilterType::Adaptive);
    match image {
        DynamicImage::ImageRgb8(rgb) => {
            encoder.write_image(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)?
        }
        other => {
            let rgba = other.to_rgba8();
            encoder.write_image(rgba.as_raw(), rgba.width(), rgba.height(), ColorType::Rgba8)?
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GenericImageView;

    fn red_square_png(size: u32) -> Vec<u8> {
        let img = RgbaImage::from_pixel(size, size, Rgba([255, 0, 0, 255]));
        encode_png(&DynamicImage::ImageRgba8(img)).unwrap()
    }

    fn requirements(desaturate: bool, opaque: bool, transparent: bool) -> ProcessingRequirements {
        ProcessingRequirements {
            desaturate,
            opaque_background: opaque,
            transparent_background: transparent,
            macos_clip: false,
        }
    }

    const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

    #[test]
    fn test_parse_color() {
        assert_eq!(parse_color("#ff0000").unwrap(), Rgba([255, 0, 0, 255]));
        assert_eq!(parse_color("#ffffff").unwrap(), WHITE);
        assert!(parse_color("not-a-color").is_err());
    }

    #[test]
    fn test_raster_resize() {
        let source = SourceImage::new(red_square_png(64), ImageFormat::Raster);
        let target = Resolution::square(32).unwrap();
        let out = render_icon(&source, target, requirements(false, false, true), WHITE).unwrap();
        assert_eq!(out.dimensions(), (32, 32));
        let px = out.get_pixel(16, 16);
        assert!(px[0] > 250 && px[1] < 5 && px[3] == 255);
    }

    #[test]
    fn test_raster_non_square_target() {
        let source = SourceImage::new(red_square_png(64), ImageFormat::Raster);
        let target = Resolution::new(310, 150).unwrap();
        let out = render_icon(&source, target, requirements(false, true, false), WHITE).unwrap();
        assert_eq!(out.dimensions(), (310, 150));
    }

    #[test]
    fn test_svg_rasterized_and_centred() {
        let svg = br##"<svg xmlns="http://www.w3.org/2000/svg" width="20" height="10" viewBox="0 0 20 10"><rect width="20" height="10" fill="#0000ff"/></svg>"##;
        let img = rasterize_svg(svg, 40, 40).unwrap();
        assert_eq!(img.dimensions(), (40, 40));
        // 40x20 drawing centred vertically
        assert_eq!(img.get_pixel(20, 20)[2], 255);
        assert_eq!(img.get_pixel(20, 2)[3], 0);
        assert_eq!(img.get_pixel(20, 37)[3], 0);
    }

    #[test]
    fn test_svg_text_uses_system_fonts() {
        let visible = |svg: &[u8]| {
            let img = rasterize_svg(svg, 100, 100).unwrap();
            img.pixels().filter(|px| px[3] > 0).count()
        };
        let plain = br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text x="5" y="90" font-size="120">M</text></svg>"#;
        let sans = br#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text x="5" y="90" font-size="120" font-family="sans-serif">M</text></svg>"#;
        assert!(visible(plain) > 0);
        assert!(visible(sans) > 0);
    }

    #[test]
    fn test_invalid_svg_is_render_error() {
        assert!(matches!(
            rasterize_svg(b"<svg", 16, 16),
            Err(IconError::Render(_))
        ));
    }

    #[test]
    fn test_desaturate_keeps_alpha() {
        let img = RgbaImage::from_pixel(4, 4, Rgba([255, 0, 0, 128]));
        let gray = ensure_alpha(desaturate(&DynamicImage::ImageRgba8(img)));
        let px = gray.get_pixel(0, 0);
        assert_eq!(px[0], px[1]);
        assert_eq!(px[1], px[2]);
        assert_eq!(px[3], 128);
    }

    #[test]
    fn test_opaque_flatten_removes_alpha() {
        let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(4, 4, Rgba([0, 0, 0, 0])));
        let flat = flatten_onto(&img, Rgba([10, 20, 30, 255]));
        assert_eq!(flat.color(), ColorType::Rgb8);
        assert_eq!(flat.get_pixel(1, 1), Rgba([10, 20, 30, 255]));
    }

    #[test]
    fn test_opaque_wins_over_transparent() {
        let source = SourceImage::new(red_square_png(8), ImageFormat::Raster);
        let target = Resolution::square(8).unwrap();
        let out = render_icon(&source, target, requirements(false, true, true), WHITE).unwrap();
        assert_eq!(out.color(), ColorType::Rgb8);
    }

    #[test]
    fn test_undecodable_raster_fails() {
        let source = SourceImage::new(b"definitely not a png".to_vec(), ImageFormat::Raster);
        let target = Resolution::square(8).unwrap();
        assert!(render_icon(&source, target, requirements(false, true, false), WHITE).is_err());
    }
}
