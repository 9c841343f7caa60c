//! The macOS rounded-square ("squircle") clip.
//!
//! The clipped icon is produced by building a small SVG document around the
//! source and rasterizing it: a `<clipPath>` holding a rounded rect, and a
//! clipped group holding an optional background fill plus the source content.
//! Raster sources are embedded as a PNG data URI. SVG sources have their root's
//! children copied into a group that maps their viewBox onto the target.

use crate::error::IconError;
use crate::resolution::Resolution;
use crate::source::{ImageFormat, SourceImage};
use crate::transform;
use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use image::{Rgba, RgbaImage};
use quick_xml::events::{BytesEnd, BytesStart, Event};
use quick_xml::{Reader, Writer};
use tracing::warn;

/// Inset of the clip square, as a fraction of the target size (100/1024).
pub const OFFSET_RATIO: f64 = 0.097_656_25;
/// Side of the clip square, as a fraction of the target size (824/1024).
pub const SIDE_RATIO: f64 = 0.804_687_5;
/// Corner radius, as a fraction of the target size (184/1024).
pub const RADIUS_RATIO: f64 = 0.179_687_5;

const CLIP_ID: &str = "macosIconMask";
const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const PLACEHOLDER_FILL: &str = "#ff0000";

/// Clip rectangle for a square target, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipGeometry {
    pub offset: f64,
    pub side: f64,
    pub radius: f64,
}

impl ClipGeometry {
    pub fn for_size(size: u32) -> Self {
        let size = f64::from(size);
        Self {
            offset: OFFSET_RATIO * size,
            side: SIDE_RATIO * size,
            radius: RADIUS_RATIO * size,
        }
    }
}

/// Renders `source` at `target` with the macOS clip applied.
///
/// `background`, when given, fills the clipped area beneath the content.
/// Pixels outside the clip are always fully transparent.
pub fn render_clipped(
    source: &SourceImage,
    target: Resolution,
    background: Option<Rgba<u8>>,
) -> Result<RgbaImage> {
    if !target.is_square() {
        return Err(IconError::NonSquareClip {
            width: target.width(),
            height: target.height(),
        }
        .into());
    }

    let size = target.width();
    let content = match source.format {
        ImageFormat::Raster => Content::Raster(embed_raster(&source.data, size)?),
        ImageFormat::Svg => match parse_svg_source(&source.data) {
            Some(parsed) => Content::Svg(parsed),
            None => {
                warn!("Malformed SVG source, using a placeholder for the {size}x{size} macOS icon");
                Content::Placeholder
            }
        },
    };

    let document = build_wrapper(size, background, &content)?;
    Ok(transform::rasterize_svg(&document, size, size)?)
}

enum Content {
    /// Base64 PNG payload.
    Raster(String),
    Svg(SvgSource),
    Placeholder,
}

/// What is kept from a parsed SVG source.
struct SvgSource {
    /// `(min_x, min_y, width, height)` of the source coordinate system.
    view_box: Option<[f64; 4]>,
    namespaces: Vec<(String, String)>,
    body: Vec<Event<'static>>,
}

fn embed_raster(data: &[u8], size: u32) -> Result<String> {
    let decoded = transform::decode_raster(data)?;
    let fitted = transform::fit_exact(decoded, size, size);
    let png = transform::encode_png(&fitted)?;
    Ok(STANDARD.encode(png))
}

/// Reads the root element of an SVG document. Returns `None` for anything
/// that is not well-formed enough to embed.
fn parse_svg_source(data: &[u8]) -> Option<SvgSource> {
    let text = std::str::from_utf8(data).ok()?;
    let mut reader = Reader::from_str(text);
    reader.trim_text(true);

    let mut body = Vec::new();
    let mut root: Option<(bool, Option<[f64; 4]>, Vec<(String, String)>)> = None;
    let mut depth = 0usize;

    loop {
        let event = reader.read_event().ok()?;
        match event {
            Event::Eof => return None,
            Event::Decl(_) | Event::DocType(_) | Event::PI(_) | Event::Comment(_)
                if root.is_none() =>
            {
                continue
            }
            Event::Start(ref start) | Event::Empty(ref start) if root.is_none() => {
                let is_empty = matches!(event, Event::Empty(_));
                if start.local_name().as_ref() == b"svg" {
                    let (view_box, namespaces) = root_attributes(start)?;
                    root = Some((true, view_box, namespaces));
                } else {
                    // Not an <svg> root; wrap the whole element.
                    root = Some((false, None, Vec::new()));
                    body.push(event.clone().into_owned());
                }
                if is_empty {
                    break;
                }
                depth = 1;
            }
            Event::Start(_) => {
                depth += 1;
                body.push(event.into_owned());
            }
            Event::End(_) => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    if let Some((false, ..)) = root {
                        body.push(event.into_owned());
                    }
                    break;
                }
                body.push(event.into_owned());
            }
            _ if root.is_none() => return None,
            other => body.push(other.into_owned()),
        }
    }

    let (_, view_box, namespaces) = root?;
    Some(SvgSource {
        view_box,
        namespaces,
        body,
    })
}

type RootAttributes = (Option<[f64; 4]>, Vec<(String, String)>);

fn root_attributes(start: &BytesStart) -> Option<RootAttributes> {
    let mut view_box = None;
    let mut width = None;
    let mut height = None;
    let mut namespaces = Vec::new();

    for attr in start.attributes() {
        let attr = attr.ok()?;
        let key = std::str::from_utf8(attr.key.as_ref()).ok()?.to_string();
        let value = attr.unescape_value().ok()?.into_owned();
        match key.as_str() {
            "viewBox" => view_box = parse_view_box(&value),
            "width" => width = parse_length(&value),
            "height" => height = parse_length(&value),
            "xmlns" | "xmlns:xlink" => {}
            ns if ns.starts_with("xmlns:") => namespaces.push((key, value)),
            _ => {}
        }
    }

    let view_box = view_box.or_else(|| Some([0.0, 0.0, width?, height?]));
    Some((view_box, namespaces))
}

fn parse_view_box(value: &str) -> Option<[f64; 4]> {
    let numbers: Vec<f64> = value
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|part| !part.is_empty())
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        &[x, y, w, h] if w > 0.0 && h > 0.0 => Some([x, y, w, h]),
        _ => None,
    }
}

fn parse_length(value: &str) -> Option<f64> {
    let number: f64 = value.trim().trim_end_matches("px").parse().ok()?;
    (number > 0.0).then_some(number)
}

/// `translate(..) scale(..)` that fits `view_box` into a `size` square.
fn fit_transform(view_box: [f64; 4], size: u32) -> String {
    let [min_x, min_y, width, height] = view_box;
    let size = f64::from(size);
    let scale = (size / width).min(size / height);
    let tx = (size - width * scale) / 2.0 - min_x * scale;
    let ty = (size - height * scale) / 2.0 - min_y * scale;
    format!("translate({tx} {ty}) scale({scale})")
}

fn hex_color(Rgba([r, g, b, _]): Rgba<u8>) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

fn full_rect(size: &str, fill: &str) -> BytesStart<'static> {
    let mut rect = BytesStart::new("rect");
    rect.push_attribute(("x", "0"));
    rect.push_attribute(("y", "0"));
    rect.push_attribute(("width", size));
    rect.push_attribute(("height", size));
    rect.push_attribute(("fill", fill));
    rect
}

fn build_wrapper(size: u32, background: Option<Rgba<u8>>, content: &Content) -> Result<Vec<u8>> {
    write_wrapper(size, background, content).map_err(|e| {
        IconError::Render(format!("failed to build the macOS clip document: {e}")).into()
    })
}

fn write_wrapper(
    size: u32,
    background: Option<Rgba<u8>>,
    content: &Content,
) -> Result<Vec<u8>, quick_xml::Error> {
    let geometry = ClipGeometry::for_size(size);
    let size_str = size.to_string();
    let view_box = format!("0 0 {size} {size}");
    let mut writer = Writer::new(Vec::new());

    let mut root = BytesStart::new("svg");
    root.push_attribute(("xmlns", SVG_NS));
    root.push_attribute(("xmlns:xlink", XLINK_NS));
    if let Content::Svg(source) = content {
        for (key, value) in &source.namespaces {
            root.push_attribute((key.as_str(), value.as_str()));
        }
    }
    root.push_attribute(("width", size_str.as_str()));
    root.push_attribute(("height", size_str.as_str()));
    root.push_attribute(("viewBox", view_box.as_str()));
    writer.write_event(Event::Start(root))?;

    writer.write_event(Event::Start(BytesStart::new("defs")))?;
    let mut clip_path = BytesStart::new("clipPath");
    clip_path.push_attribute(("id", CLIP_ID));
    writer.write_event(Event::Start(clip_path))?;
    let mut rect = BytesStart::new("rect");
    for (key, value) in [
        ("x", geometry.offset),
        ("y", geometry.offset),
        ("width", geometry.side),
        ("height", geometry.side),
        ("rx", geometry.radius),
        ("ry", geometry.radius),
    ] {
        rect.push_attribute((key, value.to_string().as_str()));
    }
    writer.write_event(Event::Empty(rect))?;
    writer.write_event(Event::End(BytesEnd::new("clipPath")))?;
    writer.write_event(Event::End(BytesEnd::new("defs")))?;

    let mut group = BytesStart::new("g");
    let clip_ref = format!("url(#{CLIP_ID})");
    group.push_attribute(("clip-path", clip_ref.as_str()));
    writer.write_event(Event::Start(group))?;

    if let Some(color) = background {
        writer.write_event(Event::Empty(full_rect(&size_str, &hex_color(color))))?;
    }

    match content {
        Content::Raster(payload) => {
            let href = format!("data:image/png;base64,{payload}");
            let mut image = BytesStart::new("image");
            image.push_attribute(("x", "0"));
            image.push_attribute(("y", "0"));
            image.push_attribute(("width", size_str.as_str()));
            image.push_attribute(("height", size_str.as_str()));
            image.push_attribute(("xlink:href", href.as_str()));
            writer.write_event(Event::Empty(image))?;
        }
        Content::Svg(source) => {
            let mut inner = BytesStart::new("g");
            if let Some(view_box) = source.view_box {
                inner.push_attribute(("transform", fit_transform(view_box, size).as_str()));
            }
            writer.write_event(Event::Start(inner))?;
            for event in &source.body {
                writer.write_event(event)?;
            }
            writer.write_event(Event::End(BytesEnd::new("g")))?;
        }
        Content::Placeholder => {
            writer.write_event(Event::Empty(full_rect(&size_str, PLACEHOLDER_FILL)))?;
        }
    }

    writer.write_event(Event::End(BytesEnd::new("g")))?;
    writer.write_event(Event::End(BytesEnd::new("svg")))?;
    Ok(writer.into_inner())
}
