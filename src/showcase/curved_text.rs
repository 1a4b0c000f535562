use bevy::math::Vec2;
use image::imageops;
use image::{GrayImage, Luma, Rgba, RgbaImage};
use std::collections::HashMap;
use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::path::Path;
use thiserror::Error;

// Top edge of the image (y down), the far side of the floor once laid flat.
pub const ARC_MID_ANGLE: f32 = 3.0 * FRAC_PI_2;

#[derive(Debug, Error)]
pub enum CurvedTextError {
    #[error("arc radius must be positive and finite, got {0}")]
    InvalidRadius(f32),
    #[error("failed to read font {path}: {source}")]
    FontRead {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse font {path}: {reason}")]
    FontParse { path: String, reason: String },
    #[error("font {0} has no horizontal line metrics")]
    MissingLineMetrics(String),
    #[error("kerning pair '{0}' must be exactly two characters")]
    InvalidKerningPair(String),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KerningTable {
    pairs: HashMap<(char, char), f32>,
}

impl KerningTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<'a, I>(pairs: I) -> Result<Self, CurvedTextError>
    where
        I: IntoIterator<Item = (&'a str, f32)>,
    {
        let mut table = Self::new();
        for (pair, px) in pairs {
            let mut chars = pair.chars();
            match (chars.next(), chars.next(), chars.next()) {
                (Some(first), Some(second), None) => table.set(first, second, px),
                _ => return Err(CurvedTextError::InvalidKerningPair(pair.to_string())),
            }
        }
        Ok(table)
    }

    pub fn set(&mut self, first: char, second: char, px: f32) {
        self.pairs.insert((first, second), px);
    }

    pub fn adjustment(&self, first: char, second: char) -> f32 {
        self.pairs.get(&(first, second)).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurvedTextStyle {
    pub canvas_size: u32,
    pub font_px: f32,
    pub line_height_factor: f32,
    pub letter_spacing_px: f32,
    pub kerning: KerningTable,
    pub fill_rgb: [u8; 3],
    pub shadow_rgb: [u8; 3],
    pub shadow_alpha: f32,
    pub shadow_blur_px: f32,
}

impl Default for CurvedTextStyle {
    fn default() -> Self {
        let mut kerning = KerningTable::new();
        // keeps the I readable after N
        kerning.set('N', 'I', -2.0);
        kerning.set('I', 'N', 0.0);

        Self {
            canvas_size: 1024,
            font_px: 90.0,
            line_height_factor: 1.15,
            letter_spacing_px: 2.0,
            kerning,
            fill_rgb: [0, 0, 0],
            shadow_rgb: [0, 0, 0],
            shadow_alpha: 0.85,
            shadow_blur_px: 14.0,
        }
    }
}

impl CurvedTextStyle {
    pub fn line_height_px(&self) -> f32 {
        (self.font_px * self.line_height_factor).round()
    }

    pub fn text_arc(&self) -> TextArc {
        let half = self.canvas_size as f32 / 2.0;
        TextArc {
            center: Vec2::splat(half),
            radius: half - self.line_height_px() / 2.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextArc {
    pub center: Vec2,
    pub radius: f32,
}

impl TextArc {
    pub fn point_at(&self, angle: f32) -> Vec2 {
        self.center + self.radius * Vec2::new(angle.cos(), angle.sin())
    }
}

pub trait GlyphMetrics {
    fn advance(&self, ch: char) -> f32;
}

// `offset` is the bitmap's top-left corner relative to the glyph anchor, y down.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphBitmap {
    pub width: usize,
    pub height: usize,
    pub offset: Vec2,
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    pub fn sample(&self, point: Vec2) -> f32 {
        let x = point.x - 0.5;
        let y = point.y - 0.5;
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;

        let texel = |ix: f32, iy: f32| -> f32 {
            if ix < 0.0 || iy < 0.0 || ix >= self.width as f32 || iy >= self.height as f32 {
                return 0.0;
            }
            self.coverage[iy as usize * self.width + ix as usize] as f32 / 255.0
        };

        let top = texel(x0, y0) * (1.0 - fx) + texel(x0 + 1.0, y0) * fx;
        let bottom = texel(x0, y0 + 1.0) * (1.0 - fx) + texel(x0 + 1.0, y0 + 1.0) * fx;
        top * (1.0 - fy) + bottom * fy
    }
}

pub trait GlyphSource: GlyphMetrics {
    fn rasterize(&self, ch: char) -> GlyphBitmap;
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub ch: char,
    pub angle: f32,
    pub offset: f32,
    pub advance_angle: f32,
    pub anchor: Vec2,
    pub rotation: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurvedTextLayout {
    pub arc: TextArc,
    pub glyphs: Vec<PlacedGlyph>,
    pub start_angle: f32,
    pub total_length: f32,
    pub total_angle: f32,
}

impl CurvedTextLayout {
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

pub fn layout_curved_text<M>(
    text: &str,
    arc: TextArc,
    metrics: &M,
    style: &CurvedTextStyle,
) -> Result<CurvedTextLayout, CurvedTextError>
where
    M: GlyphMetrics + ?Sized,
{
    if !arc.radius.is_finite() || arc.radius <= 0.0 {
        return Err(CurvedTextError::InvalidRadius(arc.radius));
    }

    let chars: Vec<char> = text.chars().collect();
    // The last glyph has no following pair, so it carries neither spacing nor kerning.
    let advances: Vec<f32> = chars
        .iter()
        .enumerate()
        .map(|(i, &ch)| {
            let width = metrics.advance(ch);
            match chars.get(i + 1) {
                Some(&next) => {
                    width + style.letter_spacing_px + style.kerning.adjustment(ch, next)
                }
                None => width,
            }
        })
        .collect();

    let total_length: f32 = advances.iter().sum();
    let total_angle = total_length / arc.radius;
    let start_angle = ARC_MID_ANGLE - total_angle / 2.0;

    let mut offset = 0.0_f32;
    let glyphs = chars
        .iter()
        .zip(&advances)
        .map(|(&ch, &advance)| {
            let angle = start_angle + offset;
            let placed = PlacedGlyph {
                ch,
                angle,
                offset,
                advance_angle: advance / arc.radius,
                anchor: arc.point_at(angle),
                rotation: angle + FRAC_PI_2,
            };
            offset += placed.advance_angle;
            placed
        })
        .collect();

    Ok(CurvedTextLayout {
        arc,
        glyphs,
        start_angle,
        total_length,
        total_angle,
    })
}

pub fn render_curved_text<S>(
    text: &str,
    source: &S,
    style: &CurvedTextStyle,
) -> Result<RgbaImage, CurvedTextError>
where
    S: GlyphSource + ?Sized,
{
    let layout = layout_curved_text(text, style.text_arc(), source, style)?;
    let size = style.canvas_size;
    let mut mask = vec![0.0_f32; size as usize * size as usize];

    for glyph in &layout.glyphs {
        let bitmap = source.rasterize(glyph.ch);
        stamp_glyph(&mut mask, size, &bitmap, glyph.anchor, glyph.rotation);
    }

    Ok(composite_with_shadow(&mask, size, style))
}

fn stamp_glyph(mask: &mut [f32], size: u32, bitmap: &GlyphBitmap, anchor: Vec2, rotation: f32) {
    if bitmap.width == 0 || bitmap.height == 0 {
        return;
    }

    let (sin, cos) = rotation.sin_cos();
    let rotate = |p: Vec2| Vec2::new(p.x * cos - p.y * sin, p.x * sin + p.y * cos);

    let extent = Vec2::new(bitmap.width as f32, bitmap.height as f32);
    let corners = [
        bitmap.offset,
        bitmap.offset + Vec2::new(extent.x, 0.0),
        bitmap.offset + Vec2::new(0.0, extent.y),
        bitmap.offset + extent,
    ]
    .map(|corner| anchor + rotate(corner));

    let min = corners.iter().fold(Vec2::splat(f32::MAX), |acc, c| acc.min(*c));
    let max = corners.iter().fold(Vec2::splat(f32::MIN), |acc, c| acc.max(*c));
    let limit = size as f32;
    let x0 = min.x.floor().clamp(0.0, limit) as u32;
    let y0 = min.y.floor().clamp(0.0, limit) as u32;
    let x1 = max.x.ceil().clamp(0.0, limit) as u32;
    let y1 = max.y.ceil().clamp(0.0, limit) as u32;

    for py in y0..y1 {
        for px in x0..x1 {
            let p = Vec2::new(px as f32 + 0.5, py as f32 + 0.5) - anchor;
            let local = Vec2::new(p.x * cos + p.y * sin, -p.x * sin + p.y * cos);
            let coverage = bitmap.sample(local - bitmap.offset);
            if coverage <= 0.0 {
                continue;
            }
            let dst = &mut mask[(py * size + px) as usize];
            *dst += coverage * (1.0 - *dst);
        }
    }
}

fn composite_with_shadow(mask: &[f32], size: u32, style: &CurvedTextStyle) -> RgbaImage {
    // Canvas blur radii are twice the gaussian sigma.
    let shadow = (style.shadow_blur_px > 0.0).then(|| {
        let gray = GrayImage::from_fn(size, size, |x, y| {
            Luma([to_u8(mask[(y * size + x) as usize])])
        });
        imageops::blur(&gray, style.shadow_blur_px / 2.0)
    });

    RgbaImage::from_fn(size, size, |x, y| {
        let glyph = mask[(y * size + x) as usize];
        let shade = shadow
            .as_ref()
            .map(|s| s.get_pixel(x, y)[0] as f32 / 255.0 * style.shadow_alpha)
            .unwrap_or(0.0);
        let under = shade * (1.0 - glyph);
        let alpha = glyph + under;
        if alpha <= 0.0 {
            return Rgba([0, 0, 0, 0]);
        }

        let mix = |fill: u8, shadow: u8| {
            to_u8((glyph * fill as f32 / 255.0 + under * shadow as f32 / 255.0) / alpha)
        };
        Rgba([
            mix(style.fill_rgb[0], style.shadow_rgb[0]),
            mix(style.fill_rgb[1], style.shadow_rgb[1]),
            mix(style.fill_rgb[2], style.shadow_rgb[2]),
            to_u8(alpha),
        ])
    })
}

fn to_u8(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

pub struct GlyphFont {
    font: fontdue::Font,
    px: f32,
    baseline_offset: f32,
}

impl GlyphFont {
    pub fn load(path: &Path, px: f32) -> Result<Self, CurvedTextError> {
        let bytes = fs::read(path).map_err(|source| CurvedTextError::FontRead {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_bytes(&bytes, px, &path.display().to_string())
    }

    pub fn from_bytes(bytes: &[u8], px: f32, name: &str) -> Result<Self, CurvedTextError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default()).map_err(
            |reason| CurvedTextError::FontParse {
                path: name.to_string(),
                reason: reason.to_string(),
            },
        )?;
        let line = font
            .horizontal_line_metrics(px)
            .ok_or_else(|| CurvedTextError::MissingLineMetrics(name.to_string()))?;

        Ok(Self {
            font,
            px,
            // descent is negative; the em-box middle sits this far above the baseline
            baseline_offset: (line.ascent + line.descent) / 2.0,
        })
    }

    pub fn px(&self) -> f32 {
        self.px
    }
}

impl GlyphMetrics for GlyphFont {
    fn advance(&self, ch: char) -> f32 {
        self.font.metrics(ch, self.px).advance_width
    }
}

impl GlyphSource for GlyphFont {
    fn rasterize(&self, ch: char) -> GlyphBitmap {
        let (metrics, coverage) = self.font.rasterize(ch, self.px);
        let left = -metrics.advance_width / 2.0 + metrics.xmin as f32;
        let top = self.baseline_offset - (metrics.ymin as f32 + metrics.height as f32);
        GlyphBitmap {
            width: metrics.width,
            height: metrics.height,
            offset: Vec2::new(left, top),
            coverage,
        }
    }
}
