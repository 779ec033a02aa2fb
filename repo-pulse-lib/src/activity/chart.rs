//! PNG bar chart of an activity series.

use super::ActivitySeries;
use crate::Result;
use image::codecs::png::PngEncoder;
use image::{ColorType, ImageEncoder, Rgb, RgbImage};
use palette::Srgb;

const MARGIN_LEFT: u32 = 60;
const MARGIN_RIGHT: u32 = 20;
const MARGIN_TOP: u32 = 20;
const MARGIN_BOTTOM: u32 = 40;

/// Smallest canvas with room for the margins and a plot area
pub const MIN_DIMENSION: u32 = 100;

/// Colors and size of a rendered chart
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartStyle {
    pub width: u32,
    pub height: u32,
    pub bar: Srgb<u8>,
    pub background: Srgb<u8>,
    pub axis: Srgb<u8>,
    pub grid: Srgb<u8>,
}

impl Default for ChartStyle {
    fn default() -> Self {
        Self {
            width: 1200,
            height: 600,
            bar: Srgb::new(0x03, 0x66, 0xd6),
            background: Srgb::new(0xff, 0xff, 0xff),
            axis: Srgb::new(0x33, 0x33, 0x33),
            grid: Srgb::new(0xe1, 0xe4, 0xe8),
        }
    }
}

/// Rasterize `series` as one bar per day and encode it as PNG.
pub fn render_png(series: &ActivitySeries, style: &ChartStyle) -> Result<Vec<u8>> {
    let image = render(series, style)?;

    let mut png = Vec::new();
    PngEncoder::new(&mut png).write_image(image.as_raw(), image.width(), image.height(), ColorType::Rgb8)?;
    Ok(png)
}

fn render(series: &ActivitySeries, style: &ChartStyle) -> Result<RgbImage> {
    if style.width < MIN_DIMENSION || style.height < MIN_DIMENSION {
        ohno::bail!(
            "chart size {}x{} is too small, each side must be at least {MIN_DIMENSION} pixels",
            style.width,
            style.height
        );
    }

    let mut image = RgbImage::from_pixel(style.width, style.height, pixel(style.background));

    let left = MARGIN_LEFT;
    let right = style.width - MARGIN_RIGHT;
    let top = MARGIN_TOP;
    let bottom = style.height - MARGIN_BOTTOM;
    let plot_width = right - left;
    let plot_height = bottom - top;

    // Gridlines at each quarter of the plot height
    for quarter in 1..=4 {
        let y = bottom - plot_height * quarter / 4;
        fill_rect(&mut image, left, y, right, y + 1, pixel(style.grid));
    }

    let max = series.max_count();
    let slots = u32::try_from(series.points.len()).unwrap_or(u32::MAX).max(1);
    let slot_width = plot_width / slots;
    let gap = (slot_width / 5).min(8);

    if max > 0 && slot_width > 0 {
        for (i, point) in (0_u32..).zip(&series.points) {
            if point.count == 0 {
                continue;
            }

            let bar_height = scale(point.count, max, plot_height).max(1);
            let x0 = left + i * slot_width + gap / 2;
            let x1 = (x0 + slot_width - gap).max(x0 + 1);
            fill_rect(&mut image, x0, bottom - bar_height, x1, bottom, pixel(style.bar));
        }
    }

    // Axes drawn last so bars never cover them
    fill_rect(&mut image, left, top, left + 1, bottom + 1, pixel(style.axis));
    fill_rect(&mut image, left, bottom, right, bottom + 1, pixel(style.axis));

    Ok(image)
}

/// `count / max` of `span` pixels, rounded to the nearest pixel
fn scale(count: u64, max: u64, span: u32) -> u32 {
    let scaled = (u128::from(count) * u128::from(span) + u128::from(max) / 2) / u128::from(max);
    u32::try_from(scaled).unwrap_or(span).min(span)
}

/// Fill the half-open rectangle `[x0, x1) x [y0, y1)`, clipped to the image
fn fill_rect(image: &mut RgbImage, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgb<u8>) {
    for y in y0..y1.min(image.height()) {
        for x in x0..x1.min(image.width()) {
            image.put_pixel(x, y, color);
        }
    }
}

const fn pixel(color: Srgb<u8>) -> Rgb<u8> {
    Rgb([color.red, color.green, color.blue])
}
