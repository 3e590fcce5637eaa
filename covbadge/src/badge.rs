// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
//
// SPDX-License-Identifier: MIT

//! Badge rendering.
//!
//! A badge is an 18px high PNG with two panels: a dark-gray label panel on
//! the left and a metric panel colored by [`ColorBand`] on the right. The
//! renderer is a pure function of [`BadgeSpec`]; the same spec always encodes
//! to the same bytes, which is what makes the content-hash `Etag` valid.

use chrono::{DateTime, Utc};
use image::{ExtendedColorType, ImageEncoder, Rgba, RgbaImage, codecs::png::PngEncoder};
use sha2::{Digest, Sha256};

use crate::{
    error::Error,
    glyph::{self, Weight},
    metric::{BadgeKind, BadgeSpec, ColorBand}
};

/// Badge height in pixels.
pub const BADGE_HEIGHT: u32 = 18;

const BASE_WIDTH: u32 = 90;
const DIVIDER_X: u32 = 60;
const COMPLEXITY_EXTRA_WIDTH: u32 = 10;
const HUNDRED_PERCENT: &str = "100%";
const HUNDRED_PERCENT_EXTRA_WIDTH: u32 = 4;
const HUNDRED_PERCENT_SHIFT: i32 = -1;
const METRIC_PADDING: i32 = 4;
const TEXT_TOP: i32 = 5;
const CORNER_RADIUS: u32 = 3;

const LABEL_BACKGROUND: [u8; 3] = [0x55, 0x55, 0x55];
const TEXT_COLOR: [u8; 3] = [0xee, 0xee, 0xee];

/// Pixel geometry derived from a spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    /// Total image width.
    pub width:     u32,
    /// First column of the metric panel.
    pub divider_x: u32,
    /// Left edge of the label text.
    pub label_x:   i32,
    /// Left edge of the metric text.
    pub metric_x:  i32
}

impl Layout {
    /// Computes the layout for `spec`.
    pub fn for_spec(spec: &BadgeSpec) -> Self {
        let (extra, label_x) = match spec.kind {
            BadgeKind::Line => (0, 6),
            BadgeKind::Branch => (0, 12),
            BadgeKind::Complexity => (COMPLEXITY_EXTRA_WIDTH, 7)
        };
        let divider_x = DIVIDER_X + extra;
        let mut width = BASE_WIDTH + extra;
        let mut metric_x = divider_x as i32 + METRIC_PADDING;

        if spec.metric_text == HUNDRED_PERCENT {
            width += HUNDRED_PERCENT_EXTRA_WIDTH;
            metric_x += HUNDRED_PERCENT_SHIFT;
        }

        // Very large complexity ratios grow the metric panel instead of clipping.
        let text_end = metric_x + glyph::text_width(&spec.metric_text, metric_weight(spec)) as i32;
        width = width.max((text_end + METRIC_PADDING) as u32);

        Self {
            width,
            divider_x,
            label_x,
            metric_x
        }
    }
}

/// Renders `spec` to PNG bytes.
///
/// # Errors
///
/// Returns [`Error::Render`] if the PNG encoder fails.
///
/// # Example
///
/// ```
/// use covbadge::{BadgeKind, BadgeSpec, ColorBand, render_badge};
///
/// let spec = BadgeSpec::new(BadgeKind::Line, "80%", ColorBand::Green);
/// let first = render_badge(&spec).expect("render");
/// let second = render_badge(&spec).expect("render");
/// assert_eq!(first, second);
/// ```
pub fn render_badge(spec: &BadgeSpec) -> Result<Vec<u8>, Error> {
    let canvas = rasterize(spec);
    let mut encoded = Vec::with_capacity(512);
    PngEncoder::new(&mut encoded)
        .write_image(
            canvas.as_raw(),
            canvas.width(),
            canvas.height(),
            ExtendedColorType::Rgba8
        )
        .map_err(|error| Error::render(format!("failed to encode PNG: {error}")))?;
    Ok(encoded)
}

/// Paints `spec` into an RGBA canvas without encoding it.
pub fn rasterize(spec: &BadgeSpec) -> RgbaImage {
    let layout = Layout::for_spec(spec);
    let mut canvas = RgbaImage::new(layout.width, BADGE_HEIGHT);
    let label = opaque(LABEL_BACKGROUND);
    let metric = opaque(spec.color_band.rgb());

    for (x, y, pixel) in canvas.enumerate_pixels_mut() {
        if outside_rounded_rect(x, y, layout.width, BADGE_HEIGHT) {
            continue;
        }
        *pixel = if x < layout.divider_x { label } else { metric };
    }

    let text = opaque(TEXT_COLOR);
    glyph::draw_text(&mut canvas, spec.label(), layout.label_x, TEXT_TOP, Weight::SemiBold, text);

    glyph::draw_text(
        &mut canvas,
        &spec.metric_text,
        layout.metric_x,
        TEXT_TOP,
        metric_weight(spec),
        text
    );

    canvas
}

fn metric_weight(spec: &BadgeSpec) -> Weight {
    if spec.errored {
        Weight::Bold
    } else {
        Weight::SemiBold
    }
}

fn opaque([red, green, blue]: [u8; 3]) -> Rgba<u8> {
    Rgba([red, green, blue, 0xff])
}

// Pixel-center test against quarter circles in each corner, in doubled
// coordinates to stay in integers.
fn outside_rounded_rect(x: u32, y: u32, width: u32, height: u32) -> bool {
    let radius = CORNER_RADIUS;
    let corner_x = if x < radius {
        radius - x
    } else if x >= width - radius {
        x + radius + 1 - width
    } else {
        return false;
    };
    let corner_y = if y < radius {
        radius - y
    } else if y >= height - radius {
        y + radius + 1 - height
    } else {
        return false;
    };
    let dx = 2 * corner_x - 1;
    let dy = 2 * corner_y - 1;
    dx * dx + dy * dy > 4 * radius * radius
}

/// Encoded badge plus the validators sent with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadgeImage {
    /// PNG bytes.
    pub bytes:         Vec<u8>,
    /// Quoted content hash of `bytes`.
    pub etag:          String,
    /// Stop time of the build the metric came from.
    pub last_modified: Option<DateTime<Utc>>
}

impl BadgeImage {
    /// Wraps rendered bytes, deriving the entity tag from their content.
    pub fn new(bytes: Vec<u8>, last_modified: Option<DateTime<Utc>>) -> Self {
        let etag = content_tag(&bytes);
        Self {
            bytes,
            etag,
            last_modified
        }
    }

    /// Renders `spec` and wraps the result.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Render`] from [`render_badge`].
    pub fn render(spec: &BadgeSpec, last_modified: Option<DateTime<Utc>>) -> Result<Self, Error> {
        Ok(Self::new(render_badge(spec)?, last_modified))
    }

    /// `Last-Modified` header value in IMF-fixdate form.
    pub fn last_modified_header(&self) -> Option<String> {
        self.last_modified
            .map(|stop_time| stop_time.format("%a, %d %b %Y %H:%M:%S GMT").to_string())
    }
}

/// Strong entity tag for `bytes`: the quoted SHA-256 hex digest.
pub fn content_tag(bytes: &[u8]) -> String {
    format!("\"{}\"", hex::encode(Sha256::digest(bytes)))
}

/// Error badge for a request that never got far enough to pick a kind.
pub fn fallback_spec() -> BadgeSpec {
    BadgeSpec::errored(BadgeKind::Line)
}
