// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Metric classification.
//!
//! Converts parsed Jacoco counters into the text and color band shown on a
//! badge. Every function here is pure; missing counters and zero
//! denominators surface as [`Error::MetricUnavailable`] before any
//! arithmetic happens, so no NaN or infinity can reach the renderer.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    error::Error,
    report::{Counter, CoverageCounters},
};

/// Jacoco counter used for line badges.
pub const INSTRUCTION: &str = "INSTRUCTION";
/// Jacoco counter used for branch badges.
pub const BRANCH: &str = "BRANCH";
/// Jacoco counter used for complexity badges.
pub const COMPLEXITY: &str = "COMPLEXITY";
/// Jacoco counter providing the method count for complexity badges.
pub const METHOD: &str = "METHOD";

/// Metric a badge displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum BadgeKind
{
    /// Instruction coverage, shown as "coverage".
    Line,
    /// Branch coverage.
    Branch,
    /// Average cyclomatic complexity per method.
    Complexity,
}

impl BadgeKind
{
    /// Text drawn in the left panel.
    pub fn label(self,) -> &'static str
    {
        match self {
            Self::Line => "coverage",
            Self::Branch => "branch",
            Self::Complexity => "complexity",
        }
    }

    /// Glyph drawn in the right panel when the metric is unavailable.
    pub fn error_text(self,) -> &'static str
    {
        match self {
            Self::Line | Self::Branch => "??%",
            Self::Complexity => "!!!",
        }
    }
}

impl fmt::Display for BadgeKind
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        let name = match self {
            Self::Line => "line",
            Self::Branch => "branch",
            Self::Complexity => "complexity",
        };
        f.write_str(name,)
    }
}

impl FromStr for BadgeKind
{
    type Err = Error;

    fn from_str(value: &str,) -> Result<Self, Self::Err,>
    {
        match value.trim().to_ascii_lowercase().as_str() {
            "line" | "coverage" => Ok(Self::Line,),
            "branch" => Ok(Self::Branch,),
            "complexity" => Ok(Self::Complexity,),
            other => Err(Error::validation(format!("unknown badge kind '{other}'"),),),
        }
    }
}

/// Background color of the metric panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "lowercase")]
pub enum ColorBand
{
    /// Healthy coverage or simple code.
    Green,
    /// Second band.
    Orange,
    /// Third band.
    DarkOrange,
    /// Lowest coverage band.
    DarkRed,
    /// Highest complexity band and every error badge.
    Red,
}

impl ColorBand
{
    /// RGB value matching the CSS named color.
    pub fn rgb(self,) -> [u8; 3]
    {
        match self {
            Self::Green => [0x00, 0x80, 0x00],
            Self::Orange => [0xff, 0xa5, 0x00],
            Self::DarkOrange => [0xff, 0x8c, 0x00],
            Self::DarkRed => [0x8b, 0x00, 0x00],
            Self::Red => [0xff, 0x00, 0x00],
        }
    }
}

/// Everything the renderer needs; identical specs render identical bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize,)]
pub struct BadgeSpec
{
    /// Metric shown.
    pub kind:        BadgeKind,
    /// Right-panel text, e.g. `80%` or `7.00`.
    pub metric_text: String,
    /// Right-panel background.
    pub color_band:  ColorBand,
    /// Drawn as an error badge: blank label, bold placeholder text.
    pub errored:     bool,
}

impl BadgeSpec
{
    /// Builds a successful badge spec.
    pub fn new(kind: BadgeKind, metric_text: impl Into<String,>, color_band: ColorBand,) -> Self
    {
        Self {
            kind,
            metric_text: metric_text.into(),
            color_band,
            errored: false,
        }
    }

    /// Builds the error badge for `kind`: placeholder text on red.
    pub fn errored(kind: BadgeKind,) -> Self
    {
        Self {
            kind,
            metric_text: kind.error_text().to_owned(),
            color_band: ColorBand::Red,
            errored: true,
        }
    }

    /// Label drawn in the left panel; blank for error badges.
    pub fn label(&self,) -> &'static str
    {
        if self.errored { "" } else { self.kind.label() }
    }
}

/// Classifies counters into a badge spec, degrading to the error spec.
///
/// The failure that forced the error spec is returned next to it so callers
/// can tell a real metric from a placeholder.
///
/// # Examples
///
/// ```
/// use covbadge::{BadgeKind, ColorBand, Counter, CoverageCounters, classify};
///
/// let mut counters = CoverageCounters::default();
/// counters.insert("INSTRUCTION", Counter { covered: 80, missed: 20 });
///
/// let (spec, failure) = classify(BadgeKind::Line, &counters);
/// assert_eq!(spec.metric_text, "80%");
/// assert_eq!(spec.color_band, ColorBand::Green);
/// assert!(failure.is_none());
///
/// let (spec, failure) = classify(BadgeKind::Branch, &counters);
/// assert!(spec.errored);
/// assert!(failure.is_some());
/// ```
pub fn classify(kind: BadgeKind, counters: &CoverageCounters,) -> (BadgeSpec, Option<Error,>,)
{
    match measure(kind, counters,) {
        Ok(spec,) => (spec, None,),
        Err(error,) => (BadgeSpec::errored(kind,), Some(error,),),
    }
}

/// Classifies counters into a badge spec.
///
/// # Errors
///
/// Returns [`Error::MetricUnavailable`] when a required counter is absent or
/// a denominator is zero.
pub fn measure(kind: BadgeKind, counters: &CoverageCounters,) -> Result<BadgeSpec, Error,>
{
    match kind {
        BadgeKind::Line | BadgeKind::Branch => {
            let name = if kind == BadgeKind::Line { INSTRUCTION } else { BRANCH };
            let counter = require(counters, name,)?;
            let percent = percentage(counter,)
                .ok_or_else(|| Error::metric(format!("{name} counter has no units"),),)?;
            Ok(BadgeSpec::new(kind, format!("{percent}%"), percentage_band(percent,),),)
        }
        BadgeKind::Complexity => {
            let complexity = require(counters, COMPLEXITY,)?;
            let methods = require(counters, METHOD,)?;
            let ratio = complexity_ratio(complexity, methods,)
                .ok_or_else(|| Error::metric("METHOD counter reports no covered methods",),)?;
            Ok(BadgeSpec::new(kind, format_complexity(ratio,), complexity_band(ratio,),),)
        }
    }
}

fn require(counters: &CoverageCounters, name: &str,) -> Result<Counter, Error,>
{
    counters
        .get(name,)
        .ok_or_else(|| Error::metric(format!("report has no {name} counter"),),)
}

/// Coverage percentage rounded half up, or `None` when the counter has no
/// units.
///
/// Computed in integers so exact halves (e.g. 29 of 200) round up.
pub fn percentage(counter: Counter,) -> Option<u32,>
{
    let covered = u128::from(counter.covered,);
    let total = covered + u128::from(counter.missed,);
    if total == 0 {
        return None;
    }
    u32::try_from((200 * covered + total) / (2 * total),).ok()
}

/// Color band for a coverage percentage. Values at or above 100 are green.
pub fn percentage_band(percent: u32,) -> ColorBand
{
    match percent {
        80.. => ColorBand::Green,
        70..80 => ColorBand::Orange,
        60..70 => ColorBand::DarkOrange,
        _ => ColorBand::DarkRed,
    }
}

/// Average complexity per covered method, or `None` for zero methods.
pub fn complexity_ratio(complexity: Counter, methods: Counter,) -> Option<f64,>
{
    if methods.covered == 0 {
        return None;
    }
    Some(complexity.total() as f64 / methods.covered as f64,)
}

/// Color band for an average complexity, judged on the unrounded value.
pub fn complexity_band(ratio: f64,) -> ColorBand
{
    if ratio <= 10.0 {
        ColorBand::Green
    } else if ratio <= 20.0 {
        ColorBand::Orange
    } else if ratio <= 40.0 {
        ColorBand::DarkOrange
    } else {
        ColorBand::Red
    }
}

/// Formats a complexity ratio with precision shrinking as magnitude grows.
///
/// The precision is picked from the rounded value, so 9.996 prints as
/// `10.0` and 99.96 as `100`.
pub fn format_complexity(ratio: f64,) -> String
{
    let hundredths = (ratio * 100.0).round() / 100.0;
    if hundredths < 10.0 {
        return format!("{hundredths:.2}");
    }
    let tenths = (ratio * 10.0).round() / 10.0;
    if tenths < 100.0 { format!("{tenths:.1}") } else { format!("{:.0}", ratio.round()) }
}
