// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Coverage and complexity badges for CircleCI builds.
//!
//! The library resolves the latest successful build of a project, locates its
//! Jacoco XML report among the build artifacts, classifies one metric into a
//! colored band and renders it as a small PNG badge. [`server::router`] wires
//! the pipeline to HTTP routes described by a [`RouteTable`].

pub mod artifact;
pub mod badge;
pub mod circle;
pub mod config;
mod error;
mod glyph;
pub mod identity;
pub mod metric;
pub mod pipeline;
pub mod report;
pub mod server;
#[cfg(test)]
mod stub;

pub use artifact::{Artifact, ArtifactTarget, ResolutionStrategy, locate_artifact};
pub use badge::{BadgeImage, render_badge};
pub use circle::{Build, CircleClient};
pub use config::{RouteConfig, RouteKind, RouteTable, ServiceSettings, load_routes, parse_routes};
pub use error::{Error, io_error};
pub use identity::{ProjectIdentity, QueryParams, RequestContext};
pub use metric::{BadgeKind, BadgeSpec, ColorBand, classify, measure};
pub use pipeline::{BadgeOutcome, BadgeService};
pub use report::{Counter, CoverageCounters, parse_report};
