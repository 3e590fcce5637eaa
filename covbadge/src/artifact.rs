// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Resolves a build's artifact listing to a downloadable URL.
//!
//! Two strategies exist. Pattern mode scans artifact paths with a regular
//! expression. Root-rewrite mode derives the storage root from any listed
//! URL shaped like `<scheme>://<host>/.../<digits>/home/<user>/` and appends
//! `<project>/<relative path>` to it, which copes with storage backends whose
//! URLs do not mirror the per-artifact `path` field.
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::Error;

const ROOT_PREFIX_PATTERN: &str =
    r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]+/(?:[^/]+/)*?\d+/home/[^/]+/";

/// One file published by a build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Artifact
{
    /// Path of the file as recorded by the CI provider.
    pub path: String,
    /// Absolute download URL.
    pub url:  String,
}

/// How a route turns its artifact setting into a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy
{
    /// Artifact setting is a regular expression over listed paths.
    Pattern,
    /// Artifact setting is a relative path joined onto the storage root.
    #[default]
    RootRewrite,
}

/// Concrete lookup target for one request.
#[derive(Debug, Clone,)]
pub enum ArtifactTarget
{
    /// Relative path resolved verbatim or through the root prefix.
    Path(String,),
    /// First listed path matching the expression wins.
    Pattern(Regex,),
}

impl ArtifactTarget
{
    /// Builds the target for a route.
    ///
    /// In pattern mode the route default is compiled as a regular
    /// expression, while a caller-supplied override is matched as a literal
    /// path suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when the pattern does not compile.
    pub fn for_route(
        strategy: ResolutionStrategy,
        default: &str,
        caller_override: Option<&str,>,
    ) -> Result<Self, Error,>
    {
        match (strategy, caller_override,) {
            (ResolutionStrategy::RootRewrite, Some(path,),) => Ok(Self::Path(path.to_owned(),),),
            (ResolutionStrategy::RootRewrite, None,) => Ok(Self::Path(default.to_owned(),),),
            (ResolutionStrategy::Pattern, Some(suffix,),) => {
                compile(&format!("{}$", regex::escape(suffix)),).map(Self::Pattern,)
            }
            (ResolutionStrategy::Pattern, None,) => compile(default,).map(Self::Pattern,),
        }
    }

    /// Short description used in logs and error messages.
    pub fn describe(&self,) -> String
    {
        match self {
            Self::Path(path,) => format!("path '{path}'"),
            Self::Pattern(pattern,) => format!("pattern /{}/", pattern.as_str()),
        }
    }
}

/// Compiles a route pattern, mapping failures to validation errors.
///
/// # Errors
///
/// Returns [`Error::Validation`] when `pattern` is not a valid expression.
pub fn compile(pattern: &str,) -> Result<Regex, Error,>
{
    Regex::new(pattern,)
        .map_err(|e| Error::validation(format!("invalid artifact pattern '{pattern}': {e}"),),)
}

/// Picks the download URL for `target` out of a build's artifact listing.
///
/// # Errors
///
/// Returns [`Error::NotFound`] when no artifact matches and no root prefix
/// can be derived from the listing.
///
/// # Example
///
/// ```
/// use covbadge::{Artifact, ArtifactTarget, locate_artifact};
///
/// # fn main() -> Result<(), covbadge::Error> {
/// let listing = vec![Artifact {
///     path: "home/ubuntu/widget/build/log.txt".to_owned(),
///     url:  "https://42-1-gh.circle-artifacts.com/0/home/ubuntu/widget/build/log.txt".to_owned(),
/// }];
/// let target = ArtifactTarget::Path("build/report.xml".to_owned());
///
/// let url = locate_artifact(&listing, "widget", &target)?;
/// assert_eq!(url, "https://42-1-gh.circle-artifacts.com/0/home/ubuntu/widget/build/report.xml");
/// # Ok(())
/// # }
/// ```
pub fn locate_artifact(
    listing: &[Artifact],
    project: &str,
    target: &ArtifactTarget,
) -> Result<String, Error,>
{
    match target {
        ArtifactTarget::Pattern(pattern,) => listing
            .iter()
            .find(|artifact| pattern.is_match(&artifact.path,),)
            .map(|artifact| artifact.url.clone(),)
            .ok_or_else(|| {
                Error::not_found(format!(
                    "none of {} artifacts matches {}",
                    listing.len(),
                    target.describe()
                ),)
            },),
        ArtifactTarget::Path(path,) => {
            let relative = path.trim_start_matches('/',);
            if let Some(artifact,) = listing.iter().find(|artifact| artifact.path == relative,) {
                return Ok(artifact.url.clone(),);
            }

            let prefix = root_prefix(listing,)?.ok_or_else(|| {
                Error::not_found(format!(
                    "no artifact URL of {} exposes a storage root for {}",
                    listing.len(),
                    target.describe()
                ),)
            },)?;
            Ok(format!("{prefix}{project}/{relative}"),)
        }
    }
}

/// Returns the storage root of the first listed URL that has one.
///
/// The root runs up to and including the `home/<user>/` segment that follows
/// a purely numeric path segment.
///
/// # Errors
///
/// Returns [`Error::Validation`] if the built-in expression fails to compile.
pub fn root_prefix(listing: &[Artifact],) -> Result<Option<String,>, Error,>
{
    let pattern = compile(ROOT_PREFIX_PATTERN,)?;
    Ok(listing
        .iter()
        .find_map(|artifact| pattern.find(&artifact.url,),)
        .map(|found| found.as_str().to_owned(),),)
}
