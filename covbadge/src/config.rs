//! Route table and service settings.
//!
//! Every HTTP route is one row of a [`RouteTable`]: which badge it renders
//! (or whether it redirects to the HTML report), the artifact it reads by
//! default and how that artifact is located. The built-in table can be
//! overridden by a YAML document so deployments with non-standard Gradle
//! layouts need no code change.

use std::{collections::HashSet, fs, path::Path, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    artifact::{self, ResolutionStrategy},
    error::{self, Error},
    metric::BadgeKind,
};

/// Default CircleCI v1 project API root.
pub const DEFAULT_CIRCLE_URL: &str = "https://circleci.com/api/v1/project";
/// Branch whose builds are queried unless configured otherwise.
pub const DEFAULT_BRANCH: &str = "master";
/// Upstream request timeout unless configured otherwise.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
/// Gradle's default Jacoco XML report location.
pub const DEFAULT_COVERAGE_FILE: &str = "build/reports/jacoco/test/jacocoTestReport.xml";
/// Gradle's default Jacoco HTML report entry point.
pub const DEFAULT_REPORT_FILE: &str = "build/reports/jacoco/test/html/index.html";

/// What a route produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,)]
#[serde(rename_all = "snake_case")]
pub enum RouteKind
{
    Line,
    Branch,
    Complexity,
    /// Redirect to the human-readable report.
    Report,
}

impl RouteKind
{
    /// Badge kind rendered by the route, `None` for the report redirect.
    pub fn badge_kind(self,) -> Option<BadgeKind,>
    {
        match self {
            Self::Line => Some(BadgeKind::Line,),
            Self::Branch => Some(BadgeKind::Branch,),
            Self::Complexity => Some(BadgeKind::Complexity,),
            Self::Report => None,
        }
    }
}

/// One row of the route table.
///
/// # Examples
///
/// ```
/// use covbadge::{ResolutionStrategy, RouteConfig, RouteKind};
///
/// let yaml = r#"
/// path: /line
/// kind: line
/// default_artifact: app/build/jacoco.xml
/// "#;
/// let route: RouteConfig = serde_yaml::from_str(yaml,).expect("valid route",);
/// assert_eq!(route.kind, RouteKind::Line);
/// assert_eq!(route.strategy, ResolutionStrategy::RootRewrite);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig
{
    /// Request path, including the leading slash.
    pub path:             String,
    /// What the route produces.
    pub kind:             RouteKind,
    /// Artifact path (root rewrite) or expression (pattern) used when the
    /// caller does not override it.
    #[serde(alias = "default-artifact", alias = "defaultArtifact")]
    pub default_artifact: String,
    /// How the artifact is located.
    #[serde(default)]
    pub strategy:         ResolutionStrategy,
}

impl RouteConfig
{
    fn new(
        path: &str,
        kind: RouteKind,
        default_artifact: &str,
        strategy: ResolutionStrategy,
    ) -> Self
    {
        Self {
            path: path.to_owned(),
            kind,
            default_artifact: default_artifact.to_owned(),
            strategy,
        }
    }

    /// Whether the route redirects to the report instead of drawing a badge.
    pub fn is_report(&self,) -> bool
    {
        self.kind == RouteKind::Report
    }

    fn validate(&self,) -> Result<(), Error,>
    {
        if !self.path.starts_with('/',) || self.path.len() < 2 {
            return Err(Error::validation(format!(
                "route path '{}' must start with '/' and name a route",
                self.path
            ),),);
        }
        if self.default_artifact.trim().is_empty() {
            return Err(Error::validation(format!(
                "route '{}' must declare a default artifact",
                self.path
            ),),);
        }
        if self.strategy == ResolutionStrategy::Pattern {
            artifact::compile(&self.default_artifact,)?;
        }
        Ok((),)
    }
}

/// Ordered set of routes served by the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct RouteTable
{
    #[serde(default)]
    pub routes: Vec<RouteConfig,>,
}

impl Default for RouteTable
{
    /// Built-in table: the legacy `/badge` route locates its report by
    /// pattern, the per-metric routes and `/report` by root rewrite.
    fn default() -> Self
    {
        use ResolutionStrategy::{Pattern, RootRewrite};

        Self {
            routes: vec![
                RouteConfig::new("/badge", RouteKind::Line, r"jacocoTestReport\.xml$", Pattern,),
                RouteConfig::new("/line", RouteKind::Line, DEFAULT_COVERAGE_FILE, RootRewrite,),
                RouteConfig::new("/branch", RouteKind::Branch, DEFAULT_COVERAGE_FILE, RootRewrite,),
                RouteConfig::new(
                    "/complexity",
                    RouteKind::Complexity,
                    DEFAULT_COVERAGE_FILE,
                    RootRewrite,
                ),
                RouteConfig::new("/report", RouteKind::Report, DEFAULT_REPORT_FILE, RootRewrite,),
            ],
        }
    }
}

impl RouteTable
{
    /// Finds the route serving `path`.
    pub fn find(&self, path: &str,) -> Option<&RouteConfig,>
    {
        self.routes.iter().find(|route| route.path == path,)
    }

    /// Overlays `overrides` on top of this table.
    ///
    /// Entries whose path already exists replace the existing row in place;
    /// new paths are appended.
    pub fn merged_with(mut self, overrides: RouteTable,) -> Self
    {
        for route in overrides.routes {
            match self.routes.iter_mut().find(|existing| existing.path == route.path,) {
                Some(existing,) => *existing = route,
                None => self.routes.push(route,),
            }
        }
        self
    }

    /// Checks every row and rejects duplicate paths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] describing the first offending row.
    pub fn validate(&self,) -> Result<(), Error,>
    {
        let mut seen = HashSet::with_capacity(self.routes.len(),);
        for route in &self.routes {
            route.validate()?;
            if !seen.insert(route.path.as_str(),) {
                return Err(Error::validation(format!("route '{}' is declared twice", route.path),),);
            }
        }
        Ok((),)
    }
}

/// Parses a YAML route override document and merges it onto the defaults.
///
/// # Errors
///
/// Propagates [`Error::Parse`] for malformed YAML and
/// [`Error::Validation`] for invalid or duplicated routes.
pub fn parse_routes(contents: &str,) -> Result<RouteTable, Error,>
{
    let overrides: RouteTable = serde_yaml::from_str(contents,)?;
    if overrides.routes.is_empty() {
        return Err(Error::validation("route file must declare at least one route",),);
    }
    overrides.validate()?;

    let table = RouteTable::default().merged_with(overrides,);
    table.validate()?;
    Ok(table,)
}

/// Loads route overrides from `path`, or returns the defaults for `None`.
///
/// # Errors
///
/// Returns [`Error::Io`] when the file cannot be read, plus everything
/// [`parse_routes`] reports.
pub fn load_routes(path: Option<&Path,>,) -> Result<RouteTable, Error,>
{
    match path {
        Some(path,) => {
            let contents =
                fs::read_to_string(path,).map_err(|source| error::io_error(path, source,),)?;
            parse_routes(&contents,)
        }
        None => Ok(RouteTable::default(),),
    }
}

/// Settings shared by every request of a running service.
#[derive(Debug, Clone,)]
pub struct ServiceSettings
{
    /// CircleCI v1 project API root, without trailing slash.
    pub circle_url: String,
    /// Branch whose latest successful build is used.
    pub branch:     String,
    /// Bound on each upstream call.
    pub timeout:    Duration,
    /// Routes served.
    pub routes:     RouteTable,
}

impl Default for ServiceSettings
{
    fn default() -> Self
    {
        Self {
            circle_url: DEFAULT_CIRCLE_URL.to_owned(),
            branch:     DEFAULT_BRANCH.to_owned(),
            timeout:    Duration::from_secs(DEFAULT_TIMEOUT_SECS,),
            routes:     RouteTable::default(),
        }
    }
}
