// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Per-request identity and context values.
//!
//! Everything a pipeline stage needs about the inbound request travels in a
//! [`RequestContext`] owned by that request. Nothing here is shared between
//! requests.
use std::fmt;

use serde::Deserialize;

use crate::{config::RouteConfig, error::Error};

/// Query parameter carrying the CI provider access token.
pub const TOKEN_PARAMETER: &str = "circle-token";

/// CI project coordinates plus the caller-supplied access token.
#[derive(Clone, PartialEq, Eq,)]
pub struct ProjectIdentity
{
    /// Account or organization owning the project.
    pub author:  String,
    /// Project (repository) name.
    pub project: String,
    /// Opaque access token forwarded to the provider.
    pub token:   String,
}

impl ProjectIdentity
{
    /// Returns the token with everything but the last four characters masked.
    pub fn redacted_token(&self,) -> String
    {
        let count = self.token.chars().count();
        if count <= 4 {
            return "****".to_owned();
        }
        let tail: String = self.token.chars().skip(count - 4,).collect();
        format!("****{tail}")
    }
}

impl fmt::Debug for ProjectIdentity
{
    fn fmt(&self, f: &mut fmt::Formatter<'_,>,) -> fmt::Result
    {
        f.debug_struct("ProjectIdentity",)
            .field("author", &self.author,)
            .field("project", &self.project,)
            .field("token", &self.redacted_token(),)
            .finish()
    }
}

/// Raw query string accepted by every route.
#[derive(Debug, Default, Deserialize,)]
pub struct QueryParams
{
    /// `author`: account owning the project.
    pub author:        Option<String,>,
    /// `project`: repository name.
    pub project:       Option<String,>,
    /// `circle-token`: CircleCI access token.
    #[serde(rename = "circle-token")]
    pub circle_token:  Option<String,>,
    /// `coverage-file`: XML report override for badge routes.
    #[serde(rename = "coverage-file")]
    pub coverage_file: Option<String,>,
    /// `report-file`: HTML report override for the report route.
    #[serde(rename = "report-file")]
    pub report_file:   Option<String,>,
}

impl QueryParams
{
    /// Extracts the project identity, rejecting blank or absent fields.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] naming the first missing parameter.
    pub fn identity(&self,) -> Result<ProjectIdentity, Error,>
    {
        Ok(ProjectIdentity {
            author:  required(self.author.as_deref(), "author",)?,
            project: required(self.project.as_deref(), "project",)?,
            token:   required(self.circle_token.as_deref(), TOKEN_PARAMETER,)?,
        },)
    }

    /// Returns the caller's artifact override for the given route, if any.
    pub fn artifact_override(&self, route: &RouteConfig,) -> Option<&str,>
    {
        let value = if route.is_report() {
            self.report_file.as_deref()
        } else {
            self.coverage_file.as_deref()
        };
        value.map(str::trim,).filter(|value| !value.is_empty(),)
    }
}

fn required(value: Option<&str,>, name: &str,) -> Result<String, Error,>
{
    value
        .map(str::trim,)
        .filter(|value| !value.is_empty(),)
        .map(str::to_owned,)
        .ok_or_else(|| Error::validation(format!("missing required query parameter '{name}'"),),)
}

/// Everything one request carries through the pipeline.
#[derive(Debug, Clone,)]
pub struct RequestContext
{
    /// Who and what is being asked for.
    pub identity:          ProjectIdentity,
    /// Route configuration selected by the request path.
    pub route:             RouteConfig,
    /// Caller-supplied `coverage-file` / `report-file`, when given.
    pub artifact_override: Option<String,>,
}

impl RequestContext
{
    /// Builds the context for a request on `route`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] when identity parameters are missing.
    pub fn from_query(route: &RouteConfig, params: &QueryParams,) -> Result<Self, Error,>
    {
        Ok(Self {
            identity:          params.identity()?,
            route:             route.clone(),
            artifact_override: params.artifact_override(route,).map(str::to_owned,),
        },)
    }

    /// Artifact setting in effect: the override, else the route default.
    pub fn artifact(&self,) -> &str
    {
        self.artifact_override.as_deref().unwrap_or(&self.route.default_artifact,)
    }
}
