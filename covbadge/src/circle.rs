// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! CircleCI v1 API client.
//!
//! Three calls are made per request at most: the latest successful build,
//! that build's artifact listing, and the artifact itself. Calls are never
//! retried; a failure or timeout short-circuits the request.
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    artifact::Artifact,
    config::ServiceSettings,
    error::Error,
    identity::{ProjectIdentity, TOKEN_PARAMETER},
};

/// Most recent successful build of a project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize,)]
pub struct Build
{
    /// Build number within the project.
    #[serde(rename = "build_num")]
    pub number:    u64,
    /// When the build finished; CircleCI reports `null` for running builds.
    #[serde(default)]
    pub stop_time: Option<DateTime<Utc,>,>,
    /// Outcome reported by CircleCI (e.g. `success`, `fixed`).
    #[serde(default)]
    pub status:    Option<String,>,
}

/// Thin client over the CircleCI project endpoints.
#[derive(Debug, Clone,)]
pub struct CircleClient
{
    http:     Client,
    base_url: Url,
    branch:   String,
}

impl CircleClient
{
    /// Builds a client honoring the configured root URL, branch and timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for an unusable root URL and
    /// [`Error::UpstreamUnavailable`] if the HTTP client cannot be created.
    pub fn new(settings: &ServiceSettings,) -> Result<Self, Error,>
    {
        let base_url = Url::parse(settings.circle_url.trim_end_matches('/',),).map_err(|e| {
            Error::validation(format!("invalid CircleCI URL '{}': {e}", settings.circle_url),)
        },)?;
        if base_url.cannot_be_a_base() {
            return Err(Error::validation(format!(
                "CircleCI URL '{}' cannot carry a path",
                settings.circle_url
            ),),);
        }

        let http = Client::builder()
            .timeout(settings.timeout,)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")),)
            .build()
            .map_err(|e| Error::upstream(format!("failed to initialize HTTP client: {e}"), None,),)?;

        Ok(Self {
            http,
            base_url,
            branch: settings.branch.clone(),
        },)
    }

    /// Fetches the most recent successful build on the configured branch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] on transport failure, a
    /// non-success status, an undecodable body or an empty build list.
    pub async fn latest_successful_build(&self, identity: &ProjectIdentity,) -> Result<Build, Error,>
    {
        let mut url = self.endpoint(identity, &["tree", self.branch.as_str(),],);
        debug!("Looking up latest successful build at {}", url);
        url.query_pairs_mut()
            .append_pair(TOKEN_PARAMETER, &identity.token,)
            .append_pair("limit", "1",)
            .append_pair("filter", "successful",);

        let response = self.http.get(url,).send().await?;
        let status = ensure_success(response.status(), "build lookup",)?;
        let builds: Vec<Build,> = response.json().await.map_err(|e| {
            Error::upstream(format!("build list is not valid JSON: {e}"), Some(status.as_u16(),),)
        },)?;

        builds.into_iter().next().ok_or_else(|| {
            Error::upstream(
                format!(
                    "no successful build of {}/{} on branch '{}'",
                    identity.author, identity.project, self.branch
                ),
                Some(status.as_u16(),),
            )
        },)
    }

    /// Fetches the artifact listing of `build`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] on transport failure, a
    /// non-success status or an undecodable body.
    pub async fn artifacts(
        &self,
        identity: &ProjectIdentity,
        build: &Build,
    ) -> Result<Vec<Artifact,>, Error,>
    {
        let number = build.number.to_string();
        let mut url = self.endpoint(identity, &[number.as_str(), "artifacts",],);
        debug!("Listing artifacts at {}", url);
        url.query_pairs_mut().append_pair(TOKEN_PARAMETER, &identity.token,);

        let response = self.http.get(url,).send().await?;
        let status = ensure_success(response.status(), "artifact listing",)?;
        response.json().await.map_err(|e| {
            Error::upstream(format!("artifact listing is not valid JSON: {e}"), Some(status.as_u16(),),)
        },)
    }

    /// Downloads the artifact at `artifact_url`, authenticating with the
    /// caller's token.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] when the URL is malformed, the
    /// transfer fails or the storage answers with a non-success status.
    pub async fn fetch_artifact(
        &self,
        identity: &ProjectIdentity,
        artifact_url: &str,
    ) -> Result<Vec<u8,>, Error,>
    {
        let mut url = Url::parse(artifact_url,).map_err(|e| {
            Error::upstream(format!("artifact URL '{artifact_url}' is invalid: {e}"), None,)
        },)?;
        debug!("Downloading artifact {}", url);
        url.query_pairs_mut().append_pair(TOKEN_PARAMETER, &identity.token,);

        let response = self.http.get(url,).send().await?;
        ensure_success(response.status(), "artifact download",)?;
        Ok(response.bytes().await?.to_vec(),)
    }

    fn endpoint(&self, identity: &ProjectIdentity, tail: &[&str],) -> Url
    {
        let mut url = self.base_url.clone();
        if let Ok(mut segments,) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .push(&identity.author,)
                .push(&identity.project,)
                .extend(tail,);
        }
        url
    }
}

fn ensure_success(status: StatusCode, operation: &str,) -> Result<StatusCode, Error,>
{
    if status.is_success() {
        Ok(status,)
    } else {
        Err(Error::upstream(format!("{operation} returned {status}"), Some(status.as_u16(),),),)
    }
}
