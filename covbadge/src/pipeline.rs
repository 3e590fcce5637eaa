// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Request pipeline.
//!
//! A badge request runs build lookup, artifact listing, artifact download,
//! report parsing, classification and rendering as one sequence of awaited
//! stages; the first failing stage decides the outcome. A report request
//! stops after artifact resolution. No stage reads anything but its
//! [`RequestContext`] and the previous stage's output.

use tracing::{debug, info, warn};

use crate::{
    artifact::{self, ArtifactTarget},
    badge::BadgeImage,
    circle::{Build, CircleClient},
    config::{RouteTable, ServiceSettings},
    error::Error,
    identity::RequestContext,
    metric::{self, BadgeSpec},
    report::{self, CoverageCounters},
};

/// Rendered badge plus the failure it stands in for, if any.
#[derive(Debug,)]
pub struct BadgeOutcome
{
    /// Image to return to the caller.
    pub image:   BadgeImage,
    /// Why the badge is an error badge; `None` for a real metric.
    pub failure: Option<Error,>,
}

/// Immutable per-process collaborators shared by all requests.
#[derive(Debug, Clone,)]
pub struct BadgeService
{
    client: CircleClient,
    routes: RouteTable,
}

impl BadgeService
{
    /// Creates the service from process settings.
    ///
    /// # Errors
    ///
    /// Propagates construction errors from [`CircleClient::new`].
    pub fn new(settings: &ServiceSettings,) -> Result<Self, Error,>
    {
        Ok(Self {
            client: CircleClient::new(settings,)?,
            routes: settings.routes.clone(),
        },)
    }

    /// Routes this service answers.
    pub fn routes(&self,) -> &RouteTable
    {
        &self.routes
    }

    /// Produces the badge for a badge route.
    ///
    /// Structural and content failures still yield an error badge, reported
    /// through [`BadgeOutcome::failure`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::Render`] only when the badge cannot be encoded.
    pub async fn badge(&self, context: &RequestContext,) -> Result<BadgeOutcome, Error,>
    {
        let kind = context
            .route
            .kind
            .badge_kind()
            .ok_or_else(|| Error::validation(format!("route '{}' does not render badges", context.route.path),),)?;

        let (build, counters,) = match self.load_counters(context,).await {
            Ok(loaded,) => loaded,
            Err(error,) => {
                warn!(
                    "{} badge for {}/{} failed ({}): {}",
                    kind,
                    context.identity.author,
                    context.identity.project,
                    error.kind_name(),
                    error
                );
                let image = BadgeImage::render(&BadgeSpec::errored(kind,), None,)?;
                return Ok(BadgeOutcome {
                    image,
                    failure: Some(error,),
                },);
            }
        };

        let (spec, failure,) = metric::classify(kind, &counters,);
        if let Some(error,) = failure.as_ref() {
            warn!(
                "{} badge for {}/{} has no metric ({}): {}",
                kind,
                context.identity.author,
                context.identity.project,
                error.kind_name(),
                error
            );
        } else {
            info!(
                "{} badge for {}/{} build #{}: {}",
                kind, context.identity.author, context.identity.project, build.number, spec.metric_text
            );
        }

        let image = BadgeImage::render(&spec, build.stop_time,)?;
        Ok(BadgeOutcome {
            image,
            failure,
        },)
    }

    /// Resolves the URL the report route redirects to.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamUnavailable`] or [`Error::NotFound`] from the
    /// build and artifact stages.
    pub async fn report(&self, context: &RequestContext,) -> Result<String, Error,>
    {
        let build = self.client.latest_successful_build(&context.identity,).await?;
        let url = self.resolve(context, &build,).await?;
        info!(
            "Report for {}/{} build #{} resolved",
            context.identity.author, context.identity.project, build.number
        );
        Ok(url,)
    }

    async fn load_counters(
        &self,
        context: &RequestContext,
    ) -> Result<(Build, CoverageCounters,), Error,>
    {
        let build = self.client.latest_successful_build(&context.identity,).await?;
        debug!(
            "Latest successful build of {}/{} is #{}",
            context.identity.author, context.identity.project, build.number
        );

        let url = self.resolve(context, &build,).await?;
        let bytes = self.client.fetch_artifact(&context.identity, &url,).await?;
        let counters = report::parse_report(&bytes,)?;
        debug!("Parsed {} report-level counters", counters.len());

        Ok((build, counters,),)
    }

    async fn resolve(&self, context: &RequestContext, build: &Build,) -> Result<String, Error,>
    {
        let target = ArtifactTarget::for_route(
            context.route.strategy,
            &context.route.default_artifact,
            context.artifact_override.as_deref(),
        )?;
        let listing = self.client.artifacts(&context.identity, build,).await?;
        debug!("Build #{} lists {} artifacts, looking for {}", build.number, listing.len(), target.describe());

        artifact::locate_artifact(&listing, &context.identity.project, &target,)
    }
}
