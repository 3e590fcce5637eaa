// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! HTTP surface.
//!
//! One axum route is registered per [`RouteTable`] row. Badge routes always
//! answer with a PNG, report routes with a redirect or a plain-text failure.
//! Each handler owns its [`RequestContext`]; the [`BadgeService`] behind the
//! `Arc` is immutable. When a client disconnects, hyper drops the handler
//! future and any pending upstream call with it.

use std::{future::Future, net::SocketAddr, panic::AssertUnwindSafe, sync::Arc};

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use futures::FutureExt;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::{
    badge::{self, BadgeImage},
    config::RouteConfig,
    error::Error,
    identity::{QueryParams, RequestContext},
    metric::{BadgeKind, BadgeSpec},
    pipeline::BadgeService,
};

type SharedService = Arc<BadgeService,>;
type QueryResult = Result<Query<QueryParams,>, QueryRejection,>;

/// Builds the router for every configured route.
pub fn router(service: SharedService,) -> Router
{
    let mut router = Router::new();
    for route in service.routes().routes.iter().cloned() {
        let path = route.path.clone();
        router = if route.is_report() {
            router.route(
                &path,
                get(move |State(service,): State<SharedService,>, query: QueryResult, headers: HeaderMap| {
                    let route = route.clone();
                    async move { report_handler(service, route, query, headers,).await }
                },),
            )
        } else {
            router.route(
                &path,
                get(move |State(service,): State<SharedService,>, query: QueryResult, headers: HeaderMap| {
                    let route = route.clone();
                    async move { badge_handler(service, route, query, headers,).await }
                },),
            )
        };
    }
    router.with_state(service,)
}

/// Binds `address` and serves until interrupted.
///
/// # Errors
///
/// Returns [`Error::Bind`] when the listener cannot be created or the server
/// stops with an I/O failure.
pub async fn serve(address: SocketAddr, service: BadgeService,) -> Result<(), Error,>
{
    let listener = TcpListener::bind(address,).await.map_err(|source| Error::Bind {
        address: address.to_string(),
        source,
    },)?;
    info!("Badge service listening on {}", address);

    axum::serve(listener, router(Arc::new(service,),),)
        .with_graceful_shutdown(shutdown_signal(),)
        .await
        .map_err(|source| Error::Bind {
            address: address.to_string(),
            source,
        },)
}

async fn shutdown_signal()
{
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}

async fn badge_handler(
    service: SharedService,
    route: RouteConfig,
    query: QueryResult,
    headers: HeaderMap,
) -> Response
{
    let kind = route.kind.badge_kind().unwrap_or(BadgeKind::Line,);
    guarded(async move {
        let context = match request_context(&route, query, &headers,) {
            Ok(context,) => context,
            Err(error,) => return failure_badge(kind, &error,),
        };

        match service.badge(&context,).await {
            Ok(outcome,) => badge_response(status_for(outcome.failure.as_ref(),), &outcome.image,),
            Err(error,) => internal_fault(&error.to_string(),),
        }
    },)
    .await
}

async fn report_handler(
    service: SharedService,
    route: RouteConfig,
    query: QueryResult,
    headers: HeaderMap,
) -> Response
{
    guarded(async move {
        let context = match request_context(&route, query, &headers,) {
            Ok(context,) => context,
            Err(error,) => return report_failure(&error,),
        };

        match service.report(&context,).await {
            Ok(url,) => (StatusCode::FOUND, [(header::LOCATION, url,)],).into_response(),
            Err(error,) => report_failure(&error,),
        }
    },)
    .await
}

fn request_context(
    route: &RouteConfig,
    query: QueryResult,
    headers: &HeaderMap,
) -> Result<RequestContext, Error,>
{
    let referer = headers
        .get(header::REFERER,)
        .and_then(|value| value.to_str().ok(),)
        .unwrap_or("-",);
    let Query(params,) = query.map_err(|rejection| Error::validation(rejection.body_text(),),)?;
    let context = RequestContext::from_query(route, &params,)?;

    info!(
        "{} requested for {}/{} ({}) from {}",
        route.path,
        context.identity.author,
        context.identity.project,
        context.artifact(),
        referer
    );
    Ok(context,)
}

/// Runs `work`, turning a panic into the internal-fault badge.
async fn guarded<F,>(work: F,) -> Response
where
    F: Future<Output = Response,>,
{
    match AssertUnwindSafe(work,).catch_unwind().await {
        Ok(response,) => response,
        Err(_,) => internal_fault("request handler panicked",),
    }
}

/// Status for a badge: 200 for real metrics and content failures, 400 for
/// structural failures, 500 for anything else.
pub fn status_for(failure: Option<&Error,>,) -> StatusCode
{
    match failure {
        None | Some(Error::MetricUnavailable { .. },) => StatusCode::OK,
        Some(error,) if error.is_structural() => StatusCode::BAD_REQUEST,
        Some(_,) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure_badge(kind: BadgeKind, failure: &Error,) -> Response
{
    info!("Rejecting badge request ({}): {}", failure.kind_name(), failure);
    match BadgeImage::render(&BadgeSpec::errored(kind,), None,) {
        Ok(image,) => badge_response(status_for(Some(failure,),), &image,),
        Err(error,) => internal_fault(&error.to_string(),),
    }
}

fn internal_fault(reason: &str,) -> Response
{
    error!("Internal fault while serving badge: {}", reason);
    match BadgeImage::render(&badge::fallback_spec(), None,) {
        Ok(image,) => badge_response(StatusCode::INTERNAL_SERVER_ERROR, &image,),
        Err(_,) => (StatusCode::INTERNAL_SERVER_ERROR, "internal error",).into_response(),
    }
}

fn badge_response(status: StatusCode, image: &BadgeImage,) -> Response
{
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("image/png",),);
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache",),);
    if let Ok(etag,) = HeaderValue::from_str(&image.etag,) {
        headers.insert(header::ETAG, etag,);
    }
    if let Some(last_modified,) =
        image.last_modified_header().and_then(|value| HeaderValue::from_str(&value,).ok(),)
    {
        headers.insert(header::LAST_MODIFIED, last_modified,);
    }
    (status, headers, image.bytes.clone(),).into_response()
}

/// Plain-text body describing why a report could not be located.
pub fn report_failure_text(failure: &Error,) -> String
{
    let status = failure
        .upstream_status()
        .map_or_else(|| "none".to_owned(), |status| status.to_string(),);
    format!("Unable to find report: {} ({failure}), status-code: {status}", failure.kind_name())
}

fn report_failure(failure: &Error,) -> Response
{
    info!("Report lookup failed ({}): {}", failure.kind_name(), failure);
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8",)],
        report_failure_text(failure,),
    )
        .into_response()
}

#[cfg(test)]
mod tests
{
    use reqwest::redirect::Policy;

    use super::*;
    use crate::{
        badge::content_tag,
        config::ServiceSettings,
        metric::ColorBand,
        stub::{StubCircle, StubData},
    };

    const IDENTITY: &str = "author=acme&project=widget&circle-token=t123";

    async fn spawn_service(stub: &StubCircle,) -> String
    {
        spawn_with_settings(&stub.settings(),).await
    }

    async fn spawn_with_settings(settings: &ServiceSettings,) -> String
    {
        let service = BadgeService::new(settings,).expect("service",);
        let listener = TcpListener::bind("127.0.0.1:0",).await.expect("bind service",);
        let origin = format!("http://{}", listener.local_addr().expect("service address"));
        let app = router(Arc::new(service,),);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app,).await;
        },);
        origin
    }

    fn http() -> reqwest::Client
    {
        reqwest::Client::builder().redirect(Policy::none(),).build().expect("client",)
    }

    fn header_value<'a,>(response: &'a reqwest::Response, name: header::HeaderName,) -> Option<&'a str,>
    {
        response.headers().get(name,).and_then(|value| value.to_str().ok(),)
    }

    #[test]
    fn status_mapping_separates_failure_classes()
    {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(status_for(Some(&Error::metric("no counter"))), StatusCode::OK);
        assert_eq!(status_for(Some(&Error::upstream("down", Some(502)))), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Some(&Error::not_found("none"))), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Some(&Error::unparseable("xml"))), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(Some(&Error::render("png"))), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn report_failure_text_names_kind_and_status()
    {
        let text = report_failure_text(&Error::upstream("build lookup returned 404 Not Found", Some(404),),);
        assert!(text.starts_with("Unable to find report: UpstreamUnavailable"));
        assert!(text.ends_with("status-code: 404"));

        let text = report_failure_text(&Error::not_found("no root",),);
        assert!(text.ends_with("status-code: none"));
    }

    #[tokio::test]
    async fn panics_become_internal_fault_badges()
    {
        let response = guarded(async {
            if true {
                panic!("boom");
            }
            StatusCode::OK.into_response()
        },)
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE,).map(HeaderValue::as_bytes),
            Some(&b"image/png"[..])
        );
    }

    #[tokio::test]
    async fn line_badge_end_to_end()
    {
        let stub = StubCircle::start(StubData::coverage,).await;
        let origin = spawn_service(&stub,).await;

        let response = http().get(format!("{origin}/line?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(header_value(&response, header::CONTENT_TYPE), Some("image/png"));
        assert_eq!(header_value(&response, header::CACHE_CONTROL), Some("no-cache"));
        assert_eq!(header_value(&response, header::LAST_MODIFIED), Some("Fri, 04 Mar 2016 05:06:07 GMT"));
        let etag = header_value(&response, header::ETAG,).map(str::to_owned,);

        let body = response.bytes().await.expect("body",);
        let expected =
            badge::render_badge(&BadgeSpec::new(BadgeKind::Line, "80%", ColorBand::Green,),).expect("render",);
        assert_eq!(body.as_ref(), expected.as_slice());
        assert_eq!(etag, Some(content_tag(&body,)));
        assert!(stub.tokens().iter().all(|token| token == "t123"));
    }

    #[tokio::test]
    async fn missing_parameters_answer_bad_request_badge()
    {
        let stub = StubCircle::start(StubData::coverage,).await;
        let origin = spawn_service(&stub,).await;

        let response =
            http().get(format!("{origin}/badge?author=acme&project=widget"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(header_value(&response, header::CONTENT_TYPE), Some("image/png"));
        assert!(stub.tokens().is_empty());
    }

    #[tokio::test]
    async fn upstream_failure_answers_bad_request_error_badge()
    {
        let stub = StubCircle::start(|origin| StubData {
            builds_status: StatusCode::INTERNAL_SERVER_ERROR,
            ..StubData::coverage(origin,)
        },)
        .await;
        let origin = spawn_service(&stub,).await;

        let response = http().get(format!("{origin}/branch?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(header_value(&response, header::LAST_MODIFIED).is_none());
        let body = response.bytes().await.expect("body",);
        let expected = badge::render_badge(&BadgeSpec::errored(BadgeKind::Branch,),).expect("render",);
        assert_eq!(body.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn upstream_timeout_answers_bad_request_error_badge()
    {
        let stub = StubCircle::start(|origin| StubData {
            builds_delay: Some(std::time::Duration::from_secs(3,),),
            ..StubData::coverage(origin,)
        },)
        .await;
        let settings = ServiceSettings {
            timeout: std::time::Duration::from_millis(200,),
            ..stub.settings()
        };
        let origin = spawn_with_settings(&settings,).await;

        let response = http().get(format!("{origin}/line?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(header_value(&response, header::LAST_MODIFIED).is_none());
        let body = response.bytes().await.expect("body",);
        let expected = badge::render_badge(&BadgeSpec::errored(BadgeKind::Line,),).expect("render",);
        assert_eq!(body.as_ref(), expected.as_slice());
        assert!(stub.downloads().is_empty());
    }

    #[tokio::test]
    async fn missing_counter_answers_ok_error_badge()
    {
        let stub = StubCircle::start(|origin| StubData {
            report: Some("<report><counter type=\"INSTRUCTION\" missed=\"0\" covered=\"4\"/></report>".to_owned(),),
            ..StubData::coverage(origin,)
        },)
        .await;
        let origin = spawn_service(&stub,).await;

        let response =
            http().get(format!("{origin}/complexity?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.bytes().await.expect("body",);
        let expected = badge::render_badge(&BadgeSpec::errored(BadgeKind::Complexity,),).expect("render",);
        assert_eq!(body.as_ref(), expected.as_slice());
    }

    #[tokio::test]
    async fn coverage_file_override_is_forwarded()
    {
        let stub = StubCircle::start(StubData::coverage,).await;
        let origin = spawn_service(&stub,).await;

        let response = http()
            .get(format!("{origin}/line?{IDENTITY}&coverage-file=module/jacoco.xml"),)
            .send()
            .await
            .expect("response",);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            stub.downloads(),
            vec!["gh/acme/widget/42/artifacts/0/home/ubuntu/widget/module/jacoco.xml".to_owned()]
        );
    }

    #[tokio::test]
    async fn report_redirects_to_resolved_artifact()
    {
        let stub = StubCircle::start(StubData::coverage,).await;
        let origin = spawn_service(&stub,).await;

        let response = http().get(format!("{origin}/report?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::FOUND);
        let location = header_value(&response, header::LOCATION,).expect("location",);
        assert!(location.ends_with("/home/ubuntu/widget/build/reports/jacoco/test/html/index.html"));
    }

    #[tokio::test]
    async fn report_without_build_answers_plain_text()
    {
        let stub = StubCircle::start(|origin| StubData {
            builds_status: StatusCode::NOT_FOUND,
            ..StubData::coverage(origin,)
        },)
        .await;
        let origin = spawn_service(&stub,).await;

        let response = http().get(format!("{origin}/report?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::OK);
        assert!(header_value(&response, header::LOCATION).is_none());
        let text = response.text().await.expect("text",);
        assert!(text.contains("UpstreamUnavailable"));
        assert!(text.contains("status-code: 404"));
    }

    #[tokio::test]
    async fn unknown_paths_are_not_found()
    {
        let stub = StubCircle::start(StubData::coverage,).await;
        let origin = spawn_service(&stub,).await;

        let response = http().get(format!("{origin}/lines?{IDENTITY}"),).send().await.expect("response",);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
