// SPDX-FileCopyrightText: 2025 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! In-process CircleCI double for tests.
//!
//! Serves the v1 build, artifact-listing and artifact-download endpoints on an
//! ephemeral local port with canned responses, and records the tokens it
//! received.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde_json::{Value, json};
use tokio::net::TcpListener;

use crate::config::ServiceSettings;

pub(crate) const REPORT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<report name="widget">
  <sessioninfo id="ci" start="1" dump="2"/>
  <counter type="INSTRUCTION" missed="20" covered="80"/>
  <counter type="BRANCH" missed="1" covered="3"/>
  <counter type="COMPLEXITY" missed="6" covered="8"/>
  <counter type="METHOD" missed="0" covered="2"/>
</report>"#;

/// Canned upstream responses.
#[derive(Clone,)]
pub(crate) struct StubData
{
    pub builds_status: StatusCode,
    /// Holds the build lookup response back for this long.
    pub builds_delay:  Option<Duration,>,
    pub builds:        Value,
    pub artifacts:     Value,
    pub report:        Option<String,>,
}

impl StubData
{
    /// Build 42 of acme/widget with a root-prefixed listing and a report
    /// holding 80/20 instruction coverage.
    pub fn coverage(origin: &str,) -> Self
    {
        let root = format!("{origin}/files/gh/acme/widget/42/artifacts/0/home/ubuntu/");
        Self {
            builds_status: StatusCode::OK,
            builds_delay:  None,
            builds:        json!([{
                "build_num": 42,
                "stop_time": "2016-03-04T05:06:07.000Z",
                "status": "success"
            }]),
            artifacts:     json!([
                {
                    "path": "home/ubuntu/widget/build/libs/widget.jar",
                    "url": format!("{root}widget/build/libs/widget.jar"),
                    "node_index": 0
                },
                {
                    "path": "home/ubuntu/widget/build/reports/jacoco/test/jacocoTestReport.xml",
                    "url": format!("{root}widget/build/reports/jacoco/test/jacocoTestReport.xml"),
                    "node_index": 0
                }
            ]),
            report:        Some(REPORT_XML.to_owned(),),
        }
    }
}

#[derive(Default,)]
struct Recorded
{
    tokens:      Vec<String,>,
    build_query: Option<(String, String,),>,
    downloads:   Vec<String,>,
}

struct StubState
{
    data:     StubData,
    recorded: Mutex<Recorded,>,
}

/// Running stub server.
pub(crate) struct StubCircle
{
    pub origin: String,
    state:      Arc<StubState,>,
}

impl StubCircle
{
    /// Binds an ephemeral port and serves the data produced by `build`,
    /// which receives the stub's own origin for composing artifact URLs.
    pub async fn start<F,>(build: F,) -> Self
    where
        F: FnOnce(&str,) -> StubData,
    {
        let listener = TcpListener::bind("127.0.0.1:0",).await.expect("bind stub listener",);
        let origin = format!("http://{}", listener.local_addr().expect("stub address"));
        let state = Arc::new(StubState {
            data:     build(&origin,),
            recorded: Mutex::new(Recorded::default(),),
        },);

        let app = Router::new()
            .route("/api/v1/project/:author/:project/:first/:second", get(project_endpoint,),)
            .route("/files/*path", get(download,),)
            .with_state(state.clone(),);
        tokio::spawn(async move {
            let _ = axum::serve(listener, app,).await;
        },);

        Self {
            origin,
            state,
        }
    }

    /// Service settings pointing at this stub.
    pub fn settings(&self,) -> ServiceSettings
    {
        ServiceSettings {
            circle_url: format!("{}/api/v1/project", self.origin),
            timeout: Duration::from_secs(5,),
            ..ServiceSettings::default()
        }
    }

    pub fn tokens(&self,) -> Vec<String,>
    {
        self.state.recorded.lock().expect("stub lock",).tokens.clone()
    }

    pub fn last_build_query(&self,) -> Option<(String, String,),>
    {
        self.state.recorded.lock().expect("stub lock",).build_query.clone()
    }

    pub fn downloads(&self,) -> Vec<String,>
    {
        self.state.recorded.lock().expect("stub lock",).downloads.clone()
    }
}

async fn project_endpoint(
    State(state,): State<Arc<StubState,>,>,
    Path((_author, _project, first, second,),): Path<(String, String, String, String,),>,
    Query(query,): Query<HashMap<String, String,>,>,
) -> Response
{
    {
        let mut recorded = state.recorded.lock().expect("stub lock",);
        if let Some(token,) = query.get("circle-token",) {
            recorded.tokens.push(token.clone(),);
        }
        if first == "tree" {
            recorded.build_query = Some((
                query.get("limit",).cloned().unwrap_or_default(),
                query.get("filter",).cloned().unwrap_or_default(),
            ),);
        }
    }

    if first == "tree" {
        if let Some(delay,) = state.data.builds_delay {
            tokio::time::sleep(delay,).await;
        }
        (state.data.builds_status, Json(state.data.builds.clone(),),).into_response()
    } else if second == "artifacts" {
        Json(state.data.artifacts.clone(),).into_response()
    } else {
        StatusCode::NOT_FOUND.into_response()
    }
}

async fn download(
    State(state,): State<Arc<StubState,>,>,
    Path(path,): Path<String,>,
    Query(query,): Query<HashMap<String, String,>,>,
) -> Response
{
    {
        let mut recorded = state.recorded.lock().expect("stub lock",);
        if let Some(token,) = query.get("circle-token",) {
            recorded.tokens.push(token.clone(),);
        }
        recorded.downloads.push(path,);
    }

    match state.data.report.clone() {
        Some(report,) => report.into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
