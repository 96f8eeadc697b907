// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Operator HTTP handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::controller::CurrentSnapshot;
use crate::current::LockStatus;
use crate::error::ApiError;
use crate::experience::Experience;
use crate::messaging::protocol::DisplaySettings;
use crate::placard::{PlacardExperience, PlacardUrl};
use crate::screenshot::{self, ScreenshotFormat};
use crate::state::AppContext;

// -- Request/Response types ---------------------------------------------------

/// Catalog entry as the operator API presents it. Grouping membership is
/// resolved at response time so a reload is immediately visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperienceResponse {
    pub id: String,
    pub title: String,
    pub artist: Option<String>,
    pub description: Option<String>,
    pub lifetime: u64,
    pub last_update: u64,
    pub unlisted: bool,
    pub queueable: bool,
    pub folders: Vec<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scrubbing: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentResponse {
    #[serde(flatten)]
    pub experience: ExperienceResponse,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_interaction: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_lock_update: Option<u64>,
    pub lock: LockStatus,
}

#[derive(Debug, Deserialize)]
pub struct SetCurrentBody {
    pub id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetCurrentQuery {
    pub throttle: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCurrentBody {
    pub id: String,
    #[serde(default)]
    pub end_time: Option<u64>,
    #[serde(default)]
    pub last_interaction: Option<u64>,
    #[serde(default)]
    pub lock: Option<LockStatus>,
}

#[derive(Debug, Serialize)]
pub struct OkResponse {
    pub status: &'static str,
}

impl OkResponse {
    fn ok() -> Json<Self> {
        Json(Self { status: "ok" })
    }
}

#[derive(Debug, Deserialize)]
pub struct ScreenshotQuery {
    pub w: Option<u32>,
    pub h: Option<u32>,
    #[serde(default = "default_screenshot_format")]
    pub format: String,
    #[serde(default = "default_screenshot_quality")]
    pub q: u8,
}

fn default_screenshot_format() -> String {
    "jpeg".to_owned()
}

fn default_screenshot_quality() -> u8 {
    95
}

// -- Helpers ------------------------------------------------------------------

async fn experience_response(ctx: &AppContext, experience: &Experience) -> ExperienceResponse {
    let catalog = ctx.controller.catalog().await;
    ExperienceResponse {
        id: experience.id.clone(),
        title: experience.title.clone(),
        artist: experience.artist.clone(),
        description: experience.description.clone(),
        lifetime: experience.lifetime,
        last_update: ctx.controller.last_update(),
        unlisted: experience.unlisted,
        queueable: experience.queueable,
        folders: catalog.folder_map.get(&experience.id).cloned().unwrap_or_default(),
        tags: catalog.tag_map.get(&experience.id).cloned().unwrap_or_default(),
        collection: catalog.collection_map.get(&experience.id).cloned(),
        scrubbing: experience.scrubbing(),
    }
}

async fn current_response(ctx: &AppContext, snapshot: &CurrentSnapshot) -> CurrentResponse {
    CurrentResponse {
        experience: experience_response(ctx, &snapshot.experience).await,
        end_time: snapshot.end_time,
        start_time: Some(snapshot.start_time),
        last_interaction: snapshot.last_interaction,
        last_lock_update: snapshot.lock.last_update,
        lock: snapshot.lock.status,
    }
}

// -- Catalog handlers ---------------------------------------------------------

/// `GET /experiences`
pub async fn experiences(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let ids: Vec<Arc<Experience>> = {
        let catalog = ctx.controller.catalog().await;
        catalog.experiences.values().cloned().collect()
    };

    let mut map = HashMap::with_capacity(ids.len());
    for experience in ids {
        map.insert(experience.id.clone(), experience_response(&ctx, &experience).await);
    }
    Json(map)
}

/// `GET /experiences/{id}`; answers `{}` when unknown.
pub async fn experience(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match ctx.controller.experience(&id).await {
        Some(experience) => {
            Json(experience_response(&ctx, &experience).await).into_response()
        }
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `GET /collections`
pub async fn collections(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    Json(catalog.groupings.collections.clone())
}

/// `GET /collections/{id}`; answers `{}` when unknown.
pub async fn collection(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    match catalog.groupings.collections.get(&id) {
        Some(collection) => Json(collection.clone()).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `GET /tags`
pub async fn tags(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    Json(catalog.groupings.tags.clone())
}

/// `GET /tags/{id}`; answers `{}` when unknown.
pub async fn tag(State(ctx): State<Arc<AppContext>>, Path(id): Path<String>) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    match catalog.groupings.tags.get(&id) {
        Some(tag) => Json(tag.clone()).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `GET /folders`; hidden folders are omitted.
pub async fn folders(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    let visible: HashMap<_, _> = catalog
        .groupings
        .folders
        .iter()
        .filter(|(_, folder)| folder.visible)
        .map(|(id, folder)| (id.clone(), folder.clone()))
        .collect();
    Json(visible)
}

/// `GET /folders/{id}`; answers `{}` when unknown.
pub async fn folder(
    State(ctx): State<Arc<AppContext>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let catalog = ctx.controller.catalog().await;
    match catalog.groupings.folders.get(&id) {
        Some(folder) => Json(folder.clone()).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `GET /reload`: rescan the filesystem.
pub async fn reload(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    ctx.controller.load_from_fs().await;
    OkResponse::ok()
}

// -- Current experience handlers ----------------------------------------------

/// `GET /current`; answers `{}` when nothing is running.
pub async fn current(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    match ctx.controller.current_snapshot().await {
        Some(snapshot) => {
            Json(current_response(&ctx, &snapshot).await).into_response()
        }
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `PUT /current`: replace the current experience. 429 when throttled or
/// mid-transition, 400 on an unknown id.
pub async fn set_current(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<SetCurrentQuery>,
    Json(body): Json<SetCurrentBody>,
) -> impl IntoResponse {
    if let Some(id) = &body.id {
        if ctx.controller.experience(id).await.is_none() {
            return ApiError::BadRequest
                .to_http_response(format!("experience with id '{id}' not registered"))
                .into_response();
        }
    }

    match ctx.controller.set_current(body.id.as_deref(), query.throttle, true).await {
        Ok(true) => OkResponse::ok().into_response(),
        Ok(false) => ApiError::Throttled
            .to_http_response("tried to change current experience while it was changing")
            .into_response(),
        Err(err) => {
            tracing::error!(err = %err, "transition failed");
            ApiError::Internal.to_http_response(format!("transition failed: {err}")).into_response()
        }
    }
}

/// `PATCH /current`: app-driven updates to the current run. 400 when the id
/// doesn't name the current experience.
pub async fn update_current(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<UpdateCurrentBody>,
) -> impl IntoResponse {
    let Some(snapshot) = ctx.controller.current_snapshot().await else {
        return ApiError::BadRequest.to_http_response("no current experience exists").into_response();
    };
    if body.id != snapshot.experience.id {
        return ApiError::BadRequest
            .to_http_response("`id` specified is not current experience")
            .into_response();
    }

    if let Some(at) = body.last_interaction {
        if let Err(err) = ctx.controller.set_last_interaction(&body.id, at).await {
            return err.to_http_response("`id` specified is not current experience").into_response();
        }
    }

    let settings = DisplaySettings { end_time: body.end_time, lock: body.lock };
    match ctx.controller.apply_display_settings(&body.id, settings).await {
        Ok(()) => OkResponse::ok().into_response(),
        Err(err) => err.to_http_response("`id` specified is not current experience").into_response(),
    }
}

// -- Placard passthrough ------------------------------------------------------

/// `GET /placard/experience`
pub async fn placard_experience(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let Some(placard) = ctx.controller.placard() else {
        return Json(serde_json::json!({ "status": "no_placard" })).into_response();
    };
    match placard.experience().await {
        Ok(data) => Json(data).into_response(),
        Err(err) => ApiError::Internal.to_http_response(err.to_string()).into_response(),
    }
}

/// `PATCH /placard/experience`
pub async fn update_placard_experience(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PlacardExperience>,
) -> impl IntoResponse {
    let Some(placard) = ctx.controller.placard() else {
        return Json(serde_json::json!({ "status": "no_placard" })).into_response();
    };
    match placard.set_experience(&body).await {
        Ok(()) => OkResponse::ok().into_response(),
        Err(err) => ApiError::Internal.to_http_response(err.to_string()).into_response(),
    }
}

/// `GET /placard/url`
pub async fn placard_url(State(ctx): State<Arc<AppContext>>) -> impl IntoResponse {
    let Some(placard) = ctx.controller.placard() else {
        return Json(serde_json::json!({ "url": null })).into_response();
    };
    match placard.url().await {
        Ok(url) => Json(url).into_response(),
        Err(err) => ApiError::Internal.to_http_response(err.to_string()).into_response(),
    }
}

/// `PATCH /placard/url`
pub async fn update_placard_url(
    State(ctx): State<Arc<AppContext>>,
    Json(body): Json<PlacardUrl>,
) -> impl IntoResponse {
    let Some(placard) = ctx.controller.placard() else {
        return Json(serde_json::json!({ "status": "no_placard" })).into_response();
    };
    let url = body.url.unwrap_or_default();
    match placard.set_url(&url).await {
        Ok(()) => OkResponse::ok().into_response(),
        Err(err) => ApiError::Internal.to_http_response(err.to_string()).into_response(),
    }
}

// -- Screenshot ---------------------------------------------------------------

/// `GET /screenshot?w=&h=&format=&q=`: the current viewport, fitted and
/// re-encoded.
pub async fn screenshot(
    State(ctx): State<Arc<AppContext>>,
    Query(query): Query<ScreenshotQuery>,
) -> impl IntoResponse {
    let Some(format) = ScreenshotFormat::parse(&query.format) else {
        return ApiError::BadRequest
            .to_http_response(format!("'format' parameter has invalid value '{}'", query.format))
            .into_response();
    };

    match screenshot::capture(&ctx.config.screenshot_cmd, query.w, query.h, query.q, format).await
    {
        Ok(bytes) => (
            [(axum::http::header::CONTENT_TYPE, format.mime_type())],
            bytes,
        )
            .into_response(),
        Err(err) => ApiError::Internal.to_http_response(err.to_string()).into_response(),
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
