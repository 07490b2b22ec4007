use std::sync::Arc;

use salvo_core::http::StatusCode;
use salvo_core::writer::Json;
use salvo_core::{Depot, Request, Response, Router, handler};
use serde::Serialize;

use crate::engine::TusEngine;
use crate::metadata_store::FileInfo;

/// Projection returned by the progress API (§4, internal management surface).
#[derive(Serialize)]
struct ProgressView {
    upload_uri: String,
    file_name: String,
    total_size: u64,
    offset: u64,
    status: &'static str,
    object_key: Option<String>,
    checksum_verified: bool,
    callback_sent: bool,
    percent: f64,
}

impl From<&FileInfo> for ProgressView {
    fn from(info: &FileInfo) -> Self {
        Self {
            upload_uri: info.upload_uri.clone(),
            file_name: info.file_name.clone(),
            total_size: info.total_size,
            offset: info.offset,
            status: info.status.as_str(),
            object_key: info.object_key.clone(),
            checksum_verified: info.checksum_verified,
            callback_sent: info.callback_sent,
            percent: info.percent(),
        }
    }
}

/// `GET /api/progress/<uri>`.
#[handler]
async fn progress_one(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    let Some(id) = req.param::<String>("id") else {
        res.status_code = Some(StatusCode::BAD_REQUEST);
        return;
    };
    let uri = format!("/files/{id}");

    match engine.inspect(&uri).await {
        Ok(info) => res.render(Json(ProgressView::from(&info))),
        Err(e) => res.status_code = Some(e.status()),
    }
}

/// `GET /api/progress/list`.
#[handler]
async fn progress_list(_req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    match engine.progress_list().await {
        Ok(all) => {
            let views: Vec<ProgressView> = all.iter().map(ProgressView::from).collect();
            res.render(Json(views));
        }
        Err(e) => res.status_code = Some(e.status()),
    }
}

pub(crate) fn progress_handler() -> Router {
    Router::with_path("api/progress")
        .push(Router::with_path("list").get(progress_list))
        .push(Router::with_path("{id}").get(progress_one))
}
