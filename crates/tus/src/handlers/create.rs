use std::sync::Arc;

use salvo_core::http::{HeaderValue, StatusCode};
use salvo_core::{Depot, Request, Response, Router, handler};

use crate::engine::{CreateRequest, TusEngine};
use crate::error::TusError;
use crate::handlers::apply_common_headers;
use crate::metadata::UploadMetadata;
use crate::utils::{check_tus_version, parse_u64};
use crate::{H_TUS_RESUMABLE, H_UPLOAD_LENGTH, H_UPLOAD_METADATA, H_UPLOAD_OFFSET};

fn absolute_url(req: &Request, path: &str) -> String {
    let scheme = req.scheme().as_str();
    let host = req
        .headers()
        .get("host")
        .and_then(|v| v.to_str().ok())
        .or_else(|| req.uri().authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}{path}")
}

/// CREATE (POST on the collection root, §4.D).
#[handler]
async fn create(req: &mut Request, depot: &mut Depot, res: &mut Response) {
    let engine = depot.obtain::<Arc<TusEngine>>().expect("missing tus engine");
    apply_common_headers(&mut res.headers);

    if let Err(e) = check_tus_version(
        req.headers()
            .get(H_TUS_RESUMABLE)
            .and_then(|v| v.to_str().ok()),
    ) {
        res.status_code = Some(TusError::Protocol(e).status());
        return;
    }

    let total_size = match parse_u64(
        req.headers()
            .get(H_UPLOAD_LENGTH)
            .and_then(|v| v.to_str().ok()),
        H_UPLOAD_LENGTH,
    ) {
        Ok(size) => size,
        Err(e) => {
            res.status_code = Some(TusError::Protocol(e).status());
            return;
        }
    };

    let metadata = req
        .headers()
        .get(H_UPLOAD_METADATA)
        .and_then(|v| v.to_str().ok())
        .map(UploadMetadata::parse)
        .unwrap_or_default();

    let create_req = CreateRequest {
        total_size,
        file_name: metadata.filename().map(str::to_string),
        expected_checksum: metadata.checksum().map(str::to_string),
    };

    let info = match engine.create(create_req).await {
        Ok(info) => info,
        Err(e) => {
            res.status_code = Some(e.status());
            return;
        }
    };

    let url = absolute_url(req, &info.upload_uri);

    res.status_code = Some(StatusCode::CREATED);
    res.headers
        .insert("Location", HeaderValue::from_str(&url).unwrap_or_else(|_| HeaderValue::from_static("")));
    res.headers
        .insert(H_UPLOAD_OFFSET, HeaderValue::from_static("0"));
}

pub(crate) fn create_handler() -> Router {
    Router::new().post(create)
}
