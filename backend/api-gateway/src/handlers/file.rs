//! Artifact streaming.

use actix_files::NamedFile;
use actix_web::http::header::{ContentDisposition, DispositionParam, DispositionType};
use actix_web::{web, HttpRequest, HttpResponse};
use serde::Deserialize;

use grpc_clients::vget::asset::v1::GetFileInfoRequest;

use crate::error::GatewayError;
use crate::handlers::with_deadline;
use crate::middleware::auth::authenticated_user;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct FileQuery {
    pub history_id: i64,
}

/// Stream a finished artifact as an attachment. `NamedFile` provides
/// the `Accept-Ranges: bytes` handling for resumable downloads.
pub async fn download_file(
    state: web::Data<AppState>,
    req: HttpRequest,
    query: web::Query<FileQuery>,
) -> Result<HttpResponse, GatewayError> {
    let user = authenticated_user(&req)?;

    let mut asset = state.clients.asset.clone();
    let info = with_deadline(
        state.config.grpc.timeout_secs,
        "asset",
        asset.get_file_info(GetFileInfoRequest {
            history_id: query.history_id,
            user_id: user.user_id,
        }),
    )
    .await?;

    if info.file_path.is_empty() {
        return Err(GatewayError::not_found("file not found"));
    }

    let file = NamedFile::open_async(&info.file_path)
        .await
        .map_err(|_| GatewayError::not_found("file not found on disk"))?
        .set_content_type(mime::APPLICATION_OCTET_STREAM)
        .set_content_disposition(ContentDisposition {
            disposition: DispositionType::Attachment,
            parameters: vec![DispositionParam::Filename(info.file_name.clone())],
        });

    Ok(file.into_response(&req))
}
