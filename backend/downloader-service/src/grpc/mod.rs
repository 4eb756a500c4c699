//! Worker-side task inspection RPC.

use tonic::{Request, Response, Status};

use grpc_clients::vget::downloader::v1::downloader_service_server::DownloaderService;
use grpc_clients::vget::downloader::v1::*;

use crate::db::download_repo;

pub struct DownloaderServiceImpl {
    db: sqlx::PgPool,
}

impl DownloaderServiceImpl {
    pub fn new(db: sqlx::PgPool) -> Self {
        Self { db }
    }
}

#[tonic::async_trait]
impl DownloaderService for DownloaderServiceImpl {
    async fn get_task_status(
        &self,
        request: Request<GetTaskStatusRequest>,
    ) -> Result<Response<GetTaskStatusResponse>, Status> {
        let req = request.into_inner();
        if req.task_id.is_empty() {
            return Err(Status::invalid_argument("task_id is required"));
        }

        let record = download_repo::find_by_task_id(&self.db, &req.task_id)
            .await
            .map_err(|e| Status::internal(e.to_string()))?
            .ok_or_else(|| Status::not_found("task not found"))?;

        Ok(Response::new(GetTaskStatusResponse {
            task_id: record.task_id,
            status: record.status,
            file_name: record.file_name.unwrap_or_default(),
            file_size: record.file_size.unwrap_or(0),
            error_message: record.error_message.unwrap_or_default(),
            started_at: record
                .started_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            completed_at: record
                .completed_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
        }))
    }
}
