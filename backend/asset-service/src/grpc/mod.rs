//! gRPC surface of the resource pool.

use chrono::{DateTime, Utc};
use tonic::{Request, Response, Status};

use grpc_clients::vget::asset::v1::asset_service_server::AssetService;
use grpc_clients::vget::asset::v1::*;

use crate::models::HistoryFilter;
use crate::services::{cookie, history, proxy, quota};
use crate::AppState;

pub struct AssetServiceImpl {
    state: AppState,
}

impl AssetServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

fn rfc3339(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.to_rfc3339()).unwrap_or_default()
}

fn parse_rfc3339(raw: &str, field: &str) -> Result<Option<DateTime<Utc>>, Status> {
    if raw.is_empty() {
        return Ok(None);
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|t| Some(t.with_timezone(&Utc)))
        .map_err(|e| Status::invalid_argument(format!("invalid {field}: {e}")))
}

fn opt(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[tonic::async_trait]
impl AssetService for AssetServiceImpl {
    // ---- Quota ----

    async fn check_quota(
        &self,
        request: Request<CheckQuotaRequest>,
    ) -> Result<Response<CheckQuotaResponse>, Status> {
        let req = request.into_inner();
        if req.user_id.is_empty() {
            return Err(Status::invalid_argument("user_id is required"));
        }

        let q = quota::check(&self.state.db, &self.state.config.quota, &req.user_id, &req.role)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(CheckQuotaResponse {
            daily_limit: q.daily_limit,
            daily_used: q.daily_used,
            remaining: q.remaining(),
            reset_at: q.reset_at.to_rfc3339(),
        }))
    }

    async fn consume_quota(
        &self,
        request: Request<ConsumeQuotaRequest>,
    ) -> Result<Response<ConsumeQuotaResponse>, Status> {
        let req = request.into_inner();
        if req.user_id.is_empty() {
            return Err(Status::invalid_argument("user_id is required"));
        }

        let q = quota::consume(&self.state.db, &self.state.config.quota, &req.user_id, &req.role)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(ConsumeQuotaResponse {
            daily_limit: q.daily_limit,
            daily_used: q.daily_used,
            remaining: q.remaining(),
        }))
    }

    // ---- History ----

    async fn create_history(
        &self,
        request: Request<CreateHistoryRequest>,
    ) -> Result<Response<CreateHistoryResponse>, Status> {
        let req = request.into_inner();
        let history_id = history::create(
            &self.state.db,
            &req.user_id,
            &req.task_id,
            &req.url,
            &req.platform,
            &req.title,
            &req.mode,
            &req.quality,
        )
        .await
        .map_err(Status::from)?;

        Ok(Response::new(CreateHistoryResponse { history_id }))
    }

    async fn get_history(
        &self,
        request: Request<GetHistoryRequest>,
    ) -> Result<Response<GetHistoryResponse>, Status> {
        let req = request.into_inner();
        let pagination = &self.state.config.pagination;
        let page = req.page.max(1);
        let page_size = if req.page_size < 1 {
            pagination.default_page_size
        } else {
            req.page_size.min(pagination.max_page_size)
        };
        let filter = HistoryFilter {
            user_id: req.user_id,
            status: opt(&req.status).map(String::from),
            platform: opt(&req.platform).map(String::from),
            page,
            page_size,
            sort_by: req.sort_by,
            sort_order: req.sort_order,
        };
        let (total, rows) = history::query(&self.state.db, pagination, filter)
            .await
            .map_err(Status::from)?;

        let items = rows
            .into_iter()
            .map(|r| HistoryItem {
                id: r.id,
                task_id: r.task_id,
                url: r.url,
                platform: r.platform,
                title: r.title,
                mode: r.mode,
                quality: r.quality,
                file_size: r.file_size.unwrap_or(0),
                file_name: r.file_name.unwrap_or_default(),
                file_hash: r.file_hash.unwrap_or_default(),
                status: r.status,
                error_message: r.error_message.unwrap_or_default(),
                created_at: r.created_at.to_rfc3339(),
                completed_at: rfc3339(r.completed_at),
            })
            .collect();

        Ok(Response::new(GetHistoryResponse {
            total,
            page,
            page_size,
            items,
        }))
    }

    async fn delete_history(
        &self,
        request: Request<DeleteHistoryRequest>,
    ) -> Result<Response<DeleteHistoryResponse>, Status> {
        let req = request.into_inner();
        history::delete(&self.state.db, req.history_id, &req.user_id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteHistoryResponse { success: true }))
    }

    async fn get_user_stats(
        &self,
        request: Request<GetUserStatsRequest>,
    ) -> Result<Response<GetUserStatsResponse>, Status> {
        let req = request.into_inner();
        let stats = history::user_stats(&self.state.db, &req.user_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(GetUserStatsResponse {
            total_downloads: stats.total_downloads,
            completed: stats.completed,
            failed: stats.failed,
            total_bytes: stats.total_bytes,
            top_platforms: stats
                .top_platforms
                .into_iter()
                .map(|(platform, count)| PlatformStat { platform, count })
                .collect(),
            daily_activity: stats
                .daily_activity
                .into_iter()
                .map(|(date, count)| DailyActivity {
                    date: date.format("%Y-%m-%d").to_string(),
                    count,
                })
                .collect(),
        }))
    }

    async fn get_file_info(
        &self,
        request: Request<GetFileInfoRequest>,
    ) -> Result<Response<GetFileInfoResponse>, Status> {
        let req = request.into_inner();
        let row = history::file_info(&self.state.db, req.history_id, &req.user_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(GetFileInfoResponse {
            file_path: row.file_path.unwrap_or_default(),
            file_name: row.file_name.unwrap_or_default(),
            file_size: row.file_size.unwrap_or(0),
            status: row.status,
        }))
    }

    // ---- Cookies ----

    async fn get_available_cookie(
        &self,
        request: Request<GetAvailableCookieRequest>,
    ) -> Result<Response<GetAvailableCookieResponse>, Status> {
        let req = request.into_inner();
        let cookie = cookie::checkout(&self.state.db, &req.platform)
            .await
            .map_err(Status::from)?;

        // No cookie is a normal outcome, reported as zero id.
        let response = match cookie {
            Some(c) => GetAvailableCookieResponse {
                cookie_id: c.id,
                content: c.content,
            },
            None => GetAvailableCookieResponse {
                cookie_id: 0,
                content: String::new(),
            },
        };
        Ok(Response::new(response))
    }

    async fn get_cookie_content(
        &self,
        request: Request<GetCookieContentRequest>,
    ) -> Result<Response<GetCookieContentResponse>, Status> {
        let req = request.into_inner();
        let content = cookie::content(&self.state.db, req.cookie_id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(GetCookieContentResponse { content }))
    }

    async fn report_cookie_usage(
        &self,
        request: Request<ReportCookieUsageRequest>,
    ) -> Result<Response<ReportCookieUsageResponse>, Status> {
        let req = request.into_inner();
        cookie::report_usage(&self.state.db, req.cookie_id, req.success)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(ReportCookieUsageResponse { success: true }))
    }

    async fn freeze_cookie(
        &self,
        request: Request<FreezeCookieRequest>,
    ) -> Result<Response<FreezeCookieResponse>, Status> {
        let req = request.into_inner();
        let frozen_until = cookie::freeze(&self.state.db, req.cookie_id, req.freeze_seconds)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(FreezeCookieResponse {
            frozen_until: frozen_until.to_rfc3339(),
        }))
    }

    async fn create_cookie(
        &self,
        request: Request<CreateCookieRequest>,
    ) -> Result<Response<CreateCookieResponse>, Status> {
        let req = request.into_inner();
        let expire_at = parse_rfc3339(&req.expire_at, "expire_at")?;
        let cookie_id = cookie::create(
            &self.state.db,
            &req.platform,
            &req.name,
            &req.content,
            expire_at,
            req.freeze_seconds,
        )
        .await
        .map_err(Status::from)?;
        Ok(Response::new(CreateCookieResponse { cookie_id }))
    }

    async fn list_cookies(
        &self,
        request: Request<ListCookiesRequest>,
    ) -> Result<Response<ListCookiesResponse>, Status> {
        let req = request.into_inner();
        let (total, items) = cookie::list(
            &self.state.db,
            opt(&req.platform),
            opt(&req.status),
            req.page,
            req.page_size.max(1),
            self.state.config.pagination.max_page_size,
        )
        .await
        .map_err(Status::from)?;

        let now = Utc::now();
        let items = items
            .into_iter()
            .map(|c| CookieItem {
                id: c.id,
                platform: c.platform.clone(),
                name: c.name.clone(),
                status: c.effective_status(now).as_str().to_string(),
                expire_at: rfc3339(c.expire_at),
                frozen_until: rfc3339(c.frozen_until),
                freeze_seconds: c.freeze_seconds,
                use_count: c.use_count,
                success_count: c.success_count,
                fail_count: c.fail_count,
                last_used_at: rfc3339(c.last_used_at),
            })
            .collect();

        Ok(Response::new(ListCookiesResponse { total, items }))
    }

    async fn delete_cookie(
        &self,
        request: Request<DeleteCookieRequest>,
    ) -> Result<Response<DeleteCookieResponse>, Status> {
        let req = request.into_inner();
        cookie::delete(&self.state.db, req.cookie_id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteCookieResponse { success: true }))
    }

    // ---- Proxies ----

    async fn get_available_proxy(
        &self,
        request: Request<GetAvailableProxyRequest>,
    ) -> Result<Response<GetAvailableProxyResponse>, Status> {
        let req = request.into_inner();
        let proxy = proxy::checkout(&self.state.db, opt(&req.protocol), opt(&req.region))
            .await
            .map_err(Status::from)?;

        let response = match proxy {
            Some(p) => GetAvailableProxyResponse {
                proxy_id: p.id,
                proxy_url: p.url(),
            },
            None => GetAvailableProxyResponse {
                proxy_id: 0,
                proxy_url: String::new(),
            },
        };
        Ok(Response::new(response))
    }

    async fn report_proxy_usage(
        &self,
        request: Request<ReportProxyUsageRequest>,
    ) -> Result<Response<ReportProxyUsageResponse>, Status> {
        let req = request.into_inner();
        proxy::report_usage(&self.state.db, req.proxy_id, req.success)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(ReportProxyUsageResponse { success: true }))
    }

    async fn check_proxy_health(
        &self,
        request: Request<CheckProxyHealthRequest>,
    ) -> Result<Response<CheckProxyHealthResponse>, Status> {
        let req = request.into_inner();
        let (healthy, latency_ms, message) =
            proxy::check_health(&self.state.db, &self.state.config.proxy, req.proxy_id)
                .await
                .map_err(Status::from)?;

        Ok(Response::new(CheckProxyHealthResponse {
            healthy,
            latency_ms,
            message,
        }))
    }

    async fn create_proxy(
        &self,
        request: Request<CreateProxyRequest>,
    ) -> Result<Response<CreateProxyResponse>, Status> {
        let req = request.into_inner();
        let (proxy_id, health_check_passed, health_check_error) = proxy::create(
            &self.state.db,
            &self.state.config.proxy,
            &req.host,
            req.port,
            &req.username,
            &req.password,
            &req.protocol,
            &req.region,
            req.check_health,
        )
        .await
        .map_err(Status::from)?;

        Ok(Response::new(CreateProxyResponse {
            proxy_id,
            health_check_passed,
            health_check_error,
        }))
    }

    async fn list_proxies(
        &self,
        request: Request<ListProxiesRequest>,
    ) -> Result<Response<ListProxiesResponse>, Status> {
        let req = request.into_inner();
        let (total, items) = proxy::list(
            &self.state.db,
            opt(&req.status),
            opt(&req.protocol),
            opt(&req.region),
            req.page,
            req.page_size.max(1),
            self.state.config.pagination.max_page_size,
        )
        .await
        .map_err(Status::from)?;

        let items = items
            .into_iter()
            .map(|p| ProxyItem {
                id: p.id,
                host: p.host.clone(),
                port: p.port,
                protocol: p.protocol.clone(),
                region: p.region.clone(),
                status: p.status.clone(),
                last_check_at: rfc3339(p.last_check_at),
                last_check_result: p.last_check_result.clone().unwrap_or_default(),
                success_count: p.success_count,
                fail_count: p.fail_count,
                last_used_at: rfc3339(p.last_used_at),
            })
            .collect();

        Ok(Response::new(ListProxiesResponse { total, items }))
    }

    async fn delete_proxy(
        &self,
        request: Request<DeleteProxyRequest>,
    ) -> Result<Response<DeleteProxyResponse>, Status> {
        let req = request.into_inner();
        proxy::delete(&self.state.db, req.proxy_id)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(DeleteProxyResponse { success: true }))
    }
}
