//! gRPC surface of the auth service.

use tonic::{Request, Response, Status};

use grpc_clients::vget::auth::v1::auth_service_server::AuthService;
use grpc_clients::vget::auth::v1::*;

use crate::services::auth;
use crate::AppState;

pub struct AuthServiceImpl {
    state: AppState,
}

impl AuthServiceImpl {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }
}

#[tonic::async_trait]
impl AuthService for AuthServiceImpl {
    async fn register(
        &self,
        request: Request<RegisterRequest>,
    ) -> Result<Response<RegisterResponse>, Status> {
        let req = request.into_inner();
        if req.email.is_empty() || req.password.is_empty() {
            return Err(Status::invalid_argument("email and password are required"));
        }

        let user = auth::register(&self.state, &req.email, &req.password, &req.nickname)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(RegisterResponse {
            user_id: user.id,
            email: user.email,
            nickname: user.nickname,
        }))
    }

    async fn login(
        &self,
        request: Request<LoginRequest>,
    ) -> Result<Response<LoginResponse>, Status> {
        let req = request.into_inner();
        let (pair, user) = auth::login(
            &self.state,
            &req.email,
            &req.password,
            &req.device_info,
            &req.ip_address,
        )
        .await
        .map_err(Status::from)?;

        Ok(Response::new(LoginResponse {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            expires_in: pair.expires_in,
            user_id: user.id,
            email: user.email,
            nickname: user.nickname,
            role: user.role,
        }))
    }

    async fn verify_token(
        &self,
        request: Request<VerifyTokenRequest>,
    ) -> Result<Response<VerifyTokenResponse>, Status> {
        let req = request.into_inner();

        // Invalid tokens are a negative result, not an RPC error.
        match auth::verify_token(&self.state, &req.token).await {
            Ok(claims) => Ok(Response::new(VerifyTokenResponse {
                valid: true,
                user_id: claims.sub,
                email: claims.email,
                role: claims.role,
            })),
            Err(_) => Ok(Response::new(VerifyTokenResponse {
                valid: false,
                user_id: String::new(),
                email: String::new(),
                role: String::new(),
            })),
        }
    }

    async fn refresh_token(
        &self,
        request: Request<RefreshTokenRequest>,
    ) -> Result<Response<RefreshTokenResponse>, Status> {
        let req = request.into_inner();
        let (access_token, expires_in) = auth::refresh(&self.state, &req.refresh_token)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(RefreshTokenResponse {
            access_token,
            expires_in,
        }))
    }

    async fn logout(
        &self,
        request: Request<LogoutRequest>,
    ) -> Result<Response<LogoutResponse>, Status> {
        let req = request.into_inner();
        auth::logout(&self.state, &req.token)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(LogoutResponse { success: true }))
    }

    async fn get_user_info(
        &self,
        request: Request<GetUserInfoRequest>,
    ) -> Result<Response<GetUserInfoResponse>, Status> {
        let req = request.into_inner();
        let user = auth::get_user(&self.state, &req.user_id)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(GetUserInfoResponse {
            user_id: user.id,
            email: user.email,
            nickname: user.nickname,
            role: user.role,
            status: user.status,
            created_at: user.created_at.to_rfc3339(),
        }))
    }

    async fn update_profile(
        &self,
        request: Request<UpdateProfileRequest>,
    ) -> Result<Response<UpdateProfileResponse>, Status> {
        let req = request.into_inner();
        let user = auth::update_profile(&self.state, &req.user_id, &req.nickname)
            .await
            .map_err(Status::from)?;

        Ok(Response::new(UpdateProfileResponse {
            user_id: user.id,
            nickname: user.nickname,
        }))
    }

    async fn change_password(
        &self,
        request: Request<ChangePasswordRequest>,
    ) -> Result<Response<ChangePasswordResponse>, Status> {
        let req = request.into_inner();
        auth::change_password(&self.state, &req.user_id, &req.old_password, &req.new_password)
            .await
            .map_err(Status::from)?;
        Ok(Response::new(ChangePasswordResponse { success: true }))
    }
}
