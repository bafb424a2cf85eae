use serde::Serialize;
use tracing::info;

use super::client::ApiClient;
use crate::error::Result;
use crate::models::{
    AiConfig, AiConfigTest, AiConfigUpdate, AiTestResult, LoginResponse, SystemSettings, SystemStats,
    UpdateSettingsRequest, User, UserPage,
};

#[derive(Debug, Serialize)]
struct GoogleLoginRequest<'a> {
    credential: &'a str,
}

impl ApiClient {
    /// Exchange a Google ID token for an API token and keep it for later calls.
    pub async fn login_with_google(&self, credential: &str) -> Result<LoginResponse> {
        let login: LoginResponse = self
            .post_json("/auth/google", &[], Some(&GoogleLoginRequest { credential }))
            .await?;
        self.set_token(Some(login.access_token.clone()));
        info!("Logged in as {}", login.user.email);
        Ok(login)
    }

    pub async fn current_user(&self) -> Result<User> {
        self.get_json("/users/me", &[]).await
    }

    pub async fn ai_config(&self) -> Result<AiConfig> {
        self.get_json("/users/me/ai-config", &[]).await
    }

    pub async fn update_ai_config(&self, data: &AiConfigUpdate) -> Result<()> {
        self.patch_unit("/users/me/ai-config", data).await
    }

    pub async fn delete_ai_config(&self) -> Result<()> {
        self.delete_unit("/users/me/ai-config").await
    }

    pub async fn test_ai_config(&self, data: &AiConfigTest) -> Result<AiTestResult> {
        self.post_json("/users/me/ai-config/test", &[], Some(data)).await
    }

    pub async fn admin_settings(&self) -> Result<SystemSettings> {
        self.get_json("/admin/settings", &[]).await
    }

    pub async fn update_admin_settings(&self, data: &UpdateSettingsRequest) -> Result<SystemSettings> {
        self.patch_json("/admin/settings", data).await
    }

    pub async fn admin_stats(&self) -> Result<SystemStats> {
        self.get_json("/admin/stats", &[]).await
    }

    pub async fn admin_users(&self, limit: u32, skip: u32) -> Result<UserPage> {
        self.get_json(
            "/admin/users",
            &[("limit", limit.to_string()), ("skip", skip.to_string())],
        )
        .await
    }
}
