use serde::Serialize;

use super::client::ApiClient;
use crate::error::Result;
use crate::models::{AiModel, GoalTemplate, SelectedModel};

#[derive(Debug, Serialize)]
struct SelectModelRequest<'a> {
    model_id: &'a str,
}

impl ApiClient {
    pub async fn goal_templates(&self) -> Result<Vec<GoalTemplate>> {
        self.get_json("/goal-templates", &[]).await
    }

    pub async fn list_models(&self, search: Option<&str>) -> Result<Vec<AiModel>> {
        let query: Vec<(&str, String)> = search
            .filter(|s| !s.is_empty())
            .map(|s| vec![("search", s.to_string())])
            .unwrap_or_default();
        self.get_json("/models", &query).await
    }

    pub async fn selected_model(&self) -> Result<SelectedModel> {
        self.get_json("/models/selected", &[]).await
    }

    pub async fn select_model(&self, model_id: &str) -> Result<()> {
        self.post_unit("/models/select", &SelectModelRequest { model_id }).await
    }
}
