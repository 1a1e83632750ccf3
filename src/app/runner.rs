use std::sync::Arc;

use anyhow::Context as _;
use chrono::Utc;

use crate::pipeline::{ExportSummary, Pipeline, Plan};
use crate::project::ProjectId;
use crate::store::{ExportRecord, ExportState, ProjectStore};

/// Drives one export and mirrors its progress into the project store.
pub struct ExportRunner {
    pipeline: Pipeline,
    store: Arc<dyn ProjectStore>,
}

impl ExportRunner {
    pub fn new(pipeline: Pipeline, store: Arc<dyn ProjectStore>) -> Self {
        Self { pipeline, store }
    }

    pub async fn mark_queued(&self, project: &ProjectId, template_id: &str) -> anyhow::Result<()> {
        self.mark(project, template_id, ExportState::Queued, None)
            .await
            .context("mark queued")
    }

    pub async fn run_export(&self, project: &ProjectId, template_id: &str, plan: Plan) {
        match self.try_run_export(project, template_id, plan).await {
            Ok(summary) => {
                tracing::info!(project = %project, zip = %summary.zip_path.display(), "export job done");
            }
            Err(err) => {
                tracing::error!(project = %project, ?err, "export job failed");
                let _ = self
                    .mark(project, template_id, ExportState::Failed, Some(format!("{err:#}")))
                    .await;
            }
        }
    }

    async fn try_run_export(
        &self,
        project: &ProjectId,
        template_id: &str,
        plan: Plan,
    ) -> anyhow::Result<ExportSummary> {
        self.mark(project, template_id, ExportState::Running, None)
            .await
            .context("mark running")?;

        let summary = self
            .pipeline
            .export(project, template_id, plan)
            .await
            .context("export")?;

        self.mark(project, &summary.template_id, ExportState::Succeeded, None)
            .await
            .context("mark succeeded")?;
        Ok(summary)
    }

    async fn mark(
        &self,
        project: &ProjectId,
        template_id: &str,
        state: ExportState,
        error: Option<String>,
    ) -> anyhow::Result<()> {
        self.store
            .record_export(
                project,
                ExportRecord {
                    state,
                    template_id: template_id.to_owned(),
                    error,
                    updated_at: Utc::now(),
                },
            )
            .await
    }
}
