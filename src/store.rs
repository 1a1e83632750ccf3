use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;

use crate::project::ProjectId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadRecord {
    pub file_name: String,
    pub file_size: u64,
    pub saved_path: PathBuf,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSelection {
    pub template_id: String,
    pub selected_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportRecord {
    pub state: ExportState,
    pub template_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Per-project facts the HTTP host remembers between requests. Recording
/// always replaces the previous value for the project.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    async fn record_upload(&self, project: &ProjectId, upload: UploadRecord) -> anyhow::Result<()>;
    async fn upload(&self, project: &ProjectId) -> anyhow::Result<Option<UploadRecord>>;
    async fn select_template(
        &self,
        project: &ProjectId,
        selection: TemplateSelection,
    ) -> anyhow::Result<()>;
    async fn template(&self, project: &ProjectId) -> anyhow::Result<Option<TemplateSelection>>;
    async fn record_export(&self, project: &ProjectId, export: ExportRecord) -> anyhow::Result<()>;
    async fn export(&self, project: &ProjectId) -> anyhow::Result<Option<ExportRecord>>;
}

#[derive(Debug, Default, Clone)]
struct ProjectEntry {
    upload: Option<UploadRecord>,
    template: Option<TemplateSelection>,
    export: Option<ExportRecord>,
}

/// Process-local store; everything is forgotten on restart.
#[derive(Debug, Default)]
pub struct InMemoryProjectStore {
    projects: RwLock<HashMap<ProjectId, ProjectEntry>>,
}

impl InMemoryProjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn read<T>(&self, project: &ProjectId, f: impl FnOnce(&ProjectEntry) -> Option<T>) -> Option<T> {
        self.projects.read().await.get(project).and_then(f)
    }

    async fn write(&self, project: &ProjectId, f: impl FnOnce(&mut ProjectEntry)) {
        let mut projects = self.projects.write().await;
        f(projects.entry(project.clone()).or_default());
    }
}

#[async_trait]
impl ProjectStore for InMemoryProjectStore {
    async fn record_upload(&self, project: &ProjectId, upload: UploadRecord) -> anyhow::Result<()> {
        self.write(project, |e| e.upload = Some(upload)).await;
        Ok(())
    }

    async fn upload(&self, project: &ProjectId) -> anyhow::Result<Option<UploadRecord>> {
        Ok(self.read(project, |e| e.upload.clone()).await)
    }

    async fn select_template(
        &self,
        project: &ProjectId,
        selection: TemplateSelection,
    ) -> anyhow::Result<()> {
        self.write(project, |e| e.template = Some(selection)).await;
        Ok(())
    }

    async fn template(&self, project: &ProjectId) -> anyhow::Result<Option<TemplateSelection>> {
        Ok(self.read(project, |e| e.template.clone()).await)
    }

    async fn record_export(&self, project: &ProjectId, export: ExportRecord) -> anyhow::Result<()> {
        self.write(project, |e| e.export = Some(export)).await;
        Ok(())
    }

    async fn export(&self, project: &ProjectId) -> anyhow::Result<Option<ExportRecord>> {
        Ok(self.read(project, |e| e.export.clone()).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_replace_previous_values() -> anyhow::Result<()> {
        let store = InMemoryProjectStore::new();
        let project = ProjectId::parse("p1")?;
        assert!(store.template(&project).await?.is_none());

        for id in ["trade-clean", "novella-a5"] {
            store
                .select_template(
                    &project,
                    TemplateSelection {
                        template_id: id.to_owned(),
                        selected_at: Utc::now(),
                    },
                )
                .await?;
        }
        let selection = store.template(&project).await?.expect("selection");
        assert_eq!(selection.template_id, "novella-a5");
        Ok(())
    }

    #[tokio::test]
    async fn projects_are_independent() -> anyhow::Result<()> {
        let store = InMemoryProjectStore::new();
        let a = ProjectId::parse("a")?;
        let b = ProjectId::parse("b")?;
        store
            .record_upload(
                &a,
                UploadRecord {
                    file_name: "a.md".to_owned(),
                    file_size: 3,
                    saved_path: PathBuf::from("uploads/a.md"),
                    uploaded_at: Utc::now(),
                },
            )
            .await?;

        assert_eq!(store.upload(&a).await?.map(|u| u.file_size), Some(3));
        assert!(store.upload(&b).await?.is_none());
        assert!(store.export(&a).await?.is_none());
        Ok(())
    }
}
