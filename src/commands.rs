//! Command implementations behind the `bookmagic` binary. Each returns the
//! JSON document the binary prints on stdout.

use std::sync::Arc;

use anyhow::Context as _;
use serde_json::json;

use crate::cli::{GlobalArgs, PreviewArgs, UploadArgs, WorkerArgs};
use crate::config::Settings;
use crate::pdf::ChromiumPdfRenderer;
use crate::pipeline::Pipeline;
use crate::project::ProjectId;
use crate::templates::TemplateRegistry;
use crate::upload;

pub fn pipeline_from(settings: Settings) -> anyhow::Result<Pipeline> {
    let registry = TemplateRegistry::load(settings.templates_file.as_deref())
        .context("load template registry")?;
    let renderer = ChromiumPdfRenderer::new(
        settings.chrome_executable.clone(),
        settings.render_timeout,
    );
    Ok(Pipeline::new(settings, registry, Arc::new(renderer)))
}

pub async fn generate_preview(
    global: &GlobalArgs,
    args: PreviewArgs,
) -> anyhow::Result<serde_json::Value> {
    let project = ProjectId::parse(&args.project_id)?;
    let pipeline = pipeline_from(global.settings()?)?;

    let preview = pipeline
        .preview(&project, Some(args.template_id.as_str()))
        .await?;
    Ok(json!({
        "success": true,
        "projectId": preview.project_id,
        "templateId": preview.template_id,
        "htmlPath": preview.html_path,
        "inputFile": preview.input_file,
        "usedConverter": preview.used_converter,
        "tocEntries": preview.toc_entries,
        "cached": preview.cached,
    }))
}

pub async fn worker(global: &GlobalArgs, args: WorkerArgs) -> anyhow::Result<serde_json::Value> {
    let project = ProjectId::parse(&args.project_id)?;
    let pipeline = pipeline_from(global.settings()?)?;

    let summary = pipeline
        .export(&project, &args.template_id, args.plan)
        .await?;
    serde_json::to_value(&summary).context("serialize export summary")
}

pub async fn upload(global: &GlobalArgs, args: UploadArgs) -> anyhow::Result<serde_json::Value> {
    let project = ProjectId::parse(&args.project)?;
    let settings = global.settings()?;

    let file_name = args
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("not a file path: {}", args.file.display()))?;
    let data = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("read: {}", args.file.display()))?;

    settings.layout.ensure_dirs()?;
    let receipt = upload::save_upload(&settings.layout, &project, &file_name, &data).await?;
    Ok(json!({
        "success": true,
        "message": "File uploaded successfully",
        "projectId": receipt.project_id,
        "fileName": receipt.file_name,
        "fileSize": receipt.file_size,
        "savedPath": receipt.saved_path,
        "fileExtension": receipt.file_extension,
    }))
}

pub fn templates(global: &GlobalArgs) -> anyhow::Result<serde_json::Value> {
    let settings = global.settings()?;
    let registry = TemplateRegistry::load(settings.templates_file.as_deref())
        .context("load template registry")?;
    serde_json::to_value(registry.all()).context("serialize templates")
}
