use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Layout, Settings};
use crate::pipeline::Plan;

#[derive(Debug, Parser)]
#[command(author, version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Render a styled HTML preview of the uploaded manuscript.
    #[command(alias = "generatePreview")]
    GeneratePreview(PreviewArgs),
    /// Run the full export: PDF, EPUB and the download package.
    Worker(WorkerArgs),
    /// Store a manuscript as the project's source file.
    Upload(UploadArgs),
    /// List the available templates as JSON.
    Templates,
}

#[derive(Debug, Clone, Args)]
pub struct GlobalArgs {
    /// Workspace root holding uploads/, output/, exports/ (default: $BOOKMAGIC_ROOT or `.`).
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Pandoc executable.
    #[arg(long, global = true)]
    pub pandoc: Option<PathBuf>,

    /// Chrome/Chromium executable used for PDF printing.
    #[arg(long, global = true)]
    pub chrome: Option<PathBuf>,

    /// YAML file with extra template descriptors.
    #[arg(long, global = true)]
    pub templates: Option<PathBuf>,

    /// Only list top-level headings in the table of contents.
    #[arg(long, global = true)]
    pub top_level_toc: bool,
}

impl GlobalArgs {
    /// Environment first, then any flag given on the command line.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings = Settings::from_env()?;
        if let Some(root) = &self.root {
            settings.layout = Layout::under(root);
        }
        if let Some(pandoc) = &self.pandoc {
            settings.pandoc.clone_from(pandoc);
        }
        if let Some(chrome) = &self.chrome {
            settings.chrome_executable = Some(chrome.clone());
        }
        if let Some(templates) = &self.templates {
            settings.templates_file = Some(templates.clone());
        }
        if self.top_level_toc {
            settings.include_sub_levels = false;
        }
        Ok(settings)
    }
}

#[derive(Debug, Args)]
pub struct PreviewArgs {
    pub project_id: String,
    pub template_id: String,
}

#[derive(Debug, Args)]
pub struct WorkerArgs {
    pub project_id: String,
    pub template_id: String,

    #[arg(value_enum, default_value_t = Plan::Free)]
    pub plan: Plan,
}

#[derive(Debug, Args)]
pub struct UploadArgs {
    #[arg(long)]
    pub project: String,

    /// Manuscript to upload (.docx, .md or .rtf).
    pub file: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_plan_defaults_to_free() {
        let cli = Cli::try_parse_from(["bookmagic", "worker", "p1", "trade-clean"]).unwrap();
        match cli.command {
            Command::Worker(args) => {
                assert_eq!(args.project_id, "p1");
                assert_eq!(args.template_id, "trade-clean");
                assert_eq!(args.plan, Plan::Free);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn camel_case_alias_and_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "bookmagic",
            "generatePreview",
            "p1",
            "novella-a5",
            "--root",
            "/tmp/books",
            "--top-level-toc",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::GeneratePreview(_)));
        assert_eq!(cli.global.root, Some(PathBuf::from("/tmp/books")));
        assert!(cli.global.top_level_toc);
    }

    #[test]
    fn rejects_unknown_plan() {
        assert!(Cli::try_parse_from(["bookmagic", "worker", "p1", "t", "enterprise"]).is_err());
    }

    #[test]
    fn flags_override_settings() {
        let args = GlobalArgs {
            root: Some(PathBuf::from("/srv/bm")),
            pandoc: Some(PathBuf::from("/opt/pandoc")),
            chrome: None,
            templates: None,
            top_level_toc: true,
        };
        let settings = args.settings().unwrap();
        assert_eq!(settings.layout.uploads_dir, PathBuf::from("/srv/bm/uploads"));
        assert_eq!(settings.pandoc, PathBuf::from("/opt/pandoc"));
        assert!(!settings.include_sub_levels);
    }
}
