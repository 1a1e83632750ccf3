use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use anyhow::Context as _;

/// The external document converter, invoked as a subprocess with explicit
/// argument arrays. Nothing is ever formatted into a shell string.
#[derive(Debug, Clone)]
pub struct Pandoc {
    program: PathBuf,
}

impl Pandoc {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Runs `pandoc --version`. A missing binary or a non-zero exit means
    /// "unavailable"; neither is an error.
    pub fn is_available(&self) -> bool {
        match Command::new(&self.program).arg("--version").output() {
            Ok(output) if output.status.success() => true,
            Ok(output) => {
                tracing::info!(
                    pandoc = %self.program.display(),
                    status = %output.status,
                    "pandoc version check failed; using fallback conversion"
                );
                false
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::info!(pandoc = %self.program.display(), "pandoc not available; using fallback conversion");
                false
            }
            Err(err) => {
                tracing::info!(pandoc = %self.program.display(), ?err, "pandoc not runnable; using fallback conversion");
                false
            }
        }
    }

    /// `pandoc <input> -o <output> --from <reader> --to html5 --standalone`,
    /// then reads the produced document back.
    pub fn to_html(&self, input: &Path, reader: &str, output: &Path) -> anyhow::Result<String> {
        let args = build_args(input, output, reader, "html5", &[OsString::from("--standalone")]);
        self.run(&args).context("convert to html")?;
        ensure_output(output)?;
        std::fs::read_to_string(output)
            .with_context(|| format!("read converter output: {}", output.display()))
    }

    /// `pandoc <html> -o <out.epub> --from html --to epub3 --metadata title=<title>`.
    pub fn html_to_epub(&self, html: &Path, output: &Path, title: &str) -> anyhow::Result<()> {
        let extra = [
            OsString::from("--metadata"),
            OsString::from(format!("title={title}")),
        ];
        let args = build_args(html, output, "html", "epub3", &extra);
        self.run(&args).context("convert html to epub")?;
        ensure_output(output)
    }

    fn run(&self, args: &[OsString]) -> anyhow::Result<Output> {
        tracing::info!(pandoc = %self.program.display(), ?args, "running pandoc");
        let output = Command::new(&self.program)
            .args(args)
            .output()
            .with_context(|| format!("run pandoc: {}", self.program.display()))?;
        if !output.status.success() {
            anyhow::bail!(
                "pandoc failed ({}): {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(output)
    }
}

fn build_args(input: &Path, output: &Path, from: &str, to: &str, extra: &[OsString]) -> Vec<OsString> {
    let mut args = vec![
        input.as_os_str().to_owned(),
        OsString::from("-o"),
        output.as_os_str().to_owned(),
        OsString::from("--from"),
        OsString::from(from),
        OsString::from("--to"),
        OsString::from(to),
    ];
    args.extend(extra.iter().cloned());
    args
}

fn ensure_output(output: &Path) -> anyhow::Result<()> {
    if !output.is_file() {
        anyhow::bail!(
            "pandoc exited successfully but produced no output file: {}",
            output.display()
        );
    }
    Ok(())
}
