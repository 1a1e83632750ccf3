use std::path::{Path, PathBuf};

use anyhow::Context as _;

/// Sibling of `path` that a writer fills before renaming it into place.
pub fn tmp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{name}.tmp.{}", uuid::Uuid::new_v4().simple()))
}

pub fn write_atomic(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = parent_dir(path)?;
    std::fs::create_dir_all(parent)
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = tmp_path_for(path);
    if let Err(err) = std::fs::write(&tmp_path, data) {
        let _ = std::fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("write tmp: {}", tmp_path.display()));
    }
    std::fs::rename(&tmp_path, path)
        .with_context(|| format!("rename tmp to final: {}", path.display()))
}

pub async fn write_atomic_async(path: &Path, data: &[u8]) -> anyhow::Result<()> {
    let parent = parent_dir(path)?;
    tokio::fs::create_dir_all(parent)
        .await
        .with_context(|| format!("create parent dir: {}", parent.display()))?;

    let tmp_path = tmp_path_for(path);
    if let Err(err) = tokio::fs::write(&tmp_path, data).await {
        let _ = tokio::fs::remove_file(&tmp_path).await;
        return Err(err).with_context(|| format!("write tmp: {}", tmp_path.display()));
    }
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("rename tmp to final: {}", path.display()))
}

fn parent_dir(path: &Path) -> anyhow::Result<&Path> {
    path.parent()
        .ok_or_else(|| anyhow::anyhow!("path has no parent: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_path_is_hidden_sibling() {
        let tmp = tmp_path_for(Path::new("/data/exports/p1/export.zip"));
        assert_eq!(tmp.parent(), Some(Path::new("/data/exports/p1")));
        let name = tmp.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with(".export.zip.tmp."));
    }

    #[test]
    fn write_atomic_replaces_content() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("nested").join("a.json");
        write_atomic(&path, b"one")?;
        write_atomic(&path, b"two")?;
        assert_eq!(std::fs::read(&path)?, b"two");
        assert_eq!(std::fs::read_dir(path.parent().unwrap())?.count(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn async_variant_writes() -> anyhow::Result<()> {
        let temp = tempfile::TempDir::new()?;
        let path = temp.path().join("b.md");
        write_atomic_async(&path, b"# hi").await?;
        assert_eq!(tokio::fs::read(&path).await?, b"# hi");
        Ok(())
    }
}
