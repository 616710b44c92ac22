use crate::error::{IngestError, Result};
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Directory name a clone of `url` lands in: last path segment without `.git`
pub fn repo_name(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(IngestError::InvalidUrl(url.to_string()));
    }
    Ok(name.to_string())
}

/// Clone `url` into `<into_dir>/<repo name>` with the `git` executable.
///
/// An existing target directory is reused as-is, so repeated runs do not
/// fetch again.
pub async fn clone_repo(url: &str, into_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let name = repo_name(url)?;
    let target = into_dir.as_ref().join(&name);

    if target.exists() {
        log::info!("Reusing existing checkout {}", target.display());
        return Ok(target);
    }

    tokio::fs::create_dir_all(into_dir.as_ref()).await?;
    log::info!("Cloning {url} into {}", target.display());

    let output = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg(url)
        .arg(&target)
        .output()
        .await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        return Err(IngestError::GitError(stderr));
    }

    log::info!("Cloned {name}");
    Ok(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn repo_name_from_urls() {
        assert_eq!(
            repo_name("https://github.com/psf/requests.git").unwrap(),
            "requests"
        );
        assert_eq!(
            repo_name("https://github.com/psf/requests/").unwrap(),
            "requests"
        );
        assert_eq!(repo_name("git@github.com:org/tool.git").unwrap(), "tool");
        assert_eq!(repo_name("/srv/git/local-repo").unwrap(), "local-repo");
    }

    #[test]
    fn rejects_urls_without_a_name() {
        assert!(matches!(repo_name(""), Err(IngestError::InvalidUrl(_))));
        assert!(matches!(repo_name(".git"), Err(IngestError::InvalidUrl(_))));
    }

    #[tokio::test]
    async fn existing_checkout_is_reused() {
        let temp = tempdir().unwrap();
        let existing = temp.path().join("demo");
        std::fs::create_dir_all(&existing).unwrap();
        std::fs::write(existing.join("keep.py"), "x = 1").unwrap();

        let path = clone_repo("https://example.invalid/demo.git", temp.path())
            .await
            .unwrap();

        assert_eq!(path, existing);
        assert!(path.join("keep.py").exists());
    }

    #[tokio::test]
    async fn failed_clone_is_an_error() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("no-such-source");

        let result = clone_repo(&missing.to_string_lossy(), temp.path().join("out")).await;

        assert!(result.is_err());
    }
}
