//! HTML listings for directories without a default index file.

use std::path::PathBuf;
use tokio::sync::OnceCell;

use super::{Result, ServeError};

/// Template compiled into the binary, used unless a file is configured.
const BUILTIN_TEMPLATE: &str = include_str!("listing.html");

/// Renders directory listings from a template with two substitution
/// points: `#{dirList}` (quoted-name array literal) and `#{currentDir}`
/// (the quoted request path, backslashes doubled).
///
/// A configured template file is read once and cached for the process
/// lifetime. If the read fails only the triggering request fails; the
/// cell stays empty so a later request retries.
pub struct ListingRenderer {
    template_path: Option<PathBuf>,
    template: OnceCell<String>,
}

impl ListingRenderer {
    pub fn builtin() -> Self {
        ListingRenderer {
            template_path: None,
            template: OnceCell::new(),
        }
    }

    pub fn from_file(path: PathBuf) -> Self {
        ListingRenderer {
            template_path: Some(path),
            template: OnceCell::new(),
        }
    }

    async fn template(&self) -> Result<&str> {
        let path = match &self.template_path {
            None => return Ok(BUILTIN_TEMPLATE),
            Some(path) => path.clone(),
        };
        self.template
            .get_or_try_init(|| async move {
                tokio::fs::read_to_string(&path).await.map_err(|e| {
                    log::error!("failed to load listing template {}: {}", path.display(), e);
                    ServeError::Template(format!("{}: {}", path.display(), e))
                })
            })
            .await
            .map(String::as_str)
    }

    /// Substitution is CPU-bound string work, so it runs on the blocking
    /// pool rather than the dispatch threads.
    pub async fn render(&self, request_path: &str, names: &[String]) -> Result<String> {
        let template = self.template().await?.to_owned();
        let request_path = request_path.to_owned();
        let names = names.to_vec();

        tokio::task::spawn_blocking(move || substitute(&template, &request_path, &names))
            .await
            .map_err(|e| ServeError::Template(e.to_string()))
    }
}

fn substitute(template: &str, request_path: &str, names: &[String]) -> String {
    let dir_list = if names.is_empty() {
        "[ ]".to_string()
    } else {
        let quoted: Vec<String> = names.iter().map(|n| format!("\"{}\"", n)).collect();
        format!("[ {} ]", quoted.join(","))
    };
    let current_dir = format!("\"{}\"", request_path.replace('\\', "\\\\"));

    template
        .replace("#{dirList}", &dir_list)
        .replace("#{currentDir}", &current_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn substitutes_both_placeholders() {
        let out = substitute(
            "list=#{dirList} dir=#{currentDir}",
            "/docs",
            &["a.txt".to_string(), "b".to_string()],
        );
        assert_eq!(out, "list=[ \"a.txt\",\"b\" ] dir=\"/docs\"");
    }

    #[test]
    fn empty_directory_renders_empty_array() {
        let out = substitute("#{dirList}", "/", &[]);
        assert_eq!(out, "[ ]");
    }

    #[test]
    fn backslashes_are_doubled_in_current_dir() {
        let out = substitute("#{currentDir}", "/a\\b", &[]);
        assert_eq!(out, "\"/a\\\\b\"");
    }

    #[tokio::test]
    async fn builtin_template_renders() {
        let renderer = ListingRenderer::builtin();
        let body = renderer
            .render("/stuff", &["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert!(body.contains("[ \"one\",\"two\" ]"));
        assert!(body.contains("\"/stuff\""));
        assert!(!body.contains("#{dirList}"));
        assert!(!body.contains("#{currentDir}"));
    }

    #[tokio::test]
    async fn missing_template_file_fails_only_until_it_appears() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.html");
        let renderer = ListingRenderer::from_file(path.clone());

        let err = renderer.render("/", &[]).await.unwrap_err();
        assert!(matches!(err, ServeError::Template(_)));

        let mut file = std::fs::File::create(&path).unwrap();
        write!(file, "dir=#{{currentDir}}").unwrap();
        drop(file);

        // The failed load was not cached; this request retries and wins.
        let body = renderer.render("/retry", &[]).await.unwrap();
        assert_eq!(body, "dir=\"/retry\"");
    }

    #[tokio::test]
    async fn template_file_is_loaded_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("template.html");
        std::fs::write(&path, "v1 #{dirList}").unwrap();

        let renderer = ListingRenderer::from_file(path.clone());
        assert_eq!(renderer.render("/", &[]).await.unwrap(), "v1 [ ]");

        // Rewriting the file does not affect the cached template.
        std::fs::write(&path, "v2 #{dirList}").unwrap();
        assert_eq!(renderer.render("/", &[]).await.unwrap(), "v1 [ ]");
    }
}
