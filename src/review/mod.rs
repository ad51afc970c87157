//! Review content composition for the approval flow

mod renderer;

pub use renderer::DiffRenderer;

use crate::git::{GitError, GitManager};

/// Fixed sentinel returned when there is nothing to review. Callers treat
/// this as success, not as an empty review.
pub const NO_UNPUSHED_COMMITS: &str = "No unpushed commits to review.";

/// Builds the human-readable review block: the oneline commit list for the
/// unpushed range followed by a highlighted diff per changed file.
pub struct ReviewBuilder<'a> {
    git: &'a GitManager,
    renderer: &'a DiffRenderer,
}

impl<'a> ReviewBuilder<'a> {
    pub fn new(git: &'a GitManager, renderer: &'a DiffRenderer) -> Self {
        Self { git, renderer }
    }

    /// The commit range under review: `<upstream>..HEAD` when an upstream
    /// exists, otherwise the bare tip commit.
    pub fn review_range(&self) -> Result<String, GitError> {
        Ok(match self.git.upstream()? {
            Some(upstream) => format!("{upstream}..HEAD"),
            None => "HEAD".to_string(),
        })
    }

    /// Render the full review content for every unpushed commit.
    pub fn review_content(&self) -> Result<String, GitError> {
        let count = self.git.unpushed_commit_count()?;
        if count == 0 {
            return Ok(NO_UNPUSHED_COMMITS.to_string());
        }

        let upstream = self.git.upstream()?;
        let log_range = upstream.as_deref().map(|u| format!("{u}..HEAD"));
        let oneline = self.git.oneline_log(log_range.as_deref())?;

        let mut content = String::new();
        content.push_str(&format!(
            "Unpushed commits ({count}):\n\n{}\n",
            oneline.trim_end()
        ));

        let range = self.review_range()?;
        for file_diff in self.git.file_diffs(&range)? {
            content.push_str(&format!("\n{}\n{}\n", file_header(&file_diff.path), "-".repeat(60)));
            content.push_str(&self.renderer.format_diff(&file_diff.diff));
            if !content.ends_with('\n') {
                content.push('\n');
            }
        }

        Ok(content)
    }
}

fn file_header(path: &str) -> String {
    format!("=== {path} ===")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_header_names_the_path() {
        assert_eq!(file_header("src/lib.rs"), "=== src/lib.rs ===");
    }
}
