//! External highlighter and pager plumbing

use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;

use tracing::warn;

/// Formats diffs through an external highlighter and displays review content
/// through a full-screen pager. Both tools are configured as full command
/// strings, flags included, and both are optional: highlighting falls back to
/// the unmodified diff, paging falls back to plain console output.
pub struct DiffRenderer {
    highlighter: String,
    pager: String,
}

/// Resolve a command string to a binary path and its arguments. None when the
/// string is empty or the binary is not on PATH.
fn locate(command: &str) -> Option<(PathBuf, Vec<String>)> {
    let mut parts = command.split_whitespace();
    let binary = which::which(parts.next()?).ok()?;
    Some((binary, parts.map(str::to_string).collect()))
}

impl DiffRenderer {
    pub fn new(highlighter: impl Into<String>, pager: impl Into<String>) -> Self {
        Self {
            highlighter: highlighter.into(),
            pager: pager.into(),
        }
    }

    /// Pipe diff text through the highlighter. On any failure the input is
    /// returned unchanged; this never errors.
    pub fn format_diff(&self, diff: &str) -> String {
        match self.try_highlight(diff) {
            Some(highlighted) => highlighted,
            None => {
                warn!(
                    "diff highlighter '{}' unavailable, showing plain diff",
                    self.highlighter
                );
                diff.to_string()
            }
        }
    }

    fn try_highlight(&self, diff: &str) -> Option<String> {
        let (binary, args) = locate(&self.highlighter)?;

        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .ok()?;

        // Feed stdin from its own thread: a diff larger than a pipe buffer
        // would otherwise deadlock against the child's unread stdout.
        let mut stdin = child.stdin.take()?;
        let payload = diff.to_string();
        let writer = thread::spawn(move || stdin.write_all(payload.as_bytes()));

        let output = child.wait_with_output().ok()?;
        writer.join().ok()?.ok()?;

        if !output.status.success() {
            return None;
        }

        String::from_utf8(output.stdout).ok()
    }

    /// Show review content in the pager, blocking until the user exits it.
    /// The pager inherits stdio so it has full control of the terminal; the
    /// scratch file is removed on every exit path.
    pub fn display_review(&self, content: &str) -> std::io::Result<()> {
        let Some((binary, args)) = locate(&self.pager) else {
            warn!("pager '{}' unavailable, printing review inline", self.pager);
            println!("{content}");
            return Ok(());
        };

        // NamedTempFile deletes the scratch file on drop, pager success or not.
        let mut scratch = tempfile::NamedTempFile::new()?;
        scratch.write_all(content.as_bytes())?;
        scratch.flush()?;

        let status = Command::new(binary)
            .args(&args)
            .arg(scratch.path())
            .status()?;

        // A pager killed by the user (e.g. SIGINT) only cancels the
        // review display, not the surrounding flow.
        if !status.success() {
            warn!("pager exited with {status}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_diff_is_identity_without_highlighter() {
        let renderer = DiffRenderer::new("definitely-not-a-real-binary-xyz", "less -R");
        let diff = "--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n";
        assert_eq!(renderer.format_diff(diff), diff);
    }

    #[test]
    fn display_review_falls_back_to_stdout() {
        let renderer = DiffRenderer::new("delta", "definitely-not-a-real-pager-xyz");
        renderer.display_review("review body").expect("fallback display");
    }

    #[test]
    fn command_strings_carry_their_flags() {
        let (binary, args) = locate("sh -c true").expect("sh resolves");
        assert_eq!(binary.file_name().unwrap(), "sh");
        assert_eq!(args, vec!["-c".to_string(), "true".to_string()]);
        assert!(locate("").is_none());
    }

    #[cfg(unix)]
    #[test]
    fn large_diff_streams_through_the_highlighter() {
        // cat echoes stdin unchanged, exercising the child pipes with a
        // payload far beyond any pipe buffer.
        let renderer = DiffRenderer::new("cat", "less -R");
        let mut diff = String::from("--- a/big\n+++ b/big\n@@ -0,0 +1,20000 @@\n");
        for i in 0..20_000 {
            diff.push_str(&format!("+generated line {i}\n"));
        }
        assert_eq!(renderer.format_diff(&diff), diff);
    }
}
