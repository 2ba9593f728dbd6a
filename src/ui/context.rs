//! Detects whether output goes to a person or to a pipe/CI log

use std::io::IsTerminal;

/// CI markers checked in addition to `CI`
const CI_VARS: &[&str] = &[
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "CIRCLECI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Output mode for the CLI
#[derive(Debug, Clone, Copy)]
pub struct UiContext {
    fancy: bool,
}

impl UiContext {
    /// Detect from the terminal and environment
    pub fn detect() -> Self {
        let tty = std::io::stdout().is_terminal();
        let ci = std::env::var_os("CI").is_some()
            || CI_VARS.iter().any(|var| std::env::var_os(var).is_some());
        Self { fancy: tty && !ci }
    }

    /// Plain output regardless of environment
    pub fn plain() -> Self {
        Self { fancy: false }
    }

    /// Whether spinners and cliclack framing should be used
    pub fn use_fancy_output(&self) -> bool {
        self.fancy
    }
}
