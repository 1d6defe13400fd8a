//! Resolves loaded/embedded prompt files into the strings callers actually use, falling
//! back to the in-code defaults (e.g. [`REACT_SYSTEM_PROMPT`](crate::agent::react::REACT_SYSTEM_PROMPT))
//! whenever a YAML file is absent or leaves a key unset.

use super::{HelvePromptsFile, ReactPromptsFile};
use crate::agent::react::REACT_SYSTEM_PROMPT;

const DEFAULT_WORKDIR_SECTION_TEMPLATE: &str = "\nWORKING FOLDER & FILE RULES:\n- Working folder path: {workdir}\n";

const DEFAULT_APPROVAL_DESTRUCTIVE: &str = "\n\nAPPROVAL: Before executing delete_file or remove_dir, output your plan and wait for the user to confirm (e.g. \"Proceed?\" or \"Continue?\"). Do not perform the deletion until the user approves.";

const DEFAULT_APPROVAL_ALWAYS: &str = "\n\nAPPROVAL: Before executing delete_file, remove_dir, or bulk write_file operations, output your plan and wait for the user to confirm. Do not perform these operations until the user approves.";

/// Resolved prompt set for the agent patterns this crate ships: ReAct and Helve's
/// workdir/approval wording. Built by [`super::load`]/[`super::load_or_default`]/
/// [`super::default_from_embedded`]; never constructed field-by-field outside tests.
#[derive(Clone, Debug, Default)]
pub struct AgentPrompts {
    pub(super) react: ReactPromptsFile,
    pub(super) helve: HelvePromptsFile,
}

impl AgentPrompts {
    /// Base ReAct system prompt: file override if set, else the in-code default.
    pub fn react_system_prompt(&self) -> String {
        self.react
            .system_prompt
            .clone()
            .unwrap_or_else(|| REACT_SYSTEM_PROMPT.to_string())
    }

    /// Workdir section template (`{workdir}` placeholder), file override if set, else default.
    pub fn helve_workdir_section_template(&self) -> String {
        self.helve
            .workdir_section_template
            .clone()
            .unwrap_or_else(|| DEFAULT_WORKDIR_SECTION_TEMPLATE.to_string())
    }

    /// Approval text for [`ApprovalPolicy::DestructiveOnly`](crate::helve::ApprovalPolicy::DestructiveOnly).
    pub fn helve_approval_destructive(&self) -> String {
        self.helve
            .approval_destructive
            .clone()
            .unwrap_or_else(|| DEFAULT_APPROVAL_DESTRUCTIVE.to_string())
    }

    /// Approval text for [`ApprovalPolicy::Always`](crate::helve::ApprovalPolicy::Always).
    pub fn helve_approval_always(&self) -> String {
        self.helve
            .approval_always
            .clone()
            .unwrap_or_else(|| DEFAULT_APPROVAL_ALWAYS.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_in_code_constants_when_files_empty() {
        let p = AgentPrompts::default();
        assert_eq!(p.react_system_prompt(), REACT_SYSTEM_PROMPT);
        assert_eq!(p.helve_workdir_section_template(), DEFAULT_WORKDIR_SECTION_TEMPLATE);
        assert_eq!(p.helve_approval_destructive(), DEFAULT_APPROVAL_DESTRUCTIVE);
        assert_eq!(p.helve_approval_always(), DEFAULT_APPROVAL_ALWAYS);
    }

    #[test]
    fn file_override_takes_precedence() {
        let p = AgentPrompts {
            react: ReactPromptsFile {
                system_prompt: Some("custom".to_string()),
                ..Default::default()
            },
            helve: HelvePromptsFile::default(),
        };
        assert_eq!(p.react_system_prompt(), "custom");
    }
}
