use crate::config::LlmConfig;

/// Fixed system prompt for an unprompted/periodic scan: look for anything
/// suspicious using only the whitelisted read-only commands, and report a
/// structured verdict.
pub const PROMPT_SCAN: &str = "\
You are a defensive security investigator running on a production host. \
You may only run commands from a fixed, pre-approved whitelist; any command \
outside that whitelist will be rejected before it runs. Use the available \
commands to look for signs of compromise: unexpected processes, \
unauthorized listening ports, suspicious cron jobs, modified system \
binaries, or webshells. Respond with strict JSON of the shape \
{\"commands\": [{\"cmd\": \"...\", \"reason\": \"...\"}], \"done\": bool, \
\"vulnerability_found\": bool, \"finding\": {\"title\": \"...\", \
\"description\": \"...\", \"severity\": \"P1\"|\"P2\"|\"P3\"|\"P4\"}}. \
Set \"done\": true once you have reached a conclusion, and omit \"finding\" \
when nothing suspicious was found. Never invent command output; wait for \
the next message to see real results.";

/// Fixed system prompt for resolving a specific incident: given the
/// evidence already collected, decide what (if anything) to recommend.
pub const PROMPT_RESOLVE: &str = "\
You are a defensive security investigator helping resolve a specific \
incident on a production host. You have been given the incident's evidence \
below. You may only run commands from a fixed, pre-approved whitelist; any \
command outside that whitelist will be rejected before it runs. Use the \
whitelisted commands to confirm or rule out the suspected cause, then \
respond with strict JSON of the shape {\"commands\": [{\"cmd\": \"...\", \
\"reason\": \"...\"}], \"done\": bool, \"summary\": \"...\"}. Set \
\"done\": true once you have reached a conclusion. Never invent command \
output; wait for the next message to see real results.";

/// Resolves the effective system prompt for one agent run: an operator
/// override from config if present, else the fixed prompt above, with any
/// non-empty threat-registry context appended after a separator.
pub fn get_system_prompt(mode: &str, threat_context: &str, config: &LlmConfig) -> String {
    let base = match mode {
        "resolve" => config_override(config, "resolve").unwrap_or_else(|| PROMPT_RESOLVE.to_string()),
        _ => config_override(config, "scan").unwrap_or_else(|| PROMPT_SCAN.to_string()),
    };

    if threat_context.is_empty() {
        base
    } else {
        format!("{base}\n\n---\n\n{threat_context}")
    }
}

fn config_override(_config: &LlmConfig, _mode: &str) -> Option<String> {
    // Prompt overrides are not part of the current configuration schema;
    // reserved for a future `llm.prompts.{scan,resolve}` section.
    None
}
