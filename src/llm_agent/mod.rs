pub mod prompts;
pub mod redact;

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::config::{LlmAgentConfig, LlmConfig};
use crate::ports::{Chat, ChatMessage};
use crate::sinks::ActivitySink;

const COMMAND_TIMEOUT_SECS: u64 = 30;
const STDOUT_CAP: usize = 1500;
const STDERR_CAP: usize = 500;

/// Fixed, anchored, case-insensitive whitelist of commands the agent may
/// run. This is the sole authorization boundary: there is no "looks safe"
/// heuristic layered on top of it. Covers the read-only discovery commands
/// and the remediation commands named for `resolve` mode; enforcement is by
/// regex alone, so nothing stops a `scan`-mode response from proposing a
/// remediation entry too.
static WHITELIST: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // Read-only.
        r"(?i)^apt list",
        r"(?i)^apt-cache",
        r"(?i)^dpkg -[lL]",
        r"(?i)^rpm -qa",
        r"(?i)^ss -",
        r"(?i)^netstat -",
        r"(?i)^docker ps",
        r"(?i)^docker images",
        r"(?i)^docker inspect",
        r"(?i)^cat /etc/",
        r"(?i)^ls -la /etc/",
        r"(?i)^getent",
        r"(?i)^systemctl list-units",
        r"(?i)^systemctl status",
        r"(?i)^id",
        r"(?i)^whoami",
        r"(?i)^uname -a",
        r"(?i)^hostname",
        // Remediation.
        r"(?i)^apt(-get)? install -y",
        r"(?i)^apt(-get)? upgrade -y",
        r"(?i)^docker stop",
        r"(?i)^docker rm -f",
        r"(?i)^ufw deny",
        r"(?i)^iptables -I INPUT",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("static whitelist pattern must compile"))
    .collect()
});

fn is_whitelisted(cmd: &str) -> bool {
    WHITELIST.iter().any(|re| re.is_match(cmd.trim()))
}

#[derive(Debug, Deserialize)]
struct AgentCommand {
    cmd: String,
    #[allow(dead_code)]
    reason: String,
}

#[derive(Debug, Deserialize)]
struct AgentResponse {
    #[serde(default)]
    commands: Vec<AgentCommand>,
    #[serde(default)]
    done: bool,
    #[serde(default)]
    vulnerability_found: bool,
    #[serde(default)]
    finding: Option<AgentFinding>,
    #[serde(default)]
    summary: String,
}

#[derive(Debug, Deserialize)]
pub struct AgentFinding {
    pub title: String,
    pub description: String,
    pub severity: String,
}

pub struct AgentRunResult {
    pub iterations: u32,
    pub vulnerability_found: bool,
    pub finding: Option<AgentFinding>,
    pub summary: String,
    pub commands_executed: Vec<String>,
}

/// Bounded agent loop: the model proposes commands, each is checked against
/// the fixed whitelist before it runs, its (truncated) output is appended
/// as the next user message, and the loop ends on `done`, an iteration cap,
/// or a turn that proposes no executable command. `model` is the caller's
/// choice of `model_for_scan()`/`model_for_resolve()`; this function has no
/// opinion on which mode it is running.
pub async fn run(
    chat: Arc<dyn Chat>,
    model: &str,
    llm_config: &LlmConfig,
    agent_config: &LlmAgentConfig,
    system_prompt: &str,
    activity: &ActivitySink,
) -> AgentRunResult {
    let mut messages = vec![ChatMessage::system(system_prompt)];
    let mut vulnerability_found = false;
    let mut finding = None;
    let mut summary = String::new();
    let mut commands_executed = Vec::new();

    for iteration in 1..=agent_config.agent_max_iterations {
        let reply = match chat.chat(model, &messages, llm_config.max_tokens).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "LLM call failed, ending agent run");
                let _ = activity.log_llm_call(&llm_config.provider, model, false).await;
                break;
            }
        };
        let _ = activity.log_llm_call(&llm_config.provider, model, true).await;

        let Some(parsed) = parse_response(&reply) else {
            let _ = activity.log_agent_iteration(iteration, "unparseable response, ending run").await;
            break;
        };

        let _ = activity
            .log_agent_iteration(iteration, &format!("{} command(s) proposed, done={}", parsed.commands.len(), parsed.done))
            .await;

        vulnerability_found = vulnerability_found || parsed.vulnerability_found;
        if parsed.finding.is_some() {
            finding = parsed.finding;
        }
        if !parsed.summary.is_empty() {
            summary = parsed.summary;
        }

        if parsed.done || parsed.commands.is_empty() {
            return AgentRunResult { iterations: iteration, vulnerability_found, finding, summary, commands_executed };
        }

        messages.push(ChatMessage::assistant(&reply));

        let mut observation = String::new();
        for command in &parsed.commands {
            if !is_whitelisted(&command.cmd) {
                observation.push_str(&format!("REJECTED (not whitelisted): {}\n", command.cmd));
                continue;
            }
            let (code, stdout, stderr) = run_command(&command.cmd).await;
            let _ = activity.log_command_execution(&command.cmd, code, &stdout, &stderr).await;
            commands_executed.push(command.cmd.clone());
            observation.push_str(&format!(
                "$ {}\nexit_code: {}\nstdout:\n{}\nstderr:\n{}\n\n",
                command.cmd,
                code,
                truncate(&stdout, STDOUT_CAP),
                truncate(&stderr, STDERR_CAP),
            ));
        }
        messages.push(ChatMessage::user(&observation));
    }

    AgentRunResult { iterations: agent_config.agent_max_iterations, vulnerability_found, finding, summary, commands_executed }
}

/// Strict JSON parse first. On failure, looks inside a fenced ```json code
/// block purely to log what the model said; that fallback text is never
/// executed, since only a successful strict parse can produce commands.
fn parse_response(text: &str) -> Option<AgentResponse> {
    if let Ok(parsed) = serde_json::from_str::<AgentResponse>(text.trim()) {
        return Some(parsed);
    }

    if let Some(fenced) = extract_fenced_json(text) {
        debug!(fenced = %fenced, "model wrapped JSON in a code fence; logging only, not executing");
    }
    None
}

fn extract_fenced_json(text: &str) -> Option<&str> {
    let start = text.find("```json")? + "```json".len();
    let rest = &text[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

async fn run_command(cmd: &str) -> (i32, String, String) {
    let mut command = Command::new("sh");
    command.args(["-c", cmd]);
    match timeout(Duration::from_secs(COMMAND_TIMEOUT_SECS), command.output()).await {
        Ok(Ok(output)) => (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        ),
        Ok(Err(e)) => (-1, String::new(), e.to_string()),
        Err(_) => (-1, String::new(), "command timed out".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_accepts_known_read_only_commands() {
        assert!(is_whitelisted("ss -tlnp"));
        assert!(is_whitelisted("docker ps -a"));
        assert!(is_whitelisted("uname -a"));
        assert!(is_whitelisted("dpkg -l"));
    }

    #[test]
    fn whitelist_accepts_known_remediation_commands() {
        assert!(is_whitelisted("apt-get install -y openssh-server"));
        assert!(is_whitelisted("docker stop abc123"));
        assert!(is_whitelisted("ufw deny 4444"));
    }

    #[test]
    fn whitelist_rejects_anything_not_matched() {
        assert!(!is_whitelisted("rm -rf /"));
        assert!(!is_whitelisted("ps aux; rm -rf /"));
        assert!(!is_whitelisted("mkfs.ext4 /dev/sda1"));
    }

    #[test]
    fn parses_a_strict_json_response() {
        let text = r#"{"commands": [{"cmd": "ps aux", "reason": "look for odd processes"}], "done": false}"#;
        let parsed = parse_response(text).expect("should parse");
        assert_eq!(parsed.commands.len(), 1);
        assert!(!parsed.done);
    }

    #[test]
    fn fenced_code_is_never_treated_as_a_successful_parse() {
        let text = "Here you go:\n```json\n{\"commands\": [], \"done\": true}\n```";
        assert!(parse_response(text).is_none());
    }
}
