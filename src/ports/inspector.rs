use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::timeout;

/// Structured host inventory returned by the `Inspector` port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostInventory {
    pub os: String,
    pub os_release: String,
    pub hostname: String,
    pub machine: String,
    pub packages: Vec<PackageInfo>,
    pub services: Vec<ServiceInfo>,
    pub listening_ports: Vec<ListeningPort>,
    pub users_with_sudo: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackageInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub name: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListeningPort {
    pub port: String,
    pub address: String,
}

/// Structured Docker inventory returned by the `Inspector` port.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerInventory {
    pub available: bool,
    pub containers: Vec<ContainerInfo>,
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerInfo {
    pub id: String,
    pub name: String,
    pub image: String,
    pub status: String,
    pub running: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: String,
    pub tags: Vec<String>,
}

/// Raw host/container inspection, abstracted so the collectors above it
/// contain only capping/ordering/independent-failure logic, never the
/// subprocess plumbing itself.
#[async_trait]
pub trait Inspector: Send + Sync {
    async fn host_inventory(&self) -> HostInventory;
    async fn docker_inventory(&self) -> DockerInventory;
}

/// Real implementation backed by subprocess calls to distro tools,
/// `systemctl`, `ss`/`netstat`, `getent`, and the `docker` CLI. Every
/// sub-probe is independent: a failure yields an empty slot, never an
/// aggregate error.
pub struct ProcessInspector;

impl ProcessInspector {
    pub fn new() -> Self {
        Self
    }

    async fn run(args: &[&str], secs: u64) -> Option<(i32, String)> {
        let mut cmd = Command::new(args[0]);
        cmd.args(&args[1..]);
        let fut = cmd.output();
        match timeout(Duration::from_secs(secs), fut).await {
            Ok(Ok(output)) => Some((
                output.status.code().unwrap_or(-1),
                String::from_utf8_lossy(&output.stdout).to_string(),
            )),
            _ => None,
        }
    }

    async fn run_shell(shell_cmd: &str, secs: u64) -> Option<(i32, String)> {
        Self::run(&["sh", "-c", shell_cmd], secs).await
    }

    async fn packages() -> Vec<PackageInfo> {
        if let Some((0, stdout)) =
            Self::run_shell("dpkg-query -W -f='${Package}\t${Version}\n' 2>/dev/null", 30).await
        {
            if !stdout.trim().is_empty() {
                return Self::parse_name_version(&stdout);
            }
        }
        if let Some((0, stdout)) =
            Self::run_shell("rpm -qa --queryformat '%{NAME}\t%{VERSION}\n' 2>/dev/null", 30).await
        {
            if !stdout.trim().is_empty() {
                return Self::parse_name_version(&stdout);
            }
        }
        Vec::new()
    }

    fn parse_name_version(stdout: &str) -> Vec<PackageInfo> {
        stdout
            .lines()
            .take(5000)
            .filter_map(|line| {
                let mut parts = line.splitn(2, '\t');
                let name = parts.next()?.to_string();
                let version = parts.next()?.to_string();
                Some(PackageInfo { name, version })
            })
            .collect()
    }

    async fn services() -> Vec<ServiceInfo> {
        let Some((0, stdout)) = Self::run(
            &[
                "systemctl",
                "list-units",
                "--type=service",
                "--state=running",
                "--no-pager",
                "-o",
                "json",
            ],
            10,
        )
        .await
        else {
            return Vec::new();
        };
        let Ok(units) = serde_json::from_str::<Vec<serde_json::Value>>(&stdout) else {
            return Vec::new();
        };
        units
            .into_iter()
            .take(200)
            .map(|u| ServiceInfo {
                name: u.get("unit").and_then(|v| v.as_str()).unwrap_or("").to_string(),
                state: u
                    .get("sub")
                    .and_then(|v| v.as_str())
                    .unwrap_or("running")
                    .to_string(),
            })
            .collect()
    }

    async fn listening_ports() -> Vec<ListeningPort> {
        for args in [&["ss", "-tln"][..], &["ss", "-tlnp"], &["netstat", "-tln"]] {
            let Some((0, stdout)) = Self::run(args, 5).await else {
                continue;
            };
            if stdout.trim().is_empty() {
                continue;
            }
            let mut out = Vec::new();
            for line in stdout.lines().skip(1) {
                let parts: Vec<&str> = line.split_whitespace().collect();
                if parts.len() >= 4 {
                    let addr = parts[3];
                    if let Some((_, port)) = addr.rsplit_once(':') {
                        out.push(ListeningPort {
                            port: port.to_string(),
                            address: addr.to_string(),
                        });
                    }
                }
            }
            return out.into_iter().take(500).collect();
        }
        Vec::new()
    }

    async fn sudo_users() -> Vec<String> {
        for group in ["sudo", "wheel"] {
            if let Some((0, stdout)) = Self::run(&["getent", "group", group], 2).await {
                let parts: Vec<&str> = stdout.trim().split(':').collect();
                if parts.len() >= 4 && !parts[3].is_empty() {
                    return parts[3].split(',').map(|s| s.trim().to_string()).collect();
                }
            }
        }
        Vec::new()
    }
}

impl Default for ProcessInspector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Inspector for ProcessInspector {
    async fn host_inventory(&self) -> HostInventory {
        let os = std::env::consts::OS.to_string();
        let hostname = Self::run(&["hostname"], 2)
            .await
            .map(|(_, s)| s.trim().to_string())
            .unwrap_or_default();
        let machine = Self::run(&["uname", "-m"], 2)
            .await
            .map(|(_, s)| s.trim().to_string())
            .unwrap_or_default();
        let os_release = Self::run(&["uname", "-r"], 2)
            .await
            .map(|(_, s)| s.trim().to_string())
            .unwrap_or_default();

        HostInventory {
            os,
            os_release,
            hostname,
            machine,
            packages: Self::packages().await,
            services: Self::services().await,
            listening_ports: Self::listening_ports().await,
            users_with_sudo: Self::sudo_users().await,
        }
    }

    async fn docker_inventory(&self) -> DockerInventory {
        let Some((0, ps_out)) = Self::run(
            &[
                "docker",
                "ps",
                "-a",
                "--format",
                "{{.ID}}\t{{.Names}}\t{{.Image}}\t{{.Status}}",
            ],
            10,
        )
        .await
        else {
            return DockerInventory::default();
        };

        let containers = ps_out
            .lines()
            .filter_map(|line| {
                let parts: Vec<&str> = line.splitn(4, '\t').collect();
                if parts.len() != 4 {
                    return None;
                }
                let status = parts[3].to_lowercase();
                Some(ContainerInfo {
                    id: parts[0].chars().take(12).collect(),
                    name: parts[1].to_string(),
                    image: parts[2].to_string(),
                    status: parts[3].to_string(),
                    running: status.starts_with("up"),
                })
            })
            .collect();

        let images = match Self::run(&["docker", "images", "--format", "{{.ID}}\t{{.Repository}}:{{.Tag}}"], 10).await {
            Some((0, out)) => out
                .lines()
                .filter_map(|line| {
                    let parts: Vec<&str> = line.splitn(2, '\t').collect();
                    if parts.len() != 2 {
                        return None;
                    }
                    Some(ImageInfo {
                        id: parts[0].to_string(),
                        tags: vec![parts[1].to_string()],
                    })
                })
                .collect(),
            _ => Vec::new(),
        };

        DockerInventory {
            available: true,
            containers,
            images,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_name_version_splits_on_first_tab() {
        let parsed = ProcessInspector::parse_name_version("curl\t7.81.0\njq\t1.6\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0].name, "curl");
        assert_eq!(parsed[0].version, "7.81.0");
    }
}
