use crate::models::{Event, EventType, Incident};

/// Classifies one non-inventory event into exactly one `Incident`. This
/// pipeline never merges events across incidents: a single event always
/// produces a single incident carrying that one event.
///
/// Inventory events never reach here: the orchestrator intercepts
/// `host_inventory`/`docker_inventory` events to update its running
/// `Snapshot` before handing anything to the correlator.
pub fn correlate(event: Event) -> Incident {
    let recommended_actions = recommended_actions_for(event.event_type);
    let evidence_summary = event.raw.clone();
    Incident::new(event, evidence_summary, recommended_actions)
}

/// Fixed event-type -> recommendation table. Every non-inventory
/// `EventType` variant must appear here exactly once.
fn recommended_actions_for(event_type: EventType) -> Vec<String> {
    let recs: &[&str] = match event_type {
        EventType::ConfigDrift => &[
            "Review the diff against the last known-good baseline.",
            "Confirm the change was authorized before rebaselining.",
        ],
        EventType::ConfigNewFile => &["Review the new file's contents and origin."],
        EventType::ConfigDeleted => &["Restore the file from backup if the deletion was not authorized."],
        EventType::AuthFailures => &[
            "Review the source addresses of the failed attempts.",
            "Consider temporarily blocking repeat offenders.",
        ],
        EventType::NewListeningPort => &["Confirm the new listening service is expected and properly firewalled."],
        EventType::NewAdminUser => &["Verify the new sudo-capable user was added intentionally."],
        EventType::NewContainer => &["Confirm the new container image and command are expected."],
        EventType::HighCpu => &["Identify the top CPU-consuming process and determine if it is expected."],
        EventType::HighMemory => &["Identify memory-heavy processes and check for a leak or runaway job."],
        EventType::HighNetworkUsage => &["Review active connections for unexpected exfiltration or scanning traffic."],
        EventType::NginxConfigInvalid => &["Fix the nginx configuration error before the next reload."],
        EventType::NginxSecurity => &["Disable server_tokens to stop leaking the nginx version."],
        EventType::FirewallInactive => &["Enable the host firewall."],
        EventType::FirewallAudit => &["Confirm firewall coverage manually; no supported tool was detected."],
        EventType::NpmAuditVulnerabilities => &["Run `npm audit fix` or upgrade the flagged packages."],
        EventType::PhpMalwareSuspected => &["Quarantine the file and inspect it for a webshell or backdoor."],
        EventType::HostInventory | EventType::DockerInventory => {
            unreachable!("inventory events are intercepted before correlation")
        }
    };
    recs.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    #[test]
    fn every_non_inventory_event_type_has_a_recommendation() {
        let types = [
            EventType::ConfigDrift,
            EventType::ConfigNewFile,
            EventType::ConfigDeleted,
            EventType::AuthFailures,
            EventType::NewListeningPort,
            EventType::NewAdminUser,
            EventType::NewContainer,
            EventType::HighCpu,
            EventType::HighMemory,
            EventType::HighNetworkUsage,
            EventType::NginxConfigInvalid,
            EventType::NginxSecurity,
            EventType::FirewallInactive,
            EventType::FirewallAudit,
            EventType::NpmAuditVulnerabilities,
            EventType::PhpMalwareSuspected,
        ];
        for event_type in types {
            assert!(!recommended_actions_for(event_type).is_empty(), "{event_type:?} has no recommendation");
        }
    }

    #[test]
    fn correlate_produces_one_incident_carrying_the_one_event() {
        let event = Event::new("detector", EventType::AuthFailures, Severity::P2, "5 failures", serde_json::json!({}));
        let incident = correlate(event);
        assert_eq!(incident.events.len(), 1);
        assert!(incident.event_type_matches(EventType::AuthFailures));
    }
}
