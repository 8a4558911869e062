//! Service status capability — stub reporting platform component health.
//!
//! In production this would read the status-page API. The stub derives a
//! stable status per component from its name, leaning heavily toward
//! operational so answers stay plausible.

use async_trait::async_trait;
use triagent_core::{Capability, CapabilityError, InvocationContext, InvocationResult};

const SERVICES: [&str; 5] = ["api", "auth", "billing", "dashboard", "webhooks"];

pub struct ServiceStatusCapability;

#[async_trait]
impl Capability for ServiceStatusCapability {
    fn name(&self) -> &str {
        "service_status"
    }

    fn description(&self) -> &str {
        "Check platform component health. Without arguments, reports every component."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "service": {
                    "type": "string",
                    "enum": SERVICES,
                    "description": "A single component to check (omit for all)"
                }
            },
            "required": []
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _ctx: &InvocationContext,
    ) -> std::result::Result<InvocationResult, CapabilityError> {
        match arguments["service"].as_str() {
            Some(service) => {
                let wanted = service.trim().to_lowercase();
                if !SERVICES.contains(&wanted.as_str()) {
                    return Ok(InvocationResult::fail(format!(
                        "unknown service: {service}"
                    )));
                }
                Ok(InvocationResult::ok(status_entry(&wanted)))
            }
            None => {
                let all: Vec<serde_json::Value> =
                    SERVICES.iter().map(|s| status_entry(s)).collect();
                Ok(InvocationResult::ok(serde_json::Value::Array(all)))
            }
        }
    }
}

/// Stable per-component status record.
fn status_entry(service: &str) -> serde_json::Value {
    let hash: u32 = service
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    let (status, note) = match hash % 12 {
        10 => (
            "degraded",
            Some("elevated error rates; engineers are investigating"),
        ),
        11 => (
            "maintenance",
            Some("scheduled maintenance window in progress"),
        ),
        _ => ("operational", None),
    };

    match note {
        Some(note) => serde_json::json!({
            "service": service,
            "status": status,
            "note": note,
        }),
        None => serde_json::json!({
            "service": service,
            "status": status,
        }),
    }
}
