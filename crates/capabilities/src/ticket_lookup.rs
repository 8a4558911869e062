//! Ticket lookup capability — stub that returns mock ticket data.
//!
//! In production this would query the ticketing backend. The stub derives
//! plausible ticket state from the ticket id so the full loop can be
//! exercised end-to-end without backend access.

use async_trait::async_trait;
use triagent_core::{Capability, CapabilityError, InvocationContext, InvocationResult};

pub struct TicketLookupCapability;

#[async_trait]
impl Capability for TicketLookupCapability {
    fn name(&self) -> &str {
        "ticket_lookup"
    }

    fn description(&self) -> &str {
        "Look up a support ticket by id. Returns status, priority, subject, and assignment."
    }

    fn input_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "ticket_id": {
                    "type": "string",
                    "description": "The ticket identifier, e.g. TKT-4821"
                }
            },
            "required": ["ticket_id"]
        })
    }

    async fn invoke(
        &self,
        arguments: serde_json::Value,
        _ctx: &InvocationContext,
    ) -> std::result::Result<InvocationResult, CapabilityError> {
        let ticket_id = arguments["ticket_id"]
            .as_str()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                CapabilityError::InvalidArguments("Missing 'ticket_id' argument".into())
            })?;

        let ticket = generate_mock_ticket(ticket_id);
        Ok(InvocationResult::ok(
            serde_json::to_value(&ticket).map_err(|e| CapabilityError::InvocationFailed {
                capability: "ticket_lookup".into(),
                reason: e.to_string(),
            })?,
        ))
    }
}

#[derive(serde::Serialize)]
struct TicketData {
    ticket_id: String,
    status: String,
    priority: String,
    subject: String,
    assigned_team: String,
    updated_hours_ago: u32,
    message_count: u32,
}

/// Generate deterministic mock ticket state from the id.
fn generate_mock_ticket(ticket_id: &str) -> TicketData {
    // Simple hash for deterministic but varied results.
    let hash: u32 = ticket_id
        .bytes()
        .fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));

    let statuses = ["open", "pending_customer", "pending_agent", "resolved", "closed"];
    let priorities = ["low", "normal", "high", "urgent"];
    let subjects = [
        "Cannot log in after password reset",
        "Webhook deliveries failing with 401",
        "OAuth2 token exchange returns invalid_grant",
        "Billing invoice missing for last month",
        "API rate limit hit during nightly sync",
        "SSO login loops back to the sign-in page",
    ];
    let teams = ["identity", "integrations", "billing", "platform"];

    TicketData {
        ticket_id: ticket_id.to_string(),
        status: statuses[(hash as usize) % statuses.len()].to_string(),
        priority: priorities[(hash as usize / 5) % priorities.len()].to_string(),
        subject: subjects[(hash as usize / 7) % subjects.len()].to_string(),
        assigned_team: teams[(hash as usize / 11) % teams.len()].to_string(),
        updated_hours_ago: hash % 72,
        message_count: 1 + hash % 9,
    }
}
