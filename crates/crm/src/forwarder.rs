use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use leadline_core::{
    ChannelKind, ConversationKey, ExtractedLead, LeadForwardOutcome, LeadLedger, LeadSink,
    LeadSinkError,
};

use crate::client::CrmClient;

const SERVICE_PLACEHOLDER: &str = "Hizmat aniqlanmadi";

/// Multi-line record text for one CRM lead. Field order is fixed; a missing
/// service gets the placeholder rather than an empty line.
pub fn format_lead_record(lead: &ExtractedLead, channel: ChannelKind) -> String {
    format!(
        "Имя:{} \nНомер_телефона:{} \nУслуга:{} \nПлатформа: {}",
        lead.name,
        lead.phone,
        lead.service.as_deref().unwrap_or(SERVICE_PLACEHOLDER),
        channel.label(),
    )
}

/// [`LeadSink`] that claims the `(conversation, lead hash)` pair in the
/// ledger before touching the CRM. A pair that was already claimed is a
/// duplicate and produces no CRM call at all.
pub struct LeadForwarder {
    client: Arc<dyn CrmClient>,
    ledger: Arc<dyn LeadLedger>,
}

impl LeadForwarder {
    pub fn new(client: Arc<dyn CrmClient>, ledger: Arc<dyn LeadLedger>) -> Self {
        Self { client, ledger }
    }
}

#[async_trait]
impl LeadSink for LeadForwarder {
    async fn forward(
        &self,
        key: &ConversationKey,
        lead: &ExtractedLead,
        channel: ChannelKind,
    ) -> Result<LeadForwardOutcome, LeadSinkError> {
        let lead_hash = lead.content_hash();
        let claimed = self
            .ledger
            .claim(key, &lead_hash)
            .await
            .map_err(|error| LeadSinkError::Forward(error.to_string()))?;

        if !claimed {
            info!(conversation = %key, "lead already forwarded, skipping");
            return Ok(LeadForwardOutcome::Duplicate);
        }

        let record_text = format_lead_record(lead, channel);
        let record_id = self.client.create_lead(&record_text).await.map_err(|error| {
            warn!(conversation = %key, error = %error, "crm lead creation failed");
            LeadSinkError::Forward(error.to_string())
        })?;

        info!(conversation = %key, record_id = %record_id, "lead forwarded to crm");
        Ok(LeadForwardOutcome::Created { record_id })
    }
}
