//! Threema notifications.

use anyhow::anyhow;
use threema_gateway::{ApiBuilder, E2eApi, RecipientKey};
use tracing::info;

use crate::config::Threema;

pub struct Notifier {
    api: E2eApi,
    recipients: Vec<String>,
}

impl Notifier {
    pub fn new(config: Threema) -> anyhow::Result<Self> {
        let api = ApiBuilder::new(config.gateway_id, config.gateway_secret)
            .with_private_key(config.private_key)
            .into_e2e()
            .map_err(|e| anyhow!("Could not create Threema API: {:?}", e))?;
        Ok(Self {
            api,
            recipients: config.recipients,
        })
    }

    /// Send an end-to-end encrypted text message to every recipient.
    pub async fn send(&self, text: &str) -> anyhow::Result<()> {
        for recipient in &self.recipients {
            let public_key = self
                .api
                .lookup_pubkey(recipient)
                .await
                .map_err(|e| anyhow!("Could not fetch public key for {}: {:?}", recipient, e))?;
            let recipient_key: RecipientKey = public_key.into();
            let encrypted = self.api.encrypt_text_msg(text, &recipient_key);
            let msg_id = self
                .api
                .send(recipient, &encrypted, false)
                .await
                .map_err(|e| anyhow!("Could not send message to {}: {:?}", recipient, e))?;
            info!(%recipient, %msg_id, "Sent notification");
        }
        Ok(())
    }
}
