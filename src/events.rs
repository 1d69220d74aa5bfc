//! Notification flows triggered by changes to listing, QC and enquiry records.

use crate::config::CollectionsConfig;
use crate::error::HeraldError;
use crate::models::{
    AgentRecord, EnquiryRecord, ListingRecord, QcRecord, agent_fields, listing_fields,
};
use crate::notify::templates::{self, QcStatus};
use crate::notify::{DeliveryOutcome, MulticastNotifier};
use crate::store::{Document, DocumentStore, FieldOp, Query};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Result of a QC status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum QcOutcome {
    /// `available`: nothing is sent for this status.
    #[serde(rename_all = "camelCase")]
    Skipped { qc_status: String },
    #[serde(rename_all = "camelCase")]
    Delivered {
        qc_status: String,
        delivery: DeliveryOutcome,
    },
}

/// What happened to the notification for the listing's owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "delivery", rename_all = "camelCase")]
pub enum SellerOutcome {
    Notified(DeliveryOutcome),
    /// No listing with the enquired business id, or it has no owner.
    SellerNotFound,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnquiryOutcome {
    pub buyer: DeliveryOutcome,
    pub seller: SellerOutcome,
    pub credits_charged: bool,
    /// Enquirer's balance after charging; `None` when not charged or the charge failed.
    pub credits_remaining: Option<i64>,
}

#[derive(Clone)]
pub struct EventService {
    store: Arc<dyn DocumentStore>,
    notifier: MulticastNotifier,
    collections: CollectionsConfig,
    charge_enquiry_credits: bool,
}

impl EventService {
    pub fn new(notifier: MulticastNotifier, collections: CollectionsConfig) -> Self {
        Self {
            store: Arc::clone(notifier.store()),
            notifier,
            collections,
            charge_enquiry_credits: false,
        }
    }

    pub fn with_credit_charging(mut self, enabled: bool) -> Self {
        self.charge_enquiry_credits = enabled;
        self
    }

    pub async fn publish_listing(&self, listing_id: &str) -> Result<DeliveryOutcome, HeraldError> {
        let doc = self.fetch(&self.collections.listings, listing_id).await?;
        let listing: ListingRecord = doc.decode()?;

        let owner = listing.cp_code.unwrap_or_default();
        let message = templates::listing_published(
            listing.name_of_the_property.as_deref().unwrap_or_default(),
            listing.property_id.as_deref().unwrap_or_default(),
        );
        info!(listing = %listing_id, owner = %owner, "Announcing published listing");
        Ok(self.notifier.deliver(&owner, message).await)
    }

    pub async fn qc_status_changed(&self, qc_id: &str) -> Result<QcOutcome, HeraldError> {
        let doc = self.fetch(&self.collections.qc, qc_id).await?;
        let qc: QcRecord = doc.decode()?;

        let status = QcStatus::parse(qc.qc_status.as_deref());
        let Some(message) = templates::qc_status(
            &status,
            qc.name_of_the_property.as_deref().unwrap_or_default(),
            qc_id,
        ) else {
            info!(qc = %qc_id, status = %status, "QC status needs no notification");
            return Ok(QcOutcome::Skipped {
                qc_status: status.to_string(),
            });
        };

        let owner = qc.cp_code.unwrap_or_default();
        info!(qc = %qc_id, owner = %owner, status = %status, "Notifying QC status change");
        let delivery = self.notifier.deliver(&owner, message).await;
        Ok(QcOutcome::Delivered {
            qc_status: status.to_string(),
            delivery,
        })
    }

    /// Confirms the enquiry to the enquirer, then tells the listing's owner.
    pub async fn enquiry_received(&self, enquiry_id: &str) -> Result<EnquiryOutcome, HeraldError> {
        let doc = self.fetch(&self.collections.enquiries, enquiry_id).await?;
        let enquiry: EnquiryRecord = doc.decode()?;
        let buyer_key = enquiry.cp_id.unwrap_or_default();
        let property_id = enquiry.property_id.unwrap_or_default();

        let buyer = self
            .notifier
            .deliver(&buyer_key, templates::enquiry_sent(&property_id, enquiry_id))
            .await;
        info!(enquiry = %enquiry_id, buyer = %buyer_key, sent = buyer.sent, "Buyer notified");

        let (credits_charged, credits_remaining) = if self.charge_enquiry_credits {
            match self.charge_credit(&buyer_key).await {
                Ok(remaining) => (true, remaining),
                Err(_) => (false, None),
            }
        } else {
            (false, None)
        };

        // Query with the stored representation so numeric ids still match.
        let raw_property_id = doc
            .get(listing_fields::PROPERTY_ID)
            .cloned()
            .unwrap_or(Value::Null);
        let listing = self
            .first_match(
                &self.collections.listings,
                listing_fields::PROPERTY_ID,
                raw_property_id,
            )
            .await?
            .map(|d| d.decode::<ListingRecord>())
            .transpose()?;

        let seller = match listing.and_then(|l| l.cp_code.zip(l.name_of_the_property)) {
            Some((seller_key, property_name)) => {
                let buyer_name = self.buyer_name(&buyer_key).await?;
                let message = templates::enquiry_received(
                    buyer_name.as_deref(),
                    &property_name,
                    &property_id,
                    enquiry_id,
                );
                let delivery = self.notifier.deliver(&seller_key, message).await;
                info!(
                    enquiry = %enquiry_id,
                    seller = %seller_key,
                    sent = delivery.sent,
                    "Seller notified"
                );
                SellerOutcome::Notified(delivery)
            }
            None => {
                warn!(
                    enquiry = %enquiry_id,
                    property = %property_id,
                    "Property not found for enquiry"
                );
                SellerOutcome::SellerNotFound
            }
        };

        Ok(EnquiryOutcome {
            buyer,
            seller,
            credits_charged,
            credits_remaining,
        })
    }

    async fn fetch(&self, collection: &str, id: &str) -> Result<Document, HeraldError> {
        self.store
            .get(collection, id)
            .await?
            .ok_or_else(|| HeraldError::not_found(collection, id))
    }

    async fn first_match(
        &self,
        collection: &str,
        field: &str,
        value: Value,
    ) -> Result<Option<Document>, HeraldError> {
        if value.is_null() {
            return Ok(None);
        }
        let mut docs = self
            .store
            .query(collection, Query::new().eq(field, value).limit(1))
            .await?;
        Ok(docs.pop())
    }

    async fn buyer_name(&self, buyer_key: &str) -> Result<Option<String>, HeraldError> {
        let agent = self
            .first_match(
                &self.collections.agents,
                agent_fields::KEY,
                Value::from(buyer_key),
            )
            .await?
            .map(|d| d.decode::<AgentRecord>())
            .transpose()?;
        Ok(agent.and_then(|a| a.name))
    }

    /// Balance may go negative. It is read from the document the update wrote.
    async fn charge_credit(&self, agent_key: &str) -> Result<Option<i64>, HeraldError> {
        let op = FieldOp::Increment(agent_fields::ENQUIRY_CREDITS.to_string(), -1);

        let charged = async {
            let doc = self
                .store
                .update(&self.collections.agents, agent_key, vec![op])
                .await?;
            Ok::<_, HeraldError>(doc.decode::<AgentRecord>()?.inbound_enquiry_credits)
        };

        charged
            .await
            .inspect(|remaining| {
                info!(agent = %agent_key, remaining = ?remaining, "Charged enquiry credit");
            })
            .inspect_err(|e| {
                warn!(agent = %agent_key, error = %e, "Failed to charge enquiry credit");
            })
    }
}
