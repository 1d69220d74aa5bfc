use super::tally_delivery;
use crate::error::HeraldError;
use crate::models::{ListingRecord, age_in_days, listing_fields};
use crate::notify::{DeliveryOutcome, MulticastNotifier};
use crate::notify::templates::{self, AgingStage};
use crate::store::{BatchWrite, Document, DocumentStore, MAX_BATCH_WRITES, Query};
use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

const AVAILABLE: &str = "Available";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepReport {
    pub pages: usize,
    pub scanned: usize,
    /// Listings that hit a reminder stage.
    pub matched: usize,
    pub delivered: usize,
    pub failed: usize,
    /// Documents that could not be decoded as listings.
    pub malformed: usize,
}

/// Reminds owners of `Available` listings whose status has gone unconfirmed
/// for 12 to 15 days.
#[derive(Clone)]
pub struct AgingSweep {
    store: Arc<dyn DocumentStore>,
    notifier: MulticastNotifier,
    listings: String,
    page_size: usize,
    persist_ages: bool,
}

impl AgingSweep {
    pub fn new(notifier: MulticastNotifier, listings_collection: &str) -> Self {
        Self {
            store: Arc::clone(notifier.store()),
            notifier,
            listings: listings_collection.to_string(),
            page_size: MAX_BATCH_WRITES,
            persist_ages: false,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_BATCH_WRITES);
        self
    }

    pub fn with_age_persistence(mut self, enabled: bool) -> Self {
        self.persist_ages = enabled;
        self
    }

    pub async fn run(&self) -> Result<SweepReport, HeraldError> {
        self.run_at(Utc::now().timestamp()).await
    }

    /// Sweeps the whole collection as of `now` (epoch seconds).
    ///
    /// Pages are read in id order until one comes back empty. Reminders are
    /// dispatched on their own tasks while scanning continues, and all of them
    /// are joined before this returns, including when a page read fails.
    pub async fn run_at(&self, now: i64) -> Result<SweepReport, HeraldError> {
        let mut report = SweepReport::default();
        let mut dispatches = JoinSet::new();
        let mut cursor: Option<String> = None;

        let scanned = loop {
            let query = Query::new()
                .start_after(cursor.clone())
                .limit(self.page_size);
            let page = match self.store.query(&self.listings, query).await {
                Ok(page) => page,
                Err(e) => break Err(e),
            };
            let Some(last) = page.last() else {
                break Ok(());
            };
            cursor = Some(last.id.clone());
            report.pages += 1;

            let mut ages = Vec::new();
            for doc in &page {
                report.scanned += 1;
                if let Some(write) = self.visit(doc, now, &mut report, &mut dispatches) {
                    ages.push(write);
                }
            }
            if self.persist_ages {
                self.persist(ages).await;
            }

            while let Some(joined) = dispatches.try_join_next() {
                tally_delivery(joined, &mut report.delivered, &mut report.failed);
            }
        };

        while let Some(joined) = dispatches.join_next().await {
            tally_delivery(joined, &mut report.delivered, &mut report.failed);
        }

        if let Err(e) = scanned {
            error!(
                collection = %self.listings,
                pages = report.pages,
                error = %e,
                "Aging sweep aborted"
            );
            return Err(e);
        }

        info!(
            pages = report.pages,
            scanned = report.scanned,
            matched = report.matched,
            delivered = report.delivered,
            failed = report.failed,
            malformed = report.malformed,
            "Aging sweep finished"
        );
        Ok(report)
    }

    /// Dispatches the reminder for one listing if it is due, and returns the
    /// computed ages to persist.
    fn visit(
        &self,
        doc: &Document,
        now: i64,
        report: &mut SweepReport,
        dispatches: &mut JoinSet<DeliveryOutcome>,
    ) -> Option<BatchWrite> {
        let listing: ListingRecord = match doc.decode() {
            Ok(listing) => listing,
            Err(e) => {
                report.malformed += 1;
                warn!(listing = %doc.id, error = %e, "Skipping malformed listing");
                return None;
            }
        };

        let age_of_status = age_in_days(now, listing.date_of_status_last_checked);
        let age_of_inventory = age_in_days(now, listing.date_of_inventory_added);

        let stage = age_of_status
            .filter(|_| listing.status.as_deref() == Some(AVAILABLE))
            .and_then(AgingStage::from_age);
        if let Some(stage) = stage {
            report.matched += 1;
            let owner = listing.cp_code.clone().unwrap_or_default();
            let message = templates::aging_reminder(
                stage,
                listing.name_of_the_property.as_deref().unwrap_or_default(),
                listing.property_id.as_deref().unwrap_or_default(),
            );
            info!(
                listing = %doc.id,
                owner = %owner,
                stage = stage.as_str(),
                "Dispatching aging reminder"
            );
            let notifier = self.notifier.clone();
            dispatches.spawn(async move { notifier.deliver(&owner, message).await });
        }

        if age_of_status.is_none() && age_of_inventory.is_none() {
            return None;
        }
        let mut fields = Map::new();
        if let Some(age) = age_of_inventory {
            fields.insert(listing_fields::AGE_OF_INVENTORY.to_string(), Value::from(age));
        }
        if let Some(age) = age_of_status {
            fields.insert(listing_fields::AGE_OF_STATUS.to_string(), Value::from(age));
        }
        Some(BatchWrite {
            id: doc.id.clone(),
            fields,
        })
    }

    async fn persist(&self, ages: Vec<BatchWrite>) {
        if ages.is_empty() {
            return;
        }
        let count = ages.len();
        if let Err(e) = self.store.batch_write(&self.listings, ages).await {
            warn!(
                collection = %self.listings,
                count,
                error = %e,
                "Failed to persist listing ages"
            );
        }
    }
}
