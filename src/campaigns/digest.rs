use super::tally_delivery;
use crate::error::HeraldError;
use crate::models::{AgentRecord, ListingRecord, listing_fields};
use crate::notify::MulticastNotifier;
use crate::notify::templates;
use crate::store::{Document, DocumentStore, FilterOp, MAX_BATCH_WRITES, Query};
use ahash::AHashMap;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

const WINDOW_SECS: i64 = 86_400;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DigestReport {
    /// Micromarkets with both recent listings and interested agents.
    pub micromarkets: usize,
    pub recent_listings: usize,
    /// Recent listings without a micromarket; these never reach anyone.
    pub unassigned_listings: usize,
    pub dispatched: usize,
    pub delivered: usize,
    pub failed: usize,
}

struct Subscriber {
    key: String,
    name: Option<String>,
}

/// Tells agents how many listings appeared in their preferred micromarket
/// over the last 24 hours.
#[derive(Clone)]
pub struct MicromarketDigest {
    store: Arc<dyn DocumentStore>,
    notifier: MulticastNotifier,
    agents: String,
    listings: String,
    page_size: usize,
}

impl MicromarketDigest {
    pub fn new(
        notifier: MulticastNotifier,
        agents_collection: &str,
        listings_collection: &str,
    ) -> Self {
        Self {
            store: Arc::clone(notifier.store()),
            notifier,
            agents: agents_collection.to_string(),
            listings: listings_collection.to_string(),
            page_size: MAX_BATCH_WRITES,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.clamp(1, MAX_BATCH_WRITES);
        self
    }

    pub async fn run(&self) -> Result<DigestReport, HeraldError> {
        self.run_at(Utc::now().timestamp()).await
    }

    pub async fn run_at(&self, now: i64) -> Result<DigestReport, HeraldError> {
        let subscribers = self.subscribers().await?;
        let (counts, unassigned) = self.recent_counts(now).await?;

        let mut report = DigestReport {
            recent_listings: counts.values().sum::<usize>() + unassigned,
            unassigned_listings: unassigned,
            ..DigestReport::default()
        };
        if unassigned > 0 {
            debug!(count = unassigned, "Recent listings without a micromarket");
        }

        let mut dispatches = JoinSet::new();
        for (micromarket, count) in &counts {
            let Some(agents) = subscribers.get(micromarket) else {
                debug!(micromarket = %micromarket, count, "No agents follow micromarket");
                continue;
            };
            report.micromarkets += 1;
            for agent in agents {
                let message =
                    templates::micromarket_digest(agent.name.as_deref(), micromarket, *count);
                let notifier = self.notifier.clone();
                let key = agent.key.clone();
                dispatches.spawn(async move { notifier.deliver(&key, message).await });
                report.dispatched += 1;
            }
        }
        for (micromarket, agents) in &subscribers {
            if !counts.contains_key(micromarket) {
                debug!(
                    micromarket = %micromarket,
                    agents = agents.len(),
                    "No new listings in micromarket"
                );
            }
        }

        while let Some(joined) = dispatches.join_next().await {
            tally_delivery(joined, &mut report.delivered, &mut report.failed);
        }

        info!(
            micromarkets = report.micromarkets,
            recent = report.recent_listings,
            unassigned = report.unassigned_listings,
            dispatched = report.dispatched,
            delivered = report.delivered,
            failed = report.failed,
            "Micromarket digest finished"
        );
        Ok(report)
    }

    /// Micromarket → agents preferring it. Agents without a key or a
    /// preference are skipped.
    async fn subscribers(&self) -> Result<AHashMap<String, Vec<Subscriber>>, HeraldError> {
        let mut by_micromarket: AHashMap<String, Vec<Subscriber>> = AHashMap::new();
        for doc in self.scan(&self.agents, Query::new()).await? {
            let agent: AgentRecord = match doc.decode() {
                Ok(agent) => agent,
                Err(e) => {
                    warn!(agent = %doc.id, error = %e, "Skipping malformed agent");
                    continue;
                }
            };
            let (Some(key), Some(micromarket)) = (
                agent.cp_id.filter(|k| !k.is_empty()),
                agent.preferred_micromarket.filter(|m| !m.is_empty()),
            ) else {
                continue;
            };
            by_micromarket.entry(micromarket).or_default().push(Subscriber {
                key,
                name: agent.name,
            });
        }
        Ok(by_micromarket)
    }

    /// Listings added in the last 24 hours per micromarket, plus the number
    /// with no micromarket.
    async fn recent_counts(
        &self,
        now: i64,
    ) -> Result<(AHashMap<String, usize>, usize), HeraldError> {
        let since = now - WINDOW_SECS;
        // The store filter only narrows the scan; the window is enforced on
        // the decoded timestamp so string and float representations count too.
        let query = Query::new().filter(listing_fields::ADDED_AT, FilterOp::Gte, since);

        let mut counts: AHashMap<String, usize> = AHashMap::new();
        let mut unassigned = 0;
        for doc in self.scan(&self.listings, query).await? {
            let Ok(listing) = doc.decode::<ListingRecord>() else {
                warn!(listing = %doc.id, "Skipping malformed listing");
                continue;
            };
            if !listing
                .date_of_inventory_added
                .is_some_and(|added| added >= since && added <= now)
            {
                continue;
            }
            match listing.micromarket.filter(|m| !m.is_empty()) {
                Some(micromarket) => *counts.entry(micromarket).or_default() += 1,
                None => unassigned += 1,
            }
        }
        Ok((counts, unassigned))
    }

    async fn scan(&self, collection: &str, base: Query) -> Result<Vec<Document>, HeraldError> {
        let mut docs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let query = base.clone().start_after(cursor.take()).limit(self.page_size);
            let page = self.store.query(collection, query).await?;
            let Some(last) = page.last() else {
                break;
            };
            cursor = Some(last.id.clone());
            docs.extend(page);
        }
        Ok(docs)
    }
}
