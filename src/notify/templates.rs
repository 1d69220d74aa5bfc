//! Event → notification text.

use super::NotificationMessage;
use std::fmt;

const FALLBACK_BUYER_NAME: &str = "An agent";
const FALLBACK_GREETING_NAME: &str = "there";

pub fn listing_published(property_name: &str, property_id: &str) -> NotificationMessage {
    NotificationMessage::new(
        "Listing Live!",
        format!("Your listing for {property_name} is now live {property_id}."),
    )
    .with_data("event", "listing_published")
    .with_data("propertyId", property_id)
}

/// QC outcome of a submitted listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QcStatus {
    Available,
    Duplicate,
    Primary,
    Rejected,
    Pending,
    Other(String),
}

impl QcStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw {
            Some("available") => QcStatus::Available,
            Some("duplicate") => QcStatus::Duplicate,
            Some("primary") => QcStatus::Primary,
            Some("rejected") => QcStatus::Rejected,
            Some("pending") => QcStatus::Pending,
            other => QcStatus::Other(other.unwrap_or_default().to_string()),
        }
    }
}

impl fmt::Display for QcStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QcStatus::Available => f.write_str("available"),
            QcStatus::Duplicate => f.write_str("duplicate"),
            QcStatus::Primary => f.write_str("primary"),
            QcStatus::Rejected => f.write_str("rejected"),
            QcStatus::Pending => f.write_str("pending"),
            QcStatus::Other(raw) => f.write_str(raw),
        }
    }
}

/// `None` for `available`: listing-live is announced by the publish event instead.
pub fn qc_status(
    status: &QcStatus,
    property_name: &str,
    qc_id: &str,
) -> Option<NotificationMessage> {
    let (title, body) = match status {
        QcStatus::Available => return None,
        // TODO: pending reuses the duplicate copy; needs its own text once product confirms it.
        QcStatus::Duplicate | QcStatus::Pending => (
            "Duplicate Listing Detected",
            format!("This unit in {property_name} is already listed by another agent"),
        ),
        QcStatus::Primary => (
            "Primary Property Detected",
            "ACN only lists resale inventories. If this is an error, contact KAM.".to_string(),
        ),
        QcStatus::Rejected => (
            "Listing Rejected",
            format!("Your listing for {property_name} was rejected."),
        ),
        QcStatus::Other(_) => (
            "Listing Submitted!",
            format!("Your listing for {property_name} is under review."),
        ),
    };
    Some(
        NotificationMessage::new(title, body)
            .with_data("event", "qc_status")
            .with_data("qcStatus", status.to_string())
            .with_data("qcId", qc_id),
    )
}

pub fn enquiry_sent(property_id: &str, enquiry_id: &str) -> NotificationMessage {
    NotificationMessage::new(
        "Enquiry Sent to Agent!",
        format!(
            "You\u{2019}ve enquired about {property_id}. Check \u{201c}My Enquiries\u{201d} to track status."
        ),
    )
    .with_data("event", "enquiry_sent")
    .with_data("propertyId", property_id)
    .with_data("enquiryId", enquiry_id)
}

pub fn enquiry_received(
    buyer_name: Option<&str>,
    property_name: &str,
    property_id: &str,
    enquiry_id: &str,
) -> NotificationMessage {
    let buyer = buyer_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_BUYER_NAME);
    NotificationMessage::new(
        "New Enquiry Received!",
        format!("{buyer} enquired about {property_name} {property_id}."),
    )
    .with_data("event", "enquiry_received")
    .with_data("propertyId", property_id)
    .with_data("enquiryId", enquiry_id)
}

/// Reminder stage for an `Available` listing whose status has not been
/// re-confirmed, keyed by days since the last check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgingStage {
    ThreeDaysLeft,
    TwoDaysLeft,
    HiddenTomorrow,
    HiddenNow,
}

impl AgingStage {
    pub fn from_age(age_of_status: i64) -> Option<Self> {
        match age_of_status {
            12 => Some(AgingStage::ThreeDaysLeft),
            13 => Some(AgingStage::TwoDaysLeft),
            14 => Some(AgingStage::HiddenTomorrow),
            15 => Some(AgingStage::HiddenNow),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AgingStage::ThreeDaysLeft => "three_days_left",
            AgingStage::TwoDaysLeft => "two_days_left",
            AgingStage::HiddenTomorrow => "hidden_tomorrow",
            AgingStage::HiddenNow => "hidden_now",
        }
    }
}

pub fn aging_reminder(
    stage: AgingStage,
    property_name: &str,
    property_id: &str,
) -> NotificationMessage {
    let (title, body) = match stage {
        AgingStage::ThreeDaysLeft => (
            "3 days left to confirm your listing",
            format!(
                "Your listing for {property_name} {property_id} will be hidden in 3 days. Confirm it is still available to keep it live."
            ),
        ),
        AgingStage::TwoDaysLeft => (
            "2 days left to confirm your listing",
            format!(
                "Your listing for {property_name} {property_id} will be hidden in 2 days. Confirm it is still available to keep it live."
            ),
        ),
        AgingStage::HiddenTomorrow => (
            "Listing will be hidden tomorrow",
            format!(
                "Your listing for {property_name} {property_id} will be hidden tomorrow. Confirm it is still available to keep it live."
            ),
        ),
        AgingStage::HiddenNow => (
            "Listing hidden",
            format!(
                "Your listing for {property_name} {property_id} is now hidden. Confirm it is still available to make it live again."
            ),
        ),
    };
    NotificationMessage::new(title, body)
        .with_data("event", "aging_reminder")
        .with_data("stage", stage.as_str())
        .with_data("propertyId", property_id)
}

pub fn micromarket_digest(
    agent_name: Option<&str>,
    micromarket: &str,
    count: usize,
) -> NotificationMessage {
    let name = agent_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(FALLBACK_GREETING_NAME);
    let noun = if count == 1 { "property" } else { "properties" };
    NotificationMessage::new(
        format!("{count} new {noun} in {micromarket}"),
        format!("Hi {name}, {count} new {noun} added in {micromarket} in the last 24 hours."),
    )
    .with_data("event", "micromarket_digest")
    .with_data("micromarket", micromarket)
    .with_data("count", count.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn available_produces_no_notification() {
        assert_eq!(qc_status(&QcStatus::Available, "Skyline", "qc1"), None);
    }

    #[test]
    fn duplicate_and_pending_share_text() {
        let dup = qc_status(&QcStatus::Duplicate, "Skyline", "qc1").expect("message");
        let pending = qc_status(&QcStatus::Pending, "Skyline", "qc1").expect("message");
        assert_eq!(dup.title, pending.title);
        assert_eq!(dup.body.as_bytes(), pending.body.as_bytes());
    }

    #[test]
    fn unknown_status_falls_through_to_under_review() {
        let status = QcStatus::parse(Some("escalated"));
        assert_eq!(status, QcStatus::Other("escalated".to_string()));
        let msg = qc_status(&status, "Skyline", "qc1").expect("message");
        assert_eq!(msg.title, "Listing Submitted!");
        assert_eq!(msg.body, "Your listing for Skyline is under review.");

        assert_eq!(QcStatus::parse(None), QcStatus::Other(String::new()));
    }

    #[test]
    fn enquiry_received_falls_back_to_generic_buyer() {
        let msg = enquiry_received(None, "Skyline", "P-7", "e1");
        assert_eq!(msg.body, "An agent enquired about Skyline P-7.");

        let msg = enquiry_received(Some("  "), "Skyline", "P-7", "e1");
        assert_eq!(msg.body, "An agent enquired about Skyline P-7.");

        let msg = enquiry_received(Some("Riya"), "Skyline", "P-7", "e1");
        assert_eq!(msg.body, "Riya enquired about Skyline P-7.");
    }

    #[test]
    fn aging_stages_cover_twelve_to_fifteen() {
        assert_eq!(AgingStage::from_age(11), None);
        assert_eq!(AgingStage::from_age(12), Some(AgingStage::ThreeDaysLeft));
        assert_eq!(AgingStage::from_age(13), Some(AgingStage::TwoDaysLeft));
        assert_eq!(AgingStage::from_age(14), Some(AgingStage::HiddenTomorrow));
        assert_eq!(AgingStage::from_age(15), Some(AgingStage::HiddenNow));
        assert_eq!(AgingStage::from_age(16), None);
    }

    #[test]
    fn digest_pluralizes() {
        let one = micromarket_digest(Some("Riya"), "Whitefield", 1);
        assert_eq!(one.title, "1 new property in Whitefield");
        assert_eq!(
            one.body,
            "Hi Riya, 1 new property added in Whitefield in the last 24 hours."
        );
        let many = micromarket_digest(None, "Whitefield", 4);
        assert_eq!(
            many.body,
            "Hi there, 4 new properties added in Whitefield in the last 24 hours."
        );
    }
}
