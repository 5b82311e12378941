//! Emergency contact alerting.
//!
//! Delivery is behind [`NotificationSink`]; this module only composes alert text and fans it
//! out to each contact's channels, collecting one [`DispatchResult`] per attempt. A failed
//! attempt never stops the remaining ones.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::Mutex;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct EmergencyContact {
    pub name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub relation: Option<String>,
}

/// Where the person raising the alert is, as far as we know.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct AlertLocation {
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyAlert {
    pub subject: String,
    pub body: String,
    /// Append ` - <contact name>` to each SMS body.
    #[serde(default)]
    pub sign_with_contact: bool,
}

impl EmergencyAlert {
    /// Full alert naming the user, the emergency type, time, location and severity.
    pub fn compose(
        user: &str,
        emergency_type: &str,
        location: Option<&AlertLocation>,
        severity: &str,
        at: DateTime<Utc>,
    ) -> Self {
        let mut body = String::from("🚨 EMERGENCY ALERT\n\n");
        let _ = writeln!(body, "User: {user}");
        let _ = writeln!(body, "Type: {emergency_type}");
        let _ = writeln!(body, "Time: {}", at.format("%I:%M %p on %B %d, %Y"));

        if let Some(location) = location {
            let address = location
                .address
                .as_deref()
                .unwrap_or("Location not available");
            let _ = writeln!(body, "Location: {address}");
            if let (Some(lat), Some(lng)) = (location.lat, location.lng) {
                let _ = writeln!(body, "Coordinates: {lat:.6}, {lng:.6}");
            }
        }

        let _ = writeln!(body, "\nSeverity: {}", severity.to_uppercase());
        body.push_str("Please respond immediately or call emergency services.");

        Self {
            subject: format!("🚨 EMERGENCY ALERT - {emergency_type}"),
            body,
            sign_with_contact: false,
        }
    }

    /// One-line alert. The SMS to each contact ends with their name, for example
    /// `EMERGENCY ALERT: Emergency assessment: CRITICAL - Sam`.
    pub fn short(message: &str) -> Self {
        Self {
            subject: "🚨 EMERGENCY ALERT".into(),
            body: format!("EMERGENCY ALERT: {message}"),
            sign_with_contact: true,
        }
    }

    /// SMS text for one contact.
    pub fn sms_body(&self, contact: &EmergencyContact) -> String {
        if self.sign_with_contact {
            format!("{} - {}", self.body, contact.name)
        } else {
            self.body.clone()
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("notification channel not configured: {0}")]
    NotConfigured(String),
    #[error("delivery failed: {0}")]
    Delivery(String),
}

pub type NotificationResult<T> = std::result::Result<T, NotificationError>;

/// Outbound delivery mechanism.
pub trait NotificationSink: Send + Sync {
    fn send_sms(&self, phone: &str, message: &str) -> NotificationResult<()>;
    fn send_email(&self, address: &str, subject: &str, message: &str) -> NotificationResult<()>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Channel {
    Sms,
    Email,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, utoipa::ToSchema)]
pub struct DispatchResult {
    pub contact: String,
    pub channel: Channel,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Send `alert` to every contact: SMS where a phone is known, email where an address is known.
pub fn notify_contacts(
    sink: &dyn NotificationSink,
    contacts: &[EmergencyContact],
    alert: &EmergencyAlert,
) -> Vec<DispatchResult> {
    if contacts.is_empty() {
        tracing::warn!("no emergency contacts configured");
        return Vec::new();
    }

    let mut results = Vec::new();
    for contact in contacts {
        if let Some(phone) = &contact.phone {
            let outcome = sink.send_sms(phone, &alert.sms_body(contact));
            results.push(record(contact, Channel::Sms, outcome));
        }
        if let Some(email) = &contact.email {
            let outcome = sink.send_email(email, &alert.subject, &alert.body);
            results.push(record(contact, Channel::Email, outcome));
        }
    }
    results
}

fn record(
    contact: &EmergencyContact,
    channel: Channel,
    outcome: NotificationResult<()>,
) -> DispatchResult {
    match outcome {
        Ok(()) => {
            tracing::info!("emergency contact notified: {} via {:?}", contact.name, channel);
            DispatchResult {
                contact: contact.name.clone(),
                channel,
                success: true,
                error: None,
            }
        }
        Err(e) => {
            tracing::warn!("failed to notify {} via {:?}: {}", contact.name, channel, e);
            DispatchResult {
                contact: contact.name.clone(),
                channel,
                success: false,
                error: Some(e.to_string()),
            }
        }
    }
}

/// Sink that only logs. Used where no delivery service is configured.
#[derive(Clone, Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn send_sms(&self, phone: &str, message: &str) -> NotificationResult<()> {
        tracing::info!(channel = "sms", recipient = phone, "{message}");
        Ok(())
    }

    fn send_email(&self, address: &str, subject: &str, message: &str) -> NotificationResult<()> {
        tracing::info!(channel = "email", recipient = address, subject, "{message}");
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub channel: Channel,
    pub recipient: String,
    pub subject: Option<String>,
    pub message: String,
}

/// Sink that keeps every message in memory.
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<SentNotification>>,
}

impl RecordingNotificationSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentNotification> {
        self.sent
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    fn push(&self, notification: SentNotification) -> NotificationResult<()> {
        self.sent
            .lock()
            .map_err(|_| NotificationError::Delivery("recording sink poisoned".into()))?
            .push(notification);
        Ok(())
    }
}

impl NotificationSink for RecordingNotificationSink {
    fn send_sms(&self, phone: &str, message: &str) -> NotificationResult<()> {
        self.push(SentNotification {
            channel: Channel::Sms,
            recipient: phone.into(),
            subject: None,
            message: message.into(),
        })
    }

    fn send_email(&self, address: &str, subject: &str, message: &str) -> NotificationResult<()> {
        self.push(SentNotification {
            channel: Channel::Email,
            recipient: address.into(),
            subject: Some(subject.into()),
            message: message.into(),
        })
    }
}
