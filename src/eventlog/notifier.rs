//! Webhook alerts for unknown devices

use anyhow::{Context, Result, anyhow};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::NOTIFY_TIMEOUT;
use crate::database::{Classification, EventKind, EventRecord};

/// JSON body posted to the alert endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// Local time, `%Y-%m-%dT%H:%M:%S`
    pub timestamp: String,
    #[serde(rename = "eventDescription")]
    pub event_description: String,
}

impl AlertPayload {
    pub fn from_event(event: &EventRecord) -> Self {
        Self {
            timestamp: event
                .timestamp
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%dT%H:%M:%S")
                .to_string(),
            event_description: event.description(),
        }
    }
}

/// Posts an alert when an unregistered device connects
#[derive(Debug, Clone)]
pub struct AlertNotifier {
    url: String,
    client: Client,
}

impl AlertNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(NOTIFY_TIMEOUT)
            .build()
            .context("Failed to build alert HTTP client")?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Only unregistered connects raise alerts
    pub fn should_alert(event: &EventRecord) -> bool {
        event.kind == EventKind::Connect && event.classification == Classification::Unregistered
    }

    /// POST the alert for `event` regardless of its kind
    pub async fn send(&self, event: &EventRecord) -> Result<()> {
        let payload = AlertPayload::from_event(event);
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .with_context(|| format!("Failed to reach alert endpoint {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Alert endpoint returned {}: {}", status, body));
        }
        Ok(())
    }

    /// Alert for `event` if it qualifies. Failures are logged, never returned.
    ///
    /// Returns true when an alert was delivered.
    pub async fn notify(&self, event: &EventRecord) -> bool {
        if !Self::should_alert(event) {
            return false;
        }
        match self.send(event).await {
            Ok(()) => {
                crate::log_info!("Alert sent for unknown device {}", event.mac);
                true
            }
            Err(e) => {
                crate::log_warn!("Alert for {} not delivered: {:#}", event.mac, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    fn event(kind: EventKind, classification: Classification) -> EventRecord {
        EventRecord {
            id: 7,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap(),
            mac: "da:a1:19:00:00:01".to_string(),
            kind,
            classification,
            device_name: None,
            ip: Some("192.168.1.77".to_string()),
        }
    }

    #[test]
    fn payload_uses_camel_case_description_field() {
        let payload = AlertPayload::from_event(&event(EventKind::Connect, Classification::Unregistered));
        let json = serde_json::to_value(&payload).unwrap();

        assert!(json.get("timestamp").is_some());
        assert_eq!(
            json["eventDescription"],
            "Unknown device detected on network. Device IP: 192.168.1.77, Device MAC: da:a1:19:00:00:01"
        );
    }

    #[test]
    fn only_unregistered_connects_alert() {
        assert!(AlertNotifier::should_alert(&event(EventKind::Connect, Classification::Unregistered)));
        assert!(!AlertNotifier::should_alert(&event(EventKind::Connect, Classification::Registered)));
        assert!(!AlertNotifier::should_alert(&event(EventKind::Disconnect, Classification::Unregistered)));
    }

    #[tokio::test]
    async fn notify_posts_json_to_endpoint() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if String::from_utf8_lossy(&request).contains("eventDescription") {
                    break;
                }
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&request).to_string()
        });

        let notifier = AlertNotifier::new(format!("http://{}/alerts", addr)).unwrap();
        let delivered = notifier
            .notify(&event(EventKind::Connect, Classification::Unregistered))
            .await;

        let request = server.await.unwrap();
        assert!(delivered);
        assert!(request.starts_with("POST /alerts"));
        assert!(request.contains("Device MAC: da:a1:19:00:00:01"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_not_fatal() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = AlertNotifier::new(format!("http://{}/alerts", addr)).unwrap();
        let event = event(EventKind::Connect, Classification::Unregistered);

        assert!(notifier.send(&event).await.is_err());
        assert!(!notifier.notify(&event).await);
    }
}
