//! Local stand-ins for the cloud integrations (Power Automate, Content Safety,
//! Blob Storage, Service Bus, Application Insights).
//!
//! Each service knows whether its endpoint is configured and logs it, but all of
//! them answer locally: workflows and safety checks return canned results, while
//! storage and the queue keep their data in process memory.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, warn, Level};

use crate::config::AzureConfig;
use crate::metrics::{MetricEntry, MetricsStore};
use crate::models::{Delivery, Order, Payment};

/// Every integration the handlers talk to, built once at startup.
pub struct Integrations {
    pub workflows: PowerAutomateService,
    pub content_safety: ContentSafetyService,
    pub storage: StorageService,
    pub service_bus: ServiceBusService,
    pub monitoring: MonitoringService,
}

impl Integrations {
    pub fn from_config(azure: &AzureConfig, metrics: Arc<RwLock<MetricsStore>>) -> Self {
        Self {
            workflows: PowerAutomateService::new(azure.power_automate_configured()),
            content_safety: ContentSafetyService::new(azure.content_safety_configured()),
            storage: StorageService::new(&azure.storage_container, azure.storage_configured()),
            service_bus: ServiceBusService::new(
                &azure.service_bus_queue,
                azure.service_bus_configured(),
            ),
            monitoring: MonitoringService::new(metrics, azure.monitoring_configured()),
        }
    }
}

// ── Power Automate ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowReceipt {
    pub workflow_id: String,
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

pub struct PowerAutomateService {
    configured: bool,
}

impl PowerAutomateService {
    pub fn new(configured: bool) -> Self {
        info!(configured, "Power Automate service ready");
        Self { configured }
    }

    fn trigger(&self, prefix: &str, id: &str) -> WorkflowReceipt {
        debug!(configured = self.configured, "Flow trigger is answered locally");
        WorkflowReceipt {
            workflow_id: format!("{}{}", prefix, id),
            status: "triggered".to_string(),
            timestamp: Utc::now(),
        }
    }

    pub async fn trigger_order_workflow(&self, order: &Order) -> WorkflowReceipt {
        info!(order_id = %order.id, "Triggering order workflow");
        self.trigger("workflow_", &order.id)
    }

    pub async fn trigger_payment_workflow(&self, payment: &Payment) -> WorkflowReceipt {
        info!(payment_id = %payment.id, "Triggering payment workflow");
        self.trigger("payment_workflow_", &payment.id)
    }

    pub async fn trigger_delivery_workflow(&self, delivery: &Delivery) -> WorkflowReceipt {
        info!(delivery_id = %delivery.id, "Triggering delivery workflow");
        self.trigger("delivery_workflow_", &delivery.id)
    }
}

// ── Content Safety ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SafetyAnalysis {
    pub is_safe: bool,
    pub categories: BTreeMap<String, u8>,
    pub severity: String,
}

pub struct ContentSafetyService {
    configured: bool,
}

impl ContentSafetyService {
    pub fn new(configured: bool) -> Self {
        info!(configured, "Content Safety service ready");
        Self { configured }
    }

    pub async fn analyze_text(&self, text: &str) -> SafetyAnalysis {
        debug!(chars = text.len(), configured = self.configured, "Analyzing text");
        let categories = ["hate", "self_harm", "sexual", "violence"]
            .into_iter()
            .map(|c| (c.to_string(), 0))
            .collect();
        SafetyAnalysis {
            is_safe: true,
            categories,
            severity: "safe".to_string(),
        }
    }
}

// ── Blob Storage ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub blob_name: String,
    pub status: String,
    pub url: String,
    pub timestamp: DateTime<Utc>,
}

/// Blobs are keyed by name and replaced on upload; the only writer stores one
/// signature per delivery, so the map grows with the deliveries table.
pub struct StorageService {
    container: String,
    configured: bool,
    blobs: RwLock<HashMap<String, serde_json::Value>>,
}

impl StorageService {
    pub fn new(container: &str, configured: bool) -> Self {
        info!(container, configured, "Storage service ready");
        Self {
            container: container.to_string(),
            configured,
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Stores `data` under `blob_name`, replacing any previous content.
    pub async fn upload_data(&self, blob_name: &str, data: serde_json::Value) -> UploadReceipt {
        info!(blob_name, configured = self.configured, "Uploading blob");
        self.blobs.write().await.insert(blob_name.to_string(), data);

        UploadReceipt {
            blob_name: blob_name.to_string(),
            status: "uploaded".to_string(),
            url: format!("https://storage.azure.com/{}/{}", self.container, blob_name),
            timestamp: Utc::now(),
        }
    }

    pub async fn download_data(&self, blob_name: &str) -> Option<serde_json::Value> {
        debug!(blob_name, "Downloading blob");
        self.blobs.read().await.get(blob_name).cloned()
    }
}

// ── Service Bus ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SendReceipt {
    pub message_id: String,
    pub status: String,
    pub queue: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueuedMessage {
    pub message_id: String,
    pub body: serde_json::Value,
    pub enqueued_at: DateTime<Utc>,
}

/// Messages kept before the oldest is dropped.
const MAX_QUEUED_MESSAGES: usize = 10_000;

pub struct ServiceBusService {
    queue: String,
    configured: bool,
    capacity: usize,
    messages: Mutex<VecDeque<QueuedMessage>>,
}

impl ServiceBusService {
    pub fn new(queue: &str, configured: bool) -> Self {
        info!(queue, configured, "Service Bus service ready");
        Self {
            queue: queue.to_string(),
            configured,
            capacity: MAX_QUEUED_MESSAGES,
            messages: Mutex::new(VecDeque::new()),
        }
    }

    pub fn queue_name(&self) -> &str {
        &self.queue
    }

    pub async fn send_message(&self, body: serde_json::Value) -> SendReceipt {
        let now = Utc::now();
        // Unix seconds with microsecond fraction.
        let message_id = format!("msg_{:.6}", now.timestamp_micros() as f64 / 1_000_000.0);

        info!(queue = %self.queue, %message_id, configured = self.configured, "Sending message");

        let mut messages = self.messages.lock().await;
        if messages.len() >= self.capacity {
            if let Some(dropped) = messages.pop_front() {
                warn!(
                    queue = %self.queue,
                    message_id = %dropped.message_id,
                    capacity = self.capacity,
                    "Queue full, dropping oldest message"
                );
            }
        }
        messages.push_back(QueuedMessage {
            message_id: message_id.clone(),
            body,
            enqueued_at: now,
        });
        drop(messages);

        SendReceipt {
            message_id,
            status: "sent".to_string(),
            queue: self.queue.clone(),
            timestamp: now,
        }
    }

    /// Drains up to `max_messages` in FIFO order.
    pub async fn receive_messages(&self, max_messages: usize) -> Vec<QueuedMessage> {
        let mut queue = self.messages.lock().await;
        let take = max_messages.min(queue.len());
        debug!(queue = %self.queue, take, "Receiving messages");
        queue.drain(..take).collect()
    }
}

// ── Monitoring ────────────────────────────────────────────────────────────────

pub struct MonitoringService {
    configured: bool,
    store: Arc<RwLock<MetricsStore>>,
}

impl MonitoringService {
    pub fn new(store: Arc<RwLock<MetricsStore>>, configured: bool) -> Self {
        info!(configured, "Monitoring service ready");
        Self { configured, store }
    }

    pub async fn log_metric(&self, name: &str, value: f64, properties: Option<serde_json::Value>) {
        debug!(metric = name, value, configured = self.configured, "Logging metric");
        self.store
            .write()
            .await
            .record(MetricEntry::new(name, value, properties));
    }

    pub async fn log_trace(&self, message: &str, severity: Level) {
        match severity {
            Level::ERROR => error!(trace = true, "{}", message),
            Level::WARN => warn!(trace = true, "{}", message),
            Level::INFO => info!(trace = true, "{}", message),
            _ => debug!(trace = true, "{}", message),
        }
    }
}
