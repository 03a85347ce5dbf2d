//! Agent orchestrator: the decision points of the ordering pipeline.
//!
//! Every decision starts from plain rule checks. When an OpenAI deployment is
//! configured the agent attaches (or substitutes) a model-backed opinion; those
//! hooks answer with fixed scores until the deployment is wired up.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tracing::{info, warn};

use crate::config::AzureConfig;
use crate::models::{CateringFirm, Driver, Order, Payment};

/// Amounts closer than half a cent are considered equal.
const AMOUNT_TOLERANCE: f64 = 0.005;

#[derive(Debug, Clone, Serialize)]
pub struct OrderValidation {
    pub is_valid: bool,
    pub issues: Vec<String>,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_insights: Option<OrderInsights>,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderInsights {
    pub completeness_score: f64,
    pub anomaly_detected: bool,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingDecision {
    pub selected_firm_id: Option<String>,
    pub reason: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentValidation {
    pub is_valid: bool,
    pub risk_score: f64,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_fraud_check: Option<FraudCheck>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FraudCheck {
    pub fraud_probability: f64,
    pub risk_factors: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryPlan {
    pub assigned_driver_id: Option<String>,
    pub estimated_delivery_time: Option<DateTime<Utc>>,
    pub route: Option<String>,
    pub confidence: Option<f64>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub menu_item: String,
    pub reason: String,
    pub confidence: f64,
}

pub struct AgentOrchestrator {
    ai_configured: bool,
}

impl AgentOrchestrator {
    pub fn new(ai_configured: bool) -> Self {
        Self { ai_configured }
    }

    pub fn from_config(azure: &AzureConfig) -> Self {
        let ai_configured = azure.openai_configured();
        info!(
            azure_openai_configured = ai_configured,
            deployment = %azure.openai_deployment,
            api_version = %azure.openai_api_version,
            api_key_set = !azure.openai_api_key.is_empty(),
            "Agent orchestrator initialized"
        );
        Self::new(ai_configured)
    }

    // ── Orders ────────────────────────────────────────────────────────────────

    /// Completeness checks: a non-empty basket, a positive amount and an address.
    /// A total that disagrees with the item lines is flagged but not rejected.
    pub async fn validate_order(&self, order: &Order) -> OrderValidation {
        info!(order_id = %order.id, "Validating order");

        let mut issues = Vec::new();
        if order.items.is_empty() {
            issues.push("Order has no items".to_string());
        }
        if order.total_amount <= 0.0 {
            issues.push("Invalid order amount".to_string());
        }
        if order.delivery_address.trim().is_empty() {
            issues.push("No delivery address provided".to_string());
        }

        let mut recommendations = Vec::new();
        let subtotal = order.items_subtotal();
        if !order.items.is_empty() && (subtotal - order.total_amount).abs() >= AMOUNT_TOLERANCE {
            recommendations.push(format!(
                "Total {:.2} differs from item subtotal {:.2}",
                order.total_amount, subtotal
            ));
        }

        let ai_insights = if self.ai_configured {
            Some(self.ai_validate_order(order).await)
        } else {
            None
        };

        OrderValidation {
            is_valid: issues.is_empty(),
            issues,
            recommendations,
            ai_insights,
        }
    }

    /// Picks the firm that should fulfil `order`. A firm named on the order always wins.
    pub async fn route_order(&self, order: &Order, firms: &[CateringFirm]) -> RoutingDecision {
        info!(order_id = %order.id, candidates = firms.len(), "Routing order");

        if !order.catering_firm_id.trim().is_empty() {
            return RoutingDecision {
                selected_firm_id: Some(order.catering_firm_id.clone()),
                reason: "Customer specified firm".to_string(),
                confidence: 1.0,
            };
        }

        let Some(first) = firms.first() else {
            return RoutingDecision {
                selected_firm_id: None,
                reason: "No available catering firms".to_string(),
                confidence: 0.0,
            };
        };

        if self.ai_configured {
            return self.ai_route_order(order, firms).await;
        }

        RoutingDecision {
            selected_firm_id: Some(first.id.clone()),
            reason: "Default selection".to_string(),
            confidence: 0.7,
        }
    }

    // ── Payments ──────────────────────────────────────────────────────────────

    /// Fraud screening. With a known order the amount must match its total.
    pub async fn process_payment_validation(
        &self,
        order: Option<&Order>,
        payment: &Payment,
    ) -> PaymentValidation {
        info!(
            order_id = order.map(|o| o.id.as_str()).unwrap_or("None"),
            "Validating payment"
        );

        let mut validation = PaymentValidation {
            is_valid: true,
            risk_score: 0.0,
            recommendations: Vec::new(),
            ai_fraud_check: None,
        };

        if let Some(order) = order {
            if (payment.amount - order.total_amount).abs() >= AMOUNT_TOLERANCE {
                warn!(
                    order_id = %order.id,
                    expected = order.total_amount,
                    got = payment.amount,
                    "Payment amount mismatch"
                );
                validation.is_valid = false;
                validation
                    .recommendations
                    .push("Amount mismatch detected".to_string());
            }
        }

        if self.ai_configured {
            validation.ai_fraud_check = Some(self.ai_fraud_detection(order, payment).await);
        }

        validation
    }

    // ── Deliveries ────────────────────────────────────────────────────────────

    pub async fn optimize_delivery_route(&self, order: Option<&Order>, drivers: &[Driver]) -> DeliveryPlan {
        info!(
            order_id = order.map(|o| o.id.as_str()).unwrap_or("None"),
            drivers = drivers.len(),
            "Optimizing delivery"
        );

        let Some(driver) = drivers.first() else {
            return DeliveryPlan {
                assigned_driver_id: None,
                estimated_delivery_time: None,
                route: None,
                confidence: None,
                reason: Some("No available drivers".to_string()),
            };
        };

        if self.ai_configured {
            return self.ai_optimize_delivery(order, drivers).await;
        }

        DeliveryPlan {
            assigned_driver_id: Some(driver.id.clone()),
            estimated_delivery_time: Some(Utc::now() + Duration::minutes(30)),
            route: Some("optimal_route".to_string()),
            confidence: Some(0.8),
            reason: None,
        }
    }

    // ── Customers ─────────────────────────────────────────────────────────────

    pub async fn generate_recommendations(&self, customer_id: &str, history: &[Order]) -> Vec<Recommendation> {
        info!(customer_id, past_orders = history.len(), "Generating recommendations");

        if self.ai_configured {
            return self.ai_generate_recommendations(customer_id, history).await;
        }

        vec![Recommendation {
            menu_item: "Popular dish of the day".to_string(),
            reason: "Trending item".to_string(),
            confidence: 0.6,
        }]
    }

    // ── Model-backed hooks ────────────────────────────────────────────────────

    async fn ai_validate_order(&self, _order: &Order) -> OrderInsights {
        OrderInsights {
            completeness_score: 0.95,
            anomaly_detected: false,
            suggestions: Vec::new(),
        }
    }

    async fn ai_route_order(&self, _order: &Order, firms: &[CateringFirm]) -> RoutingDecision {
        RoutingDecision {
            selected_firm_id: firms.first().map(|f| f.id.clone()),
            reason: "AI-optimized selection based on capacity and rating".to_string(),
            confidence: 0.9,
        }
    }

    async fn ai_fraud_detection(&self, _order: Option<&Order>, _payment: &Payment) -> FraudCheck {
        FraudCheck {
            fraud_probability: 0.05,
            risk_factors: Vec::new(),
            recommendation: "approve".to_string(),
        }
    }

    async fn ai_optimize_delivery(&self, _order: Option<&Order>, drivers: &[Driver]) -> DeliveryPlan {
        DeliveryPlan {
            assigned_driver_id: drivers.first().map(|d| d.id.clone()),
            estimated_delivery_time: Some(Utc::now() + Duration::minutes(25)),
            route: Some("AI-optimized route".to_string()),
            confidence: Some(0.92),
            reason: None,
        }
    }

    async fn ai_generate_recommendations(&self, _customer_id: &str, _history: &[Order]) -> Vec<Recommendation> {
        vec![Recommendation {
            menu_item: "Recommended based on preferences".to_string(),
            reason: "AI analysis of order history".to_string(),
            confidence: 0.85,
        }]
    }
}
