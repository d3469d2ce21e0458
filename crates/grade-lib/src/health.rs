//! Component health and readiness
//!
//! The service tracks two components: the model snapshot and the model
//! registry. Readiness follows the model alone; a registry outage only
//! degrades the overall status because the local model file still serves.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Still serving, with a problem worth surfacing
    Degraded,
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_operational(&self) -> bool {
        !matches!(self, ComponentStatus::Unhealthy)
    }
}

/// Tracked service components
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Model,
    Registry,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Overall status plus per-component detail
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: BTreeMap<Component, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Shared component health table. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    components: Arc<RwLock<BTreeMap<Component, ComponentHealth>>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, component: Component, status: ComponentStatus, message: Option<String>) {
        let mut components = self
            .components
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        components.insert(
            component,
            ComponentHealth {
                status,
                message,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn healthy(&self, component: Component) {
        self.set(component, ComponentStatus::Healthy, None);
    }

    pub fn degraded(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Degraded, Some(message.into()));
    }

    pub fn unhealthy(&self, component: Component, message: impl Into<String>) {
        self.set(component, ComponentStatus::Unhealthy, Some(message.into()));
    }

    /// Last reported status, or None if the component never reported
    pub fn status(&self, component: Component) -> Option<ComponentStatus> {
        self.components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&component)
            .map(|h| h.status)
    }

    /// Overall status is the worst component status
    pub fn health(&self) -> HealthResponse {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        let status = components
            .values()
            .map(|h| h.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy);

        HealthResponse { status, components }
    }

    /// Ready while a model snapshot is serving
    pub fn readiness(&self) -> ReadinessResponse {
        let components = self
            .components
            .read()
            .unwrap_or_else(PoisonError::into_inner);

        match components.get(&Component::Model) {
            Some(model) if model.status.is_operational() => ReadinessResponse {
                ready: true,
                reason: None,
            },
            Some(model) => ReadinessResponse {
                ready: false,
                reason: model.message.clone(),
            },
            None => ReadinessResponse {
                ready: false,
                reason: Some("Model not loaded".to_string()),
            },
        }
    }
}
