//! Test doubles and common utilities for reconciler contract tests
//!
//! [`ScriptedClient`] is an in-memory stand-in for the remote API: it stores
//! whatever is PUT, assigns identifiers the way the real provider does and
//! reports provisioning states from a script.

#![allow(dead_code)]

use async_trait::async_trait;
use lbsync_core::error::{Error, Result};
use lbsync_core::model;
use lbsync_core::resource::{
    BackendAddressPool, FrontendIpConfiguration, InboundNatRule, LoadBalancer, LoadBalancingRule,
    Probe,
};
use lbsync_core::{ReconcileEvent, Reconciler, ResourceId};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub const SUBSCRIPTION: &str = "00000000-0000-0000-0000-000000000000";

/// In-memory remote with call counters and a provisioning-state script
#[derive(Default)]
pub struct ScriptedClient {
    resources: Mutex<HashMap<(String, String), model::LoadBalancer>>,
    statuses: Mutex<VecDeque<String>>,
    puts: Mutex<Vec<model::LoadBalancer>>,
    get_calls: AtomicUsize,
    put_calls: AtomicUsize,
    delete_calls: AtomicUsize,
    omit_ids: Mutex<bool>,
    fail_gets: Mutex<Option<String>>,
    fail_deletes: Mutex<Option<String>>,
}

impl ScriptedClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Provisioning states reported by successive Gets; the last one sticks.
    /// With an empty script every Get reports `Succeeded`.
    pub fn script(&self, statuses: &[&str]) {
        *self.statuses.lock().unwrap() = statuses.iter().map(|s| s.to_string()).collect();
    }

    /// Stop assigning identifiers to stored resources
    pub fn omit_ids(&self) {
        *self.omit_ids.lock().unwrap() = true;
    }

    /// Make every Get fail with a transport error
    pub fn fail_gets(&self, message: &str) {
        *self.fail_gets.lock().unwrap() = Some(message.to_string());
    }

    /// Make every Delete fail with a transport error
    pub fn fail_deletes(&self, message: &str) {
        *self.fail_deletes.lock().unwrap() = Some(message.to_string());
    }

    /// Put a resource in place without going through the client
    pub fn seed(&self, scope: &str, name: &str, mut remote: model::LoadBalancer) {
        if remote.id.is_none() {
            remote.id = Some(ResourceId::load_balancer(SUBSCRIPTION, scope, name).to_string());
        }
        self.resources
            .lock()
            .unwrap()
            .insert((scope.to_string(), name.to_string()), remote);
    }

    /// Drop a resource behind the reconciler's back
    pub fn vanish(&self, scope: &str, name: &str) {
        self.resources
            .lock()
            .unwrap()
            .remove(&(scope.to_string(), name.to_string()));
    }

    pub fn stored(&self, scope: &str, name: &str) -> Option<model::LoadBalancer> {
        self.resources
            .lock()
            .unwrap()
            .get(&(scope.to_string(), name.to_string()))
            .cloned()
    }

    pub fn last_put(&self) -> Option<model::LoadBalancer> {
        self.puts.lock().unwrap().last().cloned()
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn remote_calls(&self) -> usize {
        self.get_calls() + self.put_calls() + self.delete_calls()
    }

    fn next_status(&self) -> String {
        let mut statuses = self.statuses.lock().unwrap();
        if statuses.len() > 1 {
            statuses.pop_front().unwrap()
        } else {
            statuses
                .front()
                .cloned()
                .unwrap_or_else(|| "Succeeded".to_string())
        }
    }
}

#[async_trait]
impl lbsync_core::LoadBalancerClient for ScriptedClient {
    async fn get(&self, scope: &str, name: &str) -> Result<Option<model::LoadBalancer>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_gets.lock().unwrap().clone() {
            return Err(Error::provider("get", scope, name, message));
        }

        let Some(mut remote) = self.stored(scope, name) else {
            return Ok(None);
        };
        remote
            .properties
            .get_or_insert_with(Default::default)
            .provisioning_state = Some(self.next_status());
        Ok(Some(remote))
    }

    async fn create_or_update(
        &self,
        scope: &str,
        name: &str,
        model: &model::LoadBalancer,
    ) -> Result<model::LoadBalancer> {
        self.put_calls.fetch_add(1, Ordering::SeqCst);
        self.puts.lock().unwrap().push(model.clone());

        let mut stored = model.clone();
        stored.etag = Some(format!("W/\"{}\"", self.put_calls()));
        if !*self.omit_ids.lock().unwrap() {
            stored.id = Some(ResourceId::load_balancer(SUBSCRIPTION, scope, name).to_string());
        }
        self.resources
            .lock()
            .unwrap()
            .insert((scope.to_string(), name.to_string()), stored.clone());
        Ok(stored)
    }

    async fn delete(&self, scope: &str, name: &str) -> Result<()> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = self.fail_deletes.lock().unwrap().clone() {
            return Err(Error::provider("delete", scope, name, message));
        }
        self.vanish(scope, name);
        Ok(())
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// A reconciler over `client` with millisecond polling
pub fn reconciler(
    client: Arc<ScriptedClient>,
    timeout: Duration,
) -> (Reconciler, mpsc::Receiver<ReconcileEvent>) {
    Reconciler::with_timing(client, Duration::from_millis(5), timeout, 1000)
        .expect("valid timing")
}

/// Everything currently buffered on the event channel
pub fn drain(rx: &mut mpsc::Receiver<ReconcileEvent>) -> Vec<ReconcileEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Identifier the scripted client assigns to `rg/name`
pub fn lb_id(scope: &str, name: &str) -> String {
    ResourceId::load_balancer(SUBSCRIPTION, scope, name).to_string()
}

/// A load balancer declaring one record of every kind
pub fn web_load_balancer() -> LoadBalancer {
    let frontend_id = format!("{}/frontendIPConfigurations/public", lb_id("rg-prod", "lb-web"));
    let pool_id = format!("{}/backendAddressPools/web", lb_id("rg-prod", "lb-web"));
    let probe_id = format!("{}/probes/health", lb_id("rg-prod", "lb-web"));

    let mut rule = LoadBalancingRule::new("http", "Tcp", 80, 8080);
    rule.frontend_ip_configuration_id = Some(frontend_id.clone());
    rule.backend_address_pool_id = Some(pool_id);
    rule.probe_id = Some(probe_id);
    rule.idle_timeout_in_minutes = Some(4);

    let mut nat = InboundNatRule::new("ssh", "Tcp", 2222, 22);
    nat.frontend_ip_configuration_id = Some(frontend_id);

    LoadBalancer::new("lb-web", "West US", "rg-prod")
        .with_tag("env", "prod")
        .with_frontend(FrontendIpConfiguration::new("public", "Dynamic").with_public_ip_address_id("/pip/web"))
        .with_backend_pool(BackendAddressPool::new("web"))
        .with_rule(rule)
        .with_probe(Probe::new("health", 8080, 5, 2).with_http_path("/healthz"))
        .with_nat_rule(nat)
}
