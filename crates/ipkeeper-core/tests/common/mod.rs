//! Test doubles and common utilities for scheduler contract tests
//!
//! The doubles answer from a script and count their calls, so tests can
//! assert how many attempts reached each collaborator.

#![allow(dead_code)]

use ipkeeper_core::error::{Error, Result};
use ipkeeper_core::traits::{ApiMessage, ApiResponse, IpResolver, RecordClient, RecordUpdate};
use ipkeeper_core::{RecordTarget, ServiceConfig, UpdateService};
use std::collections::VecDeque;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const HOME_IP: Ipv4Addr = Ipv4Addr::new(1, 2, 3, 4);
pub const NEW_IP: Ipv4Addr = Ipv4Addr::new(5, 6, 7, 8);

/// What a scripted resolver answers
#[derive(Debug, Clone, Copy)]
pub enum Lookup {
    Ip(Ipv4Addr),
    NetworkFailure,
    NoAnswer,
}

/// An IpResolver answering from a script, then repeating a fallback
pub struct ScriptedResolver {
    calls: Arc<AtomicUsize>,
    script: Arc<Mutex<VecDeque<Lookup>>>,
    fallback: Lookup,
}

impl ScriptedResolver {
    pub fn always(answer: Lookup) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: answer,
        }
    }

    /// Answer `answer` once before moving on in the script
    pub fn then(self, answer: Lookup) -> Self {
        self.script.lock().unwrap().push_back(answer);
        self
    }

    /// Get the number of times lookup() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Create a new ScriptedResolver that shares counters and script with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            script: Arc::clone(&other.script),
            fallback: other.fallback,
        }
    }
}

#[async_trait::async_trait]
impl IpResolver for ScriptedResolver {
    async fn lookup(&self) -> Result<Ipv4Addr> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let answer = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match answer {
            Lookup::Ip(ip) => Ok(ip),
            Lookup::NetworkFailure => Err(Error::network("resolver unreachable")),
            Lookup::NoAnswer => Err(Error::lookup("no A record in answer")),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// What a scripted record client answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Accept,
    Reject,
    Unreachable,
}

/// A RecordClient answering from a script, with optional per-call latency
pub struct ScriptedClient {
    calls: Arc<AtomicUsize>,
    updates: Arc<Mutex<Vec<RecordUpdate>>>,
    script: Arc<Mutex<VecDeque<(Duration, Reply)>>>,
    fallback: Reply,
}

impl ScriptedClient {
    pub fn always(reply: Reply) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            updates: Arc::new(Mutex::new(Vec::new())),
            script: Arc::new(Mutex::new(VecDeque::new())),
            fallback: reply,
        }
    }

    /// Answer `reply` once, after `latency`, before moving on in the script
    pub fn then(self, latency: Duration, reply: Reply) -> Self {
        self.script.lock().unwrap().push_back((latency, reply));
        self
    }

    /// Get the number of times update_record() was called
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get the update bodies received so far
    pub fn updates(&self) -> Vec<RecordUpdate> {
        self.updates.lock().unwrap().clone()
    }

    /// Create a new ScriptedClient that shares counters and script with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            calls: Arc::clone(&other.calls),
            updates: Arc::clone(&other.updates),
            script: Arc::clone(&other.script),
            fallback: other.fallback,
        }
    }
}

#[async_trait::async_trait]
impl RecordClient for ScriptedClient {
    async fn update_record(
        &self,
        _zone_id: &str,
        _record_id: &str,
        update: &RecordUpdate,
    ) -> Result<ApiResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.updates.lock().unwrap().push(update.clone());

        let (latency, reply) = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or((Duration::ZERO, self.fallback));

        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }

        match reply {
            Reply::Accept => Ok(ApiResponse {
                success: true,
                result: Some(serde_json::json!({ "content": update.content })),
                errors: vec![],
                messages: vec![],
            }),
            Reply::Reject => Ok(ApiResponse {
                success: false,
                result: None,
                errors: vec![ApiMessage {
                    code: 10000,
                    message: "Authentication error".to_string(),
                }],
                messages: vec![],
            }),
            Reply::Unreachable => Err(Error::network("connection refused")),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Helper to create a minimal ServiceConfig for testing
pub fn test_config() -> ServiceConfig {
    ServiceConfig::new(RecordTarget::new("zone-id", "record-id", "home.example.com"))
}

/// Build a service over doubles sharing counters with the given ones
pub fn service_with(resolver: &ScriptedResolver, client: &ScriptedClient) -> UpdateService {
    UpdateService::new(
        &test_config(),
        Arc::new(ScriptedResolver::sharing_counters_with(resolver)),
        Arc::new(ScriptedClient::sharing_counters_with(client)),
    )
    .unwrap()
}

/// Record every stop hook invocation
pub fn record_stops(service: &UpdateService) -> Arc<Mutex<Vec<bool>>> {
    let stops = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&stops);
    service.on_stop(move |unexpected| sink.lock().unwrap().push(unexpected));
    stops
}

/// Advance the paused clock by whole minutes
pub async fn minutes(n: u64) {
    tokio::time::sleep(Duration::from_secs(n * 60)).await;
}
