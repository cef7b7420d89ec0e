//! Per-tenant outbound queue for bulk sends.
//!
//! Each tenant gets one lane: a task draining a bounded job channel, so a
//! tenant's bulk jobs run one at a time while lanes of different tenants
//! run concurrently. Idle lanes exit and are recreated on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use crate::domain::foundation::{EngineMessageId, TenantId};
use crate::domain::messaging::Destination;
use crate::domain::session::SessionError;

use super::registry::SessionRegistry;

/// How long a lane waits for another job before exiting.
const LANE_IDLE_TIMEOUT: Duration = Duration::from_secs(60);

/// Outcome for one destination of a bulk job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkResult {
    pub destination: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub engine_message_id: Option<EngineMessageId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate outcome of a bulk job.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkReport {
    pub sent_count: usize,
    pub failed_count: usize,
    pub results: Vec<BulkResult>,
}

impl BulkReport {
    fn record(&mut self, destination: String, outcome: Result<EngineMessageId, SessionError>) {
        let result = match outcome {
            Ok(engine_message_id) => {
                self.sent_count += 1;
                BulkResult {
                    destination,
                    success: true,
                    engine_message_id: Some(engine_message_id),
                    error: None,
                }
            }
            Err(e) => {
                self.failed_count += 1;
                BulkResult {
                    destination,
                    success: false,
                    engine_message_id: None,
                    error: Some(e.to_string()),
                }
            }
        };
        self.results.push(result);
    }
}

#[derive(Debug)]
struct BulkJob {
    destinations: Vec<String>,
    content: String,
    delay: Duration,
    reply: oneshot::Sender<BulkReport>,
}

/// Lanes keyed by tenant.
pub struct OutboundQueue {
    registry: Arc<SessionRegistry>,
    lanes: Mutex<HashMap<TenantId, mpsc::Sender<BulkJob>>>,
    depth: usize,
    idle_timeout: Duration,
}

impl OutboundQueue {
    pub fn new(registry: Arc<SessionRegistry>, depth: usize) -> Self {
        Self {
            registry,
            lanes: Mutex::new(HashMap::new()),
            depth: depth.max(1),
            idle_timeout: LANE_IDLE_TIMEOUT,
        }
    }

    /// Override the idle timeout (tests).
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Queue a bulk job on the tenant's lane and wait for its report.
    ///
    /// Waits for queue space when the lane already holds `depth` jobs.
    pub async fn submit(
        &self,
        tenant_id: &TenantId,
        destinations: Vec<String>,
        content: String,
        delay: Duration,
    ) -> Result<BulkReport, SessionError> {
        let (reply, report) = oneshot::channel();
        let mut job = BulkJob {
            destinations,
            content,
            delay,
            reply,
        };

        // A lane that just went idle rejects the job; the retry gets a new lane.
        for _ in 0..2 {
            let lane = self.lane(tenant_id);
            match lane.send(job).await {
                Ok(()) => {
                    return report
                        .await
                        .map_err(|_| SessionError::internal("outbound lane dropped the job"));
                }
                Err(mpsc::error::SendError(rejected)) => job = rejected,
            }
        }
        Err(SessionError::internal("outbound lane unavailable"))
    }

    #[cfg(test)]
    fn tracked_lanes(&self) -> usize {
        self.lanes.lock().expect("outbound queue: lock poisoned").len()
    }

    /// Tenants with a running lane.
    pub fn active_lanes(&self) -> usize {
        self.lanes
            .lock()
            .expect("outbound queue: lock poisoned")
            .values()
            .filter(|lane| !lane.is_closed())
            .count()
    }

    fn lane(&self, tenant_id: &TenantId) -> mpsc::Sender<BulkJob> {
        let mut lanes = self.lanes.lock().expect("outbound queue: lock poisoned");
        lanes.retain(|_, lane| !lane.is_closed());
        if let Some(lane) = lanes.get(tenant_id) {
            return lane.clone();
        }

        let (tx, rx) = mpsc::channel(self.depth);
        tokio::spawn(run_lane(
            tenant_id.clone(),
            Arc::clone(&self.registry),
            rx,
            self.idle_timeout,
        ));
        lanes.insert(tenant_id.clone(), tx.clone());
        tx
    }
}

async fn run_lane(
    tenant_id: TenantId,
    registry: Arc<SessionRegistry>,
    mut jobs: mpsc::Receiver<BulkJob>,
    idle_timeout: Duration,
) {
    tracing::debug!(tenant_id = %tenant_id, "Outbound lane started");
    loop {
        match tokio::time::timeout(idle_timeout, jobs.recv()).await {
            Ok(Some(job)) => run_job(&tenant_id, &registry, job).await,
            Ok(None) => break,
            Err(_) => {
                // Refuse new jobs, then finish anything already queued.
                jobs.close();
                while let Some(job) = jobs.recv().await {
                    run_job(&tenant_id, &registry, job).await;
                }
                break;
            }
        }
    }
    tracing::debug!(tenant_id = %tenant_id, "Outbound lane stopped");
}

async fn run_job(tenant_id: &TenantId, registry: &SessionRegistry, job: BulkJob) {
    let BulkJob {
        destinations,
        content,
        delay,
        reply,
    } = job;
    let total = destinations.len();
    let mut report = BulkReport::default();

    for (index, raw) in destinations.into_iter().enumerate() {
        if index > 0 && !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let outcome = match Destination::parse(&raw) {
            Ok(destination) => match registry.get(tenant_id) {
                Some(handle) => handle.send(destination, content.clone()).await,
                None => Err(SessionError::NotConnected(tenant_id.clone())),
            },
            Err(e) => Err(e),
        };
        if let Err(e) = &outcome {
            tracing::debug!(tenant_id = %tenant_id, destination = %raw, error = %e, "Bulk send failed");
        }
        report.record(raw, outcome);
    }

    tracing::info!(
        tenant_id = %tenant_id,
        total,
        sent = report.sent_count,
        failed = report.failed_count,
        "Bulk send finished"
    );
    let _ = reply.send(report);
}
