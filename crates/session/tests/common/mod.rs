#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use content::{BorderEffect, Content, PreviewPayload, TextContent, Timing};
use parking_lot::Mutex;
use session::{OwnershipResponse, PreviewTransport, StartResponse, TransportError, UpdateResponse};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Start(PreviewPayload),
    Update(PreviewPayload, String),
    Ping(String),
    CheckOwnership(String),
    Stop(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    Conflict,
    NotFound,
    Status(u16),
    Network,
}

impl Reply {
    fn into_result(self) -> Result<(), TransportError> {
        match self {
            Reply::Ok => Ok(()),
            Reply::Conflict => Err(TransportError::Conflict),
            Reply::NotFound => Err(TransportError::NotFound),
            Reply::Status(code) => Err(TransportError::Status(code)),
            Reply::Network => Err(TransportError::Network("connection reset".into())),
        }
    }
}

/// Records every call and answers from scripted replies.
pub struct MockTransport {
    calls: Mutex<Vec<Call>>,
    pub start_reply: Mutex<Reply>,
    pub update_reply: Mutex<Reply>,
    pub ping_reply: Mutex<Reply>,
    pub ownership_reply: Mutex<Reply>,
    pub is_owner: Mutex<bool>,
    pub start_delay: Mutex<Duration>,
    sessions: AtomicUsize,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            start_reply: Mutex::new(Reply::Ok),
            update_reply: Mutex::new(Reply::Ok),
            ping_reply: Mutex::new(Reply::Ok),
            ownership_reply: Mutex::new(Reply::Ok),
            is_owner: Mutex::new(true),
            start_delay: Mutex::new(Duration::ZERO),
            sessions: AtomicUsize::new(0),
        }
    }
}

impl MockTransport {
    fn record(&self, call: Call) { self.calls.lock().push(call); }

    pub fn calls(&self) -> Vec<Call> { self.calls.lock().clone() }

    pub fn starts(&self) -> usize { self.calls().iter().filter(|c| matches!(c, Call::Start(_))).count() }

    pub fn pings(&self) -> usize { self.calls().iter().filter(|c| matches!(c, Call::Ping(_))).count() }

    pub fn ownership_checks(&self) -> usize {
        self.calls().iter().filter(|c| matches!(c, Call::CheckOwnership(_))).count()
    }

    pub fn updates(&self) -> Vec<PreviewPayload> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Update(p, _) => Some(p),
                _ => None,
            })
            .collect()
    }

    pub fn stops(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Stop(id) => Some(id),
                _ => None,
            })
            .collect()
    }
}

impl PreviewTransport for MockTransport {
    async fn start(&self, payload: &PreviewPayload) -> Result<StartResponse, TransportError> {
        self.record(Call::Start(payload.clone()));
        let delay = *self.start_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let reply = *self.start_reply.lock();
        reply.into_result()?;
        let n = self.sessions.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(StartResponse { session_id: format!("session-{n}") })
    }

    async fn update(&self, payload: &PreviewPayload, session_id: &str) -> Result<UpdateResponse, TransportError> {
        self.record(Call::Update(payload.clone(), session_id.to_string()));
        let reply = *self.update_reply.lock();
        reply.into_result()?;
        Ok(UpdateResponse { item: payload.clone(), session_id: session_id.to_string() })
    }

    async fn ping(&self, session_id: &str) -> Result<(), TransportError> {
        self.record(Call::Ping(session_id.to_string()));
        let reply = *self.ping_reply.lock();
        reply.into_result()
    }

    async fn check_ownership(&self, session_id: &str) -> Result<OwnershipResponse, TransportError> {
        self.record(Call::CheckOwnership(session_id.to_string()));
        let reply = *self.ownership_reply.lock();
        reply.into_result()?;
        let is_owner = *self.is_owner.lock();
        Ok(OwnershipResponse { is_owner })
    }

    async fn stop(&self, session_id: &str) -> Result<(), TransportError> {
        self.record(Call::Stop(session_id.to_string()));
        Ok(())
    }
}

pub fn text_payload(text: &str) -> PreviewPayload {
    PreviewPayload {
        border_effect: BorderEffect::None,
        content: Content::Text(TextContent::new(text, "#ffffff")),
        timing: Timing::Duration(10),
    }
}
