//! Delivery confirmation by one-time code.
//!
//! The server issues and checks the code; this module only builds the
//! requests, validates the six-digit input locally and tracks what the
//! delivery agent sees.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::client::Endpoints;
use crate::dispatcher::{Dispatcher, Intent};
use crate::envelope::Payload;
use crate::error::ApiError;
use crate::status::Status;

pub const OTP_LEN: usize = 6;

/// Reject anything but exactly six ASCII digits.
pub fn validate_code(code: &str) -> Result<(), ApiError> {
    if code.len() == OTP_LEN && code.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(format!(
            "Please enter the {OTP_LEN}-digit code."
        )))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Slot(usize),
    Blurred,
}

/// Six single-digit boxes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OtpInput {
    digits: [Option<char>; OTP_LEN],
}

impl OtpInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn digits(&self) -> &[Option<char>; OTP_LEN] {
        &self.digits
    }

    /// Type or paste `text` into `slot`.
    ///
    /// Digits fill `slot..` left to right, anything past the last box is
    /// dropped. Focus moves to the box after the last one written, or blurs
    /// once the last box is reached. Empty text clears the box in place.
    pub fn enter(&mut self, slot: usize, text: &str) -> Focus {
        if slot >= OTP_LEN {
            return Focus::Blurred;
        }
        let incoming: Vec<char> = text.chars().filter(char::is_ascii_digit).collect();
        if incoming.is_empty() {
            if text.is_empty() {
                self.digits[slot] = None;
            }
            return Focus::Slot(slot);
        }

        let mut next = slot;
        for ch in incoming.into_iter().take(OTP_LEN - slot) {
            self.digits[next] = Some(ch);
            next += 1;
        }
        if next >= OTP_LEN {
            Focus::Blurred
        } else {
            Focus::Slot(next)
        }
    }

    /// Clear the box, or the previous one when it is already empty.
    pub fn backspace(&mut self, slot: usize) -> Focus {
        let slot = slot.min(OTP_LEN - 1);
        if self.digits[slot].is_some() {
            self.digits[slot] = None;
            Focus::Slot(slot)
        } else if slot > 0 {
            self.digits[slot - 1] = None;
            Focus::Slot(slot - 1)
        } else {
            Focus::Slot(0)
        }
    }

    pub fn code(&self) -> String {
        self.digits.iter().flatten().collect()
    }

    pub fn is_complete(&self) -> bool {
        self.digits.iter().all(Option::is_some)
    }

    pub fn clear(&mut self) {
        self.digits = [None; OTP_LEN];
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OtpPhase {
    #[default]
    NotGenerated,
    Generated,
    Verified,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OtpState {
    pub phase: OtpPhase,
    pub order_id: Option<String>,
    pub otp_verified: bool,
    /// Payload of the last successful generate.
    pub generated: Option<Value>,
    /// Payload of the last status lookup, kept apart from `generated`.
    pub status: Option<Value>,
    pub status_error: Option<ApiError>,
    pub message: Option<String>,
    pub error: Option<ApiError>,
    pub generate_status: Status,
    pub verify_status: Status,
    pub resend_status: Status,
    pub lookup_status: Status,
    issued: [u64; 4],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OtpCall {
    Generate,
    Verify,
    Resend,
    Lookup,
}

#[derive(Debug, Clone, Copy)]
struct OtpTicket {
    call: OtpCall,
    seq: u64,
}

impl OtpState {
    /// Fresh state for `order_id`. Counters move past every ticket issued
    /// so far, so replies for the previous order are dropped.
    fn handover(&self, order_id: Option<String>) -> Self {
        Self {
            order_id,
            issued: self.issued.map(|seq| seq + 1),
            ..Self::default()
        }
    }

    fn begin(&mut self, call: OtpCall) -> OtpTicket {
        let seq = &mut self.issued[call as usize];
        *seq += 1;
        OtpTicket { call, seq: *seq }
    }

    fn accepts(&self, ticket: OtpTicket) -> bool {
        let current = self.issued[ticket.call as usize] == ticket.seq;
        if !current {
            debug!(call = ?ticket.call, seq = ticket.seq, order_id = ?self.order_id, "discarding stale otp response");
        }
        current
    }

    /// Code to relay to the customer, when the server disclosed it.
    pub fn displayed_otp(&self) -> Option<String> {
        [self.status.as_ref(), self.generated.as_ref()]
            .into_iter()
            .flatten()
            .find_map(|v| match v.get("otp") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(Value::Number(n)) => Some(n.to_string()),
                _ => None,
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OtpGeneration {
    pub generated: Payload,
    pub status: Result<Payload, ApiError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpEndpoints {
    pub generate: String,
    pub verify: String,
    pub resend: String,
    pub status: String,
}

impl Default for OtpEndpoints {
    fn default() -> Self {
        Self {
            generate: "orders/{id}/otp/generate".to_owned(),
            verify: "orders/{id}/otp/verify".to_owned(),
            resend: "orders/{id}/otp/resend".to_owned(),
            status: "orders/{id}/otp/status".to_owned(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OtpWorkflow {
    dispatcher: Dispatcher,
    endpoints: OtpEndpoints,
    state: Arc<RwLock<OtpState>>,
}

impl OtpWorkflow {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_endpoints(dispatcher, OtpEndpoints::default())
    }

    pub fn with_endpoints(dispatcher: Dispatcher, endpoints: OtpEndpoints) -> Self {
        Self {
            dispatcher,
            endpoints,
            state: Arc::new(RwLock::new(OtpState::default())),
        }
    }

    pub async fn state(&self) -> OtpState {
        self.state.read().await.clone()
    }

    /// Ask the server to issue a code, then look up its status for display.
    pub async fn generate(&self, order_id: &str) -> Result<OtpGeneration, ApiError> {
        let (ticket, lookup) = {
            let mut state = self.state.write().await;
            self.switch_order(&mut state, order_id);
            if state.phase == OtpPhase::Verified {
                return Err(already_verified());
            }
            state.generate_status = Status::Pending;
            state.lookup_status = Status::Pending;
            state.error = None;
            (state.begin(OtpCall::Generate), state.begin(OtpCall::Lookup))
        };

        let primary = Intent::post(Endpoints::path(&self.endpoints.generate, order_id));
        let secondary = Intent::get(Endpoints::path(&self.endpoints.status, order_id));
        let outcome = self.dispatcher.dispatch_chained(primary, secondary).await;

        let mut state = self.state.write().await;
        let current = state.accepts(ticket);
        match outcome {
            Ok(chained) => {
                info!(order_id, "delivery code generated");
                if current {
                    state.phase = OtpPhase::Generated;
                    state.generate_status = Status::Fulfilled;
                    state.message = chained.primary.message.clone();
                    state.generated = Some(chained.primary.data.clone());
                }
                if current && state.accepts(lookup) {
                    match &chained.secondary {
                        Ok(status) => {
                            state.lookup_status = Status::Fulfilled;
                            state.status = Some(status.data.clone());
                            state.status_error = None;
                        }
                        Err(err) => {
                            state.lookup_status = Status::Rejected;
                            state.status_error = Some(err.clone());
                        }
                    }
                }
                Ok(OtpGeneration {
                    generated: chained.primary,
                    status: chained.secondary,
                })
            }
            Err(err) => {
                warn!(order_id, error = %err, "failed to generate delivery code");
                if current {
                    state.generate_status = Status::Rejected;
                    if state.accepts(lookup) {
                        state.lookup_status = Status::Idle;
                    }
                    state.error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Check a customer-supplied code. Invalid input never reaches the server.
    pub async fn verify(&self, order_id: &str, code: &str) -> Result<Payload, ApiError> {
        let ticket = {
            let mut state = self.state.write().await;
            self.switch_order(&mut state, order_id);
            let ticket = state.begin(OtpCall::Verify);
            if let Err(err) = validate_code(code) {
                state.verify_status = Status::Rejected;
                state.error = Some(err.clone());
                return Err(err);
            }
            state.verify_status = Status::Pending;
            state.error = None;
            ticket
        };

        let intent = Intent::post(Endpoints::path(&self.endpoints.verify, order_id))
            .json(json!({ "otp": code }));
        let outcome = self.dispatcher.dispatch(intent).await;

        let mut state = self.state.write().await;
        if !state.accepts(ticket) {
            return outcome;
        }
        match outcome {
            Ok(payload) => {
                info!(order_id, "delivery confirmed");
                state.phase = OtpPhase::Verified;
                state.otp_verified = true;
                state.verify_status = Status::Fulfilled;
                state.message = payload.message.clone();
                Ok(payload)
            }
            Err(err) => {
                warn!(order_id, error = %err, "delivery code rejected");
                state.verify_status = Status::Rejected;
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn verify_input(&self, order_id: &str, input: &OtpInput) -> Result<Payload, ApiError> {
        self.verify(order_id, &input.code()).await
    }

    /// New code issued server-side; only the message changes here.
    pub async fn resend(&self, order_id: &str) -> Result<Payload, ApiError> {
        let ticket = {
            let mut state = self.state.write().await;
            self.switch_order(&mut state, order_id);
            if state.phase == OtpPhase::Verified {
                return Err(already_verified());
            }
            state.resend_status = Status::Pending;
            state.error = None;
            state.begin(OtpCall::Resend)
        };

        let intent = Intent::post(Endpoints::path(&self.endpoints.resend, order_id));
        let outcome = self.dispatcher.dispatch(intent).await;

        let mut state = self.state.write().await;
        if !state.accepts(ticket) {
            return outcome;
        }
        match outcome {
            Ok(payload) => {
                state.resend_status = Status::Fulfilled;
                state.message = payload.message.clone();
                Ok(payload)
            }
            Err(err) => {
                state.resend_status = Status::Rejected;
                state.error = Some(err.clone());
                Err(err)
            }
        }
    }

    pub async fn refresh_status(&self, order_id: &str) -> Result<Payload, ApiError> {
        let ticket = {
            let mut state = self.state.write().await;
            self.switch_order(&mut state, order_id);
            state.lookup_status = Status::Pending;
            state.status_error = None;
            state.begin(OtpCall::Lookup)
        };

        let intent = Intent::get(Endpoints::path(&self.endpoints.status, order_id));
        let outcome = self.dispatcher.dispatch(intent).await;

        let mut state = self.state.write().await;
        if !state.accepts(ticket) {
            return outcome;
        }
        match outcome {
            Ok(payload) => {
                state.lookup_status = Status::Fulfilled;
                state.status = Some(payload.data.clone());
                if payload.data.get("verified").and_then(Value::as_bool) == Some(true) {
                    state.phase = OtpPhase::Verified;
                    state.otp_verified = true;
                } else if state.phase == OtpPhase::NotGenerated
                    && payload.data.get("generated").and_then(Value::as_bool) == Some(true)
                {
                    state.phase = OtpPhase::Generated;
                }
                Ok(payload)
            }
            Err(err) => {
                state.lookup_status = Status::Rejected;
                state.status_error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// Drop both errors; rejected calls go back to idle.
    pub async fn clear_error(&self) {
        let mut guard = self.state.write().await;
        let state = &mut *guard;
        state.error = None;
        state.status_error = None;
        for status in [
            &mut state.generate_status,
            &mut state.verify_status,
            &mut state.resend_status,
            &mut state.lookup_status,
        ] {
            if *status == Status::Rejected {
                *status = Status::Idle;
            }
        }
    }

    /// Forget the order. Replies still in flight are ignored.
    pub async fn reset(&self) {
        let mut state = self.state.write().await;
        *state = state.handover(None);
    }

    // State belongs to one order at a time.
    fn switch_order(&self, state: &mut OtpState, order_id: &str) {
        if state.order_id.as_deref() != Some(order_id) {
            *state = state.handover(Some(order_id.to_owned()));
        }
    }
}

fn already_verified() -> ApiError {
    ApiError::InvalidInput("Delivery has already been confirmed.".to_owned())
}
