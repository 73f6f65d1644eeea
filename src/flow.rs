//! Token-creation and 3-D Secure orchestration.
//!
//! [`TokenFlow`] drives a submit from card data to a finished token:
//!
//! ```text
//! Idle -> Submitting -> Success | Failed | ThreeDSecurePending
//! ThreeDSecurePending -> VerificationInProgress
//!     -> (callback: success)  -> FinishSubmitting -> Success | Failed
//!     -> (callback: canceled) -> Idle  (transient notice, not an error)
//! ```
//!
//! Two distinct "3-D Secure required" signals exist in the wire protocol and
//! both are handled: the create call may answer with a distinguished
//! challenge reference instead of a token, or it may issue a token whose
//! card is still unverified. The finish step differs per pathway but its
//! result is interpreted exactly like the initial submit.
//!
//! A finished token is only reported as success after the optional
//! [`BackgroundTokenHandler`] confirms it; a handler error becomes the
//! terminal error and the token is discarded.
//!
//! Failures are never retried automatically, every failure leaves the flow
//! resubmittable, and a canceled request delivers nothing at all.

use crate::cancel::CancellationToken;
use crate::error::TokenError;
use crate::observable::ObservableValue;
use crate::throttle::TokenOperationObserver;
use crate::token::{
    BackgroundTokenHandler, CardFormStatus, CardVerificationStatus, CreateTokenResponse,
    ResourceId, ThreeDSecureToken, Token, TokenId, TokenParams, TokenService,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// The minimal state needed to resume a 3-D Secure challenge, including
/// across a process restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingVerification {
    /// The create call answered with a challenge instead of a token.
    Challenge(ThreeDSecureToken),
    /// A token was issued but its card is still unverified.
    UnverifiedToken(TokenId),
}

/// Terminal result delivered by the external verification flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationResult {
    /// The cardholder completed the challenge.
    Success(ResourceId),
    /// The cardholder backed out.
    Canceled,
}

/// Observable state of the flow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenFlowState {
    /// Nothing in progress; submits are accepted.
    Idle,
    /// The create-token call is in flight.
    Submitting,
    /// The service demands 3-D Secure; waiting for the host to open the
    /// verification flow.
    ThreeDSecurePending(PendingVerification),
    /// The external verification flow is open; waiting for its callback.
    VerificationInProgress(PendingVerification),
    /// The post-verification finish call is in flight.
    FinishSubmitting,
    /// Terminal: a verified token was delivered.
    Success(Token),
    /// Terminal for this attempt: the error to show. Resubmitting is allowed.
    Failed(TokenError),
}

/// Sum of everything a flow call can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenCreationOutcome {
    /// A verified token, confirmed by the background handler if one is set.
    Success(Token),
    /// The cardholder must complete the referenced challenge first.
    ThreeDSecureRequired(PendingVerification),
    /// The attempt failed; the form stays resubmittable.
    Error(TokenError),
}

/// A non-error signal worth showing briefly, distinct from an error dialog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientNotice {
    /// The cardholder backed out of the verification flow.
    VerificationCanceled,
}

/// Opens the external (web/redirect) verification flow for a challenge.
///
/// The launch is fire-and-forget; the terminal result comes back through
/// [`TokenFlow::resume_verification`].
pub trait VerificationFlowLauncher: Send + Sync {
    /// Hands the challenge to the host to open its verification UI.
    fn start(&self, pending: &PendingVerification);
}

/// The token-creation state machine.
pub struct TokenFlow {
    service: Arc<dyn TokenService>,
    throttle: Arc<TokenOperationObserver>,
    background_handler: Option<Arc<dyn BackgroundTokenHandler>>,
    launcher: Option<Arc<dyn VerificationFlowLauncher>>,
    state: ObservableValue<TokenFlowState>,
    notice: ObservableValue<Option<TransientNotice>>,
    in_flight: AtomicBool,
    cancel: CancellationToken,
}

impl TokenFlow {
    /// Creates a flow over the given service and shared throttle.
    pub fn new(service: Arc<dyn TokenService>, throttle: Arc<TokenOperationObserver>) -> Self {
        Self {
            service,
            throttle,
            background_handler: None,
            launcher: None,
            state: ObservableValue::new(TokenFlowState::Idle),
            notice: ObservableValue::new(None),
            in_flight: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    /// Installs the out-of-process handler that must confirm every token
    /// before it is reported as success.
    pub fn with_background_handler(mut self, handler: Arc<dyn BackgroundTokenHandler>) -> Self {
        self.background_handler = Some(handler);
        self
    }

    /// Installs the collaborator that opens the verification UI.
    pub fn with_verification_launcher(mut self, launcher: Arc<dyn VerificationFlowLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    /// The current state.
    pub fn state(&self) -> TokenFlowState {
        self.state.get()
    }

    /// The state as an observable for UI wiring.
    pub fn observable_state(&self) -> &ObservableValue<TokenFlowState> {
        &self.state
    }

    /// Transient notices (currently only verification-canceled).
    pub fn observable_notice(&self) -> &ObservableValue<Option<TransientNotice>> {
        &self.notice
    }

    /// The resumable verification slot, when a challenge is outstanding.
    ///
    /// This is all a host needs to persist to survive a process restart
    /// between opening the verification flow and its redirect back.
    pub fn pending_verification(&self) -> Option<PendingVerification> {
        match self.state.get() {
            TokenFlowState::ThreeDSecurePending(p)
            | TokenFlowState::VerificationInProgress(p) => Some(p),
            _ => None,
        }
    }

    /// Re-arms a persisted verification slot after a process restart.
    ///
    /// Only meaningful from `Idle`; any live state wins over a stale slot.
    pub fn restore_pending_verification(&self, pending: PendingVerification) {
        if self.state.get() == TokenFlowState::Idle {
            self.state.set(TokenFlowState::ThreeDSecurePending(pending));
        }
    }

    /// Submits card data for tokenization.
    ///
    /// Returns `None` without doing anything when a request is already in
    /// flight (a second submit is a no-op, not a queued retry), when a
    /// verification is outstanding, or when the flow was canceled mid-call
    /// (nothing is delivered after cancellation). Otherwise the returned
    /// outcome matches the terminal state transition.
    pub async fn submit(&self, params: TokenParams) -> Option<TokenCreationOutcome> {
        if self.cancel.is_canceled() {
            return None;
        }
        if matches!(
            self.state.get(),
            TokenFlowState::ThreeDSecurePending(_) | TokenFlowState::VerificationInProgress(_)
        ) {
            debug!("submit ignored: verification outstanding");
            return None;
        }
        if self.in_flight.swap(true, Ordering::AcqRel) {
            debug!("submit ignored: request already in flight");
            return None;
        }

        self.throttle.start_request();
        self.state.set(TokenFlowState::Submitting);
        debug!(three_d_secure = params.three_d_secure, "creating token");

        let result = tokio::select! {
            _ = self.cancel.canceled() => {
                self.in_flight.store(false, Ordering::Release);
                return None;
            }
            result = self.service.create_token(params) => result,
        };

        let outcome = self.interpret(result).await;
        self.in_flight.store(false, Ordering::Release);
        outcome
    }

    /// Moves an outstanding challenge into the external verification flow.
    ///
    /// Calls the configured launcher and transitions to
    /// `VerificationInProgress`. Returns the slot handed off, or `None` when
    /// no challenge is outstanding.
    pub fn begin_verification(&self) -> Option<PendingVerification> {
        let TokenFlowState::ThreeDSecurePending(pending) = self.state.get() else {
            return None;
        };
        if let Some(launcher) = &self.launcher {
            launcher.start(&pending);
        }
        self.state
            .set(TokenFlowState::VerificationInProgress(pending.clone()));
        Some(pending)
    }

    /// Feeds the verification flow's terminal result back in.
    ///
    /// A canceled verification returns the flow to `Idle` with a transient
    /// notice and yields `None` (not an error). A successful one issues the
    /// finish call for whichever pathway is pending and interprets its
    /// result exactly like the initial submit, background handler included.
    pub async fn resume_verification(
        &self,
        result: VerificationResult,
    ) -> Option<TokenCreationOutcome> {
        if self.cancel.is_canceled() {
            return None;
        }
        let pending = match self.state.get() {
            TokenFlowState::ThreeDSecurePending(p)
            | TokenFlowState::VerificationInProgress(p) => p,
            _ => {
                debug!("verification result ignored: nothing pending");
                return None;
            }
        };

        match result {
            VerificationResult::Canceled => {
                debug!("verification canceled by the cardholder");
                self.notice.set(Some(TransientNotice::VerificationCanceled));
                self.state.set(TokenFlowState::Idle);
                None
            }
            VerificationResult::Success(resource) => {
                if self.in_flight.swap(true, Ordering::AcqRel) {
                    return None;
                }
                debug!(resource = %resource.0, "verification succeeded, finishing");
                self.throttle.start_request();
                self.state.set(TokenFlowState::FinishSubmitting);

                let finish = async {
                    match &pending {
                        PendingVerification::Challenge(challenge) => self
                            .service
                            .create_token_from_three_d_secure(challenge)
                            .await
                            .map(CreateTokenResponse::Issued),
                        PendingVerification::UnverifiedToken(token_id) => self
                            .service
                            .finish_three_d_secure(token_id)
                            .await
                            .map(CreateTokenResponse::Issued),
                    }
                };
                let result = tokio::select! {
                    _ = self.cancel.canceled() => {
                        self.in_flight.store(false, Ordering::Release);
                        return None;
                    }
                    result = finish => result,
                };

                let outcome = self.interpret(result).await;
                self.in_flight.store(false, Ordering::Release);
                outcome
            }
        }
    }

    /// Cancels any in-flight request. Idempotent; after this, no submit or
    /// resume delivers a result and no state is emitted.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancels and closes the observables. Used at form teardown.
    pub fn dispose(&self) {
        self.cancel();
        self.state.close();
        self.notice.close();
    }

    /// Maps a create/finish result onto the state machine. The throttle sees
    /// the request completion before anything else happens.
    async fn interpret(
        &self,
        result: Result<CreateTokenResponse, TokenError>,
    ) -> Option<TokenCreationOutcome> {
        self.throttle.complete_request();

        match result {
            Ok(CreateTokenResponse::Issued(token))
                if token.card.verification_status == CardVerificationStatus::Unverified =>
            {
                debug!(token = %token.id, "token issued unverified, challenge required");
                let pending = PendingVerification::UnverifiedToken(token.id.clone());
                self.state
                    .set(TokenFlowState::ThreeDSecurePending(pending.clone()));
                Some(TokenCreationOutcome::ThreeDSecureRequired(pending))
            }
            Ok(CreateTokenResponse::Issued(token)) => self.finalize(token).await,
            Ok(CreateTokenResponse::ThreeDSecureRequired(challenge)) => {
                debug!(challenge = %challenge, "challenge required");
                let pending = PendingVerification::Challenge(challenge);
                self.state
                    .set(TokenFlowState::ThreeDSecurePending(pending.clone()));
                Some(TokenCreationOutcome::ThreeDSecureRequired(pending))
            }
            Err(error) => {
                warn!(%error, "token request failed");
                self.state.set(TokenFlowState::Failed(error.clone()));
                Some(TokenCreationOutcome::Error(error))
            }
        }
    }

    /// Runs the background handler (when configured) and settles the token.
    async fn finalize(&self, token: Token) -> Option<TokenCreationOutcome> {
        if let Some(handler) = &self.background_handler {
            let handler = Arc::clone(handler);
            let handled = token.clone();
            // Off the main sequence; the flow suspends until the handler
            // reports back
            let status = tokio::select! {
                _ = self.cancel.canceled() => return None,
                joined = tokio::spawn(async move { handler.handle(&handled).await }) => {
                    joined.unwrap_or_else(|join_error| {
                        CardFormStatus::Error(format!(
                            "background token handler panicked: {join_error}"
                        ))
                    })
                }
            };
            if let CardFormStatus::Error(message) = status {
                warn!(%message, "background handler rejected the token");
                let error = TokenError::BackgroundHandler { message };
                self.state.set(TokenFlowState::Failed(error.clone()));
                return Some(TokenCreationOutcome::Error(error));
            }
        }

        debug!(token = %token.id, "token finalized");
        self.state.set(TokenFlowState::Success(token.clone()));
        Some(TokenCreationOutcome::Success(token))
    }
}
