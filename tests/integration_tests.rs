//! End-to-end scenarios for the card form and the token flow.
//!
//! These drive the public surface the way a host application would: feed
//! keystrokes through the formatter into the form, submit through a flow
//! wired to a mock token service, and walk the 3-D Secure round trip.

use async_trait::async_trait;
use cardform::{
    format, AcceptedBrands, BackgroundTokenHandler, CardBrand, CardForm, CardFormStatus,
    CardVerificationStatus, CreateTokenResponse, FieldKind, FormConfig, PendingVerification,
    ResourceId, TenantId, ThreeDSecureToken, Token, TokenCreationOutcome, TokenError, TokenFlow,
    TokenFlowState, TokenId, TokenOperationObserver, TokenOperationStatus, TokenParams,
    TokenService, TokenizedCard, VerificationResult, YearMonth,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// =============================================================================
// MOCK TOKEN SERVICE
// =============================================================================

#[derive(Default)]
struct MockService {
    create_responses: Mutex<Vec<Result<CreateTokenResponse, TokenError>>>,
    finish_responses: Mutex<Vec<Result<Token, TokenError>>>,
    brands_responses: Mutex<Vec<Result<AcceptedBrands, TokenError>>>,
    create_calls: AtomicUsize,
    brands_calls: AtomicUsize,
}

impl MockService {
    fn respond_create(&self, response: Result<CreateTokenResponse, TokenError>) {
        self.create_responses.lock().unwrap().insert(0, response);
    }

    fn respond_finish(&self, response: Result<Token, TokenError>) {
        self.finish_responses.lock().unwrap().insert(0, response);
    }

    fn respond_brands(&self, response: Result<AcceptedBrands, TokenError>) {
        self.brands_responses.lock().unwrap().insert(0, response);
    }
}

#[async_trait]
impl TokenService for MockService {
    async fn create_token(&self, _params: TokenParams) -> Result<CreateTokenResponse, TokenError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        self.create_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(TokenError::network("no scripted create response")))
    }

    async fn create_token_from_three_d_secure(
        &self,
        _challenge: &ThreeDSecureToken,
    ) -> Result<Token, TokenError> {
        self.finish_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(TokenError::network("no scripted finish response")))
    }

    async fn finish_three_d_secure(&self, _token_id: &TokenId) -> Result<Token, TokenError> {
        self.finish_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(TokenError::network("no scripted finish response")))
    }

    async fn accepted_brands(
        &self,
        _tenant: Option<&TenantId>,
    ) -> Result<AcceptedBrands, TokenError> {
        self.brands_calls.fetch_add(1, Ordering::SeqCst);
        self.brands_responses
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(TokenError::network("no scripted brands response")))
    }
}

fn token(id: &str, status: CardVerificationStatus) -> Token {
    Token {
        id: TokenId(id.to_owned()),
        card: TokenizedCard {
            brand: CardBrand::Visa,
            last_four: "4242".to_owned(),
            exp_month: 12,
            exp_year: 2030,
            verification_status: status,
        },
        livemode: false,
    }
}

fn fixed_now() -> YearMonth {
    YearMonth::new(2021, 4).expect("valid month")
}

fn filled_form() -> CardForm {
    let form = CardForm::new(FormConfig::default()).with_clock(fixed_now);
    form.update_number("4242424242424242");
    form.update_expiration("12/30");
    form.update_cvc("123");
    form.update_holder_name("JANE DOE");
    form
}

// =============================================================================
// KEYSTROKES TO VALID FORM
// =============================================================================

#[test]
fn typing_a_visa_card_through_the_formatter_validates() {
    let form = CardForm::new(FormConfig::default()).with_clock(fixed_now);

    // Simulate per-keystroke formatting the way an input field would
    let mut text = String::new();
    for digit in "4242424242424242".chars() {
        let edit_start = text.len();
        text.push(digit);
        text = format::reformat_pan(&text, edit_start, 1);
    }
    assert_eq!(text, "4242 4242 4242 4242");

    form.update_number(&text);
    assert!(form.number().is_valid());
    assert_eq!(form.brand(), CardBrand::Visa);
    assert_eq!(form.primary_field(), FieldKind::Expiration);

    let mut expiry = String::new();
    for digit in "1230".chars() {
        let edit_start = expiry.len();
        expiry.push(digit);
        expiry = format::reformat_expiration(&expiry, edit_start, 1);
    }
    assert_eq!(expiry, "12/30");
    form.update_expiration(&expiry);
    form.update_cvc("123");
    form.update_holder_name("JANE DOE");
    assert!(form.is_valid());
}

// =============================================================================
// TOKENIZATION SCENARIOS
// =============================================================================

#[tokio::test]
async fn submit_without_challenge_reports_success() {
    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_plain",
        CardVerificationStatus::Verified,
    ))));
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    );

    let form = filled_form();
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    match outcome {
        TokenCreationOutcome::Success(t) => assert_eq!(t.id.0, "tok_plain"),
        other => panic!("unexpected outcome: {other:?}"),
    }
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn invalid_form_fails_locally_without_a_network_call() {
    let service = Arc::new(MockService::default());
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    );

    let form = CardForm::new(FormConfig::default()).with_clock(fixed_now);
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    assert_eq!(outcome, TokenCreationOutcome::Error(TokenError::FormInvalid));
    assert_eq!(service.create_calls.load(Ordering::SeqCst), 0);

    // Submit-without-interaction also surfaced every lazy error
    assert!(form.number().displayed_error().is_some());
    assert!(form.expiration().displayed_error().is_some());
}

#[tokio::test]
async fn unverified_token_walks_the_full_three_d_secure_round_trip() {
    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_3ds",
        CardVerificationStatus::Unverified,
    ))));
    service.respond_finish(Ok(token("tok_3ds", CardVerificationStatus::Verified)));

    let throttle = TokenOperationObserver::with_cooldown(Duration::from_millis(40));
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        Arc::clone(&throttle),
    );
    let form = filled_form();

    // Submit: the service issues an unverified token, the flow pivots
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    let pending = match outcome {
        TokenCreationOutcome::ThreeDSecureRequired(pending) => pending,
        other => panic!("expected a challenge, got {other:?}"),
    };
    assert_eq!(
        pending,
        PendingVerification::UnverifiedToken(TokenId("tok_3ds".to_owned()))
    );
    assert!(matches!(
        flow.state(),
        TokenFlowState::ThreeDSecurePending(_)
    ));

    // The external verification flow reports success with a resource id
    flow.begin_verification().expect("challenge outstanding");
    let outcome = flow
        .resume_verification(VerificationResult::Success(ResourceId(
            "tok_3ds".to_owned(),
        )))
        .await
        .expect("outcome delivered");
    match outcome {
        TokenCreationOutcome::Success(t) => {
            assert_eq!(t.id.0, "tok_3ds");
            assert_eq!(t.card.verification_status, CardVerificationStatus::Verified);
        }
        other => panic!("expected success, got {other:?}"),
    }

    // Throttle ends at Acceptable once the cooldown elapses
    assert_eq!(throttle.status(), TokenOperationStatus::Throttled);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(throttle.status(), TokenOperationStatus::Acceptable);
}

#[tokio::test]
async fn canceled_verification_re_arms_the_form_without_error() {
    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::ThreeDSecureRequired(
        ThreeDSecureToken("tds_x".to_owned()),
    )));
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_retry",
        CardVerificationStatus::Verified,
    ))));

    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    );
    let form = filled_form();

    let outcome = form.submit(&flow).await.expect("outcome delivered");
    assert!(matches!(
        outcome,
        TokenCreationOutcome::ThreeDSecureRequired(_)
    ));

    let outcome = flow.resume_verification(VerificationResult::Canceled).await;
    assert!(outcome.is_none(), "cancel is not an error");
    assert_eq!(flow.state(), TokenFlowState::Idle);

    // Resubmit goes through
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    assert!(matches!(outcome, TokenCreationOutcome::Success(_)));
}

#[tokio::test]
async fn background_handler_confirms_before_success_is_reported() {
    struct CountingHandler {
        calls: AtomicUsize,
    }
    #[async_trait]
    impl BackgroundTokenHandler for CountingHandler {
        async fn handle(&self, _token: &Token) -> CardFormStatus {
            self.calls.fetch_add(1, Ordering::SeqCst);
            CardFormStatus::Complete
        }
    }

    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_bh",
        CardVerificationStatus::Verified,
    ))));
    let handler = Arc::new(CountingHandler {
        calls: AtomicUsize::new(0),
    });
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    )
    .with_background_handler(Arc::clone(&handler) as Arc<dyn BackgroundTokenHandler>);

    let outcome = filled_form().submit(&flow).await.expect("outcome delivered");
    assert!(matches!(outcome, TokenCreationOutcome::Success(_)));
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn background_handler_error_discards_the_token() {
    struct Rejecting;
    #[async_trait]
    impl BackgroundTokenHandler for Rejecting {
        async fn handle(&self, _token: &Token) -> CardFormStatus {
            CardFormStatus::Error("backend said no".to_owned())
        }
    }

    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_rej",
        CardVerificationStatus::Verified,
    ))));
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_rej2",
        CardVerificationStatus::Verified,
    ))));
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    )
    .with_background_handler(Arc::new(Rejecting));

    let form = filled_form();
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    assert_eq!(
        outcome,
        TokenCreationOutcome::Error(TokenError::BackgroundHandler {
            message: "backend said no".to_owned()
        })
    );

    // The form is re-armed for resubmission
    let outcome = form.submit(&flow).await.expect("outcome delivered");
    assert!(matches!(outcome, TokenCreationOutcome::Error(_)));
}

// =============================================================================
// ACCEPTED BRANDS
// =============================================================================

#[tokio::test]
async fn accepted_brands_fetch_failure_supports_identical_retry() {
    let service = MockService::default();
    service.respond_brands(Err(TokenError::network("connection reset")));
    service.respond_brands(Ok(AcceptedBrands {
        brands: vec![CardBrand::Visa, CardBrand::Mastercard],
        livemode: true,
    }));

    let form = CardForm::new(FormConfig::default()).with_clock(fixed_now);

    // First fetch fails; no brand list is stored
    let result = form
        .fetch_accepted_brands(&service)
        .await
        .expect("not disposed");
    assert!(matches!(result, Err(TokenError::Network { .. })));
    assert!(form.accepted_brands().is_none());

    // Retry re-issues the identical fetch and succeeds
    let result = form
        .fetch_accepted_brands(&service)
        .await
        .expect("not disposed");
    let accepted = result.expect("second fetch succeeds");
    assert_eq!(accepted.brands, vec![CardBrand::Visa, CardBrand::Mastercard]);
    assert_eq!(service.brands_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn accepted_brands_list_gates_the_number_field() {
    let service = MockService::default();
    service.respond_brands(Ok(AcceptedBrands {
        brands: vec![CardBrand::Mastercard],
        livemode: false,
    }));

    let form = filled_form();
    assert!(form.is_valid());

    form.fetch_accepted_brands(&service)
        .await
        .expect("not disposed")
        .expect("fetch succeeds");

    // The already-entered Visa number is now rejected
    assert!(!form.is_valid());
    assert!(form.number().error().is_some());
}

// =============================================================================
// TEARDOWN
// =============================================================================

#[tokio::test]
async fn disposed_form_cancels_the_brands_fetch() {
    let service = MockService::default();
    let form = CardForm::new(FormConfig::default()).with_clock(fixed_now);
    form.dispose();

    // A canceled fetch delivers nothing, not an error
    assert!(form.fetch_accepted_brands(&service).await.is_none());
}

#[tokio::test]
async fn flow_state_observers_see_the_whole_submit_lifecycle() {
    let service = Arc::new(MockService::default());
    service.respond_create(Ok(CreateTokenResponse::Issued(token(
        "tok_obs",
        CardVerificationStatus::Verified,
    ))));
    let flow = TokenFlow::new(
        Arc::clone(&service) as Arc<dyn TokenService>,
        TokenOperationObserver::with_cooldown(Duration::from_millis(30)),
    );

    let states = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&states);
    let _sub = flow.observable_state().subscribe(move |state| {
        sink.lock().unwrap().push(state.clone());
    });

    filled_form().submit(&flow).await.expect("outcome delivered");

    let seen = states.lock().unwrap();
    assert_eq!(seen.first(), Some(&TokenFlowState::Submitting));
    assert!(matches!(seen.last(), Some(TokenFlowState::Success(_))));
}
