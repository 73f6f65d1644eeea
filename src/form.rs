//! The card form aggregator.
//!
//! [`CardForm`] owns one [`FieldInput`] per enabled field and recomputes the
//! derived state on every keystroke: the detected brand, overall validity,
//! and the primary field the UI should focus next. Which optional fields
//! (holder name, email, phone) exist is fixed at construction; a disabled
//! field is excluded from validity computation entirely, not merely skipped
//! when empty.
//!
//! Update ordering guarantee: a number edit that changes the detected brand
//! force-revalidates the CVC synchronously within the same update, before
//! validity is recomputed, so validity never observes a stale CVC-length
//! requirement.

use crate::brand::CardBrand;
use crate::cancel::CancellationToken;
use crate::contact::{transform_email, transform_holder_name};
use crate::cvc::{transform_cvc, Cvc};
use crate::detect::detect_brand_str;
use crate::error::TokenError;
use crate::expiry::{current_year_month, transform_expiration, CardExpiration, YearMonth};
use crate::field::{FieldInput, FieldKind};
use crate::flow::{TokenCreationOutcome, TokenFlow};
use crate::number::{transform_number, CardNumber};
use crate::observable::ObservableValue;
use crate::phone::{transform_phone, CountryCode, ExampleLengthStrategy, PhoneNumberStrategy};
use crate::token::{AcceptedBrands, TenantId, TokenParams, TokenService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

/// Construction-time form configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormConfig {
    /// Collect the cardholder name.
    pub holder_name_enabled: bool,
    /// Collect a contact email.
    pub email_enabled: bool,
    /// Collect a contact phone number.
    pub phone_enabled: bool,
    /// Request 3-D Secure on tokenization.
    pub three_d_secure: bool,
    /// Tenant scope for platform integrations.
    pub tenant: Option<TenantId>,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            holder_name_enabled: true,
            email_enabled: false,
            phone_enabled: false,
            three_d_secure: false,
            tenant: None,
        }
    }
}

/// The raw state worth persisting across configuration changes or process
/// death. Everything else is recomputed on restore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormSnapshot {
    /// Number field text as entered.
    pub number: String,
    /// Expiration field text as entered.
    pub expiration: String,
    /// Security-code field text as entered.
    pub cvc: String,
    /// Holder-name field text as entered.
    pub holder_name: String,
    /// Email field text as entered.
    pub email: String,
    /// Phone field text as entered.
    pub phone: String,
    /// Selected region (alpha-2).
    pub region: String,
}

/// The card-entry view model.
pub struct CardForm {
    config: FormConfig,
    phone_strategy: Arc<dyn PhoneNumberStrategy>,
    clock: fn() -> YearMonth,

    number: ObservableValue<FieldInput<CardNumber>>,
    expiration: ObservableValue<FieldInput<CardExpiration>>,
    cvc: ObservableValue<FieldInput<Cvc>>,
    holder_name: ObservableValue<FieldInput<String>>,
    email: ObservableValue<FieldInput<String>>,
    phone: ObservableValue<FieldInput<String>>,

    brand: ObservableValue<CardBrand>,
    country: ObservableValue<CountryCode>,
    accepted_brands: ObservableValue<Option<AcceptedBrands>>,
    valid: ObservableValue<bool>,
    primary_field: ObservableValue<FieldKind>,

    cancel: CancellationToken,
}

impl CardForm {
    /// Creates a form with the given configuration.
    pub fn new(config: FormConfig) -> Self {
        Self {
            config,
            phone_strategy: Arc::new(ExampleLengthStrategy),
            clock: current_year_month,
            number: ObservableValue::new(FieldInput::default()),
            expiration: ObservableValue::new(FieldInput::default()),
            cvc: ObservableValue::new(FieldInput::default()),
            holder_name: ObservableValue::new(FieldInput::default()),
            email: ObservableValue::new(FieldInput::default()),
            phone: ObservableValue::new(FieldInput::default()),
            brand: ObservableValue::new(CardBrand::Unknown),
            country: ObservableValue::new(default_country()),
            accepted_brands: ObservableValue::new(None),
            valid: ObservableValue::new(false),
            primary_field: ObservableValue::new(FieldKind::Number),
            cancel: CancellationToken::new(),
        }
    }

    /// Replaces the phone normalization strategy.
    pub fn with_phone_strategy(mut self, strategy: Arc<dyn PhoneNumberStrategy>) -> Self {
        self.phone_strategy = strategy;
        self
    }

    /// Replaces the clock used for expiration checks. Meant for tests.
    pub fn with_clock(mut self, clock: fn() -> YearMonth) -> Self {
        self.clock = clock;
        self
    }

    /// The form configuration.
    pub fn config(&self) -> &FormConfig {
        &self.config
    }

    // --- field updates -----------------------------------------------------

    /// Replaces the number field from raw text.
    pub fn update_number(&self, text: &str) {
        let was_valid = self.number.get().is_valid();
        let accepted = self.accepted_brands.get();
        let input = transform_number(text, accepted.as_ref().map(|a| a.brands.as_slice()));
        self.number.set(input);
        self.sync_brand(text);
        self.after_update(FieldKind::Number, was_valid);
    }

    /// Replaces the expiration field from raw text.
    pub fn update_expiration(&self, text: &str) {
        let was_valid = self.expiration.get().is_valid();
        self.expiration.set(transform_expiration(text, (self.clock)()));
        self.after_update(FieldKind::Expiration, was_valid);
    }

    /// Replaces the security-code field from raw text.
    pub fn update_cvc(&self, text: &str) {
        let was_valid = self.cvc.get().is_valid();
        self.cvc.set(transform_cvc(text, self.brand.get()));
        self.after_update(FieldKind::Cvc, was_valid);
    }

    /// Replaces the holder-name field from raw text.
    pub fn update_holder_name(&self, text: &str) {
        let was_valid = self.holder_name.get().is_valid();
        self.holder_name.set(transform_holder_name(text));
        self.after_update(FieldKind::HolderName, was_valid);
    }

    /// Replaces the email field from raw text.
    pub fn update_email(&self, text: &str) {
        let was_valid = self.email.get().is_valid();
        self.email.set(transform_email(text));
        self.after_update(FieldKind::Email, was_valid);
    }

    /// Replaces the phone field from raw text.
    pub fn update_phone(&self, text: &str) {
        let was_valid = self.phone.get().is_valid();
        self.phone.set(transform_phone(
            text,
            self.country.get(),
            self.phone_strategy.as_ref(),
        ));
        self.after_update(FieldKind::PhoneNumber, was_valid);
    }

    /// Selects the phone region and revalidates the phone field against it.
    pub fn set_country(&self, country: CountryCode) {
        self.country.set(country);
        let raw = self.phone.get().raw().to_owned();
        self.phone
            .set(transform_phone(&raw, country, self.phone_strategy.as_ref()));
        self.recompute_validity();
    }

    /// Re-runs every enabled transform and promotes all lazy errors to
    /// immediate. Called when submit is pressed without prior interaction so
    /// untouched fields surface their errors.
    pub fn validate_all(&self) {
        let number_raw = self.number.get().raw().to_owned();
        let accepted = self.accepted_brands.get();
        self.number.set(
            transform_number(&number_raw, accepted.as_ref().map(|a| a.brands.as_slice()))
                .with_errors_promoted(),
        );
        self.sync_brand(&number_raw);

        let cvc_raw = self.cvc.get().raw().to_owned();
        self.cvc
            .set(transform_cvc(&cvc_raw, self.brand.get()).with_errors_promoted());

        let expiration_raw = self.expiration.get().raw().to_owned();
        self.expiration.set(
            transform_expiration(&expiration_raw, (self.clock)()).with_errors_promoted(),
        );

        if self.config.holder_name_enabled {
            let raw = self.holder_name.get().raw().to_owned();
            self.holder_name
                .set(transform_holder_name(&raw).with_errors_promoted());
        }
        if self.config.email_enabled {
            let raw = self.email.get().raw().to_owned();
            self.email.set(transform_email(&raw).with_errors_promoted());
        }
        if self.config.phone_enabled {
            let raw = self.phone.get().raw().to_owned();
            self.phone.set(
                transform_phone(&raw, self.country.get(), self.phone_strategy.as_ref())
                    .with_errors_promoted(),
            );
        }

        self.recompute_validity();
    }

    // --- derived state -----------------------------------------------------

    /// Overall validity over the enabled fields.
    pub fn is_valid(&self) -> bool {
        self.valid.get()
    }

    /// Observable overall validity, for submit-button wiring.
    pub fn observable_valid(&self) -> &ObservableValue<bool> {
        &self.valid
    }

    /// The currently detected brand.
    pub fn brand(&self) -> CardBrand {
        self.brand.get()
    }

    /// Observable detected brand.
    pub fn observable_brand(&self) -> &ObservableValue<CardBrand> {
        &self.brand
    }

    /// The field the UI should focus next.
    pub fn primary_field(&self) -> FieldKind {
        self.primary_field.get()
    }

    /// Observable primary field.
    pub fn observable_primary_field(&self) -> &ObservableValue<FieldKind> {
        &self.primary_field
    }

    /// The selected phone region.
    pub fn country(&self) -> CountryCode {
        self.country.get()
    }

    /// The accepted-brands list, once fetched. Gates which brand logos the
    /// UI shows before first submit.
    pub fn accepted_brands(&self) -> Option<AcceptedBrands> {
        self.accepted_brands.get()
    }

    /// Observable accepted-brands list.
    pub fn observable_accepted_brands(&self) -> &ObservableValue<Option<AcceptedBrands>> {
        &self.accepted_brands
    }

    /// Current number field state.
    pub fn number(&self) -> FieldInput<CardNumber> {
        self.number.get()
    }

    /// Observable number field state.
    pub fn observable_number(&self) -> &ObservableValue<FieldInput<CardNumber>> {
        &self.number
    }

    /// Current expiration field state.
    pub fn expiration(&self) -> FieldInput<CardExpiration> {
        self.expiration.get()
    }

    /// Observable expiration field state.
    pub fn observable_expiration(&self) -> &ObservableValue<FieldInput<CardExpiration>> {
        &self.expiration
    }

    /// Current security-code field state.
    pub fn cvc(&self) -> FieldInput<Cvc> {
        self.cvc.get()
    }

    /// Observable security-code field state.
    pub fn observable_cvc(&self) -> &ObservableValue<FieldInput<Cvc>> {
        &self.cvc
    }

    /// Current holder-name field state.
    pub fn holder_name(&self) -> FieldInput<String> {
        self.holder_name.get()
    }

    /// Observable holder-name field state.
    pub fn observable_holder_name(&self) -> &ObservableValue<FieldInput<String>> {
        &self.holder_name
    }

    /// Current email field state.
    pub fn email(&self) -> FieldInput<String> {
        self.email.get()
    }

    /// Observable email field state.
    pub fn observable_email(&self) -> &ObservableValue<FieldInput<String>> {
        &self.email
    }

    /// Current phone field state.
    pub fn phone(&self) -> FieldInput<String> {
        self.phone.get()
    }

    /// Observable phone field state.
    pub fn observable_phone(&self) -> &ObservableValue<FieldInput<String>> {
        &self.phone
    }

    // --- submission --------------------------------------------------------

    /// Validates everything and submits through the given flow.
    ///
    /// When the form is invalid the result is an immediate
    /// [`TokenError::FormInvalid`] that never reaches the network. `None`
    /// keeps the flow's meaning: duplicate submit or canceled.
    pub async fn submit(&self, flow: &TokenFlow) -> Option<TokenCreationOutcome> {
        self.validate_all();
        match self.token_params() {
            Ok(params) => flow.submit(params).await,
            Err(error) => {
                debug!("submit rejected locally: form invalid");
                Some(TokenCreationOutcome::Error(error))
            }
        }
    }

    /// Assembles the token request from the current normalized values.
    ///
    /// Fails with [`TokenError::FormInvalid`] unless every enabled field is
    /// valid.
    pub fn token_params(&self) -> Result<TokenParams, TokenError> {
        if !self.compute_validity() {
            return Err(TokenError::FormInvalid);
        }
        let number = self
            .number
            .get()
            .value()
            .cloned()
            .ok_or(TokenError::FormInvalid)?;
        let expiration = self
            .expiration
            .get()
            .value()
            .copied()
            .ok_or(TokenError::FormInvalid)?;
        let cvc = self.cvc.get().value().cloned().ok_or(TokenError::FormInvalid)?;

        let name = if self.config.holder_name_enabled {
            Some(
                self.holder_name
                    .get()
                    .value()
                    .cloned()
                    .ok_or(TokenError::FormInvalid)?,
            )
        } else {
            None
        };
        let email = if self.config.email_enabled {
            Some(self.email.get().value().cloned().ok_or(TokenError::FormInvalid)?)
        } else {
            None
        };
        let phone = if self.config.phone_enabled {
            Some(self.phone.get().value().cloned().ok_or(TokenError::FormInvalid)?)
        } else {
            None
        };

        Ok(TokenParams {
            number,
            expiration,
            cvc,
            name,
            email,
            phone,
            three_d_secure: self.config.three_d_secure,
            tenant: self.config.tenant.clone(),
        })
    }

    /// Fetches the accepted-brands list and stores it, revalidating the
    /// number field against it.
    ///
    /// Errors are returned for the UI's retry affordance; retrying re-issues
    /// the identical fetch. `None` means the form was disposed mid-fetch.
    pub async fn fetch_accepted_brands(
        &self,
        service: &dyn TokenService,
    ) -> Option<Result<AcceptedBrands, TokenError>> {
        let result = tokio::select! {
            _ = self.cancel.canceled() => return None,
            result = service.accepted_brands(self.config.tenant.as_ref()) => result,
        };
        match result {
            Ok(accepted) => {
                debug!(brands = accepted.brands.len(), "accepted brands loaded");
                self.accepted_brands.set(Some(accepted.clone()));
                // Re-gate the number without moving focus
                let raw = self.number.get().raw().to_owned();
                if !raw.is_empty() {
                    self.number
                        .set(transform_number(&raw, Some(accepted.brands.as_slice())));
                }
                self.recompute_validity();
                Some(Ok(accepted))
            }
            Err(error) => Some(Err(error)),
        }
    }

    // --- persistence -------------------------------------------------------

    /// The raw state to persist across configuration changes.
    pub fn snapshot(&self) -> FormSnapshot {
        FormSnapshot {
            number: self.number.get().raw().to_owned(),
            expiration: self.expiration.get().raw().to_owned(),
            cvc: self.cvc.get().raw().to_owned(),
            holder_name: self.holder_name.get().raw().to_owned(),
            email: self.email.get().raw().to_owned(),
            phone: self.phone.get().raw().to_owned(),
            region: self.country.get().region().to_owned(),
        }
    }

    /// Rebuilds field state from a persisted snapshot.
    pub fn restore(&self, snapshot: &FormSnapshot) {
        if let Some(country) = CountryCode::from_region(&snapshot.region) {
            self.country.set(country);
        }
        self.update_number(&snapshot.number);
        self.update_expiration(&snapshot.expiration);
        self.update_cvc(&snapshot.cvc);
        self.update_holder_name(&snapshot.holder_name);
        self.update_email(&snapshot.email);
        self.update_phone(&snapshot.phone);
    }

    /// Tears the form down: cancels in-flight work and closes every
    /// observable. No emissions happen afterwards.
    pub fn dispose(&self) {
        self.cancel.cancel();
        self.number.close();
        self.expiration.close();
        self.cvc.close();
        self.holder_name.close();
        self.email.close();
        self.phone.close();
        self.brand.close();
        self.country.close();
        self.accepted_brands.close();
        self.valid.close();
        self.primary_field.close();
    }

    // --- internals ---------------------------------------------------------

    /// Re-detects the brand and, when it changed, force-revalidates the CVC
    /// before anyone can observe validity.
    fn sync_brand(&self, number_text: &str) {
        let brand = detect_brand_str(number_text);
        if brand != self.brand.get() {
            debug!(%brand, "brand changed");
            self.brand.set(brand);
            let cvc_raw = self.cvc.get().raw().to_owned();
            self.cvc.set(transform_cvc(&cvc_raw, brand));
        }
    }

    fn after_update(&self, kind: FieldKind, was_valid: bool) {
        self.recompute_validity();
        let became_valid = !was_valid && self.is_field_valid(kind);
        if became_valid && kind != FieldKind::HolderName {
            self.advance_primary_field();
        }
    }

    fn recompute_validity(&self) {
        self.valid.set(self.compute_validity());
    }

    fn compute_validity(&self) -> bool {
        let mut ok = self.number.get().is_valid()
            && self.expiration.get().is_valid()
            && self.cvc.get().is_valid();
        if self.config.holder_name_enabled {
            ok &= self.holder_name.get().is_valid();
        }
        if self.config.email_enabled {
            ok &= self.email.get().is_valid();
        }
        if self.config.phone_enabled {
            ok &= self.phone.get().is_valid();
        }
        ok
    }

    fn is_field_enabled(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Number | FieldKind::Expiration | FieldKind::Cvc => true,
            FieldKind::HolderName => self.config.holder_name_enabled,
            FieldKind::Email => self.config.email_enabled,
            FieldKind::PhoneNumber => self.config.phone_enabled,
        }
    }

    fn is_field_valid(&self, kind: FieldKind) -> bool {
        match kind {
            FieldKind::Number => self.number.get().is_valid(),
            FieldKind::Expiration => self.expiration.get().is_valid(),
            FieldKind::Cvc => self.cvc.get().is_valid(),
            FieldKind::HolderName => self.holder_name.get().is_valid(),
            FieldKind::Email => self.email.get().is_valid(),
            FieldKind::PhoneNumber => self.phone.get().is_valid(),
        }
    }

    /// Points the primary field at the first enabled field that is still
    /// incomplete, in the fixed order. Leaves it alone once everything is
    /// complete.
    fn advance_primary_field(&self) {
        for kind in FieldKind::ORDER {
            if self.is_field_enabled(kind) && !self.is_field_valid(kind) {
                self.primary_field.set(kind);
                return;
            }
        }
    }
}

fn default_country() -> CountryCode {
    CountryCode::from_region("JP").unwrap_or(CountryCode::ALL[0])
}
