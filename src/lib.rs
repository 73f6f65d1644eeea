//! # cardform
//!
//! Card entry form core: keystroke-level input formatting and validation,
//! form-level aggregation, and the token-creation / 3-D Secure flow.
//!
//! This crate is the engine behind a card-entry UI, not the UI itself. It
//! turns raw text into formatted input and validated values, aggregates
//! per-field validity into a submit signal, and drives tokenization against
//! an abstract [`TokenService`] — pausing for an external 3-D Secure
//! challenge and resuming on its redirect callback. Widgets, HTTP transport
//! and JSON schemas live in the host application.
//!
//! ## Input formatting
//!
//! ```rust
//! use cardform::format::{reformat_pan, reformat_expiration};
//!
//! // Completing a digit group inserts the delimiter
//! assert_eq!(reformat_pan("4242", 3, 1), "4242 ");
//! // Amex input regroups as 4-6-5
//! assert_eq!(reformat_pan("378282246310005", 14, 1), "3782 822463 10005");
//! // Months that can only be single-digit are zero-prefixed
//! assert_eq!(reformat_expiration("2", 0, 1), "02/");
//! ```
//!
//! ## Validation
//!
//! ```rust
//! use cardform::number::transform_number;
//! use cardform::CardBrand;
//!
//! let input = transform_number("4242 4242 4242 4242", None);
//! assert!(input.is_valid());
//! assert_eq!(input.value().unwrap().brand(), CardBrand::Visa);
//!
//! // Errors carry a lazy/immediate visibility flag
//! let input = transform_number("4242", None);
//! assert!(input.error().unwrap().lazy);
//! assert_eq!(input.displayed_error(), None);
//! ```
//!
//! ## Form aggregation
//!
//! ```rust
//! use cardform::form::{CardForm, FormConfig};
//! use cardform::field::FieldKind;
//!
//! let form = CardForm::new(FormConfig::default());
//! form.update_number("4242424242424242");
//! // Focus advances to the next incomplete field
//! assert_eq!(form.primary_field(), FieldKind::Expiration);
//! form.update_expiration("12/45");
//! form.update_cvc("123");
//! form.update_holder_name("JANE DOE");
//! assert!(form.is_valid());
//! ```
//!
//! ## Tokenization
//!
//! [`TokenFlow`] sequences submit → token or challenge → external
//! verification → finish. The throttle ([`TokenOperationObserver`]) is a
//! process-wide advisory signal for submit-button enablement, shared across
//! forms by explicit injection.
//!
//! ## Security
//!
//! - PAN and CVC live in fixed-size arrays zeroed on drop
//! - `Debug` and `Display` only ever show masked card data
//! - Nothing in this crate logs or renders a full card number

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod brand;
pub mod cancel;
pub mod contact;
pub mod cvc;
pub mod detect;
pub mod error;
pub mod expiry;
pub mod field;
pub mod flow;
pub mod form;
pub mod format;
pub mod luhn;
pub mod mask;
pub mod number;
pub mod observable;
pub mod phone;
pub mod throttle;
pub mod token;

// Re-export the main types at the crate root
pub use brand::{CardBrand, MAX_PAN_DIGITS, MIN_PAN_DIGITS};
pub use error::{ApiError, ApiErrorKind, DefaultErrorTranslator, ErrorTranslator, TokenError};
pub use expiry::{CardExpiration, YearMonth};
pub use field::{FieldError, FieldErrorCode, FieldInput, FieldKind};
pub use flow::{
    PendingVerification, TokenCreationOutcome, TokenFlow, TokenFlowState, TransientNotice,
    VerificationFlowLauncher, VerificationResult,
};
pub use form::{CardForm, FormConfig, FormSnapshot};
pub use number::CardNumber;
pub use observable::{ObservableValue, Subscription};
pub use phone::{CountryCode, PhoneNumberStrategy};
pub use throttle::{TokenOperationObserver, TokenOperationStatus};
pub use token::{
    AcceptedBrands, BackgroundTokenHandler, CardFormStatus, CardVerificationStatus,
    CreateTokenResponse, ResourceId, TenantId, ThreeDSecureToken, Token, TokenId, TokenParams,
    TokenService, TokenizedCard,
};
