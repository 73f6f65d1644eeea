//! Token service surface and token data types.
//!
//! The network layer is out of scope; the flow consumes an abstract
//! [`TokenService`] and hands finished tokens to an optional
//! [`BackgroundTokenHandler`]. Everything crossing that boundary is defined
//! here.

use crate::brand::CardBrand;
use crate::cvc::Cvc;
use crate::error::TokenError;
use crate::expiry::CardExpiration;
use crate::number::CardNumber;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a finalized card token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TokenId(pub String);

/// Identifier of a pending 3-D Secure challenge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreeDSecureToken(pub String);

/// Identifier delivered back by the external verification flow.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId(pub String);

/// Tenant scope for platform-style API keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl fmt::Display for TokenId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ThreeDSecureToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether the card behind a token has completed 3-D Secure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CardVerificationStatus {
    /// Verification finished (or was not required).
    Verified,
    /// The issuer wants a challenge before this token is usable.
    Unverified,
}

/// The non-sensitive card summary carried inside a token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedCard {
    /// Detected brand.
    pub brand: CardBrand,
    /// Last four digits of the PAN.
    pub last_four: String,
    /// Expiration month.
    pub exp_month: u8,
    /// Expiration year.
    pub exp_year: u16,
    /// 3-D Secure state of the card.
    pub verification_status: CardVerificationStatus,
}

/// A one-time tokenization reference returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    /// Token identifier, exchanged with the merchant backend.
    pub id: TokenId,
    /// Card summary.
    pub card: TokenizedCard,
    /// False for test-mode keys.
    pub livemode: bool,
}

/// The assembled card data for a create-token call.
///
/// Holds the secure field values; like them, it never exposes the PAN or CVC
/// through `Debug`.
#[derive(Clone)]
pub struct TokenParams {
    /// Validated PAN.
    pub number: CardNumber,
    /// Validated expiration.
    pub expiration: CardExpiration,
    /// Validated security code.
    pub cvc: Cvc,
    /// Cardholder name, when that field is enabled.
    pub name: Option<String>,
    /// Contact email, when that field is enabled.
    pub email: Option<String>,
    /// E.164 phone number, when that field is enabled.
    pub phone: Option<String>,
    /// Request 3-D Secure on this tokenization.
    pub three_d_secure: bool,
    /// Tenant scope, for platform integrations.
    pub tenant: Option<TenantId>,
}

impl fmt::Debug for TokenParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenParams")
            .field("number", &self.number)
            .field("expiration", &self.expiration)
            .field("cvc", &self.cvc)
            .field("name", &self.name)
            .field("three_d_secure", &self.three_d_secure)
            .field("tenant", &self.tenant)
            .finish_non_exhaustive()
    }
}

/// Successful create-token responses.
///
/// Two distinct non-error shapes exist in the wire protocol: the service
/// either issues a token directly (possibly still
/// [`CardVerificationStatus::Unverified`]) or answers with a distinguished
/// 3-D Secure challenge reference instead of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateTokenResponse {
    /// A token was issued. Check its verification status before treating it
    /// as final.
    Issued(Token),
    /// No token yet; the cardholder must complete the referenced challenge.
    ThreeDSecureRequired(ThreeDSecureToken),
}

/// Accepted-brands answer, also carrying the key's livemode flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptedBrands {
    /// Brands this key may tokenize, in display order.
    pub brands: Vec<CardBrand>,
    /// False for test-mode keys.
    pub livemode: bool,
}

/// The tokenization capability the core consumes.
///
/// Implementations own transport, serialization and authentication. Errors
/// must already be mapped onto the [`TokenError`] taxonomy.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Exchanges card data for a token or a 3-D Secure challenge.
    async fn create_token(&self, params: TokenParams) -> Result<CreateTokenResponse, TokenError>;

    /// Completes tokenization after a challenge issued as
    /// [`CreateTokenResponse::ThreeDSecureRequired`].
    async fn create_token_from_three_d_secure(
        &self,
        challenge: &ThreeDSecureToken,
    ) -> Result<Token, TokenError>;

    /// Completes 3-D Secure for an already-issued unverified token.
    async fn finish_three_d_secure(&self, token_id: &TokenId) -> Result<Token, TokenError>;

    /// Fetches the brands the current key accepts.
    async fn accepted_brands(
        &self,
        tenant: Option<&TenantId>,
    ) -> Result<AcceptedBrands, TokenError>;
}

/// Result reported by a [`BackgroundTokenHandler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardFormStatus {
    /// The handler accepted the token; report success to the UI.
    Complete,
    /// The handler rejected the token; the message becomes the terminal
    /// error and the token is discarded.
    Error(String),
}

/// Optional out-of-process hook that receives the finished token (e.g. to
/// notify the merchant backend) before success is reported to the UI.
///
/// Runs off the main sequence; the flow waits for its answer.
#[async_trait]
pub trait BackgroundTokenHandler: Send + Sync {
    /// Processes a finished token.
    async fn handle(&self, token: &Token) -> CardFormStatus;
}
