use {
    crate::domain::mapping::Payload,
    model::buyer::{AuthConfig, Buyer},
    reqwest::{Client, RequestBuilder},
    thiserror::Error,
};

pub mod dto;

const RESPONSE_SIZE_LIMIT: usize = 1_000_000;

/// Outcome of a bid request that got an HTTP-level answer.
#[derive(Clone, Debug)]
pub struct PingOutcome {
    pub accepted: bool,
    pub bid_amount: Option<rust_decimal::Decimal>,
    pub rejection_reason: Option<String>,
}

/// Outcome of a delivery attempt that got an HTTP-level answer.
#[derive(Clone, Debug)]
pub struct PostOutcome {
    pub success: bool,
    pub buyer_lead_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("transport error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("bad status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("response too large")]
    ResponseTooLarge,
    #[error("bad json: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Seam to the buyer panel. The engine only ever talks to buyers through
/// this trait; timeouts are enforced by the callers because ping and post
/// budgets differ per buyer.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait BuyerApi: Send + Sync {
    async fn ping(&self, buyer: &Buyer, payload: &Payload) -> Result<PingOutcome, CallError>;
    async fn post(&self, buyer: &Buyer, payload: &Payload) -> Result<PostOutcome, CallError>;
}

pub struct HttpBuyerApi {
    client: Client,
}

impl HttpBuyerApi {
    pub fn new() -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: Client::builder().build()?,
        })
    }

    async fn request_response<Response>(
        &self,
        buyer: &Buyer,
        payload: &Payload,
    ) -> Result<Response, CallError>
    where
        Response: serde::de::DeserializeOwned,
    {
        let request = self.client.post(buyer.api_url.clone()).json(payload);
        let mut response = authorize(request, &buyer.auth).send().await?;
        let status = response.status().as_u16();
        let body = response_body_with_size_limit(&mut response, RESPONSE_SIZE_LIMIT).await?;
        let text = String::from_utf8_lossy(&body);
        tracing::trace!(buyer = %buyer.name, %status, body = %text, "buyer response");
        if !(200..300).contains(&status) {
            return Err(CallError::Status {
                status,
                body: text.into_owned(),
            });
        }
        serde_json::from_slice(&body).map_err(CallError::Decode)
    }
}

#[async_trait::async_trait]
impl BuyerApi for HttpBuyerApi {
    async fn ping(&self, buyer: &Buyer, payload: &Payload) -> Result<PingOutcome, CallError> {
        let response: dto::PingResponse = self.request_response(buyer, payload).await?;
        Ok(PingOutcome {
            accepted: response.accepted,
            bid_amount: response.bid_amount,
            rejection_reason: response.rejection_reason,
        })
    }

    async fn post(&self, buyer: &Buyer, payload: &Payload) -> Result<PostOutcome, CallError> {
        let response: dto::PostResponse = self.request_response(buyer, payload).await?;
        Ok(PostOutcome {
            success: response.success,
            buyer_lead_id: response.buyer_lead_id,
            error: response.error,
        })
    }
}

/// Applies the buyer's auth material to an outbound request. Single seam
/// for all auth schemes in the panel.
fn authorize(request: RequestBuilder, auth: &AuthConfig) -> RequestBuilder {
    match auth {
        AuthConfig::ApiKey { header, key } => request.header(header, key),
        AuthConfig::Bearer { token } => request.bearer_auth(token),
        AuthConfig::Basic { username, password } => {
            request.basic_auth(username, Some(password))
        }
    }
}

/// Reads the body while enforcing an upper bound, protecting against
/// buyers streaming unbounded responses.
async fn response_body_with_size_limit(
    response: &mut reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, CallError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if bytes.len() + chunk.len() > limit {
            return Err(CallError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }
    Ok(bytes)
}
