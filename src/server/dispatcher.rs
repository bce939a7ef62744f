//! Request dispatcher.
//!
//! Order of evaluation for every request:
//! 1. refuse everything with 503 if no token is configured
//! 2. answer `/health` without authentication
//! 3. authenticate (randomized delay before answering a failure)
//! 4. route by exact path, validate, call the storage port
//!
//! All failures are raised as [`ApiError`] and turned into a response in one place,
//! [`Dispatcher::handle`].

use std::sync::Arc;

use axum::http::{Method, StatusCode};

use super::error::{ApiError, LimitKind};
use super::protocol::*;
use super::request::{ApiRequest, ClientPayload};
use crate::auth::{AccessToken, AuthRegistry, auth_failure_delay, extract_token};
use crate::storage::{StorageInterface, StorageLimits, StoreListOptions};

/// Outcome of a request, ready to be written to the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Envelope>,
    pub allow: Option<&'static str>,
}

impl Reply {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            body: None,
            allow: None,
        }
    }

    fn success(status: StatusCode, payload: SuccessPayload) -> Self {
        Self {
            status,
            body: Some(Envelope::success(payload)),
            allow: None,
        }
    }

    fn with_allow(mut self, allow: &'static str) -> Self {
        self.allow = Some(allow);
        self
    }

    fn from_error(err: &ApiError) -> Self {
        Self {
            status: err.status(),
            body: Some(Envelope::failure(err.client_message())),
            allow: err.allow(),
        }
    }
}

/// Stateless request handler over an injected storage port and token registry.
pub struct Dispatcher {
    storage: Arc<dyn StorageInterface>,
    auth: AuthRegistry,
}

impl Dispatcher {
    pub fn new(storage: Arc<dyn StorageInterface>, auth: AuthRegistry) -> Self {
        Self { storage, auth }
    }

    /// Size limits of the underlying storage port.
    pub fn limits(&self) -> StorageLimits {
        self.storage.limits()
    }

    pub async fn handle(&self, request: &ApiRequest) -> Reply {
        match self.route(request).await {
            Ok(reply) => reply,
            Err(err) => {
                if err.is_internal() {
                    tracing::error!("Request rejected: {}", err);
                } else {
                    tracing::warn!("Request rejected: {}", err);
                }
                Reply::from_error(&err)
            }
        }
    }

    async fn route(&self, request: &ApiRequest) -> Result<Reply, ApiError> {
        if self.auth.is_empty() {
            return Err(ApiError::ServerConfiguration);
        }

        if request.path == ENDPOINT_HEALTH {
            return Ok(health(request));
        }

        let payload = request.json_payload();
        let token = extract_token(
            request.authorization(),
            request.query(PARAM_TOKEN),
            payload.as_ref().and_then(|p| p.auth_token.as_deref()),
        );

        let Some(access) = self.auth.authenticate(token) else {
            tokio::time::sleep(auth_failure_delay()).await;
            return Err(ApiError::Unauthorized);
        };

        match request.path.as_str() {
            ENDPOINT_AUTH | ENDPOINT_PING => Ok(auth_check(request, access)),
            ENDPOINT_ROOT | ENDPOINT_CRUD => self.crud(request, payload.as_ref(), access).await,
            ENDPOINT_LIST => self.list(request, access).await,
            other => Err(ApiError::NoRoute(other.to_string())),
        }
    }

    async fn crud(
        &self,
        request: &ApiRequest,
        payload: Option<&ClientPayload>,
        access: &AccessToken,
    ) -> Result<Reply, ApiError> {
        let record_id = first_non_empty([
            request.query(PARAM_RECORD_ID),
            payload.and_then(|p| p.record_id.as_deref()),
        ])
        .ok_or_else(|| ApiError::InvalidRequest("record_id is not provided or is empty".into()))?;

        let limits = self.storage.limits();
        if record_id.len() > limits.max_key_size {
            return Err(ApiError::LimitExceeded {
                kind: LimitKind::RecordId,
                limit: limits.max_key_size,
                actual: record_id.len(),
            });
        }

        match request.method {
            Method::OPTIONS => return Ok(Reply::empty(StatusCode::NO_CONTENT).with_allow(CRUD_ALLOW)),
            Method::GET => {
                let data = self
                    .storage
                    .read(record_id)
                    .await?
                    .filter(|data| !data.is_empty());
                return Ok(Reply::success(StatusCode::OK, SuccessPayload::Read { data }));
            }
            _ => {}
        }

        if !access.write_access {
            return Err(ApiError::WriteAccessDenied(record_id.to_string()));
        }

        match request.method {
            Method::POST | Method::PUT | Method::PATCH => {
                if request.has_oversized_body() {
                    return Err(ApiError::LimitExceeded {
                        kind: LimitKind::Data,
                        limit: limits.max_record_size,
                        actual: request
                            .content_length()
                            .unwrap_or(limits.max_record_size.saturating_add(1)),
                    });
                }

                let data = first_non_empty([
                    payload.and_then(|p| p.data.as_deref()),
                    request.query(PARAM_DATA),
                    request.text_body(),
                ])
                .ok_or_else(|| ApiError::EmptyPayload(record_id.to_string()))?;

                if data.len() > limits.max_record_size {
                    return Err(ApiError::LimitExceeded {
                        kind: LimitKind::Data,
                        limit: limits.max_record_size,
                        actual: data.len(),
                    });
                }

                self.write(&request.method, record_id, data).await
            }
            Method::DELETE => {
                self.storage.delete(record_id).await?;
                Ok(Reply::success(StatusCode::ACCEPTED, SuccessPayload::Delete))
            }
            _ => Err(ApiError::MethodNotSupported {
                method: request.method.clone(),
                reason: "unsupported http method",
                allow: Some(CRUD_ALLOW),
            }),
        }
    }

    /// PUT creates only, PATCH updates only, POST upserts.
    async fn write(&self, method: &Method, record_id: &str, data: &str) -> Result<Reply, ApiError> {
        if *method == Method::PUT {
            if !self.storage.create(record_id, data).await? {
                return Err(ApiError::RecordAlreadyExists(record_id.to_string()));
            }
            return Ok(Reply::success(StatusCode::CREATED, SuccessPayload::Create));
        }

        if *method == Method::PATCH {
            if !self.storage.update(record_id, data).await? {
                return Err(ApiError::RecordNotFound(record_id.to_string()));
            }
            return Ok(Reply::success(StatusCode::ACCEPTED, SuccessPayload::Update));
        }

        self.storage.write(record_id, data).await?;
        Ok(Reply::success(StatusCode::OK, SuccessPayload::Update))
    }

    async fn list(&self, request: &ApiRequest, access: &AccessToken) -> Result<Reply, ApiError> {
        if !access.write_access {
            return Err(ApiError::ListAccessDenied);
        }
        if request.method != Method::GET {
            return Err(ApiError::MethodNotSupported {
                method: request.method.clone(),
                reason: "you cannot mutate data using this operation",
                allow: Some(LIST_ALLOW),
            });
        }

        let listing = self
            .storage
            .list(StoreListOptions {
                prefix: request.query(PARAM_PREFIX).map(str::to_string),
                cursor: request.query(PARAM_PAGE).map(str::to_string),
                limit: None,
            })
            .await?;

        let next_page = if listing.list_complete {
            None
        } else {
            listing.cursor
        };

        Ok(Reply::success(
            StatusCode::OK,
            SuccessPayload::List {
                entries: listing.keys.into_iter().map(ListedRecord::from).collect(),
                next_page,
                list_complete: listing.list_complete,
            },
        ))
    }
}

fn wants_json_report(request: &ApiRequest) -> bool {
    request.query(PARAM_REPORT) == Some("json")
}

fn health(request: &ApiRequest) -> Reply {
    if wants_json_report(request) {
        return Reply::success(StatusCode::OK, SuccessPayload::Health { date: now_ms() });
    }
    Reply::empty(StatusCode::OK)
}

fn auth_check(request: &ApiRequest, access: &AccessToken) -> Reply {
    if wants_json_report(request) {
        return Reply::success(
            StatusCode::OK,
            SuccessPayload::Ping {
                rights: access.rights(),
            },
        );
    }
    Reply::empty(StatusCode::OK)
}

fn first_non_empty<'a, const N: usize>(candidates: [Option<&'a str>; N]) -> Option<&'a str> {
    candidates
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
}
