//! Supabase HTTP client: request plumbing, auth endpoints and RPCs.
//!
//! Table operations live in `tables.rs`; this file owns everything that
//! touches headers, status codes and error bodies.

use std::sync::Arc;

use reqwest::header::{CONTENT_RANGE, HeaderValue};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, instrument};
use url::Url;

use pyrowarden_core::{AppRole, Email, UserId};

use super::backend::{AuthBackend, RoleBackend};
use super::query::{RestQuery, parse_content_range_total};
use super::types::{
    AccessToken, AuthSession, AuthUser, NewUserRole, SignUpOutcome, SignUpRequest,
};
use super::{BackendError, BackendResult};
use crate::config::SupabaseConfig;

/// Maximum characters of a response body copied into logs.
const LOG_BODY_LIMIT: usize = 500;

// =============================================================================
// SupabaseClient
// =============================================================================

/// Client for the Supabase auth and REST APIs.
///
/// Cheap to clone; all clones share one connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    inner: Arc<SupabaseClientInner>,
}

struct SupabaseClientInner {
    http: reqwest::Client,
    auth_base: Url,
    rest_base: Url,
    anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("rest_base", &self.inner.rest_base.as_str())
            .finish_non_exhaustive()
    }
}

/// Error body shapes from PostgREST (`code`/`message`) and GoTrue
/// (`error_code`/`msg` or `error`/`error_description`).
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    code: Option<serde_json::Value>,
    error_code: Option<String>,
    message: Option<String>,
    msg: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_error(self, status: StatusCode) -> BackendError {
        let code = self
            .error_code
            .or_else(|| match self.code {
                Some(serde_json::Value::String(code)) => Some(code),
                _ => None,
            })
            .or_else(|| self.error.clone());
        let message = self
            .message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
            .unwrap_or_else(|| format!("HTTP {status}"));

        BackendError::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

impl SupabaseClient {
    /// Create a new client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built or the project URL
    /// cannot be extended with the API paths.
    pub fn new(config: &SupabaseConfig) -> BackendResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pyrowarden/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            inner: Arc::new(SupabaseClientInner {
                http,
                auth_base: config.url.join("auth/v1/")?,
                rest_base: config.url.join("rest/v1/")?,
                anon_key: config.anon_key.clone(),
            }),
        })
    }

    /// Attach `apikey` and `Authorization` headers.
    ///
    /// Without a caller the anon key is the bearer, which RLS treats as the
    /// `anon` role.
    fn authorize(&self, builder: RequestBuilder, caller: Option<&AccessToken>) -> RequestBuilder {
        let anon = self.inner.anon_key.expose_secret();
        let bearer = caller.map_or(anon, AccessToken::expose);
        builder.header("apikey", anon).bearer_auth(bearer)
    }

    fn auth_url(&self, path: &str, params: &[(&str, &str)]) -> BackendResult<Url> {
        let mut url = self.inner.auth_base.join(path)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    pub(super) fn rest(
        &self,
        method: Method,
        query: &RestQuery,
        caller: Option<&AccessToken>,
    ) -> BackendResult<RequestBuilder> {
        let url = query.to_url(&self.inner.rest_base)?;
        Ok(self.authorize(self.inner.http.request(method, url), caller))
    }

    /// Send a request and turn non-success responses into [`BackendError`].
    pub(super) async fn send(
        &self,
        builder: RequestBuilder,
        context: &'static str,
    ) -> BackendResult<Response> {
        let response = builder.send().await?;
        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(BackendError::RateLimited(retry_after));
        }

        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let err = serde_json::from_str::<ErrorBody>(&body)
            .unwrap_or_default()
            .into_error(status);

        // Duplicate keys and RLS refusals are expected outcomes for callers
        if err.is_unique_violation() || status == StatusCode::UNAUTHORIZED {
            debug!(%status, context, code = ?err.code(), "backend rejected request");
        } else {
            tracing::error!(
                %status,
                context,
                body = %body.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "backend returned non-success status"
            );
        }
        Err(err)
    }

    /// Read a JSON body, logging the raw text when it does not parse.
    pub(super) async fn read_json<T: DeserializeOwned>(
        response: Response,
        context: &'static str,
    ) -> BackendResult<T> {
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| {
            tracing::error!(
                error = %e,
                context,
                body = %text.chars().take(LOG_BODY_LIMIT).collect::<String>(),
                "failed to parse backend response"
            );
            BackendError::Parse(e)
        })
    }

    // -------------------------------------------------------------------------
    // REST helpers
    // -------------------------------------------------------------------------

    pub(super) async fn select<T: DeserializeOwned>(
        &self,
        caller: Option<&AccessToken>,
        query: RestQuery,
    ) -> BackendResult<Vec<T>> {
        let context = query.table_name();
        let response = self
            .send(self.rest(Method::GET, &query, caller)?, context)
            .await?;
        Self::read_json(response, context).await
    }

    pub(super) async fn select_one<T: DeserializeOwned>(
        &self,
        caller: Option<&AccessToken>,
        query: RestQuery,
    ) -> BackendResult<Option<T>> {
        let rows: Vec<T> = self.select(caller, query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// POST rows. `prefer` is sent verbatim as the `Prefer` header.
    pub(super) async fn insert<B: serde::Serialize + ?Sized>(
        &self,
        caller: &AccessToken,
        query: RestQuery,
        body: &B,
        prefer: &'static str,
    ) -> BackendResult<Response> {
        let context = query.table_name();
        let builder = self
            .rest(Method::POST, &query, Some(caller))?
            .header("Prefer", prefer)
            .json(body);
        self.send(builder, context).await
    }

    /// POST one row and read it back.
    pub(super) async fn insert_returning<B, T>(
        &self,
        caller: &AccessToken,
        query: RestQuery,
        body: &B,
    ) -> BackendResult<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let context = query.table_name();
        let response = self
            .insert(caller, query, body, "return=representation")
            .await?;
        let rows: Vec<T> = Self::read_json(response, context).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(format!("{context} row after insert")))
    }

    pub(super) async fn patch<B: serde::Serialize + ?Sized>(
        &self,
        caller: &AccessToken,
        query: RestQuery,
        body: &B,
    ) -> BackendResult<()> {
        let context = query.table_name();
        let builder = self
            .rest(Method::PATCH, &query, Some(caller))?
            .header("Prefer", "return=minimal")
            .json(body);
        self.send(builder, context).await?;
        Ok(())
    }

    pub(super) async fn delete(&self, caller: &AccessToken, query: RestQuery) -> BackendResult<()> {
        let context = query.table_name();
        let builder = self
            .rest(Method::DELETE, &query, Some(caller))?
            .header("Prefer", "return=minimal");
        self.send(builder, context).await?;
        Ok(())
    }

    /// Exact row count via `HEAD` + `Prefer: count=exact`.
    pub(super) async fn count(
        &self,
        caller: Option<&AccessToken>,
        query: RestQuery,
    ) -> BackendResult<u64> {
        let context = query.table_name();
        let builder = self
            .rest(Method::HEAD, &query, caller)?
            .header("Prefer", "count=exact");
        let response = self.send(builder, context).await?;

        response
            .headers()
            .get(CONTENT_RANGE)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .and_then(parse_content_range_total)
            .ok_or_else(|| BackendError::NotFound(format!("{context} count")))
    }

    /// Call a Postgres function exposed under `/rest/v1/rpc/`.
    pub(super) async fn rpc<T: DeserializeOwned>(
        &self,
        caller: &AccessToken,
        function: &'static str,
        args: &serde_json::Value,
    ) -> BackendResult<T> {
        let url = self.inner.rest_base.join(&format!("rpc/{function}"))?;
        let builder = self
            .authorize(self.inner.http.post(url), Some(caller))
            .json(args);
        let response = self.send(builder, function).await?;
        Self::read_json(response, function).await
    }

    /// Count the rows of `table` visible to `caller`.
    ///
    /// Used by the readiness probe and `pw-cli check` to prove that the
    /// project is reachable and the table exists.
    ///
    /// # Errors
    ///
    /// Returns the backend error for a missing table or a refused request.
    #[instrument(skip(self, caller))]
    pub async fn probe_table(
        &self,
        caller: Option<&AccessToken>,
        table: &'static str,
    ) -> BackendResult<u64> {
        self.count(caller, RestQuery::table(table).select("*")).await
    }

    async fn auth_session(&self, url: Url, body: serde_json::Value) -> BackendResult<AuthSession> {
        let builder = self.authorize(self.inner.http.post(url), None).json(&body);
        let response = self.send(builder, "auth").await?;
        Self::read_json(response, "auth").await
    }
}

/// Sign-up returns a session when email confirmation is off and the bare user
/// otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(AuthSession),
    User(AuthUser),
}

// =============================================================================
// Auth
// =============================================================================

impl AuthBackend for SupabaseClient {
    #[instrument(skip(self, email, password))]
    async fn sign_in_with_password(
        &self,
        email: &Email,
        password: &str,
    ) -> BackendResult<AuthSession> {
        let url = self.auth_url("token", &[("grant_type", "password")])?;
        self.auth_session(url, json!({ "email": email.as_str(), "password": password }))
            .await
    }

    #[instrument(skip(self, request))]
    async fn sign_up(&self, request: &SignUpRequest) -> BackendResult<SignUpOutcome> {
        let params: Vec<(&str, &str)> = request
            .redirect_to
            .as_deref()
            .map(|to| ("redirect_to", to))
            .into_iter()
            .collect();
        let url = self.auth_url("signup", &params)?;
        let body = json!({
            "email": request.email,
            "password": request.password,
            "data": { "full_name": request.full_name },
        });

        let builder = self.authorize(self.inner.http.post(url), None).json(&body);
        let response = self.send(builder, "auth").await?;
        Ok(match Self::read_json(response, "auth").await? {
            SignUpResponse::Session(session) => SignUpOutcome::SignedIn(session),
            SignUpResponse::User(user) => SignUpOutcome::ConfirmationRequired(user),
        })
    }

    #[instrument(skip(self, caller))]
    async fn sign_out(&self, caller: &AccessToken) -> BackendResult<()> {
        let url = self.auth_url("logout", &[])?;
        let builder = self.authorize(self.inner.http.post(url), Some(caller));
        self.send(builder, "auth").await?;
        Ok(())
    }

    #[instrument(skip(self, caller))]
    async fn get_user(&self, caller: &AccessToken) -> BackendResult<AuthUser> {
        let url = self.auth_url("user", &[])?;
        let builder = self.authorize(self.inner.http.get(url), Some(caller));
        let response = self.send(builder, "auth").await?;
        Self::read_json(response, "auth").await
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        let url = self.auth_url("token", &[("grant_type", "refresh_token")])?;
        self.auth_session(url, json!({ "refresh_token": refresh_token }))
            .await
    }
}

// =============================================================================
// Roles
// =============================================================================

impl RoleBackend for SupabaseClient {
    #[instrument(skip(self, caller), fields(user_id = %user_id, role = %role))]
    async fn has_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<bool> {
        self.rpc(
            caller,
            "has_role",
            &json!({ "_user_id": user_id, "_role": role }),
        )
        .await
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id))]
    async fn get_user_roles(
        &self,
        caller: &AccessToken,
        user_id: UserId,
    ) -> BackendResult<Vec<AppRole>> {
        let roles: Option<Vec<AppRole>> = self
            .rpc(caller, "get_user_roles", &json!({ "_user_id": user_id }))
            .await?;
        Ok(roles.unwrap_or_default())
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id, role = %role))]
    async fn grant_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<()> {
        self.insert(
            caller,
            RestQuery::table("user_roles"),
            &NewUserRole { user_id, role },
            "return=minimal",
        )
        .await?;
        Ok(())
    }

    #[instrument(skip(self, caller), fields(user_id = %user_id, role = %role))]
    async fn revoke_role(
        &self,
        caller: &AccessToken,
        user_id: UserId,
        role: AppRole,
    ) -> BackendResult<()> {
        self.delete(
            caller,
            RestQuery::table("user_roles")
                .eq("user_id", user_id)
                .eq("role", role),
        )
        .await
    }

    #[instrument(skip(self, caller, email))]
    async fn assign_admin_by_email(&self, caller: &AccessToken, email: &Email) -> BackendResult<bool> {
        self.rpc(
            caller,
            "assign_admin_by_email",
            &json!({ "_email": email.as_str() }),
        )
        .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_postgrest_error_body() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code":"23505","details":"Key exists","hint":null,"message":"duplicate key value violates unique constraint"}"#,
        )
        .unwrap();
        let err = body.into_error(StatusCode::CONFLICT);
        assert!(err.is_unique_violation());
        assert_eq!(err.status(), Some(409));
    }

    #[test]
    fn test_gotrue_error_body_variants() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#,
        )
        .unwrap();
        let err = body.into_error(StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert_eq!(err.to_string(), "Backend error (400): Invalid login credentials");

        let body: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid Refresh Token"}"#,
        )
        .unwrap();
        let err = body.into_error(StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(err.to_string().contains("Invalid Refresh Token"));
    }

    #[test]
    fn test_empty_error_body_uses_status() {
        let err = ErrorBody::default().into_error(StatusCode::BAD_GATEWAY);
        assert_eq!(err.status(), Some(502));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn test_sign_up_response_shapes() {
        let session: SignUpResponse = serde_json::from_str(
            r#"{"access_token":"a","refresh_token":"r","expires_in":3600,"token_type":"bearer",
                "user":{"id":"2f3e4d5c-6b7a-4899-9a0b-1c2d3e4f5a6b","email":"a@b.co"}}"#,
        )
        .unwrap();
        assert!(matches!(session, SignUpResponse::Session(_)));

        let user: SignUpResponse = serde_json::from_str(
            r#"{"id":"2f3e4d5c-6b7a-4899-9a0b-1c2d3e4f5a6b","email":"a@b.co",
                "user_metadata":{"full_name":"Ada"},"confirmation_sent_at":"2024-01-01T00:00:00Z"}"#,
        )
        .unwrap();
        match user {
            SignUpResponse::User(user) => {
                assert_eq!(user.user_metadata.full_name.as_deref(), Some("Ada"));
            }
            SignUpResponse::Session(_) => panic!("expected bare user"),
        }
    }

    #[test]
    fn test_client_builds_api_bases() {
        let config = SupabaseConfig {
            url: Url::parse("https://abc.supabase.co/").unwrap(),
            anon_key: SecretString::from("anon-key-for-tests"),
            service_role_key: None,
        };
        let client = SupabaseClient::new(&config).unwrap();
        assert_eq!(
            client.inner.rest_base.as_str(),
            "https://abc.supabase.co/rest/v1/"
        );
        assert_eq!(
            client.auth_url("token", &[("grant_type", "password")]).unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/token?grant_type=password"
        );
    }
}
