//! HubSpot CRM client.
//!
//! Calls the HubSpot REST API with a private app token:
//!
//! - `POST  /crm/v3/objects/contacts/search` — lookup by email
//! - `POST  /crm/v3/objects/contacts` — create
//! - `PATCH /crm/v3/objects/contacts/{id}` — update
//! - `POST  /engagements/v1/engagements` — NOTE engagement (primary)
//! - `POST  /crm/v3/objects/notes` — standalone note (fallback)
//! - `PUT   /crm/v4/objects/notes/{note}/associations/contacts/{contact}`

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{CrmApi, CrmContact, CONTACT_PROPERTIES};
use crate::config::CrmConfig;
use crate::error::IntakeError;
use crate::submission::ContactProperties;

/// HubSpot-defined association type for note → contact.
pub const NOTE_TO_CONTACT_ASSOCIATION_TYPE: u32 = 202;

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<CrmContact>,
}

/// `CrmApi` over the HubSpot REST API.
pub struct HubSpotClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl std::fmt::Debug for HubSpotClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .finish()
    }
}

impl HubSpotClient {
    /// Build a client from configuration. A missing token is a
    /// configuration error.
    pub fn new(config: &CrmConfig) -> Result<Self, IntakeError> {
        let token = config
            .access_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                IntakeError::Configuration("Missing HUBSPOT_PRIVATE_APP_TOKEN".to_string())
            })?
            .to_string();

        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(|e| {
            IntakeError::Configuration(format!("Failed to build HTTP client: {}", e))
        })?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send one JSON request. Non-2xx responses become `UpstreamHttp`.
    async fn call(&self, method: Method, path: &str, body: &Value) -> Result<Value, IntakeError> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .http
            .request(method.clone(), &url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::debug!(%method, path, status = status.as_u16(), "HubSpot request rejected");
            return Err(IntakeError::from_upstream(status.as_u16(), &text));
        }

        tracing::debug!(%method, path, status = status.as_u16(), "HubSpot request ok");

        if text.trim().is_empty() {
            return Ok(json!({}));
        }
        Ok(serde_json::from_str(&text).unwrap_or(Value::String(text)))
    }
}

/// Extract the record id from a create response. HubSpot returns string ids
/// on v3 and numeric ids on v1.
fn record_id(response: &Value, what: &str) -> Result<String, IntakeError> {
    match response.get("id") {
        Some(Value::String(id)) if !id.is_empty() => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(IntakeError::Integration(format!(
            "HubSpot {} response did not include an id",
            what
        ))),
    }
}

#[async_trait]
impl CrmApi for HubSpotClient {
    fn name(&self) -> &str {
        "hubspot"
    }

    async fn find_contact_by_email(&self, email: &str) -> Result<Option<CrmContact>, IntakeError> {
        let body = json!({
            "filterGroups": [{
                "filters": [{ "propertyName": "email", "operator": "EQ", "value": email }]
            }],
            "properties": CONTACT_PROPERTIES,
            "limit": 1,
        });
        let response = self
            .call(Method::POST, "/crm/v3/objects/contacts/search", &body)
            .await?;
        let search: SearchResponse = serde_json::from_value(response)?;
        Ok(search.results.into_iter().next())
    }

    async fn create_contact(&self, properties: &ContactProperties) -> Result<String, IntakeError> {
        let response = self
            .call(
                Method::POST,
                "/crm/v3/objects/contacts",
                &json!({ "properties": properties }),
            )
            .await?;
        record_id(&response, "contact create")
    }

    async fn update_contact(
        &self,
        contact_id: &str,
        properties: &ContactProperties,
    ) -> Result<(), IntakeError> {
        self.call(
            Method::PATCH,
            &format!("/crm/v3/objects/contacts/{}", contact_id),
            &json!({ "properties": properties }),
        )
        .await?;
        Ok(())
    }

    async fn create_engagement_note(
        &self,
        contact_id: &str,
        body: &str,
        at: DateTime<Utc>,
    ) -> Result<(), IntakeError> {
        // v1 wants numeric contact ids; a non-numeric id is sent as null and
        // left for HubSpot to reject.
        let payload = json!({
            "engagement": { "active": true, "type": "NOTE", "timestamp": at.timestamp_millis() },
            "associations": { "contactIds": [contact_id.parse::<u64>().ok()] },
            "metadata": { "body": body },
        });
        self.call(Method::POST, "/engagements/v1/engagements", &payload)
            .await?;
        Ok(())
    }

    async fn create_note(&self, body: &str, at: DateTime<Utc>) -> Result<String, IntakeError> {
        let payload = json!({
            "properties": {
                "hs_note_body": body,
                "hs_timestamp": at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            }
        });
        let response = self
            .call(Method::POST, "/crm/v3/objects/notes", &payload)
            .await?;
        record_id(&response, "note create")
    }

    async fn associate_note_with_contact(
        &self,
        note_id: &str,
        contact_id: &str,
    ) -> Result<(), IntakeError> {
        let payload = json!([{
            "associationCategory": "HUBSPOT_DEFINED",
            "associationTypeId": NOTE_TO_CONTACT_ASSOCIATION_TYPE,
        }]);
        self.call(
            Method::PUT,
            &format!(
                "/crm/v4/objects/notes/{}/associations/contacts/{}",
                note_id, contact_id
            ),
            &payload,
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, Uri};
    use axum::Router;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    #[derive(Debug, Clone)]
    struct Recorded {
        method: String,
        path: String,
        authorization: Option<String>,
        content_type: Option<String>,
        body: Value,
    }

    /// Loopback stand-in for the HubSpot API. Unscripted routes answer
    /// `200 {}`.
    #[derive(Clone, Default)]
    struct MockHubSpot {
        requests: Arc<Mutex<Vec<Recorded>>>,
        responses: Arc<Mutex<HashMap<(String, String), (u16, String)>>>,
    }

    impl MockHubSpot {
        fn respond(&self, method: &str, path: &str, status: u16, body: &str) {
            self.responses.lock().insert(
                (method.to_string(), path.to_string()),
                (status, body.to_string()),
            );
        }

        fn requests(&self) -> Vec<Recorded> {
            self.requests.lock().clone()
        }
    }

    async fn mock_handler(
        State(mock): State<MockHubSpot>,
        method: axum::http::Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> (StatusCode, String) {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(String::from)
        };
        mock.requests.lock().push(Recorded {
            method: method.to_string(),
            path: uri.path().to_string(),
            authorization: header("authorization"),
            content_type: header("content-type"),
            body: serde_json::from_slice(&body).unwrap_or(Value::Null),
        });
        let (status, text) = mock
            .responses
            .lock()
            .get(&(method.to_string(), uri.path().to_string()))
            .cloned()
            .unwrap_or((200, "{}".to_string()));
        (StatusCode::from_u16(status).unwrap(), text)
    }

    async fn start_mock() -> (MockHubSpot, HubSpotClient) {
        let mock = MockHubSpot::default();
        let app = Router::new()
            .fallback(mock_handler)
            .with_state(mock.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let config = CrmConfig {
            base_url: format!("http://{}/", addr),
            access_token: Some("pat-test-token".into()),
            timeout_secs: Some(5),
            ..CrmConfig::default()
        };
        (mock, HubSpotClient::new(&config).unwrap())
    }

    fn props() -> ContactProperties {
        ContactProperties {
            email: "ada@example.com".into(),
            firstname: "Ada".into(),
            lastname: "Lovelace".into(),
            company: "".into(),
            jobtitle: "CTO".into(),
        }
    }

    #[test]
    fn test_new_requires_token() {
        for token in [None, Some("".to_string()), Some("  ".to_string())] {
            let config = CrmConfig {
                access_token: token,
                ..CrmConfig::default()
            };
            let err = HubSpotClient::new(&config).unwrap_err();
            assert!(matches!(err, IntakeError::Configuration(_)));
        }
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = CrmConfig {
            access_token: Some("pat-secret".into()),
            ..CrmConfig::default()
        };
        let client = HubSpotClient::new(&config).unwrap();
        let rendered = format!("{:?}", client);
        assert!(!rendered.contains("pat-secret"));
        assert_eq!(client.base_url(), "https://api.hubapi.com");
    }

    #[tokio::test]
    async fn test_find_contact_by_email() {
        let (mock, client) = start_mock().await;
        mock.respond(
            "POST",
            "/crm/v3/objects/contacts/search",
            200,
            r#"{"total":1,"results":[{"id":"151","properties":{"email":"ada@example.com","company":null}}]}"#,
        );

        let found = client
            .find_contact_by_email("ada@example.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "151");
        assert_eq!(
            found.properties.get("email"),
            Some(&Some("ada@example.com".to_string()))
        );

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        let req = &requests[0];
        assert_eq!(req.method, "POST");
        assert_eq!(req.authorization.as_deref(), Some("Bearer pat-test-token"));
        assert_eq!(req.content_type.as_deref(), Some("application/json"));
        assert_eq!(
            req.body["filterGroups"][0]["filters"][0],
            json!({"propertyName": "email", "operator": "EQ", "value": "ada@example.com"})
        );
        assert_eq!(req.body["limit"], 1);
        assert_eq!(
            req.body["properties"],
            json!(["email", "firstname", "lastname", "company", "jobtitle"])
        );
    }

    #[tokio::test]
    async fn test_find_contact_none_when_no_results() {
        let (mock, client) = start_mock().await;
        mock.respond(
            "POST",
            "/crm/v3/objects/contacts/search",
            200,
            r#"{"total":0,"results":[]}"#,
        );
        assert!(client
            .find_contact_by_email("nobody@example.com")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_create_and_update_contact() {
        let (mock, client) = start_mock().await;
        mock.respond("POST", "/crm/v3/objects/contacts", 201, r#"{"id":"901"}"#);

        let id = client.create_contact(&props()).await.unwrap();
        assert_eq!(id, "901");
        client.update_contact("901", &props()).await.unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].path, "/crm/v3/objects/contacts");
        assert_eq!(requests[0].body["properties"]["firstname"], "Ada");
        assert_eq!(requests[0].body["properties"]["company"], "");
        assert_eq!(requests[1].method, "PATCH");
        assert_eq!(requests[1].path, "/crm/v3/objects/contacts/901");
        assert_eq!(requests[1].body["properties"]["jobtitle"], "CTO");
    }

    #[tokio::test]
    async fn test_create_contact_without_id_is_integration_error() {
        let (mock, client) = start_mock().await;
        mock.respond("POST", "/crm/v3/objects/contacts", 200, "{}");
        let err = client.create_contact(&props()).await.unwrap_err();
        assert!(matches!(err, IntakeError::Integration(_)));
    }

    #[tokio::test]
    async fn test_engagement_note_payload() {
        let (mock, client) = start_mock().await;
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        client
            .create_engagement_note("151", "Website contact form submission", at)
            .await
            .unwrap();

        let req = &mock.requests()[0];
        assert_eq!(req.path, "/engagements/v1/engagements");
        assert_eq!(
            req.body,
            json!({
                "engagement": { "active": true, "type": "NOTE", "timestamp": at.timestamp_millis() },
                "associations": { "contactIds": [151] },
                "metadata": { "body": "Website contact form submission" },
            })
        );
    }

    #[tokio::test]
    async fn test_standalone_note_and_association() {
        let (mock, client) = start_mock().await;
        mock.respond("POST", "/crm/v3/objects/notes", 201, r#"{"id":"77"}"#);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();

        let note_id = client.create_note("hello", at).await.unwrap();
        assert_eq!(note_id, "77");
        client
            .associate_note_with_contact(&note_id, "151")
            .await
            .unwrap();

        let requests = mock.requests();
        assert_eq!(requests[0].body["properties"]["hs_note_body"], "hello");
        assert_eq!(
            requests[0].body["properties"]["hs_timestamp"],
            "2024-05-01T12:00:00.000Z"
        );
        assert_eq!(requests[1].method, "PUT");
        assert_eq!(
            requests[1].path,
            "/crm/v4/objects/notes/77/associations/contacts/151"
        );
        assert_eq!(
            requests[1].body,
            json!([{ "associationCategory": "HUBSPOT_DEFINED", "associationTypeId": 202 }])
        );
    }

    #[tokio::test]
    async fn test_non_success_becomes_upstream_error() {
        let (mock, client) = start_mock().await;
        mock.respond(
            "POST",
            "/engagements/v1/engagements",
            403,
            r#"{"status":"error","message":"This app hasn't been granted all required scopes"}"#,
        );

        let err = client
            .create_engagement_note("151", "body", Utc::now())
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
        assert_eq!(err.upstream_status(), Some(403));
        assert_eq!(
            err.to_string(),
            "This app hasn't been granted all required scopes"
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_integration_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = CrmConfig {
            base_url: format!("http://{}", addr),
            access_token: Some("pat-test-token".into()),
            ..CrmConfig::default()
        };
        let client = HubSpotClient::new(&config).unwrap();
        let err = client
            .find_contact_by_email("ada@example.com")
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Integration(_)));
    }
}
