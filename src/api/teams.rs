//! Bot Framework activities for the Teams bot.
//!
//! Incoming activities are mapped onto the [`CommandRouter`]. Replies are
//! either collected and returned in the HTTP response (`expectReplies`
//! delivery, or no connector available) or posted back to the conversation
//! through the Bot Framework connector.
//!
//! [`CommandRouter`]: crate::router::CommandRouter

use crate::config::BotCredentials;
use crate::router::{Reply, ReplySink};
use anyhow::Context;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

const TOKEN_URL: &str = "https://login.microsoftonline.com/botframework.com/oauth2/v2.0/token";
const TOKEN_SCOPE: &str = "https://api.botframework.com/.default";

/// Hosts (and their subdomains) the connector will post replies to.
const BOT_FRAMEWORK_HOSTS: &[&str] = &[
    "botframework.com",
    "botframework.azure.us",
    "smba.trafficmanager.net",
    "smba.infra.gcc.teams.microsoft.com",
    "smba.infra.gov.teams.microsoft.us",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChannelAccount {
    #[serde(default)]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConversationAccount {
    #[serde(default)]
    pub id: String,
}

/// The subset of a Bot Framework activity the bot reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub id: Option<String>,
    /// Invoke name (`adaptiveCard/action`, `task/fetch`, `task/submit`)
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub from: Option<ChannelAccount>,
    #[serde(default)]
    pub recipient: Option<ChannelAccount>,
    #[serde(default)]
    pub conversation: Option<ConversationAccount>,
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub delivery_mode: Option<String>,
}

fn mention_pattern() -> Option<&'static Regex> {
    static CELL: OnceLock<Option<Regex>> = OnceLock::new();
    CELL.get_or_init(|| Regex::new(r"(?s)<at>.*?</at>").ok())
        .as_ref()
}

impl Activity {
    pub fn user_id(&self) -> &str {
        self.from
            .as_ref()
            .map(|from| from.id.as_str())
            .filter(|id| !id.is_empty())
            .unwrap_or("unknown")
    }

    pub fn expects_replies(&self) -> bool {
        self.delivery_mode.as_deref() == Some("expectReplies")
    }

    /// Message text with bot mentions removed.
    pub fn command_text(&self) -> String {
        let text = self.text.as_deref().unwrap_or_default();
        match mention_pattern() {
            Some(re) => re.replace_all(text, "").trim().to_string(),
            None => text.trim().to_string(),
        }
    }

    fn value_field(&self, key: &str) -> Option<&Value> {
        self.value.as_ref().and_then(|v| v.get(key))
    }

    /// Card submit data: `value` of an `Action.Submit` message, or
    /// `value.action.data` of an `adaptiveCard/action` invoke.
    pub fn card_data(&self) -> Option<Value> {
        match (self.kind.as_str(), self.name.as_deref()) {
            ("message", _) => self
                .value_field("action")
                .filter(|action| action.is_string())
                .and(self.value.clone()),
            ("invoke", Some("adaptiveCard/action")) => Some(
                self.value_field("action")
                    .and_then(|action| action.get("data"))
                    .cloned()
                    .unwrap_or(Value::Null),
            ),
            _ => None,
        }
    }

    /// `value.data` of a dialog invoke.
    pub fn dialog_data(&self) -> Value {
        self.value_field("data").cloned().unwrap_or(Value::Null)
    }
}

/// Keeps replies for the HTTP response body.
#[derive(Debug, Default)]
pub struct CollectingSink {
    replies: Mutex<Vec<Reply>>,
}

impl CollectingSink {
    pub async fn activities(&self) -> Vec<Value> {
        self.replies
            .lock()
            .await
            .iter()
            .map(Reply::to_activity)
            .collect()
    }
}

#[async_trait]
impl ReplySink for CollectingSink {
    async fn send(&self, reply: Reply) -> anyhow::Result<()> {
        self.replies.lock().await.push(reply);
        Ok(())
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Posts activities to Bot Framework conversations.
pub struct ConnectorClient {
    http: reqwest::Client,
    credentials: Option<BotCredentials>,
    token_url: String,
    token: RwLock<Option<CachedToken>>,
    trusted_hosts: Vec<String>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

impl ConnectorClient {
    pub fn new(credentials: Option<BotCredentials>) -> Self {
        Self::with_token_url(credentials, TOKEN_URL)
    }

    pub fn with_token_url(credentials: Option<BotCredentials>, token_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            credentials,
            token_url: token_url.to_string(),
            token: RwLock::new(None),
            trusted_hosts: BOT_FRAMEWORK_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }

    /// Replace the service URL allow-list.
    pub fn with_trusted_hosts<I, S>(mut self, hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.trusted_hosts = hosts.into_iter().map(Into::into).collect();
        self
    }

    /// Whether replies may be posted to `service_url`: an allow-listed host,
    /// over HTTPS unless the host is loopback.
    pub fn trusts(&self, service_url: &str) -> bool {
        let Ok(url) = reqwest::Url::parse(service_url) else {
            return false;
        };
        let Some(host) = url.host_str().map(|h| h.to_ascii_lowercase()) else {
            return false;
        };
        let loopback = host == "localhost"
            || host
                .parse::<std::net::IpAddr>()
                .map(|ip| ip.is_loopback())
                .unwrap_or(false);
        if url.scheme() != "https" && !(url.scheme() == "http" && loopback) {
            return false;
        }
        self.trusted_hosts.iter().any(|trusted| {
            host == *trusted || host.ends_with(&format!(".{}", trusted))
        })
    }

    /// Client-credentials token, cached until a minute before it expires.
    /// `None` when no app credentials are configured.
    async fn access_token(&self) -> anyhow::Result<Option<String>> {
        let Some(credentials) = &self.credentials else {
            return Ok(None);
        };

        if let Some(token) = self.token.read().await.as_ref() {
            if token.expires_at > Instant::now() {
                return Ok(Some(token.value.clone()));
            }
        }

        let resp = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", credentials.app_id.as_str()),
                ("client_secret", credentials.app_password.as_str()),
                ("scope", TOKEN_SCOPE),
            ])
            .send()
            .await
            .context("Failed to request connector token")?;
        let status = resp.status();
        let body = resp.text().await.context("Failed to read token response")?;
        if !status.is_success() {
            anyhow::bail!("Token request failed: {} - {}", status, body);
        }
        let token: TokenResponse =
            serde_json::from_str(&body).context("Failed to parse token response")?;

        let lifetime = token.expires_in.unwrap_or(3600).saturating_sub(60);
        *self.token.write().await = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(lifetime),
        });
        Ok(Some(token.access_token))
    }

    pub async fn send_to_conversation(
        &self,
        service_url: &str,
        conversation_id: &str,
        activity: &Value,
    ) -> anyhow::Result<()> {
        let url = format!(
            "{}/v3/conversations/{}/activities",
            service_url.trim_end_matches('/'),
            urlencoding::encode(conversation_id)
        );
        let mut request = self.http.post(&url).json(activity);
        if let Some(token) = self.access_token().await? {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .context("Failed to post activity")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("Connector error: {} - {}", status, body);
        }
        Ok(())
    }
}

/// Sends replies to one conversation through the connector.
pub struct ConnectorSink {
    client: Arc<ConnectorClient>,
    service_url: String,
    conversation_id: String,
    reply_to_id: Option<String>,
}

impl ConnectorSink {
    /// `None` when the activity does not identify a reachable conversation
    /// or its service URL is not a Bot Framework host.
    pub fn for_activity(client: Arc<ConnectorClient>, activity: &Activity) -> Option<Self> {
        let service_url = activity.service_url.clone().filter(|s| !s.is_empty())?;
        if !client.trusts(&service_url) {
            tracing::warn!(service_url = %service_url, "Refusing to post replies to untrusted service URL");
            return None;
        }
        let conversation_id = activity
            .conversation
            .as_ref()
            .map(|c| c.id.clone())
            .filter(|id| !id.is_empty())?;
        Some(Self {
            client,
            service_url,
            conversation_id,
            reply_to_id: activity.id.clone(),
        })
    }
}

#[async_trait]
impl ReplySink for ConnectorSink {
    async fn send(&self, reply: Reply) -> anyhow::Result<()> {
        let mut activity = reply.to_activity();
        if let (Some(reply_to), Some(obj)) = (&self.reply_to_id, activity.as_object_mut()) {
            obj.insert("replyToId".to_string(), Value::String(reply_to.clone()));
        }
        self.client
            .send_to_conversation(&self.service_url, &self.conversation_id, &activity)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn activity(value: Value) -> Activity {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn reads_user_and_text() {
        let a = activity(json!({
            "type": "message",
            "text": "<at>AGU</at> /devin fix it ",
            "from": { "id": "29:abc" },
            "deliveryMode": "expectReplies"
        }));
        assert_eq!(a.user_id(), "29:abc");
        assert_eq!(a.command_text(), "/devin fix it");
        assert!(a.expects_replies());
        assert_eq!(a.card_data(), None);
        assert_eq!(activity(json!({ "type": "message" })).user_id(), "unknown");
    }

    #[test]
    fn card_data_locations() {
        let submit = activity(json!({
            "type": "message",
            "value": { "action": "check_status", "sessionId": "s-1" }
        }));
        assert_eq!(submit.card_data().unwrap()["sessionId"], "s-1");

        let invoke = activity(json!({
            "type": "invoke",
            "name": "adaptiveCard/action",
            "value": { "action": { "type": "Action.Execute", "data": { "action": "show_help" } } }
        }));
        assert_eq!(invoke.card_data(), Some(json!({ "action": "show_help" })));

        let dialog = activity(json!({
            "type": "invoke",
            "name": "task/fetch",
            "value": { "data": { "opendialogtype": "create_task" } }
        }));
        assert_eq!(dialog.card_data(), None);
        assert_eq!(dialog.dialog_data()["opendialogtype"], "create_task");
    }

    #[tokio::test]
    async fn collecting_sink_keeps_order() {
        let sink = CollectingSink::default();
        sink.send(Reply::text("one")).await.unwrap();
        sink.send(Reply::Card(json!({ "type": "AdaptiveCard" }))).await.unwrap();
        let activities = sink.activities().await;
        assert_eq!(activities[0]["text"], "one");
        assert_eq!(
            activities[1]["attachments"][0]["contentType"],
            crate::cards::ADAPTIVE_CARD_CONTENT_TYPE
        );
    }

    #[tokio::test]
    async fn connector_sink_posts_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "bot-token",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v3/conversations/a%3Aconv/activities"))
            .and(header("authorization", "Bearer bot-token"))
            .and(body_partial_json(json!({ "type": "message", "replyToId": "act-1" })))
            .respond_with(ResponseTemplate::new(201))
            .expect(2)
            .mount(&server)
            .await;

        let client = Arc::new(
            ConnectorClient::with_token_url(
                Some(BotCredentials {
                    app_id: "app".to_string(),
                    app_password: "secret".to_string(),
                }),
                &format!("{}/token", server.uri()),
            )
            .with_trusted_hosts(["127.0.0.1"]),
        );
        let incoming = activity(json!({
            "type": "message",
            "id": "act-1",
            "serviceUrl": server.uri(),
            "conversation": { "id": "a:conv" }
        }));
        let sink = ConnectorSink::for_activity(client, &incoming).unwrap();
        sink.send(Reply::text("hello")).await.unwrap();
        sink.send(Reply::text("again")).await.unwrap();
    }

    #[tokio::test]
    async fn connector_errors_surface() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let client = ConnectorClient::new(None);
        let err = client
            .send_to_conversation(&server.uri(), "conv", &json!({ "type": "message" }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("403"));
    }

    #[test]
    fn connector_sink_needs_conversation() {
        let client = Arc::new(ConnectorClient::new(None));
        let incoming = activity(json!({
            "type": "message",
            "serviceUrl": "https://smba.trafficmanager.net/teams/"
        }));
        assert!(ConnectorSink::for_activity(client, &incoming).is_none());
    }

    #[test]
    fn service_url_allow_list() {
        let client = ConnectorClient::new(None);
        assert!(client.trusts("https://smba.trafficmanager.net/teams/"));
        assert!(client.trusts("https://europe.webchat.botframework.com/"));
        assert!(client.trusts("https://SMBA.trafficmanager.net/amer/"));

        assert!(!client.trusts("http://smba.trafficmanager.net/teams/"));
        assert!(!client.trusts("https://botframework.com.evil.example/"));
        assert!(!client.trusts("https://evilbotframework.com/"));
        assert!(!client.trusts("http://127.0.0.1:8080/"));
        assert!(!client.trusts("not a url"));

        let local = ConnectorClient::new(None).with_trusted_hosts(["localhost"]);
        assert!(local.trusts("http://localhost:3978/"));
        assert!(!local.trusts("https://smba.trafficmanager.net/teams/"));
    }

    #[test]
    fn connector_sink_refuses_untrusted_service_url() {
        let client = Arc::new(ConnectorClient::new(None));
        let incoming = activity(json!({
            "type": "message",
            "serviceUrl": "https://collector.example",
            "conversation": { "id": "c1" }
        }));
        assert!(ConnectorSink::for_activity(client.clone(), &incoming).is_none());

        let trusted = activity(json!({
            "type": "message",
            "serviceUrl": "https://smba.trafficmanager.net/teams/",
            "conversation": { "id": "c1" }
        }));
        assert!(ConnectorSink::for_activity(client, &trusted).is_some());
    }
}
