use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use super::Messenger;
use crate::client::ApiClient;
use crate::config::WhatsAppSecrets;
use crate::error::{ApiError, ApiResult};

/// Fields requested by [`WhatsAppClient::phone_info`].
pub const PHONE_INFO_FIELDS: &str = "display_phone_number,verified_name,code_verification_status,quality_rating,platform_type,throughput,is_official_business_account";

/// A pre-approved message template.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Template {
    pub name: String,
    pub language: Language,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<Component>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Language {
    pub code: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: String,
    pub parameters: Vec<Parameter>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Parameter {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter_name: Option<String>,
    pub text: String,
}

impl Template {
    pub fn new(name: impl Into<String>, language_code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            language: Language {
                code: language_code.into(),
            },
            components: Vec::new(),
        }
    }

    /// Attach a `body` component with named text parameters.
    pub fn with_body_params<I, K, V>(mut self, params: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let parameters: Vec<Parameter> = params
            .into_iter()
            .map(|(name, text)| Parameter {
                kind: "text".to_string(),
                parameter_name: Some(name.into()),
                text: text.into(),
            })
            .collect();
        if !parameters.is_empty() {
            self.components.push(Component {
                kind: "body".to_string(),
                parameters,
            });
        }
        self
    }
}

/// Parse `name=value` command-line pairs into template parameters.
pub fn parse_params(args: &[String]) -> ApiResult<Vec<(String, String)>> {
    args.iter()
        .map(|arg| match arg.split_once('=') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.to_string()))
            }
            _ => Err(ApiError::InvalidInput(format!(
                "template parameter '{arg}' is not in name=value form"
            ))),
        })
        .collect()
}

/// Registration PINs are exactly six ASCII digits.
pub fn validate_pin(pin: &str) -> ApiResult<()> {
    if pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ApiError::InvalidInput(
            "PIN must be a 6-digit number".to_string(),
        ))
    }
}

#[derive(Debug, Serialize)]
struct TemplateMessage<'a> {
    messaging_product: &'static str,
    to: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    template: &'a Template,
}

/// WhatsApp Business Cloud API for one business phone number.
pub struct WhatsAppClient {
    api: ApiClient,
    messages_url: String,
    phone_number_id: String,
}

impl WhatsAppClient {
    /// Requires the access token and the messages endpoint URL. Fails before
    /// any HTTP client exists when either is missing or a placeholder.
    pub fn from_secrets(secrets: &WhatsAppSecrets) -> ApiResult<Self> {
        let token = secrets.token()?;
        let messages_url = secrets.app_url()?.to_string();
        let phone_number_id = secrets.phone_number_id()?;

        let api = ApiClient::builder(secrets.api_base.as_str())
            .bearer(token)
            .build()?;

        Ok(Self {
            api,
            messages_url,
            phone_number_id,
        })
    }

    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    pub async fn send_template(&self, recipient: &str, template: &Template) -> ApiResult {
        info!(
            "Sending WhatsApp template '{}' to configured recipient",
            template.name
        );
        let message = TemplateMessage {
            messaging_product: "whatsapp",
            to: recipient,
            kind: "template",
            template,
        };
        let payload = serde_json::to_value(&message)
            .map_err(|err| ApiError::InvalidInput(err.to_string()))?;
        let response = self.api.call(&self.messages_url, Some(&payload)).await?;
        check_message_response(response)
    }

    /// Register the phone number with the verification PIN.
    pub async fn register(&self, pin: &str) -> ApiResult {
        validate_pin(pin)?;
        info!("Registering WhatsApp phone number {}", self.phone_number_id);
        let payload = json!({
            "messaging_product": "whatsapp",
            "pin": pin,
        });
        let response = self
            .api
            .call(&format!("{}/register", self.phone_number_id), Some(&payload))
            .await?;
        check_success(response)
    }

    pub async fn phone_info(&self) -> ApiResult {
        self.api
            .get_with_query(&self.phone_number_id, &[("fields", PHONE_INFO_FIELDS)])
            .await
    }

    pub async fn deregister(&self) -> ApiResult {
        info!("Deregistering WhatsApp phone number {}", self.phone_number_id);
        let response = self
            .api
            .post_empty(&format!("{}/deregister", self.phone_number_id))
            .await?;
        check_success(response)
    }
}

#[async_trait]
impl Messenger for WhatsAppClient {
    fn platform(&self) -> &'static str {
        "whatsapp"
    }

    async fn send_text(&self, recipient: &str, text: &str) -> ApiResult {
        info!("Sending {} text to configured recipient", self.platform());
        let payload = json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": { "body": text },
        });
        let response = self.api.call(&self.messages_url, Some(&payload)).await?;
        check_message_response(response)
    }
}

fn error_message(response: &Value) -> Option<String> {
    response
        .get("error")
        .filter(|err| err.is_object())
        .map(|err| {
            err["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string()
        })
}

/// A message send succeeded unless the body carries an `error` object.
pub fn check_message_response(response: Value) -> ApiResult {
    match error_message(&response) {
        Some(message) => Err(ApiError::Application(message)),
        None => Ok(response),
    }
}

/// Action endpoints answer `{"success": true}`.
pub fn check_success(response: Value) -> ApiResult {
    if response["success"].as_bool() == Some(true) {
        return Ok(response);
    }
    let message =
        error_message(&response).unwrap_or_else(|| "Request was not successful".to_string());
    Err(ApiError::Application(message))
}

/// First message id from a send response.
pub fn message_id(response: &Value) -> Option<&str> {
    response["messages"][0]["id"].as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn secrets_for(server: &MockServer) -> WhatsAppSecrets {
        WhatsAppSecrets {
            token: "wa-token".to_string(),
            phone_number: "15550001111".to_string(),
            app_url: format!("{}/123/messages", server.uri()),
            api_base: server.uri(),
        }
    }

    fn door_open_template() -> Template {
        Template::new("door_status_open", "en")
            .with_body_params([("time_close", "11:22"), ("time_open", "19:46")])
    }

    #[test]
    fn test_template_serializes_to_cloud_api_shape() {
        let value = serde_json::to_value(TemplateMessage {
            messaging_product: "whatsapp",
            to: "15550001111",
            kind: "template",
            template: &door_open_template(),
        })
        .unwrap();

        assert_eq!(
            value,
            json!({
                "messaging_product": "whatsapp",
                "to": "15550001111",
                "type": "template",
                "template": {
                    "name": "door_status_open",
                    "language": {"code": "en"},
                    "components": [{
                        "type": "body",
                        "parameters": [
                            {"type": "text", "parameter_name": "time_close", "text": "11:22"},
                            {"type": "text", "parameter_name": "time_open", "text": "19:46"}
                        ]
                    }]
                }
            })
        );
    }

    #[test]
    fn test_template_without_params_omits_components() {
        let value = serde_json::to_value(Template::new("hello_world", "en_US")).unwrap();
        assert_eq!(value, json!({"name": "hello_world", "language": {"code": "en_US"}}));
    }

    #[test]
    fn test_parse_params() {
        let args = vec!["time=19:46".to_string(), "note=a=b".to_string()];
        let params = parse_params(&args).unwrap();
        assert_eq!(params[0], ("time".to_string(), "19:46".to_string()));
        assert_eq!(params[1], ("note".to_string(), "a=b".to_string()));

        assert!(parse_params(&["novalue".to_string()]).is_err());
        assert!(parse_params(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_validate_pin() {
        assert!(validate_pin("123456").is_ok());
        assert!(validate_pin("12345").is_err());
        assert!(validate_pin("12345a").is_err());
        assert!(validate_pin("١٢٣٤٥٦").is_err());
    }

    #[tokio::test]
    async fn test_missing_token_never_reaches_network() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut secrets = secrets_for(&server);
        secrets.token = "some_wa_token".to_string();
        assert!(matches!(
            WhatsAppClient::from_secrets(&secrets),
            Err(ApiError::NotConfigured(_))
        ));
    }

    #[tokio::test]
    async fn test_send_template_posts_to_app_url_with_bearer() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/messages"))
            .and(header("authorization", "Bearer wa-token"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "15550001111",
                "type": "template",
                "template": serde_json::to_value(door_open_template()).unwrap()
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messaging_product": "whatsapp",
                "messages": [{"id": "wamid.abc"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        let response = client
            .send_template("15550001111", &door_open_template())
            .await
            .unwrap();
        assert_eq!(message_id(&response), Some("wamid.abc"));
    }

    #[tokio::test]
    async fn test_send_text_posts_text_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/messages"))
            .and(body_json(json!({
                "messaging_product": "whatsapp",
                "to": "15550001111",
                "type": "text",
                "text": {"body": "Door left open"}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "messages": [{"id": "wamid.text"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        let response = client
            .send_text("15550001111", "Door left open")
            .await
            .unwrap();
        assert_eq!(message_id(&response), Some("wamid.text"));
    }

    #[tokio::test]
    async fn test_register_rejects_bad_pin_before_request() {
        let server = MockServer::start().await;
        Mock::given(wiremock::matchers::any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        assert!(matches!(
            client.register("12ab56").await,
            Err(ApiError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_register_posts_pin() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/register"))
            .and(body_json(json!({"messaging_product": "whatsapp", "pin": "123456"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        client.register("123456").await.unwrap();
    }

    #[tokio::test]
    async fn test_deregister_unsuccessful_is_application_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/123/deregister"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": false})))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        match client.deregister().await {
            Err(ApiError::Application(message)) => {
                assert_eq!(message, "Request was not successful")
            }
            other => panic!("expected application failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_phone_info_requests_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/123"))
            .and(query_param("fields", PHONE_INFO_FIELDS))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "verified_name": "Smart Door",
                "id": "123"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        let info = client.phone_info().await.unwrap();
        assert_eq!(info["verified_name"], "Smart Door");
    }

    #[tokio::test]
    async fn test_graph_error_status_is_transport_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"message": "Template name does not exist", "code": 132001}
            })))
            .mount(&server)
            .await;

        let client = WhatsAppClient::from_secrets(&secrets_for(&server)).unwrap();
        let result = client
            .send_template("15550001111", &Template::new("missing", "en"))
            .await;
        assert!(matches!(result, Err(ApiError::Transport { status: 400, .. })));
    }

    #[test]
    fn test_check_message_response_with_error_object() {
        let err = check_message_response(json!({"error": {"message": "bad"}})).unwrap_err();
        assert!(matches!(err, ApiError::Application(m) if m == "bad"));
    }
}
