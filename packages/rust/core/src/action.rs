//! Bedrock agent action-group adapter.
//!
//! An event carries its parameters as a `{name, value}` list under
//! `requestBody.content["application/json"].properties`. When `app_ids` is
//! present the batch workflow runs; otherwise `app_id` and `r_strategy` select
//! a single plan. Success returns the written object key inside the agent
//! response envelope. Every failure becomes a flat 500 envelope.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info, instrument};

use migrationplanner_shared::{
    AppConfig, MigrationStrategy, PlannerError, Result, RunId, ServiceEnv,
};

use crate::Planner;
use crate::batch::{SilentProgress, run_batch, split_app_ids};
use crate::plan::generate_plan;

/// Message placed in every failure body.
pub const FAILURE_MESSAGE: &str = "An error occurred during the process.";

const JSON_MEDIA_TYPE: &str = "application/json";

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionGroupEvent {
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    pub request_body: RequestBody,
    #[serde(default)]
    pub session_attributes: Option<Value>,
    #[serde(default)]
    pub prompt_session_attributes: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequestBody {
    pub content: HashMap<String, MediaContent>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaContent {
    #[serde(default)]
    pub properties: Vec<Property>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
}

impl Property {
    /// The value as text. Agents send strings; other JSON values are rendered.
    fn text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl ActionGroupEvent {
    /// Flatten the JSON request properties into `name -> value`. Later
    /// duplicates win.
    pub fn parameters(&self) -> Result<HashMap<String, String>> {
        let content = self.request_body.content.get(JSON_MEDIA_TYPE).ok_or_else(|| {
            PlannerError::validation(format!("request body has no {JSON_MEDIA_TYPE} content"))
        })?;
        Ok(content
            .properties
            .iter()
            .map(|p| (p.name.clone(), p.text()))
            .collect())
    }
}

// ---------------------------------------------------------------------------
// Request
// ---------------------------------------------------------------------------

/// What an event asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionRequest {
    Plan {
        app_id: String,
        strategy: MigrationStrategy,
    },
    Batch {
        app_ids: Vec<String>,
    },
}

impl ActionRequest {
    pub fn from_parameters(params: &HashMap<String, String>) -> Result<Self> {
        if let Some(raw) = params.get("app_ids") {
            return Ok(Self::Batch {
                app_ids: split_app_ids(raw),
            });
        }

        let app_id = required(params, "app_id")?;
        let strategy = match MigrationStrategy::from_str(required(params, "r_strategy")?) {
            Ok(strategy) => strategy,
            Err(never) => match never {},
        };
        Ok(Self::Plan {
            app_id: app_id.to_string(),
            strategy,
        })
    }
}

fn required<'a>(params: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    params
        .get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| PlannerError::validation(format!("missing parameter {name}")))
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResponse<'a> {
    message_version: &'static str,
    response: ActionResult<'a>,
    session_attributes: Value,
    prompt_session_attributes: Value,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ActionResult<'a> {
    action_group: &'a str,
    api_path: &'a str,
    http_method: &'a str,
    http_status_code: u16,
    response_body: ResponseBody,
}

#[derive(Debug, Serialize)]
struct ResponseBody {
    #[serde(rename = "application/json")]
    json: KeyBody,
}

#[derive(Debug, Serialize)]
struct KeyBody {
    body: String,
}

fn success_response(event: &ActionGroupEvent, key: String) -> Result<Value> {
    let response = ActionResponse {
        message_version: "1.0",
        response: ActionResult {
            action_group: &event.action_group,
            api_path: &event.api_path,
            http_method: &event.http_method,
            http_status_code: 200,
            response_body: ResponseBody {
                json: KeyBody { body: key },
            },
        },
        session_attributes: event.session_attributes.clone().unwrap_or_else(|| json!({})),
        prompt_session_attributes: event
            .prompt_session_attributes
            .clone()
            .unwrap_or_else(|| json!({})),
    };
    Ok(serde_json::to_value(response)?)
}

/// The 500 envelope. `body` is a JSON document encoded as a string.
pub fn failure_response(err: &PlannerError) -> Value {
    let body = json!({
        "error": FAILURE_MESSAGE,
        "details": err.to_string(),
    });
    json!({
        "statusCode": 500,
        "body": body.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Handler
// ---------------------------------------------------------------------------

/// Handle one action-group invocation. Never fails: errors are reported in
/// the returned envelope.
#[instrument(skip_all, fields(run_id = %RunId::new()))]
pub async fn handle_event(planner: &Planner, event: Value) -> Value {
    match dispatch(planner, event).await {
        Ok(response) => response,
        Err(e) => {
            error!(error = %e, "action group request failed");
            failure_response(&e)
        }
    }
}

/// Read the service environment, build AWS-backed clients, and handle `event`.
/// A missing environment variable is reported like any other failure.
pub async fn handle_event_from_env(config: &AppConfig, event: Value) -> Value {
    match ServiceEnv::from_env() {
        Ok(env) => {
            let planner = Planner::from_aws(config, &env).await;
            handle_event(&planner, event).await
        }
        Err(e) => {
            error!(error = %e, "service environment incomplete");
            failure_response(&e)
        }
    }
}

async fn dispatch(planner: &Planner, event: Value) -> Result<Value> {
    let event: ActionGroupEvent = serde_json::from_value(event)
        .map_err(|e| PlannerError::validation(format!("malformed event: {e}")))?;
    let request = ActionRequest::from_parameters(&event.parameters()?)?;

    info!(
        action_group = %event.action_group,
        api_path = %event.api_path,
        ?request,
        "handling action group request"
    );

    let key = match &request {
        ActionRequest::Plan { app_id, strategy } => {
            generate_plan(planner, app_id, strategy).await?.key
        }
        ActionRequest::Batch { app_ids } => {
            run_batch(planner, app_ids, &planner.batch_options(), &SilentProgress)
                .await?
                .artifact
                .key
        }
    };

    success_response(&event, key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeKb, FakeModel, RECOMMENDATION, harness};

    fn event(properties: Value) -> Value {
        json!({
            "messageVersion": "1.0",
            "agent": { "name": "migration-agent", "id": "AG1", "alias": "TSTALIAS", "version": "DRAFT" },
            "actionGroup": "planning",
            "apiPath": "/plan",
            "httpMethod": "POST",
            "sessionId": "s-1",
            "inputText": "plan it",
            "requestBody": {
                "content": {
                    "application/json": { "properties": properties }
                }
            },
            "sessionAttributes": { "user": "ops" },
            "promptSessionAttributes": {}
        })
    }

    fn details(response: &Value) -> String {
        assert_eq!(response["statusCode"], 500);
        let body: Value = serde_json::from_str(response["body"].as_str().unwrap()).unwrap();
        assert_eq!(body["error"], FAILURE_MESSAGE);
        body["details"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn single_plan_success_envelope() {
        let h = harness(FakeKb::default(), FakeModel::replying("the plan"));
        let response = handle_event(
            &h.planner,
            event(json!([
                { "name": "app_id", "type": "string", "value": "A1" },
                { "name": "r_strategy", "type": "string", "value": "Rehost" }
            ])),
        )
        .await;

        assert_eq!(
            response,
            json!({
                "messageVersion": "1.0",
                "response": {
                    "actionGroup": "planning",
                    "apiPath": "/plan",
                    "httpMethod": "POST",
                    "httpStatusCode": 200,
                    "responseBody": {
                        "application/json": { "body": "R-Disposition-outputs/A1_migration_plan.txt" }
                    }
                },
                "sessionAttributes": { "user": "ops" },
                "promptSessionAttributes": {}
            })
        );
        assert_eq!(
            h.store.body("R-Disposition-outputs/A1_migration_plan.txt").as_deref(),
            Some("the plan")
        );
    }

    #[tokio::test]
    async fn app_ids_selects_batch_mode() {
        let h = harness(FakeKb::default(), FakeModel::replying(RECOMMENDATION));
        let response = handle_event(
            &h.planner,
            event(json!([{ "name": "app_ids", "type": "string", "value": "A1, A2" }])),
        )
        .await;

        assert_eq!(
            response["response"]["responseBody"]["application/json"]["body"],
            "R-Disposition-outputs/r_disposition_recommendations.csv"
        );
        assert_eq!(h.model.prompts.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn missing_session_attributes_echo_as_empty_objects() {
        let h = harness(FakeKb::default(), FakeModel::replying("plan"));
        let mut ev = event(json!([
            { "name": "app_id", "value": "A1" },
            { "name": "r_strategy", "value": "Retain" }
        ]));
        let obj = ev.as_object_mut().unwrap();
        obj.remove("sessionAttributes");
        obj.remove("promptSessionAttributes");

        let response = handle_event(&h.planner, ev).await;
        assert_eq!(response["sessionAttributes"], json!({}));
        assert_eq!(response["promptSessionAttributes"], json!({}));
    }

    #[tokio::test]
    async fn missing_strategy_is_a_500() {
        let h = harness(FakeKb::default(), FakeModel::replying("plan"));
        let response = handle_event(
            &h.planner,
            event(json!([{ "name": "app_id", "value": "A1" }])),
        )
        .await;

        assert!(details(&response).contains("r_strategy"));
        assert!(h.store.keys().is_empty());
    }

    #[tokio::test]
    async fn malformed_event_is_a_500() {
        let h = harness(FakeKb::default(), FakeModel::replying("plan"));
        let response = handle_event(&h.planner, json!({ "hello": "world" })).await;
        assert!(details(&response).contains("malformed event"));
    }

    #[tokio::test]
    async fn generation_failure_is_a_500() {
        let h = harness(
            FakeKb::default(),
            FakeModel::replying(RECOMMENDATION).failing_for(&["A2"]),
        );
        let response = handle_event(
            &h.planner,
            event(json!([{ "name": "app_ids", "value": "A1,A2" }])),
        )
        .await;

        assert!(details(&response).contains("ThrottlingException"));
        assert!(h.store.keys().is_empty());
    }

    #[test]
    fn parameters_later_duplicates_win_and_non_strings_render() {
        let ev: ActionGroupEvent = serde_json::from_value(event(json!([
            { "name": "app_id", "value": "A1" },
            { "name": "app_id", "value": "A2" },
            { "name": "limit", "type": "integer", "value": 3 }
        ])))
        .unwrap();
        let params = ev.parameters().unwrap();
        assert_eq!(params["app_id"], "A2");
        assert_eq!(params["limit"], "3");
    }

    #[test]
    fn free_text_strategy_is_kept() {
        let params = HashMap::from([
            ("app_id".to_string(), " A1 ".to_string()),
            ("r_strategy".to_string(), "Relocate".to_string()),
        ]);
        assert_eq!(
            ActionRequest::from_parameters(&params).unwrap(),
            ActionRequest::Plan {
                app_id: "A1".into(),
                strategy: MigrationStrategy::Other("Relocate".into()),
            }
        );
    }
}
