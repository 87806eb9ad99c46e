//! Reconciliation of what was sent with what the workflow echoed back.
//!
//! n8n answers in several shapes depending on how the "Respond to
//! Webhook" node is set up:
//!
//! - the Graph API body itself: `{"contacts": [...], "messages": [...]}`
//! - a full response envelope: `{"statusCode": 200, "body": {...}}`
//! - either of the above wrapped in a list: `[{...}]`

use crate::types::{DispatchOutcome, EchoFields, MatchVerdict, ReconciliationRecord};
use serde_json::{Map, Value};

/// Recognised response layouts, tried in declaration order.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseShape<'a> {
    /// Non-empty list; only the first element is considered.
    ListWrapped(Box<ResponseShape<'a>>),
    /// Object carrying the useful payload under `body`.
    Enveloped(&'a Map<String, Value>),
    Bare(&'a Map<String, Value>),
    NoData,
}

impl<'a> ResponseShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        match value {
            Value::Array(items) => match items.first().map(Self::classify_object) {
                Some(ResponseShape::NoData) | None => ResponseShape::NoData,
                Some(inner) => ResponseShape::ListWrapped(Box::new(inner)),
            },
            other => Self::classify_object(other),
        }
    }

    fn classify_object(value: &'a Value) -> Self {
        match value {
            Value::Object(map) => match map.get("body") {
                Some(Value::Object(body)) => ResponseShape::Enveloped(body),
                _ => ResponseShape::Bare(map),
            },
            _ => ResponseShape::NoData,
        }
    }

    /// The object holding `contacts` / `messages`, if any.
    pub fn payload(&self) -> Option<&'a Map<String, Value>> {
        match self {
            ResponseShape::ListWrapped(inner) => inner.payload(),
            ResponseShape::Enveloped(body) => Some(body),
            ResponseShape::Bare(map) => Some(map),
            ResponseShape::NoData => None,
        }
    }
}

/// Unwrap list and envelope layers down to the useful object.
pub fn normalize_response(value: &Value) -> Option<&Map<String, Value>> {
    ResponseShape::classify(value).payload()
}

/// Read `contacts[0].{input,wa_id}` and `messages[0].{id,message_status}`.
/// Anything missing is simply absent.
pub fn extract_echo(json: Option<&Value>) -> EchoFields {
    let Some(obj) = json.and_then(normalize_response) else {
        return EchoFields::default();
    };

    let contact = first_object(obj, "contacts");
    let message = first_object(obj, "messages");

    EchoFields {
        input: contact.and_then(|c| field_text(c, "input")),
        wa_id: contact.and_then(|c| field_text(c, "wa_id")),
        message_id: message.and_then(|m| field_text(m, "id")),
        message_status: message.and_then(|m| field_text(m, "message_status")),
    }
}

/// Build the report row for a contact that was dispatched.
pub fn reconcile(
    original_phone: Option<&str>,
    wa_id_sent: &str,
    outcome: &DispatchOutcome,
) -> ReconciliationRecord {
    let echo = extract_echo(outcome.json.as_ref());
    let match_verdict = MatchVerdict::from_echo(echo.input.as_deref(), echo.wa_id.as_deref());

    ReconciliationRecord {
        original_phone: original_phone.map(String::from),
        wa_id_sent: Some(wa_id_sent.to_string()),
        input_returned: echo.input,
        wa_id_returned: echo.wa_id,
        match_verdict,
        http_status: outcome.status_http,
        message_status: echo.message_status,
        message_id: echo.message_id,
        error: outcome.error.clone(),
    }
}

fn first_object<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a Map<String, Value>> {
    obj.get(key)?.as_array()?.first()?.as_object()
}

fn field_text(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn graph_body() -> Value {
        json!({
            "messaging_product": "whatsapp",
            "contacts": [{ "input": "5511999998888", "wa_id": "5511999998888" }],
            "messages": [{ "id": "wamid.HBgN", "message_status": "accepted" }]
        })
    }

    fn expected() -> EchoFields {
        EchoFields {
            input: Some("5511999998888".into()),
            wa_id: Some("5511999998888".into()),
            message_id: Some("wamid.HBgN".into()),
            message_status: Some("accepted".into()),
        }
    }

    #[test]
    fn test_bare_object() {
        assert_eq!(extract_echo(Some(&graph_body())), expected());
    }

    #[test]
    fn test_envelope_and_list_are_transparent() {
        let enveloped = json!({ "statusCode": 200, "headers": {}, "body": graph_body() });
        let listed = json!([enveloped.clone()]);
        let listed_bare = json!([graph_body()]);

        assert_eq!(extract_echo(Some(&enveloped)), expected());
        assert_eq!(extract_echo(Some(&listed)), expected());
        assert_eq!(extract_echo(Some(&listed_bare)), expected());
    }

    #[test]
    fn test_shape_classification() {
        let body = graph_body();
        assert!(matches!(ResponseShape::classify(&body), ResponseShape::Bare(_)));

        let enveloped = json!({ "body": graph_body() });
        assert!(matches!(ResponseShape::classify(&enveloped), ResponseShape::Enveloped(_)));

        let listed = json!([{ "body": graph_body() }]);
        match ResponseShape::classify(&listed) {
            ResponseShape::ListWrapped(inner) => {
                assert!(matches!(*inner, ResponseShape::Enveloped(_)))
            }
            other => panic!("unexpected shape {:?}", other),
        }

        assert_eq!(ResponseShape::classify(&json!([])), ResponseShape::NoData);
        assert_eq!(ResponseShape::classify(&json!("ok")), ResponseShape::NoData);
        assert_eq!(ResponseShape::classify(&json!([1, 2])), ResponseShape::NoData);
    }

    #[test]
    fn test_string_body_is_not_an_envelope() {
        let v = json!({ "body": "plain text", "contacts": [{ "input": "1", "wa_id": "1" }] });
        let echo = extract_echo(Some(&v));
        assert_eq!(echo.input.as_deref(), Some("1"));
    }

    #[test]
    fn test_missing_pieces_are_absent() {
        assert_eq!(extract_echo(None), EchoFields::default());
        assert_eq!(extract_echo(Some(&json!({}))), EchoFields::default());
        assert_eq!(extract_echo(Some(&json!({ "contacts": [] }))), EchoFields::default());
        assert_eq!(
            extract_echo(Some(&json!({ "contacts": {"input": "x"}, "messages": ["wamid"] }))),
            EchoFields::default()
        );

        let partial = json!({ "contacts": [{ "input": "5511999998888", "wa_id": null }] });
        let echo = extract_echo(Some(&partial));
        assert_eq!(echo.input.as_deref(), Some("5511999998888"));
        assert_eq!(echo.wa_id, None);
        assert_eq!(echo.message_id, None);
    }

    #[test]
    fn test_numeric_echoes_are_rendered() {
        let v = json!({ "contacts": [{ "input": 5511999998888u64, "wa_id": "5511999998888" }] });
        let echo = extract_echo(Some(&v));
        assert_eq!(echo.input.as_deref(), Some("5511999998888"));
        assert_eq!(
            MatchVerdict::from_echo(echo.input.as_deref(), echo.wa_id.as_deref()),
            MatchVerdict::Yes
        );
    }

    #[test]
    fn test_reconcile_match_and_mismatch() {
        let ok = DispatchOutcome {
            status_http: Some(200),
            json: Some(graph_body()),
            raw_text: Some(graph_body().to_string()),
            error: None,
        };
        let rec = reconcile(Some("+55 11 99999-8888"), "5511999998888", &ok);
        assert_eq!(rec.match_verdict, MatchVerdict::Yes);
        assert_eq!(rec.http_status, Some(200));
        assert_eq!(rec.message_id.as_deref(), Some("wamid.HBgN"));
        assert_eq!(rec.message_status.as_deref(), Some("accepted"));
        assert_eq!(rec.original_phone.as_deref(), Some("+55 11 99999-8888"));
        assert!(rec.error.is_none());

        let no_wa_id = DispatchOutcome {
            json: Some(json!({ "contacts": [{ "input": "5511999998888" }] })),
            ..ok.clone()
        };
        assert_eq!(
            reconcile(Some("x"), "5511999998888", &no_wa_id).match_verdict,
            MatchVerdict::No
        );
    }

    #[test]
    fn test_reconcile_failed_dispatch_keeps_error() {
        let failed = DispatchOutcome {
            status_http: None,
            json: None,
            raw_text: Some("connection refused".into()),
            error: Some("max retries exceeded".into()),
        };
        let rec = reconcile(Some("11988887777"), "5511988887777", &failed);
        assert_eq!(rec.match_verdict, MatchVerdict::No);
        assert_eq!(rec.wa_id_sent.as_deref(), Some("5511988887777"));
        assert_eq!(rec.http_status, None);
        assert_eq!(rec.error.as_deref(), Some("max retries exceeded"));
    }
}
