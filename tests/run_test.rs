use std::path::Path;
use std::sync::Arc;

use wa_bulk_lib::config::RunPlan;
use wa_bulk_lib::execute;
use wa_dispatch::testing::{RecordingSleeper, ScriptedTransport};
use wa_dispatch::transport::{RequestBody, TransportResponse};
use wa_dispatch::{DispatchConfig, DispatchErrorCode};

fn plan(dir: &Path, image: Option<&str>) -> RunPlan {
    RunPlan {
        contacts_path: dir.join("contatos_comercial.csv"),
        report_path: dir.join("relatorio.csv"),
        phone_column: "Celular".into(),
        image: image.map(|name| dir.join(name)),
    }
}

fn echo_transport() -> ScriptedTransport {
    ScriptedTransport::responder(|req| {
        let RequestBody::Json(ref body) = req.body else {
            return Ok(TransportResponse::new(200, r#"{"media_id":"img-1"}"#));
        };
        let wa_id = body["wa_id"].as_str().unwrap_or_default();
        let answer = serde_json::json!({
            "contacts": [{ "input": wa_id, "wa_id": wa_id }],
            "messages": [{ "id": "wamid.X", "message_status": "accepted" }]
        });
        Ok(TransportResponse::new(200, answer.to_string()))
    })
}

#[test]
fn report_lists_failures_first() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("contatos_comercial.csv"),
        "Nome;Celular\nAna;+55 11 99999-8888\nBia;11988887777\nCaio;abc\n",
    )
    .unwrap();

    let config = DispatchConfig::new("http://n8n.local/webhook/msg", "bot", "pw");
    let plan = plan(dir.path(), None);
    let report = tokio_test::block_on(execute(
        config,
        &plan,
        Arc::new(echo_transport()),
        Arc::new(RecordingSleeper::new()),
    ))
    .unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.matched, 2);
    assert_eq!(report.summary.invalid_phone, 1);
    let input_order: Vec<_> = report
        .records
        .iter()
        .map(|r| r.original_phone.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(input_order, vec!["+55 11 99999-8888", "11988887777", "abc"]);

    let text = std::fs::read_to_string(&plan.report_path).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].starts_with("original_phone,wa_id_sent"));
    assert_eq!(lines[1], "abc,,,,no,,,,invalid phone");
    assert_eq!(
        lines[2],
        "+55 11 99999-8888,5511999998888,5511999998888,5511999998888,yes,200,accepted,wamid.X,"
    );
    assert!(lines[3].starts_with("11988887777,5511988887777,"));
}

#[test]
fn failed_upload_writes_no_report() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("contatos_comercial.csv"), "Celular\n11988887777\n").unwrap();
    std::fs::write(dir.path().join("promo.png"), [0x89, b'P', b'N', b'G']).unwrap();

    let mut config = DispatchConfig::new("http://n8n.local/webhook/msg", "bot", "pw");
    config.upload_url = Some("http://n8n.local/webhook/img".into());
    let plan = plan(dir.path(), Some("promo.png"));

    let transport = Arc::new(ScriptedTransport::new(vec![ScriptedTransport::ok(
        200,
        r#"{"ok":true}"#,
    )]));
    let err = tokio_test::block_on(execute(
        config,
        &plan,
        transport.clone(),
        Arc::new(RecordingSleeper::new()),
    ))
    .unwrap_err();

    assert_eq!(err.code, DispatchErrorCode::MissingMediaReference);
    assert_eq!(transport.request_count(), 1);
    assert!(!plan.report_path.exists());
}

#[test]
fn missing_phone_column_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("contatos_comercial.csv"), "Nome,Telefone\nAna,1\n").unwrap();

    let transport = Arc::new(ScriptedTransport::new(vec![]));
    let err = tokio_test::block_on(execute(
        DispatchConfig::new("http://n8n.local/webhook/msg", "bot", "pw"),
        &plan(dir.path(), None),
        transport.clone(),
        Arc::new(RecordingSleeper::new()),
    ))
    .unwrap_err();

    assert_eq!(err.code, DispatchErrorCode::MissingColumn);
    assert_eq!(transport.request_count(), 0);
}
