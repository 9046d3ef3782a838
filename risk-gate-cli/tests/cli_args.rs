//! Argument parsing and validation.

use clap::Parser;
use risk_gate_cli::{Args, Command};

fn parse(argv: &[&str]) -> Result<Args, clap::Error> {
    let mut full = vec!["risk-gate"];
    full.extend_from_slice(argv);
    Args::try_parse_from(full)
}

#[test]
fn test_analyze_defaults() {
    let args = parse(&["analyze", "--proposal-id", "7"]).unwrap();
    assert_eq!(args.db.to_str(), Some("risk-gate.db"));
    assert_eq!(args.llm_model, "gpt-4o-mini");
    assert!(!args.ai_enabled());
    assert!(matches!(args.command, Command::Analyze { proposal_id: 7, .. }));
    assert!(args.validate().is_ok());
}

#[test]
fn test_summary_id_list() {
    let args = parse(&["summary", "--ids", "1,2,3", "--owner", "alice"]).unwrap();
    assert_eq!(
        args.command,
        Command::Summary {
            ids: Some(vec![1, 2, 3]),
            owner: Some("alice".into()),
            template_key: None,
        }
    );
}

#[test]
fn test_override_requires_reason() {
    assert!(parse(&["override", "--run-id", "4", "--actor", "dana"]).is_err());

    let args = parse(&[
        "override",
        "--run-id",
        "4",
        "--actor",
        "dana",
        "--reason",
        "Signed waiver",
        "--role-hint",
        "admin",
    ])
    .unwrap();
    match args.command {
        Command::Override { role_hint, .. } => assert_eq!(role_hint.as_deref(), Some("admin")),
        other => panic!("unexpected command {:?}", other),
    }
}

#[test]
fn test_api_key_without_endpoint_is_rejected() {
    let args = parse(&["--llm-api-key", "k", "readiness", "--proposal-id", "1"]).unwrap();
    assert!(args.validate().is_err());

    let args = parse(&[
        "--llm-base-url",
        "http://localhost:8000/v1",
        "--llm-api-key",
        "k",
        "readiness",
        "--proposal-id",
        "1",
    ])
    .unwrap();
    assert!(args.ai_enabled());
    assert!(args.validate().is_ok());
}

#[test]
fn test_blank_user_is_rejected() {
    let args = parse(&["add-user", "--actor", " ", "--role", "admin"]).unwrap();
    assert!(args.validate().is_err());
}
