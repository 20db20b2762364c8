use serde::Serialize;
use tablesafe_agent::embeddings::{EmbeddingClient, OllamaEmbeddingClient};
use tablesafe_agent::llm::{ChatClient, ChatTurn, OllamaChatClient};
use tablesafe_core::audit::JsonlAuditSink;
use tablesafe_core::config::AppConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    checks: Vec<DoctorCheck>,
}

pub async fn run(config: &AppConfig, json_output: bool) -> String {
    let report = build_report(config).await;

    if json_output {
        return serde_json::to_string_pretty(&report)
            .unwrap_or_else(|error| format!("{{\"error\":\"doctor serialization failed: {error}\"}}"));
    }

    render_human(&report)
}

async fn build_report(config: &AppConfig) -> DoctorReport {
    let mut checks = vec![DoctorCheck {
        name: "config_validation",
        status: CheckStatus::Pass,
        details: "configuration loaded and validated".to_string(),
    }];

    checks.push(check_audit_log(config));
    checks.push(check_embedding_backend(config).await);
    checks.push(check_llm_backend(config).await);

    let overall_status = if checks.iter().all(|check| check.status == CheckStatus::Pass) {
        CheckStatus::Pass
    } else {
        CheckStatus::Fail
    };

    DoctorReport { overall_status, checks }
}

fn check_audit_log(config: &AppConfig) -> DoctorCheck {
    match JsonlAuditSink::create(&config.guardrails.audit_log) {
        Ok(sink) => DoctorCheck {
            name: "audit_log_writable",
            status: CheckStatus::Pass,
            details: format!("audit log opened at {}", sink.path().display()),
        },
        Err(error) => DoctorCheck {
            name: "audit_log_writable",
            status: CheckStatus::Fail,
            details: error.to_string(),
        },
    }
}

async fn check_embedding_backend(config: &AppConfig) -> DoctorCheck {
    let probe = async {
        let client = OllamaEmbeddingClient::new(&config.embedding)?;
        client.embed("readiness probe").await
    };

    match probe.await {
        Ok(embedding) => DoctorCheck {
            name: "embedding_backend",
            status: CheckStatus::Pass,
            details: format!(
                "model `{}` returned a {}-dimensional embedding",
                config.embedding.model,
                embedding.len()
            ),
        },
        Err(error) => DoctorCheck {
            name: "embedding_backend",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

async fn check_llm_backend(config: &AppConfig) -> DoctorCheck {
    let probe = async {
        let client = OllamaChatClient::new(&config.llm)?;
        client
            .chat(
                "You are a readiness probe. Reply with the single word: ok",
                &[ChatTurn::user("ping")],
            )
            .await
    };

    match probe.await {
        Ok(_) => DoctorCheck {
            name: "llm_backend",
            status: CheckStatus::Pass,
            details: format!("model `{}` responded", config.llm.model),
        },
        Err(error) => DoctorCheck {
            name: "llm_backend",
            status: CheckStatus::Fail,
            details: format!("{error:#}"),
        },
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::with_capacity(report.checks.len() + 1);
    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "FAIL",
        };
        lines.push(format!("[{marker}] {}: {}", check.name, check.details));
    }
    let overall = match report.overall_status {
        CheckStatus::Pass => "all checks passed",
        CheckStatus::Fail => "one or more checks failed",
    };
    lines.push(format!("doctor: {overall}"));
    lines.join("\n")
}
