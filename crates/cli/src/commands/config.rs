use tablesafe_core::config::AppConfig;

pub fn run(config: &AppConfig) -> String {
    let api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let lines = [
        "effective config (source precedence: override > env > file > default):".to_string(),
        format!("  llm.base_url = {}", config.llm.base_url),
        format!("  llm.model = {}", config.llm.model),
        format!("  llm.timeout_secs = {}", config.llm.timeout_secs),
        format!("  llm.api_key = {api_key}"),
        format!("  embedding.base_url = {}", config.embedding.base_url),
        format!("  embedding.model = {}", config.embedding.model),
        format!("  embedding.timeout_secs = {}", config.embedding.timeout_secs),
        format!("  guardrails.threshold_offtopic = {}", config.guardrails.threshold_offtopic),
        format!("  guardrails.threshold_clarify = {}", config.guardrails.threshold_clarify),
        format!("  guardrails.audit_log = {}", config.guardrails.audit_log.display()),
        format!("  logging.level = {}", config.logging.level),
        format!("  logging.format = {:?}", config.logging.format),
    ];

    lines.join("\n")
}
