//! Send command: handles one chat message end to end.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use agenda_protocol::{Outcome, encode_outcome_pretty};
use agenda_providers::{CalendarProvider, MemoryProvider};
use agenda_service::{Orchestrator, ServiceConfig};

use crate::config::AgendaConfig;
use crate::error::{CliError, CliResult};

/// Builds the calendar provider selected by the flags and configuration.
pub fn build_provider(offline: bool, config: &AgendaConfig) -> CliResult<Arc<dyn CalendarProvider>> {
    if offline {
        debug!("using in-memory calendar");
        return Ok(Arc::new(MemoryProvider::new()));
    }

    #[cfg(feature = "google")]
    {
        use agenda_providers::google::GoogleCalendarProvider;

        let credentials = config.credentials()?;
        if credentials.is_empty() {
            return Err(CliError::Config(
                "no users configured; add a [users] section to config.toml or pass --offline".into(),
            ));
        }
        info!(users = credentials.len(), "using Google Calendar");
        let provider = GoogleCalendarProvider::new(config.google_config(), Arc::new(credentials))?;
        Ok(Arc::new(provider))
    }

    #[cfg(not(feature = "google"))]
    {
        let _ = config;
        Err(CliError::Config(
            "built without Google Calendar support; pass --offline".into(),
        ))
    }
}

/// Runs `message` from `user_id` through the orchestrator.
pub async fn handle(
    provider: Arc<dyn CalendarProvider>,
    service: ServiceConfig,
    user_id: &str,
    message: &str,
    now: DateTime<Utc>,
) -> Outcome {
    let orchestrator = Orchestrator::new(provider, service);
    orchestrator.handle(user_id, message, now).await
}

/// The text printed for an outcome.
pub fn render(outcome: &Outcome, json: bool) -> CliResult<String> {
    if json {
        Ok(encode_outcome_pretty(outcome)?)
    } else {
        Ok(outcome.message.clone())
    }
}

/// Handles the message and prints the reply; returns whether it succeeded.
pub async fn run(
    config: &AgendaConfig,
    offline: bool,
    json: bool,
    user_id: &str,
    message: &str,
    now: DateTime<Utc>,
) -> CliResult<bool> {
    let service = config.service_config()?;
    let provider = build_provider(offline, config)?;
    let outcome = handle(provider, service, user_id, message, now).await;
    println!("{}", render(&outcome, json)?);
    Ok(outcome.is_success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use agenda_core::Action;
    use agenda_protocol::decode_outcome;
    use agenda_providers::CallKind;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 16, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn offline_create_then_check() {
        let memory = Arc::new(MemoryProvider::new());
        let service = AgendaConfig::default().service_config().unwrap();

        let created = handle(
            memory.clone(),
            service.clone(),
            "local",
            "/agendar Dentista | mañana 09:30",
            now(),
        )
        .await;
        assert!(created.is_success(), "{:?}", created);

        let listed = handle(memory.clone(), service, "local", "/checar mañana", now()).await;
        assert_eq!(listed.action, Action::Check);
        assert!(listed.message.contains("Domingo 02 Jun 09:30 hrs"));
        assert!(listed.message.contains("📌 **Dentista**"));
        assert_eq!(memory.call_count(CallKind::Insert), 1);
    }

    #[tokio::test]
    async fn json_rendering_decodes() {
        let memory = Arc::new(MemoryProvider::new());
        let outcome = handle(
            memory,
            ServiceConfig::default(),
            "local",
            "/cancelar Gym",
            now(),
        )
        .await;

        let text = render(&outcome, false).unwrap();
        assert_eq!(text, outcome.message);

        let json = render(&outcome, true).unwrap();
        let decoded = decode_outcome(&json).unwrap();
        assert_eq!(decoded, outcome);
    }

    #[test]
    fn offline_provider_is_memory() {
        let provider = build_provider(true, &AgendaConfig::default()).unwrap();
        assert_eq!(provider.name(), "memory");
    }

    #[cfg(feature = "google")]
    #[test]
    fn google_requires_users() {
        let err = build_provider(false, &AgendaConfig::default()).err().unwrap();
        assert!(err.to_string().contains("no users configured"));
    }
}
