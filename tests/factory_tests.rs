//! Integration tests for the agent factory.
//!
//! Template lookup, permissive creation versus strict validation, and
//! per-project team assembly and teardown.

mod common;

#[cfg(test)]
mod template_tests {
    use crate::common::mocks::{MockAgent, MockCompletionClient};
    use proctor::agents::{AgentConfig, AgentFactory, AgentTemplate};
    use proctor::registry::AgentRegistry;
    use proctor::types::AgentKind;
    use proctor::utils::AgentDefaults;
    use std::sync::Arc;

    #[test]
    fn test_builtin_templates_cover_team_kinds() {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new("{}"));
        let factory =
            AgentFactory::with_builtin_templates(registry, client, AgentDefaults::default());

        for kind in [
            AgentKind::Classification,
            AgentKind::Ideation,
            AgentKind::Grading,
            AgentKind::Improvement,
        ] {
            assert!(factory.has_template(&kind), "missing template for {kind}");
        }
        assert_eq!(factory.template_kinds().len(), 4);
    }

    #[test]
    fn test_custom_template_round_trip() {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new("{}"));
        let factory = AgentFactory::new(registry, client, AgentDefaults::default());

        let kind = AgentKind::Custom("inspector".to_string());
        assert!(!factory.has_template(&kind));

        factory.register_template(AgentTemplate::new(
            kind.clone(),
            "Scripted inspector",
            |config, _client| Ok(Arc::new(MockAgent::new(&config.id_for("inspector")))),
        ));
        assert!(factory.has_template(&kind));

        let agent = factory
            .create_agent(&AgentConfig::new(kind).with_id("inspector-1"))
            .unwrap();
        assert_eq!(agent.metadata().id, "inspector-1");
    }
}

#[cfg(test)]
mod creation_tests {
    use crate::common::mocks::MockCompletionClient;
    use proctor::agents::{AgentConfig, AgentFactory};
    use proctor::registry::AgentRegistry;
    use proctor::types::{AgentKind, AgentStatus, CapabilityKind, ProctorError};
    use proctor::utils::AgentDefaults;
    use std::sync::Arc;

    fn factory_with_registry() -> (Arc<AgentRegistry>, AgentFactory) {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new(r#"{"category": "policy"}"#));
        let factory = AgentFactory::with_builtin_templates(
            Arc::clone(&registry),
            client,
            AgentDefaults::default(),
        );
        (registry, factory)
    }

    #[tokio::test]
    async fn test_create_and_register() {
        let (registry, factory) = factory_with_registry();

        let id = factory
            .create_and_register(&AgentConfig::new(AgentKind::Classification).with_id("clf-1"))
            .await
            .unwrap();
        assert_eq!(id, "clf-1");
        assert!(registry.contains("clf-1"));
        assert_eq!(registry.agent_status("clf-1"), Some(AgentStatus::Ready));
    }

    #[test]
    fn test_defaults_fill_config_gaps() {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new("{}"));
        let defaults = AgentDefaults {
            version: "9.9.9".to_string(),
            temperature: 0.2,
            max_tokens: 512,
        };
        let factory = AgentFactory::with_builtin_templates(registry, client, defaults);

        let agent = factory
            .create_agent(&AgentConfig::new(AgentKind::Grading))
            .unwrap();
        assert_eq!(agent.metadata().version, "9.9.9");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let (_registry, factory) = factory_with_registry();

        let err = factory
            .create_agent(&AgentConfig::new(AgentKind::Custom("nonexistent".to_string())))
            .err()
            .unwrap();
        assert!(matches!(err, ProctorError::UnknownAgentKind(kind) if kind == "nonexistent"));
    }

    #[test]
    fn test_creation_is_permissive_about_capabilities() {
        let (_registry, factory) = factory_with_registry();

        // Uncovered capabilities are logged, not rejected
        let config = AgentConfig::new(AgentKind::Classification)
            .with_capabilities(vec![CapabilityKind::RemediationPlanning]);
        assert!(factory.create_agent(&config).is_ok());
    }
}

#[cfg(test)]
mod validation_tests {
    use crate::common::mocks::{MockAgent, MockCompletionClient};
    use proctor::agents::{AgentConfig, AgentFactory, AgentTemplate};
    use proctor::registry::AgentRegistry;
    use proctor::types::{AgentKind, CapabilityKind};
    use proctor::utils::AgentDefaults;
    use rstest::rstest;
    use std::sync::Arc;

    fn builtin_factory() -> AgentFactory {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new("{}"));
        AgentFactory::with_builtin_templates(registry, client, AgentDefaults::default())
    }

    #[rstest]
    #[case::no_capabilities(vec![], true)]
    #[case::covered(vec![CapabilityKind::DocumentClassification], true)]
    #[case::covered_pair(
        vec![CapabilityKind::DocumentClassification, CapabilityKind::FrameworkMapping],
        true
    )]
    #[case::uncovered(vec![CapabilityKind::RemediationPlanning], false)]
    fn test_capability_subset_rule(
        #[case] capabilities: Vec<CapabilityKind>,
        #[case] expect_valid: bool,
    ) {
        let factory = builtin_factory();
        let config =
            AgentConfig::new(AgentKind::Classification).with_capabilities(capabilities);

        let validation = factory.validate_config(&config);
        assert_eq!(validation.valid, expect_valid);
        assert_eq!(validation.errors.is_empty(), expect_valid);
    }

    #[test]
    fn test_unknown_kind_is_invalid() {
        let factory = builtin_factory();
        let validation =
            factory.validate_config(&AgentConfig::new(AgentKind::Custom("nope".to_string())));

        assert!(!validation.valid);
        assert!(validation.errors[0].contains("unknown agent kind"));
    }

    #[test]
    fn test_tag_subset_rule() {
        let factory = builtin_factory();
        let kind = AgentKind::Custom("auditor".to_string());
        factory.register_template(
            AgentTemplate::new(kind.clone(), "Tag-restricted", |config, _client| {
                Ok(Arc::new(MockAgent::new(&config.id_for("auditor"))))
            })
            .with_supported_tags(vec!["audit".to_string()]),
        );

        let accepted = factory
            .validate_config(&AgentConfig::new(kind.clone()).with_tag("audit"));
        assert!(accepted.valid);

        let rejected = factory.validate_config(&AgentConfig::new(kind).with_tag("intern"));
        assert!(!rejected.valid);
        assert!(rejected.errors[0].contains("not supported"));
    }
}

#[cfg(test)]
mod team_tests {
    use crate::common::mocks::{MockAgent, MockCompletionClient};
    use proctor::agents::AgentFactory;
    use proctor::registry::AgentRegistry;
    use proctor::types::{AgentKind, AgentStatus};
    use proctor::utils::AgentDefaults;
    use std::sync::Arc;

    fn factory_with_registry() -> (Arc<AgentRegistry>, AgentFactory) {
        let registry = Arc::new(AgentRegistry::with_defaults());
        let client = Arc::new(MockCompletionClient::new("{}"));
        let factory = AgentFactory::with_builtin_templates(
            Arc::clone(&registry),
            client,
            AgentDefaults::default(),
        );
        (registry, factory)
    }

    #[tokio::test]
    async fn test_create_project_team() {
        let (registry, factory) = factory_with_registry();

        let report = factory.create_project_team("proj-a").await;
        assert!(report.is_complete());
        assert_eq!(report.members.len(), 4);

        let mut ids = report.succeeded_ids();
        ids.sort_unstable();
        assert_eq!(
            ids,
            vec![
                "classification-proj-a",
                "grading-proj-a",
                "ideation-proj-a",
                "improvement-proj-a",
            ]
        );

        assert_eq!(registry.agent_count(), 4);
        let snapshot = registry.get("grading-proj-a").unwrap();
        assert_eq!(snapshot.status, AgentStatus::Ready);
        assert!(snapshot.metadata.tags.contains(&"project:proj-a".to_string()));
    }

    #[tokio::test]
    async fn test_partial_team_failure_is_reported() {
        let (registry, factory) = factory_with_registry();

        // Collides with the id the team would use for its classifier
        registry
            .register(Arc::new(MockAgent::new("classification-proj-b")))
            .await
            .unwrap();

        let report = factory.create_project_team("proj-b").await;
        assert!(!report.is_complete());
        assert_eq!(report.members.len(), 4);
        assert_eq!(report.succeeded_ids().len(), 3);

        let failures = report.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, AgentKind::Classification);
        assert!(failures[0]
            .error
            .as_deref()
            .unwrap_or("")
            .contains("already registered"));
    }

    #[tokio::test]
    async fn test_destroy_project_team() {
        let (registry, factory) = factory_with_registry();
        factory.create_project_team("proj-a").await;
        assert_eq!(registry.agent_count(), 4);

        let report = factory.destroy_project_team("proj-a");
        assert!(report.is_complete());
        assert_eq!(report.members.len(), 4);
        assert_eq!(registry.agent_count(), 0);
    }

    #[tokio::test]
    async fn test_destroy_leaves_other_projects_alone() {
        let (registry, factory) = factory_with_registry();
        factory.create_project_team("proj-a").await;
        factory.create_project_team("proj-b").await;
        assert_eq!(registry.agent_count(), 8);

        factory.destroy_project_team("proj-a");
        assert_eq!(registry.agent_count(), 4);
        assert!(registry.contains("grading-proj-b"));
        assert!(!registry.contains("grading-proj-a"));
    }
}
