//! Agent 集成测试：Agent + 记忆后端 + Provider 的端到端行为

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use smartbot::agent::Agent;
    use smartbot::core::{ProviderError, ProviderErrorKind, SmartBotError};
    use smartbot::llm::{EchoProvider, LlmProvider, OllamaProvider, SamplingOptions};
    use smartbot::memory::{InMemoryBackend, JsonFileMemory, MemoryBackend, Message, Role};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct UnavailableProvider;

    #[async_trait]
    impl LlmProvider for UnavailableProvider {
        fn name(&self) -> &str {
            "unavailable"
        }

        async fn generate_response(
            &self,
            _prompt: &Message,
            _history: &[Message],
        ) -> Result<Message, ProviderError> {
            Err(ProviderError::Unavailable("connection refused".to_string()))
        }
    }

    #[tokio::test]
    async fn test_echo_with_volatile_memory() {
        let mut agent = Agent::new(Arc::new(EchoProvider), Box::new(InMemoryBackend::new()));

        let reply = agent.handle_message("Hola").await.unwrap();
        assert_eq!(reply, "Hola");

        let history = agent.memory().get_history();
        let roles: Vec<Role> = history.iter().map(|m| m.role()).collect();
        let contents: Vec<&str> = history.iter().map(|m| m.content()).collect();
        assert_eq!(roles, vec![Role::User, Role::Assistant]);
        assert_eq!(contents, vec!["Hola", "Hola"]);
    }

    #[tokio::test]
    async fn test_provider_failure_keeps_user_message() {
        let mut agent = Agent::new(
            Arc::new(UnavailableProvider),
            Box::new(InMemoryBackend::new()),
        );

        let err = agent.handle_message("x").await.unwrap_err();
        match err {
            SmartBotError::Provider(e) => assert_eq!(e.kind(), ProviderErrorKind::Unavailable),
            other => panic!("Expected provider error, got {other:?}"),
        }

        let history = agent.memory().get_history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].role(), Role::User);
        assert_eq!(history[0].content(), "x");
    }

    #[tokio::test]
    async fn test_conversation_survives_restart() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");

        {
            let memory = JsonFileMemory::new(&path, 10).unwrap();
            let mut agent = Agent::new(Arc::new(EchoProvider), Box::new(memory));
            agent.handle_message("remember me").await.unwrap();
        }

        let memory = JsonFileMemory::new(&path, 10).unwrap();
        let history = memory.get_history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content(), "remember me");
        assert_eq!(history[1].role(), Role::Assistant);
    }

    #[tokio::test]
    async fn test_window_caps_history_sent_to_provider() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "message": {"role": "assistant", "content": "ok"}
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let memory = JsonFileMemory::new(dir.path().join("h.json"), 3).unwrap();
        let provider = OllamaProvider::new(
            &server.uri(),
            "llama3",
            SamplingOptions::default(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let mut agent = Agent::new(Arc::new(provider), Box::new(memory));

        for text in ["one", "two", "three"] {
            assert_eq!(agent.handle_message(text).await.unwrap(), "ok");
        }

        let requests = server.received_requests().await.unwrap();
        assert_eq!(requests.len(), 3);
        let last: serde_json::Value = serde_json::from_slice(&requests[2].body).unwrap();
        let messages = last["messages"].as_array().unwrap();
        // 窗口 3：第三轮发出的是 two、ok、three
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2]["role"], "user");
        assert_eq!(messages[2]["content"], "three");

        assert_eq!(agent.memory().get_history().len(), 3);
    }

    #[tokio::test]
    async fn test_remote_rejection_propagates_unchanged() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(500).set_body_string("model crashed"))
            .mount(&server)
            .await;

        let provider = OllamaProvider::new(
            &server.uri(),
            "llama3",
            SamplingOptions::default(),
            std::time::Duration::from_secs(5),
        )
        .unwrap();
        let mut agent = Agent::new(Arc::new(provider), Box::new(InMemoryBackend::new()));

        let err = agent.handle_message("hello").await.unwrap_err();
        assert!(matches!(
            err,
            SmartBotError::Provider(ProviderError::RemoteRejected { status: 500, .. })
        ));
        assert_eq!(agent.memory().get_history().len(), 1);
    }
}
