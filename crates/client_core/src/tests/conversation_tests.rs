use super::*;
use async_trait::async_trait;
use tokio::sync::Mutex;

#[derive(Default)]
struct TestChatService {
    requests: Mutex<Vec<ChatRequest>>,
    fail: bool,
}

#[async_trait]
impl ChatService for TestChatService {
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.requests.lock().await.push(request.clone());
        if self.fail {
            return Err(ServiceError::Status {
                status: 500,
                reason: "Internal Server Error".into(),
                detail: Some("Chat failed: model offline".into()),
            });
        }
        Ok(ChatResponse {
            message: format!("answer to: {}", request.message),
            sources: vec![serde_json::json!({"title": "Greenhouse handbook"})],
        })
    }
}

#[tokio::test]
async fn turns_accumulate_and_carry_the_analysis_id() {
    let service = Arc::new(TestChatService::default());
    let mut conversation = Conversation::new(service.clone(), Some(" analysis-1 ".into()));
    assert_eq!(conversation.image_id(), Some("analysis-1"));

    let first = conversation
        .ask("Is late blight contagious?")
        .await
        .expect("reply")
        .expect("sent");
    assert_eq!(first.message, "answer to: Is late blight contagious?");

    conversation.ask("How fast?").await.expect("reply");
    assert_eq!(conversation.history().len(), 4);
    assert_eq!(conversation.history()[1].role, ChatRole::Assistant);

    let requests = service.requests.lock().await;
    assert!(requests[0].history.is_empty());
    assert_eq!(requests[1].history.len(), 2);
    assert_eq!(requests[1].history[0].content, "Is late blight contagious?");
    assert_eq!(requests[1].image_id.as_deref(), Some("analysis-1"));
}

#[tokio::test]
async fn blank_messages_are_not_sent() {
    let service = Arc::new(TestChatService::default());
    let mut conversation = Conversation::new(service.clone(), Some("   ".into()));
    assert_eq!(conversation.image_id(), None);

    assert!(conversation.ask("  ").await.expect("noop").is_none());
    assert!(service.requests.lock().await.is_empty());
}

#[tokio::test]
async fn failed_reply_leaves_history_unchanged() {
    let service = Arc::new(TestChatService {
        fail: true,
        ..TestChatService::default()
    });
    let mut conversation = Conversation::new(service, None);

    let err = conversation.ask("Why yellow leaves?").await.expect_err("500");
    assert_eq!(
        err.to_string(),
        "service returned 500 Internal Server Error: Chat failed: model offline"
    );
    assert!(conversation.history().is_empty());
}
