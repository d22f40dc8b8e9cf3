//! Conversation gateway behaviour with a test-local provider

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::EchoProvider;
use voicetutor::providers::{LlmProvider, ProviderError};
use voicetutor::{ConversationGateway, ImagePayload, Mode, SessionStore, TurnRequest, VoiceError};

fn gateway_with(provider: Arc<EchoProvider>) -> ConversationGateway {
    ConversationGateway::new(
        Arc::new(SessionStore::default()),
        provider as Arc<dyn LlmProvider>,
    )
}

#[tokio::test]
async fn test_second_turn_sees_first_exchange() {
    let provider = Arc::new(EchoProvider::new());
    let gateway = gateway_with(Arc::clone(&provider));

    gateway
        .send(TurnRequest::new("first", Mode::Chat, "bn-BD"))
        .await
        .unwrap();
    let reply = gateway
        .send(TurnRequest::new("second", Mode::Chat, "bn-BD"))
        .await
        .unwrap();

    assert_eq!(reply.text, "echo: second");
    let call = provider.last_call();
    let contents: Vec<_> = call.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["first", "echo: first", "second"]);
}

#[tokio::test]
async fn test_languages_do_not_share_history() {
    let provider = Arc::new(EchoProvider::new());
    let gateway = gateway_with(Arc::clone(&provider));

    gateway
        .send(TurnRequest::new("hello", Mode::Chat, "bn-BD"))
        .await
        .unwrap();
    gateway
        .send(TurnRequest::new("hello", Mode::Chat, "bn-IN"))
        .await
        .unwrap();

    assert_eq!(provider.last_call().messages.len(), 1);
}

#[tokio::test]
async fn test_object_detection_turn_is_multimodal_and_stateless() {
    let provider = Arc::new(EchoProvider::new());
    let gateway = gateway_with(Arc::clone(&provider));
    let image = ImagePayload::new("image/png", vec![0x89, b'P', b'N', b'G']);

    for question in ["what is this?", "and now?"] {
        gateway
            .send(
                TurnRequest::new(question, Mode::ObjectDetection, "en-US").with_image(image.clone()),
            )
            .await
            .unwrap();
    }

    let call = provider.last_call();
    assert_eq!(call.messages.len(), 1);
    let image = call.messages[0].image.as_ref().unwrap();
    assert_eq!(image.mime_type, "image/png");
    assert_eq!(&image.data[..], &[0x89, b'P', b'N', b'G']);
}

#[tokio::test]
async fn test_failed_turn_is_not_recorded() {
    let provider = Arc::new(EchoProvider::new());
    let gateway = gateway_with(Arc::clone(&provider));

    provider.fail_with(ProviderError::network("connection refused"));
    let err = gateway
        .send(TurnRequest::new("lost", Mode::Chat, "en-US"))
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::Generation { .. }));
    assert_eq!(err.stage().as_str(), "generation");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_key_turns_serialize() {
    let provider = Arc::new(EchoProvider::new().with_delay(Duration::from_millis(50)));
    let gateway = Arc::new(gateway_with(Arc::clone(&provider)));

    let mut handles = Vec::new();
    for i in 0..4 {
        let gateway = Arc::clone(&gateway);
        handles.push(tokio::spawn(async move {
            gateway
                .send(TurnRequest::new(format!("turn {}", i), Mode::Chat, "en-US"))
                .await
                .unwrap()
                .session_id
        }));
    }

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap());
    }
    ids.dedup();

    assert_eq!(ids.len(), 1);
    assert_eq!(provider.max_in_flight(), 1);
    // Each turn saw every earlier exchange
    let lengths: Vec<_> = provider.calls().iter().map(|c| c.messages.len()).collect();
    assert_eq!(lengths, vec![1, 3, 5, 7]);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_different_keys_run_concurrently() {
    let provider = Arc::new(EchoProvider::new().with_delay(Duration::from_millis(200)));
    let gateway = Arc::new(gateway_with(Arc::clone(&provider)));

    let a = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            gateway
                .send(TurnRequest::new("a", Mode::Chat, "en-US"))
                .await
        })
    };
    let b = {
        let gateway = Arc::clone(&gateway);
        tokio::spawn(async move {
            gateway
                .send(TurnRequest::new("b", Mode::lesson("plants"), "en-US"))
                .await
        })
    };

    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();
    assert_eq!(provider.max_in_flight(), 2);
}
