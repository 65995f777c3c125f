use clb_core::{Button, ConnectorCapabilities, InboundMessage, OutboundMessage};
use clb_translator::{ChatlayerDecoder, ChatlayerEncoder, Decoder, Encoder};
use serde_json::{Value, json};

fn fixture(raw: &str) -> Value {
    serde_json::from_str(raw).expect("fixture json")
}

fn decoder() -> ChatlayerDecoder {
    ChatlayerDecoder::new("T", ConnectorCapabilities::full())
}

#[tokio::test]
async fn documented_quick_reply_example() {
    let payload = json!({
        "verifyToken": "T",
        "message": { "type": "text", "text": "hi", "quick_replies": ["Yes", "No"] }
    });
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(
        serde_json::to_value(&msg).unwrap(),
        json!({
            "messageText": "hi",
            "buttons": [
                { "text": "Yes", "payload": null },
                { "text": "No", "payload": null }
            ],
            "media": [],
            "cards": []
        })
    );
}

#[tokio::test]
async fn mismatched_verify_token_is_ignored_every_time() {
    let payload = json!({
        "verifyToken": "other",
        "message": { "type": "text", "text": "hi" }
    });
    let d = decoder();
    assert!(d.decode(&payload).await.is_none());
    assert!(d.decode(&payload).await.is_none());
}

#[tokio::test]
async fn event_messages_are_ignored() {
    let payload = json!({ "verifyToken": "T", "message": { "type": "event", "text": "typing" } });
    assert!(decoder().decode(&payload).await.is_none());
}

#[tokio::test]
async fn mixed_quick_replies_discriminate_text_and_payload() {
    let payload = fixture(include_str!("fixtures/quick_replies.json"));
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg.message_text, "Pick a size");
    assert_eq!(
        msg.buttons,
        vec![
            Button::new("Small", None),
            Button::new("Medium", Some(json!({ "nextDialogstateId": "ds-medium" }))),
            Button::new("Large", Some(json!("SIZE_LARGE"))),
        ]
    );
    assert!(msg.cards.is_empty());
    assert!(msg.media.is_empty());
    assert!(msg.nlp.is_none());
}

#[tokio::test]
async fn generic_template_produces_one_card_per_element() {
    let payload = fixture(include_str!("fixtures/generic_template.json"));
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg.message_text, "");
    assert_eq!(msg.cards.len(), 2);

    let first = &msg.cards[0];
    assert_eq!(first.text, "Margherita");
    assert_eq!(first.content, "Tomato, mozzarella");
    assert_eq!(first.media.len(), 1);
    assert_eq!(first.media[0].mime_type, "image/jpeg");
    assert_eq!(
        first.buttons,
        vec![Button::new(
            "Order",
            Some(json!({ "nextDialogstateId": "order", "parameters": { "pizza": "margherita" } }))
        )]
    );

    let second = &msg.cards[1];
    assert_eq!(second.media.len(), 1);
    assert_eq!(second.media[0].mime_type, "image/png");
    assert_eq!(
        second.buttons,
        vec![
            Button::new("Menu", Some(json!("https://example.com/menu"))),
            Button::new("Later", None),
        ]
    );
}

#[tokio::test]
async fn button_template_overwrites_text_and_appends_buttons() {
    let payload = fixture(include_str!("fixtures/button_template.json"));
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg.message_text, "What would you like to do?");
    assert_eq!(
        msg.buttons,
        vec![
            Button::new("Track order", Some(json!("TRACK"))),
            Button::new("Talk to us", Some(json!({ "nextDialogstateId": "agent" }))),
        ]
    );
}

#[tokio::test]
#[tracing_test::traced_test]
async fn unsupported_template_is_logged_and_dropped() {
    let payload = json!({
        "verifyToken": "T",
        "message": {
            "text": "receipt",
            "attachment": { "type": "template", "payload": { "template_type": "receipt" } }
        }
    });
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg.message_text, "receipt");
    assert!(msg.cards.is_empty() && msg.buttons.is_empty() && msg.media.is_empty());
    assert!(logs_contain("the template type is not supported yet"));
}

#[tokio::test]
#[tracing_test::traced_test]
async fn unsupported_attachment_is_logged_and_dropped() {
    let payload = json!({
        "verifyToken": "T",
        "message": {
            "attachment": { "type": "audio", "payload": { "url": "https://x.test/a.mp3" } }
        }
    });
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg, InboundMessage::default());
    assert!(logs_contain("the attachment type is not supported yet"));
}

#[tokio::test]
async fn image_attachment_without_extension_uses_unknown_mime() {
    let payload = json!({
        "verifyToken": "T",
        "message": {
            "attachment": { "type": "image", "payload": { "url": "https://x.test/render?id=5" } }
        }
    });
    let msg = decoder().decode(&payload).await.expect("message");
    assert_eq!(msg.media.len(), 1);
    assert_eq!(msg.media[0].media_uri, "https://x.test/render?id=5");
    assert_eq!(msg.media[0].mime_type, "application/unknown");
}

#[tokio::test]
async fn inline_intent_without_enrichment() {
    let payload = fixture(include_str!("fixtures/nlp_text.json"));
    let msg = decoder().decode(&payload).await.expect("message");
    let nlp = msg.nlp.expect("nlp");
    assert_eq!(nlp.intent.name, "order_pizza");
    assert_eq!(nlp.intent.confidence, Some(0.87));
    assert!(nlp.intent.intents.is_empty());
    assert!(nlp.entities.is_empty());
}

#[tokio::test]
async fn intro_then_reply_roundtrip_is_unaffected_by_session_data() {
    let encoder = ChatlayerEncoder::new(Some(json!({ "segment": "beta" })));
    let body = serde_json::to_value(encoder.encode("conv-42", &OutboundMessage::intro())).unwrap();
    assert_eq!(body["message"], json!({ "introMessage": {} }));

    let reply = json!({
        "verifyToken": "T",
        "senderId": "conv-42",
        "message": { "type": "text", "text": "Welcome!" }
    });
    let first = decoder().decode(&reply).await.expect("message");
    let second = decoder().decode(&reply).await.expect("message");
    assert_eq!(first, second);
    assert_eq!(first.message_text, "Welcome!");
    assert!(first.buttons.is_empty() && first.cards.is_empty() && first.media.is_empty());
}
