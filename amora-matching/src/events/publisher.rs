use amora_shared::clients::rabbitmq::RabbitMQClient;
use amora_shared::types::event::{payloads, routing_keys, Event};

use crate::models::{Match, Message};

pub async fn publish_match_created(rabbitmq: &RabbitMQClient, record: &Match) {
    let event = Event::new(
        "amora-matching",
        routing_keys::MATCHING_MATCH_CREATED,
        payloads::MatchCreated {
            match_id: record.id,
            user1_id: record.user1_id,
            user2_id: record.user2_id,
        },
    )
    .with_user(record.user1_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MATCHING_MATCH_CREATED, &event)
        .await
    {
        tracing::error!(error = %e, "failed to publish match.created event");
    }
}

pub async fn publish_message_sent(rabbitmq: &RabbitMQClient, message: &Message) {
    // Preview truncated so downstream consumers never carry full bodies.
    let content_preview = message.content.chars().take(100).collect::<String>();

    let event = Event::new(
        "amora-matching",
        routing_keys::MESSAGING_MESSAGE_SENT,
        payloads::MessageSent {
            message_id: message.id,
            match_id: message.match_id,
            sender_id: message.sender_id,
            content_preview,
        },
    )
    .with_user(message.sender_id);

    if let Err(e) = rabbitmq
        .publish(routing_keys::MESSAGING_MESSAGE_SENT, &event)
        .await
    {
        tracing::error!(error = %e, "failed to publish message.sent event");
    }
}
