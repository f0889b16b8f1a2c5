use std::sync::Arc;

use diesel::prelude::*;
use uuid::Uuid;

use amora_shared::errors::{AppError, AppResult, ErrorCode};

use crate::events::publisher;
use crate::models::{Match, Message, NewMessage};
use crate::schema::{matches, messages};
use crate::AppState;

use super::frames::ServerFrame;

/// Persist one chat message and fan it out: durable write first, then a
/// best-effort live push to the counterpart, then the sender echo.
pub async fn send_chat(
    state: &Arc<AppState>,
    sender_id: Uuid,
    match_id: Uuid,
    content: &str,
) -> AppResult<Message> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::new(
            ErrorCode::MessageEmpty,
            "message content is empty",
        ));
    }

    let mut conn = state
        .db
        .get()
        .map_err(|e| AppError::internal(e.to_string()))?;

    let record: Match = matches::table
        .find(match_id)
        .first::<Match>(&mut conn)
        .optional()?
        .ok_or_else(|| AppError::new(ErrorCode::MatchNotFound, "match not found"))?;

    if !record.involves(sender_id) {
        return Err(AppError::new(
            ErrorCode::NotMatchParticipant,
            "you are not part of this match",
        ));
    }

    // Delivery of record: the row exists whether or not anyone is online,
    // and it is written before any live push goes out.
    let message: Message = diesel::insert_into(messages::table)
        .values(&NewMessage {
            match_id,
            sender_id,
            content: content.to_string(),
        })
        .get_result(&mut conn)?;

    publisher::publish_message_sent(&state.rabbitmq, &message).await;

    let recipient_id = record.counterpart_of(sender_id);
    let frame = ServerFrame::ChatMessage {
        message: message.clone(),
    };

    let delivered = state.registry.send_to(recipient_id, frame.clone());
    // The sender always gets the persisted copy back as the ack/echo.
    state.registry.send_to(sender_id, frame);

    tracing::debug!(
        message_id = %message.id,
        match_id = %match_id,
        recipient = %recipient_id,
        delivered_live = delivered,
        "chat message relayed"
    );

    Ok(message)
}
