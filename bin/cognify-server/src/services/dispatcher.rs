//! Group-chat persona dispatch.
//!
//! A user message that `@mentions` personas gets one reply per persona, in
//! catalogue order, generated one after another.  Every reply is stored as a
//! room message; clients pick them up by polling.

use std::sync::Arc;

use cognify_llm::{ChatMessage, Persona, Tutor, persona};
use tracing::{Instrument, info, info_span, warn};

use crate::entities::{NewRoomMessage, RoomMessage, RoomStore, SqliteStore};
use crate::state::AppState;

/// Placeholder stored when a persona cannot answer.
pub fn unavailable(persona: &Persona) -> String {
    format!("{} is unavailable right now.", persona.name)
}

/// Room history as seen by `persona`: its own replies are the assistant
/// turns, everything else is a named user turn.
fn history_for(persona: &Persona, messages: &[RoomMessage]) -> Vec<ChatMessage> {
    messages
        .iter()
        .map(|m| {
            if m.persona.as_deref() == Some(persona.id) {
                ChatMessage::assistant(m.content.clone())
            } else {
                ChatMessage::user(format!("{}: {}", m.sender_name, m.content))
            }
        })
        .collect()
}

fn system_prompt(persona: &Persona) -> String {
    format!(
        "{}\nYou are in a group chat room. Each user message starts with the sender's name. \
         Reply only as {}.",
        persona.system_prompt, persona.name
    )
}

/// Generate and store a reply for every persona mentioned in `trigger`.
pub async fn dispatch(
    store: &SqliteStore,
    tutor: &Tutor,
    trigger: &RoomMessage,
    context_len: usize,
) -> Vec<RoomMessage> {
    let personas = persona::mentioned(&trigger.content);
    let mut posted: Vec<RoomMessage> = Vec::with_capacity(personas.len());

    // Context ends at the trigger; later room traffic is not part of this turn.
    let earlier = store
        .recent_room_messages(trigger.room_id, trigger.id, context_len as i64)
        .await
        .unwrap_or_else(|e| {
            warn!(error = %e, "failed to load room context; replying without it");
            vec![trigger.clone()]
        });

    for persona in personas {
        let context: Vec<RoomMessage> = earlier.iter().chain(&posted).cloned().collect();
        let skip = context.len().saturating_sub(context_len);
        let history = history_for(persona, &context[skip..]);

        let content = match tutor
            .chat_stream(&history, Some(&system_prompt(persona)), &mut |_: &str| {})
            .await
        {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => {
                warn!(persona = persona.id, "persona produced an empty reply");
                unavailable(persona)
            }
            Err(e) => {
                warn!(persona = persona.id, error = %e, "persona generation failed");
                unavailable(persona)
            }
        };

        let reply = NewRoomMessage {
            room_id: trigger.room_id,
            user_id: None,
            sender_name: persona.name.to_owned(),
            role: "assistant".into(),
            content,
            persona: Some(persona.id.to_owned()),
        };
        match store.post_room_message(reply).await {
            Ok(message) => {
                info!(persona = persona.id, message_id = message.id, "persona replied");
                posted.push(message);
            }
            Err(e) => warn!(persona = persona.id, error = %e, "failed to store persona reply"),
        }
    }
    posted
}

/// Run [`dispatch`] in the background when `trigger` mentions any persona.
pub fn spawn_dispatch(state: Arc<AppState>, trigger: RoomMessage) {
    if persona::mentioned(&trigger.content).is_empty() {
        return;
    }
    let span = info_span!("persona_dispatch", room_id = trigger.room_id, message_id = trigger.id);
    tokio::spawn(
        async move {
            let replies = dispatch(&state.store, &state.tutor, &trigger, state.config.room_context).await;
            info!(replies = replies.len(), "persona dispatch finished");
        }
        .instrument(span),
    );
}
