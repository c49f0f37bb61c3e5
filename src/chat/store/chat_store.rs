//! Conversation store: the single owner of chat state.
//!
//! All state sits behind one async mutex. Every mutation and the persist that
//! follows it happen under that lock, so saved snapshots are written in the
//! same order the mutations were applied.
//!
//! Inference runs in spawned tasks outside the lock. When a task finishes it
//! re-enters the store and looks its conversation up by id; if the
//! conversation was deleted in the meantime the result is dropped.

use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{Mutex, broadcast};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, warn};

use crate::chat::core::config::{ChatConfig, DEFAULT_SYSTEM_PROMPT, DEFAULT_TITLE_INSTRUCTIONS};
use crate::chat::core::conversation::Conversation;
use crate::chat::core::ids::{ConversationId, MessageId};
use crate::chat::core::message::Message;
use crate::chat::inference::gateway::InferenceGateway;
use crate::chat::storage::persistence::ConversationPersistence;
use crate::chat::store::events::StoreEvent;
use crate::chat::store::text::{error_reply, fallback_title, strip_code_fences, title_prompt};

/// Description used in the error reply when the gateway panics.
const PANICKED_REPLY: &str = "the model backend crashed";

/// Capacity of the event channel; slow subscribers lag rather than block.
const EVENT_CAPACITY: usize = 256;

/// Behavioural settings of the store.
#[derive(Clone, Debug)]
pub struct StoreSettings {
    /// Instructions sent with title requests.
    pub title_instructions: String,
    /// Characters kept by the local fallback title.
    pub fallback_title_chars: usize,
    /// System prompt used when none has been saved.
    pub default_system_prompt: String,
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            title_instructions: DEFAULT_TITLE_INSTRUCTIONS.to_string(),
            fallback_title_chars: 50,
            default_system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl StoreSettings {
    /// Settings taken from the application config.
    #[must_use]
    pub fn from_config(config: &ChatConfig) -> Self {
        Self {
            title_instructions: config.title.instructions.clone(),
            fallback_title_chars: config.title.fallback_max_chars,
            default_system_prompt: config.default_system_prompt.clone(),
        }
    }
}

#[derive(Debug)]
struct StoreState {
    conversations: Vec<Conversation>,
    selected: Option<ConversationId>,
    pending: HashMap<ConversationId, usize>,
    system_prompt: String,
}

impl StoreState {
    fn find(&self, id: ConversationId) -> Option<&Conversation> {
        self.conversations.iter().find(|c| c.id == id)
    }

    fn find_mut(&mut self, id: ConversationId) -> Option<&mut Conversation> {
        self.conversations.iter_mut().find(|c| c.id == id)
    }

    fn is_loading(&self) -> bool {
        self.selected
            .is_some_and(|id| self.pending.get(&id).is_some_and(|count| *count > 0))
    }
}

struct StoreShared {
    state: Mutex<StoreState>,
    persistence: ConversationPersistence,
    gateway: Arc<dyn InferenceGateway>,
    settings: StoreSettings,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    events: broadcast::Sender<StoreEvent>,
}

/// Handle to the conversation store. Clones share the same state.
#[derive(Clone)]
pub struct ChatStore {
    shared: Arc<StoreShared>,
}

impl ChatStore {
    /// Load saved state and build the store.
    ///
    /// An empty saved list gets one fresh conversation; otherwise the first
    /// conversation is selected.
    pub async fn open(
        persistence: ConversationPersistence,
        gateway: Arc<dyn InferenceGateway>,
        settings: StoreSettings,
    ) -> Self {
        let conversations = persistence.load().await;
        let system_prompt = persistence
            .load_system_prompt()
            .await
            .unwrap_or_else(|| settings.default_system_prompt.clone());
        let selected = conversations.first().map(|c| c.id);
        let loaded = conversations.len();

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let store = Self {
            shared: Arc::new(StoreShared {
                state: Mutex::new(StoreState {
                    conversations,
                    selected,
                    pending: HashMap::new(),
                    system_prompt,
                }),
                persistence,
                gateway,
                settings,
                tasks: Mutex::new(Vec::new()),
                events,
            }),
        };

        if selected.is_none() {
            store.create().await;
        }

        info!(conversations = loaded, "Chat store opened");
        store
    }

    /// Subscribe to change notifications.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.shared.events.subscribe()
    }

    /// Create an empty conversation, put it first and select it.
    pub async fn create(&self) -> ConversationId {
        let mut state = self.shared.state.lock().await;
        let was_loading = state.is_loading();

        let conversation = Conversation::new();
        let id = conversation.id;
        state.conversations.insert(0, conversation);
        state.selected = Some(id);
        self.persist(&state).await;

        self.emit(StoreEvent::ConversationCreated(id));
        self.emit(StoreEvent::SelectionChanged(Some(id)));
        self.emit_loading(was_loading, state.is_loading());
        debug!(%id, "Created conversation");
        id
    }

    /// Select a conversation. Returns `false` if the id is unknown.
    pub async fn select(&self, id: ConversationId) -> bool {
        let mut state = self.shared.state.lock().await;
        if state.find(id).is_none() {
            debug!(%id, "Select ignored, unknown conversation");
            return false;
        }

        let was_loading = state.is_loading();
        state.selected = Some(id);
        self.emit(StoreEvent::SelectionChanged(Some(id)));
        self.emit_loading(was_loading, state.is_loading());
        true
    }

    /// Delete a conversation. Returns `false` if the id is unknown.
    ///
    /// Deleting the selected conversation selects the new first one, or
    /// nothing when the list is now empty. No replacement is created.
    pub async fn delete(&self, id: ConversationId) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(index) = state.conversations.iter().position(|c| c.id == id) else {
            debug!(%id, "Delete ignored, unknown conversation");
            return false;
        };

        let was_loading = state.is_loading();
        state.conversations.remove(index);
        let reselect = state.selected == Some(id);
        if reselect {
            state.selected = state.conversations.first().map(|c| c.id);
        }
        self.persist(&state).await;

        self.emit(StoreEvent::ConversationDeleted(id));
        if reselect {
            self.emit(StoreEvent::SelectionChanged(state.selected));
        }
        self.emit_loading(was_loading, state.is_loading());
        debug!(%id, "Deleted conversation");
        true
    }

    /// Empty the selected conversation and restore its default title.
    ///
    /// Returns `false` when nothing is selected.
    pub async fn clear(&self) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(id) = state.selected else {
            return false;
        };
        let Some(conversation) = state.find_mut(id) else {
            return false;
        };

        conversation.reset();
        let title = conversation.title.clone();
        self.persist(&state).await;

        self.emit(StoreEvent::ConversationCleared(id));
        self.emit(StoreEvent::TitleUpdated {
            conversation_id: id,
            title,
        });
        debug!(%id, "Cleared conversation");
        true
    }

    /// Send user text to the selected conversation.
    ///
    /// The trimmed text is appended and saved right away. A reply is then
    /// requested in the background, plus a title when this is the first
    /// message. Returns the id of the user message, or `None` when the text
    /// is blank or nothing is selected.
    pub async fn send(&self, text: &str) -> Option<MessageId> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        let mut state = self.shared.state.lock().await;
        let conversation_id = state.selected?;
        let conversation = state.find_mut(conversation_id)?;

        let message = Message::user(text);
        let message_id = message.id;
        conversation.messages.push(message);
        let is_first = conversation.messages.len() == 1;
        self.persist(&state).await;

        self.emit(StoreEvent::MessageAppended {
            conversation_id,
            message_id,
            is_user: true,
        });

        if is_first {
            let handle = self.spawn_title(conversation_id, text.to_string());
            self.track(handle).await;
        }
        self.start_completion(&mut state, conversation_id, text.to_string())
            .await;

        debug!(%conversation_id, %message_id, "Sent message");
        Some(message_id)
    }

    /// Edit a message of the selected conversation and regenerate the reply.
    ///
    /// The message keeps its id and position, takes `new_content` as given
    /// and is marked edited; every later message is dropped. A new reply is
    /// then requested for the trimmed text, unless that is blank. Returns
    /// `false` if the message is not in the selected conversation.
    pub async fn edit(&self, message_id: MessageId, new_content: &str) -> bool {
        let mut state = self.shared.state.lock().await;
        let Some(conversation_id) = state.selected else {
            return false;
        };
        let Some(conversation) = state.find_mut(conversation_id) else {
            return false;
        };
        let Some(index) = conversation.position_of(message_id) else {
            debug!(%message_id, "Edit ignored, unknown message");
            return false;
        };

        if let Some(message) = conversation.messages.get_mut(index) {
            message.apply_edit(new_content);
        }
        conversation.truncate_after(index);
        self.persist(&state).await;

        self.emit(StoreEvent::MessageEdited {
            conversation_id,
            message_id,
        });

        let text = new_content.trim();
        if text.is_empty() {
            debug!(%conversation_id, %message_id, "Edited to blank text, no reply requested");
        } else {
            self.start_completion(&mut state, conversation_id, text.to_string())
                .await;
        }

        debug!(%conversation_id, %message_id, "Edited message");
        true
    }

    /// Replace the system prompt and save it.
    pub async fn update_system_prompt(&self, prompt: &str) {
        let mut state = self.shared.state.lock().await;
        state.system_prompt = prompt.to_string();
        self.shared.persistence.save_system_prompt(prompt).await;
        self.emit(StoreEvent::SystemPromptChanged);
    }

    /// Restore the default system prompt and forget the saved one.
    pub async fn reset_system_prompt(&self) {
        let mut state = self.shared.state.lock().await;
        state
            .system_prompt
            .clone_from(&self.shared.settings.default_system_prompt);
        self.shared.persistence.clear_system_prompt().await;
        self.emit(StoreEvent::SystemPromptChanged);
    }

    /// Snapshot of all conversations, newest first.
    pub async fn conversations(&self) -> Vec<Conversation> {
        self.shared.state.lock().await.conversations.clone()
    }

    /// Snapshot of one conversation.
    pub async fn conversation(&self, id: ConversationId) -> Option<Conversation> {
        self.shared.state.lock().await.find(id).cloned()
    }

    /// Id of the selected conversation.
    pub async fn selected_id(&self) -> Option<ConversationId> {
        self.shared.state.lock().await.selected
    }

    /// Snapshot of the selected conversation.
    pub async fn selected_conversation(&self) -> Option<Conversation> {
        let state = self.shared.state.lock().await;
        state.selected.and_then(|id| state.find(id).cloned())
    }

    /// Whether a reply is outstanding for the selected conversation.
    pub async fn is_loading(&self) -> bool {
        self.shared.state.lock().await.is_loading()
    }

    /// Current system prompt.
    pub async fn system_prompt(&self) -> String {
        self.shared.state.lock().await.system_prompt.clone()
    }

    /// Wait until every title and reply request has landed.
    pub async fn wait_idle(&self) {
        loop {
            let handles = std::mem::take(&mut *self.shared.tasks.lock().await);
            if handles.is_empty() {
                break;
            }
            report_abnormal_exits(futures::future::join_all(handles).await);
        }
    }

    async fn persist(&self, state: &StoreState) {
        self.shared.persistence.save(&state.conversations).await;
    }

    fn emit(&self, event: StoreEvent) {
        // No subscribers is not an error.
        let _ = self.shared.events.send(event);
    }

    fn emit_loading(&self, before: bool, after: bool) {
        if before != after {
            self.emit(StoreEvent::LoadingChanged(after));
        }
    }

    async fn track(&self, handle: JoinHandle<()>) {
        let finished = {
            let mut tasks = self.shared.tasks.lock().await;
            let (finished, running): (Vec<_>, Vec<_>) = std::mem::take(&mut *tasks)
                .into_iter()
                .partition(JoinHandle::is_finished);
            *tasks = running;
            tasks.push(handle);
            finished
        };
        // Already finished, so joining only collects their outcome.
        report_abnormal_exits(futures::future::join_all(finished).await);
    }

    fn spawn_title(&self, conversation_id: ConversationId, text: String) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let settings = &store.shared.settings;
            let result = store
                .shared
                .gateway
                .respond(&settings.title_instructions, &title_prompt(&text))
                .await;

            let title = match result {
                Ok(reply) if !reply.trim().is_empty() => reply.trim().to_string(),
                Ok(_) => {
                    debug!(%conversation_id, "Blank title from model, using fallback");
                    fallback_title(&text, settings.fallback_title_chars)
                }
                Err(err) => {
                    debug!(%conversation_id, %err, "Title generation failed, using fallback");
                    fallback_title(&text, settings.fallback_title_chars)
                }
            };

            store.apply_title(conversation_id, title).await;
        })
    }

    async fn apply_title(&self, conversation_id: ConversationId, title: String) {
        let mut state = self.shared.state.lock().await;
        let Some(conversation) = state.find_mut(conversation_id) else {
            debug!(%conversation_id, "Conversation gone, dropping title");
            return;
        };

        conversation.title.clone_from(&title);
        self.persist(&state).await;
        self.emit(StoreEvent::TitleUpdated {
            conversation_id,
            title,
        });
    }

    async fn start_completion(
        &self,
        state: &mut StoreState,
        conversation_id: ConversationId,
        text: String,
    ) {
        let was_loading = state.is_loading();
        *state.pending.entry(conversation_id).or_insert(0) += 1;
        self.emit_loading(was_loading, state.is_loading());

        let instructions = state.system_prompt.clone();
        let store = self.clone();
        let handle = tokio::spawn(async move {
            // The in-flight counter must come back down even if the gateway panics.
            let outcome = AssertUnwindSafe(async {
                store.shared.gateway.respond(&instructions, &text).await
            })
            .catch_unwind()
            .await;

            let content = match outcome {
                Ok(Ok(reply)) => strip_code_fences(&reply),
                Ok(Err(err)) => {
                    warn!(%conversation_id, %err, "Completion failed");
                    error_reply(&err.to_string())
                }
                Err(_) => {
                    warn!(%conversation_id, "Completion panicked");
                    error_reply(PANICKED_REPLY)
                }
            };
            store.finish_completion(conversation_id, content).await;
        });
        self.track(handle).await;
    }

    async fn finish_completion(&self, conversation_id: ConversationId, content: String) {
        let mut state = self.shared.state.lock().await;
        let was_loading = state.is_loading();

        if let Some(count) = state.pending.get_mut(&conversation_id) {
            *count = count.saturating_sub(1);
        }
        state.pending.retain(|_, count| *count > 0);

        let appended = state.find_mut(conversation_id).map(|conversation| {
            let message = Message::assistant(content);
            let message_id = message.id;
            conversation.messages.push(message);
            message_id
        });

        match appended {
            Some(message_id) => {
                self.persist(&state).await;
                self.emit(StoreEvent::MessageAppended {
                    conversation_id,
                    message_id,
                    is_user: false,
                });
            }
            None => debug!(%conversation_id, "Conversation gone, dropping reply"),
        }

        self.emit_loading(was_loading, state.is_loading());
    }
}

fn report_abnormal_exits(results: Vec<Result<(), JoinError>>) {
    for err in results.into_iter().filter_map(Result::err) {
        if err.is_panic() {
            warn!(%err, "Inference task panicked");
        } else {
            warn!(%err, "Inference task ended abnormally");
        }
    }
}
