use dashmap::DashMap;

use taskbot_core::ids::ChatId;
use taskbot_core::task::Category;

/// In-progress wizard state for one user. Fields entered so far ride along
/// in the variant, so stepping back never loses them. Absence from the
/// store means the user is idle; losing an entry is equivalent to
/// cancelling the wizard.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DialogueState {
    AwaitingCategory,
    AwaitingTitle { category: Category },
    AwaitingDescription { category: Category, title: String },
}

/// Keyed dialogue-state storage, injected into the controller so the
/// in-memory map can be swapped for a durable store without touching the
/// state machine.
pub trait SessionStore: Send + Sync {
    fn get(&self, chat: ChatId) -> Option<DialogueState>;
    fn put(&self, chat: ChatId, state: DialogueState);
    fn clear(&self, chat: ChatId);
}

#[derive(Default)]
pub struct InMemorySessionStore {
    states: DashMap<ChatId, DialogueState>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn get(&self, chat: ChatId) -> Option<DialogueState> {
        self.states.get(&chat).map(|entry| entry.value().clone())
    }

    fn put(&self, chat: ChatId, state: DialogueState) {
        self.states.insert(chat, state);
    }

    fn clear(&self, chat: ChatId) {
        self.states.remove(&chat);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_means_idle() {
        let store = InMemorySessionStore::new();
        assert_eq!(store.get(ChatId(1)), None);
    }

    #[test]
    fn put_then_get() {
        let store = InMemorySessionStore::new();
        store.put(ChatId(1), DialogueState::AwaitingCategory);
        assert_eq!(store.get(ChatId(1)), Some(DialogueState::AwaitingCategory));
    }

    #[test]
    fn states_are_per_user() {
        let store = InMemorySessionStore::new();
        store.put(ChatId(1), DialogueState::AwaitingCategory);
        store.put(
            ChatId(2),
            DialogueState::AwaitingTitle {
                category: Category::Testing,
            },
        );
        assert_eq!(store.get(ChatId(1)), Some(DialogueState::AwaitingCategory));
        assert_eq!(
            store.get(ChatId(2)),
            Some(DialogueState::AwaitingTitle {
                category: Category::Testing
            })
        );
    }

    #[test]
    fn clear_is_idempotent() {
        let store = InMemorySessionStore::new();
        store.put(ChatId(1), DialogueState::AwaitingCategory);
        store.clear(ChatId(1));
        store.clear(ChatId(1));
        assert_eq!(store.get(ChatId(1)), None);
    }

    #[test]
    fn entered_fields_survive_in_variants() {
        let store = InMemorySessionStore::new();
        store.put(
            ChatId(1),
            DialogueState::AwaitingDescription {
                category: Category::Development,
                title: "Fix bug".into(),
            },
        );
        match store.get(ChatId(1)).unwrap() {
            DialogueState::AwaitingDescription { category, title } => {
                assert_eq!(category, Category::Development);
                assert_eq!(title, "Fix bug");
            }
            other => panic!("unexpected state: {other:?}"),
        }
    }
}
