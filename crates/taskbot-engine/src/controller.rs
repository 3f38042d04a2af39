use std::collections::HashSet;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{error, info, instrument, warn};

use taskbot_core::events::{CallbackAction, Event, EventPayload, Keyboard};
use taskbot_core::ids::ChatId;
use taskbot_core::task::Category;
use taskbot_core::transport::ChatTransport;
use taskbot_store::{Database, SettingsRepo, TaskRepo, UserRepo};

use crate::error::EngineError;
use crate::export::ExportCoordinator;
use crate::matcher;
use crate::menu;
use crate::session::{DialogueState, SessionStore};

/// The dialogue state machine. Consumes inbound events, drives the
/// creation wizard and the menu actions, and emits outbound messages
/// through the transport.
pub struct ConversationController {
    users: UserRepo,
    tasks: TaskRepo,
    settings: SettingsRepo,
    sessions: Arc<dyn SessionStore>,
    transport: Arc<dyn ChatTransport>,
    exports: ExportCoordinator,
    admins: HashSet<ChatId>,
    /// One lock per user: a user's events run strictly in turn, users
    /// don't block each other.
    user_locks: DashMap<ChatId, Arc<Mutex<()>>>,
}

impl ConversationController {
    pub fn new(
        db: Database,
        sessions: Arc<dyn SessionStore>,
        transport: Arc<dyn ChatTransport>,
        exports: ExportCoordinator,
        admins: HashSet<ChatId>,
    ) -> Self {
        Self {
            users: UserRepo::new(db.clone()),
            tasks: TaskRepo::new(db.clone()),
            settings: SettingsRepo::new(db),
            sessions,
            transport,
            exports,
            admins,
            user_locks: DashMap::new(),
        }
    }

    fn is_admin(&self, chat: ChatId) -> bool {
        self.admins.contains(&chat)
    }

    fn main_menu(&self, chat: ChatId) -> Keyboard {
        menu::main_menu(self.is_admin(chat))
    }

    /// Entry point for every inbound event.
    #[instrument(skip(self, event), fields(chat_id = %event.chat))]
    pub async fn handle_event(&self, event: Event) {
        let lock = self
            .user_locks
            .entry(event.chat)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let Event {
            chat,
            sender,
            payload,
        } = event;

        let result = match payload {
            EventPayload::Text(text) => self.handle_text(chat, sender.as_deref(), &text).await,
            EventPayload::Button {
                callback_id,
                message_id,
                token,
            } => {
                let outcome = self.handle_button(chat, message_id, &token).await;
                // Ack regardless of the outcome so the client's spinner stops.
                if let Err(e) = self.transport.ack(&callback_id).await {
                    warn!(error = %e, "failed to ack callback");
                }
                outcome
            }
        };

        if let Err(e) = result {
            error!(error = %e, "event handler failed");
            // Don't leave a wizard stuck mid-phase behind a failure.
            self.sessions.clear(chat);
            let _ = self
                .transport
                .send(
                    chat,
                    "Что-то пошло не так. Попробуйте позже.",
                    Some(self.main_menu(chat)),
                )
                .await;
        }
    }

    async fn handle_text(
        &self,
        chat: ChatId,
        sender: Option<&str>,
        text: &str,
    ) -> Result<(), EngineError> {
        let text = text.trim();

        if let Some(state) = self.sessions.get(chat) {
            return self.advance_wizard(chat, state, text).await;
        }

        match text {
            "/start" => self.cmd_start(chat, sender).await,
            menu::ADD_TASK => self.start_wizard(chat).await,
            menu::MY_TASKS => self.list_tasks(chat).await,
            menu::STATS => self.stats(chat).await,
            menu::SEARCH => self.prompt_search(chat).await,
            menu::EXPORT => self.trigger_export(chat).await,
            menu::ADMIN => self.admin_menu(chat).await,
            menu::EXPORT_OFF => self.toggle_export(chat, false).await,
            menu::EXPORT_ON => self.toggle_export(chat, true).await,
            menu::BACK => self.send_with_menu(chat, "Главное меню.").await,
            query => self.search(chat, query).await,
        }
    }

    async fn cmd_start(&self, chat: ChatId, sender: Option<&str>) -> Result<(), EngineError> {
        self.users.ensure(chat, sender.unwrap_or(""))?;
        self.sessions.clear(chat);
        self.send_with_menu(chat, "Привет! Выберите действие:").await
    }

    // ----- creation wizard -----

    async fn start_wizard(&self, chat: ChatId) -> Result<(), EngineError> {
        self.sessions.put(chat, DialogueState::AwaitingCategory);
        self.transport
            .send(chat, "Выберите категорию:", Some(menu::categories_keyboard()))
            .await?;
        Ok(())
    }

    async fn advance_wizard(
        &self,
        chat: ChatId,
        state: DialogueState,
        text: &str,
    ) -> Result<(), EngineError> {
        match state {
            DialogueState::AwaitingCategory => {
                if menu::is_back(text) {
                    self.sessions.clear(chat);
                    return self.send_with_menu(chat, "Возврат в главное меню.").await;
                }
                match Category::from_label(text) {
                    Some(category) => {
                        self.sessions
                            .put(chat, DialogueState::AwaitingTitle { category });
                        self.prompt_title(chat).await
                    }
                    None => {
                        self.transport
                            .send(chat, "Неизвестная категория. Выберите из списка.", None)
                            .await?;
                        Ok(())
                    }
                }
            }

            DialogueState::AwaitingTitle { category } => {
                if menu::is_back(text) {
                    // Back restarts the wizard from category selection.
                    return self.start_wizard(chat).await;
                }
                if text.is_empty() {
                    self.transport
                        .send(chat, "Название не может быть пустым. Введите название задачи:", None)
                        .await?;
                    return Ok(());
                }
                self.sessions.put(
                    chat,
                    DialogueState::AwaitingDescription {
                        category,
                        title: text.to_string(),
                    },
                );
                self.transport
                    .send(
                        chat,
                        "Введите описание (можно оставить пустым):",
                        Some(menu::skip_description_keyboard()),
                    )
                    .await?;
                Ok(())
            }

            DialogueState::AwaitingDescription { category, title } => {
                if menu::is_back(text) {
                    // Back to title entry; the chosen category is retained.
                    self.sessions
                        .put(chat, DialogueState::AwaitingTitle { category });
                    return self.prompt_title(chat).await;
                }
                self.commit_task(chat, category, title, text).await
            }
        }
    }

    async fn prompt_title(&self, chat: ChatId) -> Result<(), EngineError> {
        self.transport
            .send(chat, "Введите название задачи:", Some(menu::back_keyboard()))
            .await?;
        Ok(())
    }

    /// Single commit path shared by the text trigger and the skip button.
    /// Dialogue state is cleared exactly once on both outcomes.
    async fn commit_task(
        &self,
        chat: ChatId,
        category: Category,
        title: String,
        description: &str,
    ) -> Result<(), EngineError> {
        let created = self.tasks.create(chat, &title, category, description);
        self.sessions.clear(chat);

        match created {
            Ok(task) => {
                info!(task_id = %task.id, "task created");
                self.send_with_menu(
                    chat,
                    &format!(
                        "Задача '{}' добавлена в категорию '{}'.",
                        task.title,
                        task.category.label()
                    ),
                )
                .await
            }
            Err(e) => {
                error!(error = %e, "failed to create task");
                self.send_with_menu(chat, "Ошибка при добавлении задачи. Попробуйте ещё раз.")
                    .await
            }
        }
    }

    // ----- inline buttons -----

    async fn handle_button(
        &self,
        chat: ChatId,
        message_id: i64,
        token: &str,
    ) -> Result<(), EngineError> {
        let action = match CallbackAction::parse(token) {
            Ok(action) => action,
            Err(e) => {
                warn!(error = %e, "unparseable callback token");
                self.transport
                    .edit(chat, message_id, "Ошибка при обработке операции с задачей.")
                    .await?;
                return Ok(());
            }
        };

        match action {
            CallbackAction::SkipDescription => {
                // Valid only while the wizard waits for a description; a
                // stale or double-tapped button finds idle state and is
                // dropped without a second commit.
                match self.sessions.get(chat) {
                    Some(DialogueState::AwaitingDescription { category, title }) => {
                        self.commit_task(chat, category, title, "").await
                    }
                    _ => Ok(()),
                }
            }

            CallbackAction::Close(id) => {
                match self.tasks.close(id, chat) {
                    Ok(()) => {
                        self.transport
                            .edit(chat, message_id, &format!("✅ Задача #{id} закрыта."))
                            .await?;
                    }
                    Err(e) => {
                        error!(error = %e, task_id = %id, "close failed");
                        self.transport
                            .edit(chat, message_id, "Ошибка при обработке операции с задачей.")
                            .await?;
                    }
                }
                Ok(())
            }

            CallbackAction::Delete(id) => {
                match self.tasks.delete(id, chat) {
                    Ok(()) => {
                        self.transport
                            .edit(chat, message_id, &format!("🗑️ Задача #{id} удалена."))
                            .await?;
                    }
                    Err(e) => {
                        error!(error = %e, task_id = %id, "delete failed");
                        self.transport
                            .edit(chat, message_id, "Ошибка при обработке операции с задачей.")
                            .await?;
                    }
                }
                Ok(())
            }
        }
    }

    // ----- menu actions -----

    async fn list_tasks(&self, chat: ChatId) -> Result<(), EngineError> {
        let rows = self.tasks.list(chat)?;
        if rows.is_empty() {
            return self.send_with_menu(chat, "У вас пока нет задач.").await;
        }
        for task in &rows {
            self.transport
                .send(chat, &menu::task_card(task), Some(menu::task_actions(task)))
                .await?;
        }
        Ok(())
    }

    async fn stats(&self, chat: ChatId) -> Result<(), EngineError> {
        let rows = self.tasks.stats_by_category(chat)?;
        if rows.is_empty() {
            return self.send_with_menu(chat, "Нет задач для статистики.").await;
        }
        let mut text = String::from("Статистика по категориям:\n");
        for (category, count) in rows {
            text.push_str(&format!("{}: {count}\n", category.label()));
        }
        self.send_with_menu(chat, &text).await
    }

    async fn prompt_search(&self, chat: ChatId) -> Result<(), EngineError> {
        self.transport
            .send(chat, "Введите текст для поиска:", Some(Keyboard::Remove))
            .await?;
        Ok(())
    }

    /// Free-text fallback: exact title match wins outright, otherwise
    /// fuzzy candidates above the cutoff.
    async fn search(&self, chat: ChatId, query: &str) -> Result<(), EngineError> {
        if query.is_empty() {
            return Ok(());
        }
        let tasks = self.tasks.all(chat)?;

        let query_lower = query.to_lowercase();
        if let Some(task) = tasks.iter().find(|t| t.title.to_lowercase() == query_lower) {
            return self
                .send_with_menu(
                    chat,
                    &format!("Найдена задача: #{} — {}\n{}", task.id, task.title, task.description),
                )
                .await;
        }

        let matches =
            matcher::find_similar(query, &tasks, matcher::SEARCH_LIMIT, matcher::SEARCH_CUTOFF);
        if matches.is_empty() {
            return self.send_with_menu(chat, "Ничего не найдено.").await;
        }

        let mut text = String::from("Похожие варианты:\n");
        for (task, score) in matches {
            text.push_str(&format!("#{} — {} (score {score})\n", task.id, task.title));
        }
        self.send_with_menu(chat, &text).await
    }

    // ----- admin -----

    async fn admin_menu(&self, chat: ChatId) -> Result<(), EngineError> {
        if !self.is_admin(chat) {
            self.transport
                .send(chat, "Только админ может видеть это меню.", None)
                .await?;
            return Ok(());
        }
        self.transport
            .send(chat, "Меню администратора:", Some(menu::admin_keyboard()))
            .await?;
        Ok(())
    }

    async fn toggle_export(&self, chat: ChatId, enabled: bool) -> Result<(), EngineError> {
        if !self.is_admin(chat) {
            self.transport
                .send(chat, "Только админ может менять эту настройку.", None)
                .await?;
            return Ok(());
        }
        self.settings.set_export_enabled(enabled)?;
        let text = if enabled {
            "Экспорт включён для всех пользователей."
        } else {
            "Экспорт отключён для всех пользователей."
        };
        self.send_with_menu(chat, text).await
    }

    // ----- export -----

    async fn trigger_export(&self, chat: ChatId) -> Result<(), EngineError> {
        if !self.settings.export_enabled()? {
            return self.send_with_menu(chat, "Экспорт отключён администратором.").await;
        }

        let tasks = self.tasks.all(chat)?;
        if tasks.is_empty() {
            return self.send_with_menu(chat, "Нет задач для экспорта.").await;
        }

        // Acknowledge first; the job reports its own outcome later.
        self.send_with_menu(
            chat,
            "Экспорт задач запущен в фоне. Я пришлю ссылку, когда всё будет готово.",
        )
        .await?;

        let owner_label = self
            .users
            .get(chat)
            .map(|u| u.display_name)
            .ok()
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| chat.to_string());

        self.exports.spawn(chat, owner_label, tasks, self.main_menu(chat));
        Ok(())
    }

    async fn send_with_menu(&self, chat: ChatId, text: &str) -> Result<(), EngineError> {
        self.transport
            .send(chat, text, Some(self.main_menu(chat)))
            .await?;
        Ok(())
    }
}
