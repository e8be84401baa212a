use std::sync::Arc;

use tracing::instrument;

use crate::application::Session;
use crate::domain::{ports::FileSearchApi, ChatMessage, ChatRole, DomainError};

/// Retrieval-bound queries and multi-turn chat against one store.
pub struct ChatService {
    api: Arc<dyn FileSearchApi>,
}

impl ChatService {
    pub fn new(api: Arc<dyn FileSearchApi>) -> Self {
        Self { api }
    }

    /// Sends `message` with the store's full history as context.
    ///
    /// On failure the user turn appended for this call is removed again, so the
    /// history only ever holds completed exchanges.
    #[instrument(skip(self, session, message))]
    pub async fn ask(
        &self,
        session: &mut Session,
        store: &str,
        message: &str,
    ) -> Result<String, DomainError> {
        if message.trim().is_empty() {
            return Err(DomainError::validation("message must not be empty"));
        }

        let history = session.chat_mut(store);
        history.push(ChatRole::User, message);

        match self.api.generate_content(store, &history.messages).await {
            Ok(reply) => {
                history.push(ChatRole::Model, reply.clone());
                tracing::debug!(turns = history.len(), "chat reply received");
                Ok(reply)
            }
            Err(e) => {
                history.rollback_user_turn();
                tracing::error!(error = %e, "chat request failed");
                Err(e)
            }
        }
    }

    /// One-shot query without history. The answer is kept as the session's
    /// last result.
    #[instrument(skip(self, session, prompt))]
    pub async fn query(
        &self,
        session: &mut Session,
        store: &str,
        prompt: &str,
    ) -> Result<String, DomainError> {
        if prompt.trim().is_empty() {
            return Err(DomainError::validation("prompt must not be empty"));
        }

        let answer = self
            .api
            .generate_content(store, &[ChatMessage::user(prompt)])
            .await?;
        session.set_last_answer(answer.clone());
        Ok(answer)
    }

    pub fn history(&self, session: &Session, store: &str) -> Vec<ChatMessage> {
        session
            .chat(store)
            .map(|h| h.messages.clone())
            .unwrap_or_default()
    }

    pub fn reset(&self, session: &mut Session, store: &str) {
        session.chat_mut(store).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{backend_with_documents, STORE};

    #[tokio::test]
    async fn test_successful_ask_appends_two_messages() {
        let backend = backend_with_documents(1);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();

        let reply = service.ask(&mut session, STORE, "what is vim?").await.unwrap();
        let history = service.history(&session, STORE);

        assert_eq!(history.len(), 2);
        assert_eq!(history[0], ChatMessage::user("what is vim?"));
        assert_eq!(history[1].role, ChatRole::Model);
        assert_eq!(history[1].text, reply);
    }

    #[tokio::test]
    async fn test_ask_sends_full_history_oldest_first() {
        let backend = backend_with_documents(1);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();

        service.ask(&mut session, STORE, "first").await.unwrap();
        service.ask(&mut session, STORE, "second").await.unwrap();

        let sent = backend.last_contents();
        assert_eq!(sent.len(), 3);
        assert_eq!(sent[0].text, "first");
        assert_eq!(sent[1].role, ChatRole::Model);
        assert_eq!(sent[2].text, "second");
    }

    #[tokio::test]
    async fn test_failed_ask_rolls_back_user_turn() {
        let backend = backend_with_documents(1);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();
        service.ask(&mut session, STORE, "first").await.unwrap();

        backend.fail_next("generate_content");
        let result = service.ask(&mut session, STORE, "second").await;

        assert!(result.is_err());
        assert_eq!(service.history(&session, STORE).len(), 2);
    }

    #[tokio::test]
    async fn test_histories_are_per_store() {
        let backend = backend_with_documents(0);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();

        service.ask(&mut session, STORE, "hello").await.unwrap();

        assert!(service.history(&session, "fileSearchStores/other").is_empty());
        service.reset(&mut session, STORE);
        assert!(service.history(&session, STORE).is_empty());
    }

    #[tokio::test]
    async fn test_query_keeps_last_answer_without_history() {
        let backend = backend_with_documents(1);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();

        let answer = service.query(&mut session, STORE, "summarize").await.unwrap();

        assert_eq!(session.last_answer(), Some(answer.as_str()));
        assert!(service.history(&session, STORE).is_empty());
        assert_eq!(backend.last_contents().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_message_is_rejected_without_remote_call() {
        let backend = backend_with_documents(0);
        let service = ChatService::new(backend.clone());
        let mut session = Session::new();

        let result = service.ask(&mut session, STORE, "   ").await;

        assert!(matches!(result, Err(DomainError::Validation(_))));
        assert_eq!(backend.calls().generate_content, 0);
    }
}
