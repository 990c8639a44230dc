use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::backend::{Completion, CompletionBackend, CompletionRequest};
use crate::error::{Error, Result};

type Reply = Box<dyn Fn(&CompletionRequest) -> Vec<String> + Send + Sync>;

struct Failure {
    operation: &'static str,
    word: Option<&'static str>,
    code: &'static str,
}

impl Failure {
    fn matches(&self, request: &CompletionRequest) -> bool {
        self.operation == request.operation
            && self.word.is_none_or(|word| {
                request
                    .user_prompt()
                    .is_some_and(|prompt| prompt.contains(word))
            })
    }
}

/// In-memory backend: answers with `reply`, records every request and
/// tracks how many calls are in flight at once.
pub struct ScriptedBackend {
    reply: Reply,
    fail_on: Option<Failure>,
    reentry_limit: Option<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
    completed: Mutex<Vec<CompletionRequest>>,
    active: AtomicUsize,
    max_active: AtomicUsize,
}

impl ScriptedBackend {
    pub const TOKENS_PER_CALL: u64 = 10;

    pub fn replying<F>(reply: F) -> Self
    where
        F: Fn(&CompletionRequest) -> Vec<String> + Send + Sync + 'static,
    {
        Self {
            reply: Box::new(reply),
            fail_on: None,
            reentry_limit: None,
            requests: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, operation: &'static str, code: &'static str) -> Self {
        self.fail_on = Some(Failure {
            operation,
            word: None,
            code,
        });
        self
    }

    /// Like `failing_on`, but only for requests whose user prompt mentions `word`.
    pub fn failing_for_word(
        mut self,
        operation: &'static str,
        word: &'static str,
        code: &'static str,
    ) -> Self {
        self.fail_on = Some(Failure {
            operation,
            word: Some(word),
            code,
        });
        self
    }

    /// Panic if more than `limit` calls are ever in flight together.
    pub fn reentry_limit(mut self, limit: usize) -> Self {
        self.reentry_limit = Some(limit);
        self
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests that were answered successfully, in completion order.
    pub fn completed(&self) -> Vec<CompletionRequest> {
        self.completed.lock().unwrap().clone()
    }

    pub fn last_user_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()
            .and_then(|request| request.user_prompt().map(str::to_string))
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }
}

impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, _model: &str, request: &CompletionRequest) -> Result<Completion> {
        let now_active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now_active, Ordering::SeqCst);
        if let Some(limit) = self.reentry_limit {
            assert!(
                now_active <= limit,
                "{now_active} calls in flight, limit is {limit}"
            );
        }
        self.requests.lock().unwrap().push(request.clone());

        // Give sibling pipelines a chance to run while this call is "on the wire".
        for _ in 0..3 {
            tokio::task::yield_now().await;
        }
        self.active.fetch_sub(1, Ordering::SeqCst);

        if let Some(failure) = &self.fail_on
            && failure.matches(request)
        {
            return Err(Error::RemoteService {
                operation: failure.operation.to_string(),
                code: Some(failure.code.to_string()),
                message: "scripted failure".to_string(),
            });
        }

        self.completed.lock().unwrap().push(request.clone());
        Ok(Completion {
            choices: (self.reply)(request),
            total_tokens: Self::TOKENS_PER_CALL,
        })
    }
}
