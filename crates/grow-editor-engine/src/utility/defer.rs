use tokio::sync::watch;

/// A single-resolution future settled from the outside.
///
/// The first `resolve`/`reject` wins; every waiter, present or future, sees
/// that same outcome.
#[derive(Debug)]
pub struct Deferred<T, E> {
    sender: watch::Sender<Option<Result<T, E>>>,
}

impl<T: Clone, E: Clone> Default for Deferred<T, E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone, E: Clone> Deferred<T, E> {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(None);
        Self { sender }
    }

    /// Settle successfully. Returns false if already settled.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Settle with an error. Returns false if already settled.
    pub fn reject(&self, error: E) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: Result<T, E>) -> bool {
        let mut outcome = Some(outcome);
        self.sender.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = outcome.take();
            true
        })
    }

    pub fn is_settled(&self) -> bool {
        self.sender.borrow().is_some()
    }

    /// The outcome, if already settled. Never waits.
    pub fn peek(&self) -> Option<Result<T, E>> {
        self.sender.borrow().clone()
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> Result<T, E> {
        let mut receiver = self.sender.subscribe();
        loop {
            if let Some(outcome) = receiver.borrow_and_update().clone() {
                return outcome;
            }
            // The sender lives in `self`, which outlives this borrow.
            if receiver.changed().await.is_err() {
                return std::future::pending().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_settlement_wins() {
        let deferred: Deferred<u32, String> = Deferred::new();

        assert!(deferred.peek().is_none());
        assert!(deferred.resolve(1));
        assert!(!deferred.resolve(2));
        assert!(!deferred.reject("late".to_string()));

        assert_eq!(deferred.peek(), Some(Ok(1)));
    }

    #[tokio::test]
    async fn test_waiters_before_and_after_resolution_agree() {
        let deferred: Deferred<&'static str, String> = Deferred::new();

        let (early, _) = tokio::join!(deferred.wait(), async {
            tokio::task::yield_now().await;
            deferred.resolve("catalog");
        });
        let late = deferred.wait().await;

        assert_eq!(early, Ok("catalog"));
        assert_eq!(late, Ok("catalog"));
    }

    #[tokio::test]
    async fn test_rejection_reaches_waiters() {
        let deferred: Deferred<u32, String> = Deferred::new();
        deferred.reject("offline".to_string());

        assert_eq!(deferred.wait().await, Err("offline".to_string()));
        assert!(deferred.is_settled());
    }
}
