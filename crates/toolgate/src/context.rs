//! Request-scoped credential context.
//!
//! Each inbound request constructs an authenticated vendor client and binds
//! it here for the duration of that request's async call tree. Handlers read
//! the ambient client with [`current`] instead of threading it through every
//! signature. Isolation is per logical task, not per OS thread: two requests
//! interleaving on one current-thread runtime never observe each other's
//! client, because the slot lives in a tokio task-local.

use std::{any::Any, sync::Arc};

tokio::task_local! {
    static CLIENT: Arc<dyn Any + Send + Sync>;
}

#[derive(Debug, thiserror::Error)]
pub enum ContextError {
    /// A handler ran outside any [`scope`], i.e. it was wired to the wrong
    /// entry point. There is no sensible recovery.
    #[error("no vendor client bound to the current task")]
    NotBound,
    #[error("bound vendor client is not a {expected}")]
    WrongType { expected: &'static str },
}

/// Runs `fut` with `client` bound as the ambient vendor client. Everything
/// the future awaits, however deep, sees the same binding.
pub async fn scope<C, F>(client: Arc<C>, fut: F) -> F::Output
where
    C: Send + Sync + 'static,
    F: Future,
{
    CLIENT.scope(client, fut).await
}

/// Fallible accessor, for code that can degrade without a client.
pub fn try_current<C: Send + Sync + 'static>() -> Result<Arc<C>, ContextError> {
    let any = CLIENT
        .try_with(Arc::clone)
        .map_err(|_| ContextError::NotBound)?;
    any.downcast::<C>().map_err(|_| ContextError::WrongType {
        expected: std::any::type_name::<C>(),
    })
}

/// Returns the ambient vendor client.
///
/// # Panics
///
/// Panics when called outside a [`scope`] or when the bound client has a
/// different type. Both indicate a wiring bug, not a runtime condition.
pub fn current<C: Send + Sync + 'static>() -> Arc<C> {
    match try_current() {
        Ok(client) => client,
        Err(e) => panic!("credential context misuse: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeClient {
        token: String,
    }

    #[tokio::test]
    async fn scope_binds_client_for_the_call_tree() {
        let client = Arc::new(FakeClient {
            token: "t-1".into(),
        });
        scope(client, async {
            async fn deep() -> String {
                current::<FakeClient>().token.clone()
            }
            assert_eq!(deep().await, "t-1");
        })
        .await;
    }

    #[test]
    fn try_current_outside_scope_is_not_bound() {
        assert!(matches!(
            try_current::<FakeClient>(),
            Err(ContextError::NotBound)
        ));
    }

    #[tokio::test]
    async fn wrong_type_is_reported() {
        struct OtherClient;
        scope(Arc::new(OtherClient), async {
            assert!(matches!(
                try_current::<FakeClient>(),
                Err(ContextError::WrongType { .. })
            ));
        })
        .await;
    }

    #[tokio::test(flavor = "current_thread")]
    async fn concurrent_scopes_are_isolated() {
        // Two request-like tasks interleave on one thread; each must keep
        // seeing its own client across await points.
        async fn request(token: &str) {
            let client = Arc::new(FakeClient {
                token: token.into(),
            });
            scope(client, async {
                for _ in 0..32 {
                    tokio::task::yield_now().await;
                    assert_eq!(current::<FakeClient>().token, token);
                }
            })
            .await;
        }

        let (a, b) = tokio::join!(
            tokio::spawn(request("token-a")),
            tokio::spawn(request("token-b"))
        );
        a.unwrap();
        b.unwrap();
    }
}
