//! The hook executor: runs a route's combined hook chain around a handler
//! invocation, guaranteeing cleanup hooks fire on every terminal path
//! (success, handler error, or an earlier hook short-circuiting).

use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt as _;

use crate::context::HookContext;
use crate::error::DispatchError;
use crate::hooks::{CleanupOutcome, Hook, HookResult};

/// How a full hook+handler execution ended. Only two shapes, not three --
/// a before-short-circuit, a replaced response, and a plain handler return
/// all answer with the same `200` success envelope, so there is no separate
/// "short circuited" outcome to track once `ctx.response` holds the right
/// value.
#[derive(Debug, Clone)]
pub enum ExecutionOutcome {
    /// The handler ran (or a `before`/`after` hook short-circuited) and
    /// produced this JSON value.
    Success(serde_json::Value),
    /// A hook or the handler failed with this status/code/message.
    Failure(DispatchError),
}

/// How the `before` phase alone resolved, before a handler (or an SSE/WS
/// route's handshake) would run. Exposed to [`crate::dispatcher`] so it can
/// gate SSE/WS routes on `before` hooks without forcing them through the
/// single-response `after` phase that only makes sense for `http` routes.
pub(crate) enum BeforeOutcome {
    Continue,
    ShortCircuited,
    Failed(DispatchError),
}

fn fail_from_result(status: u16, error: String) -> DispatchError {
    DispatchError {
        code: crate::error::ErrorCode::from_status(status),
        message: error,
        details: None,
    }
}

/// Run `hooks` around `handler`:
///
/// 1. Every hook's `before` phase runs first-to-last. The first hook to
///    return `Fail` stops the chain before the handler runs; the first hook
///    to return `Replace` adopts that value as the response and likewise
///    skips the handler and any remaining `before` hooks.
/// 2. If no `before` phase intervened, `handler` runs.
/// 3. Unless a `before`/handler failure occurred, every hook's `after`
///    phase runs first-to-last, each seeing the previous phase's response
///    in `ctx.response` and able to replace it again or fail outright.
/// 4. Every hook's `cleanup` phase runs, in the same declaration order as
///    `before`, unconditionally, with its result discarded.
pub async fn run_hooks<S, H, Fut>(
    hooks: &[Hook<S>],
    ctx: &mut HookContext<S>,
    handler: H,
) -> ExecutionOutcome
where
    H: FnOnce(&mut HookContext<S>) -> Fut,
    Fut: Future<Output = Result<serde_json::Value, DispatchError>>,
{
    let before_outcome = run_before(hooks, ctx).await;

    let mut failure: Option<DispatchError> = match before_outcome {
        BeforeOutcome::Failed(e) => Some(e),
        BeforeOutcome::ShortCircuited => None,
        BeforeOutcome::Continue => match handler(ctx).await {
            Ok(value) => {
                ctx.response = Some(value);
                None
            }
            Err(e) => Some(e),
        },
    };

    // `after` only runs when there was no failure yet (a handler exception
    // skips `after` outright, same as a `before` failure).
    if failure.is_none() {
        failure = run_after(hooks, ctx).await;
    }

    let outcome = match failure {
        Some(e) => ExecutionOutcome::Failure(e),
        None => ExecutionOutcome::Success(ctx.response.take().unwrap_or(serde_json::Value::Null)),
    };

    run_cleanup(hooks, ctx, &outcome).await;
    outcome
}

pub(crate) async fn run_before<S>(hooks: &[Hook<S>], ctx: &mut HookContext<S>) -> BeforeOutcome {
    for hook in hooks {
        let Some(before) = hook.before_fn() else { continue };
        match before(ctx).await {
            Ok(HookResult::Next) => continue,
            Ok(HookResult::Replace(value)) => {
                ctx.response = Some(value);
                return BeforeOutcome::ShortCircuited;
            }
            Ok(HookResult::Fail { status, error }) => {
                return BeforeOutcome::Failed(fail_from_result(status, error));
            }
            Err(e) => return BeforeOutcome::Failed(e),
        }
    }
    BeforeOutcome::Continue
}

/// Returns `Some(failure)` if an `after` hook terminated the chain, else `None`.
async fn run_after<S>(hooks: &[Hook<S>], ctx: &mut HookContext<S>) -> Option<DispatchError> {
    for hook in hooks {
        let Some(after) = hook.after_fn() else { continue };
        match after(ctx).await {
            Ok(HookResult::Next) => continue,
            Ok(HookResult::Replace(value)) => {
                ctx.response = Some(value);
            }
            Ok(HookResult::Fail { status, error }) => {
                return Some(fail_from_result(status, error));
            }
            Err(e) => return Some(e),
        }
    }
    None
}

pub(crate) async fn run_cleanup<S>(hooks: &[Hook<S>], ctx: &mut HookContext<S>, outcome: &ExecutionOutcome) {
    let cleanup_outcome = match outcome {
        ExecutionOutcome::Success(_) => CleanupOutcome { success: true, error: None },
        ExecutionOutcome::Failure(e) => CleanupOutcome { success: false, error: Some(e.clone()) },
    };
    for hook in hooks {
        if let Some(cleanup) = hook.cleanup_fn() {
            let fut = AssertUnwindSafe(cleanup(ctx, cleanup_outcome.clone()));
            if let Err(panic) = fut.catch_unwind().await {
                tracing::error!(
                    panic = %panic_message(&*panic),
                    "cleanup hook panicked; continuing with remaining cleanups"
                );
            }
        }
    }
}

/// Best-effort extraction of a panic payload's message, for logging only.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::LifecycleHook;
    use crate::request::{HttpMethod, NormalizedRequest};
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::sync::Mutex;

    fn ctx() -> HookContext<()> {
        HookContext::new(
            NormalizedRequest {
                route: "ping".to_owned(),
                method: HttpMethod::Get,
                headers: HashMap::new(),
                query: HashMap::new(),
                body: Bytes::new(),
                ip: None,
                url: "/ping".to_owned(),
            },
            (),
            serde_json::Value::Null,
        )
    }

    #[tokio::test]
    async fn handler_runs_when_no_hooks_intervene() {
        let mut c = ctx();
        let outcome = run_hooks::<(), _, _>(&[], &mut c, |_| async {
            Ok(serde_json::json!({ "ok": true }))
        })
        .await;
        match outcome {
            ExecutionOutcome::Success(v) => assert_eq!(v, serde_json::json!({ "ok": true })),
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn before_hook_short_circuits_and_skips_handler() {
        let hook: Hook<()> = Hook::legacy(|_ctx| async {
            Ok(HookResult::fail(429, "Too many"))
        });
        let mut c = ctx();
        let outcome = run_hooks(&[hook], &mut c, |_| async {
            panic!("handler must not run once a before hook fails")
        })
        .await;
        match outcome {
            ExecutionOutcome::Failure(e) => {
                assert_eq!(e.status(), 429);
                assert_eq!(e.code, crate::error::ErrorCode::TooManyRequests);
            }
            _ => panic!("expected failure"),
        }
    }

    #[tokio::test]
    async fn before_replace_short_circuits_but_runs_after() {
        let before: Hook<()> = Hook::legacy(|_ctx| async {
            Ok(HookResult::Replace(serde_json::json!({ "hit": true })))
        });
        let seen = Arc::new(Mutex::new(None));
        let seen_in_after = seen.clone();
        let after: Hook<()> = Hook::Lifecycle(LifecycleHook::new("observe").after(move |ctx| {
            let seen = seen_in_after.clone();
            async move {
                *seen.lock().unwrap() = ctx.response.clone();
                Ok(HookResult::Next)
            }
        }));
        let mut c = ctx();
        let outcome = run_hooks(&[before, after], &mut c, |_| async {
            panic!("handler must not run once a before hook short circuits")
        })
        .await;
        match outcome {
            ExecutionOutcome::Success(v) => assert_eq!(v, serde_json::json!({ "hit": true })),
            _ => panic!("expected success"),
        }
        assert_eq!(*seen.lock().unwrap(), Some(serde_json::json!({ "hit": true })));
    }

    #[tokio::test]
    async fn after_hooks_chain_response_transforms() {
        let first: Hook<()> = Hook::Lifecycle(LifecycleHook::new("first").after(|ctx| {
            let mut v = ctx.response.clone().unwrap();
            v["first"] = serde_json::json!(true);
            async move { Ok(HookResult::Replace(v)) }
        }));
        let second: Hook<()> = Hook::Lifecycle(LifecycleHook::new("second").after(|ctx| {
            let mut v = ctx.response.clone().unwrap();
            v["second"] = serde_json::json!(v.get("first").is_some());
            async move { Ok(HookResult::Replace(v)) }
        }));
        let mut c = ctx();
        let outcome = run_hooks(&[first, second], &mut c, |_| async {
            Ok(serde_json::json!({}))
        })
        .await;
        match outcome {
            ExecutionOutcome::Success(v) => {
                assert_eq!(v, serde_json::json!({ "first": true, "second": true }));
            }
            _ => panic!("expected success"),
        }
    }

    #[tokio::test]
    async fn cleanup_always_runs_even_on_failure() {
        let ran = Arc::new(AtomicUsize::new(0));
        let seen_success = Arc::new(Mutex::new(true));
        let ran_in_cleanup = ran.clone();
        let seen_in_cleanup = seen_success.clone();
        let hook: Hook<()> = Hook::Lifecycle(
            LifecycleHook::new("counter").cleanup(move |_ctx, outcome| {
                let ran = ran_in_cleanup.clone();
                let seen = seen_in_cleanup.clone();
                async move {
                    ran.fetch_add(1, Ordering::SeqCst);
                    *seen.lock().unwrap() = outcome.success;
                }
            }),
        );
        let mut c = ctx();
        let outcome = run_hooks(&[hook], &mut c, |_| async {
            Err(DispatchError::internal("boom"))
        })
        .await;
        assert!(matches!(outcome, ExecutionOutcome::Failure(_)));
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(*seen_success.lock().unwrap(), false);
    }

    #[tokio::test]
    async fn cleanup_runs_in_declaration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let make_hook = |name: &'static str, order: Arc<Mutex<Vec<&'static str>>>| {
            Hook::Lifecycle(LifecycleHook::new(name).cleanup(move |_ctx, _outcome| {
                let order = order.clone();
                async move {
                    order.lock().unwrap().push(name);
                }
            }))
        };
        let hooks = vec![make_hook("first", order.clone()), make_hook("second", order.clone())];
        let mut c = ctx();
        run_hooks(&hooks, &mut c, |_| async { Ok(serde_json::Value::Null) }).await;
        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn panicking_cleanup_is_caught_and_later_cleanups_still_run() {
        let ran_second = Arc::new(AtomicUsize::new(0));
        let ran_second_in = ran_second.clone();
        let panicking: Hook<()> = Hook::Lifecycle(
            LifecycleHook::new("boom").cleanup(|_ctx, _outcome| async { panic!("cleanup exploded") }),
        );
        let second: Hook<()> = Hook::Lifecycle(LifecycleHook::new("second").cleanup(move |_ctx, _outcome| {
            let ran = ran_second_in.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
            }
        }));
        let mut c = ctx();
        let outcome = run_hooks(&[panicking, second], &mut c, |_| async {
            Ok(serde_json::Value::Null)
        })
        .await;
        assert!(matches!(outcome, ExecutionOutcome::Success(_)));
        assert_eq!(ran_second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn after_failure_stops_remaining_after_hooks() {
        let ran_second = Arc::new(AtomicUsize::new(0));
        let ran_second_in = ran_second.clone();
        let first: Hook<()> = Hook::Lifecycle(
            LifecycleHook::new("first").after(|_ctx| async { Ok(HookResult::fail(403, "nope")) }),
        );
        let second: Hook<()> = Hook::Lifecycle(LifecycleHook::new("second").after(move |_ctx| {
            let ran = ran_second_in.clone();
            async move {
                ran.fetch_add(1, Ordering::SeqCst);
                Ok(HookResult::Next)
            }
        }));
        let mut c = ctx();
        let outcome = run_hooks(&[first, second], &mut c, |_| async {
            Ok(serde_json::Value::Null)
        })
        .await;
        assert!(matches!(outcome, ExecutionOutcome::Failure(_)));
        assert_eq!(ran_second.load(Ordering::SeqCst), 0);
    }
}
