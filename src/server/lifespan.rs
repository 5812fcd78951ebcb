//! Combined lifespan for the REST facade and the MCP sub-service.
//!
//! Hooks start in registration order. If one fails, the hooks already started
//! are shut down (in reverse) before the error is returned. A successful start
//! yields a [`RunningLifespan`], and shutting it down consumes it, so each
//! started hook is stopped exactly once.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::errors::GatewayError;

/// Upper bound on a single hook's shutdown before moving on.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Startup/shutdown behavior of one sub-application.
#[async_trait]
pub trait LifecycleHook: Send + Sync {
    fn name(&self) -> &str;

    async fn startup(&self) -> anyhow::Result<()>;

    async fn shutdown(&self);
}

/// Ordered set of hooks that have not been started yet.
#[derive(Default, Clone)]
pub struct Lifespan {
    hooks: Vec<Arc<dyn LifecycleHook>>,
}

impl Lifespan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook; it starts after every hook added before it.
    pub fn with(mut self, hook: Arc<dyn LifecycleHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn hook_names(&self) -> Vec<&str> {
        self.hooks.iter().map(|h| h.name()).collect()
    }

    /// Start every hook in order.
    pub async fn start(self) -> Result<RunningLifespan, GatewayError> {
        let mut started: Vec<Arc<dyn LifecycleHook>> = Vec::with_capacity(self.hooks.len());

        for hook in self.hooks {
            match hook.startup().await {
                Ok(()) => {
                    tracing::info!(hook = hook.name(), "lifecycle hook started");
                    started.push(hook);
                }
                Err(e) => {
                    tracing::error!(hook = hook.name(), error = %format!("{e:#}"), "lifecycle hook failed to start");
                    shutdown_all(started).await;
                    return Err(GatewayError::Startup {
                        hook: hook.name().to_string(),
                        reason: format!("{e:#}"),
                    });
                }
            }
        }

        Ok(RunningLifespan { started })
    }
}

/// Hooks that started successfully and still need to be shut down.
pub struct RunningLifespan {
    started: Vec<Arc<dyn LifecycleHook>>,
}

impl RunningLifespan {
    pub fn hook_names(&self) -> Vec<&str> {
        self.started.iter().map(|h| h.name()).collect()
    }

    /// Shut down every started hook in reverse start order.
    pub async fn shutdown(self) {
        shutdown_all(self.started).await;
    }
}

async fn shutdown_all(started: Vec<Arc<dyn LifecycleHook>>) {
    for hook in started.into_iter().rev() {
        if tokio::time::timeout(SHUTDOWN_TIMEOUT, hook.shutdown())
            .await
            .is_err()
        {
            tracing::warn!(hook = hook.name(), "lifecycle hook shutdown timed out");
        } else {
            tracing::info!(hook = hook.name(), "lifecycle hook stopped");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Events = Arc<Mutex<Vec<String>>>;

    struct Recorder {
        name: &'static str,
        fail: bool,
        events: Events,
    }

    #[async_trait]
    impl LifecycleHook for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        async fn startup(&self) -> anyhow::Result<()> {
            self.events.lock().unwrap().push(format!("start:{}", self.name));
            if self.fail {
                anyhow::bail!("{} refused to start", self.name);
            }
            Ok(())
        }

        async fn shutdown(&self) {
            self.events.lock().unwrap().push(format!("stop:{}", self.name));
        }
    }

    fn hook(name: &'static str, fail: bool, events: &Events) -> Arc<dyn LifecycleHook> {
        Arc::new(Recorder {
            name,
            fail,
            events: events.clone(),
        })
    }

    #[tokio::test]
    async fn test_start_in_order_stop_in_reverse() {
        let events: Events = Arc::default();
        let running = Lifespan::new()
            .with(hook("rest", false, &events))
            .with(hook("mcp", false, &events))
            .start()
            .await
            .unwrap();
        assert_eq!(running.hook_names(), vec!["rest", "mcp"]);

        running.shutdown().await;
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start:rest", "start:mcp", "stop:mcp", "stop:rest"]
        );
    }

    #[tokio::test]
    async fn test_failed_start_rolls_back_started_hooks() {
        let events: Events = Arc::default();
        let err = Lifespan::new()
            .with(hook("rest", false, &events))
            .with(hook("mcp", true, &events))
            .with(hook("never", false, &events))
            .start()
            .await
            .err()
            .unwrap();

        assert!(matches!(err, GatewayError::Startup { ref hook, .. } if hook == "mcp"));
        assert!(err.to_string().contains("refused to start"));
        assert_eq!(
            *events.lock().unwrap(),
            vec!["start:rest", "start:mcp", "stop:rest"]
        );
    }
}
