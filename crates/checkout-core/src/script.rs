//! Provider Script Wait
//!
//! The provider's browser library may arrive after our code runs. Poll for it
//! a bounded number of times, then inject the script tag ourselves before
//! giving up.

use std::time::Duration;

use async_trait::async_trait;

/// Polling bounds
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 50,
            interval: Duration::from_millis(100),
        }
    }
}

/// How the library became available
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScriptReadiness {
    AlreadyLoaded,
    /// Appeared after this many polls
    AppearedAfter(u32),
    LoadedDynamically,
}

/// Browser hooks the wait needs
#[async_trait(?Send)]
pub trait ScriptHost {
    fn provider_ready(&self) -> bool;

    async fn pause(&self, interval: Duration);

    /// Inject the provider script and resolve once it has loaded
    async fn load_provider_script(&self) -> Result<(), String>;
}

/// Wait for the provider library, loading it ourselves as a last resort
pub async fn wait_for_provider<H>(host: &H, policy: PollPolicy) -> Result<ScriptReadiness, String>
where
    H: ScriptHost + ?Sized,
{
    if host.provider_ready() {
        return Ok(ScriptReadiness::AlreadyLoaded);
    }

    for attempt in 1..=policy.attempts {
        host.pause(policy.interval).await;
        if host.provider_ready() {
            return Ok(ScriptReadiness::AppearedAfter(attempt));
        }
    }

    tracing::warn!(attempts = policy.attempts, "Provider script not present; loading it");
    host.load_provider_script().await?;

    if host.provider_ready() {
        Ok(ScriptReadiness::LoadedDynamically)
    } else {
        Err("Payment library could not be loaded".into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    struct FakeHost {
        ready_after_polls: Option<u32>,
        load_works: bool,
        polls: Cell<u32>,
        loaded: Cell<bool>,
    }

    impl FakeHost {
        fn new(ready_after_polls: Option<u32>, load_works: bool) -> Self {
            Self {
                ready_after_polls,
                load_works,
                polls: Cell::new(0),
                loaded: Cell::new(false),
            }
        }
    }

    #[async_trait(?Send)]
    impl ScriptHost for FakeHost {
        fn provider_ready(&self) -> bool {
            self.loaded.get()
                || self
                    .ready_after_polls
                    .is_some_and(|n| self.polls.get() >= n)
        }

        async fn pause(&self, _interval: Duration) {
            self.polls.set(self.polls.get() + 1);
        }

        async fn load_provider_script(&self) -> Result<(), String> {
            if self.load_works {
                self.loaded.set(true);
                Ok(())
            } else {
                Err("script blocked".into())
            }
        }
    }

    const POLICY: PollPolicy = PollPolicy {
        attempts: 5,
        interval: Duration::from_millis(1),
    };

    #[tokio::test(flavor = "current_thread")]
    async fn test_already_loaded() {
        let host = FakeHost::new(Some(0), false);
        assert_eq!(
            wait_for_provider(&host, POLICY).await,
            Ok(ScriptReadiness::AlreadyLoaded)
        );
        assert_eq!(host.polls.get(), 0);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_appears_while_polling() {
        let host = FakeHost::new(Some(3), false);
        assert_eq!(
            wait_for_provider(&host, POLICY).await,
            Ok(ScriptReadiness::AppearedAfter(3))
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_falls_back_to_dynamic_load_after_bound() {
        let host = FakeHost::new(None, true);
        assert_eq!(
            wait_for_provider(&host, POLICY).await,
            Ok(ScriptReadiness::LoadedDynamically)
        );
        assert_eq!(host.polls.get(), 5);
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_gives_up_when_load_fails() {
        let host = FakeHost::new(None, false);
        assert!(wait_for_provider(&host, POLICY).await.is_err());
        assert_eq!(host.polls.get(), 5);
    }
}
