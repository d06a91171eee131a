//! Rule scheduler — evaluates time-triggered rules and pushes their targets.
//!
//! The scheduler owns the in-memory rule list. Once per tick it walks the list,
//! lets every due rule move itself to its next state (see [`Rule::tick`]),
//! spawns one state push per fresh rule, and persists the whole list once if
//! anything changed. The rule lock is held while deciding and mutating, never
//! while a push is in flight.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use plughub_domain::error::PlugHubError;
use plughub_domain::rule::{Rule, Tick};
use plughub_domain::time::{self, Timestamp};

use crate::ports::{ConfigStore, RemoteStateClient};
use crate::state_cache::StateCache;
use crate::task::BackgroundTask;

/// Timing knobs for the scheduler.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Delay between two evaluation passes.
    pub tick_period: Duration,
    /// Due rules older than this are advanced without pushing their target.
    pub max_age: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_period: Duration::from_secs(60),
            max_age: Duration::from_secs(6 * 60 * 60),
        }
    }
}

/// What one evaluation pass did.
#[derive(Debug, Default)]
pub struct Evaluation {
    /// Names of the rules whose target was pushed.
    pub fired: Vec<String>,
    /// Names of the due rules skipped because they were stale.
    pub skipped: Vec<String>,
    /// One handle per push, in rule order.
    pub pushes: Vec<JoinHandle<Result<(), PlugHubError>>>,
}

impl Evaluation {
    /// Whether any rule was advanced or disabled.
    #[must_use]
    pub fn changed(&self) -> bool {
        !self.fired.is_empty() || !self.skipped.is_empty()
    }

    /// Wait for every push of this pass and collect their outcomes.
    ///
    /// Pushes cancelled by a runtime shutdown are left out.
    pub async fn join(self) -> Vec<Result<(), PlugHubError>> {
        let mut outcomes = Vec::with_capacity(self.pushes.len());
        for push in self.pushes {
            match push.await {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(_) => {}
            }
        }
        outcomes
    }
}

/// Owner of the rule list and its evaluation loop.
pub struct RuleScheduler<C, R> {
    store: C,
    cache: Arc<StateCache<R>>,
    config: SchedulerConfig,
    rules: Mutex<Vec<Rule>>,
}

impl<C, R> RuleScheduler<C, R>
where
    C: ConfigStore + Send + Sync + 'static,
    R: RemoteStateClient + Send + Sync + 'static,
{
    /// Load the rule list from `store`.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Persistence`] when the store cannot be read.
    #[tracing::instrument(skip_all)]
    pub async fn load(
        store: C,
        cache: Arc<StateCache<R>>,
        config: SchedulerConfig,
    ) -> Result<Self, PlugHubError> {
        let rules = store.get_rules().await?;
        tracing::info!(rules = rules.len(), "rules loaded");
        Ok(Self {
            store,
            cache,
            config,
            rules: Mutex::new(rules),
        })
    }

    /// Copy of the current rule list.
    pub async fn rules(&self) -> Vec<Rule> {
        self.rules.lock().await.clone()
    }

    /// Replace the rule list and persist it.
    ///
    /// Rules are taken as-is; validation belongs to the caller.
    ///
    /// # Errors
    ///
    /// Returns [`PlugHubError::Persistence`] when the store rejects the write.
    /// The in-memory list is replaced regardless.
    pub async fn set_rules(&self, rules: Vec<Rule>) -> Result<(), PlugHubError> {
        let mut current = self.rules.lock().await;
        *current = rules;
        tracing::info!(rules = current.len(), "rules replaced");
        self.store.set_rules(current.clone()).await
    }

    /// Run one evaluation pass at `now`.
    ///
    /// Due rules are advanced or disabled; fresh ones get their target pushed
    /// through the cache on a spawned task. If any rule changed, the list is
    /// persisted once; a persistence failure is logged and the in-memory state
    /// is kept.
    pub async fn evaluate(&self, now: Timestamp) -> Evaluation {
        let max_age = TimeDelta::from_std(self.config.max_age).unwrap_or(TimeDelta::MAX);
        let mut evaluation = Evaluation::default();

        let mut rules = self.rules.lock().await;
        for rule in rules.iter_mut() {
            match rule.tick(now, max_age) {
                Tick::Idle => continue,
                Tick::Fire => {
                    tracing::info!(rule = %rule.name, "rule fired");
                    let cache = Arc::clone(&self.cache);
                    let target = rule.target_state.clone();
                    let name = rule.name.clone();
                    evaluation.pushes.push(tokio::spawn(async move {
                        cache.set_state(target).await.inspect_err(|err| {
                            tracing::warn!(rule = %name, error = %err, "scheduled push failed");
                        })
                    }));
                    evaluation.fired.push(rule.name.clone());
                }
                Tick::Stale => {
                    tracing::info!(rule = %rule.name, "stale rule skipped");
                    evaluation.skipped.push(rule.name.clone());
                }
            }
            if rule.enabled {
                tracing::info!(rule = %rule.name, next = %rule.trigger_time, "rule advanced");
            } else if rule.is_repeating() {
                tracing::warn!(
                    rule = %rule.name,
                    "repeating rule has no representable next trigger, disabled"
                );
            } else {
                tracing::info!(rule = %rule.name, "rule disabled");
            }
        }

        if evaluation.changed() {
            if let Err(err) = self.store.set_rules(rules.clone()).await {
                tracing::error!(error = %err, "failed to persist rules after evaluation");
            }
        }
        evaluation
    }

    /// Spawn the periodic evaluation loop.
    pub fn spawn_ticker(self: &Arc<Self>) -> BackgroundTask {
        let scheduler = Arc::clone(self);
        BackgroundTask::every("rule-ticker", self.config.tick_period, move || {
            let scheduler = Arc::clone(&scheduler);
            async move {
                scheduler.evaluate(time::now()).await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_cache::CacheConfig;
    use plughub_domain::device::Device;
    use plughub_domain::error::RemoteError;
    use plughub_domain::rule::MIN_REPEAT_INTERVAL;
    use plughub_domain::state::{DeviceState, StateSnapshot};
    use std::future::Future;
    use std::sync::Mutex as StdMutex;

    // ── In-memory store ────────────────────────────────────────────

    #[derive(Default)]
    struct InMemoryStore {
        rules: StdMutex<Vec<Rule>>,
        writes: StdMutex<usize>,
        fail_writes: StdMutex<bool>,
    }

    impl ConfigStore for InMemoryStore {
        fn get_devices(&self) -> impl Future<Output = Result<Vec<Device>, PlugHubError>> + Send {
            async { Ok(Vec::new()) }
        }

        fn set_devices(
            &self,
            _devices: Vec<Device>,
        ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
            async { Ok(()) }
        }

        fn get_rules(&self) -> impl Future<Output = Result<Vec<Rule>, PlugHubError>> + Send {
            let rules = self.rules.lock().unwrap().clone();
            async move { Ok(rules) }
        }

        fn set_rules(
            &self,
            rules: Vec<Rule>,
        ) -> impl Future<Output = Result<(), PlugHubError>> + Send {
            let result = if *self.fail_writes.lock().unwrap() {
                Err(PlugHubError::persistence(std::io::Error::other("disk full")))
            } else {
                *self.writes.lock().unwrap() += 1;
                *self.rules.lock().unwrap() = rules;
                Ok(())
            };
            async move { result }
        }
    }

    // ── Spy remote ─────────────────────────────────────────────────

    #[derive(Default)]
    struct SpyRemote {
        pushed: StdMutex<Vec<StateSnapshot>>,
    }

    impl RemoteStateClient for SpyRemote {
        fn get_state(&self) -> impl Future<Output = Result<String, RemoteError>> + Send {
            async { Ok("{}".to_string()) }
        }

        fn set_state(
            &self,
            state_json: String,
        ) -> impl Future<Output = Result<bool, RemoteError>> + Send {
            let target = serde_json::from_str(&state_json).unwrap();
            self.pushed.lock().unwrap().push(target);
            async { Ok(true) }
        }
    }

    type Scheduler = RuleScheduler<Arc<InMemoryStore>, Arc<SpyRemote>>;

    async fn make_scheduler(rules: Vec<Rule>) -> (Scheduler, Arc<InMemoryStore>, Arc<SpyRemote>) {
        let store = Arc::new(InMemoryStore::default());
        *store.rules.lock().unwrap() = rules;
        let remote = Arc::new(SpyRemote::default());
        let cache = Arc::new(StateCache::new(Arc::clone(&remote), CacheConfig::default()));
        let scheduler = RuleScheduler::load(Arc::clone(&store), cache, SchedulerConfig::default())
            .await
            .unwrap();
        (scheduler, store, remote)
    }

    fn fixed_now() -> Timestamp {
        "2024-06-01T22:00:00Z".parse().unwrap()
    }

    fn night_off(trigger_time: Timestamp) -> Rule {
        Rule::builder()
            .name("night-off")
            .target("d1", DeviceState::OFF)
            .trigger_time(trigger_time)
            .build()
            .unwrap()
    }

    fn every_ten_minutes(trigger_time: Timestamp) -> Rule {
        Rule::builder()
            .name("blink")
            .target("d2", DeviceState::ON)
            .trigger_time(trigger_time)
            .repeat(MIN_REPEAT_INTERVAL)
            .build()
            .unwrap()
    }

    // ── Tests ──────────────────────────────────────────────────────

    #[tokio::test]
    async fn should_load_rules_from_store() {
        let now = fixed_now();
        let (scheduler, _, _) = make_scheduler(vec![night_off(now)]).await;

        assert_eq!(scheduler.rules().await, vec![night_off(now)]);
    }

    #[tokio::test]
    async fn should_fire_once_and_disable_one_shot_rule_when_due() {
        let now = fixed_now();
        let (scheduler, store, remote) =
            make_scheduler(vec![night_off(now - TimeDelta::hours(2))]).await;

        let evaluation = scheduler.evaluate(now).await;
        assert_eq!(evaluation.fired, vec!["night-off".to_string()]);
        for outcome in evaluation.join().await {
            outcome.unwrap();
        }

        let rules = scheduler.rules().await;
        assert!(!rules[0].enabled);
        assert_eq!(
            remote.pushed.lock().unwrap().as_slice(),
            [StateSnapshot::new().with("d1", DeviceState::OFF)]
        );
        assert_eq!(*store.rules.lock().unwrap(), rules);
    }

    #[tokio::test]
    async fn should_advance_repeating_rule_past_now_when_ticks_were_missed() {
        let now = fixed_now();
        let period = TimeDelta::from_std(MIN_REPEAT_INTERVAL).unwrap();
        // Three whole periods and a bit behind.
        let trigger = now - period * 3 - TimeDelta::seconds(42);
        let (scheduler, _, remote) = make_scheduler(vec![every_ten_minutes(trigger)]).await;

        let evaluation = scheduler.evaluate(now).await;
        evaluation.join().await;

        let rule = &scheduler.rules().await[0];
        assert!(rule.enabled);
        assert_eq!(rule.trigger_time, trigger + period * 4);
        assert!(rule.trigger_time > now);
        assert_eq!(remote.pushed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_advance_without_pushing_when_rule_is_stale() {
        let now = fixed_now();
        let stale_one_shot = night_off(now - TimeDelta::hours(7));
        let stale_repeating = every_ten_minutes(now - TimeDelta::hours(7));
        let (scheduler, store, remote) =
            make_scheduler(vec![stale_one_shot, stale_repeating]).await;

        let evaluation = scheduler.evaluate(now).await;

        assert!(evaluation.fired.is_empty());
        assert_eq!(evaluation.skipped.len(), 2);
        assert!(evaluation.pushes.is_empty());
        let rules = scheduler.rules().await;
        assert!(!rules[0].enabled);
        assert!(rules[1].enabled);
        assert!(rules[1].trigger_time > now);
        assert!(remote.pushed.lock().unwrap().is_empty());
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn should_fire_rule_exactly_at_max_age() {
        let now = fixed_now();
        let (scheduler, _, _) = make_scheduler(vec![night_off(now - TimeDelta::hours(6))]).await;

        let evaluation = scheduler.evaluate(now).await;

        assert_eq!(evaluation.fired.len(), 1);
        assert!(evaluation.skipped.is_empty());
    }

    #[tokio::test]
    async fn should_persist_once_per_pass_when_several_rules_change() {
        let now = fixed_now();
        let rules = vec![
            night_off(now - TimeDelta::minutes(1)),
            every_ten_minutes(now - TimeDelta::minutes(5)),
            night_off(now - TimeDelta::hours(8)),
        ];
        let (scheduler, store, _) = make_scheduler(rules).await;

        let evaluation = scheduler.evaluate(now).await;

        assert_eq!(evaluation.fired.len(), 2);
        assert_eq!(evaluation.skipped.len(), 1);
        assert_eq!(*store.writes.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn should_not_persist_when_nothing_is_due() {
        let now = fixed_now();
        let mut disabled = night_off(now - TimeDelta::hours(1));
        disabled.enabled = false;
        let pending = night_off(now + TimeDelta::hours(1));
        let (scheduler, store, remote) = make_scheduler(vec![disabled, pending]).await;

        let evaluation = scheduler.evaluate(now).await;

        assert!(!evaluation.changed());
        assert_eq!(*store.writes.lock().unwrap(), 0);
        assert!(remote.pushed.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_in_memory_state_when_persisting_evaluation_fails() {
        let now = fixed_now();
        let (scheduler, store, _) =
            make_scheduler(vec![night_off(now - TimeDelta::minutes(1))]).await;
        *store.fail_writes.lock().unwrap() = true;

        scheduler.evaluate(now).await.join().await;

        assert!(!scheduler.rules().await[0].enabled);
        assert!(store.rules.lock().unwrap()[0].enabled);
    }

    #[tokio::test]
    async fn should_round_trip_rules_through_set_and_store() {
        let now = fixed_now();
        let (scheduler, store, _) = make_scheduler(Vec::new()).await;
        let rules = vec![every_ten_minutes(now), night_off(now + TimeDelta::hours(3))];

        scheduler.set_rules(rules.clone()).await.unwrap();

        assert_eq!(scheduler.rules().await, rules);
        assert_eq!(store.get_rules().await.unwrap(), rules);
    }

    #[tokio::test]
    async fn should_replace_in_memory_rules_even_when_store_write_fails() {
        let now = fixed_now();
        let (scheduler, store, _) = make_scheduler(Vec::new()).await;
        *store.fail_writes.lock().unwrap() = true;

        let result = scheduler.set_rules(vec![night_off(now)]).await;

        assert!(matches!(result, Err(PlugHubError::Persistence(_))));
        assert_eq!(scheduler.rules().await.len(), 1);
    }

    #[tokio::test]
    async fn should_return_independent_copies_of_rules() {
        let now = fixed_now();
        let (scheduler, _, _) = make_scheduler(vec![night_off(now)]).await;

        let mut copy = scheduler.rules().await;
        copy[0].target_state.insert("d1".into(), DeviceState::ON);
        copy[0].enabled = false;

        assert_eq!(scheduler.rules().await, vec![night_off(now)]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_evaluate_immediately_when_ticker_starts() {
        let now = time::now();
        let (scheduler, _, remote) =
            make_scheduler(vec![night_off(now - TimeDelta::minutes(1))]).await;
        let scheduler = Arc::new(scheduler);

        let task = scheduler.spawn_ticker();
        tokio::time::sleep(Duration::from_millis(10)).await;
        task.shutdown().await;

        assert!(!scheduler.rules().await[0].enabled);
        assert_eq!(remote.pushed.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_keep_ticking_after_rule_with_unrepresentable_next_trigger() {
        let now = time::now();
        let mut endless = every_ten_minutes(now - TimeDelta::minutes(1));
        endless.repeat = Duration::from_secs(10_000_000_000_000);
        let (scheduler, _, remote) = make_scheduler(vec![endless]).await;
        let scheduler = Arc::new(scheduler);

        let task = scheduler.spawn_ticker();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!scheduler.rules().await[0].enabled);

        scheduler
            .set_rules(vec![night_off(now - TimeDelta::minutes(1))])
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(180)).await;
        task.shutdown().await;

        assert!(!scheduler.rules().await[0].enabled);
        assert_eq!(remote.pushed.lock().unwrap().len(), 2);
    }
}
