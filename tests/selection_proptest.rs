//! Property tests for selection order
//!
//! Generates random provider tables, policies and per-model outcomes, then
//! compares the selector's attempts log against a direct walk of the two
//! passes. Also checks the eligibility, exhaustion and fallback properties
//! on every generated case.

mod common;

use common::{Script, ScriptedAdapter, new_call_log, provider, summarize};
use llm_failover::{
    ModelConfig, Phase, Policy, ProbeRegistry, ProviderConfig, ProviderId, SelectionError,
    SelectorOptions,
};
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const MODEL_POOL: usize = 5;

fn model_name(index: usize) -> String {
    format!("m{}", index)
}

/// Generated state of one provider
#[derive(Debug, Clone)]
struct ProviderCase {
    eligible: bool,
    listed: bool,
    configured: Vec<(usize, bool)>,
    preferred: Vec<usize>,
    succeeds: Vec<bool>,
}

fn arb_provider_case() -> impl Strategy<Value = ProviderCase> {
    let pool: Vec<usize> = (0..MODEL_POOL).collect();
    (
        any::<bool>(),
        any::<bool>(),
        proptest::sample::subsequence(pool.clone(), 0..=3)
            .prop_flat_map(|models| {
                let n = models.len();
                (Just(models), proptest::collection::vec(any::<bool>(), n))
            })
            .prop_map(|(models, active)| {
                models.into_iter().zip(active).collect::<Vec<(usize, bool)>>()
            }),
        proptest::sample::subsequence(pool, 0..=2),
        // Mostly failures so both passes get exercised
        proptest::collection::vec(proptest::bool::weighted(0.2), MODEL_POOL),
    )
        .prop_map(|(eligible, listed, configured, preferred, succeeds)| ProviderCase {
            eligible,
            listed,
            configured,
            preferred,
            succeeds,
        })
}

fn arb_world() -> impl Strategy<Value = (Vec<ProviderId>, Vec<ProviderCase>)> {
    (
        Just(ProviderId::ALL.to_vec()).prop_shuffle(),
        proptest::collection::vec(arb_provider_case(), ProviderId::ALL.len()),
    )
}

struct World {
    policy: Policy,
    configs: Vec<ProviderConfig>,
    cases: HashMap<ProviderId, ProviderCase>,
}

fn build_world(shuffled: Vec<ProviderId>, cases: Vec<ProviderCase>) -> World {
    let cases: HashMap<ProviderId, ProviderCase> =
        ProviderId::ALL.iter().copied().zip(cases).collect();

    let priority: Vec<ProviderId> = shuffled
        .into_iter()
        .filter(|p| cases[p].listed)
        .collect();
    let preferred: HashMap<ProviderId, Vec<String>> = priority
        .iter()
        .map(|p| (*p, cases[p].preferred.iter().map(|i| model_name(*i)).collect()))
        .collect();
    let policy = Policy::new(priority, preferred).expect("generated policy is valid");

    // Store order is ProviderId::ALL order
    let configs = ProviderId::ALL
        .iter()
        .map(|p| {
            let case = &cases[p];
            let mut config = provider(*p, case.eligible, &[]);
            config.models = case
                .configured
                .iter()
                .map(|(i, active)| ModelConfig::new(model_name(*i), *active))
                .collect();
            config
        })
        .collect();

    World {
        policy,
        configs,
        cases,
    }
}

type Expected = Vec<(ProviderId, String, bool)>;

/// Record `models` of `provider` in order until one succeeds
fn walk_models(
    world: &World,
    provider: ProviderId,
    models: &[usize],
    attempts: &mut Expected,
    attempted: &mut HashSet<(ProviderId, usize)>,
) -> bool {
    for &i in models {
        if !attempted.insert((provider, i)) {
            continue;
        }
        let ok = world.cases[&provider].succeeds[i];
        attempts.push((provider, model_name(i), ok));
        if ok {
            return true;
        }
    }
    false
}

/// Attempts the two passes should make, and the winning phase if any
fn expected_walk(world: &World) -> (Expected, Option<Phase>) {
    let mut attempts = Vec::new();
    let mut attempted = HashSet::new();

    let listed: Vec<ProviderId> = world.policy.priority().to_vec();
    let eligible_listed: Vec<ProviderId> = listed
        .iter()
        .copied()
        .filter(|p| world.cases[p].eligible)
        .collect();

    for &p in &eligible_listed {
        let preferred = world.cases[&p].preferred.clone();
        if walk_models(world, p, &preferred, &mut attempts, &mut attempted) {
            return (attempts, Some(Phase::Preferred));
        }
    }

    let all = ProviderId::ALL;
    let unlisted = all
        .iter()
        .copied()
        .filter(|p| !listed.contains(p) && world.cases[p].eligible);
    let exhaustive: Vec<ProviderId> = eligible_listed.iter().copied().chain(unlisted).collect();

    for p in exhaustive {
        let active: Vec<usize> = world.cases[&p]
            .configured
            .iter()
            .filter(|(_, active)| *active)
            .map(|(i, _)| *i)
            .collect();
        if walk_models(world, p, &active, &mut attempts, &mut attempted) {
            return (attempts, Some(Phase::Exhaustive));
        }
    }

    (attempts, None)
}

fn scripted(world: &World) -> ProbeRegistry {
    let log = new_call_log();
    ProviderId::ALL.iter().fold(ProbeRegistry::new(), |registry, p| {
        let scripts: Vec<(String, Script)> = (0..MODEL_POOL)
            .map(|i| {
                let script = if world.cases[p].succeeds[i] {
                    Script::Succeed
                } else {
                    Script::Fail(500)
                };
                (model_name(i), script)
            })
            .collect();
        let scripts: Vec<(&str, Script)> =
            scripts.iter().map(|(m, s)| (m.as_str(), *s)).collect();
        registry.with_adapter(*p, Arc::new(ScriptedAdapter::new(*p, &scripts, &log)))
    })
}

fn run(world: &World) -> Result<llm_failover::SelectionResult, SelectionError> {
    let selector = common::selector(
        world.configs.clone(),
        scripted(world),
        SelectorOptions {
            probe_timeout: Duration::from_secs(1),
            max_concurrent_probes: 1,
        },
    );
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("runtime");
    runtime.block_on(selector.select(&world.policy, &CancellationToken::new(), None))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_attempts_follow_policy_walk((shuffled, cases) in arb_world()) {
        let world = build_world(shuffled, cases);
        let (expected, winner_phase) = expected_walk(&world);

        match run(&world) {
            Ok(result) => {
                prop_assert_eq!(Some(result.winning_phase()), winner_phase);
                prop_assert_eq!(summarize(result.attempts()), expected);
            }
            Err(SelectionError::NoProviderAvailable { attempts }) => {
                prop_assert_eq!(winner_phase, None);
                prop_assert_eq!(summarize(&attempts), expected);
            }
            Err(SelectionError::NoProvidersConfigured { attempts }) => {
                prop_assert!(world.cases.values().all(|c| !c.eligible));
                prop_assert!(attempts.is_empty());
            }
            Err(other) => prop_assert!(false, "unexpected error {:?}", other),
        }
    }

    #[test]
    fn prop_ineligible_providers_never_attempted((shuffled, cases) in arb_world()) {
        let world = build_world(shuffled, cases);
        let attempts = match run(&world) {
            Ok(result) => result.attempts().to_vec(),
            Err(e) => e.attempts().to_vec(),
        };

        for attempt in &attempts {
            prop_assert!(
                world.cases[&attempt.provider()].eligible,
                "ineligible provider {} was attempted",
                attempt.provider()
            );
        }
    }

    #[test]
    fn prop_only_last_attempt_succeeds((shuffled, cases) in arb_world()) {
        let world = build_world(shuffled, cases);
        if let Ok(result) = run(&world) {
            let attempts = result.attempts();
            let (last, earlier) = attempts.split_last().expect("a winner has an attempt");
            prop_assert!(last.is_success());
            prop_assert_eq!(last.provider(), result.provider());
            prop_assert_eq!(last.model(), result.model());
            prop_assert!(earlier.iter().all(|a| !a.is_success()));
        }
    }

    #[test]
    fn prop_fallback_follows_priority_position((shuffled, cases) in arb_world()) {
        let world = build_world(shuffled, cases);
        if let Ok(result) = run(&world) {
            let primary = world
                .policy
                .priority_index(result.provider())
                .is_some_and(|i| i < llm_failover::policy::PRIMARY_TIER_SIZE);
            prop_assert_eq!(result.fallback_used(), !primary);
        }
    }
}
