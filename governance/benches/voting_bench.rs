use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::collections::BTreeMap;

use agora_governance::{Balances, GovernanceEngine, ProposalAction, ProposalDraft, VoteSelection};
use agora_types::{AccountId, ProtocolParams, Timestamp};

struct Flat;

impl Balances for Flat {
    fn balance_of(&self, _account: &AccountId) -> u128 {
        10_000
    }
    fn total_supply(&self) -> u128 {
        u64::MAX as u128
    }
}

fn setup() -> (GovernanceEngine, agora_types::ProposalId) {
    let mut engine = GovernanceEngine::new(None);
    let draft = ProposalDraft::new(
        "Bench",
        "Bench proposal",
        &ProposalAction::EmergencyPause { paused: true },
    )
    .unwrap()
    .with_options(["a", "b", "c", "d", "e", "f"]);
    let id = engine
        .create_proposal(
            &AccountId::new("proposer"),
            &draft,
            &Flat,
            &ProtocolParams::standard(),
            Timestamp::new(0),
        )
        .unwrap();
    (engine, id)
}

fn selection(mode: &str, i: usize) -> VoteSelection {
    match mode {
        "standard" => VoteSelection::Standard { support: i % 2 == 0 },
        "quadratic" => VoteSelection::Quadratic {
            option: (i % 8) as u16,
            weight: 100,
        },
        "weighted" => VoteSelection::Weighted {
            allocations: BTreeMap::from([(0, 5_000), ((i % 7 + 1) as u16, 5_000)]),
        },
        _ => {
            let mut ranking: Vec<u16> = (0..8).collect();
            ranking.rotate_left(i % 8);
            VoteSelection::Ranked { ranking }
        }
    }
}

fn bench_cast_votes(c: &mut Criterion) {
    let mut group = c.benchmark_group("cast_votes");
    for mode in ["standard", "quadratic", "weighted", "ranked"] {
        for voters in [100usize, 1_000] {
            let ballots: Vec<(AccountId, VoteSelection)> = (0..voters)
                .map(|i| (AccountId::new(format!("v{i}")), selection(mode, i)))
                .collect();
            group.bench_with_input(BenchmarkId::new(mode, voters), &ballots, |b, ballots| {
                b.iter(|| {
                    let (mut engine, id) = setup();
                    for (voter, sel) in ballots {
                        engine
                            .vote(id, voter, sel.clone(), &Flat, Timestamp::new(1))
                            .unwrap();
                    }
                    black_box(engine.proposal(id).map(|p| p.tally.participation()))
                });
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_cast_votes);
criterion_main!(benches);
