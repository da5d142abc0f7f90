use proptest::prelude::*;
use std::sync::Arc;

use citadel_anchor::AnchorLedger;
use citadel_nullables::NullClock;
use citadel_types::{EntityHash, EventBus, PrincipalId};

#[derive(Clone, Debug)]
enum Op {
    Milestone(u8),
    Anchor { milestone: u8, content: u8 },
    Link { milestone: u8, content: u8 },
    Seal { milestone: u8, content: u8 },
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0u8..6).prop_map(Op::Milestone),
        (0u8..6, 1u8..30).prop_map(|(milestone, content)| Op::Anchor { milestone, content }),
        (0u8..6, 1u8..30).prop_map(|(milestone, content)| Op::Link { milestone, content }),
        (0u8..6, 1u8..30).prop_map(|(milestone, content)| Op::Seal { milestone, content }),
    ]
}

fn hash(b: u8) -> EntityHash {
    EntityHash::new([b; 32])
}

proptest! {
    /// Once created, an anchor verifies in every later state, and sealed
    /// milestones never change their linked set.
    #[test]
    fn anchors_are_permanent(ops in prop::collection::vec(op(), 1..60)) {
        let user = PrincipalId::new("user");
        let sealer = PrincipalId::new("sealer");
        let ledger = AnchorLedger::new(
            PrincipalId::new("owner"),
            vec![sealer.clone()],
            Arc::new(NullClock::new(0)),
            Arc::new(EventBus::new()),
        )
        .unwrap();

        let mut milestones: Vec<Option<EntityHash>> = vec![None; 6];
        let mut created: Vec<EntityHash> = Vec::new();
        let mut frozen: Vec<(EntityHash, Vec<EntityHash>)> = Vec::new();

        for op in ops {
            match op {
                Op::Milestone(slot) => {
                    if let Ok(id) = ledger.create_milestone(&user, &format!("m{slot}"), hash(slot + 100), "") {
                        milestones[slot as usize] = Some(id);
                    }
                }
                Op::Anchor { milestone, content } => {
                    if let Some(m) = milestones[milestone as usize] {
                        if ledger.create_anchor(&user, &m, "doc", hash(content)).is_ok() {
                            created.push(hash(content));
                        }
                    }
                }
                Op::Link { milestone, content } => {
                    if let Some(m) = milestones[milestone as usize] {
                        let _ = ledger.link_anchor(&user, &m, &hash(content));
                    }
                }
                Op::Seal { milestone, content } => {
                    if let Some(m) = milestones[milestone as usize] {
                        if ledger.seal_milestone(&sealer, &m, &hash(content)).is_ok() {
                            frozen.push((m, ledger.anchors_of(&m)));
                        }
                    }
                }
            }
            for anchor in &created {
                prop_assert!(ledger.verify_anchor(anchor));
            }
            for (m, linked) in &frozen {
                prop_assert_eq!(&ledger.anchors_of(m), linked);
            }
        }
        prop_assert_eq!(ledger.anchor_count(), created.len());
    }
}
