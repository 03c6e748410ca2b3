#![cfg(test)]
extern crate std;

use arbitrary::{Arbitrary, Unstructured};
use soroban_sdk::{testutils::Address as _, testutils::Ledger as _, token, vec, Address, Env};

use crate::{RevenueToken, RevenueTokenClient, CLAIMABLE_WINDOW};

const OPS_PER_RUN: usize = 150;

#[derive(Arbitrary, Debug)]
enum Op {
    Deposit(u16),
    Snapshot,
    Claim { holder: u8, lag: u8 },
    ClaimBatch { holder: u8 },
    Burn { holder: u8, amount: u16 },
    Transfer { from: u8, to: u8, amount: u16 },
    Mint { holder: u8, amount: u16 },
    BridgeOut { holder: u8, amount: u16 },
}

/// Deterministic xorshift byte stream so failures reproduce from the seed.
fn seeded_bytes(seed: u64) -> [u8; 4096] {
    let mut state = seed.max(1);
    let mut out = [0u8; 4096];
    for byte in out.iter_mut() {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        *byte = (state >> 24) as u8;
    }
    out
}

struct Harness {
    env: Env,
    client: RevenueTokenClient<'static>,
    admin: Address,
    asset: Address,
    holders: [Address; 3],
    deposited: i128,
    paid: i128,
}

impl Harness {
    fn new(percent_claimable: u32) -> Self {
        let env = Env::default();
        env.mock_all_auths();
        env.budget().reset_unlimited();
        let contract_id = env.register_contract(None, RevenueToken);
        let client = RevenueTokenClient::new(&env, &contract_id);
        let admin = Address::generate(&env);
        let asset = env.register_stellar_asset_contract(admin.clone());
        client.initialize(&admin, &asset, &percent_claimable, &0);

        let holders = [
            Address::generate(&env),
            Address::generate(&env),
            Address::generate(&env),
        ];
        for (i, holder) in holders.iter().enumerate() {
            client.mint(&admin, holder, &(1_000 * (i as i128 + 1)));
        }
        Harness {
            env,
            client,
            admin,
            asset,
            holders,
            deposited: 0,
            paid: 0,
        }
    }

    fn holder(&self, index: u8) -> Address {
        self.holders[index as usize % self.holders.len()].clone()
    }

    fn apply(&mut self, op: Op) {
        let client = &self.client;
        match op {
            Op::Deposit(amount) => {
                let amount = amount as i128;
                token::StellarAssetClient::new(&self.env, &self.asset)
                    .mint(&client.address, &amount);
                self.deposited += amount;
            }
            Op::Snapshot => {
                self.env.ledger().with_mut(|li| li.sequence_number += 1);
                let _ = client.try_snapshot(&self.admin);
            }
            Op::Claim { holder, lag } => {
                let current = client.current_snapshot_id();
                let lag = lag as u32 % (CLAIMABLE_WINDOW + 1);
                if current > lag {
                    let result = client.try_claim(&self.holder(holder), &(current - lag));
                    if let Ok(Ok(amount)) = result {
                        self.paid += amount;
                    }
                }
            }
            Op::ClaimBatch { holder } => {
                let current = client.current_snapshot_id();
                if current >= 2 {
                    let ids = vec![&self.env, current - 1, current];
                    if let Ok(Ok(amount)) = client.try_claim_batch(&self.holder(holder), &ids) {
                        self.paid += amount;
                    }
                }
            }
            Op::Burn { holder, amount } => {
                let holder = self.holder(holder);
                let amount = amount as i128 % (client.balance(&holder) + 1);
                if amount > 0 {
                    let quoted = client.redeemable_on_burn(&amount);
                    let paid = client.burn(&holder, &amount);
                    assert_eq!(paid, quoted);
                    self.paid += paid;
                }
            }
            Op::Transfer { from, to, amount } => {
                let (from, to) = (self.holder(from), self.holder(to));
                let _ = client.try_transfer(&from, &to, &(amount as i128));
            }
            Op::Mint { holder, amount } => {
                let _ = client.try_mint(&self.admin, &self.holder(holder), &(amount as i128));
            }
            Op::BridgeOut { holder, amount } => {
                let _ = client.try_bridge_out(&self.holder(holder), &(amount as i128), &1);
            }
        }
    }

    fn check_invariants(&self) {
        let client = &self.client;
        let held = token::Client::new(&self.env, &self.asset).balance(&client.address);

        assert!(self.paid <= self.deposited);
        assert_eq!(held, self.deposited - self.paid);
        assert!(client.redeem_pool() >= 0);
        assert!(client.redeemed() >= 0);
        assert!(client.pending_revenue() >= 0);
        assert!(client.claim_pool() >= 0);
        assert!(client.redeem_pool() + client.claim_pool() <= held + client.redeemed());

        for snapshot_id in 1..=client.current_snapshot_id() {
            assert!(
                client.claimed_at_snapshot(&snapshot_id)
                    <= client.claimable_at_snapshot(&snapshot_id)
            );
        }
    }
}

fn run(seed: u64, percent_claimable: u32) {
    let data = seeded_bytes(seed);
    let mut u = Unstructured::new(&data);
    let mut harness = Harness::new(percent_claimable);

    for _ in 0..OPS_PER_RUN {
        let op = match Op::arbitrary(&mut u) {
            Ok(op) => op,
            Err(_) => break,
        };
        harness.apply(op);
        harness.check_invariants();
    }
}

#[test]
fn conservation_holds_for_half_claimable() {
    for seed in 1..=4 {
        run(seed, 50);
    }
}

#[test]
fn conservation_holds_for_uneven_split() {
    for seed in 11..=14 {
        run(seed, 37);
    }
}

#[test]
fn conservation_holds_at_extremes() {
    run(21, 0);
    run(22, 100);
}

#[test]
fn everything_can_be_paid_out() {
    let mut harness = Harness::new(50);
    harness.apply(Op::Deposit(1_000));
    harness.apply(Op::Snapshot);
    for holder in 0..3 {
        harness.apply(Op::Claim { holder, lag: 0 });
    }
    for holder in harness.holders.clone().iter() {
        let balance = harness.client.balance(holder);
        harness.paid += harness.client.burn(holder, &balance);
    }
    harness.check_invariants();

    // Everyone exited: only rounding dust can remain.
    let held = token::Client::new(&harness.env, &harness.asset)
        .balance(&harness.client.address);
    assert_eq!(harness.client.total_supply(), 0);
    assert!(held <= 3);
}
