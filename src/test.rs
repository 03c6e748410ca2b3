#![cfg(test)]
use soroban_sdk::{
    contract, contracterror, contractimpl, symbol_short, testutils::Address as _,
    testutils::Events as _, testutils::Ledger as _, token, vec, Address, Env, IntoVal, Symbol,
    Val, Vec,
};

use crate::{RevenueToken, RevenueTokenClient, RevenueTokenError};

// ── helper ────────────────────────────────────────────────────

/// Helper: set up env + initialized client, return (env, client, admin, revenue asset).
fn setup(
    percent_claimable: u32,
    snapshot_interval: u32,
) -> (Env, RevenueTokenClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register_contract(None, RevenueToken);
    let client = RevenueTokenClient::new(&env, &contract_id);
    let admin = Address::generate(&env);
    let asset = env.register_stellar_asset_contract(admin.clone());
    client.initialize(&admin, &asset, &percent_claimable, &snapshot_interval);
    (env, client, admin, asset)
}

/// Send `amount` of revenue asset to `to` (typically the contract itself).
fn fund(env: &Env, asset: &Address, to: &Address, amount: i128) {
    token::StellarAssetClient::new(env, asset).mint(to, &amount);
}

fn asset_balance(env: &Env, asset: &Address, who: &Address) -> i128 {
    token::Client::new(env, asset).balance(who)
}

/// Topics and data of the latest event, which must come from the token contract.
fn last_event(env: &Env, client: &RevenueTokenClient) -> (Vec<Val>, Val) {
    let (contract, topics, data) = env.events().all().last().unwrap();
    assert_eq!(contract, client.address);
    (topics, data)
}

fn advance(env: &Env, ledgers: u32) {
    env.ledger().with_mut(|li| li.sequence_number += ledgers);
}

/// Two holders splitting a 1000 token supply 600/400.
fn two_holders(env: &Env, client: &RevenueTokenClient, admin: &Address) -> (Address, Address) {
    let a = Address::generate(env);
    let b = Address::generate(env);
    client.mint(admin, &a, &600);
    client.mint(admin, &b, &400);
    (a, b)
}

// ── snapshot ──────────────────────────────────────────────────

#[test]
fn snapshot_splits_new_revenue_between_claim_and_redeem_pools() {
    let (env, client, admin, asset) = setup(50, 0);
    two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);

    assert_eq!(client.pending_revenue(), 100);
    assert_eq!(client.snapshot(&admin), 1);
    assert_eq!(client.claimable_at_snapshot(&1), 50);
    assert_eq!(client.redeem_pool(), 50);
    assert_eq!(client.redeemed(), 0);
    assert_eq!(client.pending_revenue(), 0);
    assert_eq!(client.claim_pool(), 50);
}

#[test]
fn snapshot_rounding_dust_goes_to_redeem_pool() {
    let (env, client, admin, asset) = setup(33, 0);
    two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 10);

    client.snapshot(&admin);
    // 10 * 33 / 100 = 3
    assert_eq!(client.claimable_at_snapshot(&1), 3);
    assert_eq!(client.redeem_pool(), 7);
}

#[test]
fn snapshot_records_ledger_sequence() {
    let (env, client, admin, _asset) = setup(50, 0);
    env.ledger().with_mut(|li| li.sequence_number = 42);
    assert_eq!(client.last_snapshot_block(), None);

    client.snapshot(&admin);
    assert_eq!(client.last_snapshot_block(), Some(42));
}

#[test]
fn snapshot_is_rate_limited() {
    let (env, client, admin, _asset) = setup(50, 10);
    env.ledger().with_mut(|li| li.sequence_number = 100);
    assert_eq!(client.snapshot(&admin), 1);

    advance(&env, 10);
    assert_eq!(
        client.try_snapshot(&admin),
        Err(Ok(RevenueTokenError::RateLimited))
    );
    assert_eq!(client.current_snapshot_id(), 1);

    advance(&env, 1);
    assert_eq!(client.snapshot(&admin), 2);
}

#[test]
fn zero_interval_still_rejects_same_ledger_snapshot() {
    let (env, client, admin, _asset) = setup(50, 0);
    client.snapshot(&admin);
    assert_eq!(
        client.try_snapshot(&admin),
        Err(Ok(RevenueTokenError::RateLimited))
    );
    advance(&env, 1);
    assert_eq!(client.snapshot(&admin), 2);
}

#[test]
fn snapshot_emits_event() {
    let (env, client, admin, asset) = setup(50, 0);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    let (topics, data) = last_event(&env, &client);
    let name: Symbol = topics.get(0).unwrap().into_val(&env);
    let snapshot_id: u32 = topics.get(1).unwrap().into_val(&env);
    let payload: (i128, i128, i128) = data.into_val(&env);
    assert_eq!(name, symbol_short!("snapshot"));
    assert_eq!(snapshot_id, 1);
    // new revenue, claimable, pooled
    assert_eq!(payload, (100, 50, 50));
}

#[test]
fn snapshot_without_revenue_allocates_nothing() {
    let (env, client, admin, _asset) = setup(50, 0);
    two_holders(&env, &client, &admin);
    client.snapshot(&admin);
    assert_eq!(client.claimable_at_snapshot(&1), 0);
    assert_eq!(client.redeem_pool(), 0);
}

// ── claim ─────────────────────────────────────────────────────

#[test]
fn scenario_claim_then_burn_from_pool() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(client.claimable_revenue(&a, &1), 30);
    assert_eq!(client.claim(&a, &1), 30);
    assert_eq!(asset_balance(&env, &asset, &a), 30);
    assert_eq!(client.claimed_at_snapshot(&1), 30);

    // No new revenue since the snapshot: the burn is paid from the pool only.
    assert_eq!(client.redeemable_on_burn(&400), 20);
    assert_eq!(client.burn(&b, &400), 20);
    assert_eq!(asset_balance(&env, &asset, &b), 20);
    assert_eq!(client.redeem_pool(), 30);
    assert_eq!(client.total_supply(), 600);
    assert_eq!(client.balance(&b), 0);

    // Snapshot balances are unaffected by the burn.
    assert_eq!(client.claim(&b, &1), 20);
    assert_eq!(asset_balance(&env, &asset, &client.address), 30);
    assert_eq!(client.pending_revenue(), 0);
}

#[test]
fn claim_emits_event() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    client.claim(&a, &1);

    let (topics, data) = last_event(&env, &client);
    let name: Symbol = topics.get(0).unwrap().into_val(&env);
    let holder: Address = topics.get(1).unwrap().into_val(&env);
    let payload: (u32, i128) = data.into_val(&env);
    assert_eq!(name, symbol_short!("claim"));
    assert_eq!(holder, a);
    assert_eq!(payload, (1, 30));
}

#[test]
fn claim_is_proportional_to_snapshot_balance() {
    let (env, client, admin, asset) = setup(100, 0);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &333);
    client.mint(&admin, &b, &667);
    fund(&env, &asset, &client.address, 50);
    client.snapshot(&admin);

    // floor(333 * 50 / 1000) and floor(667 * 50 / 1000)
    assert_eq!(client.claim(&a, &1), 16);
    assert_eq!(client.claim(&b, &1), 33);
    assert_eq!(client.claimed_at_snapshot(&1), 49);
}

#[test]
fn claim_uses_balance_at_snapshot_not_live_balance() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    client.transfer(&a, &b, &600);
    assert_eq!(client.claimable_revenue(&a, &1), 30);
    assert_eq!(client.claimable_revenue(&b, &1), 20);
}

#[test]
fn claim_twice_fails_with_already_claimed() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    client.claim(&a, &1);
    assert!(client.has_claimed(&1, &a));
    assert_eq!(
        client.try_claim(&a, &1),
        Err(Ok(RevenueTokenError::AlreadyClaimed))
    );
    assert_eq!(
        client.try_claimable_revenue(&a, &1),
        Err(Ok(RevenueTokenError::AlreadyClaimed))
    );
    assert_eq!(asset_balance(&env, &asset, &a), 30);
}

#[test]
fn claim_with_zero_share_fails() {
    let (env, client, admin, asset) = setup(50, 0);
    two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    let outsider = Address::generate(&env);
    assert_eq!(client.claimable_revenue(&outsider, &1), 0);
    assert_eq!(
        client.try_claim(&outsider, &1),
        Err(Ok(RevenueTokenError::NothingToClaim))
    );
    assert!(!client.has_claimed(&1, &outsider));
}

#[test]
fn claim_unknown_snapshot_fails() {
    let (env, client, admin, _asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);

    assert_eq!(
        client.try_claim(&a, &0),
        Err(Ok(RevenueTokenError::InvalidSnapshotId))
    );
    assert_eq!(
        client.try_claim(&a, &1),
        Err(Ok(RevenueTokenError::InvalidSnapshotId))
    );
}

#[test]
fn claim_window_covers_two_latest_snapshots() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    advance(&env, 1);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(client.claimable_revenue(&a, &1), 30);
    assert_eq!(client.claimable_revenue(&a, &2), 30);

    advance(&env, 1);
    client.snapshot(&admin);
    assert_eq!(
        client.try_claimable_revenue(&a, &1),
        Err(Ok(RevenueTokenError::SnapshotExpired))
    );
    assert_eq!(
        client.try_claim(&a, &1),
        Err(Ok(RevenueTokenError::SnapshotExpired))
    );
    assert_eq!(client.claimable_revenue(&a, &2), 30);
}

#[test]
fn unclaimed_revenue_is_folded_forward() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    advance(&env, 1);
    client.snapshot(&admin);
    assert_eq!(client.claimable_at_snapshot(&2), 0);

    advance(&env, 1);
    fund(&env, &asset, &client.address, 20);
    client.snapshot(&admin);

    // 20 new: 10 claimable, plus the untouched 50 from snapshot 1.
    assert_eq!(client.claimable_at_snapshot(&3), 60);
    assert_eq!(client.redeem_pool(), 60);
    assert_eq!(client.claim(&a, &3), 36);
}

#[test]
fn partially_claimed_snapshot_folds_only_remainder() {
    let (env, client, admin, asset) = setup(100, 0);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &333);
    client.mint(&admin, &b, &667);
    fund(&env, &asset, &client.address, 50);
    client.snapshot(&admin);
    client.claim(&a, &1);
    client.claim(&b, &1);

    advance(&env, 1);
    client.snapshot(&admin);
    advance(&env, 1);
    client.snapshot(&admin);

    // Only the rounding dust of snapshot 1 is left to carry.
    assert_eq!(client.claimable_at_snapshot(&3), 1);
    assert_eq!(client.redeem_pool(), 0);
    assert_eq!(client.pending_revenue(), 0);
}

#[test]
fn zero_supply_snapshot_claims_nothing() {
    let (env, client, admin, asset) = setup(50, 0);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    let a = Address::generate(&env);
    assert_eq!(client.claimable_revenue(&a, &1), 0);
}

// ── claim_batch ───────────────────────────────────────────────

#[test]
fn claim_batch_pays_every_snapshot() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    advance(&env, 1);
    fund(&env, &asset, &client.address, 200);
    client.snapshot(&admin);

    let total = client.claim_batch(&a, &vec![&env, 1u32, 2u32]);
    assert_eq!(total, 30 + 60);
    assert!(client.has_claimed(&1, &a));
    assert!(client.has_claimed(&2, &a));
    assert_eq!(asset_balance(&env, &asset, &a), 90);
}

#[test]
fn claim_batch_failure_rolls_back_earlier_claims() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    advance(&env, 1);
    // No revenue for snapshot 2, so claiming it fails.
    client.snapshot(&admin);

    assert_eq!(
        client.try_claim_batch(&a, &vec![&env, 1u32, 2u32]),
        Err(Ok(RevenueTokenError::NothingToClaim))
    );
    assert!(!client.has_claimed(&1, &a));
    assert_eq!(client.claimed_at_snapshot(&1), 0);
    assert_eq!(asset_balance(&env, &asset, &a), 0);

    assert_eq!(client.claim_batch(&a, &vec![&env, 1u32]), 30);
}

#[test]
fn claim_batch_rejects_duplicate_ids() {
    let (env, client, admin, asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(
        client.try_claim_batch(&a, &vec![&env, 1u32, 1u32]),
        Err(Ok(RevenueTokenError::AlreadyClaimed))
    );
    assert!(!client.has_claimed(&1, &a));
}

#[test]
fn claim_batch_empty_pays_nothing() {
    let (env, client, admin, _asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    assert_eq!(client.claim_batch(&a, &Vec::new(&env)), 0);
}

#[test]
fn claim_batch_exceeding_max_is_rejected() {
    let (env, client, admin, _asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    let mut ids = Vec::new(&env);
    for i in 0..51u32 {
        ids.push_back(i + 1);
    }
    assert_eq!(
        client.try_claim_batch(&a, &ids),
        Err(Ok(RevenueTokenError::BatchTooLarge))
    );
}

// ── burn ──────────────────────────────────────────────────────

#[test]
fn burn_redeems_from_new_revenue_and_pool() {
    let (env, client, admin, asset) = setup(50, 0);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &500);
    client.mint(&admin, &b, &500);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    fund(&env, &asset, &client.address, 40);

    // new revenue 40, half unclaimable: 500 * 20 / 1000 + 500 * 50 / 1000
    assert_eq!(client.redeemable_on_burn(&500), 35);
    assert_eq!(client.burn(&b, &500), 35);
    assert_eq!(client.redeemed(), 10);
    assert_eq!(client.redeem_pool(), 25);

    advance(&env, 1);
    client.snapshot(&admin);
    assert_eq!(client.redeemed(), 0);
    assert_eq!(client.claimable_at_snapshot(&2), 20);
    // 40 new - 20 claimable - 10 already redeemed
    assert_eq!(client.redeem_pool(), 35);

    assert_eq!(client.claim(&a, &1), 25);
    assert_eq!(client.claim(&a, &2), 20);
    assert_eq!(asset_balance(&env, &asset, &client.address), 60);
    assert_eq!(client.redeem_pool() + client.claim_pool(), 60);
}

#[test]
fn burn_emits_redeem_event() {
    let (env, client, admin, asset) = setup(50, 0);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &500);
    client.mint(&admin, &b, &500);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);
    fund(&env, &asset, &client.address, 40);
    client.burn(&b, &500);

    let (topics, data) = last_event(&env, &client);
    let name: Symbol = topics.get(0).unwrap().into_val(&env);
    let holder: Address = topics.get(1).unwrap().into_val(&env);
    let payload: (i128, i128, i128) = data.into_val(&env);
    assert_eq!(name, symbol_short!("redeem"));
    assert_eq!(holder, b);
    // burned, from new revenue, from pool
    assert_eq!(payload, (500, 10, 25));
}

#[test]
fn successive_burns_share_new_revenue_fairly() {
    let (env, client, admin, asset) = setup(0, 0);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &500);
    client.mint(&admin, &b, &500);
    fund(&env, &asset, &client.address, 100);

    assert_eq!(client.burn(&a, &500), 50);
    assert_eq!(client.redeemed(), 50);
    assert_eq!(client.pending_revenue(), 100);
    assert_eq!(client.redeemable_on_burn(&500), 50);
    assert_eq!(client.burn(&b, &500), 50);
    assert_eq!(asset_balance(&env, &asset, &client.address), 0);
}

#[test]
fn burn_more_than_balance_fails() {
    let (env, client, admin, asset) = setup(50, 0);
    let (_a, b) = two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(
        client.try_burn(&b, &401),
        Err(Ok(RevenueTokenError::InsufficientBalance))
    );
    assert_eq!(client.balance(&b), 400);
    assert_eq!(client.redeem_pool(), 50);
}

#[test]
fn burn_zero_fails() {
    let (env, client, admin, _asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    assert_eq!(
        client.try_burn(&a, &0),
        Err(Ok(RevenueTokenError::InvalidAmount))
    );
}

#[test]
fn burn_without_revenue_pays_nothing() {
    let (env, client, admin, _asset) = setup(50, 0);
    let (a, _b) = two_holders(&env, &client, &admin);
    assert_eq!(client.burn(&a, &100), 0);
    assert_eq!(client.balance(&a), 500);
    assert_eq!(client.total_supply(), 900);
}

#[test]
fn redeemable_on_burn_does_not_mutate_state() {
    let (env, client, admin, asset) = setup(50, 0);
    two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(client.redeemable_on_burn(&1000), 50);
    assert_eq!(client.redeem_pool(), 50);
    assert_eq!(client.redeemed(), 0);
}

#[test]
fn redeemable_on_burn_rejects_more_than_supply() {
    let (env, client, admin, asset) = setup(50, 0);
    two_holders(&env, &client, &admin);
    fund(&env, &asset, &client.address, 100);
    client.snapshot(&admin);

    assert_eq!(
        client.try_redeemable_on_burn(&1001),
        Err(Ok(RevenueTokenError::InsufficientBalance))
    );
    assert_eq!(
        client.try_redeemable_on_burn(&5000),
        Err(Ok(RevenueTokenError::InsufficientBalance))
    );
    assert_eq!(client.redeemable_on_burn(&0), 0);
}

// ── payout failure ────────────────────────────────────────────

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum RejectingAssetError {
    Rejected = 1,
}

/// Revenue asset that reports a balance but refuses every transfer.
#[contract]
pub struct RejectingAsset;

#[contractimpl]
impl RejectingAsset {
    pub fn set_balance(env: Env, amount: i128) {
        env.storage().instance().set(&symbol_short!("balance"), &amount);
    }

    pub fn balance(env: Env, _id: Address) -> i128 {
        env.storage()
            .instance()
            .get(&symbol_short!("balance"))
            .unwrap_or(0)
    }

    pub fn transfer(
        _env: Env,
        _from: Address,
        _to: Address,
        _amount: i128,
    ) -> Result<(), RejectingAssetError> {
        Err(RejectingAssetError::Rejected)
    }
}

fn rejecting_setup() -> (Env, RevenueTokenClient<'static>, Address, Address) {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register_contract(None, RevenueToken);
    let client = RevenueTokenClient::new(&env, &contract_id);
    let admin = Address::generate(&env);
    let asset_id = env.register_contract(None, RejectingAsset);
    RejectingAssetClient::new(&env, &asset_id).set_balance(&100);
    client.initialize(&admin, &asset_id, &50, &0);

    let holder = Address::generate(&env);
    client.mint(&admin, &holder, &1000);
    client.snapshot(&admin);
    (env, client, admin, holder)
}

#[test]
fn failed_claim_payout_reverts_claim() {
    let (_env, client, _admin, holder) = rejecting_setup();
    assert_eq!(client.claimable_revenue(&holder, &1), 50);

    assert_eq!(
        client.try_claim(&holder, &1),
        Err(Ok(RevenueTokenError::TransferFailed))
    );
    assert!(!client.has_claimed(&1, &holder));
    assert_eq!(client.claimed_at_snapshot(&1), 0);
}

#[test]
fn failed_burn_payout_reverts_burn() {
    let (_env, client, _admin, holder) = rejecting_setup();

    assert_eq!(
        client.try_burn(&holder, &500),
        Err(Ok(RevenueTokenError::TransferFailed))
    );
    assert_eq!(client.balance(&holder), 1000);
    assert_eq!(client.total_supply(), 1000);
    assert_eq!(client.redeem_pool(), 50);
}

#[test]
fn snapshot_detects_unmodelled_balance_loss() {
    let (env, client, admin, _holder) = rejecting_setup();
    let asset = client.get_config().revenue_asset;
    RejectingAssetClient::new(&env, &asset).set_balance(&40);

    advance(&env, 1);
    assert_eq!(
        client.try_snapshot(&admin),
        Err(Ok(RevenueTokenError::ArithmeticInvariantViolation))
    );
    assert_eq!(
        client.try_pending_revenue(),
        Err(Ok(RevenueTokenError::ArithmeticInvariantViolation))
    );
    assert_eq!(client.current_snapshot_id(), 1);
}
