#![cfg(test)]
use soroban_sdk::{testutils::Address as _, testutils::Ledger as _, Address, Env};

use crate::{RevenueToken, RevenueTokenClient, RevenueTokenError};

fn setup() -> (Env, RevenueTokenClient<'static>, Address) {
    let env = Env::default();
    env.mock_all_auths();
    let contract_id = env.register_contract(None, RevenueToken);
    let client = RevenueTokenClient::new(&env, &contract_id);
    let admin = Address::generate(&env);
    let asset = env.register_stellar_asset_contract(admin.clone());
    client.initialize(&admin, &asset, &50, &0);
    (env, client, admin)
}

/// Take a snapshot one ledger after the previous one.
fn next_snapshot(env: &Env, client: &RevenueTokenClient, admin: &Address) -> u32 {
    env.ledger().with_mut(|li| li.sequence_number += 1);
    client.snapshot(admin)
}

// ── balances ──────────────────────────────────────────────────

#[test]
fn mint_increases_balance_and_supply() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &250);
    client.mint(&admin, &a, &50);
    assert_eq!(client.balance(&a), 300);
    assert_eq!(client.total_supply(), 300);
}

#[test]
fn transfer_moves_balance() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &100);
    client.transfer(&a, &b, &40);
    assert_eq!(client.balance(&a), 60);
    assert_eq!(client.balance(&b), 40);
    assert_eq!(client.total_supply(), 100);
}

#[test]
fn transfer_to_self_is_noop() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &100);
    client.transfer(&a, &a, &100);
    assert_eq!(client.balance(&a), 100);
}

#[test]
fn transfer_more_than_balance_fails() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &100);
    assert_eq!(
        client.try_transfer(&a, &b, &101),
        Err(Ok(RevenueTokenError::InsufficientBalance))
    );
}

#[test]
fn non_positive_amounts_are_rejected() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    assert_eq!(
        client.try_mint(&admin, &a, &0),
        Err(Ok(RevenueTokenError::InvalidAmount))
    );
    assert_eq!(
        client.try_transfer(&a, &b, &-5),
        Err(Ok(RevenueTokenError::InvalidAmount))
    );
}

// ── snapshots ─────────────────────────────────────────────────

#[test]
fn snapshot_ids_start_at_one_and_increase() {
    let (env, client, admin) = setup();
    assert_eq!(client.current_snapshot_id(), 0);
    assert_eq!(next_snapshot(&env, &client, &admin), 1);
    assert_eq!(next_snapshot(&env, &client, &admin), 2);
    assert_eq!(client.current_snapshot_id(), 2);
}

#[test]
fn balance_of_at_tracks_history() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &100);
    next_snapshot(&env, &client, &admin);
    client.transfer(&a, &b, &40);
    next_snapshot(&env, &client, &admin);
    client.transfer(&b, &a, &10);

    assert_eq!(client.balance_of_at(&a, &1), 100);
    assert_eq!(client.balance_of_at(&b, &1), 0);
    assert_eq!(client.balance_of_at(&a, &2), 60);
    assert_eq!(client.balance_of_at(&b, &2), 40);
    assert_eq!(client.balance(&a), 70);
    assert_eq!(client.balance(&b), 30);
}

#[test]
fn untouched_balance_resolves_to_live_value() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &100);
    next_snapshot(&env, &client, &admin);
    next_snapshot(&env, &client, &admin);
    assert_eq!(client.balance_of_at(&a, &1), 100);
    assert_eq!(client.balance_of_at(&a, &2), 100);
}

#[test]
fn checkpoint_covers_all_snapshots_before_first_change() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    client.mint(&admin, &a, &100);
    next_snapshot(&env, &client, &admin);
    next_snapshot(&env, &client, &admin);
    next_snapshot(&env, &client, &admin);
    client.transfer(&a, &b, &100);

    assert_eq!(client.balance_of_at(&a, &1), 100);
    assert_eq!(client.balance_of_at(&a, &2), 100);
    assert_eq!(client.balance_of_at(&a, &3), 100);
    assert_eq!(client.balance_of_at(&b, &3), 0);
    assert_eq!(client.balance(&a), 0);
}

#[test]
fn total_supply_at_ignores_later_mints_and_burns() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &100);
    next_snapshot(&env, &client, &admin);
    client.mint(&admin, &a, &50);
    next_snapshot(&env, &client, &admin);
    client.burn(&a, &30);

    assert_eq!(client.total_supply_at(&1), 100);
    assert_eq!(client.total_supply_at(&2), 150);
    assert_eq!(client.total_supply(), 120);
}

#[test]
fn querying_untaken_snapshot_fails() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    assert_eq!(
        client.try_total_supply_at(&0),
        Err(Ok(RevenueTokenError::InvalidSnapshotId))
    );
    next_snapshot(&env, &client, &admin);
    assert_eq!(
        client.try_balance_of_at(&a, &2),
        Err(Ok(RevenueTokenError::InvalidSnapshotId))
    );
    assert_eq!(client.balance_of_at(&a, &1), 0);
}

// ── cross-domain transfers ────────────────────────────────────

#[test]
fn bridge_out_burns_and_assigns_nonces() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &100);

    assert_eq!(client.bridge_out(&a, &30, &7), 1);
    assert_eq!(client.bridge_out(&a, &20, &7), 2);
    assert_eq!(client.balance(&a), 50);
    assert_eq!(client.total_supply(), 50);
}

#[test]
fn bridge_out_more_than_balance_fails() {
    let (env, client, admin) = setup();
    let a = Address::generate(&env);
    client.mint(&admin, &a, &10);
    assert_eq!(
        client.try_bridge_out(&a, &11, &7),
        Err(Ok(RevenueTokenError::InsufficientBalance))
    );
}

#[test]
fn bridge_in_credits_once_per_message() {
    let (env, client, admin) = setup();
    let bridge = Address::generate(&env);
    let a = Address::generate(&env);
    client.set_bridge(&admin, &bridge);
    assert_eq!(client.get_bridge(), Some(bridge));

    client.bridge_in(&a, &75, &3, &1);
    assert_eq!(client.balance(&a), 75);
    assert_eq!(client.total_supply(), 75);

    assert_eq!(
        client.try_bridge_in(&a, &75, &3, &1),
        Err(Ok(RevenueTokenError::BridgeMessageProcessed))
    );
    // Same nonce from another domain is a different message.
    client.bridge_in(&a, &5, &4, &1);
    assert_eq!(client.balance(&a), 80);
}

#[test]
fn bridge_in_without_bridge_fails() {
    let (env, client, _admin) = setup();
    let a = Address::generate(&env);
    assert_eq!(
        client.try_bridge_in(&a, &75, &3, &1),
        Err(Ok(RevenueTokenError::BridgeNotConfigured))
    );
}

#[test]
fn bridged_in_tokens_are_snapshotted() {
    let (env, client, admin) = setup();
    let bridge = Address::generate(&env);
    let a = Address::generate(&env);
    client.set_bridge(&admin, &bridge);
    client.bridge_in(&a, &40, &3, &1);
    next_snapshot(&env, &client, &admin);
    client.bridge_in(&a, &60, &3, &2);

    assert_eq!(client.balance_of_at(&a, &1), 40);
    assert_eq!(client.total_supply_at(&1), 40);
    assert_eq!(client.balance(&a), 100);
}
