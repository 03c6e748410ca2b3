#![cfg(test)]
use soroban_sdk::{testutils::Address as _, token, vec, Address, Env};

use crate::{
    RevenueConfig, RevenueToken, RevenueTokenClient, RevenueTokenError, CONTRACT_VERSION,
};

fn make_client(env: &Env) -> RevenueTokenClient<'_> {
    let id = env.register_contract(None, RevenueToken);
    RevenueTokenClient::new(env, &id)
}

/// Initialize with a fresh admin and revenue asset, mint 1000 tokens to a holder
/// and take one funded snapshot. Returns (admin, holder, asset).
fn init_with_snapshot(env: &Env, client: &RevenueTokenClient) -> (Address, Address, Address) {
    env.mock_all_auths();
    let admin = Address::generate(env);
    let asset = env.register_stellar_asset_contract(admin.clone());
    client.initialize(&admin, &asset, &50, &0);
    let holder = Address::generate(env);
    client.mint(&admin, &holder, &1000);
    token::StellarAssetClient::new(env, &asset).mint(&client.address, &100);
    client.snapshot(&admin);
    (admin, holder, asset)
}

// ── initialization ────────────────────────────────────────────

#[test]
fn initialize_stores_config() {
    let env = Env::default();
    env.mock_all_auths();
    let client = make_client(&env);
    let admin = Address::generate(&env);
    let asset = Address::generate(&env);
    client.initialize(&admin, &asset, &40, &720);

    assert_eq!(client.get_admin(), Some(admin));
    assert_eq!(
        client.get_config(),
        RevenueConfig {
            revenue_asset: asset,
            percent_claimable: 40,
            snapshot_interval: 720,
        }
    );
    assert!(!client.is_paused());
    assert_eq!(client.get_version(), CONTRACT_VERSION);
}

#[test]
fn initialize_twice_fails() {
    let env = Env::default();
    env.mock_all_auths();
    let client = make_client(&env);
    let admin = Address::generate(&env);
    let asset = Address::generate(&env);
    client.initialize(&admin, &asset, &50, &0);
    assert_eq!(
        client.try_initialize(&admin, &asset, &50, &0),
        Err(Ok(RevenueTokenError::AlreadyInitialized))
    );
}

#[test]
fn initialize_rejects_percent_over_100() {
    let env = Env::default();
    env.mock_all_auths();
    let client = make_client(&env);
    let admin = Address::generate(&env);
    let asset = Address::generate(&env);
    assert_eq!(
        client.try_initialize(&admin, &asset, &101, &0),
        Err(Ok(RevenueTokenError::InvalidConfig))
    );
    client.initialize(&admin, &asset, &100, &0);
}

#[test]
fn uninitialized_contract_reports_error() {
    let env = Env::default();
    env.mock_all_auths();
    let client = make_client(&env);
    let caller = Address::generate(&env);
    assert_eq!(client.get_admin(), None);
    assert_eq!(
        client.try_snapshot(&caller),
        Err(Ok(RevenueTokenError::NotInitialized))
    );
    assert_eq!(
        client.try_redeemable_on_burn(&1),
        Err(Ok(RevenueTokenError::NotInitialized))
    );
}

// ── admin-only operations ─────────────────────────────────────

#[test]
fn snapshot_by_non_admin_fails() {
    let env = Env::default();
    let client = make_client(&env);
    init_with_snapshot(&env, &client);
    let attacker = Address::generate(&env);
    assert_eq!(
        client.try_snapshot(&attacker),
        Err(Ok(RevenueTokenError::NotAuthorized))
    );
}

#[test]
fn mint_by_non_admin_fails() {
    let env = Env::default();
    let client = make_client(&env);
    let (_admin, holder, _asset) = init_with_snapshot(&env, &client);
    let attacker = Address::generate(&env);
    assert_eq!(
        client.try_mint(&attacker, &attacker, &1_000_000),
        Err(Ok(RevenueTokenError::NotAuthorized))
    );
    assert_eq!(client.total_supply(), 1000);
    assert_eq!(client.balance(&holder), 1000);
}

#[test]
fn set_bridge_by_non_admin_fails() {
    let env = Env::default();
    let client = make_client(&env);
    init_with_snapshot(&env, &client);
    let attacker = Address::generate(&env);
    assert_eq!(
        client.try_set_bridge(&attacker, &attacker),
        Err(Ok(RevenueTokenError::NotAuthorized))
    );
    assert_eq!(client.get_bridge(), None);
}

#[test]
fn pause_unauthorized() {
    let env = Env::default();
    let client = make_client(&env);
    let (admin, _holder, _asset) = init_with_snapshot(&env, &client);
    let attacker = Address::generate(&env);
    assert!(client.try_pause(&attacker).is_err());
    assert!(!client.is_paused());
    client.pause(&admin);
    assert!(client.is_paused());
    assert!(client.try_unpause(&attacker).is_err());
    assert!(client.is_paused());
    client.unpause(&admin);
    assert!(!client.is_paused());
}

// ── pause gating ──────────────────────────────────────────────

#[test]
fn paused_contract_blocks_state_changes() {
    let env = Env::default();
    let client = make_client(&env);
    let (admin, holder, _asset) = init_with_snapshot(&env, &client);
    let other = Address::generate(&env);
    client.pause(&admin);

    assert_eq!(
        client.try_claim(&holder, &1),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_claim_batch(&holder, &vec![&env, 1u32]),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_burn(&holder, &10),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_snapshot(&admin),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_mint(&admin, &holder, &1),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_transfer(&holder, &other, &1),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_bridge_out(&holder, &1, &2),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
    assert_eq!(
        client.try_deposit_revenue(&admin, &1),
        Err(Ok(RevenueTokenError::ContractPaused))
    );
}

#[test]
fn paused_contract_still_serves_views() {
    let env = Env::default();
    let client = make_client(&env);
    let (admin, holder, _asset) = init_with_snapshot(&env, &client);
    client.pause(&admin);

    assert_eq!(client.claimable_revenue(&holder, &1), 50);
    assert_eq!(client.redeemable_on_burn(&500), 25);
    assert_eq!(client.balance_of_at(&holder, &1), 1000);

    client.unpause(&admin);
    assert_eq!(client.claim(&holder, &1), 50);
}

// ── deposits ──────────────────────────────────────────────────

#[test]
fn deposit_revenue_moves_asset_into_contract() {
    let env = Env::default();
    let client = make_client(&env);
    let (admin, _holder, asset) = init_with_snapshot(&env, &client);
    let payer = Address::generate(&env);
    token::StellarAssetClient::new(&env, &asset).mint(&payer, &80);

    client.deposit_revenue(&payer, &80);
    assert_eq!(token::Client::new(&env, &asset).balance(&payer), 0);
    assert_eq!(client.pending_revenue(), 80);
    assert_eq!(
        client.try_deposit_revenue(&admin, &0),
        Err(Ok(RevenueTokenError::InvalidAmount))
    );
}

// ── require_auth ──────────────────────────────────────────────

#[test]
#[should_panic]
fn claim_requires_holder_auth() {
    let env = Env::default();
    let client = make_client(&env);
    let (_admin, holder, _asset) = init_with_snapshot(&env, &client);
    env.set_auths(&[]);
    client.claim(&holder, &1);
}

#[test]
#[should_panic]
fn burn_requires_holder_auth() {
    let env = Env::default();
    let client = make_client(&env);
    let (_admin, holder, _asset) = init_with_snapshot(&env, &client);
    env.set_auths(&[]);
    client.burn(&holder, &10);
}

#[test]
#[should_panic]
fn snapshot_requires_admin_auth() {
    let env = Env::default();
    let client = make_client(&env);
    let (admin, _holder, _asset) = init_with_snapshot(&env, &client);
    env.set_auths(&[]);
    client.snapshot(&admin);
}
