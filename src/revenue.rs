//! Snapshot-indexed revenue bookkeeping: claim pool, redeem pool and the
//! burn-redemption split.
//!
//! Value held by the contract is always in exactly one of four buckets:
//! still claimable against a snapshot inside the claim window, reserved in the
//! redeem pool, new revenue that arrived since the last snapshot, or already
//! paid out. `Redeemed` tracks what burns have taken out of new revenue so the
//! next snapshot does not pool it twice.
use soroban_sdk::{log, token, Address, Env};

use crate::{ledger, DataKey, RevenueConfig, RevenueTokenError};

/// Number of most recent snapshots holders may still claim against.
pub const CLAIMABLE_WINDOW: u32 = 2;

pub const PERCENT_DENOMINATOR: i128 = 100;

/// Amounts booked by a single `take_snapshot`.
pub struct SnapshotOutcome {
    pub snapshot_id: u32,
    pub new_revenue: i128,
    pub claimable: i128,
    pub pooled: i128,
}

/// Payout owed for burning a given number of tokens.
pub struct Redemption {
    pub from_new_revenue: i128,
    pub from_pool: i128,
}

impl Redemption {
    pub fn total(&self) -> Result<i128, RevenueTokenError> {
        self.from_new_revenue
            .checked_add(self.from_pool)
            .ok_or(RevenueTokenError::ArithmeticOverflow)
    }
}

fn read_amount(env: &Env, key: &DataKey) -> i128 {
    env.storage().persistent().get(key).unwrap_or(0)
}

pub fn claimable_at(env: &Env, snapshot_id: u32) -> i128 {
    read_amount(env, &DataKey::ClaimableAtSnapshot(snapshot_id))
}

pub fn claimed_at(env: &Env, snapshot_id: u32) -> i128 {
    read_amount(env, &DataKey::ClaimedAtSnapshot(snapshot_id))
}

pub fn has_claimed(env: &Env, snapshot_id: u32, account: &Address) -> bool {
    env.storage()
        .persistent()
        .get(&DataKey::HasClaimed(snapshot_id, account.clone()))
        .unwrap_or(false)
}

pub fn redeem_pool(env: &Env) -> i128 {
    read_amount(env, &DataKey::RedeemPool)
}

pub fn redeemed(env: &Env) -> i128 {
    read_amount(env, &DataKey::Redeemed)
}

pub fn last_snapshot_block(env: &Env) -> Option<u32> {
    env.storage().persistent().get(&DataKey::LastSnapshotBlock)
}

pub fn contract_balance(env: &Env, config: &RevenueConfig) -> i128 {
    token::Client::new(env, &config.revenue_asset).balance(&env.current_contract_address())
}

/// `amount * numerator / denominator`, truncating. Zero when the denominator is zero.
pub fn proportion(
    amount: i128,
    numerator: i128,
    denominator: i128,
) -> Result<i128, RevenueTokenError> {
    if denominator == 0 {
        return Ok(0);
    }
    amount
        .checked_mul(numerator)
        .map(|product| product / denominator)
        .ok_or(RevenueTokenError::ArithmeticOverflow)
}

fn unclaimed_remainder(env: &Env, snapshot_id: u32) -> Result<i128, RevenueTokenError> {
    claimable_at(env, snapshot_id)
        .checked_sub(claimed_at(env, snapshot_id))
        .ok_or(RevenueTokenError::ArithmeticOverflow)
}

/// Unclaimed value across the window of snapshots ending at `snapshot_id`.
pub fn claim_pool(env: &Env, snapshot_id: u32) -> Result<i128, RevenueTokenError> {
    let mut total: i128 = 0;
    for offset in 0..CLAIMABLE_WINDOW {
        if snapshot_id <= offset {
            break;
        }
        total = total
            .checked_add(unclaimed_remainder(env, snapshot_id - offset)?)
            .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    }
    Ok(total)
}

fn new_revenue_with_pool(
    env: &Env,
    config: &RevenueConfig,
    claim_pool: i128,
) -> Result<i128, RevenueTokenError> {
    let value = contract_balance(env, config)
        .checked_add(redeemed(env))
        .and_then(|v| v.checked_sub(redeem_pool(env)))
        .and_then(|v| v.checked_sub(claim_pool))
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    if value < 0 {
        return Err(RevenueTokenError::ArithmeticInvariantViolation);
    }
    Ok(value)
}

/// Value received since the last snapshot that is neither claimable nor pooled.
pub fn new_revenue(env: &Env, config: &RevenueConfig) -> Result<i128, RevenueTokenError> {
    let pool = claim_pool(env, ledger::current_snapshot_id(env))?;
    new_revenue_with_pool(env, config, pool)
}

/// Freeze balances and split new revenue between the claim and redeem pools.
pub fn take_snapshot(
    env: &Env,
    config: &RevenueConfig,
) -> Result<SnapshotOutcome, RevenueTokenError> {
    let now = env.ledger().sequence();
    if let Some(last) = last_snapshot_block(env) {
        if now.saturating_sub(last) <= config.snapshot_interval {
            return Err(RevenueTokenError::RateLimited);
        }
    }

    let snapshot_id = ledger::take_snapshot(env)?;
    env.storage()
        .persistent()
        .set(&DataKey::LastSnapshotBlock, &now);

    let pool = claim_pool(env, snapshot_id - 1)?;
    let new_revenue = new_revenue_with_pool(env, config, pool)?;
    let claimable = proportion(
        new_revenue,
        config.percent_claimable as i128,
        PERCENT_DENOMINATOR,
    )?;

    // Whatever aged out of the window is re-offered against this snapshot.
    let carried = if snapshot_id >= CLAIMABLE_WINDOW {
        unclaimed_remainder(env, snapshot_id - CLAIMABLE_WINDOW)?
    } else {
        0
    };
    let claimable_total = claimable
        .checked_add(carried)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage()
        .persistent()
        .set(&DataKey::ClaimableAtSnapshot(snapshot_id), &claimable_total);

    let pooled = new_revenue
        .checked_sub(claimable)
        .and_then(|v| v.checked_sub(redeemed(env)))
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    if pooled < 0 {
        return Err(RevenueTokenError::ArithmeticInvariantViolation);
    }
    let redeem_pool = redeem_pool(env)
        .checked_add(pooled)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage()
        .persistent()
        .set(&DataKey::RedeemPool, &redeem_pool);
    env.storage().persistent().set(&DataKey::Redeemed, &0_i128);

    log!(
        env,
        "snapshot {}: new revenue {}, carried {}",
        snapshot_id,
        new_revenue,
        carried
    );

    Ok(SnapshotOutcome {
        snapshot_id,
        new_revenue,
        claimable,
        pooled,
    })
}

/// `account`'s share of the value claimable against `snapshot_id`.
pub fn claimable_revenue(
    env: &Env,
    account: &Address,
    snapshot_id: u32,
) -> Result<i128, RevenueTokenError> {
    let current = ledger::current_snapshot_id(env);
    if snapshot_id == 0 || snapshot_id > current {
        return Err(RevenueTokenError::InvalidSnapshotId);
    }
    if has_claimed(env, snapshot_id, account) {
        return Err(RevenueTokenError::AlreadyClaimed);
    }
    if current - snapshot_id >= CLAIMABLE_WINDOW {
        return Err(RevenueTokenError::SnapshotExpired);
    }

    let balance = ledger::balance_at(env, account, snapshot_id)?;
    let supply = ledger::total_supply_at(env, snapshot_id)?;
    proportion(balance, claimable_at(env, snapshot_id), supply)
}

/// Book and pay a single-snapshot claim. State is written before the payout.
pub fn claim(
    env: &Env,
    config: &RevenueConfig,
    account: &Address,
    snapshot_id: u32,
) -> Result<i128, RevenueTokenError> {
    let amount = claimable_revenue(env, account, snapshot_id)?;
    if amount == 0 {
        return Err(RevenueTokenError::NothingToClaim);
    }

    env.storage()
        .persistent()
        .set(&DataKey::HasClaimed(snapshot_id, account.clone()), &true);
    let claimed = claimed_at(env, snapshot_id)
        .checked_add(amount)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage()
        .persistent()
        .set(&DataKey::ClaimedAtSnapshot(snapshot_id), &claimed);

    pay(env, config, account, amount)?;
    Ok(amount)
}

/// Split of new revenue and redeem pool owed for burning `amount` tokens now.
pub fn redemption_for(
    env: &Env,
    config: &RevenueConfig,
    amount: i128,
) -> Result<Redemption, RevenueTokenError> {
    let supply = ledger::total_supply(env);
    if amount > supply {
        return Err(RevenueTokenError::InsufficientBalance);
    }
    let new_revenue = new_revenue(env, config)?;
    let unclaimable = proportion(
        new_revenue,
        PERCENT_DENOMINATOR - config.percent_claimable as i128,
        PERCENT_DENOMINATOR,
    )?;
    let unredeemed = unclaimable
        .checked_sub(redeemed(env))
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    if unredeemed < 0 {
        return Err(RevenueTokenError::ArithmeticInvariantViolation);
    }

    Ok(Redemption {
        from_new_revenue: proportion(amount, unredeemed, supply)?,
        from_pool: proportion(amount, redeem_pool(env), supply)?,
    })
}

/// Burn `amount` of `account`'s tokens and pay out the matching redemption.
pub fn burn(
    env: &Env,
    config: &RevenueConfig,
    account: &Address,
    amount: i128,
) -> Result<Redemption, RevenueTokenError> {
    if amount <= 0 {
        return Err(RevenueTokenError::InvalidAmount);
    }
    if amount > ledger::balance(env, account) {
        return Err(RevenueTokenError::InsufficientBalance);
    }

    let redemption = redemption_for(env, config, amount)?;
    let redeem_pool = redeem_pool(env)
        .checked_sub(redemption.from_pool)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    let redeemed = redeemed(env)
        .checked_add(redemption.from_new_revenue)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage()
        .persistent()
        .set(&DataKey::RedeemPool, &redeem_pool);
    env.storage().persistent().set(&DataKey::Redeemed, &redeemed);

    ledger::burn(env, account, amount)?;

    let payout = redemption.total()?;
    if payout > 0 {
        pay(env, config, account, payout)?;
    }
    Ok(redemption)
}

fn pay(
    env: &Env,
    config: &RevenueConfig,
    to: &Address,
    amount: i128,
) -> Result<(), RevenueTokenError> {
    let client = token::Client::new(env, &config.revenue_asset);
    match client.try_transfer(&env.current_contract_address(), to, &amount) {
        Ok(Ok(())) => Ok(()),
        _ => Err(RevenueTokenError::TransferFailed),
    }
}
