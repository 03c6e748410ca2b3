//! Snapshot-capable balance ledger.
//!
//! Balances and total supply are checkpointed lazily: the value held *before*
//! the first mutation after a snapshot is recorded under that snapshot id, so
//! a query for snapshot `n` resolves to the first checkpoint with id >= `n`, or
//! to the live value when nothing has changed since.
use soroban_sdk::{Address, Env, Vec};

use crate::{DataKey, RevenueTokenError};

pub fn balance(env: &Env, account: &Address) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::Balance(account.clone()))
        .unwrap_or(0)
}

pub fn total_supply(env: &Env) -> i128 {
    env.storage()
        .persistent()
        .get(&DataKey::TotalSupply)
        .unwrap_or(0)
}

/// Id of the most recent snapshot, 0 before the first one.
pub fn current_snapshot_id(env: &Env) -> u32 {
    env.storage()
        .persistent()
        .get(&DataKey::CurrentSnapshotId)
        .unwrap_or(0)
}

/// Allocate the next snapshot id. Balances are frozen lazily from here on.
pub fn take_snapshot(env: &Env) -> Result<u32, RevenueTokenError> {
    let id = current_snapshot_id(env)
        .checked_add(1)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage()
        .persistent()
        .set(&DataKey::CurrentSnapshotId, &id);
    Ok(id)
}

fn require_existing_snapshot(env: &Env, snapshot_id: u32) -> Result<(), RevenueTokenError> {
    if snapshot_id == 0 || snapshot_id > current_snapshot_id(env) {
        return Err(RevenueTokenError::InvalidSnapshotId);
    }
    Ok(())
}

pub fn balance_at(
    env: &Env,
    account: &Address,
    snapshot_id: u32,
) -> Result<i128, RevenueTokenError> {
    require_existing_snapshot(env, snapshot_id)?;
    let recorded = value_at(
        env,
        &DataKey::AccountSnapshotIds(account.clone()),
        &DataKey::AccountSnapshotValues(account.clone()),
        snapshot_id,
    );
    Ok(recorded.unwrap_or_else(|| balance(env, account)))
}

pub fn total_supply_at(env: &Env, snapshot_id: u32) -> Result<i128, RevenueTokenError> {
    require_existing_snapshot(env, snapshot_id)?;
    let recorded = value_at(
        env,
        &DataKey::SupplySnapshotIds,
        &DataKey::SupplySnapshotValues,
        snapshot_id,
    );
    Ok(recorded.unwrap_or_else(|| total_supply(env)))
}

fn value_at(env: &Env, ids_key: &DataKey, values_key: &DataKey, snapshot_id: u32) -> Option<i128> {
    let ids: Vec<u32> = env.storage().persistent().get(ids_key)?;
    let index = lower_bound(&ids, snapshot_id);
    if index == ids.len() {
        return None;
    }
    let values: Vec<i128> = env.storage().persistent().get(values_key)?;
    values.get(index)
}

/// Index of the first checkpoint id >= `snapshot_id`, or `ids.len()`.
fn lower_bound(ids: &Vec<u32>, snapshot_id: u32) -> u32 {
    let mut low = 0;
    let mut high = ids.len();
    while low < high {
        let mid = low + (high - low) / 2;
        if ids.get_unchecked(mid) < snapshot_id {
            low = mid + 1;
        } else {
            high = mid;
        }
    }
    low
}

fn record_checkpoint(env: &Env, ids_key: &DataKey, values_key: &DataKey, value: i128) {
    let current = current_snapshot_id(env);
    if current == 0 {
        return;
    }
    let mut ids: Vec<u32> = env
        .storage()
        .persistent()
        .get(ids_key)
        .unwrap_or_else(|| Vec::new(env));
    let last = if ids.is_empty() {
        0
    } else {
        ids.get_unchecked(ids.len() - 1)
    };
    if last >= current {
        return;
    }
    let mut values: Vec<i128> = env
        .storage()
        .persistent()
        .get(values_key)
        .unwrap_or_else(|| Vec::new(env));
    ids.push_back(current);
    values.push_back(value);
    env.storage().persistent().set(ids_key, &ids);
    env.storage().persistent().set(values_key, &values);
}

fn checkpoint_account(env: &Env, account: &Address) {
    record_checkpoint(
        env,
        &DataKey::AccountSnapshotIds(account.clone()),
        &DataKey::AccountSnapshotValues(account.clone()),
        balance(env, account),
    );
}

fn checkpoint_supply(env: &Env) {
    record_checkpoint(
        env,
        &DataKey::SupplySnapshotIds,
        &DataKey::SupplySnapshotValues,
        total_supply(env),
    );
}

fn write_balance(env: &Env, account: &Address, amount: i128) {
    env.storage()
        .persistent()
        .set(&DataKey::Balance(account.clone()), &amount);
}

pub fn mint(env: &Env, to: &Address, amount: i128) -> Result<(), RevenueTokenError> {
    checkpoint_account(env, to);
    checkpoint_supply(env);

    let balance = balance(env, to)
        .checked_add(amount)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    let supply = total_supply(env)
        .checked_add(amount)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    write_balance(env, to, balance);
    env.storage().persistent().set(&DataKey::TotalSupply, &supply);
    Ok(())
}

/// Destroy `amount` of `from`'s tokens, shrinking total supply.
pub fn burn(env: &Env, from: &Address, amount: i128) -> Result<(), RevenueTokenError> {
    let balance = balance(env, from);
    if amount > balance {
        return Err(RevenueTokenError::InsufficientBalance);
    }
    checkpoint_account(env, from);
    checkpoint_supply(env);

    write_balance(env, from, balance - amount);
    let supply = total_supply(env)
        .checked_sub(amount)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    env.storage().persistent().set(&DataKey::TotalSupply, &supply);
    Ok(())
}

pub fn transfer(
    env: &Env,
    from: &Address,
    to: &Address,
    amount: i128,
) -> Result<(), RevenueTokenError> {
    let from_balance = balance(env, from);
    if amount > from_balance {
        return Err(RevenueTokenError::InsufficientBalance);
    }
    if from == to {
        return Ok(());
    }
    checkpoint_account(env, from);
    checkpoint_account(env, to);

    let to_balance = balance(env, to)
        .checked_add(amount)
        .ok_or(RevenueTokenError::ArithmeticOverflow)?;
    write_balance(env, from, from_balance - amount);
    write_balance(env, to, to_balance);
    Ok(())
}
