#![no_std]
#![deny(unsafe_code)]
#![deny(clippy::dbg_macro, clippy::todo, clippy::unimplemented)]
use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, symbol_short, token, Address, Env,
    Symbol, Vec,
};

mod ledger;
mod revenue;

pub use revenue::CLAIMABLE_WINDOW;

/// Centralized contract error codes. Auth failures are signaled by host panic (require_auth).
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
#[repr(u32)]
pub enum RevenueTokenError {
    /// Contract is not initialized (admin not set).
    NotInitialized = 1,
    /// `initialize` was already called.
    AlreadyInitialized = 2,
    /// Caller is not authorized to perform this action.
    NotAuthorized = 3,
    /// percent_claimable exceeded 100.
    InvalidConfig = 4,
    /// Amount must be strictly positive.
    InvalidAmount = 5,
    /// Contract is paused; state-changing operations are disabled.
    ContractPaused = 6,
    /// Snapshot attempted before the snapshot interval elapsed.
    RateLimited = 7,
    /// New revenue would be negative: the bookkeeping no longer matches the held balance.
    ArithmeticInvariantViolation = 8,
    /// Checked integer arithmetic overflowed.
    ArithmeticOverflow = 9,
    /// Holder already claimed against this snapshot.
    AlreadyClaimed = 10,
    /// Snapshot is outside the claim window.
    SnapshotExpired = 11,
    /// Snapshot id was never taken.
    InvalidSnapshotId = 12,
    /// Computed claim is zero.
    NothingToClaim = 13,
    /// Amount exceeds the holder's token balance.
    InsufficientBalance = 14,
    /// Revenue asset transfer out of the contract failed.
    TransferFailed = 15,
    /// claim_batch received more than MAX_CLAIM_BATCH ids.
    BatchTooLarge = 16,
    /// No bridge relayer configured.
    BridgeNotConfigured = 17,
    /// Inbound bridge message (source domain, nonce) was already credited.
    BridgeMessageProcessed = 18,
}

// ── Event symbols ────────────────────────────────────────────
const EVENT_INIT: Symbol = symbol_short!("init");
const EVENT_PAUSED: Symbol = symbol_short!("paused");
const EVENT_UNPAUSED: Symbol = symbol_short!("unpaused");
const EVENT_BRIDGE_SET: Symbol = symbol_short!("brg_set");
const EVENT_MINT: Symbol = symbol_short!("mint");
const EVENT_TRANSFER: Symbol = symbol_short!("transfer");
const EVENT_REV_DEPOSIT: Symbol = symbol_short!("rev_dep");
const EVENT_SNAPSHOT: Symbol = symbol_short!("snapshot");
const EVENT_CLAIM: Symbol = symbol_short!("claim");
const EVENT_REDEEM: Symbol = symbol_short!("redeem");
const EVENT_BRIDGE_OUT: Symbol = symbol_short!("brg_out");
const EVENT_BRIDGE_IN: Symbol = symbol_short!("brg_in");

// ── Data structures ──────────────────────────────────────────
/// Contract version identifier. Bumped when storage or semantics change.
pub const CONTRACT_VERSION: u32 = 1;

/// Maximum number of snapshot ids accepted by a single claim_batch.
const MAX_CLAIM_BATCH: u32 = 50;

/// Immutable revenue-sharing parameters fixed at initialization.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct RevenueConfig {
    /// Token contract whose balance held by this contract is the revenue.
    pub revenue_asset: Address,
    /// Share (0-100) of each snapshot's new revenue made claimable; the rest is pooled for burns.
    pub percent_claimable: u32,
    /// Minimum ledger-sequence spacing between snapshots.
    pub snapshot_interval: u32,
}

/// Storage keys. Ledger balances are checkpointed per account under
/// AccountSnapshotIds/AccountSnapshotValues; revenue state is keyed by snapshot id.
#[contracttype]
#[derive(Clone)]
pub enum DataKey {
    Admin,
    Config,
    Paused,
    /// Bridge relayer allowed to credit inbound transfers.
    Bridge,
    Balance(Address),
    TotalSupply,
    CurrentSnapshotId,
    AccountSnapshotIds(Address),
    AccountSnapshotValues(Address),
    SupplySnapshotIds,
    SupplySnapshotValues,
    /// Total claimable against a snapshot, including value carried out of the window.
    ClaimableAtSnapshot(u32),
    /// Cumulative amount paid out against a snapshot.
    ClaimedAtSnapshot(u32),
    HasClaimed(u32, Address),
    RedeemPool,
    /// Taken from new revenue by burns since the last snapshot.
    Redeemed,
    LastSnapshotBlock,
    OutboundNonce,
    /// (source_domain, nonce) of an inbound bridge credit already applied.
    ProcessedInbound(u32, u64),
}

// ── Contract ─────────────────────────────────────────────────
#[contract]
pub struct RevenueToken;

#[contractimpl]
impl RevenueToken {
    fn config(env: &Env) -> Result<RevenueConfig, RevenueTokenError> {
        env.storage()
            .persistent()
            .get(&DataKey::Config)
            .ok_or(RevenueTokenError::NotInitialized)
    }

    fn require_admin(env: &Env, caller: &Address) -> Result<(), RevenueTokenError> {
        caller.require_auth();
        let admin: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Admin)
            .ok_or(RevenueTokenError::NotInitialized)?;
        if *caller != admin {
            return Err(RevenueTokenError::NotAuthorized);
        }
        Ok(())
    }

    /// Returns error if contract is paused. Call at start of state-mutating entrypoints.
    fn require_not_paused(env: &Env) -> Result<(), RevenueTokenError> {
        if env
            .storage()
            .persistent()
            .get::<DataKey, bool>(&DataKey::Paused)
            .unwrap_or(false)
        {
            return Err(RevenueTokenError::ContractPaused);
        }
        Ok(())
    }

    fn require_positive_amount(amount: i128) -> Result<(), RevenueTokenError> {
        if amount <= 0 {
            return Err(RevenueTokenError::InvalidAmount);
        }
        Ok(())
    }

    /// Initialize admin and revenue parameters. Can only be called once.
    pub fn initialize(
        env: Env,
        admin: Address,
        revenue_asset: Address,
        percent_claimable: u32,
        snapshot_interval: u32,
    ) -> Result<(), RevenueTokenError> {
        if env.storage().persistent().has(&DataKey::Admin) {
            return Err(RevenueTokenError::AlreadyInitialized);
        }
        if percent_claimable > revenue::PERCENT_DENOMINATOR as u32 {
            return Err(RevenueTokenError::InvalidConfig);
        }
        admin.require_auth();

        let config = RevenueConfig {
            revenue_asset,
            percent_claimable,
            snapshot_interval,
        };
        env.storage().persistent().set(&DataKey::Admin, &admin);
        env.storage().persistent().set(&DataKey::Config, &config);
        env.storage().persistent().set(&DataKey::Paused, &false);
        env.events().publish(
            (EVENT_INIT, admin),
            (config.revenue_asset, percent_claimable, snapshot_interval),
        );
        Ok(())
    }

    /// Get the admin address, if set.
    pub fn get_admin(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Admin)
    }

    pub fn get_config(env: Env) -> Result<RevenueConfig, RevenueTokenError> {
        Self::config(&env)
    }

    /// Pause the contract (admin only). Idempotent.
    pub fn pause(env: Env, caller: Address) -> Result<(), RevenueTokenError> {
        Self::require_admin(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Paused, &true);
        env.events().publish((EVENT_PAUSED, caller), ());
        Ok(())
    }

    /// Unpause the contract (admin only). Idempotent.
    pub fn unpause(env: Env, caller: Address) -> Result<(), RevenueTokenError> {
        Self::require_admin(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Paused, &false);
        env.events().publish((EVENT_UNPAUSED, caller), ());
        Ok(())
    }

    /// Query the paused state of the contract.
    pub fn is_paused(env: Env) -> bool {
        env.storage()
            .persistent()
            .get::<DataKey, bool>(&DataKey::Paused)
            .unwrap_or(false)
    }

    // ── Balance ledger ────────────────────────────────────────

    /// Mint new tokens to `to` (admin only).
    pub fn mint(
        env: Env,
        caller: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), RevenueTokenError> {
        Self::require_not_paused(&env)?;
        Self::require_admin(&env, &caller)?;
        Self::require_positive_amount(amount)?;

        ledger::mint(&env, &to, amount)?;
        env.events().publish((EVENT_MINT, to), amount);
        Ok(())
    }

    pub fn transfer(
        env: Env,
        from: Address,
        to: Address,
        amount: i128,
    ) -> Result<(), RevenueTokenError> {
        Self::require_not_paused(&env)?;
        from.require_auth();
        Self::require_positive_amount(amount)?;

        ledger::transfer(&env, &from, &to, amount)?;
        env.events().publish((EVENT_TRANSFER, from, to), amount);
        Ok(())
    }

    pub fn balance(env: Env, account: Address) -> i128 {
        ledger::balance(&env, &account)
    }

    pub fn total_supply(env: Env) -> i128 {
        ledger::total_supply(&env)
    }

    pub fn current_snapshot_id(env: Env) -> u32 {
        ledger::current_snapshot_id(&env)
    }

    /// Balance of `account` as of `snapshot_id`.
    pub fn balance_of_at(
        env: Env,
        account: Address,
        snapshot_id: u32,
    ) -> Result<i128, RevenueTokenError> {
        ledger::balance_at(&env, &account, snapshot_id)
    }

    /// Total supply as of `snapshot_id`.
    pub fn total_supply_at(env: Env, snapshot_id: u32) -> Result<i128, RevenueTokenError> {
        ledger::total_supply_at(&env, snapshot_id)
    }

    // ── Revenue pool ──────────────────────────────────────────

    /// Move `amount` of the revenue asset from `from` into the contract.
    ///
    /// Plain transfers to the contract address count as revenue as well; this
    /// entrypoint only adds an event for indexers.
    pub fn deposit_revenue(env: Env, from: Address, amount: i128) -> Result<(), RevenueTokenError> {
        Self::require_not_paused(&env)?;
        from.require_auth();
        Self::require_positive_amount(amount)?;

        let config = Self::config(&env)?;
        token::Client::new(&env, &config.revenue_asset).transfer(
            &from,
            &env.current_contract_address(),
            &amount,
        );
        env.events().publish((EVENT_REV_DEPOSIT, from), amount);
        Ok(())
    }

    /// Take a balance snapshot and allocate revenue received since the previous one (admin only).
    ///
    /// Fails with `RateLimited` unless more than `snapshot_interval` ledgers passed
    /// since the last snapshot. Returns the new snapshot id.
    pub fn snapshot(env: Env, caller: Address) -> Result<u32, RevenueTokenError> {
        Self::require_not_paused(&env)?;
        Self::require_admin(&env, &caller)?;
        let config = Self::config(&env)?;

        let outcome = revenue::take_snapshot(&env, &config)?;
        env.events().publish(
            (EVENT_SNAPSHOT, outcome.snapshot_id),
            (outcome.new_revenue, outcome.claimable, outcome.pooled),
        );
        Ok(outcome.snapshot_id)
    }

    /// Amount `account` may claim against `snapshot_id`.
    ///
    /// Fails with `AlreadyClaimed` after a successful claim and with
    /// `SnapshotExpired` once the snapshot left the claim window.
    pub fn claimable_revenue(
        env: Env,
        account: Address,
        snapshot_id: u32,
    ) -> Result<i128, RevenueTokenError> {
        revenue::claimable_revenue(&env, &account, snapshot_id)
    }

    /// Claim `holder`'s share of the revenue earmarked at `snapshot_id`. Returns the payout.
    pub fn claim(env: Env, holder: Address, snapshot_id: u32) -> Result<i128, RevenueTokenError> {
        Self::require_not_paused(&env)?;
        holder.require_auth();
        let config = Self::config(&env)?;

        let amount = revenue::claim(&env, &config, &holder, snapshot_id)?;
        env.events()
            .publish((EVENT_CLAIM, holder), (snapshot_id, amount));
        Ok(amount)
    }

    /// Claim against each snapshot in order. Any failure aborts the whole batch.
    pub fn claim_batch(
        env: Env,
        holder: Address,
        snapshot_ids: Vec<u32>,
    ) -> Result<i128, RevenueTokenError> {
        Self::require_not_paused(&env)?;
        holder.require_auth();
        if snapshot_ids.len() > MAX_CLAIM_BATCH {
            return Err(RevenueTokenError::BatchTooLarge);
        }
        let config = Self::config(&env)?;

        let mut total: i128 = 0;
        for i in 0..snapshot_ids.len() {
            let snapshot_id = snapshot_ids.get_unchecked(i);
            let amount = revenue::claim(&env, &config, &holder, snapshot_id)?;
            env.events()
                .publish((EVENT_CLAIM, holder.clone()), (snapshot_id, amount));
            total = total
                .checked_add(amount)
                .ok_or(RevenueTokenError::ArithmeticOverflow)?;
        }
        Ok(total)
    }

    /// Revenue asset paid out for burning `amount` tokens right now.
    pub fn redeemable_on_burn(env: Env, amount: i128) -> Result<i128, RevenueTokenError> {
        if amount < 0 {
            return Err(RevenueTokenError::InvalidAmount);
        }
        let config = Self::config(&env)?;
        revenue::redemption_for(&env, &config, amount)?.total()
    }

    /// Burn `amount` of `holder`'s tokens, paying its share of new revenue and
    /// of the redeem pool. Returns the payout.
    pub fn burn(env: Env, holder: Address, amount: i128) -> Result<i128, RevenueTokenError> {
        Self::require_not_paused(&env)?;
        holder.require_auth();
        let config = Self::config(&env)?;

        let redemption = revenue::burn(&env, &config, &holder, amount)?;
        env.events().publish(
            (EVENT_REDEEM, holder),
            (amount, redemption.from_new_revenue, redemption.from_pool),
        );
        redemption.total()
    }

    /// Revenue received since the last snapshot and not yet allocated.
    pub fn pending_revenue(env: Env) -> Result<i128, RevenueTokenError> {
        let config = Self::config(&env)?;
        revenue::new_revenue(&env, &config)
    }

    /// Unclaimed value across the snapshots still inside the claim window.
    pub fn claim_pool(env: Env) -> Result<i128, RevenueTokenError> {
        revenue::claim_pool(&env, ledger::current_snapshot_id(&env))
    }

    pub fn claimable_at_snapshot(env: Env, snapshot_id: u32) -> i128 {
        revenue::claimable_at(&env, snapshot_id)
    }

    pub fn claimed_at_snapshot(env: Env, snapshot_id: u32) -> i128 {
        revenue::claimed_at(&env, snapshot_id)
    }

    pub fn has_claimed(env: Env, snapshot_id: u32, account: Address) -> bool {
        revenue::has_claimed(&env, snapshot_id, &account)
    }

    pub fn redeem_pool(env: Env) -> i128 {
        revenue::redeem_pool(&env)
    }

    pub fn redeemed(env: Env) -> i128 {
        revenue::redeemed(&env)
    }

    /// Ledger sequence of the most recent snapshot, if any.
    pub fn last_snapshot_block(env: Env) -> Option<u32> {
        revenue::last_snapshot_block(&env)
    }

    // ── Cross-domain transfers ────────────────────────────────

    /// Set the relayer allowed to credit inbound bridge transfers (admin only).
    pub fn set_bridge(env: Env, caller: Address, bridge: Address) -> Result<(), RevenueTokenError> {
        Self::require_admin(&env, &caller)?;
        env.storage().persistent().set(&DataKey::Bridge, &bridge);
        env.events().publish((EVENT_BRIDGE_SET, caller), bridge);
        Ok(())
    }

    pub fn get_bridge(env: Env) -> Option<Address> {
        env.storage().persistent().get(&DataKey::Bridge)
    }

    /// Debit `amount` from `from` for delivery on `destination_domain`.
    ///
    /// The tokens are burned here without revenue redemption. Returns the
    /// outbound nonce the relayer must present on the destination.
    pub fn bridge_out(
        env: Env,
        from: Address,
        amount: i128,
        destination_domain: u32,
    ) -> Result<u64, RevenueTokenError> {
        Self::require_not_paused(&env)?;
        from.require_auth();
        Self::require_positive_amount(amount)?;

        ledger::burn(&env, &from, amount)?;
        let nonce: u64 = env
            .storage()
            .persistent()
            .get(&DataKey::OutboundNonce)
            .unwrap_or(0);
        let nonce = nonce
            .checked_add(1)
            .ok_or(RevenueTokenError::ArithmeticOverflow)?;
        env.storage()
            .persistent()
            .set(&DataKey::OutboundNonce, &nonce);

        env.events().publish(
            (EVENT_BRIDGE_OUT, from),
            (destination_domain, amount, nonce),
        );
        Ok(nonce)
    }

    /// Credit `amount` to `to` for a transfer debited on `source_domain` (bridge only).
    /// Each (source_domain, nonce) is credited at most once.
    pub fn bridge_in(
        env: Env,
        to: Address,
        amount: i128,
        source_domain: u32,
        nonce: u64,
    ) -> Result<(), RevenueTokenError> {
        Self::require_not_paused(&env)?;
        let bridge: Address = env
            .storage()
            .persistent()
            .get(&DataKey::Bridge)
            .ok_or(RevenueTokenError::BridgeNotConfigured)?;
        bridge.require_auth();
        Self::require_positive_amount(amount)?;

        let processed_key = DataKey::ProcessedInbound(source_domain, nonce);
        if env.storage().persistent().has(&processed_key) {
            return Err(RevenueTokenError::BridgeMessageProcessed);
        }
        env.storage().persistent().set(&processed_key, &true);

        ledger::mint(&env, &to, amount)?;
        env.events()
            .publish((EVENT_BRIDGE_IN, to), (source_domain, amount, nonce));
        Ok(())
    }

    /// Return the current contract version. Used for upgrade compatibility and migration.
    pub fn get_version(env: Env) -> u32 {
        let _ = env;
        CONTRACT_VERSION
    }
}

mod test;
mod test_auth;
mod test_conservation;
mod test_ledger;
