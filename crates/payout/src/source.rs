//! Read-only access to the remote pool/epoch/identity/reward API.
//!
//! [`RewardSource`] is the trait the reconciler consumes;
//! [`HttpRewardSource`] maps each query to a GET against the indexer
//! REST API, [`MockRewardSource`] backs tests without a network.
//!
//! Every endpoint wraps its payload in `{ "result": ... }`. A
//! non-success status or an absent `result` surfaces as a typed
//! [`SourceError`], never as a silently accepted null.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use reqwest::Client;
use serde::Deserialize;

use pool_common::amount;

// ─── Data types ─────────────────────────────────────────────────────────

/// Pool summary as reported by the indexer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub address: String,
    pub size: u64,
    #[serde(deserialize_with = "amount::deserialize")]
    pub total_stake: f64,
    #[serde(deserialize_with = "amount::deserialize")]
    pub total_validated_stake: f64,
}

/// One delegator with its current stake, produced fresh each run.
#[derive(Debug, Clone, Deserialize)]
pub struct DelegatorRecord {
    pub address: String,
    #[serde(deserialize_with = "amount::deserialize")]
    pub stake: f64,
}

/// Epoch descriptor. `validation_time` is an RFC3339 UTC timestamp;
/// the API uses the same encoding for transaction timestamps, so
/// lexicographic comparison orders them correctly.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpochDetail {
    pub epoch: u64,
    #[serde(default)]
    pub validation_time: Option<String>,
}

/// A transaction touching an address.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub hash: String,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub timestamp: String,
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub amount: Option<f64>,
}

/// Participation status of an address in a given epoch.
///
/// The four ineligible states exclude a delegator from payout for
/// that epoch. States the API may add later land in `Unknown`, which
/// is treated as eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityState {
    Undefined,
    Invite,
    Candidate,
    Newbie,
    Verified,
    Suspended,
    Zombie,
    Human,
    Killed,
    Unknown,
}

impl<'de> serde::Deserialize<'de> for IdentityState {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(match name.as_str() {
            "Undefined" => IdentityState::Undefined,
            "Invite" => IdentityState::Invite,
            "Candidate" => IdentityState::Candidate,
            "Newbie" => IdentityState::Newbie,
            "Verified" => IdentityState::Verified,
            "Suspended" => IdentityState::Suspended,
            "Zombie" => IdentityState::Zombie,
            "Human" => IdentityState::Human,
            "Killed" => IdentityState::Killed,
            _ => IdentityState::Unknown,
        })
    }
}

impl IdentityState {
    /// Whether this state participates in payout for the epoch.
    pub fn is_eligible(self) -> bool {
        !matches!(
            self,
            IdentityState::Newbie
                | IdentityState::Candidate
                | IdentityState::Invite
                | IdentityState::Killed
        )
    }
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IdentityState::Undefined => "Undefined",
            IdentityState::Invite => "Invite",
            IdentityState::Candidate => "Candidate",
            IdentityState::Newbie => "Newbie",
            IdentityState::Verified => "Verified",
            IdentityState::Suspended => "Suspended",
            IdentityState::Zombie => "Zombie",
            IdentityState::Human => "Human",
            IdentityState::Killed => "Killed",
            IdentityState::Unknown => "Unknown",
        };
        write!(f, "{}", s)
    }
}

/// Identity record for one address in one epoch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentitySnapshot {
    pub address: String,
    pub prev_state: IdentityState,
    #[serde(default)]
    pub state: Option<IdentityState>,
}

/// One entry of an address's mining-reward history.
#[derive(Debug, Clone, Deserialize)]
pub struct MiningRewardSummary {
    pub epoch: u64,
    #[serde(deserialize_with = "amount::deserialize")]
    pub amount: f64,
}

/// Validation outcome for one address in one epoch. Only the
/// delegatee reward component matters here.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationSummary {
    #[serde(default, deserialize_with = "amount::deserialize_opt")]
    pub delegatee_reward: Option<f64>,
}

// ─── Error ──────────────────────────────────────────────────────────────

/// Errors from the remote data source.
#[derive(Debug)]
pub enum SourceError {
    /// Transport-level failure (DNS, connect, timeout).
    Network(String),
    /// The API answered with a non-success HTTP status.
    Status { url: String, status: u16 },
    /// The response body could not be decoded.
    Decode { url: String, detail: String },
    /// The envelope arrived without a `result` payload.
    MissingResult(String),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Network(msg) => write!(f, "api network error: {}", msg),
            SourceError::Status { url, status } => {
                write!(f, "api returned status {} for {}", status, url)
            }
            SourceError::Decode { url, detail } => {
                write!(f, "could not decode response from {}: {}", url, detail)
            }
            SourceError::MissingResult(what) => {
                write!(f, "api returned no result for {}", what)
            }
        }
    }
}

impl std::error::Error for SourceError {}

// ─── Trait ──────────────────────────────────────────────────────────────

/// Read-only accessor over remote pool, epoch, identity, and reward
/// data. Pure queries, no mutation, no internal retry.
#[async_trait]
pub trait RewardSource: Send + Sync {
    async fn pool(&self, address: &str) -> Result<PoolInfo, SourceError>;

    /// Delegators in the order the API returns them. Callers must not
    /// reorder; report output follows this order.
    async fn pool_delegators(&self, address: &str) -> Result<Vec<DelegatorRecord>, SourceError>;

    async fn last_epoch(&self) -> Result<EpochDetail, SourceError>;

    async fn epoch(&self, epoch: u64) -> Result<EpochDetail, SourceError>;

    async fn txs_for_address(&self, address: &str) -> Result<Vec<Transaction>, SourceError>;

    async fn identity(&self, epoch: u64, address: &str)
        -> Result<IdentitySnapshot, SourceError>;

    /// Last two entries of the address's mining-reward history.
    async fn mining_reward_summaries(
        &self,
        address: &str,
    ) -> Result<Vec<MiningRewardSummary>, SourceError>;

    async fn validation_summary(
        &self,
        epoch: u64,
        address: &str,
    ) -> Result<ValidationSummary, SourceError>;
}

// ─── HTTP implementation ────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    result: Option<T>,
}

/// REST client for the indexer API.
#[derive(Clone)]
pub struct HttpRewardSource {
    base: String,
    client: Client,
}

impl HttpRewardSource {
    /// Builds a client against `base` (no trailing slash) with a
    /// 10-second request timeout.
    pub fn new(base: impl Into<String>) -> Result<Self, SourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;
        Ok(HttpRewardSource {
            base: base.into(),
            client,
        })
    }

    async fn fetch<T>(&self, path: &str) -> Result<T, SourceError>
    where
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{}", self.base, path);
        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SourceError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let envelope: Envelope<T> = resp.json().await.map_err(|e| SourceError::Decode {
            url: url.clone(),
            detail: e.to_string(),
        })?;
        envelope.result.ok_or(SourceError::MissingResult(url))
    }
}

#[async_trait]
impl RewardSource for HttpRewardSource {
    async fn pool(&self, address: &str) -> Result<PoolInfo, SourceError> {
        self.fetch(&format!("/Pool/{}", address)).await
    }

    async fn pool_delegators(&self, address: &str) -> Result<Vec<DelegatorRecord>, SourceError> {
        self.fetch(&format!("/Pool/{}/Delegators?limit=100", address))
            .await
    }

    async fn last_epoch(&self) -> Result<EpochDetail, SourceError> {
        self.fetch("/Epoch/Last").await
    }

    async fn epoch(&self, epoch: u64) -> Result<EpochDetail, SourceError> {
        self.fetch(&format!("/Epoch/{}", epoch)).await
    }

    async fn txs_for_address(&self, address: &str) -> Result<Vec<Transaction>, SourceError> {
        self.fetch(&format!("/address/{}/txs?limit=50", address))
            .await
    }

    async fn identity(
        &self,
        epoch: u64,
        address: &str,
    ) -> Result<IdentitySnapshot, SourceError> {
        self.fetch(&format!("/Epoch/{}/Identity/{}", epoch, address))
            .await
    }

    async fn mining_reward_summaries(
        &self,
        address: &str,
    ) -> Result<Vec<MiningRewardSummary>, SourceError> {
        self.fetch(&format!("/Address/{}/MiningRewardSummaries?limit=2", address))
            .await
    }

    async fn validation_summary(
        &self,
        epoch: u64,
        address: &str,
    ) -> Result<ValidationSummary, SourceError> {
        self.fetch(&format!("/Epoch/{}/Identity/{}/ValidationSummary", epoch, address))
            .await
    }
}

// ─── Mock implementation ────────────────────────────────────────────────

/// Map-backed [`RewardSource`] for tests. Any query with no seeded
/// entry returns [`SourceError::MissingResult`], mirroring an empty
/// envelope from the real API.
#[derive(Default)]
pub struct MockRewardSource {
    inner: Mutex<MockData>,
}

#[derive(Default)]
struct MockData {
    pool: Option<PoolInfo>,
    delegators: Option<Vec<DelegatorRecord>>,
    last_epoch: Option<EpochDetail>,
    epochs: HashMap<u64, EpochDetail>,
    txs: HashMap<String, Vec<Transaction>>,
    identities: HashMap<(u64, String), IdentitySnapshot>,
    mining: HashMap<String, Vec<MiningRewardSummary>>,
    validation: HashMap<(u64, String), ValidationSummary>,
}

impl MockRewardSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pool(&self, info: PoolInfo) {
        self.inner.lock().pool = Some(info);
    }

    pub fn set_delegators(&self, delegators: Vec<DelegatorRecord>) {
        self.inner.lock().delegators = Some(delegators);
    }

    pub fn set_last_epoch(&self, detail: EpochDetail) {
        self.inner.lock().last_epoch = Some(detail);
    }

    pub fn set_epoch(&self, detail: EpochDetail) {
        self.inner.lock().epochs.insert(detail.epoch, detail);
    }

    pub fn set_txs(&self, address: &str, txs: Vec<Transaction>) {
        self.inner.lock().txs.insert(address.to_string(), txs);
    }

    pub fn set_identity(&self, epoch: u64, snapshot: IdentitySnapshot) {
        self.inner
            .lock()
            .identities
            .insert((epoch, snapshot.address.clone()), snapshot);
    }

    pub fn set_mining_summaries(&self, address: &str, summaries: Vec<MiningRewardSummary>) {
        self.inner.lock().mining.insert(address.to_string(), summaries);
    }

    pub fn set_validation_summary(&self, epoch: u64, address: &str, summary: ValidationSummary) {
        self.inner
            .lock()
            .validation
            .insert((epoch, address.to_string()), summary);
    }
}

#[async_trait]
impl RewardSource for MockRewardSource {
    async fn pool(&self, address: &str) -> Result<PoolInfo, SourceError> {
        self.inner
            .lock()
            .pool
            .clone()
            .ok_or_else(|| SourceError::MissingResult(format!("pool {}", address)))
    }

    async fn pool_delegators(&self, address: &str) -> Result<Vec<DelegatorRecord>, SourceError> {
        self.inner
            .lock()
            .delegators
            .clone()
            .ok_or_else(|| SourceError::MissingResult(format!("delegators of {}", address)))
    }

    async fn last_epoch(&self) -> Result<EpochDetail, SourceError> {
        self.inner
            .lock()
            .last_epoch
            .clone()
            .ok_or_else(|| SourceError::MissingResult("last epoch".to_string()))
    }

    async fn epoch(&self, epoch: u64) -> Result<EpochDetail, SourceError> {
        self.inner
            .lock()
            .epochs
            .get(&epoch)
            .cloned()
            .ok_or_else(|| SourceError::MissingResult(format!("epoch {}", epoch)))
    }

    async fn txs_for_address(&self, address: &str) -> Result<Vec<Transaction>, SourceError> {
        Ok(self
            .inner
            .lock()
            .txs
            .get(address)
            .cloned()
            .unwrap_or_default())
    }

    async fn identity(
        &self,
        epoch: u64,
        address: &str,
    ) -> Result<IdentitySnapshot, SourceError> {
        self.inner
            .lock()
            .identities
            .get(&(epoch, address.to_string()))
            .cloned()
            .ok_or_else(|| SourceError::MissingResult(format!("identity {}/{}", epoch, address)))
    }

    async fn mining_reward_summaries(
        &self,
        address: &str,
    ) -> Result<Vec<MiningRewardSummary>, SourceError> {
        self.inner
            .lock()
            .mining
            .get(address)
            .cloned()
            .ok_or_else(|| SourceError::MissingResult(format!("mining rewards of {}", address)))
    }

    async fn validation_summary(
        &self,
        epoch: u64,
        address: &str,
    ) -> Result<ValidationSummary, SourceError> {
        self.inner
            .lock()
            .validation
            .get(&(epoch, address.to_string()))
            .cloned()
            .ok_or_else(|| {
                SourceError::MissingResult(format!("validation summary {}/{}", epoch, address))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_state_eligibility() {
        assert!(IdentityState::Verified.is_eligible());
        assert!(IdentityState::Human.is_eligible());
        assert!(IdentityState::Suspended.is_eligible());
        assert!(!IdentityState::Newbie.is_eligible());
        assert!(!IdentityState::Candidate.is_eligible());
        assert!(!IdentityState::Invite.is_eligible());
        assert!(!IdentityState::Killed.is_eligible());
    }

    #[test]
    fn identity_state_unknown_variant() {
        let snap: IdentitySnapshot = serde_json::from_str(
            r#"{"address": "0xaa", "prevState": "SomethingNew", "state": "Verified"}"#,
        )
        .unwrap();
        assert_eq!(snap.prev_state, IdentityState::Unknown);
        assert!(snap.prev_state.is_eligible());
    }

    #[test]
    fn delegator_record_accepts_string_stake() {
        let rec: DelegatorRecord =
            serde_json::from_str(r#"{"address": "0xaa", "stake": "1050.75"}"#).unwrap();
        assert_eq!(rec.stake, 1050.75);
    }

    #[test]
    fn envelope_without_result_is_distinguishable() {
        let env: Envelope<PoolInfo> = serde_json::from_str(r#"{"result": null}"#).unwrap();
        assert!(env.result.is_none());
    }

    #[tokio::test]
    async fn mock_missing_entry_surfaces_error() {
        let mock = MockRewardSource::new();
        let err = mock.pool("0xaa").await.unwrap_err();
        assert!(matches!(err, SourceError::MissingResult(_)));
        let err = mock.validation_summary(10, "0xaa").await.unwrap_err();
        assert!(matches!(err, SourceError::MissingResult(_)));
    }

    #[tokio::test]
    async fn mock_returns_seeded_pool() {
        let mock = MockRewardSource::new();
        mock.set_pool(PoolInfo {
            address: "0xpool".to_string(),
            size: 12,
            total_stake: 50_000.0,
            total_validated_stake: 48_000.0,
        });
        let pool = mock.pool("0xpool").await.unwrap();
        assert_eq!(pool.address, "0xpool");
        assert_eq!(pool.size, 12);
        assert_eq!(pool.total_stake, 50_000.0);
    }

    #[tokio::test]
    async fn mock_returns_seeded_delegators_in_order() {
        let mock = MockRewardSource::new();
        mock.set_delegators(vec![
            DelegatorRecord {
                address: "0xbb".to_string(),
                stake: 2.0,
            },
            DelegatorRecord {
                address: "0xaa".to_string(),
                stake: 1.0,
            },
        ]);
        let delegators = mock.pool_delegators("pool").await.unwrap();
        assert_eq!(delegators[0].address, "0xbb");
        assert_eq!(delegators[1].address, "0xaa");
    }
}
