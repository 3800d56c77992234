//! Full-node wire types.
//!
//! Field names follow the node's JSON-RPC encoding (PascalCase, CIDs as
//! `{"/": "..."}`, big integers as decimal strings) so values can be passed
//! through the gateway untouched.

use std::fmt;
use std::ops::{Add, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Chain height.
pub type ChainEpoch = i64;

/// Storage power is measured in bytes but can exceed `u64`.
pub type StoragePower = TokenAmount;

/// One FIL expressed in attoFIL.
pub const ATTO_PER_FIL: u64 = 1_000_000_000_000_000_000;

/// Arbitrary-precision amount in attoFIL, encoded as a decimal string.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TokenAmount(pub BigInt);

impl TokenAmount {
    /// Zero attoFIL.
    pub fn zero() -> Self {
        Self(BigInt::zero())
    }

    /// Whole FIL.
    pub fn from_fil(fil: u64) -> Self {
        Self(BigInt::from(fil) * BigInt::from(ATTO_PER_FIL))
    }

    /// Amount in attoFIL.
    pub fn from_atto(atto: impl Into<BigInt>) -> Self {
        Self(atto.into())
    }

    /// Whether the amount is below zero.
    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TokenAmount {
    type Err = num_bigint::ParseBigIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BigInt::from_str(s).map(Self)
    }
}

impl<'a> Add<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;

    fn add(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 + &rhs.0)
    }
}

impl<'a> Sub<&'a TokenAmount> for &'a TokenAmount {
    type Output = TokenAmount;

    fn sub(self, rhs: &'a TokenAmount) -> TokenAmount {
        TokenAmount(&self.0 - &rhs.0)
    }
}

impl Serialize for TokenAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for TokenAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Nodes always send strings; bare numbers are accepted for hand-written fixtures.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Text(String),
            Int(i64),
        }

        match Repr::deserialize(deserializer)? {
            Repr::Text(s) => s.parse().map_err(serde::de::Error::custom),
            Repr::Int(n) => Ok(Self(BigInt::from(n))),
        }
    }
}

/// Protocol-prefixed actor address such as `f01234` or `t3...`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// String form of the address.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Address {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.chars();
        match (chars.next(), chars.next()) {
            (Some('f' | 't'), Some('0'..='4')) if s.len() > 2 => Ok(Self(s.to_string())),
            _ => Err(format!("invalid address: {s:?}")),
        }
    }
}

impl TryFrom<String> for Address {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0
    }
}

/// Content identifier in the node's JSON link form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Cid {
    /// Encoded CID.
    #[serde(rename = "/")]
    pub root: String,
}

impl Cid {
    /// CID from its encoded form.
    pub fn new(root: impl Into<String>) -> Self {
        Self { root: root.into() }
    }
}

/// Tipset identity. The empty key means "current head".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TipSetKey(pub Vec<Cid>);

impl TipSetKey {
    /// Key meaning the current head.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// Whether this key means the current head.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Stable textual form used in cache keys.
    pub fn canonical(&self) -> String {
        self.0
            .iter()
            .map(|c| c.root.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl<'de> Deserialize<'de> for TipSetKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let cids = Option::<Vec<Cid>>::deserialize(deserializer)?;
        Ok(Self(cids.unwrap_or_default()))
    }
}

/// A tipset as returned by `ChainHead`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TipSet {
    /// Block CIDs forming the tipset key.
    pub cids: Vec<Cid>,
    /// Epoch of the tipset.
    pub height: ChainEpoch,
}

impl TipSet {
    /// Key identifying this tipset.
    pub fn key(&self) -> TipSetKey {
        TipSetKey(self.cids.clone())
    }
}

/// On-chain actor record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Actor {
    /// Actor code CID.
    pub code: Cid,
    /// State root CID.
    pub head: Cid,
    /// Number of messages sent by the actor.
    pub nonce: u64,
    /// Actor balance.
    pub balance: TokenAmount,
}

/// Miner actor configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerInfo {
    /// Address that receives withdrawals.
    pub owner: Address,
    /// Address that signs sealing messages.
    pub worker: Address,
    /// Addresses allowed to submit PoSt messages.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub control_addresses: Vec<Address>,
    /// libp2p peer id, if published.
    #[serde(default, rename = "PeerId")]
    pub peer_id: Option<String>,
    /// Sector size in bytes.
    #[serde(default)]
    pub sector_size: u64,
    /// Sectors per window PoSt partition.
    #[serde(default)]
    pub window_po_st_partition_sectors: u64,
}

/// Power claim of one miner or the whole network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Claim {
    /// Raw committed bytes.
    pub raw_byte_power: StoragePower,
    /// Power weighted by deal quality.
    pub quality_adj_power: StoragePower,
}

/// Result of `StateMinerPower`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MinerPower {
    /// Claim of the queried miner.
    pub miner_power: Claim,
    /// Network-wide claim.
    pub total_power: Claim,
    /// Whether the miner meets the consensus minimum.
    #[serde(default)]
    pub has_min_power: bool,
}

/// Proving-deadline descriptor for the current epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DeadlineInfo {
    /// Epoch the descriptor was computed at.
    pub current_epoch: ChainEpoch,
    /// First epoch of the current proving period.
    pub period_start: ChainEpoch,
    /// Index of the current deadline.
    pub index: u64,
    /// First epoch of the deadline window.
    pub open: ChainEpoch,
    /// First epoch after the deadline window.
    pub close: ChainEpoch,
    /// Epoch the PoSt challenge is drawn at.
    pub challenge: ChainEpoch,
    /// Last epoch for declaring faults.
    pub fault_cutoff: ChainEpoch,
    /// Deadlines per proving period.
    #[serde(rename = "WPoStPeriodDeadlines", default)]
    pub wpost_period_deadlines: u64,
    /// Proving period length in epochs.
    #[serde(rename = "WPoStProvingPeriod")]
    pub wpost_proving_period: ChainEpoch,
}

/// One deadline of a miner's proving period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Deadline {
    /// Partitions with a PoSt submitted in this period.
    #[serde(default)]
    pub post_submissions: BitField,
    /// Optimistically accepted proofs that can still be disputed.
    #[serde(default)]
    pub disputable_proof_count: u64,
}

/// Sector sets of one partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Partition {
    /// Every sector assigned to the partition.
    #[serde(default)]
    pub all_sectors: BitField,
    /// Sectors declared or detected faulty.
    #[serde(default)]
    pub faulty_sectors: BitField,
    /// Faulty sectors declared as recovering.
    #[serde(default)]
    pub recovering_sectors: BitField,
    /// Sectors not yet terminated.
    #[serde(default)]
    pub live_sectors: BitField,
    /// Live sectors that are not faulty.
    #[serde(default)]
    pub active_sectors: BitField,
}

/// Run-length encoded sector set: alternating run lengths, starting with a
/// (possibly empty) run of zeros.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct BitField {
    runs: Vec<u64>,
}

impl BitField {
    /// A set of `n` consecutive sectors starting at zero.
    pub fn with_count(n: u64) -> Self {
        if n == 0 {
            Self::default()
        } else {
            Self { runs: vec![0, n] }
        }
    }

    /// Number of set bits.
    pub fn count(&self) -> u64 {
        self.runs.iter().skip(1).step_by(2).sum()
    }
}

impl<'de> Deserialize<'de> for BitField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let runs = Option::<Vec<u64>>::deserialize(deserializer)?;
        Ok(Self {
            runs: runs.unwrap_or_default(),
        })
    }
}

/// Funds held by the miner actor that are not available for withdrawal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockedFunds {
    /// Block rewards still vesting.
    pub vesting_funds: TokenAmount,
    /// Pledge locked for committed sectors.
    pub initial_pledge_requirement: TokenAmount,
    /// Deposits held for pre-committed sectors.
    pub pre_commit_deposits: TokenAmount,
    /// Fees owed to the network, zero on older actors.
    #[serde(default)]
    pub fee_debt: TokenAmount,
}

impl LockedFunds {
    /// Balance left after every lock and outstanding fee debt. Can be negative.
    pub fn available_balance(&self, actor_balance: &TokenAmount) -> TokenAmount {
        let locked = &(&self.vesting_funds + &self.pre_commit_deposits)
            + &(&self.initial_pledge_requirement + &self.fee_debt);
        actor_balance - &locked
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_token_amount_string_encoding() {
        let amount: TokenAmount =
            serde_json::from_value(json!("123456789012345678901234567890")).unwrap();
        assert_eq!(amount.to_string(), "123456789012345678901234567890");
        assert_eq!(
            serde_json::to_value(&amount).unwrap(),
            json!("123456789012345678901234567890")
        );
    }

    #[test]
    fn test_from_fil() {
        assert_eq!(TokenAmount::from_fil(2).to_string(), "2000000000000000000");
    }

    #[test]
    fn test_address_parse() {
        assert!("f01234".parse::<Address>().is_ok());
        assert!("t3abcdef".parse::<Address>().is_ok());
        assert!("x01234".parse::<Address>().is_err());
        assert!("f0".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
        assert!(serde_json::from_value::<Address>(json!("bogus")).is_err());
        assert_eq!(
            serde_json::to_value("f01000".parse::<Address>().unwrap()).unwrap(),
            json!("f01000")
        );
    }

    #[test]
    fn test_bitfield_count_sums_set_runs() {
        // 2 unset, 3 set, 4 unset, 5 set
        let bf: BitField = serde_json::from_value(json!([2, 3, 4, 5])).unwrap();
        assert_eq!(bf.count(), 8);
        assert_eq!(BitField::with_count(7).count(), 7);
        let empty: BitField = serde_json::from_value(json!(null)).unwrap();
        assert_eq!(empty.count(), 0);
    }

    #[test]
    fn test_tipset_key_null_and_canonical() {
        let tsk: TipSetKey = serde_json::from_value(json!(null)).unwrap();
        assert!(tsk.is_empty());
        let tsk: TipSetKey =
            serde_json::from_value(json!([{"/": "bafy1"}, {"/": "bafy2"}])).unwrap();
        assert_eq!(tsk.canonical(), "bafy1,bafy2");
    }

    #[test]
    fn test_miner_info_null_control_addresses() {
        let mi: MinerInfo = serde_json::from_value(json!({
            "Owner": "f0100",
            "Worker": "f0101",
            "ControlAddresses": null,
            "PeerId": "12D3Koo",
            "SectorSize": 34359738368u64,
        }))
        .unwrap();
        assert!(mi.control_addresses.is_empty());
        assert_eq!(mi.worker.as_str(), "f0101");
    }

    #[test]
    fn test_available_balance_may_go_negative() {
        let funds = LockedFunds {
            vesting_funds: TokenAmount::from_atto(40),
            initial_pledge_requirement: TokenAmount::from_atto(50),
            pre_commit_deposits: TokenAmount::from_atto(10),
            fee_debt: TokenAmount::from_atto(5),
        };
        assert_eq!(
            funds.available_balance(&TokenAmount::from_atto(200)),
            TokenAmount::from_atto(95)
        );
        assert!(funds
            .available_balance(&TokenAmount::from_atto(50))
            .is_negative());
    }

    #[test]
    fn test_deadline_info_field_names() {
        let dl: DeadlineInfo = serde_json::from_value(json!({
            "CurrentEpoch": 1000,
            "PeriodStart": 900,
            "Index": 3,
            "Open": 960,
            "Close": 1020,
            "Challenge": 940,
            "FaultCutoff": 890,
            "WPoStPeriodDeadlines": 48,
            "WPoStProvingPeriod": 2880,
        }))
        .unwrap();
        assert_eq!(dl.wpost_proving_period, 2880);
        assert_eq!(dl.index, 3);
    }
}
