//! # Domain Value Objects
//!
//! Immutable value types shared by the coordinator and the ledger adapters:
//! ledger identifiers, addresses, tokens, swap ids and the two state machines
//! (swap lifecycle and on-ledger escrow status).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Coordinator-generated swap identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SwapId(Uuid);

impl SwapId {
    /// Generate a fresh random id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Raw id bytes (used when deriving the order hash).
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for SwapId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SwapId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SwapId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Execution environment family of a ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
    /// Account-based EVM ledger (CREATE2 escrows, ABI calldata).
    Evm,
    /// NEAR protocol (sub-account escrows, JSON args).
    Near,
}

/// Supported ledgers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerId {
    /// Ethereum mainnet.
    Ethereum,
    /// Arbitrum L2.
    Arbitrum,
    /// Polygon PoS.
    Polygon,
    /// NEAR mainnet.
    Near,
}

impl LedgerId {
    /// All known ledgers.
    pub const ALL: [LedgerId; 4] = [
        LedgerId::Ethereum,
        LedgerId::Arbitrum,
        LedgerId::Polygon,
        LedgerId::Near,
    ];

    /// Ledger family.
    pub fn kind(&self) -> LedgerKind {
        match self {
            LedgerId::Ethereum | LedgerId::Arbitrum | LedgerId::Polygon => LedgerKind::Evm,
            LedgerId::Near => LedgerKind::Near,
        }
    }

    /// Confirmations required before a receipt is treated as final.
    pub fn required_confirmations(&self) -> u64 {
        match self {
            LedgerId::Ethereum => 12, // PoS, 2 epochs
            LedgerId::Arbitrum => 1,  // L2, verified by L1
            LedgerId::Polygon => 128,
            LedgerId::Near => 2, // Doomslug finality
        }
    }

    /// Estimated block time in seconds.
    pub fn block_time_secs(&self) -> u64 {
        match self {
            LedgerId::Ethereum => 12,
            LedgerId::Arbitrum => 1,
            LedgerId::Polygon => 2,
            LedgerId::Near => 1,
        }
    }

    /// Seconds until a freshly included transaction is final.
    pub fn finality_secs(&self) -> u64 {
        self.required_confirmations() * self.block_time_secs()
    }

    /// Lowercase ledger name.
    pub fn as_str(&self) -> &'static str {
        match self {
            LedgerId::Ethereum => "ethereum",
            LedgerId::Arbitrum => "arbitrum",
            LedgerId::Polygon => "polygon",
            LedgerId::Near => "near",
        }
    }

    /// Symbol of the ledger's native asset.
    pub fn native_symbol(&self) -> &'static str {
        match self {
            LedgerId::Ethereum | LedgerId::Arbitrum => "eth",
            LedgerId::Polygon => "pol",
            LedgerId::Near => "near",
        }
    }
}

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LedgerId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LedgerId::ALL
            .into_iter()
            .find(|ledger| ledger.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown ledger '{s}'"))
    }
}

/// Address of an account or contract on a specific ledger kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerAddress {
    /// 20-byte EVM address.
    Evm([u8; 20]),
    /// NEAR account id.
    Near(String),
}

impl LedgerAddress {
    /// Parse an address in the textual form used by `kind`.
    ///
    /// EVM addresses are `0x` followed by 40 hex digits. NEAR account ids
    /// follow the protocol rules: 2 to 64 characters of `[a-z0-9]` separated
    /// by single `-`, `_` or `.`.
    pub fn parse(kind: LedgerKind, raw: &str) -> Option<Self> {
        match kind {
            LedgerKind::Evm => {
                let digits = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X"))?;
                let bytes = hex::decode(digits).ok()?;
                let address: [u8; 20] = bytes.try_into().ok()?;
                Some(LedgerAddress::Evm(address))
            }
            LedgerKind::Near => is_valid_near_account(raw).then(|| LedgerAddress::Near(raw.to_string())),
        }
    }

    /// Ledger kind this address belongs to.
    pub fn kind(&self) -> LedgerKind {
        match self {
            LedgerAddress::Evm(_) => LedgerKind::Evm,
            LedgerAddress::Near(_) => LedgerKind::Near,
        }
    }

    /// EVM bytes, if this is an EVM address.
    pub fn as_evm(&self) -> Option<&[u8; 20]> {
        match self {
            LedgerAddress::Evm(bytes) => Some(bytes),
            LedgerAddress::Near(_) => None,
        }
    }

    /// NEAR account id, if this is a NEAR address.
    pub fn as_near(&self) -> Option<&str> {
        match self {
            LedgerAddress::Near(account) => Some(account),
            LedgerAddress::Evm(_) => None,
        }
    }
}

impl fmt::Display for LedgerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerAddress::Evm(bytes) => write!(f, "0x{}", hex::encode(bytes)),
            LedgerAddress::Near(account) => f.write_str(account),
        }
    }
}

fn is_valid_near_account(account: &str) -> bool {
    if account.len() < 2 || account.len() > 64 {
        return false;
    }
    let mut last_was_separator = true;
    for c in account.chars() {
        let separator = matches!(c, '-' | '_' | '.');
        if separator {
            if last_was_separator {
                return false;
            }
        } else if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
            return false;
        }
        last_was_separator = separator;
    }
    !last_was_separator
}

/// Asset locked in an escrow.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenRef {
    /// The ledger's native asset (ETH, NEAR, ...).
    Native,
    /// Token contract (ERC-20 / NEP-141).
    Contract(LedgerAddress),
}

impl TokenRef {
    /// Parse a token reference for `ledger`.
    ///
    /// `native`, an empty string and the ledger's native symbol all denote
    /// the native asset; anything else must be a contract address.
    pub fn parse(ledger: LedgerId, raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty()
            || trimmed.eq_ignore_ascii_case("native")
            || trimmed.eq_ignore_ascii_case(ledger.native_symbol())
        {
            return Some(TokenRef::Native);
        }
        LedgerAddress::parse(ledger.kind(), trimmed).map(TokenRef::Contract)
    }

    /// Whether this is the native asset.
    pub fn is_native(&self) -> bool {
        matches!(self, TokenRef::Native)
    }
}

impl fmt::Display for TokenRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenRef::Native => f.write_str("native"),
            TokenRef::Contract(address) => write!(f, "{address}"),
        }
    }
}

/// Which side of the swap an escrow sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowRole {
    /// Funded by the user (maker) on the source ledger.
    Source,
    /// Funded by the resolver (taker) on the destination ledger.
    Destination,
}

impl EscrowRole {
    /// Short prefix used in derived escrow account names.
    pub fn prefix(&self) -> &'static str {
        match self {
            EscrowRole::Source => "src",
            EscrowRole::Destination => "dst",
        }
    }
}

/// On-ledger escrow state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscrowStatus {
    /// Funds locked.
    #[default]
    Active,
    /// Secret revealed, funds released.
    Withdrawn,
    /// Funds refunded after cancellation opened.
    Cancelled,
    /// Funds swept by the taker after the rescue delay.
    Rescued,
}

impl EscrowStatus {
    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, EscrowStatus::Active)
    }
}

/// Escrow operation names, used to tag errors, spans and wire calls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EscrowOperation {
    /// Create the source escrow.
    CreateSource,
    /// Create the destination escrow.
    CreateDestination,
    /// Withdraw with the secret.
    Withdraw,
    /// Cancel and refund.
    Cancel,
    /// Rescue stuck funds.
    Rescue,
    /// Query escrow status.
    Status,
}

impl fmt::Display for EscrowOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EscrowOperation::CreateSource => "create_source",
            EscrowOperation::CreateDestination => "create_destination",
            EscrowOperation::Withdraw => "withdraw",
            EscrowOperation::Cancel => "cancel",
            EscrowOperation::Rescue => "rescue",
            EscrowOperation::Status => "status",
        };
        f.write_str(name)
    }
}

/// Reference to a submitted transaction.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxRef {
    /// Ledger the transaction was submitted to.
    pub ledger: LedgerId,
    /// Ledger-native transaction hash.
    pub hash: String,
}

impl fmt::Display for TxRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.ledger, self.hash)
    }
}

/// Swap lifecycle state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SwapStatus {
    /// Order accepted, nothing on-ledger yet.
    #[default]
    Created,
    /// Source escrow creation in flight.
    FirstLegPending,
    /// Source escrow confirmed.
    FirstLegCompleted,
    /// Destination escrow creation in flight.
    SecondLegPending,
    /// Both escrows confirmed.
    SecondLegCompleted,
    /// Secret being revealed; withdrawals in flight.
    Completing,
    /// Both withdrawals confirmed.
    Completed,
    /// Cancellations in flight.
    Cancelling,
    /// All existing escrows refunded.
    Cancelled,
    /// Terminal failure; see the order's failure detail.
    Failed,
}

impl SwapStatus {
    /// Check if transition is valid.
    pub fn can_transition_to(&self, next: SwapStatus) -> bool {
        use SwapStatus::*;
        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Failed)
                | (Created, FirstLegPending)
                | (FirstLegPending, FirstLegCompleted)
                | (FirstLegCompleted, SecondLegPending)
                | (SecondLegPending, SecondLegCompleted)
                | (SecondLegCompleted, Completing)
                | (Completing, Completed)
                | (Created | FirstLegCompleted | SecondLegCompleted, Cancelling)
                | (Cancelling, Cancelled)
        )
    }

    /// Check if terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Failed)
    }

    /// Whether `cancel` may start from this state.
    pub fn is_cancellable(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::FirstLegCompleted | Self::SecondLegCompleted
        )
    }
}

impl fmt::Display for SwapStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_kind() {
        assert_eq!(LedgerId::Ethereum.kind(), LedgerKind::Evm);
        assert_eq!(LedgerId::Polygon.kind(), LedgerKind::Evm);
        assert_eq!(LedgerId::Near.kind(), LedgerKind::Near);
    }

    #[test]
    fn test_ledger_finality() {
        assert_eq!(LedgerId::Ethereum.finality_secs(), 144);
        assert_eq!(LedgerId::Arbitrum.finality_secs(), 1);
    }

    #[test]
    fn test_ledger_from_str() {
        assert_eq!("NEAR".parse::<LedgerId>(), Ok(LedgerId::Near));
        assert!("bitcoin".parse::<LedgerId>().is_err());
    }

    #[test]
    fn test_parse_evm_address() {
        let addr = LedgerAddress::parse(LedgerKind::Evm, "0x00000000000000000000000000000000000000ab");
        assert_eq!(addr.as_ref().and_then(|a| a.as_evm()).map(|b| b[19]), Some(0xab));
        assert_eq!(
            addr.map(|a| a.to_string()),
            Some("0x00000000000000000000000000000000000000ab".to_string())
        );
    }

    #[test]
    fn test_parse_evm_address_rejects_bad_input() {
        assert!(LedgerAddress::parse(LedgerKind::Evm, "0x1234").is_none());
        assert!(LedgerAddress::parse(LedgerKind::Evm, "alice.near").is_none());
    }

    #[test]
    fn test_parse_near_account() {
        assert!(LedgerAddress::parse(LedgerKind::Near, "alice.near").is_some());
        assert!(LedgerAddress::parse(LedgerKind::Near, "resolver_1.testnet").is_some());
        assert!(LedgerAddress::parse(LedgerKind::Near, "Alice.near").is_none());
        assert!(LedgerAddress::parse(LedgerKind::Near, "a..near").is_none());
        assert!(LedgerAddress::parse(LedgerKind::Near, ".near").is_none());
        assert!(LedgerAddress::parse(LedgerKind::Near, "a").is_none());
    }

    #[test]
    fn test_token_parse_native() {
        assert_eq!(TokenRef::parse(LedgerId::Ethereum, "ETH"), Some(TokenRef::Native));
        assert_eq!(TokenRef::parse(LedgerId::Near, "native"), Some(TokenRef::Native));
        assert_eq!(
            TokenRef::parse(LedgerId::Near, "usdc.near"),
            Some(TokenRef::Contract(LedgerAddress::Near("usdc.near".into())))
        );
        assert!(TokenRef::parse(LedgerId::Ethereum, "usdc.near").is_none());
    }

    #[test]
    fn test_swap_status_happy_path() {
        use SwapStatus::*;
        let path = [
            Created,
            FirstLegPending,
            FirstLegCompleted,
            SecondLegPending,
            SecondLegCompleted,
            Completing,
            Completed,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(pair[1]), "{:?} -> {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_swap_status_cancellation_sources() {
        use SwapStatus::*;
        assert!(Created.can_transition_to(Cancelling));
        assert!(FirstLegCompleted.can_transition_to(Cancelling));
        assert!(SecondLegCompleted.can_transition_to(Cancelling));
        assert!(!FirstLegPending.can_transition_to(Cancelling));
        assert!(!Completing.can_transition_to(Cancelling));
        assert!(Cancelling.can_transition_to(Cancelled));
        assert!(Cancelling.can_transition_to(Failed));
    }

    #[test]
    fn test_swap_status_rejects_skips() {
        use SwapStatus::*;
        assert!(!Created.can_transition_to(SecondLegPending));
        assert!(!FirstLegCompleted.can_transition_to(Completing));
        assert!(!Created.can_transition_to(Cancelled));
    }

    #[test]
    fn test_swap_status_terminal_is_immutable() {
        use SwapStatus::*;
        for terminal in [Completed, Cancelled, Failed] {
            assert!(terminal.is_terminal());
            assert!(!terminal.can_transition_to(Failed));
            assert!(!terminal.can_transition_to(Created));
        }
    }

    #[test]
    fn test_swap_id_roundtrip_display() {
        let id = SwapId::new();
        assert_eq!(id.to_string().parse::<SwapId>().ok(), Some(id));
    }
}
