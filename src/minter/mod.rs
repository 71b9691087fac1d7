mod discovery;
mod session;
mod workflows;

pub use discovery::{
    COST_CANDIDATES, Candidate, ContractHandle, MAX_MINT_CANDIDATES, MINT_CANDIDATES, MintArg,
};
pub use session::{
    ContractInfo, FALLBACK_GAS_LIMIT, GAS_ESTIMATE_MULTIPLIER, Minter, PLACEHOLDER_GAS_LIMIT,
    RECEIPT_TIMEOUT,
};
pub use workflows::{
    CostEstimate, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, MIN_BALANCE, MintAttemptRecord,
    MintOutcome, MintRunner, PERMANENT_REVERT_KEYWORDS, is_permanent,
};
