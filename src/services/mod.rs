pub mod ledger_summary;
pub mod prompt_source;
pub mod result_ledger;

pub use ledger_summary::{title_suffix, LedgerSummary};
pub use prompt_source::PromptSource;
pub use result_ledger::ResultLedger;
