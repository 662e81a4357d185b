//! Typed records shared across the reconciliation pipeline. Wire-visible
//! payloads are explicit tagged structs validated at the boundary, not
//! loose JSON dictionaries.

pub mod dead_letter;
pub mod extracted_header;
pub mod job;
pub mod ledger_item;
pub mod match_result;
pub mod task;

pub use dead_letter::{DeadLetterEntry, DlqAction, DlqStatus};
pub use extracted_header::ExtractedHeader;
pub use job::{Job, JobPriority, JobStatus, JobTransition, QueueStats};
pub use ledger_item::OpenLedgerItem;
pub use match_result::{MatchResult, MatchStatus, RankedCandidate};
pub use task::{ReviewAction, ReviewDecision, Task, TaskLifecycle};
