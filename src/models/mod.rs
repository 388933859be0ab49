pub mod assistant;
pub mod history;
pub mod outcome;
pub mod transaction;

pub use assistant::OfficeAssistant;
pub use history::{ExtractionRecord, NewExtractionRecord, STATUS_PENDING_VALIDATION};
pub use outcome::{ChunkOutcome, ProcessFileResult, ProcessSummary, TimingMap};
pub use transaction::{
    CustomColor, FlatTransaction, RawTransaction, TransactionDetail, TransactionHeader,
};
