//! Trial bookkeeping and result aggregation
//!
//! ## Schema Overview
//!
//! ```text
//! ResultTable (1) ──< ResultRow (N)      -> results/dpdk_perf_results.txt
//!                 └──< TrialRecord (N)   -> results/dpdk_perf_results.json
//!                         │
//!                         └── TrialId ──> <id>.l3fwd, <id>.pktgen, <id>.perf, ...
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use dpdk_bench::experiment::{LogKind, ResultRow, ResultTable, TrialId, TrialRecord, TrialStatus};
//!
//! let id = TrialId::now();
//! let mut record = TrialRecord::new(id.clone(), "tx_cores=1 tx_desc=1024");
//! record.start();
//! record.set_status(LogKind::Pktgen, TrialStatus::Success);
//! record.finish();
//!
//! let mut table = ResultTable::new(["EXPTID", "TX rate (Mpps)"]);
//! table.push(ResultRow::new(id).with("0.2Mpps"), record);
//! assert_eq!(table.len(), 1);
//! ```

mod result_row;
mod table;
mod trial_id;
mod trial_record;

pub use result_row::{ResultRow, CELL_SEPARATOR};
pub use table::{ResultTable, RECORDS_FILE_NAME};
pub use trial_id::{LogKind, TrialId, TRIAL_ID_FORMAT};
pub use trial_record::{TrialRecord, TrialRecordBuilder, TrialStatus};
