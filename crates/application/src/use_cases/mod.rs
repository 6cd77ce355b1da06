pub mod dispatch_record;

pub use dispatch_record::{DispatchOutcome, DispatchRecordUseCase};
