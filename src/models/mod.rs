pub mod operation;
pub mod transaction;
pub mod requests;

pub use operation::{
    AccountIdentifier, Amount, Currency, Operation, OperationIdentifier, OperationStatus, OperationType,
};
pub use transaction::{
    Block, BlockIdentifier, PartialBlockIdentifier, RawTransferLog, Transaction, TransactionIdentifier,
    TransferIntent,
};
pub use requests::*;
