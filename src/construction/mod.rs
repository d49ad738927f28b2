pub mod matcher;
pub mod codec;
pub mod service;

pub use matcher::{match_operations, parse_transfer, AmountSign, MatchError, Matches, OperationRole, OperationShape};
pub use codec::{CodecError, ParsedTransfer, TransactionCodec, TransactionEnvelope, TxMetadata};
pub use service::ConstructionService;
