pub mod chain_client;
pub mod log_parser;
pub mod block_assembler;
pub mod account;

pub use chain_client::{ChainClient, RosettaClient};
pub use log_parser::{decode_transfer_log, decode_transfer_logs, EthLog, LogDecodeError, LogEventParser, ParsedTransaction};
pub use block_assembler::BlockAssembler;
pub use account::AccountService;
