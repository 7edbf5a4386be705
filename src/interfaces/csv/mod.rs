pub mod command_reader;
pub mod transaction_writer;
pub mod wallet_writer;
