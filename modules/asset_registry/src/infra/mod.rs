//! Infrastructure layer - SeaORM storage and the database handle

pub mod db;
pub mod storage;

pub use db::{Batch, BatchOutput, Database, Tables, TransactionOptions, TxHandle};
