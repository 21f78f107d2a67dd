// Import/export of ledger data. Only export exists: nothing is read back in.

pub mod export;

pub use export::*;
