//! Discussion aggregate: sessions, rounds, statements and judgments

pub mod judgment;
pub mod org_context;
pub mod phase;
pub mod round;
pub mod session;
pub mod statement;
pub mod status;
