pub mod cards;
pub mod proofs;
pub mod rounds;
