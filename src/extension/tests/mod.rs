//! Extension System Tests
//! 
//! Shared mock implementations and the activation, lifecycle and query tests.


#[cfg(test)]
pub mod activation_tests;


#[cfg(test)]
pub mod query_tests;
