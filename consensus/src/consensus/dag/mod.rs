//! DAG structure: parent/child relations, tips and the reachability index.

pub mod reachability;
pub mod relations;
#[cfg(test)]
mod integration_test;

pub use reachability::{is_chain_ancestor_of, is_dag_ancestor_of};
pub use relations::{stage_block_relations, tips_after_adding};
