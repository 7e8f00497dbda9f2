//! Command-level integration tests

mod test_aggregate;
mod test_evaluate;
mod test_simulate;
