pub use executor::Executor;
pub use join::choose_join;
mod executor;
mod insert;
mod join;
mod select;

// Join algorithms. Each one consumes an already resolved projection and a
// pair of join attributes and returns the number of tuples it wrote.
mod inl;
mod smj;
mod snl;
