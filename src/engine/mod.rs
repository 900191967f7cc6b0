pub mod earnings;
pub mod lifecycle;
pub mod query;
pub mod transitions;
