pub mod dates;
pub mod frame;
pub mod observation;
pub mod parameter;
pub mod query;
pub mod station;
