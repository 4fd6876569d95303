pub mod csv;
pub mod datamart;
pub mod endpoints;
pub mod error;
pub mod transport;
pub mod webservice;
