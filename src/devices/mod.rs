pub mod dstation;
pub mod prophet08;
pub mod remote_sl;
