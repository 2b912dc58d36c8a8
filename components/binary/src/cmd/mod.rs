pub mod join;
pub mod split;
