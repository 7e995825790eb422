pub mod coordinate;
pub mod run;
