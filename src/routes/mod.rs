pub mod device;
pub mod health;
pub mod run;
pub mod runs;
