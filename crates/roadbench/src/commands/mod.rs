pub mod generate;
pub mod run;
pub mod scenario;
pub mod worker;
