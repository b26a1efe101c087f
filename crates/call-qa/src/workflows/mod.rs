pub mod evaluation;
pub mod salary;
pub mod staff;
pub mod tasks;
