pub mod egress;
pub mod health;
