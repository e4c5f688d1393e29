pub mod broker;
pub mod database;
pub mod rbmq;
pub mod redis;
